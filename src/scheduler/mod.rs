//! Frame execution.
//!
//! The scheduler walks an [`ExecutionPlan`](crate::compiler::ExecutionPlan)
//! step by step. Before each pass it acquires storage for the transients that
//! start living at that step, resolves the pass's declared handles into
//! [`PassResources`], runs the deferred callback, and returns every transient
//! whose last user just ran to the [`TransientPool`].
//!
//! Per-pass failures ([`PassError`]) are logged and recorded as skipped; the
//! frame keeps going. Running out of transient storage aborts the frame.

mod pool;

pub use pool::{AllocationId, PoolStats, TransientPool};

use crate::compiler::{ExecutionPlan, PassState};
use crate::error::{GraphError, PassError, Result};
use crate::frame::FrameContext;
use crate::graph::{
    AccessMode, ExecuteFn, ExternalResource, Orientation, PassDecl, PassId, ResourceAccess,
    ResourceHandle, ResourceOrigin, ResourceRegistry, ResourceUsage,
};
use crate::types::ResourceDescriptor;
use crate::GraphConfig;

/// Physical storage behind a logical resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalResource {
    /// Pooled by the graph.
    Transient(AllocationId),
    /// Supplied by the caller.
    Imported(ExternalResource),
}

/// A declared handle resolved for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub handle: ResourceHandle,
    pub mode: AccessMode,
    pub usage: ResourceUsage,
    pub physical: PhysicalResource,
    pub descriptor: ResourceDescriptor,
}

/// Resolved bindings handed to a pass callback.
///
/// Bindings appear in the order the pass declared them.
#[derive(Debug, Clone)]
pub struct PassResources {
    pass: PassId,
    name: String,
    orientation: Orientation,
    bindings: Vec<Binding>,
}

impl PassResources {
    /// Get the id of the executing pass.
    pub fn pass_id(&self) -> PassId {
        self.pass
    }

    /// Get the name of the executing pass.
    pub fn pass_name(&self) -> &str {
        &self.name
    }

    /// Y orientation policy of the executing pass.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// All bindings in declaration order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Get the binding for a declared handle.
    pub fn get(&self, handle: ResourceHandle) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.handle == handle)
    }

    /// Get the physical resource behind a declared handle.
    pub fn physical(&self, handle: ResourceHandle) -> Option<PhysicalResource> {
        self.get(handle).map(|binding| binding.physical)
    }
}

/// Kind of allocation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationEventKind {
    Allocate,
    Release,
}

/// One entry of the allocation timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocationEvent {
    pub kind: AllocationEventKind,
    pub resource: ResourceHandle,
    pub allocation: AllocationId,
    /// Step of the pass the event is attached to.
    pub step: usize,
}

/// A pass whose callback reported a [`PassError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPass {
    pub pass: PassId,
    pub name: String,
    pub reason: PassError,
}

/// What happened while executing one frame.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    names: Vec<String>,
    states: Vec<PassState>,
    executed: Vec<PassId>,
    skipped: Vec<SkippedPass>,
    culled: Vec<PassId>,
    events: Vec<AllocationEvent>,
    allocations: Vec<Option<AllocationId>>,
    pool_stats: PoolStats,
}

impl ExecutionReport {
    /// Ids of passes whose callbacks completed, in execution order.
    pub fn executed(&self) -> &[PassId] {
        &self.executed
    }

    /// Names of passes whose callbacks completed, in execution order.
    pub fn executed_passes(&self) -> Vec<&str> {
        self.executed.iter().map(|&p| self.pass_name(p)).collect()
    }

    /// Passes that were skipped, with the reported error.
    pub fn skipped(&self) -> &[SkippedPass] {
        &self.skipped
    }

    /// Names of culled passes in declaration order.
    pub fn culled_passes(&self) -> Vec<&str> {
        self.culled.iter().map(|&p| self.pass_name(p)).collect()
    }

    /// Final state of a pass.
    pub fn pass_state(&self, pass: PassId) -> Option<PassState> {
        self.states.get(pass.index()).copied()
    }

    /// Name of a pass, or `"<unknown>"`.
    pub fn pass_name(&self, pass: PassId) -> &str {
        self.names
            .get(pass.index())
            .map_or("<unknown>", String::as_str)
    }

    /// Allocation timeline in execution order.
    pub fn events(&self) -> &[AllocationEvent] {
        &self.events
    }

    /// Allocation assigned to a transient, if it was allocated.
    pub fn allocation_of(&self, resource: ResourceHandle) -> Option<AllocationId> {
        self.allocations.get(resource.index()).copied().flatten()
    }

    /// Get the pool statistics.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool_stats
    }
}

/// Runs compiled frames against a fresh transient pool.
pub(crate) struct Scheduler {
    pool: TransientPool,
}

impl Scheduler {
    pub(crate) fn new(config: &GraphConfig) -> Self {
        Self {
            pool: TransientPool::new(config),
        }
    }

    /// Execute every kept pass of `plan` in order.
    pub(crate) fn execute<R>(
        mut self,
        plan: &ExecutionPlan,
        passes: &[PassDecl],
        callbacks: &mut [Option<ExecuteFn<R>>],
        registry: &ResourceRegistry,
        ctx: &mut FrameContext<R>,
    ) -> Result<ExecutionReport> {
        let mut report = ExecutionReport {
            names: passes.iter().map(|pass| pass.name().to_string()).collect(),
            states: passes
                .iter()
                .map(|pass| plan.pass_state(pass.id()).unwrap_or(PassState::Declared))
                .collect(),
            culled: plan.culled().to_vec(),
            allocations: vec![None; registry.len()],
            ..ExecutionReport::default()
        };

        for (step, &pass) in plan.pass_order().iter().enumerate() {
            let decl = passes
                .get(pass.index())
                .ok_or(GraphError::UnknownPass(pass))?;

            for &handle in plan.allocations_before(step) {
                let resource = registry.resolve(handle)?;
                let allocation = self.pool.acquire(resource.name(), resource.descriptor())?;
                report.allocations[handle.index()] = Some(allocation);
                report.events.push(AllocationEvent {
                    kind: AllocationEventKind::Allocate,
                    resource: handle,
                    allocation,
                    step,
                });
            }

            let bindings = decl
                .accesses()
                .iter()
                .map(|access| bind(access, registry, &report.allocations))
                .collect::<Result<Vec<_>>>()?;
            let resources = PassResources {
                pass,
                name: decl.name().to_string(),
                orientation: decl.config().orientation,
                bindings,
            };
            report.states[pass.index()] = PassState::Bound;

            let outcome = match callbacks.get_mut(pass.index()).and_then(Option::as_mut) {
                Some(callback) => callback(&resources, ctx),
                None => {
                    log::debug!("pass '{}' has no execute callback", decl.name());
                    Ok(())
                }
            };

            match outcome {
                Ok(()) => {
                    report.states[pass.index()] = PassState::Executed;
                    report.executed.push(pass);
                }
                Err(reason) => {
                    log::warn!("skipping pass '{}': {}", decl.name(), reason);
                    report.states[pass.index()] = PassState::Skipped;
                    report.skipped.push(SkippedPass {
                        pass,
                        name: decl.name().to_string(),
                        reason,
                    });
                }
            }

            for &handle in plan.releases_after(step) {
                if let Some(allocation) = report.allocations[handle.index()] {
                    self.pool.release(allocation);
                    report.events.push(AllocationEvent {
                        kind: AllocationEventKind::Release,
                        resource: handle,
                        allocation,
                        step,
                    });
                }
            }
        }

        report.pool_stats = self.pool.stats();
        log::debug!(
            "executed {} passes ({} skipped, {} culled), {} transient allocations",
            report.executed.len(),
            report.skipped.len(),
            report.culled.len(),
            report.pool_stats.allocations_created
        );
        Ok(report)
    }
}

fn bind(
    access: &ResourceAccess,
    registry: &ResourceRegistry,
    allocations: &[Option<AllocationId>],
) -> Result<Binding> {
    let resource = registry.resolve(access.resource)?;
    let physical = match resource.origin() {
        ResourceOrigin::Imported(external) => PhysicalResource::Imported(external),
        ResourceOrigin::Transient => allocations
            .get(access.resource.index())
            .copied()
            .flatten()
            .map(PhysicalResource::Transient)
            .ok_or(GraphError::UnknownResource(access.resource))?,
    };
    Ok(Binding {
        handle: access.resource,
        mode: access.mode,
        usage: access.usage,
        physical,
        descriptor: resource.descriptor().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameSettings;
    use crate::graph::{DepthAccess, FrameGraph, PassConfig};
    use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

    fn blur_desc() -> TextureDescriptor {
        TextureDescriptor::new_2d(
            960,
            540,
            TextureFormat::Rgba16Float,
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        )
    }

    fn context() -> FrameContext<Vec<String>> {
        FrameContext::new(0, FrameSettings::default(), Vec::new())
    }

    #[test]
    fn test_bindings_in_declaration_order() {
        let graph = FrameGraph::new(GraphConfig::default());
        let mut frame = graph.begin_frame();
        let depth = frame
            .declare_texture(
                "depth",
                TextureDescriptor::new_2d(
                    1280,
                    720,
                    TextureFormat::Depth32Float,
                    TextureUsage::RENDER_ATTACHMENT,
                ),
            )
            .unwrap();
        let target = frame
            .import_texture(
                "target",
                ExternalResource(42),
                TextureDescriptor::new_2d(
                    1280,
                    720,
                    TextureFormat::Rgba8UnormSrgb,
                    TextureUsage::RENDER_ATTACHMENT,
                ),
            )
            .unwrap();

        let mut pass = frame
            .add_pass(
                "forward",
                PassConfig::graphics().with_orientation(Orientation::FlipY),
                (),
            )
            .unwrap();
        pass.write_color(target, 0).unwrap();
        pass.write_depth(depth, DepthAccess::Write).unwrap();
        pass.set_execute_callback(move |_, resources, ctx: &mut FrameContext<Vec<String>>| {
            let handles: Vec<_> = resources.bindings().iter().map(|b| b.handle).collect();
            assert_eq!(handles, vec![target, depth]);
            assert_eq!(
                resources.physical(target),
                Some(PhysicalResource::Imported(ExternalResource(42)))
            );
            assert!(matches!(
                resources.physical(depth),
                Some(PhysicalResource::Transient(_))
            ));
            assert_eq!(resources.orientation().y_sign(), -1.0);
            ctx.recorder_mut().push(resources.pass_name().to_string());
            Ok(())
        });

        let mut ctx = context();
        let report = frame.compile_and_execute(&mut ctx).unwrap();
        assert_eq!(report.executed_passes(), vec!["forward"]);
        assert_eq!(ctx.into_recorder(), vec!["forward".to_string()]);
    }

    #[test]
    fn test_allocation_timeline() {
        let graph = FrameGraph::new(GraphConfig::default().with_culling(false));
        let mut frame = graph.begin_frame();
        let a = frame.declare_texture("blur_a", blur_desc()).unwrap();
        let b = frame.declare_texture("blur_b", blur_desc()).unwrap();

        let mut first = frame.add_pass("first", PassConfig::graphics(), ()).unwrap();
        first.write_color(a, 0).unwrap();
        let mut second = frame.add_pass("second", PassConfig::graphics(), ()).unwrap();
        second.read_texture(a).unwrap();
        second.write_color(b, 0).unwrap();
        let mut third = frame.add_pass("third", PassConfig::graphics(), ()).unwrap();
        third.read_texture(b).unwrap();

        let mut ctx = context();
        let report = frame.compile_and_execute(&mut ctx).unwrap();

        let timeline: Vec<_> = report
            .events()
            .iter()
            .map(|e| (e.kind, e.resource, e.step))
            .collect();
        assert_eq!(
            timeline,
            vec![
                (AllocationEventKind::Allocate, a, 0),
                (AllocationEventKind::Allocate, b, 1),
                (AllocationEventKind::Release, a, 1),
                (AllocationEventKind::Release, b, 2),
            ]
        );
        assert_ne!(report.allocation_of(a), report.allocation_of(b));
        assert_eq!(report.pool_stats().peak_live, 2);
    }

    #[test]
    fn test_no_callback_executes_as_noop() {
        let graph = FrameGraph::<Vec<String>>::new(GraphConfig::default().with_culling(false));
        let mut frame = graph.begin_frame();
        let id = frame.add_pass("empty", PassConfig::transfer(), ()).unwrap().id();

        let mut ctx = context();
        let report = frame.compile_and_execute(&mut ctx).unwrap();
        assert_eq!(report.executed(), &[id]);
        assert_eq!(report.pass_state(id), Some(PassState::Executed));
    }
}
