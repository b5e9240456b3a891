//! Frame graph declaration.
//!
//! A frame is described in three phases:
//!
//! | Phase | Entry point | Result |
//! |-------|-------------|--------|
//! | Declare | [`FrameGraph::begin_frame`], [`FrameBuilder::add_pass`] | Passes with resource intents |
//! | Compile | [`FrameBuilder::compile`] | [`ExecutionPlan`] |
//! | Execute | [`FrameBuilder::execute`] | [`ExecutionReport`] |
//!
//! [`FrameGraph`] only carries configuration and the registered pass recipes;
//! every frame gets a fresh [`FrameBuilder`] and transient pool, so nothing
//! mutable survives from one frame to the next.
//!
//! # Example
//!
//! ```ignore
//! let graph = FrameGraph::new(GraphConfig::default());
//! let mut frame = graph.begin_frame();
//!
//! let backbuffer = frame.import_texture("backbuffer", swapchain_image, backbuffer_desc)?;
//! let depth = frame.declare_texture("depth", depth_desc)?;
//!
//! let mut prepass = frame.add_pass("depth_prepass", PassConfig::graphics(), ())?;
//! prepass.write_depth(depth, DepthAccess::Write)?;
//! prepass.set_execute_callback(|_, resources, ctx| Ok(()));
//!
//! let mut forward = frame.add_pass("forward", PassConfig::graphics(), meshes)?;
//! forward.write_depth(depth, DepthAccess::Read)?;
//! forward.write_color(backbuffer, 0)?;
//! forward.set_execute_callback(|meshes, resources, ctx| Ok(()));
//!
//! let report = frame.compile_and_execute(&mut ctx)?;
//! ```

mod pass;
mod registry;
mod resource;

pub use pass::{Orientation, PassBuilder, PassConfig, PassDecl, PassId, PassKind};
pub(crate) use pass::ExecuteFn;
pub use registry::ResourceRegistry;
pub use resource::{
    AccessMode, DepthAccess, ExternalResource, ResourceAccess, ResourceHandle, ResourceOrigin,
    ResourceUsage, VirtualResource,
};

use crate::compiler::{self, ExecutionPlan};
use crate::error::{GraphError, Result};
use crate::frame::{FrameContext, FrameSettings};
use crate::pipeline::{PassRecipe, PassRegistry};
use crate::scheduler::{ExecutionReport, Scheduler};
use crate::types::{
    BufferDescriptor, ResourceDescriptor, TextureDescriptor, TextureFormat, TextureSize,
    TextureUsage,
};
use crate::GraphConfig;

/// Long-lived frame graph: configuration plus registered pass recipes.
pub struct FrameGraph<R> {
    config: GraphConfig,
    recipes: PassRegistry<R>,
}

impl<R: 'static> FrameGraph<R> {
    /// Create a frame graph with no registered recipes.
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            recipes: PassRegistry::new(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Register a pass recipe declared on every [`record_frame`](Self::record_frame).
    pub fn register(&mut self, recipe: impl PassRecipe<R> + 'static) -> Result<()> {
        self.recipes.register(recipe)
    }

    /// Get the registered recipes.
    pub fn recipes(&self) -> &PassRegistry<R> {
        &self.recipes
    }

    /// Start declaring a frame with default settings.
    pub fn begin_frame(&self) -> FrameBuilder<R> {
        self.begin_frame_with(FrameSettings::default())
    }

    /// Start declaring a frame.
    pub fn begin_frame_with(&self, settings: FrameSettings) -> FrameBuilder<R> {
        FrameBuilder::new(self.config.clone(), settings)
    }

    /// Start a frame and declare every registered recipe into it.
    pub fn record_frame(&self, settings: FrameSettings) -> Result<FrameBuilder<R>> {
        let mut frame = self.begin_frame_with(settings);
        self.recipes.record_frame(&mut frame, &settings)?;
        Ok(frame)
    }
}

/// Declaration scope of a single frame.
///
/// Holds the resource registry, the pass declarations and their deferred
/// callbacks. [`compile`](Self::compile) closes the scope: every declaration
/// call afterwards fails with [`GraphError::DeclarationClosed`].
pub struct FrameBuilder<R> {
    config: GraphConfig,
    settings: FrameSettings,
    registry: ResourceRegistry,
    decls: Vec<PassDecl>,
    callbacks: Vec<Option<ExecuteFn<R>>>,
    /// Explicit edges as (dependent, dependency).
    explicit_edges: Vec<(PassId, PassId)>,
    closed: bool,
}

impl<R: 'static> FrameBuilder<R> {
    fn new(config: GraphConfig, settings: FrameSettings) -> Self {
        Self {
            config,
            settings,
            registry: ResourceRegistry::new(),
            decls: Vec::new(),
            callbacks: Vec::new(),
            explicit_edges: Vec::new(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(GraphError::DeclarationClosed);
        }
        Ok(())
    }

    /// Get the frame settings.
    pub fn settings(&self) -> &FrameSettings {
        &self.settings
    }

    /// Get the resource registry.
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Get the declared passes.
    pub fn passes(&self) -> &[PassDecl] {
        &self.decls
    }

    /// Check if [`compile`](Self::compile) has closed the declaration scope.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Declare a transient resource.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        desc: impl Into<ResourceDescriptor>,
    ) -> Result<ResourceHandle> {
        self.ensure_open()?;
        self.registry.declare(name, desc)
    }

    /// Declare a transient texture.
    pub fn declare_texture(
        &mut self,
        name: impl Into<String>,
        desc: TextureDescriptor,
    ) -> Result<ResourceHandle> {
        self.declare(name, desc)
    }

    /// Declare a transient 2D texture sized relative to the screen.
    ///
    /// The sample count comes from the frame settings.
    pub fn declare_texture_relative(
        &mut self,
        name: impl Into<String>,
        size: TextureSize,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Result<ResourceHandle> {
        let (width, height) = self.settings.resolve(size);
        let desc = TextureDescriptor::new_2d(width, height, format, usage)
            .with_sample_count(self.settings.sample_count);
        self.declare(name, desc)
    }

    /// Declare a transient buffer.
    pub fn declare_buffer(
        &mut self,
        name: impl Into<String>,
        desc: BufferDescriptor,
    ) -> Result<ResourceHandle> {
        self.declare(name, desc)
    }

    /// Import a caller-owned resource, valid for the whole frame.
    pub fn import(
        &mut self,
        name: impl Into<String>,
        external: ExternalResource,
        desc: impl Into<ResourceDescriptor>,
    ) -> Result<ResourceHandle> {
        self.ensure_open()?;
        self.registry.import(name, external, desc)
    }

    /// Import a caller-owned texture.
    pub fn import_texture(
        &mut self,
        name: impl Into<String>,
        external: ExternalResource,
        desc: TextureDescriptor,
    ) -> Result<ResourceHandle> {
        self.import(name, external, desc)
    }

    /// Import a caller-owned buffer.
    pub fn import_buffer(
        &mut self,
        name: impl Into<String>,
        external: ExternalResource,
        desc: BufferDescriptor,
    ) -> Result<ResourceHandle> {
        self.import(name, external, desc)
    }

    /// Look up an imported resource by name.
    pub fn imported(&self, name: &str) -> Option<ResourceHandle> {
        self.registry.imported(name)
    }

    /// Add a pass and start declaring its intents.
    ///
    /// `payload` is moved into the pass's execute callback once
    /// [`PassBuilder::set_execute_callback`] is called.
    pub fn add_pass<T: 'static>(
        &mut self,
        name: impl Into<String>,
        config: PassConfig,
        payload: T,
    ) -> Result<PassBuilder<'_, R, T>> {
        self.ensure_open()?;
        let id = PassId::new(self.decls.len() as u32);
        let name = name.into();
        log::trace!("declared pass '{}' ({:?})", name, config.kind);
        self.decls.push(PassDecl::new(id, name, config));
        self.callbacks.push(None);
        Ok(PassBuilder::new(self, id, payload))
    }

    /// Make `dependent` run after `dependency`, whatever their resource usage.
    pub fn add_dependency(&mut self, dependent: PassId, dependency: PassId) -> Result<()> {
        self.ensure_open()?;
        for pass in [dependent, dependency] {
            if pass.index() >= self.decls.len() {
                return Err(GraphError::UnknownPass(pass));
            }
        }
        if dependent == dependency {
            return Err(GraphError::SelfDependency(dependent));
        }
        self.explicit_edges.push((dependent, dependency));
        Ok(())
    }

    /// Compile the declared passes and close the declaration scope.
    ///
    /// The scope stays closed even if compilation fails; a failed frame
    /// should be discarded.
    pub fn compile(&mut self) -> Result<ExecutionPlan> {
        self.ensure_open()?;
        self.closed = true;
        compiler::compile(&self.decls, &self.registry, &self.explicit_edges, &self.config)
    }

    /// Execute a plan produced by [`compile`](Self::compile) on this frame.
    ///
    /// Fails with [`GraphError::PlanMismatch`] if the plan was compiled from
    /// a frame with a different number of passes.
    pub fn execute(
        mut self,
        plan: &ExecutionPlan,
        ctx: &mut FrameContext<R>,
    ) -> Result<ExecutionReport> {
        if plan.declared_count() != self.decls.len() {
            return Err(GraphError::PlanMismatch {
                planned: plan.declared_count(),
                declared: self.decls.len(),
            });
        }
        Scheduler::new(&self.config).execute(
            plan,
            &self.decls,
            &mut self.callbacks,
            &self.registry,
            ctx,
        )
    }

    /// Compile and execute in one step.
    pub fn compile_and_execute(mut self, ctx: &mut FrameContext<R>) -> Result<ExecutionReport> {
        let plan = self.compile()?;
        self.execute(&plan, ctx)
    }

    /// Drop a partially declared frame without running anything.
    pub fn discard(self) {
        log::warn!("discarding frame with {} declared passes", self.decls.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferUsage, TextureFormat};

    fn graph() -> FrameGraph<()> {
        FrameGraph::new(GraphConfig::default())
    }

    #[test]
    fn test_declaration_closed_after_compile() {
        let graph = graph();
        let mut frame = graph.begin_frame();
        let lights = frame
            .declare_buffer("lights", BufferDescriptor::new(4096, BufferUsage::STORAGE))
            .unwrap();
        let pass = frame.add_pass("cull_lights", PassConfig::compute(), ()).unwrap().id();
        frame.compile().unwrap();

        assert!(frame.is_closed());
        assert_eq!(
            frame
                .declare_buffer("late", BufferDescriptor::new(4, BufferUsage::UNIFORM))
                .unwrap_err(),
            GraphError::DeclarationClosed
        );
        assert_eq!(
            frame.add_pass("late", PassConfig::compute(), ()).err(),
            Some(GraphError::DeclarationClosed)
        );
        assert_eq!(
            frame.add_dependency(pass, pass).unwrap_err(),
            GraphError::DeclarationClosed
        );
        assert_eq!(frame.compile().unwrap_err(), GraphError::DeclarationClosed);
        assert_eq!(frame.registry().len(), 1);
        assert!(frame.registry().get(lights).is_some());
    }

    #[test]
    fn test_add_dependency_validates_passes() {
        let graph = graph();
        let mut frame = graph.begin_frame();
        let a = frame.add_pass("a", PassConfig::graphics(), ()).unwrap().id();
        let foreign = PassId::new(7);

        assert_eq!(
            frame.add_dependency(a, foreign).unwrap_err(),
            GraphError::UnknownPass(foreign)
        );
        assert_eq!(
            frame.add_dependency(a, a).unwrap_err(),
            GraphError::SelfDependency(a)
        );
    }

    #[test]
    fn test_execute_rejects_foreign_plan() {
        let graph = graph();
        let mut first = graph.begin_frame();
        first.add_pass("a", PassConfig::compute().with_culling(false), ()).unwrap();
        first.add_pass("b", PassConfig::compute().with_culling(false), ()).unwrap();
        let plan = first.compile().unwrap();

        let mut second = graph.begin_frame();
        second.add_pass("a", PassConfig::compute().with_culling(false), ()).unwrap();
        let mut ctx = FrameContext::new(0, FrameSettings::default(), ());
        assert_eq!(
            second.execute(&plan, &mut ctx).unwrap_err(),
            GraphError::PlanMismatch {
                planned: 2,
                declared: 1,
            }
        );
    }

    #[test]
    fn test_declare_texture_relative() {
        let graph = graph();
        let mut frame =
            graph.begin_frame_with(FrameSettings::new(1920, 1080).with_sample_count(4));
        let half = frame
            .declare_texture_relative(
                "half_res",
                TextureSize::Relative {
                    width_scale: 0.5,
                    height_scale: 0.5,
                },
                TextureFormat::Rgba16Float,
                TextureUsage::RENDER_ATTACHMENT,
            )
            .unwrap();

        let desc = frame.registry().descriptor(half).unwrap().as_texture().unwrap();
        assert_eq!(desc.size.width, 960);
        assert_eq!(desc.size.height, 540);
        assert_eq!(desc.sample_count, 4);
    }

    #[test]
    fn test_pass_builder_validates_kind() {
        let graph = graph();
        let mut frame = graph.begin_frame();
        let lights = frame
            .declare_buffer("lights", BufferDescriptor::new(64, BufferUsage::UNIFORM))
            .unwrap();

        let mut pass = frame.add_pass("shade", PassConfig::graphics(), ()).unwrap();
        let err = pass.read_texture(lights).unwrap_err();
        assert!(matches!(err, GraphError::ResourceKindMismatch { .. }));
        assert!(pass.read_buffer(lights).is_ok());
    }

    #[test]
    fn test_create_texture_records_write() {
        let graph = graph();
        let mut frame = graph.begin_frame();
        let mut pass = frame.add_pass("gbuffer", PassConfig::graphics(), ()).unwrap();
        let albedo = pass
            .create_texture(
                "albedo",
                TextureDescriptor::new_2d(
                    1280,
                    720,
                    TextureFormat::Rgba8Unorm,
                    TextureUsage::RENDER_ATTACHMENT,
                ),
            )
            .unwrap();
        let id = pass.id();

        let decl = &frame.passes()[id.index()];
        assert!(decl.writes_resource(albedo));
        assert_eq!(frame.registry().get(albedo).unwrap().creator(), Some(id));
    }

    #[test]
    fn test_record_frame_with_recipes() {
        struct Clear;

        impl PassRecipe<()> for Clear {
            fn name(&self) -> &str {
                "clear"
            }

            fn declare(
                &self,
                frame: &mut FrameBuilder<()>,
                _settings: &FrameSettings,
            ) -> Result<()> {
                frame
                    .add_pass("clear", PassConfig::transfer().with_culling(false), ())?
                    .set_execute_callback(|_, _, _| Ok(()));
                Ok(())
            }
        }

        let mut graph = graph();
        graph.register(Clear).unwrap();
        assert_eq!(
            graph.register(Clear).unwrap_err(),
            GraphError::DuplicatePass("clear".into())
        );

        let frame = graph.record_frame(FrameSettings::default()).unwrap();
        assert_eq!(frame.passes().len(), 1);
        frame.discard();
    }
}
