//! Frame graph compilation.
//!
//! This module turns the passes declared in a [`FrameBuilder`](crate::graph::FrameBuilder)
//! into an [`ExecutionPlan`]. It performs:
//!
//! 1. **Hazard analysis** - Derive edges from read/write intents (RAW, WAR)
//!    and reject write/write pairs that nothing orders
//! 2. **Topological Sort** - Order passes respecting every edge, keeping
//!    declaration order between independent passes
//! 3. **Cycle Detection** - Validate the graph is a DAG
//! 4. **Culling** - Drop passes whose outputs nobody consumes
//! 5. **Liveness** - Compute the first and last use of every transient
//!
//! # Example
//!
//! ```ignore
//! let mut frame = graph.begin_frame();
//! let depth = frame.declare_texture("depth", depth_desc)?;
//! let mut prepass = frame.add_pass("prepass", PassConfig::graphics(), ())?;
//! prepass.write_depth(depth, DepthAccess::Write)?;
//! prepass.set_execute_callback(|_, _, _| Ok(()));
//!
//! let plan = frame.compile()?;
//! // plan.pass_order() returns the kept passes in execution order
//! ```

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};

use crate::error::{GraphError, Result};
use crate::graph::{PassDecl, PassId, ResourceHandle, ResourceRegistry};
use crate::GraphConfig;

/// Why one pass must run before another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// The later pass reads what the earlier pass wrote.
    ReadAfterWrite(ResourceHandle),
    /// The later pass overwrites what the earlier pass read.
    WriteAfterRead(ResourceHandle),
    /// Both passes write the resource and were already ordered by another path.
    WriteAfterWrite(ResourceHandle),
    /// Added with [`FrameBuilder::add_dependency`](crate::graph::FrameBuilder::add_dependency).
    Explicit,
}

/// A dependency edge: `from` runs before `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: PassId,
    pub to: PassId,
    pub kind: EdgeKind,
}

/// Lifecycle of a pass within one frame.
///
/// `Declared` → `Kept` | `Culled` → `Bound` → `Executed` | `Skipped`.
/// `Culled`, `Executed` and `Skipped` are terminal; nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassState {
    /// Recorded, not yet compiled.
    Declared,
    /// Survived compilation and is scheduled.
    Kept,
    /// Removed because none of its outputs are consumed.
    Culled,
    /// Resources resolved; callback about to run.
    Bound,
    /// Callback completed.
    Executed,
    /// Callback reported a [`PassError`](crate::error::PassError).
    Skipped,
}

impl PassState {
    /// Check if no further transition can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Culled | Self::Executed | Self::Skipped)
    }
}

/// Resource lifetime in terms of compiled step indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLifetime {
    /// Step of the first kept pass touching the resource.
    pub first_use: usize,
    /// Step of the last kept pass touching the resource.
    pub last_use: usize,
}

impl ResourceLifetime {
    /// Check if the resource must be resident at `step`.
    pub fn contains(&self, step: usize) -> bool {
        step >= self.first_use && step <= self.last_use
    }

    /// Check if two intervals share at least one step.
    pub fn overlaps(&self, other: &ResourceLifetime) -> bool {
        self.first_use <= other.last_use && other.first_use <= self.last_use
    }
}

/// A compiled frame ready for execution.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Kept passes in execution order.
    pass_order: Vec<PassId>,
    /// Culled passes in declaration order.
    culled: Vec<PassId>,
    /// Compile-time state per declared pass.
    states: Vec<PassState>,
    edges: Vec<Edge>,
    /// Liveness of each transient, indexed by resource index.
    lifetimes: Vec<Option<ResourceLifetime>>,
    /// Transients first used at each step.
    allocations: Vec<Vec<ResourceHandle>>,
    /// Transients last used at each step.
    releases: Vec<Vec<ResourceHandle>>,
}

impl ExecutionPlan {
    /// Kept passes in execution order.
    pub fn pass_order(&self) -> &[PassId] {
        &self.pass_order
    }

    /// Culled passes in declaration order.
    pub fn culled(&self) -> &[PassId] {
        &self.culled
    }

    /// All dependency edges, including edges touching culled passes.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Liveness of a transient resource. `None` for imported resources and
    /// for transients only used by culled passes.
    pub fn lifetime(&self, resource: ResourceHandle) -> Option<ResourceLifetime> {
        self.lifetimes.get(resource.index()).copied().flatten()
    }

    /// Transients that must be allocated before running `step`.
    pub fn allocations_before(&self, step: usize) -> &[ResourceHandle] {
        self.allocations.get(step).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Transients that can be released after running `step`.
    pub fn releases_after(&self, step: usize) -> &[ResourceHandle] {
        self.releases.get(step).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check if a transient is resident at `step`.
    pub fn is_resource_alive(&self, resource: ResourceHandle, step: usize) -> bool {
        self.lifetime(resource)
            .is_some_and(|lifetime| lifetime.contains(step))
    }

    /// Compile-time state of a pass (`Kept` or `Culled`).
    pub fn pass_state(&self, pass: PassId) -> Option<PassState> {
        self.states.get(pass.index()).copied()
    }

    /// Position of a kept pass in the execution order.
    pub fn step_of(&self, pass: PassId) -> Option<usize> {
        self.pass_order.iter().position(|&p| p == pass)
    }

    /// Number of passes that will execute.
    pub fn pass_count(&self) -> usize {
        self.pass_order.len()
    }

    /// Number of passes that were declared.
    pub fn declared_count(&self) -> usize {
        self.states.len()
    }

    /// Check if no pass will execute.
    pub fn is_empty(&self) -> bool {
        self.pass_order.is_empty()
    }
}

/// Per-resource tracking while walking passes in declaration order.
#[derive(Debug, Default, Clone)]
struct ResourceState {
    last_writer: Option<usize>,
    /// Readers since `last_writer`.
    readers: Vec<usize>,
}

/// A write that follows another write with no read in between.
struct PendingWrite {
    resource: ResourceHandle,
    first: usize,
    second: usize,
}

/// Edge set with adjacency lists and (from, to) deduplication.
#[derive(Default)]
struct EdgeSet {
    edges: Vec<Edge>,
    seen: HashSet<(usize, usize)>,
    successors: Vec<Vec<usize>>,
}

impl EdgeSet {
    fn new(pass_count: usize) -> Self {
        Self {
            successors: vec![Vec::new(); pass_count],
            ..Self::default()
        }
    }

    fn add(&mut self, from: usize, to: usize, kind: EdgeKind) {
        if from == to || !self.seen.insert((from, to)) {
            return;
        }
        self.successors[from].push(to);
        self.edges.push(Edge {
            from: PassId::new(from as u32),
            to: PassId::new(to as u32),
            kind,
        });
    }

    fn reaches(&self, from: usize, to: usize) -> bool {
        let mut visited = vec![false; self.successors.len()];
        let mut queue = VecDeque::from([from]);
        visited[from] = true;
        while let Some(node) = queue.pop_front() {
            for &next in &self.successors[node] {
                if next == to {
                    return true;
                }
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
        false
    }
}

/// Compile declared passes into an execution plan.
///
/// `explicit_edges` holds `(dependent, dependency)` pairs, matching
/// [`FrameBuilder::add_dependency`](crate::graph::FrameBuilder::add_dependency).
///
/// # Errors
///
/// * [`GraphError::UninitializedRead`] - a transient is read before any
///   write. A `ReadWrite` first access counts as a read, so a pass that
///   accumulates into a fresh transient needs a clearing pass before it.
/// * [`GraphError::UnknownPass`] / [`GraphError::SelfDependency`] - bad explicit edge
/// * [`GraphError::UnorderedWrites`] - two writes with no ordering path
/// * [`GraphError::GraphCycle`] - the edges form a cycle
pub fn compile(
    passes: &[PassDecl],
    registry: &ResourceRegistry,
    explicit_edges: &[(PassId, PassId)],
    config: &GraphConfig,
) -> Result<ExecutionPlan> {
    let n = passes.len();
    let mut edges = EdgeSet::new(n);
    let mut resources = vec![ResourceState::default(); registry.len()];
    let mut pending_writes = Vec::new();
    // Writers each pass read from, one entry per read.
    let mut producers: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut consumers = vec![0u32; n];

    for (p, pass) in passes.iter().enumerate() {
        for access in pass.accesses() {
            let resource = registry.resolve(access.resource)?;
            let state = &mut resources[access.resource.index()];

            if access.is_read() {
                match state.last_writer {
                    Some(writer) => {
                        edges.add(writer, p, EdgeKind::ReadAfterWrite(access.resource));
                        producers[p].push(writer);
                        consumers[writer] += 1;
                    }
                    None if resource.is_transient() => {
                        return Err(GraphError::UninitializedRead {
                            resource: resource.name().to_string(),
                            pass: pass.name().to_string(),
                        });
                    }
                    None => {}
                }
                if !access.is_write() {
                    state.readers.push(p);
                }
            }

            if access.is_write() {
                for &reader in &state.readers {
                    edges.add(reader, p, EdgeKind::WriteAfterRead(access.resource));
                }
                if let Some(writer) = state.last_writer {
                    if !access.is_read() && state.readers.is_empty() {
                        pending_writes.push(PendingWrite {
                            resource: access.resource,
                            first: writer,
                            second: p,
                        });
                    }
                }
                state.last_writer = Some(p);
                state.readers.clear();
                // A read-modify-write still has to finish before the next writer
                if access.is_read() {
                    state.readers.push(p);
                }

                if resource.is_imported() {
                    consumers[p] += 1;
                }
            }
        }
    }

    for &(dependent, dependency) in explicit_edges {
        if dependent.index() >= n {
            return Err(GraphError::UnknownPass(dependent));
        }
        if dependency.index() >= n {
            return Err(GraphError::UnknownPass(dependency));
        }
        if dependent == dependency {
            return Err(GraphError::SelfDependency(dependent));
        }
        edges.add(dependency.index(), dependent.index(), EdgeKind::Explicit);
    }

    for write in &pending_writes {
        if !edges.reaches(write.first, write.second) {
            return Err(GraphError::UnorderedWrites {
                resource: registry.name(write.resource).to_string(),
                first: passes[write.first].name().to_string(),
                second: passes[write.second].name().to_string(),
            });
        }
        edges.add(
            write.first,
            write.second,
            EdgeKind::WriteAfterWrite(write.resource),
        );
    }

    let order = topological_order(passes, &edges)?;

    let mut kept = vec![true; n];
    if config.enable_culling {
        cull(passes, &producers, &mut consumers, &mut kept);
    }

    let pass_order: Vec<PassId> = order
        .iter()
        .filter(|&&p| kept[p])
        .map(|&p| passes[p].id())
        .collect();
    let culled: Vec<PassId> = passes
        .iter()
        .filter(|pass| !kept[pass.id().index()])
        .map(PassDecl::id)
        .collect();
    let states = kept
        .iter()
        .map(|&k| if k { PassState::Kept } else { PassState::Culled })
        .collect();

    let (lifetimes, allocations, releases) = compute_liveness(passes, registry, &pass_order);

    log::debug!(
        "compiled frame graph: {} passes kept, {} culled, {} edges",
        pass_order.len(),
        culled.len(),
        edges.edges.len()
    );

    Ok(ExecutionPlan {
        pass_order,
        culled,
        states,
        edges: edges.edges,
        lifetimes,
        allocations,
        releases,
    })
}

/// Kahn's algorithm with a min-heap ready set, so independent passes keep
/// declaration order.
fn topological_order(passes: &[PassDecl], edges: &EdgeSet) -> Result<Vec<usize>> {
    let n = passes.len();
    let mut in_degree = vec![0u32; n];
    for edge in &edges.edges {
        in_degree[edge.to.index()] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&p| in_degree[p] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(n);

    while let Some(Reverse(p)) = ready.pop() {
        order.push(p);
        for &next in &edges.successors[p] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() != n {
        let remaining: Vec<bool> = in_degree.iter().map(|&d| d > 0).collect();
        let passes = cycle_members(edges, remaining)
            .into_iter()
            .map(|p| passes[p].name().to_string())
            .collect();
        return Err(GraphError::GraphCycle { passes });
    }

    Ok(order)
}

/// Strip passes that merely hang off a cycle (no remaining successor),
/// leaving the passes that take part in one.
fn cycle_members(edges: &EdgeSet, mut remaining: Vec<bool>) -> Vec<usize> {
    loop {
        let sinks: Vec<usize> = (0..remaining.len())
            .filter(|&p| remaining[p] && !edges.successors[p].iter().any(|&s| remaining[s]))
            .collect();
        if sinks.is_empty() {
            break;
        }
        for p in sinks {
            remaining[p] = false;
        }
    }
    (0..remaining.len()).filter(|&p| remaining[p]).collect()
}

/// Cascading reference-count culling.
fn cull(passes: &[PassDecl], producers: &[Vec<usize>], consumers: &mut [u32], kept: &mut [bool]) {
    let mut worklist: Vec<usize> = (0..passes.len())
        .rev()
        .filter(|&p| passes[p].allows_culling() && consumers[p] == 0)
        .collect();

    while let Some(p) = worklist.pop() {
        if !kept[p] {
            continue;
        }
        kept[p] = false;
        log::debug!("culling pass '{}': no consumers", passes[p].name());

        for &producer in &producers[p] {
            consumers[producer] -= 1;
            if consumers[producer] == 0 && kept[producer] && passes[producer].allows_culling() {
                worklist.push(producer);
            }
        }
    }
}

type Liveness = (
    Vec<Option<ResourceLifetime>>,
    Vec<Vec<ResourceHandle>>,
    Vec<Vec<ResourceHandle>>,
);

fn compute_liveness(
    passes: &[PassDecl],
    registry: &ResourceRegistry,
    pass_order: &[PassId],
) -> Liveness {
    let mut lifetimes: Vec<Option<ResourceLifetime>> = vec![None; registry.len()];
    let mut touched: Vec<ResourceHandle> = Vec::new();

    for (step, pass) in pass_order.iter().enumerate() {
        for access in passes[pass.index()].accesses() {
            let transient = registry
                .get(access.resource)
                .is_some_and(|resource| resource.is_transient());
            if !transient {
                continue;
            }
            let index = access.resource.index();
            if let Some(lifetime) = &mut lifetimes[index] {
                lifetime.last_use = step;
            } else {
                lifetimes[index] = Some(ResourceLifetime {
                    first_use: step,
                    last_use: step,
                });
                touched.push(access.resource);
            }
        }
    }

    let mut allocations = vec![Vec::new(); pass_order.len()];
    let mut releases = vec![Vec::new(); pass_order.len()];
    for handle in touched {
        if let Some(lifetime) = lifetimes[handle.index()] {
            allocations[lifetime.first_use].push(handle);
            releases[lifetime.last_use].push(handle);
            log::trace!(
                "'{}' live over steps {}..={}",
                registry.name(handle),
                lifetime.first_use,
                lifetime.last_use
            );
        }
    }

    (lifetimes, allocations, releases)
}
