//! # Frame Graph
//!
//! A declarative frame graph: passes declare what they read and write, the
//! graph works out the order, drops work nobody consumes, and hands out
//! pooled transient resources.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`FrameGraph`] / [`FrameBuilder`] - Per-frame declaration of resources and passes
//! - [`compiler`] - Hazard edges, stable topological order, culling, liveness
//! - [`scheduler`] - Execution with transient pooling and aliasing
//! - [`PassRegistry`] - Explicit startup registration of pass recipes
//!
//! The graph never touches a GPU API. Pass callbacks receive the resolved
//! bindings plus a caller-chosen recorder and do the real work there.
//!
//! ## Example
//!
//! ```ignore
//! use frame_graph::{FrameContext, FrameGraph, FrameSettings, GraphConfig, PassConfig};
//!
//! let graph = FrameGraph::new(GraphConfig::default());
//! let mut frame = graph.begin_frame();
//! let hdr = frame.declare_texture("hdr", hdr_desc)?;
//! let backbuffer = frame.import_texture("backbuffer", swapchain_image, backbuffer_desc)?;
//!
//! let mut lighting = frame.add_pass("lighting", PassConfig::graphics(), lights)?;
//! lighting.write_color(hdr, 0)?;
//! lighting.set_execute_callback(|lights, resources, ctx| Ok(()));
//!
//! let mut tonemap = frame.add_pass("tonemap", PassConfig::graphics(), ())?;
//! tonemap.read_texture(hdr)?;
//! tonemap.write_color(backbuffer, 0)?;
//! tonemap.set_execute_callback(|_, resources, ctx| Ok(()));
//!
//! let mut ctx = FrameContext::new(frame_index, FrameSettings::default(), encoder);
//! let report = frame.compile_and_execute(&mut ctx)?;
//! ```

pub mod compiler;
pub mod error;
pub mod frame;
pub mod graph;
pub mod pipeline;
pub mod scheduler;
pub mod types;

// Re-export main types for convenience
pub use compiler::{Edge, EdgeKind, ExecutionPlan, PassState, ResourceLifetime};
pub use error::{GraphError, PassError, Result};
pub use frame::{FrameContext, FrameSettings};
pub use graph::{
    AccessMode, DepthAccess, ExternalResource, FrameBuilder, FrameGraph, Orientation,
    PassBuilder, PassConfig, PassId, PassKind, ResourceHandle, ResourceUsage,
};
pub use pipeline::{PassRecipe, PassRegistry};
pub use scheduler::{
    AllocationEvent, AllocationEventKind, AllocationId, Binding, ExecutionReport,
    PassResources, PhysicalResource, PoolStats,
};
pub use types::{
    BufferDescriptor, BufferUsage, Extent3d, ResourceDescriptor, ResourceKind, TextureDescriptor,
    TextureFormat, TextureSize, TextureUsage,
};

/// Frame graph library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version.
///
/// Optional; the graph needs no global setup.
pub fn init() {
    log::info!("Frame Graph v{} initialized", VERSION);
}

/// Configuration shared by every frame of a [`FrameGraph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// Drop passes whose outputs nobody consumes
    pub enable_culling: bool,
    /// Let transients with equal descriptors share storage when their
    /// lifetimes do not overlap
    pub enable_aliasing: bool,
    /// Maximum number of transient allocations per frame
    pub max_transient_allocations: Option<usize>,
    /// Maximum bytes of transient storage per frame
    pub transient_memory_budget: Option<u64>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            enable_culling: true,
            enable_aliasing: true,
            max_transient_allocations: None,
            transient_memory_budget: None,
        }
    }
}

impl GraphConfig {
    pub fn with_culling(mut self, enabled: bool) -> Self {
        self.enable_culling = enabled;
        self
    }

    pub fn with_aliasing(mut self, enabled: bool) -> Self {
        self.enable_aliasing = enabled;
        self
    }

    pub fn with_max_transient_allocations(mut self, max: usize) -> Self {
        self.max_transient_allocations = Some(max);
        self
    }

    pub fn with_transient_memory_budget(mut self, bytes: u64) -> Self {
        self.transient_memory_budget = Some(bytes);
        self
    }
}
