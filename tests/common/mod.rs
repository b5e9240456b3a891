//! Common utilities for frame graph integration tests.
//!
//! Passes record into a [`Recorder`] (a list of strings) so tests can check
//! which callbacks ran and in what order.

#![allow(dead_code)]

use frame_graph::{
    BufferDescriptor, BufferUsage, ExternalResource, FrameContext, FrameGraph, FrameSettings,
    GraphConfig, PassError, PassResources, TextureDescriptor, TextureFormat, TextureUsage,
};

/// Command recorder stand-in.
pub type Recorder = Vec<String>;

/// Install a test logger once per process.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Create a frame graph recording into a [`Recorder`].
pub fn graph(config: GraphConfig) -> FrameGraph<Recorder> {
    init_logging();
    FrameGraph::new(config)
}

/// Create a frame context for frame `index`.
pub fn context(index: u64) -> FrameContext<Recorder> {
    FrameContext::new(index, FrameSettings::new(1920, 1080), Vec::new())
}

/// Callback that records the pass name.
pub fn record_pass<T>(
) -> impl FnMut(&T, &PassResources, &mut FrameContext<Recorder>) -> Result<(), PassError> {
    |_, resources, ctx| {
        ctx.recorder_mut().push(resources.pass_name().to_string());
        Ok(())
    }
}

// ============================================================================
// Descriptors
// ============================================================================

pub fn depth_desc() -> TextureDescriptor {
    TextureDescriptor::new_2d(
        1920,
        1080,
        TextureFormat::Depth32Float,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
    )
}

pub fn hdr_desc() -> TextureDescriptor {
    TextureDescriptor::new_2d(
        1920,
        1080,
        TextureFormat::Rgba16Float,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
    )
}

pub fn half_res_desc() -> TextureDescriptor {
    TextureDescriptor::new_2d(
        960,
        540,
        TextureFormat::Rgba16Float,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
    )
}

pub fn backbuffer_desc() -> TextureDescriptor {
    TextureDescriptor::new_2d(
        1920,
        1080,
        TextureFormat::Bgra8UnormSrgb,
        TextureUsage::RENDER_ATTACHMENT,
    )
}

pub fn storage_buffer(size: u64) -> BufferDescriptor {
    BufferDescriptor::new(size, BufferUsage::STORAGE)
}

/// External id used for the swapchain image in tests.
pub const SWAPCHAIN: ExternalResource = ExternalResource(0xB0B);
