//! Pass declarations and the per-pass builder.

use crate::error::{PassError, Result};
use crate::frame::FrameContext;
use crate::scheduler::PassResources;
use crate::types::{BufferDescriptor, ResourceKind, TextureDescriptor};

use super::resource::{AccessMode, DepthAccess, ResourceAccess, ResourceHandle, ResourceUsage};
use super::FrameBuilder;

/// Handle to a pass in the frame graph.
///
/// `PassId` is `Copy` and cheap to pass around. It is only valid within
/// the frame that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(u32);

impl PassId {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Declaration index of this pass.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type of pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassKind {
    /// Raster work (vertex/fragment shaders).
    #[default]
    Graphics,
    /// Compute dispatches.
    Compute,
    /// Copies and uploads.
    Transfer,
}

/// Vertical orientation correction applied by a pass.
///
/// The graph never derives this from platform state; the caller decides per
/// pass and the callback reads it back from [`PassResources::orientation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Render in the target's native orientation.
    #[default]
    Native,
    /// Flip the Y axis (e.g. rendering into a texture that is later sampled upside down).
    FlipY,
}

impl Orientation {
    /// Sign to multiply clip-space Y by.
    pub fn y_sign(self) -> f32 {
        match self {
            Self::Native => 1.0,
            Self::FlipY => -1.0,
        }
    }
}

/// Configuration supplied when adding a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassConfig {
    /// Type of work the pass records.
    pub kind: PassKind,
    /// Whether the pass may be dropped when nothing consumes its outputs.
    pub allow_culling: bool,
    /// Y orientation policy handed to the callback.
    pub orientation: Orientation,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            kind: PassKind::Graphics,
            allow_culling: true,
            orientation: Orientation::Native,
        }
    }
}

impl PassConfig {
    /// Graphics pass with default settings.
    pub fn graphics() -> Self {
        Self::default()
    }

    /// Compute pass with default settings.
    pub fn compute() -> Self {
        Self {
            kind: PassKind::Compute,
            ..Self::default()
        }
    }

    /// Transfer pass with default settings.
    pub fn transfer() -> Self {
        Self {
            kind: PassKind::Transfer,
            ..Self::default()
        }
    }

    /// Set whether the pass may be culled.
    pub fn with_culling(mut self, allow: bool) -> Self {
        self.allow_culling = allow;
        self
    }

    /// Set the orientation policy.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }
}

/// The recorded declaration of a pass: everything the compiler looks at.
#[derive(Debug, Clone)]
pub struct PassDecl {
    pub(crate) id: PassId,
    pub(crate) name: String,
    pub(crate) config: PassConfig,
    pub(crate) accesses: Vec<ResourceAccess>,
}

impl PassDecl {
    pub(crate) fn new(id: PassId, name: String, config: PassConfig) -> Self {
        Self {
            id,
            name,
            config,
            accesses: Vec::new(),
        }
    }

    /// Get the pass id.
    pub fn id(&self) -> PassId {
        self.id
    }

    /// Get the pass name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pass configuration.
    pub fn config(&self) -> &PassConfig {
        &self.config
    }

    /// Declared accesses, in declaration order.
    pub fn accesses(&self) -> &[ResourceAccess] {
        &self.accesses
    }

    /// Check if the pass may be culled.
    pub fn allows_culling(&self) -> bool {
        self.config.allow_culling
    }

    pub fn reads_resource(&self, resource: ResourceHandle) -> bool {
        self.accesses
            .iter()
            .any(|a| a.resource == resource && a.is_read())
    }

    pub fn writes_resource(&self, resource: ResourceHandle) -> bool {
        self.accesses
            .iter()
            .any(|a| a.resource == resource && a.is_write())
    }

    fn record(&mut self, resource: ResourceHandle, mode: AccessMode, usage: ResourceUsage) {
        if let Some(existing) = self.accesses.iter_mut().find(|a| a.resource == resource) {
            existing.mode = existing.mode.merge(mode);
            if mode.writes() {
                existing.usage = usage;
            }
        } else {
            self.accesses.push(ResourceAccess {
                resource,
                mode,
                usage,
            });
        }
    }
}

/// Deferred pass body, invoked by the scheduler with resolved bindings.
pub(crate) type ExecuteFn<R> =
    Box<dyn FnMut(&PassResources, &mut FrameContext<R>) -> std::result::Result<(), PassError>>;

/// Declaration surface for a single pass.
///
/// Obtained from [`FrameBuilder::add_pass`]. Every intent is recorded against
/// this pass immediately; [`set_execute_callback`](Self::set_execute_callback)
/// finishes the declaration by moving the payload into the deferred body.
///
/// ```ignore
/// let mut pass = frame.add_pass("lighting", PassConfig::graphics(), LightingData { exposure })?;
/// pass.read_texture(depth)?;
/// pass.write_color(hdr, 0)?;
/// pass.set_execute_callback(|data, resources, ctx| {
///     ctx.recorder_mut().draw_fullscreen(resources.physical(hdr), data.exposure);
///     Ok(())
/// });
/// ```
pub struct PassBuilder<'a, R, T> {
    frame: &'a mut FrameBuilder<R>,
    id: PassId,
    payload: T,
}

impl<'a, R: 'static, T: 'static> PassBuilder<'a, R, T> {
    pub(crate) fn new(frame: &'a mut FrameBuilder<R>, id: PassId, payload: T) -> Self {
        Self { frame, id, payload }
    }

    /// Id of the pass being declared, for explicit dependencies.
    pub fn id(&self) -> PassId {
        self.id
    }

    /// The payload captured for this pass.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Mutable access to the payload while still declaring.
    pub fn payload_mut(&mut self) -> &mut T {
        &mut self.payload
    }

    /// Sample a texture.
    pub fn read_texture(&mut self, texture: ResourceHandle) -> Result<ResourceHandle> {
        self.use_resource(
            texture,
            ResourceKind::Texture,
            AccessMode::Read,
            ResourceUsage::SampledTexture,
        )
    }

    /// Render into a texture as the color attachment at `slot`.
    pub fn write_color(&mut self, texture: ResourceHandle, slot: u32) -> Result<ResourceHandle> {
        self.use_resource(
            texture,
            ResourceKind::Texture,
            AccessMode::Write,
            ResourceUsage::ColorAttachment { slot },
        )
    }

    /// Bind a texture as the depth attachment.
    pub fn write_depth(
        &mut self,
        texture: ResourceHandle,
        mode: DepthAccess,
    ) -> Result<ResourceHandle> {
        let (access, usage) = ResourceUsage::depth(mode);
        self.use_resource(texture, ResourceKind::Texture, access, usage)
    }

    /// Read and write a storage texture.
    pub fn read_write_texture(&mut self, texture: ResourceHandle) -> Result<ResourceHandle> {
        self.use_resource(
            texture,
            ResourceKind::Texture,
            AccessMode::ReadWrite,
            ResourceUsage::StorageTexture,
        )
    }

    /// Read a buffer (uniform data).
    pub fn read_buffer(&mut self, buffer: ResourceHandle) -> Result<ResourceHandle> {
        self.use_resource(
            buffer,
            ResourceKind::Buffer,
            AccessMode::Read,
            ResourceUsage::UniformBuffer,
        )
    }

    /// Write a storage buffer.
    pub fn write_buffer(&mut self, buffer: ResourceHandle) -> Result<ResourceHandle> {
        self.use_resource(
            buffer,
            ResourceKind::Buffer,
            AccessMode::Write,
            ResourceUsage::StorageBuffer,
        )
    }

    /// Read and write a storage buffer.
    pub fn read_write_buffer(&mut self, buffer: ResourceHandle) -> Result<ResourceHandle> {
        self.use_resource(
            buffer,
            ResourceKind::Buffer,
            AccessMode::ReadWrite,
            ResourceUsage::StorageBuffer,
        )
    }

    /// Copy from a resource of either kind.
    pub fn copy_from(&mut self, resource: ResourceHandle) -> Result<ResourceHandle> {
        self.use_resource(
            resource,
            resource.kind(),
            AccessMode::Read,
            ResourceUsage::TransferSrc,
        )
    }

    /// Copy into a resource of either kind.
    pub fn copy_to(&mut self, resource: ResourceHandle) -> Result<ResourceHandle> {
        self.use_resource(
            resource,
            resource.kind(),
            AccessMode::Write,
            ResourceUsage::TransferDst,
        )
    }

    /// Record an arbitrary access.
    ///
    /// Accessing the same handle twice within one pass merges the modes, so a
    /// read followed by a write becomes [`AccessMode::ReadWrite`].
    pub fn use_resource(
        &mut self,
        resource: ResourceHandle,
        expected: ResourceKind,
        mode: AccessMode,
        usage: ResourceUsage,
    ) -> Result<ResourceHandle> {
        self.frame.ensure_open()?;
        self.frame.registry.resolve_kind(resource, expected)?;
        self.frame.decls[self.id.index()].record(resource, mode, usage);
        Ok(resource)
    }

    /// Declare a transient texture and write it from this pass.
    ///
    /// Depth formats are bound as a depth attachment, everything else as
    /// color attachment 0.
    pub fn create_texture(
        &mut self,
        name: impl Into<String>,
        desc: TextureDescriptor,
    ) -> Result<ResourceHandle> {
        self.frame.ensure_open()?;
        let (mode, usage) = if desc.format.is_depth_stencil() {
            ResourceUsage::depth(DepthAccess::Write)
        } else {
            (AccessMode::Write, ResourceUsage::ColorAttachment { slot: 0 })
        };
        let handle = self
            .frame
            .registry
            .declare_for_pass(name.into(), desc.into(), self.id)?;
        self.frame.decls[self.id.index()].record(handle, mode, usage);
        Ok(handle)
    }

    /// Declare a transient buffer and write it from this pass.
    pub fn create_buffer(
        &mut self,
        name: impl Into<String>,
        desc: BufferDescriptor,
    ) -> Result<ResourceHandle> {
        self.frame.ensure_open()?;
        let handle = self
            .frame
            .registry
            .declare_for_pass(name.into(), desc.into(), self.id)?;
        self.frame.decls[self.id.index()].record(
            handle,
            AccessMode::Write,
            ResourceUsage::StorageBuffer,
        );
        Ok(handle)
    }

    /// Set whether this pass may be culled when its outputs are unused.
    pub fn allow_culling(&mut self, allow: bool) -> Result<&mut Self> {
        self.frame.ensure_open()?;
        self.frame.decls[self.id.index()].config.allow_culling = allow;
        Ok(self)
    }

    /// Store the deferred body and finish declaring this pass.
    ///
    /// The body receives the payload, the physical bindings for every declared
    /// handle (in declaration order) and the frame context. It runs only if the
    /// pass survives culling.
    pub fn set_execute_callback<F>(self, mut callback: F) -> PassId
    where
        F: FnMut(&T, &PassResources, &mut FrameContext<R>) -> std::result::Result<(), PassError>
            + 'static,
    {
        let payload = self.payload;
        let body: ExecuteFn<R> =
            Box::new(move |resources, ctx| callback(&payload, resources, ctx));
        self.frame.callbacks[self.id.index()] = Some(body);
        self.id
    }
}
