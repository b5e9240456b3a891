//! Resource handles and access declarations for the frame graph.

use crate::types::{ResourceDescriptor, ResourceKind};

use super::PassId;

/// Handle to a logical resource in the frame graph.
///
/// `ResourceHandle` is `Copy` and cheap to pass around. It is only valid within
/// the frame that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle {
    /// Index into the registry.
    index: u32,
    /// Texture or buffer.
    kind: ResourceKind,
}

impl ResourceHandle {
    pub(crate) fn new(index: u32, kind: ResourceKind) -> Self {
        Self { index, kind }
    }

    /// Get the index of this resource within its frame.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Get the resource kind.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Check if this handle refers to a texture.
    pub fn is_texture(&self) -> bool {
        self.kind == ResourceKind::Texture
    }

    /// Check if this handle refers to a buffer.
    pub fn is_buffer(&self) -> bool {
        self.kind == ResourceKind::Buffer
    }
}

/// Identifier of a resource owned outside the graph (swapchain image, history
/// buffer...). The value is opaque to the graph and handed back to callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalResource(pub u64);

/// Who owns a resource's backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOrigin {
    /// Owned and pooled by the graph for the current frame.
    Transient,
    /// Owned by the caller; valid for the whole frame.
    Imported(ExternalResource),
}

/// A logical resource known to the registry.
#[derive(Debug, Clone)]
pub struct VirtualResource {
    pub(crate) handle: ResourceHandle,
    pub(crate) name: String,
    pub(crate) desc: ResourceDescriptor,
    pub(crate) origin: ResourceOrigin,
    pub(crate) creator: Option<PassId>,
}

impl VirtualResource {
    /// Get the handle.
    pub fn handle(&self) -> ResourceHandle {
        self.handle
    }

    /// Get the resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the descriptor.
    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.desc
    }

    /// Get the origin.
    pub fn origin(&self) -> ResourceOrigin {
        self.origin
    }

    /// The pass that created this resource, if it was created from a pass builder.
    pub fn creator(&self) -> Option<PassId> {
        self.creator
    }

    /// Check if the graph owns this resource's storage.
    pub fn is_transient(&self) -> bool {
        self.origin == ResourceOrigin::Transient
    }

    /// Check if this resource is owned by the caller.
    pub fn is_imported(&self) -> bool {
        matches!(self.origin, ResourceOrigin::Imported(_))
    }
}

/// Resource access mode for dependency tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Read-only access.
    Read,
    /// Write-only access; previous contents are not observed.
    Write,
    /// Read and write access.
    ReadWrite,
}

impl AccessMode {
    /// Check if this access includes reading.
    pub fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Check if this access includes writing.
    pub fn writes(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    /// Combine two accesses of the same resource within one pass.
    pub fn merge(self, other: Self) -> Self {
        if self == other {
            self
        } else {
            Self::ReadWrite
        }
    }
}

/// Depth attachment access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthAccess {
    /// Depth test only.
    Read,
    /// Depth is cleared/overwritten.
    Write,
    /// Depth test and write on top of existing contents.
    ReadWrite,
}

impl DepthAccess {
    fn access_mode(self) -> AccessMode {
        match self {
            Self::Read => AccessMode::Read,
            Self::Write => AccessMode::Write,
            Self::ReadWrite => AccessMode::ReadWrite,
        }
    }
}

/// How a pass uses a resource. Informational for callbacks; ordering only
/// looks at the [`AccessMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceUsage {
    /// Sampled in a shader.
    SampledTexture,
    /// Color render target at the given slot.
    ColorAttachment { slot: u32 },
    /// Depth/stencil attachment.
    DepthAttachment { mode: DepthAccess },
    /// Storage image.
    StorageTexture,
    /// Uniform buffer.
    UniformBuffer,
    /// Storage buffer.
    StorageBuffer,
    /// Source of a copy.
    TransferSrc,
    /// Destination of a copy.
    TransferDst,
}

impl ResourceUsage {
    /// The kind of resource this usage applies to, if it is kind specific.
    pub fn resource_kind(self) -> Option<ResourceKind> {
        match self {
            Self::SampledTexture
            | Self::ColorAttachment { .. }
            | Self::DepthAttachment { .. }
            | Self::StorageTexture => Some(ResourceKind::Texture),
            Self::UniformBuffer | Self::StorageBuffer => Some(ResourceKind::Buffer),
            Self::TransferSrc | Self::TransferDst => None,
        }
    }

    pub(crate) fn depth(mode: DepthAccess) -> (AccessMode, Self) {
        (mode.access_mode(), Self::DepthAttachment { mode })
    }
}

/// Resource access declaration for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceAccess {
    pub resource: ResourceHandle,
    pub mode: AccessMode,
    pub usage: ResourceUsage,
}

impl ResourceAccess {
    pub fn is_read(&self) -> bool {
        self.mode.reads()
    }

    pub fn is_write(&self) -> bool {
        self.mode.writes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_merge() {
        assert_eq!(AccessMode::Read.merge(AccessMode::Read), AccessMode::Read);
        assert_eq!(AccessMode::Read.merge(AccessMode::Write), AccessMode::ReadWrite);
        assert_eq!(AccessMode::Write.merge(AccessMode::ReadWrite), AccessMode::ReadWrite);
        assert!(AccessMode::ReadWrite.reads() && AccessMode::ReadWrite.writes());
    }

    #[test]
    fn test_depth_usage() {
        let (mode, usage) = ResourceUsage::depth(DepthAccess::Read);
        assert_eq!(mode, AccessMode::Read);
        assert_eq!(usage.resource_kind(), Some(ResourceKind::Texture));
        assert_eq!(ResourceUsage::depth(DepthAccess::Write).0, AccessMode::Write);
    }

    #[test]
    fn test_handle_kind() {
        let handle = ResourceHandle::new(3, ResourceKind::Buffer);
        assert_eq!(handle.index(), 3);
        assert!(handle.is_buffer());
        assert!(!handle.is_texture());
    }
}
