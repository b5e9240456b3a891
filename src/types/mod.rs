//! Resource descriptors.
//!
//! Format enums, usage flags, and the descriptor structs the registry stores
//! for every logical resource. Nothing here owns GPU memory.

mod buffer;
mod texture;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use texture::{TextureDescriptor, TextureFormat, TextureSize, TextureUsage};

/// 3D extent for textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Depth in pixels or array layers (1 for 2D textures).
    pub depth: u32,
}

impl Extent3d {
    /// Create a new 2D extent.
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    /// Create a new 3D extent.
    pub fn new_3d(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

/// The kind of a logical resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// A texture (render target, depth buffer, storage image...).
    Texture,
    /// A linear buffer.
    Buffer,
}

/// Descriptor of a logical resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceDescriptor {
    /// Texture descriptor.
    Texture(TextureDescriptor),
    /// Buffer descriptor.
    Buffer(BufferDescriptor),
}

impl ResourceDescriptor {
    /// Get the resource kind.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Texture(_) => ResourceKind::Texture,
            Self::Buffer(_) => ResourceKind::Buffer,
        }
    }

    /// Get this descriptor as a texture descriptor, if it is one.
    pub fn as_texture(&self) -> Option<&TextureDescriptor> {
        if let Self::Texture(desc) = self {
            Some(desc)
        } else {
            None
        }
    }

    /// Get this descriptor as a buffer descriptor, if it is one.
    pub fn as_buffer(&self) -> Option<&BufferDescriptor> {
        if let Self::Buffer(desc) = self {
            Some(desc)
        } else {
            None
        }
    }

    /// Validate dimensions and format/usage combinations.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Texture(desc) => desc.validate(),
            Self::Buffer(desc) => desc.validate(),
        }
    }

    /// Estimated memory footprint in bytes.
    pub fn byte_size(&self) -> u64 {
        match self {
            Self::Texture(desc) => desc.byte_size(),
            Self::Buffer(desc) => desc.size,
        }
    }

    /// The equivalence class used for aliasing: the descriptor without its label.
    ///
    /// Two resources may share backing storage only when their alias keys are
    /// equal; any difference in size, format, usage or sample count keeps them
    /// apart.
    pub fn alias_key(&self) -> ResourceDescriptor {
        match self {
            Self::Texture(desc) => Self::Texture(TextureDescriptor {
                label: None,
                ..desc.clone()
            }),
            Self::Buffer(desc) => Self::Buffer(BufferDescriptor {
                label: None,
                ..desc.clone()
            }),
        }
    }
}

impl From<TextureDescriptor> for ResourceDescriptor {
    fn from(desc: TextureDescriptor) -> Self {
        Self::Texture(desc)
    }
}

impl From<BufferDescriptor> for ResourceDescriptor {
    fn from(desc: BufferDescriptor) -> Self {
        Self::Buffer(desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_key_ignores_label() {
        let a: ResourceDescriptor = TextureDescriptor::new_2d(
            1920,
            1080,
            TextureFormat::Rgba16Float,
            TextureUsage::RENDER_ATTACHMENT,
        )
        .with_label("hdr_a")
        .into();
        let b: ResourceDescriptor = TextureDescriptor::new_2d(
            1920,
            1080,
            TextureFormat::Rgba16Float,
            TextureUsage::RENDER_ATTACHMENT,
        )
        .with_label("hdr_b")
        .into();
        assert_ne!(a, b);
        assert_eq!(a.alias_key(), b.alias_key());
    }

    #[test]
    fn test_alias_key_keeps_usage() {
        let a: ResourceDescriptor = BufferDescriptor::new(64, BufferUsage::STORAGE).into();
        let b: ResourceDescriptor =
            BufferDescriptor::new(64, BufferUsage::STORAGE | BufferUsage::INDIRECT).into();
        assert_ne!(a.alias_key(), b.alias_key());
    }

    #[test]
    fn test_kind() {
        let tex: ResourceDescriptor = TextureDescriptor::default().into();
        let buf: ResourceDescriptor = BufferDescriptor::new(4, BufferUsage::UNIFORM).into();
        assert_eq!(tex.kind(), ResourceKind::Texture);
        assert_eq!(buf.kind(), ResourceKind::Buffer);
        assert!(tex.as_texture().is_some());
        assert!(buf.as_texture().is_none());
    }
}
