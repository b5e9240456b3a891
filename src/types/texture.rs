//! Texture types and descriptors.

use super::Extent3d;
use bitflags::bitflags;

/// Texture format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    // 8-bit formats
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit red channel, unsigned integer.
    R8Uint,

    // 16-bit formats
    /// 16-bit red channel, float.
    R16Float,
    /// 8-bit RG channels, unsigned normalized.
    Rg8Unorm,

    // 32-bit formats
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 16-bit RG channels, float.
    Rg16Float,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8UnormSrgb,
    /// Packed 11/11/10-bit float.
    Rg11b10Float,

    // 64-bit formats
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit RG channels, float.
    Rg32Float,

    // 128-bit formats
    /// 32-bit RGBA channels, float.
    Rgba32Float,

    // Depth/stencil formats
    /// 16-bit depth.
    Depth16Unorm,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
    /// 32-bit depth, float.
    Depth32Float,
    /// 32-bit depth float with 8-bit stencil.
    Depth32FloatStencil8,
}

impl TextureFormat {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm
                | Self::Depth24PlusStencil8
                | Self::Depth32Float
                | Self::Depth32FloatStencil8
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24PlusStencil8 | Self::Depth32FloatStencil8)
    }

    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm | Self::R8Uint => 1,
            Self::R16Float | Self::Rg8Unorm | Self::Depth16Unorm => 2,
            Self::R32Float
            | Self::R32Uint
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Rg11b10Float
            | Self::Depth24PlusStencil8
            | Self::Depth32Float => 4,
            Self::Rgba16Float | Self::Rg32Float | Self::Depth32FloatStencil8 => 8,
            Self::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 2;
        /// Texture can be used as a storage texture.
        const STORAGE_BINDING = 1 << 3;
        /// Texture can be used as a render attachment.
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for a texture resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Size of the texture.
    pub size: Extent3d,
    /// Mip level count.
    pub mip_level_count: u32,
    /// Sample count for multisampling.
    pub sample_count: u32,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            size: Extent3d::new_2d(width, height),
            mip_level_count: 1,
            sample_count: 1,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Set the number of array layers (or 3D depth).
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.size.depth = depth;
        self
    }

    /// Check that the descriptor describes something a backend could create.
    pub fn validate(&self) -> Result<(), String> {
        let Extent3d {
            width,
            height,
            depth,
        } = self.size;
        if width == 0 || height == 0 || depth == 0 {
            return Err(format!("zero extent {width}x{height}x{depth}"));
        }
        if self.mip_level_count == 0 {
            return Err("mip level count must be at least 1".into());
        }
        if self.sample_count == 0 || !self.sample_count.is_power_of_two() {
            return Err(format!(
                "sample count {} is not a power of two",
                self.sample_count
            ));
        }
        let max_mips = 32 - width.max(height).leading_zeros();
        if self.mip_level_count > max_mips {
            return Err(format!(
                "{} mip levels requested but a {width}x{height} texture has at most {max_mips}",
                self.mip_level_count
            ));
        }
        if self.sample_count > 1 && self.mip_level_count > 1 {
            return Err("multisampled textures cannot have mip levels".into());
        }
        if self.format.is_depth_stencil() && self.usage.contains(TextureUsage::STORAGE_BINDING) {
            return Err(format!(
                "depth format {:?} cannot be used as a storage texture",
                self.format
            ));
        }
        if self.checked_byte_size().is_none() {
            return Err(format!(
                "{width}x{height}x{depth} {:?} texture is too large to address",
                self.format
            ));
        }
        Ok(())
    }

    /// Estimated memory footprint in bytes, including the mip chain.
    ///
    /// Saturates at `u64::MAX`; validated descriptors never do.
    pub fn byte_size(&self) -> u64 {
        self.checked_byte_size().unwrap_or(u64::MAX)
    }

    /// Memory footprint in bytes, or `None` if it does not fit in a `u64`.
    pub fn checked_byte_size(&self) -> Option<u64> {
        let block = u64::from(self.format.block_size());
        let samples = u64::from(self.sample_count);
        let depth = u64::from(self.size.depth);
        (0..self.mip_level_count).try_fold(0u64, |total, mip| {
            let w = u64::from(self.size.width.checked_shr(mip).unwrap_or(0).max(1));
            let h = u64::from(self.size.height.checked_shr(mip).unwrap_or(0).max(1));
            let level = w
                .checked_mul(h)?
                .checked_mul(depth)?
                .checked_mul(block)?
                .checked_mul(samples)?;
            total.checked_add(level)
        })
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: Extent3d::default(),
            mip_level_count: 1,
            sample_count: 1,
            format: TextureFormat::default(),
            usage: TextureUsage::empty(),
        }
    }
}

/// Describes texture dimensions that can be relative to the screen size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureSize {
    /// Absolute size in pixels.
    Absolute { width: u32, height: u32 },
    /// Relative to screen size (1.0 = full screen).
    Relative { width_scale: f32, height_scale: f32 },
}

impl Default for TextureSize {
    fn default() -> Self {
        TextureSize::Relative {
            width_scale: 1.0,
            height_scale: 1.0,
        }
    }
}

impl TextureSize {
    /// Resolve to a pixel size. Relative sizes never collapse below one pixel
    /// unless the screen itself is empty.
    pub fn resolve(&self, screen_width: u32, screen_height: u32) -> (u32, u32) {
        match *self {
            TextureSize::Absolute { width, height } => (width, height),
            TextureSize::Relative {
                width_scale,
                height_scale,
            } => (
                scale_dimension(screen_width, width_scale),
                scale_dimension(screen_height, height_scale),
            ),
        }
    }
}

fn scale_dimension(extent: u32, scale: f32) -> u32 {
    if extent == 0 {
        return 0;
    }
    ((extent as f32 * scale) as u32).max(1)
}
