//! Per-frame settings and the context handed to pass callbacks.

use crate::types::TextureSize;

/// Caller-owned, read-only settings for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSettings {
    /// Screen width in pixels.
    pub width: u32,
    /// Screen height in pixels.
    pub height: u32,
    /// MSAA sample count for screen-sized targets.
    pub sample_count: u32,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            sample_count: 1,
        }
    }
}

impl FrameSettings {
    /// Create settings for the given screen size without MSAA.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sample_count: 1,
        }
    }

    /// Set the MSAA sample count.
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Resolve a [`TextureSize`] against the screen size.
    pub fn resolve(&self, size: TextureSize) -> (u32, u32) {
        size.resolve(self.width, self.height)
    }
}

/// Context passed to every executed pass.
///
/// `R` is whatever the caller records GPU work into: a command encoder, a
/// command list, or in tests a plain `Vec` of strings.
#[derive(Debug)]
pub struct FrameContext<R> {
    frame_index: u64,
    settings: FrameSettings,
    recorder: R,
}

impl<R> FrameContext<R> {
    pub fn new(frame_index: u64, settings: FrameSettings, recorder: R) -> Self {
        Self {
            frame_index,
            settings,
            recorder,
        }
    }

    /// Get the frame index.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Get the frame settings.
    pub fn settings(&self) -> &FrameSettings {
        &self.settings
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut R {
        &mut self.recorder
    }

    /// Consume the context and return the recorder (e.g. for submission).
    pub fn into_recorder(self) -> R {
        self.recorder
    }
}
