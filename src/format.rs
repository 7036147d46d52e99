//! Pixel format descriptors and rectangles.

use core::fmt;

/// Numeric representation of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// 8-bit unsigned, 0..=255.
    U8,
    /// 16-bit unsigned fixed point with 15 fractional bits; 32768 is 1.0.
    Uq15,
    /// 32-bit float, nominally 0.0..=1.0.
    F32,
}

impl SampleType {
    /// Size of one channel in bytes.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::Uq15 => 2,
            Self::F32 => 4,
        }
    }
}

/// Whether the last channel is alpha, and how color relates to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlphaMode {
    None,
    /// Color is independent of alpha.
    Straight,
    /// Color has been multiplied by alpha.
    Premultiplied,
}

/// Channel count, sample representation, and alpha kind.
///
/// Channel order beyond "alpha is last" is opaque to the engine: BGR and RGB
/// convolve identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    pub channels: u8,
    pub sample: SampleType,
    pub alpha: AlphaMode,
}

impl PixelFormat {
    pub const GRAY8: Self = Self::new(1, SampleType::U8, AlphaMode::None);
    /// Two independent byte channels, e.g. interleaved chroma.
    pub const CBCR16: Self = Self::new(2, SampleType::U8, AlphaMode::None);
    pub const BGR24: Self = Self::new(3, SampleType::U8, AlphaMode::None);
    pub const BGRX32: Self = Self::new(4, SampleType::U8, AlphaMode::None);
    pub const BGRA32: Self = Self::new(4, SampleType::U8, AlphaMode::Straight);
    pub const PBGRA32: Self = Self::new(4, SampleType::U8, AlphaMode::Premultiplied);

    pub const GRAY16_UQ15: Self = Self::new(1, SampleType::Uq15, AlphaMode::None);
    pub const BGR48_UQ15: Self = Self::new(3, SampleType::Uq15, AlphaMode::None);
    pub const BGRA64_UQ15: Self = Self::new(4, SampleType::Uq15, AlphaMode::Straight);
    pub const PBGRA64_UQ15: Self = Self::new(4, SampleType::Uq15, AlphaMode::Premultiplied);

    pub const GRAY32_FLOAT: Self = Self::new(1, SampleType::F32, AlphaMode::None);
    pub const CBCR64_FLOAT: Self = Self::new(2, SampleType::F32, AlphaMode::None);
    pub const BGR96_FLOAT: Self = Self::new(3, SampleType::F32, AlphaMode::None);
    pub const BGRA128_FLOAT: Self = Self::new(4, SampleType::F32, AlphaMode::Straight);
    pub const PBGRA128_FLOAT: Self = Self::new(4, SampleType::F32, AlphaMode::Premultiplied);

    #[inline]
    pub const fn new(channels: u8, sample: SampleType, alpha: AlphaMode) -> Self {
        Self {
            channels,
            sample,
            alpha,
        }
    }

    #[inline]
    pub const fn channels(self) -> usize {
        self.channels as usize
    }

    /// Bytes per pixel.
    #[inline]
    pub const fn bpp(self) -> usize {
        self.channels as usize * self.sample.size()
    }

    #[inline]
    pub const fn has_alpha(self) -> bool {
        !matches!(self.alpha, AlphaMode::None)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alpha = match self.alpha {
            AlphaMode::None => "",
            AlphaMode::Straight => " straight alpha",
            AlphaMode::Premultiplied => " premultiplied alpha",
        };
        write!(f, "{}x{:?}{}", self.channels, self.sample, alpha)
    }
}

/// A rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelRect {
    #[inline]
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle lies within a `width` × `height` image.
    #[inline]
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        match (self.x.checked_add(self.width), self.y.checked_add(self.height)) {
            (Some(r), Some(b)) => r <= width && b <= height,
            _ => false,
        }
    }
}
