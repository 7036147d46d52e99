// ---------------------------------------------------------------------------
// Per-format convolution kernels.
//
// Architecture: one Convolver per numeric family (byte, UQ15, float), chosen
// once from the pixel format. Each operation dispatches through incant! to
// an x86-64-v3 wrapper or a scalar wrapper; both call the same
// #[inline(always)] body, which matches the channel count once per row into
// a const-generic loop.
// ---------------------------------------------------------------------------

use crate::kernel_map::{KernelMap, Weight};
use crate::{AlphaMode, PixelFormat, ResizeError, SampleType};

mod byte;
mod float;
mod uq15;

#[cfg(test)]
mod tests;

pub(crate) use byte::ByteConvolver;
pub(crate) use float::FloatConvolver;
pub(crate) use uq15::Uq15Convolver;

/// Row kernels for one pixel layout.
///
/// Intermediate rows are column-major: output column `x` owns
/// `inter_stride` consecutive values starting at `x * inter_stride`, one
/// slot of `channels()` values per buffered source row. The slices passed in
/// are already offset to the slot being written or to slot zero.
pub(crate) trait Convolver: Copy + core::fmt::Debug {
    type Sample: bytemuck::Pod + Default + PartialEq + core::fmt::Debug;
    type Weight: Weight;
    type Inter: bytemuck::Pod + Default;

    fn channels(&self) -> usize;

    /// Horizontal pass: filters one source row into one slot of every
    /// intermediate column.
    fn convolve_source_line(
        &self,
        src: &[Self::Sample],
        inter: &mut [Self::Inter],
        inter_stride: usize,
        xmap: &KernelMap<Self::Weight>,
    );

    /// Vertical pass: combines the buffered slots of columns `ox..ox + ow`
    /// into one output row.
    fn write_dest_line(
        &self,
        inter: &[Self::Inter],
        inter_stride: usize,
        dst: &mut [Self::Sample],
        weights: &[Self::Weight],
        ox: usize,
        ow: usize,
    );

    /// Unsharp blend of `original` against `blurred`; all three rows cover
    /// the same pixels.
    fn sharpen_line(
        &self,
        original: &[Self::Sample],
        blurred: &[Self::Sample],
        dst: &mut [Self::Sample],
        sharpen: &SharpenParams,
    );
}

/// Unsharp mask strength, in representation-neutral units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SharpenParams {
    /// Percent of the difference added back.
    pub amount: u32,
    /// Minimum difference, in byte units, that gets sharpened.
    pub threshold: u8,
}

/// The kernel family for a format, or `UnsupportedFormat`.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Family {
    Byte(ByteConvolver),
    Uq15(Uq15Convolver),
    Float(FloatConvolver),
}

impl Family {
    pub(crate) fn select(format: PixelFormat) -> Result<Self, ResizeError> {
        let supported = match (format.channels, format.sample, format.alpha) {
            (1..=3, SampleType::U8 | SampleType::F32, AlphaMode::None) => true,
            (1 | 3, SampleType::Uq15, AlphaMode::None) => true,
            (4, _, _) => true,
            _ => false,
        };
        if !supported {
            return Err(ResizeError::UnsupportedFormat(format));
        }
        let channels = format.channels();
        Ok(match format.sample {
            SampleType::U8 => Self::Byte(ByteConvolver::new(channels, format.alpha)),
            SampleType::Uq15 => Self::Uq15(Uq15Convolver::new(channels, format.alpha)),
            SampleType::F32 => Self::Float(FloatConvolver::new(channels, format.alpha)),
        })
    }
}

/// Index of the first channel that is not sharpened.
#[inline(always)]
fn color_channels(channels: usize, alpha: AlphaMode) -> usize {
    if matches!(alpha, AlphaMode::None) {
        channels
    } else {
        channels - 1
    }
}
