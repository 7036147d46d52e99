//! Pixel formats for [`rgb`] crate pixel types.
//!
//! Lets typed pixel slices go in and out of the byte-oriented
//! [`PixelSource`] boundary via bytemuck, without copying channel by channel.
//!
//! ```rust
//! use rgb::Rgba;
//! use sharpscale::{ConvolutionTransform, Interpolation, typed};
//!
//! let pixels = vec![Rgba::new(255u8, 0, 128, 255); 16];
//! let source = typed::source_from_pixels(&pixels, 4, 4).unwrap();
//! let mut half = ConvolutionTransform::new(source, &Interpolation::Box, 2, 2).unwrap();
//! let out: Vec<Rgba<u8>> = typed::read_pixels(&mut half).unwrap();
//! assert_eq!(out, vec![Rgba::new(255, 0, 128, 255); 4]);
//! ```

use alloc::vec::Vec;

use rgb::{Bgr, Bgra, Gray, Rgb, Rgba};

use crate::{MemorySource, PixelFormat, PixelRect, PixelSource, ResizeError};

/// A pixel type with a fixed [`PixelFormat`].
///
/// Channel order does not affect convolution, so `Rgb` and `Bgr` share a
/// format. Four-channel types are straight alpha, as `rgb` pixels
/// conventionally are.
pub trait PixelLayout: bytemuck::Pod {
    const FORMAT: PixelFormat;
}

impl PixelLayout for Gray<u8> {
    const FORMAT: PixelFormat = PixelFormat::GRAY8;
}

impl PixelLayout for Rgb<u8> {
    const FORMAT: PixelFormat = PixelFormat::BGR24;
}

impl PixelLayout for Bgr<u8> {
    const FORMAT: PixelFormat = PixelFormat::BGR24;
}

impl PixelLayout for Rgba<u8> {
    const FORMAT: PixelFormat = PixelFormat::BGRA32;
}

impl PixelLayout for Bgra<u8> {
    const FORMAT: PixelFormat = PixelFormat::BGRA32;
}

impl PixelLayout for Gray<f32> {
    const FORMAT: PixelFormat = PixelFormat::GRAY32_FLOAT;
}

impl PixelLayout for Rgb<f32> {
    const FORMAT: PixelFormat = PixelFormat::BGR96_FLOAT;
}

impl PixelLayout for Bgr<f32> {
    const FORMAT: PixelFormat = PixelFormat::BGR96_FLOAT;
}

impl PixelLayout for Rgba<f32> {
    const FORMAT: PixelFormat = PixelFormat::BGRA128_FLOAT;
}

impl PixelLayout for Bgra<f32> {
    const FORMAT: PixelFormat = PixelFormat::BGRA128_FLOAT;
}

/// Copies tightly packed typed pixels into an in-memory source.
pub fn source_from_pixels<P: PixelLayout>(
    pixels: &[P],
    width: usize,
    height: usize,
) -> Result<MemorySource, ResizeError> {
    MemorySource::from_samples(P::FORMAT, width, height, pixels)
}

/// Reads a whole source as typed pixels.
///
/// Fails with [`ResizeError::UnsupportedFormat`] if the source's format is
/// not `P::FORMAT`.
pub fn read_pixels<P: PixelLayout, S: PixelSource + ?Sized>(
    source: &mut S,
) -> Result<Vec<P>, ResizeError> {
    if source.format() != P::FORMAT {
        return Err(ResizeError::UnsupportedFormat(source.format()));
    }
    let (w, h) = source.extent();
    let len = w.checked_mul(h).ok_or(ResizeError::OutOfMemory)?;
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|_| ResizeError::OutOfMemory)?;
    out.resize(len, P::zeroed());
    source.copy_pixels(
        PixelRect::new(0, 0, w, h),
        w * size_of::<P>(),
        bytemuck::cast_slice_mut(&mut out),
    )?;
    Ok(out)
}
