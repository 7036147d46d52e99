//! The pull-based pixel source abstraction consumed and produced by the
//! pipeline.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::{PixelFormat, PixelRect, ResizeError};

/// A lazily produced image that copies arbitrary rectangles into caller
/// memory in its format's native byte layout.
///
/// Channel samples wider than a byte are native-endian.
pub trait PixelSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn format(&self) -> PixelFormat;

    /// Copies `rect` into `buf`, row `i` of the rectangle starting at byte
    /// `i * stride`. Padding bytes between rows are never written.
    fn copy_pixels(
        &mut self,
        rect: PixelRect,
        stride: usize,
        buf: &mut [u8],
    ) -> Result<(), ResizeError>;

    /// `(width, height)`.
    fn extent(&self) -> (usize, usize) {
        (self.width(), self.height())
    }
}

impl<S: PixelSource + ?Sized> PixelSource for &mut S {
    fn width(&self) -> usize {
        (**self).width()
    }
    fn height(&self) -> usize {
        (**self).height()
    }
    fn format(&self) -> PixelFormat {
        (**self).format()
    }
    fn copy_pixels(
        &mut self,
        rect: PixelRect,
        stride: usize,
        buf: &mut [u8],
    ) -> Result<(), ResizeError> {
        (**self).copy_pixels(rect, stride, buf)
    }
}

impl<S: PixelSource + ?Sized> PixelSource for Box<S> {
    fn width(&self) -> usize {
        (**self).width()
    }
    fn height(&self) -> usize {
        (**self).height()
    }
    fn format(&self) -> PixelFormat {
        (**self).format()
    }
    fn copy_pixels(
        &mut self,
        rect: PixelRect,
        stride: usize,
        buf: &mut [u8],
    ) -> Result<(), ResizeError> {
        (**self).copy_pixels(rect, stride, buf)
    }
}

// ===========================================================================
// Validation helpers
// ===========================================================================

/// Checks a `copy_pixels` request against an image extent and the caller's
/// buffer. An empty rectangle is valid and copies nothing.
#[inline]
pub(crate) fn check_request(
    rect: PixelRect,
    width: usize,
    height: usize,
    bpp: usize,
    stride: usize,
    len: usize,
) -> Result<(), ResizeError> {
    if !rect.fits_within(width, height) {
        return Err(ResizeError::OutOfBounds);
    }
    if rect.width == 0 || rect.height == 0 {
        return Ok(());
    }
    let row_bytes = rect
        .width
        .checked_mul(bpp)
        .ok_or(ResizeError::InvalidStride)?;
    if row_bytes > stride {
        return Err(ResizeError::InvalidStride);
    }
    let needed = (rect.height - 1)
        .checked_mul(stride)
        .and_then(|n| n.checked_add(row_bytes))
        .ok_or(ResizeError::InvalidStride)?;
    if len < needed {
        return Err(ResizeError::BufferTooSmall {
            needed,
            actual: len,
        });
    }
    Ok(())
}

// ===========================================================================
// In-memory source
// ===========================================================================

/// An owned, strided, fully decoded image.
#[derive(Debug, Clone)]
pub struct MemorySource {
    format: PixelFormat,
    width: usize,
    height: usize,
    stride: usize,
    data: Vec<u8>,
}

impl MemorySource {
    /// Wraps `data`, which must hold `height` rows of `stride` bytes
    /// (the last row may omit its padding).
    pub fn new(
        format: PixelFormat,
        width: usize,
        height: usize,
        stride: usize,
        data: Vec<u8>,
    ) -> Result<Self, ResizeError> {
        if width == 0 || height == 0 {
            return Err(ResizeError::ZeroExtent);
        }
        check_request(
            PixelRect::new(0, 0, width, height),
            width,
            height,
            format.bpp(),
            stride,
            data.len(),
        )?;
        Ok(Self {
            format,
            width,
            height,
            stride,
            data,
        })
    }

    /// Wraps tightly packed rows.
    pub fn packed(
        format: PixelFormat,
        width: usize,
        height: usize,
        data: Vec<u8>,
    ) -> Result<Self, ResizeError> {
        let stride = width
            .checked_mul(format.bpp())
            .ok_or(ResizeError::InvalidStride)?;
        Self::new(format, width, height, stride, data)
    }

    /// Wraps tightly packed typed samples, e.g. `&[u16]` for UQ15 formats.
    pub fn from_samples<T: bytemuck::Pod>(
        format: PixelFormat,
        width: usize,
        height: usize,
        samples: &[T],
    ) -> Result<Self, ResizeError> {
        Self::packed(format, width, height, bytemuck::cast_slice(samples).to_vec())
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl PixelSource for MemorySource {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn copy_pixels(
        &mut self,
        rect: PixelRect,
        stride: usize,
        buf: &mut [u8],
    ) -> Result<(), ResizeError> {
        let bpp = self.format.bpp();
        check_request(rect, self.width, self.height, bpp, stride, buf.len())?;
        let row_bytes = rect.width * bpp;
        for y in 0..rect.height {
            let src = &self.data[(rect.y + y) * self.stride + rect.x * bpp..][..row_bytes];
            buf[y * stride..][..row_bytes].copy_from_slice(src);
        }
        Ok(())
    }
}

/// Reads an entire source into a tightly packed byte vector.
pub fn read_all<S: PixelSource + ?Sized>(source: &mut S) -> Result<Vec<u8>, ResizeError> {
    let (w, h) = source.extent();
    let stride = w
        .checked_mul(source.format().bpp())
        .ok_or(ResizeError::OutOfMemory)?;
    let len = stride.checked_mul(h).ok_or(ResizeError::OutOfMemory)?;
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|_| ResizeError::OutOfMemory)?;
    out.resize(len, 0);
    source.copy_pixels(PixelRect::new(0, 0, w, h), stride, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn memory_source_copies_subrect_with_padding_untouched() {
        let data: Vec<u8> = (0..24).collect();
        // 3 rows, stride 8, width 2 px of BGR24 (6 bytes) + 2 padding bytes
        let mut src = MemorySource::new(PixelFormat::BGR24, 2, 3, 8, data).unwrap();
        let mut out = vec![0xCCu8; 10];
        src.copy_pixels(PixelRect::new(1, 1, 1, 2), 5, &mut out)
            .unwrap();
        assert_eq!(out, [11, 12, 13, 0xCC, 0xCC, 19, 20, 21, 0xCC, 0xCC]);
    }

    #[test]
    fn request_validation() {
        assert!(matches!(
            check_request(PixelRect::new(0, 0, 5, 1), 4, 4, 1, 5, 5),
            Err(ResizeError::OutOfBounds)
        ));
        assert!(matches!(
            check_request(PixelRect::new(0, 0, 4, 2), 4, 4, 2, 7, 100),
            Err(ResizeError::InvalidStride)
        ));
        assert!(matches!(
            check_request(PixelRect::new(0, 0, 4, 2), 4, 4, 1, 4, 7),
            Err(ResizeError::BufferTooSmall { needed: 8, actual: 7 })
        ));
        assert!(check_request(PixelRect::new(0, 0, 4, 2), 4, 4, 1, 6, 10).is_ok());
        assert!(check_request(PixelRect::new(4, 4, 0, 0), 4, 4, 1, 0, 0).is_ok());
    }

    #[test]
    fn short_data_is_rejected() {
        assert!(MemorySource::packed(PixelFormat::GRAY8, 4, 4, vec![0; 15]).is_err());
        assert!(MemorySource::packed(PixelFormat::GRAY8, 0, 4, vec![]).is_err());
    }

    #[test]
    fn oversized_extents_fail_cleanly() {
        assert!(matches!(
            MemorySource::packed(PixelFormat::BGRA32, usize::MAX / 2, 1, vec![]),
            Err(ResizeError::InvalidStride)
        ));

        struct Endless;
        impl PixelSource for Endless {
            fn width(&self) -> usize {
                usize::MAX / 2
            }
            fn height(&self) -> usize {
                3
            }
            fn format(&self) -> PixelFormat {
                PixelFormat::GRAY8
            }
            fn copy_pixels(
                &mut self,
                _: PixelRect,
                _: usize,
                _: &mut [u8],
            ) -> Result<(), ResizeError> {
                Ok(())
            }
        }
        assert!(matches!(read_all(&mut Endless), Err(ResizeError::OutOfMemory)));
    }

    #[test]
    fn read_all_round_trips() {
        let px: Vec<u16> = (0..12).map(|v| v * 1000).collect();
        let mut src =
            MemorySource::from_samples(PixelFormat::BGR48_UQ15, 2, 2, &px).unwrap();
        let bytes = read_all(&mut src).unwrap();
        assert_eq!(bytes, bytemuck::cast_slice::<u16, u8>(&px));
    }
}
