//! Whole-image resizing using [`imgref`] types.
//!
//! [`ImgSource`] exposes a strided `ImgRef` as a [`PixelSource`]; the
//! `resize*` helpers run a pipeline over it and collect an [`ImgVec`].
//!
//! ```rust
//! use rgb::Rgb;
//! use imgref::ImgVec;
//! use sharpscale::{Interpolation, img};
//!
//! let src = ImgVec::new(vec![Rgb::new(10u8, 20, 30); 64], 8, 8);
//! let small: ImgVec<Rgb<u8>> = img::resize(src.as_ref(), 3, 3, &Interpolation::LANCZOS).unwrap();
//! assert_eq!((small.width(), small.height()), (3, 3));
//! assert!(small.pixels().all(|p| p == Rgb::new(10, 20, 30)));
//! ```

use imgref::{ImgRef, ImgVec};

use crate::source::check_request;
use crate::typed::{PixelLayout, read_pixels};
use crate::{
    ConvolutionTransform, InterpolationFilter, PixelFormat, PixelRect, PixelSource, ResizeError,
    ResizeSettings,
};

/// A borrowed image as a pixel source.
#[derive(Debug, Clone, Copy)]
pub struct ImgSource<'a, T> {
    img: ImgRef<'a, T>,
}

impl<'a, T: PixelLayout> ImgSource<'a, T> {
    pub fn new(img: ImgRef<'a, T>) -> Self {
        Self { img }
    }
}

impl<T: PixelLayout> PixelSource for ImgSource<'_, T> {
    fn width(&self) -> usize {
        self.img.width()
    }

    fn height(&self) -> usize {
        self.img.height()
    }

    fn format(&self) -> PixelFormat {
        T::FORMAT
    }

    fn copy_pixels(
        &mut self,
        rect: PixelRect,
        stride: usize,
        buf: &mut [u8],
    ) -> Result<(), ResizeError> {
        let bpp = size_of::<T>();
        check_request(rect, self.width(), self.height(), bpp, stride, buf.len())?;
        let row_bytes = rect.width * bpp;
        for (i, row) in self.img.rows().skip(rect.y).take(rect.height).enumerate() {
            let px = &row[rect.x..][..rect.width];
            buf[i * stride..][..row_bytes].copy_from_slice(bytemuck::cast_slice(px));
        }
        Ok(())
    }
}

/// Resamples `img` to `width` × `height`.
pub fn resize<T: PixelLayout, F: InterpolationFilter + ?Sized>(
    img: ImgRef<'_, T>,
    width: usize,
    height: usize,
    filter: &F,
) -> Result<ImgVec<T>, ResizeError> {
    let mut pipeline = ConvolutionTransform::new(ImgSource::new(img), filter, width, height)?;
    let buf = read_pixels(&mut pipeline)?;
    Ok(ImgVec::new(buf, width, height))
}

/// Runs every stage of `settings` over `img`.
pub fn resize_with<T: PixelLayout>(
    img: ImgRef<'_, T>,
    settings: &ResizeSettings,
) -> Result<ImgVec<T>, ResizeError> {
    let mut pipeline = settings.build(ImgSource::new(img))?;
    let buf = read_pixels(&mut *pipeline)?;
    Ok(ImgVec::new(buf, settings.width, settings.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Interpolation, UnsharpSettings};
    use alloc::vec;
    use alloc::vec::Vec;
    use rgb::{Gray, Rgba};

    #[test]
    fn strided_subimage_is_read_correctly() {
        // 4x3 visible pixels inside a 6-wide buffer
        let buf: Vec<Gray<u8>> = (0..18).map(|v| Gray::new(v as u8)).collect();
        let img = ImgRef::new_stride(&buf[..], 4, 3, 6);
        let out = resize(img, 4, 3, &Interpolation::Box).unwrap().into_buf();
        let got: &[u8] = bytemuck::cast_slice(&out);
        assert_eq!(got, [0, 1, 2, 3, 6, 7, 8, 9, 12, 13, 14, 15]);
    }

    #[test]
    fn settings_path_resizes_and_sharpens() {
        let src = ImgVec::new(vec![Rgba::new(200u8, 100, 50, 255); 100], 10, 10);
        let settings = ResizeSettings::new(5, 4).with_unsharp(UnsharpSettings {
            amount: 100,
            radius: 0.7,
            threshold: 0,
        });
        let out = resize_with(src.as_ref(), &settings).unwrap();
        assert_eq!((out.width(), out.height()), (5, 4));
        // nothing to sharpen in a flat image
        assert!(out.pixels().all(|p| p == Rgba::new(200, 100, 50, 255)));
    }

    #[test]
    fn subrect_requests_are_bounds_checked() {
        let buf = vec![Gray::new(0u8); 4];
        let mut src = ImgSource::new(ImgRef::new(&buf[..], 2, 2));
        let mut out = [0u8; 4];
        assert!(matches!(
            src.copy_pixels(PixelRect::new(1, 1, 2, 1), 2, &mut out),
            Err(ResizeError::OutOfBounds)
        ));
    }
}
