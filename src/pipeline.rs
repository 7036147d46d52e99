//! The streaming two-pass convolution pipeline.
//!
//! A [`ConvolutionTransform`] wraps an upstream [`PixelSource`] and is itself
//! a [`PixelSource`] of the resampled image. Output rows are produced on
//! demand: each requested row needs `samples_y` horizontally filtered source
//! rows, which are kept in a sliding window so that a top-to-bottom read
//! pulls every source row from upstream at most once.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::any::Any;

use crate::convolve::{Convolver, Family, SharpenParams};
use crate::kernel_map::{KernelMap, Weight};
use crate::pool::{BufferPool, PooledBuffer};
use crate::source::check_request;
use crate::{Interpolation, InterpolationFilter, PixelFormat, PixelRect, PixelSource, ResizeError};

type MapPair<W> = (Arc<KernelMap<W>>, Arc<KernelMap<W>>);

/// Unsharp mask parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpSettings {
    /// Strength in percent of the difference from the blurred image.
    pub amount: u32,
    /// Gaussian blur standard deviation, in pixels.
    pub radius: f64,
    /// Smallest difference (in 8-bit units) that gets sharpened.
    pub threshold: u8,
}

impl UnsharpSettings {
    /// Largest accepted [`amount`](Self::amount).
    pub const MAX_AMOUNT: u32 = 1000;

    pub fn validate(&self) -> Result<(), ResizeError> {
        if self.amount > Self::MAX_AMOUNT {
            return Err(ResizeError::InvalidSharpen(
                "amount must be at most 1000 percent",
            ));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(ResizeError::InvalidSharpen(
                "radius must be positive and finite",
            ));
        }
        Ok(())
    }
}

// ===========================================================================
// Per-family pipeline
// ===========================================================================

#[derive(Debug)]
struct Pipeline<C: Convolver> {
    conv: C,
    xmap: Arc<KernelMap<C::Weight>>,
    ymap: Arc<KernelMap<C::Weight>>,
    sharpen: Option<SharpenParams>,
    /// One source row, or `samples_y` rows when sharpening.
    lines: PooledBuffer<C::Sample>,
    /// Column-major horizontally filtered window, `samples_y` slots per column.
    inter: PooledBuffer<C::Inter>,
    out_line: PooledBuffer<C::Sample>,
    blur_line: Option<PooledBuffer<C::Sample>>,
    /// Source row held in slot zero; `-samples_y` when nothing is loaded.
    window_start: isize,
}

fn elements(a: usize, b: usize) -> Result<usize, ResizeError> {
    a.checked_mul(b).ok_or(ResizeError::OutOfMemory)
}

impl<C: Convolver> Pipeline<C> {
    fn new(
        conv: C,
        (xmap, ymap): MapPair<C::Weight>,
        sharpen: Option<SharpenParams>,
        pool: &Arc<BufferPool>,
    ) -> Result<Self, ResizeError> {
        let ch = conv.channels();
        let samples = ymap.samples();
        let row_len = elements(xmap.in_pixels(), ch)?;
        let out_len = elements(xmap.out_pixels(), ch)?;
        let rows = if sharpen.is_some() { samples } else { 1 };

        let lines = pool.rent(elements(row_len, rows)?)?;
        let inter = pool.rent(elements(out_len, samples)?)?;
        let out_line = pool.rent(out_len)?;
        let blur_line = match sharpen {
            Some(_) => Some(pool.rent(out_len)?),
            None => None,
        };

        log::debug!(
            "convolution {conv:?}: {}x{} -> {}x{}, {}x{} taps, {} window rows{}",
            xmap.in_pixels(),
            ymap.in_pixels(),
            xmap.out_pixels(),
            ymap.out_pixels(),
            xmap.samples(),
            samples,
            samples,
            if sharpen.is_some() { ", unsharp" } else { "" },
        );

        Ok(Self {
            conv,
            xmap,
            ymap,
            sharpen,
            lines,
            inter,
            out_line,
            blur_line,
            window_start: -(samples as isize),
        })
    }

    /// Makes the window cover the source rows needed by output row `oy`.
    fn load_window<S: PixelSource + ?Sized>(
        &mut self,
        source: &mut S,
        oy: usize,
    ) -> Result<(), ResizeError> {
        let samples = self.ymap.samples() as isize;
        let iy = self.ymap.anchor(oy) as isize;
        if iy < self.window_start {
            log::trace!(
                "seek back to source row {iy}; discarding window at {}",
                self.window_start
            );
            self.window_start = iy - samples;
        }

        let shift = (iy - self.window_start).min(samples);
        if shift <= 0 {
            return Ok(());
        }
        self.window_start = iy;

        let (shift, samples) = (shift as usize, samples as usize);
        let keep = samples - shift;
        let ch = self.conv.channels();
        let in_width = self.xmap.in_pixels();
        let row_len = in_width * ch;
        let inter_stride = samples * ch;
        let keeps_rows = self.sharpen.is_some();

        if keep > 0 {
            self.inter.as_mut_slice().copy_within(shift * ch.., 0);
            if keeps_rows {
                self.lines.as_mut_slice().copy_within(shift * row_len.., 0);
            }
        }

        for k in keep..samples {
            let y = iy as usize + k;
            let line = if keeps_rows {
                &mut self.lines.as_mut_slice()[k * row_len..][..row_len]
            } else {
                &mut self.lines.as_mut_slice()[..row_len]
            };
            log::trace!("pulling source row {y} into slot {k}");
            let pulled = source.copy_pixels(
                PixelRect::new(0, y, in_width, 1),
                row_len * size_of::<C::Sample>(),
                bytemuck::cast_slice_mut(line),
            );
            if let Err(e) = pulled {
                self.window_start = -(samples as isize);
                return Err(e);
            }
            self.conv.convolve_source_line(
                line,
                &mut self.inter.as_mut_slice()[k * ch..],
                inter_stride,
                &self.xmap,
            );
        }
        Ok(())
    }

    fn copy_pixels<S: PixelSource + ?Sized>(
        &mut self,
        source: &mut S,
        rect: PixelRect,
        stride: usize,
        buf: &mut [u8],
    ) -> Result<(), ResizeError> {
        let ch = self.conv.channels();
        let samples = self.ymap.samples();
        let inter_stride = samples * ch;
        let src_len = self.xmap.in_pixels() * ch;
        let row_len = rect.width * ch;
        let row_bytes = row_len * size_of::<C::Sample>();

        for (i, oy) in (rect.y..rect.y + rect.height).enumerate() {
            self.load_window(source, oy)?;

            let weights = self.ymap.weights(oy);
            let inter = self.inter.as_slice();
            let out = &mut self.out_line.as_mut_slice()[..row_len];
            match (&self.sharpen, &mut self.blur_line) {
                (Some(sharpen), Some(blur)) => {
                    let blur = &mut blur.as_mut_slice()[..row_len];
                    self.conv
                        .write_dest_line(inter, inter_stride, blur, weights, rect.x, rect.width);
                    // blur maps keep the extent, so oy is also a source row
                    let slot = (oy as isize - self.window_start).clamp(0, samples as isize - 1);
                    let original =
                        &self.lines.as_slice()[slot as usize * src_len + rect.x * ch..][..row_len];
                    self.conv.sharpen_line(original, blur, out, sharpen);
                }
                _ => self
                    .conv
                    .write_dest_line(inter, inter_stride, out, weights, rect.x, rect.width),
            }
            buf[i * stride..][..row_bytes].copy_from_slice(bytemuck::cast_slice(out));
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Engine {
    Byte(Pipeline<crate::convolve::ByteConvolver>),
    Uq15(Pipeline<crate::convolve::Uq15Convolver>),
    Float(Pipeline<crate::convolve::FloatConvolver>),
}

fn axis_maps<W: Weight, F: InterpolationFilter + ?Sized>(
    filter: &F,
    src: (usize, usize),
    dst: (usize, usize),
) -> Result<MapPair<W>, ResizeError> {
    let xmap = Arc::new(KernelMap::build(filter, src.0, dst.0)?);
    let ymap = if src.0 == src.1 && dst.0 == dst.1 {
        Arc::clone(&xmap)
    } else {
        Arc::new(KernelMap::build(filter, src.1, dst.1)?)
    };
    Ok((xmap, ymap))
}

fn blur_maps<W: Weight>(extent: (usize, usize), radius: f64) -> Result<MapPair<W>, ResizeError> {
    let xmap = Arc::new(KernelMap::blur(extent.0, radius)?);
    let ymap = if extent.0 == extent.1 {
        Arc::clone(&xmap)
    } else {
        Arc::new(KernelMap::blur(extent.1, radius)?)
    };
    Ok((xmap, ymap))
}

fn downcast<W: Weight, T: Weight>(map: Arc<KernelMap<W>>) -> Result<Arc<KernelMap<T>>, ResizeError> {
    let map: Arc<dyn Any + Send + Sync> = map;
    map.downcast::<KernelMap<T>>().map_err(|_| {
        ResizeError::InvalidFilter("kernel map weight type does not match the pixel format")
    })
}

// ===========================================================================
// Public transform
// ===========================================================================

/// A [`PixelSource`] that resamples (or sharpens) its upstream source.
///
/// All working memory is rented from a [`BufferPool`] at construction and
/// returned by [`dispose`](Self::dispose) or on drop.
#[derive(Debug)]
pub struct ConvolutionTransform<S> {
    source: S,
    format: PixelFormat,
    width: usize,
    height: usize,
    engine: Option<Engine>,
}

impl<S: PixelSource> ConvolutionTransform<S> {
    /// Resamples `source` to `width` × `height` with `filter` on both axes.
    pub fn new<F: InterpolationFilter + ?Sized>(
        source: S,
        filter: &F,
        width: usize,
        height: usize,
    ) -> Result<Self, ResizeError> {
        Self::new_in(source, filter, width, height, &BufferPool::shared())
    }

    /// [`new`](Self::new) with buffers from `pool`.
    pub fn new_in<F: InterpolationFilter + ?Sized>(
        source: S,
        filter: &F,
        width: usize,
        height: usize,
        pool: &Arc<BufferPool>,
    ) -> Result<Self, ResizeError> {
        let src = source.extent();
        let dst = (width, height);
        let engine = match Family::select(source.format())? {
            Family::Byte(c) => Engine::Byte(Pipeline::new(c, axis_maps(filter, src, dst)?, None, pool)?),
            Family::Uq15(c) => Engine::Uq15(Pipeline::new(c, axis_maps(filter, src, dst)?, None, pool)?),
            Family::Float(c) => {
                Engine::Float(Pipeline::new(c, axis_maps(filter, src, dst)?, None, pool)?)
            }
        };
        Ok(Self::assemble(source, dst, engine))
    }

    /// Resamples `source` with prebuilt maps.
    ///
    /// Byte and UQ15 formats take `KernelMap<i32>`, float formats take
    /// `KernelMap<f32>`.
    pub fn with_maps<W: Weight>(
        source: S,
        xmap: Arc<KernelMap<W>>,
        ymap: Arc<KernelMap<W>>,
    ) -> Result<Self, ResizeError> {
        Self::with_maps_in(source, xmap, ymap, &BufferPool::shared())
    }

    /// [`with_maps`](Self::with_maps) with buffers from `pool`.
    pub fn with_maps_in<W: Weight>(
        source: S,
        xmap: Arc<KernelMap<W>>,
        ymap: Arc<KernelMap<W>>,
        pool: &Arc<BufferPool>,
    ) -> Result<Self, ResizeError> {
        let (w, h) = source.extent();
        for (map, actual) in [(&xmap, w), (&ymap, h)] {
            if map.in_pixels() != actual {
                return Err(ResizeError::MapMismatch {
                    expected: map.in_pixels(),
                    actual,
                });
            }
        }
        let dst = (xmap.out_pixels(), ymap.out_pixels());
        let engine = match Family::select(source.format())? {
            Family::Byte(c) => {
                Engine::Byte(Pipeline::new(c, (downcast(xmap)?, downcast(ymap)?), None, pool)?)
            }
            Family::Uq15(c) => {
                Engine::Uq15(Pipeline::new(c, (downcast(xmap)?, downcast(ymap)?), None, pool)?)
            }
            Family::Float(c) => {
                Engine::Float(Pipeline::new(c, (downcast(xmap)?, downcast(ymap)?), None, pool)?)
            }
        };
        Ok(Self::assemble(source, dst, engine))
    }

    /// Sharpens `source` with an unsharp mask; the extent is unchanged.
    pub fn unsharp(source: S, settings: UnsharpSettings) -> Result<Self, ResizeError> {
        Self::unsharp_in(source, settings, &BufferPool::shared())
    }

    /// [`unsharp`](Self::unsharp) with buffers from `pool`.
    pub fn unsharp_in(
        source: S,
        settings: UnsharpSettings,
        pool: &Arc<BufferPool>,
    ) -> Result<Self, ResizeError> {
        settings.validate()?;
        let sharpen = Some(SharpenParams {
            amount: settings.amount,
            threshold: settings.threshold,
        });
        let extent = source.extent();
        let radius = settings.radius;
        let engine = match Family::select(source.format())? {
            Family::Byte(c) => Engine::Byte(Pipeline::new(c, blur_maps(extent, radius)?, sharpen, pool)?),
            Family::Uq15(c) => Engine::Uq15(Pipeline::new(c, blur_maps(extent, radius)?, sharpen, pool)?),
            Family::Float(c) => {
                Engine::Float(Pipeline::new(c, blur_maps(extent, radius)?, sharpen, pool)?)
            }
        };
        Ok(Self::assemble(source, extent, engine))
    }

    fn assemble(source: S, (width, height): (usize, usize), engine: Engine) -> Self {
        Self {
            format: source.format(),
            source,
            width,
            height,
            engine: Some(engine),
        }
    }
}

impl<S> ConvolutionTransform<S> {
    /// Returns all working buffers to their pool. Later reads fail with
    /// [`ResizeError::Disposed`].
    pub fn dispose(&mut self) {
        if self.engine.take().is_some() {
            log::debug!("convolution {}x{} disposed", self.width, self.height);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.engine.is_none()
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Disposes the pipeline and returns the upstream source.
    pub fn into_inner(mut self) -> S {
        self.dispose();
        self.source
    }
}

impl<S: PixelSource> PixelSource for ConvolutionTransform<S> {
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
        let Self {
            source,
            format,
            width,
            height,
            engine,
        } = self;
        let engine = engine.as_mut().ok_or(ResizeError::Disposed)?;
        check_request(rect, *width, *height, format.bpp(), stride, buf.len())?;
        if rect.width == 0 || rect.height == 0 {
            return Ok(());
        }
        match engine {
            Engine::Byte(p) => p.copy_pixels(source, rect, stride, buf),
            Engine::Uq15(p) => p.copy_pixels(source, rect, stride, buf),
            Engine::Float(p) => p.copy_pixels(source, rect, stride, buf),
        }
    }
}

// ===========================================================================
// Settings
// ===========================================================================

/// A resize, optionally followed by an unsharp mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeSettings {
    pub width: usize,
    pub height: usize,
    pub filter: Interpolation,
    pub unsharp: Option<UnsharpSettings>,
}

impl ResizeSettings {
    /// Resize to `width` × `height` with [`Interpolation::LANCZOS`].
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            filter: Interpolation::default(),
            unsharp: None,
        }
    }

    pub fn with_filter(mut self, filter: Interpolation) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_unsharp(mut self, unsharp: UnsharpSettings) -> Self {
        self.unsharp = Some(unsharp);
        self
    }

    /// Stacks the configured stages on top of `source`.
    pub fn build<'a, S: PixelSource + 'a>(
        &self,
        source: S,
    ) -> Result<Box<dyn PixelSource + 'a>, ResizeError> {
        self.filter.validate()?;
        if let Some(unsharp) = &self.unsharp {
            unsharp.validate()?;
        }
        let resized = ConvolutionTransform::new(source, &self.filter, self.width, self.height)?;
        Ok(match self.unsharp {
            Some(unsharp) if unsharp.amount > 0 => {
                Box::new(ConvolutionTransform::unsharp(resized, unsharp)?)
            }
            _ => Box::new(resized),
        })
    }
}
