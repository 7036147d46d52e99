//! Per-axis resampling weight tables.

use alloc::vec;
use alloc::vec::Vec;

use crate::ResizeError;
use crate::filter::{Gaussian, InterpolationFilter};
use crate::fixed::{UQ15_ONE, fix15};

/// Numeric representation of filter weights.
///
/// `i32` holds UQ15 fixed point (one is 32768) and is used by the byte and
/// UQ15 kernels; `f32` is used by the float kernels.
pub trait Weight: bytemuck::Pod + Default + PartialEq + core::fmt::Debug + Send + Sync {
    /// Writes `real` (which sums to 1.0) into `out` in this representation,
    /// adding any rounding residual to `out[center]` so the row sums to one.
    fn quantize(real: &[f64], center: usize, out: &mut [Self]);
}

impl Weight for i32 {
    fn quantize(real: &[f64], center: usize, out: &mut [Self]) {
        let mut sum = 0;
        for (o, &r) in out.iter_mut().zip(real) {
            *o = fix15(r);
            sum += *o;
        }
        out[center] += UQ15_ONE - sum;
    }
}

impl Weight for f32 {
    fn quantize(real: &[f64], center: usize, out: &mut [Self]) {
        let mut sum = 0.0f32;
        for (o, &r) in out.iter_mut().zip(real) {
            *o = r as f32;
            sum += *o;
        }
        out[center] += 1.0 - sum;
    }
}

impl Weight for f64 {
    fn quantize(real: &[f64], center: usize, out: &mut [Self]) {
        out[..real.len()].copy_from_slice(real);
        let sum: f64 = out.iter().sum();
        out[center] += 1.0 - sum;
    }
}

/// Upper bound on the sum of absolute normalized weights in one record.
/// Keeps every fixed-point accumulator in range.
pub const MAX_GAIN: f64 = 16.0;

/// Weight table for one axis: for each output sample, the first source
/// sample it reads (`anchor`) and `samples` weights.
///
/// Every record has the same width. Records near the edges are slid inward
/// instead of shrunk, so `anchor + samples <= in_pixels` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelMap<W> {
    in_pixels: usize,
    out_pixels: usize,
    samples: usize,
    anchors: Vec<u32>,
    weights: Vec<W>,
}

impl<W: Weight> KernelMap<W> {
    /// Builds the map resampling `in_pixels` source samples to `out_pixels`.
    ///
    /// When downscaling the filter is stretched by `in_pixels / out_pixels`
    /// so its footprint covers every contributing source sample.
    pub fn build<F: InterpolationFilter + ?Sized>(
        filter: &F,
        in_pixels: usize,
        out_pixels: usize,
    ) -> Result<Self, ResizeError> {
        if in_pixels == 0 || out_pixels == 0 {
            return Err(ResizeError::ZeroExtent);
        }
        if in_pixels > u32::MAX as usize || out_pixels > u32::MAX as usize {
            return Err(ResizeError::OutOfMemory);
        }
        filter.validate()?;
        let support = filter.support();
        if !support.is_finite() || support <= 0.0 {
            return Err(ResizeError::InvalidFilter(
                "support must be positive and finite",
            ));
        }

        let scale = out_pixels as f64 / in_pixels as f64;
        let fscale = scale.min(1.0);
        let support = support / fscale;
        let samples = ((support * 2.0).ceil() as usize).clamp(1, in_pixels);
        let max_anchor = (in_pixels - samples) as isize;

        let mut anchors = Vec::new();
        anchors
            .try_reserve_exact(out_pixels)
            .map_err(|_| ResizeError::OutOfMemory)?;
        let len = out_pixels
            .checked_mul(samples)
            .ok_or(ResizeError::OutOfMemory)?;
        let mut weights = Vec::new();
        weights
            .try_reserve_exact(len)
            .map_err(|_| ResizeError::OutOfMemory)?;
        weights.resize(len, W::default());

        let mut real = vec![0.0f64; samples];
        for (i, row) in weights.chunks_exact_mut(samples).enumerate() {
            let center = (i as f64 + 0.5) / scale - 0.5;
            let left = ((center - support).ceil() as isize).clamp(0, max_anchor) as usize;
            // closest tap to the ideal center, lower index on ties
            let nearest =
                ((center - 0.5).ceil() as isize - left as isize).clamp(0, samples as isize - 1)
                    as usize;

            let (mut sum, mut mass) = (0.0, 0.0);
            for (k, w) in real.iter_mut().enumerate() {
                *w = filter.weight(((left + k) as f64 - center) * fscale);
                sum += *w;
                mass += w.abs();
            }
            if !mass.is_finite() {
                return Err(ResizeError::InvalidFilter("filter weights must be finite"));
            }
            if sum.abs() < 1e-12 {
                real.fill(0.0);
                real[nearest] = 1.0;
            } else if mass / sum.abs() > MAX_GAIN {
                return Err(ResizeError::InvalidFilter("filter gain is too high"));
            } else {
                for w in real.iter_mut() {
                    *w /= sum;
                }
            }

            W::quantize(&real, nearest, row);
            anchors.push(left as u32);
        }

        Ok(Self {
            in_pixels,
            out_pixels,
            samples,
            anchors,
            weights,
        })
    }

    /// Builds a same-extent Gaussian blur map with standard deviation `radius`.
    pub fn blur(pixels: usize, radius: f64) -> Result<Self, ResizeError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ResizeError::InvalidFilter("blur radius must be positive"));
        }
        Self::build(&Gaussian { sigma: radius }, pixels, pixels)
    }
}

impl<W> KernelMap<W> {
    #[inline]
    pub fn in_pixels(&self) -> usize {
        self.in_pixels
    }

    #[inline]
    pub fn out_pixels(&self) -> usize {
        self.out_pixels
    }

    /// Number of source samples contributing to every output sample.
    #[inline]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// First source sample read for output index `i`.
    #[inline]
    pub fn anchor(&self, i: usize) -> usize {
        self.anchors[i] as usize
    }

    /// Weights for output index `i`, applying to source samples
    /// `anchor(i)..anchor(i) + samples()`.
    #[inline]
    pub fn weights(&self, i: usize) -> &[W] {
        &self.weights[i * self.samples..][..self.samples]
    }

    /// All weights, `samples()` per output index.
    #[inline]
    pub(crate) fn all_weights(&self) -> &[W] {
        &self.weights
    }

    #[inline]
    pub(crate) fn anchors(&self) -> &[u32] {
        &self.anchors
    }
}
