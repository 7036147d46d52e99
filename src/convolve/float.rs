// Float kernels. Values are carried through both passes unclamped; only
// sharpening clamps, to the nominal [0, 1] range. Straight alpha is
// premultiplied in the intermediate rows and divided back out per output
// pixel.

use archmage::incant;
use archmage::prelude::*;

use super::{Convolver, SharpenParams, color_channels};
use crate::AlphaMode;
use crate::kernel_map::KernelMap;

#[derive(Debug, Clone, Copy)]
pub(crate) struct FloatConvolver {
    channels: usize,
    alpha: AlphaMode,
}

impl FloatConvolver {
    pub(crate) fn new(channels: usize, alpha: AlphaMode) -> Self {
        Self { channels, alpha }
    }

    #[inline]
    fn straight(&self) -> bool {
        self.channels == 4 && self.alpha == AlphaMode::Straight
    }
}

impl Convolver for FloatConvolver {
    type Sample = f32;
    type Weight = f32;
    type Inter = f32;

    #[inline]
    fn channels(&self) -> usize {
        self.channels
    }

    fn convolve_source_line(
        &self,
        src: &[f32],
        inter: &mut [f32],
        inter_stride: usize,
        xmap: &KernelMap<f32>,
    ) {
        let (anchors, weights, samples) = (xmap.anchors(), xmap.all_weights(), xmap.samples());
        let (channels, straight) = (self.channels, self.straight());
        incant!(
            convolve_floats(src, inter, inter_stride, anchors, weights, samples, channels, straight),
            [v3, scalar]
        );
    }

    fn write_dest_line(
        &self,
        inter: &[f32],
        inter_stride: usize,
        dst: &mut [f32],
        weights: &[f32],
        ox: usize,
        ow: usize,
    ) {
        let (channels, straight) = (self.channels, self.straight());
        incant!(
            write_floats(inter, inter_stride, dst, weights, ox, ow, channels, straight),
            [v3, scalar]
        );
    }

    fn sharpen_line(
        &self,
        original: &[f32],
        blurred: &[f32],
        dst: &mut [f32],
        sharpen: &SharpenParams,
    ) {
        let amount = sharpen.amount as f32 / 100.0;
        let threshold = f32::from(sharpen.threshold) / 255.0;
        let (channels, color) = (self.channels, color_channels(self.channels, self.alpha));
        incant!(
            sharpen_floats(original, blurred, dst, amount, threshold, channels, color),
            [v3, scalar]
        );
    }
}

// ===========================================================================
// Row bodies
// ===========================================================================

#[inline(always)]
fn convolve_row<const CH: usize>(
    src: &[f32],
    inter: &mut [f32],
    stride: usize,
    anchors: &[u32],
    weights: &[f32],
    samples: usize,
) {
    for (x, (&anchor, w)) in anchors.iter().zip(weights.chunks_exact(samples)).enumerate() {
        let px = &src[anchor as usize * CH..][..samples * CH];
        let mut acc = [0.0f32; CH];
        for (p, &w) in px.chunks_exact(CH).zip(w) {
            for (a, &v) in acc.iter_mut().zip(p) {
                *a += v * w;
            }
        }
        inter[x * stride..][..CH].copy_from_slice(&acc);
    }
}

#[inline(always)]
fn convolve_row_straight(
    src: &[f32],
    inter: &mut [f32],
    stride: usize,
    anchors: &[u32],
    weights: &[f32],
    samples: usize,
) {
    for (x, (&anchor, w)) in anchors.iter().zip(weights.chunks_exact(samples)).enumerate() {
        let px = &src[anchor as usize * 4..][..samples * 4];
        let mut acc = [0.0f32; 4];
        for (p, &w) in px.chunks_exact(4).zip(w) {
            let aw = p[3] * w;
            for (a, &v) in acc[..3].iter_mut().zip(&p[..3]) {
                *a += v * aw;
            }
            acc[3] += aw;
        }
        inter[x * stride..][..4].copy_from_slice(&acc);
    }
}

#[inline(always)]
fn write_row<const CH: usize>(
    inter: &[f32],
    stride: usize,
    dst: &mut [f32],
    weights: &[f32],
    ox: usize,
    ow: usize,
) {
    let samples = weights.len();
    for (x, out) in (ox..ox + ow).zip(dst.chunks_exact_mut(CH)) {
        let col = &inter[x * stride..][..samples * CH];
        let mut acc = [0.0f32; CH];
        for (t, &w) in col.chunks_exact(CH).zip(weights) {
            for (a, &v) in acc.iter_mut().zip(t) {
                *a += v * w;
            }
        }
        out.copy_from_slice(&acc);
    }
}

#[inline(always)]
fn write_row_straight(
    inter: &[f32],
    stride: usize,
    dst: &mut [f32],
    weights: &[f32],
    ox: usize,
    ow: usize,
) {
    let samples = weights.len();
    for (x, out) in (ox..ox + ow).zip(dst.chunks_exact_mut(4)) {
        let col = &inter[x * stride..][..samples * 4];
        let mut acc = [0.0f32; 4];
        for (t, &w) in col.chunks_exact(4).zip(weights) {
            for (a, &v) in acc.iter_mut().zip(t) {
                *a += v * w;
            }
        }
        let alpha = acc[3];
        out[3] = alpha;
        if alpha <= 0.0 {
            out[..3].fill(0.0);
            continue;
        }
        for (o, a) in out[..3].iter_mut().zip(acc) {
            *o = a / alpha;
        }
    }
}

#[inline(always)]
fn sharpen_row<const CH: usize>(
    original: &[f32],
    blurred: &[f32],
    dst: &mut [f32],
    amount: f32,
    threshold: f32,
    color: usize,
) {
    for ((o, b), d) in original
        .chunks_exact(CH)
        .zip(blurred.chunks_exact(CH))
        .zip(dst.chunks_exact_mut(CH))
    {
        for c in 0..CH {
            let diff = o[c] - b[c];
            d[c] = if c < color && diff.abs() >= threshold {
                (o[c] + diff * amount).clamp(0.0, 1.0)
            } else {
                o[c]
            };
        }
    }
}

// ===========================================================================
// Channel dispatch
// ===========================================================================

#[inline(always)]
#[allow(clippy::too_many_arguments)]
fn convolve_floats_body(
    src: &[f32],
    inter: &mut [f32],
    stride: usize,
    anchors: &[u32],
    weights: &[f32],
    samples: usize,
    channels: usize,
    straight: bool,
) {
    match (channels, straight) {
        (1, _) => convolve_row::<1>(src, inter, stride, anchors, weights, samples),
        (2, _) => convolve_row::<2>(src, inter, stride, anchors, weights, samples),
        (3, _) => convolve_row::<3>(src, inter, stride, anchors, weights, samples),
        (4, false) => convolve_row::<4>(src, inter, stride, anchors, weights, samples),
        (4, true) => convolve_row_straight(src, inter, stride, anchors, weights, samples),
        _ => unreachable!("channel count is validated when the kernel is selected"),
    }
}

#[inline(always)]
#[allow(clippy::too_many_arguments)]
fn write_floats_body(
    inter: &[f32],
    stride: usize,
    dst: &mut [f32],
    weights: &[f32],
    ox: usize,
    ow: usize,
    channels: usize,
    straight: bool,
) {
    match (channels, straight) {
        (1, _) => write_row::<1>(inter, stride, dst, weights, ox, ow),
        (2, _) => write_row::<2>(inter, stride, dst, weights, ox, ow),
        (3, _) => write_row::<3>(inter, stride, dst, weights, ox, ow),
        (4, false) => write_row::<4>(inter, stride, dst, weights, ox, ow),
        (4, true) => write_row_straight(inter, stride, dst, weights, ox, ow),
        _ => unreachable!("channel count is validated when the kernel is selected"),
    }
}

#[inline(always)]
fn sharpen_floats_body(
    original: &[f32],
    blurred: &[f32],
    dst: &mut [f32],
    amount: f32,
    threshold: f32,
    channels: usize,
    color: usize,
) {
    match channels {
        1 => sharpen_row::<1>(original, blurred, dst, amount, threshold, color),
        2 => sharpen_row::<2>(original, blurred, dst, amount, threshold, color),
        3 => sharpen_row::<3>(original, blurred, dst, amount, threshold, color),
        4 => sharpen_row::<4>(original, blurred, dst, amount, threshold, color),
        _ => unreachable!("channel count is validated when the kernel is selected"),
    }
}

// ===========================================================================
// Dispatch targets for incant!
// ===========================================================================

#[allow(clippy::too_many_arguments)]
fn convolve_floats_scalar(
    _token: ScalarToken,
    src: &[f32],
    inter: &mut [f32],
    stride: usize,
    anchors: &[u32],
    weights: &[f32],
    samples: usize,
    channels: usize,
    straight: bool,
) {
    convolve_floats_body(src, inter, stride, anchors, weights, samples, channels, straight);
}

#[allow(clippy::too_many_arguments)]
fn write_floats_scalar(
    _token: ScalarToken,
    inter: &[f32],
    stride: usize,
    dst: &mut [f32],
    weights: &[f32],
    ox: usize,
    ow: usize,
    channels: usize,
    straight: bool,
) {
    write_floats_body(inter, stride, dst, weights, ox, ow, channels, straight);
}

#[allow(clippy::too_many_arguments)]
fn sharpen_floats_scalar(
    _token: ScalarToken,
    original: &[f32],
    blurred: &[f32],
    dst: &mut [f32],
    amount: f32,
    threshold: f32,
    channels: usize,
    color: usize,
) {
    sharpen_floats_body(original, blurred, dst, amount, threshold, channels, color);
}

#[cfg(target_arch = "x86_64")]
#[arcane]
#[allow(clippy::too_many_arguments)]
fn convolve_floats_v3(
    _token: X64V3Token,
    src: &[f32],
    inter: &mut [f32],
    stride: usize,
    anchors: &[u32],
    weights: &[f32],
    samples: usize,
    channels: usize,
    straight: bool,
) {
    convolve_floats_body(src, inter, stride, anchors, weights, samples, channels, straight);
}

#[cfg(target_arch = "x86_64")]
#[arcane]
#[allow(clippy::too_many_arguments)]
fn write_floats_v3(
    _token: X64V3Token,
    inter: &[f32],
    stride: usize,
    dst: &mut [f32],
    weights: &[f32],
    ox: usize,
    ow: usize,
    channels: usize,
    straight: bool,
) {
    write_floats_body(inter, stride, dst, weights, ox, ow, channels, straight);
}

#[cfg(target_arch = "x86_64")]
#[arcane]
#[allow(clippy::too_many_arguments)]
fn sharpen_floats_v3(
    _token: X64V3Token,
    original: &[f32],
    blurred: &[f32],
    dst: &mut [f32],
    amount: f32,
    threshold: f32,
    channels: usize,
    color: usize,
) {
    sharpen_floats_body(original, blurred, dst, amount, threshold, channels, color);
}
