// UQ15 kernels for 16-bit linear samples. Products of a sample and a weight
// need 31 bits before negative lobes overshoot, so accumulators are i64.

use archmage::incant;
use archmage::prelude::*;

use super::{Convolver, SharpenParams, color_channels};
use crate::AlphaMode;
use crate::fixed::{UQ15_MAX, UQ15_ONE, clamp_to_uq15, clamp_to_uq15_one, unfix15_wide};
use crate::kernel_map::KernelMap;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Uq15Convolver {
    channels: usize,
    alpha: AlphaMode,
}

impl Uq15Convolver {
    pub(crate) fn new(channels: usize, alpha: AlphaMode) -> Self {
        Self { channels, alpha }
    }

    #[inline]
    fn straight(&self) -> bool {
        self.channels == 4 && self.alpha == AlphaMode::Straight
    }
}

impl Convolver for Uq15Convolver {
    type Sample = u16;
    type Weight = i32;
    type Inter = i32;

    #[inline]
    fn channels(&self) -> usize {
        self.channels
    }

    fn convolve_source_line(
        &self,
        src: &[u16],
        inter: &mut [i32],
        inter_stride: usize,
        xmap: &KernelMap<i32>,
    ) {
        let (anchors, weights, samples) = (xmap.anchors(), xmap.all_weights(), xmap.samples());
        let (channels, straight) = (self.channels, self.straight());
        incant!(
            convolve_uq15(src, inter, inter_stride, anchors, weights, samples, channels, straight),
            [v3, scalar]
        );
    }

    fn write_dest_line(
        &self,
        inter: &[i32],
        inter_stride: usize,
        dst: &mut [u16],
        weights: &[i32],
        ox: usize,
        ow: usize,
    ) {
        let (channels, straight) = (self.channels, self.straight());
        let color = color_channels(self.channels, self.alpha);
        incant!(
            write_uq15(inter, inter_stride, dst, weights, ox, ow, channels, color, straight),
            [v3, scalar]
        );
    }

    fn sharpen_line(
        &self,
        original: &[u16],
        blurred: &[u16],
        dst: &mut [u16],
        sharpen: &SharpenParams,
    ) {
        let amount = (i64::from(sharpen.amount) * i64::from(UQ15_ONE) + 50) / 100;
        let threshold = (i32::from(sharpen.threshold) * UQ15_ONE + 127) / 255;
        let (channels, color) = (self.channels, color_channels(self.channels, self.alpha));
        incant!(
            sharpen_uq15(original, blurred, dst, amount, threshold, channels, color),
            [v3, scalar]
        );
    }
}

// ===========================================================================
// Row bodies
// ===========================================================================

#[inline(always)]
fn convolve_row<const CH: usize>(
    src: &[u16],
    inter: &mut [i32],
    stride: usize,
    anchors: &[u32],
    weights: &[i32],
    samples: usize,
) {
    for (x, (&anchor, w)) in anchors.iter().zip(weights.chunks_exact(samples)).enumerate() {
        let px = &src[anchor as usize * CH..][..samples * CH];
        let mut acc = [0i64; CH];
        for (p, &w) in px.chunks_exact(CH).zip(w) {
            for (a, &v) in acc.iter_mut().zip(p) {
                *a += i64::from(v) * i64::from(w);
            }
        }
        for (t, a) in inter[x * stride..][..CH].iter_mut().zip(acc) {
            *t = unfix15_wide(a);
        }
    }
}

/// Intermediate color is premultiplied UQ15 (`c * a / ONE`); alpha is plain.
#[inline(always)]
fn convolve_row_straight(
    src: &[u16],
    inter: &mut [i32],
    stride: usize,
    anchors: &[u32],
    weights: &[i32],
    samples: usize,
) {
    for (x, (&anchor, w)) in anchors.iter().zip(weights.chunks_exact(samples)).enumerate() {
        let px = &src[anchor as usize * 4..][..samples * 4];
        let mut acc = [0i64; 3];
        let mut acc_a = 0i64;
        for (p, &w) in px.chunks_exact(4).zip(w) {
            let alpha = i64::from(p[3]);
            let w = i64::from(w);
            acc_a += alpha * w;
            for (a, &v) in acc.iter_mut().zip(&p[..3]) {
                *a += i64::from(v) * alpha * w;
            }
        }
        let t = &mut inter[x * stride..][..4];
        for (t, a) in t.iter_mut().zip(acc) {
            *t = ((a + (1 << 29)) >> 30) as i32;
        }
        t[3] = unfix15_wide(acc_a);
    }
}

#[inline(always)]
fn write_row<const CH: usize>(
    inter: &[i32],
    stride: usize,
    dst: &mut [u16],
    weights: &[i32],
    ox: usize,
    ow: usize,
    color: usize,
) {
    let samples = weights.len();
    for (x, out) in (ox..ox + ow).zip(dst.chunks_exact_mut(CH)) {
        let col = &inter[x * stride..][..samples * CH];
        let mut acc = [0i64; CH];
        for (t, &w) in col.chunks_exact(CH).zip(weights) {
            for (a, &v) in acc.iter_mut().zip(t) {
                *a += i64::from(v) * i64::from(w);
            }
        }
        for (c, (o, a)) in out.iter_mut().zip(acc).enumerate() {
            let v = unfix15_wide(a);
            *o = if c < color {
                clamp_to_uq15(v)
            } else {
                clamp_to_uq15_one(v)
            };
        }
    }
}

#[inline(always)]
fn write_row_straight(
    inter: &[i32],
    stride: usize,
    dst: &mut [u16],
    weights: &[i32],
    ox: usize,
    ow: usize,
) {
    let samples = weights.len();
    for (x, out) in (ox..ox + ow).zip(dst.chunks_exact_mut(4)) {
        let col = &inter[x * stride..][..samples * 4];
        let mut acc = [0i64; 3];
        let mut acc_a = 0i64;
        for (t, &w) in col.chunks_exact(4).zip(weights) {
            let w = i64::from(w);
            acc_a += i64::from(t[3]) * w;
            for (a, &v) in acc.iter_mut().zip(&t[..3]) {
                *a += i64::from(v) * w;
            }
        }
        let alpha = clamp_to_uq15_one(unfix15_wide(acc_a));
        out[3] = alpha;
        if alpha == 0 {
            out[..3].fill(0);
            continue;
        }
        for (o, a) in out[..3].iter_mut().zip(acc) {
            let v = (a * i64::from(UQ15_ONE) + acc_a / 2) / acc_a;
            *o = v.clamp(0, i64::from(UQ15_MAX)) as u16;
        }
    }
}

#[inline(always)]
fn sharpen_row<const CH: usize>(
    original: &[u16],
    blurred: &[u16],
    dst: &mut [u16],
    amount: i64,
    threshold: i32,
    color: usize,
) {
    for ((o, b), d) in original
        .chunks_exact(CH)
        .zip(blurred.chunks_exact(CH))
        .zip(dst.chunks_exact_mut(CH))
    {
        for c in 0..CH {
            let oc = i32::from(o[c]);
            let diff = oc - i32::from(b[c]);
            d[c] = if c < color && diff.abs() >= threshold {
                clamp_to_uq15(oc + unfix15_wide(i64::from(diff) * amount))
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
fn convolve_uq15_body(
    src: &[u16],
    inter: &mut [i32],
    stride: usize,
    anchors: &[u32],
    weights: &[i32],
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
fn write_uq15_body(
    inter: &[i32],
    stride: usize,
    dst: &mut [u16],
    weights: &[i32],
    ox: usize,
    ow: usize,
    channels: usize,
    color: usize,
    straight: bool,
) {
    match (channels, straight) {
        (1, _) => write_row::<1>(inter, stride, dst, weights, ox, ow, color),
        (2, _) => write_row::<2>(inter, stride, dst, weights, ox, ow, color),
        (3, _) => write_row::<3>(inter, stride, dst, weights, ox, ow, color),
        (4, false) => write_row::<4>(inter, stride, dst, weights, ox, ow, color),
        (4, true) => write_row_straight(inter, stride, dst, weights, ox, ow),
        _ => unreachable!("channel count is validated when the kernel is selected"),
    }
}

#[inline(always)]
fn sharpen_uq15_body(
    original: &[u16],
    blurred: &[u16],
    dst: &mut [u16],
    amount: i64,
    threshold: i32,
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
fn convolve_uq15_scalar(
    _token: ScalarToken,
    src: &[u16],
    inter: &mut [i32],
    stride: usize,
    anchors: &[u32],
    weights: &[i32],
    samples: usize,
    channels: usize,
    straight: bool,
) {
    convolve_uq15_body(src, inter, stride, anchors, weights, samples, channels, straight);
}

#[allow(clippy::too_many_arguments)]
fn write_uq15_scalar(
    _token: ScalarToken,
    inter: &[i32],
    stride: usize,
    dst: &mut [u16],
    weights: &[i32],
    ox: usize,
    ow: usize,
    channels: usize,
    color: usize,
    straight: bool,
) {
    write_uq15_body(inter, stride, dst, weights, ox, ow, channels, color, straight);
}

#[allow(clippy::too_many_arguments)]
fn sharpen_uq15_scalar(
    _token: ScalarToken,
    original: &[u16],
    blurred: &[u16],
    dst: &mut [u16],
    amount: i64,
    threshold: i32,
    channels: usize,
    color: usize,
) {
    sharpen_uq15_body(original, blurred, dst, amount, threshold, channels, color);
}

#[cfg(target_arch = "x86_64")]
#[arcane]
#[allow(clippy::too_many_arguments)]
fn convolve_uq15_v3(
    _token: X64V3Token,
    src: &[u16],
    inter: &mut [i32],
    stride: usize,
    anchors: &[u32],
    weights: &[i32],
    samples: usize,
    channels: usize,
    straight: bool,
) {
    convolve_uq15_body(src, inter, stride, anchors, weights, samples, channels, straight);
}

#[cfg(target_arch = "x86_64")]
#[arcane]
#[allow(clippy::too_many_arguments)]
fn write_uq15_v3(
    _token: X64V3Token,
    inter: &[i32],
    stride: usize,
    dst: &mut [u16],
    weights: &[i32],
    ox: usize,
    ow: usize,
    channels: usize,
    color: usize,
    straight: bool,
) {
    write_uq15_body(inter, stride, dst, weights, ox, ow, channels, color, straight);
}

#[cfg(target_arch = "x86_64")]
#[arcane]
#[allow(clippy::too_many_arguments)]
fn sharpen_uq15_v3(
    _token: X64V3Token,
    original: &[u16],
    blurred: &[u16],
    dst: &mut [u16],
    amount: i64,
    threshold: i32,
    channels: usize,
    color: usize,
) {
    sharpen_uq15_body(original, blurred, dst, amount, threshold, channels, color);
}
