// Byte kernels. Weights are UQ15; the horizontal pass keeps 7 extra bits
// (sample << 7) in the intermediate row and the vertical pass drops 22.
// Vertical accumulators are 64-bit: ringing can push intermediates past
// the byte range before the second set of weights multiplies them.

use archmage::incant;
use archmage::prelude::*;

use super::{Convolver, SharpenParams, color_channels};
use crate::AlphaMode;
use crate::fixed::{clamp_to_byte, fix15, unfix8, unfix15, unfix15_wide, unfix22_wide_to_byte};
use crate::kernel_map::KernelMap;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ByteConvolver {
    channels: usize,
    alpha: AlphaMode,
}

impl ByteConvolver {
    pub(crate) fn new(channels: usize, alpha: AlphaMode) -> Self {
        Self { channels, alpha }
    }

    #[inline]
    fn straight(&self) -> bool {
        self.channels == 4 && self.alpha == AlphaMode::Straight
    }
}

impl Convolver for ByteConvolver {
    type Sample = u8;
    type Weight = i32;
    type Inter = i32;

    #[inline]
    fn channels(&self) -> usize {
        self.channels
    }

    fn convolve_source_line(
        &self,
        src: &[u8],
        inter: &mut [i32],
        inter_stride: usize,
        xmap: &KernelMap<i32>,
    ) {
        let (anchors, weights, samples) = (xmap.anchors(), xmap.all_weights(), xmap.samples());
        let (channels, straight) = (self.channels, self.straight());
        incant!(
            convolve_bytes(src, inter, inter_stride, anchors, weights, samples, channels, straight),
            [v3, scalar]
        );
    }

    fn write_dest_line(
        &self,
        inter: &[i32],
        inter_stride: usize,
        dst: &mut [u8],
        weights: &[i32],
        ox: usize,
        ow: usize,
    ) {
        let (channels, straight) = (self.channels, self.straight());
        incant!(
            write_bytes(inter, inter_stride, dst, weights, ox, ow, channels, straight),
            [v3, scalar]
        );
    }

    fn sharpen_line(&self, original: &[u8], blurred: &[u8], dst: &mut [u8], sharpen: &SharpenParams) {
        let amount = fix15(f64::from(sharpen.amount) / 100.0);
        let threshold = i32::from(sharpen.threshold);
        let (channels, color) = (self.channels, color_channels(self.channels, self.alpha));
        incant!(
            sharpen_bytes(original, blurred, dst, amount, threshold, channels, color),
            [v3, scalar]
        );
    }
}

// ===========================================================================
// Row bodies
// ===========================================================================

#[inline(always)]
fn convolve_row<const CH: usize>(
    src: &[u8],
    inter: &mut [i32],
    stride: usize,
    anchors: &[u32],
    weights: &[i32],
    samples: usize,
) {
    for (x, (&anchor, w)) in anchors.iter().zip(weights.chunks_exact(samples)).enumerate() {
        let px = &src[anchor as usize * CH..][..samples * CH];
        let mut acc = [0i32; CH];
        for (p, &w) in px.chunks_exact(CH).zip(w) {
            for (a, &v) in acc.iter_mut().zip(p) {
                *a += i32::from(v) * w;
            }
        }
        for (t, a) in inter[x * stride..][..CH].iter_mut().zip(acc) {
            *t = unfix8(a);
        }
    }
}

/// Straight alpha: color is weighted by alpha so transparent pixels do not
/// bleed. Intermediate color holds `c * a` in UQ15 weight scale.
#[inline(always)]
fn convolve_row_straight(
    src: &[u8],
    inter: &mut [i32],
    stride: usize,
    anchors: &[u32],
    weights: &[i32],
    samples: usize,
) {
    for (x, (&anchor, w)) in anchors.iter().zip(weights.chunks_exact(samples)).enumerate() {
        let px = &src[anchor as usize * 4..][..samples * 4];
        let mut acc = [0i64; 3];
        let mut acc_a = 0i32;
        for (p, &w) in px.chunks_exact(4).zip(w) {
            let alpha = i32::from(p[3]);
            acc_a += alpha * w;
            for (a, &v) in acc.iter_mut().zip(&p[..3]) {
                *a += i64::from(i32::from(v) * alpha) * i64::from(w);
            }
        }
        let t = &mut inter[x * stride..][..4];
        for (t, a) in t.iter_mut().zip(acc) {
            *t = unfix15_wide(a);
        }
        t[3] = unfix8(acc_a);
    }
}

#[inline(always)]
fn write_row<const CH: usize>(
    inter: &[i32],
    stride: usize,
    dst: &mut [u8],
    weights: &[i32],
    ox: usize,
    ow: usize,
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
        for (o, a) in out.iter_mut().zip(acc) {
            *o = unfix22_wide_to_byte(a);
        }
    }
}

#[inline(always)]
fn write_row_straight(
    inter: &[i32],
    stride: usize,
    dst: &mut [u8],
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
            acc_a += i64::from(t[3]) * i64::from(w);
            for (a, &v) in acc.iter_mut().zip(&t[..3]) {
                *a += i64::from(v) * i64::from(w);
            }
        }
        let alpha = unfix22_wide_to_byte(acc_a);
        out[3] = alpha;
        if alpha == 0 {
            out[..3].fill(0);
            continue;
        }
        // acc is c * a << 15, acc_a is a << 22
        let den = acc_a;
        for (o, a) in out[..3].iter_mut().zip(acc) {
            *o = (((a << 7) + den / 2) / den).clamp(0, 255) as u8;
        }
    }
}

#[inline(always)]
fn sharpen_row<const CH: usize>(
    original: &[u8],
    blurred: &[u8],
    dst: &mut [u8],
    amount: i32,
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
                clamp_to_byte(oc + unfix15(diff * amount))
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
fn convolve_bytes_body(
    src: &[u8],
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
fn write_bytes_body(
    inter: &[i32],
    stride: usize,
    dst: &mut [u8],
    weights: &[i32],
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
fn sharpen_bytes_body(
    original: &[u8],
    blurred: &[u8],
    dst: &mut [u8],
    amount: i32,
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
fn convolve_bytes_scalar(
    _token: ScalarToken,
    src: &[u8],
    inter: &mut [i32],
    stride: usize,
    anchors: &[u32],
    weights: &[i32],
    samples: usize,
    channels: usize,
    straight: bool,
) {
    convolve_bytes_body(src, inter, stride, anchors, weights, samples, channels, straight);
}

#[allow(clippy::too_many_arguments)]
fn write_bytes_scalar(
    _token: ScalarToken,
    inter: &[i32],
    stride: usize,
    dst: &mut [u8],
    weights: &[i32],
    ox: usize,
    ow: usize,
    channels: usize,
    straight: bool,
) {
    write_bytes_body(inter, stride, dst, weights, ox, ow, channels, straight);
}

#[allow(clippy::too_many_arguments)]
fn sharpen_bytes_scalar(
    _token: ScalarToken,
    original: &[u8],
    blurred: &[u8],
    dst: &mut [u8],
    amount: i32,
    threshold: i32,
    channels: usize,
    color: usize,
) {
    sharpen_bytes_body(original, blurred, dst, amount, threshold, channels, color);
}

#[cfg(target_arch = "x86_64")]
#[arcane]
#[allow(clippy::too_many_arguments)]
fn convolve_bytes_v3(
    _token: X64V3Token,
    src: &[u8],
    inter: &mut [i32],
    stride: usize,
    anchors: &[u32],
    weights: &[i32],
    samples: usize,
    channels: usize,
    straight: bool,
) {
    convolve_bytes_body(src, inter, stride, anchors, weights, samples, channels, straight);
}

#[cfg(target_arch = "x86_64")]
#[arcane]
#[allow(clippy::too_many_arguments)]
fn write_bytes_v3(
    _token: X64V3Token,
    inter: &[i32],
    stride: usize,
    dst: &mut [u8],
    weights: &[i32],
    ox: usize,
    ow: usize,
    channels: usize,
    straight: bool,
) {
    write_bytes_body(inter, stride, dst, weights, ox, ow, channels, straight);
}

#[cfg(target_arch = "x86_64")]
#[arcane]
#[allow(clippy::too_many_arguments)]
fn sharpen_bytes_v3(
    _token: X64V3Token,
    original: &[u8],
    blurred: &[u8],
    dst: &mut [u8],
    amount: i32,
    threshold: i32,
    channels: usize,
    color: usize,
) {
    sharpen_bytes_body(original, blurred, dst, amount, threshold, channels, color);
}
