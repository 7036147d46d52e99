extern crate std;

use super::*;
use crate::Interpolation;
use crate::fixed::UQ15_ONE;
use alloc::{vec, vec::Vec};
use archmage::testing::{CompileTimePolicy, for_each_token_permutation};

fn policy() -> CompileTimePolicy {
    if std::env::var_os("CI").is_some() {
        CompileTimePolicy::Fail
    } else {
        CompileTimePolicy::WarnStderr
    }
}

const WIDTHS: &[usize] = &[1, 2, 3, 7, 16, 33];

fn make_row<T: Copy>(n_values: usize, f: impl Fn(usize) -> T) -> Vec<T> {
    (0..n_values).map(f).collect()
}

/// Runs one row through both passes with a single-tap vertical kernel.
fn resample_row<C: Convolver>(
    conv: C,
    src: &[C::Sample],
    xmap: &KernelMap<C::Weight>,
    unit: C::Weight,
) -> Vec<C::Sample> {
    let ch = conv.channels();
    let mut inter = vec![C::Inter::default(); xmap.out_pixels() * ch];
    conv.convolve_source_line(src, &mut inter, ch, xmap);
    let mut dst = vec![C::Sample::default(); xmap.out_pixels() * ch];
    conv.write_dest_line(&inter, ch, &mut dst, &[unit], 0, xmap.out_pixels());
    dst
}

fn byte_formats() -> [PixelFormat; 6] {
    [
        PixelFormat::GRAY8,
        PixelFormat::CBCR16,
        PixelFormat::BGR24,
        PixelFormat::BGRX32,
        PixelFormat::BGRA32,
        PixelFormat::PBGRA32,
    ]
}

fn byte_conv(format: PixelFormat) -> ByteConvolver {
    match Family::select(format).unwrap() {
        Family::Byte(c) => c,
        other => panic!("{format} selected {other:?}"),
    }
}

fn uq15_conv(format: PixelFormat) -> Uq15Convolver {
    match Family::select(format).unwrap() {
        Family::Uq15(c) => c,
        other => panic!("{format} selected {other:?}"),
    }
}

fn float_conv(format: PixelFormat) -> FloatConvolver {
    match Family::select(format).unwrap() {
        Family::Float(c) => c,
        other => panic!("{format} selected {other:?}"),
    }
}

// -----------------------------------------------------------------------
// Kernel selection
// -----------------------------------------------------------------------

#[test]
fn unsupported_layouts_are_rejected() {
    let rejected = [
        PixelFormat::new(0, SampleType::U8, AlphaMode::None),
        PixelFormat::new(5, SampleType::U8, AlphaMode::None),
        PixelFormat::new(2, SampleType::Uq15, AlphaMode::None),
        PixelFormat::new(2, SampleType::U8, AlphaMode::Straight),
        PixelFormat::new(3, SampleType::F32, AlphaMode::Premultiplied),
        PixelFormat::new(1, SampleType::F32, AlphaMode::Straight),
    ];
    for format in rejected {
        assert!(
            matches!(Family::select(format), Err(ResizeError::UnsupportedFormat(f)) if f == format),
            "{format}"
        );
    }
}

#[test]
fn supported_layouts_pick_their_family() {
    for format in byte_formats() {
        assert!(matches!(Family::select(format), Ok(Family::Byte(_))), "{format}");
    }
    for format in [
        PixelFormat::GRAY16_UQ15,
        PixelFormat::BGR48_UQ15,
        PixelFormat::BGRA64_UQ15,
        PixelFormat::PBGRA64_UQ15,
    ] {
        assert!(matches!(Family::select(format), Ok(Family::Uq15(_))), "{format}");
    }
    for format in [
        PixelFormat::GRAY32_FLOAT,
        PixelFormat::CBCR64_FLOAT,
        PixelFormat::BGR96_FLOAT,
        PixelFormat::BGRA128_FLOAT,
        PixelFormat::PBGRA128_FLOAT,
    ] {
        assert!(matches!(Family::select(format), Ok(Family::Float(_))), "{format}");
    }
}

// -----------------------------------------------------------------------
// Convolution, tested at every capability tier
// -----------------------------------------------------------------------

#[test]
fn permutation_byte_identity() {
    let report = for_each_token_permutation(policy(), |perm| {
        for format in byte_formats() {
            let conv = byte_conv(format);
            for &w in WIDTHS {
                // opaque pixels so straight alpha is lossless too
                let src = make_row(w * format.channels(), |i| {
                    if format.channels() == 4 && i % 4 == 3 {
                        255
                    } else {
                        (i * 37 % 256) as u8
                    }
                });
                let xmap = KernelMap::build(&Interpolation::Box, w, w).unwrap();
                let out = resample_row(conv, &src, &xmap, UQ15_ONE);
                assert_eq!(out, src, "{format} w={w} tier={perm}");
            }
        }
    });
    std::eprintln!("byte_identity: {report}");
}

#[test]
fn permutation_byte_tracks_float_reference() {
    let report = for_each_token_permutation(policy(), |perm| {
        for &(src_w, dst_w) in &[(16usize, 7usize), (7, 16), (33, 33), (40, 3)] {
            let src = make_row(src_w * 3, |i| (i * 53 % 256) as u8);
            let fixed = KernelMap::<i32>::build(&Interpolation::LANCZOS, src_w, dst_w).unwrap();
            let real = KernelMap::<f64>::build(&Interpolation::LANCZOS, src_w, dst_w).unwrap();
            let out = resample_row(byte_conv(PixelFormat::BGR24), &src, &fixed, UQ15_ONE);
            for x in 0..dst_w {
                for c in 0..3 {
                    let expect: f64 = real
                        .weights(x)
                        .iter()
                        .enumerate()
                        .map(|(k, w)| f64::from(src[(real.anchor(x) + k) * 3 + c]) * w)
                        .sum();
                    let expect = expect.round().clamp(0.0, 255.0);
                    let got = f64::from(out[x * 3 + c]);
                    assert!(
                        (got - expect).abs() <= 1.0,
                        "{src_w}->{dst_w} x={x} c={c} got={got} expect={expect} tier={perm}"
                    );
                }
            }
        }
    });
    std::eprintln!("byte_tracks_float_reference: {report}");
}

#[test]
fn permutation_straight_alpha_does_not_bleed() {
    let report = for_each_token_permutation(policy(), |perm| {
        let xmap = KernelMap::build(&Interpolation::Box, 2, 1).unwrap();

        // opaque red next to transparent green
        let src = [255u8, 0, 0, 255, 0, 255, 0, 0];
        let out = resample_row(byte_conv(PixelFormat::BGRA32), &src, &xmap, UQ15_ONE);
        assert_eq!(out, [255, 0, 0, 128], "straight tier={perm}");

        // the same bytes treated as premultiplied average naively
        let out = resample_row(byte_conv(PixelFormat::PBGRA32), &src, &xmap, UQ15_ONE);
        assert_eq!(out, [128, 128, 0, 128], "premultiplied tier={perm}");

        let clear = [90u8, 10, 200, 0, 4, 5, 6, 0];
        let out = resample_row(byte_conv(PixelFormat::BGRA32), &clear, &xmap, UQ15_ONE);
        assert_eq!(out, [0, 0, 0, 0], "transparent tier={perm}");

        let src = [32768u16, 0, 0, 32768, 0, 32768, 0, 0];
        let out = resample_row(uq15_conv(PixelFormat::BGRA64_UQ15), &src, &xmap, UQ15_ONE);
        assert_eq!(out, [32768, 0, 0, 16384], "uq15 straight tier={perm}");

        let xmap = KernelMap::<f32>::build(&Interpolation::Box, 2, 1).unwrap();
        let src = [1.0f32, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let out = resample_row(float_conv(PixelFormat::BGRA128_FLOAT), &src, &xmap, 1.0);
        assert_eq!(out, [1.0, 0.0, 0.0, 0.5], "float straight tier={perm}");
        let out = resample_row(float_conv(PixelFormat::PBGRA128_FLOAT), &src, &xmap, 1.0);
        assert_eq!(out, [0.5, 0.5, 0.0, 0.5], "float premultiplied tier={perm}");
        let clear = [0.3f32, 0.6, 0.9, 0.0, 0.1, 0.2, 0.3, 0.0];
        let out = resample_row(float_conv(PixelFormat::BGRA128_FLOAT), &clear, &xmap, 1.0);
        assert_eq!(out, [0.0; 4], "float transparent tier={perm}");
    });
    std::eprintln!("straight_alpha_does_not_bleed: {report}");
}

#[test]
fn permutation_uq15_identity_keeps_headroom() {
    let report = for_each_token_permutation(policy(), |perm| {
        for format in [PixelFormat::GRAY16_UQ15, PixelFormat::BGR48_UQ15] {
            let conv = uq15_conv(format);
            for &w in WIDTHS {
                let src = make_row(w * format.channels(), |i| (i * 4099 % 65536) as u16);
                let xmap = KernelMap::build(&Interpolation::Box, w, w).unwrap();
                assert_eq!(resample_row(conv, &src, &xmap, UQ15_ONE), src, "{format} tier={perm}");
            }
        }
    });
    std::eprintln!("uq15_identity_keeps_headroom: {report}");
}

#[test]
fn permutation_uq15_output_clamps() {
    let report = for_each_token_permutation(policy(), |perm| {
        let conv = uq15_conv(PixelFormat::PBGRA64_UQ15);
        let mut dst = [0u16; 8];
        let inter = [40000i32, -5, 70000, 40000, 100, 200, 300, -1];
        conv.write_dest_line(&inter, 4, &mut dst, &[UQ15_ONE], 0, 2);
        assert_eq!(dst, [40000, 0, 65535, 32768, 100, 200, 300, 0], "tier={perm}");
    });
    std::eprintln!("uq15_output_clamps: {report}");
}

#[test]
fn permutation_float_is_unclamped() {
    let report = for_each_token_permutation(policy(), |perm| {
        let conv = float_conv(PixelFormat::CBCR64_FLOAT);
        let xmap = KernelMap::build(&Interpolation::Box, 4, 2).unwrap();
        let src = [-1.0f32, 2.0, 0.0, 4.0, 0.25, 0.5, 0.75, 1.0];
        let out = resample_row(conv, &src, &xmap, 1.0);
        let expect = [-0.5f32, 3.0, 0.5, 0.75];
        for (g, e) in out.iter().zip(expect) {
            assert!((g - e).abs() < 1e-6, "got {out:?} tier={perm}");
        }
    });
    std::eprintln!("float_is_unclamped: {report}");
}

#[test]
fn permutation_vertical_pass_reads_window_slots() {
    let report = for_each_token_permutation(policy(), |perm| {
        // two columns, three buffered rows each, one channel
        let conv = byte_conv(PixelFormat::GRAY8);
        let inter = [10 << 7, 20 << 7, 30 << 7, 100 << 7, 110 << 7, 120 << 7];
        let weights = [0, UQ15_ONE / 2, UQ15_ONE / 2];
        let mut dst = [0u8; 1];
        conv.write_dest_line(&inter, 3, &mut dst, &weights, 1, 1);
        assert_eq!(dst, [115], "tier={perm}");
        let mut dst = [0u8; 2];
        conv.write_dest_line(&inter, 3, &mut dst, &weights, 0, 2);
        assert_eq!(dst, [25, 115], "tier={perm}");
    });
    std::eprintln!("vertical_pass_reads_window_slots: {report}");
}

// -----------------------------------------------------------------------
// Sharpening
// -----------------------------------------------------------------------

#[test]
fn permutation_sharpen_flat_is_identity() {
    let report = for_each_token_permutation(policy(), |perm| {
        let sharpen = SharpenParams {
            amount: 250,
            threshold: 0,
        };
        let flat = vec![77u8; 12];
        let mut dst = vec![0u8; 12];
        byte_conv(PixelFormat::BGRA32).sharpen_line(&flat, &flat, &mut dst, &sharpen);
        assert_eq!(dst, flat, "byte tier={perm}");

        let flat = vec![20000u16; 9];
        let mut dst = vec![0u16; 9];
        uq15_conv(PixelFormat::BGR48_UQ15).sharpen_line(&flat, &flat, &mut dst, &sharpen);
        assert_eq!(dst, flat, "uq15 tier={perm}");

        let flat = vec![0.3f32; 4];
        let mut dst = vec![0.0f32; 4];
        float_conv(PixelFormat::PBGRA128_FLOAT).sharpen_line(&flat, &flat, &mut dst, &sharpen);
        assert_eq!(dst, flat, "float tier={perm}");
    });
    std::eprintln!("sharpen_flat_is_identity: {report}");
}

#[test]
fn permutation_sharpen_threshold_and_clamp() {
    let report = for_each_token_permutation(policy(), |perm| {
        let conv = byte_conv(PixelFormat::BGRA32);
        let original = [100u8, 250, 100, 200];
        let blurred = [90u8, 200, 97, 100];
        let mut dst = [0u8; 4];

        let sharpen = SharpenParams {
            amount: 100,
            threshold: 5,
        };
        conv.sharpen_line(&original, &blurred, &mut dst, &sharpen);
        // below threshold stays, alpha passes through
        assert_eq!(dst, [110, 255, 100, 200], "byte tier={perm}");

        let sharpen = SharpenParams {
            amount: 100,
            threshold: 20,
        };
        conv.sharpen_line(&original, &blurred, &mut dst, &sharpen);
        assert_eq!(dst, [100, 255, 100, 200], "byte tier={perm}");

        let conv = uq15_conv(PixelFormat::GRAY16_UQ15);
        let mut dst = [0u16; 2];
        let sharpen = SharpenParams {
            amount: 50,
            threshold: 10,
        };
        conv.sharpen_line(&[16384, 1000], &[12000, 990], &mut dst, &sharpen);
        assert_eq!(dst, [18576, 1000], "uq15 tier={perm}");

        let conv = float_conv(PixelFormat::CBCR64_FLOAT);
        let mut dst = [0.0f32; 2];
        let sharpen = SharpenParams {
            amount: 200,
            threshold: 0,
        };
        conv.sharpen_line(&[0.5, 0.9], &[0.4, 0.2], &mut dst, &sharpen);
        assert!((dst[0] - 0.7).abs() < 1e-6, "float {dst:?} tier={perm}");
        assert_eq!(dst[1], 1.0, "float tier={perm}");
    });
    std::eprintln!("sharpen_threshold_and_clamp: {report}");
}
