//! End-to-end behavior of the resampling pipeline through the public API.

use sharpscale::{
    ConvolutionTransform, Interpolation, MemorySource, PixelFormat, PixelRect, PixelSource,
    ResizeError, UnsharpSettings, read_all,
};

const FILTERS: &[Interpolation] = &[
    Interpolation::Point,
    Interpolation::Box,
    Interpolation::Linear,
    Interpolation::CATMULL_ROM,
    Interpolation::MITCHELL,
    Interpolation::SPLINE,
    Interpolation::LANCZOS,
];

const EXTENTS: &[(usize, usize)] = &[(1, 1), (3, 7), (9, 4), (13, 13), (25, 2)];

/// Wraps a source and records every source row it hands out.
struct Counting<S> {
    inner: S,
    rows: Vec<usize>,
}

impl<S: PixelSource> PixelSource for Counting<S> {
    fn width(&self) -> usize {
        self.inner.width()
    }
    fn height(&self) -> usize {
        self.inner.height()
    }
    fn format(&self) -> PixelFormat {
        self.inner.format()
    }
    fn copy_pixels(
        &mut self,
        rect: PixelRect,
        stride: usize,
        buf: &mut [u8],
    ) -> Result<(), ResizeError> {
        self.rows.extend(rect.y..rect.y + rect.height);
        self.inner.copy_pixels(rect, stride, buf)
    }
}

fn noise(format: PixelFormat, w: usize, h: usize) -> MemorySource {
    let mut state = 0x2545_f491u32;
    let data = (0..w * h * format.bpp())
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect();
    MemorySource::packed(format, w, h, data).unwrap()
}

fn flat<T: bytemuck::Pod>(format: PixelFormat, w: usize, h: usize, px: &[T]) -> MemorySource {
    let samples: Vec<T> = px.iter().copied().cycle().take(w * h * px.len()).collect();
    MemorySource::from_samples(format, w, h, &samples).unwrap()
}

#[test]
fn box_halves_flat_gray() {
    let source = MemorySource::packed(PixelFormat::GRAY8, 4, 4, vec![10; 16]).unwrap();
    let mut t = ConvolutionTransform::new(source, &Interpolation::Box, 2, 2).unwrap();
    assert_eq!(read_all(&mut t).unwrap(), [10, 10, 10, 10]);
}

#[test]
fn point_doubles_column() {
    let source = MemorySource::packed(PixelFormat::GRAY8, 1, 4, vec![0, 0, 255, 255]).unwrap();
    let mut t = ConvolutionTransform::new(source, &Interpolation::Point, 1, 8).unwrap();
    assert_eq!(read_all(&mut t).unwrap(), [0, 0, 0, 0, 255, 255, 255, 255]);
}

#[test]
fn identity_scale_is_lossless() {
    for format in [
        PixelFormat::GRAY8,
        PixelFormat::CBCR16,
        PixelFormat::BGR24,
        PixelFormat::BGRX32,
        PixelFormat::PBGRA32,
        PixelFormat::GRAY16_UQ15,
        PixelFormat::BGR48_UQ15,
    ] {
        // interpolating filters only; Mitchell and B-spline blur at 1:1
        for filter in [
            Interpolation::Point,
            Interpolation::Box,
            Interpolation::Linear,
            Interpolation::CATMULL_ROM,
            Interpolation::LANCZOS,
        ] {
            let source = noise(format, 11, 7);
            let expect = source.as_bytes().to_vec();
            let mut t = ConvolutionTransform::new(source, &filter, 11, 7).unwrap();
            assert_eq!(read_all(&mut t).unwrap(), expect, "{format} {filter:?}");
        }
    }
}

#[test]
fn flat_images_stay_flat() {
    fn check<T: bytemuck::Pod + PartialEq + core::fmt::Debug>(format: PixelFormat, px: &[T]) {
        for filter in FILTERS {
            for &(w, h) in EXTENTS {
                let mut t =
                    ConvolutionTransform::new(flat(format, 9, 6, px), filter, w, h).unwrap();
                let out = read_all(&mut t).unwrap();
                let got: &[T] = bytemuck::cast_slice(&out);
                for (i, p) in got.chunks_exact(px.len()).enumerate() {
                    assert_eq!(p, px, "{format} {filter:?} {w}x{h} px={i}");
                }
            }
        }
    }
    check(PixelFormat::GRAY8, &[0u8]);
    check(PixelFormat::GRAY8, &[255u8]);
    check(PixelFormat::BGR24, &[12u8, 200, 99]);
    check(PixelFormat::BGRA32, &[77u8, 5, 250, 200]);
    check(PixelFormat::PBGRA32, &[60u8, 5, 100, 128]);
    // above 1.0 survives on color channels
    check(PixelFormat::BGR48_UQ15, &[50000u16, 32768, 0]);
    check(PixelFormat::BGRA64_UQ15, &[1000u16, 40000, 20000, 32768]);
}

#[test]
fn float_images_stay_flat() {
    let px = [0.25f32, 0.5, 0.75, 0.6];
    for format in [PixelFormat::PBGRA128_FLOAT, PixelFormat::BGRA128_FLOAT] {
        for filter in FILTERS {
            for &(w, h) in EXTENTS {
                let source = flat(format, 9, 6, &px);
                let mut t = ConvolutionTransform::new(source, filter, w, h).unwrap();
                let out = read_all(&mut t).unwrap();
                let got: Vec<f32> = bytemuck::pod_collect_to_vec(&out);
                for (g, e) in got.iter().zip(px.iter().cycle()) {
                    assert!((g - e).abs() < 1e-5, "{format} {filter:?} {w}x{h}: {g} vs {e}");
                }
            }
        }
    }
}

#[test]
fn sequential_reads_pull_each_row_once() {
    for &(w, h) in &[(20, 11), (40, 90), (33, 33)] {
        let source = Counting {
            inner: noise(PixelFormat::BGR24, 33, 33),
            rows: Vec::new(),
        };
        let mut t = ConvolutionTransform::new(source, &Interpolation::LANCZOS, w, h).unwrap();
        let stride = w * 3;
        let mut row = vec![0u8; stride];
        for y in 0..h {
            t.copy_pixels(PixelRect::new(0, y, w, 1), stride, &mut row)
                .unwrap();
        }
        assert_eq!(t.get_ref().rows, (0..33).collect::<Vec<_>>(), "{w}x{h}");
    }
}

#[test]
fn out_of_order_reads_match_sequential() {
    let resize = |src| ConvolutionTransform::new(src, &Interpolation::LANCZOS, 21, 17).unwrap();
    let mut seq = resize(noise(PixelFormat::BGRA32, 30, 40));
    let expect = read_all(&mut seq).unwrap();

    let mut t = resize(noise(PixelFormat::BGRA32, 30, 40));
    let stride = 21 * 4;
    let mut got = vec![0u8; expect.len()];
    for y in [16, 0, 8, 9, 3, 15, 1, 2, 14, 4, 5, 6, 13, 7, 12, 11, 10] {
        t.copy_pixels(PixelRect::new(0, y, 21, 1), stride, &mut got[y * stride..])
            .unwrap();
    }
    assert_eq!(got, expect);
}

#[test]
fn unsharp_leaves_flat_images_alone() {
    let settings = UnsharpSettings {
        amount: 300,
        radius: 2.0,
        threshold: 0,
    };
    let source = flat(PixelFormat::BGRA32, 12, 9, &[10u8, 128, 250, 90]);
    let expect = source.as_bytes().to_vec();
    let mut t = ConvolutionTransform::unsharp(source, settings).unwrap();
    assert_eq!(read_all(&mut t).unwrap(), expect);

    let source = flat(PixelFormat::BGR48_UQ15, 12, 9, &[100u16, 32768, 60000]);
    let expect = source.as_bytes().to_vec();
    let mut t = ConvolutionTransform::unsharp(source, settings).unwrap();
    assert_eq!(read_all(&mut t).unwrap(), expect);
}

#[test]
fn requests_are_validated() {
    let source = noise(PixelFormat::BGR24, 8, 8);
    let mut t = ConvolutionTransform::new(source, &Interpolation::Linear, 4, 4).unwrap();
    let mut buf = vec![0u8; 64];
    assert!(matches!(
        t.copy_pixels(PixelRect::new(0, 3, 4, 2), 12, &mut buf),
        Err(ResizeError::OutOfBounds)
    ));
    assert!(matches!(
        t.copy_pixels(PixelRect::new(0, 0, 4, 2), 11, &mut buf),
        Err(ResizeError::InvalidStride)
    ));
    assert!(matches!(
        t.copy_pixels(PixelRect::new(0, 0, 4, 4), 12, &mut buf[..40]),
        Err(ResizeError::BufferTooSmall {
            needed: 48,
            actual: 40
        })
    ));
    assert!(matches!(
        ConvolutionTransform::new(noise(PixelFormat::BGR24, 8, 8), &Interpolation::Linear, 0, 4),
        Err(ResizeError::ZeroExtent)
    ));
}
