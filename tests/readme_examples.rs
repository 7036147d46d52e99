//! Validates the code examples from README.md compile and behave correctly.

use sharpscale::{
    ConvolutionTransform, Interpolation, MemorySource, PixelFormat, PixelRect, PixelSource,
    ResizeSettings, UnsharpSettings, read_all,
};

#[test]
fn readme_resize_buffer() {
    let pixels = vec![10u8; 4 * 4];
    let source = MemorySource::packed(PixelFormat::GRAY8, 4, 4, pixels).unwrap();
    let mut half = ConvolutionTransform::new(source, &Interpolation::Box, 2, 2).unwrap();
    assert_eq!(read_all(&mut half).unwrap(), [10, 10, 10, 10]);
}

#[test]
fn readme_rows_on_demand() {
    let source =
        MemorySource::packed(PixelFormat::BGR24, 640, 480, vec![0; 640 * 480 * 3]).unwrap();
    let mut resized = ConvolutionTransform::new(source, &Interpolation::LANCZOS, 320, 240).unwrap();
    let mut row = vec![0u8; 320 * 3];
    for y in 0..240 {
        resized
            .copy_pixels(PixelRect::new(0, y, 320, 1), 320 * 3, &mut row)
            .unwrap();
    }
    assert!(row.iter().all(|&v| v == 0));
}

#[test]
fn readme_resize_and_sharpen() {
    let source =
        MemorySource::packed(PixelFormat::BGRA32, 100, 100, vec![128; 100 * 100 * 4]).unwrap();
    let settings = ResizeSettings::new(40, 30)
        .with_filter(Interpolation::CATMULL_ROM)
        .with_unsharp(UnsharpSettings {
            amount: 60,
            radius: 0.8,
            threshold: 1,
        });
    let mut pipeline = settings.build(source).unwrap();
    let out = read_all(&mut *pipeline).unwrap();
    assert_eq!(out.len(), 40 * 30 * 4);
    assert!(out.iter().all(|&v| v == 128));
}

#[cfg(feature = "imgref")]
#[test]
fn readme_imgref() {
    use imgref::ImgVec;
    use rgb::Rgba;
    use sharpscale::img;

    let photo = ImgVec::new(vec![Rgba::new(255u8, 0, 128, 255); 640 * 480], 640, 480);
    let thumb = img::resize(photo.as_ref(), 160, 120, &Interpolation::LANCZOS).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (160, 120));
    assert!(thumb.pixels().all(|p| p == Rgba::new(255, 0, 128, 255)));
}
