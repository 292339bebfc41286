use std::io::Cursor;

use super::*;

#[test]
fn new_rejects_mismatched_buffers() {
    assert!(CoverageImage::new(2, 2, vec![0; 3]).is_err());
    assert!(CoverageImage::new(0, 2, vec![]).is_err());
    let img = CoverageImage::new(2, 2, vec![1, 2, 3, 4]).unwrap();
    assert_eq!(img.get(1, 1), Some(4));
    assert_eq!(img.get(2, 0), None);
}

#[test]
fn shape_coverage_uses_texel_centres() {
    let circle = kurbo::Circle::new((8.0, 8.0), 4.0);
    let img = CoverageImage::from_shape(16, 16, &circle).unwrap();
    assert_eq!(img.get(8, 8), Some(255));
    assert_eq!(img.get(0, 0), Some(0));
    // Centre (11.5, 8.5) is 3.54 away, (12.5, 8.5) is 4.53 away.
    assert_eq!(img.get(11, 8), Some(255));
    assert_eq!(img.get(12, 8), Some(0));
}

#[test]
fn auto_channel_prefers_alpha() {
    let rgba = image::RgbaImage::from_raw(2, 1, vec![255, 255, 255, 0, 0, 0, 0, 200]).unwrap();
    let img = image::DynamicImage::ImageRgba8(rgba);

    let auto = CoverageImage::from_image(&img, CoverageChannel::Auto).unwrap();
    assert_eq!(auto.data(), &[0, 200]);

    let red = CoverageImage::from_image(&img, CoverageChannel::Red).unwrap();
    assert_eq!(red.data(), &[255, 0]);
}

#[test]
fn auto_channel_falls_back_to_luma() {
    let gray = image::GrayImage::from_raw(3, 1, vec![0, 128, 255]).unwrap();
    let img = image::DynamicImage::ImageLuma8(gray);
    let cov = CoverageImage::from_image(&img, CoverageChannel::Auto).unwrap();
    assert_eq!(cov.data(), &[0, 128, 255]);
}

#[test]
fn decodes_png_through_image() {
    let gray = image::GrayImage::from_raw(2, 2, vec![0, 255, 255, 0]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageLuma8(gray)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    let decoded = image::load_from_memory(&buf).unwrap();
    let cov = CoverageImage::from_image(&decoded, CoverageChannel::Luma).unwrap();
    assert_eq!(cov.size(), [2, 2]);
    assert_eq!(cov.data(), &[0, 255, 255, 0]);
}

#[test]
fn svg_alpha_becomes_coverage() {
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8">
        <rect x="0" y="0" width="4" height="8" fill="black"/>
    </svg>"#;
    let cov = CoverageImage::from_svg(svg, None).unwrap();
    assert_eq!(cov.size(), [8, 8]);
    assert_eq!(cov.get(1, 4), Some(255));
    assert_eq!(cov.get(6, 4), Some(0));

    let scaled = CoverageImage::from_svg(svg, Some([16, 16])).unwrap();
    assert_eq!(scaled.get(3, 8), Some(255));
    assert_eq!(scaled.get(12, 8), Some(0));
}

#[test]
fn invalid_svg_is_reported() {
    let err = CoverageImage::from_svg(b"not svg", None).unwrap_err();
    assert!(matches!(err, DistanceFieldError::Other(_)));
}

#[test]
fn serde_channel_names() {
    let c: CoverageChannel = serde_json::from_str("\"alpha\"").unwrap();
    assert_eq!(c, CoverageChannel::Alpha);
    assert_eq!(CoverageChannel::default(), CoverageChannel::Auto);
}
