use super::*;
use crate::device::{TextureFormat, TextureUsage};

fn desc(format: TextureFormat) -> TextureDesc {
    TextureDesc {
        width: 2,
        height: 1,
        format,
        usage: TextureUsage::ALL,
    }
}

#[test]
fn rgba_readback_keeps_red_channel() {
    let bytes = [10, 0, 0, 255, 200, 0, 0, 255];
    let img = DistanceFieldImage::from_texture(&desc(TextureFormat::Rgba8Unorm), &bytes).unwrap();
    assert_eq!(img.data(), &[10, 200]);
}

#[test]
fn float_readback_rounds_to_bytes() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0.5f32.to_le_bytes());
    bytes.extend_from_slice(&1.0f32.to_le_bytes());
    let img = DistanceFieldImage::from_texture(&desc(TextureFormat::R32Float), &bytes).unwrap();
    assert_eq!(img.data(), &[128, 255]);
}

#[test]
fn short_readback_is_a_device_error() {
    let err = DistanceFieldImage::from_texture(&desc(TextureFormat::R8Unorm), &[1]).unwrap_err();
    assert!(matches!(err, DistanceFieldError::Device(_)));
}

#[test]
fn signed_distance_decodes_storage() {
    let img = DistanceFieldImage::new(3, 1, vec![0, 255, 191]).unwrap();
    assert_eq!(img.signed_distance(0, 0), Some(-1.0));
    assert_eq!(img.signed_distance(1, 0), Some(1.0));
    assert!((img.signed_distance(2, 0).unwrap() - 0.498).abs() < 0.01);
    assert_eq!(img.signed_distance(3, 0), None);
}

#[test]
fn png_export_round_trips_through_image() {
    let dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/unit_png");
    let path = dir.join("field.png");
    let img = DistanceFieldImage::new(2, 2, vec![0, 64, 128, 255]).unwrap();
    img.save_png(&path).unwrap();

    let loaded = image::open(&path).unwrap().to_luma8();
    assert_eq!(loaded.dimensions(), (2, 2));
    assert_eq!(loaded.into_raw(), vec![0, 64, 128, 255]);
}
