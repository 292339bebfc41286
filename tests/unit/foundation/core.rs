use super::*;

#[test]
fn radius_rejects_zero() {
    let err = Radius::new(0).unwrap_err();
    assert!(matches!(err, DistanceFieldError::Validation(_)));
    assert_eq!(Radius::new(4).unwrap().get(), 4);
}

#[test]
fn radius_rejects_values_above_the_maximum() {
    assert_eq!(Radius::new(MAX_RADIUS).unwrap().as_i32(), MAX_RADIUS as i32);
    let err = Radius::new(MAX_RADIUS + 1).unwrap_err();
    assert!(matches!(err, DistanceFieldError::Validation(_)));
    assert!(Radius::new(40_000).is_err());
    assert!(serde_json::from_str::<Radius>("40000").is_err());
}

#[test]
fn radius_deserializes_through_validation() {
    let r: Radius = serde_json::from_str("8").unwrap();
    assert_eq!(r.get(), 8);
    assert!(serde_json::from_str::<Radius>("0").is_err());
}

#[test]
fn rect_fits_within_bounds() {
    assert!(TexelRect::from_size(16, 16).fits_within(16, 16));
    assert!(TexelRect::new(8, 8, 8, 8).fits_within(16, 16));
    assert!(!TexelRect::new(9, 8, 8, 8).fits_within(16, 16));
    assert!(!TexelRect::new(u32::MAX, 0, 2, 1).fits_within(u32::MAX, 1));
}

#[test]
fn rect_contains_texel() {
    let r = TexelRect::new(2, 3, 4, 5);
    assert!(r.contains_texel(2, 3));
    assert!(r.contains_texel(5, 7));
    assert!(!r.contains_texel(6, 7));
    assert!(!r.contains_texel(1, 3));
}

#[test]
fn scaling_is_source_over_rectangle() {
    let s = ScalingFactor::new([64, 32], TexelRect::new(5, 5, 16, 16)).unwrap();
    assert_eq!(s.to_array(), [4.0, 2.0]);
}

#[test]
fn scaling_rejects_empty_rectangle() {
    assert!(ScalingFactor::new([64, 64], TexelRect::new(0, 0, 0, 4)).is_err());
}
