use super::*;

#[test]
fn unorm_encoding_rounds_to_nearest() {
    let mut texel = [0u8; 1];
    TextureFormat::R8Unorm.encode_value(0.5, &mut texel);
    assert_eq!(texel[0], 128);
    TextureFormat::R8Unorm.encode_value(1.5, &mut texel);
    assert_eq!(texel[0], 255);
    TextureFormat::R8Unorm.encode_value(-0.25, &mut texel);
    assert_eq!(texel[0], 0);
}

#[test]
fn rgba_stores_value_in_red_with_opaque_alpha() {
    let mut texel = [9u8; 4];
    TextureFormat::Rgba8Unorm.encode_value(1.0, &mut texel);
    assert_eq!(texel, [255, 0, 0, 255]);
    assert_eq!(TextureFormat::Rgba8Unorm.decode_value(&texel), 1.0);
}

#[test]
fn float_format_is_lossless() {
    let mut texel = [0u8; 4];
    TextureFormat::R32Float.encode_value(0.625, &mut texel);
    assert_eq!(TextureFormat::R32Float.decode_value(&texel), 0.625);
}

#[test]
fn depth_is_not_color_renderable() {
    assert!(!TextureFormat::Depth32Float.is_color_renderable());
    assert!(TextureFormat::R8Unorm.is_color_renderable());
}

#[test]
fn framebuffer_status_codes_match_gl() {
    assert_eq!(FramebufferStatus::Complete.code(), 0x8CD5);
    assert_eq!(FramebufferStatus::IncompleteAttachment.code(), 0x8CD6);
    assert_eq!(FramebufferStatus::MissingAttachment.code(), 0x8CD7);
    assert_eq!(
        FramebufferStatus::Unsupported.to_string(),
        "Unsupported (0x8cdd)"
    );
}

#[test]
fn extension_names_round_trip() {
    for ext in Extension::ALL {
        assert_eq!(Extension::from_gl_name(ext.gl_name()), Some(ext));
    }
    assert_eq!(Extension::from_gl_name("GL_ARB_nope"), None);
}

#[test]
fn texture_byte_len_accounts_for_format() {
    let desc = TextureDesc {
        width: 3,
        height: 2,
        format: TextureFormat::Rgba8Unorm,
        usage: TextureUsage::ALL,
    };
    assert_eq!(desc.byte_len(), Some(24));
}
