use super::*;
use crate::{
    device::{TextureDesc, TextureFormat, TextureUsage, software::SoftwareDevice},
    foundation::{core::TexelRect, error::DistanceFieldResult},
};

fn texture(device: &mut SoftwareDevice) -> TextureId {
    device
        .create_texture(&TextureDesc {
            width: 2,
            height: 2,
            format: TextureFormat::R8Unorm,
            usage: TextureUsage::ALL,
        })
        .unwrap()
}

#[test]
fn drop_releases_everything_adopted() {
    let mut device = SoftwareDevice::default();
    let kept = texture(&mut device);
    {
        let mut scope = DeviceScope::new(&mut device);
        let tex = texture(scope.device());
        scope.adopt(Resource::Texture(tex));
        let fb = scope.device().create_framebuffer(TexelRect::from_size(2, 2)).unwrap();
        scope.adopt(Resource::Framebuffer(fb));
        let buffer = scope.device().create_vertex_buffer(&[[0.0, 0.0]]).unwrap();
        scope.adopt(Resource::Buffer(buffer));
        assert_eq!(scope.device_ref().live_resources().total(), 4);
    }
    assert_eq!(device.live_resources().total(), 1);
    assert!(device.texture_desc(kept).is_ok());
}

#[test]
fn early_release_is_not_repeated() {
    let mut device = SoftwareDevice::default();
    let mut scope = DeviceScope::new(&mut device);
    let a = texture(scope.device());
    let b = texture(scope.device());
    scope.adopt(Resource::Texture(a));
    scope.adopt(Resource::Texture(b));

    scope.release(Resource::Texture(a));
    assert_eq!(scope.owned(), &[Resource::Texture(b)]);
    assert!(scope.device_ref().texture_desc(a).is_err());

    // Releasing something the scope does not own leaves it alone.
    let foreign = texture(scope.device());
    scope.release(Resource::Texture(foreign));
    assert!(scope.device_ref().texture_desc(foreign).is_ok());
    drop(scope);

    assert_eq!(device.live_resources().textures, 1);
}

#[test]
fn error_paths_release_through_drop() {
    fn fails(device: &mut SoftwareDevice) -> DistanceFieldResult<()> {
        let mut scope = DeviceScope::new(device);
        let tex = texture(scope.device());
        scope.adopt(Resource::Texture(tex));
        scope.device().write_texture(tex, &[0; 3])?;
        Ok(())
    }

    let mut device = SoftwareDevice::default();
    assert!(fails(&mut device).is_err());
    assert_eq!(device.live_resources().total(), 0);
}
