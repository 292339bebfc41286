use super::*;
use crate::{
    capability::{self, Capabilities},
    device::{TextureUsage, scope::DeviceScope},
    shader::DistanceFieldProgram,
};

fn desc(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> TextureDesc {
    TextureDesc {
        width,
        height,
        format,
        usage,
    }
}

fn caps_of(device: &SoftwareDevice) -> Capabilities {
    capability::negotiate(device.context_info()).unwrap()
}

#[test]
fn default_context_is_full_desktop() {
    let device = SoftwareDevice::default();
    let caps = caps_of(&device);
    assert_eq!(caps.tier, CapabilityTier::Gl320);
    assert!(caps.explicit_uniform_locations && caps.explicit_sampler_binding);
}

#[test]
fn texture_round_trip_and_size_checks() {
    let mut device = SoftwareDevice::default();
    let tex = device
        .create_texture(&desc(2, 2, TextureFormat::R8Unorm, TextureUsage::SAMPLED))
        .unwrap();
    device.write_texture(tex, &[1, 2, 3, 4]).unwrap();
    assert_eq!(device.read_texture(tex).unwrap(), vec![1, 2, 3, 4]);

    let err = device.write_texture(tex, &[1, 2, 3]).unwrap_err();
    assert!(matches!(err, DistanceFieldError::Device(_)));

    let err = device
        .create_texture(&desc(0, 4, TextureFormat::R8Unorm, TextureUsage::ALL))
        .unwrap_err();
    assert!(matches!(err, DistanceFieldError::Resource(_)));
    let err = device
        .create_texture(&desc(MAX_TEXTURE_SIZE + 1, 1, TextureFormat::R8Unorm, TextureUsage::ALL))
        .unwrap_err();
    assert!(matches!(err, DistanceFieldError::Resource(_)));

    device.delete_texture(tex);
    assert_eq!(device.live_resources(), LiveResources::default());
}

#[test]
fn framebuffer_status_reflects_attachment() {
    let mut device = SoftwareDevice::default();
    let fb = device.create_framebuffer(TexelRect::from_size(4, 4)).unwrap();
    assert_eq!(device.check_status(fb), FramebufferStatus::MissingAttachment);

    let depth = device
        .create_texture(&desc(4, 4, TextureFormat::Depth32Float, TextureUsage::ALL))
        .unwrap();
    device.attach_color(fb, depth).unwrap();
    assert_eq!(device.check_status(fb), FramebufferStatus::IncompleteAttachment);

    let sampled_only = device
        .create_texture(&desc(4, 4, TextureFormat::R8Unorm, TextureUsage::SAMPLED))
        .unwrap();
    device.attach_color(fb, sampled_only).unwrap();
    assert_eq!(device.check_status(fb), FramebufferStatus::IncompleteAttachment);

    let color = device
        .create_texture(&desc(4, 4, TextureFormat::Rgba8Unorm, TextureUsage::ALL))
        .unwrap();
    device.attach_color(fb, color).unwrap();
    assert_eq!(device.check_status(fb), FramebufferStatus::Complete);

    device.delete_texture(color);
    assert_eq!(device.check_status(fb), FramebufferStatus::IncompleteAttachment);
}

#[test]
fn es_float_targets_are_unsupported() {
    let mut device = SoftwareDevice::emulating(CapabilityTier::Gles300);
    let fb = device.create_framebuffer(TexelRect::from_size(2, 2)).unwrap();
    let tex = device
        .create_texture(&desc(2, 2, TextureFormat::R32Float, TextureUsage::ALL))
        .unwrap();
    device.attach_color(fb, tex).unwrap();
    assert_eq!(device.check_status(fb), FramebufferStatus::Unsupported);
}

#[test]
fn clear_only_touches_the_viewport() {
    let mut device = SoftwareDevice::default();
    let tex = device
        .create_texture(&desc(4, 2, TextureFormat::R8Unorm, TextureUsage::ALL))
        .unwrap();
    device.write_texture(tex, &[9; 8]).unwrap();
    let fb = device.create_framebuffer(TexelRect::new(1, 1, 2, 1)).unwrap();
    device.attach_color(fb, tex).unwrap();
    device.clear_color(fb).unwrap();
    assert_eq!(device.read_texture(tex).unwrap(), vec![9, 9, 9, 9, 9, 0, 0, 9]);
}

#[test]
fn driver_assigns_locations_without_explicit_qualifiers() {
    let mut device = SoftwareDevice::new(ContextInfo::new(Api::OpenGl, Version::new(3, 0)));
    let caps = caps_of(&device);
    assert!(!caps.explicit_uniform_locations);

    let mut scope = DeviceScope::new(&mut device);
    let program = DistanceFieldProgram::build(&mut scope, Radius::new(2).unwrap(), &caps).unwrap();
    let locations = [
        program.uniforms.scaling,
        program.uniforms.offset,
        program.uniforms.image_size_inverted.unwrap(),
    ];
    assert!(locations.iter().all(|l| *l >= DRIVER_UNIFORM_BASE), "{locations:?}");
    assert_eq!(
        scope.device_ref().uniform_location(program.id, "textureData").map(|l| l >= 16),
        Some(true)
    );
}

#[test]
fn unbound_attribute_gets_a_driver_location() {
    let mut device = SoftwareDevice::emulating(CapabilityTier::Gles200);
    let info = device.context_info().clone();
    let caps = Capabilities::for_tier(CapabilityTier::Gles200, &info);
    let sources = crate::shader::program_sources(Radius::new(1).unwrap(), &caps);

    let vert = device.compile_shader(ShaderStage::Vertex, &sources.vertex).unwrap();
    let frag = device.compile_shader(ShaderStage::Fragment, &sources.fragment).unwrap();
    let program = device.create_program(&[vert, frag]).unwrap();
    device.link_program(program).unwrap();

    let linked = device.programs[&program.0].linked.as_ref().unwrap();
    assert_eq!(
        linked.vertices,
        VertexSource::Attribute {
            location: MAX_VERTEX_ATTRIBS - 1
        }
    );
}

#[test]
fn link_requires_radius() {
    let mut device = SoftwareDevice::default();
    let vert = device
        .compile_shader(
            ShaderStage::Vertex,
            &["#version 150\nvoid main() { gl_Position = vec4(float(gl_VertexID)); }\n".into()],
        )
        .unwrap();
    let frag = device
        .compile_shader(
            ShaderStage::Fragment,
            &["#version 150\nuniform sampler2D t;\nuniform vec2 scaling;\nuniform vec2 offset;\nvoid main() { texelFetch(t, ivec2(0), 0); }\n".into()],
        )
        .unwrap();
    let program = device.create_program(&[vert, frag]).unwrap();
    let err = device.link_program(program).unwrap_err();
    assert!(matches!(err, DistanceFieldError::Build(_)));
    assert!(err.to_string().contains("RADIUS"));
}

#[test]
fn compile_errors_carry_the_log() {
    let mut device = SoftwareDevice::emulating(CapabilityTier::Gl210);
    let err = device
        .compile_shader(ShaderStage::Vertex, &["#version 330\nvoid main() {}\n".into()])
        .unwrap_err();
    assert!(matches!(err, DistanceFieldError::Build(_)));
    assert!(err.to_string().contains("330"), "{err}");
}

#[test]
fn set_uniform_checks_types() {
    let mut device = SoftwareDevice::default();
    let caps = caps_of(&device);
    let mut scope = DeviceScope::new(&mut device);
    let program = DistanceFieldProgram::build(&mut scope, Radius::new(1).unwrap(), &caps).unwrap();

    let device = scope.device();
    device
        .set_uniform(program.id, -1, UniformValue::Int(3))
        .unwrap();
    let err = device
        .set_uniform(program.id, program.uniforms.scaling, UniformValue::Int(3))
        .unwrap_err();
    assert!(matches!(err, DistanceFieldError::Device(_)));
    let err = device
        .set_uniform(program.id, 99, UniformValue::Vec2([0.0, 0.0]))
        .unwrap_err();
    assert!(matches!(err, DistanceFieldError::Device(_)));
}

#[test]
fn draw_rejects_missing_texture_and_feedback() {
    let mut device = SoftwareDevice::default();
    let caps = caps_of(&device);
    let output = device
        .create_texture(&desc(4, 4, TextureFormat::R8Unorm, TextureUsage::ALL))
        .unwrap();

    let mut scope = DeviceScope::new(&mut device);
    let fb = scope.device().create_framebuffer(TexelRect::from_size(4, 4)).unwrap();
    scope.adopt(crate::device::scope::Resource::Framebuffer(fb));
    scope.device().attach_color(fb, output).unwrap();
    let program = DistanceFieldProgram::build(&mut scope, Radius::new(1).unwrap(), &caps).unwrap();
    let call = DrawCall {
        program: program.id,
        framebuffer: fb,
        vertex_count: 3,
        vertices: VertexInput::Implicit,
    };

    let err = scope.device().draw(&call).unwrap_err();
    assert!(err.to_string().contains("no texture bound"), "{err}");

    program.bind_texture(scope.device(), output).unwrap();
    let err = scope.device().draw(&call).unwrap_err();
    assert!(err.to_string().contains("both sampled and rendered"), "{err}");
    drop(scope);

    assert_eq!(device.draw_count(), 0);
    assert_eq!(device.live_resources().total(), 1);
}

#[test]
fn legacy_draw_needs_a_vertex_buffer() {
    let mut device = SoftwareDevice::emulating(CapabilityTier::Gl210);
    let caps = caps_of(&device);
    let input = device
        .create_texture(&desc(2, 2, TextureFormat::R8Unorm, TextureUsage::SAMPLED))
        .unwrap();
    let output = device
        .create_texture(&desc(2, 2, TextureFormat::R8Unorm, TextureUsage::ALL))
        .unwrap();

    let mut scope = DeviceScope::new(&mut device);
    let fb = scope.device().create_framebuffer(TexelRect::from_size(2, 2)).unwrap();
    scope.adopt(crate::device::scope::Resource::Framebuffer(fb));
    scope.device().attach_color(fb, output).unwrap();
    let program = DistanceFieldProgram::build(&mut scope, Radius::new(1).unwrap(), &caps).unwrap();
    program.bind_texture(scope.device(), input).unwrap();

    let err = scope
        .device()
        .draw(&DrawCall {
            program: program.id,
            framebuffer: fb,
            vertex_count: 3,
            vertices: VertexInput::Implicit,
        })
        .unwrap_err();
    assert!(err.to_string().contains("attribute location 0"), "{err}");
}

#[test]
fn texture_units_are_bounded_by_the_context() {
    let mut device = SoftwareDevice::emulating(CapabilityTier::Gles200);
    let tex = device
        .create_texture(&desc(1, 1, TextureFormat::R8Unorm, TextureUsage::SAMPLED))
        .unwrap();
    device.bind_texture(7, tex).unwrap();
    assert!(device.bind_texture(8, tex).is_err());
}
