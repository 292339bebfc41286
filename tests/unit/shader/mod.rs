use super::*;
use crate::{
    capability::{CapabilityTier, negotiate},
    device::{
        BufferId, ContextInfo, DrawCall, FramebufferId, FramebufferStatus, ShaderId, TextureDesc,
        software::SoftwareDevice,
    },
    foundation::core::TexelRect,
};

/// Forwards to a software device and records the linkage calls.
#[derive(Default)]
struct Recorder {
    inner: SoftwareDevice,
    attribute_bindings: Vec<(u32, String)>,
    uniform_sets: Vec<(i32, UniformValue)>,
}

impl Recorder {
    fn emulating(tier: CapabilityTier) -> Self {
        Self {
            inner: SoftwareDevice::emulating(tier),
            ..Self::default()
        }
    }
}

impl GraphicsDevice for Recorder {
    fn context_info(&self) -> &ContextInfo {
        self.inner.context_info()
    }
    fn create_texture(&mut self, desc: &TextureDesc) -> DistanceFieldResult<TextureId> {
        self.inner.create_texture(desc)
    }
    fn texture_desc(&self, texture: TextureId) -> DistanceFieldResult<TextureDesc> {
        self.inner.texture_desc(texture)
    }
    fn write_texture(&mut self, texture: TextureId, data: &[u8]) -> DistanceFieldResult<()> {
        self.inner.write_texture(texture, data)
    }
    fn read_texture(&mut self, texture: TextureId) -> DistanceFieldResult<Vec<u8>> {
        self.inner.read_texture(texture)
    }
    fn delete_texture(&mut self, texture: TextureId) {
        self.inner.delete_texture(texture)
    }
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        sources: &[String],
    ) -> DistanceFieldResult<ShaderId> {
        self.inner.compile_shader(stage, sources)
    }
    fn delete_shader(&mut self, shader: ShaderId) {
        self.inner.delete_shader(shader)
    }
    fn create_program(&mut self, shaders: &[ShaderId]) -> DistanceFieldResult<ProgramId> {
        self.inner.create_program(shaders)
    }
    fn bind_attribute_location(
        &mut self,
        program: ProgramId,
        location: u32,
        name: &str,
    ) -> DistanceFieldResult<()> {
        self.attribute_bindings.push((location, name.to_string()));
        self.inner.bind_attribute_location(program, location, name)
    }
    fn link_program(&mut self, program: ProgramId) -> DistanceFieldResult<()> {
        self.inner.link_program(program)
    }
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<i32> {
        self.inner.uniform_location(program, name)
    }
    fn set_uniform(
        &mut self,
        program: ProgramId,
        location: i32,
        value: UniformValue,
    ) -> DistanceFieldResult<()> {
        self.uniform_sets.push((location, value));
        self.inner.set_uniform(program, location, value)
    }
    fn delete_program(&mut self, program: ProgramId) {
        self.inner.delete_program(program)
    }
    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> DistanceFieldResult<BufferId> {
        self.inner.create_vertex_buffer(vertices)
    }
    fn delete_buffer(&mut self, buffer: BufferId) {
        self.inner.delete_buffer(buffer)
    }
    fn create_framebuffer(&mut self, viewport: TexelRect) -> DistanceFieldResult<FramebufferId> {
        self.inner.create_framebuffer(viewport)
    }
    fn attach_color(
        &mut self,
        framebuffer: FramebufferId,
        texture: TextureId,
    ) -> DistanceFieldResult<()> {
        self.inner.attach_color(framebuffer, texture)
    }
    fn clear_color(&mut self, framebuffer: FramebufferId) -> DistanceFieldResult<()> {
        self.inner.clear_color(framebuffer)
    }
    fn check_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        self.inner.check_status(framebuffer)
    }
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.inner.delete_framebuffer(framebuffer)
    }
    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> DistanceFieldResult<()> {
        self.inner.bind_texture(unit, texture)
    }
    fn draw(&mut self, call: &DrawCall) -> DistanceFieldResult<()> {
        self.inner.draw(call)
    }
}

fn build(device: &mut Recorder) -> DistanceFieldProgram {
    let caps = negotiate(device.context_info()).unwrap();
    let mut scope = DeviceScope::new(device);
    let program = DistanceFieldProgram::build(&mut scope, Radius::new(3).unwrap(), &caps).unwrap();
    // Only the program survives linking.
    assert_eq!(scope.owned(), &[Resource::Program(program.id)]);
    program
}

#[test]
fn glsl_sources_bake_the_radius() {
    let info = CapabilityTier::Gl320.minimal_context();
    let caps = negotiate(&info).unwrap();
    let sources = program_sources(Radius::new(12).unwrap(), &caps);
    assert_eq!(sources.language, crate::capability::ShadingLanguage::Glsl);
    assert!(sources.fragment.iter().any(|s| s == "#define RADIUS 12\n"));
    assert!(sources.vertex[0].starts_with("#version 150\n"));
    assert!(sources.fragment[0].contains("#define TEXELFETCH_USABLE"));
    assert!(!sources.vertex.concat().contains("#define RADIUS"));
}

#[test]
fn wgsl_sources_bake_the_radius() {
    let info = CapabilityTier::WebGpu.minimal_context();
    let caps = negotiate(&info).unwrap();
    let sources = program_sources(Radius::new(7).unwrap(), &caps);
    assert_eq!(sources.vertex, sources.fragment);
    assert_eq!(sources.vertex[0], "const RADIUS: i32 = 7;\n");
}

#[test]
fn legacy_headers_map_modern_keywords() {
    let info = CapabilityTier::Gles200.minimal_context();
    let caps = negotiate(&info).unwrap();
    let sources = program_sources(Radius::new(1).unwrap(), &caps);
    let header = &sources.fragment[0];
    assert!(header.starts_with("#version 100\n"));
    assert!(header.contains("#define texture texture2D"));
    assert!(header.contains("precision highp float;"));
    assert!(sources.vertex[0].contains("#define in attribute"));
}

#[test]
fn explicit_tier_skips_lookups_and_sampler_setup() {
    let mut device = Recorder::emulating(CapabilityTier::Gl320);
    let program = build(&mut device);
    assert_eq!(
        program.uniforms,
        UniformLocations {
            scaling: 0,
            offset: 1,
            image_size_inverted: None,
        }
    );
    assert!(device.attribute_bindings.is_empty());
    assert!(device.uniform_sets.is_empty());
    assert_eq!(program.position_location, None);
}

#[test]
fn implicit_tier_without_extensions_sets_the_sampler() {
    let mut device = Recorder::default();
    device.inner = SoftwareDevice::new(ContextInfo::new(
        crate::device::Api::OpenGl,
        crate::device::Version::new(3, 3),
    ));
    let program = build(&mut device);
    assert!(device.attribute_bindings.is_empty());
    assert_eq!(device.uniform_sets.len(), 1);
    assert_eq!(device.uniform_sets[0].1, UniformValue::Int(7));
    assert!(program.uniforms.scaling >= 16);
    assert_eq!(program.uniforms.image_size_inverted, None);
}

#[test]
fn legacy_tier_binds_the_position_attribute() {
    let mut device = Recorder::emulating(CapabilityTier::Gles200);
    let program = build(&mut device);
    assert_eq!(device.attribute_bindings, vec![(0, "position".to_string())]);
    assert_eq!(program.position_location, Some(0));
    assert!(program.uniforms.image_size_inverted.is_some());
}

#[test]
fn es3_generates_vertices_implicitly() {
    let mut device = Recorder::emulating(CapabilityTier::Gles300);
    let program = build(&mut device);
    assert!(device.attribute_bindings.is_empty());
    assert_eq!(program.position_location, None);
    assert_eq!(device.uniform_sets.len(), 1);
}

#[test]
fn image_size_uniform_is_a_noop_with_texel_fetch() {
    let mut device = Recorder::emulating(CapabilityTier::Gl320);
    let program = build(&mut device);
    program.set_image_size_inverted(&mut device, [64, 64]).unwrap();
    assert!(device.uniform_sets.is_empty());
}

#[test]
fn missing_uniform_is_a_build_error() {
    let mut device = SoftwareDevice::new(ContextInfo::new(
        crate::device::Api::OpenGl,
        crate::device::Version::new(3, 3),
    ));
    let vert = device
        .compile_shader(
            ShaderStage::Vertex,
            &["#version 330\nvoid main() { gl_Position = vec4(float(gl_VertexID)); }\n".into()],
        )
        .unwrap();
    let frag = device
        .compile_shader(
            ShaderStage::Fragment,
            &["#version 330\n#define RADIUS 1\nuniform sampler2D t;\nuniform vec2 scaling;\nuniform vec2 offset;\nvoid main() { texelFetch(t, ivec2(RADIUS), 0); }\n".into()],
        )
        .unwrap();
    let program = device.create_program(&[vert, frag]).unwrap();
    device.link_program(program).unwrap();

    let err = lookup_uniform(&device, program, "textureData").unwrap_err();
    assert!(matches!(err, DistanceFieldError::Build(_)));
    assert!(err.to_string().contains("textureData"));
}

#[test]
fn failed_build_releases_everything() {
    let mut device = SoftwareDevice::emulating(CapabilityTier::Gl320);
    let caps = negotiate(device.context_info()).unwrap();
    {
        let mut scope = DeviceScope::new(&mut device);
        // A WebGPU tier on a GL context compiles WGSL text, which GLSL rejects.
        let wrong = crate::capability::Capabilities::for_tier(
            CapabilityTier::WebGpu,
            &CapabilityTier::WebGpu.minimal_context(),
        );
        let err =
            DistanceFieldProgram::build(&mut scope, Radius::new(1).unwrap(), &wrong).unwrap_err();
        assert!(matches!(err, DistanceFieldError::Build(_)));
    }
    assert_eq!(device.live_resources().total(), 0);

    let mut scope = DeviceScope::new(&mut device);
    DistanceFieldProgram::build(&mut scope, Radius::new(1).unwrap(), &caps).unwrap();
}
