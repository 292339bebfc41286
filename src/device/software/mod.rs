//! An emulated graphics context.
//!
//! [`SoftwareDevice`] advertises whatever [`ContextInfo`] it is built with and
//! behaves like a driver for that context: shader text is preprocessed and
//! checked against the advertised version and extensions, linking assigns
//! attribute and uniform locations the way a GL driver would when the shader
//! does not pin them, and a draw rasterizes the submitted triangles over the
//! framebuffer viewport and runs the distance kernel for every covered texel.

mod preprocess;
mod raster;
mod reflect;

use std::collections::{BTreeMap, HashMap};

use crate::{
    capability::{CapabilityTier, ShadingLanguage},
    device::{
        Api, BufferId, ContextInfo, DrawCall, Extension, FramebufferId, FramebufferStatus,
        GraphicsDevice, ProgramId, ShaderId, ShaderStage, TextureDesc, TextureFormat, TextureId,
        UniformValue, Version, VertexInput,
    },
    foundation::{
        core::{Radius, TexelRect},
        error::{DistanceFieldError, DistanceFieldResult},
    },
    shader::sources::{IMAGE_SIZE_INVERTED_UNIFORM, OFFSET_UNIFORM, SCALING_UNIFORM},
};

use raster::{KernelInvocation, Sampling, TextureSampler};
use reflect::{ShaderInterface, UniformDecl, UniformKind};

/// Largest texture edge the device accepts.
pub const MAX_TEXTURE_SIZE: u32 = 16384;
/// Attributes without a binding are assigned from the top of this range.
pub const MAX_VERTEX_ATTRIBS: u32 = 16;
/// First location handed to uniforms the shader does not place itself.
const DRIVER_UNIFORM_BASE: i32 = 16;

/// Live object counts, for leak checks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LiveResources {
    pub textures: usize,
    pub shaders: usize,
    pub programs: usize,
    pub buffers: usize,
    pub framebuffers: usize,
}

impl LiveResources {
    pub fn total(&self) -> usize {
        self.textures + self.shaders + self.programs + self.buffers + self.framebuffers
    }
}

struct Texture {
    desc: TextureDesc,
    data: Vec<u8>,
}

struct Framebuffer {
    viewport: TexelRect,
    color: Option<TextureId>,
}

struct Program {
    stages: Vec<ShaderInterface>,
    attribute_bindings: BTreeMap<String, u32>,
    linked: Option<LinkedProgram>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VertexSource {
    VertexIndex,
    Attribute { location: u32 },
}

struct Uniform {
    name: String,
    kind: UniformKind,
    location: i32,
    value: UniformValue,
}

impl Uniform {
    /// Samplers start at their declared binding, or unit 0; vectors at zero.
    fn from_decl(decl: &UniformDecl, location: i32) -> Self {
        let value = match decl.kind {
            UniformKind::Sampler2D => UniformValue::Int(decl.binding.unwrap_or(0) as i32),
            UniformKind::Vec2 | UniformKind::Other => UniformValue::Vec2([0.0, 0.0]),
        };
        Self {
            name: decl.name.clone(),
            kind: decl.kind,
            location,
            value,
        }
    }
}

struct LinkedProgram {
    language: ShadingLanguage,
    radius: Radius,
    vertices: VertexSource,
    texel_fetch: bool,
    uniforms: Vec<Uniform>,
}

impl LinkedProgram {
    fn uniform(&self, name: &str) -> Option<&Uniform> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    fn vec2(&self, name: &str) -> DistanceFieldResult<[f32; 2]> {
        match self.uniform(name).map(|u| u.value) {
            Some(UniformValue::Vec2(v)) => Ok(v),
            _ => Err(DistanceFieldError::device(format!(
                "program has no vec2 uniform '{name}'"
            ))),
        }
    }

    fn sampler_unit(&self) -> DistanceFieldResult<u32> {
        self.uniforms
            .iter()
            .find(|u| u.kind == UniformKind::Sampler2D)
            .and_then(|u| match u.value {
                UniformValue::Int(unit) => u32::try_from(unit).ok(),
                UniformValue::Vec2(_) => None,
            })
            .ok_or_else(|| DistanceFieldError::device("program samples no texture"))
    }
}

pub struct SoftwareDevice {
    info: ContextInfo,
    next_id: u32,
    textures: HashMap<u32, Texture>,
    shaders: HashMap<u32, ShaderInterface>,
    programs: HashMap<u32, Program>,
    buffers: HashMap<u32, Vec<[f32; 2]>>,
    framebuffers: HashMap<u32, Framebuffer>,
    units: BTreeMap<u32, TextureId>,
    draws: u64,
}

impl Default for SoftwareDevice {
    /// A desktop GL 4.5 context with every extension the transform can use.
    fn default() -> Self {
        Self::new(
            ContextInfo::new(Api::OpenGl, Version::new(4, 5)).with_extensions(Extension::ALL),
        )
    }
}

impl SoftwareDevice {
    pub fn new(info: ContextInfo) -> Self {
        Self {
            info,
            next_id: 1,
            textures: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            framebuffers: HashMap::new(),
            units: BTreeMap::new(),
            draws: 0,
        }
    }

    /// The smallest context that negotiates to `tier`.
    pub fn emulating(tier: CapabilityTier) -> Self {
        Self::new(tier.minimal_context())
    }

    pub fn live_resources(&self) -> LiveResources {
        LiveResources {
            textures: self.textures.len(),
            shaders: self.shaders.len(),
            programs: self.programs.len(),
            buffers: self.buffers.len(),
            framebuffers: self.framebuffers.len(),
        }
    }

    /// Number of draws executed so far.
    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn texture(&self, id: TextureId) -> DistanceFieldResult<&Texture> {
        self.textures
            .get(&id.0)
            .ok_or_else(|| DistanceFieldError::device(format!("unknown texture {id:?}")))
    }

    fn program_mut(&mut self, id: ProgramId) -> DistanceFieldResult<&mut Program> {
        self.programs
            .get_mut(&id.0)
            .ok_or_else(|| DistanceFieldError::device(format!("unknown program {id:?}")))
    }

    fn link(program: &Program) -> Result<LinkedProgram, String> {
        let find = |stage: ShaderStage| {
            let mut matching = program.stages.iter().filter(|s| s.stage == stage);
            match (matching.next(), matching.next()) {
                (Some(s), None) => Ok(s),
                _ => Err(format!("program needs exactly one {stage:?} shader")),
            }
        };
        let vertex = find(ShaderStage::Vertex)?;
        let fragment = find(ShaderStage::Fragment)?;

        if vertex.language != fragment.language {
            return Err("vertex and fragment shaders use different languages".to_string());
        }
        if !vertex.has_entry_point || !fragment.has_entry_point {
            return Err("missing entry point".to_string());
        }

        let radius = fragment
            .radius
            .and_then(|r| u32::try_from(r).ok())
            .and_then(|r| Radius::new(r).ok())
            .ok_or_else(|| {
                format!(
                    "fragment stage needs a positive RADIUS constant, got {:?}",
                    fragment.radius
                )
            })?;

        let vertices = if vertex.uses_vertex_index {
            VertexSource::VertexIndex
        } else {
            let attribute = vertex
                .attributes
                .first()
                .ok_or_else(|| "vertex stage reads no position".to_string())?;
            let location = attribute
                .location
                .or_else(|| program.attribute_bindings.get(&attribute.name).copied())
                .unwrap_or(MAX_VERTEX_ATTRIBS - 1);
            VertexSource::Attribute { location }
        };

        // One entry per name; both stages must agree on a shared uniform.
        let mut declared: Vec<&UniformDecl> = Vec::new();
        for decl in vertex.uniforms.iter().chain(&fragment.uniforms) {
            match declared.iter().find(|d| d.name == decl.name) {
                Some(existing)
                    if existing.kind != decl.kind || existing.location != decl.location =>
                {
                    return Err(format!("uniform '{}' redeclared differently", decl.name));
                }
                Some(_) => {}
                None => declared.push(decl),
            }
        }

        let mut uniforms: Vec<Uniform> = Vec::with_capacity(declared.len());
        for (decl, location) in declared.iter().filter_map(|d| d.location.map(|l| (d, l))) {
            if uniforms.iter().any(|u| u.location == location) {
                return Err(format!("uniform '{}' reuses location {location}", decl.name));
            }
            uniforms.push(Uniform::from_decl(decl, location));
        }
        let mut next = DRIVER_UNIFORM_BASE;
        for decl in declared.iter().filter(|d| d.location.is_none()) {
            while uniforms.iter().any(|u| u.location == next) {
                next += 1;
            }
            uniforms.push(Uniform::from_decl(decl, next));
        }

        let texel_fetch = fragment.uses_texel_fetch;
        let mut required = vec![SCALING_UNIFORM, OFFSET_UNIFORM];
        if !texel_fetch {
            required.push(IMAGE_SIZE_INVERTED_UNIFORM);
        }
        for name in required {
            if !uniforms.iter().any(|u| u.name == name && u.kind == UniformKind::Vec2) {
                return Err(format!("fragment stage declares no vec2 uniform '{name}'"));
            }
        }
        if !uniforms.iter().any(|u| u.kind == UniformKind::Sampler2D) {
            return Err("fragment stage samples no texture".to_string());
        }

        Ok(LinkedProgram {
            language: vertex.language,
            radius,
            vertices,
            texel_fetch,
            uniforms,
        })
    }

    /// Validate a draw and resolve everything the kernel reads.
    fn prepare_draw(
        &self,
        call: &DrawCall,
    ) -> DistanceFieldResult<(KernelInvocation, TextureId, TextureId, Sampling)> {
        let program = self.programs.get(&call.program.0).ok_or_else(|| {
            DistanceFieldError::device(format!("unknown program {:?}", call.program))
        })?;
        let linked = program.linked.as_ref().ok_or_else(|| {
            DistanceFieldError::device(format!("program {:?} is not linked", call.program))
        })?;

        let framebuffer = self.framebuffers.get(&call.framebuffer.0).ok_or_else(|| {
            DistanceFieldError::device(format!("unknown framebuffer {:?}", call.framebuffer))
        })?;
        let status = self.check_status(call.framebuffer);
        let target = match framebuffer.color {
            Some(color) if status.is_complete() => color,
            _ => {
                return Err(DistanceFieldError::device(format!(
                    "draw into incomplete framebuffer {:?}: {status}",
                    call.framebuffer
                )));
            }
        };

        let count = call.vertex_count as usize;
        if count == 0 || count % 3 != 0 {
            return Err(DistanceFieldError::device(format!(
                "vertex count {count} is not a whole number of triangles"
            )));
        }
        let positions = match (linked.vertices, call.vertices) {
            (VertexSource::VertexIndex, _) => (0..count).map(vertex_index_position).collect(),
            (VertexSource::Attribute { location }, VertexInput::Buffer { buffer, location: bound })
                if bound == location =>
            {
                let data = self.buffers.get(&buffer.0).ok_or_else(|| {
                    DistanceFieldError::device(format!("unknown vertex buffer {buffer:?}"))
                })?;
                if data.len() < count {
                    return Err(DistanceFieldError::device(format!(
                        "vertex buffer {buffer:?} holds {} vertices, draw needs {count}",
                        data.len()
                    )));
                }
                data[..count].to_vec()
            }
            (VertexSource::Attribute { location }, _) => {
                return Err(DistanceFieldError::device(format!(
                    "no vertex buffer bound at attribute location {location}"
                )));
            }
        };

        let unit = linked.sampler_unit()?;
        let source = *self.units.get(&unit).ok_or_else(|| {
            DistanceFieldError::device(format!("no texture bound to unit {unit}"))
        })?;
        if source == target {
            return Err(DistanceFieldError::device(format!(
                "texture {source:?} is both sampled and rendered to"
            )));
        }
        let source_desc = self.texture(source)?.desc;
        if !source_desc.usage.sampled || !source_desc.format.is_color_renderable() {
            return Err(DistanceFieldError::device(format!(
                "texture {source:?} cannot be sampled"
            )));
        }

        let sampling = if linked.texel_fetch {
            Sampling::Fetch
        } else {
            Sampling::Normalized {
                size_inverted: linked.vec2(IMAGE_SIZE_INVERTED_UNIFORM)?,
            }
        };

        let invocation = KernelInvocation {
            language: linked.language,
            viewport: framebuffer.viewport,
            positions,
            radius: linked.radius,
            scaling: linked.vec2(SCALING_UNIFORM)?,
            offset: linked.vec2(OFFSET_UNIFORM)?,
        };
        Ok((invocation, source, target, sampling))
    }
}

/// Clip-space position the full-screen-triangle vertex stage derives from
/// `gl_VertexID` / `vertex_index`.
fn vertex_index_position(index: usize) -> [f32; 2] {
    [
        if index % 3 == 2 { 3.0 } else { -1.0 },
        if index % 3 == 1 { -3.0 } else { 1.0 },
    ]
}

impl GraphicsDevice for SoftwareDevice {
    fn context_info(&self) -> &ContextInfo {
        &self.info
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> DistanceFieldResult<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(DistanceFieldError::resource(format!(
                "cannot allocate an empty {}x{} texture",
                desc.width, desc.height
            )));
        }
        if desc.width > MAX_TEXTURE_SIZE || desc.height > MAX_TEXTURE_SIZE {
            return Err(DistanceFieldError::resource(format!(
                "texture {}x{} exceeds the maximum size {MAX_TEXTURE_SIZE}",
                desc.width, desc.height
            )));
        }
        let len = desc
            .byte_len()
            .ok_or_else(|| DistanceFieldError::resource("texture size overflow"))?;

        let id = self.allocate_id();
        self.textures.insert(
            id,
            Texture {
                desc: *desc,
                data: vec![0; len],
            },
        );
        tracing::trace!(texture = id, ?desc, "created texture");
        Ok(TextureId(id))
    }

    fn texture_desc(&self, texture: TextureId) -> DistanceFieldResult<TextureDesc> {
        Ok(self.texture(texture)?.desc)
    }

    fn write_texture(&mut self, texture: TextureId, data: &[u8]) -> DistanceFieldResult<()> {
        let tex = self
            .textures
            .get_mut(&texture.0)
            .ok_or_else(|| DistanceFieldError::device(format!("unknown texture {texture:?}")))?;
        if data.len() != tex.data.len() {
            return Err(DistanceFieldError::device(format!(
                "texture {texture:?} upload has {} bytes, expected {}",
                data.len(),
                tex.data.len()
            )));
        }
        tex.data.copy_from_slice(data);
        Ok(())
    }

    fn read_texture(&mut self, texture: TextureId) -> DistanceFieldResult<Vec<u8>> {
        Ok(self.texture(texture)?.data.clone())
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture.0);
        self.units.retain(|_, bound| *bound != texture);
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        sources: &[String],
    ) -> DistanceFieldResult<ShaderId> {
        let source = sources.concat();
        let interface = reflect::reflect(stage, &source, &self.info).map_err(|log| {
            DistanceFieldError::build(format!("{stage:?} shader failed to compile: {log}"))
        })?;
        let id = self.allocate_id();
        self.shaders.insert(id, interface);
        Ok(ShaderId(id))
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader.0);
    }

    fn create_program(&mut self, shaders: &[ShaderId]) -> DistanceFieldResult<ProgramId> {
        let stages = shaders
            .iter()
            .map(|id| {
                self.shaders.get(&id.0).cloned().ok_or_else(|| {
                    DistanceFieldError::device(format!("unknown shader {id:?}"))
                })
            })
            .collect::<DistanceFieldResult<Vec<_>>>()?;
        let id = self.allocate_id();
        self.programs.insert(
            id,
            Program {
                stages,
                attribute_bindings: BTreeMap::new(),
                linked: None,
            },
        );
        Ok(ProgramId(id))
    }

    fn bind_attribute_location(
        &mut self,
        program: ProgramId,
        location: u32,
        name: &str,
    ) -> DistanceFieldResult<()> {
        if location >= MAX_VERTEX_ATTRIBS {
            return Err(DistanceFieldError::device(format!(
                "attribute location {location} out of range"
            )));
        }
        self.program_mut(program)?
            .attribute_bindings
            .insert(name.to_string(), location);
        Ok(())
    }

    fn link_program(&mut self, program: ProgramId) -> DistanceFieldResult<()> {
        let prog = self
            .programs
            .get(&program.0)
            .ok_or_else(|| DistanceFieldError::device(format!("unknown program {program:?}")))?;
        let linked = Self::link(prog).map_err(|log| {
            DistanceFieldError::build(format!("program {program:?} failed to link: {log}"))
        })?;
        tracing::trace!(?program, vertices = ?linked.vertices, "linked program");
        self.program_mut(program)?.linked = Some(linked);
        Ok(())
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<i32> {
        self.programs
            .get(&program.0)?
            .linked
            .as_ref()?
            .uniform(name)
            .map(|u| u.location)
    }

    fn set_uniform(
        &mut self,
        program: ProgramId,
        location: i32,
        value: UniformValue,
    ) -> DistanceFieldResult<()> {
        let max_units = self.info.max_texture_units;
        let linked = self.program_mut(program)?.linked.as_mut().ok_or_else(|| {
            DistanceFieldError::device(format!("program {program:?} is not linked"))
        })?;
        if location == -1 {
            return Ok(());
        }
        let uniform = linked
            .uniforms
            .iter_mut()
            .find(|u| u.location == location)
            .ok_or_else(|| {
                DistanceFieldError::device(format!("no uniform at location {location}"))
            })?;

        match (uniform.kind, value) {
            (UniformKind::Vec2, UniformValue::Vec2(_)) => {}
            (UniformKind::Sampler2D, UniformValue::Int(unit))
                if u32::try_from(unit).is_ok_and(|u| u < max_units) => {}
            _ => {
                return Err(DistanceFieldError::device(format!(
                    "value {value:?} does not fit uniform '{}'",
                    uniform.name
                )));
            }
        }
        uniform.value = value;
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program.0);
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> DistanceFieldResult<BufferId> {
        if vertices.is_empty() {
            return Err(DistanceFieldError::resource("cannot allocate an empty vertex buffer"));
        }
        let id = self.allocate_id();
        self.buffers.insert(id, vertices.to_vec());
        Ok(BufferId(id))
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer.0);
    }

    fn create_framebuffer(&mut self, viewport: TexelRect) -> DistanceFieldResult<FramebufferId> {
        let id = self.allocate_id();
        self.framebuffers.insert(
            id,
            Framebuffer {
                viewport,
                color: None,
            },
        );
        Ok(FramebufferId(id))
    }

    fn attach_color(
        &mut self,
        framebuffer: FramebufferId,
        texture: TextureId,
    ) -> DistanceFieldResult<()> {
        self.texture(texture)?;
        let fb = self.framebuffers.get_mut(&framebuffer.0).ok_or_else(|| {
            DistanceFieldError::device(format!("unknown framebuffer {framebuffer:?}"))
        })?;
        fb.color = Some(texture);
        Ok(())
    }

    fn clear_color(&mut self, framebuffer: FramebufferId) -> DistanceFieldResult<()> {
        if !self.check_status(framebuffer).is_complete() {
            return Ok(());
        }
        let Some(fb) = self.framebuffers.get(&framebuffer.0) else {
            return Ok(());
        };
        let viewport = fb.viewport;
        let Some(tex) = fb.color.and_then(|id| self.textures.get_mut(&id.0)) else {
            return Ok(());
        };

        let bpp = tex.desc.format.bytes_per_texel();
        let width = tex.desc.width;
        let x_end = viewport.x.saturating_add(viewport.width).min(width);
        let y_end = viewport.y.saturating_add(viewport.height).min(tex.desc.height);
        if viewport.x >= x_end {
            return Ok(());
        }
        for y in viewport.y..y_end {
            let start = (y as usize * width as usize + viewport.x as usize) * bpp;
            let end = (y as usize * width as usize + x_end as usize) * bpp;
            tex.data[start..end].fill(0);
        }
        Ok(())
    }

    fn check_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        let Some(fb) = self.framebuffers.get(&framebuffer.0) else {
            return FramebufferStatus::Unsupported;
        };
        let Some(color) = fb.color else {
            return FramebufferStatus::MissingAttachment;
        };
        let Some(tex) = self.textures.get(&color.0) else {
            return FramebufferStatus::IncompleteAttachment;
        };
        if !tex.desc.format.is_color_renderable() || !tex.desc.usage.render_attachment {
            return FramebufferStatus::IncompleteAttachment;
        }
        // Float colour buffers need EXT_color_buffer_float on ES.
        if self.info.api == Api::OpenGlEs && tex.desc.format == TextureFormat::R32Float {
            return FramebufferStatus::Unsupported;
        }
        FramebufferStatus::Complete
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.framebuffers.remove(&framebuffer.0);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> DistanceFieldResult<()> {
        if unit >= self.info.max_texture_units {
            return Err(DistanceFieldError::device(format!(
                "texture unit {unit} exceeds the {} units of this context",
                self.info.max_texture_units
            )));
        }
        self.texture(texture)?;
        self.units.insert(unit, texture);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn draw(&mut self, call: &DrawCall) -> DistanceFieldResult<()> {
        let (invocation, source, target, sampling) = self.prepare_draw(call)?;

        let mut output = self
            .textures
            .remove(&target.0)
            .ok_or_else(|| DistanceFieldError::device(format!("unknown texture {target:?}")))?;
        let shaded = match self.texture(source) {
            Ok(input) => {
                let sampler = TextureSampler {
                    width: input.desc.width,
                    height: input.desc.height,
                    format: input.desc.format,
                    data: &input.data,
                    sampling,
                };
                Ok(invocation.run(
                    &sampler,
                    &mut output.data,
                    output.desc.width,
                    output.desc.height,
                    output.desc.format,
                ))
            }
            Err(err) => Err(err),
        };
        self.textures.insert(target.0, output);

        let shaded = shaded?;
        self.draws += 1;
        tracing::trace!(shaded, "draw complete");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/device/software/mod.rs"]
mod tests;
