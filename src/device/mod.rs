//! Narrow capability-and-resource interface to a graphics context.
//!
//! The transform never talks to a graphics API directly. It asks a
//! [`GraphicsDevice`] what it supports ([`ContextInfo`]) and drives it through
//! GL-shaped resource calls: textures, shader objects, programs, vertex
//! buffers and framebuffers. Handles are plain ids owned by the device.

use std::collections::BTreeSet;
use std::fmt;

use crate::foundation::{core::TexelRect, error::DistanceFieldResult};

pub mod scope;
pub mod software;
#[cfg(feature = "gpu")]
pub mod gpu;

macro_rules! handle {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);
    };
}

handle!(TextureId);
handle!(ShaderId);
handle!(ProgramId);
handle!(BufferId);
handle!(FramebufferId);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Api {
    OpenGl,
    OpenGlEs,
    WebGpu,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Extension {
    /// `GL_ARB_framebuffer_object`
    FramebufferObject,
    /// `GL_ARB_explicit_uniform_location`
    ExplicitUniformLocation,
    /// `GL_ARB_shading_language_420pack`
    ShadingLanguage420Pack,
}

impl Extension {
    pub const ALL: [Extension; 3] = [
        Extension::FramebufferObject,
        Extension::ExplicitUniformLocation,
        Extension::ShadingLanguage420Pack,
    ];

    pub fn gl_name(self) -> &'static str {
        match self {
            Extension::FramebufferObject => "GL_ARB_framebuffer_object",
            Extension::ExplicitUniformLocation => "GL_ARB_explicit_uniform_location",
            Extension::ShadingLanguage420Pack => "GL_ARB_shading_language_420pack",
        }
    }

    pub fn from_gl_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ext| ext.gl_name() == name)
    }
}

/// What the active context reports about itself.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContextInfo {
    pub api: Api,
    pub version: Version,
    pub extensions: BTreeSet<Extension>,
    pub max_texture_units: u32,
}

impl ContextInfo {
    pub fn new(api: Api, version: Version) -> Self {
        Self {
            api,
            version,
            extensions: BTreeSet::new(),
            max_texture_units: 16,
        }
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extensions.insert(extension);
        self
    }

    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    pub fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_texture_units = units;
        self
    }

    pub fn supports(&self, extension: Extension) -> bool {
        self.extensions.contains(&extension)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TextureFormat {
    R8Unorm,
    Rgba8Unorm,
    R32Float,
    Depth32Float,
}

impl TextureFormat {
    pub fn bytes_per_texel(self) -> usize {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rgba8Unorm | TextureFormat::R32Float | TextureFormat::Depth32Float => 4,
        }
    }

    pub fn is_color_renderable(self) -> bool {
        !matches!(self, TextureFormat::Depth32Float)
    }

    /// Store one kernel output value the way a fragment write of
    /// `vec4(value, 0, 0, 1)` lands in this format.
    pub fn encode_value(self, value: f32, out: &mut [u8]) {
        match self {
            TextureFormat::R8Unorm => out[0] = unorm8(value),
            TextureFormat::Rgba8Unorm => out.copy_from_slice(&[unorm8(value), 0, 0, 255]),
            TextureFormat::R32Float | TextureFormat::Depth32Float => {
                out.copy_from_slice(&value.to_le_bytes())
            }
        }
    }

    /// First channel of a texel as a normalized float.
    pub fn decode_value(self, texel: &[u8]) -> f32 {
        match self {
            TextureFormat::R8Unorm | TextureFormat::Rgba8Unorm => f32::from(texel[0]) / 255.0,
            TextureFormat::R32Float | TextureFormat::Depth32Float => {
                f32::from_le_bytes([texel[0], texel[1], texel[2], texel[3]])
            }
        }
    }
}

pub(crate) fn unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureUsage {
    pub sampled: bool,
    pub render_attachment: bool,
}

impl TextureUsage {
    pub const SAMPLED: Self = Self {
        sampled: true,
        render_attachment: false,
    };
    pub const RENDER_ATTACHMENT: Self = Self {
        sampled: false,
        render_attachment: true,
    };
    pub const ALL: Self = Self {
        sampled: true,
        render_attachment: true,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureDesc {
    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    pub fn byte_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.format.bytes_per_texel())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Vec2([f32; 2]),
}

/// Framebuffer completeness, with the numeric codes GL reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    MissingAttachment,
    IncompleteDimensions,
    Unsupported,
}

impl FramebufferStatus {
    pub fn code(self) -> u32 {
        match self {
            FramebufferStatus::Complete => 0x8CD5,
            FramebufferStatus::IncompleteAttachment => 0x8CD6,
            FramebufferStatus::MissingAttachment => 0x8CD7,
            FramebufferStatus::IncompleteDimensions => 0x8CD9,
            FramebufferStatus::Unsupported => 0x8CDD,
        }
    }

    pub fn is_complete(self) -> bool {
        self == FramebufferStatus::Complete
    }
}

impl fmt::Display for FramebufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({:#06x})", self, self.code())
    }
}

/// Where the three triangle vertices come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexInput {
    /// Derived in the vertex stage from the vertex index.
    Implicit,
    /// Two floats per vertex read from `buffer` at attribute `location`.
    Buffer { buffer: BufferId, location: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawCall {
    pub program: ProgramId,
    pub framebuffer: FramebufferId,
    pub vertex_count: u32,
    pub vertices: VertexInput,
}

pub trait GraphicsDevice {
    fn context_info(&self) -> &ContextInfo;

    fn create_texture(&mut self, desc: &TextureDesc) -> DistanceFieldResult<TextureId>;
    fn texture_desc(&self, texture: TextureId) -> DistanceFieldResult<TextureDesc>;
    fn write_texture(&mut self, texture: TextureId, data: &[u8]) -> DistanceFieldResult<()>;
    fn read_texture(&mut self, texture: TextureId) -> DistanceFieldResult<Vec<u8>>;
    fn delete_texture(&mut self, texture: TextureId);

    /// Compile one stage from the concatenation of `sources`.
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        sources: &[String],
    ) -> DistanceFieldResult<ShaderId>;
    fn delete_shader(&mut self, shader: ShaderId);

    fn create_program(&mut self, shaders: &[ShaderId]) -> DistanceFieldResult<ProgramId>;
    /// Only meaningful before [`GraphicsDevice::link_program`].
    fn bind_attribute_location(
        &mut self,
        program: ProgramId,
        location: u32,
        name: &str,
    ) -> DistanceFieldResult<()>;
    fn link_program(&mut self, program: ProgramId) -> DistanceFieldResult<()>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<i32>;
    fn set_uniform(
        &mut self,
        program: ProgramId,
        location: i32,
        value: UniformValue,
    ) -> DistanceFieldResult<()>;
    fn delete_program(&mut self, program: ProgramId);

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> DistanceFieldResult<BufferId>;
    fn delete_buffer(&mut self, buffer: BufferId);

    fn create_framebuffer(&mut self, viewport: TexelRect) -> DistanceFieldResult<FramebufferId>;
    fn attach_color(
        &mut self,
        framebuffer: FramebufferId,
        texture: TextureId,
    ) -> DistanceFieldResult<()>;
    /// Clear the viewport region of the colour attachment to zero.
    fn clear_color(&mut self, framebuffer: FramebufferId) -> DistanceFieldResult<()>;
    fn check_status(&self, framebuffer: FramebufferId) -> FramebufferStatus;
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> DistanceFieldResult<()>;
    fn draw(&mut self, call: &DrawCall) -> DistanceFieldResult<()>;
}

#[cfg(test)]
#[path = "../../tests/unit/device/mod.rs"]
mod tests;
