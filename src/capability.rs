//! Capability negotiation: pick one feature tier for the active context.
//!
//! The decision is made once per invocation and handed to every later step as
//! a [`Capabilities`] value, so no other component queries the context.

use std::fmt;

use crate::{
    device::{Api, ContextInfo, Extension, Version},
    foundation::error::{DistanceFieldError, DistanceFieldResult},
};

/// Feature tiers, most capable first within each API flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityTier {
    Gl320,
    Gl300,
    Gl210,
    Gles300,
    Gles200,
    WebGpu,
}

const DESKTOP_CANDIDATES: [CapabilityTier; 3] = [
    CapabilityTier::Gl320,
    CapabilityTier::Gl300,
    CapabilityTier::Gl210,
];
const ES_CANDIDATES: [CapabilityTier; 2] = [CapabilityTier::Gles300, CapabilityTier::Gles200];
const WEBGPU_CANDIDATES: [CapabilityTier; 1] = [CapabilityTier::WebGpu];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShadingLanguage {
    Glsl,
    Wgsl,
}

impl CapabilityTier {
    pub const ALL: [CapabilityTier; 6] = [
        CapabilityTier::Gl320,
        CapabilityTier::Gl300,
        CapabilityTier::Gl210,
        CapabilityTier::Gles300,
        CapabilityTier::Gles200,
        CapabilityTier::WebGpu,
    ];

    /// Ordered candidate list for an API flavor. The last entry is the baseline.
    pub fn candidates(api: Api) -> &'static [CapabilityTier] {
        match api {
            Api::OpenGl => &DESKTOP_CANDIDATES,
            Api::OpenGlEs => &ES_CANDIDATES,
            Api::WebGpu => &WEBGPU_CANDIDATES,
        }
    }

    pub fn api(self) -> Api {
        match self {
            CapabilityTier::Gl320 | CapabilityTier::Gl300 | CapabilityTier::Gl210 => Api::OpenGl,
            CapabilityTier::Gles300 | CapabilityTier::Gles200 => Api::OpenGlEs,
            CapabilityTier::WebGpu => Api::WebGpu,
        }
    }

    pub fn min_version(self) -> Version {
        match self {
            CapabilityTier::Gl320 => Version::new(3, 2),
            CapabilityTier::Gl300 => Version::new(3, 0),
            CapabilityTier::Gl210 => Version::new(2, 1),
            CapabilityTier::Gles300 => Version::new(3, 0),
            CapabilityTier::Gles200 => Version::new(2, 0),
            CapabilityTier::WebGpu => Version::new(1, 0),
        }
    }

    pub fn shading_language(self) -> ShadingLanguage {
        match self {
            CapabilityTier::WebGpu => ShadingLanguage::Wgsl,
            _ => ShadingLanguage::Glsl,
        }
    }

    /// `#version` directive body for GLSL tiers.
    pub fn glsl_version(self) -> Option<&'static str> {
        match self {
            CapabilityTier::Gl320 => Some("150"),
            CapabilityTier::Gl300 => Some("130"),
            CapabilityTier::Gl210 => Some("120"),
            CapabilityTier::Gles300 => Some("300 es"),
            CapabilityTier::Gles200 => Some("100"),
            CapabilityTier::WebGpu => None,
        }
    }

    pub fn is_supported_by(self, info: &ContextInfo) -> bool {
        info.api == self.api() && info.version >= self.min_version()
    }

    /// The smallest context that satisfies this tier and nothing above it.
    ///
    /// Desktop tiers include every extension the tier can make use of.
    pub fn minimal_context(self) -> ContextInfo {
        let info = ContextInfo::new(self.api(), self.min_version());
        match self.api() {
            Api::OpenGl => info.with_extensions(Extension::ALL),
            Api::OpenGlEs if self == CapabilityTier::Gles200 => info.with_max_texture_units(8),
            _ => info,
        }
    }
}

impl fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapabilityTier::Gl320 => "OpenGL 3.2",
            CapabilityTier::Gl300 => "OpenGL 3.0",
            CapabilityTier::Gl210 => "OpenGL 2.1",
            CapabilityTier::Gles300 => "OpenGL ES 3.0",
            CapabilityTier::Gles200 => "OpenGL ES 2.0",
            CapabilityTier::WebGpu => "WebGPU",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for CapabilityTier {
    type Err = DistanceFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "gl320" => Ok(CapabilityTier::Gl320),
            "gl300" => Ok(CapabilityTier::Gl300),
            "gl210" => Ok(CapabilityTier::Gl210),
            "gles300" => Ok(CapabilityTier::Gles300),
            "gles200" => Ok(CapabilityTier::Gles200),
            "webgpu" => Ok(CapabilityTier::WebGpu),
            other => Err(DistanceFieldError::validation(format!(
                "unknown capability tier '{other}'"
            ))),
        }
    }
}

/// The resolved tier plus the flags derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub tier: CapabilityTier,
    /// Vertex positions come from the vertex index, no buffer needed.
    pub implicit_vertex_generation: bool,
    /// Attribute locations are declared in the shader text.
    pub explicit_attribute_binding: bool,
    /// Uniform locations are declared in the shader text.
    pub explicit_uniform_locations: bool,
    /// The sampler's texture unit is declared in the shader text.
    pub explicit_sampler_binding: bool,
    /// Integer texel fetches with a queryable texture size; otherwise the
    /// kernel needs the inverse image size as a uniform.
    pub texel_fetch: bool,
}

impl Capabilities {
    pub fn for_tier(tier: CapabilityTier, info: &ContextInfo) -> Self {
        let (explicit_uniform_locations, explicit_sampler_binding) = match tier.api() {
            Api::OpenGl => (
                info.supports(Extension::ExplicitUniformLocation),
                info.supports(Extension::ShadingLanguage420Pack),
            ),
            Api::OpenGlEs => (false, false),
            Api::WebGpu => (true, true),
        };

        Self {
            tier,
            implicit_vertex_generation: matches!(
                tier,
                CapabilityTier::Gl320
                    | CapabilityTier::Gl300
                    | CapabilityTier::Gles300
                    | CapabilityTier::WebGpu
            ),
            explicit_attribute_binding: matches!(
                tier,
                CapabilityTier::Gles300 | CapabilityTier::WebGpu
            ),
            explicit_uniform_locations,
            explicit_sampler_binding,
            texel_fetch: matches!(
                tier,
                CapabilityTier::Gl320 | CapabilityTier::Gles300 | CapabilityTier::WebGpu
            ),
        }
    }

    pub fn shading_language(&self) -> ShadingLanguage {
        self.tier.shading_language()
    }
}

/// Select the best tier the context supports.
///
/// Fails when the context is below the baseline of its candidate list, or when
/// a desktop context older than 3.0 lacks framebuffer objects.
pub fn negotiate(info: &ContextInfo) -> DistanceFieldResult<Capabilities> {
    let candidates = CapabilityTier::candidates(info.api);
    let tier = candidates
        .iter()
        .copied()
        .find(|tier| tier.is_supported_by(info))
        .ok_or_else(|| {
            let baseline = candidates
                .last()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "none".to_string());
            DistanceFieldError::configuration(format!(
                "context {:?} {} is below the baseline tier {baseline}",
                info.api, info.version
            ))
        })?;

    if info.api == Api::OpenGl
        && info.version < Version::new(3, 0)
        && !info.supports(Extension::FramebufferObject)
    {
        return Err(DistanceFieldError::configuration(format!(
            "{} is required on OpenGL {}",
            Extension::FramebufferObject.gl_name(),
            info.version
        )));
    }

    let caps = Capabilities::for_tier(tier, info);
    tracing::debug!(tier = %caps.tier, ?caps, "negotiated capability tier");
    Ok(caps)
}

#[cfg(test)]
#[path = "../tests/unit/capability.rs"]
mod tests;
