use std::fmt::Write as _;

use crate::{
    capability::{Capabilities, CapabilityTier, ShadingLanguage},
    device::{Api, Extension},
    foundation::core::Radius,
};

pub const FULL_SCREEN_TRIANGLE_GLSL: &str = include_str!("../../shaders/full_screen_triangle.glsl");
pub const DISTANCE_FIELD_VERT: &str = include_str!("../../shaders/distance_field.vert");
pub const DISTANCE_FIELD_FRAG: &str = include_str!("../../shaders/distance_field.frag");
pub const FULL_SCREEN_TRIANGLE_WGSL: &str = include_str!("../../shaders/full_screen_triangle.wgsl");
pub const DISTANCE_FIELD_WGSL: &str = include_str!("../../shaders/distance_field.wgsl");

/// Texture unit the kernel samples from. Stays below 8 because some ES2
/// devices expose no more units than that.
pub const TEXTURE_UNIT: u32 = 7;

pub const POSITION_ATTRIBUTE: &str = "position";
pub const POSITION_LOCATION: u32 = 0;

pub const SCALING_UNIFORM: &str = "scaling";
pub const OFFSET_UNIFORM: &str = "offset";
pub const IMAGE_SIZE_INVERTED_UNIFORM: &str = "imageSizeInverted";
pub const TEXTURE_UNIFORM: &str = "textureData";

pub const SCALING_LOCATION: i32 = 0;
pub const OFFSET_LOCATION: i32 = 1;
pub const IMAGE_SIZE_INVERTED_LOCATION: i32 = 2;

/// Source fragments for both stages, in concatenation order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramSources {
    pub language: ShadingLanguage,
    pub vertex: Vec<String>,
    pub fragment: Vec<String>,
}

/// Assemble the program text for one `(radius, tier)` pair.
pub fn program_sources(radius: Radius, caps: &Capabilities) -> ProgramSources {
    match caps.shading_language() {
        ShadingLanguage::Glsl => ProgramSources {
            language: ShadingLanguage::Glsl,
            vertex: vec![
                glsl_header(caps, Stage::Vertex),
                FULL_SCREEN_TRIANGLE_GLSL.to_string(),
                DISTANCE_FIELD_VERT.to_string(),
            ],
            fragment: vec![
                glsl_header(caps, Stage::Fragment),
                format!("#define RADIUS {}\n", radius.get()),
                DISTANCE_FIELD_FRAG.to_string(),
            ],
        },
        ShadingLanguage::Wgsl => {
            // Both entry points live in one module; each stage gets the whole text.
            let module = vec![
                format!("const RADIUS: i32 = {};\n", radius.get()),
                FULL_SCREEN_TRIANGLE_WGSL.to_string(),
                DISTANCE_FIELD_WGSL.to_string(),
            ];
            ProgramSources {
                language: ShadingLanguage::Wgsl,
                vertex: module.clone(),
                fragment: module,
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stage {
    Vertex,
    Fragment,
}

fn glsl_header(caps: &Capabilities, stage: Stage) -> String {
    let tier = caps.tier;
    let mut out = String::new();
    if let Some(version) = tier.glsl_version() {
        let _ = writeln!(out, "#version {version}");
    }

    if tier.api() == Api::OpenGl {
        if caps.explicit_uniform_locations {
            let _ = writeln!(
                out,
                "#extension {}: require",
                Extension::ExplicitUniformLocation.gl_name()
            );
        }
        if caps.explicit_sampler_binding {
            let _ = writeln!(
                out,
                "#extension {}: require",
                Extension::ShadingLanguage420Pack.gl_name()
            );
        }
    }

    if caps.implicit_vertex_generation {
        out.push_str("#define IMPLICIT_VERTEX_ID\n");
    }
    if caps.explicit_attribute_binding {
        out.push_str("#define EXPLICIT_ATTRIBUTE_LOCATION\n");
    }
    if caps.explicit_uniform_locations {
        out.push_str("#define EXPLICIT_UNIFORM_LOCATION\n");
    }
    if caps.explicit_sampler_binding {
        out.push_str("#define EXPLICIT_TEXTURE_BINDING\n");
    }
    if caps.texel_fetch {
        out.push_str("#define TEXELFETCH_USABLE\n");
    }

    let legacy = matches!(tier, CapabilityTier::Gl210 | CapabilityTier::Gles200);
    if legacy {
        out.push_str("#define LEGACY_GLSL\n");
        match stage {
            Stage::Vertex => out.push_str("#define in attribute\n#define out varying\n"),
            Stage::Fragment => out.push_str(
                "#define in varying\n#define texture texture2D\n#define fragmentValue gl_FragColor\n",
            ),
        }
    }

    match tier.api() {
        Api::OpenGlEs => out.push_str("precision highp float;\nprecision highp int;\n"),
        Api::OpenGl if legacy => out.push_str("#define lowp\n#define mediump\n#define highp\n"),
        _ => {}
    }

    out
}
