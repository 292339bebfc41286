//! Interface reflection for compiled shader stages.
//!
//! A stage is reduced to the facts linking and drawing need: its inputs,
//! its uniforms, the baked `RADIUS` and which builtins it relies on. Rules a
//! real compiler enforces on the version, extensions and layout qualifiers
//! are checked here so that an inconsistent header fails to compile instead
//! of silently working.

use std::collections::BTreeSet;

use super::preprocess::{self, Preprocessed};
use crate::{
    capability::ShadingLanguage,
    device::{Api, ContextInfo, Extension, ShaderStage},
    shader::sources::TEXTURE_UNIT,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct GlslVersion {
    pub number: u16,
    pub es: bool,
}

impl GlslVersion {
    fn parse(body: Option<&str>, api: Api) -> Result<Self, String> {
        let Some(body) = body else {
            return Ok(match api {
                Api::OpenGlEs => Self { number: 100, es: true },
                _ => Self { number: 110, es: false },
            });
        };
        let mut parts = body.split_whitespace();
        let number: u16 = parts
            .next()
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| format!("malformed #version '{body}'"))?;
        let es = match parts.next() {
            Some("es") => true,
            Some("core") | Some("compatibility") | None => number == 100,
            Some(other) => return Err(format!("unknown #version profile '{other}'")),
        };
        let known = if es {
            matches!(number, 100 | 300 | 310 | 320)
        } else {
            matches!(
                number,
                110 | 120 | 130 | 140 | 150 | 330 | 400 | 410 | 420 | 430 | 440 | 450 | 460
            )
        };
        if !known {
            return Err(format!("unsupported #version '{body}'"));
        }
        Ok(Self { number, es })
    }

    /// Highest language version a context accepts.
    fn max_for(info: &ContextInfo) -> Option<Self> {
        let (major, minor) = (info.version.major, info.version.minor);
        match info.api {
            Api::OpenGl => {
                let number = match (major, minor) {
                    (2, 0) => 110,
                    (2, _) => 120,
                    (3, 0) => 130,
                    (3, 1) => 140,
                    (3, 2) => 150,
                    (3, _) => 330,
                    (4, m) => 400 + 10 * u16::from(m.min(6)),
                    (m, _) if m > 4 => 460,
                    _ => return None,
                };
                Some(Self { number, es: false })
            }
            Api::OpenGlEs => {
                let number = match (major, minor) {
                    (2, _) => 100,
                    (3, 0) => 300,
                    (3, 1) => 310,
                    (m, _) if m >= 3 => 320,
                    _ => return None,
                };
                Some(Self { number, es: true })
            }
            Api::WebGpu => None,
        }
    }

    fn vertex_id(self) -> bool {
        if self.es { self.number >= 300 } else { self.number >= 130 }
    }

    fn texel_fetch(self) -> bool {
        self.vertex_id()
    }

    fn input_locations(self) -> bool {
        if self.es { self.number >= 300 } else { self.number >= 330 }
    }

    fn uniform_locations(self) -> bool {
        if self.es { self.number >= 310 } else { self.number >= 430 }
    }

    fn binding_qualifier(self) -> bool {
        if self.es { self.number >= 310 } else { self.number >= 420 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UniformKind {
    Vec2,
    Sampler2D,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct UniformDecl {
    pub name: String,
    pub kind: UniformKind,
    pub location: Option<i32>,
    pub binding: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AttributeDecl {
    pub name: String,
    pub location: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ShaderInterface {
    pub stage: ShaderStage,
    pub language: ShadingLanguage,
    pub has_entry_point: bool,
    /// Value of the `RADIUS` constant, when the stage defines one.
    pub radius: Option<i64>,
    pub uses_vertex_index: bool,
    pub uses_texel_fetch: bool,
    pub attributes: Vec<AttributeDecl>,
    pub uniforms: Vec<UniformDecl>,
}

pub(crate) fn reflect(
    stage: ShaderStage,
    source: &str,
    info: &ContextInfo,
) -> Result<ShaderInterface, String> {
    match info.api {
        Api::WebGpu => reflect_wgsl(stage, source),
        Api::OpenGl | Api::OpenGlEs => reflect_glsl(stage, source, info),
    }
}

fn reflect_glsl(
    stage: ShaderStage,
    source: &str,
    info: &ContextInfo,
) -> Result<ShaderInterface, String> {
    let Preprocessed {
        version,
        extensions,
        defines,
        text,
    } = preprocess::preprocess(source)?;

    let version = GlslVersion::parse(version.as_deref(), info.api)?;
    let max = GlslVersion::max_for(info)
        .ok_or_else(|| format!("context {:?} {} has no GLSL support", info.api, info.version))?;
    if version.es != max.es || version.number > max.number {
        return Err(format!(
            "GLSL {}{} is not supported by {:?} {}",
            version.number,
            if version.es && version.number != 100 { " es" } else { "" },
            info.api,
            info.version
        ));
    }

    let mut enabled = BTreeSet::new();
    for (name, behavior) in &extensions {
        let ext = Extension::from_gl_name(name).filter(|ext| info.supports(*ext));
        match (ext, behavior.as_str()) {
            (Some(ext), "require" | "enable") => {
                enabled.insert(ext);
            }
            (None, "require") => return Err(format!("extension '{name}' is not supported")),
            (_, "require" | "enable" | "warn" | "disable") => {}
            (_, other) => return Err(format!("unknown extension behavior '{other}'")),
        }
    }

    let idents: BTreeSet<&str> = preprocess::identifiers(&text).collect();
    if idents.contains("gl_VertexID") && !version.vertex_id() {
        return Err(format!(
            "'gl_VertexID' : undeclared identifier in GLSL {}",
            version.number
        ));
    }
    let uses_texel_fetch = idents.contains("texelFetch");
    if (uses_texel_fetch || idents.contains("textureSize")) && !version.texel_fetch() {
        return Err(format!(
            "'texelFetch' : no matching function in GLSL {}",
            version.number
        ));
    }

    let radius = if idents.contains("RADIUS") {
        let value = defines
            .get("RADIUS")
            .ok_or_else(|| "'RADIUS' : undeclared identifier".to_string())?;
        Some(
            value
                .parse::<i64>()
                .map_err(|_| format!("'RADIUS' is not an integer constant: '{value}'"))?,
        )
    } else {
        None
    };

    let statements = preprocess::global_statements(&text);
    if version.es
        && stage == ShaderStage::Fragment
        && !statements
            .iter()
            .any(|s| s.starts_with("precision ") && s.ends_with(" float"))
    {
        return Err("no default precision defined for 'float'".to_string());
    }

    let explicit_uniforms =
        version.uniform_locations() || enabled.contains(&Extension::ExplicitUniformLocation);
    let binding_qualifier =
        version.binding_qualifier() || enabled.contains(&Extension::ShadingLanguage420Pack);

    let mut attributes = Vec::new();
    let mut uniforms = Vec::new();
    for statement in &statements {
        let decl = Declaration::parse(statement)?;
        match decl.storage {
            "uniform" => {
                if decl.location.is_some() && !explicit_uniforms {
                    return Err(format!(
                        "'location' qualifier on uniform '{}' requires {}",
                        decl.name,
                        Extension::ExplicitUniformLocation.gl_name()
                    ));
                }
                if decl.binding.is_some() && !binding_qualifier {
                    return Err(format!(
                        "'binding' qualifier on uniform '{}' requires {}",
                        decl.name,
                        Extension::ShadingLanguage420Pack.gl_name()
                    ));
                }
                let kind = match decl.ty {
                    "vec2" => UniformKind::Vec2,
                    "sampler2D" => UniformKind::Sampler2D,
                    _ => UniformKind::Other,
                };
                uniforms.push(UniformDecl {
                    name: decl.name.to_string(),
                    kind,
                    location: decl.location.map(|l| l as i32),
                    binding: decl.binding,
                });
            }
            "in" | "attribute" if stage == ShaderStage::Vertex => {
                if decl.location.is_some() && !version.input_locations() {
                    return Err(format!(
                        "'location' qualifier on input '{}' requires GLSL 3.30",
                        decl.name
                    ));
                }
                attributes.push(AttributeDecl {
                    name: decl.name.to_string(),
                    location: decl.location,
                });
            }
            _ => {}
        }
    }

    Ok(ShaderInterface {
        stage,
        language: ShadingLanguage::Glsl,
        has_entry_point: idents.contains("main"),
        radius,
        uses_vertex_index: idents.contains("gl_VertexID"),
        uses_texel_fetch,
        attributes,
        uniforms,
    })
}

/// One global declaration: `[layout(...)] storage [precision] type name`.
struct Declaration<'a> {
    storage: &'a str,
    ty: &'a str,
    name: &'a str,
    location: Option<u32>,
    binding: Option<u32>,
}

impl<'a> Declaration<'a> {
    fn parse(statement: &'a str) -> Result<Self, String> {
        let mut location = None;
        let mut binding = None;
        let mut rest = statement;

        if let Some(after) = statement.strip_prefix("layout") {
            let open = after
                .find('(')
                .ok_or_else(|| format!("malformed layout in '{statement}'"))?;
            let close = after
                .find(')')
                .ok_or_else(|| format!("malformed layout in '{statement}'"))?;
            for qualifier in after[open + 1..close].split(',') {
                let (key, value) = match qualifier.split_once('=') {
                    Some((k, v)) => (k.trim(), Some(v.trim())),
                    None => (qualifier.trim(), None),
                };
                let number = value.and_then(|v| v.parse::<u32>().ok());
                match key {
                    "location" => {
                        location = Some(number.ok_or_else(|| {
                            format!("invalid location in '{statement}'")
                        })?)
                    }
                    "binding" => {
                        binding = Some(number.ok_or_else(|| {
                            format!("invalid binding in '{statement}'")
                        })?)
                    }
                    _ => {}
                }
            }
            rest = after[close + 1..].trim_start();
        }

        let mut tokens = rest
            .split_whitespace()
            .filter(|t| !matches!(*t, "lowp" | "mediump" | "highp" | "flat" | "smooth"));
        let storage = tokens.next().unwrap_or("");
        let ty = tokens.next().unwrap_or("");
        let name = tokens
            .next()
            .map(|n| n.split('[').next().unwrap_or(n))
            .unwrap_or("");

        Ok(Self {
            storage,
            ty,
            name,
            location,
            binding,
        })
    }
}

fn reflect_wgsl(stage: ShaderStage, source: &str) -> Result<ShaderInterface, String> {
    let text = preprocess::strip_comments(source);
    let compact: String = text.split_whitespace().collect();

    let has_entry_point = match stage {
        ShaderStage::Vertex => compact.contains("@vertex"),
        ShaderStage::Fragment => compact.contains("@fragment"),
    };

    let statements = preprocess::global_statements(&text);
    let mut radius = None;
    let mut uniforms = Vec::new();
    for statement in &statements {
        if let Some(rest) = statement.strip_prefix("const RADIUS") {
            let value = rest
                .split_once('=')
                .map(|(_, v)| v.trim())
                .ok_or_else(|| format!("malformed constant '{statement}'"))?;
            radius = Some(
                value
                    .parse::<i64>()
                    .map_err(|_| format!("RADIUS is not an integer literal: '{value}'"))?,
            );
            continue;
        }

        let Some((_, decl)) = statement.split_once("var") else {
            continue;
        };
        let (space, decl) = match decl.strip_prefix('<') {
            Some(rest) => rest
                .split_once('>')
                .ok_or_else(|| format!("malformed variable '{statement}'"))?,
            None => ("", decl),
        };
        let Some((name, ty)) = decl.split_once(':') else {
            continue;
        };
        let (name, ty) = (name.trim(), ty.trim());

        if space == "uniform" {
            uniforms.extend(struct_fields(&text, ty)?.into_iter().enumerate().map(
                |(idx, (field, field_ty))| UniformDecl {
                    kind: if field_ty == "vec2<f32>" {
                        UniformKind::Vec2
                    } else {
                        UniformKind::Other
                    },
                    name: field,
                    location: Some(idx as i32),
                    binding: None,
                },
            ));
        } else if ty.starts_with("texture_2d") {
            // WGSL has no texture units; the module's texture reads whatever is
            // bound at the kernel's unit.
            uniforms.push(UniformDecl {
                name: name.to_string(),
                kind: UniformKind::Sampler2D,
                location: None,
                binding: Some(TEXTURE_UNIT),
            });
        }
    }

    Ok(ShaderInterface {
        stage,
        language: ShadingLanguage::Wgsl,
        has_entry_point,
        radius,
        uses_vertex_index: compact.contains("@builtin(vertex_index)"),
        uses_texel_fetch: compact.contains("textureLoad"),
        attributes: Vec::new(),
        uniforms,
    })
}

/// `(name, type)` of each member of `struct name { ... }`.
fn struct_fields(text: &str, name: &str) -> Result<Vec<(String, String)>, String> {
    let header = format!("struct {name}");
    let start = text
        .find(&header)
        .ok_or_else(|| format!("unknown uniform type '{name}'"))?;
    let body = &text[start + header.len()..];
    let open = body
        .find('{')
        .ok_or_else(|| format!("malformed struct '{name}'"))?;
    let close = body
        .find('}')
        .ok_or_else(|| format!("malformed struct '{name}'"))?;

    Ok(body[open + 1..close]
        .split(',')
        .filter_map(|member| member.split_once(':'))
        .map(|(field, ty)| (field.trim().to_string(), ty.split_whitespace().collect()))
        .collect())
}

#[cfg(test)]
#[path = "../../../tests/unit/device/software/reflect.rs"]
mod tests;
