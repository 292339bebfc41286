//! Builds the distance-field program for one radius and capability tier.

pub mod sources;

use crate::{
    capability::Capabilities,
    device::{
        GraphicsDevice, ProgramId, ShaderStage, TextureId, UniformValue,
        scope::{DeviceScope, Resource},
    },
    foundation::{
        core::{Radius, ScalingFactor},
        error::{DistanceFieldError, DistanceFieldResult},
    },
};

pub use sources::{ProgramSources, program_sources};

/// Uniform locations resolved for a linked program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformLocations {
    pub scaling: i32,
    pub offset: i32,
    /// Only present on tiers without texel fetch.
    pub image_size_inverted: Option<i32>,
}

/// A linked program owned by the current [`DeviceScope`].
#[derive(Clone, Copy, Debug)]
pub struct DistanceFieldProgram {
    pub id: ProgramId,
    pub radius: Radius,
    pub capabilities: Capabilities,
    pub uniforms: UniformLocations,
    /// Attribute location of the vertex position, when geometry is explicit.
    pub position_location: Option<u32>,
}

impl DistanceFieldProgram {
    /// Compile and link a program with `radius` baked in.
    ///
    /// Shader objects are released as soon as the program is linked; the
    /// program itself lives until `scope` drops.
    #[tracing::instrument(skip(scope), fields(tier = %caps.tier))]
    pub fn build<D: GraphicsDevice + ?Sized>(
        scope: &mut DeviceScope<'_, D>,
        radius: Radius,
        caps: &Capabilities,
    ) -> DistanceFieldResult<Self> {
        let sources = program_sources(radius, caps);

        let vert = scope
            .device()
            .compile_shader(ShaderStage::Vertex, &sources.vertex)?;
        scope.adopt(Resource::Shader(vert));
        let frag = scope
            .device()
            .compile_shader(ShaderStage::Fragment, &sources.fragment)?;
        scope.adopt(Resource::Shader(frag));

        let id = scope.device().create_program(&[vert, frag])?;
        scope.adopt(Resource::Program(id));

        let position_location = if caps.implicit_vertex_generation {
            None
        } else {
            if !caps.explicit_attribute_binding {
                scope.device().bind_attribute_location(
                    id,
                    sources::POSITION_LOCATION,
                    sources::POSITION_ATTRIBUTE,
                )?;
            }
            Some(sources::POSITION_LOCATION)
        };

        scope.device().link_program(id)?;
        scope.release(Resource::Shader(frag));
        scope.release(Resource::Shader(vert));

        let uniforms = if caps.explicit_uniform_locations {
            UniformLocations {
                scaling: sources::SCALING_LOCATION,
                offset: sources::OFFSET_LOCATION,
                image_size_inverted: (!caps.texel_fetch)
                    .then_some(sources::IMAGE_SIZE_INVERTED_LOCATION),
            }
        } else {
            let device = scope.device_ref();
            UniformLocations {
                scaling: lookup_uniform(device, id, sources::SCALING_UNIFORM)?,
                offset: lookup_uniform(device, id, sources::OFFSET_UNIFORM)?,
                image_size_inverted: if caps.texel_fetch {
                    None
                } else {
                    Some(lookup_uniform(
                        device,
                        id,
                        sources::IMAGE_SIZE_INVERTED_UNIFORM,
                    )?)
                },
            }
        };

        if !caps.explicit_sampler_binding {
            let location = lookup_uniform(scope.device_ref(), id, sources::TEXTURE_UNIFORM)?;
            scope.device().set_uniform(
                id,
                location,
                UniformValue::Int(sources::TEXTURE_UNIT as i32),
            )?;
        }

        tracing::debug!(
            program = ?id,
            ?uniforms,
            ?position_location,
            "linked distance field program"
        );

        Ok(Self {
            id,
            radius,
            capabilities: *caps,
            uniforms,
            position_location,
        })
    }

    pub fn set_scaling<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        scaling: ScalingFactor,
    ) -> DistanceFieldResult<()> {
        device.set_uniform(
            self.id,
            self.uniforms.scaling,
            UniformValue::Vec2(scaling.to_array()),
        )
    }

    /// Origin of the destination rectangle, so the kernel works in
    /// rectangle-local coordinates.
    pub fn set_offset<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        offset: [u32; 2],
    ) -> DistanceFieldResult<()> {
        device.set_uniform(
            self.id,
            self.uniforms.offset,
            UniformValue::Vec2([offset[0] as f32, offset[1] as f32]),
        )
    }

    /// No-op on tiers that query the texture size in the kernel.
    pub fn set_image_size_inverted<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        image_size: [u32; 2],
    ) -> DistanceFieldResult<()> {
        let Some(location) = self.uniforms.image_size_inverted else {
            return Ok(());
        };
        device.set_uniform(
            self.id,
            location,
            UniformValue::Vec2([1.0 / image_size[0] as f32, 1.0 / image_size[1] as f32]),
        )
    }

    pub fn bind_texture<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        texture: TextureId,
    ) -> DistanceFieldResult<()> {
        device.bind_texture(sources::TEXTURE_UNIT, texture)
    }
}

fn lookup_uniform<D: GraphicsDevice + ?Sized>(
    device: &D,
    program: ProgramId,
    name: &str,
) -> DistanceFieldResult<i32> {
    device.uniform_location(program, name).ok_or_else(|| {
        DistanceFieldError::build(format!(
            "uniform '{name}' not found in linked program {program:?}"
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/shader/mod.rs"]
mod tests;
