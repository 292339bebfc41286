//! The full-screen triangle.

use crate::{
    device::{
        GraphicsDevice, VertexInput,
        scope::{DeviceScope, Resource},
    },
    foundation::error::DistanceFieldResult,
    shader::DistanceFieldProgram,
};

/// Clip-space corners of one triangle whose clipped footprint is the whole
/// viewport.
pub const FULL_SCREEN_TRIANGLE: [[f32; 2]; 3] = [[-1.0, 1.0], [-1.0, -3.0], [3.0, 1.0]];

pub const VERTEX_COUNT: u32 = 3;

/// Provide the three vertices the draw needs.
///
/// Tiers with implicit vertex generation upload nothing. Otherwise a buffer
/// holding [`FULL_SCREEN_TRIANGLE`] is created, owned by `scope` and bound at
/// the program's position location.
pub fn supply<D: GraphicsDevice + ?Sized>(
    scope: &mut DeviceScope<'_, D>,
    program: &DistanceFieldProgram,
) -> DistanceFieldResult<VertexInput> {
    let Some(location) = program.position_location else {
        return Ok(VertexInput::Implicit);
    };

    let buffer = scope.device().create_vertex_buffer(&FULL_SCREEN_TRIANGLE)?;
    scope.adopt(Resource::Buffer(buffer));
    tracing::trace!(?buffer, location, "uploaded full-screen triangle");
    Ok(VertexInput::Buffer { buffer, location })
}
