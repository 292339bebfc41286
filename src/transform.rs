//! Orchestration of one distance-field invocation.

use crate::{
    capability,
    device::{
        DrawCall, GraphicsDevice, TextureDesc, TextureFormat, TextureId, TextureUsage,
        scope::{DeviceScope, Resource},
    },
    foundation::{
        core::{Radius, ScalingFactor, TexelRect},
        error::{DistanceFieldError, DistanceFieldResult},
    },
    geometry,
    raster::{CoverageImage, DistanceFieldImage},
    shader::DistanceFieldProgram,
    target::RenderTarget,
};

/// Fill `rectangle` of `output` with the distance field of `input`.
///
/// `input` is sampled in full and scaled onto the rectangle; texels of
/// `output` outside the rectangle are left untouched. Every device resource
/// acquired here is released before returning, on success and failure alike.
#[tracing::instrument(skip(device))]
pub fn distance_field<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    input: TextureId,
    output: TextureId,
    rectangle: TexelRect,
    radius: u32,
) -> DistanceFieldResult<()> {
    let radius = Radius::new(radius)?;
    if input == output {
        return Err(DistanceFieldError::validation(
            "input and output must be distinct textures",
        ));
    }
    let input_desc = device.texture_desc(input)?;
    let output_desc = device.texture_desc(output)?;
    validate_input(input, &input_desc)?;
    validate_rectangle(rectangle, &output_desc)?;
    let scaling = ScalingFactor::new(input_desc.size(), rectangle)?;

    let caps = capability::negotiate(device.context_info())?;

    let mut scope = DeviceScope::new(device);
    let target = RenderTarget::scope(&mut scope, output, rectangle)?;
    let program = DistanceFieldProgram::build(&mut scope, radius, &caps)?;

    program.set_scaling(scope.device(), scaling)?;
    program.set_offset(scope.device(), [rectangle.x, rectangle.y])?;
    program.set_image_size_inverted(scope.device(), input_desc.size())?;
    program.bind_texture(scope.device(), input)?;

    let vertices = geometry::supply(&mut scope, &program)?;
    scope.device().draw(&DrawCall {
        program: program.id,
        framebuffer: target.framebuffer,
        vertex_count: geometry::VERTEX_COUNT,
        vertices,
    })?;

    tracing::debug!(tier = %caps.tier, ?scaling, "distance field drawn");
    Ok(())
}

fn validate_input(input: TextureId, desc: &TextureDesc) -> DistanceFieldResult<()> {
    if !desc.usage.sampled {
        return Err(DistanceFieldError::validation(format!(
            "input texture {input:?} is not sampleable"
        )));
    }
    if !desc.format.is_color_renderable() {
        return Err(DistanceFieldError::validation(format!(
            "input texture {input:?} has non-colour format {:?}",
            desc.format
        )));
    }
    Ok(())
}

fn validate_rectangle(rectangle: TexelRect, output: &TextureDesc) -> DistanceFieldResult<()> {
    if rectangle.is_empty() {
        return Err(DistanceFieldError::validation(format!(
            "destination rectangle {rectangle:?} is empty"
        )));
    }
    if !rectangle.fits_within(output.width, output.height) {
        return Err(DistanceFieldError::validation(format!(
            "destination rectangle {rectangle:?} exceeds the {}x{} output",
            output.width, output.height
        )));
    }
    Ok(())
}

/// Upload `coverage`, transform it into a fresh `output_size` texture and
/// read the result back.
#[tracing::instrument(skip(device, coverage), fields(source = ?coverage.size()))]
pub fn generate<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    coverage: &CoverageImage,
    output_size: [u32; 2],
    radius: u32,
) -> DistanceFieldResult<DistanceFieldImage> {
    // Checked before any texture exists.
    Radius::new(radius)?;
    let rectangle = TexelRect::from_size(output_size[0], output_size[1]);
    if rectangle.is_empty() {
        return Err(DistanceFieldError::validation(format!(
            "output size {}x{} is empty",
            output_size[0], output_size[1]
        )));
    }

    let mut scope = DeviceScope::new(device);

    let input = scope.device().create_texture(&coverage.texture_desc())?;
    scope.adopt(Resource::Texture(input));
    scope.device().write_texture(input, coverage.data())?;

    let output_desc = TextureDesc {
        width: output_size[0],
        height: output_size[1],
        format: TextureFormat::R8Unorm,
        usage: TextureUsage::ALL,
    };
    let output = scope.device().create_texture(&output_desc)?;
    scope.adopt(Resource::Texture(output));

    distance_field(scope.device(), input, output, rectangle, radius)?;

    let bytes = scope.device().read_texture(output)?;
    DistanceFieldImage::from_texture(&output_desc, &bytes)
}
