//! The per-texel distance transform.
//!
//! Every function here is pure. The software device runs [`encoded_distance`]
//! for each covered texel and the GPU programs carry the same arithmetic in
//! shader text, so [`reference_distance_field`] is the ground truth for both.

use rayon::prelude::*;

use crate::{
    foundation::{
        core::{Radius, ScalingFactor, TexelRect},
        error::{DistanceFieldError, DistanceFieldResult},
    },
    raster::{CoverageImage, DistanceFieldImage},
};

/// Coverage strictly above this is inside the shape.
pub const COVERAGE_THRESHOLD: f32 = 0.5;

/// Binary view of a source image.
pub trait CoverageSource: Sync {
    /// Classification of the texel at `(x, y)`; positions outside the image
    /// resolve to the nearest edge texel.
    fn is_inside(&self, x: i32, y: i32) -> bool;
}

/// Source texel sampled for a rectangle-local destination texel.
///
/// The texel centre is scaled and truncated, like converting
/// `(gl_FragCoord.xy - offset) * scaling` to integers.
pub fn source_position(local_texel: [u32; 2], scaling: ScalingFactor) -> [i32; 2] {
    [
        ((local_texel[0] as f32 + 0.5) * scaling.x) as i32,
        ((local_texel[1] as f32 + 0.5) * scaling.y) as i32,
    ]
}

/// Signed distance from `position` to the nearest classification change,
/// normalized by `radius` into `[-1, 1]`. Positive inside.
pub fn signed_distance<S: CoverageSource + ?Sized>(
    source: &S,
    position: [i32; 2],
    radius: Radius,
) -> f32 {
    let r = radius.as_i32();
    let [px, py] = position;
    let inside = source.is_inside(px, py);

    // Saturates to the window size when no boundary is visible.
    let mut min_distance = r as f32;
    for y in -r..=r {
        for x in -r..=r {
            if source.is_inside(px.saturating_add(x), py.saturating_add(y)) != inside {
                let d = (x as f32).hypot(y as f32);
                min_distance = min_distance.min(d);
            }
        }
    }

    let signed = if inside { min_distance } else { -min_distance };
    (signed / r as f32).clamp(-1.0, 1.0)
}

/// Map a normalized signed distance into the `[0, 1]` storage range.
pub fn encode(signed: f32) -> f32 {
    0.5 + 0.5 * signed
}

/// Inverse of [`encode`].
pub fn decode(encoded: f32) -> f32 {
    (encoded - 0.5) * 2.0
}

/// Encoded output for one source position.
pub fn encoded_distance<S: CoverageSource + ?Sized>(
    source: &S,
    position: [i32; 2],
    radius: Radius,
) -> f32 {
    encode(signed_distance(source, position, radius))
}

/// Run the transform on the CPU over a whole `output_size` image.
#[tracing::instrument(skip(coverage), fields(source = ?coverage.size()))]
pub fn reference_distance_field(
    coverage: &CoverageImage,
    output_size: [u32; 2],
    radius: u32,
) -> DistanceFieldResult<DistanceFieldImage> {
    let radius = Radius::new(radius)?;
    let rect = TexelRect::from_size(output_size[0], output_size[1]);
    let scaling = ScalingFactor::new(coverage.size(), rect)?;

    let width = output_size[0] as usize;
    let len = width
        .checked_mul(output_size[1] as usize)
        .ok_or_else(|| DistanceFieldError::validation("output size overflow"))?;

    let mut data = vec![0u8; len];
    data.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            let position = source_position([x as u32, y as u32], scaling);
            *out = crate::device::unorm8(encoded_distance(coverage, position, radius));
        }
    });

    DistanceFieldImage::new(output_size[0], output_size[1], data)
}

#[cfg(test)]
#[path = "../tests/unit/kernel.rs"]
mod tests;
