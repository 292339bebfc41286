//! Triangle coverage and per-fragment kernel execution.

use rayon::prelude::*;

use crate::{
    capability::ShadingLanguage,
    device::TextureFormat,
    foundation::core::{Radius, TexelRect},
    kernel::{self, COVERAGE_THRESHOLD, CoverageSource},
};

/// How the fragment stage reads its texture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Sampling {
    /// Integer fetch, clamped to the last texel.
    Fetch,
    /// Nearest filtering at `(p + 0.5) * size_inverted`, clamp to edge.
    Normalized { size_inverted: [f32; 2] },
}

/// A bound texture viewed through the sampling mode of the linked program.
pub(crate) struct TextureSampler<'a> {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: &'a [u8],
    pub sampling: Sampling,
}

impl TextureSampler<'_> {
    fn texel(&self, x: i32, y: i32) -> (usize, usize) {
        let (max_x, max_y) = (self.width as i32 - 1, self.height as i32 - 1);
        let (x, y) = match self.sampling {
            Sampling::Fetch => (x, y),
            Sampling::Normalized { size_inverted } => {
                let u = (x as f32 + 0.5) * size_inverted[0];
                let v = (y as f32 + 0.5) * size_inverted[1];
                (
                    (u * self.width as f32).floor() as i32,
                    (v * self.height as f32).floor() as i32,
                )
            }
        };
        (x.clamp(0, max_x) as usize, y.clamp(0, max_y) as usize)
    }
}

impl CoverageSource for TextureSampler<'_> {
    fn is_inside(&self, x: i32, y: i32) -> bool {
        let (x, y) = self.texel(x, y);
        let bpp = self.format.bytes_per_texel();
        let start = (y * self.width as usize + x) * bpp;
        self.format.decode_value(&self.data[start..start + bpp]) > COVERAGE_THRESHOLD
    }
}

/// Everything a draw needs once validation is done.
#[derive(Clone, Debug)]
pub(crate) struct KernelInvocation {
    pub language: ShadingLanguage,
    pub viewport: TexelRect,
    /// Clip-space positions, three per triangle.
    pub positions: Vec<[f32; 2]>,
    pub radius: Radius,
    pub scaling: [f32; 2],
    pub offset: [f32; 2],
}

impl KernelInvocation {
    /// Shade every texel of `target` covered by the triangles inside the
    /// viewport. Rows run in parallel.
    pub fn run(
        &self,
        source: &TextureSampler<'_>,
        target: &mut [u8],
        target_width: u32,
        target_height: u32,
        target_format: TextureFormat,
    ) -> usize {
        let triangles: Vec<[[f64; 2]; 3]> = self
            .positions
            .chunks_exact(3)
            .map(|tri| [self.to_window(tri[0]), self.to_window(tri[1]), self.to_window(tri[2])])
            .collect();

        let bpp = target_format.bytes_per_texel();
        let row_bytes = target_width as usize * bpp;
        let x_end = (self.viewport.x.saturating_add(self.viewport.width)).min(target_width);
        let y_end = (self.viewport.y.saturating_add(self.viewport.height)).min(target_height);
        let rows = self.viewport.y as usize..y_end as usize;

        target
            .par_chunks_mut(row_bytes)
            .enumerate()
            .filter(|(y, _)| rows.contains(y))
            .map(|(y, row)| {
                let mut shaded = 0;
                for x in self.viewport.x..x_end {
                    let centre = [f64::from(x) + 0.5, y as f64 + 0.5];
                    if !triangles.iter().any(|tri| covers(tri, centre)) {
                        continue;
                    }
                    let value = self.shade(source, [centre[0] as f32, centre[1] as f32]);
                    let start = x as usize * bpp;
                    target_format.encode_value(value, &mut row[start..start + bpp]);
                    shaded += 1;
                }
                shaded
            })
            .sum()
    }

    fn shade(&self, source: &TextureSampler<'_>, frag_coord: [f32; 2]) -> f32 {
        let px = (frag_coord[0] - self.offset[0]) * self.scaling[0];
        let py = (frag_coord[1] - self.offset[1]) * self.scaling[1];
        // GLSL converts to ivec2 by truncation, the WGSL kernel floors.
        let position = match self.language {
            ShadingLanguage::Glsl => [px as i32, py as i32],
            ShadingLanguage::Wgsl => [px.floor() as i32, py.floor() as i32],
        };
        kernel::encoded_distance(source, position, self.radius)
    }

    fn to_window(&self, ndc: [f32; 2]) -> [f64; 2] {
        let vp = self.viewport;
        [
            f64::from(vp.x) + (f64::from(ndc[0]) * 0.5 + 0.5) * f64::from(vp.width),
            f64::from(vp.y) + (f64::from(ndc[1]) * 0.5 + 0.5) * f64::from(vp.height),
        ]
    }
}

fn edge(a: [f64; 2], b: [f64; 2], p: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Point-in-triangle for either winding. Degenerate triangles cover nothing.
fn covers(tri: &[[f64; 2]; 3], p: [f64; 2]) -> bool {
    let area = edge(tri[0], tri[1], tri[2]);
    if area == 0.0 {
        return false;
    }
    let w0 = edge(tri[1], tri[2], p);
    let w1 = edge(tri[2], tri[0], p);
    let w2 = edge(tri[0], tri[1], p);
    if area > 0.0 {
        w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0
    } else {
        w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/device/software/raster.rs"]
mod tests;
