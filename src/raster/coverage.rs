use std::path::Path;

use anyhow::Context as _;
use kurbo::{Point, Shape};

use crate::{
    device::{TextureDesc, TextureFormat, TextureUsage},
    foundation::error::{DistanceFieldError, DistanceFieldResult},
    kernel::{COVERAGE_THRESHOLD, CoverageSource},
};

/// Which channel of a decoded image carries coverage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageChannel {
    /// Alpha when the image has one, luma otherwise.
    #[default]
    Auto,
    Alpha,
    Red,
    Luma,
}

/// Single-channel coverage, row-major, one byte per texel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverageImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl CoverageImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> DistanceFieldResult<Self> {
        if width == 0 || height == 0 {
            return Err(DistanceFieldError::validation(format!(
                "coverage image must not be empty, got {width}x{height}"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| DistanceFieldError::validation("coverage image size overflow"))?;
        if data.len() != expected {
            return Err(DistanceFieldError::validation(format!(
                "coverage data has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> u8,
    ) -> DistanceFieldResult<Self> {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    /// Binary coverage: a texel is fully covered when its centre lies inside
    /// `shape` (non-zero winding).
    pub fn from_shape(width: u32, height: u32, shape: &impl Shape) -> DistanceFieldResult<Self> {
        Self::from_fn(width, height, |x, y| {
            let centre = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if shape.contains(centre) { 255 } else { 0 }
        })
    }

    pub fn from_image(
        image: &image::DynamicImage,
        channel: CoverageChannel,
    ) -> DistanceFieldResult<Self> {
        let channel = match channel {
            CoverageChannel::Auto if image.color().has_alpha() => CoverageChannel::Alpha,
            CoverageChannel::Auto => CoverageChannel::Luma,
            other => other,
        };
        let (width, height) = (image.width(), image.height());
        let data = match channel {
            CoverageChannel::Alpha => image.to_rgba8().pixels().map(|p| p.0[3]).collect(),
            CoverageChannel::Red => image.to_rgba8().pixels().map(|p| p.0[0]).collect(),
            CoverageChannel::Luma | CoverageChannel::Auto => image.to_luma8().into_raw(),
        };
        Self::new(width, height, data)
    }

    /// Rasterize an SVG document and take its alpha as coverage.
    ///
    /// `size` defaults to the document's own size, rounded up.
    pub fn from_svg(bytes: &[u8], size: Option<[u32; 2]>) -> DistanceFieldResult<Self> {
        let opts = usvg::Options::default();
        let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;

        let doc = tree.size();
        let [width, height] = size.unwrap_or([
            doc.width().ceil() as u32,
            doc.height().ceil() as u32,
        ]);
        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
            DistanceFieldError::validation(format!("invalid svg raster size {width}x{height}"))
        })?;

        let transform = resvg::tiny_skia::Transform::from_scale(
            width as f32 / doc.width(),
            height as f32 / doc.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        let data = pixmap.data().chunks_exact(4).map(|px| px[3]).collect();
        Self::new(width, height, data)
    }

    /// Load a PNG/JPEG (decoded with `image`) or an SVG, picked by extension.
    pub fn open(
        path: &Path,
        channel: CoverageChannel,
        svg_size: Option<[u32; 2]>,
    ) -> DistanceFieldResult<Self> {
        let is_svg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

        if is_svg {
            let bytes = std::fs::read(path)
                .with_context(|| format!("read svg '{}'", path.display()))?;
            return Self::from_svg(&bytes, svg_size);
        }

        let image =
            image::open(path).with_context(|| format!("decode image '{}'", path.display()))?;
        Self::from_image(&image, channel)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Description of a sampled `R8Unorm` texture holding this image.
    pub fn texture_desc(&self) -> TextureDesc {
        TextureDesc {
            width: self.width,
            height: self.height,
            format: TextureFormat::R8Unorm,
            usage: TextureUsage::SAMPLED,
        }
    }
}

impl CoverageSource for CoverageImage {
    fn is_inside(&self, x: i32, y: i32) -> bool {
        let x = x.clamp(0, self.width as i32 - 1) as usize;
        let y = y.clamp(0, self.height as i32 - 1) as usize;
        let texel = self.data[y * self.width as usize + x];
        f32::from(texel) / 255.0 > COVERAGE_THRESHOLD
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/coverage.rs"]
mod tests;
