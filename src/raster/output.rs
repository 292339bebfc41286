use std::path::Path;

use anyhow::Context as _;

use crate::{
    device::{TextureDesc, unorm8},
    foundation::error::{DistanceFieldError, DistanceFieldResult},
    kernel,
};

/// Read-back distance field: one encoded byte per texel, `0.5` on the boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistanceFieldImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl DistanceFieldImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> DistanceFieldResult<Self> {
        let expected = (width as usize) * (height as usize);
        if data.len() != expected {
            return Err(DistanceFieldError::validation(format!(
                "distance field data has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Collapse raw texture bytes of any colour format to the first channel.
    pub fn from_texture(desc: &TextureDesc, bytes: &[u8]) -> DistanceFieldResult<Self> {
        let bpp = desc.format.bytes_per_texel();
        if Some(bytes.len()) != desc.byte_len() {
            return Err(DistanceFieldError::device(format!(
                "texture read-back returned {} bytes for {}x{} {:?}",
                bytes.len(),
                desc.width,
                desc.height,
                desc.format
            )));
        }
        let data = bytes
            .chunks_exact(bpp)
            .map(|texel| unorm8(desc.format.decode_value(texel)))
            .collect();
        Self::new(desc.width, desc.height, data)
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

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Encoded value at `(x, y)` in `[0, 1]`.
    pub fn value(&self, x: u32, y: u32) -> Option<f32> {
        self.get(x, y).map(|v| f32::from(v) / 255.0)
    }

    /// Normalized signed distance at `(x, y)` in `[-1, 1]`, positive inside.
    pub fn signed_distance(&self, x: u32, y: u32) -> Option<f32> {
        self.value(x, y).map(kernel::decode)
    }

    pub fn to_gray_image(&self) -> DistanceFieldResult<image::GrayImage> {
        image::GrayImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| DistanceFieldError::validation("distance field buffer size mismatch"))
    }

    /// Write an 8-bit grayscale PNG, creating parent directories.
    pub fn save_png(&self, path: &Path) -> DistanceFieldResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::L8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/output.rs"]
mod tests;
