use std::num::NonZeroU32;

use crate::foundation::error::{DistanceFieldError, DistanceFieldResult};

/// Largest accepted search radius, equal to the largest texture edge.
pub const MAX_RADIUS: u32 = 16384;

/// Integer texel region `[x, x + width) x [y, y + height)`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TexelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TexelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering a whole `width x height` image.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn size(self) -> [u32; 2] {
        [self.width, self.height]
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive end corner; `None` on overflow.
    pub fn max(self) -> Option<[u32; 2]> {
        Some([
            self.x.checked_add(self.width)?,
            self.y.checked_add(self.height)?,
        ])
    }

    pub fn contains_texel(self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }

    /// Whether the region lies entirely inside a `width x height` image.
    pub fn fits_within(self, width: u32, height: u32) -> bool {
        match self.max() {
            Some([max_x, max_y]) => max_x <= width && max_y <= height,
            None => false,
        }
    }
}

/// Half-width of the square search window, in source texels, in
/// `1..=MAX_RADIUS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Radius(NonZeroU32);

impl Radius {
    pub fn new(radius: u32) -> DistanceFieldResult<Self> {
        if radius > MAX_RADIUS {
            return Err(DistanceFieldError::validation(format!(
                "distance field radius {radius} exceeds the maximum {MAX_RADIUS}"
            )));
        }
        NonZeroU32::new(radius)
            .map(Self)
            .ok_or_else(|| DistanceFieldError::validation("distance field radius must be >= 1"))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn as_i32(self) -> i32 {
        i32::try_from(self.0.get()).unwrap_or(i32::MAX)
    }
}

impl TryFrom<u32> for Radius {
    type Error = DistanceFieldError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Radius> for u32 {
    fn from(value: Radius) -> Self {
        value.get()
    }
}

/// Maps destination texels onto source texels: `source_size / rectangle.size()`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalingFactor {
    pub x: f32,
    pub y: f32,
}

impl ScalingFactor {
    pub fn new(source_size: [u32; 2], rectangle: TexelRect) -> DistanceFieldResult<Self> {
        if rectangle.is_empty() {
            return Err(DistanceFieldError::validation(
                "destination rectangle must not be empty",
            ));
        }
        if source_size[0] == 0 || source_size[1] == 0 {
            return Err(DistanceFieldError::validation(
                "source image must not be empty",
            ));
        }
        Ok(Self {
            x: source_size[0] as f32 / rectangle.width as f32,
            y: source_size[1] as f32 / rectangle.height as f32,
        })
    }

    pub fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
