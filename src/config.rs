use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    backend::{BackendKind, DeviceSettings},
    capability::CapabilityTier,
    foundation::{
        core::Radius,
        error::{DistanceFieldError, DistanceFieldResult},
    },
    raster::CoverageChannel,
};

/// One conversion job, as read from a JSON file or assembled from flags.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConvertConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub output_size: [u32; 2],
    pub radius: u32,
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default)]
    pub channel: CoverageChannel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emulate: Option<CapabilityTier>,
    /// Raster size for SVG input; defaults to the document size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_size: Option<[u32; 2]>,
}

fn default_backend() -> BackendKind {
    BackendKind::Software
}

impl ConvertConfig {
    pub fn from_json_file(path: &Path) -> DistanceFieldResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read job file '{}'", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parse job file '{}'", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> DistanceFieldResult<()> {
        Radius::new(self.radius)?;
        if self.output_size[0] == 0 || self.output_size[1] == 0 {
            return Err(DistanceFieldError::validation(
                "output_size width/height must be > 0",
            ));
        }
        if let Some([w, h]) = self.svg_size
            && (w == 0 || h == 0)
        {
            return Err(DistanceFieldError::validation(
                "svg_size width/height must be > 0",
            ));
        }
        if self.input.as_os_str().is_empty() || self.output.as_os_str().is_empty() {
            return Err(DistanceFieldError::validation(
                "input and output paths must be non-empty",
            ));
        }
        if self.emulate.is_some() && self.backend != BackendKind::Software {
            return Err(DistanceFieldError::validation(
                "tier emulation needs the software backend",
            ));
        }
        Ok(())
    }

    pub fn device_settings(&self) -> DeviceSettings {
        DeviceSettings {
            emulate: self.emulate,
        }
    }
}

/// Parse `WxH`, e.g. `64x64`.
pub fn parse_size(s: &str) -> DistanceFieldResult<[u32; 2]> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| DistanceFieldError::validation(format!("size '{s}' is not WxH")))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|_| DistanceFieldError::validation(format!("size '{s}' is not WxH")))
    };
    Ok([parse(w)?, parse(h)?])
}
