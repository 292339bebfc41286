use crate::{
    capability::CapabilityTier,
    device::{GraphicsDevice, software::SoftwareDevice},
    foundation::error::{DistanceFieldError, DistanceFieldResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Software,
    Gpu,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeviceSettings {
    /// Context the software device advertises. `None` is a full desktop GL
    /// context. Ignored by the GPU backend.
    #[serde(default)]
    pub emulate: Option<CapabilityTier>,
}

pub fn create_device(
    kind: BackendKind,
    settings: &DeviceSettings,
) -> DistanceFieldResult<Box<dyn GraphicsDevice>> {
    match kind {
        BackendKind::Software => Ok(Box::new(match settings.emulate {
            Some(tier) => SoftwareDevice::emulating(tier),
            None => SoftwareDevice::default(),
        })),
        #[cfg(feature = "gpu")]
        BackendKind::Gpu => {
            if settings.emulate.is_some() {
                tracing::warn!("tier emulation is ignored by the gpu backend");
            }
            Ok(Box::new(crate::device::gpu::WgpuDevice::new()?))
        }
        #[allow(unreachable_patterns)]
        _ => Err(DistanceFieldError::configuration(
            "requested backend is not available (build with the `gpu` feature)",
        )),
    }
}
