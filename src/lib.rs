//! Signed distance fields from coverage images, computed on a graphics device.
//!
//! The entry point is [`distance_field`]: it negotiates a capability tier
//! with the device, scopes a render target to the destination rectangle,
//! builds a program with the search radius baked in and draws one
//! full-screen triangle. [`generate`] wraps it for CPU-side images and
//! [`reference_distance_field`] runs the same kernel without a device.

#![forbid(unsafe_code)]

pub mod backend;
pub mod capability;
pub mod config;
pub mod device;
pub mod foundation;
pub mod geometry;
pub mod kernel;
pub mod raster;
pub mod shader;
pub mod target;
pub mod transform;

pub use backend::{BackendKind, DeviceSettings, create_device};
pub use capability::{Capabilities, CapabilityTier, negotiate};
pub use config::ConvertConfig;
pub use device::{
    Api, ContextInfo, Extension, FramebufferStatus, GraphicsDevice, TextureDesc, TextureFormat,
    TextureId, TextureUsage, Version, software::SoftwareDevice,
};
pub use foundation::core::{MAX_RADIUS, Radius, ScalingFactor, TexelRect};
pub use foundation::error::{DistanceFieldError, DistanceFieldResult};
pub use kernel::reference_distance_field;
pub use raster::{CoverageChannel, CoverageImage, DistanceFieldImage};
pub use target::RenderTarget;
pub use transform::{distance_field, generate};

#[cfg(feature = "gpu")]
pub use device::gpu::WgpuDevice;
