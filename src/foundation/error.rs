use crate::device::FramebufferStatus;

pub type DistanceFieldResult<T> = Result<T, DistanceFieldError>;

#[derive(thiserror::Error, Debug)]
pub enum DistanceFieldError {
    /// The active context does not reach the baseline capability tier.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Shader compilation or program linkage failed.
    #[error("shader build error: {0}")]
    Build(String),

    #[error("resource error: {0}")]
    Resource(String),

    #[error("device error: {0}")]
    Device(String),

    /// The destination cannot be rendered to. Nothing was drawn.
    #[error("render target unusable: unexpected framebuffer status {status}")]
    RenderTargetUnusable { status: FramebufferStatus },

    /// The caller broke a precondition (radius, rectangle bounds).
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DistanceFieldError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn build(msg: impl Into<String>) -> Self {
        Self::Build(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the error means the execution environment itself is unusable.
    ///
    /// Fatal errors are deterministic: repeating the call with the same device
    /// fails the same way. `RenderTargetUnusable` and `Validation` are caller
    /// problems and can be fixed by changing the arguments.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Configuration(_) | Self::Build(_) | Self::Resource(_) | Self::Device(_) => true,
            Self::RenderTargetUnusable { .. } | Self::Validation(_) | Self::Other(_) => false,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
