//! Render target scoped to the destination rectangle.

use crate::{
    device::{
        FramebufferId, FramebufferStatus, GraphicsDevice, TextureId,
        scope::{DeviceScope, Resource},
    },
    foundation::{
        core::TexelRect,
        error::{DistanceFieldError, DistanceFieldResult},
    },
};

/// A framebuffer with the output texture as its only colour attachment and
/// the destination rectangle as its viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderTarget {
    pub framebuffer: FramebufferId,
    pub output: TextureId,
    pub viewport: TexelRect,
}

impl RenderTarget {
    /// Create, attach, clear and validate. The framebuffer belongs to `scope`
    /// whether or not validation passes.
    ///
    /// Clearing an incomplete framebuffer is a no-op on every device, so a
    /// rejected destination keeps its contents.
    pub fn scope<D: GraphicsDevice + ?Sized>(
        scope: &mut DeviceScope<'_, D>,
        output: TextureId,
        rectangle: TexelRect,
    ) -> DistanceFieldResult<Self> {
        let framebuffer = scope.device().create_framebuffer(rectangle)?;
        scope.adopt(Resource::Framebuffer(framebuffer));
        scope.device().attach_color(framebuffer, output)?;
        scope.device().clear_color(framebuffer)?;

        let status = scope.device_ref().check_status(framebuffer);
        if status != FramebufferStatus::Complete {
            tracing::error!(
                %status,
                ?output,
                "distance field render target is unusable"
            );
            return Err(DistanceFieldError::RenderTargetUnusable { status });
        }

        Ok(Self {
            framebuffer,
            output,
            viewport: rectangle,
        })
    }
}
