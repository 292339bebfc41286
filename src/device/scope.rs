use crate::device::{
    BufferId, FramebufferId, GraphicsDevice, ProgramId, ShaderId, TextureId,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Texture(TextureId),
    Shader(ShaderId),
    Program(ProgramId),
    Buffer(BufferId),
    Framebuffer(FramebufferId),
}

/// Owns every device resource acquired during one invocation.
///
/// Resources are deleted in reverse acquisition order when the scope is
/// dropped, so early returns through `?` release them as well.
pub struct DeviceScope<'a, D: GraphicsDevice + ?Sized> {
    device: &'a mut D,
    owned: Vec<Resource>,
}

impl<'a, D: GraphicsDevice + ?Sized> DeviceScope<'a, D> {
    pub fn new(device: &'a mut D) -> Self {
        Self {
            device,
            owned: Vec::new(),
        }
    }

    pub fn device(&mut self) -> &mut D {
        &mut *self.device
    }

    pub fn device_ref(&self) -> &D {
        &*self.device
    }

    /// Take ownership of `resource`; it is released with the scope.
    pub fn adopt(&mut self, resource: Resource) {
        self.owned.push(resource);
    }

    /// Release `resource` now instead of at the end of the scope.
    pub fn release(&mut self, resource: Resource) {
        if let Some(pos) = self.owned.iter().rposition(|r| *r == resource) {
            self.owned.remove(pos);
            delete(self.device, resource);
        }
    }

    pub fn owned(&self) -> &[Resource] {
        &self.owned
    }
}

impl<D: GraphicsDevice + ?Sized> Drop for DeviceScope<'_, D> {
    fn drop(&mut self) {
        while let Some(resource) = self.owned.pop() {
            tracing::trace!(?resource, "releasing device resource");
            delete(self.device, resource);
        }
    }
}

fn delete<D: GraphicsDevice + ?Sized>(device: &mut D, resource: Resource) {
    match resource {
        Resource::Texture(id) => device.delete_texture(id),
        Resource::Shader(id) => device.delete_shader(id),
        Resource::Program(id) => device.delete_program(id),
        Resource::Buffer(id) => device.delete_buffer(id),
        Resource::Framebuffer(id) => device.delete_framebuffer(id),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/device/scope.rs"]
mod tests;
