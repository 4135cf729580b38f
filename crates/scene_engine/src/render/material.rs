//! Material contract
//!
//! A material names the effect (shader resource) and technique it renders
//! with and pushes its parameter values before each draw. Concrete materials
//! live with the application; the scene core drives them through this trait.

use crate::render::device::{GraphicsDevice, ShaderHandle};
use crate::render::RenderError;

/// Behavior contract for materials
pub trait Material {
    /// Name of the shader resource this material renders with
    fn effect(&self) -> &str;

    /// Name of the technique within the effect
    fn technique(&self) -> &str;

    /// Resolve shader-specific parameter handles
    ///
    /// Called exactly once per registered renderable, after the shader is
    /// loaded and before the first draw.
    ///
    /// # Errors
    /// Implementations may fail when a required parameter is missing from
    /// the shader.
    fn initialize(
        &mut self,
        device: &mut dyn GraphicsDevice,
        shader: ShaderHandle,
    ) -> Result<(), RenderError> {
        let _ = (device, shader);
        Ok(())
    }

    /// Push current parameter values before a draw
    fn apply(&self, device: &mut dyn GraphicsDevice, shader: ShaderHandle) {
        let _ = (device, shader);
    }
}
