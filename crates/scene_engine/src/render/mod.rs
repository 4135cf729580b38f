//! # Rendering layer
//!
//! Contracts for the external graphics backend plus the render batch
//! registry that groups drawable objects by shader program and technique.
//! The scene core owns grouping and draw order; everything device-specific
//! (buffers, shader compilation, draw submission) stays behind the
//! [`GraphicsDevice`] trait.

pub mod device;
pub mod material;
pub mod mesh;
pub mod registry;

pub use device::{
    BufferHandle, GraphicsDevice, ParameterHandle, PrimitiveTopology, ShaderHandle,
    TechniqueHandle, VertexLayoutHandle, Viewport,
};
pub use material::Material;
pub use mesh::GeometryBinding;
pub use registry::{
    GroupVisitor, RegistrationId, RegistrationLease, RenderBatchRegistry, RenderTarget,
};

use crate::foundation::math::Mat4;
use thiserror::Error;

/// Errors raised while resolving render resources
#[derive(Debug, Error)]
pub enum RenderError {
    /// Loading a shader program from its named resource failed
    #[error("failed to load shader '{resource}': {reason}")]
    ShaderLoad {
        /// Resource name of the shader
        resource: String,
        /// Backend-reported failure reason
        reason: String,
    },

    /// A shader does not define the requested technique
    #[error("technique '{technique}' not found in shader")]
    TechniqueNotFound {
        /// Name of the missing technique
        technique: String,
    },

    /// A shader does not declare a parameter a material requires
    #[error("shader parameter '{parameter}' not found")]
    ParameterNotFound {
        /// Name of the missing parameter
        parameter: String,
    },
}

/// Capability contract for drawable components
///
/// A renderable pairs a material (effect + technique + parameter values)
/// with the geometry binding the draw pass submits.
pub trait Renderable {
    /// Material this renderable draws with
    fn material(&self) -> &dyn Material;

    /// Mutable material access, used for parameter-handle resolution
    fn material_mut(&mut self) -> &mut dyn Material;

    /// Geometry to bind and draw
    fn geometry(&self) -> &GeometryBinding;
}

/// Capability contract for camera components
pub trait CameraRig {
    /// View matrix (world to view space)
    fn view(&self) -> Mat4;

    /// Projection matrix (view to clip space)
    fn projection(&self) -> Mat4;

    /// Viewport this camera renders into
    fn viewport(&self) -> Viewport;
}
