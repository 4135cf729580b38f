//! Graphics device contract
//!
//! The scene core records what to draw and in which order; everything that
//! touches the GPU lives behind the [`GraphicsDevice`] trait. Backends own
//! buffer storage, shader compilation, and draw submission. All handles are
//! opaque device-scoped identifiers.

use crate::foundation::math::Mat4;
use crate::render::{GeometryBinding, RenderError};

/// Opaque handle to a loaded shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Opaque handle to a technique within a shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TechniqueHandle(pub u32);

/// Opaque handle to a shader parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterHandle(pub u32);

/// Opaque handle to a vertex or index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Opaque handle to a vertex layout descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayoutHandle(pub u32);

/// Primitive topology for indexed draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    /// Isolated points
    PointList,
    /// Isolated line segments
    LineList,
    /// Isolated triangles
    TriangleList,
    /// Connected triangle strip
    TriangleStrip,
}

/// Viewport rectangle with depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels
    pub x: f32,
    /// Top edge in pixels
    pub y: f32,
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
    /// Minimum depth of the depth range
    pub min_depth: f32,
    /// Maximum depth of the depth range
    pub max_depth: f32,
}

impl Viewport {
    /// Create a full-depth viewport covering the given rectangle
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Aspect ratio (width / height) of the viewport
    ///
    /// A degenerate zero-height viewport reports an aspect of 1.0 instead
    /// of producing inf or NaN.
    pub fn aspect(&self) -> f32 {
        if self.height == 0.0 {
            return 1.0;
        }
        self.width / self.height
    }
}


/// Abstraction over the underlying graphics backend
///
/// The draw protocol calls these methods in a fixed order per frame:
/// clear, begin, then per camera/shader/technique/renderable the binding and
/// submission calls, then end and present. Implementations are free to
/// translate them to any API; the scene core never assumes more than the
/// ordering contract.
pub trait GraphicsDevice {
    /// Clear the color and depth targets to constant values
    fn clear(&mut self, color: [f32; 4], depth: f32);

    /// Begin recording a frame
    fn begin_frame(&mut self);

    /// Finish recording a frame
    fn end_frame(&mut self);

    /// Present the finished frame
    fn present(&mut self);

    /// Bind a viewport for subsequent draws
    fn set_viewport(&mut self, viewport: Viewport);

    /// Load a shader program from a named resource
    ///
    /// # Errors
    /// Returns [`RenderError::ShaderLoad`] when the resource does not exist
    /// or fails to compile.
    fn load_shader(&mut self, resource: &str) -> Result<ShaderHandle, RenderError>;

    /// Resolve a named technique within a shader program
    ///
    /// # Errors
    /// Returns [`RenderError::TechniqueNotFound`] when the shader does not
    /// define the technique.
    fn technique(
        &mut self,
        shader: ShaderHandle,
        name: &str,
    ) -> Result<TechniqueHandle, RenderError>;

    /// Resolve a named shader parameter, or `None` when the shader does not
    /// declare it
    fn parameter(&mut self, shader: ShaderHandle, name: &str) -> Option<ParameterHandle>;

    /// Push a matrix value into a shader parameter
    fn set_matrix(&mut self, shader: ShaderHandle, parameter: ParameterHandle, value: &Mat4);

    /// Select the active technique of a shader program
    fn bind_technique(&mut self, shader: ShaderHandle, technique: TechniqueHandle);

    /// Bind vertex layout, vertex stream, and index stream for a mesh
    fn bind_geometry(&mut self, geometry: &GeometryBinding);

    /// Begin the bound technique, returning its pass count
    fn begin_technique(&mut self, shader: ShaderHandle) -> u32;

    /// Begin one rendering pass of the bound technique
    fn begin_pass(&mut self, shader: ShaderHandle, pass: u32);

    /// End the current rendering pass
    fn end_pass(&mut self, shader: ShaderHandle);

    /// End the bound technique
    fn end_technique(&mut self, shader: ShaderHandle);

    /// Submit an indexed-primitive draw for the bound geometry
    fn draw_indexed(&mut self, topology: PrimitiveTopology, vertex_count: u32, primitive_count: u32);
}
