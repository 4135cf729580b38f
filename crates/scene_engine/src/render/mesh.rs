//! Mesh contract
//!
//! Concrete mesh storage (vertex data, buffer uploads) belongs to the
//! backend; the scene core only needs the handles and counts required to
//! bind and draw a mesh.

use crate::render::device::{BufferHandle, PrimitiveTopology, VertexLayoutHandle};

/// Everything the draw pass needs to bind and submit one mesh
///
/// This is a snapshot of device handles plus the counts for an indexed
/// draw. The backend that created the buffers guarantees the handles stay
/// valid for as long as the binding is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryBinding {
    /// Vertex layout descriptor
    pub vertex_layout: VertexLayoutHandle,

    /// Vertex buffer to bind as stream 0
    pub vertex_buffer: BufferHandle,

    /// Index buffer for indexed drawing
    pub index_buffer: BufferHandle,

    /// Size of one vertex in bytes
    pub vertex_stride: u32,

    /// Number of vertices referenced by the index buffer
    pub vertex_count: u32,

    /// Number of primitives to draw
    pub primitive_count: u32,

    /// Primitive topology of the index data
    pub topology: PrimitiveTopology,
}
