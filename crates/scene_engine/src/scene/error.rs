//! Error types for scene graph operations

use crate::render::RenderError;
use thiserror::Error;

/// Errors raised by hierarchy and component operations
///
/// Structural violations are raised at the call site and leave the tree
/// unchanged; no operation applies a partial mutation before failing.
#[derive(Debug, Error)]
pub enum SceneError {
    /// Operation attempted on an object that has been disposed
    #[error("object has already been disposed")]
    AlreadyDisposed,

    /// Mutation would corrupt the tree structure
    #[error("hierarchy violation: {0}")]
    HierarchyViolation(&'static str),

    /// No component exists at the given slot of the object
    #[error("no component at slot {slot}")]
    ComponentNotFound {
        /// Component slot that was requested
        slot: usize,
    },

    /// Ancestor chain was exhausted without a matching component
    ///
    /// Raised, unlike the descendant search which reports a miss as `None`.
    #[error("no ancestor with a component of the requested type")]
    NoMatchingAncestor,

    /// Component does not expose the capability required by the operation
    #[error("component does not expose the {0} capability")]
    MissingCapability(&'static str),

    /// Shader or technique resolution failed during registration
    #[error(transparent)]
    Render(#[from] RenderError),
}
