//! # Scene layer
//!
//! The object hierarchy ([`SceneGraph`]), the component model
//! ([`Component`], [`Message`]), and the [`Scene`] facade that ties the
//! graph to camera/renderable registrations and the per-frame draw pass.

pub mod component;
pub mod error;
pub mod graph;
#[allow(clippy::module_inception)]
pub mod scene;

pub use component::{Component, Message};
pub use error::SceneError;
pub use graph::{Entry, ObjectId, SceneGraph};
pub use scene::{Scene, WORLD_VIEW_PROJECTION};
