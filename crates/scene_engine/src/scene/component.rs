//! Component trait and message contract
//!
//! Components are behavior units owned by exactly one scene object. The
//! trait exposes lifecycle hooks plus optional capability accessors; a
//! component that does not implement a capability simply leaves the
//! accessor returning `None` and never registers for it.

use std::any::Any;

use crate::render::{CameraRig, Renderable};
use crate::scene::graph::ObjectId;

/// Behavior unit attached to a scene object
///
/// Ownership is by value: attaching moves the component into its object, so
/// a component can never have two owners. Hooks default to no-ops; override
/// only what the component needs.
pub trait Component: Any {
    /// Called once while the owning tree is initialized
    fn initialize(&mut self, owner: ObjectId) {
        let _ = owner;
    }

    /// Called once per frame during the update traversal
    fn update(&mut self, owner: ObjectId, delta_seconds: f32) {
        let _ = (owner, delta_seconds);
    }

    /// Called when the owning object disposes or detaches this component
    fn on_detach(&mut self) {}

    /// Handle a broadcast message; return `true` when the message was acted on
    ///
    /// Dispatch is a single match per component. Returning `false` makes an
    /// unhandled message a diagnosable no-op for the broadcaster.
    fn handle_message(&mut self, message: &Message) -> bool {
        let _ = message;
        false
    }

    /// Renderable capability, when this component can be drawn
    fn as_renderable(&self) -> Option<&dyn Renderable> {
        None
    }

    /// Mutable renderable capability
    fn as_renderable_mut(&mut self) -> Option<&mut dyn Renderable> {
        None
    }

    /// Camera capability, when this component provides view/projection
    fn as_camera(&self) -> Option<&dyn CameraRig> {
        None
    }

    /// Upcast for typed component search
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed component search
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Closed set of broadcastable events
///
/// Replaces name-based dynamic dispatch: every component sees the same enum
/// and pattern-matches the variants it cares about, so dispatch is fully
/// statically checked.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// The owning hierarchy finished initialization
    SceneReady,
    /// Visibility of the object (or an ancestor) changed
    VisibilityChanged(bool),
    /// Application-defined event with a numeric tag and payload
    Custom {
        /// Application-chosen event id
        id: u32,
        /// Event payload
        payload: f32,
    },
}
