//! # Scene Engine
//!
//! A hierarchical scene graph with batched draw-call submission.
//!
//! ## Features
//!
//! - **Scene Graph**: Stable-handle object hierarchy with lazily cached
//!   world transforms
//! - **Components**: Lifecycle hooks, typed search, and message broadcast
//! - **Render Batching**: Renderables grouped by shader program and
//!   technique, replayed per camera
//! - **Device Abstraction**: All backend work behind the
//!   [`render::GraphicsDevice`] trait
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn frame(scene: &mut Scene, device: &mut dyn GraphicsDevice, dt: f32) {
//!     scene.update(dt);
//!     scene.draw(device);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, SceneSettings},
        foundation::math::{Mat4, Transform, Vec3},
        render::{
            CameraRig, GeometryBinding, GraphicsDevice, Material, PrimitiveTopology,
            RegistrationLease, RenderError, Renderable, ShaderHandle, Viewport,
        },
        scene::{Component, Entry, Message, ObjectId, Scene, SceneError, SceneGraph},
    };
}
