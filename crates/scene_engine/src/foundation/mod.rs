//! Foundation utilities shared across the engine
//!
//! Provides math types and logging support used by the scene and render
//! modules.

pub mod logging;
pub mod math;
