//! panomark - 360° panorama annotator
//!
//! Loads an equirectangular image or video onto the inside of a sphere, lets
//! the user place text labels and arrows on it, edit them with a transform
//! gizmo, and exports the annotated scene back to a flat equirectangular image.

pub mod app;
pub mod color;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod geometry;
pub mod gizmo;
pub mod input;
pub mod keybindings;
pub mod media;
pub mod message;
pub mod model;
pub mod render;
pub mod session;
pub mod viewport;
pub mod window_input;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

#[cfg(test)]
mod tests;

pub use app::{PanelState, PanoApp};
pub use session::{EditorSession, InteractionMode};

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
