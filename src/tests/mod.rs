//! Scenario tests driving the whole editor through `PanoApp`.
//!
//! These run on the software renderer with block glyphs, so they need no GPU
//! and no fonts.

pub mod support;

mod editor_scenarios;
mod export_scenarios;
mod media_scenarios;
