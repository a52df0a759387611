//! Global constants for the panomark application

/// Radius of the panorama sphere, centred at the world origin.
pub const SPHERE_RADIUS: f32 = 5.0;

/// Pointer travel (in pixels) below which a press/release pair counts as a click.
pub const CLICK_THRESHOLD_PX: f32 = 5.0;

/// Arrows shorter than this (world units) are never created and their preview is hidden.
pub const MIN_ARROW_LENGTH: f32 = 0.1;

/// Labels are placed at this fraction of the sphere hit point so they float inside the sphere.
pub const LABEL_INSET: f32 = 0.9;

/// Bounds for the user scale multiplier of a text label.
pub const MIN_LABEL_SCALE: f32 = 0.1;
pub const MAX_LABEL_SCALE: f32 = 10.0;

/// Label bitmap rendering
pub mod label {
    /// Bold font size used to rasterise label text.
    pub const FONT_SIZE: f32 = 64.0;
    /// Outline stroke width in pixels.
    pub const STROKE_WIDTH: f32 = 4.0;
    /// Transparent padding around the glyphs, in pixels.
    pub const PADDING: f32 = 20.0;
    /// World units per bitmap pixel.
    pub const PIXEL_TO_WORLD: f32 = 0.02;
    /// Outline color (rgba 0,0,0,0.8).
    pub const OUTLINE_RGBA: [u8; 4] = [0, 0, 0, 204];
}

/// Arrow proportions, relative to the arrow length.
pub mod arrow {
    pub const HEAD_LENGTH_RATIO: f32 = 0.2;
    pub const HEAD_WIDTH_RATIO: f32 = 0.05;
    pub const MIN_HEAD_WIDTH: f32 = 0.2;
    pub const SHAFT_TO_HEAD_WIDTH: f32 = 0.4;
    /// Radial segments for shaft and head meshes.
    pub const SEGMENTS: u32 = 12;
}

/// Camera defaults.
pub mod camera {
    pub const FOV_DEGREES: f32 = 75.0;
    pub const MIN_FOV_DEGREES: f32 = 20.0;
    pub const MAX_FOV_DEGREES: f32 = 100.0;
    pub const NEAR: f32 = 1.0;
    pub const FAR: f32 = 1000.0;
    pub const DAMPING_FACTOR: f32 = 0.1;
    pub const ROTATE_SPEED: f32 = 0.5;
    /// Degrees of field of view per wheel line.
    pub const ZOOM_SPEED: f32 = 2.0;
    /// Pitch stays just short of the poles so the view never flips.
    pub const MAX_PITCH_DEGREES: f32 = 89.0;
}

/// Transform gizmo
pub mod gizmo {
    /// Radius of the grab handle around the attached annotation (world units).
    pub const HANDLE_RADIUS: f32 = 0.6;
    /// Radians of rotation per pixel of horizontal drag.
    pub const ROTATE_RADIANS_PER_PX: f32 = 0.01;
    /// Length of the helper axes drawn at the attached annotation.
    pub const AXIS_LENGTH: f32 = 1.0;
}

/// Equirectangular export
pub mod export {
    /// Output size when the panorama's native resolution is unknown.
    pub const FALLBACK_WIDTH: u32 = 4096;
    pub const FALLBACK_HEIGHT: u32 = 2048;
    /// Cube face size bounds; the face size is half the output width within these.
    pub const MIN_CUBE_SIZE: u32 = 2048;
    pub const MAX_CUBE_SIZE: u32 = 4096;
    /// JPEG quality (0.92 on a 0..1 scale).
    pub const JPEG_QUALITY: u8 = 92;
    /// Base name of exported files.
    pub const FILE_STEM: &str = "equirectangular";
}

/// Media loading
pub mod media {
    /// Leading bytes inspected to classify a file.
    pub const SNIFF_LEN: usize = 12;
    /// Seconds skipped by the rewind and fast-forward controls.
    pub const SEEK_STEP_SECONDS: f64 = 10.0;
}
