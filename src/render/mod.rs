//! Rendering boundary.
//!
//! The editor never talks to a graphics API directly. It uploads label bitmaps
//! and panorama frames through [`TextureStore`], describes each frame as a
//! [`SceneSnapshot`], and drives cube capture and re-projection through
//! [`SceneRenderer`]. Two implementations exist: [`software::SoftwareRenderer`]
//! (CPU ray casting, headless) and `gpu::GpuSceneRenderer` (wgpu).

pub mod glyphs;
pub mod gpu;
pub mod software;

use glam::{Mat4, Vec3};
use image::RgbaImage;
use thiserror::Error;

use crate::color::Rgb;
use crate::constants::gizmo::AXIS_LENGTH;
use crate::geometry::{rotation_between, Transform};
use crate::gizmo::GizmoMode;
use crate::model::{AnnotationId, ArrowDimensions};

/// Handle of an uploaded texture. Owned by exactly one annotation or panorama.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Handle of an offscreen render target (cube capture or flat image).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Unknown texture {0:?}")]
    UnknownTexture(TextureId),

    #[error("Unknown render target {0:?}")]
    UnknownTarget(TargetId),

    #[error("Render target {target:?} cannot be used as {expected}")]
    WrongTargetKind {
        target: TargetId,
        expected: &'static str,
    },

    #[error("GPU error: {0}")]
    Gpu(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Texture upload and release.
pub trait TextureStore {
    /// Upload an RGBA8 image; the returned handle must be released exactly once.
    fn upload_rgba(&mut self, image: &RgbaImage) -> Result<TextureId>;

    /// Release a texture. Unknown handles are ignored.
    fn release(&mut self, texture: TextureId);
}

/// Camera parameters for one interactive frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParams {
    pub view_proj: Mat4,
    pub eye: Vec3,
    pub width: u32,
    pub height: u32,
}

/// Everything a renderer needs to draw one frame or capture one cube.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneSnapshot {
    /// Equirectangular texture mapped onto the inside of the sphere.
    pub panorama: Option<TextureId>,
    pub nodes: Vec<RenderNode>,
}

impl SceneSnapshot {
    pub fn has_gizmo_helper(&self) -> bool {
        self.nodes
            .iter()
            .any(|node| matches!(node, RenderNode::GizmoHelper { .. }))
    }

    /// Nodes that belong to annotations, in draw order.
    pub fn annotation_ids(&self) -> Vec<AnnotationId> {
        self.nodes.iter().filter_map(RenderNode::annotation_id).collect()
    }
}

/// One drawable item of the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    /// Text label: a unit quad scaled by the transform, drawn on top without depth testing.
    Label {
        id: AnnotationId,
        texture: TextureId,
        transform: Transform,
    },
    /// Arrow shaft and head. `id` is `None` for the placement preview.
    Arrow {
        id: Option<AnnotationId>,
        transform: Transform,
        dimensions: ArrowDimensions,
        color: Rgb,
    },
    /// Transform gizmo axes at the attached annotation.
    GizmoHelper { position: Vec3, mode: GizmoMode },
}

impl RenderNode {
    pub fn annotation_id(&self) -> Option<AnnotationId> {
        match self {
            RenderNode::Label { id, .. } => Some(*id),
            RenderNode::Arrow { id, .. } => *id,
            RenderNode::GizmoHelper { .. } => None,
        }
    }
}

/// Arrow meshes drawn for the gizmo helper.
///
/// Translate shows the three world axes; rotate shows the view axis the
/// annotation spins about.
pub fn gizmo_helper_arrows(position: Vec3, mode: GizmoMode) -> Vec<(Transform, ArrowDimensions, Rgb)> {
    let Some(dimensions) = ArrowDimensions::for_length(AXIS_LENGTH) else {
        return Vec::new();
    };
    let axes: Vec<(Vec3, Rgb)> = match mode {
        GizmoMode::Translate => vec![
            (Vec3::X, Rgb::new(230, 60, 60)),
            (Vec3::Y, Rgb::new(60, 200, 60)),
            (Vec3::Z, Rgb::new(60, 110, 240)),
        ],
        GizmoMode::Rotate => {
            let axis = position.try_normalize().unwrap_or(Vec3::Z);
            vec![(-axis, Rgb::new(240, 200, 40))]
        }
    };
    axes.into_iter()
        .map(|(axis, color)| {
            let transform = Transform::from_position_rotation(position, rotation_between(Vec3::Y, axis));
            (transform, dimensions, color)
        })
        .collect()
}

/// Pixels copied out of a flat target.
///
/// A GPU copy may finish several event-loop ticks after it was requested, so
/// callers poll instead of blocking.
pub trait PixelReadback {
    /// `None` while the copy is in flight. Yields the result exactly once.
    fn poll(&mut self) -> Option<Result<RgbaImage>>;
}

/// A readback that completed when it was requested.
pub struct ReadyPixels(Option<Result<RgbaImage>>);

impl ReadyPixels {
    pub fn new(result: Result<RgbaImage>) -> Self {
        Self(Some(result))
    }
}

impl PixelReadback for ReadyPixels {
    fn poll(&mut self) -> Option<Result<RgbaImage>> {
        self.0.take()
    }
}

/// Draws frames and performs the export passes.
pub trait SceneRenderer: TextureStore {
    /// Draw one interactive frame.
    fn render_view(&mut self, view: &ViewParams, scene: &SceneSnapshot) -> Result<()>;

    /// Allocate a cube capture target with square faces of `size` pixels.
    fn create_cube_target(&mut self, size: u32) -> Result<TargetId>;

    /// Render the scene into all six faces of `target`, seen from `origin`.
    fn capture_cube(&mut self, target: TargetId, origin: Vec3, scene: &SceneSnapshot) -> Result<()>;

    /// Allocate a flat RGBA8 target.
    fn create_target(&mut self, width: u32, height: u32) -> Result<TargetId>;

    /// Fill `target` by sampling `cube` along the equirectangular direction of each pixel.
    fn reproject_equirect(&mut self, cube: TargetId, target: TargetId) -> Result<()>;

    /// Start copying a flat target back, top row first.
    ///
    /// The copy is recorded before this returns, so `target` may be released
    /// while the readback is still pending.
    fn read_pixels(&mut self, target: TargetId) -> Result<Box<dyn PixelReadback>>;

    /// Release a target. Unknown handles are ignored.
    fn release_target(&mut self, target: TargetId);
}
