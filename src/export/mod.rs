//! Equirectangular export.
//!
//! The annotated scene is captured into a cube from the sphere centre, then
//! re-projected into a flat equirectangular image at the panorama's native
//! resolution. The gizmo helper is hidden for the capture, and every target
//! allocated on the renderer is released again, whichever way the export ends.

pub mod encode;

use glam::Vec3;
use image::RgbaImage;
use thiserror::Error;
use web_time::Instant;

use crate::constants::export::{FALLBACK_HEIGHT, FALLBACK_WIDTH, MAX_CUBE_SIZE, MIN_CUBE_SIZE};
use crate::render::{PixelReadback, RenderError, SceneRenderer, SceneSnapshot, TargetId};
use crate::session::EditorSession;
use crate::viewport::Viewport;

pub use encode::{encode, ExportFormat};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Load a panorama before exporting")]
    NoPanorama,

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not deliver {file_name}: {message}")]
    Delivery { file_name: String, message: String },
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// An encoded export, ready to be saved or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub file_name: String,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Where finished exports go: a file on disk, a browser download.
pub trait ExportSink {
    fn deliver(&mut self, image: &ExportedImage) -> Result<()>;
}

/// Output resolution: the panorama's native size, or the fallback when unknown.
pub fn output_size(native: Option<(u32, u32)>) -> (u32, u32) {
    native
        .filter(|&(w, h)| w > 0 && h > 0)
        .unwrap_or((FALLBACK_WIDTH, FALLBACK_HEIGHT))
}

/// Cube face size for an output width: half the width, within the supported range.
pub fn cube_size_for(width: u32) -> u32 {
    (width / 2).clamp(MIN_CUBE_SIZE, MAX_CUBE_SIZE)
}

/// Hides the gizmo helper while alive and restores its previous visibility on drop.
struct HelperHidden<'a> {
    session: &'a mut EditorSession,
    was_visible: bool,
}

impl<'a> HelperHidden<'a> {
    fn new(session: &'a mut EditorSession) -> Self {
        let was_visible = session.gizmo().helper_visible();
        session.gizmo_mut().set_helper_visible(false);
        Self {
            session,
            was_visible,
        }
    }

    fn session(&self) -> &EditorSession {
        self.session
    }
}

impl Drop for HelperHidden<'_> {
    fn drop(&mut self) {
        self.session.gizmo_mut().set_helper_visible(self.was_visible);
    }
}

/// Renderer targets owned by one export; all are released on drop.
struct ScopedTargets<'r, R: SceneRenderer + ?Sized> {
    renderer: &'r mut R,
    targets: Vec<TargetId>,
}

impl<'r, R: SceneRenderer + ?Sized> ScopedTargets<'r, R> {
    fn new(renderer: &'r mut R) -> Self {
        Self {
            renderer,
            targets: Vec::new(),
        }
    }

    fn cube(&mut self, size: u32) -> Result<TargetId> {
        let id = self.renderer.create_cube_target(size)?;
        self.targets.push(id);
        Ok(id)
    }

    fn flat(&mut self, width: u32, height: u32) -> Result<TargetId> {
        let id = self.renderer.create_target(width, height)?;
        self.targets.push(id);
        Ok(id)
    }

    fn renderer(&mut self) -> &mut R {
        self.renderer
    }
}

impl<R: SceneRenderer + ?Sized> Drop for ScopedTargets<'_, R> {
    fn drop(&mut self) {
        for target in self.targets.drain(..) {
            self.renderer.release_target(target);
        }
    }
}

/// An export whose pixels are still on their way back from the renderer.
///
/// Scene capture happens in [`begin_export`]; encoding waits for the readback.
pub struct PendingExport {
    readback: Box<dyn PixelReadback>,
    format: ExportFormat,
    started: Instant,
}

impl PendingExport {
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Never blocks. `None` while the readback is in flight, then the encoded
    /// image or the reason the export failed.
    pub fn poll(&mut self) -> Option<Result<ExportedImage>> {
        let pixels = match self.readback.poll()? {
            Ok(pixels) => pixels,
            Err(err) => return Some(Err(err.into())),
        };
        Some(self.finish(pixels))
    }

    fn finish(&self, pixels: RgbaImage) -> Result<ExportedImage> {
        let bytes = encode(&pixels, self.format)?;
        log::info!(
            "Exported {} ({} bytes) in {:.2?}",
            self.format.file_name(),
            bytes.len(),
            self.started.elapsed()
        );
        Ok(ExportedImage {
            file_name: self.format.file_name(),
            mime_type: self.format.mime_type(),
            width: pixels.width(),
            height: pixels.height(),
            bytes,
        })
    }
}

/// Capture the annotated panorama and start reading the equirectangular image back.
///
/// Every target is released and the gizmo helper restored before this
/// returns; only the readback outlives it.
pub fn begin_export<R: SceneRenderer + ?Sized>(
    renderer: &mut R,
    session: &mut EditorSession,
    viewport: &Viewport,
    format: ExportFormat,
) -> Result<PendingExport> {
    let panorama = viewport.panorama().ok_or(ExportError::NoPanorama)?;
    let (width, height) = output_size(viewport.source_size());
    let cube_size = cube_size_for(width);
    let started = Instant::now();
    log::info!(
        "Exporting {}x{} {} (cube faces {}px)",
        width,
        height,
        format.name(),
        cube_size
    );

    let hidden = HelperHidden::new(session);
    let scene = SceneSnapshot {
        panorama: Some(panorama),
        nodes: hidden.session().scene_nodes(),
    };

    let readback = {
        let mut targets = ScopedTargets::new(renderer);
        let cube = targets.cube(cube_size)?;
        targets.renderer().capture_cube(cube, Vec3::ZERO, &scene)?;
        let flat = targets.flat(width, height)?;
        targets.renderer().reproject_equirect(cube, flat)?;
        targets.renderer().read_pixels(flat)?
    };
    drop(hidden);

    Ok(PendingExport {
        readback,
        format,
        started,
    })
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::color::Rgb;
    use crate::geometry::ViewportRect;
    use crate::render::software::SoftwareRenderer;
    use crate::render::TextureStore;
    use crate::session::{InteractionMode, PointerOutcome};
    use crate::tests::support::{block_painter, gradient_panorama};
    use crate::viewport::CameraSettings;

    fn setup(renderer: &mut SoftwareRenderer, size: (u32, u32)) -> (EditorSession, Viewport) {
        let mut viewport = Viewport::new(1, ViewportRect::from_size(64, 32), CameraSettings::default());
        let texture = renderer.upload_rgba(&gradient_panorama(size.0, size.1)).unwrap();
        viewport.set_panorama(texture, renderer);
        viewport.set_source_size(Some(size));
        (EditorSession::new(block_painter(), Rgb::WHITE, Rgb::RED), viewport)
    }

    fn export_now(
        renderer: &mut SoftwareRenderer,
        session: &mut EditorSession,
        viewport: &Viewport,
    ) -> Result<ExportedImage> {
        begin_export(renderer, session, viewport, ExportFormat::Png)?
            .poll()
            .expect("software readback completes on the first poll")
    }

    #[test]
    fn test_output_and_cube_sizes() {
        assert_eq!(output_size(None), (4096, 2048));
        assert_eq!(output_size(Some((0, 10))), (4096, 2048));
        assert_eq!(output_size(Some((6000, 3000))), (6000, 3000));
        assert_eq!(cube_size_for(1000), 2048);
        assert_eq!(cube_size_for(6000), 3000);
        assert_eq!(cube_size_for(16384), 4096);
    }

    #[test]
    fn test_export_without_panorama_is_refused() {
        let mut renderer = SoftwareRenderer::new();
        let viewport = Viewport::new(1, ViewportRect::from_size(64, 32), CameraSettings::default());
        let mut session = EditorSession::new(block_painter(), Rgb::WHITE, Rgb::RED);
        let result = begin_export(&mut renderer, &mut session, &viewport, ExportFormat::Png);
        assert!(matches!(result, Err(ExportError::NoPanorama)));
        assert_eq!(renderer.target_count(), 0);
    }

    #[test]
    fn test_failed_readback_releases_targets_and_restores_helper() {
        let mut renderer = SoftwareRenderer::new();
        let (mut session, viewport) = setup(&mut renderer, (64, 32));
        renderer.fail_readbacks(true);

        let result = export_now(&mut renderer, &mut session, &viewport);
        assert!(matches!(result, Err(ExportError::Render(_))));
        assert_eq!(renderer.target_count(), 0);
        assert!(session.gizmo().helper_visible());
    }

    #[test]
    fn test_selected_annotation_exports_without_helper() {
        let mut renderer = SoftwareRenderer::new();
        let (mut session, mut viewport) = setup(&mut renderer, (64, 32));
        session.set_mode(InteractionMode::PlaceArrow);
        session.pointer_down(Vec2::new(32.0, 26.0), &mut viewport);
        let Ok(PointerOutcome::Created(id)) =
            session.pointer_up(Vec2::new(32.0, 6.0), &mut viewport, &mut renderer)
        else {
            panic!("arrow expected");
        };
        session.set_mode(InteractionMode::Select);
        session.pointer_down(Vec2::new(32.0, 16.0), &mut viewport);
        let outcome = session.pointer_up(Vec2::new(32.0, 16.0), &mut viewport, &mut renderer);
        assert_eq!(outcome, Ok(PointerOutcome::Selected(id)));

        assert!(session.scene_nodes().iter().any(|node| node.annotation_id().is_none()));

        let image = export_now(&mut renderer, &mut session, &viewport).unwrap();
        let captured = renderer.last_capture().unwrap();
        assert!(!captured.has_gizmo_helper());
        assert_eq!(captured.annotation_ids(), vec![id]);
        assert_eq!((image.width, image.height), (64, 32));
        assert_eq!(image.file_name, "equirectangular.png");
        assert!(session.gizmo().helper_visible());
        assert_eq!(renderer.target_count(), 0);
    }

    #[test]
    fn test_deferred_readback_releases_targets_before_completion() {
        let mut renderer = SoftwareRenderer::new();
        let (mut session, viewport) = setup(&mut renderer, (64, 32));
        renderer.defer_readbacks(1);

        let mut pending = begin_export(&mut renderer, &mut session, &viewport, ExportFormat::Jpeg).unwrap();
        assert_eq!(renderer.target_count(), 0);
        assert!(pending.poll().is_none());

        let image = pending.poll().unwrap().unwrap();
        assert_eq!(image.file_name, "equirectangular.jpg");
        assert_eq!((image.width, image.height), (64, 32));
    }
}
