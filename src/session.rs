//! Interaction state machine.
//!
//! [`EditorSession`] holds the editing mode, the selection, the arrow being
//! drawn and the gizmo, and owns the annotation collection. Pointer events come
//! in with the live [`Viewport`] so the session can resolve sphere points, pick
//! annotations and suspend camera orbiting while something else owns the drag.
//!
//! Failures never leave a half-applied state: a blank label is rejected before
//! anything changes, and pointer actions that resolve to no point are ignored.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::constants::{CLICK_THRESHOLD_PX, LABEL_INSET};
use crate::error::{EditorError, Result};
use crate::geometry::{look_at_rotation, rotation_between, Transform};
use crate::gizmo::{Gizmo, GizmoMode};
use crate::model::{
    create_arrow, create_text_label, Annotation, AnnotationCollection, AnnotationId,
    AnnotationKind, AnnotationType, ArrowDimensions, LabelPainter,
};
use crate::render::{RenderNode, TextureStore};
use crate::viewport::Viewport;

/// Exclusive editing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    #[default]
    Navigate,
    PlaceText,
    PlaceArrow,
    Select,
}

impl InteractionMode {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionMode::Navigate => "Navigate",
            InteractionMode::PlaceText => "Add Text",
            InteractionMode::PlaceArrow => "Add Arrow",
            InteractionMode::Select => "Select",
        }
    }

    pub fn cursor(&self) -> CursorIcon {
        match self {
            InteractionMode::PlaceText => CursorIcon::Text,
            InteractionMode::PlaceArrow => CursorIcon::Crosshair,
            InteractionMode::Navigate | InteractionMode::Select => CursorIcon::Default,
        }
    }
}

/// Cursor affordance the UI should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorIcon {
    #[default]
    Default,
    Text,
    Crosshair,
}

/// What a completed pointer gesture did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    /// Nothing changed.
    Ignored,
    Created(AnnotationId),
    Selected(AnnotationId),
    /// A click hit no annotation; any selection was cleared.
    Missed { deselected: bool },
    GizmoReleased,
}

/// Arrow shown while dragging out a new one.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ArrowPreview {
    transform: Transform,
    dimensions: ArrowDimensions,
}

impl ArrowPreview {
    /// `None` while the drag is still too short for a valid arrow.
    fn between(start: Vec3, end: Vec3) -> Option<Self> {
        let delta = end - start;
        let dimensions = ArrowDimensions::for_length(delta.length())?;
        Some(Self {
            transform: Transform::from_position_rotation(start, rotation_between(Vec3::Y, delta)),
            dimensions,
        })
    }
}

pub struct EditorSession {
    mode: InteractionMode,
    selection: Option<AnnotationId>,
    pending_arrow_start: Option<Vec3>,
    preview: Option<ArrowPreview>,
    pointer_down_at: Option<Vec2>,
    next_id: u64,
    pending_text: String,
    label_color: Rgb,
    arrow_color: Rgb,
    painter: LabelPainter,
    annotations: AnnotationCollection,
    gizmo: Gizmo,
}

impl EditorSession {
    pub fn new(painter: LabelPainter, label_color: Rgb, arrow_color: Rgb) -> Self {
        Self {
            mode: InteractionMode::Navigate,
            selection: None,
            pending_arrow_start: None,
            preview: None,
            pointer_down_at: None,
            next_id: 1,
            pending_text: String::new(),
            label_color,
            arrow_color,
            painter,
            annotations: AnnotationCollection::new(),
            gizmo: Gizmo::new(),
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn selection(&self) -> Option<AnnotationId> {
        self.selection
    }

    pub fn selected(&self) -> Option<&Annotation> {
        self.annotations.get(self.selection?)
    }

    pub fn pending_arrow_start(&self) -> Option<Vec3> {
        self.pending_arrow_start
    }

    pub fn preview_visible(&self) -> bool {
        self.preview.is_some()
    }

    pub fn is_gizmo_dragging(&self) -> bool {
        self.gizmo.is_dragging()
    }

    pub fn annotations(&self) -> &AnnotationCollection {
        &self.annotations
    }

    pub fn gizmo(&self) -> &Gizmo {
        &self.gizmo
    }

    pub fn gizmo_mut(&mut self) -> &mut Gizmo {
        &mut self.gizmo
    }

    pub fn pending_text(&self) -> &str {
        &self.pending_text
    }

    pub fn set_pending_text(&mut self, text: impl Into<String>) {
        self.pending_text = text.into();
    }

    pub fn label_color(&self) -> Rgb {
        self.label_color
    }

    pub fn set_label_color(&mut self, color: Rgb) {
        self.label_color = color;
    }

    pub fn arrow_color(&self) -> Rgb {
        self.arrow_color
    }

    pub fn set_arrow_color(&mut self, color: Rgb) {
        self.arrow_color = color;
    }

    /// Id for the annotation being built. Only [`Self::commit`] consumes it.
    fn next_annotation_id(&self) -> AnnotationId {
        AnnotationId(self.next_id)
    }

    fn commit(&mut self, annotation: Annotation) -> AnnotationId {
        let id = annotation.id();
        self.next_id = self.next_id.max(id.0 + 1);
        self.annotations.add(annotation);
        id
    }

    fn select(&mut self, id: AnnotationId) {
        let rotate_allowed = self
            .annotations
            .get(id)
            .is_some_and(|a| a.annotation_type() == AnnotationType::Arrow);
        self.selection = Some(id);
        self.gizmo.attach(id, rotate_allowed);
        log::debug!("Selected {}", id);
    }

    /// Drop the selection and detach the gizmo. Returns whether anything was selected.
    pub fn deselect(&mut self) -> bool {
        self.gizmo.detach();
        self.selection.take().is_some()
    }

    /// Switch mode. Leaving for anything but Select drops the selection; the
    /// arrow start and preview are always cleared.
    pub fn set_mode(&mut self, mode: InteractionMode) -> CursorIcon {
        if mode != InteractionMode::Select {
            self.deselect();
        }
        self.pending_arrow_start = None;
        self.preview = None;
        if self.mode != mode {
            log::debug!("Mode {} -> {}", self.mode.name(), mode.name());
        }
        self.mode = mode;
        mode.cursor()
    }

    pub fn pointer_down(&mut self, position: Vec2, viewport: &mut Viewport) {
        if self.gizmo.is_dragging() {
            return;
        }
        self.pointer_down_at = Some(position);

        if let Some(transform) = self.selected().map(|a| *a.transform()) {
            let ray = viewport.pick_ray(position);
            if self.gizmo.hits_handle(&ray, transform.position) {
                self.gizmo.begin_drag(&ray, position, transform);
                viewport.camera_mut().set_enabled(false);
                return;
            }
        }

        match self.mode {
            InteractionMode::Navigate | InteractionMode::Select => {}
            InteractionMode::PlaceText => viewport.camera_mut().set_enabled(false),
            InteractionMode::PlaceArrow => {
                viewport.camera_mut().set_enabled(false);
                match viewport.get_intersect_point(position) {
                    Some(hit) => {
                        self.pending_arrow_start = Some(hit);
                        self.preview = None;
                    }
                    None => log::debug!("{}", EditorError::MissingIntersection),
                }
            }
        }
    }

    pub fn pointer_move(&mut self, position: Vec2, viewport: &Viewport) {
        if self.gizmo.is_dragging() {
            let ray = viewport.pick_ray(position);
            let (Some(transform), Some(id)) = (self.gizmo.drag_to(&ray, position), self.selection) else {
                return;
            };
            if let Some(annotation) = self.annotations.get_mut(id) {
                annotation.set_placement(transform.position, transform.rotation);
            }
            return;
        }
        if self.mode != InteractionMode::PlaceArrow {
            return;
        }
        if let Some(start) = self.pending_arrow_start {
            self.preview = viewport
                .get_intersect_point(position)
                .and_then(|end| ArrowPreview::between(start, end));
        }
    }

    /// Finish a pointer gesture.
    ///
    /// Returns [`EditorError::EmptyText`] when a label click has no text; the
    /// session is unchanged in that case.
    pub fn pointer_up(
        &mut self,
        position: Vec2,
        viewport: &mut Viewport,
        store: &mut dyn TextureStore,
    ) -> Result<PointerOutcome> {
        self.preview = None;
        let was_dragging = self.gizmo.end_drag();
        viewport.camera_mut().set_enabled(true);
        let down = self.pointer_down_at.take();
        if was_dragging {
            return Ok(PointerOutcome::GizmoReleased);
        }
        let is_click = down.is_some_and(|d| d.distance(position) < CLICK_THRESHOLD_PX);

        match self.mode {
            InteractionMode::PlaceText => {
                if !is_click {
                    return Ok(PointerOutcome::Ignored);
                }
                if self.pending_text.trim().is_empty() {
                    return Err(EditorError::EmptyText);
                }
                let Some(hit) = viewport.get_intersect_point(position) else {
                    log::debug!("{}", EditorError::MissingIntersection);
                    return Ok(PointerOutcome::Ignored);
                };
                let position = hit * LABEL_INSET;
                let transform =
                    Transform::from_position_rotation(position, look_at_rotation(position, Vec3::ZERO));
                let label = create_text_label(
                    self.next_annotation_id(),
                    &self.pending_text,
                    self.label_color,
                    1.0,
                    transform,
                    &mut self.painter,
                    store,
                )?;
                let id = self.commit(label);
                log::info!("Added label {}", id);
                Ok(PointerOutcome::Created(id))
            }
            InteractionMode::PlaceArrow => {
                let Some(start) = self.pending_arrow_start.take() else {
                    return Ok(PointerOutcome::Ignored);
                };
                let Some(end) = viewport.get_intersect_point(position) else {
                    log::debug!("{}", EditorError::MissingIntersection);
                    return Ok(PointerOutcome::Ignored);
                };
                let Some(arrow) = create_arrow(self.next_annotation_id(), start, end, self.arrow_color) else {
                    log::debug!("{}", EditorError::DegenerateGeometry);
                    return Ok(PointerOutcome::Ignored);
                };
                let id = self.commit(arrow);
                log::info!("Added arrow {}", id);
                Ok(PointerOutcome::Created(id))
            }
            InteractionMode::Navigate | InteractionMode::Select => {
                if !is_click {
                    return Ok(PointerOutcome::Ignored);
                }
                match viewport.check_intersection(position, self.annotations.all()) {
                    Some(id) => {
                        if self.mode == InteractionMode::Navigate {
                            self.mode = InteractionMode::Select;
                        }
                        self.select(id);
                        Ok(PointerOutcome::Selected(id))
                    }
                    None => Ok(PointerOutcome::Missed {
                        deselected: self.deselect(),
                    }),
                }
            }
        }
    }

    /// Destroy the selected annotation.
    pub fn delete_selection(&mut self, store: &mut dyn TextureStore) -> Option<AnnotationId> {
        let id = self.selection?;
        self.deselect();
        let annotation = self.annotations.remove(id)?;
        annotation.destroy(store);
        log::info!("Deleted {}", id);
        Some(id)
    }

    pub fn recolor_selection(&mut self, color: Rgb, store: &mut dyn TextureStore) -> Result<bool> {
        let Some(id) = self.selection else {
            return Ok(false);
        };
        let Some(annotation) = self.annotations.get_mut(id) else {
            return Ok(false);
        };
        annotation.set_color(color, &mut self.painter, store)?;
        Ok(true)
    }

    /// Replace the selected label's text. Empty text is allowed while editing.
    pub fn retext_selection(&mut self, text: &str, store: &mut dyn TextureStore) -> Result<bool> {
        let Some(id) = self.selection else {
            return Ok(false);
        };
        let Some(annotation) = self.annotations.get_mut(id) else {
            return Ok(false);
        };
        if annotation.as_label().is_none() {
            return Ok(false);
        }
        annotation.set_text(text, &mut self.painter, store)?;
        Ok(true)
    }

    pub fn rescale_selection(&mut self, scale: f32) -> bool {
        let Some(annotation) = self.selection.and_then(|id| self.annotations.get_mut(id)) else {
            return false;
        };
        if annotation.as_label().is_none() {
            return false;
        }
        annotation.set_user_scale(scale);
        true
    }

    pub fn set_gizmo_mode(&mut self, mode: GizmoMode) -> bool {
        self.gizmo.set_mode(mode)
    }

    /// Destroy every annotation.
    pub fn clear_all(&mut self, store: &mut dyn TextureStore) {
        self.deselect();
        self.pending_arrow_start = None;
        self.preview = None;
        self.annotations.clear(store);
    }

    /// Start over for a new scene: no annotations, Navigate mode.
    pub fn reset(&mut self, store: &mut dyn TextureStore) {
        self.clear_all(store);
        self.pointer_down_at = None;
        self.set_mode(InteractionMode::Navigate);
    }

    /// Render nodes for the annotations, the arrow preview and the gizmo helper.
    pub fn scene_nodes(&self) -> Vec<RenderNode> {
        let mut nodes: Vec<RenderNode> = self
            .annotations
            .all()
            .iter()
            .map(|annotation| match annotation.kind() {
                AnnotationKind::TextLabel(label) => RenderNode::Label {
                    id: annotation.id(),
                    texture: label.texture(),
                    transform: *annotation.transform(),
                },
                AnnotationKind::Arrow(arrow) => RenderNode::Arrow {
                    id: Some(annotation.id()),
                    transform: *annotation.transform(),
                    dimensions: *arrow.dimensions(),
                    color: annotation.color(),
                },
            })
            .collect();

        if let Some(preview) = self.preview {
            nodes.push(RenderNode::Arrow {
                id: None,
                transform: preview.transform,
                dimensions: preview.dimensions,
                color: self.arrow_color,
            });
        }
        if self.gizmo.helper_visible() {
            if let Some(annotation) = self.selected() {
                nodes.push(RenderNode::GizmoHelper {
                    position: annotation.transform().position,
                    mode: self.gizmo.mode(),
                });
            }
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ViewportRect;
    use crate::tests::support::{block_painter, RecordingStore};
    use crate::viewport::CameraSettings;

    const CENTER: Vec2 = Vec2::new(100.0, 50.0);

    fn session() -> EditorSession {
        EditorSession::new(block_painter(), Rgb::WHITE, Rgb::RED)
    }

    fn viewport() -> Viewport {
        Viewport::new(1, ViewportRect::from_size(200, 100), CameraSettings::default())
    }

    fn click(session: &mut EditorSession, viewport: &mut Viewport, store: &mut RecordingStore, at: Vec2) -> Result<PointerOutcome> {
        session.pointer_down(at, viewport);
        session.pointer_up(at, viewport, store)
    }

    #[test]
    fn test_set_mode_resets_transient_state() {
        let mut store = RecordingStore::default();
        let mut viewport = viewport();
        let mut session = session();

        session.set_mode(InteractionMode::PlaceArrow);
        session.pointer_down(CENTER, &mut viewport);
        assert!(session.pending_arrow_start().is_some());

        for mode in [InteractionMode::Navigate, InteractionMode::PlaceText, InteractionMode::Select] {
            session.set_mode(mode);
            assert_eq!(session.pending_arrow_start(), None);
            assert!(!session.preview_visible());
        }

        // Select keeps the selection; every other mode drops it.
        session.set_mode(InteractionMode::PlaceArrow);
        session.pointer_down(Vec2::new(90.0, 50.0), &mut viewport);
        session.pointer_up(Vec2::new(110.0, 30.0), &mut viewport, &mut store).unwrap();
        session.set_mode(InteractionMode::Select);
        let Ok(PointerOutcome::Selected(_)) = click(&mut session, &mut viewport, &mut store, Vec2::new(100.0, 40.0)) else {
            panic!("arrow should be selectable");
        };
        session.set_mode(InteractionMode::Select);
        assert!(session.selection().is_some());
        session.set_mode(InteractionMode::PlaceText);
        assert!(session.selection().is_none());
        assert!(session.gizmo().attached().is_none());
    }

    #[test]
    fn test_cursor_affordance_per_mode() {
        let mut session = session();
        assert_eq!(session.set_mode(InteractionMode::PlaceText), CursorIcon::Text);
        assert_eq!(session.set_mode(InteractionMode::PlaceArrow), CursorIcon::Crosshair);
        assert_eq!(session.set_mode(InteractionMode::Navigate), CursorIcon::Default);
    }

    #[test]
    fn test_place_text_creates_inset_label_facing_origin() {
        let mut store = RecordingStore::default();
        let mut viewport = viewport();
        let mut session = session();
        session.set_mode(InteractionMode::PlaceText);
        session.set_pending_text("North");

        let outcome = click(&mut session, &mut viewport, &mut store, CENTER).unwrap();
        let PointerOutcome::Created(id) = outcome else {
            panic!("expected a label, got {outcome:?}");
        };
        let label = session.annotations().get(id).unwrap();
        let position = label.transform().position;
        assert!((position - Vec3::new(0.0, 0.0, 4.5)).length() < 1e-3);
        assert!((label.transform().rotation * Vec3::Z - Vec3::NEG_Z).length() < 1e-4);
        assert_eq!(session.mode(), InteractionMode::PlaceText);
        assert!(viewport.camera().is_enabled());
    }

    #[test]
    fn test_text_drag_does_not_create() {
        let mut store = RecordingStore::default();
        let mut viewport = viewport();
        let mut session = session();
        session.set_mode(InteractionMode::PlaceText);
        session.set_pending_text("Drag");
        session.pointer_down(CENTER, &mut viewport);
        assert!(!viewport.camera().is_enabled());
        let outcome = session.pointer_up(CENTER + Vec2::new(20.0, 0.0), &mut viewport, &mut store);
        assert_eq!(outcome, Ok(PointerOutcome::Ignored));
        assert!(session.annotations().is_empty());
        assert!(viewport.camera().is_enabled());
    }

    #[test]
    fn test_arrow_preview_hides_when_too_short() {
        let mut viewport = viewport();
        let mut session = session();
        session.set_mode(InteractionMode::PlaceArrow);
        session.pointer_down(CENTER, &mut viewport);
        assert!(!session.preview_visible());

        session.pointer_move(CENTER + Vec2::new(30.0, 0.0), &viewport);
        assert!(session.preview_visible());
        assert!(session.scene_nodes().iter().any(|n| matches!(n, RenderNode::Arrow { id: None, .. })));

        session.pointer_move(CENTER, &viewport);
        assert!(!session.preview_visible());
    }

    #[test]
    fn test_degenerate_arrow_clears_start() {
        let mut store = RecordingStore::default();
        let mut viewport = viewport();
        let mut session = session();
        session.set_mode(InteractionMode::PlaceArrow);
        let outcome = click(&mut session, &mut viewport, &mut store, CENTER).unwrap();
        assert_eq!(outcome, PointerOutcome::Ignored);
        assert!(session.annotations().is_empty());
        assert_eq!(session.pending_arrow_start(), None);
    }

    #[test]
    fn test_navigate_click_on_annotation_selects_it() {
        let mut store = RecordingStore::default();
        let mut viewport = viewport();
        let mut session = session();
        session.set_mode(InteractionMode::PlaceArrow);
        session.pointer_down(Vec2::new(100.0, 70.0), &mut viewport);
        let Ok(PointerOutcome::Created(id)) = session.pointer_up(Vec2::new(100.0, 30.0), &mut viewport, &mut store) else {
            panic!("arrow expected");
        };

        session.set_mode(InteractionMode::Navigate);
        let outcome = click(&mut session, &mut viewport, &mut store, CENTER).unwrap();
        assert_eq!(outcome, PointerOutcome::Selected(id));
        assert_eq!(session.mode(), InteractionMode::Select);
        assert_eq!(session.gizmo().attached(), Some(id));
        assert!(session.scene_nodes().iter().any(|n| matches!(n, RenderNode::GizmoHelper { .. })));
    }

    #[test]
    fn test_gizmo_drag_moves_selection_and_suppresses_camera() {
        let mut store = RecordingStore::default();
        let mut viewport = viewport();
        let mut session = session();
        session.set_mode(InteractionMode::PlaceText);
        session.set_pending_text("Move me");
        let Ok(PointerOutcome::Created(id)) = click(&mut session, &mut viewport, &mut store, CENTER) else {
            panic!("label expected");
        };
        session.set_mode(InteractionMode::Select);
        assert_eq!(click(&mut session, &mut viewport, &mut store, CENTER), Ok(PointerOutcome::Selected(id)));
        let before = session.selected().unwrap().transform().position;

        session.pointer_down(CENTER, &mut viewport);
        assert!(session.is_gizmo_dragging());
        assert!(!viewport.camera().is_enabled());
        // Further presses are ignored mid-drag.
        session.pointer_down(Vec2::ZERO, &mut viewport);
        session.pointer_move(CENTER + Vec2::new(10.0, 0.0), &viewport);
        let after = session.selected().unwrap().transform().position;
        assert!((after - before).length() > 0.05);
        assert!((after.z - before.z).abs() < 1e-3);

        let outcome = session.pointer_up(CENTER + Vec2::new(10.0, 0.0), &mut viewport, &mut store);
        assert_eq!(outcome, Ok(PointerOutcome::GizmoReleased));
        assert!(!session.is_gizmo_dragging());
        assert!(viewport.camera().is_enabled());
        assert_eq!(session.selection(), Some(id));
    }

    #[test]
    fn test_delete_and_edit_selection() {
        let mut store = RecordingStore::default();
        let mut viewport = viewport();
        let mut session = session();
        session.set_mode(InteractionMode::PlaceText);
        session.set_pending_text("Edit");
        let Ok(PointerOutcome::Created(id)) = click(&mut session, &mut viewport, &mut store, CENTER) else {
            panic!("label expected");
        };
        session.set_mode(InteractionMode::Select);
        click(&mut session, &mut viewport, &mut store, CENTER).unwrap();

        assert_eq!(session.recolor_selection(Rgb::RED, &mut store), Ok(true));
        assert_eq!(session.retext_selection("", &mut store), Ok(true));
        assert_eq!(session.selected().unwrap().as_label().unwrap().text(), "");
        assert!(session.rescale_selection(2.0));
        assert!(!session.set_gizmo_mode(GizmoMode::Rotate));
        assert_eq!(store.live().len(), 1);

        assert_eq!(session.delete_selection(&mut store), Some(id));
        assert!(session.annotations().is_empty());
        assert!(session.selection().is_none());
        assert!(store.live().is_empty());
        assert_eq!(session.delete_selection(&mut store), None);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut store = RecordingStore::default();
        let mut viewport = viewport();
        let mut session = session();
        session.set_mode(InteractionMode::PlaceText);
        session.set_pending_text("A");
        let Ok(PointerOutcome::Created(first)) = click(&mut session, &mut viewport, &mut store, CENTER) else {
            panic!("label expected");
        };
        session.reset(&mut store);
        assert_eq!(session.mode(), InteractionMode::Navigate);
        session.set_mode(InteractionMode::PlaceText);
        let Ok(PointerOutcome::Created(second)) = click(&mut session, &mut viewport, &mut store, CENTER) else {
            panic!("label expected");
        };
        assert!(second > first);
    }

    #[test]
    fn test_failed_label_placement_keeps_next_id() {
        let mut store = RecordingStore::default();
        store.refuse_uploads = true;
        let mut viewport = viewport();
        let mut session = session();
        session.set_mode(InteractionMode::PlaceText);
        session.set_pending_text("Hall");

        assert!(click(&mut session, &mut viewport, &mut store, CENTER).is_err());
        assert!(session.annotations().is_empty());

        store.refuse_uploads = false;
        let outcome = click(&mut session, &mut viewport, &mut store, CENTER);
        assert_eq!(outcome, Ok(PointerOutcome::Created(AnnotationId(1))));
    }
}
