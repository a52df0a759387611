//! Annotation types and factories.
//!
//! An [`Annotation`] is either a text label or an arrow, distinguished by
//! [`AnnotationKind`]. Labels own a texture in the renderer; the only way to
//! drop an annotation is [`Annotation::destroy`], which releases it.

use std::fmt;

use glam::{Vec2, Vec3};
use image::RgbaImage;

use super::label::{base_scale_for, LabelPainter};
use crate::color::Rgb;
use crate::constants::{arrow, MAX_LABEL_SCALE, MIN_ARROW_LENGTH, MIN_LABEL_SCALE};
use crate::error::{EditorError, Result};
use crate::geometry::{rotation_between, Transform};
use crate::render::{TextureId, TextureStore};

/// Unique identifier of an annotation within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(pub u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Annotation kind without its payload, for UI decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationType {
    TextLabel,
    Arrow,
}

impl AnnotationType {
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationType::TextLabel => "Text",
            AnnotationType::Arrow => "Arrow",
        }
    }
}

/// Billboard text rendered from a bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    text: String,
    user_scale: f32,
    base_scale: Vec2,
    texture: TextureId,
    bitmap_size: (u32, u32),
}

impl TextLabel {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn user_scale(&self) -> f32 {
        self.user_scale
    }

    /// Bitmap size in world units (pixels × 0.02).
    pub fn base_scale(&self) -> Vec2 {
        self.base_scale
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn bitmap_size(&self) -> (u32, u32) {
        self.bitmap_size
    }

    fn render_scale(&self) -> Vec3 {
        (self.base_scale * self.user_scale).extend(1.0)
    }

    /// Upload a fresh bitmap, then release the texture it replaces.
    fn swap_bitmap(&mut self, bitmap: &RgbaImage, store: &mut dyn TextureStore) -> Result<()> {
        let texture = store.upload_rgba(bitmap)?;
        let previous = std::mem::replace(&mut self.texture, texture);
        store.release(previous);
        self.bitmap_size = bitmap.dimensions();
        self.base_scale = base_scale_for(bitmap.width(), bitmap.height());
        Ok(())
    }
}

/// Proportions of an arrow, all derived from its length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowDimensions {
    pub length: f32,
    pub shaft_length: f32,
    pub head_length: f32,
    pub head_width: f32,
    pub shaft_width: f32,
}

impl ArrowDimensions {
    /// Dimensions for an arrow of `length`, or `None` below the minimum length.
    pub fn for_length(length: f32) -> Option<Self> {
        if !length.is_finite() || length < MIN_ARROW_LENGTH {
            return None;
        }
        let head_length = length * arrow::HEAD_LENGTH_RATIO;
        let head_width = (length * arrow::HEAD_WIDTH_RATIO).max(arrow::MIN_HEAD_WIDTH);
        Some(Self {
            length,
            shaft_length: length - head_length,
            head_length,
            head_width,
            shaft_width: head_width * arrow::SHAFT_TO_HEAD_WIDTH,
        })
    }
}

/// Straight arrow: a shaft cylinder capped by a cone, along local +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrow {
    dimensions: ArrowDimensions,
}

impl Arrow {
    pub fn dimensions(&self) -> &ArrowDimensions {
        &self.dimensions
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationKind {
    TextLabel(TextLabel),
    Arrow(Arrow),
}

/// A label or arrow placed in the panorama.
#[derive(Debug, PartialEq)]
pub struct Annotation {
    id: AnnotationId,
    kind: AnnotationKind,
    transform: Transform,
    color: Rgb,
}

impl Annotation {
    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn kind(&self) -> &AnnotationKind {
        &self.kind
    }

    pub fn annotation_type(&self) -> AnnotationType {
        match self.kind {
            AnnotationKind::TextLabel(_) => AnnotationType::TextLabel,
            AnnotationKind::Arrow(_) => AnnotationType::Arrow,
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn as_label(&self) -> Option<&TextLabel> {
        match &self.kind {
            AnnotationKind::TextLabel(label) => Some(label),
            AnnotationKind::Arrow(_) => None,
        }
    }

    pub fn as_arrow(&self) -> Option<&Arrow> {
        match &self.kind {
            AnnotationKind::Arrow(arrow) => Some(arrow),
            AnnotationKind::TextLabel(_) => None,
        }
    }

    /// Start and tip of an arrow in world space.
    pub fn arrow_endpoints(&self) -> Option<(Vec3, Vec3)> {
        let arrow = self.as_arrow()?;
        let start = self.transform.position;
        let end = start + self.transform.rotation * Vec3::Y * arrow.dimensions.length;
        Some((start, end))
    }

    /// Move or rotate the annotation. A label keeps its scale.
    pub fn set_placement(&mut self, position: Vec3, rotation: glam::Quat) {
        self.transform.position = position;
        self.transform.rotation = rotation;
    }

    /// Change the color. Labels re-render their bitmap; arrows recolor in place.
    pub fn set_color(
        &mut self,
        color: Rgb,
        painter: &mut LabelPainter,
        store: &mut dyn TextureStore,
    ) -> Result<()> {
        if let AnnotationKind::TextLabel(label) = &mut self.kind {
            let bitmap = painter.paint(&label.text, color);
            label.swap_bitmap(&bitmap, store)?;
            self.transform.scale = label.render_scale();
        }
        self.color = color;
        Ok(())
    }

    /// Replace a label's text and re-render it. Arrows ignore this.
    pub fn set_text(
        &mut self,
        text: &str,
        painter: &mut LabelPainter,
        store: &mut dyn TextureStore,
    ) -> Result<()> {
        let AnnotationKind::TextLabel(label) = &mut self.kind else {
            log::debug!("Ignoring text change for arrow {}", self.id);
            return Ok(());
        };
        let bitmap = painter.paint(text, self.color);
        label.swap_bitmap(&bitmap, store)?;
        label.text = text.to_string();
        self.transform.scale = label.render_scale();
        Ok(())
    }

    /// Set a label's scale multiplier (clamped). Arrows ignore this.
    pub fn set_user_scale(&mut self, scale: f32) {
        if let AnnotationKind::TextLabel(label) = &mut self.kind {
            if scale.is_finite() {
                label.user_scale = scale.clamp(MIN_LABEL_SCALE, MAX_LABEL_SCALE);
                self.transform.scale = label.render_scale();
            }
        }
    }

    /// Release the annotation's renderer resources and drop it.
    pub fn destroy(self, store: &mut dyn TextureStore) {
        if let AnnotationKind::TextLabel(label) = self.kind {
            store.release(label.texture);
        }
        log::debug!("Destroyed annotation {}", self.id);
    }
}

/// Create a text label at `transform` (position and orientation; scale is derived).
///
/// Fails with [`EditorError::EmptyText`] when `text` is blank.
pub fn create_text_label(
    id: AnnotationId,
    text: &str,
    color: Rgb,
    user_scale: f32,
    transform: Transform,
    painter: &mut LabelPainter,
    store: &mut dyn TextureStore,
) -> Result<Annotation> {
    if text.trim().is_empty() {
        return Err(EditorError::EmptyText);
    }
    let bitmap = painter.paint(text, color);
    let texture = store.upload_rgba(&bitmap)?;
    let label = TextLabel {
        text: text.to_string(),
        user_scale: user_scale.clamp(MIN_LABEL_SCALE, MAX_LABEL_SCALE),
        base_scale: base_scale_for(bitmap.width(), bitmap.height()),
        texture,
        bitmap_size: bitmap.dimensions(),
    };
    let transform = Transform {
        scale: label.render_scale(),
        ..transform
    };
    log::debug!("Created label {} '{}' ({}x{})", id, text, bitmap.width(), bitmap.height());
    Ok(Annotation {
        id,
        kind: AnnotationKind::TextLabel(label),
        transform,
        color,
    })
}

/// Create an arrow from `start` to `end`, or `None` when it would be shorter than the minimum.
pub fn create_arrow(id: AnnotationId, start: Vec3, end: Vec3, color: Rgb) -> Option<Annotation> {
    let delta = end - start;
    let dimensions = ArrowDimensions::for_length(delta.length())?;
    let rotation = rotation_between(Vec3::Y, delta);
    log::debug!("Created arrow {} with length {:.3}", id, dimensions.length);
    Some(Annotation {
        id,
        kind: AnnotationKind::Arrow(Arrow { dimensions }),
        transform: Transform::from_position_rotation(start, rotation),
        color,
    })
}
