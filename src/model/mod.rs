//! Annotation model: labels, arrows, their meshes and bitmaps, and the collection owning them.

pub mod annotation;
pub mod collection;
pub mod label;
pub mod mesh;

pub use annotation::{
    create_arrow, create_text_label, Annotation, AnnotationId, AnnotationKind, AnnotationType,
    Arrow, ArrowDimensions, TextLabel,
};
pub use collection::AnnotationCollection;
pub use label::{GlyphMask, GlyphRasterizer, LabelPainter, LabelStyle};
