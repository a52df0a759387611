//! Editor error taxonomy.

use thiserror::Error;

use crate::render::RenderError;

/// Errors raised by annotation editing.
///
/// None of these is fatal: each leaves the session in the state it had before
/// the failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    /// A label was requested with blank text. Shown to the user.
    #[error("Please enter some text for the label first")]
    EmptyText,

    /// Arrow endpoints closer than the minimum length. Skipped silently.
    #[error("Arrow is too short to draw")]
    DegenerateGeometry,

    /// The picked file is neither an image nor a video. Shown to the user.
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    /// The pointer ray missed the panorama sphere. Skipped silently.
    #[error("Pointer is not over the panorama")]
    MissingIntersection,

    /// Uploading or releasing a label texture failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl EditorError {
    pub fn unsupported_media(name: impl Into<String>) -> Self {
        Self::UnsupportedMedia(name.into())
    }

    /// Whether this error should be shown to the user rather than just logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            EditorError::EmptyText | EditorError::UnsupportedMedia(_) | EditorError::Render(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EditorError>;
