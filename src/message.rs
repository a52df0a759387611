//! Application messages.
//!
//! Every user intent, from toolbar buttons, the property panel, shortcuts and
//! pointer input, reaches [`crate::app::PanoApp::update`] as a [`Message`].

use glam::Vec2;

use crate::color::Rgb;
use crate::export::ExportFormat;
use crate::gizmo::GizmoMode;
use crate::session::InteractionMode;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Toolbar
    /// Enter a mode.
    SetMode(InteractionMode),
    /// Toolbar toggle: enter the mode, or go back to Navigate if already in it.
    ToggleMode(InteractionMode),
    /// Leave the current mode for Navigate.
    Cancel,
    /// Text used for the next placed label
    LabelTextChanged(String),
    LabelColorChanged(Rgb),
    ArrowColorChanged(Rgb),
    /// Destroy every annotation
    ClearAll,
    Export(ExportFormat),

    // Viewport
    PointerDown(Vec2),
    PointerMove(Vec2),
    PointerUp(Vec2),
    /// Wheel lines; positive zooms in.
    Zoom(f32),
    Resized { width: u32, height: u32 },
    ResetCamera,

    // Property panel
    /// Delete the selected annotation
    Delete,
    ChangeColor(Rgb),
    ChangeText(String),
    ChangeScale(f32),
    SetGizmoMode(GizmoMode),
    /// Close the panel, dropping the selection
    ClosePanel,

    // Video transport
    TogglePlayback,
    Rewind,
    FastForward,

    /// Acknowledge the message shown to the user
    DismissPrompt,
}
