//! Platform-neutral input events.
//!
//! The native and web front ends translate their window events into these and
//! feed them through the viewport's listener registry.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::viewport::ListenerKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerPressed { button: MouseButton, position: Vec2 },
    PointerReleased { button: MouseButton, position: Vec2 },
    PointerMoved { position: Vec2 },
    /// Wheel travel in lines; positive scrolls up (zooms in).
    Wheel { lines: f32, position: Vec2 },
    KeyPressed { key: Key, modifiers: Modifiers },
    Resized { width: u32, height: u32 },
}

impl InputEvent {
    pub fn kind(&self) -> ListenerKind {
        match self {
            InputEvent::PointerPressed { .. }
            | InputEvent::PointerReleased { .. }
            | InputEvent::PointerMoved { .. } => ListenerKind::Pointer,
            InputEvent::Wheel { .. } => ListenerKind::Wheel,
            InputEvent::KeyPressed { .. } => ListenerKind::Keyboard,
            InputEvent::Resized { .. } => ListenerKind::Resize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Char(char),
    Escape,
    Delete,
    Backspace,
    Space,
    Left,
    Right,
    Home,
}

impl Key {
    /// Label shown in the settings and help UI.
    pub fn label(&self) -> String {
        match self {
            Key::Char(c) => c.to_uppercase().to_string(),
            Key::Escape => "Esc".to_string(),
            Key::Delete => "Delete".to_string(),
            Key::Backspace => "Backspace".to_string(),
            Key::Space => "Space".to_string(),
            Key::Left => "←".to_string(),
            Key::Right => "→".to_string(),
            Key::Home => "Home".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}
