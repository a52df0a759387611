//! Keyboard shortcuts.
//!
//! Bindings are part of the persisted configuration, so every key is stored as
//! a serialisable [`Key`].

use serde::{Deserialize, Serialize};

use crate::gizmo::GizmoMode;
use crate::input::Key;
use crate::session::InteractionMode;

/// What a shortcut does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    SetMode(InteractionMode),
    /// Leave the current placement or selection mode.
    Cancel,
    DeleteSelection,
    SetGizmoMode(GizmoMode),
    TogglePlayback,
    Rewind,
    FastForward,
    ResetCamera,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub mode_navigate: Key,
    pub mode_text: Key,
    pub mode_arrow: Key,
    pub mode_select: Key,
    pub cancel: Key,
    pub delete: Key,
    pub gizmo_translate: Key,
    pub gizmo_rotate: Key,
    pub play_pause: Key,
    pub rewind: Key,
    pub fast_forward: Key,
    pub reset_camera: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            mode_navigate: Key::Char('n'),
            mode_text: Key::Char('t'),
            mode_arrow: Key::Char('a'),
            mode_select: Key::Char('s'),
            cancel: Key::Escape,
            delete: Key::Delete,
            gizmo_translate: Key::Char('g'),
            gizmo_rotate: Key::Char('r'),
            play_pause: Key::Space,
            rewind: Key::Left,
            fast_forward: Key::Right,
            reset_camera: Key::Home,
        }
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> [(Key, KeyAction); 12] {
        [
            (self.mode_navigate, KeyAction::SetMode(InteractionMode::Navigate)),
            (self.mode_text, KeyAction::SetMode(InteractionMode::PlaceText)),
            (self.mode_arrow, KeyAction::SetMode(InteractionMode::PlaceArrow)),
            (self.mode_select, KeyAction::SetMode(InteractionMode::Select)),
            (self.cancel, KeyAction::Cancel),
            (self.delete, KeyAction::DeleteSelection),
            (self.gizmo_translate, KeyAction::SetGizmoMode(GizmoMode::Translate)),
            (self.gizmo_rotate, KeyAction::SetGizmoMode(GizmoMode::Rotate)),
            (self.play_pause, KeyAction::TogglePlayback),
            (self.rewind, KeyAction::Rewind),
            (self.fast_forward, KeyAction::FastForward),
            (self.reset_camera, KeyAction::ResetCamera),
        ]
    }

    /// Action bound to `key`. Letters match case-insensitively.
    pub fn action_for_key(&self, key: Key) -> Option<KeyAction> {
        let key = normalize(key);
        self.table()
            .into_iter()
            .find(|(bound, _)| normalize(*bound) == key)
            .map(|(_, action)| action)
    }

    /// Backspace deletes as well as the configured delete key.
    pub fn is_delete(&self, key: Key) -> bool {
        key == Key::Backspace || self.action_for_key(key) == Some(KeyAction::DeleteSelection)
    }

    /// Actions sharing a key with another action.
    pub fn conflicts(&self) -> Vec<(Key, KeyAction, KeyAction)> {
        let table = self.table();
        let mut conflicts = Vec::new();
        for (i, (key, first)) in table.iter().enumerate() {
            for (other, second) in &table[i + 1..] {
                if normalize(*key) == normalize(*other) {
                    conflicts.push((*key, *first, *second));
                }
            }
        }
        conflicts
    }
}

fn normalize(key: Key) -> Key {
    match key {
        Key::Char(c) => Key::Char(c.to_ascii_lowercase()),
        other => other,
    }
}
