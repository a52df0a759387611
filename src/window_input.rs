//! winit event translation shared by the native and web front ends.

use glam::Vec2;
use winit::event::MouseScrollDelta;
use winit::keyboard::{Key as WinitKey, ModifiersState, NamedKey};
use winit::window::CursorIcon as WinitCursor;

use crate::app::PanelState;
use crate::color::palette_color;
use crate::export::ExportFormat;
use crate::input::{Key, Modifiers, MouseButton};
use crate::message::Message;
use crate::session::{CursorIcon, InteractionMode};

/// Pixel-delta wheel events (touchpads) per wheel line.
const PIXELS_PER_LINE: f32 = 20.0;

pub fn translate_key(key: &WinitKey) -> Option<Key> {
    match key {
        WinitKey::Named(NamedKey::Escape) => Some(Key::Escape),
        WinitKey::Named(NamedKey::Delete) => Some(Key::Delete),
        WinitKey::Named(NamedKey::Backspace) => Some(Key::Backspace),
        WinitKey::Named(NamedKey::Space) => Some(Key::Space),
        WinitKey::Named(NamedKey::ArrowLeft) => Some(Key::Left),
        WinitKey::Named(NamedKey::ArrowRight) => Some(Key::Right),
        WinitKey::Named(NamedKey::Home) => Some(Key::Home),
        WinitKey::Character(text) => text.chars().next().map(Key::Char),
        _ => None,
    }
}

pub fn translate_modifiers(state: ModifiersState) -> Modifiers {
    Modifiers {
        shift: state.shift_key(),
        ctrl: state.control_key(),
        alt: state.alt_key(),
        meta: state.super_key(),
    }
}

pub fn translate_button(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        winit::event::MouseButton::Back => MouseButton::Other(3),
        winit::event::MouseButton::Forward => MouseButton::Other(4),
        winit::event::MouseButton::Other(code) => MouseButton::Other(code),
    }
}

pub fn translate_cursor(cursor: CursorIcon) -> WinitCursor {
    match cursor {
        CursorIcon::Default => WinitCursor::Default,
        CursorIcon::Text => WinitCursor::Text,
        CursorIcon::Crosshair => WinitCursor::Crosshair,
    }
}

/// Wheel travel in lines, positive scrolling up.
pub fn wheel_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
    }
}

pub fn physical_to_vec2(position: winit::dpi::PhysicalPosition<f64>) -> Vec2 {
    Vec2::new(position.x as f32, position.y as f32)
}

/// Window-level shortcut resolved from a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum Shortcut {
    OpenFile,
    Send(Message),
}

/// Shortcuts handled by the window rather than the viewport listeners.
///
/// - `Ctrl+O` open a panorama
/// - `Ctrl+S` export as PNG, `Ctrl+Shift+S` export as JPEG
/// - `Ctrl+Delete` clear all annotations
/// - `1`-`8` pick a palette color for the selection or the active tool
pub fn shortcut(key: Key, modifiers: Modifiers, panel: &PanelState) -> Option<Shortcut> {
    if modifiers.ctrl || modifiers.meta {
        return match key {
            Key::Char('o' | 'O') => Some(Shortcut::OpenFile),
            Key::Char('s' | 'S') => {
                let format = if modifiers.shift {
                    ExportFormat::Jpeg
                } else {
                    ExportFormat::Png
                };
                Some(Shortcut::Send(Message::Export(format)))
            }
            Key::Delete | Key::Backspace => Some(Shortcut::Send(Message::ClearAll)),
            _ => None,
        };
    }
    if modifiers.alt {
        return None;
    }
    let Key::Char(digit @ '1'..='8') = key else {
        return None;
    };
    let color = palette_color(digit as usize - '1' as usize);
    let message = if panel.selection.is_some() {
        Message::ChangeColor(color)
    } else if panel.mode == InteractionMode::PlaceArrow {
        Message::ArrowColorChanged(color)
    } else {
        Message::LabelColorChanged(color)
    };
    Some(Shortcut::Send(message))
}
