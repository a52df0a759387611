//! Pointer and keyboard flows through the listener registry.

use glam::{Vec2, Vec3};

use super::support::{encoded_panorama, test_app};
use crate::app::PanoApp;
use crate::error::EditorError;
use crate::input::{InputEvent, Key, Modifiers, MouseButton};
use crate::media;
use crate::message::Message;
use crate::model::AnnotationType;
use crate::render::software::SoftwareRenderer;
use crate::session::{CursorIcon, InteractionMode};

const SIZE: (u32, u32) = (400, 400);
const CENTER: Vec2 = Vec2::new(200.0, 200.0);

fn loaded_app() -> PanoApp<SoftwareRenderer> {
    let (mut app, _sink) = test_app(SIZE);
    app.load_media("room.png", encoded_panorama(64, 32), media::no_video)
        .unwrap();
    app
}

fn press(app: &mut PanoApp<SoftwareRenderer>, at: Vec2) {
    app.handle_input(InputEvent::PointerPressed {
        button: MouseButton::Left,
        position: at,
    });
}

fn release(app: &mut PanoApp<SoftwareRenderer>, at: Vec2) {
    app.handle_input(InputEvent::PointerReleased {
        button: MouseButton::Left,
        position: at,
    });
}

fn click(app: &mut PanoApp<SoftwareRenderer>, at: Vec2) {
    press(app, at);
    release(app, at);
}

fn key(app: &mut PanoApp<SoftwareRenderer>, key: Key) {
    app.handle_input(InputEvent::KeyPressed {
        key,
        modifiers: Modifiers::default(),
    });
}

/// Pixel position of a world point in the current view.
fn screen_point(app: &PanoApp<SoftwareRenderer>, world: Vec3) -> Vec2 {
    let rect = app.viewport().rect();
    let ndc = app.viewport().camera().view_proj().project_point3(world);
    Vec2::new(
        rect.left + (ndc.x + 1.0) * 0.5 * rect.width,
        rect.top + (1.0 - ndc.y) * 0.5 * rect.height,
    )
}

#[test]
fn test_navigate_click_on_empty_space() {
    let mut app = loaded_app();
    assert_eq!(app.session().mode(), InteractionMode::Navigate);

    click(&mut app, CENTER);

    assert_eq!(app.session().selection(), None);
    assert!(app.viewport().camera().is_enabled());
    assert!(app.take_prompt().is_none());
    assert!(app.panel_state().selection.is_none());
    assert_eq!(app.panel_state().annotation_count, 0);
}

#[test]
fn test_blank_text_is_refused() {
    let mut app = loaded_app();
    app.update(Message::SetMode(InteractionMode::PlaceText));
    app.update(Message::LabelTextChanged("   ".to_string()));
    let textures = app.renderer().texture_count();

    click(&mut app, CENTER);

    assert_eq!(app.take_prompt(), Some(EditorError::EmptyText.to_string()));
    assert!(app.session().annotations().is_empty());
    assert_eq!(app.session().mode(), InteractionMode::PlaceText);
    assert_eq!(app.renderer().texture_count(), textures);
}

#[test]
fn test_arrow_between_two_sphere_points() {
    let mut app = loaded_app();
    let a = Vec3::new(0.0, 0.0, 5.0);
    let b = Vec3::new(0.0, 3.0, 4.0);
    let (from, to) = (screen_point(&app, a), screen_point(&app, b));

    app.update(Message::SetMode(InteractionMode::PlaceArrow));
    press(&mut app, from);
    app.handle_input(InputEvent::PointerMoved { position: to });
    assert!(app.session().preview_visible());
    release(&mut app, to);

    let annotations = app.session().annotations();
    assert_eq!(annotations.len(), 1);
    let arrow = &annotations.all()[0];
    assert_eq!(arrow.annotation_type(), AnnotationType::Arrow);
    let (start, end) = arrow.arrow_endpoints().unwrap();
    assert!((start - a).length() < 1e-2, "start {start}");
    assert!((end - b).length() < 1e-2, "end {end}");

    let length = (b - a).length();
    let dimensions = arrow.as_arrow().unwrap().dimensions();
    assert!((dimensions.shaft_length - 0.8 * length).abs() < 1e-2);
    assert!((dimensions.head_length - 0.2 * length).abs() < 1e-2);
    assert!(!app.session().preview_visible());
    assert_eq!(app.session().pending_arrow_start(), None);
}

#[test]
fn test_keyboard_mode_flow() {
    let mut app = loaded_app();

    key(&mut app, Key::Char('t'));
    assert_eq!(app.session().mode(), InteractionMode::PlaceText);
    assert_eq!(app.cursor(), CursorIcon::Text);

    // Bindings are case-insensitive
    key(&mut app, Key::Char('A'));
    assert_eq!(app.session().mode(), InteractionMode::PlaceArrow);
    assert_eq!(app.cursor(), CursorIcon::Crosshair);

    key(&mut app, Key::Escape);
    assert_eq!(app.session().mode(), InteractionMode::Navigate);
    assert_eq!(app.cursor(), CursorIcon::Default);

    // Modified keys are left to the window shortcuts
    app.handle_input(InputEvent::KeyPressed {
        key: Key::Char('t'),
        modifiers: Modifiers {
            ctrl: true,
            ..Modifiers::default()
        },
    });
    assert_eq!(app.session().mode(), InteractionMode::Navigate);
}

#[test]
fn test_label_select_edit_delete_flow() {
    let mut app = loaded_app();
    app.update(Message::SetMode(InteractionMode::PlaceText));
    app.update(Message::LabelTextChanged("Kitchen".to_string()));
    click(&mut app, CENTER);
    assert_eq!(app.session().annotations().len(), 1);
    // Panorama plus one label bitmap
    assert_eq!(app.renderer().texture_count(), 2);

    // A click on the label from Navigate selects it and opens the panel
    key(&mut app, Key::Escape);
    click(&mut app, CENTER);
    assert_eq!(app.session().mode(), InteractionMode::Select);
    let panel = app.panel_state().selection.unwrap();
    assert_eq!(panel.annotation_type, AnnotationType::TextLabel);
    assert_eq!(panel.text.as_deref(), Some("Kitchen"));
    // Labels always face the origin
    assert!(!panel.rotate_available);

    app.update(Message::ChangeText("Pantry".to_string()));
    app.update(Message::ChangeScale(2.0));
    let panel = app.panel_state().selection.unwrap();
    assert_eq!(panel.text.as_deref(), Some("Pantry"));
    assert_eq!(panel.scale, Some(2.0));
    // Re-rendering swapped the bitmap, it did not add one
    assert_eq!(app.renderer().texture_count(), 2);

    // Escape in Select leaves the mode, dropping the selection
    key(&mut app, Key::Escape);
    assert!(app.panel_state().selection.is_none());

    key(&mut app, Key::Char('s'));
    click(&mut app, CENTER);
    assert!(app.session().selection().is_some());
    key(&mut app, Key::Delete);
    assert!(app.session().annotations().is_empty());
    assert!(app.session().selection().is_none());
    assert_eq!(app.renderer().texture_count(), 1);
}

#[test]
fn test_clear_all_releases_every_label() {
    let mut app = loaded_app();
    app.update(Message::SetMode(InteractionMode::PlaceText));
    app.update(Message::LabelTextChanged("One".to_string()));
    click(&mut app, CENTER);
    click(&mut app, Vec2::new(80.0, 120.0));
    assert_eq!(app.renderer().texture_count(), 3);

    app.update(Message::ClearAll);
    assert!(app.session().annotations().is_empty());
    assert_eq!(app.renderer().texture_count(), 1);
    assert_eq!(app.session().mode(), InteractionMode::PlaceText);
}

#[test]
fn test_wheel_zooms_and_home_resets() {
    let mut app = loaded_app();
    let fov = app.viewport().camera().fov_degrees();
    app.handle_input(InputEvent::Wheel {
        lines: 3.0,
        position: CENTER,
    });
    assert!(app.viewport().camera().fov_degrees() < fov);

    key(&mut app, Key::Home);
    assert_eq!(app.viewport().camera().fov_degrees(), fov);
}
