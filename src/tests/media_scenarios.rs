//! Loading media: scope turnover, refusals and video frames.

use glam::Vec2;

use super::support::{encoded_panorama, test_app, ScriptedVideo};
use crate::input::{InputEvent, MouseButton};
use crate::media::{self, MediaKind, VideoPlayback};
use crate::message::Message;
use crate::session::InteractionMode;
use crate::viewport::{FrameOutcome, ListenerKind};

const SIZE: (u32, u32) = (200, 100);
const CENTER: Vec2 = Vec2::new(100.0, 50.0);

fn open_scripted(_bytes: Vec<u8>) -> media::Result<Box<dyn VideoPlayback>> {
    Ok(Box::new(ScriptedVideo {
        paused: false,
        time: 0.0,
        size: Some((64, 32)),
    }))
}

#[test]
fn test_new_media_retires_previous_scope() {
    let (mut app, _sink) = test_app(SIZE);
    app.load_media("first.png", encoded_panorama(32, 16), media::no_video)
        .unwrap();
    let first = app.viewport().generation();
    let first_token = app.viewport().scope().token();
    let per_generation = app.listeners().count_for_generation(first);
    assert!(per_generation > 0);
    assert_eq!(app.listeners().count_of_kind(ListenerKind::Keyboard), 1);

    app.update(Message::SetMode(InteractionMode::PlaceText));
    app.update(Message::LabelTextChanged("Old".to_string()));
    app.handle_input(InputEvent::PointerPressed {
        button: MouseButton::Left,
        position: CENTER,
    });
    app.handle_input(InputEvent::PointerReleased {
        button: MouseButton::Left,
        position: CENTER,
    });
    assert_eq!(app.session().annotations().len(), 1);

    app.load_media("second.png", encoded_panorama(32, 16), media::no_video)
        .unwrap();
    let second = app.viewport().generation();

    assert!(second > first);
    assert!(first_token.is_cancelled());
    assert_eq!(app.listeners().count_for_generation(first), 0);
    assert_eq!(app.listeners().count_for_generation(second), per_generation);
    // One keyboard listener, not one per load
    assert_eq!(app.listeners().count_of_kind(ListenerKind::Keyboard), 1);

    // Old label and old panorama are gone; only the new panorama remains
    assert!(app.session().annotations().is_empty());
    assert_eq!(app.session().mode(), InteractionMode::Navigate);
    assert_eq!(app.renderer().texture_count(), 1);

    let outcome = app.frame().unwrap();
    assert!(matches!(outcome, FrameOutcome::Rendered { .. }));
}

#[test]
fn test_unsupported_media_keeps_scene() {
    let (mut app, _sink) = test_app(SIZE);
    app.load_media("room.png", encoded_panorama(32, 16), media::no_video)
        .unwrap();
    let generation = app.viewport().generation();
    let panorama = app.viewport().panorama();

    let result = app.load_media("notes.txt", b"just some notes".to_vec(), media::no_video);

    assert!(result.is_err());
    assert_eq!(app.take_prompt().as_deref(), Some("Unsupported media: notes.txt"));
    assert_eq!(app.viewport().generation(), generation);
    assert_eq!(app.viewport().panorama(), panorama);
    assert!(app.viewport().is_live());
    assert_eq!(app.media_kind(), Some(MediaKind::Image));
}

#[test]
fn test_refused_upload_keeps_scene_and_prompts() {
    let (mut app, _sink) = test_app(SIZE);
    app.load_media("room.png", encoded_panorama(32, 16), media::no_video)
        .unwrap();
    let generation = app.viewport().generation();
    let panorama = app.viewport().panorama();
    app.update(Message::SetMode(InteractionMode::PlaceArrow));
    app.renderer_mut().refuse_uploads(true);

    let result = app.load_media("huge.png", encoded_panorama(64, 32), media::no_video);

    assert!(result.is_err());
    let prompt = app.take_prompt().unwrap();
    assert!(prompt.starts_with("Could not display huge.png"), "{prompt}");
    assert_eq!(app.viewport().generation(), generation);
    assert_eq!(app.viewport().panorama(), panorama);
    assert_eq!(app.session().mode(), InteractionMode::PlaceArrow);
    assert_eq!(app.renderer().texture_count(), 1);
}

#[test]
fn test_video_without_backend_is_refused() {
    let (mut app, _sink) = test_app(SIZE);
    let result = app.load_media("tour.mp4", ScriptedVideo::MP4_HEADER.to_vec(), media::no_video);
    assert!(result.is_err());
    assert!(app.take_prompt().is_some());
    assert_eq!(app.media_kind(), None);
}

#[test]
fn test_video_frames_and_playback_toggle() {
    let (mut app, _sink) = test_app(SIZE);
    app.load_media("tour.mp4", ScriptedVideo::MP4_HEADER.to_vec(), open_scripted)
        .unwrap();
    assert_eq!(app.media_kind(), Some(MediaKind::Video));
    assert_eq!(app.viewport().panorama(), None);
    assert_eq!(app.panel_state().video_playing, Some(true));

    app.frame().unwrap();
    assert!(app.viewport().panorama().is_some());
    assert_eq!(app.viewport().source_size(), Some((64, 32)));
    app.frame().unwrap();
    // Each frame replaces the previous texture
    assert_eq!(app.renderer().texture_count(), 1);

    // A click that hits nothing toggles the video
    app.handle_input(InputEvent::PointerPressed {
        button: MouseButton::Left,
        position: CENTER,
    });
    app.handle_input(InputEvent::PointerReleased {
        button: MouseButton::Left,
        position: CENTER,
    });
    assert_eq!(app.panel_state().video_playing, Some(false));

    app.update(Message::TogglePlayback);
    assert_eq!(app.panel_state().video_playing, Some(true));
}
