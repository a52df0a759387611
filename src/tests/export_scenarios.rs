//! Export through the app: sizes, formats and failure cleanup.

use std::io::Cursor;

use glam::Vec2;

use super::support::{encoded_panorama, test_app};
use crate::export::ExportFormat;
use crate::input::{InputEvent, MouseButton};
use crate::media;
use crate::message::Message;
use crate::session::InteractionMode;

fn dimensions_of(bytes: &[u8]) -> (u32, u32) {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .unwrap()
        .into_dimensions()
        .unwrap()
}

#[test]
fn test_full_size_export_matches_source_and_format() {
    let (mut app, sink) = test_app((320, 160));
    app.load_media("lobby.png", encoded_panorama(4096, 2048), media::no_video)
        .unwrap();
    assert!(app.panel_state().export_enabled);

    app.update(Message::SetMode(InteractionMode::PlaceArrow));
    app.handle_input(InputEvent::PointerPressed {
        button: MouseButton::Left,
        position: Vec2::new(160.0, 120.0),
    });
    app.handle_input(InputEvent::PointerReleased {
        button: MouseButton::Left,
        position: Vec2::new(160.0, 40.0),
    });
    assert_eq!(app.session().annotations().len(), 1);

    app.update(Message::Export(ExportFormat::Jpeg));

    let delivered = sink.delivered.borrow();
    assert_eq!(delivered.len(), 1);
    let file = &delivered[0];
    assert_eq!(file.file_name, "equirectangular.jpg");
    assert_eq!(file.mime_type, "image/jpeg");
    assert_eq!((file.width, file.height), (4096, 2048));
    assert_eq!(image::guess_format(&file.bytes).unwrap(), image::ImageFormat::Jpeg);
    assert_eq!(dimensions_of(&file.bytes), (4096, 2048));

    assert_eq!(app.config().preferences.export_format, ExportFormat::Jpeg);
    assert_eq!(app.renderer().target_count(), 0);
    assert!(app.take_prompt().is_none());
}

#[test]
fn test_failed_export_prompts_and_releases_targets() {
    let (mut app, sink) = test_app((64, 32));
    app.load_media("small.png", encoded_panorama(64, 32), media::no_video)
        .unwrap();
    app.renderer_mut().fail_readbacks(true);

    app.update(Message::Export(ExportFormat::Png));

    assert!(sink.delivered.borrow().is_empty());
    assert_eq!(app.renderer().target_count(), 0);
    let prompt = app.take_prompt().unwrap();
    assert!(prompt.starts_with("Export failed"), "{prompt}");

    // The next attempt succeeds once readback works again
    app.renderer_mut().fail_readbacks(false);
    app.update(Message::Export(ExportFormat::Png));
    let delivered = sink.delivered.borrow();
    assert_eq!(delivered.len(), 1);
    assert_eq!(image::guess_format(&delivered[0].bytes).unwrap(), image::ImageFormat::Png);
    assert_eq!(dimensions_of(&delivered[0].bytes), (64, 32));
}

#[test]
fn test_export_without_media_is_refused() {
    let (mut app, sink) = test_app((64, 32));
    assert!(!app.panel_state().export_enabled);

    app.update(Message::Export(ExportFormat::Png));

    assert!(sink.delivered.borrow().is_empty());
    assert!(app.take_prompt().is_some());
    assert_eq!(app.renderer().target_count(), 0);
}

#[test]
fn test_export_completes_on_a_later_frame() {
    let (mut app, sink) = test_app((64, 32));
    app.load_media("small.png", encoded_panorama(64, 32), media::no_video)
        .unwrap();
    // The readback lands two ticks after the request, like a WebGL copy.
    app.renderer_mut().defer_readbacks(2);

    app.update(Message::Export(ExportFormat::Png));
    assert!(sink.delivered.borrow().is_empty());
    assert!(app.export_in_progress());
    assert!(!app.panel_state().export_enabled);
    assert_eq!(app.renderer().target_count(), 0);

    // A second request while one is in flight is ignored
    app.update(Message::Export(ExportFormat::Jpeg));
    app.frame().unwrap();
    assert!(sink.delivered.borrow().is_empty());

    app.frame().unwrap();
    let delivered = sink.delivered.borrow();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].file_name, "equirectangular.png");
    assert_eq!(dimensions_of(&delivered[0].bytes), (64, 32));
    assert!(!app.export_in_progress());
    assert!(app.panel_state().export_enabled);
    assert!(app.take_prompt().is_none());
}

#[test]
fn test_late_readback_failure_prompts() {
    let (mut app, sink) = test_app((64, 32));
    app.load_media("small.png", encoded_panorama(64, 32), media::no_video)
        .unwrap();
    app.renderer_mut().defer_readbacks(1);
    app.renderer_mut().fail_readbacks(true);

    app.update(Message::Export(ExportFormat::Png));
    assert!(app.take_prompt().is_none());

    app.frame().unwrap();
    assert!(sink.delivered.borrow().is_empty());
    assert!(!app.export_in_progress());
    let prompt = app.take_prompt().unwrap();
    assert!(prompt.starts_with("Export failed"), "{prompt}");
}
