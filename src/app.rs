//! The panomark application - shared between native and WASM builds.
//!
//! `PanoApp` owns the renderer, the editor session and the current viewport.
//! Front ends feed it [`InputEvent`]s and [`Message`]s, call [`PanoApp::frame`]
//! once per display refresh and draw their widgets from [`PanoApp::panel_state`].

use thiserror::Error;

use crate::color::Rgb;
use crate::config::AppConfig;
use crate::error::EditorError;
use crate::export::{self, ExportFormat, ExportSink, ExportedImage, PendingExport};
use crate::geometry::ViewportRect;
use crate::gizmo::GizmoMode;
use crate::input::{InputEvent, MouseButton};
use crate::keybindings::KeyAction;
use crate::media::{self, MediaError, MediaKind, MediaSource, VideoPlayback};
use crate::message::Message;
use crate::model::{AnnotationId, AnnotationKind, AnnotationType, GlyphRasterizer, LabelPainter, LabelStyle};
use crate::render::{RenderError, SceneRenderer, SceneSnapshot};
use crate::session::{CursorIcon, EditorSession, InteractionMode, PointerOutcome};
use crate::viewport::{FrameOutcome, ListenerKind, ListenerRegistry, Viewport};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Properties of the selected annotation shown in the property panel.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPanel {
    pub id: AnnotationId,
    pub annotation_type: AnnotationType,
    pub color: Rgb,
    /// Label text; `None` for arrows.
    pub text: Option<String>,
    /// Label scale multiplier; `None` for arrows.
    pub scale: Option<f32>,
    pub gizmo_mode: GizmoMode,
    pub rotate_available: bool,
}

/// Everything the UI reflects.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub mode: InteractionMode,
    pub cursor: CursorIcon,
    pub label_text: String,
    pub label_color: Rgb,
    pub arrow_color: Rgb,
    /// `Some` while the property panel is open.
    pub selection: Option<SelectionPanel>,
    pub annotation_count: usize,
    pub export_enabled: bool,
    pub export_format: ExportFormat,
    /// `Some(playing)` while a video is loaded.
    pub video_playing: Option<bool>,
    /// Message the user must acknowledge.
    pub prompt: Option<String>,
}

pub struct PanoApp<R: SceneRenderer> {
    renderer: R,
    config: AppConfig,
    session: EditorSession,
    viewport: Viewport,
    listeners: ListenerRegistry<InputEvent, Message>,
    media: Option<MediaSource>,
    generation: u64,
    cursor: CursorIcon,
    prompt: Option<String>,
    sink: Box<dyn ExportSink>,
    pending_export: Option<PendingExport>,
}

fn message_for_action(action: KeyAction) -> Message {
    match action {
        KeyAction::SetMode(mode) => Message::SetMode(mode),
        KeyAction::Cancel => Message::Cancel,
        KeyAction::DeleteSelection => Message::Delete,
        KeyAction::SetGizmoMode(mode) => Message::SetGizmoMode(mode),
        KeyAction::TogglePlayback => Message::TogglePlayback,
        KeyAction::Rewind => Message::Rewind,
        KeyAction::FastForward => Message::FastForward,
        KeyAction::ResetCamera => Message::ResetCamera,
    }
}

impl<R: SceneRenderer> PanoApp<R> {
    pub fn new(
        renderer: R,
        config: AppConfig,
        rasterizer: Box<dyn GlyphRasterizer>,
        sink: Box<dyn ExportSink>,
        size: (u32, u32),
    ) -> Self {
        let style = LabelStyle {
            font_size: config.preferences.label_font_size,
            ..LabelStyle::default()
        };
        let session = EditorSession::new(
            LabelPainter::new(rasterizer, style),
            config.preferences.label_color,
            config.preferences.arrow_color,
        );
        let viewport = Viewport::new(0, ViewportRect::from_size(size.0, size.1), config.camera);
        let mut app = Self {
            renderer,
            config,
            session,
            viewport,
            listeners: ListenerRegistry::new(),
            media: None,
            generation: 0,
            cursor: CursorIcon::Default,
            prompt: None,
            sink,
            pending_export: None,
        };
        app.register_listeners();
        app
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn listeners(&self) -> &ListenerRegistry<InputEvent, Message> {
        &self.listeners
    }

    pub fn cursor(&self) -> CursorIcon {
        self.cursor
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        self.media.as_ref().map(MediaSource::kind)
    }

    /// Take the pending user prompt, if any.
    pub fn take_prompt(&mut self) -> Option<String> {
        self.prompt.take()
    }

    fn show_prompt(&mut self, text: String) {
        log::warn!("{}", text);
        self.prompt = Some(text);
    }

    fn report(&mut self, err: EditorError) {
        if err.is_user_facing() {
            self.show_prompt(err.to_string());
        } else {
            log::debug!("{}", err);
        }
    }

    /// Input handlers for the current viewport generation.
    fn register_listeners(&mut self) {
        let scope = self.viewport.scope();
        self.listeners.register(scope, ListenerKind::Pointer, |event| match *event {
            InputEvent::PointerPressed {
                button: MouseButton::Left,
                position,
            } => Some(Message::PointerDown(position)),
            InputEvent::PointerReleased {
                button: MouseButton::Left,
                position,
            } => Some(Message::PointerUp(position)),
            InputEvent::PointerMoved { position } => Some(Message::PointerMove(position)),
            _ => None,
        });
        self.listeners.register(scope, ListenerKind::Wheel, |event| match *event {
            InputEvent::Wheel { lines, .. } => Some(Message::Zoom(lines)),
            _ => None,
        });
        let bindings = self.config.keybindings.clone();
        self.listeners.register(scope, ListenerKind::Keyboard, move |event| {
            let InputEvent::KeyPressed { key, modifiers } = *event else {
                return None;
            };
            if modifiers.ctrl || modifiers.meta || modifiers.alt {
                return None;
            }
            if bindings.is_delete(key) {
                return Some(Message::Delete);
            }
            bindings.action_for_key(key).map(message_for_action)
        });
        self.listeners.register(scope, ListenerKind::Resize, |event| match *event {
            InputEvent::Resized { width, height } => Some(Message::Resized { width, height }),
            _ => None,
        });
    }

    /// Route a raw input event through the live listeners.
    pub fn handle_input(&mut self, event: InputEvent) {
        for message in self.listeners.dispatch_kind(event.kind(), &event) {
            self.update(message);
        }
    }

    /// Replace the scene with new media.
    ///
    /// The file is classified and decoded first; on failure the current scene
    /// is left untouched and the reason is shown to the user.
    pub fn load_media(
        &mut self,
        name: &str,
        bytes: Vec<u8>,
        open_video: impl FnOnce(Vec<u8>) -> media::Result<Box<dyn VideoPlayback>>,
    ) -> Result<(), AppError> {
        let media = match media::load_media(name, bytes, open_video) {
            Ok(media) => media,
            Err(err) => {
                let text = match &err {
                    MediaError::Unsupported { name } => EditorError::unsupported_media(name.clone()).to_string(),
                    other => other.to_string(),
                };
                self.show_prompt(text);
                return Err(err.into());
            }
        };
        // Uploaded before the old generation is torn down, so a refusal keeps the current scene.
        let texture = match &media {
            MediaSource::Image(image) => match self.renderer.upload_rgba(image) {
                Ok(texture) => Some(texture),
                Err(err) => {
                    self.show_prompt(format!("Could not display {}: {}", name, err));
                    return Err(err.into());
                }
            },
            MediaSource::Video(_) => None,
        };

        self.session.reset(&mut self.renderer);
        self.cursor = self.session.mode().cursor();
        self.viewport.teardown(&mut self.renderer);
        self.listeners.prune();

        self.generation += 1;
        let rect = self.viewport.rect();
        self.viewport = Viewport::new(self.generation, rect, self.config.camera);
        if let Some(texture) = texture {
            self.viewport.set_panorama(texture, &mut self.renderer);
        }
        self.viewport.set_source_size(media.native_size());
        self.register_listeners();
        self.media = Some(media);
        log::info!("Loaded {} as generation {}", name, self.generation);
        Ok(())
    }

    fn scene_snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            panorama: self.viewport.panorama(),
            nodes: self.session.scene_nodes(),
        }
    }

    /// Upload the newest video frame, if there is one.
    fn pump_video(&mut self) -> Result<(), RenderError> {
        let Some(video) = self.media.as_mut().and_then(MediaSource::video_mut) else {
            return Ok(());
        };
        let size = video.dimensions();
        let frame = video.take_frame();
        if self.viewport.source_size().is_none() && size.is_some() {
            log::debug!("Video size known: {:?}", size);
        }
        self.viewport.set_source_size(size);
        if let Some(frame) = frame {
            let texture = self.renderer.upload_rgba(&frame)?;
            self.viewport.set_panorama(texture, &mut self.renderer);
        }
        Ok(())
    }

    /// Render one frame of the current viewport.
    ///
    /// Also delivers an export whose readback landed since the last frame.
    pub fn frame(&mut self) -> Result<FrameOutcome, RenderError> {
        self.poll_export();
        self.pump_video()?;
        let scene = self.scene_snapshot();
        self.viewport.frame(&mut self.renderer, &scene)
    }

    /// Start exporting the annotated panorama through the configured sink.
    ///
    /// Delivery happens here when the renderer reads back synchronously,
    /// otherwise from a later [`PanoApp::frame`].
    pub fn export(&mut self, format: ExportFormat) {
        if let Some(pending) = &self.pending_export {
            log::info!("{} export still in progress", pending.format().name());
            return;
        }
        match export::begin_export(&mut self.renderer, &mut self.session, &self.viewport, format) {
            Ok(pending) => {
                self.pending_export = Some(pending);
                self.poll_export();
            }
            Err(err) => self.show_prompt(format!("Export failed: {}", err)),
        }
    }

    pub fn export_in_progress(&self) -> bool {
        self.pending_export.is_some()
    }

    /// Hand a finished export to the sink. Returns the delivered image.
    pub fn poll_export(&mut self) -> Option<ExportedImage> {
        let result = self.pending_export.as_mut()?.poll()?;
        self.pending_export = None;
        match result.and_then(|image| self.sink.deliver(&image).map(|()| image)) {
            Ok(image) => Some(image),
            Err(err) => {
                self.show_prompt(format!("Export failed: {}", err));
                None
            }
        }
    }

    fn toggle_playback(&mut self) {
        if let Some(video) = self.media.as_mut().and_then(MediaSource::video_mut) {
            let playing = media::toggle_play(video);
            log::debug!("Video {}", if playing { "playing" } else { "paused" });
        }
    }

    pub fn update(&mut self, message: Message) {
        match message {
            Message::SetMode(mode) => {
                self.cursor = self.session.set_mode(mode);
            }
            Message::ToggleMode(mode) => {
                let next = if self.session.mode() == mode {
                    InteractionMode::Navigate
                } else {
                    mode
                };
                self.cursor = self.session.set_mode(next);
            }
            Message::Cancel => {
                if self.session.mode() == InteractionMode::Navigate {
                    self.session.deselect();
                } else {
                    self.cursor = self.session.set_mode(InteractionMode::Navigate);
                }
            }
            Message::LabelTextChanged(text) => self.session.set_pending_text(text),
            Message::LabelColorChanged(color) => self.session.set_label_color(color),
            Message::ArrowColorChanged(color) => self.session.set_arrow_color(color),
            Message::ClearAll => {
                self.session.clear_all(&mut self.renderer);
                log::info!("Cleared all annotations");
            }
            Message::Export(format) => {
                self.config.preferences.export_format = format;
                self.export(format);
            }

            Message::PointerDown(position) => {
                self.session.pointer_down(position, &mut self.viewport);
                self.viewport.camera_mut().pointer_pressed(position);
            }
            Message::PointerMove(position) => {
                self.session.pointer_move(position, &self.viewport);
                let height = self.viewport.rect().height;
                self.viewport.camera_mut().pointer_moved(position, height);
            }
            Message::PointerUp(position) => {
                self.viewport.camera_mut().pointer_released();
                match self
                    .session
                    .pointer_up(position, &mut self.viewport, &mut self.renderer)
                {
                    Ok(PointerOutcome::Missed { .. }) => self.toggle_playback(),
                    Ok(_) => {}
                    Err(err) => self.report(err),
                }
                self.cursor = self.session.mode().cursor();
            }
            Message::Zoom(lines) => self.viewport.camera_mut().zoom(lines),
            Message::Resized { width, height } => self.viewport.resize(width, height),
            Message::ResetCamera => self.viewport.camera_mut().reset(),

            Message::Delete => {
                self.session.delete_selection(&mut self.renderer);
            }
            Message::ChangeColor(color) => {
                if let Err(err) = self.session.recolor_selection(color, &mut self.renderer) {
                    self.report(err);
                }
            }
            Message::ChangeText(text) => {
                if let Err(err) = self.session.retext_selection(&text, &mut self.renderer) {
                    self.report(err);
                }
            }
            Message::ChangeScale(scale) => {
                self.session.rescale_selection(scale);
            }
            Message::SetGizmoMode(mode) => {
                if !self.session.set_gizmo_mode(mode) {
                    log::debug!("{} is not available for this annotation", mode.name());
                }
            }
            Message::ClosePanel => {
                self.session.deselect();
            }

            Message::TogglePlayback => self.toggle_playback(),
            Message::Rewind => {
                if let Some(video) = self.media.as_mut().and_then(MediaSource::video_mut) {
                    media::rewind(video);
                }
            }
            Message::FastForward => {
                if let Some(video) = self.media.as_mut().and_then(MediaSource::video_mut) {
                    media::fast_forward(video);
                }
            }
            Message::DismissPrompt => self.prompt = None,
        }
    }

    pub fn panel_state(&self) -> PanelState {
        let selection = self.session.selected().map(|annotation| {
            let (text, scale) = match annotation.kind() {
                AnnotationKind::TextLabel(label) => (Some(label.text().to_string()), Some(label.user_scale())),
                AnnotationKind::Arrow(_) => (None, None),
            };
            SelectionPanel {
                id: annotation.id(),
                annotation_type: annotation.annotation_type(),
                color: annotation.color(),
                text,
                scale,
                gizmo_mode: self.session.gizmo().mode(),
                rotate_available: self.session.gizmo().rotate_allowed(),
            }
        });
        let video_playing = match &self.media {
            Some(MediaSource::Video(video)) => Some(!video.is_paused()),
            _ => None,
        };
        PanelState {
            mode: self.session.mode(),
            cursor: self.cursor,
            label_text: self.session.pending_text().to_string(),
            label_color: self.session.label_color(),
            arrow_color: self.session.arrow_color(),
            selection,
            annotation_count: self.session.annotations().len(),
            export_enabled: self.viewport.panorama().is_some() && self.pending_export.is_none(),
            export_format: self.config.preferences.export_format,
            video_playing,
            prompt: self.prompt.clone(),
        }
    }
}
