//! Native front end: a winit window, the wgpu renderer and rfd dialogs.
//!
//! There is no widget toolkit on the desktop, so the toolbar lives on the
//! keyboard. Editor keys (modes, delete, gizmo, video transport) go through
//! the viewport listeners; window shortcuts come from [`window_input::shortcut`].
//! Files can also be dropped on the window.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec2;
use panomark_gpu::{GpuContext, GpuError};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::app::PanoApp;
use crate::config::AppConfig;
use crate::export::{self, ExportSink, ExportedImage};
use crate::input::{InputEvent, Key, Modifiers};
use crate::media;
use crate::message::Message;
use crate::render::glyphs::CosmicTextRasterizer;
use crate::render::gpu::GpuSceneRenderer;
use crate::session::CursorIcon;
use crate::window_input::{self, Shortcut};

const WINDOW_TITLE: &str = "panomark";
const DEFAULT_WINDOW_SIZE: (f64, f64) = (1280.0, 720.0);
const MIN_WINDOW_SIZE: (f64, f64) = (480.0, 320.0);

/// Extensions offered by the open dialog.
const OPEN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "mp4", "webm", "flv"];

/// Command line options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeOptions {
    /// Panorama to open on startup.
    pub panorama: Option<PathBuf>,
    /// Initial text for the label tool.
    pub label_text: Option<String>,
}

impl NativeOptions {
    /// Parse `[PANORAMA] [--label TEXT]`.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Self {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--label" | "-l" => options.label_text = args.next(),
                _ if options.panorama.is_none() => options.panorama = Some(PathBuf::from(arg)),
                _ => log::warn!("Ignoring extra argument '{}'", arg),
            }
        }
        options
    }
}

/// Saves exports through a native save dialog.
struct DialogSink;

impl ExportSink for DialogSink {
    fn deliver(&mut self, image: &ExportedImage) -> export::Result<()> {
        let extension = Path::new(&image.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("png");
        let Some(path) = rfd::FileDialog::new()
            .set_title("Export panorama")
            .set_file_name(&image.file_name)
            .add_filter(image.mime_type, &[extension])
            .save_file()
        else {
            log::info!("Export of {} cancelled", image.file_name);
            return Ok(());
        };
        std::fs::write(&path, &image.bytes)?;
        log::info!(
            "Saved {}x{} export to {}",
            image.width,
            image.height,
            path.display()
        );
        Ok(())
    }
}

fn create_renderer(window: Arc<Window>) -> Result<GpuSceneRenderer, GpuError> {
    let ctx = pollster::block_on(GpuContext::new(window))?;
    Ok(GpuSceneRenderer::new(ctx))
}

struct NativeApp {
    options: NativeOptions,
    config: AppConfig,
    window: Option<Arc<Window>>,
    app: Option<PanoApp<GpuSceneRenderer>>,
    cursor_position: Vec2,
    modifiers: Modifiers,
    shown_cursor: CursorIcon,
}

impl NativeApp {
    fn new(options: NativeOptions, config: AppConfig) -> Self {
        Self {
            options,
            config,
            window: None,
            app: None,
            cursor_position: Vec2::ZERO,
            modifiers: Modifiers::default(),
            shown_cursor: CursorIcon::Default,
        }
    }

    fn open_path(&mut self, path: &Path) {
        let Some(app) = self.app.as_mut() else {
            return;
        };
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match std::fs::read(path) {
            Ok(bytes) => {
                if let Err(err) = app.load_media(&name, bytes, media::no_video) {
                    log::error!("Failed to load {}: {}", path.display(), err);
                } else if let Some(window) = &self.window {
                    window.set_title(&format!("{} - {}", WINDOW_TITLE, name));
                }
            }
            Err(err) => log::error!("Failed to read {}: {}", path.display(), err),
        }
    }

    fn open_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .set_title("Open panorama")
            .add_filter("Panoramas", OPEN_EXTENSIONS)
            .pick_file();
        if let Some(path) = picked {
            self.open_path(&path);
        }
    }

    /// Window-level shortcuts. Returns true when the key was consumed.
    fn handle_shortcut(&mut self, key: Key) -> bool {
        let Some(app) = self.app.as_mut() else {
            return false;
        };
        match window_input::shortcut(key, self.modifiers, &app.panel_state()) {
            Some(Shortcut::OpenFile) => self.open_dialog(),
            Some(Shortcut::Send(message)) => app.update(message),
            None => return false,
        }
        true
    }

    /// Surface prompts and cursor changes after the app handled an event.
    fn sync_ui(&mut self) {
        let (Some(app), Some(window)) = (self.app.as_mut(), self.window.as_ref()) else {
            return;
        };
        if let Some(text) = app.take_prompt() {
            rfd::MessageDialog::new()
                .set_title(WINDOW_TITLE)
                .set_description(&text)
                .set_level(rfd::MessageLevel::Warning)
                .show();
        }
        let cursor = app.cursor();
        if cursor != self.shown_cursor {
            window.set_cursor(window_input::translate_cursor(cursor));
            self.shown_cursor = cursor;
        }
    }

    fn save_config(&self) {
        let config = self.app.as_ref().map_or(&self.config, |app| app.config());
        if let Err(err) = config.save_to_default_path() {
            log::warn!("Failed to save config: {}", err);
        }
    }
}

impl ApplicationHandler for NativeApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(DEFAULT_WINDOW_SIZE.0, DEFAULT_WINDOW_SIZE.1))
            .with_min_inner_size(LogicalSize::new(MIN_WINDOW_SIZE.0, MIN_WINDOW_SIZE.1));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        let renderer = match create_renderer(window.clone()) {
            Ok(renderer) => renderer,
            Err(err) => {
                log::error!("Failed to initialize GPU: {}", err);
                event_loop.exit();
                return;
            }
        };
        let size = window.inner_size();
        let mut app = PanoApp::new(
            renderer,
            self.config.clone(),
            Box::new(CosmicTextRasterizer::new()),
            Box::new(DialogSink),
            (size.width.max(1), size.height.max(1)),
        );
        if let Some(text) = self.options.label_text.take() {
            app.update(Message::LabelTextChanged(text));
        }
        log::info!("Window created ({}x{})", size.width, size.height);

        self.window = Some(window);
        self.app = Some(app);
        if let Some(path) = self.options.panorama.take() {
            self.open_path(&path);
        }
        self.sync_ui();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.save_config();
                event_loop.exit();
                return;
            }
            WindowEvent::DroppedFile(path) => self.open_path(&path),
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = window_input::translate_modifiers(modifiers.state());
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if let Some(key) = window_input::translate_key(&event.logical_key) {
                    if !self.handle_shortcut(key) {
                        if let Some(app) = self.app.as_mut() {
                            app.handle_input(InputEvent::KeyPressed {
                                key,
                                modifiers: self.modifiers,
                            });
                        }
                    }
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(app) = self.app.as_mut() {
                    app.handle_input(InputEvent::Resized {
                        width: size.width,
                        height: size.height,
                    });
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_position = window_input::physical_to_vec2(position);
                if let Some(app) = self.app.as_mut() {
                    app.handle_input(InputEvent::PointerMoved {
                        position: self.cursor_position,
                    });
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(app) = self.app.as_mut() {
                    let button = window_input::translate_button(button);
                    let position = self.cursor_position;
                    app.handle_input(match state {
                        ElementState::Pressed => InputEvent::PointerPressed { button, position },
                        ElementState::Released => InputEvent::PointerReleased { button, position },
                    });
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = window_input::wheel_lines(delta);
                if let Some(app) = self.app.as_mut() {
                    app.handle_input(InputEvent::Wheel {
                        lines,
                        position: self.cursor_position,
                    });
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(app) = self.app.as_mut() {
                    if let Err(err) = app.frame() {
                        log::error!("Frame failed: {}", err);
                    }
                }
            }
            _ => {}
        }
        self.sync_ui();
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Open the editor window and run until it is closed.
pub fn run(options: NativeOptions, config: AppConfig) -> Result<(), winit::error::EventLoopError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut handler = NativeApp::new(options, config);
    event_loop.run_app(&mut handler)
}
