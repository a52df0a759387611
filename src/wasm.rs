//! Web entry point.
//!
//! winit drives a canvas appended to the page body. The renderer is created
//! asynchronously and picked up by the event loop once ready. Files from the
//! picker and calls from the page's own toolbar are queued in thread-locals
//! and drained between frames, since browser callbacks cannot borrow the app.

use std::cell::RefCell;
use std::sync::Arc;

use glam::Vec2;
use image::RgbaImage;
use panomark_gpu::{GpuContext, GpuError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Blob, BlobPropertyBag, CanvasRenderingContext2d, Document, Event, FileReader, HtmlAnchorElement,
    HtmlCanvasElement, HtmlInputElement, HtmlVideoElement, Url,
};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::web::{EventLoopExtWebSys, WindowAttributesExtWebSys};
use winit::window::{Window, WindowId};

use crate::app::PanoApp;
use crate::color::Rgb;
use crate::config::AppConfig;
use crate::export::{self, ExportError, ExportFormat, ExportSink, ExportedImage};
use crate::input::{InputEvent, Modifiers};
use crate::media::{self, MediaError, VideoPlayback};
use crate::message::Message;
use crate::render::glyphs::CosmicTextRasterizer;
use crate::render::gpu::GpuSceneRenderer;
use crate::session::{CursorIcon, InteractionMode};
use crate::window_input::{self, Shortcut};

/// `HTMLMediaElement.HAVE_CURRENT_DATA`
const HAVE_CURRENT_DATA: u16 = 2;

thread_local! {
    static PENDING_FILES: RefCell<Vec<(String, Vec<u8>)>> = const { RefCell::new(Vec::new()) };
    static PENDING_MESSAGES: RefCell<Vec<Message>> = const { RefCell::new(Vec::new()) };
    static PENDING_FONTS: RefCell<Vec<Vec<u8>>> = const { RefCell::new(Vec::new()) };
    static PENDING_RENDERER: RefCell<Option<Result<GpuSceneRenderer, GpuError>>> = const { RefCell::new(None) };
}

fn push_message(message: Message) {
    PENDING_MESSAGES.with(|pending| pending.borrow_mut().push(message));
}

fn js_error(message: &str) -> JsValue {
    JsValue::from_str(message)
}

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| js_error("no document"))
}

fn bytes_to_blob(bytes: &[u8], mime_type: Option<&str>) -> Result<Blob, JsValue> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(bytes));
    let options = BlobPropertyBag::new();
    if let Some(mime_type) = mime_type {
        options.set_type(mime_type);
    }
    Blob::new_with_u8_array_sequence_and_options(&parts, &options)
}

// ---------------------------------------------------------------------------
// Page API
// ---------------------------------------------------------------------------

/// Switch the interaction mode: `navigate`, `place_text`, `place_arrow` or `select`.
#[wasm_bindgen(js_name = setMode)]
pub fn set_mode(mode: &str) -> Result<(), JsValue> {
    let mode: InteractionMode = serde_json::from_value(serde_json::Value::String(mode.to_string()))
        .map_err(|err| js_error(&err.to_string()))?;
    push_message(Message::SetMode(mode));
    Ok(())
}

/// Provide label font data. Browsers expose no system fonts to the shaper,
/// so the page must call this before the renderer starts.
#[wasm_bindgen(js_name = loadFont)]
pub fn load_font(bytes: Vec<u8>) {
    PENDING_FONTS.with(|pending| pending.borrow_mut().push(bytes));
}

#[wasm_bindgen(js_name = setLabelText)]
pub fn set_label_text(text: String) {
    push_message(Message::LabelTextChanged(text));
}

fn parse_color(hex: &str) -> Result<Rgb, JsValue> {
    hex.parse::<Rgb>().map_err(|err| js_error(&err.to_string()))
}

#[wasm_bindgen(js_name = setLabelColor)]
pub fn set_label_color(hex: &str) -> Result<(), JsValue> {
    push_message(Message::LabelColorChanged(parse_color(hex)?));
    Ok(())
}

#[wasm_bindgen(js_name = setArrowColor)]
pub fn set_arrow_color(hex: &str) -> Result<(), JsValue> {
    push_message(Message::ArrowColorChanged(parse_color(hex)?));
    Ok(())
}

/// Recolor the selected annotation.
#[wasm_bindgen(js_name = changeSelectionColor)]
pub fn change_selection_color(hex: &str) -> Result<(), JsValue> {
    push_message(Message::ChangeColor(parse_color(hex)?));
    Ok(())
}

/// Export as `png` or `jpeg`; the result is offered as a download.
#[wasm_bindgen(js_name = exportPanorama)]
pub fn export_panorama(format: &str) -> Result<(), JsValue> {
    let format = ExportFormat::ALL
        .into_iter()
        .find(|candidate| candidate.extension() == format || candidate.name().eq_ignore_ascii_case(format))
        .ok_or_else(|| js_error(&format!("Unknown export format '{}'", format)))?;
    push_message(Message::Export(format));
    Ok(())
}

#[wasm_bindgen(js_name = clearAll)]
pub fn clear_all() {
    push_message(Message::ClearAll);
}

#[wasm_bindgen(js_name = togglePlayback)]
pub fn toggle_playback() {
    push_message(Message::TogglePlayback);
}

/// Show the browser file picker; the chosen file is loaded on the next frame.
#[wasm_bindgen(js_name = openFile)]
pub fn open_file() -> Result<(), JsValue> {
    let input: HtmlInputElement = document()?
        .create_element("input")?
        .dyn_into()
        .map_err(|_| js_error("not an input element"))?;
    input.set_type("file");
    input.set_accept("image/*,video/*");

    let onchange = Closure::wrap(Box::new(move |event: Event| {
        let Some(input) = event
            .target()
            .and_then(|target| target.dyn_into::<HtmlInputElement>().ok())
        else {
            return;
        };
        let Some(file) = input.files().and_then(|files| files.get(0)) else {
            log::warn!("No file selected");
            return;
        };
        if let Err(err) = read_file(file) {
            log::error!("Failed to read file: {:?}", err);
        }
    }) as Box<dyn FnMut(Event)>);
    input.set_onchange(Some(onchange.as_ref().unchecked_ref()));
    onchange.forget();

    input.click();
    Ok(())
}

fn read_file(file: web_sys::File) -> Result<(), JsValue> {
    let name = file.name();
    log::info!("Reading {}", name);
    let reader = FileReader::new()?;
    let onload = Closure::wrap(Box::new(move |event: Event| {
        let Some(reader) = event
            .target()
            .and_then(|target| target.dyn_into::<FileReader>().ok())
        else {
            return;
        };
        match reader.result() {
            Ok(result) => {
                let bytes = js_sys::Uint8Array::new(&result).to_vec();
                log::info!("Read {} ({} bytes)", name, bytes.len());
                PENDING_FILES.with(|pending| pending.borrow_mut().push((name.clone(), bytes)));
            }
            Err(err) => log::error!("Failed to read {}: {:?}", name, err),
        }
    }) as Box<dyn FnMut(Event)>);
    reader.set_onload(Some(onload.as_ref().unchecked_ref()));
    onload.forget();
    reader.read_as_array_buffer(&file)
}

// ---------------------------------------------------------------------------
// Export download
// ---------------------------------------------------------------------------

/// Offers exports as browser downloads.
struct DownloadSink;

impl ExportSink for DownloadSink {
    fn deliver(&mut self, image: &ExportedImage) -> export::Result<()> {
        download(image).map_err(|err| ExportError::Delivery {
            file_name: image.file_name.clone(),
            message: format!("{:?}", err),
        })
    }
}

fn download(image: &ExportedImage) -> Result<(), JsValue> {
    let blob = bytes_to_blob(&image.bytes, Some(image.mime_type))?;
    let url = Url::create_object_url_with_blob(&blob)?;
    let anchor: HtmlAnchorElement = document()?
        .create_element("a")?
        .dyn_into()
        .map_err(|_| js_error("not an anchor element"))?;
    anchor.set_href(&url);
    anchor.set_download(&image.file_name);
    anchor.click();
    Url::revoke_object_url(&url)?;
    log::info!("Downloaded {} ({} bytes)", image.file_name, image.bytes.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

/// Video playback through a hidden `<video>` element. Frames are copied out
/// through a 2D canvas.
struct HtmlVideoPlayback {
    video: HtmlVideoElement,
    context: CanvasRenderingContext2d,
    canvas: HtmlCanvasElement,
    url: String,
    last_frame_time: Option<f64>,
}

impl HtmlVideoPlayback {
    fn open(bytes: Vec<u8>) -> media::Result<Box<dyn VideoPlayback>> {
        match Self::create(&bytes) {
            Ok(playback) => Ok(Box::new(playback)),
            Err(err) => {
                log::warn!("Video element setup failed: {:?}", err);
                Err(MediaError::VideoUnavailable)
            }
        }
    }

    fn create(bytes: &[u8]) -> Result<Self, JsValue> {
        let document = document()?;
        let url = Url::create_object_url_with_blob(&bytes_to_blob(bytes, None)?)?;
        let video: HtmlVideoElement = document
            .create_element("video")?
            .dyn_into()
            .map_err(|_| js_error("not a video element"))?;
        video.set_src(&url);
        video.set_loop(true);
        video.set_muted(true);
        let canvas: HtmlCanvasElement = document
            .create_element("canvas")?
            .dyn_into()
            .map_err(|_| js_error("not a canvas element"))?;
        let context: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| js_error("2d context unavailable"))?
            .dyn_into()
            .map_err(|_| js_error("not a 2d context"))?;
        let mut playback = Self {
            video,
            context,
            canvas,
            url,
            last_frame_time: None,
        };
        playback.play();
        Ok(playback)
    }
}

impl VideoPlayback for HtmlVideoPlayback {
    fn is_paused(&self) -> bool {
        self.video.paused()
    }

    fn play(&mut self) {
        if let Err(err) = self.video.play() {
            log::warn!("Video play failed: {:?}", err);
        }
    }

    fn pause(&mut self) {
        if let Err(err) = self.video.pause() {
            log::warn!("Video pause failed: {:?}", err);
        }
    }

    fn current_time(&self) -> f64 {
        self.video.current_time()
    }

    fn duration(&self) -> Option<f64> {
        let duration = self.video.duration();
        duration.is_finite().then_some(duration)
    }

    fn seek(&mut self, seconds: f64) {
        self.video.set_current_time(seconds);
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        let (width, height) = (self.video.video_width(), self.video.video_height());
        (width > 0 && height > 0).then_some((width, height))
    }

    fn take_frame(&mut self) -> Option<RgbaImage> {
        if self.video.ready_state() < HAVE_CURRENT_DATA {
            return None;
        }
        let time = self.video.current_time();
        if self.last_frame_time == Some(time) {
            return None;
        }
        let (width, height) = self.dimensions()?;
        if self.canvas.width() != width || self.canvas.height() != height {
            self.canvas.set_width(width);
            self.canvas.set_height(height);
        }
        self.context
            .draw_image_with_html_video_element(&self.video, 0.0, 0.0)
            .ok()?;
        let data = self
            .context
            .get_image_data(0.0, 0.0, width as f64, height as f64)
            .ok()?;
        self.last_frame_time = Some(time);
        RgbaImage::from_raw(width, height, data.data().0)
    }
}

impl Drop for HtmlVideoPlayback {
    fn drop(&mut self) {
        if let Err(err) = self.video.pause() {
            log::debug!("Video pause on drop failed: {:?}", err);
        }
        if let Err(err) = Url::revoke_object_url(&self.url) {
            log::debug!("Failed to revoke video URL: {:?}", err);
        }
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

struct WebApp {
    config: AppConfig,
    window: Option<Arc<Window>>,
    app: Option<PanoApp<GpuSceneRenderer>>,
    cursor_position: Vec2,
    modifiers: Modifiers,
    shown_cursor: CursorIcon,
}

impl WebApp {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            window: None,
            app: None,
            cursor_position: Vec2::ZERO,
            modifiers: Modifiers::default(),
            shown_cursor: CursorIcon::Default,
        }
    }

    fn create_canvas() -> Result<HtmlCanvasElement, JsValue> {
        let document = document()?;
        let canvas: HtmlCanvasElement = document
            .create_element("canvas")?
            .dyn_into()
            .map_err(|_| js_error("not a canvas element"))?;
        canvas.set_id("panomark-canvas");
        let body = document.body().ok_or_else(|| js_error("no body"))?;
        body.append_child(&canvas)?;
        Ok(canvas)
    }

    /// Finish startup once the async renderer is ready.
    fn adopt_renderer(&mut self) {
        if self.app.is_some() {
            return;
        }
        let Some(result) = PENDING_RENDERER.with(|pending| pending.borrow_mut().take()) else {
            return;
        };
        let renderer = match result {
            Ok(renderer) => renderer,
            Err(err) => {
                log::error!("Failed to initialize GPU: {}", err);
                return;
            }
        };
        let Some(window) = &self.window else {
            return;
        };
        let mut rasterizer = CosmicTextRasterizer::new();
        let fonts = PENDING_FONTS.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
        if fonts.is_empty() {
            log::warn!("No label font loaded, text labels will be blank");
        }
        for font in fonts {
            rasterizer.load_font_data(font);
        }
        let size = window.inner_size();
        self.app = Some(PanoApp::new(
            renderer,
            self.config.clone(),
            Box::new(rasterizer),
            Box::new(DownloadSink),
            (size.width.max(1), size.height.max(1)),
        ));
        log::info!("Renderer ready ({}x{})", size.width, size.height);
    }

    fn drain_pending(&mut self) {
        let Some(app) = self.app.as_mut() else {
            return;
        };
        let files = PENDING_FILES.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
        for (name, bytes) in files {
            if let Err(err) = app.load_media(&name, bytes, HtmlVideoPlayback::open) {
                log::error!("Failed to load {}: {}", name, err);
            }
        }
        let messages = PENDING_MESSAGES.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
        for message in messages {
            let is_export = matches!(message, Message::Export(_));
            app.update(message);
            if is_export {
                if let Err(err) = app.config().save_to_local_storage() {
                    log::warn!("Failed to save config: {}", err);
                }
            }
        }
    }

    fn sync_ui(&mut self) {
        let (Some(app), Some(window)) = (self.app.as_mut(), self.window.as_ref()) else {
            return;
        };
        if let Some(text) = app.take_prompt() {
            if let Some(browser) = web_sys::window() {
                if let Err(err) = browser.alert_with_message(&text) {
                    log::warn!("alert failed: {:?}", err);
                }
            }
        }
        let cursor = app.cursor();
        if cursor != self.shown_cursor {
            window.set_cursor(window_input::translate_cursor(cursor));
            self.shown_cursor = cursor;
        }
    }
}

impl ApplicationHandler for WebApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let canvas = match Self::create_canvas() {
            Ok(canvas) => canvas,
            Err(err) => {
                log::error!("Failed to create canvas: {:?}", err);
                event_loop.exit();
                return;
            }
        };
        let attributes = Window::default_attributes()
            .with_title("panomark")
            .with_canvas(Some(canvas));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        let gpu_window = window.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = GpuContext::new(gpu_window).await.map(GpuSceneRenderer::new);
            PENDING_RENDERER.with(|pending| *pending.borrow_mut() = Some(result));
        });
        self.window = Some(window);
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let WindowEvent::ModifiersChanged(modifiers) = &event {
            self.modifiers = window_input::translate_modifiers(modifiers.state());
            return;
        }
        let Some(app) = self.app.as_mut() else {
            return;
        };
        match event {
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if let Some(key) = window_input::translate_key(&event.logical_key) {
                    match window_input::shortcut(key, self.modifiers, &app.panel_state()) {
                        Some(Shortcut::OpenFile) => {
                            if let Err(err) = open_file() {
                                log::error!("File picker failed: {:?}", err);
                            }
                        }
                        Some(Shortcut::Send(message)) => app.update(message),
                        None => app.handle_input(InputEvent::KeyPressed {
                            key,
                            modifiers: self.modifiers,
                        }),
                    }
                }
            }
            WindowEvent::Resized(size) => app.handle_input(InputEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_position = window_input::physical_to_vec2(position);
                app.handle_input(InputEvent::PointerMoved {
                    position: self.cursor_position,
                });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = window_input::translate_button(button);
                let position = self.cursor_position;
                app.handle_input(match state {
                    ElementState::Pressed => InputEvent::PointerPressed { button, position },
                    ElementState::Released => InputEvent::PointerReleased { button, position },
                });
            }
            WindowEvent::MouseWheel { delta, .. } => app.handle_input(InputEvent::Wheel {
                lines: window_input::wheel_lines(delta),
                position: self.cursor_position,
            }),
            WindowEvent::RedrawRequested => {
                if let Err(err) = app.frame() {
                    log::error!("Frame failed: {}", err);
                }
            }
            _ => {}
        }
        self.sync_ui();
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.adopt_renderer();
        self.drain_pending();
        self.sync_ui();
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let config = AppConfig::load_from_local_storage().unwrap_or_default();
    if let Err(err) = console_log::init_with_level(config.preferences.log_level.level()) {
        web_sys::console::log_1(&format!("Logger setup failed: {}", err).into());
    }
    log::info!("panomark {} starting", env!("CARGO_PKG_VERSION"));
    log::info!("Note: winit uses exceptions for control flow, exception errors in the console are expected");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {}", err);
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.spawn_app(WebApp::new(config));
}
