//! Media detection and the panorama source.
//!
//! Files are classified by their leading bytes, never by extension. Images are
//! decoded with the `image` crate; video playback belongs to the platform and is
//! reached through [`VideoPlayback`].

use image::RgbaImage;
use thiserror::Error;

use crate::constants::media::{SEEK_STEP_SECONDS, SNIFF_LEN};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{name} is neither an image nor a video")]
    Unsupported { name: String },

    #[error("Failed to decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Video playback is not available on this platform")]
    VideoUnavailable,
}

pub type Result<T> = std::result::Result<T, MediaError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

fn is_jpeg(b: &[u8]) -> bool {
    b.starts_with(&[0xFF, 0xD8, 0xFF])
}

fn is_png(b: &[u8]) -> bool {
    b.starts_with(&[0x89, 0x50, 0x4E, 0x47])
}

fn is_gif(b: &[u8]) -> bool {
    b.starts_with(b"GIF")
}

fn is_bmp(b: &[u8]) -> bool {
    b.starts_with(b"BM")
}

fn is_mp4(b: &[u8]) -> bool {
    b.len() >= 8 && &b[4..8] == b"ftyp"
}

fn is_webm(b: &[u8]) -> bool {
    b.starts_with(&[0x1A, 0x45, 0xDF, 0xA3])
}

fn is_flv(b: &[u8]) -> bool {
    b.starts_with(b"FLV")
}

/// Classify a file from its first bytes.
pub fn detect_media_kind(bytes: &[u8]) -> Option<MediaKind> {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    if is_jpeg(head) || is_png(head) || is_gif(head) || is_bmp(head) {
        Some(MediaKind::Image)
    } else if is_mp4(head) || is_webm(head) || is_flv(head) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Platform video element showing an equirectangular movie.
pub trait VideoPlayback {
    fn is_paused(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    fn current_time(&self) -> f64;
    /// Total length in seconds; may be unknown until metadata loads.
    fn duration(&self) -> Option<f64>;
    fn seek(&mut self, seconds: f64);
    /// Native frame size, once known.
    fn dimensions(&self) -> Option<(u32, u32)>;
    /// The frame to show now, if a new one is available.
    fn take_frame(&mut self) -> Option<RgbaImage>;
}

/// Play if paused, pause if playing. Returns whether the video is now playing.
pub fn toggle_play(video: &mut dyn VideoPlayback) -> bool {
    if video.is_paused() {
        video.play();
        true
    } else {
        video.pause();
        false
    }
}

/// Move the play head by `delta` seconds, clamped to the video.
pub fn adjust_time(video: &mut dyn VideoPlayback, delta: f64) {
    let target = video.current_time() + delta;
    let end = video.duration().unwrap_or(f64::INFINITY);
    video.seek(target.clamp(0.0, end.max(0.0)));
}

pub fn rewind(video: &mut dyn VideoPlayback) {
    adjust_time(video, -SEEK_STEP_SECONDS);
}

pub fn fast_forward(video: &mut dyn VideoPlayback) {
    adjust_time(video, SEEK_STEP_SECONDS);
}

/// The loaded panorama.
pub enum MediaSource {
    Image(RgbaImage),
    Video(Box<dyn VideoPlayback>),
}

impl std::fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaSource::Image(image) => write!(f, "Image({}x{})", image.width(), image.height()),
            MediaSource::Video(video) => write!(f, "Video({:?})", video.dimensions()),
        }
    }
}

impl MediaSource {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaSource::Image(_) => MediaKind::Image,
            MediaSource::Video(_) => MediaKind::Video,
        }
    }

    /// Native resolution, unknown for video until its metadata arrives.
    pub fn native_size(&self) -> Option<(u32, u32)> {
        match self {
            MediaSource::Image(image) => Some(image.dimensions()),
            MediaSource::Video(video) => video.dimensions(),
        }
    }

    pub fn video_mut(&mut self) -> Option<&mut (dyn VideoPlayback + 'static)> {
        match self {
            MediaSource::Video(video) => Some(video.as_mut()),
            MediaSource::Image(_) => None,
        }
    }
}

/// Build a media source from file bytes.
///
/// Images are decoded here. Video bytes are handed to `open_video`, the
/// platform's player factory.
pub fn load_media(
    name: &str,
    bytes: Vec<u8>,
    open_video: impl FnOnce(Vec<u8>) -> Result<Box<dyn VideoPlayback>>,
) -> Result<MediaSource> {
    match detect_media_kind(&bytes) {
        Some(MediaKind::Image) => {
            let image = image::load_from_memory(&bytes)
                .map_err(|source| MediaError::Decode {
                    name: name.to_string(),
                    source,
                })?
                .to_rgba8();
            log::info!("Decoded {}: {}x{}", name, image.width(), image.height());
            Ok(MediaSource::Image(image))
        }
        Some(MediaKind::Video) => {
            log::info!("Opening video {} ({} bytes)", name, bytes.len());
            Ok(MediaSource::Video(open_video(bytes)?))
        }
        None => {
            log::warn!("Rejected {}: unknown file signature", name);
            Err(MediaError::Unsupported {
                name: name.to_string(),
            })
        }
    }
}

/// Player factory for platforms without video support.
pub fn no_video(_bytes: Vec<u8>) -> Result<Box<dyn VideoPlayback>> {
    Err(MediaError::VideoUnavailable)
}
