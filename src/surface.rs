use std::sync::Arc;

use image::RgbaImage;
use parking_lot::Mutex;

use crate::animation::RingSample;
use crate::artwork::{Artwork, ArtworkLoader, ArtworkSlot};
use crate::compositor::{Compositor, FrameView};
use crate::error::WidgetError;
use crate::types::DisplayMode;

/// Everything the pipeline can change on screen.
///
/// Implementations apply each call immediately and must not block: calls
/// are made while the session lock is held.
pub trait DisplaySurface {
    /// Switch between the waiting view and the track view
    fn set_mode(&mut self, mode: DisplayMode);

    fn set_title(&mut self, title: &str);

    fn set_artist(&mut self, artist: &str);

    /// `None` hides the time line
    fn set_time(&mut self, text: Option<&str>);

    /// Played fraction in `[0, 1]`, `None` hides the bar
    fn set_progress(&mut self, fraction: Option<f64>);

    fn set_playing(&mut self, playing: bool);

    /// Start loading artwork from `url`. Completion is the surface's concern.
    fn load_artwork(&mut self, url: &str);

    /// Drop the current artwork, showing `placeholder` if given
    fn clear_artwork(&mut self, placeholder: Option<&str>);

    /// Platter rotation in turns
    fn set_rotation(&mut self, turns: f64);

    fn draw_ring(&mut self, samples: &[RingSample]);
}

/// Surface backed by the software compositor. Keeps the latest value of
/// every display element and draws a frame on demand.
pub struct FrameSurface {
    compositor: Compositor,
    loader: Option<Arc<ArtworkLoader>>,
    artwork: Arc<Mutex<ArtworkSlot>>,
    mode: DisplayMode,
    title: String,
    artist: String,
    time: Option<String>,
    progress: Option<f64>,
    playing: bool,
    rotation: f64,
    ring: Vec<RingSample>,
}

impl FrameSurface {
    /// `loader` is `None` for surfaces that never fetch artwork
    pub fn new(compositor: Compositor, loader: Option<ArtworkLoader>) -> Self {
        Self {
            compositor,
            loader: loader.map(Arc::new),
            artwork: Arc::new(Mutex::new(ArtworkSlot::default())),
            mode: DisplayMode::Unset,
            title: String::new(),
            artist: String::new(),
            time: None,
            progress: None,
            playing: false,
            rotation: 0.0,
            ring: Vec::new(),
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn artwork(&self) -> Artwork {
        self.artwork.lock().artwork().clone()
    }

    pub fn render_frame(&self) -> RgbaImage {
        let artwork = self.artwork();
        let view = FrameView {
            mode: self.mode,
            title: &self.title,
            artist: &self.artist,
            time: self.time.as_deref(),
            progress: self.progress,
            playing: self.playing,
            rotation: self.rotation,
            ring: &self.ring,
            artwork: &artwork,
        };
        self.compositor.compose(&view)
    }
}

impl DisplaySurface for FrameSurface {
    fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    fn set_title(&mut self, title: &str) {
        if self.title != title {
            self.title = title.to_string();
        }
    }

    fn set_artist(&mut self, artist: &str) {
        if self.artist != artist {
            self.artist = artist.to_string();
        }
    }

    fn set_time(&mut self, text: Option<&str>) {
        self.time = text.map(str::to_string);
    }

    fn set_progress(&mut self, fraction: Option<f64>) {
        self.progress = fraction;
    }

    fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    fn load_artwork(&mut self, url: &str) {
        let generation = self.artwork.lock().begin();

        let Some(loader) = self.loader.clone() else {
            self.artwork
                .lock()
                .finish(generation, Err(WidgetError::Unavailable("no artwork loader")));
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.artwork
                .lock()
                .finish(generation, Err(WidgetError::Unavailable("no async runtime")));
            return;
        };

        let slot = self.artwork.clone();
        let url = url.to_string();
        runtime.spawn(async move {
            let result = loader.fetch(&url).await;
            if !slot.lock().finish(generation, result) {
                log::debug!("Dropping superseded artwork from {}", url);
            }
        });
    }

    fn clear_artwork(&mut self, placeholder: Option<&str>) {
        self.artwork.lock().clear(placeholder);
    }

    fn set_rotation(&mut self, turns: f64) {
        self.rotation = turns;
    }

    fn draw_ring(&mut self, samples: &[RingSample]) {
        self.ring.clear();
        self.ring.extend_from_slice(samples);
    }
}
