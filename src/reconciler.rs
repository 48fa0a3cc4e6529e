use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::config::DisplayPolicy;
use crate::format::format_position;
use crate::seed::{identity_key, seed_from};
use crate::surface::DisplaySurface;
use crate::types::{DisplayMode, PlaybackState, PositionAnchor, RenderState};

/// Turns incoming playback snapshots into display mutations, using the
/// render state as the record of what is already on screen.
#[derive(Debug, Clone)]
pub struct Reconciler {
    policy: DisplayPolicy,
    artwork_url: String,
}

impl Reconciler {
    pub fn new(policy: DisplayPolicy, artwork_url: impl Into<String>) -> Self {
        Self {
            policy,
            artwork_url: artwork_url.into(),
        }
    }

    /// Apply one snapshot. Runs to completion without yielding.
    pub fn apply<S>(&self, render: &mut RenderState, state: &PlaybackState, surface: &mut S, now: Instant)
    where
        S: DisplaySurface + ?Sized,
    {
        let Some(raw_title) = state.title.as_deref() else {
            self.apply_idle(render, surface);
            return;
        };
        let raw_artist = state.artist.as_deref().unwrap_or("");

        Self::switch_mode(render, surface, DisplayMode::Track);

        let title = if raw_title.is_empty() {
            self.policy.unknown_title.as_str()
        } else {
            raw_title
        };
        let artist = if raw_artist.is_empty() {
            self.policy.unknown_artist.as_str()
        } else {
            raw_artist
        };
        surface.set_title(title);
        surface.set_artist(artist);

        // Time line is hidden rather than left stale when either side is missing
        match state.timing() {
            Some((current, duration)) => {
                surface.set_time(Some(&format_position(current, duration)));
                if self.policy.show_progress {
                    surface.set_progress(Some((current / duration).clamp(0.0, 1.0)));
                }
            }
            None => {
                surface.set_time(None);
                if self.policy.show_progress {
                    surface.set_progress(None);
                }
            }
        }

        render.is_playing = !state.paused;
        surface.set_playing(render.is_playing);

        render.position = state
            .current_time
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .map(|seconds| PositionAnchor {
                seconds,
                received_at: now,
            });

        if state.image_file != render.last_image_token {
            render.last_image_token = state.image_file.clone();
            match &state.image_file {
                Some(token) => {
                    log::debug!("Artwork changed to {}", token);
                    surface.load_artwork(&self.cache_busted_url());
                }
                None => {
                    log::debug!("Artwork cleared");
                    surface.clear_artwork(self.policy.artwork_placeholder.as_deref());
                }
            }
        }

        let identity = identity_key(raw_title, raw_artist);
        if render.last_identity.as_deref() != Some(identity.as_str()) {
            render.last_seed = seed_from(&identity);
            log::info!("Now playing: {} - {} (seed {})", title, artist, render.last_seed);
            render.last_identity = Some(identity);
        }
    }

    fn apply_idle<S>(&self, render: &mut RenderState, surface: &mut S)
    where
        S: DisplaySurface + ?Sized,
    {
        if render.mode != DisplayMode::Idle {
            log::info!("Nothing playing");
        }
        Self::switch_mode(render, surface, DisplayMode::Idle);

        surface.set_title(&self.policy.idle_title);
        surface.set_artist("");
        let idle_time = Some(self.policy.idle_time.as_str()).filter(|text| !text.is_empty());
        surface.set_time(idle_time);
        if self.policy.show_progress {
            surface.set_progress(None);
        }

        render.is_playing = false;
        render.position = None;
        surface.set_playing(false);
    }

    fn switch_mode<S>(render: &mut RenderState, surface: &mut S, mode: DisplayMode)
    where
        S: DisplaySurface + ?Sized,
    {
        if render.mode != mode {
            render.mode = mode;
            surface.set_mode(mode);
        }
    }

    fn cache_busted_url(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or(0);
        format!("{}?t={}", self.artwork_url, millis)
    }
}
