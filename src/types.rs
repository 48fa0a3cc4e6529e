use std::time::Instant;

use serde::{Deserialize, Deserializer, Serialize};

/// One snapshot from the state source. Replaces whatever came before it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub current_time: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    /// An explicit `null` counts as playing
    #[serde(default, deserialize_with = "null_as_false")]
    pub paused: bool,
    /// Identity token of the current artwork (compared, never inspected)
    #[serde(default)]
    pub image_file: Option<String>,
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl PlaybackState {
    /// Parse an inbound text frame. A bare `null` means nothing is playing.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let parsed: Option<PlaybackState> = serde_json::from_str(text)?;
        Ok(parsed.unwrap_or_default())
    }

    /// No title is the "nothing playing" signal
    pub fn is_idle(&self) -> bool {
        self.title.is_none()
    }

    /// Current position and duration, when both are usable for display.
    pub fn timing(&self) -> Option<(f64, f64)> {
        match (self.current_time, self.duration) {
            (Some(current), Some(duration))
                if current.is_finite() && current >= 0.0 && duration.is_finite() && duration > 0.0 =>
            {
                Some((current, duration))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Which top-level view the surface shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Nothing applied yet
    Unset,
    /// Waiting placeholder, no track
    Idle,
    Track,
}

/// Last reported playback position and when it arrived.
#[derive(Debug, Clone, Copy)]
pub struct PositionAnchor {
    pub seconds: f64,
    pub received_at: Instant,
}

/// What has already been applied to the display surface.
#[derive(Debug, Clone)]
pub struct RenderState {
    pub last_image_token: Option<String>,
    pub is_playing: bool,
    pub last_seed: u32,
    pub last_identity: Option<String>,
    pub mode: DisplayMode,
    pub position: Option<PositionAnchor>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            last_image_token: None,
            is_playing: false,
            last_seed: 0,
            last_identity: None,
            mode: DisplayMode::Unset,
            position: None,
        }
    }
}

impl RenderState {
    /// Time base for the procedural ring.
    ///
    /// Extrapolates the last positive playback position while playing and
    /// falls back to `wall_clock_secs` when no position is known.
    pub fn time_base(&self, now: Instant, wall_clock_secs: f64) -> f64 {
        match self.position {
            Some(anchor) if self.is_playing => {
                anchor.seconds + now.saturating_duration_since(anchor.received_at).as_secs_f64()
            }
            Some(anchor) => anchor.seconds,
            None => wall_clock_secs,
        }
    }
}
