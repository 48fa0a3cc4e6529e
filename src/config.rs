use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

use anyhow::Context;
use serde::Deserialize;

use crate::error::WidgetResult;

/// Environment variable that overrides the streaming host.
pub const HOST_ENV: &str = "NOW_PLAYING_HOST";

const CONFIG_FILE: &str = "now-playing.toml";

#[derive(Debug, Clone, Default)]
pub struct WidgetConfig {
    pub connection: ConnectionConfig,
    pub display: DisplayPolicy,
    pub animation: AnimationConfig,
    pub output: OutputConfig,
}

impl WidgetConfig {
    /// Load the first config file found next to the working directory or the
    /// executable, falling back to defaults. `NOW_PLAYING_HOST` wins over
    /// the file's host.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match Self::find_file() {
            Some(path) => {
                let data = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                log::info!("Loaded config from {}", path.display());
                Self::from_toml_str(&data)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))?
            }
            None => Self::default(),
        };

        if let Ok(host) = env::var(HOST_ENV) {
            log::info!("Using streaming host from {}: {}", HOST_ENV, host);
            config.connection.host = host;
        }

        Ok(config)
    }

    pub fn from_toml_str(data: &str) -> WidgetResult<Self> {
        let doc: ConfigDocument = toml::from_str(data)?;
        Ok(doc.into())
    }

    fn find_file() -> Option<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = env::current_dir() {
            candidates.push(current_dir.join(CONFIG_FILE));
            candidates.push(current_dir.join("config").join(CONFIG_FILE));
        }

        if let Ok(exe) = env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.push(dir.join(CONFIG_FILE));
                candidates.push(dir.join("config").join(CONFIG_FILE));
            }
        }

        candidates.into_iter().find(|path| path.exists())
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// `host[:port]` of the state source; the socket is `ws://<host>`
    pub host: String,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:8080".to_string(),
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl ConnectionConfig {
    pub fn socket_url(&self) -> String {
        format!("ws://{}", self.host)
    }

    pub fn artwork_url(&self) -> String {
        format!("http://{}/image", self.host)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetVariant {
    NeonVinyl,
    Prism,
}

/// Text and placeholder choices that differ between widget variants.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayPolicy {
    pub variant: WidgetVariant,
    pub unknown_title: String,
    pub unknown_artist: String,
    /// Glyph shown instead of artwork; `None` hides the artwork slot
    pub artwork_placeholder: Option<String>,
    pub idle_title: String,
    pub idle_time: String,
    pub show_progress: bool,
    pub ring: bool,
}

impl DisplayPolicy {
    pub fn for_variant(variant: WidgetVariant) -> Self {
        match variant {
            WidgetVariant::NeonVinyl => Self {
                variant,
                unknown_title: "Unknown".to_string(),
                unknown_artist: String::new(),
                artwork_placeholder: None,
                idle_title: "—".to_string(),
                idle_time: "waiting".to_string(),
                show_progress: false,
                ring: true,
            },
            WidgetVariant::Prism => Self {
                variant,
                unknown_title: "Unknown".to_string(),
                unknown_artist: "Unknown Artist".to_string(),
                artwork_placeholder: Some("◇".to_string()),
                idle_title: String::new(),
                idle_time: String::new(),
                show_progress: true,
                ring: false,
            },
        }
    }
}

impl Default for DisplayPolicy {
    fn default() -> Self {
        Self::for_variant(WidgetVariant::NeonVinyl)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationConfig {
    pub fps: u32,
    /// Rotation per frame while playing, in turns
    pub spin_speed: f64,
    pub easing: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            spin_speed: 0.0025,
            easing: 0.05,
        }
    }
}

impl AnimationConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.clamp(1, 240)))
    }
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub snapshot_path: PathBuf,
    pub snapshot_interval: Duration,
    pub font_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("now-playing.png"),
            snapshot_interval: Duration::from_millis(1000),
            font_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    connection: ConnectionSection,
    #[serde(default)]
    display: DisplaySection,
    #[serde(default)]
    animation: AnimationSection,
    #[serde(default)]
    output: OutputSection,
}

impl From<ConfigDocument> for WidgetConfig {
    fn from(value: ConfigDocument) -> Self {
        let connection_defaults = ConnectionConfig::default();
        let connection = ConnectionConfig {
            host: value.connection.host.unwrap_or(connection_defaults.host),
            base_delay: value
                .connection
                .base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(connection_defaults.base_delay),
            max_delay: value
                .connection
                .max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(connection_defaults.max_delay),
        };

        let mut display =
            DisplayPolicy::for_variant(value.display.variant.unwrap_or(WidgetVariant::NeonVinyl));
        if let Some(title) = value.display.unknown_title {
            display.unknown_title = title;
        }
        if let Some(artist) = value.display.unknown_artist {
            display.unknown_artist = artist;
        }
        if let Some(title) = value.display.idle_title {
            display.idle_title = title;
        }
        if let Some(time) = value.display.idle_time {
            display.idle_time = time;
        }
        if let Some(progress) = value.display.show_progress {
            display.show_progress = progress;
        }
        if let Some(glyph) = value.display.artwork_placeholder {
            display.artwork_placeholder = if glyph.is_empty() { None } else { Some(glyph) };
        }
        if let Some(ring) = value.animation.ring {
            display.ring = ring;
        }

        let animation_defaults = AnimationConfig::default();
        let animation = AnimationConfig {
            fps: value.animation.fps.unwrap_or(animation_defaults.fps),
            spin_speed: value.animation.spin_speed.unwrap_or(animation_defaults.spin_speed),
            easing: value
                .animation
                .easing
                .unwrap_or(animation_defaults.easing)
                .clamp(0.001, 1.0),
        };

        let output_defaults = OutputConfig::default();
        let output = OutputConfig {
            snapshot_path: value.output.snapshot_path.unwrap_or(output_defaults.snapshot_path),
            snapshot_interval: value
                .output
                .snapshot_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(output_defaults.snapshot_interval),
            font_path: value.output.font_path,
        };

        WidgetConfig {
            connection,
            display,
            animation,
            output,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConnectionSection {
    host: Option<String>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DisplaySection {
    variant: Option<WidgetVariant>,
    unknown_title: Option<String>,
    unknown_artist: Option<String>,
    artwork_placeholder: Option<String>,
    idle_title: Option<String>,
    idle_time: Option<String>,
    show_progress: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct AnimationSection {
    fps: Option<u32>,
    spin_speed: Option<f64>,
    easing: Option<f64>,
    ring: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSection {
    snapshot_path: Option<PathBuf>,
    snapshot_interval_ms: Option<u64>,
    font_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = WidgetConfig::from_toml_str("").unwrap();
        assert_eq!(config.connection.host, "127.0.0.1:8080");
        assert_eq!(config.connection.base_delay, Duration::from_secs(1));
        assert_eq!(config.connection.max_delay, Duration::from_secs(10));
        assert_eq!(config.display, DisplayPolicy::for_variant(WidgetVariant::NeonVinyl));
        assert_eq!(config.animation, AnimationConfig::default());
    }

    #[test]
    fn prism_variant_with_overrides() {
        let config = WidgetConfig::from_toml_str(
            r#"
            [connection]
            host = "widget.local:9000"
            base_delay_ms = 2000

            [display]
            variant = "prism"
            artwork_placeholder = ""
            unknown_title = "Untitled"
            idle_title = "Idle"
            idle_time = "paused"
            show_progress = false

            [animation]
            fps = 30
            ring = true
            "#,
        )
        .unwrap();

        assert_eq!(config.connection.socket_url(), "ws://widget.local:9000");
        assert_eq!(config.connection.artwork_url(), "http://widget.local:9000/image");
        assert_eq!(config.connection.base_delay, Duration::from_secs(2));
        assert_eq!(config.display.variant, WidgetVariant::Prism);
        assert_eq!(config.display.unknown_artist, "Unknown Artist");
        assert_eq!(config.display.artwork_placeholder, None);
        assert_eq!(config.display.unknown_title, "Untitled");
        assert_eq!(config.display.idle_title, "Idle");
        assert_eq!(config.display.idle_time, "paused");
        assert!(!config.display.show_progress);
        assert!(config.display.ring);
        assert_eq!(config.animation.fps, 30);
    }

    #[test]
    fn rejects_unknown_variant() {
        assert!(WidgetConfig::from_toml_str("[display]\nvariant = \"plasma\"").is_err());
    }

    #[test]
    fn frame_interval_follows_fps() {
        let animation = AnimationConfig {
            fps: 50,
            ..Default::default()
        };
        assert_eq!(animation.frame_interval(), Duration::from_millis(20));
    }
}
