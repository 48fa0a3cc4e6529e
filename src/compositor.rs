use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, Blend};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::rect::Rect;

use crate::animation::RingSample;
use crate::artwork::Artwork;
use crate::types::DisplayMode;

pub const CANVAS_WIDTH: u32 = 420;
pub const CANVAS_HEIGHT: u32 = 520;
/// Diameter of the artwork platter
pub const PLATTER_SIZE: u32 = 260;

const CENTER: (f32, f32) = (210.0, 210.0);
const TITLE_Y: i32 = 428;
const DETAIL_Y: i32 = 466;
const TEXT_MARGIN: i32 = 16;
const PROGRESS_Y: i32 = 508;
const PROGRESS_HEIGHT: u32 = 4;

const RING_INNER_COLOR: [f32; 4] = [125.0, 249.0, 255.0, 0.02];
const RING_OUTER_COLOR: [f32; 4] = [255.0, 92.0, 168.0, 0.45];
const RING_STEPS: usize = 12;
const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([147, 51, 234, 255]);
const PROGRESS_TRACK: Rgba<u8> = Rgba([255, 255, 255, 40]);
const PROGRESS_FILL: Rgba<u8> = Rgba([125, 249, 255, 220]);

/// Fonts tried when none is configured
const FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/SFNS.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
];

/// Everything needed to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub mode: DisplayMode,
    pub title: &'a str,
    pub artist: &'a str,
    pub time: Option<&'a str>,
    pub progress: Option<f64>,
    pub playing: bool,
    /// Platter rotation in turns
    pub rotation: f64,
    pub ring: &'a [RingSample],
    pub artwork: &'a Artwork,
}

/// Text colour for the current system appearance
fn text_color() -> Rgba<u8> {
    if matches!(dark_light::detect(), dark_light::Mode::Dark) {
        Rgba([255, 255, 255, 255])
    } else {
        Rgba([0, 0, 0, 255])
    }
}

pub struct Compositor {
    font: Option<FontVec>,
    text_color: Rgba<u8>,
}

impl Compositor {
    /// Load the configured font, or the first system font that exists.
    /// Without any font the frame is drawn without text.
    pub fn new(font_path: Option<&Path>) -> Result<Self> {
        let font = match font_path {
            Some(path) => Some(Self::load_font(path)?),
            None => FONT_CANDIDATES
                .iter()
                .map(Path::new)
                .find(|path| path.exists())
                .and_then(|path| match Self::load_font(path) {
                    Ok(font) => Some(font),
                    Err(e) => {
                        log::warn!("{:#}", e);
                        None
                    }
                }),
        };

        if font.is_none() {
            log::warn!("No usable font found, frames will be rendered without text");
        }

        let text_color = text_color();
        log::debug!("Text colour: {:?}", text_color);

        Ok(Self { font, text_color })
    }

    /// Compositor that never draws text
    pub fn without_text() -> Self {
        Self {
            font: None,
            text_color: Rgba([255, 255, 255, 255]),
        }
    }

    fn load_font(path: &Path) -> Result<FontVec> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read font {}", path.display()))?;
        let font = FontVec::try_from_vec(data)
            .with_context(|| format!("Failed to parse font {}", path.display()))?;
        log::info!("Loaded font {}", path.display());
        Ok(font)
    }

    /// Draw a full widget frame
    pub fn compose(&self, view: &FrameView<'_>) -> RgbaImage {
        let mut canvas = Blend(RgbaImage::from_pixel(
            CANVAS_WIDTH,
            CANVAS_HEIGHT,
            Rgba([0, 0, 0, 0]),
        ));

        // Paused rings fade back
        let ring_alpha = if view.playing { 1.0 } else { 0.5 };
        for sample in view.ring {
            self.draw_ring_bar(&mut canvas, sample, ring_alpha);
        }

        let mut canvas = canvas.0;
        let radius = PLATTER_SIZE as f32 / 2.0;
        match (view.mode, view.artwork) {
            (DisplayMode::Track, Artwork::Loaded(art)) => {
                let disc = self.platter_from_artwork(art, view.rotation);
                let x = (CENTER.0 - radius) as i64;
                let y = (CENTER.1 - radius) as i64;
                image::imageops::overlay(&mut canvas, &disc, x, y);
            }
            (DisplayMode::Track, Artwork::Hidden) => {}
            (DisplayMode::Track, Artwork::Placeholder(glyph)) => {
                self.draw_placeholder_disc(&mut canvas);
                self.draw_centered_text(&mut canvas, glyph, CENTER.1 as i32 - 40, 80.0);
            }
            _ => self.draw_placeholder_disc(&mut canvas),
        }

        self.draw_centered_text(&mut canvas, view.title, TITLE_Y, 30.0);
        let detail = match (view.artist.is_empty(), view.time) {
            (false, Some(time)) => format!("{} · {}", view.artist, time),
            (true, Some(time)) => time.to_string(),
            (_, None) => view.artist.to_string(),
        };
        self.draw_centered_text(&mut canvas, &detail, DETAIL_Y, 22.0);

        if let Some(fraction) = view.progress {
            self.draw_progress(&mut canvas, fraction);
        }

        canvas
    }

    /// One radial bar, three pixels wide, fading from cyan to pink
    fn draw_ring_bar(&self, canvas: &mut Blend<RgbaImage>, sample: &RingSample, alpha_scale: f32) {
        let (sin, cos) = sample.angle.sin_cos();
        let (sin, cos) = (sin as f32, cos as f32);
        let inner = sample.inner as f32;
        let outer = sample.outer as f32;

        for step in 0..RING_STEPS {
            let t0 = step as f32 / RING_STEPS as f32;
            let t1 = (step + 1) as f32 / RING_STEPS as f32;
            let r0 = inner + (outer - inner) * t0;
            let r1 = inner + (outer - inner) * t1;
            let color = gradient_color((t0 + t1) / 2.0, alpha_scale);

            for offset in [-1.0f32, 0.0, 1.0] {
                // Offset perpendicular to the bar
                let (dx, dy) = (-sin * offset, cos * offset);
                let start = (CENTER.0 + cos * r0 + dx, CENTER.1 + sin * r0 + dy);
                let end = (CENTER.0 + cos * r1 + dx, CENTER.1 + sin * r1 + dy);
                draw_line_segment_mut(canvas, start, end, color);
            }
        }
    }

    /// Crop artwork to a circle and rotate it by `turns`
    fn platter_from_artwork(&self, art: &RgbaImage, turns: f64) -> RgbaImage {
        let mut disc = if art.dimensions() == (PLATTER_SIZE, PLATTER_SIZE) {
            art.clone()
        } else {
            image::imageops::resize(art, PLATTER_SIZE, PLATTER_SIZE, image::imageops::FilterType::Triangle)
        };

        let radius = PLATTER_SIZE as f32 / 2.0;
        for (x, y, pixel) in disc.enumerate_pixels_mut() {
            let dx = x as f32 + 0.5 - radius;
            let dy = y as f32 + 0.5 - radius;
            if dx * dx + dy * dy > radius * radius {
                pixel.0[3] = 0;
            }
        }

        let theta = (turns * std::f64::consts::TAU) as f32;
        rotate_about_center(&disc, theta, Interpolation::Bilinear, Rgba([0, 0, 0, 0]))
    }

    fn draw_placeholder_disc(&self, canvas: &mut RgbaImage) {
        draw_filled_circle_mut(
            canvas,
            (CENTER.0 as i32, CENTER.1 as i32),
            (PLATTER_SIZE / 2) as i32,
            PLACEHOLDER_COLOR,
        );
    }

    fn draw_progress(&self, canvas: &mut RgbaImage, fraction: f64) {
        let full = CANVAS_WIDTH - 2 * TEXT_MARGIN as u32;
        draw_filled_rect_mut(
            canvas,
            Rect::at(TEXT_MARGIN, PROGRESS_Y).of_size(full, PROGRESS_HEIGHT),
            PROGRESS_TRACK,
        );

        let filled = (f64::from(full) * fraction.clamp(0.0, 1.0)).round() as u32;
        if filled > 0 {
            draw_filled_rect_mut(
                canvas,
                Rect::at(TEXT_MARGIN, PROGRESS_Y).of_size(filled, PROGRESS_HEIGHT),
                PROGRESS_FILL,
            );
        }
    }

    fn draw_centered_text(&self, canvas: &mut RgbaImage, text: &str, y: i32, size: f32) {
        let Some(font) = &self.font else {
            return;
        };
        if text.is_empty() {
            return;
        }

        let scale = PxScale::from(size);
        let available = CANVAS_WIDTH as i32 - 2 * TEXT_MARGIN;
        let display_text = self.truncate_text(font, text, scale, available);
        let width = self.measure_text_width(font, &display_text, scale);
        let x = ((CANVAS_WIDTH as f32 - width) / 2.0).max(TEXT_MARGIN as f32) as i32;

        draw_text_mut(canvas, self.text_color, x, y, scale, font, &display_text);
    }

    /// Truncate text to fit within available width
    fn truncate_text(&self, font: &FontVec, text: &str, scale: PxScale, max_width: i32) -> String {
        if self.measure_text_width(font, text, scale) <= max_width as f32 {
            return text.to_string();
        }

        let ellipsis = "...";
        let available_for_text = max_width as f32 - self.measure_text_width(font, ellipsis, scale);

        let mut truncated = String::new();
        let mut width = 0.0;
        let scaled_font = font.as_scaled(scale);
        for ch in text.chars() {
            width += scaled_font.h_advance(font.glyph_id(ch));
            if width > available_for_text {
                break;
            }
            truncated.push(ch);
        }

        format!("{}{}", truncated, ellipsis)
    }

    /// Measure the width of text in pixels
    fn measure_text_width(&self, font: &FontVec, text: &str, scale: PxScale) -> f32 {
        let scaled_font = font.as_scaled(scale);
        text.chars()
            .map(|ch| scaled_font.h_advance(font.glyph_id(ch)))
            .sum()
    }
}

/// Encode image as PNG bytes
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    use image::codecs::png::PngEncoder;
    use image::ImageEncoder;

    let mut buffer = Vec::new();
    let encoder = PngEncoder::new(&mut buffer);

    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .context("Failed to encode PNG")?;

    Ok(buffer)
}

/// Ring colour at `t` along a bar (0 = inner end)
fn gradient_color(t: f32, alpha_scale: f32) -> Rgba<u8> {
    let mix = |i: usize| RING_INNER_COLOR[i] + (RING_OUTER_COLOR[i] - RING_INNER_COLOR[i]) * t;
    Rgba([
        mix(0).round() as u8,
        mix(1).round() as u8,
        mix(2).round() as u8,
        (mix(3) * alpha_scale * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::ring_samples;

    fn view<'a>(ring: &'a [RingSample], artwork: &'a Artwork) -> FrameView<'a> {
        FrameView {
            mode: DisplayMode::Track,
            title: "Title",
            artist: "Artist",
            time: Some("1:00 / 3:00"),
            progress: Some(0.33),
            playing: true,
            rotation: 0.125,
            ring,
            artwork,
        }
    }

    #[test]
    fn frame_has_fixed_size() {
        let compositor = Compositor::without_text();
        let frame = compositor.compose(&view(&[], &Artwork::Hidden));
        assert_eq!(frame.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
    }

    #[test]
    fn ring_draws_outside_the_platter() {
        let compositor = Compositor::without_text();
        let ring = ring_samples(4.0, 1234);
        let frame = compositor.compose(&view(&ring, &Artwork::Hidden));

        let touched = frame
            .enumerate_pixels()
            .filter(|(x, y, px)| {
                let dx = *x as f32 - CENTER.0;
                let dy = *y as f32 - CENTER.1;
                dx * dx + dy * dy > 150.0 * 150.0 && px.0[3] > 0
            })
            .count();
        assert!(touched > 0);
    }

    #[test]
    fn loaded_artwork_fills_the_platter_centre() {
        let compositor = Compositor::without_text();
        let art = Artwork::Loaded(std::sync::Arc::new(RgbaImage::from_pixel(
            PLATTER_SIZE,
            PLATTER_SIZE,
            Rgba([0, 200, 0, 255]),
        )));
        let mut still = view(&[], &art);
        still.rotation = 0.0;
        let frame = compositor.compose(&still);
        assert_eq!(frame.get_pixel(210, 210), &Rgba([0, 200, 0, 255]));
        assert_eq!(frame.get_pixel(2, 2).0[3], 0);
    }

    #[test]
    fn idle_frame_shows_placeholder_disc() {
        let compositor = Compositor::without_text();
        let art = Artwork::Hidden;
        let mut idle = view(&[], &art);
        idle.mode = DisplayMode::Idle;
        let frame = compositor.compose(&idle);
        assert_eq!(frame.get_pixel(210, 210), &PLACEHOLDER_COLOR);
    }

    #[test]
    fn gradient_runs_cyan_to_pink() {
        assert_eq!(gradient_color(0.0, 1.0), Rgba([125, 249, 255, 5]));
        assert_eq!(gradient_color(1.0, 1.0), Rgba([255, 92, 168, 115]));
    }

    #[test]
    fn png_encoding_has_signature() {
        let png = encode_png(&RgbaImage::new(2, 2)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
