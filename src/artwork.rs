use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;

use crate::error::{WidgetError, WidgetResult};

/// What the artwork slot currently shows.
#[derive(Debug, Clone, Default)]
pub enum Artwork {
    /// Slot hidden
    #[default]
    Hidden,
    /// Glyph in place of artwork
    Placeholder(String),
    Loading,
    Loaded(Arc<RgbaImage>),
    /// Fetch or decode failed
    Broken,
}

/// Artwork state tagged with a generation, so a fetch that finishes after
/// a newer change cannot overwrite it.
#[derive(Debug, Default)]
pub struct ArtworkSlot {
    generation: u64,
    artwork: Artwork,
}

impl ArtworkSlot {
    /// Mark a new fetch as in flight and return its generation
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.artwork = Artwork::Loading;
        self.generation
    }

    /// Store a finished fetch. Returns false if it was superseded.
    pub fn finish(&mut self, generation: u64, result: WidgetResult<RgbaImage>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.artwork = match result {
            Ok(image) => Artwork::Loaded(Arc::new(image)),
            Err(e) => {
                log::warn!("Artwork unavailable: {}", e);
                Artwork::Broken
            }
        };
        true
    }

    pub fn clear(&mut self, placeholder: Option<&str>) {
        self.generation += 1;
        self.artwork = match placeholder {
            Some(glyph) => Artwork::Placeholder(glyph.to_string()),
            None => Artwork::Hidden,
        };
    }

    pub fn artwork(&self) -> &Artwork {
        &self.artwork
    }
}

/// Fetches artwork over HTTP and scales it for the platter.
pub struct ArtworkLoader {
    client: reqwest::Client,
    size: u32,
}

impl ArtworkLoader {
    pub fn new(size: u32) -> WidgetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, size })
    }

    pub async fn fetch(&self, url: &str) -> WidgetResult<RgbaImage> {
        log::debug!("Fetching artwork from {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WidgetError::HttpStatus(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        decode_artwork(&bytes, self.size)
    }
}

/// Decode image bytes and resize to a `size`×`size` square
pub fn decode_artwork(bytes: &[u8], size: u32) -> WidgetResult<RgbaImage> {
    let img = image::load_from_memory(bytes)?;
    let resized = img.resize_exact(size, size, image::imageops::FilterType::Lanczos3);
    Ok(resized.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decode_resizes_to_square() {
        let art = decode_artwork(&png_bytes(40, 20), 16).unwrap();
        assert_eq!(art.dimensions(), (16, 16));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode_artwork(b"not an image", 16), Err(WidgetError::Image(_))));
    }

    #[test]
    fn superseded_fetch_is_dropped() {
        let mut slot = ArtworkSlot::default();
        let first = slot.begin();
        let second = slot.begin();

        assert!(!slot.finish(first, Ok(RgbaImage::new(1, 1))));
        assert!(matches!(slot.artwork(), Artwork::Loading));

        assert!(slot.finish(second, Err(WidgetError::HttpStatus(404))));
        assert!(matches!(slot.artwork(), Artwork::Broken));
    }

    #[test]
    fn clear_invalidates_in_flight_fetch() {
        let mut slot = ArtworkSlot::default();
        let pending = slot.begin();
        slot.clear(Some("◇"));

        assert!(!slot.finish(pending, Ok(RgbaImage::new(1, 1))));
        assert!(matches!(slot.artwork(), Artwork::Placeholder(glyph) if glyph == "◇"));
    }
}
