//! Decoding, styling and caching of icon bitmaps.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};

pub const ICON_SIZE: u32 = 56;
pub const ICON_RADIUS: f32 = 14.0;
const MAX_SOURCE_SIZE: u32 = 128;

const PLACEHOLDER_FROM: [u8; 3] = [0x3D, 0x3D, 0x3D];
const PLACEHOLDER_TO: [u8; 3] = [0x33, 0x33, 0x33];
const APP_ICON_FROM: [u8; 3] = [0x0A, 0x84, 0xFF];
const APP_ICON_TO: [u8; 3] = [0x00, 0x5B, 0xB5];

/// A styled icon. Placeholders carry the glyph the UI draws on top of the tile.
#[derive(Debug, Clone, PartialEq)]
pub struct IconImage {
    pub bitmap: RgbaImage,
    pub glyph: Option<char>,
}

impl IconImage {
    pub fn is_placeholder(&self) -> bool {
        self.glyph.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Asset(String),
    Placeholder(String),
}

impl CacheKey {
    pub fn for_icon(asset: &str, fallback_label: &str) -> Self {
        if asset.is_empty() {
            CacheKey::Placeholder(fallback_label.to_string())
        } else {
            CacheKey::Asset(asset.to_string())
        }
    }
}

/// Rendered icons for the lifetime of the owning asset manager.
#[derive(Debug, Default)]
pub struct IconCache {
    images: HashMap<CacheKey, IconImage>,
}

impl IconCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.images.contains_key(key)
    }

    pub fn get_or_render(&mut self, dir: &Path, asset: &str, fallback_label: &str) -> &IconImage {
        self.images
            .entry(CacheKey::for_icon(asset, fallback_label))
            .or_insert_with(|| render_icon(dir, asset, fallback_label))
    }

    /// Drop the rendering of an asset that was replaced or deleted.
    pub fn invalidate(&mut self, asset: &str) -> bool {
        self.images
            .remove(&CacheKey::Asset(asset.to_string()))
            .is_some()
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}

/// Decode `dir/asset` into a rounded tile, or fall back to a lettered placeholder.
pub fn render_icon(dir: &Path, asset: &str, fallback_label: &str) -> IconImage {
    if !asset.is_empty() {
        let path = dir.join(asset);
        match decode(&path) {
            Ok(image) => {
                return IconImage {
                    bitmap: style(image),
                    glyph: None,
                }
            }
            Err(reason) => {
                tracing::debug!(path = %path.display(), reason = %reason, "icon unreadable, using placeholder")
            }
        }
    }
    placeholder(fallback_label)
}

fn decode(path: &Path) -> Result<DynamicImage, String> {
    let bytes = fs::read(path).map_err(|err| err.to_string())?;
    image::load_from_memory(&bytes).map_err(|err| err.to_string())
}

/// Scale to cover the icon square, centre-crop and clip to rounded corners.
pub fn style(image: DynamicImage) -> RgbaImage {
    let image = if image.width() > MAX_SOURCE_SIZE {
        image.resize(MAX_SOURCE_SIZE, MAX_SOURCE_SIZE, FilterType::Lanczos3)
    } else {
        image
    };
    let filled = image
        .resize_to_fill(ICON_SIZE, ICON_SIZE, FilterType::Lanczos3)
        .to_rgba8();
    round_corners(filled, ICON_RADIUS)
}

pub fn placeholder(label: &str) -> IconImage {
    let glyph = label
        .trim()
        .chars()
        .next()
        .and_then(|first| first.to_uppercase().next())
        .unwrap_or('?');
    IconImage {
        bitmap: gradient_tile(ICON_SIZE, ICON_RADIUS, PLACEHOLDER_FROM, PLACEHOLDER_TO),
        glyph: Some(glyph),
    }
}

/// The launcher's own icon, used when no bundled copy is available.
pub fn default_app_icon() -> RgbaImage {
    gradient_tile(64, 16.0, APP_ICON_FROM, APP_ICON_TO)
}

/// Diagonal gradient from the top-left to the bottom-right corner.
pub fn gradient_tile(size: u32, radius: f32, from: [u8; 3], to: [u8; 3]) -> RgbaImage {
    let span = (2 * size.saturating_sub(1)).max(1) as f32;
    let tile = RgbaImage::from_fn(size, size, |x, y| {
        let t = (x + y) as f32 / span;
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgba([mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2]), 255])
    });
    round_corners(tile, radius)
}

pub fn round_corners(mut image: RgbaImage, radius: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let radius = radius.min(width.min(height) as f32 / 2.0);
    if radius <= 0.0 {
        return image;
    }
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let coverage = corner_coverage(x, y, width, height, radius);
        pixel.0[3] = (pixel.0[3] as f32 * coverage).round() as u8;
    }
    image
}

fn corner_coverage(x: u32, y: u32, width: u32, height: u32, radius: f32) -> f32 {
    let px = x as f32 + 0.5;
    let py = y as f32 + 0.5;
    let cx = px.clamp(radius, width as f32 - radius);
    let cy = py.clamp(radius, height as f32 - radius);
    let distance = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
    (radius - distance + 0.5).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
        let bitmap = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]));
        bitmap
            .save_with_format(dir.join(name), image::ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn styled_icons_are_square_with_transparent_corners() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "auto_big.png", 300, 150);

        let icon = render_icon(dir.path(), "auto_big.png", "Big");

        assert!(!icon.is_placeholder());
        assert_eq!(icon.bitmap.dimensions(), (ICON_SIZE, ICON_SIZE));
        assert_eq!(icon.bitmap.get_pixel(0, 0).0[3], 0);
        assert_eq!(icon.bitmap.get_pixel(ICON_SIZE / 2, ICON_SIZE / 2).0[3], 255);
    }

    #[test]
    fn missing_or_corrupt_assets_fall_back_to_placeholder() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("custom_1_bad.png"), b"not an image").unwrap();

        let missing = render_icon(dir.path(), "auto_gone.png", "gone");
        let corrupt = render_icon(dir.path(), "custom_1_bad.png", "bad");
        let empty = render_icon(dir.path(), "", "");

        assert_eq!(missing.glyph, Some('G'));
        assert_eq!(corrupt.glyph, Some('B'));
        assert_eq!(empty.glyph, Some('?'));
    }

    #[test]
    fn cache_reuses_renders_until_invalidated() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "auto_x.png", 16, 16);
        let mut cache = IconCache::new();

        cache.get_or_render(dir.path(), "auto_x.png", "x");
        cache.get_or_render(dir.path(), "auto_x.png", "x");
        cache.get_or_render(dir.path(), "", "Mail");
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&CacheKey::Placeholder("Mail".into())));

        assert!(cache.invalidate("auto_x.png"));
        assert!(!cache.invalidate("auto_x.png"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn gradient_runs_between_endpoints() {
        let tile = gradient_tile(64, 0.0, APP_ICON_FROM, APP_ICON_TO);
        let start = tile.get_pixel(0, 0).0;
        let end = tile.get_pixel(63, 63).0;
        assert_eq!(&start[..3], &APP_ICON_FROM);
        assert_eq!(&end[..3], &APP_ICON_TO);
    }
}
