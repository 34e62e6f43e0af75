use eframe::egui::ColorImage;
use image::imageops::FilterType;

use crate::error::Result;

/// Size the info panel displays thumbnails at
pub const THUMBNAIL_SIZE: (u32, u32) = (320, 180);

/// Downloads a thumbnail image and decodes it for display.
///
/// Blocking; run it off the UI thread.
pub fn fetch_thumbnail(url: &str) -> Result<ColorImage> {
    // Perform a blocking HTTP GET request, treating HTTP error codes as failures
    let bytes = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
    decode_thumbnail(&bytes)
}

/// Decodes image bytes and scales them to [`THUMBNAIL_SIZE`].
pub fn decode_thumbnail(bytes: &[u8]) -> Result<ColorImage> {
    let (width, height) = THUMBNAIL_SIZE;
    let img = image::load_from_memory(bytes)?
        .resize_exact(width, height, FilterType::Lanczos3)
        .to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    // Create a ColorImage from the raw RGBA bytes without premultiplying alpha
    Ok(ColorImage::from_rgba_unmultiplied(size, img.as_raw()))
}
