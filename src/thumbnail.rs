use eframe::egui::ColorImage;
use tracing::debug;

/// Widest preview we keep; larger images are scaled down before upload.
const MAX_PREVIEW_WIDTH: u32 = 280;

/// Downloads and decodes a video thumbnail. Any failure yields `None`.
pub fn fetch_thumbnail(url: &str) -> Option<ColorImage> {
    // Perform a blocking HTTP GET request, returning None on any error
    let resp = match reqwest::blocking::get(url).and_then(|r| r.error_for_status()) {
        Ok(resp) => resp.bytes().ok()?,
        Err(err) => {
            debug!(%err, url, "thumbnail fetch failed");
            return None;
        }
    };
    decode_thumbnail(&resp)
}

/// Decodes image bytes into an egui image no wider than the preview area.
pub fn decode_thumbnail(bytes: &[u8]) -> Option<ColorImage> {
    let mut img = image::load_from_memory(bytes).ok()?;
    if img.width() > MAX_PREVIEW_WIDTH {
        let height = img.height() * MAX_PREVIEW_WIDTH / img.width();
        img = img.thumbnail(MAX_PREVIEW_WIDTH, height.max(1));
    }
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    // Create a ColorImage from the raw RGBA bytes without premultiplying alpha
    Some(ColorImage::from_rgba_unmultiplied(size, &rgba))
}
