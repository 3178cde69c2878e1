use crate::upload::{PreviewRef, PreviewStore};
use eframe::egui;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Longest edge of a row thumbnail, in pixels.
pub const THUMBNAIL_EDGE: u32 = 64;

enum Thumbnail {
    Ready(egui::TextureHandle),
    DecodeFailed,
}

/// Decoded item thumbnails, keyed by the item's preview reference.
///
/// A texture lives exactly as long as its preview reference does in the
/// [`PreviewStore`]; `retain_live` drops the rest, which frees the texture.
#[derive(Default)]
pub struct Thumbnails {
    cache: HashMap<PreviewRef, Thumbnail>,
}

impl Thumbnails {
    /// Texture for a live preview, decoding it on first use. `None` when the
    /// preview was released or the image cannot be decoded.
    pub fn texture(
        &mut self,
        ctx: &egui::Context,
        previews: &PreviewStore,
        preview: &PreviewRef,
    ) -> Option<&egui::TextureHandle> {
        let path = previews.resolve(preview)?;
        let entry = self
            .cache
            .entry(preview.clone())
            .or_insert_with(|| match decode_thumbnail(path) {
                Ok(image) => Thumbnail::Ready(ctx.load_texture(
                    preview.0.clone(),
                    image,
                    egui::TextureOptions::LINEAR,
                )),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "thumbnail decode failed");
                    Thumbnail::DecodeFailed
                }
            });
        match entry {
            Thumbnail::Ready(texture) => Some(texture),
            Thumbnail::DecodeFailed => None,
        }
    }

    /// Drops every thumbnail whose preview is no longer live. Returns how
    /// many were freed.
    pub fn retain_live(&mut self, previews: &PreviewStore) -> usize {
        let before = self.cache.len();
        self.cache
            .retain(|preview, _| previews.resolve(preview).is_some());
        let freed = before - self.cache.len();
        if freed > 0 {
            debug!(freed, live = previews.live(), "released thumbnails");
        }
        freed
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cache.len()
    }
}

pub fn decode_thumbnail(path: &Path) -> Result<egui::ColorImage, image::ImageError> {
    let rgba = image::open(path)?
        .thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE)
        .to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}
