use crate::transforms::Transform;
use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};

// ============================================================================
// LoadImage
// ============================================================================

/// Loads an image from a file path.
///
/// The format is sniffed from the file contents rather than the extension,
/// so a PNG saved under `.jpg` still decodes.
///
/// # Example
/// ```ignore
/// let loader = LoadImage::new().then(EnsureRGB);
/// let image = loader.apply(PathBuf::from("photo.jpg"))?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadImage;

impl LoadImage {
    pub fn new() -> Self {
        Self
    }
}

impl Transform<PathBuf, DynamicImage> for LoadImage {
    fn apply(&self, path: PathBuf) -> Result<DynamicImage> {
        ImageReader::open(&path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?
            .with_guessed_format()
            .with_context(|| format!("Failed to detect image format: {}", path.display()))?
            .decode()
            .with_context(|| format!("Failed to decode image: {}", path.display()))
    }
}

/// Writes `img` to `path`; the encoder is picked from the extension.
///
/// JPEG has no alpha channel, so RGBA and gray-alpha images are flattened
/// before encoding to a `.jpg`/`.jpeg` path.
pub fn save_image(img: &DynamicImage, path: &Path) -> Result<()> {
    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"));

    let result = match img {
        DynamicImage::ImageRgba8(_) | DynamicImage::ImageLumaA8(_) if is_jpeg => {
            if img.color().has_color() {
                DynamicImage::ImageRgb8(img.to_rgb8()).save(path)
            } else {
                DynamicImage::ImageLuma8(img.to_luma8()).save(path)
            }
        }
        _ => img.save(path),
    };
    result.with_context(|| format!("Failed to write image: {}", path.display()))
}
