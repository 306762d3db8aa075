use crate::transforms::Transform;
use anyhow::Result;
use image::DynamicImage;

// ============================================================================
// ToGrayscale
// ============================================================================

/// Collapses an image to a single 8-bit luma channel.
///
/// Labels are stored single-channel regardless of how they were painted,
/// so this runs after the geometric transform on every label.
///
/// | Input Format   | Output |
/// |----------------|--------|
/// | Luma8          | as is  |
/// | anything else  | Luma8 (Rec. 709 weights, alpha dropped) |
#[derive(Debug, Clone, Copy)]
pub struct ToGrayscale;

impl Transform<DynamicImage, DynamicImage> for ToGrayscale {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(match img {
            DynamicImage::ImageLuma8(_) => img,
            _ => DynamicImage::ImageLuma8(img.to_luma8()),
        })
    }
}
