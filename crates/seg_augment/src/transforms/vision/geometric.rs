use crate::transforms::Transform;
use anyhow::Result;
use image::{DynamicImage, Luma, LumaA, Rgb, Rgba};
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use serde::{Deserialize, Serialize};

// ============================================================================
// EnsureRGB
// ============================================================================
/// Ensures that the image is 3-channel RGB (alpha and extra depth dropped).
#[derive(Debug, Clone, Copy)]
pub struct EnsureRGB;

impl Transform<DynamicImage, DynamicImage> for EnsureRGB {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(match img {
            DynamicImage::ImageRgb8(_) => img,
            _ => DynamicImage::ImageRgb8(img.to_rgb8()),
        })
    }
}

// ============================================================================
// Resampling
// ============================================================================

/// Pixel interpolation used when warping.
///
/// - `Nearest`: copies the closest source pixel; keeps label values intact
/// - `Bilinear`: blends the four neighbours; smoother for photographs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resampling {
    Nearest,
    #[default]
    Bilinear,
}

impl From<Resampling> for Interpolation {
    fn from(resampling: Resampling) -> Self {
        match resampling {
            Resampling::Nearest => Interpolation::Nearest,
            Resampling::Bilinear => Interpolation::Bilinear,
        }
    }
}

/// Warps an image with `projection` (input -> output coordinates) into a
/// canvas of the same size. Pixels that map from outside the source are
/// filled with zero.
///
/// 8-bit gray, gray-alpha, RGB and RGBA keep their layout; other formats are
/// converted to RGB first.
pub fn warp_dynamic(
    img: &DynamicImage,
    projection: &Projection,
    resampling: Resampling,
) -> DynamicImage {
    let interpolation = Interpolation::from(resampling);
    match img {
        DynamicImage::ImageLuma8(buf) => {
            DynamicImage::ImageLuma8(warp(buf, projection, interpolation, Luma([0])))
        }
        DynamicImage::ImageLumaA8(buf) => {
            DynamicImage::ImageLumaA8(warp(buf, projection, interpolation, LumaA([0, 0])))
        }
        DynamicImage::ImageRgb8(buf) => {
            DynamicImage::ImageRgb8(warp(buf, projection, interpolation, Rgb([0, 0, 0])))
        }
        DynamicImage::ImageRgba8(buf) => {
            DynamicImage::ImageRgba8(warp(buf, projection, interpolation, Rgba([0, 0, 0, 0])))
        }
        other => DynamicImage::ImageRgb8(warp(
            &other.to_rgb8(),
            projection,
            interpolation,
            Rgb([0, 0, 0]),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, GenericImageView, GrayImage, RgbImage};

    #[test]
    fn test_ensure_rgb_converts_gray() -> Result<()> {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([9])));
        let rgb = EnsureRGB.apply(img)?;

        assert_eq!(rgb.color(), ColorType::Rgb8);
        assert_eq!(rgb.as_bytes(), &[9; 12]);
        Ok(())
    }

    #[test]
    fn test_warp_translation_moves_pixels() {
        let mut img = GrayImage::new(6, 6);
        img.put_pixel(1, 2, Luma([200]));

        let shifted = warp_dynamic(
            &DynamicImage::ImageLuma8(img),
            &Projection::translate(2.0, 1.0),
            Resampling::Nearest,
        );

        assert_eq!(shifted.color(), ColorType::L8);
        assert_eq!(shifted.dimensions(), (6, 6));
        let shifted = shifted.to_luma8();
        assert_eq!(shifted.get_pixel(3, 3), &Luma([200]));
        assert_eq!(shifted.get_pixel(1, 2), &Luma([0]));
    }

    #[test]
    fn test_warp_keeps_rgb_layout() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([1, 2, 3])));
        let out = warp_dynamic(&img, &Projection::scale(1.0, 1.0), Resampling::Bilinear);

        assert_eq!(out.color(), ColorType::Rgb8);
        assert_eq!(out.dimensions(), (4, 3));
    }
}
