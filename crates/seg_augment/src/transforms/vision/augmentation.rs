use crate::transforms::vision::geometric::{warp_dynamic, Resampling};
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::{DynamicImage, GenericImageView};
use imageproc::geometric_transformations::Projection;
use rand::Rng;
use serde::{Deserialize, Serialize};

// ============================================================================
// AugmentSequence
// ============================================================================

/// Randomized geometric augmentation for image/label pairs.
///
/// Each call to [`to_deterministic`](Self::to_deterministic) draws one
/// [`AffineRealization`] from these ranges. The realization is then applied
/// to the image and to its label so both move together.
///
/// | Step            | Default                         |
/// |-----------------|---------------------------------|
/// | horizontal flip | p = 0.5                         |
/// | vertical flip   | p = 0.5                         |
/// | rotation        | uniform in [-90, 90] degrees    |
/// | scale x / y     | independent, uniform [0.8, 1.2] |
/// | translate x / y | independent, [-20 %, 20 %] of the side |
///
/// # Example
/// ```ignore
/// let sequence = AugmentSequence::default();
/// let realization = sequence.to_deterministic(&mut rng);
/// let image = realization.apply(image)?;
/// let label = realization.then(ToGrayscale).apply(label)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentSequence {
    pub flip_horizontal: f64,
    pub flip_vertical: f64,
    /// Rotation range in degrees.
    pub rotate: (f64, f64),
    pub scale_x: (f64, f64),
    pub scale_y: (f64, f64),
    /// Translation range as a fraction of the image width.
    pub translate_x: (f64, f64),
    /// Translation range as a fraction of the image height.
    pub translate_y: (f64, f64),
}

impl Default for AugmentSequence {
    fn default() -> Self {
        Self {
            flip_horizontal: 0.5,
            flip_vertical: 0.5,
            rotate: (-90.0, 90.0),
            scale_x: (0.8, 1.2),
            scale_y: (0.8, 1.2),
            translate_x: (-0.2, 0.2),
            translate_y: (-0.2, 0.2),
        }
    }
}

impl AugmentSequence {
    pub fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("flip_horizontal", self.flip_horizontal),
            ("flip_vertical", self.flip_vertical),
        ] {
            ensure!(
                (0.0..=1.0).contains(&p),
                "{} probability must be in [0.0, 1.0] range (got {})",
                name,
                p
            );
        }

        for (name, (lo, hi)) in [
            ("rotate", self.rotate),
            ("scale_x", self.scale_x),
            ("scale_y", self.scale_y),
            ("translate_x", self.translate_x),
            ("translate_y", self.translate_y),
        ] {
            ensure!(
                lo.is_finite() && hi.is_finite() && lo <= hi,
                "{} range must be finite with low <= high (got {}..={})",
                name,
                lo,
                hi
            );
        }

        ensure!(
            self.scale_x.0 > 0.0 && self.scale_y.0 > 0.0,
            "Scale factors must be positive (got x {:?}, y {:?})",
            self.scale_x,
            self.scale_y
        );
        Ok(())
    }

    /// Draws one concrete set of parameters.
    ///
    /// Callers are expected to have run [`validate`](Self::validate); the
    /// `rand` range samplers panic on inverted ranges.
    pub fn to_deterministic<R: Rng>(&self, rng: &mut R) -> AffineRealization {
        AffineRealization {
            flip_horizontal: rng.random_bool(self.flip_horizontal),
            flip_vertical: rng.random_bool(self.flip_vertical),
            rotate_degrees: rng.random_range(self.rotate.0..=self.rotate.1),
            scale: (
                rng.random_range(self.scale_x.0..=self.scale_x.1),
                rng.random_range(self.scale_y.0..=self.scale_y.1),
            ),
            translate: (
                rng.random_range(self.translate_x.0..=self.translate_x.1),
                rng.random_range(self.translate_y.0..=self.translate_y.1),
            ),
            resampling: Resampling::Bilinear,
        }
    }
}

// ============================================================================
// AffineRealization
// ============================================================================

/// One drawn outcome of an [`AugmentSequence`].
///
/// Applying it is a pure function of the input, so the same realization
/// gives the identical geometric change to every image it is applied to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineRealization {
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub rotate_degrees: f64,
    /// (x, y) scale factors.
    pub scale: (f64, f64),
    /// (x, y) shift as fractions of width and height.
    pub translate: (f64, f64),
    pub resampling: Resampling,
}

impl Default for AffineRealization {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineRealization {
    pub fn identity() -> Self {
        Self {
            flip_horizontal: false,
            flip_vertical: false,
            rotate_degrees: 0.0,
            scale: (1.0, 1.0),
            translate: (0.0, 0.0),
            resampling: Resampling::Bilinear,
        }
    }

    /// Same geometry, different interpolation.
    pub fn with_resampling(mut self, resampling: Resampling) -> Self {
        self.resampling = resampling;
        self
    }

    fn is_rigid_identity(&self) -> bool {
        self.rotate_degrees == 0.0 && self.scale == (1.0, 1.0) && self.translate == (0.0, 0.0)
    }

    /// Rotation, then axis-aligned scale, both about the image centre,
    /// then the translation.
    fn projection(&self, width: u32, height: u32) -> Projection {
        let cx = (width as f32 - 1.0) / 2.0;
        let cy = (height as f32 - 1.0) / 2.0;
        let (sx, sy) = self.scale;
        let (tx, ty) = self.translate;

        Projection::translate(-cx, -cy)
            .and_then(Projection::rotate((self.rotate_degrees as f32).to_radians()))
            .and_then(Projection::scale(sx as f32, sy as f32))
            .and_then(Projection::translate(cx, cy))
            .and_then(Projection::translate(
                tx as f32 * width as f32,
                ty as f32 * height as f32,
            ))
    }
}

impl Transform<DynamicImage, DynamicImage> for AffineRealization {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let mut img = img;
        if self.flip_horizontal {
            img = img.fliph();
        }
        if self.flip_vertical {
            img = img.flipv();
        }
        if self.is_rigid_identity() {
            return Ok(img);
        }

        let (width, height) = img.dimensions();
        ensure!(
            width > 0 && height > 0,
            "Cannot warp an empty image ({}x{})",
            width,
            height
        );
        Ok(warp_dynamic(
            &img,
            &self.projection(width, height),
            self.resampling,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::vision::ToGrayscale;
    use image::{GrayImage, Luma};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn marker_image(x: u32, y: u32) -> DynamicImage {
        let mut img = GrayImage::new(8, 8);
        img.put_pixel(x, y, Luma([255]));
        DynamicImage::ImageLuma8(img)
    }

    fn brightest(img: &DynamicImage) -> (u32, u32) {
        let gray = img.to_luma8();
        let mut best = (0, 0, 0u8);
        for (x, y, p) in gray.enumerate_pixels() {
            if p[0] > best.2 {
                best = (x, y, p[0]);
            }
        }
        (best.0, best.1)
    }

    #[test]
    fn test_default_sequence_is_valid() -> Result<()> {
        AugmentSequence::default().validate()
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let bad_p = AugmentSequence {
            flip_vertical: 1.5,
            ..Default::default()
        };
        assert!(bad_p.validate().is_err());

        let inverted = AugmentSequence {
            rotate: (10.0, -10.0),
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let zero_scale = AugmentSequence {
            scale_y: (0.0, 1.0),
            ..Default::default()
        };
        assert!(zero_scale.validate().is_err());
    }

    #[test]
    fn test_draws_stay_in_range() {
        let sequence = AugmentSequence::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let r = sequence.to_deterministic(&mut rng);
            assert!((-90.0..=90.0).contains(&r.rotate_degrees));
            assert!((0.8..=1.2).contains(&r.scale.0));
            assert!((0.8..=1.2).contains(&r.scale.1));
            assert!((-0.2..=0.2).contains(&r.translate.0));
            assert!((-0.2..=0.2).contains(&r.translate.1));
        }
    }

    #[test]
    fn test_same_seed_same_realization() {
        let sequence = AugmentSequence::default();
        let a = sequence.to_deterministic(&mut StdRng::seed_from_u64(42));
        let b = sequence.to_deterministic(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_leaves_image_untouched() -> Result<()> {
        let img = marker_image(3, 5);
        let out = AffineRealization::identity().apply(img.clone())?;
        assert_eq!(out.as_bytes(), img.as_bytes());
        Ok(())
    }

    #[test]
    fn test_flips_are_exact() -> Result<()> {
        let realization = AffineRealization {
            flip_horizontal: true,
            flip_vertical: true,
            ..AffineRealization::identity()
        };
        let out = realization.apply(marker_image(1, 2))?;
        assert_eq!(brightest(&out), (6, 5));
        Ok(())
    }

    #[test]
    fn test_translation_moves_marker() -> Result<()> {
        let realization = AffineRealization {
            translate: (0.25, 0.0),
            ..AffineRealization::identity()
        }
        .with_resampling(Resampling::Nearest);

        let out = realization.apply(marker_image(2, 3))?;
        assert_eq!(brightest(&out), (4, 3));
        Ok(())
    }

    #[test]
    fn test_image_and_label_move_together() -> Result<()> {
        let sequence = AugmentSequence::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut img = GrayImage::new(16, 12);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Luma([((x * 13 + y * 7) % 251) as u8]);
        }
        let img = DynamicImage::ImageLuma8(img);

        for _ in 0..5 {
            let realization = sequence.to_deterministic(&mut rng);
            let image_out = realization.apply(img.clone())?;
            let label_out = realization.then(ToGrayscale).apply(img.clone())?;

            assert_eq!(image_out.dimensions(), (16, 12));
            assert_eq!(image_out.as_bytes(), label_out.as_bytes());
        }
        Ok(())
    }
}
