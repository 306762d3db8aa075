//! src/augment.rs
//!
//! Offline augmentation driver: walks an image/label directory pair and
//! writes `augmentation_factor` randomized copies of every pair.

use crate::config::AugmentConfig;
use crate::readers::{DataSource, ImagePair, PairedImageSource};
use crate::transforms::vision::{save_image, EnsureRGB, LoadImage, ToGrayscale};
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::GenericImageView;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::Path;

/// Progress is logged after this many source pairs.
const PROGRESS_EVERY: usize = 100;

/// Totals of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AugmentReport {
    /// Source pairs that were read and augmented
    pub sources: usize,
    /// Image/label pairs written (`sources * augmentation_factor`)
    pub augmented_pairs: usize,
}

/// Runs the augmentation described by `config`.
///
/// For every source pair (sorted by name, at most `max_images`) and every
/// `i in 0..augmentation_factor`, one geometric realization is drawn and
/// applied to both image and label. The results are written as
/// `<stem>_augmented_<i>.<output_extension>` into the two output
/// directories, which are created if needed. The label is stored
/// single-channel.
///
/// The first read, decode or write error aborts the run; files written
/// before it are left in place.
pub fn augment_dataset(config: &AugmentConfig) -> Result<AugmentReport> {
    config.validate()?;

    let image_out = config.image_output_dir();
    let label_out = config.label_output_dir();
    for dir in [image_out, label_out] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let source = PairedImageSource::new(&config.image_dir, &config.label_dir)
        .with_extensions(&config.extensions);
    let augmenter = PairAugmenter {
        config,
        image_out,
        label_out,
    };

    log::info!(
        "Augmenting {} -> {} (factor {}, at most {} images)",
        config.image_dir.display(),
        image_out.display(),
        config.augmentation_factor,
        config.max_images
    );

    let mut report = AugmentReport::default();
    for pair in source.stream()?.take(config.max_images) {
        let pair = pair?;
        augmenter
            .augment(&pair, &mut rng)
            .with_context(|| format!("Failed to augment {}", pair.image.display()))?;

        report.sources += 1;
        report.augmented_pairs += config.augmentation_factor;
        if report.sources % PROGRESS_EVERY == 0 {
            log::info!("Processed {} images", report.sources);
        }
    }

    log::info!(
        "Done: {} source images, {} augmented pairs",
        report.sources,
        report.augmented_pairs
    );
    Ok(report)
}

struct PairAugmenter<'a> {
    config: &'a AugmentConfig,
    image_out: &'a Path,
    label_out: &'a Path,
}

impl PairAugmenter<'_> {
    fn augment(&self, pair: &ImagePair, rng: &mut StdRng) -> Result<()> {
        let image = LoadImage::new().then(EnsureRGB).apply(pair.image.clone())?;
        let label = LoadImage::new().apply(pair.label.clone())?;
        ensure!(
            image.dimensions() == label.dimensions(),
            "Image is {:?} but label {} is {:?}",
            image.dimensions(),
            pair.label.display(),
            label.dimensions()
        );

        let extension = self.config.output_extension.trim_start_matches('.');
        for i in 0..self.config.augmentation_factor {
            let realization = self.config.sequence.to_deterministic(rng);
            let image_aug = realization.apply(image.clone())?;
            let label_aug = realization
                .with_resampling(self.config.label_resampling)
                .then(ToGrayscale)
                .apply(label.clone())?;

            let file_name = format!("{}_augmented_{}.{}", pair.stem(), i, extension);
            let image_path = self.image_out.join(&file_name);
            let label_path = self.label_out.join(&file_name);
            save_image(&image_aug, &image_path)?;
            save_image(&label_aug, &label_path)?;
            log::trace!("Wrote {} and {}", image_path.display(), label_path.display());
        }
        Ok(())
    }
}
