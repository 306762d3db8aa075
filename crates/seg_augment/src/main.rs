use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{info, LevelFilter};
use seg_augment::{augment_dataset, init_logging, AugmentConfig, Resampling};

/// Write randomized flip/rotate/scale/translate copies of an image/label dataset.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AugmentArgs {
    /// Directory containing the source images.
    #[arg(short, long)]
    images: Option<PathBuf>,

    /// Directory containing labels named like the images.
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// Output directory for augmented images (defaults to --images).
    #[arg(long)]
    image_out: Option<PathBuf>,

    /// Output directory for augmented labels (defaults to --labels).
    #[arg(long)]
    label_out: Option<PathBuf>,

    /// Augmented copies per source pair.
    #[arg(short, long)]
    factor: Option<usize>,

    /// Stop after this many source pairs.
    #[arg(long)]
    max_images: Option<usize>,

    /// Seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Use nearest-neighbour resampling for labels instead of bilinear.
    #[arg(long)]
    nearest_labels: bool,

    /// Optional settings JSON; command-line flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = AugmentArgs::parse();
    init_logging(args.log_level)?;

    let mut config = match args.config.as_ref() {
        Some(path) => {
            info!("Loading settings from {}", path.display());
            AugmentConfig::from_json_file(path)?
        }
        None => AugmentConfig::default(),
    };
    apply_cli_overrides(&mut config, args);

    let report = augment_dataset(&config)?;
    println!(
        "Augmented {} image/label pairs into {} new pairs ({} and {})",
        report.sources,
        report.augmented_pairs,
        config.image_output_dir().display(),
        config.label_output_dir().display()
    );
    Ok(())
}

fn apply_cli_overrides(config: &mut AugmentConfig, args: AugmentArgs) {
    if let Some(dir) = args.images {
        config.image_dir = dir;
    }
    if let Some(dir) = args.labels {
        config.label_dir = dir;
    }
    if let Some(dir) = args.image_out {
        config.image_output_dir = Some(dir);
    }
    if let Some(dir) = args.label_out {
        config.label_output_dir = Some(dir);
    }
    if let Some(factor) = args.factor {
        config.augmentation_factor = factor;
    }
    if let Some(max) = args.max_images {
        config.max_images = max;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if args.nearest_labels {
        config.label_resampling = Resampling::Nearest;
    }
}
