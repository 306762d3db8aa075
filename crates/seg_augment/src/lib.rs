//! Offline augmentation of segmentation datasets.
//!
//! Reads an image directory and a label directory with matching file names,
//! applies a randomized flip/rotate/scale/translate pipeline several times
//! per pair (identically to image and label) and writes the results.
//!
//! ```ignore
//! use seg_augment::{augment_dataset, AugmentConfig};
//!
//! let config = AugmentConfig::builder()
//!     .image_dir("data/images")
//!     .label_dir("data/labels")
//!     .augmentation_factor(5)
//!     .build();
//! let report = augment_dataset(&config)?;
//! ```

pub mod augment;
pub mod config;
pub mod readers;
pub mod transforms;

use anyhow::Result;
use log::LevelFilter;

pub use augment::{augment_dataset, AugmentReport};
pub use config::{AugmentConfig, AugmentConfigBuilder};
pub use readers::{DataSource, ImagePair, PairedImageSource};
pub use transforms::vision::{AffineRealization, AugmentSequence, Resampling, ToGrayscale};
pub use transforms::Transform;

/// Initialize logging once for the CLI and tests.
///
/// `RUST_LOG` wins when it is set; otherwise `default_filter` applies.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
    Ok(())
}
