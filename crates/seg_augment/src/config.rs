//! src/config.rs
//!
//! Parameters of an augmentation run.
//!
//! Example:
//! ```ignore
//! let config = AugmentConfig::builder()
//!     .image_dir("data/images")
//!     .label_dir("data/labels")
//!     .augmentation_factor(5)
//!     .seed(42)
//!     .build();
//! ```
//!
//! The same structure can be read from JSON; missing keys fall back to the
//! defaults below:
//! ```json
//! { "image_dir": "data/images", "label_dir": "data/labels", "augmentation_factor": 5 }
//! ```

use crate::readers::paired_dir::DEFAULT_EXTENSIONS;
use crate::transforms::vision::{AugmentSequence, Resampling};
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound on processed source images unless overridden.
pub const DEFAULT_MAX_IMAGES: usize = 2750;

/// Configuration for [`augment_dataset`](crate::augment_dataset)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Directory holding the source images
    pub image_dir: PathBuf,
    /// Directory holding labels with the same file names as the images
    pub label_dir: PathBuf,
    /// Where augmented images go (defaults to `image_dir`)
    pub image_output_dir: Option<PathBuf>,
    /// Where augmented labels go (defaults to `label_dir`)
    pub label_output_dir: Option<PathBuf>,
    /// Augmented copies written per source pair (must be > 0)
    pub augmentation_factor: usize,
    /// Maximum number of source pairs processed
    pub max_images: usize,
    /// Accepted image extensions, case-sensitive, without the dot
    pub extensions: Vec<String>,
    /// Extension (and so encoder) of the written files
    pub output_extension: String,
    /// Seed for reproducible runs; OS entropy when absent
    pub seed: Option<u64>,
    /// Random geometric pipeline
    pub sequence: AugmentSequence,
    /// Interpolation used when warping labels
    pub label_resampling: Resampling,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::new(),
            label_dir: PathBuf::new(),
            image_output_dir: None,
            label_output_dir: None,
            augmentation_factor: 1,
            max_images: DEFAULT_MAX_IMAGES,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            output_extension: "jpg".to_string(),
            seed: None,
            sequence: AugmentSequence::default(),
            label_resampling: Resampling::Bilinear,
        }
    }
}

impl AugmentConfig {
    pub fn builder() -> AugmentConfigBuilder {
        AugmentConfigBuilder::default()
    }

    /// Reads a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn image_output_dir(&self) -> &Path {
        self.image_output_dir.as_deref().unwrap_or(&self.image_dir)
    }

    pub fn label_output_dir(&self) -> &Path {
        self.label_output_dir.as_deref().unwrap_or(&self.label_dir)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.image_dir.as_os_str().is_empty(),
            "image_dir must be set"
        );
        ensure!(
            !self.label_dir.as_os_str().is_empty(),
            "label_dir must be set"
        );
        ensure!(
            self.augmentation_factor > 0,
            "augmentation_factor must be > 0 (got {})",
            self.augmentation_factor
        );
        ensure!(
            !self.extensions.is_empty(),
            "At least one image extension is required"
        );
        ensure!(
            !self.output_extension.trim_start_matches('.').is_empty(),
            "output_extension must not be empty"
        );
        self.sequence.validate().context("Invalid augmentation sequence")
    }
}

/// Builder for AugmentConfig with method chaining
#[derive(Default)]
pub struct AugmentConfigBuilder {
    config: AugmentConfig,
}

impl AugmentConfigBuilder {
    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn label_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.label_dir = dir.into();
        self
    }

    pub fn image_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_output_dir = Some(dir.into());
        self
    }

    pub fn label_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.label_output_dir = Some(dir.into());
        self
    }

    /// Set the number of augmented copies per source (must be > 0)
    pub fn augmentation_factor(mut self, factor: usize) -> Self {
        self.config.augmentation_factor = factor;
        self
    }

    pub fn max_images(mut self, max: usize) -> Self {
        self.config.max_images = max;
        self
    }

    pub fn extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.config.extensions = extensions.iter().map(|e| e.as_ref().to_string()).collect();
        self
    }

    pub fn output_extension(mut self, extension: impl Into<String>) -> Self {
        self.config.output_extension = extension.into();
        self
    }

    /// Set the seed; the same seed and inputs give byte-identical outputs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn sequence(mut self, sequence: AugmentSequence) -> Self {
        self.config.sequence = sequence;
        self
    }

    pub fn label_resampling(mut self, resampling: Resampling) -> Self {
        self.config.label_resampling = resampling;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> AugmentConfig {
        self.config
    }
}
