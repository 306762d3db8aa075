//! src/config.rs
//!
//! Configuration for building an [`Icnet`](crate::Icnet).
//!
//! Example:
//! ```ignore
//! let config = IcnetConfig::builder()
//!     .num_classes(19)
//!     .pyramids([1, 2, 3, 6])
//!     .build();
//! ```
//!
//! Backbone channel counts are not configured here; they are read from the
//! backbone so the two can never disagree.

use crate::ppm::PyramidPoolingModule;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcnetConfig {
    /// Number of output classes (defaults to 1, a binary foreground map)
    pub num_classes: i64,
    /// Pyramid pooling bin sizes for the Sub4 branch
    pub pyramids: Vec<i64>,
    /// Channel width of both cascade fusion stages
    pub branch_channels: i64,
}

impl Default for IcnetConfig {
    fn default() -> Self {
        Self {
            num_classes: 1,
            pyramids: PyramidPoolingModule::DEFAULT_PYRAMIDS.to_vec(),
            branch_channels: 8,
        }
    }
}

impl IcnetConfig {
    pub fn builder() -> IcnetConfigBuilder {
        IcnetConfigBuilder::default()
    }
}

/// Builder for IcnetConfig with method chaining
#[derive(Default)]
pub struct IcnetConfigBuilder {
    config: IcnetConfig,
}

impl IcnetConfigBuilder {
    /// Set the number of classes (must be > 0)
    pub fn num_classes(mut self, num_classes: i64) -> Self {
        self.config.num_classes = num_classes;
        self
    }

    /// Set the pyramid pooling bin sizes
    pub fn pyramids(mut self, pyramids: impl Into<Vec<i64>>) -> Self {
        self.config.pyramids = pyramids.into();
        self
    }

    /// Set the cascade fusion width
    pub fn branch_channels(mut self, channels: i64) -> Self {
        self.config.branch_channels = channels;
        self
    }

    pub fn build(self) -> IcnetConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = IcnetConfig::builder().num_classes(4).pyramids([2, 4]).build();
        assert_eq!(config.num_classes, 4);
        assert_eq!(config.pyramids, vec![2, 4]);
        assert_eq!(config.branch_channels, 8);
        assert_eq!(IcnetConfig::default().pyramids, vec![1, 2, 3, 6]);
    }
}
