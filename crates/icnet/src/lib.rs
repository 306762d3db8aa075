pub mod backbone;
pub mod cff;
pub mod config;
pub mod conv_block;
pub mod model;
pub mod ops;
pub mod ppm;

pub use backbone::{load_backbone_weights, Backbone, LoadReport, MobileNetV2Features};
pub use cff::{CascadeFeatFusion, CffOutput};
pub use config::{IcnetConfig, IcnetConfigBuilder};
pub use conv_block::{ConvBlock, ConvBlockConfig};
pub use model::{Icnet, IcnetOutput, Mode, TrainingLogits};
pub use ppm::PyramidPoolingModule;
