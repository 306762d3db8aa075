//! src/backbone/mod.rs
//!
//! Feature extractors that feed the Sub2 and Sub4 branches.
//!
//! ```text
//! backbone/
//! ├── mod.rs        → `Backbone` capability trait
//! ├── mobilenet.rs  → MobileNetV2 `features[0..7]`, torchvision variable names
//! └── weights.rs    → pretrained weight loading from `.safetensors`
//! ```
//!
//! The network only talks to the [`Backbone`] trait, so a different
//! pretrained extractor can be dropped in through
//! [`Icnet::with_backbone`](crate::Icnet::with_backbone) without touching
//! the fusion logic.

pub mod mobilenet;
pub mod weights;

pub use mobilenet::MobileNetV2Features;
pub use weights::{load_backbone_weights, LoadReport};

use tch::Tensor;

/// A pretrained feature pyramid split into the two stage ranges ICNet uses.
///
/// - `forward_sub2` runs the shallow stages on the half-resolution image.
/// - `forward_sub4` runs the deeper stages on the half-resolution Sub2 output.
///
/// `train` controls batch-norm statistics inside the backbone.
pub trait Backbone: std::fmt::Debug + Send {
    /// Channels produced by [`forward_sub2`](Self::forward_sub2).
    fn sub2_channels(&self) -> i64;

    /// Channels produced by [`forward_sub4`](Self::forward_sub4).
    fn sub4_channels(&self) -> i64;

    fn forward_sub2(&self, xs: &Tensor, train: bool) -> Tensor;

    fn forward_sub4(&self, xs: &Tensor, train: bool) -> Tensor;
}
