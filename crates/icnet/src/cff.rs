//! src/cff.rs
//!
//! Cascade feature fusion: merges a coarse feature map into a finer one.
//!
//! ```text
//!  low ──resize to high──┬── conv 3x3 (dilation 2) ── bn ──┐
//!                        │                                 + ── relu ──> fused
//!  high ─────────────────┼── conv 1x1 ─────────────── bn ──┘
//!                        │
//!                        └── conv 1x1 ──────────────────────────────> aux logits
//! ```
//!
//! The auxiliary logits only matter for deep supervision while training,
//! so they are produced by a separate operation ([`CascadeFeatFusion::fuse_with_aux`])
//! instead of being switched on by hidden module state.

use crate::model::Mode;
use crate::ops::{self, resize_bilinear, spatial_size};
use tch::{nn, Tensor};

/// Result of [`CascadeFeatFusion::forward`].
#[derive(Debug)]
pub enum CffOutput {
    /// Inference: the fused map only.
    Fused(Tensor),
    /// Training: the fused map plus auxiliary class logits at the same resolution.
    WithAux { fused: Tensor, aux: Tensor },
}

impl CffOutput {
    /// Returns the fused map, dropping the auxiliary logits if present.
    pub fn into_fused(self) -> Tensor {
        match self {
            CffOutput::Fused(fused) | CffOutput::WithAux { fused, .. } => fused,
        }
    }
}

#[derive(Debug)]
pub struct CascadeFeatFusion {
    conv_low: nn::Conv2D,
    bn_low: nn::BatchNorm,
    conv_high: nn::Conv2D,
    bn_high: nn::BatchNorm,
    conv_low_cls: nn::Conv2D,
}

impl CascadeFeatFusion {
    /// Creates the fusion block.
    ///
    /// Variables: `conv_low.{conv,bn}`, `conv_high.{conv,bn}` and
    /// `conv_low_cls`. None of the convolutions carry a bias.
    pub fn new<'a>(
        p: impl std::borrow::Borrow<nn::Path<'a>>,
        low_channels: i64,
        high_channels: i64,
        out_channels: i64,
        num_classes: i64,
    ) -> Self {
        let p = p.borrow();
        let low = p / "conv_low";
        let high = p / "conv_high";

        let conv_low = nn::conv2d(
            &low / "conv",
            low_channels,
            out_channels,
            3,
            ops::conv_config(1, 2, 2, false),
        );
        let bn_low = nn::batch_norm2d(&low / "bn", out_channels, ops::batch_norm_config());
        let conv_high = nn::conv2d(
            &high / "conv",
            high_channels,
            out_channels,
            1,
            ops::conv_config(1, 0, 1, false),
        );
        let bn_high = nn::batch_norm2d(&high / "bn", out_channels, ops::batch_norm_config());
        // Classifies the resized low input, so it reads `low_channels`.
        let conv_low_cls = nn::conv2d(
            p / "conv_low_cls",
            low_channels,
            num_classes,
            1,
            ops::conv_config(1, 0, 1, false),
        );

        Self {
            conv_low,
            bn_low,
            conv_high,
            bn_high,
            conv_low_cls,
        }
    }

    /// Fuses `low` into `high`; the result has `high`'s spatial size.
    pub fn fuse(&self, low: &Tensor, high: &Tensor, train: bool) -> Tensor {
        let low = resize_bilinear(low, spatial_size(high));
        self.fuse_resized(&low, high, train)
    }

    /// Like [`fuse`](Self::fuse), and also returns auxiliary class logits
    /// computed from the resized `low` map.
    pub fn fuse_with_aux(&self, low: &Tensor, high: &Tensor, train: bool) -> (Tensor, Tensor) {
        let low = resize_bilinear(low, spatial_size(high));
        let fused = self.fuse_resized(&low, high, train);
        let aux = low.apply(&self.conv_low_cls);
        (fused, aux)
    }

    /// Dispatches to `fuse_with_aux` in training mode and `fuse` otherwise.
    pub fn forward(&self, low: &Tensor, high: &Tensor, mode: Mode) -> CffOutput {
        match mode {
            Mode::Training => {
                let (fused, aux) = self.fuse_with_aux(low, high, true);
                CffOutput::WithAux { fused, aux }
            }
            Mode::Inference => CffOutput::Fused(self.fuse(low, high, false)),
        }
    }

    fn fuse_resized(&self, low: &Tensor, high: &Tensor, train: bool) -> Tensor {
        let x_low = low.apply(&self.conv_low).apply_t(&self.bn_low, train);
        let x_high = high.apply(&self.conv_high).apply_t(&self.bn_high, train);
        (x_low + x_high).relu()
    }
}
