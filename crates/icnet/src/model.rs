//! src/model.rs
//!
//! The ICNet image cascade network.
//!
//! # Architecture Overview
//!
//! ```text
//!  input (N, 3, H, W)
//!    │
//!    ├──────────────── Sub1: 3 x ConvBlock (s2) ───────────────── (64, H/8) ─────┐
//!    │                                                                           │
//!    └─ resize 1/2 ─ Sub2: backbone[0..2] ─── (16, H/4) ──────────┐              │
//!                          │                                      │              │
//!                          └─ resize 1/2 ─ Sub4: backbone[2..7]   │              │
//!                                          ─ PPM ─ ConvBlock 1x1  │              │
//!                                          (8, H/32) ─────── cff_24 (H/4) ── cff_12 (H/8)
//!                                                                                │
//!                                            resize 2x ─ conv_cls 1x1 ─ (C, H/4) ┘
//!                                                 │
//!                        inference: resize 4x ─ (C, H)
//!                        training:  (main, aux_12, aux_24)
//! ```
//!
//! The forward mode is chosen by the caller on every call through [`Mode`];
//! the model holds no training flag.

use crate::backbone::{Backbone, MobileNetV2Features};
use crate::cff::CascadeFeatFusion;
use crate::config::IcnetConfig;
use crate::conv_block::{ConvBlock, ConvBlockConfig};
use crate::ops::{self, rescale_bilinear};
use crate::ppm::PyramidPoolingModule;
use anyhow::{ensure, Context, Result};
use log::debug;
use tch::nn::{self, Module};
use tch::Tensor;

/// Smallest spatial side the three branches can handle (Sub4 runs at 1/32).
pub const MIN_INPUT_SIDE: i64 = 32;

/// Selects the computation path of a forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Batch statistics in batch norm; auxiliary heads are returned.
    Training,
    /// Running statistics; a single full-resolution logit map is returned.
    Inference,
}

/// The three logit maps used for multi-loss supervision.
#[derive(Debug)]
pub struct TrainingLogits {
    /// Main head at 1/4 input resolution.
    pub main: Tensor,
    /// Auxiliary head of `cff_12`, at Sub1 resolution (1/8).
    pub aux_12: Tensor,
    /// Auxiliary head of `cff_24`, at Sub2 resolution (1/4).
    pub aux_24: Tensor,
}

/// Result of [`Icnet::forward`].
#[derive(Debug)]
pub enum IcnetOutput {
    Inference(Tensor),
    Training(TrainingLogits),
}

#[derive(Debug)]
pub struct Icnet<B: Backbone = MobileNetV2Features> {
    conv_sub1: nn::SequentialT,
    backbone: B,
    ppm: PyramidPoolingModule,
    conv_sub4_reduce: ConvBlock,
    cff_24: CascadeFeatFusion,
    cff_12: CascadeFeatFusion,
    conv_cls: nn::Conv2D,
    num_classes: i64,
}

impl Icnet<MobileNetV2Features> {
    /// Builds ICNet on a MobileNetV2 backbone stored under `<path>.backbone`.
    ///
    /// The backbone starts from fresh weights; load pretrained ones with
    /// [`load_backbone_weights`](crate::load_backbone_weights) using the
    /// `"backbone"` prefix.
    pub fn new<'a>(
        p: impl std::borrow::Borrow<nn::Path<'a>>,
        config: &IcnetConfig,
    ) -> Result<Self> {
        Self::with_backbone(p, config, |p| MobileNetV2Features::new(p))
    }
}

impl<B: Backbone> Icnet<B> {
    /// Builds ICNet around a custom backbone.
    ///
    /// `build_backbone` receives the `<path>.backbone` sub-path. Every layer
    /// outside the backbone is initialized here: Kaiming-normal (fan-out)
    /// convolutions without bias, batch norm at scale 1 and shift 0.
    pub fn with_backbone<'a, F>(
        p: impl std::borrow::Borrow<nn::Path<'a>>,
        config: &IcnetConfig,
        build_backbone: F,
    ) -> Result<Self>
    where
        F: FnOnce(nn::Path<'a>) -> B,
    {
        ensure!(
            config.num_classes > 0,
            "Number of classes must be positive (got {})",
            config.num_classes
        );
        ensure!(
            config.branch_channels > 0,
            "Cascade width must be positive (got {})",
            config.branch_channels
        );

        let p = p.borrow();
        let strided = ConvBlockConfig {
            stride: 2,
            padding: 1,
            bias: false,
        };
        let sub1 = p / "conv_sub1";
        let conv_sub1 = nn::seq_t()
            .add(ConvBlock::new(&sub1 / "conv1", 3, 32, 3, strided))
            .add(ConvBlock::new(&sub1 / "conv2", 32, 32, 3, strided))
            .add(ConvBlock::new(&sub1 / "conv3", 32, 64, 3, strided));

        let backbone = build_backbone(p / "backbone");
        let sub4_channels = backbone.sub4_channels();
        let reduced_channels = sub4_channels / 4;
        ensure!(
            reduced_channels > 0,
            "Backbone Sub4 output must have at least 4 channels (got {})",
            sub4_channels
        );

        let ppm = PyramidPoolingModule::new(config.pyramids.clone())?;
        let conv_sub4_reduce = ConvBlock::new(
            p / "conv_sub4_reduce",
            sub4_channels,
            reduced_channels,
            1,
            ConvBlockConfig {
                bias: false,
                ..Default::default()
            },
        );

        let width = config.branch_channels;
        let cff_24 = CascadeFeatFusion::new(
            p / "cff_24",
            reduced_channels,
            backbone.sub2_channels(),
            width,
            config.num_classes,
        );
        let cff_12 = CascadeFeatFusion::new(p / "cff_12", width, 64, width, config.num_classes);
        let conv_cls = nn::conv2d(
            p / "conv_cls",
            width,
            config.num_classes,
            1,
            ops::conv_config(1, 0, 1, false),
        );

        debug!(
            "Built ICNet: {} classes, pyramids {:?}, backbone channels {}/{}",
            config.num_classes,
            ppm.pyramids(),
            backbone.sub2_channels(),
            sub4_channels
        );

        Ok(Self {
            conv_sub1,
            backbone,
            ppm,
            conv_sub4_reduce,
            cff_24,
            cff_12,
            conv_cls,
            num_classes: config.num_classes,
        })
    }

    pub fn num_classes(&self) -> i64 {
        self.num_classes
    }

    pub fn backbone(&self) -> &B {
        &self.backbone
    }

    /// Full-resolution class logits `(N, num_classes, H, W)`, using running
    /// batch-norm statistics. `H` and `W` should be multiples of 32 for the
    /// output to match the input exactly.
    pub fn infer(&self, xs: &Tensor) -> Result<Tensor> {
        validate_input(xs)?;
        let (x_sub1, x_sub2, x_sub4) = self.branches(xs, false);

        let x_cff_24 = self.cff_24.fuse(&x_sub4, &x_sub2, false);
        let x_cff_12 = self.cff_12.fuse(&x_cff_24, &x_sub1, false);

        let logits = self.classify(&x_cff_12);
        Ok(rescale_bilinear(&logits, 4.0))
    }

    /// Main and auxiliary logits for deep supervision, using batch
    /// statistics. The main head is left at 1/4 resolution.
    pub fn forward_train(&self, xs: &Tensor) -> Result<TrainingLogits> {
        validate_input(xs)?;
        let (x_sub1, x_sub2, x_sub4) = self.branches(xs, true);

        let (x_cff_24, aux_24) = self.cff_24.fuse_with_aux(&x_sub4, &x_sub2, true);
        let (x_cff_12, aux_12) = self.cff_12.fuse_with_aux(&x_cff_24, &x_sub1, true);

        Ok(TrainingLogits {
            main: self.classify(&x_cff_12),
            aux_12,
            aux_24,
        })
    }

    pub fn forward(&self, xs: &Tensor, mode: Mode) -> Result<IcnetOutput> {
        match mode {
            Mode::Training => self.forward_train(xs).map(IcnetOutput::Training),
            Mode::Inference => self.infer(xs).map(IcnetOutput::Inference),
        }
    }

    fn branches(&self, xs: &Tensor, train: bool) -> (Tensor, Tensor, Tensor) {
        let x_sub1 = xs.apply_t(&self.conv_sub1, train);

        let x_sub2 = self
            .backbone
            .forward_sub2(&rescale_bilinear(xs, 0.5), train);

        let x_sub4 = self
            .backbone
            .forward_sub4(&rescale_bilinear(&x_sub2, 0.5), train);
        let x_sub4 = self
            .ppm
            .forward(&x_sub4)
            .apply_t(&self.conv_sub4_reduce, train);

        (x_sub1, x_sub2, x_sub4)
    }

    fn classify(&self, fused: &Tensor) -> Tensor {
        rescale_bilinear(fused, 2.0).apply(&self.conv_cls)
    }
}

fn validate_input(xs: &Tensor) -> Result<()> {
    let (_batch, channels, height, width) = xs
        .size4()
        .context("ICNet expects a 4D input tensor [N, 3, H, W]")?;
    ensure!(
        channels == 3,
        "ICNet expects 3 input channels (got {})",
        channels
    );
    ensure!(
        height >= MIN_INPUT_SIDE && width >= MIN_INPUT_SIDE,
        "Input must be at least {}x{} (got {}x{})",
        MIN_INPUT_SIDE,
        MIN_INPUT_SIDE,
        height,
        width
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_validate_input() {
        let opts = (Kind::Float, Device::Cpu);
        assert!(validate_input(&Tensor::zeros(&[1, 3, 64, 64], opts)).is_ok());
        assert!(validate_input(&Tensor::zeros(&[3, 64, 64], opts)).is_err());
        assert!(validate_input(&Tensor::zeros(&[1, 1, 64, 64], opts)).is_err());
        assert!(validate_input(&Tensor::zeros(&[1, 3, 16, 64], opts)).is_err());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let vs = nn::VarStore::new(Device::Cpu);
        let zero_classes = IcnetConfig::builder().num_classes(0).build();
        assert!(Icnet::new(vs.root(), &zero_classes).is_err());

        let bad_bins = IcnetConfig::builder().pyramids([0]).build();
        assert!(Icnet::new(vs.root() / "other", &bad_bins).is_err());
    }
}
