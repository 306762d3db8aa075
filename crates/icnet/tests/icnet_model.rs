//! End-to-end tests for the ICNet forward passes.
//!
//! Tests cover:
//! - Inference and training output shapes
//! - Explicit mode dispatch
//! - Weight initialization outside the backbone
//! - Batch-norm statistics only moving in training mode
//! - Substituting a custom backbone

mod common;
use common::{random_images, StridedStub};
use icnet::{Backbone, Icnet, IcnetConfig, IcnetOutput, Mode};

use anyhow::Result;
use tch::{nn, Device, Kind};

// ================================================================================================
// 1. Output shapes
// ================================================================================================
#[test]
fn test_inference_output_matches_input_resolution() -> Result<()> {
    let vs = nn::VarStore::new(Device::Cpu);
    let config = IcnetConfig::builder().num_classes(5).build();
    let model = Icnet::new(vs.root(), &config)?;

    let logits = tch::no_grad(|| model.infer(&random_images(2, 64, 64)))?;
    assert_eq!(logits.size(), vec![2, 5, 64, 64]);

    let logits = tch::no_grad(|| model.infer(&random_images(1, 64, 96)))?;
    assert_eq!(logits.size(), vec![1, 5, 64, 96]);
    Ok(())
}

#[test]
fn test_training_returns_three_heads() -> Result<()> {
    let vs = nn::VarStore::new(Device::Cpu);
    let config = IcnetConfig::builder().num_classes(3).build();
    let model = Icnet::new(vs.root(), &config)?;

    let logits = model.forward_train(&random_images(2, 64, 128))?;
    assert_eq!(logits.main.size(), vec![2, 3, 16, 32]); // 1/4
    assert_eq!(logits.aux_12.size(), vec![2, 3, 8, 16]); // 1/8, Sub1
    assert_eq!(logits.aux_24.size(), vec![2, 3, 16, 32]); // 1/4, Sub2
    Ok(())
}

#[test]
fn test_forward_dispatches_on_mode() -> Result<()> {
    let vs = nn::VarStore::new(Device::Cpu);
    let model = Icnet::new(vs.root(), &IcnetConfig::default())?;
    let images = random_images(2, 64, 64);

    match model.forward(&images, Mode::Inference)? {
        IcnetOutput::Inference(logits) => assert_eq!(logits.size(), vec![2, 1, 64, 64]),
        IcnetOutput::Training(_) => panic!("inference must return a single map"),
    }
    match model.forward(&images, Mode::Training)? {
        IcnetOutput::Training(logits) => assert_eq!(logits.main.size(), vec![2, 1, 16, 16]),
        IcnetOutput::Inference(_) => panic!("training must return all heads"),
    }
    Ok(())
}

#[test]
fn test_rejects_malformed_input() -> Result<()> {
    let vs = nn::VarStore::new(Device::Cpu);
    let model = Icnet::new(vs.root(), &IcnetConfig::default())?;

    let gray = tch::Tensor::zeros(&[1, 1, 64, 64], (Kind::Float, Device::Cpu));
    let err = model.infer(&gray).unwrap_err();
    assert!(err.to_string().contains("3 input channels"));

    assert!(model.forward_train(&random_images(1, 16, 64)).is_err());
    Ok(())
}

// ================================================================================================
// 2. Parameters
// ================================================================================================
#[test]
fn test_weight_initialization_outside_backbone() -> Result<()> {
    let vs = nn::VarStore::new(Device::Cpu);
    let _model = Icnet::new(vs.root(), &IcnetConfig::default())?;

    let mut bn_weights = 0;
    for (name, tensor) in vs.variables() {
        if name.starts_with("backbone.") {
            continue;
        }
        if name.ends_with("bn.weight") {
            let deviation = (&tensor - 1.0).abs().max().double_value(&[]);
            assert!(deviation < 1e-6, "{} should start at 1", name);
            bn_weights += 1;
        } else if name.ends_with(".bias") {
            let magnitude = tensor.abs().max().double_value(&[]);
            assert!(magnitude < 1e-6, "{} should start at 0", name);
        }
    }
    // conv_sub1 x3, conv_sub4_reduce, 2 per cascade stage
    assert_eq!(bn_weights, 8);

    let variables = vs.variables();
    let conv_cls = &variables["conv_cls.weight"];
    assert_eq!(conv_cls.size(), vec![1, 8, 1, 1]);
    assert!(conv_cls.abs().sum(Kind::Float).double_value(&[]) > 0.0);
    assert!(!variables.contains_key("conv_cls.bias"));
    Ok(())
}

#[test]
fn test_running_statistics_only_update_in_training() -> Result<()> {
    let vs = nn::VarStore::new(Device::Cpu);
    let model = Icnet::new(vs.root(), &IcnetConfig::default())?;
    let running_mean = || {
        vs.variables()["cff_12.conv_high.bn.running_mean"]
            .abs()
            .sum(Kind::Float)
            .double_value(&[])
    };
    let images = random_images(2, 64, 64) + 1.0;

    tch::no_grad(|| model.infer(&images))?;
    assert_eq!(running_mean(), 0.0);

    tch::no_grad(|| model.forward_train(&images))?;
    assert!(running_mean() > 0.0);
    Ok(())
}

// ================================================================================================
// 3. Backbone substitution
// ================================================================================================
#[test]
fn test_custom_backbone() -> Result<()> {
    let vs = nn::VarStore::new(Device::Cpu);
    let config = IcnetConfig::builder().num_classes(2).pyramids([1, 2]).build();
    let model = Icnet::with_backbone(vs.root(), &config, StridedStub::new)?;

    assert_eq!(model.backbone().sub4_channels(), 20);
    let variables = vs.variables();
    assert!(variables.contains_key("backbone.sub2.weight"));
    // 20 / 4 reduced channels feed the first cascade stage
    assert_eq!(variables["conv_sub4_reduce.conv.weight"].size(), vec![5, 20, 1, 1]);
    assert_eq!(variables["cff_24.conv_high.conv.weight"].size(), vec![8, 12, 1, 1]);

    let logits = tch::no_grad(|| model.infer(&random_images(1, 64, 64)))?;
    assert_eq!(logits.size(), vec![1, 2, 64, 64]);
    Ok(())
}
