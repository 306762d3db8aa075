//! src/ops.rs
//!
//! Shared tensor helpers: corner-aligned bilinear resampling and the layer
//! configurations that carry the network's weight initialization.

use tch::{nn, Tensor};

/// Returns the trailing `(height, width)` of an `[N, C, H, W]` tensor.
pub fn spatial_size(xs: &Tensor) -> (i64, i64) {
    let size = xs.size();
    let rank = size.len();
    (size[rank - 2], size[rank - 1])
}

/// Bilinear resize to an explicit spatial size with `align_corners = true`.
pub fn resize_bilinear(xs: &Tensor, (height, width): (i64, i64)) -> Tensor {
    xs.upsample_bilinear2d(&[height, width], true, None::<f64>, None::<f64>)
}

/// Bilinear resize by a scale factor with `align_corners = true`.
///
/// The output size is `floor(dim * factor)` on both spatial axes, the same
/// rule libtorch applies to `interpolate(scale_factor=...)`.
pub fn rescale_bilinear(xs: &Tensor, factor: f64) -> Tensor {
    let (height, width) = spatial_size(xs);
    let scaled = |dim: i64| (dim as f64 * factor).floor() as i64;
    resize_bilinear(xs, (scaled(height), scaled(width)))
}

/// Kaiming-normal initializer (fan-out, ReLU gain) used for every
/// convolution the network owns.
pub fn kaiming_fan_out() -> nn::Init {
    nn::Init::Kaiming {
        dist: nn::NormalOrUniform::Normal,
        fan: nn::FanInOut::FanOut,
        non_linearity: nn::NonLinearity::ReLU,
    }
}

/// Convolution config with Kaiming fan-out weights and a zeroed bias.
pub fn conv_config(stride: i64, padding: i64, dilation: i64, bias: bool) -> nn::ConvConfig {
    nn::ConvConfig {
        stride,
        padding,
        dilation,
        bias,
        ws_init: kaiming_fan_out(),
        bs_init: nn::Init::Const(0.),
        ..Default::default()
    }
}

/// Batch norm config with scale 1 and shift 0.
pub fn batch_norm_config() -> nn::BatchNormConfig {
    nn::BatchNormConfig {
        ws_init: nn::Init::Const(1.),
        bs_init: nn::Init::Const(0.),
        ..Default::default()
    }
}
