use crate::ops;
use tch::{nn, Tensor};

/// Stride, padding and bias options for a [`ConvBlock`].
#[derive(Debug, Clone, Copy)]
pub struct ConvBlockConfig {
    pub stride: i64,
    pub padding: i64,
    pub bias: bool,
}

impl Default for ConvBlockConfig {
    fn default() -> Self {
        Self {
            stride: 1,
            padding: 0,
            bias: true,
        }
    }
}

/// Convolution -> batch norm -> ReLU.
///
/// Variables live under `<path>.conv` and `<path>.bn`. The convolution is
/// Kaiming-normal initialized (fan-out), batch norm starts at scale 1 and
/// shift 0.
///
/// # Example
/// ```ignore
/// let block = ConvBlock::new(&vs.root() / "conv1", 3, 32, 3, ConvBlockConfig {
///     stride: 2,
///     padding: 1,
///     bias: false,
/// });
/// let ys = xs.apply_t(&block, train); // [N, 32, H/2, W/2]
/// ```
#[derive(Debug)]
pub struct ConvBlock {
    conv: nn::Conv2D,
    bn: nn::BatchNorm,
}

impl ConvBlock {
    pub fn new<'a>(
        p: impl std::borrow::Borrow<nn::Path<'a>>,
        in_channels: i64,
        out_channels: i64,
        kernel_size: i64,
        config: ConvBlockConfig,
    ) -> Self {
        let p = p.borrow();
        let conv = nn::conv2d(
            p / "conv",
            in_channels,
            out_channels,
            kernel_size,
            ops::conv_config(config.stride, config.padding, 1, config.bias),
        );
        let bn = nn::batch_norm2d(p / "bn", out_channels, ops::batch_norm_config());
        Self { conv, bn }
    }
}

impl nn::ModuleT for ConvBlock {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        xs.apply(&self.conv).apply_t(&self.bn, train).relu()
    }
}
