use super::Backbone;
use crate::ops;
use tch::{nn, Tensor};

/// `(expand_ratio, out_channels, stride)` for `features[2..7]`.
const SUB4_BLOCKS: [(i64, i64, i64); 5] = [
    (6, 24, 2),
    (6, 24, 1),
    (6, 32, 2),
    (6, 32, 1),
    (6, 32, 1),
];

/// Conv -> BN -> ReLU6, stored as `<path>.0` and `<path>.1`.
#[derive(Debug)]
struct ConvBnRelu6 {
    conv: nn::Conv2D,
    bn: nn::BatchNorm,
}

impl ConvBnRelu6 {
    fn new(
        p: &nn::Path,
        in_channels: i64,
        out_channels: i64,
        kernel: i64,
        stride: i64,
        groups: i64,
    ) -> Self {
        let conv = nn::conv2d(
            p / 0,
            in_channels,
            out_channels,
            kernel,
            nn::ConvConfig {
                stride,
                padding: (kernel - 1) / 2,
                groups,
                bias: false,
                ws_init: ops::kaiming_fan_out(),
                ..Default::default()
            },
        );
        let bn = nn::batch_norm2d(p / 1, out_channels, ops::batch_norm_config());
        Self { conv, bn }
    }
}

impl nn::ModuleT for ConvBnRelu6 {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        xs.apply(&self.conv).apply_t(&self.bn, train).clamp(0.0, 6.0)
    }
}

/// MobileNetV2 inverted residual: optional 1x1 expansion, 3x3 depthwise,
/// linear 1x1 projection, identity shortcut when shape is preserved.
#[derive(Debug)]
struct InvertedResidual {
    layers: nn::SequentialT,
    use_residual: bool,
}

impl InvertedResidual {
    fn new(
        p: &nn::Path,
        in_channels: i64,
        out_channels: i64,
        stride: i64,
        expand_ratio: i64,
    ) -> Self {
        let hidden = in_channels * expand_ratio;
        let conv = p / "conv";
        let mut layers = nn::seq_t();
        let mut idx = 0;

        if expand_ratio != 1 {
            layers = layers.add(ConvBnRelu6::new(&(&conv / idx), in_channels, hidden, 1, 1, 1));
            idx += 1;
        }
        layers = layers.add(ConvBnRelu6::new(&(&conv / idx), hidden, hidden, 3, stride, hidden));
        idx += 1;

        let project = nn::ConvConfig {
            bias: false,
            ws_init: ops::kaiming_fan_out(),
            ..Default::default()
        };
        layers = layers
            .add(nn::conv2d(&conv / idx, hidden, out_channels, 1, project))
            .add(nn::batch_norm2d(&conv / (idx + 1), out_channels, ops::batch_norm_config()));

        Self {
            layers,
            use_residual: stride == 1 && in_channels == out_channels,
        }
    }
}

impl nn::ModuleT for InvertedResidual {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let ys = xs.apply_t(&self.layers, train);
        if self.use_residual {
            xs + ys
        } else {
            ys
        }
    }
}

/// The first seven blocks of torchvision's MobileNetV2 `features`.
///
/// | range         | blocks                                   | output           |
/// |---------------|------------------------------------------|------------------|
/// | `features[0..2]` | conv 3->32 (s2), inverted residual 32->16 | 16 ch, stride 2 |
/// | `features[2..7]` | inverted residuals 16->24->24->32->32->32 | 32 ch, stride 4 |
///
/// Variables are named `features.<i>...` exactly as in torchvision's
/// `state_dict`, so converted ImageNet weights load with
/// [`load_backbone_weights`](super::load_backbone_weights). Fresh weights
/// follow torchvision's own initialization.
#[derive(Debug)]
pub struct MobileNetV2Features {
    sub2: nn::SequentialT,
    sub4: nn::SequentialT,
}

impl MobileNetV2Features {
    pub const SUB2_CHANNELS: i64 = 16;
    pub const SUB4_CHANNELS: i64 = 32;

    pub fn new<'a>(p: impl std::borrow::Borrow<nn::Path<'a>>) -> Self {
        let features = p.borrow() / "features";

        let sub2 = nn::seq_t()
            .add(ConvBnRelu6::new(&(&features / 0), 3, 32, 3, 2, 1))
            .add(InvertedResidual::new(&(&features / 1), 32, Self::SUB2_CHANNELS, 1, 1));

        let mut sub4 = nn::seq_t();
        let mut in_channels = Self::SUB2_CHANNELS;
        for (offset, &(expand_ratio, out_channels, stride)) in SUB4_BLOCKS.iter().enumerate() {
            sub4 = sub4.add(InvertedResidual::new(
                &(&features / (offset + 2)),
                in_channels,
                out_channels,
                stride,
                expand_ratio,
            ));
            in_channels = out_channels;
        }

        Self { sub2, sub4 }
    }
}

impl Backbone for MobileNetV2Features {
    fn sub2_channels(&self) -> i64 {
        Self::SUB2_CHANNELS
    }

    fn sub4_channels(&self) -> i64 {
        Self::SUB4_CHANNELS
    }

    fn forward_sub2(&self, xs: &Tensor, train: bool) -> Tensor {
        xs.apply_t(&self.sub2, train)
    }

    fn forward_sub4(&self, xs: &Tensor, train: bool) -> Tensor {
        xs.apply_t(&self.sub4, train)
    }
}
