use icnet::Backbone;
use tch::{nn, Device, Kind, Tensor};

/// Two strided convolutions standing in for a pretrained extractor.
#[derive(Debug)]
pub struct StridedStub {
    sub2: nn::Conv2D,
    sub4: nn::Conv2D,
}

impl StridedStub {
    pub fn new(p: nn::Path) -> Self {
        let sub2 = nn::conv2d(
            &p / "sub2",
            3,
            12,
            3,
            nn::ConvConfig {
                stride: 2,
                padding: 1,
                ..Default::default()
            },
        );
        let sub4 = nn::conv2d(
            &p / "sub4",
            12,
            20,
            3,
            nn::ConvConfig {
                stride: 4,
                padding: 1,
                ..Default::default()
            },
        );
        Self { sub2, sub4 }
    }
}

impl Backbone for StridedStub {
    fn sub2_channels(&self) -> i64 {
        12
    }

    fn sub4_channels(&self) -> i64 {
        20
    }

    fn forward_sub2(&self, xs: &Tensor, _train: bool) -> Tensor {
        xs.apply(&self.sub2)
    }

    fn forward_sub4(&self, xs: &Tensor, _train: bool) -> Tensor {
        xs.apply(&self.sub4)
    }
}

pub fn random_images(batch: i64, height: i64, width: i64) -> Tensor {
    Tensor::randn(&[batch, 3, height, width], (Kind::Float, Device::Cpu))
}
