use crate::ops::{resize_bilinear, spatial_size};
use anyhow::{ensure, Result};
use tch::{nn, Tensor};

/// Multi-scale context aggregation without learned parameters.
///
/// For each bin size `b` the input is adaptive-average-pooled to `b x b`,
/// resized back to the input resolution (bilinear, corner-aligned) and
/// added to a running sum seeded with the input itself. Bins are summed
/// left to right in configuration order, so the output is
/// `input + up(pool_b0(input)) + up(pool_b1(input)) + ...` with the same
/// shape as the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyramidPoolingModule {
    pyramids: Vec<i64>,
}

impl PyramidPoolingModule {
    /// Bin sizes used by ICNet.
    pub const DEFAULT_PYRAMIDS: [i64; 4] = [1, 2, 3, 6];

    pub fn new(pyramids: impl Into<Vec<i64>>) -> Result<Self> {
        let pyramids = pyramids.into();
        ensure!(
            pyramids.iter().all(|&bin| bin > 0),
            "Pyramid bin sizes must be positive (got {:?})",
            pyramids
        );
        Ok(Self { pyramids })
    }

    pub fn pyramids(&self) -> &[i64] {
        &self.pyramids
    }
}

impl Default for PyramidPoolingModule {
    fn default() -> Self {
        Self {
            pyramids: Self::DEFAULT_PYRAMIDS.to_vec(),
        }
    }
}

impl nn::Module for PyramidPoolingModule {
    fn forward(&self, xs: &Tensor) -> Tensor {
        let size = spatial_size(xs);
        self.pyramids
            .iter()
            .fold(xs.shallow_clone(), |feat, &bin| {
                let pooled = xs.adaptive_avg_pool2d(&[bin, bin]);
                feat + resize_bilinear(&pooled, size)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::nn::Module;
    use tch::{Device, Kind};

    #[test]
    fn test_ppm_preserves_shape() -> Result<()> {
        let xs = Tensor::randn(&[2, 8, 7, 11], (Kind::Float, Device::Cpu));
        for pyramids in [vec![], vec![1], vec![1, 2, 3, 6], vec![4, 9]] {
            let ppm = PyramidPoolingModule::new(pyramids)?;
            assert_eq!(ppm.forward(&xs).size(), xs.size());
        }
        Ok(())
    }

    #[test]
    fn test_ppm_constant_input_scales_by_bin_count() {
        // Pooling and resizing a constant map returns the same constant,
        // so the sum is (1 + number of bins) times the input.
        let xs = Tensor::full(&[1, 3, 12, 12], 0.5, (Kind::Float, Device::Cpu));
        let ppm = PyramidPoolingModule::default();
        let expected = &xs * 5.0;

        let diff = (ppm.forward(&xs) - expected).abs().max();
        assert!(diff.double_value(&[]) < 1e-6);
    }

    #[test]
    fn test_ppm_global_bin_adds_mean() -> Result<()> {
        let xs = Tensor::arange(16, (Kind::Float, Device::Cpu)).reshape(&[1, 1, 4, 4]);
        let ppm = PyramidPoolingModule::new([1])?;

        let ys = ppm.forward(&xs);
        // mean of 0..16 is 7.5
        assert!((ys.double_value(&[0, 0, 0, 0]) - 7.5).abs() < 1e-6);
        assert!((ys.double_value(&[0, 0, 3, 3]) - 22.5).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_ppm_rejects_non_positive_bins() {
        assert!(PyramidPoolingModule::new([1, 0, 3]).is_err());
        assert!(PyramidPoolingModule::new([-2]).is_err());
    }
}
