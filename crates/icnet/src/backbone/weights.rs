use anyhow::{bail, ensure, Context, Result};
use bytemuck::cast_slice;
use log::{debug, info};
use safetensors::{
    tensor::{Dtype, TensorView},
    SafeTensors,
};
use std::{fs, path::Path};
use tch::{nn, Tensor};

/// Outcome of [`load_backbone_weights`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of tensors copied into the var store.
    pub loaded: usize,
    /// File entries with no matching variable (e.g. classifier weights,
    /// `num_batches_tracked`), sorted by name.
    pub skipped: Vec<String>,
}

/// Copies pretrained backbone weights from a `.safetensors` file into `vs`.
///
/// Tensor names in the file are torchvision `state_dict` names
/// (`features.0.0.weight`, ...). Each one is looked up as
/// `<prefix>.<name>` in the var store. Matching variables must have the
/// same shape; the copy runs without gradient tracking and converts to the
/// variable's kind and device.
///
/// # Example
/// ```ignore
/// let mut vs = nn::VarStore::new(Device::cuda_if_available());
/// let model = Icnet::new(&vs.root(), &IcnetConfig::default())?;
/// let report = load_backbone_weights(&vs, "backbone", "mobilenet_v2.safetensors")?;
/// ```
pub fn load_backbone_weights(
    vs: &nn::VarStore,
    prefix: &str,
    path: impl AsRef<Path>,
) -> Result<LoadReport> {
    let path = path.as_ref();
    let file_bytes = fs::read(path)
        .with_context(|| format!("Failed to read safetensors file: {}", path.display()))?;
    let safetensors = SafeTensors::deserialize(&file_bytes)
        .with_context(|| format!("Failed to parse safetensors file: {}", path.display()))?;

    let variables = vs.variables();
    let mut names: Vec<String> = safetensors.names().into_iter().cloned().collect();
    names.sort_unstable();

    let mut report = LoadReport::default();
    tch::no_grad(|| -> Result<()> {
        for name in names {
            let target_name = format!("{prefix}.{name}");
            let Some(target) = variables.get(&target_name) else {
                debug!("No variable for pretrained tensor '{}', skipping", name);
                report.skipped.push(name);
                continue;
            };

            let view = safetensors.tensor(&name)?;
            let source = tensor_from_view(&view)
                .with_context(|| format!("Failed to convert tensor '{}'", name))?;
            ensure!(
                source.size() == target.size(),
                "Shape mismatch for '{}': file has {:?}, model expects {:?}",
                target_name,
                source.size(),
                target.size()
            );

            let mut target = target.shallow_clone();
            target
                .f_copy_(&source.to_kind(target.kind()).to_device(target.device()))
                .with_context(|| format!("Failed to copy into '{}'", target_name))?;
            report.loaded += 1;
        }
        Ok(())
    })?;

    info!(
        "Loaded {} backbone tensors from {} ({} skipped)",
        report.loaded,
        path.display(),
        report.skipped.len()
    );
    Ok(report)
}

/// Converts a TensorView to a tch::Tensor.
/// Supported dtypes: U8, I8, I16, I32, I64, F32, F64.
fn tensor_from_view(view: &TensorView<'_>) -> Result<Tensor> {
    let shape: Vec<i64> = view.shape().iter().map(|&d| d as i64).collect();
    let raw = view.data();
    let tensor = match view.dtype() {
        Dtype::U8 => Tensor::from_slice(raw),
        Dtype::I8 => Tensor::from_slice(cast_slice::<u8, i8>(raw)),
        Dtype::I16 => Tensor::from_slice(cast_slice::<u8, i16>(raw)),
        Dtype::I32 => Tensor::from_slice(cast_slice::<u8, i32>(raw)),
        Dtype::I64 => Tensor::from_slice(cast_slice::<u8, i64>(raw)),
        Dtype::F32 => Tensor::from_slice(cast_slice::<u8, f32>(raw)),
        Dtype::F64 => Tensor::from_slice(cast_slice::<u8, f64>(raw)),
        Dtype::F16 | Dtype::BF16 => bail!(
            "Half-precision weights are not supported; export the backbone as F32 (shape {:?})",
            shape
        ),
        other => bail!("Unsupported dtype '{:?}' (shape {:?})", other, shape),
    };
    Ok(tensor.reshape(&shape))
}
