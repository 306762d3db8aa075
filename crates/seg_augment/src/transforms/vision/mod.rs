//! src/transforms/vision/mod.rs
//!
//! Vision transforms for segmentation augmentation.
//!
//! # Module Organization
//!
//! ```text
//! transforms/vision/
//! ├── geometric.rs     → Resampling primitives (EnsureRGB, projective warp)
//! ├── augmentation.rs  → Randomized flip/rotate/scale/translate pipeline
//! ├── conversion.rs    → Channel conversions (grayscale labels)
//! └── io.rs            → Image loading and saving
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use crate::transforms::Transform;
//! use crate::transforms::vision::{AugmentSequence, LoadImage, EnsureRGB, ToGrayscale};
//!
//! let load = LoadImage::new().then(EnsureRGB);
//! let realization = AugmentSequence::default().to_deterministic(&mut rng);
//! let image = realization.apply(load.apply(image_path)?)?;
//! let label = realization.then(ToGrayscale).apply(load.apply(label_path)?)?;
//! ```

pub mod augmentation;
pub mod conversion;
pub mod geometric;
pub mod io;

pub use augmentation::{AffineRealization, AugmentSequence};
pub use conversion::ToGrayscale;
pub use geometric::{warp_dynamic, EnsureRGB, Resampling};
pub use io::{save_image, LoadImage};
