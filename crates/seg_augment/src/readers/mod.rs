pub mod paired_dir;

pub use paired_dir::{ImagePair, PairedImageSource};

use anyhow::Result;

/// Lazily yields items from some on-disk source.
///
/// Errors are reported per item so a caller can decide whether one bad
/// entry aborts the whole run.
pub trait DataSource<T>: Send + Sync {
    fn stream(&self) -> Result<Box<dyn Iterator<Item = Result<T>> + Send>>;
}
