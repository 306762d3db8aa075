use crate::readers::DataSource;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::PathBuf;

/// Default image extensions, matched exactly against the end of the name.
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// An image file and the label file that carries the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    pub image: PathBuf,
    pub label: PathBuf,
}

impl ImagePair {
    /// File name shared by image and label.
    pub fn file_name(&self) -> &str {
        self.image
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    /// Everything before the first `.` of the file name
    /// (`a.b.jpg` gives `a`).
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        name.split('.').next().unwrap_or(name)
    }
}

/// Pairs every image in `image_dir` with the same-named file in `label_dir`.
///
/// Only regular files directly inside `image_dir` are considered (no
/// recursion, symlinks skipped). A name is kept when it ends in `.<ext>` for
/// one of the configured extensions; the comparison is case-sensitive, so
/// `photo.JPG` is not picked up by `jpg`. Pairs come out sorted by file name
/// so runs are reproducible across file systems.
///
/// # Example
/// ```ignore
/// let source = PairedImageSource::new("data/images", "data/labels");
/// for pair in source.stream()? {
///     let pair = pair?;
///     println!("{} -> {}", pair.image.display(), pair.label.display());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PairedImageSource {
    image_dir: PathBuf,
    label_dir: PathBuf,
    extensions: Vec<String>,
}

impl PairedImageSource {
    pub fn new(image_dir: impl Into<PathBuf>, label_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
            label_dir: label_dir.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Replaces the accepted extensions (without the leading dot).
    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_string())
            .collect();
        self
    }

    fn accepts(&self, name: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| name.len() > ext.len() + 1 && name.ends_with(&format!(".{}", ext)))
    }

    /// Sorted names of the matching image files.
    fn list_images(&self) -> Result<Vec<String>> {
        let metadata = fs::metadata(&self.image_dir).with_context(|| {
            format!("Failed to access directory: {}", self.image_dir.display())
        })?;
        if !metadata.is_dir() {
            bail!("Path is not a directory: {}", self.image_dir.display());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.image_dir)
            .with_context(|| format!("Failed to list {}", self.image_dir.display()))?
        {
            let entry = entry.with_context(|| {
                format!("Failed to read entry in {}", self.image_dir.display())
            })?;
            let file_type = entry.file_type()?;
            if !file_type.is_file() {
                continue;
            }
            // Non UTF-8 names cannot be matched against the extension list.
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if self.accepts(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

impl DataSource<ImagePair> for PairedImageSource {
    fn stream(&self) -> Result<Box<dyn Iterator<Item = Result<ImagePair>> + Send>> {
        let names = self.list_images()?;
        log::debug!(
            "Found {} candidate images in {}",
            names.len(),
            self.image_dir.display()
        );

        let image_dir = self.image_dir.clone();
        let label_dir = self.label_dir.clone();
        Ok(Box::new(names.into_iter().map(move |name| {
            let label = label_dir.join(&name);
            if !label.is_file() {
                bail!(
                    "No label for {}: expected {}",
                    name,
                    label.display()
                );
            }
            Ok(ImagePair {
                image: image_dir.join(&name),
                label,
            })
        })))
    }
}
