use anyhow::Result;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Image and label directories filled with small synthetic pairs.
pub struct PairFixture {
    pub root: TempDir,
    pub images: PathBuf,
    pub labels: PathBuf,
}

impl PairFixture {
    pub fn new() -> Result<Self> {
        let root = tempfile::tempdir()?;
        let images = root.path().join("images");
        let labels = root.path().join("labels");
        fs::create_dir_all(&images)?;
        fs::create_dir_all(&labels)?;
        Ok(Self {
            root,
            images,
            labels,
        })
    }

    /// Writes a 24x16 gradient image and a square mask under `name`.
    pub fn add_pair(&self, name: &str) -> Result<()> {
        let image = RgbImage::from_fn(24, 16, |x, y| {
            Rgb([(x * 10) as u8, (y * 15) as u8, ((x + y) * 4) as u8])
        });
        let label = GrayImage::from_fn(24, 16, |x, y| {
            if (6..18).contains(&x) && (4..12).contains(&y) {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        DynamicImage::ImageRgb8(image).save(self.images.join(name))?;
        DynamicImage::ImageLuma8(label).save(self.labels.join(name))?;
        Ok(())
    }

    /// Writes the same single-channel pattern as both image and label.
    pub fn add_twin_pair(&self, name: &str) -> Result<()> {
        let pattern = GrayImage::from_fn(32, 24, |x, y| {
            let on_grid = x % 7 == 2 || y % 5 == 1;
            let blob = (10..16).contains(&x) && (8..14).contains(&y);
            Luma([if blob { 255 } else if on_grid { 120 } else { 30 }])
        });
        pattern.save(self.images.join(name))?;
        pattern.save(self.labels.join(name))?;
        Ok(())
    }

    pub fn out_dir(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }
}

/// Sorted file names in `dir`.
pub fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
