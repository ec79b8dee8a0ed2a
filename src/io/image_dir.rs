//! Playback of a directory of mono images in filename order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::calib::RawImage;

pub struct ImageDirSource {
    paths: Vec<PathBuf>,
}

impl ImageDirSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read image directory {}", dir.display()))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        if paths.is_empty() {
            bail!("no images in {}", dir.display());
        }
        info!(count = paths.len(), dir = %dir.display(), "image playback source ready");
        Ok(Self { paths })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Decode one frame as 8-bit grayscale.
    pub fn load(&self, index: usize) -> Result<RawImage> {
        let path = &self.paths[index];
        let img = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .into_luma8();
        Ok(RawImage::new(
            img.width() as usize,
            img.height() as usize,
            img.into_raw(),
        ))
    }

    /// Iterate over all frames in order.
    pub fn frames(&self) -> impl Iterator<Item = Result<RawImage>> + '_ {
        (0..self.len()).map(|i| self.load(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_frames_are_loaded_in_filename_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, value) in [("b.png", 20u8), ("a.png", 10), ("c.png", 30)] {
            let mut img = GrayImage::new(2, 2);
            for p in img.pixels_mut() {
                *p = Luma([value]);
            }
            img.save(dir.path().join(name)).unwrap();
        }

        let source = ImageDirSource::new(dir.path()).unwrap();
        assert_eq!(source.len(), 3);
        let values: Vec<u8> = source.frames().map(|f| f.unwrap().data[0]).collect();
        assert_eq!(values, vec![10, 20, 30]);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageDirSource::new(dir.path()).is_err());
    }
}
