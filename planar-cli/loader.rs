use image::{DynamicImage, ImageReader, RgbImage};
use planar_core::{CoreError, Image};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Invalid(#[from] CoreError),
}

/// A decoded image: the colour copy is drawn on, the grayscale one is fed to the detectors
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub color: RgbImage,
    pub gray: Image,
}

impl LoadedImage {
    pub fn from_dynamic(img: &DynamicImage) -> Result<Self, CoreError> {
        let luma = img.to_luma8();
        let (w, h) = luma.dimensions();
        Ok(Self {
            color: img.to_rgb8(),
            gray: Image::new(w as usize, h as usize, luma.into_raw())?,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }
}

/// Decode the file at `path`, guessing the format from its content
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<LoadedImage, LoadError> {
    let path = path.as_ref();
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let decoded = ImageReader::open(path)
        .map_err(io_err)?
        .with_guessed_format()
        .map_err(io_err)?
        .decode()
        .map_err(|source| LoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(LoadedImage::from_dynamic(&decoded)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_from_dynamic_keeps_dimensions() {
        let gray = GrayImage::from_fn(12, 8, |x, y| Luma([(x * 10 + y) as u8]));
        let loaded = LoadedImage::from_dynamic(&DynamicImage::ImageLuma8(gray)).unwrap();
        assert_eq!(loaded.dimensions(), (12, 8));
        assert_eq!(loaded.gray.dimensions(), (12, 8));
        assert_eq!(loaded.gray.get(3, 2), 32);
    }

    #[test]
    fn test_missing_file() {
        let result = load_image("/nonexistent/planar-match/object.png");
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
