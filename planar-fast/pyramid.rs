use log::warn;
use crate::error::{FastError, FastResult};
use crate::types::ScaleLevel;
use planar_core::Image;

/// Levels narrower or shorter than this are not generated
pub const MIN_LEVEL_SIZE: usize = 32;

/// Image pyramid operations for multi-scale feature detection
pub struct ImagePyramid;

impl ImagePyramid {
    /// Generate up to `max_levels` scale levels, each `scale_factor` smaller than the last
    pub fn generate_scale_levels(
        width: usize,
        height: usize,
        max_levels: usize,
        scale_factor: f32,
    ) -> FastResult<Vec<ScaleLevel>> {
        if max_levels == 0 || !(scale_factor > 1.0) {
            return Err(FastError::InvalidPyramid {
                levels: max_levels,
                scale_factor,
            });
        }

        let mut levels = Vec::with_capacity(max_levels);
        let mut current_scale = 1.0f32;

        for level in 0..max_levels {
            let scaled_width = ((width as f32) / current_scale) as usize;
            let scaled_height = ((height as f32) / current_scale) as usize;

            // The base level is always kept, even for small inputs
            if level > 0 && (scaled_width < MIN_LEVEL_SIZE || scaled_height < MIN_LEVEL_SIZE) {
                warn!(
                    "skipping pyramid levels {}..{}: {}x{} is below {} px",
                    level, max_levels, scaled_width, scaled_height, MIN_LEVEL_SIZE
                );
                break;
            }

            levels.push(ScaleLevel {
                level,
                scale: current_scale,
                width: scaled_width,
                height: scaled_height,
            });

            current_scale *= scale_factor;
        }

        Ok(levels)
    }

    /// Build one image per scale level from the base image
    pub fn build(img: &Image, scale_levels: &[ScaleLevel]) -> Vec<Image> {
        scale_levels
            .iter()
            .map(|scale_level| {
                if scale_level.level == 0 {
                    img.clone()
                } else {
                    Self::downsample(img, scale_level.width, scale_level.height)
                }
            })
            .collect()
    }

    /// Downsample image using bilinear interpolation
    fn downsample(img: &Image, target_width: usize, target_height: usize) -> Image {
        let mut pixels = vec![0u8; target_width * target_height];

        let x_ratio = img.width as f32 / target_width as f32;
        let y_ratio = img.height as f32 / target_height as f32;

        for y in 0..target_height {
            for x in 0..target_width {
                let src_x = x as f32 * x_ratio;
                let src_y = y as f32 * y_ratio;
                pixels[y * target_width + x] = Self::bilinear_sample(img, src_x, src_y).round() as u8;
            }
        }

        Image {
            width: target_width,
            height: target_height,
            pixels,
        }
    }

    /// Sample image at fractional coordinates using bilinear interpolation
    fn bilinear_sample(img: &Image, x: f32, y: f32) -> f32 {
        let x1 = (x.floor() as usize).min(img.width - 1);
        let y1 = (y.floor() as usize).min(img.height - 1);
        let x2 = (x1 + 1).min(img.width - 1);
        let y2 = (y1 + 1).min(img.height - 1);

        let fx = x - x1 as f32;
        let fy = y - y1 as f32;

        let p11 = img.get(x1, y1) as f32;
        let p12 = img.get(x2, y1) as f32;
        let p21 = img.get(x1, y2) as f32;
        let p22 = img.get(x2, y2) as f32;

        let top = p11 * (1.0 - fx) + p12 * fx;
        let bottom = p21 * (1.0 - fx) + p22 * fx;

        top * (1.0 - fy) + bottom * fy
    }
}
