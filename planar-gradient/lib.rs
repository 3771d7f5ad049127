//! Real-valued keypoint descriptors built from gradient orientation histograms.
//!
//! The window around a keypoint is rotated by the keypoint angle and sized by
//! the keypoint diameter, split into a 4x4 grid of cells, and every cell
//! collects an 8-bin histogram of gradient directions weighted by magnitude
//! and a Gaussian centred on the keypoint. The 128 values are normalized,
//! clipped, normalized again and quantized to whole numbers in `0..=255`
//! (norm close to 512), so identical neighbourhoods compare at exactly 0.

use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use log::debug;
use planar_core::{
    CoreError, CoreResult, Descriptor, DescriptorExtractor, FeatureConfig, Image, Keypoint,
    MIN_PATCH_SIZE,
};
use rayon::prelude::*;
use std::f32::consts::TAU;

/// Cells per side of the descriptor window
const GRID: usize = 4;
/// Orientation bins per cell
const BINS: usize = 8;
/// Length of every descriptor
pub const DESCRIPTOR_LEN: usize = GRID * GRID * BINS;
/// Gradient samples per side of the descriptor window
const SAMPLES: usize = 16;
/// Upper bound of a single component after the first normalization
const CLIP: f32 = 0.2;
/// Norm of a quantized descriptor
pub const DESCRIPTOR_SCALE: f32 = 512.0;

/// Horizontal and vertical derivatives of the smoothed image
pub struct GradientField {
    width: usize,
    height: usize,
    gx: Vec<f32>,
    gy: Vec<f32>,
}

impl GradientField {
    pub fn new(img: &Image, blur_sigma: f32) -> CoreResult<Self> {
        let gray = GrayImage::from_raw(img.width as u32, img.height as u32, img.pixels.clone())
            .ok_or(CoreError::InvalidImageData {
                expected_len: img.width * img.height,
                actual_len: img.pixels.len(),
            })?;
        let smoothed = if blur_sigma > 0.0 {
            gaussian_blur_f32(&gray, blur_sigma)
        } else {
            gray
        };
        let gx = horizontal_sobel(&smoothed).pixels().map(|p| p.0[0] as f32).collect();
        let gy = vertical_sobel(&smoothed).pixels().map(|p| p.0[0] as f32).collect();
        Ok(Self {
            width: img.width,
            height: img.height,
            gx,
            gy,
        })
    }

    /// Bilinearly interpolated gradient, clamped to the border
    pub fn sample(&self, x: f32, y: f32) -> (f32, f32) {
        let x = x.clamp(0.0, (self.width - 1) as f32);
        let y = y.clamp(0.0, (self.height - 1) as f32);
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let lerp = |v: &[f32]| {
            let top = v[y0 * self.width + x0] * (1.0 - fx) + v[y0 * self.width + x1] * fx;
            let bottom = v[y1 * self.width + x0] * (1.0 - fx) + v[y1 * self.width + x1] * fx;
            top * (1.0 - fy) + bottom * fy
        };
        (lerp(&self.gx), lerp(&self.gy))
    }
}

/// Scale by the inverse L2 norm; all-zero input stays zero
fn normalize(values: &mut [f32]) -> bool {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return false;
    }
    values.iter_mut().for_each(|v| *v /= norm);
    true
}

/// Oriented gradient histogram extractor
#[derive(Debug, Clone)]
pub struct GradientExtractor {
    patch_size: usize,
    blur_sigma: f32,
}

impl GradientExtractor {
    pub fn new(patch_size: usize, blur_sigma: f32) -> CoreResult<Self> {
        if patch_size < MIN_PATCH_SIZE || patch_size % 2 == 0 {
            return Err(CoreError::InvalidConfig(format!(
                "gradient patch size {} must be odd and >= {}",
                patch_size, MIN_PATCH_SIZE
            )));
        }
        Ok(Self {
            patch_size,
            blur_sigma,
        })
    }

    pub fn from_config(cfg: &FeatureConfig) -> CoreResult<Self> {
        Self::new(cfg.patch_size, cfg.blur_sigma)
    }

    /// Histogram descriptor of one keypoint
    pub fn describe(&self, field: &GradientField, kp: &Keypoint) -> Vec<f32> {
        let window = if kp.size > 0.0 {
            kp.size
        } else {
            self.patch_size as f32
        };
        let half = window / 2.0;
        let step = window / SAMPLES as f32;
        let cell = window / GRID as f32;
        let inv_two_sigma_sq = 1.0 / (2.0 * half * half);
        let (s, c) = kp.angle.sin_cos();

        let mut hist = vec![0.0f32; DESCRIPTOR_LEN];
        for j in 0..SAMPLES {
            for i in 0..SAMPLES {
                let u = (i as f32 + 0.5) * step - half;
                let v = (j as f32 + 0.5) * step - half;
                let (gx, gy) = field.sample(kp.x + c * u - s * v, kp.y + s * u + c * v);

                // gradient expressed in the keypoint frame
                let gu = c * gx + s * gy;
                let gv = -s * gx + c * gy;
                let magnitude = (gu * gu + gv * gv).sqrt();
                if magnitude <= f32::EPSILON {
                    continue;
                }
                let weight = magnitude * (-(u * u + v * v) * inv_two_sigma_sq).exp();

                // trilinear soft binning, cell centres at integer positions
                let cu = (u + half) / cell - 0.5;
                let cv = (v + half) / cell - 0.5;
                let co = gv.atan2(gu).rem_euclid(TAU) / TAU * BINS as f32;
                let (u0, v0, o0) = (cu.floor(), cv.floor(), co.floor());
                let (fu, fv, fo) = (cu - u0, cv - v0, co - o0);

                for (du, wu) in [(0, 1.0 - fu), (1, fu)] {
                    let cx = u0 as i32 + du;
                    if cx < 0 || cx >= GRID as i32 {
                        continue;
                    }
                    for (dv, wv) in [(0, 1.0 - fv), (1, fv)] {
                        let cy = v0 as i32 + dv;
                        if cy < 0 || cy >= GRID as i32 {
                            continue;
                        }
                        let base = (cy as usize * GRID + cx as usize) * BINS;
                        for (dor, wo) in [(0, 1.0 - fo), (1, fo)] {
                            let bin = (o0 as usize + dor) % BINS;
                            hist[base + bin] += weight * wu * wv * wo;
                        }
                    }
                }
            }
        }

        if normalize(&mut hist) {
            hist.iter_mut().for_each(|v| *v = v.min(CLIP));
            normalize(&mut hist);
            hist.iter_mut()
                .for_each(|v| *v = (*v * DESCRIPTOR_SCALE).round().min(255.0));
        }
        hist
    }

    pub fn generate_descriptors(&self, img: &Image, kps: &[Keypoint]) -> CoreResult<Vec<Descriptor>> {
        let field = GradientField::new(img, self.blur_sigma)?;
        debug!("describing {} keypoints on {}x{}", kps.len(), img.width, img.height);
        Ok(kps
            .par_iter()
            .map(|kp| Descriptor::Real(self.describe(&field, kp)))
            .collect())
    }
}

impl DescriptorExtractor for GradientExtractor {
    fn compute(&self, image: &Image, keypoints: &[Keypoint]) -> CoreResult<Vec<Descriptor>> {
        self.generate_descriptors(image, keypoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: usize = 96;
    const CENTER: f32 = 48.0;

    /// Smooth, direction-dependent pattern
    fn pattern(x: f32, y: f32) -> f32 {
        128.0 + 50.0 * (0.21 * x + 0.05 * y).sin() + 40.0 * (0.07 * x - 0.23 * y).cos()
            + 25.0 * (0.011 * x * y).sin()
    }

    /// Render `pattern` rotated by `angle` around the image centre
    fn rendered(angle: f32) -> Image {
        let (s, c) = angle.sin_cos();
        let mut pixels = Vec::with_capacity(SIZE * SIZE);
        for y in 0..SIZE {
            for x in 0..SIZE {
                let (dx, dy) = (x as f32 - CENTER, y as f32 - CENTER);
                // inverse rotation back into pattern coordinates
                let (px, py) = (c * dx + s * dy + CENTER, -s * dx + c * dy + CENTER);
                pixels.push(pattern(px, py).round().clamp(0.0, 255.0) as u8);
            }
        }
        Image::new(SIZE, SIZE, pixels).unwrap()
    }

    fn keypoint(x: f32, y: f32, angle: f32) -> Keypoint {
        Keypoint {
            angle,
            ..Keypoint::new(x, y)
        }
    }

    fn distance(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
    }

    fn real(d: &Descriptor) -> &[f32] {
        match d {
            Descriptor::Real(v) => v.as_slice(),
            Descriptor::Binary(_) => panic!("expected a real descriptor"),
        }
    }

    #[test]
    fn test_descriptor_is_quantized() {
        let extractor = GradientExtractor::new(31, 1.0).unwrap();
        let desc = extractor.compute(&rendered(0.0), &[keypoint(CENTER, CENTER, 0.0)]).unwrap();
        let v = real(&desc[0]);
        assert_eq!(v.len(), DESCRIPTOR_LEN);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - DESCRIPTOR_SCALE).abs() < 8.0, "norm {norm}");
        assert!(v.iter().all(|&x| (0.0..=255.0).contains(&x) && x.fract() == 0.0));
    }

    #[test]
    fn test_integer_shift_gives_identical_descriptor() {
        let extractor = GradientExtractor::new(31, 2.0).unwrap();
        let original = rendered(0.0);
        let mut shifted = Image::filled(SIZE, SIZE, 0);
        for y in 0..SIZE - 5 {
            for x in 0..SIZE - 11 {
                shifted.pixels[(y + 5) * SIZE + x + 11] = original.get(x, y);
            }
        }
        let a = extractor.compute(&original, &[keypoint(30.25, 33.75, 0.0)]).unwrap();
        let b = extractor.compute(&shifted, &[keypoint(41.25, 38.75, 0.0)]).unwrap();
        assert_eq!(distance(real(&a[0]), real(&b[0])), 0.0);
    }

    #[test]
    fn test_flat_image_gives_zero_vector() {
        let extractor = GradientExtractor::new(31, 1.0).unwrap();
        let desc = extractor.compute(&Image::filled(40, 40, 90), &[Keypoint::new(20.0, 20.0)]).unwrap();
        assert!(real(&desc[0]).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_rotated_view_matches_same_point() {
        let extractor = GradientExtractor::new(31, 1.0).unwrap();
        let angle = 0.35;
        let original = extractor.compute(&rendered(0.0), &[keypoint(CENTER, CENTER, 0.0)]).unwrap();
        let rotated = extractor
            .compute(
                &rendered(angle),
                &[keypoint(CENTER, CENTER, angle), keypoint(CENTER - 18.0, CENTER + 14.0, angle)],
            )
            .unwrap();

        let same = distance(real(&original[0]), real(&rotated[0]));
        let other = distance(real(&original[0]), real(&rotated[1]));
        assert!(same < 0.5 * other, "same {same}, other {other}");
    }

    #[test]
    fn test_index_aligned_and_border_safe() {
        let extractor = GradientExtractor::new(31, 0.0).unwrap();
        let kps = vec![Keypoint::new(0.0, 0.0), Keypoint::new(95.9, 95.9), Keypoint::new(40.0, 50.0)];
        assert_eq!(extractor.compute(&rendered(0.0), &kps).unwrap().len(), kps.len());
    }

    #[test]
    fn test_invalid_patch_size() {
        assert!(GradientExtractor::new(5, 1.0).is_err());
        assert!(GradientExtractor::new(30, 1.0).is_err());
    }
}
