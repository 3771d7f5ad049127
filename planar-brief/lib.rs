use image::GrayImage;
use log::debug;
use planar_core::{
    CoreError, CoreResult, Descriptor, DescriptorExtractor, FeatureConfig, Image, Keypoint,
    MIN_PATCH_SIZE,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

const DESCRIPTOR_SIZE: usize = 32;
const DESCRIPTOR_BITS: usize = DESCRIPTOR_SIZE * 8;

/// Seed of the sampling pattern; changing it invalidates stored descriptors
const PATTERN_SEED: u64 = 0x5EED_B81E;

/// Point-pair test `(x1, y1, x2, y2)` relative to the keypoint
pub type TestPair = (i32, i32, i32, i32);

/// Steered BRIEF: 256 intensity comparisons rotated by the keypoint angle
/// and scaled to the keypoint size
pub struct BriefExtractor {
    patch_size: usize,
    blur_sigma: f32,
    pairs: Vec<TestPair>,
}

impl BriefExtractor {
    pub fn new(patch_size: usize, blur_sigma: f32) -> CoreResult<Self> {
        if patch_size < MIN_PATCH_SIZE || patch_size % 2 == 0 {
            return Err(CoreError::InvalidConfig(format!(
                "BRIEF patch size {} must be odd and >= {}",
                patch_size, MIN_PATCH_SIZE
            )));
        }
        Ok(Self {
            patch_size,
            blur_sigma,
            pairs: Self::sampling_pattern(patch_size),
        })
    }

    pub fn from_config(cfg: &FeatureConfig) -> CoreResult<Self> {
        Self::new(cfg.patch_size, cfg.blur_sigma)
    }

    /// 256 uniformly distributed pairs inside the patch, two pixels in from
    /// the edge so the smoothing kernel stays within it
    pub fn sampling_pattern(patch_size: usize) -> Vec<TestPair> {
        let reach = (patch_size / 2) as i32 - 2;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(PATTERN_SEED);
        (0..DESCRIPTOR_BITS)
            .map(|_| {
                (
                    rng.gen_range(-reach..=reach),
                    rng.gen_range(-reach..=reach),
                    rng.gen_range(-reach..=reach),
                    rng.gen_range(-reach..=reach),
                )
            })
            .collect()
    }

    pub fn pairs(&self) -> &[TestPair] {
        &self.pairs
    }

    fn smooth(&self, img: &Image) -> CoreResult<Image> {
        if self.blur_sigma <= 0.0 {
            return Ok(img.clone());
        }
        let gray = GrayImage::from_raw(img.width as u32, img.height as u32, img.pixels.clone())
            .ok_or(CoreError::InvalidImageData {
                expected_len: img.width * img.height,
                actual_len: img.pixels.len(),
            })?;
        let blurred = imageproc::filter::gaussian_blur_f32(&gray, self.blur_sigma);
        Image::new(img.width, img.height, blurred.into_raw())
    }

    pub fn generate_descriptors(&self, img: &Image, kps: &[Keypoint]) -> CoreResult<Vec<Descriptor>> {
        let smoothed = self.smooth(img)?;
        debug!("describing {} keypoints on {}x{}", kps.len(), img.width, img.height);

        Ok(kps
            .par_iter()
            .map(|kp| {
                let (s, c) = kp.angle.sin_cos();
                let scale = if kp.size > 0.0 {
                    kp.size / self.patch_size as f32
                } else {
                    1.0
                };
                let (s, c) = (s * scale, c * scale);
                let (cx, cy) = (kp.x, kp.y);
                let mut d = [0u8; DESCRIPTOR_SIZE];

                for (i, &(dx1, dy1, dx2, dy2)) in self.pairs.iter().enumerate() {
                    let (rx1, ry1) = (
                        cx + c * dx1 as f32 - s * dy1 as f32,
                        cy + s * dx1 as f32 + c * dy1 as f32,
                    );
                    let (rx2, ry2) = (
                        cx + c * dx2 as f32 - s * dy2 as f32,
                        cy + s * dx2 as f32 + c * dy2 as f32,
                    );

                    let val1 = bilinear_sample(&smoothed, rx1, ry1);
                    let val2 = bilinear_sample(&smoothed, rx2, ry2);

                    let bit = (val1 < val2) as u8;
                    d[i / 8] |= bit << (i % 8);
                }
                Descriptor::Binary(d)
            })
            .collect())
    }
}

impl DescriptorExtractor for BriefExtractor {
    fn compute(&self, image: &Image, keypoints: &[Keypoint]) -> CoreResult<Vec<Descriptor>> {
        self.generate_descriptors(image, keypoints)
    }
}

/// Bilinear interpolation for subpixel sampling, clamped to the border
fn bilinear_sample(img: &Image, x: f32, y: f32) -> f32 {
    let max_x = (img.width - 1) as f32;
    let max_y = (img.height - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(img.width - 1);
    let y1 = (y0 + 1).min(img.height - 1);
    let dx = x - x0 as f32;
    let dy = y - y0 as f32;

    let p00 = img.get(x0, y0) as f32;
    let p10 = img.get(x1, y0) as f32;
    let p01 = img.get(x0, y1) as f32;
    let p11 = img.get(x1, y1) as f32;

    let top = p00 * (1.0 - dx) + p10 * dx;
    let bottom = p01 * (1.0 - dx) + p11 * dx;

    top * (1.0 - dy) + bottom * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured_image(width: usize, height: usize) -> Image {
        let mut img = Image::filled(width, height, 0);
        for y in 0..height {
            for x in 0..width {
                img.pixels[y * width + x] = ((x * 37 + y * 91 + (x * y) % 13 * 17) % 256) as u8;
            }
        }
        img
    }

    #[test]
    fn test_pattern_is_fixed_and_bounded() {
        let a = BriefExtractor::sampling_pattern(31);
        let b = BriefExtractor::sampling_pattern(31);
        assert_eq!(a.len(), 256);
        assert_eq!(a, b);
        for &(x1, y1, x2, y2) in &a {
            for v in [x1, y1, x2, y2] {
                assert!(v.abs() <= 13);
            }
        }
    }

    #[test]
    fn test_descriptors_index_aligned() {
        let extractor = BriefExtractor::new(31, 2.0).unwrap();
        let img = textured_image(64, 64);
        let kps: Vec<Keypoint> = (0..10).map(|i| Keypoint::new(10.0 + i as f32 * 4.0, 32.0)).collect();
        let desc = extractor.compute(&img, &kps).unwrap();
        assert_eq!(desc.len(), kps.len());
    }

    #[test]
    fn test_descriptors_deterministic() {
        let extractor = BriefExtractor::new(31, 2.0).unwrap();
        let img = textured_image(64, 64);
        let kps = vec![Keypoint::new(32.0, 32.0), Keypoint::new(20.5, 40.25)];
        assert_eq!(
            extractor.compute(&img, &kps).unwrap(),
            extractor.compute(&img, &kps).unwrap()
        );
    }

    #[test]
    fn test_uniform_image_gives_zero_descriptor() {
        let extractor = BriefExtractor::new(31, 2.0).unwrap();
        let img = Image::filled(40, 40, 90);
        let desc = extractor.compute(&img, &[Keypoint::new(20.0, 20.0)]).unwrap();
        assert_eq!(desc[0], Descriptor::Binary([0u8; 32]));
    }

    #[test]
    fn test_border_keypoints_do_not_panic() {
        let extractor = BriefExtractor::new(31, 0.0).unwrap();
        let img = textured_image(16, 16);
        let kps = vec![Keypoint::new(0.0, 0.0), Keypoint::new(15.9, 15.9)];
        assert_eq!(extractor.compute(&img, &kps).unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_patch_size() {
        assert!(BriefExtractor::new(8, 2.0).is_err());
        assert!(BriefExtractor::new(5, 2.0).is_err());
    }
}
