use crate::types::{CornerType, ScoredKeypoint};
use crate::utils::has_contiguous_arc;
use planar_core::{Image, Keypoint};
use rayon::prelude::*;

/// Contiguous circle pixels required by FAST-9
pub const ARC_LENGTH: usize = 9;

/// FAST corner detection on a single pyramid level
pub struct CornerDetector;

impl CornerDetector {
    /// Bresenham circle of radius 3, clockwise from the top
    pub const FAST_OFFSETS: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    /// Run the segment test on every pixel at least 3 px from the border.
    ///
    /// Returned keypoints are in level coordinates with zero angle; rows are
    /// processed in parallel and concatenated in row-major order.
    pub fn detect(img: &Image, threshold: u8) -> Vec<ScoredKeypoint> {
        let (w, h) = img.dimensions();
        if w < 7 || h < 7 {
            return Vec::new();
        }

        (3..h - 3)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row = Vec::new();
                for x in 3..w - 3 {
                    let (corner, response) = Self::segment_test(img, x, y, threshold);
                    if corner != CornerType::None {
                        let mut keypoint = Keypoint::new(x as f32, y as f32);
                        keypoint.response = response;
                        row.push(ScoredKeypoint { keypoint, response });
                    }
                }
                row
            })
            .collect()
    }

    /// Classify a pixel with the FAST-9 segment test.
    ///
    /// The response is the mean squared contrast of the circle pixels on the
    /// passing side; it is zero when the pixel is not a corner.
    pub fn segment_test(img: &Image, x: usize, y: usize, threshold: u8) -> (CornerType, f32) {
        let center = img.get(x, y) as i32;
        let t = threshold as i32;
        let mut bright: u16 = 0;
        let mut dark: u16 = 0;
        let mut values = [0i32; 16];

        for (i, &(dx, dy)) in Self::FAST_OFFSETS.iter().enumerate() {
            let q = img.get_clamped(x as i64 + dx as i64, y as i64 + dy as i64) as i32;
            values[i] = q;
            if q > center + t {
                bright |= 1 << i;
            } else if q < center - t {
                dark |= 1 << i;
            }
        }

        let (corner, mask) = if has_contiguous_arc(bright, ARC_LENGTH) {
            (CornerType::Bright, bright)
        } else if has_contiguous_arc(dark, ARC_LENGTH) {
            (CornerType::Dark, dark)
        } else {
            return (CornerType::None, 0.0);
        };

        (corner, Self::intensity_response(center, &values, mask))
    }

    fn intensity_response(center: i32, values: &[i32; 16], mask: u16) -> f32 {
        let mut sum_diff = 0.0f32;
        let mut count = 0;
        for (i, &q) in values.iter().enumerate() {
            if mask & (1 << i) != 0 {
                let diff = (q - center) as f32;
                sum_diff += diff * diff;
                count += 1;
            }
        }
        if count > 0 {
            sum_diff / count as f32
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bright_square(width: usize, height: usize) -> Image {
        let mut img = Image::filled(width, height, 50);
        let (cx, cy) = (width / 2, height / 2);
        for y in cy - 2..=cy + 2 {
            for x in cx - 2..=cx + 2 {
                img.pixels[y * width + x] = 255;
            }
        }
        img
    }

    #[test]
    fn test_uniform_image_has_no_corners() {
        let img = Image::filled(20, 20, 128);
        assert!(CornerDetector::detect(&img, 20).is_empty());
    }

    #[test]
    fn test_square_corner_is_dark_side() {
        let img = bright_square(20, 20);
        // Top-left pixel of the bright square sees mostly dark surroundings
        let (corner, response) = CornerDetector::segment_test(&img, 8, 8, 20);
        assert_eq!(corner, CornerType::Dark);
        assert!(response > 0.0);
    }

    #[test]
    fn test_straight_edge_is_not_corner() {
        let mut img = Image::filled(20, 20, 50);
        for y in 0..20 {
            for x in 10..20 {
                img.pixels[y * 20 + x] = 200;
            }
        }
        let (corner, _) = CornerDetector::segment_test(&img, 10, 10, 20);
        assert_eq!(corner, CornerType::None);
    }

    #[test]
    fn test_detect_finds_square_corners() {
        let img = bright_square(30, 30);
        let corners = CornerDetector::detect(&img, 20);
        assert!(!corners.is_empty());
        for c in &corners {
            assert!(c.response > 0.0 && c.response.is_finite());
            assert!(c.keypoint.x >= 3.0 && c.keypoint.x < 27.0);
        }
    }

    #[test]
    fn test_tiny_image_returns_nothing() {
        let img = Image::filled(6, 6, 0);
        assert!(CornerDetector::detect(&img, 20).is_empty());
    }
}
