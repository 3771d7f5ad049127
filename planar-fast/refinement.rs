use crate::types::ScoredKeypoint;
use planar_core::{Image, Keypoint};
use std::collections::HashMap;

/// Subpixel refinement, orientation and non-maximum suppression
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Refine keypoint to subpixel accuracy using quadratic surface fitting
    pub fn refine_subpixel(img: &Image, kp: Keypoint) -> Keypoint {
        let x = kp.x.round() as usize;
        let y = kp.y.round() as usize;

        // Ensure we have enough border for 3x3 sampling
        if x < 1 || y < 1 || x + 1 >= img.width || y + 1 >= img.height {
            return kp;
        }

        let s = |dx: isize, dy: isize| -> f32 {
            img.get((x as isize + dx) as usize, (y as isize + dy) as usize) as f32
        };

        // Finite differences of f(x,y) = Ax² + By² + Cxy + Dx + Ey + F around the center
        let dx = (s(1, 0) - s(-1, 0)) / 2.0;
        let dy = (s(0, 1) - s(0, -1)) / 2.0;
        let dxx = s(1, 0) - 2.0 * s(0, 0) + s(-1, 0);
        let dyy = s(0, 1) - 2.0 * s(0, 0) + s(0, -1);
        let dxy = (s(1, 1) - s(-1, 1) - s(1, -1) + s(-1, -1)) / 4.0;

        let det = dxx * dyy - dxy * dxy;
        if det.abs() < 1e-6 {
            return kp;
        }

        // Newton step towards the extremum, clamped to the pixel
        let offset_x = (-(dyy * dx - dxy * dy) / det).clamp(-0.5, 0.5);
        let offset_y = (-(dxx * dy - dxy * dx) / det).clamp(-0.5, 0.5);

        Keypoint {
            x: x as f32 + offset_x,
            y: y as f32 + offset_y,
            ..kp
        }
    }

    /// Orientation by intensity centroid over a circular patch of `patch_size` diameter
    pub fn compute_orientation(img: &Image, x: f32, y: f32, patch_size: usize) -> f32 {
        let half = (patch_size / 2) as i64;
        let radius_sq = half * half;
        let (cx, cy) = (x.round() as i64, y.round() as i64);
        let mut m10 = 0i64;
        let mut m01 = 0i64;

        for dy in -half..=half {
            for dx in -half..=half {
                if dx * dx + dy * dy > radius_sq {
                    continue;
                }
                let val = img.get_clamped(cx + dx, cy + dy) as i64;
                m10 += dx * val;
                m01 += dy * val;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }

    /// Greedy non-maximum suppression: strongest first, drop anything within
    /// `min_distance` of an already accepted keypoint
    pub fn non_maximum_suppression(
        keypoints: &[ScoredKeypoint],
        min_distance: f32,
    ) -> Vec<ScoredKeypoint> {
        if keypoints.is_empty() {
            return Vec::new();
        }
        if min_distance <= 0.0 {
            return keypoints.to_vec();
        }

        let mut sorted_keypoints = keypoints.to_vec();
        sorted_keypoints.sort_by(|a, b| {
            b.response
                .partial_cmp(&a.response)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let min_distance_sq = min_distance * min_distance;
        let cell_of = |kp: &Keypoint| {
            (
                (kp.x / min_distance).floor() as i64,
                (kp.y / min_distance).floor() as i64,
            )
        };

        // Accepted keypoints bucketed by a grid of min_distance cells
        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        let mut suppressed: Vec<ScoredKeypoint> = Vec::new();

        for candidate in sorted_keypoints {
            let (gx, gy) = cell_of(&candidate.keypoint);
            let mut is_local_max = true;

            'search: for ny in gy - 1..=gy + 1 {
                for nx in gx - 1..=gx + 1 {
                    let Some(bucket) = grid.get(&(nx, ny)) else {
                        continue;
                    };
                    for &idx in bucket {
                        let existing = &suppressed[idx].keypoint;
                        let dx = candidate.keypoint.x - existing.x;
                        let dy = candidate.keypoint.y - existing.y;
                        if dx * dx + dy * dy < min_distance_sq {
                            is_local_max = false;
                            break 'search;
                        }
                    }
                }
            }

            if is_local_max {
                grid.entry((gx, gy)).or_default().push(suppressed.len());
                suppressed.push(candidate);
            }
        }

        suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(x: f32, y: f32, response: f32) -> ScoredKeypoint {
        let mut keypoint = Keypoint::new(x, y);
        keypoint.response = response;
        ScoredKeypoint { keypoint, response }
    }

    #[test]
    fn test_nms_keeps_strongest() {
        let kps = vec![scored(10.0, 10.0, 1.0), scored(11.0, 10.0, 5.0), scored(30.0, 30.0, 2.0)];
        let kept = KeypointRefinement::non_maximum_suppression(&kps, 3.0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].response, 5.0);
        assert_eq!(kept[1].response, 2.0);
    }

    #[test]
    fn test_nms_minimum_distance() {
        let kps: Vec<_> = (0..20)
            .flat_map(|i| (0..20).map(move |j| scored(i as f32, j as f32, ((i * 7 + j * 3) % 11) as f32)))
            .collect();
        let kept = KeypointRefinement::non_maximum_suppression(&kps, 5.0);
        assert!(kept.len() < kps.len());
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                let dx = kept[i].keypoint.x - kept[j].keypoint.x;
                let dy = kept[i].keypoint.y - kept[j].keypoint.y;
                assert!((dx * dx + dy * dy).sqrt() >= 5.0);
            }
        }
    }

    #[test]
    fn test_orientation_points_to_bright_side() {
        let mut img = Image::filled(41, 41, 0);
        for y in 0..41 {
            for x in 21..41 {
                img.pixels[y * 41 + x] = 200;
            }
        }
        let angle = KeypointRefinement::compute_orientation(&img, 20.0, 20.0, 15);
        assert!(angle.abs() < 1e-3, "expected angle near 0, got {}", angle);
    }

    #[test]
    fn test_orientation_uniform_is_zero() {
        let img = Image::filled(20, 20, 0);
        assert_eq!(KeypointRefinement::compute_orientation(&img, 10.0, 10.0, 7), 0.0);
    }

    #[test]
    fn test_subpixel_offset_is_bounded() {
        let mut img = Image::filled(10, 10, 10);
        img.pixels[5 * 10 + 5] = 200;
        img.pixels[5 * 10 + 6] = 150;
        let refined = KeypointRefinement::refine_subpixel(&img, Keypoint::new(5.0, 5.0));
        assert!(refined.x > 5.0 && refined.x <= 5.5);
        assert!((refined.y - 5.0).abs() <= 0.5);
    }

    #[test]
    fn test_subpixel_border_untouched() {
        let img = Image::filled(10, 10, 10);
        let kp = Keypoint::new(0.0, 4.0);
        assert_eq!(KeypointRefinement::refine_subpixel(&img, kp), kp);
    }
}
