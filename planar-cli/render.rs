use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use planar_core::{FeatureMatch, Homography, Keypoint, Point2};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

const ENDPOINT_RADIUS: i32 = 4;

pub fn keypoint_positions(kps: &[Keypoint]) -> Vec<Point2> {
    kps.iter().map(Keypoint::point).collect()
}

/// Place `left` and `right` side by side and connect every matched pair.
///
/// Each match gets its own colour from a generator seeded with `seed`;
/// points without a match are not drawn.
pub fn draw_matches(
    left: &RgbImage,
    left_points: &[Point2],
    right: &RgbImage,
    right_points: &[Point2],
    matches: &[FeatureMatch],
    seed: u64,
) -> RgbImage {
    let (lw, lh) = left.dimensions();
    let (rw, rh) = right.dimensions();
    let mut canvas = RgbImage::new(lw + rw, lh.max(rh));
    imageops::replace(&mut canvas, left, 0, 0);
    imageops::replace(&mut canvas, right, i64::from(lw), 0);

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let offset = lw as f32;
    for m in matches {
        let (Some(a), Some(b)) = (left_points.get(m.query_idx), right_points.get(m.train_idx))
        else {
            continue;
        };
        let color = Rgb([rng.r#gen::<u8>(), rng.r#gen::<u8>(), rng.r#gen::<u8>()]);
        let start = (a.x as f32, a.y as f32);
        let end = (b.x as f32 + offset, b.y as f32);

        draw_hollow_circle_mut(&mut canvas, (start.0.round() as i32, start.1.round() as i32), ENDPOINT_RADIUS, color);
        draw_hollow_circle_mut(&mut canvas, (end.0.round() as i32, end.1.round() as i32), ENDPOINT_RADIUS, color);
        draw_line_segment_mut(&mut canvas, start, end, color);
    }
    canvas
}

/// Warp `object` into a `width x height` frame with the object-to-scene homography.
///
/// Returns `None` when the matrix is not invertible.
pub fn warp_object(object: &RgbImage, homography: &Homography, width: u32, height: u32) -> Option<RgbImage> {
    let projection = Projection::from_matrix(homography.to_f32_row_major())?;
    let mut out = RgbImage::new(width, height);
    warp_into(object, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut out);
    Some(out)
}
