use crate::error::{HomographyError, HomographyResult};
use crate::MIN_CORRESPONDENCES;
use nalgebra::{DMatrix, Matrix3, Vector3};
use planar_core::Point2;

/// Similarity moving the centroid to the origin with mean distance sqrt(2).
///
/// Returns the normalized points and the transform, or `None` when all points
/// coincide.
fn normalize_points(points: &[Point2]) -> Option<(Vec<Point2>, Matrix3<f64>)> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let centroid = Point2::new(cx, cy);
    let mean_dist = points.iter().map(|p| p.distance(&centroid)).sum::<f64>() / n;
    if !mean_dist.is_finite() || mean_dist < 1e-12 {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = points
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((normalized, t))
}

/// Estimate `H` with `dst ~ H * src` from at least four correspondences.
///
/// Hartley-normalized DLT solved through SVD. The result is scaled so that
/// `H[2][2] == 1` whenever that entry is not zero.
pub fn dlt_homography(src: &[Point2], dst: &[Point2]) -> HomographyResult<Matrix3<f64>> {
    let n = src.len();
    if n != dst.len() {
        return Err(HomographyError::LengthMismatch { src: n, dst: dst.len() });
    }
    if n < MIN_CORRESPONDENCES {
        return Err(HomographyError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            actual: n,
        });
    }

    let (src_n, t_src) = normalize_points(src)
        .ok_or_else(|| HomographyError::Degenerate("source points coincide".into()))?;
    let (dst_n, t_dst) = normalize_points(dst)
        .ok_or_else(|| HomographyError::Degenerate("destination points coincide".into()))?;

    // A minimal sample gives 8 rows; pad to square so the SVD exposes all of V
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, (p, q)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let (x, y, u, v) = (p.x, p.y, q.x, q.y);
        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    let svd = a.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| HomographyError::Degenerate("SVD did not converge".into()))?;
    let null_row = svd.singular_values.imin();
    let h = v_t.row(null_row);
    let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| HomographyError::Degenerate("normalization not invertible".into()))?;
    let mut h = t_dst_inv * h_norm * t_src;

    let scale = h[(2, 2)];
    if scale.abs() > f64::EPSILON {
        h /= scale;
    }
    if !h.iter().all(|v| v.is_finite()) {
        return Err(HomographyError::Degenerate("non-finite homography".into()));
    }
    Ok(h)
}

/// Forward reprojection error `|H * src - dst|`; infinite when `src` maps to infinity
pub fn reprojection_error(h: &Matrix3<f64>, src: &Point2, dst: &Point2) -> f64 {
    let p = h * Vector3::new(src.x, src.y, 1.0);
    if p.z.abs() < f64::EPSILON {
        return f64::INFINITY;
    }
    let projected = Point2::new(p.x / p.z, p.y / p.z);
    let err = projected.distance(dst);
    if err.is_finite() {
        err
    } else {
        f64::INFINITY
    }
}

pub(crate) fn to_rows(h: &Matrix3<f64>) -> [[f64; 3]; 3] {
    let mut rows = [[0.0; 3]; 3];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = h[(r, c)];
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_scale_from_minimal_sample() {
        let dst: Vec<Point2> = square().iter().map(|p| Point2::new(2.0 * p.x, 2.0 * p.y)).collect();
        let h = dlt_homography(&square(), &dst).unwrap();
        assert!((h[(0, 0)] - 2.0).abs() < 1e-9);
        assert!((h[(1, 1)] - 2.0).abs() < 1e-9);
        assert!((h[(2, 2)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_recovers_projective_transform() {
        let truth = Matrix3::new(0.9, 0.1, 15.0, -0.05, 1.1, -8.0, 2e-4, -1e-4, 1.0);
        let src: Vec<Point2> = (0..6)
            .flat_map(|i| (0..5).map(move |j| Point2::new(i as f64 * 30.0, j as f64 * 25.0)))
            .collect();
        let dst: Vec<Point2> = src
            .iter()
            .map(|p| {
                let q = truth * Vector3::new(p.x, p.y, 1.0);
                Point2::new(q.x / q.z, q.y / q.z)
            })
            .collect();

        let h = dlt_homography(&src, &dst).unwrap();
        for (r, c) in (0..3).flat_map(|r| (0..3).map(move |c| (r, c))) {
            assert!((h[(r, c)] - truth[(r, c)]).abs() < 1e-6, "entry ({r},{c})");
        }
        for (p, q) in src.iter().zip(&dst) {
            assert!(reprojection_error(&h, p, q) < 1e-6);
        }
    }

    #[test]
    fn test_too_few_points() {
        let pts = &square()[..3];
        assert_eq!(
            dlt_homography(pts, pts),
            Err(HomographyError::InsufficientCorrespondences { required: 4, actual: 3 })
        );
    }

    #[test]
    fn test_length_mismatch() {
        let src = square();
        assert!(matches!(
            dlt_homography(&src, &src[..3]),
            Err(HomographyError::LengthMismatch { src: 4, dst: 3 })
        ));
    }

    #[test]
    fn test_coincident_points() {
        let pts = vec![Point2::new(5.0, 5.0); 4];
        assert!(matches!(dlt_homography(&pts, &square()), Err(HomographyError::Degenerate(_))));
    }

    #[test]
    fn test_point_at_infinity_has_infinite_error() {
        let h = Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0);
        let e = reprojection_error(&h, &Point2::new(0.0, 4.0), &Point2::new(0.0, 0.0));
        assert!(e.is_infinite());
    }
}
