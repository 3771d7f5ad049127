use crate::{Localization, PipelineOutput};
use planar_core::{Homography, Point2};
use planar_match::DistanceStats;
use serde::Serialize;
use std::fmt::Write;

/// Outlier pairs printed per console line
pub const OUTLIERS_PER_LINE: usize = 4;

pub fn format_distance_stats(stats: &DistanceStats) -> String {
    format!(
        "-- Max dist : {:.6} \n-- Min dist : {:.6} \n",
        stats.max, stats.min
    )
}

/// Matrix in `[a, b, c;\n d, e, f;\n g, h, i]` layout
pub fn format_homography(h: &Homography) -> String {
    let rows: Vec<String> = h
        .matrix
        .iter()
        .map(|row| format!("{}, {}, {}", row[0], row[1], row[2]))
        .collect();
    format!("Homography:\n[{}]\n", rows.join(";\n "))
}

fn format_point(p: &Point2) -> String {
    format!("[{:.0}, {:.0}]", p.x, p.y)
}

pub fn format_outliers(outliers: &[(Point2, Point2)]) -> String {
    let mut out = String::from("Removed Outliers:\n");
    for (i, (src, dst)) in outliers.iter().enumerate() {
        let _ = write!(out, "({} - {}),\t", format_point(src), format_point(dst));
        if (i + 1) % OUTLIERS_PER_LINE == 0 {
            out.push('\n');
        }
    }
    out
}

/// Matrix followed by the removed outliers
pub fn format_localization(localization: &Localization) -> String {
    let mut text = format_homography(&localization.homography);
    text.push_str(&format_outliers(&localization.partition.outliers));
    text
}

/// Machine-readable summary of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub object_keypoints: usize,
    pub scene_keypoints: usize,
    pub matches: usize,
    pub good_matches: usize,
    pub max_distance: f32,
    pub min_distance: f32,
    pub homography: [[f64; 3]; 3],
    pub inliers: usize,
    pub outliers: Vec<(Point2, Point2)>,
    pub display_seed: u64,
}

impl RunSummary {
    pub fn new(output: &PipelineOutput, display_seed: u64) -> Self {
        Self {
            object_keypoints: output.object_keypoints.len(),
            scene_keypoints: output.scene_keypoints.len(),
            matches: output.matches.len(),
            good_matches: output.good_matches.len(),
            max_distance: output.stats.max,
            min_distance: output.stats.min,
            homography: output.homography.matrix,
            inliers: output.partition.inlier_count(),
            outliers: output.partition.outliers.clone(),
            display_seed,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_lines() {
        let text = format_distance_stats(&DistanceStats { min: 4.0, max: 123.0 });
        assert_eq!(text, "-- Max dist : 123.000000 \n-- Min dist : 4.000000 \n");
    }

    #[test]
    fn test_homography_layout() {
        let h = Homography::new([[1.0, 0.0, 12.5], [0.0, 1.0, -7.0], [0.0, 0.0, 1.0]], vec![]);
        assert_eq!(
            format_homography(&h),
            "Homography:\n[1, 0, 12.5;\n 0, 1, -7;\n 0, 0, 1]\n"
        );
    }

    #[test]
    fn test_outliers_four_per_line() {
        let pair = (Point2::new(10.4, 20.6), Point2::new(30.0, 40.0));
        let text = format_outliers(&vec![pair; 5]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Removed Outliers:");
        assert_eq!(lines[1].matches("),\t").count(), 4);
        assert_eq!(lines[2], "([10, 21] - [30, 40]),\t");
        assert!(lines[1].starts_with("([10, 21] - [30, 40]),\t"));
    }

    #[test]
    fn test_localization_prints_matrix_then_outliers() {
        let pair = (Point2::new(1.0, 2.0), Point2::new(3.0, 4.0));
        let localization = Localization {
            homography: Homography::new(
                [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                vec![false],
            ),
            partition: planar_homography::partition_by_mask(&[pair.0], &[pair.1], &[false])
                .unwrap(),
        };
        let text = format_localization(&localization);
        assert!(text.starts_with("Homography:\n[1, 0, 0;"));
        assert!(text.ends_with("Removed Outliers:\n([1, 2] - [3, 4]),\t"));
    }

    #[test]
    fn test_no_outliers() {
        assert_eq!(format_outliers(&[]), "Removed Outliers:\n");
    }
}
