use crate::loader::LoadedImage;
use crate::render::{draw_matches, keypoint_positions, warp_object};
use crate::PipelineOutput;
use image::RgbImage;
use log::info;
use std::path::PathBuf;
use thiserror::Error;

pub const VIEW_SRC: &str = "imageSrc";
pub const VIEW_SRC_PRUNED: &str = "imageSrcPruned";
pub const VIEW_DST: &str = "imageDst";
pub const VIEW_DST_PRUNED: &str = "imageDstPruned";

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("homography cannot be inverted for warping")]
    SingularWarp,
}

/// A named rendered image
#[derive(Debug, Clone)]
pub struct View {
    pub name: &'static str,
    pub image: RgbImage,
}

/// Destination of rendered views
pub trait ViewSink {
    fn show(&mut self, views: &[View]) -> Result<(), DisplayError>;
}

/// Render the four result views: raw matches, sampled raw matches, inlier
/// matches against the warped object, sampled inlier matches.
pub fn compose_views(
    object: &LoadedImage,
    scene: &LoadedImage,
    output: &PipelineOutput,
    seed: u64,
) -> Result<Vec<View>, DisplayError> {
    let object_points = keypoint_positions(&output.object_keypoints);
    let scene_points = keypoint_positions(&output.scene_keypoints);
    let (scene_w, scene_h) = scene.dimensions();
    let warped = warp_object(&object.color, &output.homography, scene_w, scene_h)
        .ok_or(DisplayError::SingularWarp)?;
    let inliers_src = &output.partition.inliers_src;
    let inliers_dst = &output.partition.inliers_dst;

    Ok(vec![
        View {
            name: VIEW_SRC,
            image: draw_matches(&object.color, &object_points, &scene.color, &scene_points, &output.matches, seed),
        },
        View {
            name: VIEW_SRC_PRUNED,
            image: draw_matches(&object.color, &object_points, &scene.color, &scene_points, &output.raw_sample, seed),
        },
        View {
            name: VIEW_DST,
            image: draw_matches(&object.color, inliers_src, &warped, inliers_dst, &output.inlier_matches, seed),
        },
        View {
            name: VIEW_DST_PRUNED,
            image: draw_matches(&object.color, inliers_src, &warped, inliers_dst, &output.inlier_sample, seed),
        },
    ])
}

/// Writes each view to `<dir>/<name>.png`
#[derive(Debug, Clone)]
pub struct PngSink {
    dir: PathBuf,
}

impl PngSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.png"))
    }
}

impl ViewSink for PngSink {
    fn show(&mut self, views: &[View]) -> Result<(), DisplayError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| DisplayError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;
        for view in views {
            let path = self.path_for(view.name);
            view.image.save(&path).map_err(|source| DisplayError::Write {
                path: path.clone(),
                source,
            })?;
            info!("wrote {}", path.display());
        }
        Ok(())
    }
}

/// Title shared by the windows of one `WindowSink::show` call
pub fn window_title(views: &[View]) -> String {
    views.iter().map(|v| v.name).collect::<Vec<_>>().join(" | ")
}

/// Opens every view in its own window at the same time.
///
/// `show` blocks until all windows are closed. The windows share one title
/// listing the view names in order.
#[cfg(feature = "display-window")]
#[derive(Debug, Clone, Copy)]
pub struct WindowSink {
    width: u32,
    height: u32,
}

#[cfg(feature = "display-window")]
impl WindowSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn from_config(cfg: &planar_core::DisplayConfig) -> Self {
        Self::new(cfg.window_width, cfg.window_height)
    }
}

#[cfg(feature = "display-window")]
impl ViewSink for WindowSink {
    fn show(&mut self, views: &[View]) -> Result<(), DisplayError> {
        let rgba: Vec<image::RgbaImage> = views
            .iter()
            .map(|view| image::DynamicImage::ImageRgb8(view.image.clone()).into_rgba8())
            .collect();
        let refs: Vec<&image::RgbaImage> = rgba.iter().collect();
        imageproc::window::display_multiple_images(&window_title(views), &refs, self.width, self.height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_png_sink_writes_named_files() {
        let dir = std::env::temp_dir().join(format!("planar-cli-sink-{}", std::process::id()));
        let mut sink = PngSink::new(&dir);
        let views = [View {
            name: VIEW_SRC,
            image: RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])),
        }];
        sink.show(&views).unwrap();

        let written = image::open(sink.path_for(VIEW_SRC)).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (3, 2));
        assert_eq!(written.get_pixel(1, 1), &Rgb([1, 2, 3]));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_window_title_lists_views_in_order() {
        let view = |name| View {
            name,
            image: RgbImage::new(1, 1),
        };
        let views = [view(VIEW_SRC), view(VIEW_SRC_PRUNED), view(VIEW_DST), view(VIEW_DST_PRUNED)];
        assert_eq!(
            window_title(&views),
            "imageSrc | imageSrcPruned | imageDst | imageDstPruned"
        );
        assert_eq!(window_title(&[]), "");
    }
}
