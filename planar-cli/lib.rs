//! Planar object localisation: detect, describe, match, filter, fit a
//! homography and sample the matches to draw.
//!
//! [`PlanarPipeline`] holds one backend per capability trait of
//! `planar_core`. [`PlanarPipeline::new`] wires in the native FAST detector,
//! the configured descriptor (gradient histograms or BRIEF), the brute-force
//! matcher and RANSAC; [`PlanarPipeline::with_backends`] accepts any other
//! implementation.
//!
//! A run goes through three stages so callers can report each result as soon
//! as it exists: [`PlanarPipeline::match_features`],
//! [`PlanarPipeline::localize`] and [`PlanarPipeline::finish`].

pub mod display;
pub mod loader;
pub mod render;
pub mod report;

use log::{debug, info};
use planar_brief::BriefExtractor;
use planar_core::{
    init_thread_pool, CoreError, DescriptorExtractor, DescriptorKind, DescriptorMatcher, FeatureDetector,
    FeatureMatch, Homography, HomographyEstimator, Image, Keypoint, PipelineConfig, Point2,
};
use planar_fast::DetectorBuilder;
use planar_gradient::GradientExtractor;
use planar_homography::{partition_by_mask, HomographyError, Partition, RansacHomography};
use planar_match::{BruteForceMatcher, DisplaySampler, DistanceStats, GoodMatchFilter, MatchError};
use thiserror::Error;

pub use loader::{load_image, LoadError, LoadedImage};
pub use planar_core;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Homography(#[from] HomographyError),

    #[error("no keypoints detected in the {0} image")]
    NoKeypoints(&'static str),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Keypoints, matches and the filtered correspondences of one image pair
#[derive(Debug, Clone)]
pub struct MatchStage {
    pub object_keypoints: Vec<Keypoint>,
    pub scene_keypoints: Vec<Keypoint>,
    /// One nearest-neighbour match per object descriptor
    pub matches: Vec<FeatureMatch>,
    pub stats: DistanceStats,
    pub good_matches: Vec<FeatureMatch>,
    /// Object side of the good matches, aligned with `scene_points`
    pub object_points: Vec<Point2>,
    pub scene_points: Vec<Point2>,
}

/// Fitted homography and the inlier/outlier split of the good matches
#[derive(Debug, Clone)]
pub struct Localization {
    pub homography: Homography,
    pub partition: Partition,
}

/// Everything the report and the renderer need from one run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub object_keypoints: Vec<Keypoint>,
    pub scene_keypoints: Vec<Keypoint>,
    pub matches: Vec<FeatureMatch>,
    pub stats: DistanceStats,
    pub good_matches: Vec<FeatureMatch>,
    pub object_points: Vec<Point2>,
    pub scene_points: Vec<Point2>,
    pub homography: Homography,
    pub partition: Partition,
    /// Identity matches over the inlier point lists
    pub inlier_matches: Vec<FeatureMatch>,
    pub raw_sample: Vec<FeatureMatch>,
    pub inlier_sample: Vec<FeatureMatch>,
}

pub struct PlanarPipeline {
    config: PipelineConfig,
    detector: Box<dyn FeatureDetector>,
    extractor: Box<dyn DescriptorExtractor>,
    matcher: Box<dyn DescriptorMatcher>,
    estimator: Box<dyn HomographyEstimator>,
}

impl PlanarPipeline {
    /// Pipeline with the native backends
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        if let Err(e) = init_thread_pool(config.n_threads) {
            // The global pool can only be built once per process
            debug!("thread pool already initialised: {e}");
        }

        let detector = DetectorBuilder::from_config(config.features.clone())
            .build()
            .map_err(CoreError::from)?;
        let extractor: Box<dyn DescriptorExtractor> = match config.features.descriptor {
            DescriptorKind::Gradient => Box::new(GradientExtractor::from_config(&config.features)?),
            DescriptorKind::Brief => Box::new(BriefExtractor::from_config(&config.features)?),
        };
        let estimator = RansacHomography::from_config(&config.homography);

        Ok(Self::with_backends(
            config,
            Box::new(detector),
            extractor,
            Box::new(BruteForceMatcher::new()),
            Box::new(estimator),
        ))
    }

    pub fn with_backends(
        config: PipelineConfig,
        detector: Box<dyn FeatureDetector>,
        extractor: Box<dyn DescriptorExtractor>,
        matcher: Box<dyn DescriptorMatcher>,
        estimator: Box<dyn HomographyEstimator>,
    ) -> Self {
        Self {
            config,
            detector,
            extractor,
            matcher,
            estimator,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Detect, describe, match and keep the good matches
    pub fn match_features(&self, object: &Image, scene: &Image) -> PipelineResult<MatchStage> {
        let object_keypoints = self.detector.detect(object)?;
        if object_keypoints.is_empty() {
            return Err(PipelineError::NoKeypoints("object"));
        }
        let scene_keypoints = self.detector.detect(scene)?;
        if scene_keypoints.is_empty() {
            return Err(PipelineError::NoKeypoints("scene"));
        }
        info!(
            "detected {} object and {} scene keypoints",
            object_keypoints.len(),
            scene_keypoints.len()
        );

        let object_descriptors = self.extractor.compute(object, &object_keypoints)?;
        let scene_descriptors = self.extractor.compute(scene, &scene_keypoints)?;
        let matches = self
            .matcher
            .match_descriptors(&object_descriptors, &scene_descriptors)?;

        let filtered = GoodMatchFilter::new(self.config.matching.good_match_factor)
            .apply(&matches, object_descriptors.len())?;
        info!(
            "{} matches, distances {:.3}..{:.3}, {} good (distance < {:.3})",
            matches.len(),
            filtered.stats.min,
            filtered.stats.max,
            filtered.good.len(),
            filtered.threshold
        );

        let (object_points, scene_points): (Vec<Point2>, Vec<Point2>) = filtered
            .good
            .iter()
            .map(|m| {
                (
                    object_keypoints[m.query_idx].point(),
                    scene_keypoints[m.train_idx].point(),
                )
            })
            .unzip();

        Ok(MatchStage {
            object_keypoints,
            scene_keypoints,
            matches,
            stats: filtered.stats,
            good_matches: filtered.good,
            object_points,
            scene_points,
        })
    }

    /// Fit the homography on the good matches and split them by the inlier mask
    pub fn localize(&self, stage: &MatchStage) -> PipelineResult<Localization> {
        let homography = self
            .estimator
            .estimate(&stage.object_points, &stage.scene_points)?;
        let partition =
            partition_by_mask(&stage.object_points, &stage.scene_points, &homography.inlier_mask)?;
        info!(
            "homography: {} inliers, {} outliers",
            partition.inlier_count(),
            partition.outliers.len()
        );
        Ok(Localization {
            homography,
            partition,
        })
    }

    /// Draw the display samples from the raw matches and the inliers
    pub fn finish(&self, stage: MatchStage, localization: Localization) -> PipelineResult<PipelineOutput> {
        let sampler = DisplaySampler::from_config(&self.config.display);
        let raw_sample = sampler.sample(&stage.matches)?;
        let inlier_matches = localization.partition.identity_matches();
        let inlier_sample = sampler.sample(&inlier_matches)?;

        Ok(PipelineOutput {
            object_keypoints: stage.object_keypoints,
            scene_keypoints: stage.scene_keypoints,
            matches: stage.matches,
            stats: stage.stats,
            good_matches: stage.good_matches,
            object_points: stage.object_points,
            scene_points: stage.scene_points,
            homography: localization.homography,
            partition: localization.partition,
            inlier_matches,
            raw_sample,
            inlier_sample,
        })
    }

    pub fn run(&self, object: &Image, scene: &Image) -> PipelineResult<PipelineOutput> {
        let stage = self.match_features(object, scene)?;
        let localization = self.localize(&stage)?;
        self.finish(stage, localization)
    }
}
