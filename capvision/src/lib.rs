pub mod detect;
pub mod features;
pub mod matching;
pub mod preprocess;
pub mod refdb;
mod utils;

use opencv::core::Mat;

pub use detect::blobs::{estimate_average_blob_size, BlobConfig};
pub use detect::circles::{detect_circles, Circle, CircleConfig};
pub use detect::regions::{crop_regions, rectangles_from_circles, Rectangle};
pub use matching::score::{best_match, classify, success_score, BestMatch, CapMatch};
pub use matching::{match_descriptors, DescriptorMatch};
pub use preprocess::{apply_circular_mask, shrink_to_area, to_grayscale};
pub use refdb::{load_record, save_record, ReferenceDb, ReferenceRecord};

/// Every tunable of the identification pipeline in one place.
#[derive(Debug, Clone)]
pub struct IdentifyConfig {
    /// Keep at most this many descriptor correspondences per comparison.
    pub max_matches: usize,
    /// Success score separating confident from uncertain matches.
    pub success_threshold: f64,
    /// Photos above this pixel area are shrunk before feature extraction.
    pub max_area: i64,
    /// Downscale factor applied per shrink iteration.
    pub shrink_factor: f64,
    pub blobs: BlobConfig,
    pub circles: CircleConfig,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            max_matches: 50,
            success_threshold: 0.2,
            max_area: 1_000_000,
            shrink_factor: 0.66,
            blobs: BlobConfig::default(),
            circles: CircleConfig::default(),
        }
    }
}

/// The identification pipeline: a read-only reference database snapshot plus
/// the configuration it runs under. Calls carry no state from one photo to
/// the next, so one instance can serve any number of `identify` calls.
pub struct CapIdentifier {
    config: IdentifyConfig,
    refdb: ReferenceDb,
}

impl CapIdentifier {
    pub fn new(refdb: ReferenceDb) -> Self {
        Self::with_config(refdb, IdentifyConfig::default())
    }

    pub fn with_config(refdb: ReferenceDb, config: IdentifyConfig) -> Self {
        Self { config, refdb }
    }

    pub fn config(&self) -> &IdentifyConfig {
        &self.config
    }

    pub fn reference_db(&self) -> &ReferenceDb {
        &self.refdb
    }

    /// For swapping in a fresh snapshot via [`ReferenceDb::reload`].
    pub fn reference_db_mut(&mut self) -> &mut ReferenceDb {
        &mut self.refdb
    }

    /// Identify every cap-like region in a photo.
    ///
    /// Returns one [`CapMatch`] per detected region. A photo with no blobs or
    /// no circles yields an empty list; a region that matches no reference
    /// yields a null result with success 0.0. Both are normal outcomes.
    pub fn identify(&self, img: &Mat) -> anyhow::Result<Vec<CapMatch>> {
        let gray = preprocess::to_grayscale(img)?;
        let gray = preprocess::shrink_to_area(&gray, self.config.max_area, self.config.shrink_factor)?;

        let (_blobs, avg_size) = detect::blobs::estimate_average_blob_size(&gray, &self.config.blobs)?;
        if avg_size == 0.0 {
            log::info!("no blobs found, skipping circle detection");
            return Ok(Vec::new());
        }

        let (_debug_img, circles) = detect::circles::detect_circles(&gray, avg_size, &self.config.circles)?;
        let rectangles = detect::regions::rectangles_from_circles(&circles);
        let regions = detect::regions::crop_regions(&gray, &rectangles)?;

        let mut results = Vec::new();
        for (region_img, region) in regions {
            let (_keypoints, descriptors) = features::extract(&region_img)?;
            let best = matching::score::best_match(&self.refdb, &descriptors, self.config.max_matches)?;

            results.push(CapMatch {
                identity: best.identity,
                source: best.source,
                success: best.success,
                match_count: best.match_count,
                candidate_descriptors: descriptors.nrows(),
                reference_descriptors: best.reference_descriptors,
                region,
            });
        }

        Ok(results)
    }

    /// Partition results by the configured success threshold.
    pub fn classify(&self, results: Vec<CapMatch>) -> (Vec<CapMatch>, Vec<CapMatch>) {
        matching::score::classify(results, self.config.success_threshold)
    }
}
