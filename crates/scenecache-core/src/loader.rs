//! # Loader
//!
//! One-shot population of a [`DatabaseCache`] from a [`Database`].
//!
//! Three filters are applied consistently to all cached data:
//! - image names: only the named images are kept (all images if the set is empty)
//! - watermarks: watermark pairs are dropped when `ignore_watermarks` is set
//! - match count: pairs with fewer than `min_num_matches` matches are dropped
//!
//! Cameras are loaded only when referenced by a kept image, and a
//! correspondence is kept only when both of its images are kept. Images left
//! without correspondences stay in the cache.

use crate::cache::DatabaseCache;
use crate::database::Database;
use crate::{CacheError, Camera, CameraId, Image, ImageId, MatchRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

// =============================================================================
// OPTIONS
// =============================================================================

/// Filter parameters for [`DatabaseCache::load`].
///
/// Deserializable so it can be read straight from a TOML filter file; absent
/// keys take the defaults (no threshold, keep watermarks, all images).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Inclusive lower bound on the number of matches of a kept pair.
    pub min_num_matches: u32,
    /// Drop pairs flagged as watermark pairs.
    pub ignore_watermarks: bool,
    /// Names of the images to keep. Empty keeps every image.
    pub image_names: BTreeSet<String>,
}

impl LoadOptions {
    /// Create options that keep everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum number of matches.
    #[must_use]
    pub fn with_min_num_matches(mut self, min_num_matches: u32) -> Self {
        self.min_num_matches = min_num_matches;
        self
    }

    /// Set whether watermark pairs are dropped.
    #[must_use]
    pub fn with_ignore_watermarks(mut self, ignore_watermarks: bool) -> Self {
        self.ignore_watermarks = ignore_watermarks;
        self
    }

    /// Restrict loading to the named images.
    #[must_use]
    pub fn with_image_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_names = names.into_iter().map(Into::into).collect();
        self
    }

    fn keeps_image(&self, image: &Image) -> bool {
        self.image_names.is_empty() || self.image_names.contains(&image.name)
    }
}

// =============================================================================
// SUMMARY
// =============================================================================

/// Counters describing what a load kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub num_cameras: usize,
    pub num_images: usize,
    /// Match records delivered by the database.
    pub num_match_records: usize,
    /// Match records accumulated into the correspondence index.
    pub num_retained_records: usize,
    /// Dropped because an endpoint image was filtered out or unknown.
    pub num_skipped_by_image: usize,
    /// Dropped as watermark pairs.
    pub num_skipped_watermark: usize,
    /// Dropped for having fewer than `min_num_matches` matches, or none.
    pub num_skipped_below_threshold: usize,
}

// =============================================================================
// LOAD
// =============================================================================

impl DatabaseCache {
    /// Load cameras, images and correspondences from a database.
    ///
    /// # Errors
    ///
    /// - `CacheError::AlreadyLoaded` if the cache was loaded before or already
    ///   holds entities. The cache is marked loaded before the database is
    ///   touched, so a failed load cannot be retried on the same instance.
    /// - `CacheError::MissingCamera` if a kept image references a camera the
    ///   database does not contain.
    /// - Any error the database reports while reading.
    ///
    /// After an error the cache may be partially populated and must be
    /// discarded.
    pub fn load<D>(
        &mut self,
        database: &D,
        options: &LoadOptions,
    ) -> Result<LoadSummary, CacheError>
    where
        D: Database + ?Sized,
    {
        if self.loaded || !self.cameras.is_empty() || !self.images.is_empty() {
            return Err(CacheError::AlreadyLoaded);
        }
        self.loaded = true;

        let images = self.select_images(database.read_all_images()?, options);
        self.load_cameras(database.read_all_cameras()?, &images)?;

        for image in images {
            self.correspondence_graph.add_image(image.id);
            self.images.insert(image.id, image);
        }
        info!(
            cameras = self.cameras.len(),
            images = self.images.len(),
            "Loaded cameras and images"
        );

        let mut summary = LoadSummary {
            num_cameras: self.cameras.len(),
            num_images: self.images.len(),
            ..LoadSummary::default()
        };
        database.for_each_match_record(options.min_num_matches, &mut |record| {
            self.accept_match_record(record, options, &mut summary)
        })?;

        for image in self.images.values_mut() {
            image.num_correspondences = self
                .correspondence_graph
                .num_correspondences_for_image(image.id);
        }

        info!(
            records = summary.num_match_records,
            retained = summary.num_retained_records,
            pairs = self.correspondence_graph.num_image_pairs(),
            skipped_by_image = summary.num_skipped_by_image,
            skipped_watermark = summary.num_skipped_watermark,
            skipped_below_threshold = summary.num_skipped_below_threshold,
            "Loaded correspondences"
        );
        Ok(summary)
    }

    /// Create a cache and load it in one step.
    pub fn from_database<D>(database: &D, options: &LoadOptions) -> Result<Self, CacheError>
    where
        D: Database + ?Sized,
    {
        let mut cache = Self::new();
        cache.load(database, options)?;
        Ok(cache)
    }

    /// Apply the name filter and drop repeated image rows (first row wins).
    fn select_images(&self, rows: Vec<Image>, options: &LoadOptions) -> Vec<Image> {
        let mut seen: HashSet<ImageId> = HashSet::with_capacity(rows.len());
        let mut found_names: HashSet<&str> = HashSet::new();
        let mut selected = Vec::with_capacity(rows.len());

        for image in &rows {
            if !options.keeps_image(image) {
                continue;
            }
            if !seen.insert(image.id) {
                debug!(image = image.id.0, "Dropping repeated image row");
                continue;
            }
            found_names.insert(image.name.as_str());
            selected.push(image.clone());
        }

        for name in &options.image_names {
            if !found_names.contains(name.as_str()) {
                warn!(name = %name, "Requested image not found in database");
            }
        }

        selected
    }

    /// Load every camera referenced by the kept images.
    fn load_cameras(&mut self, rows: Vec<Camera>, images: &[Image]) -> Result<(), CacheError> {
        let mut by_id: HashMap<CameraId, Camera> = HashMap::with_capacity(rows.len());
        for camera in rows {
            if by_id.contains_key(&camera.id) {
                debug!(camera = camera.id.0, "Dropping repeated camera row");
                continue;
            }
            by_id.insert(camera.id, camera);
        }

        let referenced: BTreeSet<CameraId> = images.iter().map(|image| image.camera_id).collect();
        for camera_id in referenced {
            let camera = by_id.remove(&camera_id).ok_or_else(|| {
                // Report the first image that needs the missing camera.
                let image = images
                    .iter()
                    .find(|image| image.camera_id == camera_id)
                    .map_or(ImageId(0), |image| image.id);
                CacheError::MissingCamera {
                    image,
                    camera: camera_id,
                }
            })?;
            self.cameras.insert(camera_id, camera);
        }
        Ok(())
    }

    /// Filter one match record and accumulate it into the index.
    fn accept_match_record(
        &mut self,
        record: MatchRecord,
        options: &LoadOptions,
        summary: &mut LoadSummary,
    ) -> Result<(), CacheError> {
        summary.num_match_records += 1;

        let pair = record.pair;
        if !self.images.contains_key(&pair.first()) || !self.images.contains_key(&pair.second()) {
            summary.num_skipped_by_image += 1;
            return Ok(());
        }
        if options.ignore_watermarks && record.is_watermark() {
            summary.num_skipped_watermark += 1;
            return Ok(());
        }
        // A record without matches adds no edge, whatever the threshold.
        if record.num_matches == 0 || record.num_matches < options.min_num_matches {
            summary.num_skipped_below_threshold += 1;
            return Ok(());
        }

        self.correspondence_graph
            .add_correspondences(pair, record.num_matches)
            .map_err(|_| CacheError::DanglingCorrespondence(pair))?;
        summary.num_retained_records += 1;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatabase;
    use crate::{ImagePair, TwoViewConfig};

    fn record(a: u32, b: u32, num_matches: u32, config: TwoViewConfig) -> MatchRecord {
        MatchRecord::new(
            ImagePair::new(ImageId(a), ImageId(b)).expect("pair"),
            num_matches,
            config,
        )
    }

    /// Database whose `min_num_matches` hint is ignored.
    struct RawRows(MemoryDatabase);

    impl Database for RawRows {
        fn read_all_cameras(&self) -> Result<Vec<Camera>, CacheError> {
            self.0.read_all_cameras()
        }

        fn read_all_images(&self) -> Result<Vec<Image>, CacheError> {
            self.0.read_all_images()
        }

        fn for_each_match_record(
            &self,
            _min_num_matches: u32,
            visit: &mut dyn FnMut(MatchRecord) -> Result<(), CacheError>,
        ) -> Result<(), CacheError> {
            self.0.for_each_match_record(0, visit)
        }
    }

    fn two_camera_database() -> MemoryDatabase {
        let mut database = MemoryDatabase::new();
        database.add_camera(Camera::new(CameraId(1), "PINHOLE", 640, 480));
        database.add_camera(Camera::new(CameraId(2), "PINHOLE", 800, 600));
        database.add_camera(Camera::new(CameraId(3), "PINHOLE", 100, 100));
        database.add_image(Image::new(ImageId(1), "a.jpg", CameraId(1), 50));
        database.add_image(Image::new(ImageId(2), "b.jpg", CameraId(1), 60));
        database.add_image(Image::new(ImageId(3), "c.jpg", CameraId(2), 70));
        database.add_match_record(record(1, 2, 10, TwoViewConfig::Calibrated));
        database.add_match_record(record(2, 3, 2, TwoViewConfig::Watermark));
        database.add_match_record(record(1, 3, 5, TwoViewConfig::Uncalibrated));
        database
    }

    #[test]
    fn unreferenced_cameras_are_not_loaded() {
        let cache = DatabaseCache::from_database(&two_camera_database(), &LoadOptions::new())
            .expect("load");

        assert_eq!(cache.num_cameras(), 2);
        assert!(!cache.exists_camera(CameraId(3)));
    }

    #[test]
    fn summary_counts_each_skip_reason() {
        let options = LoadOptions::new()
            .with_min_num_matches(6)
            .with_ignore_watermarks(true)
            .with_image_names(["a.jpg", "b.jpg", "c.jpg"]);
        let mut cache = DatabaseCache::new();
        let summary = cache
            .load(&RawRows(two_camera_database()), &options)
            .expect("load");

        assert_eq!(summary.num_match_records, 3);
        assert_eq!(summary.num_retained_records, 1);
        assert_eq!(summary.num_skipped_watermark, 1);
        assert_eq!(summary.num_skipped_below_threshold, 1);
        assert_eq!(summary.num_skipped_by_image, 0);
    }

    #[test]
    fn empty_match_record_is_not_retained() {
        let mut database = two_camera_database();
        database.add_image(Image::new(ImageId(4), "d.jpg", CameraId(1), 80));
        database.add_match_record(record(1, 4, 0, TwoViewConfig::Calibrated));
        let mut cache = DatabaseCache::new();
        let summary = cache
            .load(&RawRows(database), &LoadOptions::new())
            .expect("load");

        assert_eq!(summary.num_match_records, 4);
        assert_eq!(summary.num_retained_records, 3);
        assert_eq!(summary.num_skipped_below_threshold, 1);
        assert_eq!(cache.correspondence_graph().num_image_pairs(), 3);
        assert_eq!(cache.image(ImageId(4)).expect("d").num_correspondences, 0);
    }

    #[test]
    fn records_outside_name_filter_are_skipped() {
        let options = LoadOptions::new().with_image_names(["a.jpg", "b.jpg"]);
        let mut cache = DatabaseCache::new();
        let summary = cache.load(&two_camera_database(), &options).expect("load");

        assert_eq!(summary.num_skipped_by_image, 2);
        assert_eq!(cache.correspondence_graph().num_image_pairs(), 1);
        assert_eq!(cache.num_cameras(), 1);
    }

    #[test]
    fn image_correspondence_totals_are_filled_in() {
        let cache = DatabaseCache::from_database(&two_camera_database(), &LoadOptions::new())
            .expect("load");

        assert_eq!(cache.image(ImageId(1)).expect("a").num_correspondences, 15);
        assert_eq!(cache.image(ImageId(2)).expect("b").num_correspondences, 12);
        assert_eq!(cache.image(ImageId(3)).expect("c").num_correspondences, 7);
    }

    #[test]
    fn missing_camera_is_a_data_error() {
        let mut database = two_camera_database();
        database.add_image(Image::new(ImageId(9), "orphan.jpg", CameraId(42), 1));

        let result = DatabaseCache::from_database(&database, &LoadOptions::new());
        assert!(matches!(
            result,
            Err(CacheError::MissingCamera {
                image: ImageId(9),
                camera: CameraId(42)
            })
        ));
    }

    #[test]
    fn missing_camera_outside_name_filter_is_ignored() {
        let mut database = two_camera_database();
        database.add_image(Image::new(ImageId(9), "orphan.jpg", CameraId(42), 1));

        let options = LoadOptions::new().with_image_names(["a.jpg"]);
        let cache = DatabaseCache::from_database(&database, &options).expect("load");
        assert_eq!(cache.num_images(), 1);
    }

    #[test]
    fn failed_load_cannot_be_retried() {
        let mut database = two_camera_database();
        database.add_image(Image::new(ImageId(9), "orphan.jpg", CameraId(42), 1));

        let mut cache = DatabaseCache::new();
        assert!(cache.load(&database, &LoadOptions::new()).is_err());
        assert!(cache.is_loaded());

        let retry = cache.load(&two_camera_database(), &LoadOptions::new());
        assert!(matches!(retry, Err(CacheError::AlreadyLoaded)));
    }

    #[test]
    fn load_after_manual_add_is_rejected() {
        let mut cache = DatabaseCache::new();
        cache
            .add_camera(Camera::new(CameraId(1), "PINHOLE", 1, 1))
            .expect("camera");

        let result = cache.load(&two_camera_database(), &LoadOptions::new());
        assert!(matches!(result, Err(CacheError::AlreadyLoaded)));
        assert_eq!(cache.num_cameras(), 1);
    }

    #[test]
    fn load_options_from_toml_use_defaults() {
        let options: LoadOptions = toml::from_str("ignore_watermarks = true").expect("parse");
        assert!(options.ignore_watermarks);
        assert_eq!(options.min_num_matches, 0);
        assert!(options.image_names.is_empty());
    }
}
