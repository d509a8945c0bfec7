//! # Load Contract Tests (T0-T3)
//!
//! If ANY tier fails, the cache is INVALID.
//!
//! ## Tiers
//! - T0: Entity Store
//! - T1: Filter Correctness
//! - T2: Lifecycle
//! - T3: Backend Equivalence

use scenecache_core::{
    CacheError, Camera, CameraId, Database, DatabaseCache, Image, ImageId, ImagePair, LoadOptions,
    MatchRecord, MemoryDatabase, TwoViewConfig,
};

const A: ImageId = ImageId(1);
const B: ImageId = ImageId(2);
const C: ImageId = ImageId(3);

fn record(a: ImageId, b: ImageId, num_matches: u32, config: TwoViewConfig) -> MatchRecord {
    MatchRecord::new(ImagePair::new(a, b).expect("pair"), num_matches, config)
}

/// Images A, B, C on two cameras; A-B:10, B-C:2 (watermark), A-C:5.
fn abc_database() -> MemoryDatabase {
    let mut database = MemoryDatabase::new();
    database.add_camera(Camera::new(CameraId(1), "SIMPLE_PINHOLE", 640, 480));
    database.add_camera(Camera::new(CameraId(2), "SIMPLE_PINHOLE", 640, 480));
    database.add_image(Image::new(A, "A", CameraId(1), 100));
    database.add_image(Image::new(B, "B", CameraId(1), 110));
    database.add_image(Image::new(C, "C", CameraId(2), 120));
    database.add_match_record(record(A, B, 10, TwoViewConfig::Calibrated));
    database.add_match_record(record(B, C, 2, TwoViewConfig::Watermark));
    database.add_match_record(record(A, C, 5, TwoViewConfig::Calibrated));
    database
}

/// A database that ignores the `min_num_matches` hint entirely.
struct UnfilteredDatabase(MemoryDatabase);

impl Database for UnfilteredDatabase {
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
        for record in self.0.match_records() {
            visit(*record)?;
        }
        Ok(())
    }
}

// =============================================================================
// TIER T0: ENTITY STORE
// =============================================================================

mod t0_entity_store {
    use super::*;

    /// T0.1: Manual insertion without load leaves the index empty.
    #[test]
    fn manual_add_without_load() {
        let mut cache = DatabaseCache::new();
        for id in 1..=3 {
            cache
                .add_camera(Camera::new(CameraId(id), "PINHOLE", 10, 10))
                .expect("camera");
        }
        for id in 1..=4 {
            cache
                .add_image(Image::new(ImageId(id), format!("{id}"), CameraId(1), 0))
                .expect("image");
        }

        assert_eq!(cache.num_cameras(), 3);
        assert_eq!(cache.num_images(), 4);
        assert_eq!(cache.correspondence_graph().num_images(), 0);
        assert_eq!(cache.correspondence_graph().num_image_pairs(), 0);
    }

    /// T0.2: Lookups of absent ids are errors, existence checks are false.
    #[test]
    fn absent_ids() {
        let cache = DatabaseCache::from_database(&abc_database(), &LoadOptions::new())
            .expect("load");

        assert!(matches!(
            cache.image(ImageId(99)),
            Err(CacheError::ImageNotFound(ImageId(99)))
        ));
        assert!(!cache.exists_camera(CameraId(99)));
    }

    /// T0.3: Bulk views expose exactly the cached entities.
    #[test]
    fn bulk_views_match_counts() {
        let cache = DatabaseCache::from_database(&abc_database(), &LoadOptions::new())
            .expect("load");

        assert_eq!(cache.images().len(), cache.num_images());
        assert_eq!(cache.cameras().len(), cache.num_cameras());
        for (id, image) in cache.images() {
            assert_eq!(*id, image.id);
        }
    }
}

// =============================================================================
// TIER T1: FILTER CORRECTNESS
// =============================================================================

mod t1_filters {
    use super::*;

    /// T1.1: Threshold plus watermark filter.
    #[test]
    fn threshold_and_watermarks() {
        let options = LoadOptions::new()
            .with_min_num_matches(3)
            .with_ignore_watermarks(true);
        let cache = DatabaseCache::from_database(&abc_database(), &options).expect("load");
        let graph = cache.correspondence_graph();

        assert_eq!(cache.num_images(), 3);
        assert_eq!(graph.num_image_pairs(), 2);
        assert_eq!(graph.num_correspondences_between_images(A, B), 10);
        assert_eq!(graph.num_correspondences_between_images(A, C), 5);
        assert_eq!(graph.num_correspondences_between_images(B, C), 0);
    }

    /// T1.2: Watermark pairs are kept when not ignored.
    #[test]
    fn watermarks_kept_by_default() {
        let cache = DatabaseCache::from_database(&abc_database(), &LoadOptions::new())
            .expect("load");

        assert_eq!(
            cache
                .correspondence_graph()
                .num_correspondences_between_images(C, B),
            2
        );
    }

    /// T1.3: Name filter keeps only the named images and their cameras.
    #[test]
    fn name_filter() {
        let options = LoadOptions::new().with_image_names(["A", "B"]);
        let cache = DatabaseCache::from_database(&abc_database(), &options).expect("load");
        let graph = cache.correspondence_graph();

        assert_eq!(cache.num_images(), 2);
        assert!(cache.exists_image(A));
        assert!(cache.exists_image(B));
        assert!(!cache.exists_image(C));
        assert_eq!(cache.num_cameras(), 1);
        assert!(!cache.exists_camera(CameraId(2)));
        assert_eq!(graph.num_image_pairs(), 1);
        assert_eq!(graph.neighbors(C).count(), 0);
        assert!(!graph.exists_image(C));
    }

    /// T1.4: Unknown names are ignored.
    #[test]
    fn unknown_names_ignored() {
        let options = LoadOptions::new().with_image_names(["A", "missing.jpg"]);
        let cache = DatabaseCache::from_database(&abc_database(), &options).expect("load");

        assert_eq!(cache.num_images(), 1);
        assert_eq!(cache.correspondence_graph().num_image_pairs(), 0);
    }

    /// T1.5: A count equal to the threshold is retained, one below is dropped.
    #[test]
    fn threshold_boundary() {
        let at = LoadOptions::new().with_min_num_matches(5);
        let cache = DatabaseCache::from_database(&abc_database(), &at).expect("load");
        assert_eq!(
            cache
                .correspondence_graph()
                .num_correspondences_between_images(A, C),
            5
        );

        let above = LoadOptions::new().with_min_num_matches(6);
        let cache = DatabaseCache::from_database(&abc_database(), &above).expect("load");
        assert_eq!(
            cache
                .correspondence_graph()
                .num_correspondences_between_images(A, C),
            0
        );
    }

    /// T1.6: Filtering holds even when the database ignores the hint.
    #[test]
    fn client_side_filtering() {
        let options = LoadOptions::new()
            .with_min_num_matches(3)
            .with_ignore_watermarks(true);
        let database = UnfilteredDatabase(abc_database());
        let cache = DatabaseCache::from_database(&database, &options).expect("load");

        let mut pairs: Vec<_> = cache.correspondence_graph().image_pairs().collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                (ImagePair::new(A, B).expect("pair"), 10),
                (ImagePair::new(A, C).expect("pair"), 5),
            ]
        );
    }

    /// T1.7: Every cached image is registered in the index, with or without edges.
    #[test]
    fn every_image_registered() {
        let options = LoadOptions::new().with_min_num_matches(1000);
        let cache = DatabaseCache::from_database(&abc_database(), &options).expect("load");

        for id in cache.images().keys() {
            assert!(cache.correspondence_graph().exists_image(*id));
        }
        assert_eq!(cache.correspondence_graph().num_image_pairs(), 0);
    }
}

// =============================================================================
// TIER T2: LIFECYCLE
// =============================================================================

mod t2_lifecycle {
    use super::*;

    /// T2.1: A second load is rejected and leaves the cache unchanged.
    #[test]
    fn double_load_rejected() {
        let mut cache = DatabaseCache::new();
        cache
            .load(&abc_database(), &LoadOptions::new())
            .expect("first load");

        let result = cache.load(&abc_database(), &LoadOptions::new().with_image_names(["A"]));
        assert!(matches!(result, Err(CacheError::AlreadyLoaded)));
        assert_eq!(cache.num_images(), 3);
    }

    /// T2.2: Images reference cached cameras after a load.
    #[test]
    fn loaded_cache_is_consistent() {
        let cache = DatabaseCache::from_database(&abc_database(), &LoadOptions::new())
            .expect("load");
        assert!(cache.check_integrity().is_ok());
    }

    /// T2.3: A missing camera aborts the load.
    #[test]
    fn missing_camera_aborts() {
        let mut database = abc_database();
        database.add_image(Image::new(ImageId(4), "D", CameraId(9), 1));

        let result = DatabaseCache::from_database(&database, &LoadOptions::new());
        assert!(matches!(
            result,
            Err(CacheError::MissingCamera {
                image: ImageId(4),
                camera: CameraId(9)
            })
        ));
    }

    /// T2.4: The summary reports retained and skipped records.
    #[test]
    fn summary_reports_filtering() {
        let mut cache = DatabaseCache::new();
        let options = LoadOptions::new()
            .with_ignore_watermarks(true)
            .with_image_names(["A", "B", "C"]);
        let summary = cache
            .load(&UnfilteredDatabase(abc_database()), &options)
            .expect("load");

        assert_eq!(summary.num_images, 3);
        assert_eq!(summary.num_match_records, 3);
        assert_eq!(summary.num_retained_records, 2);
        assert_eq!(summary.num_skipped_watermark, 1);
    }
}

// =============================================================================
// TIER T3: BACKEND EQUIVALENCE
// =============================================================================

mod t3_backends {
    use super::*;
    use scenecache_core::{CacheStatistics, RedbDatabase};
    use tempfile::tempdir;

    /// T3.1: Loading from redb yields the same cache as loading from memory.
    #[test]
    fn redb_matches_memory() {
        let temp = tempdir().expect("temp dir");
        let redb = RedbDatabase::open(temp.path().join("scene.redb")).expect("open");
        let memory = abc_database();
        redb.import(&memory).expect("import");

        let options = LoadOptions::new()
            .with_min_num_matches(3)
            .with_ignore_watermarks(true);
        let from_memory = DatabaseCache::from_database(&memory, &options).expect("load");
        let from_redb = DatabaseCache::from_database(&redb, &options).expect("load");

        assert_eq!(from_memory.images(), from_redb.images());
        assert_eq!(
            CacheStatistics::from_cache(&from_memory),
            CacheStatistics::from_cache(&from_redb)
        );
        for a in [A, B, C] {
            for b in [A, B, C] {
                assert_eq!(
                    from_memory
                        .correspondence_graph()
                        .num_correspondences_between_images(a, b),
                    from_redb
                        .correspondence_graph()
                        .num_correspondences_between_images(a, b)
                );
            }
        }
    }

    /// T3.2: A database can be loaded through a trait object.
    #[test]
    fn load_through_trait_object() {
        let database: Box<dyn Database> = Box::new(abc_database());
        let cache = DatabaseCache::from_database(database.as_ref(), &LoadOptions::new())
            .expect("load");
        assert_eq!(cache.num_images(), 3);
    }
}
