//! # Database Interface
//!
//! The read interface the cache requires from the persistent store, plus an
//! in-memory implementation used for fixtures and JSON datasets.
//!
//! Two implementations exist:
//! - `MemoryDatabase` (this module): `BTreeMap` tables, serde-serializable
//! - `RedbDatabase` (`storage` module): disk-backed, ACID

use crate::{CacheError, Camera, CameraId, Image, ImageId, ImagePair, MatchRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// DATABASE TRAIT
// =============================================================================

/// Read-only access to a store of cameras, images and pairwise matches.
///
/// All methods are fallible so disk-backed stores can report I/O and
/// decoding errors.
pub trait Database {
    /// Read every camera row.
    fn read_all_cameras(&self) -> Result<Vec<Camera>, CacheError>;

    /// Read every image row.
    fn read_all_images(&self) -> Result<Vec<Image>, CacheError>;

    /// Visit every match record.
    ///
    /// `min_num_matches` is a hint: implementations may skip records below it,
    /// but callers must not rely on that. An error returned by `visit` stops
    /// the iteration and is returned unchanged.
    fn for_each_match_record(
        &self,
        min_num_matches: u32,
        visit: &mut dyn FnMut(MatchRecord) -> Result<(), CacheError>,
    ) -> Result<(), CacheError>;
}

// =============================================================================
// IN-MEMORY DATABASE
// =============================================================================

/// An in-memory database.
///
/// Serializes as `{ "cameras": [...], "images": [...], "matches": [...] }`,
/// which is the dataset format accepted by the CLI `import` command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "DatasetRows", into = "DatasetRows")]
pub struct MemoryDatabase {
    cameras: BTreeMap<CameraId, Camera>,
    images: BTreeMap<ImageId, Image>,
    matches: BTreeMap<ImagePair, MatchRecord>,
}

impl MemoryDatabase {
    /// Create a new empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a camera row.
    pub fn add_camera(&mut self, camera: Camera) {
        self.cameras.insert(camera.id, camera);
    }

    /// Insert or replace an image row.
    pub fn add_image(&mut self, image: Image) {
        self.images.insert(image.id, image);
    }

    /// Insert or replace the match row of a pair.
    pub fn add_match_record(&mut self, record: MatchRecord) {
        self.matches.insert(record.pair, record);
    }

    /// Number of camera rows.
    #[must_use]
    pub fn num_cameras(&self) -> usize {
        self.cameras.len()
    }

    /// Number of image rows.
    #[must_use]
    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    /// Number of match rows.
    #[must_use]
    pub fn num_match_records(&self) -> usize {
        self.matches.len()
    }

    /// Get all cameras in id order.
    pub fn cameras(&self) -> impl Iterator<Item = &Camera> {
        self.cameras.values()
    }

    /// Get all images in id order.
    pub fn images(&self) -> impl Iterator<Item = &Image> {
        self.images.values()
    }

    /// Get all match records in pair order.
    pub fn match_records(&self) -> impl Iterator<Item = &MatchRecord> {
        self.matches.values()
    }
}

impl Database for MemoryDatabase {
    fn read_all_cameras(&self) -> Result<Vec<Camera>, CacheError> {
        Ok(self.cameras.values().cloned().collect())
    }

    fn read_all_images(&self) -> Result<Vec<Image>, CacheError> {
        Ok(self.images.values().cloned().collect())
    }

    fn for_each_match_record(
        &self,
        min_num_matches: u32,
        visit: &mut dyn FnMut(MatchRecord) -> Result<(), CacheError>,
    ) -> Result<(), CacheError> {
        for record in self.matches.values() {
            if record.num_matches >= min_num_matches {
                visit(*record)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Row-list representation of a `MemoryDatabase`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DatasetRows {
    #[serde(default)]
    cameras: Vec<Camera>,
    #[serde(default)]
    images: Vec<Image>,
    #[serde(default)]
    matches: Vec<MatchRecord>,
}

impl From<DatasetRows> for MemoryDatabase {
    fn from(rows: DatasetRows) -> Self {
        let mut database = MemoryDatabase::new();
        for camera in rows.cameras {
            database.add_camera(camera);
        }
        for image in rows.images {
            database.add_image(image);
        }
        for record in rows.matches {
            database.add_match_record(record);
        }
        database
    }
}

impl From<MemoryDatabase> for DatasetRows {
    fn from(database: MemoryDatabase) -> Self {
        Self {
            cameras: database.cameras.into_values().collect(),
            images: database.images.into_values().collect(),
            matches: database.matches.into_values().collect(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
