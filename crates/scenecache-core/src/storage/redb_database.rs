//! # redb-backed Reconstruction Database
//!
//! A disk-backed store of cameras, images and pairwise match records using
//! the redb embedded database:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Rows are postcard-encoded. Match rows are keyed by the encoded pair id,
//! so iteration order is by first image, then second image.

use crate::database::{Database, MemoryDatabase};
use crate::primitives::SCHEMA_VERSION;
use crate::{CacheError, Camera, Image, ImagePair, MatchRecord, TwoViewConfig};
use redb::{ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Table for cameras: CameraId(u32) -> serialized Camera bytes
const CAMERAS: TableDefinition<u32, &[u8]> = TableDefinition::new("cameras");

/// Table for images: ImageId(u32) -> serialized Image bytes
const IMAGES: TableDefinition<u32, &[u8]> = TableDefinition::new("images");

/// Table for matches: pair id(u64) -> serialized MatchRow bytes
const MATCHES: TableDefinition<u64, &[u8]> = TableDefinition::new("matches");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// Stored body of a match record; the pair lives in the key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct MatchRow {
    num_matches: u32,
    config: TwoViewConfig,
}

fn io_error(e: impl std::fmt::Display) -> CacheError {
    CacheError::IoError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CacheError> {
    postcard::to_allocvec(value).map_err(|e| CacheError::SerializationError(e.to_string()))
}

fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, CacheError> {
    postcard::from_bytes(bytes).map_err(|e| CacheError::DeserializationError(e.to_string()))
}

/// A disk-backed reconstruction database using redb.
pub struct RedbDatabase {
    /// The redb database handle.
    db: redb::Database,
}

impl std::fmt::Debug for RedbDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbDatabase").finish_non_exhaustive()
    }
}

impl RedbDatabase {
    /// Open or create a database at the given path.
    ///
    /// Returns `CacheError::DeserializationError` if the file was written with
    /// an incompatible schema version.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let db = redb::Database::create(path.as_ref()).map_err(io_error)?;

        // Initialize tables if they don't exist
        let write_txn = db.begin_write().map_err(io_error)?;
        {
            let _ = write_txn.open_table(CAMERAS).map_err(io_error)?;
            let _ = write_txn.open_table(IMAGES).map_err(io_error)?;
            let _ = write_txn.open_table(MATCHES).map_err(io_error)?;
            let mut meta_table = write_txn.open_table(METADATA).map_err(io_error)?;

            let stored = meta_table
                .get("schema_version")
                .map_err(io_error)?
                .map(|v| v.value());
            match stored {
                None => {
                    meta_table
                        .insert("schema_version", SCHEMA_VERSION)
                        .map_err(io_error)?;
                }
                Some(version) if version != SCHEMA_VERSION => {
                    return Err(CacheError::DeserializationError(format!(
                        "Unsupported schema version: {version} (expected {SCHEMA_VERSION})"
                    )));
                }
                Some(_) => {}
            }
        }
        write_txn.commit().map_err(io_error)?;

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), CacheError> {
        self.db.compact().map_err(io_error)?;
        Ok(())
    }

    /// Insert or replace a camera row.
    pub fn write_camera(&self, camera: &Camera) -> Result<(), CacheError> {
        let bytes = encode(camera)?;
        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut table = write_txn.open_table(CAMERAS).map_err(io_error)?;
            table
                .insert(camera.id.0, bytes.as_slice())
                .map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)
    }

    /// Insert or replace an image row.
    pub fn write_image(&self, image: &Image) -> Result<(), CacheError> {
        let bytes = encode(image)?;
        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut table = write_txn.open_table(IMAGES).map_err(io_error)?;
            table
                .insert(image.id.0, bytes.as_slice())
                .map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)
    }

    /// Insert or replace the match row of a pair.
    pub fn write_match_record(&self, record: &MatchRecord) -> Result<(), CacheError> {
        let bytes = encode(&MatchRow {
            num_matches: record.num_matches,
            config: record.config,
        })?;
        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut table = write_txn.open_table(MATCHES).map_err(io_error)?;
            table
                .insert(record.pair.pair_id(), bytes.as_slice())
                .map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)
    }

    /// Import a whole dataset in a single ACID transaction.
    ///
    /// Rows already present with the same key are replaced. All rows are
    /// encoded before the transaction opens, so an encoding failure leaves
    /// the database untouched.
    pub fn import(&self, dataset: &MemoryDatabase) -> Result<(), CacheError> {
        let cameras = dataset
            .cameras()
            .map(|camera| Ok((camera.id.0, encode(camera)?)))
            .collect::<Result<Vec<_>, CacheError>>()?;
        let images = dataset
            .images()
            .map(|image| Ok((image.id.0, encode(image)?)))
            .collect::<Result<Vec<_>, CacheError>>()?;
        let matches = dataset
            .match_records()
            .map(|record| {
                let row = MatchRow {
                    num_matches: record.num_matches,
                    config: record.config,
                };
                Ok((record.pair.pair_id(), encode(&row)?))
            })
            .collect::<Result<Vec<_>, CacheError>>()?;

        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut cameras_table = write_txn.open_table(CAMERAS).map_err(io_error)?;
            for (id, bytes) in &cameras {
                cameras_table
                    .insert(*id, bytes.as_slice())
                    .map_err(io_error)?;
            }

            let mut images_table = write_txn.open_table(IMAGES).map_err(io_error)?;
            for (id, bytes) in &images {
                images_table
                    .insert(*id, bytes.as_slice())
                    .map_err(io_error)?;
            }

            let mut matches_table = write_txn.open_table(MATCHES).map_err(io_error)?;
            for (pair_id, bytes) in &matches {
                matches_table
                    .insert(*pair_id, bytes.as_slice())
                    .map_err(io_error)?;
            }
        }
        write_txn.commit().map_err(io_error)?;

        tracing::info!(
            cameras = cameras.len(),
            images = images.len(),
            matches = matches.len(),
            "Imported dataset"
        );
        Ok(())
    }

    /// Number of camera rows.
    pub fn num_cameras(&self) -> Result<usize, CacheError> {
        self.table_len(CAMERAS)
    }

    /// Number of image rows.
    pub fn num_images(&self) -> Result<usize, CacheError> {
        self.table_len(IMAGES)
    }

    /// Number of match rows.
    pub fn num_match_records(&self) -> Result<usize, CacheError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(MATCHES).map_err(io_error)?;
        Ok(table.len().map_err(io_error)? as usize)
    }

    fn table_len(&self, definition: TableDefinition<u32, &[u8]>) -> Result<usize, CacheError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(definition).map_err(io_error)?;
        Ok(table.len().map_err(io_error)? as usize)
    }

    fn read_rows<T>(&self, definition: TableDefinition<u32, &[u8]>) -> Result<Vec<T>, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(definition).map_err(io_error)?;

        let mut rows = Vec::new();
        for entry in table.iter().map_err(io_error)? {
            let (_, value) = entry.map_err(io_error)?;
            rows.push(decode(value.value())?);
        }
        Ok(rows)
    }
}

// =============================================================================
// DATABASE TRAIT IMPLEMENTATION
// =============================================================================

impl Database for RedbDatabase {
    fn read_all_cameras(&self) -> Result<Vec<Camera>, CacheError> {
        self.read_rows(CAMERAS)
    }

    fn read_all_images(&self) -> Result<Vec<Image>, CacheError> {
        self.read_rows(IMAGES)
    }

    fn for_each_match_record(
        &self,
        min_num_matches: u32,
        visit: &mut dyn FnMut(MatchRecord) -> Result<(), CacheError>,
    ) -> Result<(), CacheError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(MATCHES).map_err(io_error)?;

        for entry in table.iter().map_err(io_error)? {
            let (key, value) = entry.map_err(io_error)?;
            let row: MatchRow = decode(value.value())?;
            if row.num_matches < min_num_matches {
                continue;
            }
            let pair = ImagePair::from_pair_id(key.value())?;
            visit(MatchRecord::new(pair, row.num_matches, row.config))?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
