//! # scenecache-core
//!
//! In-memory cache over a reconstruction database of cameras, images and
//! pairwise feature matches.
//!
//! A [`DatabaseCache`] is built once from any [`Database`] implementation,
//! keeping only the images, cameras and image pairs that pass the caller's
//! filters ([`LoadOptions`]). Afterwards it answers keyed lookups and
//! pairwise correspondence queries without touching the database again.
//!
//! ## Database Backends
//!
//! - [`MemoryDatabase`]: `BTreeMap` tables, deserializable from JSON datasets
//! - [`RedbDatabase`]: disk-backed, ACID, postcard-encoded rows
//!
//! ## Constraints
//!
//! - Pure Rust: no async, no network dependencies
//! - No floats in computed figures: means are fixed-point integers
//! - No panics: every precondition violation is a [`CacheError`]

// =============================================================================
// MODULES
// =============================================================================

pub mod cache;
pub mod correspondence;
pub mod database;
pub mod loader;
pub mod primitives;
pub mod stats;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CacheError, Camera, CameraId, Image, ImageId, ImagePair, MatchRecord, TwoViewConfig,
};

// =============================================================================
// RE-EXPORTS: Cache
// =============================================================================

pub use cache::DatabaseCache;
pub use correspondence::CorrespondenceGraph;
pub use database::{Database, MemoryDatabase};
pub use loader::{LoadOptions, LoadSummary};
pub use stats::{CacheStatistics, Summary};
pub use storage::RedbDatabase;
