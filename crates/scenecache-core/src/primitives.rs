//! # Primitives
//!
//! Fixed constants shared by the cache, the storage layer and the CLI.

/// Bit shift of the first image id inside an encoded pair id.
///
/// `pair_id = (first << PAIR_ID_SHIFT) | second`. With 32-bit image ids every
/// normalized pair maps to a distinct `u64`.
pub const PAIR_ID_SHIFT: u32 = 32;

/// Schema version written into the `metadata` table of a redb database.
///
/// Increment this when the row encoding changes incompatibly.
pub const SCHEMA_VERSION: u64 = 1;

/// Scale of fixed-point means in statistics reports.
///
/// A mean of `12.5` is reported as `12_500_000`.
pub const MEAN_SCALE: u64 = 1_000_000;
