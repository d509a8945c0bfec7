//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::{FilterOverrides, parse_config};
use scenecache_core::{
    CacheError, CacheStatistics, DatabaseCache, ImageId, LoadOptions, LoadSummary,
    MemoryDatabase, RedbDatabase,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum dataset size for import (500 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Maximum filter config size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CacheError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CacheError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CacheError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve a user-supplied path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CacheError> {
    let canonical = path.canonicalize().map_err(|e| {
        CacheError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CacheError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate and read a text file.
fn read_text_file(path: &Path, max_size: u64) -> Result<String, CacheError> {
    let validated_path = validate_file_path(path)?;
    validate_file_size(&validated_path, max_size)?;

    std::fs::read_to_string(&validated_path)
        .map_err(|e| CacheError::IoError(format!("Read file: {}", e)))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty database.
pub fn cmd_init(db_path: &Path, force: bool) -> Result<(), CacheError> {
    if db_path.exists() {
        if !force {
            return Err(CacheError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| CacheError::IoError(format!("Remove database: {}", e)))?;
    }

    RedbDatabase::open(db_path)?;
    println!("Initialized new redb database at {:?}", db_path);
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import a JSON dataset into the database.
pub fn cmd_import(db_path: &Path, json_mode: bool, file: &Path) -> Result<(), CacheError> {
    let dataset = read_dataset(file)?;
    let database = RedbDatabase::open(db_path)?;
    database.import(&dataset)?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "cameras": dataset.num_cameras(),
            "images": dataset.num_images(),
            "matches": dataset.num_match_records(),
        }));
        return Ok(());
    }

    println!(
        "Imported dataset: {} cameras, {} images, {} match records",
        dataset.num_cameras(),
        dataset.num_images(),
        dataset.num_match_records()
    );
    Ok(())
}

// =============================================================================
// STATS COMMAND
// =============================================================================

/// Load a cache and print its statistics.
pub fn cmd_stats(
    db_path: &Path,
    json_mode: bool,
    verbose: bool,
    options: &LoadOptions,
) -> Result<(), CacheError> {
    let (cache, summary) = load_cache(db_path, options)?;
    let stats = CacheStatistics::from_cache(&cache);

    if json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "filters": options,
            "statistics": stats,
            "load": summary,
        }));
        return Ok(());
    }

    println!("Database Cache Statistics");
    println!("=========================");
    println!("Database: {:?}", db_path);
    println!();
    print!("{stats}");

    if verbose {
        println!();
        println!("Load:");
        println!("  Match records:           {}", summary.num_match_records);
        println!("  Retained:                {}", summary.num_retained_records);
        println!("  Skipped (image filter):  {}", summary.num_skipped_by_image);
        println!("  Skipped (watermark):     {}", summary.num_skipped_watermark);
        println!(
            "  Skipped (threshold):     {}",
            summary.num_skipped_below_threshold
        );
    }

    Ok(())
}

// =============================================================================
// PAIR COMMAND
// =============================================================================

/// Print the number of correspondences between two images.
pub fn cmd_pair(
    db_path: &Path,
    json_mode: bool,
    options: &LoadOptions,
    first: u32,
    second: u32,
) -> Result<(), CacheError> {
    let (cache, _) = load_cache(db_path, options)?;
    let count = cache
        .correspondence_graph()
        .num_correspondences_between_images(ImageId(first), ImageId(second));

    if json_mode {
        print_json(&serde_json::json!({
            "first": first,
            "second": second,
            "num_correspondences": count,
        }));
        return Ok(());
    }

    println!(
        "{} <-> {}: {} correspondences",
        ImageId(first),
        ImageId(second),
        count
    );
    Ok(())
}

// =============================================================================
// NEIGHBORS COMMAND
// =============================================================================

/// List the images sharing correspondences with an image.
pub fn cmd_neighbors(
    db_path: &Path,
    json_mode: bool,
    options: &LoadOptions,
    image: u32,
) -> Result<(), CacheError> {
    let (cache, _) = load_cache(db_path, options)?;
    let id = ImageId(image);
    let name = cache.image(id)?.name.clone();
    let graph = cache.correspondence_graph();

    let neighbors: Vec<(ImageId, &str, u32)> = graph
        .neighbors(id)
        .map(|other| {
            let other_name = cache.image(other).map_or("", |img| img.name.as_str());
            (
                other,
                other_name,
                graph.num_correspondences_between_images(id, other),
            )
        })
        .collect();

    if json_mode {
        let entries: Vec<_> = neighbors
            .iter()
            .map(|(other, other_name, count)| {
                serde_json::json!({
                    "image": other.0,
                    "name": other_name,
                    "num_correspondences": count,
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "image": image,
            "name": name,
            "neighbors": entries,
        }));
        return Ok(());
    }

    println!("Neighbors of {} ({})", id, name);
    if neighbors.is_empty() {
        println!("  none");
    }
    for (other, other_name, count) in &neighbors {
        println!("  {:<12} {:<32} {}", other.to_string(), other_name, count);
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Read a JSON dataset file.
pub fn read_dataset(file: &Path) -> Result<MemoryDatabase, CacheError> {
    let text = read_text_file(file, MAX_IMPORT_FILE_SIZE)?;
    serde_json::from_str(&text)
        .map_err(|e| CacheError::DeserializationError(format!("Invalid dataset: {}", e)))
}

/// Build load options from an optional TOML file and command-line overrides.
pub fn resolve_load_options(
    config: Option<&Path>,
    overrides: &FilterOverrides,
) -> Result<LoadOptions, CacheError> {
    let configured = match config {
        Some(path) => parse_config(&read_text_file(path, MAX_CONFIG_FILE_SIZE)?)?,
        None => LoadOptions::default(),
    };
    Ok(overrides.apply(configured))
}

/// Open an existing database and load a cache from it.
pub fn load_cache(
    db_path: &Path,
    options: &LoadOptions,
) -> Result<(DatabaseCache, LoadSummary), CacheError> {
    if !db_path.exists() {
        return Err(CacheError::IoError(format!(
            "Database {:?} not found. Run `scenecache init` first.",
            db_path
        )));
    }

    let database = RedbDatabase::open(db_path)?;
    let mut cache = DatabaseCache::new();
    let summary = cache.load(&database, options)?;
    Ok((cache, summary))
}
