//! # Core Type Definitions
//!
//! This module contains all record and identifier types shared by the cache,
//! the correspondence index and the database backends:
//! - Entity identifiers (`CameraId`, `ImageId`) and image pairs (`ImagePair`)
//! - Entity records (`Camera`, `Image`)
//! - Pairwise match records (`MatchRecord`, `TwoViewConfig`)
//! - Error types (`CacheError`)
//!
//! ## Identity Guarantees
//!
//! - Identifiers are plain `Copy` newtypes, immutable once assigned
//! - `ImagePair` is normalized on construction so `(a, b)` and `(b, a)` are equal
//! - A pair of an image with itself is never a valid `ImagePair`

use crate::primitives::PAIR_ID_SHIFT;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// ENTITY IDENTIFIERS
// =============================================================================

/// Unique identifier of a camera (intrinsics shared by one or more images).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CameraId(pub u32);

/// Unique identifier of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageId(pub u32);

impl std::fmt::Display for CameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "camera#{}", self.0)
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "image#{}", self.0)
    }
}

// =============================================================================
// IMAGE PAIR
// =============================================================================

/// An unordered pair of distinct images.
///
/// The smaller identifier is always stored in `first`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "(ImageId, ImageId)", into = "(ImageId, ImageId)")]
pub struct ImagePair {
    first: ImageId,
    second: ImageId,
}

impl ImagePair {
    /// Create a normalized pair.
    ///
    /// Returns `CacheError::InvalidImagePair` if both ids are the same image.
    pub fn new(a: ImageId, b: ImageId) -> Result<Self, CacheError> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Ok(Self {
                first: a,
                second: b,
            }),
            std::cmp::Ordering::Greater => Ok(Self {
                first: b,
                second: a,
            }),
            std::cmp::Ordering::Equal => Err(CacheError::InvalidImagePair(a)),
        }
    }

    /// The image with the smaller identifier.
    #[must_use]
    pub const fn first(&self) -> ImageId {
        self.first
    }

    /// The image with the larger identifier.
    #[must_use]
    pub const fn second(&self) -> ImageId {
        self.second
    }

    /// Check whether the pair touches the given image.
    #[must_use]
    pub fn contains(&self, image: ImageId) -> bool {
        self.first == image || self.second == image
    }

    /// Encode the pair as a single integer key.
    ///
    /// `pair_id = (first << 32) | second`, so keys sort by the first image.
    #[must_use]
    pub fn pair_id(&self) -> u64 {
        (u64::from(self.first.0) << PAIR_ID_SHIFT) | u64::from(self.second.0)
    }

    /// Decode a pair from its integer key.
    pub fn from_pair_id(pair_id: u64) -> Result<Self, CacheError> {
        let first = (pair_id >> PAIR_ID_SHIFT) as u32;
        let second = (pair_id & u64::from(u32::MAX)) as u32;
        Self::new(ImageId(first), ImageId(second))
    }
}

impl TryFrom<(ImageId, ImageId)> for ImagePair {
    type Error = CacheError;

    fn try_from((a, b): (ImageId, ImageId)) -> Result<Self, Self::Error> {
        Self::new(a, b)
    }
}

impl From<ImagePair> for (ImageId, ImageId) {
    fn from(pair: ImagePair) -> Self {
        (pair.first, pair.second)
    }
}

impl std::fmt::Display for ImagePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.first.0, self.second.0)
    }
}

// =============================================================================
// ENTITY RECORDS
// =============================================================================

/// A camera record.
///
/// Model name and parameters are carried through untouched; the cache never
/// interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub id: CameraId,
    /// Camera model name, e.g. `SIMPLE_RADIAL`.
    pub model: String,
    pub width: u64,
    pub height: u64,
    /// Model-specific intrinsic and distortion parameters.
    #[serde(default)]
    pub params: Vec<f64>,
}

impl Camera {
    /// Create a camera without parameters.
    #[must_use]
    pub fn new(id: CameraId, model: impl Into<String>, width: u64, height: u64) -> Self {
        Self {
            id,
            model: model.into(),
            width,
            height,
            params: Vec::new(),
        }
    }

    /// Attach model parameters.
    #[must_use]
    pub fn with_params(mut self, params: Vec<f64>) -> Self {
        self.params = params;
        self
    }
}

/// An image record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    /// Display name, unique per database in practice (usually a relative path).
    pub name: String,
    pub camera_id: CameraId,
    /// Number of 2D observations (keypoints) in the image.
    pub num_observations: u32,
    /// Sum of surviving correspondence counts over all pairs of this image.
    /// Filled in by the loader; zero for manually added images.
    #[serde(default)]
    pub num_correspondences: u64,
}

impl Image {
    /// Create an image record.
    #[must_use]
    pub fn new(
        id: ImageId,
        name: impl Into<String>,
        camera_id: CameraId,
        num_observations: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            camera_id,
            num_observations,
            num_correspondences: 0,
        }
    }
}

// =============================================================================
// MATCH RECORDS
// =============================================================================

/// Configuration of the two-view geometry estimated for an image pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoViewConfig {
    #[default]
    Undefined,
    /// Too few inliers to estimate any model.
    Degenerate,
    /// Essential matrix.
    Calibrated,
    /// Fundamental matrix.
    Uncalibrated,
    /// Homography, planar scene with baseline.
    Planar,
    /// Homography, pure rotation without baseline.
    Panoramic,
    /// Homography, planar or panoramic.
    PlanarOrPanoramic,
    /// Matches explained by an overlay shared across images, not by the scene.
    Watermark,
    /// Multiple models found.
    Multiple,
}

impl TwoViewConfig {
    /// Check whether the pair is flagged as a watermark pair.
    #[must_use]
    pub const fn is_watermark(self) -> bool {
        matches!(self, Self::Watermark)
    }
}

/// A pairwise match row: how many correspondences two images share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub pair: ImagePair,
    pub num_matches: u32,
    #[serde(default)]
    pub config: TwoViewConfig,
}

impl MatchRecord {
    /// Create a match record.
    #[must_use]
    pub const fn new(pair: ImagePair, num_matches: u32, config: TwoViewConfig) -> Self {
        Self {
            pair,
            num_matches,
            config,
        }
    }

    /// Check whether the record is flagged as a watermark pair.
    #[must_use]
    pub const fn is_watermark(&self) -> bool {
        self.config.is_watermark()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while building or querying a cache.
///
/// Precondition violations (duplicates, unknown ids, reloading) signal a
/// programming error in the caller: a cache that returned one of them must
/// be discarded. Database errors are external and propagate unchanged.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A camera with this identifier is already stored.
    #[error("Duplicate camera: {0}")]
    DuplicateCamera(CameraId),

    /// An image with this identifier is already stored.
    #[error("Duplicate image: {0}")]
    DuplicateImage(ImageId),

    /// The requested camera is not in the cache.
    #[error("Camera not found: {0}")]
    CameraNotFound(CameraId),

    /// The requested image is not in the cache.
    #[error("Image not found: {0}")]
    ImageNotFound(ImageId),

    /// `load` was called on a cache that was already loaded or populated.
    #[error("Cache is already populated; create a new cache to load again")]
    AlreadyLoaded,

    /// An image pair whose two endpoints are the same image.
    #[error("Invalid image pair: {0} paired with itself")]
    InvalidImagePair(ImageId),

    /// A retained image references a camera the database does not contain.
    #[error("Image {image} references missing {camera}")]
    MissingCamera { image: ImageId, camera: CameraId },

    /// A correspondence endpoint is not in the entity store.
    #[error("Correspondence {0} references an image outside the cache")]
    DanglingCorrespondence(ImagePair),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
