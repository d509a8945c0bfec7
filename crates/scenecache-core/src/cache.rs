//! # Database Cache
//!
//! In-memory snapshot of a filtered subset of a reconstruction database:
//! an entity store for cameras and images plus the correspondence index
//! between the cached images.
//!
//! ## Lifecycle
//!
//! A cache is created empty, then populated either by one call to
//! [`DatabaseCache::load`] or by manual [`DatabaseCache::add_camera`] /
//! [`DatabaseCache::add_image`] calls. After that it is read-only; the type
//! holds plain owned collections, so a populated cache can be shared across
//! threads behind a shared reference.
//!
//! ## Views
//!
//! [`DatabaseCache::cameras`] and [`DatabaseCache::images`] return shared
//! borrows of the underlying maps. Nothing can be inserted, removed or edited
//! through them; in-place edits go through `camera_mut` / `image_mut`.

use crate::correspondence::CorrespondenceGraph;
use crate::{CacheError, Camera, CameraId, Image, ImageId};
use std::collections::HashMap;

/// Cached cameras, images and correspondences.
#[derive(Debug, Clone, Default)]
pub struct DatabaseCache {
    pub(crate) cameras: HashMap<CameraId, Camera>,
    pub(crate) images: HashMap<ImageId, Image>,
    pub(crate) correspondence_graph: CorrespondenceGraph,
    /// Set once `load` starts; a cache is loaded at most once.
    pub(crate) loaded: bool,
}

impl DatabaseCache {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // SIZES
    // =========================================================================

    /// Number of cached cameras.
    #[must_use]
    pub fn num_cameras(&self) -> usize {
        self.cameras.len()
    }

    /// Number of cached images.
    #[must_use]
    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    /// Check whether `load` has been invoked on this cache.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    // =========================================================================
    // KEYED ACCESS
    // =========================================================================

    /// Get a camera by id.
    pub fn camera(&self, id: CameraId) -> Result<&Camera, CacheError> {
        self.cameras.get(&id).ok_or(CacheError::CameraNotFound(id))
    }

    /// Get a mutable camera by id.
    pub fn camera_mut(&mut self, id: CameraId) -> Result<&mut Camera, CacheError> {
        self.cameras
            .get_mut(&id)
            .ok_or(CacheError::CameraNotFound(id))
    }

    /// Get an image by id.
    pub fn image(&self, id: ImageId) -> Result<&Image, CacheError> {
        self.images.get(&id).ok_or(CacheError::ImageNotFound(id))
    }

    /// Get a mutable image by id.
    ///
    /// The identifier fields must not be edited; they key the store.
    pub fn image_mut(&mut self, id: ImageId) -> Result<&mut Image, CacheError> {
        self.images.get_mut(&id).ok_or(CacheError::ImageNotFound(id))
    }

    /// Check if a camera is cached.
    #[must_use]
    pub fn exists_camera(&self, id: CameraId) -> bool {
        self.cameras.contains_key(&id)
    }

    /// Check if an image is cached.
    #[must_use]
    pub fn exists_image(&self, id: ImageId) -> bool {
        self.images.contains_key(&id)
    }

    // =========================================================================
    // BULK VIEWS
    // =========================================================================

    /// All cached cameras. No iteration-order guarantee.
    #[must_use]
    pub fn cameras(&self) -> &HashMap<CameraId, Camera> {
        &self.cameras
    }

    /// All cached images. No iteration-order guarantee.
    #[must_use]
    pub fn images(&self) -> &HashMap<ImageId, Image> {
        &self.images
    }

    /// The correspondence index between cached images.
    #[must_use]
    pub fn correspondence_graph(&self) -> &CorrespondenceGraph {
        &self.correspondence_graph
    }

    // =========================================================================
    // MANUAL INSERTION
    // =========================================================================

    /// Add a camera.
    ///
    /// Returns `CacheError::DuplicateCamera` if the id is already cached; the
    /// stored camera is left untouched.
    pub fn add_camera(&mut self, camera: Camera) -> Result<(), CacheError> {
        if self.cameras.contains_key(&camera.id) {
            return Err(CacheError::DuplicateCamera(camera.id));
        }
        self.cameras.insert(camera.id, camera);
        Ok(())
    }

    /// Add an image.
    ///
    /// The image is not registered in the correspondence index, and its
    /// camera is not checked; callers building a cache by hand own
    /// referential integrity (see [`DatabaseCache::check_integrity`]).
    pub fn add_image(&mut self, image: Image) -> Result<(), CacheError> {
        if self.images.contains_key(&image.id) {
            return Err(CacheError::DuplicateImage(image.id));
        }
        self.images.insert(image.id, image);
        Ok(())
    }

    // =========================================================================
    // INTEGRITY
    // =========================================================================

    /// Verify the cross-store invariants.
    ///
    /// - every image's camera is cached (`MissingCamera`)
    /// - every correspondence joins two cached images (`DanglingCorrespondence`)
    pub fn check_integrity(&self) -> Result<(), CacheError> {
        for image in self.images.values() {
            if !self.cameras.contains_key(&image.camera_id) {
                return Err(CacheError::MissingCamera {
                    image: image.id,
                    camera: image.camera_id,
                });
            }
        }

        for (pair, _) in self.correspondence_graph.image_pairs() {
            let known = |id: ImageId| self.images.contains_key(&id);
            if !known(pair.first()) || !known(pair.second()) {
                return Err(CacheError::DanglingCorrespondence(pair));
            }
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
