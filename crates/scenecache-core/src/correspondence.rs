//! # Correspondence Index
//!
//! Weighted undirected graph over image identifiers. The weight of an edge is
//! the number of feature correspondences that survived filtering between the
//! two images.
//!
//! Pair counts are kept in a hash map keyed by the encoded pair id, giving
//! O(1) pairwise queries. Adjacency sets are ordered so neighbor enumeration
//! is reproducible.

use crate::{CacheError, ImageId, ImagePair};
use std::collections::{BTreeSet, HashMap};

/// The correspondence graph owned by a `DatabaseCache`.
#[derive(Debug, Clone, Default)]
pub struct CorrespondenceGraph {
    /// Registered images: ImageId -> neighbors with at least one correspondence
    adjacency: HashMap<ImageId, BTreeSet<ImageId>>,

    /// Pair counts: pair id -> number of correspondences
    pairs: HashMap<u64, u32>,
}

impl CorrespondenceGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image as a vertex. Registering twice is a no-op.
    pub fn add_image(&mut self, image: ImageId) {
        self.adjacency.entry(image).or_default();
    }

    /// Check if an image is registered.
    #[must_use]
    pub fn exists_image(&self, image: ImageId) -> bool {
        self.adjacency.contains_key(&image)
    }

    /// Number of registered images.
    #[must_use]
    pub fn num_images(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of image pairs with at least one correspondence.
    #[must_use]
    pub fn num_image_pairs(&self) -> usize {
        self.pairs.len()
    }

    /// Add correspondences between two registered images.
    ///
    /// Counts for a pair already present are accumulated (saturating).
    /// A zero count leaves the graph unchanged.
    pub fn add_correspondences(&mut self, pair: ImagePair, count: u32) -> Result<(), CacheError> {
        for image in [pair.first(), pair.second()] {
            if !self.adjacency.contains_key(&image) {
                return Err(CacheError::ImageNotFound(image));
            }
        }
        if count == 0 {
            return Ok(());
        }

        let total = self.pairs.entry(pair.pair_id()).or_insert(0);
        *total = total.saturating_add(count);

        self.adjacency
            .entry(pair.first())
            .or_default()
            .insert(pair.second());
        self.adjacency
            .entry(pair.second())
            .or_default()
            .insert(pair.first());
        Ok(())
    }

    /// Number of correspondences between two images.
    ///
    /// Symmetric; 0 for unknown images, unconnected pairs, or `a == b`.
    #[must_use]
    pub fn num_correspondences_between_images(&self, a: ImageId, b: ImageId) -> u32 {
        ImagePair::new(a, b)
            .ok()
            .and_then(|pair| self.pairs.get(&pair.pair_id()).copied())
            .unwrap_or(0)
    }

    /// Get all neighbors of an image in ascending id order.
    pub fn neighbors(&self, image: ImageId) -> impl Iterator<Item = ImageId> + '_ {
        self.adjacency
            .get(&image)
            .into_iter()
            .flat_map(|targets| targets.iter().copied())
    }

    /// Check whether the image shares correspondences with any other image.
    #[must_use]
    pub fn has_correspondences(&self, image: ImageId) -> bool {
        self.adjacency
            .get(&image)
            .is_some_and(|targets| !targets.is_empty())
    }

    /// Total correspondences over all pairs touching the image.
    #[must_use]
    pub fn num_correspondences_for_image(&self, image: ImageId) -> u64 {
        self.neighbors(image)
            .map(|other| u64::from(self.num_correspondences_between_images(image, other)))
            .sum()
    }

    /// Get all connected pairs with their counts. No ordering guarantee.
    pub fn image_pairs(&self) -> impl Iterator<Item = (ImagePair, u32)> + '_ {
        self.pairs.iter().filter_map(|(&pair_id, &count)| {
            ImagePair::from_pair_id(pair_id)
                .ok()
                .map(|pair| (pair, count))
        })
    }

    /// Get all registered images. No ordering guarantee.
    pub fn images(&self) -> impl Iterator<Item = ImageId> + '_ {
        self.adjacency.keys().copied()
    }
}

// =============================================================================
// TESTS
// =============================================================================
