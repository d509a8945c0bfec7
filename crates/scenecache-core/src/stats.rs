//! # Cache Statistics
//!
//! Summary figures for a populated cache: entity counts, per-image
//! observation counts and the distribution of correspondence counts over
//! every unordered pair of cached images.
//!
//! Means are stored as fixed-point integers (value * `MEAN_SCALE`) so no
//! float arithmetic is involved.

use crate::primitives::MEAN_SCALE;
use crate::{DatabaseCache, ImageId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum, maximum and mean of a list of counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub min: u64,
    pub max: u64,
    /// Mean * 1_000_000, rounded down.
    pub mean_millionths: u64,
    /// Number of values summarized.
    pub count: u64,
}

impl Summary {
    /// Summarize a list of values. `None` when the list is empty.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut min = u64::MAX;
        let mut max: u64 = 0;
        let mut total: u128 = 0;
        let mut count: u64 = 0;

        for value in values {
            min = min.min(value);
            max = max.max(value);
            total = total.saturating_add(u128::from(value));
            count = count.saturating_add(1);
        }

        if count == 0 {
            return None;
        }

        let mean = total.saturating_mul(u128::from(MEAN_SCALE)) / u128::from(count);
        Some(Self {
            min,
            max,
            mean_millionths: u64::try_from(mean).unwrap_or(u64::MAX),
            count,
        })
    }

    /// Integer part of the mean.
    #[must_use]
    pub fn mean_whole(&self) -> u64 {
        self.mean_millionths / MEAN_SCALE
    }

    /// Fractional part of the mean, in millionths.
    #[must_use]
    pub fn mean_fraction(&self) -> u64 {
        self.mean_millionths % MEAN_SCALE
    }
}

/// Statistics of a `DatabaseCache`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub num_cameras: usize,
    pub num_images: usize,
    /// Pairs with at least one correspondence.
    pub num_image_pairs: usize,
    /// Per-image observation counts. `None` without images.
    pub observations: Option<Summary>,
    /// Correspondence counts over all unordered image pairs, zeros included.
    /// `None` with fewer than two images.
    pub pairwise_correspondences: Option<Summary>,
}

impl CacheStatistics {
    /// Compute statistics from a cache.
    #[must_use]
    pub fn from_cache(cache: &DatabaseCache) -> Self {
        let mut image_ids: Vec<ImageId> = cache.images().keys().copied().collect();
        image_ids.sort_unstable();

        let observations = Summary::from_values(
            cache
                .images()
                .values()
                .map(|image| u64::from(image.num_observations)),
        );

        let graph = cache.correspondence_graph();
        let pairwise = image_ids.iter().enumerate().flat_map(|(i, &a)| {
            image_ids[i + 1..]
                .iter()
                .map(move |&b| u64::from(graph.num_correspondences_between_images(a, b)))
        });

        Self {
            num_cameras: cache.num_cameras(),
            num_images: cache.num_images(),
            num_image_pairs: graph.num_image_pairs(),
            observations,
            pairwise_correspondences: Summary::from_values(pairwise),
        }
    }
}

fn write_summary(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    summary: Option<&Summary>,
) -> fmt::Result {
    match summary {
        Some(s) => {
            writeln!(
                f,
                "Avg. {label}: {}.{:06}",
                s.mean_whole(),
                s.mean_fraction()
            )?;
            writeln!(f, "Min. {label}: {}", s.min)?;
            writeln!(f, "Max. {label}: {}", s.max)
        }
        None => writeln!(f, "{label}: n/a"),
    }
}

impl fmt::Display for CacheStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cameras: {}", self.num_cameras)?;
        writeln!(f, "Images: {}", self.num_images)?;
        writeln!(f, "Image pairs: {}", self.num_image_pairs)?;
        write_summary(f, "Per-view Observations", self.observations.as_ref())?;
        write_summary(
            f,
            "Pair-wise Correspondences",
            self.pairwise_correspondences.as_ref(),
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
