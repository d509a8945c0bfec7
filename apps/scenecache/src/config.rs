//! # Filter Configuration
//!
//! TOML filter files deserialize straight into [`LoadOptions`]:
//!
//! ```toml
//! min_num_matches = 15
//! ignore_watermarks = true
//! image_names = ["a.jpg", "b.jpg"]
//! ```
//!
//! Missing keys take the defaults. Command-line filters are layered on top
//! with [`FilterOverrides::apply`].

use scenecache_core::{CacheError, LoadOptions};

/// Parse a TOML filter file.
pub fn parse_config(text: &str) -> Result<LoadOptions, CacheError> {
    toml::from_str(text)
        .map_err(|e| CacheError::DeserializationError(format!("Invalid filter config: {}", e)))
}

/// Filter values given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOverrides {
    pub min_num_matches: Option<u32>,
    /// Only a `true` flag overrides; absence keeps the configured value.
    pub ignore_watermarks: bool,
    /// Replaces the configured name list when non-empty.
    pub image_names: Vec<String>,
}

impl FilterOverrides {
    /// Layer the overrides on top of configured options.
    #[must_use]
    pub fn apply(&self, mut options: LoadOptions) -> LoadOptions {
        if let Some(min) = self.min_num_matches {
            options.min_num_matches = min;
        }
        if self.ignore_watermarks {
            options.ignore_watermarks = true;
        }
        if !self.image_names.is_empty() {
            options = options.with_image_names(self.image_names.iter().cloned());
        }
        options
    }
}
