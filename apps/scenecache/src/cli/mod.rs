//! # scenecache CLI Module
//!
//! This module implements the CLI interface for scenecache.
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new redb database
//! - `import` - Import a JSON dataset into the database
//! - `stats` - Load a cache and print its statistics (default)
//! - `pair` - Correspondence count between two images
//! - `neighbors` - Images sharing correspondences with an image

mod commands;

use crate::config::FilterOverrides;
use clap::{Args, Parser, Subcommand};
use scenecache_core::CacheError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// scenecache - filtered reconstruction database cache
///
/// Loads cameras, images and pairwise matches from a reconstruction
/// database, keeping only what passes the filters, and answers queries
/// against the resulting cache.
#[derive(Parser, Debug)]
#[command(name = "scenecache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the redb database
    #[arg(short = 'D', long, global = true, default_value = "scenecache.redb")]
    pub database: PathBuf,

    /// TOML file with load filters
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Load filters accepted by every query command.
///
/// Values given here override the ones from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Drop image pairs with fewer matches
    #[arg(long)]
    pub min_num_matches: Option<u32>,

    /// Drop image pairs flagged as watermark pairs
    #[arg(long)]
    pub ignore_watermarks: bool,

    /// Keep only the named image (repeatable)
    #[arg(long = "image-name", value_name = "NAME")]
    pub images: Vec<String>,
}

impl From<FilterArgs> for FilterOverrides {
    fn from(args: FilterArgs) -> Self {
        Self {
            min_num_matches: args.min_num_matches,
            ignore_watermarks: args.ignore_watermarks,
            image_names: args.images,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Import a JSON dataset of cameras, images and matches
    Import {
        /// Path to the dataset file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Load a cache and print its statistics
    Stats {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Print the number of correspondences between two images
    Pair {
        /// First image ID
        #[arg(long)]
        first: u32,

        /// Second image ID
        #[arg(long)]
        second: u32,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// List the images sharing correspondences with an image
    Neighbors {
        /// Image ID
        #[arg(long)]
        image: u32,

        #[command(flatten)]
        filters: FilterArgs,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), CacheError> {
    let json_mode = cli.json_mode;
    let db_path = cli.database.as_path();
    let config = cli.config.as_deref();

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(db_path, force),
        Some(Commands::Import { file }) => cmd_import(db_path, json_mode, &file),
        Some(Commands::Stats { filters }) => {
            let options = resolve_load_options(config, &filters.into())?;
            cmd_stats(db_path, json_mode, cli.verbose, &options)
        }
        Some(Commands::Pair {
            first,
            second,
            filters,
        }) => {
            let options = resolve_load_options(config, &filters.into())?;
            cmd_pair(db_path, json_mode, &options, first, second)
        }
        Some(Commands::Neighbors { image, filters }) => {
            let options = resolve_load_options(config, &filters.into())?;
            cmd_neighbors(db_path, json_mode, &options, image)
        }
        None => {
            // No subcommand - show stats by default
            let options = resolve_load_options(config, &FilterOverrides::default())?;
            cmd_stats(db_path, json_mode, cli.verbose, &options)
        }
    }
}
