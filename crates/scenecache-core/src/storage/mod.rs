//! # Storage Module
//!
//! Disk-backed implementation of the `Database` trait.

mod redb_database;

pub use redb_database::RedbDatabase;
