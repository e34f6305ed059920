//! Common utilities for Seedling crates.
//!
//! This crate provides shared infrastructure used across the Seedling workspace:
//!
//! - [`debug`] - Per-module logging controlled via `DEBUG` environment variable
//! - [`source`] - Source locations and byte offset to line/column mapping

pub mod debug;
pub mod source;

pub use debug::{create_logger, Logger};
pub use source::{LineMap, SourceLoc};
