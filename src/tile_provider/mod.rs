//! # Graph tile providers
//!
//! Providers sit between a tile consumer (a router) and the tile store,
//! owning whatever caching and synchronization the access pattern needs.
//! The accessor itself is immutable after construction, so the provider's
//! cache is the only synchronized state.

use crate::graph_id::InvalidGraphIdError;
use crate::graph_tile::{GraphTileError, LookupError};
use thiserror::Error;

mod directory;

pub use directory::DirectoryTileProvider;

#[derive(Debug, Error)]
pub enum GraphTileProviderError {
    #[error("this tile does not exist (ex: in your extract)")]
    TileDoesNotExist,
    #[error(transparent)]
    GraphTile(#[from] GraphTileError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    InvalidGraphId(#[from] InvalidGraphIdError),
    #[error("cache lock is poisoned: {0}")]
    PoisonedCacheLock(String),
}
