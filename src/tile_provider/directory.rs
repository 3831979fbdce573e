use crate::GraphId;
use crate::graph_tile::{GraphTile, LookupError};
use crate::tile_hierarchy::TileHierarchy;
use crate::tile_provider::GraphTileProviderError;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// A graph tile provider backed by a directory tree of tiles.
///
/// # Resource consumption
///
/// To minimize file handle churn and re-validation of tile bytes, this
/// includes an internal LRU cache, configurable with a max number of cached
/// tiles. Cached tiles remain in memory until evicted.
pub struct DirectoryTileProvider {
    hierarchy: TileHierarchy,
    lru_cache: Mutex<LruCache<GraphId, Arc<GraphTile>>>,
}

impl DirectoryTileProvider {
    pub fn new(hierarchy: TileHierarchy, num_cached_tiles: NonZeroUsize) -> Self {
        DirectoryTileProvider {
            hierarchy,
            lru_cache: Mutex::new(LruCache::new(num_cached_tiles)),
        }
    }

    /// The hierarchy this provider reads tiles through.
    pub fn hierarchy(&self) -> &TileHierarchy {
        &self.hierarchy
    }

    /// Gets the tile containing the given graph ID.
    ///
    /// # Errors
    ///
    /// Fails with [`GraphTileProviderError::TileDoesNotExist`] when the tile
    /// is not on disk (callers probing tiles should expect and tolerate
    /// this), or passes through I/O and decoding errors.
    pub fn get_tile_containing(
        &self,
        graph_id: GraphId,
    ) -> Result<Arc<GraphTile>, GraphTileProviderError> {
        let base_graph_id = graph_id.tile_base_id();
        let mut cache = self
            .lru_cache
            .lock()
            .map_err(|e| GraphTileProviderError::PoisonedCacheLock(e.to_string()))?;
        let tile = cache
            .try_get_or_insert(base_graph_id, || {
                match GraphTile::open(&self.hierarchy, base_graph_id)? {
                    Some(tile) => Ok::<_, GraphTileProviderError>(Arc::new(tile)),
                    None => Err(GraphTileProviderError::TileDoesNotExist),
                }
            })
            .cloned()?;

        Ok(tile)
    }

    /// Gets the graph ID of the edge opposing `graph_id`.
    ///
    /// # Performance
    ///
    /// This always does at least one tile lookup (potentially cached), and a
    /// second when the edge leaves its tile.
    ///
    /// # Errors
    ///
    /// Fails if either tile can't be fetched or an index is invalid.
    pub fn get_opposing_edge_id(
        &self,
        graph_id: GraphId,
    ) -> Result<GraphId, GraphTileProviderError> {
        let tile = self.get_tile_containing(graph_id)?;
        let edge = tile.view().get_directed_edge(graph_id)?;

        let end_node_id = edge.end_node_id();
        let opposing_index = u64::from(edge.opposing_local_edge_index());

        // The end node may be in another tile.
        let node_edge_index = match tile.view().get_node(end_node_id) {
            Ok(node) => node.edge_index(),
            Err(LookupError::MismatchedBase(_)) => {
                let end_tile = self.get_tile_containing(end_node_id)?;
                end_tile.view().get_node(end_node_id)?.edge_index()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(GraphId::try_from_components(
            end_node_id.level(),
            end_node_id.tile_id(),
            u64::from(node_edge_index) + opposing_index,
        )?)
    }
}
