//! # Tile-level connectivity analysis
//!
//! The connectivity map inventories which tiles exist on disk per hierarchy
//! level and flood-fills them into 4-connected components. A router uses it
//! to tell up front whether two locations can possibly reach each other
//! (different colors mean no path exists in the extract), and it can render
//! the result as GeoJSON or a raster for inspection.

use crate::GraphId;
use crate::tile_hierarchy::{HierarchyError, TileHierarchy};
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Error)]
enum ScanError {
    #[error("level directory is missing")]
    MissingDirectory,
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Path(#[from] HierarchyError),
}

/// Connected-component colors for every tile present on disk, per level.
///
/// Two tiles share a color iff a 4-neighbor path of present tiles connects
/// them. Color 0 means "not present". The map is built once from the disk
/// inventory and immutable thereafter.
pub struct ConnectivityMap<'a> {
    hierarchy: &'a TileHierarchy,
    colors: HashMap<u8, HashMap<u32, u32>>,
}

impl<'a> ConnectivityMap<'a> {
    /// Builds the connectivity map by scanning the hierarchy's tile
    /// directory.
    ///
    /// Levels whose directory is missing or whose scan fails are simply
    /// absent from the map; [`ConnectivityMap::to_geojson`] and
    /// [`ConnectivityMap::to_image`] fail for them, and
    /// [`ConnectivityMap::color_of`] reports their tiles as not present.
    pub fn new(hierarchy: &'a TileHierarchy) -> Self {
        let transit_level = hierarchy.transit_level().level;
        let mut colors = HashMap::new();

        for level in 0..=transit_level {
            // The transit pseudo-level colors over the finest road tiling.
            let Some(tiling) = hierarchy.tiling_for_level(level) else {
                continue;
            };
            match scan_level(hierarchy, level) {
                Ok(mut level_colors) => {
                    tiling.color_map(&mut level_colors);
                    colors.insert(level, level_colors);
                }
                Err(e) => {
                    debug!("no connectivity for level {level}: {e}");
                }
            }
        }

        Self { hierarchy, colors }
    }

    /// The component color of the tile addressed by `id`, or 0 if the tile
    /// is not present on disk (or its level was not scanned).
    #[allow(clippy::cast_possible_truncation)]
    pub fn color_of(&self, id: GraphId) -> u32 {
        self.colors
            .get(&id.level())
            .and_then(|level| level.get(&(id.tile_id() as u32)))
            .copied()
            .unwrap_or(0)
    }

    /// Renders one level's components as a GeoJSON `FeatureCollection`.
    ///
    /// Each component becomes a `MultiPoint` feature of its tile centers
    /// with a `color` property. Features are ordered largest component
    /// first; ties break toward the smaller color.
    ///
    /// # Errors
    ///
    /// Fails with [`HierarchyError::InvalidLevel`] if the level is absent.
    pub fn to_geojson(&self, level: u8) -> Result<String, HierarchyError> {
        let level_colors = self
            .colors
            .get(&level)
            .ok_or(HierarchyError::InvalidLevel(level))?;
        let tiling = self
            .hierarchy
            .tiling_for_level(level)
            .ok_or(HierarchyError::InvalidLevel(level))?;

        // Invert the coloring into per-component tile center lists,
        // in ascending tile-id order so output is deterministic.
        let mut tile_ids: Vec<u32> = level_colors.keys().copied().collect();
        tile_ids.sort_unstable();
        let mut regions: HashMap<u32, Vec<serde_json::Value>> = HashMap::new();
        for tile_id in tile_ids {
            let center = tiling.center(tile_id);
            regions
                .entry(level_colors[&tile_id])
                .or_default()
                .push(json!([round6(center.x), round6(center.y)]));
        }

        // Biggest components first; ties toward the smaller color.
        let mut arities: Vec<(usize, u32)> =
            regions.iter().map(|(color, tiles)| (tiles.len(), *color)).collect();
        arities.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let features: Vec<serde_json::Value> = arities
            .into_iter()
            .map(|(_, color)| {
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "MultiPoint",
                        "coordinates": regions[&color],
                    },
                    "properties": { "color": color },
                })
            })
            .collect();

        Ok(json!({
            "type": "FeatureCollection",
            "features": features,
        })
        .to_string())
    }

    /// Renders one level as a dense row-major raster of component colors.
    ///
    /// The result has `n_columns * n_rows` entries indexed
    /// `row * n_columns + column`; absent tiles are 0.
    ///
    /// # Errors
    ///
    /// Fails with [`HierarchyError::InvalidLevel`] if the level is absent.
    pub fn to_image(&self, level: u8) -> Result<Vec<u32>, HierarchyError> {
        let level_colors = self
            .colors
            .get(&level)
            .ok_or(HierarchyError::InvalidLevel(level))?;
        let tiling = self
            .hierarchy
            .tiling_for_level(level)
            .ok_or(HierarchyError::InvalidLevel(level))?;

        let mut image = vec![0u32; tiling.tile_count() as usize];
        for (tile_id, color) in level_colors {
            image[*tile_id as usize] = *color;
        }
        Ok(image)
    }
}

/// Collects `{tile_id -> 0}` for every tile file under `root/<level>/`.
fn scan_level(hierarchy: &TileHierarchy, level: u8) -> Result<HashMap<u32, u32>, ScanError> {
    let root = hierarchy.tile_dir().join(level.to_string());
    if !root.is_dir() {
        return Err(ScanError::MissingDirectory);
    }

    let mut tiles = HashMap::new();
    for entry in WalkDir::new(&root) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        let id = hierarchy.tile_id_from_path(entry.path())?;
        #[allow(clippy::cast_possible_truncation)]
        tiles.insert(id.tile_id() as u32, 0);
    }
    Ok(tiles)
}

/// Rounds a coordinate to the 6 decimal places the GeoJSON output carries.
fn round6(value: f32) -> f64 {
    (f64::from(value) * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Creates an (empty) tile file for the id; the scan only reads paths.
    fn touch_tile(hierarchy: &TileHierarchy, level: u8, tile_id: u64) {
        let id = GraphId::try_from_components(level, tile_id, 0).expect("valid graph ID");
        let path = hierarchy
            .tile_dir()
            .join(hierarchy.file_suffix(id).expect("valid level"));
        std::fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
        std::fs::write(&path, b"").expect("touch tile");
    }

    fn graph_id(level: u8, tile_id: u64) -> GraphId {
        GraphId::try_from_components(level, tile_id, 0).expect("valid graph ID")
    }

    #[test]
    fn test_components_and_colors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let hierarchy = TileHierarchy::from_root_dir(dir.path().to_path_buf());

        // Level 0 tiling is 90 columns wide. Tiles 1000/1001 are east-west
        // neighbors, 1091 sits on top of 1001, and 2500 is isolated.
        for tile_id in [1000, 1001, 1091, 2500] {
            touch_tile(&hierarchy, 0, tile_id);
        }

        let connectivity = ConnectivityMap::new(&hierarchy);
        let connected = connectivity.color_of(graph_id(0, 1000));
        assert!(connected > 0);
        assert_eq!(connectivity.color_of(graph_id(0, 1001)), connected);
        assert_eq!(connectivity.color_of(graph_id(0, 1091)), connected);

        let isolated = connectivity.color_of(graph_id(0, 2500));
        assert!(isolated > 0);
        assert_ne!(isolated, connected);

        // Absent tiles and unscanned levels are color 0.
        assert_eq!(connectivity.color_of(graph_id(0, 7)), 0);
        assert_eq!(connectivity.color_of(graph_id(1, 1000)), 0);
    }

    #[test]
    fn test_missing_level_is_absent() {
        let dir = tempfile::tempdir().expect("temp dir");
        let hierarchy = TileHierarchy::from_root_dir(dir.path().to_path_buf());
        touch_tile(&hierarchy, 0, 1000);

        let connectivity = ConnectivityMap::new(&hierarchy);
        assert!(connectivity.to_geojson(0).is_ok());
        assert_eq!(
            connectivity.to_geojson(1),
            Err(HierarchyError::InvalidLevel(1))
        );
        assert_eq!(
            connectivity.to_image(2),
            Err(HierarchyError::InvalidLevel(2))
        );
        assert_eq!(
            connectivity.to_geojson(9),
            Err(HierarchyError::InvalidLevel(9))
        );
    }

    #[test]
    fn test_geojson_shape_and_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let hierarchy = TileHierarchy::from_root_dir(dir.path().to_path_buf());

        // A two-tile component and an isolated tile: the larger component
        // must come first regardless of color order.
        for tile_id in [2500, 3000, 3001] {
            touch_tile(&hierarchy, 0, tile_id);
        }

        let connectivity = ConnectivityMap::new(&hierarchy);
        let geojson = connectivity.to_geojson(0).expect("level present");
        let parsed: serde_json::Value = serde_json::from_str(&geojson).expect("valid JSON");

        assert_eq!(parsed["type"], "FeatureCollection");
        let features = parsed["features"].as_array().expect("features array");
        assert_eq!(features.len(), 2);

        let first = &features[0];
        assert_eq!(first["type"], "Feature");
        assert_eq!(first["geometry"]["type"], "MultiPoint");
        assert_eq!(
            first["geometry"]["coordinates"].as_array().unwrap().len(),
            2
        );
        assert!(first["properties"]["color"].as_u64().unwrap() > 0);

        let second = &features[1];
        assert_eq!(
            second["geometry"]["coordinates"].as_array().unwrap().len(),
            1
        );

        // Tile 2500 of the 4 degree tiling: row 27, col 70, so its center
        // is at (-180 + 70*4 + 2, -90 + 27*4 + 2).
        let coordinates = second["geometry"]["coordinates"][0]
            .as_array()
            .expect("lon/lat pair");
        assert_eq!(coordinates[0].as_f64().unwrap(), 102.0);
        assert_eq!(coordinates[1].as_f64().unwrap(), 20.0);
    }

    #[test]
    fn test_image() {
        let dir = tempfile::tempdir().expect("temp dir");
        let hierarchy = TileHierarchy::from_root_dir(dir.path().to_path_buf());
        for tile_id in [1000, 1001, 2500] {
            touch_tile(&hierarchy, 0, tile_id);
        }

        let connectivity = ConnectivityMap::new(&hierarchy);
        let image = connectivity.to_image(0).expect("level present");
        assert_eq!(image.len(), 90 * 45);
        assert!(image[1000] > 0);
        assert_eq!(image[1000], image[1001]);
        assert!(image[2500] > 0);
        assert_ne!(image[2500], image[1000]);
        assert_eq!(image[0], 0);
    }

    #[test]
    fn test_transit_level_uses_local_tiling() {
        let dir = tempfile::tempdir().expect("temp dir");
        let hierarchy = TileHierarchy::from_root_dir(dir.path().to_path_buf());
        touch_tile(&hierarchy, 3, 519_120);

        let connectivity = ConnectivityMap::new(&hierarchy);
        assert!(connectivity.color_of(graph_id(3, 519_120)) > 0);
        let image = connectivity.to_image(3).expect("level present");
        // The 0.25 degree tiling of the finest road level.
        assert_eq!(image.len(), 1440 * 720);
    }

    #[test]
    fn test_stray_file_invalidates_level() {
        let dir = tempfile::tempdir().expect("temp dir");
        let hierarchy = TileHierarchy::from_root_dir(dir.path().to_path_buf());
        touch_tile(&hierarchy, 0, 1000);
        std::fs::write(
            PathBuf::from(hierarchy.tile_dir()).join("0/notes.txt"),
            b"scratch",
        )
        .expect("write stray file");

        let connectivity = ConnectivityMap::new(&hierarchy);
        assert_eq!(
            connectivity.to_geojson(0),
            Err(HierarchyError::InvalidLevel(0))
        );
        assert_eq!(connectivity.color_of(graph_id(0, 1000)), 0);
    }
}
