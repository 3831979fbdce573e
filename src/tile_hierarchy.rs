use crate::tiles::Tiles;
use crate::{GraphId, RoadClass};
use geo::{Rect, coord};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The file extension used by graph tiles.
const TILE_EXTENSION: &str = "gph";

/// The hierarchy level of the transit pseudo-level.
pub const TRANSIT_LEVEL: u8 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("level {0} is not in the tile hierarchy")]
    InvalidLevel(u8),
    #[error("`{0}` is not a valid tile path")]
    InvalidPath(PathBuf),
}

/// A level in the tile hierarchy.
pub struct TileLevel {
    /// The hierarchy level number.
    pub level: u8,
    /// The minimum class of road contained in this hierarchy level.
    pub minimum_road_class: RoadClass,
    /// The human-readable name of the level.
    pub name: &'static str,
    /// The spatial tiling used for this level.
    pub tiling: Tiles,
}

/// The set of levels in the tiled graph, plus the root directory where the
/// tile files live.
///
/// Levels are ordered coarse to fine: level 0 has wide tiles carrying only
/// important roads, level 2 has the smallest tiles and every road. Transit
/// data lives in a pseudo-level one above the finest road level and reuses
/// its tiling.
///
/// The hierarchy is built once at startup from configuration (the tile root
/// directory) and is immutable thereafter; share it by reference.
pub struct TileHierarchy {
    tile_dir: PathBuf,
    levels: [TileLevel; 3],
    transit: TileLevel,
}

impl TileHierarchy {
    /// Creates the standard hierarchy rooted at `tile_dir`.
    pub fn from_root_dir(tile_dir: PathBuf) -> Self {
        let world = Rect::new(
            coord! { x: -180f32, y: -90f32 },
            coord! { x: 180f32, y: 90f32 },
        );
        let tiling = |tile_size: f32| {
            Tiles::new(world, tile_size, 5).expect("world tiling parameters are valid")
        };

        Self {
            tile_dir,
            levels: [
                TileLevel {
                    level: 0,
                    minimum_road_class: RoadClass::Primary,
                    name: "highway",
                    tiling: tiling(4.0),
                },
                TileLevel {
                    level: 1,
                    minimum_road_class: RoadClass::Tertiary,
                    name: "arterial",
                    tiling: tiling(1.0),
                },
                TileLevel {
                    level: 2,
                    minimum_road_class: RoadClass::ServiceOther,
                    name: "local",
                    tiling: tiling(0.25),
                },
            ],
            transit: TileLevel {
                level: TRANSIT_LEVEL,
                minimum_road_class: RoadClass::ServiceOther,
                name: "transit",
                tiling: tiling(0.25),
            },
        }
    }

    /// The root directory containing the tile files.
    #[inline]
    pub fn tile_dir(&self) -> &Path {
        &self.tile_dir
    }

    /// The road levels, coarse to fine (excluding the transit pseudo-level).
    #[inline]
    pub fn levels(&self) -> &[TileLevel] {
        &self.levels
    }

    /// The transit pseudo-level.
    #[inline]
    pub fn transit_level(&self) -> &TileLevel {
        &self.transit
    }

    /// Looks up a level (including the transit pseudo-level) by number.
    pub fn level(&self, level: u8) -> Option<&TileLevel> {
        if level == self.transit.level {
            Some(&self.transit)
        } else {
            self.levels.get(usize::from(level))
        }
    }

    /// The spatial tiling for a level.
    ///
    /// The transit pseudo-level shares the finest road level's tiling.
    pub fn tiling_for_level(&self, level: u8) -> Option<&Tiles> {
        if level == self.transit.level {
            self.levels.last().map(|l| &l.tiling)
        } else {
            self.levels.get(usize::from(level)).map(|l| &l.tiling)
        }
    }

    /// Computes the relative path for a tile.
    ///
    /// The tile id is left-padded with zeros to the width of the largest id
    /// the level's tiling can produce (rounded up to a multiple of three
    /// digits), then split into groups of three:
    /// level 2, tile 519120 becomes `2/000/519/120.gph`. Grouping keeps any
    /// one directory at or under 1000 entries.
    ///
    /// # Errors
    ///
    /// Fails with [`HierarchyError::InvalidLevel`] if the graph id's level is
    /// not in the hierarchy.
    pub fn file_suffix(&self, graph_id: GraphId) -> Result<PathBuf, HierarchyError> {
        let level = self
            .level(graph_id.level())
            .ok_or(HierarchyError::InvalidLevel(graph_id.level()))?;

        let max_id = level.tiling.tile_count() - 1;
        let n_digits = ((max_id.max(1).ilog10() + 1).div_ceil(3) * 3) as usize;

        let padded = format!("{:0n_digits$}", graph_id.tile_id());
        let mut path = PathBuf::from(graph_id.level().to_string());
        // Group into threes from the least significant digit; ids wider than
        // the computed width get a short leading group.
        for chunk in padded.as_bytes().rchunks(3).rev() {
            path.push(String::from_utf8_lossy(chunk).as_ref());
        }
        path.set_extension(TILE_EXTENSION);

        Ok(path)
    }

    /// The inverse of [`TileHierarchy::file_suffix`]: recovers the tile base
    /// graph id from a file path under the hierarchy root.
    ///
    /// # Errors
    ///
    /// - [`HierarchyError::InvalidPath`] if the path is not under the root,
    ///   has fewer than two tokens, or has non-numeric tokens.
    /// - [`HierarchyError::InvalidLevel`] if the leading token names a level
    ///   not in the hierarchy.
    pub fn tile_id_from_path(&self, path: &Path) -> Result<GraphId, HierarchyError> {
        let invalid = || HierarchyError::InvalidPath(path.to_path_buf());

        let relative = path.strip_prefix(&self.tile_dir).map_err(|_| invalid())?;
        let mut tokens = Vec::new();
        for component in relative.components() {
            let token = component.as_os_str().to_str().ok_or_else(invalid)?;
            tokens.push(token.strip_suffix(".gph").unwrap_or(token));
        }
        if tokens.len() < 2 {
            return Err(invalid());
        }

        let level: u8 = tokens[0].parse().map_err(|_| invalid())?;
        if self.level(level).is_none() {
            return Err(HierarchyError::InvalidLevel(level));
        }

        // Each remaining token is one base-1000 digit, most significant first.
        let mut tile_id: u64 = 0;
        for token in &tokens[1..] {
            let group: u64 = token.parse().map_err(|_| invalid())?;
            tile_id = tile_id * 1000 + group;
        }

        GraphId::try_from_components(level, tile_id, 0).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::{prop_assert_eq, proptest};

    fn hierarchy() -> TileHierarchy {
        TileHierarchy::from_root_dir(PathBuf::from("/data/meridian"))
    }

    fn graph_id(level: u8, tile_id: u64) -> GraphId {
        GraphId::try_from_components(level, tile_id, 0).expect("valid graph ID")
    }

    #[test]
    fn test_level_lookup() {
        let h = hierarchy();
        assert_eq!(h.level(0).unwrap().name, "highway");
        assert_eq!(h.level(2).unwrap().name, "local");
        assert_eq!(h.level(3).unwrap().name, "transit");
        assert!(h.level(4).is_none());
    }

    #[test]
    fn test_tiling_matches_level_sizes() {
        let h = hierarchy();
        assert_eq!(h.level(0).unwrap().tiling.tile_size(), 4.0);
        assert_eq!(h.level(1).unwrap().tiling.tile_size(), 1.0);
        assert_eq!(h.level(2).unwrap().tiling.tile_size(), 0.25);
        // The transit pseudo-level rides on the finest road tiling.
        assert_eq!(
            h.tiling_for_level(TRANSIT_LEVEL).unwrap().tile_size(),
            0.25
        );
    }

    #[test]
    fn test_file_suffix() {
        let h = hierarchy();
        assert_eq!(
            h.file_suffix(graph_id(2, 2)).unwrap(),
            PathBuf::from("2/000/000/002.gph")
        );
        assert_eq!(
            h.file_suffix(graph_id(2, 519_120)).unwrap(),
            PathBuf::from("2/000/519/120.gph")
        );
        assert_eq!(
            h.file_suffix(graph_id(1, 64_799)).unwrap(),
            PathBuf::from("1/064/799.gph")
        );
        assert_eq!(
            h.file_suffix(graph_id(0, 49)).unwrap(),
            PathBuf::from("0/000/049.gph")
        );
        assert_eq!(
            h.file_suffix(graph_id(3, 1_000_000)).unwrap(),
            PathBuf::from("3/001/000/000.gph")
        );
    }

    #[test]
    fn test_file_suffix_ignores_object_index() {
        let h = hierarchy();
        let id = GraphId::try_from_components(1, 64_799, 1234).expect("valid graph ID");
        assert_eq!(
            h.file_suffix(id.tile_base_id()).unwrap(),
            PathBuf::from("1/064/799.gph")
        );
    }

    #[test]
    fn test_file_suffix_invalid_level() {
        let h = hierarchy();
        assert_eq!(
            h.file_suffix(graph_id(6, 0)),
            Err(HierarchyError::InvalidLevel(6))
        );
    }

    #[test]
    fn test_tile_id_from_path() {
        let h = hierarchy();
        let path = PathBuf::from("/data/meridian/2/000/519/120.gph");
        assert_eq!(h.tile_id_from_path(&path).unwrap(), graph_id(2, 519_120));

        let path = PathBuf::from("/data/meridian/0/000/049.gph");
        assert_eq!(h.tile_id_from_path(&path).unwrap(), graph_id(0, 49));
    }

    #[test]
    fn test_tile_id_from_path_rejects_foreign_root() {
        let h = hierarchy();
        let path = PathBuf::from("/elsewhere/2/000/519/120.gph");
        assert!(matches!(
            h.tile_id_from_path(&path),
            Err(HierarchyError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_tile_id_from_path_rejects_short_paths() {
        let h = hierarchy();
        let path = PathBuf::from("/data/meridian/2.gph");
        assert!(matches!(
            h.tile_id_from_path(&path),
            Err(HierarchyError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_tile_id_from_path_rejects_unknown_level() {
        let h = hierarchy();
        let path = PathBuf::from("/data/meridian/7/000/049.gph");
        assert_eq!(
            h.tile_id_from_path(&path),
            Err(HierarchyError::InvalidLevel(7))
        );
    }

    #[test]
    fn test_tile_id_from_path_rejects_garbage() {
        let h = hierarchy();
        let path = PathBuf::from("/data/meridian/2/aaa/bbb.gph");
        assert!(matches!(
            h.tile_id_from_path(&path),
            Err(HierarchyError::InvalidPath(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_suffix_round_trips(level in 0u8..=3, tile_id in 0u64..1_036_800) {
            let h = hierarchy();
            // Clamp the id into range for the coarser levels.
            let max_id = u64::from(h.level(level).unwrap().tiling.tile_count() - 1);
            let tile_id = tile_id % (max_id + 1);

            let id = graph_id(level, tile_id);
            let path = h.tile_dir().join(h.file_suffix(id).unwrap());
            prop_assert_eq!(h.tile_id_from_path(&path).unwrap(), id);
        }
    }
}
