//! # Planar spatial tiling
//!
//! A [`Tiles`] value divides a bounding box into equally sized square tiles,
//! numbered row-major from the southwest corner. Each tile is further split
//! into `n_subdivisions` × `n_subdivisions` sub-cells, which is the
//! granularity used by the per-tile edge index.
//!
//! Builders and readers of the tile store must agree on every value this
//! module computes, so the arithmetic here is deliberately rigid: base
//! coordinates are always `min + index * tile_size` (in that order), and
//! row/column lookups truncate toward zero.

use geo::{Coord, Intersects, Rect, coord};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TilingError {
    #[error("invalid tiling configuration: {0}")]
    InvalidConfig(&'static str),
}

/// A tiling of a rectangular region of 2D space.
///
/// Tile ids are `row * n_columns + col`; row 0 is the southernmost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tiles {
    bounds: Rect<f32>,
    tile_size: f32,
    n_rows: u32,
    n_columns: u32,
    n_subdivisions: u8,
    subdivision_size: f32,
}

impl Tiles {
    /// Creates a tiling of `bounds` with square tiles of `tile_size` degrees
    /// on a side, each split into `n_subdivisions`² sub-cells.
    ///
    /// # Errors
    ///
    /// Fails with [`TilingError::InvalidConfig`] for a non-positive tile
    /// size, zero subdivisions, or degenerate bounds.
    pub fn new(bounds: Rect<f32>, tile_size: f32, n_subdivisions: u8) -> Result<Self, TilingError> {
        if !(tile_size > 0.0) {
            return Err(TilingError::InvalidConfig("tile size must be positive"));
        }
        if n_subdivisions == 0 {
            return Err(TilingError::InvalidConfig(
                "tiles must have at least one subdivision",
            ));
        }
        if !(bounds.width() > 0.0) || !(bounds.height() > 0.0) {
            return Err(TilingError::InvalidConfig("bounds are degenerate"));
        }

        #[allow(clippy::cast_possible_truncation)]
        #[allow(clippy::cast_sign_loss)]
        Ok(Self {
            bounds,
            tile_size,
            n_rows: (bounds.height() / tile_size).ceil() as u32,
            n_columns: (bounds.width() / tile_size).ceil() as u32,
            n_subdivisions,
            subdivision_size: tile_size / f32::from(n_subdivisions),
        })
    }

    /// The bounding box of the tiling.
    #[inline]
    pub const fn bounds(&self) -> Rect<f32> {
        self.bounds
    }

    /// The size of each side of a square tile.
    #[inline]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    #[inline]
    pub const fn n_rows(&self) -> u32 {
        self.n_rows
    }

    #[inline]
    pub const fn n_columns(&self) -> u32 {
        self.n_columns
    }

    #[inline]
    pub const fn n_subdivisions(&self) -> u8 {
        self.n_subdivisions
    }

    /// The total number of tiles in the tiling.
    #[inline]
    pub const fn tile_count(&self) -> u32 {
        self.n_rows * self.n_columns
    }

    /// The largest tile id for a hypothetical tiling of `bounds` with
    /// `tile_size` tiles.
    ///
    /// Used by the file suffix computation, which pads tile ids to the width
    /// of the largest possible id rather than the actual one.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn max_tile_id(bounds: &Rect<f32>, tile_size: f32) -> u32 {
        let cols = (bounds.width() / tile_size).ceil() as u32;
        let rows = (bounds.height() / tile_size).ceil() as u32;
        cols * rows - 1
    }

    /// The row containing `y`, or `None` outside the bounds.
    ///
    /// A value exactly on the northern edge maps to the last row.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn row(&self, y: f32) -> Option<u32> {
        if y < self.bounds.min().y || y > self.bounds.max().y {
            None
        } else if y == self.bounds.max().y {
            Some(self.n_rows - 1)
        } else {
            Some(((y - self.bounds.min().y) / self.tile_size) as u32)
        }
    }

    /// The column containing `x`, or `None` outside the bounds.
    ///
    /// A value exactly on the eastern edge maps to the last column.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn col(&self, x: f32) -> Option<u32> {
        if x < self.bounds.min().x || x > self.bounds.max().x {
            None
        } else if x == self.bounds.max().x {
            Some(self.n_columns - 1)
        } else {
            Some(((x - self.bounds.min().x) / self.tile_size) as u32)
        }
    }

    /// The id of the tile containing the coordinate, or `None` outside the bounds.
    pub fn tile_id(&self, c: Coord<f32>) -> Option<u32> {
        Some(self.row(c.y)? * self.n_columns + self.col(c.x)?)
    }

    /// The id of the tile at the given column and row.
    #[inline]
    pub const fn tile_id_at(&self, col: u32, row: u32) -> u32 {
        row * self.n_columns + col
    }

    /// The (row, column) of a tile id.
    #[inline]
    pub const fn row_column(&self, tile_id: u32) -> (u32, u32) {
        (tile_id / self.n_columns, tile_id % self.n_columns)
    }

    /// The southwest corner of the tile.
    #[allow(clippy::cast_precision_loss)]
    pub fn base(&self, tile_id: u32) -> Coord<f32> {
        let (row, col) = self.row_column(tile_id);
        // min + index * size, in exactly that order; builders do the same.
        coord! {
            x: self.bounds.min().x + col as f32 * self.tile_size,
            y: self.bounds.min().y + row as f32 * self.tile_size,
        }
    }

    /// The center of the tile.
    pub fn center(&self, tile_id: u32) -> Coord<f32> {
        let base = self.base(tile_id);
        coord! {
            x: base.x + self.tile_size * 0.5,
            y: base.y + self.tile_size * 0.5,
        }
    }

    /// The bounding box of the tile.
    pub fn tile_bounds(&self, tile_id: u32) -> Rect<f32> {
        let base = self.base(tile_id);
        Rect::new(
            base,
            coord! {x: base.x + self.tile_size, y: base.y + self.tile_size},
        )
    }

    /// The neighboring tile to the east, wrapping around to the start of the
    /// row past the last column.
    pub const fn right_neighbor(&self, tile_id: u32) -> u32 {
        let (_, col) = self.row_column(tile_id);
        if col < self.n_columns - 1 {
            tile_id + 1
        } else {
            tile_id + 1 - self.n_columns
        }
    }

    /// The neighboring tile to the west, wrapping around to the end of the
    /// row before the first column.
    pub const fn left_neighbor(&self, tile_id: u32) -> u32 {
        let (_, col) = self.row_column(tile_id);
        if col > 0 {
            tile_id - 1
        } else {
            tile_id + self.n_columns - 1
        }
    }

    /// The neighboring tile to the north. Tiles in the last row are their
    /// own top neighbor.
    pub const fn top_neighbor(&self, tile_id: u32) -> u32 {
        if tile_id < self.tile_count() - self.n_columns {
            tile_id + self.n_columns
        } else {
            tile_id
        }
    }

    /// The neighboring tile to the south. Tiles in the first row are their
    /// own bottom neighbor.
    pub const fn bottom_neighbor(&self, tile_id: u32) -> u32 {
        if tile_id < self.n_columns {
            tile_id
        } else {
            tile_id - self.n_columns
        }
    }

    /// Are the two tiles edge neighbors (N, E, S, or W)?
    pub const fn are_neighbors(&self, a: u32, b: u32) -> bool {
        b == self.top_neighbor(a)
            || b == self.right_neighbor(a)
            || b == self.bottom_neighbor(a)
            || b == self.left_neighbor(a)
    }

    /// The list of tiles intersecting the bounding box, in no particular order.
    ///
    /// The search starts at the tile containing the box center and expands
    /// breadth-first through neighbors whose bounds intersect the box.
    /// Returns an empty list if the box center is outside the tiling.
    pub fn tile_list(&self, bounding_box: &Rect<f32>) -> Vec<u32> {
        let mut tile_list = Vec::new();
        let Some(start) = self.tile_id(bounding_box.center()) else {
            return tile_list;
        };

        // The BFS tends to spiral out from the center tile.
        let mut checklist = VecDeque::from([start]);
        let mut visited: HashSet<u32> = HashSet::from([start]);

        while let Some(tile_id) = checklist.pop_front() {
            tile_list.push(tile_id);

            for neighbor in [
                self.left_neighbor(tile_id),
                self.right_neighbor(tile_id),
                self.top_neighbor(tile_id),
                self.bottom_neighbor(tile_id),
            ] {
                if !visited.contains(&neighbor)
                    && bounding_box.intersects(&self.tile_bounds(neighbor))
                {
                    checklist.push_back(neighbor);
                    visited.insert(neighbor);
                }
            }
        }

        tile_list
    }

    /// Colors a connectivity map in place.
    ///
    /// On entry, every tile of interest maps to 0. On return, every tile
    /// carries a positive color such that two tiles share a color iff a
    /// 4-neighbor path of present tiles connects them. Components are seeded
    /// in ascending tile-id order, so colors are deterministic: 1 for the
    /// component containing the lowest tile id, and so on.
    pub fn color_map(&self, connectivity_map: &mut HashMap<u32, u32>) {
        let mut tile_ids: Vec<u32> = connectivity_map.keys().copied().collect();
        tile_ids.sort_unstable();

        let mut color = 1;
        for tile_id in tile_ids {
            if connectivity_map[&tile_id] > 0 {
                continue;
            }

            // Flood this component.
            connectivity_map.insert(tile_id, color);
            let mut checklist = VecDeque::from([tile_id]);
            while let Some(next_tile) = checklist.pop_front() {
                for neighbor in [
                    self.left_neighbor(next_tile),
                    self.right_neighbor(next_tile),
                    self.top_neighbor(next_tile),
                    self.bottom_neighbor(next_tile),
                ] {
                    if let Some(neighbor_color) = connectivity_map.get_mut(&neighbor) {
                        if *neighbor_color == 0 {
                            *neighbor_color = color;
                            checklist.push_back(neighbor);
                        }
                    }
                }
            }

            color += 1;
        }
    }

    /// The sub-cells touched by a polyline, grouped by tile.
    ///
    /// Each entry maps a tile id to the set of sub-cell indices
    /// (`y_sub * n_subdivisions + x_sub`) the line passes through. Segments
    /// leaving the bounds are clipped; wrap-around across the antimeridian is
    /// NOT handled - callers must split such inputs beforehand.
    pub fn intersect_linestring(&self, linestring: &[Coord<f32>]) -> HashMap<u32, HashSet<u16>> {
        let mut intersection: HashMap<u32, HashSet<u16>> = HashMap::new();

        for (i, &u) in linestring.iter().enumerate() {
            // The last point degenerates into a zero-length segment so its
            // sub-cell is still recorded.
            let v = linestring.get(i + 1).copied().unwrap_or(u);

            let (u, v) = if self.tile_id(u).is_none() || self.tile_id(v).is_none() {
                match self.clip_segment(u, v) {
                    Some(clipped) => clipped,
                    None => continue,
                }
            } else {
                (u, v)
            };

            self.walk_subdivisions(u, v, &mut intersection);
        }

        intersection
    }

    /// The sub-cells whose bounds intersect a disc, grouped by tile.
    ///
    /// Same result shape as [`Tiles::intersect_linestring`]. The disc is
    /// tested against sub-cell rectangles directly, so cells merely touched
    /// by the circle boundary are included.
    pub fn intersect_circle(&self, center: Coord<f32>, radius: f32) -> HashMap<u32, HashSet<u16>> {
        let mut intersection: HashMap<u32, HashSet<u16>> = HashMap::new();
        if radius < 0.0 {
            return intersection;
        }

        // Clamp the disc's bounding box to the tiling, then test each
        // sub-cell inside it.
        let min = self.bounds.min();
        let max = self.bounds.max();
        let x0 = (center.x - radius).clamp(min.x, max.x);
        let x1 = (center.x + radius).clamp(min.x, max.x);
        let y0 = (center.y - radius).clamp(min.y, max.y);
        let y1 = (center.y + radius).clamp(min.y, max.y);
        if x0 > x1 || y0 > y1 {
            return intersection;
        }

        let radius_sq = f64::from(radius) * f64::from(radius);
        let nsub = u32::from(self.n_subdivisions);
        let (col0, col1) = (self.col(x0).unwrap_or(0), self.col(x1).unwrap_or(0));
        let (row0, row1) = (self.row(y0).unwrap_or(0), self.row(y1).unwrap_or(0));
        for row in row0..=row1 {
            for col in col0..=col1 {
                let tile_id = self.tile_id_at(col, row);
                let base = self.base(tile_id);
                for y_sub in 0..nsub {
                    for x_sub in 0..nsub {
                        #[allow(clippy::cast_precision_loss)]
                        let cell_min = coord! {
                            x: base.x + x_sub as f32 * self.subdivision_size,
                            y: base.y + y_sub as f32 * self.subdivision_size,
                        };
                        if disc_intersects_rect(
                            center,
                            radius_sq,
                            cell_min,
                            self.subdivision_size,
                        ) {
                            #[allow(clippy::cast_possible_truncation)]
                            intersection
                                .entry(tile_id)
                                .or_default()
                                .insert((y_sub * nsub + x_sub) as u16);
                        }
                    }
                }
            }
        }

        intersection
    }

    /// Clips a segment to the tiling bounds (Liang-Barsky), or `None` if the
    /// segment lies fully outside.
    fn clip_segment(&self, u: Coord<f32>, v: Coord<f32>) -> Option<(Coord<f32>, Coord<f32>)> {
        let (ux, uy) = (f64::from(u.x), f64::from(u.y));
        let (dx, dy) = (f64::from(v.x) - ux, f64::from(v.y) - uy);
        let min = self.bounds.min();
        let max = self.bounds.max();

        let mut t0 = 0.0f64;
        let mut t1 = 1.0f64;
        let edges = [
            (-dx, ux - f64::from(min.x)),
            (dx, f64::from(max.x) - ux),
            (-dy, uy - f64::from(min.y)),
            (dy, f64::from(max.y) - uy),
        ];
        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let r = q / p;
                if p < 0.0 {
                    if r > t1 {
                        return None;
                    }
                    t0 = t0.max(r);
                } else {
                    if r < t0 {
                        return None;
                    }
                    t1 = t1.min(r);
                }
            }
        }
        if t0 > t1 {
            return None;
        }

        #[allow(clippy::cast_possible_truncation)]
        let at = |t: f64| coord! {x: (ux + t * dx) as f32, y: (uy + t * dy) as f32};
        Some((at(t0), at(t1)))
    }

    /// Walks the global sub-cell grid from `u` to `v`, recording every cell
    /// the segment passes through.
    ///
    /// At each step the next-corner side test picks the axis to advance;
    /// a segment passing exactly through a corner advances `x` first. The
    /// walk only terminates once BOTH axes reach the end cell - if one axis
    /// equalizes early, the remaining one is advanced directly.
    fn walk_subdivisions(
        &self,
        u: Coord<f32>,
        v: Coord<f32>,
        intersection: &mut HashMap<u32, HashSet<u16>>,
    ) {
        let nsub = i64::from(self.n_subdivisions);
        let n_sub_x = i64::from(self.n_columns) * nsub;
        let n_sub_y = i64::from(self.n_rows) * nsub;
        let min = self.bounds.min();

        // Global sub-cell indices; a point exactly on the max edge clamps
        // into the last cell.
        #[allow(clippy::cast_possible_truncation)]
        let sub_of = |c: Coord<f32>| -> (i64, i64) {
            let x = (f64::from(c.x - min.x) / f64::from(self.bounds.width())
                * n_sub_x as f64) as i64;
            let y = (f64::from(c.y - min.y) / f64::from(self.bounds.height())
                * n_sub_y as f64) as i64;
            (x.clamp(0, n_sub_x - 1), y.clamp(0, n_sub_y - 1))
        };

        let (mut x, mut y) = sub_of(u);
        let (x_end, y_end) = sub_of(v);
        let step_x: i64 = if x_end >= x { 1 } else { -1 };
        let step_y: i64 = if y_end >= y { 1 } else { -1 };
        let dx = f64::from(v.x) - f64::from(u.x);
        let dy = f64::from(v.y) - f64::from(u.y);

        loop {
            let tile = (y / nsub) * i64::from(self.n_columns) + (x / nsub);
            let subdivision = (y % nsub) * nsub + (x % nsub);
            #[allow(clippy::cast_possible_truncation)]
            #[allow(clippy::cast_sign_loss)]
            intersection
                .entry(tile as u32)
                .or_default()
                .insert(subdivision as u16);

            if x == x_end && y == y_end {
                break;
            }
            if x == x_end {
                y += step_y;
            } else if y == y_end {
                x += step_x;
            } else {
                // The corner of the current cell in the direction of travel
                // decides which edge the segment exits through.
                let corner_x = f64::from(min.x)
                    + f64::from(self.subdivision_size) * (x + i64::from(step_x > 0)) as f64;
                let corner_y = f64::from(min.y)
                    + f64::from(self.subdivision_size) * (y + i64::from(step_y > 0)) as f64;
                let cross =
                    dx * (corner_y - f64::from(u.y)) - dy * (corner_x - f64::from(u.x));
                if cross * (step_x * step_y) as f64 >= 0.0 {
                    x += step_x;
                } else {
                    y += step_y;
                }
            }
        }
    }
}

/// Does a disc intersect a square cell with the given southwest corner?
fn disc_intersects_rect(center: Coord<f32>, radius_sq: f64, cell_min: Coord<f32>, size: f32) -> bool {
    let closest_x = f64::from(center.x).clamp(f64::from(cell_min.x), f64::from(cell_min.x + size));
    let closest_y = f64::from(center.y).clamp(f64::from(cell_min.y), f64::from(cell_min.y + size));
    let dx = f64::from(center.x) - closest_x;
    let dy = f64::from(center.y) - closest_y;
    dx * dx + dy * dy <= radius_sq
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::{prop_assert, prop_assert_eq, proptest};

    fn world_bounds() -> Rect<f32> {
        Rect::new(coord! {x: -180f32, y: -90f32}, coord! {x: 180f32, y: 90f32})
    }

    /// World tiling with 4 degree tiles and 5 subdivisions.
    fn world_tiles() -> Tiles {
        Tiles::new(world_bounds(), 4.0, 5).expect("valid tiling")
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Tiles::new(world_bounds(), 0.0, 5),
            Err(TilingError::InvalidConfig(_))
        ));
        assert!(matches!(
            Tiles::new(world_bounds(), -1.0, 5),
            Err(TilingError::InvalidConfig(_))
        ));
        assert!(matches!(
            Tiles::new(world_bounds(), 4.0, 0),
            Err(TilingError::InvalidConfig(_))
        ));
        let degenerate = Rect::new(coord! {x: 0f32, y: 0f32}, coord! {x: 0f32, y: 10f32});
        assert!(matches!(
            Tiles::new(degenerate, 4.0, 5),
            Err(TilingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_dimensions() {
        let tiles = world_tiles();
        assert_eq!(tiles.n_columns(), 90);
        assert_eq!(tiles.n_rows(), 45);
        assert_eq!(tiles.tile_count(), 4050);
        assert_eq!(Tiles::max_tile_id(&world_bounds(), 4.0), 4049);
        assert_eq!(Tiles::max_tile_id(&world_bounds(), 0.25), 1_036_799);
    }

    #[test]
    fn test_tile_id_at_origin() {
        let tiles = world_tiles();
        // x = 0 sits exactly on a column boundary and truncates into column
        // 45; y = 0 lies inside row 22 (which spans [-2, 2)).
        assert_eq!(tiles.tile_id(coord! {x: 0.0, y: 0.0}), Some(22 * 90 + 45));
        assert_eq!(tiles.center(2025), coord! {x: 2.0, y: 0.0});
    }

    #[test]
    fn test_tile_id_out_of_bounds() {
        let tiles = world_tiles();
        assert_eq!(tiles.tile_id(coord! {x: -180.1, y: 0.0}), None);
        assert_eq!(tiles.tile_id(coord! {x: 0.0, y: 90.1}), None);
    }

    #[test]
    fn test_max_edge_maps_to_last_row_and_column() {
        let tiles = world_tiles();
        assert_eq!(tiles.row(90.0), Some(44));
        assert_eq!(tiles.row(90.0 + 1e-3), None);
        assert_eq!(tiles.col(180.0), Some(89));
        assert_eq!(tiles.col(180.0 + 1e-3), None);
        assert_eq!(tiles.tile_id(coord! {x: 180.0, y: 90.0}), Some(4049));
    }

    #[test]
    fn test_base_center_bounds() {
        let tiles = world_tiles();
        let tile_id = tiles.tile_id_at(45, 22);
        assert_eq!(tiles.base(tile_id), coord! {x: 0.0, y: -2.0});
        assert_eq!(tiles.center(tile_id), coord! {x: 2.0, y: 0.0});
        let bounds = tiles.tile_bounds(tile_id);
        assert_eq!(bounds.min(), coord! {x: 0.0, y: -2.0});
        assert_eq!(bounds.max(), coord! {x: 4.0, y: 2.0});
    }

    #[test]
    fn test_neighbors() {
        let tiles = world_tiles();
        let tile_id = tiles.tile_id_at(45, 22);
        assert_eq!(tiles.right_neighbor(tile_id), tile_id + 1);
        assert_eq!(tiles.left_neighbor(tile_id), tile_id - 1);
        assert_eq!(tiles.top_neighbor(tile_id), tile_id + 90);
        assert_eq!(tiles.bottom_neighbor(tile_id), tile_id - 90);
        assert!(tiles.are_neighbors(tile_id, tile_id + 1));
        assert!(tiles.are_neighbors(tile_id, tile_id - 90));
        assert!(!tiles.are_neighbors(tile_id, tile_id + 2));
        assert!(!tiles.are_neighbors(tile_id, tile_id + 91));
    }

    #[test]
    fn test_neighbor_wraparound() {
        let tiles = world_tiles();
        // Rightmost column wraps to the leftmost column of the same row.
        let rightmost = tiles.tile_id_at(89, 10);
        assert_eq!(tiles.right_neighbor(rightmost), tiles.tile_id_at(0, 10));
        let leftmost = tiles.tile_id_at(0, 10);
        assert_eq!(tiles.left_neighbor(leftmost), tiles.tile_id_at(89, 10));
        // Top and bottom rows clamp to themselves.
        let top = tiles.tile_id_at(5, 44);
        assert_eq!(tiles.top_neighbor(top), top);
        let bottom = tiles.tile_id_at(5, 0);
        assert_eq!(tiles.bottom_neighbor(bottom), bottom);
    }

    #[test]
    fn test_tile_list_small_box() {
        let tiles = world_tiles();
        // [(-1,-1),(1,1)] crosses the column boundary at x=0 but stays
        // within row 22 (y in [-2, 2)).
        let bbox = Rect::new(coord! {x: -1f32, y: -1f32}, coord! {x: 1f32, y: 1f32});
        let mut list = tiles.tile_list(&bbox);
        list.sort_unstable();
        assert_eq!(list, vec![tiles.tile_id_at(44, 22), tiles.tile_id_at(45, 22)]);
    }

    #[test]
    fn test_tile_list_four_tiles() {
        let tiles = world_tiles();
        // Straddles both the column boundary at x=0 and the row boundary at
        // y=2, producing a 2x2 block with no duplicates.
        let bbox = Rect::new(coord! {x: -1f32, y: 1f32}, coord! {x: 1f32, y: 3f32});
        let mut list = tiles.tile_list(&bbox);
        list.sort_unstable();
        assert_eq!(
            list,
            vec![
                tiles.tile_id_at(44, 22),
                tiles.tile_id_at(45, 22),
                tiles.tile_id_at(44, 23),
                tiles.tile_id_at(45, 23),
            ]
        );
    }

    #[test]
    fn test_tile_list_center_outside() {
        let tiles = world_tiles();
        let bbox = Rect::new(coord! {x: 190f32, y: 0f32}, coord! {x: 200f32, y: 1f32});
        assert!(tiles.tile_list(&bbox).is_empty());
    }

    #[test]
    fn test_color_map_components() {
        let tiles = world_tiles();
        // t0 and t1 are neighbors, t3 is a neighbor of t1, and t2 is isolated.
        let t0 = tiles.tile_id_at(10, 10);
        let t1 = tiles.right_neighbor(t0);
        let t3 = tiles.top_neighbor(t1);
        let t2 = tiles.tile_id_at(50, 30);

        let mut map = HashMap::from([(t0, 0), (t1, 0), (t2, 0), (t3, 0)]);
        tiles.color_map(&mut map);

        assert_eq!(map[&t0], 1);
        assert_eq!(map[&t1], 1);
        assert_eq!(map[&t3], 1);
        assert_eq!(map[&t2], 2);
    }

    #[test]
    fn test_color_map_wrapping_component() {
        let tiles = world_tiles();
        // Adjacency wraps in longitude, so the first and last columns of a
        // row are one component.
        let west = tiles.tile_id_at(0, 20);
        let east = tiles.tile_id_at(89, 20);
        let mut map = HashMap::from([(west, 0), (east, 0)]);
        tiles.color_map(&mut map);
        assert_eq!(map[&west], map[&east]);
    }

    #[test]
    fn test_intersect_single_point() {
        let tiles = world_tiles();
        let point = coord! {x: 0.5f32, y: 0.5f32};
        let intersection = tiles.intersect_linestring(&[point]);
        let tile_id = tiles.tile_id(point).unwrap();
        assert_eq!(intersection.len(), 1);
        // (0.5, 0.5) lands in sub-cell x=0 of the tile starting at x=0;
        // rows subdivide from -2, putting y=0.5 in sub-row 3.
        assert_eq!(intersection[&tile_id], HashSet::from([3 * 5]));
    }

    #[test]
    fn test_intersect_horizontal_segment() {
        let tiles = world_tiles();
        // From (0.1, 0.1) to (3.9, 0.1): crosses all 5 sub-columns of one
        // tile within a single sub-row.
        let shape = [coord! {x: 0.1f32, y: 0.1f32}, coord! {x: 3.9f32, y: 0.1f32}];
        let intersection = tiles.intersect_linestring(&shape);
        let tile_id = tiles.tile_id(shape[0]).unwrap();
        assert_eq!(intersection.len(), 1);
        // y = 0.1 sits in sub-row 2 of the tile (rows subdivide from -2).
        let cells = &intersection[&tile_id];
        assert_eq!(
            cells,
            &HashSet::from([2 * 5, 2 * 5 + 1, 2 * 5 + 2, 2 * 5 + 3, 2 * 5 + 4])
        );
    }

    #[test]
    fn test_intersect_crosses_tiles() {
        let tiles = world_tiles();
        // A segment crossing the x=0 tile boundary must touch both tiles.
        let shape = [coord! {x: -0.5f32, y: 0.1f32}, coord! {x: 0.5f32, y: 0.1f32}];
        let intersection = tiles.intersect_linestring(&shape);
        let west = tiles.tile_id_at(44, 22);
        let east = tiles.tile_id_at(45, 22);
        assert!(intersection.contains_key(&west));
        assert!(intersection.contains_key(&east));
    }

    #[test]
    fn test_intersect_diagonal_walk_is_contiguous() {
        let tiles = world_tiles();
        let shape = [coord! {x: 0.1f32, y: -1.9f32}, coord! {x: 3.9f32, y: 1.9f32}];
        let intersection = tiles.intersect_linestring(&shape);
        let tile_id = tiles.tile_id(shape[0]).unwrap();
        let cells = &intersection[&tile_id];
        // The end sub-cell is reached even though the x axis equalizes
        // before the y axis on some inputs.
        assert!(cells.contains(&0), "start sub-cell missing");
        assert!(cells.contains(&24), "end sub-cell missing");
        // A diagonal through n cells per axis touches at least 2n - 1 cells.
        assert!(cells.len() >= 9, "walk skipped cells: {cells:?}");
    }

    #[test]
    fn test_intersect_clips_out_of_bounds_segments() {
        let tiles = world_tiles();
        // Fully outside: ignored.
        let outside = [coord! {x: 200f32, y: 95f32}, coord! {x: 210f32, y: 95f32}];
        assert!(tiles.intersect_linestring(&outside).is_empty());

        // Partially outside: clipped to the northern edge.
        let crossing = [coord! {x: 0.5f32, y: 89.5f32}, coord! {x: 0.5f32, y: 95f32}];
        let intersection = tiles.intersect_linestring(&crossing);
        assert!(!intersection.is_empty());
        let max_row_tile = tiles.tile_id(coord! {x: 0.5f32, y: 89.9f32}).unwrap();
        assert!(intersection.contains_key(&max_row_tile));
    }

    #[test]
    fn test_intersect_circle() {
        let tiles = world_tiles();
        // A small disc well inside one sub-cell.
        let center = coord! {x: 0.4f32, y: -1.6f32};
        let intersection = tiles.intersect_circle(center, 0.1);
        let tile_id = tiles.tile_id(center).unwrap();
        assert_eq!(intersection.len(), 1);
        assert_eq!(intersection[&tile_id], HashSet::from([0]));

        // A disc centered on a tile corner touches cells in all four tiles
        // around the corner.
        let corner = coord! {x: 0.0f32, y: 2.0f32};
        let intersection = tiles.intersect_circle(corner, 0.1);
        assert_eq!(intersection.len(), 4);

        // Zero radius still reports the containing sub-cell.
        let intersection = tiles.intersect_circle(center, 0.0);
        assert_eq!(intersection[&tile_id], HashSet::from([0]));
    }

    proptest! {
        #[test]
        fn prop_center_within_tile_bounds(lon in -180f32..180.0, lat in -90f32..90.0) {
            let tiles = world_tiles();
            let tile_id = tiles.tile_id(coord! {x: lon, y: lat}).expect("in bounds");
            let center = tiles.center(tile_id);
            let bounds = tiles.tile_bounds(tile_id);
            prop_assert!(bounds.intersects(&center));
        }

        #[test]
        fn prop_center_round_trips(tile_id in 0u32..4050) {
            let tiles = world_tiles();
            prop_assert_eq!(tiles.tile_id(tiles.center(tile_id)), Some(tile_id));
        }

        #[test]
        fn prop_neighbors_are_symmetric(tile_id in 0u32..4050) {
            let tiles = world_tiles();
            let right = tiles.right_neighbor(tile_id);
            prop_assert_eq!(tiles.left_neighbor(right), tile_id);
        }
    }
}
