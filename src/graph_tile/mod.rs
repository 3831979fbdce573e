//! # Graph tile access
//!
//! A graph tile is a contiguous byte buffer: a fixed-size header followed by
//! packed record arrays in a fixed order, then two variable-size regions
//! (edge info and the text list). [`GraphTile`] owns one buffer per opened
//! tile; [`GraphTileView`] projects typed slices over it without copying.
//! A tile is read-only once opened, so views may be shared freely across
//! threads.
//!
//! Section order: header, nodes, directed edges, transit departures, transit
//! stops, transit routes, transit transfers, access restrictions, signs,
//! admins, edge-cell index, edge-info region, text list.

use crate::tile_hierarchy::{HierarchyError, TileHierarchy};
use crate::{AsCowStr, CELL_DIM, GraphId};
use geo::Rect;
use self_cell::self_cell;
use std::borrow::Cow;
use std::io::ErrorKind;
use thiserror::Error;
use tracing::debug;
use zerocopy::FromBytes;

mod access_restriction;
mod admin;
mod directed_edge;
mod edge_info;
mod header;
mod node;
mod sign;
#[cfg(test)]
pub(crate) mod test_tiles;
mod transit;

pub use access_restriction::{AccessRestriction, AccessRestrictionType};
pub use admin::{Admin, AdminInfo};
pub use directed_edge::DirectedEdge;
pub use edge_info::EdgeInfo;
pub use header::{GRAPH_TILE_VERSION, GraphTileHeader};
pub use node::{NodeInfo, NodeType};
pub use sign::{Sign, SignInfo, SignType};
pub use transit::{
    SCHEDULE_DAYS, TransferType, TransitDeparture, TransitRoute, TransitStop, TransitTransfer,
    VehicleType,
};

#[derive(Debug, Error)]
pub enum GraphTileError {
    #[error("corrupt tile: {0}")]
    CorruptTile(String),
    #[error("I/O error reading tile: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// A failed lookup within a loaded tile.
///
/// Out-of-range indices are a programming error on the caller's side, but
/// they are always reported (with enough context to find the call site),
/// never clamped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("{section} index out of bounds in tile {tile_id}: index {index} >= count {count}")]
    IndexOutOfRange {
        tile_id: GraphId,
        section: &'static str,
        index: u64,
        count: u64,
    },
    #[error("mismatched base; graph id {0} cannot exist in this tile")]
    MismatchedBase(GraphId),
}

/// Projects the next `count` records of type `T` from the tile buffer.
fn project_section<'a, T>(
    data: &'a [u8],
    offset: &mut usize,
    count: u32,
    section: &'static str,
) -> Result<&'a [T], GraphTileError>
where
    T: FromBytes + zerocopy::Immutable + zerocopy::KnownLayout + zerocopy::Unaligned,
{
    let count = count as usize;
    let size = size_of::<T>()
        .checked_mul(count)
        .ok_or_else(|| GraphTileError::CorruptTile(format!("{section} count overflows")))?;
    let end = offset
        .checked_add(size)
        .ok_or_else(|| GraphTileError::CorruptTile(format!("{section} count overflows")))?;
    let bytes = data.get(*offset..end).ok_or_else(|| {
        GraphTileError::CorruptTile(format!("{section} section extends past the end of the tile"))
    })?;
    let slice = <[T]>::ref_from_bytes(bytes)
        .map_err(|_| GraphTileError::CorruptTile(format!("{section} section is malformed")))?;
    *offset = end;
    Ok(slice)
}

/// A zero-copy view of one graph tile.
///
/// All accessors return references borrowed from the underlying buffer;
/// nothing is copied at query time.
pub struct GraphTileView<'a> {
    /// Header with tile identity, section counts, and region offsets.
    pub header: &'a GraphTileHeader,
    nodes: &'a [NodeInfo],
    directed_edges: &'a [DirectedEdge],
    departures: &'a [TransitDeparture],
    stops: &'a [TransitStop],
    routes: &'a [TransitRoute],
    transfers: &'a [TransitTransfer],
    access_restrictions: &'a [AccessRestriction],
    signs: &'a [Sign],
    admins: &'a [Admin],
    edge_cells: &'a [GraphId],
    edge_info_region: &'a [u8],
    text_list: &'a [u8],
}

impl<'a> TryFrom<&'a [u8]> for GraphTileView<'a> {
    type Error = GraphTileError;

    fn try_from(data: &'a [u8]) -> Result<Self, Self::Error> {
        let corrupt = |message: &str| GraphTileError::CorruptTile(message.to_string());

        let (header, _) = GraphTileHeader::ref_from_prefix(data)
            .map_err(|_| corrupt("tile is smaller than its header"))?;

        if header.version() != GRAPH_TILE_VERSION {
            return Err(GraphTileError::CorruptTile(format!(
                "unsupported tile version {}",
                header.version()
            )));
        }
        if header.file_size() != data.len() as u64 {
            return Err(GraphTileError::CorruptTile(format!(
                "header declares {} bytes but the file has {}",
                header.file_size(),
                data.len()
            )));
        }
        if usize::from(header.grid_dim()) != CELL_DIM {
            return Err(GraphTileError::CorruptTile(format!(
                "unsupported edge cell grid dimension {}",
                header.grid_dim()
            )));
        }

        let edge_info_offset = usize::try_from(header.edge_info_offset())
            .map_err(|_| corrupt("edge info offset overflows"))?;
        let text_list_offset = usize::try_from(header.text_list_offset())
            .map_err(|_| corrupt("text list offset overflows"))?;
        if edge_info_offset > text_list_offset || text_list_offset > data.len() {
            return Err(corrupt("region offsets are out of order"));
        }

        let mut offset = size_of::<GraphTileHeader>();
        let nodes = project_section(data, &mut offset, header.node_count(), "node")?;
        let directed_edges =
            project_section(data, &mut offset, header.directed_edge_count(), "directed edge")?;
        let departures =
            project_section(data, &mut offset, header.departure_count(), "departure")?;
        let stops = project_section(data, &mut offset, header.stop_count(), "transit stop")?;
        let routes = project_section(data, &mut offset, header.route_count(), "transit route")?;
        let transfers =
            project_section(data, &mut offset, header.transfer_count(), "transit transfer")?;
        let access_restrictions = project_section(
            data,
            &mut offset,
            header.access_restriction_count(),
            "access restriction",
        )?;
        let signs = project_section(data, &mut offset, header.sign_count(), "sign")?;
        let admins = project_section(data, &mut offset, header.admin_count(), "admin")?;

        // Everything between the fixed sections and the edge-info region is
        // the edge-cell index.
        let cell_bytes = edge_info_offset
            .checked_sub(offset)
            .ok_or_else(|| corrupt("sections overrun the edge-info region"))?;
        if cell_bytes % size_of::<GraphId>() != 0 {
            return Err(corrupt("edge cell section is not a whole number of records"));
        }
        let cell_count = (cell_bytes / size_of::<GraphId>()) as u32;
        let edge_cells = project_section(data, &mut offset, cell_count, "edge cell")?;
        for (begin, end) in header.cell_offsets() {
            if begin > end || end > cell_count {
                return Err(corrupt("edge cell range exceeds the section"));
            }
        }

        Ok(Self {
            header,
            nodes,
            directed_edges,
            departures,
            stops,
            routes,
            transfers,
            access_restrictions,
            signs,
            admins,
            edge_cells,
            edge_info_region: &data[edge_info_offset..text_list_offset],
            text_list: &data[text_list_offset..],
        })
    }
}

impl<'a> GraphTileView<'a> {
    /// The graph ID of the tile.
    #[inline]
    pub fn graph_id(&self) -> GraphId {
        self.header.graph_id()
    }

    /// Does the supplied graph ID belong in this tile?
    ///
    /// A true result does not guarantee that an object with this ID exists,
    /// only that the level and tile id match.
    pub fn may_contain_id(&self, id: GraphId) -> bool {
        id.tile_base_id() == self.graph_id().tile_base_id()
    }

    fn out_of_range(&self, section: &'static str, index: u64, count: u64) -> LookupError {
        LookupError::IndexOutOfRange {
            tile_id: self.graph_id(),
            section,
            index,
            count,
        }
    }

    /// The node at the given index.
    pub fn node(&self, index: usize) -> Result<&'a NodeInfo, LookupError> {
        self.nodes
            .get(index)
            .ok_or_else(|| self.out_of_range("node", index as u64, self.nodes.len() as u64))
    }

    /// The directed edge at the given index.
    pub fn directed_edge(&self, index: usize) -> Result<&'a DirectedEdge, LookupError> {
        self.directed_edges.get(index).ok_or_else(|| {
            self.out_of_range(
                "directed edge",
                index as u64,
                self.directed_edges.len() as u64,
            )
        })
    }

    /// The admin record at the given index.
    pub fn admin(&self, index: usize) -> Result<&'a Admin, LookupError> {
        self.admins
            .get(index)
            .ok_or_else(|| self.out_of_range("admin", index as u64, self.admins.len() as u64))
    }

    /// The transit stop at the given index.
    pub fn transit_stop(&self, index: usize) -> Result<&'a TransitStop, LookupError> {
        self.stops
            .get(index)
            .ok_or_else(|| self.out_of_range("transit stop", index as u64, self.stops.len() as u64))
    }

    /// Gets a node by graph ID, verifying that it can live in this tile.
    pub fn get_node(&self, id: GraphId) -> Result<&'a NodeInfo, LookupError> {
        if !self.may_contain_id(id) {
            return Err(LookupError::MismatchedBase(id));
        }
        self.node(id.index() as usize)
    }

    /// Gets a directed edge by graph ID, verifying that it can live in this tile.
    pub fn get_directed_edge(&self, id: GraphId) -> Result<&'a DirectedEdge, LookupError> {
        if !self.may_contain_id(id) {
            return Err(LookupError::MismatchedBase(id));
        }
        self.directed_edge(id.index() as usize)
    }

    /// The contiguous run of directed edges leaving the node at `node_index`
    /// (forward star access).
    pub fn get_directed_edges(&self, node_index: usize) -> Result<&'a [DirectedEdge], LookupError> {
        let node = self.node(node_index)?;
        let start = node.edge_index() as usize;
        let end = start + usize::from(node.edge_count());
        self.directed_edges.get(start..end).ok_or_else(|| {
            self.out_of_range("directed edge", end as u64, self.directed_edges.len() as u64)
        })
    }

    /// The admin record at the given index with its names resolved.
    pub fn admin_info(&self, index: usize) -> Result<AdminInfo<'a>, LookupError> {
        let admin = self.admin(index)?;
        Ok(AdminInfo {
            country_name: self.get_name(admin.country_offset())?,
            state_name: self.get_name(admin.state_offset())?,
            country_iso: admin.country_iso(),
            state_iso: admin.state_iso(),
        })
    }

    /// The null-terminated string at `offset` in the tile's text list.
    pub fn get_name(&self, offset: u32) -> Result<Cow<'a, str>, LookupError> {
        let offset = offset as usize;
        if offset >= self.text_list.len() {
            return Err(self.out_of_range(
                "text list",
                offset as u64,
                self.text_list.len() as u64,
            ));
        }
        Ok(self.text_list[offset..].as_cow_str())
    }

    /// All signs for a directed edge, with their text resolved, in storage
    /// order. An edge without signs yields an empty list.
    ///
    /// # Errors
    ///
    /// Fails only if a matching sign's text offset points outside the text
    /// list (a malformed tile).
    pub fn get_signs(&self, edge_index: u32) -> Result<Vec<SignInfo<'a>>, LookupError> {
        // The sign array is sorted by edge index; find the start of the run
        // of matches and collect it.
        let start = self
            .signs
            .partition_point(|sign| sign.edge_index() < edge_index);
        let mut signs = Vec::new();
        for sign in self.signs[start..]
            .iter()
            .take_while(|sign| sign.edge_index() == edge_index)
        {
            signs.push(SignInfo {
                sign_type: sign.sign_type(),
                text: self.get_name(sign.text_offset())?,
            });
        }

        if signs.is_empty() {
            debug!("no signs found for edge index {edge_index}");
        }
        Ok(signs)
    }

    /// All access restrictions for a directed edge, in storage order.
    /// Possibly empty; never an error.
    pub fn get_access_restrictions(&self, edge_index: u32) -> Vec<&'a AccessRestriction> {
        let start = self
            .access_restrictions
            .partition_point(|r| r.edge_index() < edge_index);
        self.access_restrictions[start..]
            .iter()
            .take_while(|r| r.edge_index() == edge_index)
            .collect()
    }

    /// The contiguous run of transfers out of a stop. Possibly empty.
    pub fn get_transfers(&self, from_stop_id: u32) -> &'a [TransitTransfer] {
        let start = self
            .transfers
            .partition_point(|t| t.from_stop_id() < from_stop_id);
        let len = self.transfers[start..]
            .iter()
            .take_while(|t| t.from_stop_id() == from_stop_id)
            .count();
        &self.transfers[start..start + len]
    }

    /// The transfer between two specific stops, if one is recorded.
    pub fn get_transfer(&self, from_stop_id: u32, to_stop_id: u32) -> Option<&'a TransitTransfer> {
        self.get_transfers(from_stop_id)
            .iter()
            .find(|t| t.to_stop_id() == to_stop_id)
    }

    /// The transit route with the given route id, if present in this tile.
    pub fn get_transit_route(&self, route_id: u32) -> Option<&'a TransitRoute> {
        // Route ids are unique and the array is sorted by them.
        self.routes
            .binary_search_by_key(&route_id, TransitRoute::route_id)
            .ok()
            .map(|index| &self.routes[index])
    }

    /// The departure along `line_id` with the given trip id, if present.
    pub fn get_transit_departure(
        &self,
        line_id: u32,
        trip_id: u32,
    ) -> Option<&'a TransitDeparture> {
        let start = self.departures.partition_point(|d| d.line_id() < line_id);
        self.departures[start..]
            .iter()
            .take_while(|d| d.line_id() == line_id)
            .find(|d| d.trip_id() == trip_id)
    }

    /// The next departure along `line_id` at or after `current_time` (seconds
    /// from midnight) whose calendar admits the request.
    ///
    /// `date` is in days since the pivot date and `dow_mask` carries the
    /// request's day of the week (bit 0 = Sunday). Within 60 days of the
    /// tile's creation the per-departure service bitmap is authoritative;
    /// beyond that the day-of-week mask decides. Returns `None` once the
    /// line's departures for the day are exhausted; the next service day is
    /// not attempted.
    pub fn get_next_departure(
        &self,
        line_id: u32,
        current_time: u32,
        date: u32,
        dow_mask: u8,
    ) -> Option<&'a TransitDeparture> {
        // Departures are sorted by (line id, departure time), so the first
        // admissible entry in the run is the next departure.
        let date_created = self.header.date_created();
        let start = self.departures.partition_point(|d| d.line_id() < line_id);
        let found = self.departures[start..]
            .iter()
            .take_while(|d| d.line_id() == line_id)
            .find(|d| d.departure_time() >= current_time && d.runs_on(date, dow_mask, date_created));

        if found.is_none() {
            debug!("no remaining departures for line id {line_id}");
        }
        found
    }

    /// The graph IDs of edges indexed in the spatial cell at
    /// `(column, row)` of this tile's edge-cell grid.
    pub fn get_cell(&self, column: usize, row: usize) -> Result<&'a [GraphId], LookupError> {
        let dim = usize::from(self.header.grid_dim());
        if column >= dim || row >= dim {
            return Err(self.out_of_range(
                "edge cell grid",
                (row * dim + column) as u64,
                (dim * dim) as u64,
            ));
        }
        let (begin, end) = self.header.cell_offset(column, row);
        // Ranges were validated against the section when the view was built.
        Ok(&self.edge_cells[begin as usize..end as usize])
    }

    /// A parser over the edge-info record at `offset` within the edge-info
    /// region.
    pub fn edge_info(&self, offset: u32) -> Result<EdgeInfo<'a>, GraphTileError> {
        EdgeInfo::parse(self.edge_info_region, offset as usize)
    }

    /// Edge info for a directed edge of this tile.
    pub fn get_edge_info(&self, edge: &DirectedEdge) -> Result<EdgeInfo<'a>, GraphTileError> {
        self.edge_info(edge.edge_info_offset())
    }

    /// The resolved names for an edge, given its edge-info offset.
    pub fn get_names(&self, edge_info_offset: u32) -> Result<Vec<Cow<'a, str>>, GraphTileError> {
        let edge_info = self.edge_info(edge_info_offset)?;
        edge_info
            .name_offsets()
            .map(|offset| Ok(self.get_name(offset)?))
            .collect()
    }

    /// The size of the edge-info region in bytes.
    #[inline]
    pub fn edge_info_size(&self) -> usize {
        self.edge_info_region.len()
    }

    /// The size of the text list in bytes.
    #[inline]
    pub fn text_list_size(&self) -> usize {
        self.text_list.len()
    }
}

self_cell!(
    /// An owned graph tile: the raw bytes plus the typed view over them.
    ///
    /// The buffer is owned exclusively by this handle and is immutable for
    /// its lifetime; borrowed views must not outlive it (the borrow checker
    /// enforces this).
    pub struct GraphTile {
        owner: Vec<u8>,

        #[covariant]
        dependent: GraphTileView,
    }
);

impl TryFrom<Vec<u8>> for GraphTile {
    type Error = GraphTileError;

    fn try_from(data: Vec<u8>) -> Result<Self, Self::Error> {
        GraphTile::try_new(data, |data| GraphTileView::try_from(data.as_slice()))
    }
}

impl GraphTile {
    /// Opens the tile containing `graph_id` from the hierarchy's tile
    /// directory.
    ///
    /// Returns `Ok(None)` if the tile file does not exist (or the id is the
    /// invalid sentinel) - callers probe tiles that may not be on disk, so a
    /// missing file is a normal outcome, not an error.
    ///
    /// # Errors
    ///
    /// - [`GraphTileError::Hierarchy`] if the id's level is not in the hierarchy.
    /// - [`GraphTileError::Io`] for read failures other than a missing file.
    /// - [`GraphTileError::CorruptTile`] if the bytes don't parse.
    pub fn open(
        hierarchy: &TileHierarchy,
        graph_id: GraphId,
    ) -> Result<Option<Self>, GraphTileError> {
        if !graph_id.is_valid() {
            return Ok(None);
        }

        let base_id = graph_id.tile_base_id();
        let path = hierarchy.tile_dir().join(hierarchy.file_suffix(base_id)?);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("tile {base_id} not found at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(GraphTileError::Io(e)),
        };

        Self::try_from(data).map(Some)
    }

    /// The typed view over this tile's bytes.
    #[inline]
    pub fn view(&self) -> &GraphTileView<'_> {
        self.borrow_dependent()
    }

    /// The tile's header.
    #[inline]
    pub fn header(&self) -> &GraphTileHeader {
        self.view().header
    }

    /// The tile's graph ID.
    #[inline]
    pub fn graph_id(&self) -> GraphId {
        self.view().graph_id()
    }

    /// The geographic bounds of this tile, from its level's tiling.
    pub fn bounding_box(&self, hierarchy: &TileHierarchy) -> Result<Rect<f32>, HierarchyError> {
        let graph_id = self.graph_id();
        let tiling = hierarchy
            .tiling_for_level(graph_id.level())
            .ok_or(HierarchyError::InvalidLevel(graph_id.level()))?;
        #[allow(clippy::cast_possible_truncation)]
        Ok(tiling.tile_bounds(graph_id.tile_id() as u32))
    }
}
