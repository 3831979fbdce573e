use crate::{CELL_COUNT, CELL_DIM, GraphId};
use chrono::{Days, NaiveDate};
use zerocopy::{LE, U32, U64};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// The tile format version this crate reads and writes.
pub const GRAPH_TILE_VERSION: u32 = 1;

/// Days in the header's creation date are counted from this date.
pub(crate) fn pivot_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2014, 1, 1).expect("pivot date is a real date")
}

/// Summary information about a graph tile.
///
/// The header is the first record in a tile. It carries the tile's identity,
/// the record count of every fixed-size section, the byte offsets of the two
/// variable-size regions, and the per-cell ranges of the edge-cell index.
/// Every other section offset is derived from the counts here by prefix sum.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Debug)]
#[repr(C)]
pub struct GraphTileHeader {
    graph_id: U64<LE>,
    node_count: U32<LE>,
    directed_edge_count: U32<LE>,
    sign_count: U32<LE>,
    admin_count: U32<LE>,
    departure_count: U32<LE>,
    stop_count: U32<LE>,
    route_count: U32<LE>,
    transfer_count: U32<LE>,
    access_restriction_count: U32<LE>,
    /// Byte offset of the edge-info region from the start of the tile.
    edge_info_offset: U64<LE>,
    /// Byte offset of the text list from the start of the tile.
    text_list_offset: U64<LE>,
    /// The total size of the tile file in bytes.
    file_size: U64<LE>,
    /// Days since the pivot date when this tile was created.
    date_created: U32<LE>,
    version: U32<LE>,
    /// The edge-cell grid dimension (cells per side).
    grid_dim: u8,
    /// `[begin, end)` offsets into the edge-cell section for each cell,
    /// row-major.
    cell_offsets: [[U32<LE>; 2]; CELL_COUNT],
}

impl GraphTileHeader {
    /// The graph ID of this tile (object index zero).
    #[inline]
    pub fn graph_id(&self) -> GraphId {
        // Safety: written by the tile builder as a packed graph ID.
        unsafe { GraphId::from_id_unchecked(self.graph_id.get()) }
    }

    #[inline]
    pub fn node_count(&self) -> u32 {
        self.node_count.get()
    }

    #[inline]
    pub fn directed_edge_count(&self) -> u32 {
        self.directed_edge_count.get()
    }

    #[inline]
    pub fn sign_count(&self) -> u32 {
        self.sign_count.get()
    }

    #[inline]
    pub fn admin_count(&self) -> u32 {
        self.admin_count.get()
    }

    #[inline]
    pub fn departure_count(&self) -> u32 {
        self.departure_count.get()
    }

    #[inline]
    pub fn stop_count(&self) -> u32 {
        self.stop_count.get()
    }

    #[inline]
    pub fn route_count(&self) -> u32 {
        self.route_count.get()
    }

    #[inline]
    pub fn transfer_count(&self) -> u32 {
        self.transfer_count.get()
    }

    #[inline]
    pub fn access_restriction_count(&self) -> u32 {
        self.access_restriction_count.get()
    }

    #[inline]
    pub fn edge_info_offset(&self) -> u64 {
        self.edge_info_offset.get()
    }

    #[inline]
    pub fn text_list_offset(&self) -> u64 {
        self.text_list_offset.get()
    }

    #[inline]
    pub fn file_size(&self) -> u64 {
        self.file_size.get()
    }

    /// The raw creation date (days since the pivot date).
    #[inline]
    pub fn date_created(&self) -> u32 {
        self.date_created.get()
    }

    /// The creation date as a calendar date.
    pub fn create_date(&self) -> NaiveDate {
        pivot_date() + Days::new(u64::from(self.date_created.get()))
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version.get()
    }

    /// The edge-cell grid dimension (cells per side of the grid).
    #[inline]
    pub fn grid_dim(&self) -> u8 {
        self.grid_dim
    }

    /// The `[begin, end)` offsets into the edge-cell section for the cell at
    /// `(column, row)`.
    ///
    /// Callers must have validated the column and row against
    /// [`GraphTileHeader::grid_dim`].
    #[inline]
    pub(crate) fn cell_offset(&self, column: usize, row: usize) -> (u32, u32) {
        let pair = self.cell_offsets[row * CELL_DIM + column];
        (pair[0].get(), pair[1].get())
    }

    /// All cell offset pairs, row-major.
    pub(crate) fn cell_offsets(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.cell_offsets.iter().map(|pair| (pair[0].get(), pair[1].get()))
    }
}

#[cfg(test)]
impl GraphTileHeader {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        graph_id: GraphId,
        counts: super::test_tiles::SectionCounts,
        edge_info_offset: u64,
        text_list_offset: u64,
        file_size: u64,
        date_created: u32,
        cell_offsets: [[u32; 2]; CELL_COUNT],
    ) -> Self {
        Self {
            graph_id: U64::new(graph_id.value()),
            node_count: U32::new(counts.nodes),
            directed_edge_count: U32::new(counts.directed_edges),
            sign_count: U32::new(counts.signs),
            admin_count: U32::new(counts.admins),
            departure_count: U32::new(counts.departures),
            stop_count: U32::new(counts.stops),
            route_count: U32::new(counts.routes),
            transfer_count: U32::new(counts.transfers),
            access_restriction_count: U32::new(counts.access_restrictions),
            edge_info_offset: U64::new(edge_info_offset),
            text_list_offset: U64::new(text_list_offset),
            file_size: U64::new(file_size),
            date_created: U32::new(date_created),
            version: U32::new(GRAPH_TILE_VERSION),
            grid_dim: CELL_DIM as u8,
            cell_offsets: cell_offsets.map(|pair| pair.map(U32::new)),
        }
    }
}
