//! In-memory tile images for accessor tests.
//!
//! This is not a tile builder; it assembles just enough of the on-disk
//! layout to exercise the reader. Sections are written in the order the
//! caller adds records, so tests are responsible for respecting the sorting
//! invariants the reader relies on.

use super::{
    AccessRestriction, AccessRestrictionType, Admin, DirectedEdge, GraphTileHeader, NodeInfo,
    Sign, SignType, TransferType, TransitDeparture, TransitRoute, TransitStop, TransitTransfer,
    VehicleType,
};
use crate::{Access, CELL_COUNT, CELL_DIM, GraphId};
use enumset::EnumSet;
use zerocopy::IntoBytes;

/// Per-section record counts for building headers.
#[derive(Default, Clone, Copy)]
pub(crate) struct SectionCounts {
    pub nodes: u32,
    pub directed_edges: u32,
    pub signs: u32,
    pub admins: u32,
    pub departures: u32,
    pub stops: u32,
    pub routes: u32,
    pub transfers: u32,
    pub access_restrictions: u32,
}

pub(crate) struct TileImageBuilder {
    graph_id: GraphId,
    nodes: Vec<NodeInfo>,
    directed_edges: Vec<DirectedEdge>,
    departures: Vec<TransitDeparture>,
    stops: Vec<TransitStop>,
    routes: Vec<TransitRoute>,
    transfers: Vec<TransitTransfer>,
    access_restrictions: Vec<AccessRestriction>,
    signs: Vec<Sign>,
    admins: Vec<Admin>,
    pub(crate) edge_cells: Vec<GraphId>,
    cell_offsets: [[u32; 2]; CELL_COUNT],
    pub(crate) edge_info: Vec<u8>,
    text: Vec<u8>,
}

impl TileImageBuilder {
    pub(crate) const DATE_CREATED: u32 = 1000;

    /// A builder whose image is exactly one header: every count zero and all
    /// regions empty.
    pub(crate) fn empty(graph_id: GraphId) -> Self {
        Self {
            graph_id,
            nodes: Vec::new(),
            directed_edges: Vec::new(),
            departures: Vec::new(),
            stops: Vec::new(),
            routes: Vec::new(),
            transfers: Vec::new(),
            access_restrictions: Vec::new(),
            signs: Vec::new(),
            admins: Vec::new(),
            edge_cells: Vec::new(),
            cell_offsets: [[0; 2]; CELL_COUNT],
            edge_info: Vec::new(),
            text: Vec::new(),
        }
    }

    /// A builder with the customary empty string seeded at text offset 0.
    pub(crate) fn new(graph_id: GraphId) -> Self {
        let mut builder = Self::empty(graph_id);
        builder.text.push(0);
        builder
    }

    /// Appends a null-terminated string to the text list, returning its offset.
    pub(crate) fn add_text(&mut self, text: &str) -> u32 {
        let offset = self.text.len() as u32;
        self.text.extend_from_slice(text.as_bytes());
        self.text.push(0);
        offset
    }

    pub(crate) fn add_node(
        &mut self,
        lat_offset: u32,
        lon_offset: u32,
        edge_index: u32,
        edge_count: u8,
    ) {
        self.nodes.push(NodeInfo::new(
            lat_offset,
            lon_offset,
            edge_index,
            edge_count,
            EnumSet::<Access>::all(),
            0,
        ));
    }

    pub(crate) fn add_edge(&mut self, end_node: GraphId, length: u32) {
        self.directed_edges.push(DirectedEdge::new(end_node, length, 0));
    }

    pub(crate) fn add_sign(&mut self, edge_index: u32, sign_type: SignType, text_offset: u32) {
        self.signs.push(Sign::new(edge_index, sign_type, text_offset));
    }

    pub(crate) fn add_access_restriction(
        &mut self,
        edge_index: u32,
        restriction_type: AccessRestrictionType,
        value: u32,
    ) {
        self.access_restrictions
            .push(AccessRestriction::new(edge_index, restriction_type, value));
    }

    pub(crate) fn add_admin(
        &mut self,
        country_offset: u32,
        state_offset: u32,
        country_iso: [u8; 2],
        state_iso: [u8; 2],
    ) {
        self.admins
            .push(Admin::new(country_offset, state_offset, country_iso, state_iso));
    }

    pub(crate) fn add_departure(
        &mut self,
        line_id: u32,
        trip_id: u32,
        departure_time: u32,
        days_of_week: u8,
        days: u64,
    ) {
        self.departures.push(TransitDeparture::new(
            line_id,
            trip_id,
            0,
            departure_time,
            days_of_week,
            days,
            0,
        ));
    }

    pub(crate) fn add_stop(&mut self, stop_id: u32, name_offset: u32) {
        self.stops.push(TransitStop::new(stop_id, name_offset));
    }

    pub(crate) fn add_route(
        &mut self,
        route_id: u32,
        vehicle_type: VehicleType,
        short_name_offset: u32,
    ) {
        self.routes
            .push(TransitRoute::new(route_id, vehicle_type, short_name_offset));
    }

    pub(crate) fn add_transfer(
        &mut self,
        from_stop_id: u32,
        to_stop_id: u32,
        transfer_type: TransferType,
        min_transfer_time: u32,
    ) {
        self.transfers.push(TransitTransfer::new(
            from_stop_id,
            to_stop_id,
            transfer_type,
            min_transfer_time,
        ));
    }

    /// Sets the `[begin, end)` edge-cell range for the cell at `(column, row)`.
    pub(crate) fn set_cell_range(&mut self, column: usize, row: usize, begin: u32, end: u32) {
        self.cell_offsets[row * CELL_DIM + column] = [begin, end];
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for node in &self.nodes {
            body.extend_from_slice(node.as_bytes());
        }
        for edge in &self.directed_edges {
            body.extend_from_slice(edge.as_bytes());
        }
        for departure in &self.departures {
            body.extend_from_slice(departure.as_bytes());
        }
        for stop in &self.stops {
            body.extend_from_slice(stop.as_bytes());
        }
        for route in &self.routes {
            body.extend_from_slice(route.as_bytes());
        }
        for transfer in &self.transfers {
            body.extend_from_slice(transfer.as_bytes());
        }
        for restriction in &self.access_restrictions {
            body.extend_from_slice(restriction.as_bytes());
        }
        for sign in &self.signs {
            body.extend_from_slice(sign.as_bytes());
        }
        for admin in &self.admins {
            body.extend_from_slice(admin.as_bytes());
        }
        for cell in &self.edge_cells {
            body.extend_from_slice(cell.as_bytes());
        }

        let header_size = size_of::<GraphTileHeader>() as u64;
        let edge_info_offset = header_size + body.len() as u64;
        let text_list_offset = edge_info_offset + self.edge_info.len() as u64;
        let file_size = text_list_offset + self.text.len() as u64;

        let counts = SectionCounts {
            nodes: self.nodes.len() as u32,
            directed_edges: self.directed_edges.len() as u32,
            signs: self.signs.len() as u32,
            admins: self.admins.len() as u32,
            departures: self.departures.len() as u32,
            stops: self.stops.len() as u32,
            routes: self.routes.len() as u32,
            transfers: self.transfers.len() as u32,
            access_restrictions: self.access_restrictions.len() as u32,
        };
        let header = GraphTileHeader::new(
            self.graph_id,
            counts,
            edge_info_offset,
            text_list_offset,
            file_size,
            Self::DATE_CREATED,
            self.cell_offsets,
        );

        let mut image = header.as_bytes().to_vec();
        image.extend_from_slice(&body);
        image.extend_from_slice(&self.edge_info);
        image.extend_from_slice(&self.text);
        image
    }
}
