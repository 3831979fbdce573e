use crate::{Access, CycleLane, GraphId, RoadClass, RoadUse, Surface};
use bitfield_struct::bitfield;
use enumset::EnumSet;
use zerocopy::{LE, U64};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

#[bitfield(u64,
    repr = U64<LE>,
    from = crate::endian::conv_u64le::from_inner,
    into = crate::endian::conv_u64le::into_inner
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct EndNodeBitfield {
    #[bits(46)]
    end_node: u64,
    /// Turn restriction mask over the local edge indices at the end node.
    #[bits(8)]
    restrictions: u8,
    #[bits(7)]
    opposing_local_edge_index: u8,
    // Single-bit flags are stored as u8 rather than bool so every bit
    // pattern is structurally valid for zero-copy projection.
    #[bits(1)]
    trans_up: u8,
    #[bits(1)]
    trans_down: u8,
    #[bits(1)]
    country_crossing: u8,
}

#[bitfield(u64,
    repr = U64<LE>,
    from = crate::endian::conv_u64le::from_inner,
    into = crate::endian::conv_u64le::into_inner
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct GeometryBitfield {
    /// Byte offset of this edge's record in the edge-info region.
    #[bits(25)]
    edge_info_offset: u32,
    /// Length in meters.
    #[bits(24)]
    length: u32,
    /// Speed in kph.
    #[bits(8)]
    speed: u8,
    #[bits(4)]
    weighted_grade: u8,
    #[bits(1)]
    dest_only: u8,
    #[bits(1)]
    not_thru: u8,
    #[bits(1)]
    drive_on_right: u8,
}

#[bitfield(u64,
    repr = U64<LE>,
    from = crate::endian::conv_u64le::from_inner,
    into = crate::endian::conv_u64le::into_inner
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct AttributesBitfield {
    #[bits(8)]
    forward_access: u8,
    #[bits(8)]
    reverse_access: u8,
    #[bits(3)]
    classification: RoadClass,
    #[bits(6)]
    edge_use: RoadUse,
    #[bits(3)]
    surface: Surface,
    #[bits(2)]
    cycle_lane: CycleLane,
    #[bits(7)]
    local_edge_index: u8,
    #[bits(27)]
    _spare: u32,
}

/// A directed edge within the routing graph.
///
/// This record contains the essential edge information needed for routing
/// decisions. Supplementary details (shape, names, way id) live in the
/// variable-size [`EdgeInfo`](super::EdgeInfo) record the edge points at.
///
/// Directed edges are stored in the same tile as their originating node;
/// an edge leaving the tile encodes the opposing node's tile in its end
/// node graph id.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Debug)]
#[repr(C)]
pub struct DirectedEdge {
    end_node: EndNodeBitfield,
    geometry: GeometryBitfield,
    attributes: AttributesBitfield,
    _reserved: U64<LE>,
}

impl DirectedEdge {
    /// The graph ID of the end node of this directed edge.
    ///
    /// The end node may be in another tile.
    #[inline]
    pub fn end_node_id(&self) -> GraphId {
        // Safety: the field is 46 bits, so the packed value cannot overflow
        // any component.
        unsafe { GraphId::from_id_unchecked(self.end_node.end_node()) }
    }

    /// The turn restriction mask over local edge indices at the end node.
    ///
    /// Bit `n` set means turning onto the end node's local edge `n` is
    /// restricted.
    #[inline]
    pub fn restrictions(&self) -> u8 {
        self.end_node.restrictions()
    }

    /// The index (at the end node, on its local level) of the opposing
    /// directed edge. Used to find the start node of this edge.
    #[inline]
    pub fn opposing_local_edge_index(&self) -> u8 {
        self.end_node.opposing_local_edge_index()
    }

    /// Does this edge transition up to a coarser hierarchy level?
    #[inline]
    pub fn trans_up(&self) -> bool {
        self.end_node.trans_up() != 0
    }

    /// Does this edge transition down to a finer hierarchy level?
    #[inline]
    pub fn trans_down(&self) -> bool {
        self.end_node.trans_down() != 0
    }

    /// Does this edge cross a country boundary?
    #[inline]
    pub fn country_crossing(&self) -> bool {
        self.end_node.country_crossing() != 0
    }

    /// The byte offset of this edge's record in the edge-info region.
    #[inline]
    pub fn edge_info_offset(&self) -> u32 {
        self.geometry.edge_info_offset()
    }

    /// The edge length in meters.
    #[inline]
    pub fn length(&self) -> u32 {
        self.geometry.length()
    }

    /// The edge speed in kph.
    #[inline]
    pub fn speed(&self) -> u8 {
        self.geometry.speed()
    }

    /// The weighted estimate of the grade along the edge (0-15).
    #[inline]
    pub fn weighted_grade(&self) -> u8 {
        self.geometry.weighted_grade()
    }

    /// Is access restricted to destination traffic?
    #[inline]
    pub fn dest_only(&self) -> bool {
        self.geometry.dest_only() != 0
    }

    /// Does this edge lead to a dead end (for through traffic)?
    #[inline]
    pub fn not_thru(&self) -> bool {
        self.geometry.not_thru() != 0
    }

    /// Do you drive on the right hand side of the road along this edge?
    #[inline]
    pub fn drive_on_right(&self) -> bool {
        self.geometry.drive_on_right() != 0
    }

    /// The access mask in the forward direction.
    #[inline]
    pub fn forward_access(&self) -> EnumSet<Access> {
        EnumSet::from_repr(self.attributes.forward_access())
    }

    /// The access mask in the reverse direction.
    #[inline]
    pub fn reverse_access(&self) -> EnumSet<Access> {
        EnumSet::from_repr(self.attributes.reverse_access())
    }

    /// The road classification.
    #[inline]
    pub fn classification(&self) -> RoadClass {
        self.attributes.classification()
    }

    /// The way the edge is used.
    #[inline]
    pub fn edge_use(&self) -> RoadUse {
        self.attributes.edge_use()
    }

    /// Is this a transit line (bus or rail)?
    #[inline]
    pub fn is_transit_line(&self) -> bool {
        let edge_use = self.edge_use();
        edge_use == RoadUse::Rail || edge_use == RoadUse::Bus
    }

    /// The surface type.
    #[inline]
    pub fn surface(&self) -> Surface {
        self.attributes.surface()
    }

    /// The cycle lane type along this edge.
    #[inline]
    pub fn cycle_lane(&self) -> CycleLane {
        self.attributes.cycle_lane()
    }

    /// The index of this edge among its start node's local edges.
    #[inline]
    pub fn local_edge_index(&self) -> u8 {
        self.attributes.local_edge_index()
    }
}

#[cfg(test)]
impl DirectedEdge {
    pub(crate) fn new(end_node: GraphId, length: u32, edge_info_offset: u32) -> Self {
        Self {
            end_node: EndNodeBitfield::new().with_end_node(end_node.value()),
            geometry: GeometryBitfield::new()
                .with_edge_info_offset(edge_info_offset)
                .with_length(length)
                .with_speed(50)
                .with_drive_on_right(1),
            attributes: AttributesBitfield::new()
                .with_forward_access(EnumSet::<Access>::all().as_repr())
                .with_reverse_access(EnumSet::<Access>::all().as_repr())
                .with_classification(RoadClass::Residential)
                .with_edge_use(RoadUse::Road)
                .with_surface(Surface::Paved)
                .with_cycle_lane(CycleLane::None),
            _reserved: U64::new(0),
        }
    }

    pub(crate) fn with_use(mut self, edge_use: RoadUse) -> Self {
        self.attributes = self.attributes.with_edge_use(edge_use);
        self
    }
}
