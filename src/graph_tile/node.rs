use crate::Access;
use bitfield_struct::bitfield;
use enumset::EnumSet;
use geo::{Coord, coord};
use zerocopy::{LE, U32, U64};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Fixed-point scale for node coordinate offsets (degrees per unit).
const COORDINATE_PRECISION: f64 = 1e-6;

/// Max number of edges whose pairwise name consistency is tracked per node.
const MAX_LOCAL_EDGES: u8 = 8;

/// The type of a graph node.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NodeType {
    /// An ordinary road intersection (the default).
    StreetIntersection,
    Gate,
    Bollard,
    TollBooth,
    /// A transit stop connected into the road network.
    TransitStop,
    BikeShare,
    Parking,
    MotorwayJunction,
}

impl NodeType {
    const fn into_bits(self) -> u8 {
        self as _
    }

    const fn from_bits(value: u8) -> Self {
        match value {
            0 => NodeType::StreetIntersection,
            1 => NodeType::Gate,
            2 => NodeType::Bollard,
            3 => NodeType::TollBooth,
            4 => NodeType::TransitStop,
            5 => NodeType::BikeShare,
            6 => NodeType::Parking,
            7 => NodeType::MotorwayJunction,
            _ => panic!("Invalid NodeType bit pattern."),
        }
    }
}

#[bitfield(u64,
    repr = U64<LE>,
    from = crate::endian::conv_u64le::from_inner,
    into = crate::endian::conv_u64le::into_inner
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, PartialEq)]
struct AttributesBitfield {
    #[bits(32)]
    edge_index: u32,
    #[bits(7)]
    edge_count: u8,
    #[bits(8)]
    access: u8,
    #[bits(4)]
    node_type: NodeType,
    #[bits(4)]
    density: u8,
    #[bits(9)]
    _spare: u16,
}

#[bitfield(u64,
    repr = U64<LE>,
    from = crate::endian::conv_u64le::from_inner,
    into = crate::endian::conv_u64le::into_inner
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, PartialEq)]
struct RegionBitfield {
    #[bits(12)]
    admin_index: u16,
    #[bits(9)]
    time_zone_index: u16,
    /// One bit per unordered pair of local edges (28 pairs of 8 edges).
    #[bits(28)]
    name_consistency: u32,
    #[bits(15)]
    _spare: u16,
}

/// Information for a node within the graph.
///
/// The graph uses a forward star structure: a node points at its first
/// outbound directed edge and carries the count of consecutive edges that
/// follow; each directed edge points at its end node.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Debug, PartialEq)]
#[repr(C)]
pub struct NodeInfo {
    /// Fixed-point (1e-6 degree) latitude offset from the tile's SW corner.
    lat_offset: U32<LE>,
    /// Fixed-point (1e-6 degree) longitude offset from the tile's SW corner.
    lon_offset: U32<LE>,
    attributes: AttributesBitfield,
    region: RegionBitfield,
    _reserved: U64<LE>,
}

impl NodeInfo {
    /// Gets the coordinate of the node.
    ///
    /// Positions are stored as offsets from the tile's SW corner, so the
    /// corner (from the level tiling) is required to compute the absolute
    /// position.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn coordinate(&self, sw_corner: Coord<f32>) -> Coord<f32> {
        // Offsets are unpacked in f64 to avoid losing the 1e-6 resolution
        // before the final narrowing.
        let lat_offset = f64::from(self.lat_offset.get()) * COORDINATE_PRECISION;
        let lon_offset = f64::from(self.lon_offset.get()) * COORDINATE_PRECISION;
        sw_corner + coord! {x: lon_offset as f32, y: lat_offset as f32}
    }

    /// The access mask for this node.
    #[inline]
    pub fn access(&self) -> EnumSet<Access> {
        EnumSet::from_repr(self.attributes.access())
    }

    /// The index within this tile of the node's first outbound directed edge.
    #[inline]
    pub fn edge_index(&self) -> u32 {
        self.attributes.edge_index()
    }

    /// The number of outbound edges from this node.
    #[inline]
    pub fn edge_count(&self) -> u8 {
        self.attributes.edge_count()
    }

    /// The index of the admin region containing this node (in the tile's
    /// admin list).
    #[inline]
    pub fn admin_index(&self) -> u16 {
        self.region.admin_index()
    }

    /// The node's time zone index.
    #[inline]
    pub fn time_zone_index(&self) -> u16 {
        self.region.time_zone_index()
    }

    /// The type of node.
    #[inline]
    pub fn node_type(&self) -> NodeType {
        self.attributes.node_type()
    }

    /// The relative road density at the node (0-15).
    #[inline]
    pub fn density(&self) -> u8 {
        self.attributes.density()
    }

    /// Do two local edges at this node carry a consistent name?
    ///
    /// Returns `None` for out-of-range edge indices (only the first 8 local
    /// edges are tracked). An edge is trivially consistent with itself.
    pub fn name_consistency(&self, from: u8, to: u8) -> Option<bool> {
        if from >= MAX_LOCAL_EDGES || to >= MAX_LOCAL_EDGES {
            return None;
        }
        if from == to {
            return Some(true);
        }
        // Triangular index over unordered pairs (i < j): j*(j-1)/2 + i.
        let (i, j) = (u32::from(from.min(to)), u32::from(from.max(to)));
        let bit = j * (j - 1) / 2 + i;
        Some(self.region.name_consistency() & (1 << bit) != 0)
    }
}

#[cfg(test)]
impl NodeInfo {
    pub(crate) fn new(
        lat_offset: u32,
        lon_offset: u32,
        edge_index: u32,
        edge_count: u8,
        access: EnumSet<Access>,
        admin_index: u16,
    ) -> Self {
        Self {
            lat_offset: U32::new(lat_offset),
            lon_offset: U32::new(lon_offset),
            attributes: AttributesBitfield::new()
                .with_edge_index(edge_index)
                .with_edge_count(edge_count)
                .with_access(access.as_repr())
                .with_node_type(NodeType::StreetIntersection)
                .with_density(0),
            region: RegionBitfield::new().with_admin_index(admin_index),
            _reserved: U64::new(0),
        }
    }

    pub(crate) fn with_name_consistency(mut self, from: u8, to: u8) -> Self {
        let (i, j) = (u32::from(from.min(to)), u32::from(from.max(to)));
        let bit = j * (j - 1) / 2 + i;
        self.region = self
            .region
            .with_name_consistency(self.region.name_consistency() | (1 << bit));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enumset::enum_set;

    #[test]
    fn test_node_size() {
        assert_eq!(size_of::<NodeInfo>(), 32);
    }

    #[test]
    fn test_coordinate() {
        // 0.5 degrees north and 0.25 east of the corner.
        let node = NodeInfo::new(500_000, 250_000, 0, 0, EnumSet::all(), 0);
        let coordinate = node.coordinate(coord! {x: 8.0f32, y: 47.0f32});
        assert!((coordinate.x - 8.25).abs() < 1e-5);
        assert!((coordinate.y - 47.5).abs() < 1e-5);
    }

    #[test]
    fn test_access() {
        let node = NodeInfo::new(0, 0, 0, 0, enum_set!(Access::Auto | Access::Bicycle), 0);
        assert_eq!(node.access(), enum_set!(Access::Auto | Access::Bicycle));
    }

    #[test]
    fn test_forward_star_fields() {
        let node = NodeInfo::new(0, 0, 17, 3, EnumSet::all(), 5);
        assert_eq!(node.edge_index(), 17);
        assert_eq!(node.edge_count(), 3);
        assert_eq!(node.admin_index(), 5);
    }

    #[test]
    fn test_name_consistency() {
        let node = NodeInfo::new(0, 0, 0, 0, EnumSet::all(), 0).with_name_consistency(0, 2);
        assert_eq!(node.name_consistency(0, 2), Some(true));
        assert_eq!(node.name_consistency(2, 0), Some(true));
        assert_eq!(node.name_consistency(0, 1), Some(false));
        assert_eq!(node.name_consistency(3, 3), Some(true));
        assert_eq!(node.name_consistency(0, 8), None);
    }
}
