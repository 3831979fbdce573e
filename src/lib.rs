#![doc = include_str!("../README.md")]

mod endian;
mod graph_id;
pub mod connectivity_map;
pub mod graph_tile;
pub mod shape_codec;
pub mod tile_hierarchy;
pub mod tile_provider;
pub mod tiles;
pub mod traffic_tile;

use enumset::{EnumSet, EnumSetType, enum_set};
use std::borrow::Cow;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// The leaf modules are deep; re-export the most commonly passed-around types
// at the crate root so callers don't need three-level paths for everything.
pub use graph_id::{GraphId, InvalidGraphIdError};

/// The number of edge-index cells along one side of a tile's spatial grid.
///
/// This matches the sub-cell count of the spatial tiling, and the on-disk
/// header records the same value per tile.
pub const CELL_DIM: usize = 5;

/// The total number of edge-index cells in a tile.
pub(crate) const CELL_COUNT: usize = CELL_DIM * CELL_DIM;

/// Road class; broad hierarchy of relative importance.
///
/// Each hierarchy level stores roads down to a minimum class;
/// coarse levels only carry the important ones.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Unclassified,
    Residential,
    ServiceOther,
}

impl RoadClass {
    pub(crate) const fn into_bits(self) -> u8 {
        self as _
    }

    pub(crate) const fn from_bits(value: u8) -> Self {
        match value & 0b111 {
            0 => Self::Motorway,
            1 => Self::Trunk,
            2 => Self::Primary,
            3 => Self::Secondary,
            4 => Self::Tertiary,
            5 => Self::Unclassified,
            6 => Self::Residential,
            _ => Self::ServiceOther,
        }
    }
}

/// Generalized surface type, ordered from best to worst.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum Surface {
    PavedSmooth,
    Paved,
    PavedRough,
    Compacted,
    Dirt,
    Gravel,
    Path,
    Impassable,
}

impl Surface {
    pub(crate) const fn into_bits(self) -> u8 {
        self as _
    }

    pub(crate) const fn from_bits(value: u8) -> Self {
        match value & 0b111 {
            0 => Self::PavedSmooth,
            1 => Self::Paved,
            2 => Self::PavedRough,
            3 => Self::Compacted,
            4 => Self::Dirt,
            5 => Self::Gravel,
            6 => Self::Path,
            _ => Self::Impassable,
        }
    }
}

/// Sub-categorization of roads based on specialized usage.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum RoadUse {
    /// Standard road (the default).
    Road = 0,
    /// Entrance or exit ramp.
    Ramp = 1,
    /// Turn channel.
    TurnChannel = 2,
    /// Agricultural or forest track.
    Track = 3,
    Driveway = 4,
    Alley = 5,
    ParkingAisle = 6,
    EmergencyAccess = 7,
    DriveThru = 8,
    /// Loop connected to another edge at a single node.
    CulDeSac = 9,
    /// A dedicated bicycle path.
    Cycleway = 20,
    MountainBike = 21,
    Footway = 25,
    Steps = 26,
    Other = 40,
    Ferry = 41,
    RailFerry = 42,
    /// A rail line (subway, metro, train).
    Rail = 50,
    /// A bus line.
    Bus = 51,
    /// Connection between the road network and a transit stop.
    TransitConnection = 54,
    // WARNING: this is a 6-bit field, so never add a value higher than 63!
}

impl RoadUse {
    pub(crate) const fn into_bits(self) -> u8 {
        self as _
    }

    pub(crate) const fn from_bits(value: u8) -> Self {
        match value {
            0 => RoadUse::Road,
            1 => RoadUse::Ramp,
            2 => RoadUse::TurnChannel,
            3 => RoadUse::Track,
            4 => RoadUse::Driveway,
            5 => RoadUse::Alley,
            6 => RoadUse::ParkingAisle,
            7 => RoadUse::EmergencyAccess,
            8 => RoadUse::DriveThru,
            9 => RoadUse::CulDeSac,
            20 => RoadUse::Cycleway,
            21 => RoadUse::MountainBike,
            25 => RoadUse::Footway,
            26 => RoadUse::Steps,
            41 => RoadUse::Ferry,
            42 => RoadUse::RailFerry,
            50 => RoadUse::Rail,
            51 => RoadUse::Bus,
            54 => RoadUse::TransitConnection,
            _ => RoadUse::Other,
        }
    }
}

/// Access permission by travel mode.
///
/// Stored as an 8-bit field in nodes and directed edges,
/// so this enum must never grow beyond eight variants.
#[derive(Debug, EnumSetType)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[enumset(repr = "u8")]
pub enum Access {
    Auto,
    Pedestrian,
    Bicycle,
    Truck,
    Emergency,
    Taxi,
    Bus,
    HOV,
}

pub const VEHICULAR_ACCESS: EnumSet<Access> = enum_set!(
    Access::Auto | Access::Truck | Access::Taxi | Access::Bus | Access::HOV
);

/// The type of cycle lane along an edge (if any).
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum CycleLane {
    None,
    /// Shared use lane (could be shared with pedestrians).
    Shared,
    /// Dedicated cycling lane.
    Dedicated,
    /// A separate cycling lane (physical separation from the main carriageway).
    Separated,
}

impl CycleLane {
    pub(crate) const fn into_bits(self) -> u8 {
        self as _
    }

    pub(crate) const fn from_bits(value: u8) -> Self {
        match value & 0b11 {
            0 => Self::None,
            1 => Self::Shared,
            2 => Self::Dedicated,
            _ => Self::Separated,
        }
    }
}

pub(crate) trait AsCowStr {
    /// Converts the value to a [`Cow<str>`],
    /// interpreting the bytes as UTF-8 (lossily if needed)
    /// and stopping before the first null byte.
    /// The result may be empty.
    fn as_cow_str(&self) -> Cow<'_, str>;
}

impl AsCowStr for [u8] {
    fn as_cow_str(&self) -> Cow<'_, str> {
        let null_index = self.iter().position(|c| *c == 0).unwrap_or(self.len());
        String::from_utf8_lossy(&self[0..null_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enumset::EnumSet;

    #[test]
    fn test_access_representation() {
        let set: EnumSet<Access> = EnumSet::from_repr(128);
        assert_eq!(set.len(), 1);
        assert!(set.contains(Access::HOV));
    }

    #[test]
    fn test_all_access_representation() {
        let set: EnumSet<Access> = EnumSet::all();
        assert_eq!(set.len(), 8);
        assert_eq!(set.as_repr(), 255);
    }

    #[test]
    fn test_road_class_round_trip() {
        for value in 0..8u8 {
            assert_eq!(RoadClass::from_bits(value).into_bits(), value);
        }
    }

    #[test]
    fn test_cow_str_stops_at_null() {
        let bytes = b"main street\0garbage";
        assert_eq!(bytes.as_cow_str(), "main street");
    }
}
