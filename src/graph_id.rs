use std::fmt::{Display, Formatter};
use thiserror::Error;
use zerocopy::{LE, U64};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

/// The max valid hierarchy level.
///
/// There are 3 bits for the hierarchy level.
const MAX_HIERARCHY_LEVEL: u8 = (1 << 3) - 1;

/// The max valid tile ID.
///
/// There are 22 bits for the tile ID.
const MAX_TILE_ID: u64 = (1 << 22) - 1;

/// The max valid index within a tile.
///
/// There are 21 bits for the index within the tile.
const MAX_TILE_INDEX: u64 = (1 << 21) - 1;

/// All 64 bits set; the designated invalid identifier.
const INVALID_GRAPH_ID: u64 = u64::MAX;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidGraphIdError {
    #[error("level is larger than the maximum allowed value")]
    Level,
    #[error("tile ID is larger than the maximum allowed value")]
    TileId,
    #[error("tile index is larger than the maximum allowed value")]
    TileIndex,
}

/// An identifier of a node or edge within the tiled, hierarchical graph.
///
/// It packs a hierarchy level, tile ID, and an object index within the tile
/// into a 64-bit integer. Every cross-reference in the graph - an edge's end
/// node, a node's edges in another level - is one of these values; nothing in
/// a tile stores a pointer.
///
/// # Bit field layout
///
/// ```text
///        MSb                                     LSb
///        ▼                                       ▼
/// bit   64         46        25         3        0
/// pos    ┌──────────┬─────────┬─────────┬────────┐
///        │ RESERVED │ index   │ tileid  │ level  │
///        └──────────┴─────────┴─────────┴────────┘
/// size     18         21        22        3
/// ```
///
/// The all-ones value is reserved as the invalid identifier.
#[repr(C)]
#[derive(
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Unaligned,
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
)]
pub struct GraphId(U64<LE>);

impl GraphId {
    /// The invalid graph identifier (all bits set).
    pub const INVALID: GraphId = GraphId(U64::<LE>::from_bytes([0xff; 8]));

    /// Tries to construct a graph ID from the given components.
    ///
    /// # Errors
    ///
    /// This will fail if any argument contains a value greater than the
    /// allowed number of field bits:
    /// - `level` - 3 bits
    /// - `tile_id` - 22 bits
    /// - `index` - 21 bits
    #[inline]
    pub const fn try_from_components(
        level: u8,
        tile_id: u64,
        index: u64,
    ) -> Result<Self, InvalidGraphIdError> {
        if level > MAX_HIERARCHY_LEVEL {
            Err(InvalidGraphIdError::Level)
        } else if tile_id > MAX_TILE_ID {
            Err(InvalidGraphIdError::TileId)
        } else if index > MAX_TILE_INDEX {
            Err(InvalidGraphIdError::TileIndex)
        } else {
            Ok(Self(U64::<LE>::new(
                level as u64 | (tile_id << 3) | index << 25,
            )))
        }
    }

    /// Creates a graph ID from the given components without any validity checks.
    ///
    /// # Safety
    ///
    /// Out-of-range values silently corrupt neighboring fields,
    /// which shows up later as out-of-bounds level or tile lookups.
    pub const unsafe fn from_components_unchecked(level: u8, tile_id: u64, index: u64) -> Self {
        Self(U64::<LE>::new(level as u64 | (tile_id << 3) | index << 25))
    }

    /// Creates a graph ID from a raw packed value without any validity checks.
    ///
    /// # Safety
    ///
    /// The caller asserts that the value was packed by a trusted producer
    /// (e.g. read back out of a field known to hold a graph ID).
    pub const unsafe fn from_id_unchecked(id: u64) -> Self {
        Self(U64::<LE>::new(id))
    }

    /// Creates a new graph ID from the existing one, but with a new object index.
    /// This is how you address individual objects within a tile.
    ///
    /// # Errors
    ///
    /// See [`GraphId::try_from_components`].
    #[inline]
    pub const fn with_index(&self, index: u64) -> Result<Self, InvalidGraphIdError> {
        Self::try_from_components(self.level(), self.tile_id(), index)
    }

    /// Extracts the raw (packed) graph ID value.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0.get()
    }

    /// Is this a valid identifier?
    ///
    /// The all-ones bit pattern is reserved to mean "no such object".
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.value() != INVALID_GRAPH_ID
    }

    /// Gets the hierarchy level.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn level(&self) -> u8 {
        (self.value() & MAX_HIERARCHY_LEVEL as u64) as u8
    }

    /// Gets the tile ID within the level.
    #[inline]
    pub const fn tile_id(&self) -> u64 {
        (self.value() & 0x01ff_fff8) >> 3
    }

    /// Gets the object index within the tile.
    #[inline]
    pub const fn index(&self) -> u64 {
        (self.value() & 0x3fff_fe00_0000) >> 25
    }

    /// Returns a [`GraphId`] addressing the same tile with the object index
    /// zeroed. Tiles are identified (and named on disk) by their base ID.
    #[inline]
    #[must_use]
    pub const fn tile_base_id(&self) -> GraphId {
        GraphId(U64::<LE>::new(self.value() & 0x01ff_ffff))
    }
}

impl Display for GraphId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{}/{}/{}",
            self.level(),
            self.tile_id(),
            self.index()
        ))
    }
}

#[cfg(feature = "serde")]
impl Serialize for GraphId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0.get())
    }
}
