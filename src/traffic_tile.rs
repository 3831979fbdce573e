//! # Live traffic overlay
//!
//! Traffic data lives in a separate, fixed-layout file per graph tile:
//! a header, one speed record per directed edge, and two parallel incident
//! buffers the writer flips between. The file is shared with an external
//! writer process, so it is memory-mapped and every read is volatile.
//!
//! Layout:
//!
//! ```text
//! TrafficTileHeader                (24 bytes)
//! n x Speed                        (n x 2 bytes)
//! incident count, buffer 0         (4 bytes)
//! incident count, buffer 1         (4 bytes)
//! m x Incident, buffer 0           (m x 8 bytes)
//! m x Incident, buffer 1           (m x 8 bytes)
//! ```
//!
//! The reader selects the active incident buffer by reading the header's
//! 1-bit `active_incident_buffer` field exactly once per query; the writer
//! fills the inactive buffer and flips that bit atomically. Nothing else is
//! synchronized, so readers must not assume tear-free reads of arbitrary
//! record fields - the per-record types here are all 8 bytes or less, which
//! current platforms load atomically when the writer stores whole records.

use bitfield_struct::bitfield;
use memmap2::MmapOptions;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::{FromBytes as DeriveFromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

#[bitfield(u64,
    repr = U64<LE>,
    from = crate::endian::conv_u64le::from_inner,
    into = crate::endian::conv_u64le::into_inner
)]
#[derive(DeriveFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct UpdateBitfield {
    #[bits(1)]
    active_incident_buffer: u8,
    /// Seconds since the Unix epoch of the last writer update.
    #[bits(63)]
    last_update: u64,
}

/// The header of a traffic tile.
#[derive(DeriveFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Debug)]
#[repr(C)]
pub struct TrafficTileHeader {
    tile_id: U64<LE>,
    directed_edge_count: U32<LE>,
    /// The capacity of each incident buffer, in records.
    incident_buffer_size: U32<LE>,
    update: UpdateBitfield,
}

impl TrafficTileHeader {
    /// The packed graph ID of the tile this overlay describes.
    #[inline]
    pub fn tile_id(&self) -> u64 {
        self.tile_id.get()
    }

    #[inline]
    pub fn directed_edge_count(&self) -> u32 {
        self.directed_edge_count.get()
    }

    #[inline]
    pub fn incident_buffer_size(&self) -> u32 {
        self.incident_buffer_size.get()
    }

    /// Which incident buffer (0 or 1) readers should use right now.
    #[inline]
    pub fn active_incident_buffer(&self) -> u8 {
        self.update.active_incident_buffer()
    }

    /// Seconds since the Unix epoch of the last writer update.
    #[inline]
    pub fn last_update(&self) -> u64 {
        self.update.last_update()
    }
}

#[cfg(test)]
impl TrafficTileHeader {
    pub(crate) fn new(
        tile_id: u64,
        directed_edge_count: u32,
        incident_buffer_size: u32,
        active_incident_buffer: u8,
        last_update: u64,
    ) -> Self {
        Self {
            tile_id: U64::new(tile_id),
            directed_edge_count: U32::new(directed_edge_count),
            incident_buffer_size: U32::new(incident_buffer_size),
            update: UpdateBitfield::new()
                .with_active_incident_buffer(active_incident_buffer)
                .with_last_update(last_update),
        }
    }
}

/// Live speed information for one directed edge.
///
/// A zeroed record means "no data".
#[bitfield(u16,
    repr = U16<LE>,
    from = crate::endian::conv_u16le::from_inner,
    into = crate::endian::conv_u16le::into_inner
)]
#[derive(DeriveFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, PartialEq, Eq)]
pub struct Speed {
    /// Speed in km/h (0-127).
    #[bits(7)]
    pub speed_kmh: u8,
    /// Congestion level from 0 (unknown) to 7.
    #[bits(3)]
    pub congestion_level: u8,
    /// Treat the speed as a scale factor over the edge's base speed instead
    /// of an absolute value.
    #[bits(1)]
    pub is_scale: u8,
    /// Age of the observation, in writer-defined units.
    #[bits(4)]
    pub age: u8,
    /// Set when the active incident buffer has records for this edge.
    #[bits(1)]
    pub has_incident: u8,
}

/// A single incident record.
#[bitfield(u64,
    repr = U64<LE>,
    from = crate::endian::conv_u64le::from_inner,
    into = crate::endian::conv_u64le::into_inner
)]
#[derive(DeriveFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, PartialEq, Eq)]
pub struct Incident {
    /// The directed edge (by index within the tile) the incident is on.
    #[bits(21)]
    pub edge_index: u32,
    #[bits(8)]
    pub incident_type: u8,
    /// Start position along the edge, in 1/1023 units of its length.
    #[bits(10)]
    pub start_location: u16,
    /// Extent along the edge, in 1/1023 units of its length.
    #[bits(10)]
    pub length: u16,
    #[bits(15)]
    _spare: u16,
}

const HEADER_SIZE: usize = size_of::<TrafficTileHeader>();
const SPEED_SIZE: usize = size_of::<Speed>();
const INCIDENT_SIZE: usize = size_of::<Incident>();

/// A read-only view of one tile's live traffic overlay.
///
/// An absent overlay is a valid state: every query returns "no data". The
/// backing memory map is shared with the writer process, which updates
/// records and the active-buffer bit in place.
pub struct TrafficTile {
    mmap: Option<Arc<memmap2::MmapRaw>>,
}

impl TrafficTile {
    /// An absent overlay; all queries return empty results.
    pub fn empty() -> Self {
        Self { mmap: None }
    }

    /// Maps the traffic tile at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file can't be opened or mapped, or if its size doesn't
    /// cover the layout the header describes.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mmap = MmapOptions::new().map_raw_read_only(&file)?;
        if mmap.len() < HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "traffic tile is smaller than its header",
            ));
        }

        let len = mmap.len();
        let tile = Self {
            mmap: Some(Arc::new(mmap)),
        };
        if let Some(header) = tile.header() {
            let expected =
                layout_size(header.directed_edge_count(), header.incident_buffer_size());
            if len < expected {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "traffic tile is smaller than the layout its header describes",
                ));
            }
        }

        Ok(tile)
    }

    /// Is there an overlay mapped at all?
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.mmap.is_some()
    }

    /// Reads a `T` at `offset`, volatile.
    ///
    /// Every record type here has alignment 1 (endian-aware storage), so
    /// the volatile read is legal at any offset.
    fn read_at<T: FromBytes>(&self, offset: usize) -> Option<T> {
        let mmap = self.mmap.as_ref()?;
        if offset + size_of::<T>() > mmap.len() {
            return None;
        }
        // SAFETY: the range is in bounds (checked above, and the map cannot
        // shrink: the layout size was validated at open). The writer mutates
        // the mapping concurrently, which volatile reads tolerate; field
        // tearing is accepted per the format contract.
        Some(unsafe { mmap.as_ptr().add(offset).cast::<T>().read_volatile() })
    }

    /// A snapshot of the overlay header, or `None` when the overlay is
    /// absent.
    ///
    /// Each call re-reads the header; the writer updates it in place.
    pub fn header(&self) -> Option<TrafficTileHeader> {
        self.read_at(0)
    }

    /// The live speed record for a directed edge.
    ///
    /// Returns the "no data" record when the overlay is absent or the index
    /// is outside the edge count the overlay was built for.
    pub fn get_speed(&self, edge_index: u32) -> Speed {
        let Some(header) = self.header() else {
            return Speed::new();
        };
        if edge_index >= header.directed_edge_count() {
            return Speed::new();
        }
        self.read_at(HEADER_SIZE + SPEED_SIZE * edge_index as usize)
            .unwrap_or_else(Speed::new)
    }

    /// The incidents currently recorded for a directed edge.
    ///
    /// Selects the active incident buffer with a single read of the header's
    /// active-buffer bit, then binary-searches that buffer (it is sorted by
    /// edge index). Returns an empty list when the overlay is absent, the
    /// edge has no incident flag, or nothing matches.
    pub fn get_incidents(&self, edge_index: u32) -> Vec<Incident> {
        let Some(header) = self.header() else {
            return Vec::new();
        };
        if edge_index >= header.directed_edge_count() || self.get_speed(edge_index).has_incident() == 0
        {
            return Vec::new();
        }

        // One read of the active bit; the writer may flip it mid-query, but
        // this query then completes consistently against the old buffer.
        let active = header.active_incident_buffer();
        let buffer_size = header.incident_buffer_size();
        let counts_offset = HEADER_SIZE + SPEED_SIZE * header.directed_edge_count() as usize;
        let count: u32 = self
            .read_at::<U32<LE>>(counts_offset + 4 * usize::from(active))
            .map_or(0, |count| count.get())
            .min(buffer_size);

        let buffer_offset = counts_offset
            + 2 * size_of::<U32<LE>>()
            + usize::from(active) * INCIDENT_SIZE * buffer_size as usize;
        let read_incident = |index: u32| -> Option<Incident> {
            self.read_at(buffer_offset + INCIDENT_SIZE * index as usize)
        };

        // Lower bound of the matching run.
        let mut low = 0u32;
        let mut high = count;
        while low < high {
            let mid = (low + high) / 2;
            match read_incident(mid) {
                Some(incident) if incident.edge_index() < edge_index => low = mid + 1,
                Some(_) => high = mid,
                None => return Vec::new(),
            }
        }

        let mut incidents = Vec::new();
        let mut index = low;
        while index < count {
            match read_incident(index) {
                Some(incident) if incident.edge_index() == edge_index => {
                    incidents.push(incident);
                }
                _ => break,
            }
            index += 1;
        }
        incidents
    }
}

/// The byte size of a traffic tile with the given dimensions.
fn layout_size(directed_edge_count: u32, incident_buffer_size: u32) -> usize {
    HEADER_SIZE
        + SPEED_SIZE * directed_edge_count as usize
        + 2 * size_of::<U32<LE>>()
        + 2 * INCIDENT_SIZE * incident_buffer_size as usize
}
