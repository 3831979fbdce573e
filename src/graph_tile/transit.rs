//! # Transit data structures
//!
//! Scheduled transit lives alongside the road network: departures, stops,
//! routes, and stop-to-stop transfers. The departure array is sorted by
//! (line id, departure time); routes are sorted by route id and transfers by
//! from-stop id, so the accessor can binary search all of them.

use bitfield_struct::bitfield;
use zerocopy::{LE, U32, U64};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// The length of the service day bitmap on a departure, in days.
pub const SCHEDULE_DAYS: u32 = 60;

/// The kind of vehicle serving a transit route.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum VehicleType {
    Tram,
    Metro,
    Rail,
    Bus,
    Ferry,
    CableCar,
    Gondola,
    Funicular,
}

impl VehicleType {
    const fn into_bits(self) -> u8 {
        self as _
    }

    const fn from_bits(value: u8) -> Self {
        match value {
            0 => VehicleType::Tram,
            1 => VehicleType::Metro,
            2 => VehicleType::Rail,
            3 => VehicleType::Bus,
            4 => VehicleType::Ferry,
            5 => VehicleType::CableCar,
            6 => VehicleType::Gondola,
            7 => VehicleType::Funicular,
            _ => panic!("Invalid VehicleType bit pattern."),
        }
    }
}

/// The type of a stop-to-stop transfer.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TransferType {
    /// A recommended transfer point between routes.
    Recommended,
    /// Departures wait for arriving passengers.
    Timed,
    /// The transfer requires a minimum amount of time.
    MinTime,
    /// Transfer is not possible between these stops.
    NotPossible,
}

impl TransferType {
    const fn into_bits(self) -> u8 {
        self as _
    }

    const fn from_bits(value: u8) -> Self {
        match value {
            0 => TransferType::Recommended,
            1 => TransferType::Timed,
            2 => TransferType::MinTime,
            3 => TransferType::NotPossible,
            _ => panic!("Invalid TransferType bit pattern."),
        }
    }
}

#[bitfield(u32,
    repr = U32<LE>,
    from = crate::endian::conv_u32le::from_inner,
    into = crate::endian::conv_u32le::into_inner
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct BlockBitfield {
    #[bits(25)]
    block_id: u32,
    /// Days of the week the departure runs; bit 0 is Sunday.
    #[bits(7)]
    days_of_week: u8,
}

#[bitfield(u32,
    repr = U32<LE>,
    from = crate::endian::conv_u32le::from_inner,
    into = crate::endian::conv_u32le::into_inner
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct TimeBitfield {
    /// Seconds from midnight (86400 seconds per day needs 17 bits).
    #[bits(17)]
    departure_time: u32,
    /// Seconds until arrival at the next stop.
    #[bits(15)]
    elapsed_time: u16,
}

/// A single departure from a transit stop along a line.
///
/// Each line id represents a unique departure/arrival stop pair and route;
/// `(line_id, trip_id)` identifies a departure uniquely within a tile.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Debug)]
#[repr(C)]
pub struct TransitDeparture {
    line_id: U32<LE>,
    trip_id: U32<LE>,
    route_id: U32<LE>,
    block: BlockBitfield,
    headsign_offset: U32<LE>,
    times: TimeBitfield,
    /// One bit per day of service for [`SCHEDULE_DAYS`] days following the
    /// tile's creation date.
    days: U64<LE>,
}

impl TransitDeparture {
    /// The line id; all departures along a stop pair + route share one.
    #[inline]
    pub fn line_id(&self) -> u32 {
        self.line_id.get()
    }

    /// The internal trip id of this departure.
    #[inline]
    pub fn trip_id(&self) -> u32 {
        self.trip_id.get()
    }

    /// The internal route id of this departure.
    #[inline]
    pub fn route_id(&self) -> u32 {
        self.route_id.get()
    }

    /// The block id of the trip (trips a rider can stay on share a block).
    #[inline]
    pub fn block_id(&self) -> u32 {
        self.block.block_id()
    }

    /// Days of the week the departure operates (bit 0 = Sunday).
    #[inline]
    pub fn days_of_week(&self) -> u8 {
        self.block.days_of_week()
    }

    /// The offset of the headsign text in the tile's text list.
    #[inline]
    pub fn headsign_offset(&self) -> u32 {
        self.headsign_offset.get()
    }

    /// The departure time in seconds from midnight.
    #[inline]
    pub fn departure_time(&self) -> u32 {
        self.times.departure_time()
    }

    /// The travel time to the next stop in seconds.
    #[inline]
    pub fn elapsed_time(&self) -> u32 {
        u32::from(self.times.elapsed_time())
    }

    /// The service day bitmap covering the 60 days from the tile's creation
    /// date (bit 0 = the creation date itself).
    #[inline]
    pub fn days(&self) -> u64 {
        self.days.get()
    }

    /// Does the calendar admit a departure on `date` (days since pivot)?
    ///
    /// Inside the service bitmap's window the bitmap is authoritative;
    /// beyond it, the day-of-week mask decides. `dow_mask` carries the
    /// request's day of the week (bit 0 = Sunday).
    pub fn runs_on(&self, date: u32, dow_mask: u8, date_created: u32) -> bool {
        match date.checked_sub(date_created) {
            Some(delta) if delta <= SCHEDULE_DAYS => self.days() & (1 << delta) != 0,
            Some(_) => self.days_of_week() & dow_mask != 0,
            // No service information exists before the tile was created.
            None => false,
        }
    }
}

#[cfg(test)]
impl TransitDeparture {
    pub(crate) fn new(
        line_id: u32,
        trip_id: u32,
        route_id: u32,
        departure_time: u32,
        days_of_week: u8,
        days: u64,
        headsign_offset: u32,
    ) -> Self {
        Self {
            line_id: U32::new(line_id),
            trip_id: U32::new(trip_id),
            route_id: U32::new(route_id),
            block: BlockBitfield::new()
                .with_block_id(0)
                .with_days_of_week(days_of_week),
            headsign_offset: U32::new(headsign_offset),
            times: TimeBitfield::new()
                .with_departure_time(departure_time)
                .with_elapsed_time(120),
            days: U64::new(days),
        }
    }
}

/// Information held for a transit stop beyond what path generation needs
/// (position and access live in the stop's node record).
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Debug)]
#[repr(C)]
pub struct TransitStop {
    stop_id: U32<LE>,
    one_stop_offset: U32<LE>,
    name_offset: U32<LE>,
    desc_offset: U32<LE>,
    parent_stop_id: U32<LE>,
    fare_zone_id: U32<LE>,
}

impl TransitStop {
    /// The internal stop id.
    #[inline]
    pub fn stop_id(&self) -> u32 {
        self.stop_id.get()
    }

    /// The offset of the global one-stop id string in the text list.
    #[inline]
    pub fn one_stop_offset(&self) -> u32 {
        self.one_stop_offset.get()
    }

    /// The offset of the stop name in the text list.
    #[inline]
    pub fn name_offset(&self) -> u32 {
        self.name_offset.get()
    }

    /// The offset of the stop description in the text list.
    #[inline]
    pub fn desc_offset(&self) -> u32 {
        self.desc_offset.get()
    }

    /// The stop id of the parent station (0 if there is none).
    #[inline]
    pub fn parent_stop_id(&self) -> u32 {
        self.parent_stop_id.get()
    }

    /// The fare zone id (0 if none).
    #[inline]
    pub fn fare_zone_id(&self) -> u32 {
        self.fare_zone_id.get()
    }
}

#[cfg(test)]
impl TransitStop {
    pub(crate) fn new(stop_id: u32, name_offset: u32) -> Self {
        Self {
            stop_id: U32::new(stop_id),
            one_stop_offset: U32::new(0),
            name_offset: U32::new(name_offset),
            desc_offset: U32::new(0),
            parent_stop_id: U32::new(0),
            fare_zone_id: U32::new(0),
        }
    }
}

#[bitfield(u32,
    repr = U32<LE>,
    from = crate::endian::conv_u32le::from_inner,
    into = crate::endian::conv_u32le::into_inner
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct VehicleTypeBitfield {
    #[bits(8)]
    vehicle_type: VehicleType,
    #[bits(24)]
    _spare: u32,
}

/// A transit route. The route array is sorted by route id.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Debug)]
#[repr(C)]
pub struct TransitRoute {
    route_id: U32<LE>,
    agency_offset: U32<LE>,
    short_name_offset: U32<LE>,
    long_name_offset: U32<LE>,
    desc_offset: U32<LE>,
    vehicle_type: VehicleTypeBitfield,
    /// Route color as 0xRRGGBB.
    color: U32<LE>,
    /// Text color to render over the route color, as 0xRRGGBB.
    text_color: U32<LE>,
}

impl TransitRoute {
    /// The internal route id.
    #[inline]
    pub fn route_id(&self) -> u32 {
        self.route_id.get()
    }

    /// The offset of the operating agency's name in the text list.
    #[inline]
    pub fn agency_offset(&self) -> u32 {
        self.agency_offset.get()
    }

    /// The offset of the route's short name in the text list.
    #[inline]
    pub fn short_name_offset(&self) -> u32 {
        self.short_name_offset.get()
    }

    /// The offset of the route's long name in the text list.
    #[inline]
    pub fn long_name_offset(&self) -> u32 {
        self.long_name_offset.get()
    }

    /// The offset of the route description in the text list.
    #[inline]
    pub fn desc_offset(&self) -> u32 {
        self.desc_offset.get()
    }

    /// The kind of vehicle serving this route.
    #[inline]
    pub fn vehicle_type(&self) -> VehicleType {
        self.vehicle_type.vehicle_type()
    }

    /// The route color (0xRRGGBB).
    #[inline]
    pub fn color(&self) -> u32 {
        self.color.get()
    }

    /// The text color for rendering over the route color (0xRRGGBB).
    #[inline]
    pub fn text_color(&self) -> u32 {
        self.text_color.get()
    }
}

#[cfg(test)]
impl TransitRoute {
    pub(crate) fn new(route_id: u32, vehicle_type: VehicleType, short_name_offset: u32) -> Self {
        Self {
            route_id: U32::new(route_id),
            agency_offset: U32::new(0),
            short_name_offset: U32::new(short_name_offset),
            long_name_offset: U32::new(0),
            desc_offset: U32::new(0),
            vehicle_type: VehicleTypeBitfield::new().with_vehicle_type(vehicle_type),
            color: U32::new(0xffffff),
            text_color: U32::new(0),
        }
    }
}

#[bitfield(u32,
    repr = U32<LE>,
    from = crate::endian::conv_u32le::from_inner,
    into = crate::endian::conv_u32le::into_inner
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct TransferTypeBitfield {
    #[bits(4)]
    transfer_type: TransferType,
    #[bits(28)]
    _spare: u32,
}

/// A transfer between two transit stops.
/// The transfer array is sorted by the from-stop id.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Debug)]
#[repr(C)]
pub struct TransitTransfer {
    from_stop_id: U32<LE>,
    to_stop_id: U32<LE>,
    transfer_type: TransferTypeBitfield,
    min_transfer_time: U32<LE>,
}

impl TransitTransfer {
    /// The stop id the transfer starts from.
    #[inline]
    pub fn from_stop_id(&self) -> u32 {
        self.from_stop_id.get()
    }

    /// The stop id the transfer leads to.
    #[inline]
    pub fn to_stop_id(&self) -> u32 {
        self.to_stop_id.get()
    }

    /// The type of transfer.
    #[inline]
    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type.transfer_type()
    }

    /// The minimum time needed to make the transfer, in seconds.
    #[inline]
    pub fn min_transfer_time(&self) -> u32 {
        self.min_transfer_time.get()
    }
}

#[cfg(test)]
impl TransitTransfer {
    pub(crate) fn new(
        from_stop_id: u32,
        to_stop_id: u32,
        transfer_type: TransferType,
        min_transfer_time: u32,
    ) -> Self {
        Self {
            from_stop_id: U32::new(from_stop_id),
            to_stop_id: U32::new(to_stop_id),
            transfer_type: TransferTypeBitfield::new().with_transfer_type(transfer_type),
            min_transfer_time: U32::new(min_transfer_time),
        }
    }
}
