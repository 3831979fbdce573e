use bitfield_struct::bitfield;
use zerocopy::{LE, U32};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Types of access restrictions beyond the usual access tags.
///
/// The restriction value is interpreted per type: dimensional limits are in
/// centimeters, weight limits in kilograms.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessRestrictionType {
    Hazmat,
    MaxHeight,
    MaxWidth,
    MaxLength,
    MaxWeight,
    MaxAxleLoad,
}

impl AccessRestrictionType {
    const fn into_bits(self) -> u8 {
        self as _
    }

    const fn from_bits(value: u8) -> Self {
        match value {
            0 => AccessRestrictionType::Hazmat,
            1 => AccessRestrictionType::MaxHeight,
            2 => AccessRestrictionType::MaxWidth,
            3 => AccessRestrictionType::MaxLength,
            4 => AccessRestrictionType::MaxWeight,
            5 => AccessRestrictionType::MaxAxleLoad,
            _ => panic!("Invalid AccessRestrictionType bit pattern."),
        }
    }
}

#[bitfield(u32,
    repr = U32<LE>,
    from = crate::endian::conv_u32le::from_inner,
    into = crate::endian::conv_u32le::into_inner
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, PartialEq, Eq)]
struct AccessRestrictionBitfield {
    #[bits(22)]
    edge_index: u32,
    #[bits(6)]
    restriction_type: AccessRestrictionType,
    #[bits(4)]
    _spare: u8,
}

/// An access restriction on a directed edge.
///
/// The restriction array is sorted by directed edge index.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct AccessRestriction {
    bitfield: AccessRestrictionBitfield,
    value: U32<LE>,
}

impl AccessRestriction {
    /// The index (within the tile) of the edge the restriction applies to.
    #[inline]
    pub fn edge_index(&self) -> u32 {
        self.bitfield.edge_index()
    }

    /// The type of access restriction.
    #[inline]
    pub fn restriction_type(&self) -> AccessRestrictionType {
        self.bitfield.restriction_type()
    }

    /// The restriction value (units depend on the type).
    #[inline]
    pub fn value(&self) -> u32 {
        self.value.get()
    }
}

#[cfg(test)]
impl AccessRestriction {
    pub(crate) fn new(
        edge_index: u32,
        restriction_type: AccessRestrictionType,
        value: u32,
    ) -> Self {
        Self {
            bitfield: AccessRestrictionBitfield::new()
                .with_edge_index(edge_index)
                .with_restriction_type(restriction_type),
            value: U32::new(value),
        }
    }
}
