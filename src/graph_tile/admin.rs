use crate::AsCowStr;
use std::borrow::Cow;
use zerocopy::{LE, U32};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// An administrative region record.
///
/// Nodes point into the tile's admin list by index; the region's names live
/// in the text list.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Debug)]
#[repr(C)]
pub struct Admin {
    /// The offset of the country name in the tile's text list.
    country_offset: U32<LE>,
    /// The offset of the principal subdivision name in the tile's text list.
    state_offset: U32<LE>,
    country_iso: [u8; 2],
    state_iso: [u8; 2],
    _spare: [u8; 4],
}

impl Admin {
    #[inline]
    pub fn country_offset(&self) -> u32 {
        self.country_offset.get()
    }

    #[inline]
    pub fn state_offset(&self) -> u32 {
        self.state_offset.get()
    }

    /// The ISO 3166-1 country code.
    pub fn country_iso(&self) -> Cow<'_, str> {
        self.country_iso.as_cow_str()
    }

    /// The ISO 3166-2 principal subdivision code.
    pub fn state_iso(&self) -> Cow<'_, str> {
        self.state_iso.as_cow_str()
    }
}

#[cfg(test)]
impl Admin {
    pub(crate) fn new(
        country_offset: u32,
        state_offset: u32,
        country_iso: [u8; 2],
        state_iso: [u8; 2],
    ) -> Self {
        Self {
            country_offset: U32::new(country_offset),
            state_offset: U32::new(state_offset),
            country_iso,
            state_iso,
            _spare: [0; 4],
        }
    }
}

/// An admin record with its names resolved from the tile's text list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminInfo<'a> {
    pub country_name: Cow<'a, str>,
    pub state_name: Cow<'a, str>,
    pub country_iso: Cow<'a, str>,
    pub state_iso: Cow<'a, str>,
}
