use bitfield_struct::bitfield;
use std::borrow::Cow;
use zerocopy::{LE, U32};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// The type of an exit sign element.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SignType {
    ExitNumber,
    ExitBranch,
    ExitToward,
    ExitName,
}

impl SignType {
    const fn into_bits(self) -> u8 {
        self as _
    }

    const fn from_bits(value: u8) -> Self {
        match value {
            0 => SignType::ExitNumber,
            1 => SignType::ExitBranch,
            2 => SignType::ExitToward,
            3 => SignType::ExitName,
            _ => panic!("Invalid SignType bit pattern."),
        }
    }
}

#[bitfield(u32,
    repr = U32<LE>,
    from = crate::endian::conv_u32le::from_inner,
    into = crate::endian::conv_u32le::into_inner
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct SignTypeBitfield {
    #[bits(8)]
    sign_type: SignType,
    #[bits(24)]
    _spare: u32,
}

/// A sign record attached to a directed edge.
///
/// Sign text is stored in the tile's text list; the record stores the byte
/// offset. The sign array is sorted by directed edge index so signs for an
/// edge can be binary searched.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Debug)]
#[repr(C)]
pub struct Sign {
    edge_index: U32<LE>,
    sign_type: SignTypeBitfield,
    text_offset: U32<LE>,
}

impl Sign {
    /// The index (within the same tile) of the directed edge this sign
    /// applies to.
    #[inline]
    pub fn edge_index(&self) -> u32 {
        self.edge_index.get()
    }

    /// The type of the sign.
    #[inline]
    pub fn sign_type(&self) -> SignType {
        self.sign_type.sign_type()
    }

    /// The offset of the sign text in the tile's text list.
    #[inline]
    pub fn text_offset(&self) -> u32 {
        self.text_offset.get()
    }
}

#[cfg(test)]
impl Sign {
    pub(crate) fn new(edge_index: u32, sign_type: SignType, text_offset: u32) -> Self {
        Self {
            edge_index: U32::new(edge_index),
            sign_type: SignTypeBitfield::new().with_sign_type(sign_type),
            text_offset: U32::new(text_offset),
        }
    }
}

/// A sign with its text resolved from the tile's text list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInfo<'a> {
    pub sign_type: SignType,
    pub text: Cow<'a, str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_size() {
        assert_eq!(size_of::<Sign>(), 12);
    }

    #[test]
    fn test_field_round_trip() {
        let sign = Sign::new(42, SignType::ExitToward, 17);
        assert_eq!(sign.edge_index(), 42);
        assert_eq!(sign.sign_type(), SignType::ExitToward);
        assert_eq!(sign.text_offset(), 17);
    }
}
