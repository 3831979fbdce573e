use crate::graph_tile::GraphTileError;
use crate::shape_codec::decode_shape;
use bitfield_struct::bitfield;
use geo::LineString;
use std::cell::OnceCell;
use zerocopy::{FromBytes, LE, U32, U64};
use zerocopy_derive::{FromBytes as DeriveFromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

#[bitfield(u32,
    repr = U32<LE>,
    from = crate::endian::conv_u32le::from_inner,
    into = crate::endian::conv_u32le::into_inner
)]
#[derive(DeriveFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct LayoutBitfield {
    #[bits(4)]
    name_count: u8,
    #[bits(16)]
    encoded_shape_size: u16,
    #[bits(12)]
    _spare: u16,
}

/// The fixed-size head of an edge-info record.
#[derive(DeriveFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Debug)]
#[repr(C)]
struct EdgeInfoHeader {
    /// The source way id this edge was cut from.
    way_id: U64<LE>,
    layout: LayoutBitfield,
}

/// Supplementary information for a directed edge (and its opposing pair):
/// source way id, name references, and the encoded shape.
///
/// Edge info is a variable-length record in the tile's edge-info region,
/// referenced by byte offset from directed edges. Opposing edges share one
/// record.
#[derive(Debug)]
pub struct EdgeInfo<'a> {
    header: &'a EdgeInfoHeader,
    name_offsets: &'a [U32<LE>],
    /// The raw delta/varint encoded shape bytes.
    pub encoded_shape: &'a [u8],
    decoded_shape: OnceCell<LineString<f64>>,
}

impl<'a> EdgeInfo<'a> {
    /// Parses the record at `offset` within the edge-info region.
    pub(crate) fn parse(region: &'a [u8], offset: usize) -> Result<Self, GraphTileError> {
        let data = region.get(offset..).ok_or_else(|| {
            GraphTileError::CorruptTile(format!(
                "edge info offset {offset} is outside the region (size {})",
                region.len()
            ))
        })?;

        let (header, rest) = EdgeInfoHeader::ref_from_prefix(data).map_err(|_| {
            GraphTileError::CorruptTile("edge info record extends past the region".to_string())
        })?;
        let (name_offsets, rest) =
            <[U32<LE>]>::ref_from_prefix_with_elems(rest, usize::from(header.layout.name_count()))
                .map_err(|_| {
                    GraphTileError::CorruptTile(
                        "edge info record extends past the region".to_string(),
                    )
                })?;
        let shape_size = usize::from(header.layout.encoded_shape_size());
        let encoded_shape = rest.get(..shape_size).ok_or_else(|| {
            GraphTileError::CorruptTile("edge info shape extends past the region".to_string())
        })?;

        Ok(Self {
            header,
            name_offsets,
            encoded_shape,
            decoded_shape: OnceCell::new(),
        })
    }

    /// The source way id this edge was cut from.
    #[inline]
    pub fn way_id(&self) -> u64 {
        self.header.way_id.get()
    }

    /// Text-list offsets of the names along this edge.
    pub fn name_offsets(&self) -> impl Iterator<Item = u32> + '_ {
        self.name_offsets.iter().map(|offset| offset.get())
    }

    /// The shape of the edge geometry.
    ///
    /// Decoded on first access and cached for the life of this record view.
    pub fn shape(&self) -> Result<&LineString<f64>, GraphTileError> {
        if let Some(linestring) = self.decoded_shape.get() {
            return Ok(linestring);
        }
        let shape = decode_shape(self.encoded_shape)
            .map_err(|e| GraphTileError::CorruptTile(format!("undecodable edge shape: {e}")))?;
        Ok(self.decoded_shape.get_or_init(|| shape))
    }
}

#[cfg(test)]
pub(crate) fn encode_edge_info(
    way_id: u64,
    name_offsets: &[u32],
    shape: &LineString<f64>,
) -> Vec<u8> {
    use zerocopy::IntoBytes;

    let encoded_shape = crate::shape_codec::encode_shape(shape);
    let header = EdgeInfoHeader {
        way_id: U64::new(way_id),
        layout: LayoutBitfield::new()
            .with_name_count(u8::try_from(name_offsets.len()).expect("too many names"))
            .with_encoded_shape_size(
                u16::try_from(encoded_shape.len()).expect("shape too large"),
            ),
    };

    let mut bytes = header.as_bytes().to_vec();
    for offset in name_offsets {
        bytes.extend_from_slice(U32::<LE>::new(*offset).as_bytes());
    }
    bytes.extend_from_slice(&encoded_shape);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    #[test]
    fn test_parse_round_trip() {
        let shape = line_string![(x: 8.54, y: 47.37), (x: 8.55, y: 47.38)];
        let region = encode_edge_info(123_456_789, &[1, 14], &shape);

        let edge_info = EdgeInfo::parse(&region, 0).expect("record parses");
        assert_eq!(edge_info.way_id(), 123_456_789);
        assert_eq!(edge_info.name_offsets().collect::<Vec<_>>(), vec![1, 14]);
        let decoded = edge_info.shape().expect("shape decodes");
        assert_eq!(decoded.0.len(), 2);
        assert!((decoded.0[0].x - 8.54).abs() < 1e-6);
        assert!((decoded.0[1].y - 47.38).abs() < 1e-6);
    }

    #[test]
    fn test_parse_out_of_bounds_offset() {
        let region = encode_edge_info(1, &[], &line_string![]);
        assert!(matches!(
            EdgeInfo::parse(&region, region.len() + 1),
            Err(GraphTileError::CorruptTile(_))
        ));
    }

    #[test]
    fn test_parse_truncated_record() {
        let shape = line_string![(x: 8.54, y: 47.37)];
        let mut region = encode_edge_info(1, &[7], &shape);
        region.truncate(region.len() - 2);
        assert!(matches!(
            EdgeInfo::parse(&region, 0),
            Err(GraphTileError::CorruptTile(_))
        ));
    }
}
