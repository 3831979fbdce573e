//! # Shape decoding
//!
//! Edge shapes are stored as delta-encoded, zigzag varint coordinate pairs
//! (latitude first) at a fixed precision of 1e-6 degrees.

use geo::{Coord, LineString, coord};
use integer_encoding::VarIntReader;

const DECODE_PRECISION: f64 = 1e-6;

/// Decodes an encoded shape from a byte buffer of exact size.
///
/// # Errors
///
/// Decoding fails if the varint data is malformed or the buffer ends in the
/// middle of a coordinate pair.
pub fn decode_shape(bytes: &[u8]) -> std::io::Result<LineString<f64>> {
    // Delta encoding keeps most values small; a quarter of the byte length
    // is a reasonable point count estimate.
    let mut coords: Vec<Coord> = Vec::with_capacity(bytes.len() / 4);
    let mut lat: i32 = 0;
    let mut lon: i32 = 0;
    let mut bytes = bytes;
    while !bytes.is_empty() {
        lat = lat.wrapping_add(bytes.read_varint::<i32>()?);
        lon = lon.wrapping_add(bytes.read_varint::<i32>()?);
        coords.push(coord! {
            x: f64::from(lon) * DECODE_PRECISION,
            y: f64::from(lat) * DECODE_PRECISION,
        });
    }
    Ok(coords.into())
}

#[cfg(test)]
pub(crate) fn encode_shape(shape: &LineString<f64>) -> Vec<u8> {
    use integer_encoding::VarIntWriter;

    let mut bytes = Vec::new();
    let mut last_lat: i32 = 0;
    let mut last_lon: i32 = 0;
    #[allow(clippy::cast_possible_truncation)]
    for coord in &shape.0 {
        let lat = (coord.y / DECODE_PRECISION).round() as i32;
        let lon = (coord.x / DECODE_PRECISION).round() as i32;
        bytes
            .write_varint(lat - last_lat)
            .expect("writing to a Vec cannot fail");
        bytes
            .write_varint(lon - last_lon)
            .expect("writing to a Vec cannot fail");
        last_lat = lat;
        last_lon = lon;
    }
    bytes
}
