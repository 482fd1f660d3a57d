use crate::common::bits::{num_bytes_for_bits, unpack_bits};
use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::frame::Frame;
use crate::error::{AduParseError, RequestError};

/// Payload of a read coils / digital inputs request
pub fn encode_read_digital_inputs(start: u16, count: u16) -> Result<Vec<u8>, RequestError> {
    let mut payload = vec![0; 4];
    let mut cursor = WriteCursor::new(&mut payload);
    cursor.write_u16_be(start)?;
    cursor.write_u16_be(count)?;
    Ok(payload)
}

/// Bit values of a read coils / digital inputs reply for `count` inputs
///
/// Bits are unpacked LSB first, excess bits of the last byte are dropped.
pub fn decode_read_digital_inputs(frame: &Frame, count: u16) -> Result<Vec<bool>, RequestError> {
    let mut cursor = ReadCursor::new(&frame.payload);
    let byte_count = usize::from(cursor.read_u8()?);
    if cursor.len() != byte_count {
        return Err(AduParseError::InsufficientBytesForByteCount(byte_count, cursor.len()).into());
    }
    if byte_count * 8 < usize::from(count) {
        return Err(
            AduParseError::RequestByteCountMismatch(num_bytes_for_bits(count), byte_count).into(),
        );
    }

    let bytes = cursor.read_bytes(byte_count)?;
    Ok(unpack_bits(bytes, count))
}
