use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::frame::Frame;
use crate::constants::limits;
use crate::error::{AduParseError, InvalidRequest, RequestError};
use crate::types::AddressRange;

/// Payload of a read holding / input registers request
///
/// At most 128 registers may be requested, all within the 16-bit address space.
pub fn encode_read_registers(start: u16, count: u16) -> Result<Vec<u8>, RequestError> {
    if count > limits::MAX_READ_REGISTERS_COUNT {
        return Err(InvalidRequest::CountTooBigForType(
            count,
            limits::MAX_READ_REGISTERS_COUNT,
        )
        .into());
    }
    let range = AddressRange::try_from(start, count)?;

    let mut payload = vec![0; 4];
    let mut cursor = WriteCursor::new(&mut payload);
    cursor.write_u16_be(range.start)?;
    cursor.write_u16_be(range.count)?;
    Ok(payload)
}

/// Register values of a read registers reply for `count` registers
pub fn decode_read_registers(frame: &Frame, count: u16) -> Result<Vec<u16>, RequestError> {
    let mut cursor = ReadCursor::new(&frame.payload);
    let byte_count = usize::from(cursor.read_u8()?);
    if cursor.len() != byte_count {
        return Err(AduParseError::InsufficientBytesForByteCount(byte_count, cursor.len()).into());
    }
    let expected = 2 * usize::from(count);
    if byte_count != expected {
        return Err(AduParseError::RequestByteCountMismatch(expected, byte_count).into());
    }

    let mut values = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        values.push(cursor.read_u16_be()?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitId;

    fn reply(payload: &[u8]) -> Frame {
        Frame::new(UnitId::new(0x10), 0x03, payload)
    }

    #[test]
    fn encodes_start_and_count_big_endian() {
        assert_eq!(
            encode_read_registers(0xabcd, 0x0102),
            Err(RequestError::BadRequest(InvalidRequest::CountTooBigForType(
                0x0102, 128
            )))
        );
        assert_eq!(
            encode_read_registers(0x1020, 5).unwrap(),
            vec![0x10, 0x20, 0x00, 0x05]
        );
    }

    #[test]
    fn accepts_128_registers() {
        assert_eq!(
            encode_read_registers(0, 128).unwrap(),
            vec![0x00, 0x00, 0x00, 0x80]
        );
    }

    #[test]
    fn refuses_range_beyond_last_address() {
        assert_eq!(
            encode_read_registers(65535 - 9, 10),
            Err(RequestError::BadRequest(InvalidRequest::AddressOverflow(
                65526, 10
            )))
        );
        assert!(encode_read_registers(65535 - 10, 10).is_ok());
    }

    #[test]
    fn decodes_big_endian_values() {
        assert_eq!(
            decode_read_registers(&reply(&[0x04, 0x01, 0x02, 0x03, 0x04]), 2).unwrap(),
            vec![0x0102, 0x0304]
        );
    }

    #[test]
    fn rejects_payload_shorter_or_longer_than_expected() {
        for count in 1..10u16 {
            let mut payload = vec![0; 2 * usize::from(count) + 1];
            payload[0] = (2 * count) as u8;
            assert!(decode_read_registers(&reply(&payload), count).is_ok());

            let mut short = payload.clone();
            short.pop();
            assert!(matches!(
                decode_read_registers(&reply(&short), count),
                Err(RequestError::BadResponse(_))
            ));

            let mut long = payload.clone();
            long.push(0);
            assert!(matches!(
                decode_read_registers(&reply(&long), count),
                Err(RequestError::BadResponse(_))
            ));
        }
    }

    #[test]
    fn rejects_consistent_reply_for_other_count() {
        assert_eq!(
            decode_read_registers(&reply(&[0x04, 0x01, 0x02, 0x03, 0x04]), 1),
            Err(RequestError::BadResponse(
                AduParseError::RequestByteCountMismatch(2, 4)
            ))
        );
    }

    #[test]
    fn rejects_empty_payload() {
        assert_eq!(
            decode_read_registers(&reply(&[]), 1),
            Err(RequestError::BadResponse(AduParseError::InsufficientBytes))
        );
    }
}
