use std::time::Duration;

use crate::common::cursor::WriteCursor;
use crate::common::frame::Frame;
use crate::common::phys::format_bytes;
use crate::decode::AduDecodeLevel;
use crate::error::{FrameParseError, InvalidRequest, RequestError};
use crate::types::UnitId;

pub(crate) mod constants {
    /// address every slave accepts without replying
    pub(crate) const BROADCAST_ADDRESS: u8 = 0;
    pub(crate) const MAX_FRAME_LENGTH: usize = 256;
    /// address + function code
    pub(crate) const HEADER_LENGTH: usize = 2;
    pub(crate) const CRC_LENGTH: usize = 2;
    pub(crate) const FRAME_OVERHEAD: usize = HEADER_LENGTH + CRC_LENGTH;
    pub(crate) const MAX_PAYLOAD_LENGTH: usize = MAX_FRAME_LENGTH - FRAME_OVERHEAD;
}

/// precomputes the CRC table as a constant!
const CRC: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_MODBUS);

/// Modbus CRC-16 of `data`, in wire order (low byte first)
pub fn crc16(data: &[u8]) -> [u8; 2] {
    CRC.checksum(data).to_le_bytes()
}

/// Encode an RTU frame: `address | function | payload | crc low | crc high`
pub fn format_frame(
    address: UnitId,
    function: u8,
    payload: &[u8],
) -> Result<Vec<u8>, RequestError> {
    if payload.len() > constants::MAX_PAYLOAD_LENGTH {
        return Err(InvalidRequest::PayloadTooBig(
            payload.len(),
            constants::MAX_PAYLOAD_LENGTH,
        )
        .into());
    }

    let mut buffer = vec![0; payload.len() + constants::FRAME_OVERHEAD];
    let mut cursor = WriteCursor::new(&mut buffer);
    cursor.write_u8(address.value)?;
    cursor.write_u8(function)?;
    cursor.write_bytes(payload)?;
    let crc = CRC.checksum(cursor.written());
    cursor.write_u16_le(crc)?;
    Ok(buffer)
}

/// Decode one RTU frame occupying all of `data`
pub fn parse_frame(data: &[u8]) -> Result<Frame, RequestError> {
    if data.len() < constants::FRAME_OVERHEAD {
        return Err(FrameParseError::TooSmall(constants::FRAME_OVERHEAD, data.len()).into());
    }

    let (body, trailer) = data.split_at(data.len() - constants::CRC_LENGTH);
    let received_crc = u16::from_le_bytes([trailer[0], trailer[1]]);
    let expected_crc = CRC.checksum(body);
    if received_crc != expected_crc {
        return Err(FrameParseError::CrcValidationFailure(received_crc, expected_crc).into());
    }

    Ok(Frame::new(
        UnitId::new(body[0]),
        body[1],
        &body[constants::HEADER_LENGTH..],
    ))
}

/// Line silence that delimits RTU frames at `baud_rate`
///
/// 3.5 character times of 11 bits each, never less than 1750 µs.
pub fn interframe_duration(baud_rate: u32) -> Duration {
    // Modbus RTU uses 11-bit characters (1 start, 8 data, 1 parity or stop, 1 stop)
    const NUM_BITS_IN_CHAR: f64 = 11.0;
    const MIN_DELAY: Duration = Duration::from_micros(1750);

    if baud_rate == 0 {
        return MIN_DELAY;
    }

    let micros = (1_000_000.0 / f64::from(baud_rate) * NUM_BITS_IN_CHAR * 3.5).ceil();
    std::cmp::max(Duration::from_micros(micros as u64), MIN_DELAY)
}

pub(crate) struct RtuDisplay<'a> {
    level: AduDecodeLevel,
    frame: &'a [u8],
}

impl<'a> RtuDisplay<'a> {
    pub(crate) fn new(level: AduDecodeLevel, frame: &'a [u8]) -> Self {
        RtuDisplay { level, frame }
    }
}

impl std::fmt::Display for RtuDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.frame.len() < constants::FRAME_OVERHEAD {
            return write!(f, "truncated frame ({} bytes)", self.frame.len());
        }
        let (body, trailer) = self.frame.split_at(self.frame.len() - constants::CRC_LENGTH);
        let payload = &body[constants::HEADER_LENGTH..];
        write!(
            f,
            "addr: {} crc: {:#06X} (payload len = {})",
            UnitId::new(body[0]),
            u16::from_le_bytes([trailer[0], trailer[1]]),
            payload.len(),
        )?;
        if self.level.payload_enabled() {
            format_bytes(f, payload)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_crc_in_wire_order() {
        assert_eq!(crc16(&[1, 2, 3, 4, 5, 6]), [0xBA, 0xDD]);
    }

    #[test]
    fn formats_frame() {
        let frame = format_frame(UnitId::new(0x02), 0x10, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(frame, vec![0x02, 0x10, 1, 2, 3, 4, 5, 0x34, 0xEB]);
    }

    #[test]
    fn formats_frame_of_maximum_size() {
        let payload = [0xCC; constants::MAX_PAYLOAD_LENGTH];
        let frame = format_frame(UnitId::new(0x01), 0x03, &payload).unwrap();
        assert_eq!(frame.len(), constants::MAX_FRAME_LENGTH);
    }

    #[test]
    fn refuses_payload_too_big() {
        let payload = [0xCC; constants::MAX_PAYLOAD_LENGTH + 1];
        assert_eq!(
            format_frame(UnitId::new(0x01), 0x03, &payload),
            Err(RequestError::BadRequest(InvalidRequest::PayloadTooBig(
                253, 252
            )))
        );
    }

    #[test]
    fn parses_frame() {
        let frame = parse_frame(&[0x02, 0x10, 6, 7, 8, 9, 0xB6, 0xB5]).unwrap();
        assert_eq!(frame.address, UnitId::new(0x02));
        assert_eq!(frame.function, 0x10);
        assert_eq!(frame.payload, vec![6, 7, 8, 9]);
    }

    #[test]
    fn parses_frame_without_payload() {
        let frame = parse_frame(&[0x02, 0x90, 0x00, 0xBC]).unwrap();
        assert_eq!(frame.function, 0x90);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn parses_what_it_formats() {
        let bytes = format_frame(UnitId::new(0x2A), 0x04, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert_eq!(
            parse_frame(&bytes).unwrap(),
            Frame::new(UnitId::new(0x2A), 0x04, &[0xDE, 0xAD, 0xBE, 0xEF])
        );
    }

    #[test]
    fn fails_on_frame_too_small() {
        assert_eq!(
            parse_frame(&[0x02, 0x10, 0x34]),
            Err(RequestError::BadFrame(FrameParseError::TooSmall(4, 3)))
        );
        assert_eq!(
            parse_frame(&[]),
            Err(RequestError::BadFrame(FrameParseError::TooSmall(4, 0)))
        );
    }

    #[test]
    fn fails_on_wrong_crc() {
        assert_eq!(
            parse_frame(&[0x10, 0x03, 0x04, 0x12, 0x34, 0x56, 0x78, 0x80, 0x07]),
            Err(RequestError::BadFrame(FrameParseError::CrcValidationFailure(
                0x0780, 0x0680
            )))
        );
    }

    #[test]
    fn computes_interframe_duration() {
        assert_eq!(interframe_duration(9600), Duration::from_micros(4011));
        assert_eq!(interframe_duration(19200), Duration::from_micros(2006));
        assert_eq!(interframe_duration(36400), Duration::from_micros(1750));
        assert_eq!(interframe_duration(115200), Duration::from_micros(1750));
    }

    #[test]
    fn displays_header_and_payload() {
        let bytes = [0x02, 0x10, 6, 7, 8, 9, 0xB6, 0xB5];
        assert_eq!(
            RtuDisplay::new(AduDecodeLevel::Header, &bytes).to_string(),
            "addr: 0x02 crc: 0xB5B6 (payload len = 4)"
        );
        assert_eq!(
            RtuDisplay::new(AduDecodeLevel::Payload, &bytes).to_string(),
            "addr: 0x02 crc: 0xB5B6 (payload len = 4)\n06 07 08 09"
        );
    }
}
