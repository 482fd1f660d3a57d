use crate::common::cursor::WriteCursor;
use crate::common::frame::Frame;
use crate::common::phys::format_bytes;
use crate::decode::AduDecodeLevel;
use crate::error::{FrameParseError, InvalidRequest, RequestError};
use crate::types::UnitId;

pub(crate) mod constants {
    /// transaction id + protocol id + length field
    pub(crate) const MBAP_PREFIX_LENGTH: usize = 6;
    /// MBAP prefix + unit id + function code
    pub(crate) const FRAME_OVERHEAD: usize = MBAP_PREFIX_LENGTH + 2;
    /// the length field counts unit id and function code as well
    pub(crate) const MAX_PAYLOAD_LENGTH: usize = u16::MAX as usize - 2;
    pub(crate) const MAX_FRAME_LENGTH: usize = FRAME_OVERHEAD + MAX_PAYLOAD_LENGTH;
    pub(crate) const PROTOCOL_ID: u16 = 0;
}

/// Encode a TCP frame: MBAP prefix followed by `address | function | payload`
pub fn format_frame(
    tx_id: u16,
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
    cursor.write_u16_be(tx_id)?;
    cursor.write_u16_be(constants::PROTOCOL_ID)?;
    // length was checked above
    cursor.write_u16_be((payload.len() + 2) as u16)?;
    cursor.write_u8(address.value)?;
    cursor.write_u8(function)?;
    cursor.write_bytes(payload)?;
    Ok(buffer)
}

/// Total on-wire size of the frame whose MBAP prefix starts `header`
///
/// Needs at least the 6 byte prefix.
pub fn frame_length(header: &[u8]) -> Result<usize, RequestError> {
    match header.get(4..constants::MBAP_PREFIX_LENGTH) {
        Some(field) => {
            let length = u16::from_be_bytes([field[0], field[1]]);
            Ok(usize::from(length) + constants::MBAP_PREFIX_LENGTH)
        }
        None => Err(
            FrameParseError::TooSmall(constants::MBAP_PREFIX_LENGTH, header.len()).into(),
        ),
    }
}

/// Decode one TCP frame occupying all of `data`, answering transaction `expected_tx_id`
///
/// The protocol id is not checked.
pub fn parse_frame(expected_tx_id: u16, data: &[u8]) -> Result<Frame, RequestError> {
    if data.len() < constants::FRAME_OVERHEAD {
        return Err(FrameParseError::TooSmall(constants::FRAME_OVERHEAD, data.len()).into());
    }

    let declared = frame_length(data)?;
    if declared != data.len() {
        return Err(FrameParseError::TooSmall(declared, data.len()).into());
    }

    let tx_id = u16::from_be_bytes([data[0], data[1]]);
    if tx_id != expected_tx_id {
        return Err(FrameParseError::TransactionIdMismatch(tx_id, expected_tx_id).into());
    }

    Ok(Frame::new(
        UnitId::new(data[6]),
        data[7],
        &data[constants::FRAME_OVERHEAD..],
    ))
}

pub(crate) struct MbapDisplay<'a> {
    level: AduDecodeLevel,
    frame: &'a [u8],
}

impl<'a> MbapDisplay<'a> {
    pub(crate) fn new(level: AduDecodeLevel, frame: &'a [u8]) -> Self {
        MbapDisplay { level, frame }
    }
}

impl std::fmt::Display for MbapDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.frame.len() < constants::FRAME_OVERHEAD {
            return write!(f, "truncated frame ({} bytes)", self.frame.len());
        }
        let payload = &self.frame[constants::FRAME_OVERHEAD..];
        write!(
            f,
            "tx_id: {:#06X} unit: {} len: {:#06X}",
            u16::from_be_bytes([self.frame[0], self.frame[1]]),
            UnitId::new(self.frame[6]),
            u16::from_be_bytes([self.frame[4], self.frame[5]]),
        )?;
        if self.level.payload_enabled() {
            format_bytes(f, payload)?;
        }
        Ok(())
    }
}
