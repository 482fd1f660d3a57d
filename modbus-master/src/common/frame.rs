use crate::common::function::FunctionField;
use crate::common::phys::format_bytes;
use crate::decode::PduDecodeLevel;
use crate::types::UnitId;

/// Transport independent data unit: addressed function code and its payload
///
/// Every codec call produces a fresh `Frame` owned by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// slave address, or the broadcast address on RTU
    pub address: UnitId,
    /// function code, with bit `0x80` set in an exception reply
    pub function: u8,
    /// function specific payload
    pub payload: Vec<u8>,
}

impl Frame {
    /// build a frame from its parts
    pub fn new(address: UnitId, function: u8, payload: &[u8]) -> Self {
        Self {
            address,
            function,
            payload: payload.to_vec(),
        }
    }
}

/// Allocator of MBAP transaction ids
///
/// Ids keep a fixed tag in the high byte and increment the low byte, so replies
/// to requests issued before the allocator existed are unlikely to match.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) struct TxId {
    value: u16,
}

impl TxId {
    const TAG: u16 = 0xAA00;

    pub(crate) fn new(value: u16) -> Self {
        TxId { value }
    }

    pub(crate) fn to_u16(self) -> u16 {
        self.value
    }

    pub(crate) fn next(&mut self) -> TxId {
        let low = self.value.to_be_bytes()[1].wrapping_add(1);
        self.value = Self::TAG | u16::from(low);
        TxId::new(self.value)
    }
}

impl Default for TxId {
    fn default() -> Self {
        TxId::new(Self::TAG)
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06X}", self.value)
    }
}

pub(crate) struct PduDisplay<'a> {
    level: PduDecodeLevel,
    function: FunctionField,
    payload: &'a [u8],
}

impl<'a> PduDisplay<'a> {
    pub(crate) fn new(level: PduDecodeLevel, function: u8, payload: &'a [u8]) -> Self {
        Self {
            level,
            function: FunctionField::from_raw(function),
            payload,
        }
    }
}

impl std::fmt::Display for PduDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.function)?;
        if self.level.data_headers() {
            write!(f, " (payload len = {})", self.payload.len())?;
        }
        if self.level.data_values() {
            format_bytes(f, self.payload)?;
        }
        Ok(())
    }
}
