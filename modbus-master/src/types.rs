use crate::constants::limits;
use crate::error::InvalidRequest;

/// Modbus unit identifier, just a type-safe wrapper around `u8`
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct UnitId {
    /// underlying raw value
    pub value: u8,
}

impl UnitId {
    /// create a unit id from its raw value
    pub const fn new(value: u8) -> Self {
        Self { value }
    }

    /// address 0, which every RTU slave accepts without replying
    pub const fn broadcast() -> Self {
        Self::new(crate::serial::frame::constants::BROADCAST_ADDRESS)
    }

    /// true for the broadcast address
    pub fn is_broadcast(self) -> bool {
        self == Self::broadcast()
    }
}

impl From<u8> for UnitId {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04X}", self.value)
    }
}

/// Start and count of a register read
///
/// Cannot be constructed with a range extending past address 65535
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    /// Starting address of the range
    pub start: u16,
    /// Count of elements in the range
    pub count: u16,
}

impl AddressRange {
    /// validate that start + count stays within the 16-bit address space
    pub fn try_from(start: u16, count: u16) -> Result<Self, InvalidRequest> {
        if u32::from(start) + u32::from(count) > limits::MAX_ADDRESS {
            return Err(InvalidRequest::AddressOverflow(start, count));
        }
        Ok(Self { start, count })
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "start: {:#06X} qty: {}", self.start, self.count)
    }
}

/// Byte counters kept by each master
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    /// bytes written to the transport
    pub tx: u64,
    /// bytes of frames that parsed successfully
    pub good_rx: u64,
    /// bytes discarded because they did not form a valid frame
    pub bad_rx: u64,
}

impl Statistics {
    pub(crate) fn on_tx(&mut self, count: usize) {
        self.tx += count as u64;
    }

    pub(crate) fn on_good_rx(&mut self, count: usize) {
        self.good_rx += count as u64;
    }

    pub(crate) fn on_bad_rx(&mut self, count: usize) {
        self.bad_rx += count as u64;
    }
}
