use std::time::Duration;

use crate::decode::PhysDecodeLevel;
use crate::error::RequestError;

/// Byte sink shared by every transport
///
/// Implementations block the calling thread until the whole buffer is written.
pub trait Transport {
    /// write a fully framed request
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), RequestError>;

    /// control the logging of the bytes moved by this transport
    fn set_decode_level(&mut self, _level: PhysDecodeLevel) {}
}

/// Timeouts that bound one [`RtuTransport::read_raw`] call
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawReadTimeouts {
    /// how long to wait for the first byte
    pub first_byte: Duration,
    /// how long the whole read may take
    pub total: Duration,
    /// silence after which the frame is considered complete
    pub interframe: Duration,
}

/// Time-delimited reads, as needed by RTU
pub trait RtuTransport: Transport {
    /// Read one chunk of bytes delimited by line silence
    ///
    /// Waits up to `first_byte` for the first byte, then keeps reading until no byte
    /// arrives within `interframe`, the buffer is full or `total` has elapsed.
    /// Returns [`RequestError::ResponseTimeout`] if no byte arrived at all.
    fn read_raw(
        &mut self,
        buffer: &mut [u8],
        timeouts: RawReadTimeouts,
    ) -> Result<usize, RequestError>;

    /// silence to keep on the line between the last byte moved and the next write
    fn set_interframe_delay(&mut self, _delay: Duration) {}
}

/// Stream reads, as needed by TCP
pub trait StreamTransport: Transport {
    /// Read whatever is available, waiting up to `timeout` for at least one byte
    ///
    /// Returns [`RequestError::ResponseTimeout`] if nothing arrived in time.
    fn read_some(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize, RequestError>;
}
