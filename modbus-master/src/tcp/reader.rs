use std::time::{Duration, Instant};

use crate::client::transport::StreamTransport;
use crate::common::buffer::ReadBuffer;
use crate::error::RequestError;
use crate::tcp::frame::{constants, frame_length};

/// Reads whole TCP frames out of a byte stream
///
/// Bytes beyond the end of a frame are kept for the next call.
pub(crate) struct PacketReader {
    buffer: ReadBuffer,
}

impl PacketReader {
    pub(crate) fn new() -> Self {
        Self {
            buffer: ReadBuffer::new(constants::MAX_FRAME_LENGTH),
        }
    }

    /// Discard bytes left over from an earlier, failed read
    ///
    /// Returns the number of bytes dropped.
    pub(crate) fn reset(&mut self) -> usize {
        self.buffer.clear()
    }

    /// Read the next frame, as sized by its MBAP length field
    ///
    /// `timeout` bounds the whole call, however many reads it takes.
    pub(crate) fn read_packet<T: StreamTransport>(
        &mut self,
        io: &mut T,
        timeout: Duration,
    ) -> Result<Vec<u8>, RequestError> {
        let deadline = Instant::now() + timeout;

        while self.buffer.len() < constants::MBAP_PREFIX_LENGTH {
            self.fill(io, deadline)?;
        }

        let length = frame_length(self.buffer.peek())?;
        while self.buffer.len() < length {
            self.fill(io, deadline)?;
        }

        Ok(self.buffer.read(length)?.to_vec())
    }

    fn fill<T: StreamTransport>(&mut self, io: &mut T, deadline: Instant) -> Result<(), RequestError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(RequestError::ResponseTimeout);
        }
        self.buffer.read_some(io, remaining)?;
        Ok(())
    }
}
