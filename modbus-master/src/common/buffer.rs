use std::time::Duration;

use crate::client::transport::StreamTransport;
use crate::error::{InternalError, RequestError};

/// Accumulates bytes read from a stream until a whole frame is available
pub(crate) struct ReadBuffer {
    buffer: Vec<u8>,
    begin: usize,
    end: usize,
}

impl ReadBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        ReadBuffer {
            buffer: vec![0; capacity],
            begin: 0,
            end: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.end - self.begin
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// drop every buffered byte, returning how many there were
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.len();
        self.begin = 0;
        self.end = 0;
        count
    }

    pub(crate) fn peek(&self) -> &[u8] {
        &self.buffer[self.begin..self.end]
    }

    pub(crate) fn read(&mut self, count: usize) -> Result<&[u8], InternalError> {
        if self.len() < count {
            return Err(InternalError::InsufficientBytesForRead(count, self.len()));
        }

        match self.buffer.get(self.begin..(self.begin + count)) {
            Some(ret) => {
                self.begin += count;
                Ok(ret)
            }
            None => Err(InternalError::InsufficientBytesForRead(count, self.len())),
        }
    }

    pub(crate) fn read_some<T: StreamTransport>(
        &mut self,
        io: &mut T,
        timeout: Duration,
    ) -> Result<usize, RequestError> {
        // before we read any data, check to see if the buffer is empty and adjust the indices
        // this allows use to make the biggest read possible, and avoids subsequent buffer shifting later
        if self.is_empty() {
            self.begin = 0;
            self.end = 0;
        }

        // if we've reached capacity, but still need more data we have to shift
        if self.end == self.buffer.len() {
            let length = self.len();
            self.buffer.copy_within(self.begin..self.end, 0);
            self.begin = 0;
            self.end = length;
        }

        let count = io.read_some(&mut self.buffer[self.end..], timeout)?;
        self.end += count;
        Ok(count)
    }
}
