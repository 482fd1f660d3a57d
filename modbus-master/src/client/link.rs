use std::time::{Duration, Instant};

use crate::client::transport::{RawReadTimeouts, RtuTransport, StreamTransport, Transport};
use crate::common::frame::{Frame, TxId};
use crate::decode::{AduDecodeLevel, DecodeLevel};
use crate::error::RequestError;
use crate::serial::frame::{constants, RtuDisplay};
use crate::tcp::frame::MbapDisplay;
use crate::tcp::reader::PacketReader;
use crate::types::{Statistics, UnitId};

/// A transport paired with the frame codec it speaks
///
/// Selected when the master is constructed, see [`RtuLink`] and [`TcpLink`].
pub trait Link {
    /// transport the link writes to and reads from
    type Io: Transport;

    /// frame and write one request
    fn send(&mut self, address: UnitId, function: u8, payload: &[u8]) -> Result<(), RequestError>;

    /// read the next frame answering the last request, within `timeout`
    fn read_frame(&mut self, timeout: Duration) -> Result<Frame, RequestError>;

    /// true if a slave at `address` answers requests
    fn replies_from(&self, _address: UnitId) -> bool {
        true
    }

    /// byte counters
    fn statistics(&self) -> Statistics;

    /// logging of frames and transport bytes
    fn set_decode_level(&mut self, level: DecodeLevel);

    /// shared access to the transport
    fn io(&self) -> &Self::Io;

    /// exclusive access to the transport
    fn io_mut(&mut self) -> &mut Self::Io;
}

/// RTU codec over a time-delimited transport
#[derive(Debug)]
pub struct RtuLink<T: RtuTransport> {
    io: T,
    interframe_delay: Duration,
    rx_buffer: [u8; constants::MAX_FRAME_LENGTH],
    stats: Statistics,
    level: AduDecodeLevel,
}

impl<T: RtuTransport> RtuLink<T> {
    /// default silence that ends a frame, valid for every baud rate above 19200
    pub const DEFAULT_INTERFRAME_DELAY: Duration = Duration::from_micros(1750);

    /// wrap a transport
    pub fn new(io: T) -> Self {
        let mut link = Self {
            io,
            interframe_delay: Self::DEFAULT_INTERFRAME_DELAY,
            rx_buffer: [0; constants::MAX_FRAME_LENGTH],
            stats: Statistics::default(),
            level: AduDecodeLevel::Nothing,
        };
        link.io.set_interframe_delay(link.interframe_delay);
        link
    }

    /// silence after which a received frame is considered complete
    pub fn interframe_delay(&self) -> Duration {
        self.interframe_delay
    }

    /// Change the interframe delay, see [`crate::serial::frame::interframe_duration`]
    ///
    /// Applies both to the end of received frames and to the silence the transport
    /// keeps before writing.
    pub fn set_interframe_delay(&mut self, delay: Duration) {
        self.interframe_delay = delay;
        self.io.set_interframe_delay(delay);
    }
}

impl<T: RtuTransport> Link for RtuLink<T> {
    type Io = T;

    fn send(&mut self, address: UnitId, function: u8, payload: &[u8]) -> Result<(), RequestError> {
        let bytes = crate::serial::frame::format_frame(address, function, payload)?;
        if self.level.enabled() {
            tracing::info!("RTU TX - {}", RtuDisplay::new(self.level, &bytes));
        }
        self.io.write_bytes(&bytes)?;
        self.stats.on_tx(bytes.len());
        Ok(())
    }

    fn read_frame(&mut self, timeout: Duration) -> Result<Frame, RequestError> {
        let deadline = Instant::now() + timeout;
        // a spent budget reports the last discarded chunk, not the silence after it
        let mut last_err: Option<RequestError> = None;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let timeouts = RawReadTimeouts {
                first_byte: remaining,
                total: remaining,
                interframe: self.interframe_delay,
            };
            let count = match self.io.read_raw(&mut self.rx_buffer, timeouts) {
                Ok(count) => count,
                Err(RequestError::ResponseTimeout) => {
                    return Err(last_err.take().unwrap_or(RequestError::ResponseTimeout))
                }
                Err(err) => return Err(err),
            };
            let chunk = &self.rx_buffer[..count];

            match crate::serial::frame::parse_frame(chunk) {
                Ok(frame) => {
                    self.stats.on_good_rx(count);
                    if self.level.enabled() {
                        tracing::info!("RTU RX - {}", RtuDisplay::new(self.level, chunk));
                    }
                    return Ok(frame);
                }
                Err(err) if err.is_resync_candidate() => {
                    self.stats.on_bad_rx(count);
                    tracing::warn!("discarding {} received bytes: {}", count, err);
                    if Instant::now() >= deadline {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn replies_from(&self, address: UnitId) -> bool {
        !address.is_broadcast()
    }

    fn statistics(&self) -> Statistics {
        self.stats
    }

    fn set_decode_level(&mut self, level: DecodeLevel) {
        self.level = level.adu;
        self.io.set_decode_level(level.physical);
    }

    fn io(&self) -> &T {
        &self.io
    }

    fn io_mut(&mut self) -> &mut T {
        &mut self.io
    }
}

/// TCP codec over a stream transport
pub struct TcpLink<T: StreamTransport> {
    io: T,
    tx_id: TxId,
    expected: TxId,
    reader: PacketReader,
    stats: Statistics,
    level: AduDecodeLevel,
}

impl<T: StreamTransport> TcpLink<T> {
    /// wrap a transport
    pub fn new(io: T) -> Self {
        Self {
            io,
            tx_id: TxId::default(),
            expected: TxId::default(),
            reader: PacketReader::new(),
            stats: Statistics::default(),
            level: AduDecodeLevel::Nothing,
        }
    }
}

impl<T: StreamTransport + std::fmt::Debug> std::fmt::Debug for TcpLink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpLink")
            .field("io", &self.io)
            .field("tx_id", &self.tx_id)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<T: StreamTransport> Link for TcpLink<T> {
    type Io = T;

    fn send(&mut self, address: UnitId, function: u8, payload: &[u8]) -> Result<(), RequestError> {
        let stale = self.reader.reset();
        if stale > 0 {
            self.stats.on_bad_rx(stale);
            tracing::warn!("discarding {} bytes left over from the previous request", stale);
        }

        self.expected = self.tx_id.next();
        let _span = tracing::info_span!("Transaction", tx_id = %self.expected).entered();
        let bytes =
            crate::tcp::frame::format_frame(self.expected.to_u16(), address, function, payload)?;
        if self.level.enabled() {
            tracing::info!("MBAP TX - {}", MbapDisplay::new(self.level, &bytes));
        }
        self.io.write_bytes(&bytes)?;
        self.stats.on_tx(bytes.len());
        Ok(())
    }

    fn read_frame(&mut self, timeout: Duration) -> Result<Frame, RequestError> {
        let _span = tracing::info_span!("Transaction", tx_id = %self.expected).entered();
        let packet = self.reader.read_packet(&mut self.io, timeout)?;
        match crate::tcp::frame::parse_frame(self.expected.to_u16(), &packet) {
            Ok(frame) => {
                self.stats.on_good_rx(packet.len());
                if self.level.enabled() {
                    tracing::info!("MBAP RX - {}", MbapDisplay::new(self.level, &packet));
                }
                Ok(frame)
            }
            Err(err) => {
                self.stats.on_bad_rx(packet.len());
                tracing::warn!("discarding {} received bytes: {}", packet.len(), err);
                Err(err)
            }
        }
    }

    fn statistics(&self) -> Statistics {
        self.stats
    }

    fn set_decode_level(&mut self, level: DecodeLevel) {
        self.level = level.adu;
        self.io.set_decode_level(level.physical);
    }

    fn io(&self) -> &T {
        &self.io
    }

    fn io_mut(&mut self) -> &mut T {
        &mut self.io
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameParseError;
    use crate::mock::{mock, MockTransport};

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[test]
    fn rtu_link_skips_corrupted_chunks_while_time_remains() {
        let (io, mut handle) = mock();
        handle.read(&[0x10, 0x03]);
        handle.read(&[0x10, 0x06, 0xab, 0xcd, 0x5a, 0x41]);
        handle.read(&[0x10, 0x06, 0xab, 0xcd, 0x5a, 0x40]);

        let mut link = RtuLink::new(io);
        let frame = link.read_frame(TIMEOUT).unwrap();
        assert_eq!(frame, Frame::new(UnitId::new(0x10), 0x06, &[0xab, 0xcd]));
        assert_eq!(
            link.statistics(),
            Statistics {
                tx: 0,
                good_rx: 6,
                bad_rx: 8
            }
        );
    }

    #[test]
    fn rtu_link_reports_timeout_when_nothing_arrives() {
        let (io, _handle) = mock();
        let mut link = RtuLink::new(io);
        assert_eq!(link.read_frame(TIMEOUT), Err(RequestError::ResponseTimeout));
        assert_eq!(link.statistics(), Statistics::default());
    }

    #[test]
    fn rtu_link_counts_transmitted_bytes() {
        let (io, mut handle) = mock();
        handle.write(&[0x02, 0x10, 1, 2, 3, 4, 5, 0x34, 0xEB]);

        let mut link = RtuLink::new(io);
        link.send(UnitId::new(0x02), 0x10, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(link.statistics().tx, 9);
    }

    #[test]
    fn rtu_link_keeps_configured_interframe_delay() {
        let (io, _handle) = mock();
        let mut link = RtuLink::<MockTransport>::new(io);
        assert_eq!(link.interframe_delay(), Duration::from_micros(1750));
        assert_eq!(link.io().interframe_delay(), Some(Duration::from_micros(1750)));
        link.set_interframe_delay(Duration::from_micros(4011));
        assert_eq!(link.interframe_delay(), Duration::from_micros(4011));
        assert_eq!(link.io().interframe_delay(), Some(Duration::from_micros(4011)));
    }

    #[test]
    fn rtu_link_decodes_frames_at_every_level() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .try_init();

        let (io, mut handle) = mock();
        handle.write(&[0x02, 0x10, 1, 2, 3, 4, 5, 0x34, 0xEB]);
        handle.read(&[0x02, 0x10, 6, 7, 8, 9, 0xB6, 0xB5]);

        let mut link = RtuLink::new(io);
        link.set_decode_level(DecodeLevel::everything());
        link.send(UnitId::new(0x02), 0x10, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(
            link.read_frame(TIMEOUT).unwrap(),
            Frame::new(UnitId::new(0x02), 0x10, &[6, 7, 8, 9])
        );
    }

    #[test]
    fn tcp_link_allocates_new_transaction_id_per_request() {
        let (io, mut handle) = mock();
        handle.write(&[0xaa, 0x01, 0, 0, 0, 2, 0x10, 0x03]);
        handle.read(&[0xaa, 0x01, 0, 0, 0, 3, 0x10, 0x03, 0x00]);
        handle.write(&[0xaa, 0x02, 0, 0, 0, 2, 0x10, 0x03]);
        handle.read(&[0xaa, 0x01, 0, 0, 0, 3, 0x10, 0x03, 0x00]);

        let mut link = TcpLink::new(io);
        link.send(UnitId::new(0x10), 0x03, &[]).unwrap();
        assert!(link.read_frame(TIMEOUT).is_ok());
        link.send(UnitId::new(0x10), 0x03, &[]).unwrap();
        assert_eq!(
            link.read_frame(TIMEOUT),
            Err(RequestError::BadFrame(
                FrameParseError::TransactionIdMismatch(0xaa01, 0xaa02)
            ))
        );
        assert_eq!(
            link.statistics(),
            Statistics {
                tx: 16,
                good_rx: 9,
                bad_rx: 9
            }
        );
    }
}
