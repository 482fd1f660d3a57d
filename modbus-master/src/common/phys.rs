use std::fmt::Write;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;

use crate::client::transport::{RawReadTimeouts, RtuTransport, StreamTransport, Transport};
use crate::decode::PhysDecodeLevel;
use crate::error::RequestError;

/// Blocking byte stream over TCP or a serial port
///
/// The I/O is driven by a private single-threaded tokio runtime, so a `PhysLayer`
/// must not be used from within another runtime.
pub struct PhysLayer {
    runtime: tokio::runtime::Runtime,
    layer: PhysLayerImpl,
    spacing: WriteSpacing,
    level: PhysDecodeLevel,
}

// line silence kept before each write
#[derive(Copy, Clone, Debug, Default)]
struct WriteSpacing {
    delay: Duration,
    last_activity: Option<Instant>,
}

impl WriteSpacing {
    fn on_activity(&mut self) {
        if !self.delay.is_zero() {
            self.last_activity = Some(Instant::now());
        }
    }

    fn earliest_write(&self) -> Option<Instant> {
        if self.delay.is_zero() {
            return None;
        }
        self.last_activity.map(|last| last + self.delay)
    }
}

// encapsulates all possible physical layers as an enum
enum PhysLayerImpl {
    Tcp(tokio::net::TcpStream),
    #[cfg(feature = "serial")]
    Serial(tokio_serial::SerialStream),
    #[cfg(test)]
    Mock(tokio_test::io::Mock),
}

impl std::fmt::Debug for PhysLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.layer {
            PhysLayerImpl::Tcp(_) => f.write_str("Tcp"),
            #[cfg(feature = "serial")]
            PhysLayerImpl::Serial(_) => f.write_str("Serial"),
            #[cfg(test)]
            PhysLayerImpl::Mock(_) => f.write_str("Mock"),
        }
    }
}

fn new_runtime() -> Result<tokio::runtime::Runtime, RequestError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()?;
    Ok(runtime)
}

impl PhysLayer {
    /// connect to a Modbus TCP slave, failing with `Io(TimedOut)` after `timeout`
    pub fn connect_tcp(addr: SocketAddr, timeout: Duration) -> Result<Self, RequestError> {
        let runtime = new_runtime()?;
        let stream = runtime.block_on(async {
            match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(addr)).await {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::from(std::io::ErrorKind::TimedOut)),
            }
        })?;
        if let Err(err) = stream.set_nodelay(true) {
            tracing::warn!("unable to enable TCP_NODELAY: {}", err);
        }
        tracing::info!("connected to {}", addr);
        Ok(Self {
            runtime,
            layer: PhysLayerImpl::Tcp(stream),
            spacing: WriteSpacing::default(),
            level: PhysDecodeLevel::Nothing,
        })
    }

    /// Open a serial port for RTU
    ///
    /// Writes are spaced by the interframe delay of the link driving the port, see
    /// [`RtuTransport::set_interframe_delay`].
    #[cfg(feature = "serial")]
    pub fn open_serial(
        path: &str,
        settings: crate::serial::SerialSettings,
    ) -> Result<Self, RequestError> {
        let runtime = new_runtime()?;
        let stream = {
            // the serial stream registers with the reactor of the current runtime
            let _guard = runtime.enter();
            settings.open(path)?
        };
        tracing::info!("opened {} ({})", path, settings);
        Ok(Self {
            runtime,
            layer: PhysLayerImpl::Serial(stream),
            spacing: WriteSpacing::default(),
            level: PhysDecodeLevel::Nothing,
        })
    }

    #[cfg(test)]
    pub(crate) fn new_mock(mock: tokio_test::io::Mock) -> Self {
        Self {
            runtime: new_runtime().expect("unable to create runtime"),
            layer: PhysLayerImpl::Mock(mock),
            spacing: WriteSpacing::default(),
            level: PhysDecodeLevel::Nothing,
        }
    }

    fn log_rx(&self, data: &[u8]) {
        if self.level.enabled() {
            tracing::info!("PHYS RX - {}", PhysDisplay::new(self.level, data));
        }
    }
}

impl PhysLayerImpl {
    async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, std::io::Error> {
        match self {
            PhysLayerImpl::Tcp(x) => x.read(buffer).await,
            #[cfg(feature = "serial")]
            PhysLayerImpl::Serial(x) => x.read(buffer).await,
            #[cfg(test)]
            PhysLayerImpl::Mock(x) => x.read(buffer).await,
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), std::io::Error> {
        match self {
            PhysLayerImpl::Tcp(x) => x.write_all(data).await,
            #[cfg(feature = "serial")]
            PhysLayerImpl::Serial(x) => x.write_all(data).await,
            #[cfg(test)]
            PhysLayerImpl::Mock(x) => x.write_all(data).await,
        }
    }

    async fn read_raw(
        &mut self,
        buffer: &mut [u8],
        timeouts: RawReadTimeouts,
    ) -> Result<usize, RequestError> {
        let start = Instant::now();
        let end = start + timeouts.total;
        let first_byte = std::cmp::min(start + timeouts.first_byte, end);

        let mut count = match tokio::time::timeout_at(first_byte, self.read(buffer)).await {
            Err(_) => return Err(RequestError::ResponseTimeout),
            Ok(Err(err)) => return Err(err.into()),
            Ok(Ok(0)) => return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into()),
            Ok(Ok(count)) => count,
        };

        while count < buffer.len() {
            let now = Instant::now();
            if now >= end {
                break;
            }
            let silence = std::cmp::min(now + timeouts.interframe, end);
            match tokio::time::timeout_at(silence, self.read(&mut buffer[count..])).await {
                // end of frame
                Err(_) | Ok(Ok(0)) => break,
                Ok(Ok(more)) => count += more,
                Ok(Err(err)) => return Err(err.into()),
            }
        }

        Ok(count)
    }

    async fn read_some(
        &mut self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, RequestError> {
        match tokio::time::timeout(timeout, self.read(buffer)).await {
            Err(_) => Err(RequestError::ResponseTimeout),
            Ok(Err(err)) => Err(err.into()),
            Ok(Ok(0)) => Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into()),
            Ok(Ok(count)) => Ok(count),
        }
    }
}

impl Transport for PhysLayer {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), RequestError> {
        if self.level.enabled() {
            tracing::info!("PHYS TX - {}", PhysDisplay::new(self.level, data));
        }
        let Self {
            runtime,
            layer,
            spacing,
            ..
        } = self;
        let earliest = spacing.earliest_write();
        runtime.block_on(async {
            if let Some(earliest) = earliest {
                tokio::time::sleep_until(earliest).await;
            }
            layer.write(data).await
        })?;
        spacing.on_activity();
        Ok(())
    }

    fn set_decode_level(&mut self, level: PhysDecodeLevel) {
        self.level = level;
    }
}

impl RtuTransport for PhysLayer {
    fn read_raw(
        &mut self,
        buffer: &mut [u8],
        timeouts: RawReadTimeouts,
    ) -> Result<usize, RequestError> {
        let Self { runtime, layer, .. } = self;
        let count = runtime.block_on(layer.read_raw(buffer, timeouts))?;
        self.spacing.on_activity();
        self.log_rx(&buffer[..count]);
        Ok(count)
    }

    fn set_interframe_delay(&mut self, delay: Duration) {
        self.spacing.delay = delay;
    }
}

impl StreamTransport for PhysLayer {
    fn read_some(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize, RequestError> {
        let Self { runtime, layer, .. } = self;
        let count = runtime.block_on(layer.read_some(buffer, timeout))?;
        self.log_rx(&buffer[..count]);
        Ok(count)
    }
}

pub(crate) struct PhysDisplay<'a> {
    level: PhysDecodeLevel,
    data: &'a [u8],
}

impl<'a> PhysDisplay<'a> {
    pub(crate) fn new(level: PhysDecodeLevel, data: &'a [u8]) -> Self {
        PhysDisplay { level, data }
    }
}

impl std::fmt::Display for PhysDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} bytes", self.data.len())?;
        if self.level.data_enabled() {
            format_bytes(f, self.data)?;
        }
        Ok(())
    }
}

const BYTES_PER_DECODE_LINE: usize = 18;

pub(crate) fn format_bytes(f: &mut std::fmt::Formatter, bytes: &[u8]) -> std::fmt::Result {
    for chunk in bytes.chunks(BYTES_PER_DECODE_LINE) {
        writeln!(f)?;
        let mut first = true;
        for byte in chunk {
            if !first {
                f.write_char(' ')?;
            }
            first = false;
            write!(f, "{byte:02X}")?;
        }
    }
    Ok(())
}
