use std::net::SocketAddr;
use std::time::Duration;

use crate::common::phys::PhysLayer;
use crate::error::RequestError;

/// links pairing a transport with its frame codec
pub mod link;
/// the master engine
pub mod master;
/// function specific payload encoding and decoding
pub mod requests;
/// transport capabilities required by the links
pub mod transport;

pub use master::{Master, RtuMaster, TcpMaster};

/// Connect to a TCP slave and create a master over the connection
///
/// * `addr` - Socket address of the slave
/// * `connect_timeout` - how long to wait for the connection to be established
pub fn connect_tcp_master(
    addr: SocketAddr,
    connect_timeout: Duration,
) -> Result<TcpMaster<PhysLayer>, RequestError> {
    Ok(Master::tcp(PhysLayer::connect_tcp(addr, connect_timeout)?))
}

/// Open a serial port and create an RTU master over it
///
/// The interframe delay is derived from the baud rate of `settings`.
///
/// * `path` - Path of the serial device, e.g. `/dev/ttyUSB0` or `COM1`
/// * `settings` - Baud rate and character format of the line
#[cfg(feature = "serial")]
pub fn open_rtu_master(
    path: &str,
    settings: crate::serial::SerialSettings,
) -> Result<RtuMaster<PhysLayer>, RequestError> {
    let mut master = Master::rtu(PhysLayer::open_serial(path, settings)?);
    master.set_interframe_delay(crate::serial::frame::interframe_duration(
        settings.baud_rate,
    ));
    Ok(master)
}
