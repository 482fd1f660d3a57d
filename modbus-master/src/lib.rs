//! A blocking implementation of a [Modbus](http://modbus.org/) master
//! for RTU over serial lines and TCP.
//!
//! # Features
//!
//! * Panic-free parsing of RTU and MBAP frames
//! * Resynchronization of RTU framing after line noise
//! * Transaction id correlation on TCP
//! * Per-link byte statistics
//! * Configurable protocol decoding via [tracing](https://docs.rs/tracing)
//! * Scriptable in-memory transport for testing, see [`mock`]
//!
//! # Supported Functions
//!
//! * Read Coils
//! * Read Discrete Inputs
//! * Read Holding Registers
//! * Read Input Registers
//! * Write Single Coil
//! * Write Single Register
//!
//! Any other function can be sent with [`Master::request`].
//!
//! # Example
//!
//! Poll some holding registers from a TCP slave
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use modbus_master::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut master =
//!         connect_tcp_master("127.0.0.1:502".parse()?, Duration::from_secs(1))?;
//!     master.set_read_timeout(Duration::from_millis(500));
//!
//!     loop {
//!         match master.read_registers(UnitId::new(1), false, 0, 5) {
//!             Ok(values) => {
//!                 for (index, value) in values.iter().enumerate() {
//!                     println!("index: {} value: {}", index, value);
//!                 }
//!             }
//!             Err(err) => println!("error: {}", err),
//!         }
//!         std::thread::sleep(Duration::from_secs(3));
//!     }
//! }
//! ```

/// master engine, links and transports
pub mod client;
/// protocol decoding configuration
pub mod decode;
/// error types returned by the library
pub mod error;
/// modbus exception codes
pub mod exception;
pub mod mock;
pub mod serial;
pub mod tcp;
/// common types used throughout the library
pub mod types;

mod common;
mod constants;

pub use crate::client::*;
pub use crate::common::frame::Frame;
pub use crate::common::function::FunctionCode;
pub use crate::common::phys::PhysLayer;
pub use crate::decode::*;
pub use crate::error::*;
pub use crate::exception::*;
pub use crate::serial::{DataBits, FlowControl, Parity, SerialSettings, StopBits};
pub use crate::types::*;
