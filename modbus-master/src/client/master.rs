use std::time::Duration;

use crate::client::link::{Link, RtuLink, TcpLink};
use crate::client::requests;
use crate::client::transport::RtuTransport;
use crate::common::frame::{Frame, PduDisplay};
use crate::common::function::FunctionCode;
use crate::constants::EXCEPTION_BIT;
use crate::decode::DecodeLevel;
use crate::error::{AduParseError, InvalidRequest, RequestError};
use crate::exception::RequestException;
use crate::types::{Statistics, UnitId};

/// Master over an RTU link
pub type RtuMaster<T> = Master<RtuLink<T>>;
/// Master over a TCP link
pub type TcpMaster<T> = Master<TcpLink<T>>;

/// Blocking Modbus master
///
/// Issues one request at a time and blocks until the reply is classified or the read
/// timeout expires. A master is not meant to be shared between threads; callers that do
/// so must serialize access themselves.
#[derive(Debug)]
pub struct Master<L: Link> {
    link: L,
    read_timeout: Duration,
    decode: DecodeLevel,
}

impl<L: Link> Master<L> {
    /// default time allowed for a reply
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

    /// create a master over a link
    pub fn new(link: L) -> Self {
        Self {
            link,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            decode: DecodeLevel::default(),
        }
    }

    /// time allowed for a reply, including every frame the RTU link discards
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// change the time allowed for replies to subsequent requests
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// current logging configuration
    pub fn decode_level(&self) -> DecodeLevel {
        self.decode
    }

    /// change what is logged about subsequent requests
    pub fn set_decode_level(&mut self, level: DecodeLevel) {
        self.decode = level;
        self.link.set_decode_level(level);
    }

    /// byte counters of the link
    pub fn statistics(&self) -> Statistics {
        self.link.statistics()
    }

    /// the underlying transport
    pub fn transport(&self) -> &L::Io {
        self.link.io()
    }

    /// the underlying transport, mutably
    pub fn transport_mut(&mut self) -> &mut L::Io {
        self.link.io_mut()
    }

    /// Send a request and wait for its reply
    ///
    /// Returns the reply if its function code matches `function`. An exception reply
    /// fails with [`RequestError::Exception`], any other function code with
    /// [`RequestError::BadResponse`]. On RTU the broadcast address is refused before
    /// anything is written, see [`Master::broadcast`].
    pub fn request(
        &mut self,
        address: UnitId,
        function: u8,
        payload: &[u8],
    ) -> Result<Frame, RequestError> {
        if !self.link.replies_from(address) {
            return Err(InvalidRequest::ReplyFromBroadcast.into());
        }
        self.send(address, function, payload)?;
        self.read_reply(function)
    }

    /// Read the next frame, without looking at its content
    pub fn read_frame(&mut self) -> Result<Frame, RequestError> {
        self.link.read_frame(self.read_timeout)
    }

    /// Read the next frame and classify it as the reply to `function`
    pub fn read_reply(&mut self, function: u8) -> Result<Frame, RequestError> {
        let frame = self.read_frame()?;
        if self.decode.pdu.enabled() {
            tracing::info!(
                "PDU RX - {}",
                PduDisplay::new(self.decode.pdu, frame.function, &frame.payload)
            );
        }
        classify_reply(function, frame)
    }

    /// Read `count` holding or input registers starting at `start`
    pub fn read_registers(
        &mut self,
        address: UnitId,
        is_input: bool,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, RequestError> {
        let function = if is_input {
            FunctionCode::ReadInputRegisters
        } else {
            FunctionCode::ReadHoldingRegisters
        };
        let payload = requests::encode_read_registers(start, count)?;
        let reply = self.request(address, function.get_value(), &payload)?;
        requests::decode_read_registers(&reply, count)
    }

    /// Read the holding or input register at `index`
    pub fn read_single_register(
        &mut self,
        address: UnitId,
        is_input: bool,
        index: u16,
    ) -> Result<u16, RequestError> {
        let values = self.read_registers(address, is_input, index, 1)?;
        values
            .first()
            .copied()
            .ok_or(RequestError::BadResponse(AduParseError::InsufficientBytes))
    }

    /// Write `value` to the holding register at `index`
    pub fn write_single_register(
        &mut self,
        address: UnitId,
        index: u16,
        value: u16,
    ) -> Result<(), RequestError> {
        let payload = requests::encode_write_single_register(index, value)?;
        self.request(
            address,
            FunctionCode::WriteSingleRegister.get_value(),
            &payload,
        )?;
        Ok(())
    }

    /// Switch the coil at `index` on or off
    pub fn write_single_coil(
        &mut self,
        address: UnitId,
        index: u16,
        value: bool,
    ) -> Result<(), RequestError> {
        let payload = requests::encode_write_single_coil(index, value)?;
        self.request(address, FunctionCode::WriteSingleCoil.get_value(), &payload)?;
        Ok(())
    }

    /// Read `count` coils or digital inputs starting at `start`
    pub fn read_digital_inputs(
        &mut self,
        address: UnitId,
        is_coils: bool,
        start: u16,
        count: u16,
    ) -> Result<Vec<bool>, RequestError> {
        let function = if is_coils {
            FunctionCode::ReadCoils
        } else {
            FunctionCode::ReadDiscreteInputs
        };
        let payload = requests::encode_read_digital_inputs(start, count)?;
        let reply = self.request(address, function.get_value(), &payload)?;
        requests::decode_read_digital_inputs(&reply, count)
    }

    fn send(&mut self, address: UnitId, function: u8, payload: &[u8]) -> Result<(), RequestError> {
        if self.decode.pdu.enabled() {
            tracing::info!(
                "PDU TX - {}",
                PduDisplay::new(self.decode.pdu, function, payload)
            );
        }
        self.link.send(address, function, payload)
    }
}

impl<T: RtuTransport> Master<RtuLink<T>> {
    /// create an RTU master over a transport
    pub fn rtu(io: T) -> Self {
        Self::new(RtuLink::new(io))
    }

    /// Send a request to every slave on the line, without waiting for any reply
    pub fn broadcast(&mut self, function: u8, payload: &[u8]) -> Result<(), RequestError> {
        self.send(UnitId::broadcast(), function, payload)
    }

    /// silence after which a received frame is considered complete
    pub fn interframe_delay(&self) -> Duration {
        self.link.interframe_delay()
    }

    /// Change the interframe delay
    ///
    /// The delay ends received frames and spaces outgoing requests. The default only
    /// suits lines faster than 19200 baud, slower lines need
    /// [`crate::serial::frame::interframe_duration`] of their baud rate.
    pub fn set_interframe_delay(&mut self, delay: Duration) {
        self.link.set_interframe_delay(delay);
    }
}

impl<T: crate::client::transport::StreamTransport> Master<TcpLink<T>> {
    /// create a TCP master over a transport
    pub fn tcp(io: T) -> Self {
        Self::new(TcpLink::new(io))
    }
}

fn classify_reply(function: u8, frame: Frame) -> Result<Frame, RequestError> {
    if frame.function == function {
        return Ok(frame);
    }

    if frame.function == function | EXCEPTION_BIT {
        let code = frame.payload.first().copied().unwrap_or(0);
        let ex = RequestException::new(function, code.into());
        tracing::warn!("{}", ex);
        return Err(ex.into());
    }

    let err = AduParseError::UnknownResponseFunction(
        frame.function,
        function,
        function | EXCEPTION_BIT,
    );
    tracing::warn!("{}", err);
    Err(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameParseError;
    use crate::exception::ExceptionCode;
    use crate::mock::{mock, Event, Handle, MockTransport};

    const UNIT: UnitId = UnitId::new(0x10);

    fn rtu() -> (RtuMaster<MockTransport>, Handle) {
        let (io, handle) = mock();
        (Master::rtu(io), handle)
    }

    fn tcp() -> (TcpMaster<MockTransport>, Handle) {
        let (io, handle) = mock();
        (Master::tcp(io), handle)
    }

    #[test]
    fn rtu_request_returns_matching_reply() {
        let (mut master, mut handle) = rtu();
        handle.write(&[0x02, 0x10, 1, 2, 3, 4, 5, 0x34, 0xEB]);
        handle.read(&[0x02, 0x10, 6, 7, 8, 9, 0xB6, 0xB5]);

        let reply = master
            .request(UnitId::new(0x02), 0x10, &[1, 2, 3, 4, 5])
            .unwrap();
        assert_eq!(reply, Frame::new(UnitId::new(0x02), 0x10, &[6, 7, 8, 9]));
    }

    #[test]
    fn rtu_request_rejects_unexpected_function() {
        let (mut master, mut handle) = rtu();
        handle.write(&[0x02, 0x10, 1, 2, 3, 4, 5, 0x34, 0xEB]);
        handle.read(&[0x02, 0x00, 0x01, 0x11, 0xC0]);

        assert_eq!(
            master.request(UnitId::new(0x02), 0x10, &[1, 2, 3, 4, 5]),
            Err(RequestError::BadResponse(
                AduParseError::UnknownResponseFunction(0x00, 0x10, 0x90)
            ))
        );
    }

    #[test]
    fn rtu_request_reports_exception() {
        let (mut master, mut handle) = rtu();
        handle.write(&[0x02, 0x10, 1, 2, 3, 4, 5, 0x34, 0xEB]);
        handle.read(&[0x02, 0x90, 0x01, 0x7D, 0xC0]);

        assert_eq!(
            master.request(UnitId::new(0x02), 0x10, &[1, 2, 3, 4, 5]),
            Err(RequestError::Exception(RequestException::new(
                0x10,
                ExceptionCode::IllegalFunction
            )))
        );
    }

    #[test]
    fn rtu_request_reports_exception_without_code_as_zero() {
        let (mut master, mut handle) = rtu();
        handle.write(&[0x02, 0x10, 1, 2, 3, 4, 5, 0x34, 0xEB]);
        handle.read(&[0x02, 0x90, 0x00, 0xBC]);

        match master.request(UnitId::new(0x02), 0x10, &[1, 2, 3, 4, 5]) {
            Err(RequestError::Exception(ex)) => {
                assert_eq!(ex.function, 0x10);
                assert_eq!(ex.exception_code(), 0);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rtu_broadcast_does_not_wait_for_reply() {
        let (mut master, mut handle) = rtu();
        handle.write(&[0x00, 0x10, 6, 7, 8, 9, 0xB7, 0x57]);

        master.broadcast(0x10, &[6, 7, 8, 9]).unwrap();
        assert_eq!(handle.next_event(), Some(Event::Write(8)));
        assert_eq!(handle.next_event(), None);
    }

    #[test]
    fn rtu_read_registers_resynchronizes_after_bad_crc() {
        let (mut master, mut handle) = rtu();
        handle.write(&[0x10, 0x03, 0xab, 0xcd, 0x00, 0x02, 0x76, 0x91]);
        handle.read(&[0x10, 0x03, 0x04, 0x12, 0x34, 0x56, 0x78, 0x80, 0x07]);
        handle.read(&[0x10, 0x03, 0x04, 0x12, 0x34, 0x56, 0x78, 0x80, 0x06]);

        assert_eq!(
            master.read_registers(UNIT, false, 0xabcd, 2).unwrap(),
            vec![0x1234, 0x5678]
        );
        assert_eq!(master.statistics().bad_rx, 9);
        assert_eq!(master.statistics().good_rx, 9);
    }

    #[test]
    fn rtu_read_registers_fails_on_bad_crc_without_time_budget() {
        let (mut master, mut handle) = rtu();
        master.set_read_timeout(Duration::ZERO);
        handle.write(&[0x10, 0x03, 0xab, 0xcd, 0x00, 0x02, 0x76, 0x91]);
        handle.read(&[0x10, 0x03, 0x04, 0x12, 0x34, 0x56, 0x78, 0x80, 0x07]);
        handle.read(&[0x10, 0x03, 0x04, 0x12, 0x34, 0x56, 0x78, 0x80, 0x06]);

        assert_eq!(
            master.read_registers(UNIT, false, 0xabcd, 2),
            Err(RequestError::BadFrame(FrameParseError::CrcValidationFailure(
                0x0780, 0x0680
            )))
        );
        assert_eq!(master.statistics().bad_rx, 9);
    }

    #[test]
    fn rtu_read_registers_reports_bad_crc_when_line_goes_silent() {
        let (mut master, mut handle) = rtu();
        master.set_read_timeout(Duration::from_millis(50));
        handle.write(&[0x10, 0x03, 0xab, 0xcd, 0x00, 0x02, 0x76, 0x91]);
        handle.read(&[0x10, 0x03, 0x04, 0x12, 0x34, 0x56, 0x78, 0x80, 0x07]);

        assert_eq!(
            master.read_registers(UNIT, false, 0xabcd, 2),
            Err(RequestError::BadFrame(FrameParseError::CrcValidationFailure(
                0x0780, 0x0680
            )))
        );
        assert_eq!(master.statistics().bad_rx, 9);
    }

    #[test]
    fn rtu_read_registers_times_out_when_nothing_arrives() {
        let (mut master, mut handle) = rtu();
        master.set_read_timeout(Duration::from_millis(50));
        handle.write(&[0x10, 0x03, 0xab, 0xcd, 0x00, 0x02, 0x76, 0x91]);

        assert_eq!(
            master.read_registers(UNIT, false, 0xabcd, 2),
            Err(RequestError::ResponseTimeout)
        );
        assert_eq!(master.statistics().bad_rx, 0);
    }

    #[test]
    fn rtu_read_registers_refuses_too_many_registers() {
        let (mut master, _handle) = rtu();
        assert!(matches!(
            master.read_registers(UNIT, false, 0, 129),
            Err(RequestError::BadRequest(_))
        ));
    }

    #[test]
    fn rtu_reads_single_register() {
        let (mut master, mut handle) = rtu();
        handle.write(&[0x10, 0x03, 0xab, 0xcd, 0x00, 0x01, 0x36, 0x90]);
        handle.read(&[0x10, 0x03, 0x02, 0x12, 0x34, 0x49, 0x30]);

        assert_eq!(master.read_single_register(UNIT, false, 0xabcd), Ok(0x1234));
    }

    #[test]
    fn rtu_writes_single_register() {
        let (mut master, mut handle) = rtu();
        handle.write(&[0x10, 0x06, 0xab, 0xcd, 0x12, 0x34, 0x36, 0x27]);
        handle.read(&[0x10, 0x06, 0xab, 0xcd, 0x5a, 0x40]);

        assert_eq!(master.write_single_register(UNIT, 0xabcd, 0x1234), Ok(()));
    }

    #[test]
    fn rtu_reads_coils() {
        let (mut master, mut handle) = rtu();
        handle.write(&[0x10, 0x01, 0x12, 0x34, 0x00, 0x09, 0xbb, 0xfb]);
        handle.read(&[0x10, 0x01, 0x02, 0xab, 0xcd, 0xfb, 0x5a]);

        assert_eq!(
            master.read_digital_inputs(UNIT, true, 0x1234, 9).unwrap(),
            vec![true, true, false, true, false, true, false, true, true]
        );
    }

    #[test]
    fn rtu_reads_digital_inputs() {
        let (mut master, mut handle) = rtu();
        handle.write(&[0x10, 0x02, 0x12, 0x34, 0x00, 0x09, 0xff, 0xfb]);
        handle.read(&[0x10, 0x02, 0x02, 0xab, 0xcd, 0xfb, 0x1e]);

        assert_eq!(
            master.read_digital_inputs(UNIT, false, 0x1234, 9).unwrap(),
            vec![true, true, false, true, false, true, false, true, true]
        );
    }

    #[test]
    fn rtu_writes_coil_on_and_off() {
        let (mut master, mut handle) = rtu();
        handle.write(&[0x10, 0x05, 0x12, 0x34, 0xff, 0x00, 0xcb, 0xcd]);
        handle.read(&[0x10, 0x05, 0x12, 0x34, 0xff, 0x00, 0xcb, 0xcd]);
        handle.write(&[0x10, 0x05, 0x12, 0x34, 0x00, 0x00, 0x8a, 0x3d]);
        handle.read(&[0x10, 0x05, 0x12, 0x34, 0x00, 0x00, 0x8a, 0x3d]);

        assert_eq!(master.write_single_coil(UNIT, 0x1234, true), Ok(()));
        assert_eq!(master.write_single_coil(UNIT, 0x1234, false), Ok(()));
    }

    #[test]
    fn rtu_times_out_without_reply() {
        let (mut master, mut handle) = rtu();
        handle.write(&[0x10, 0x03, 0xab, 0xcd, 0x00, 0x01, 0x36, 0x90]);

        assert_eq!(
            master.read_single_register(UNIT, false, 0xabcd),
            Err(RequestError::ResponseTimeout)
        );
    }

    #[test]
    fn rtu_request_refuses_broadcast_address() {
        let (mut master, mut handle) = rtu();
        assert_eq!(
            master.read_registers(UnitId::broadcast(), false, 0, 1),
            Err(RequestError::BadRequest(InvalidRequest::ReplyFromBroadcast))
        );
        assert_eq!(handle.next_event(), None);
        assert_eq!(master.statistics().tx, 0);
    }

    #[test]
    fn tcp_request_accepts_unit_zero() {
        let (mut master, mut handle) = tcp();
        handle.write(&[0xaa, 0x01, 0, 0, 0, 2, 0x00, 0x11]);
        handle.read(&[0xaa, 0x01, 0, 0, 0, 3, 0x00, 0x11, 0x00]);

        let reply = master.request(UnitId::new(0), 0x11, &[]).unwrap();
        assert_eq!(reply, Frame::new(UnitId::new(0), 0x11, &[0x00]));
    }

    #[test]
    fn rtu_interframe_delay_is_configurable() {
        let (mut master, _handle) = rtu();
        assert_eq!(master.interframe_delay(), Duration::from_micros(1750));
        master.set_interframe_delay(crate::serial::frame::interframe_duration(9600));
        assert_eq!(master.interframe_delay(), Duration::from_micros(4011));
        assert_eq!(
            master.transport().interframe_delay(),
            Some(Duration::from_micros(4011))
        );
    }

    #[test]
    fn tcp_request_returns_matching_reply() {
        let (mut master, mut handle) = tcp();
        handle.write(&[0xaa, 0x01, 0, 0, 0, 7, 0x10, 0x02, 1, 2, 3, 4, 5]);
        handle.read(&[0xaa, 0x01, 0, 0, 0, 6, 0x10, 0x02, 6, 7, 8, 9]);

        let reply = master.request(UNIT, 0x02, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(reply, Frame::new(UNIT, 0x02, &[6, 7, 8, 9]));
    }

    #[test]
    fn tcp_rejects_reply_to_other_transaction() {
        let (mut master, mut handle) = tcp();
        handle.write(&[0xaa, 0x01, 0, 0, 0, 7, 0x10, 0x02, 1, 2, 3, 4, 5]);
        handle.read(&[0xaa, 0x00, 0, 0, 0, 6, 0x10, 0x02, 6, 7, 8, 9]);

        assert_eq!(
            master.request(UNIT, 0x02, &[1, 2, 3, 4, 5]),
            Err(RequestError::BadFrame(
                FrameParseError::TransactionIdMismatch(0xaa00, 0xaa01)
            ))
        );
    }

    #[test]
    fn tcp_reports_exception() {
        let (mut master, mut handle) = tcp();
        handle.write(&[0xaa, 0x01, 0, 0, 0, 6, 0x10, 0x03, 0x10, 0x20, 0x00, 0x05]);
        handle.read(&[0xaa, 0x01, 0, 0, 0, 3, 0x10, 0x83, 0x02]);

        assert_eq!(
            master.read_registers(UNIT, false, 0x1020, 5),
            Err(RequestError::Exception(RequestException::new(
                0x03,
                ExceptionCode::IllegalDataAddress
            )))
        );
    }

    #[test]
    fn tcp_reads_input_registers() {
        let (mut master, mut handle) = tcp();
        handle.write(&[0xaa, 0x01, 0, 0, 0, 6, 0x10, 0x04, 0x10, 0x20, 0x00, 0x02]);
        handle.read(&[0xaa, 0x01, 0, 0, 0, 7, 0x10, 0x04, 0x04, 0xca, 0xfe, 0x00, 0x01]);

        assert_eq!(
            master.read_registers(UNIT, true, 0x1020, 2).unwrap(),
            vec![0xcafe, 0x0001]
        );
    }

    #[test]
    fn tcp_write_failure_is_reported() {
        let (mut master, mut handle) = tcp();
        handle.write_error(std::io::ErrorKind::BrokenPipe);

        assert_eq!(
            master.write_single_register(UNIT, 0x0001, 0x0002),
            Err(RequestError::Io(std::io::ErrorKind::BrokenPipe))
        );
    }

    #[test]
    fn tcp_discards_partial_reply_of_timed_out_request() {
        let (mut master, mut handle) = tcp();
        handle.write(&[0xaa, 0x01, 0, 0, 0, 6, 0x10, 0x04, 0x10, 0x20, 0x00, 0x02]);
        handle.read(&[0xaa, 0x01, 0, 0, 0, 7, 0x10]);
        handle.write(&[0xaa, 0x02, 0, 0, 0, 6, 0x10, 0x04, 0x10, 0x20, 0x00, 0x02]);
        handle.read(&[0xaa, 0x02, 0, 0, 0, 7, 0x10, 0x04, 0x04, 0xca, 0xfe, 0x00, 0x01]);

        assert_eq!(
            master.read_registers(UNIT, true, 0x1020, 2),
            Err(RequestError::ResponseTimeout)
        );
        assert_eq!(
            master.read_registers(UNIT, true, 0x1020, 2).unwrap(),
            vec![0xcafe, 0x0001]
        );
        assert_eq!(master.statistics().bad_rx, 7);
    }
}
