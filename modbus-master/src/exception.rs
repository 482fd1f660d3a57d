use crate::constants::exceptions;

/// Exception codes a slave may return in an exception reply
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq)]
pub enum ExceptionCode {
    /// The function code received in the query is not an allowable action for the slave
    IllegalFunction,
    /// The data address received in the query is not an allowable address for the slave
    IllegalDataAddress,
    /// A value contained in the request is not an allowable value for the slave
    IllegalDataValue,
    /// An unrecoverable error occurred while the slave was attempting to perform the requested
    /// action
    ServerDeviceFailure,
    /// The slave has accepted the request and is processing it
    Acknowledge,
    /// The slave is engaged in processing a long-duration command, try again later
    ServerDeviceBusy,
    /// The slave detected a parity error while reading its memory
    MemoryParityError,
    /// A gateway was unable to allocate a path from its input port to its output port
    GatewayPathUnavailable,
    /// A gateway received no response from the target device
    GatewayTargetDeviceFailedToRespond,
    /// Any code not named by the protocol, including the 0 reported for an empty
    /// exception reply
    Unknown(u8),
}

impl From<u8> for ExceptionCode {
    fn from(value: u8) -> Self {
        match value {
            exceptions::ILLEGAL_FUNCTION => ExceptionCode::IllegalFunction,
            exceptions::ILLEGAL_DATA_ADDRESS => ExceptionCode::IllegalDataAddress,
            exceptions::ILLEGAL_DATA_VALUE => ExceptionCode::IllegalDataValue,
            exceptions::SERVER_DEVICE_FAILURE => ExceptionCode::ServerDeviceFailure,
            exceptions::ACKNOWLEDGE => ExceptionCode::Acknowledge,
            exceptions::SERVER_DEVICE_BUSY => ExceptionCode::ServerDeviceBusy,
            exceptions::MEMORY_PARITY_ERROR => ExceptionCode::MemoryParityError,
            exceptions::GATEWAY_PATH_UNAVAILABLE => ExceptionCode::GatewayPathUnavailable,
            exceptions::GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND => {
                ExceptionCode::GatewayTargetDeviceFailedToRespond
            }
            _ => ExceptionCode::Unknown(value),
        }
    }
}

impl From<ExceptionCode> for u8 {
    fn from(ex: ExceptionCode) -> Self {
        match ex {
            ExceptionCode::IllegalFunction => exceptions::ILLEGAL_FUNCTION,
            ExceptionCode::IllegalDataAddress => exceptions::ILLEGAL_DATA_ADDRESS,
            ExceptionCode::IllegalDataValue => exceptions::ILLEGAL_DATA_VALUE,
            ExceptionCode::ServerDeviceFailure => exceptions::SERVER_DEVICE_FAILURE,
            ExceptionCode::Acknowledge => exceptions::ACKNOWLEDGE,
            ExceptionCode::ServerDeviceBusy => exceptions::SERVER_DEVICE_BUSY,
            ExceptionCode::MemoryParityError => exceptions::MEMORY_PARITY_ERROR,
            ExceptionCode::GatewayPathUnavailable => exceptions::GATEWAY_PATH_UNAVAILABLE,
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                exceptions::GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND
            }
            ExceptionCode::Unknown(value) => value,
        }
    }
}

impl std::error::Error for ExceptionCode {}

impl std::fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ExceptionCode::IllegalFunction => f.write_str("function code is not an allowable action for the slave"),
            ExceptionCode::IllegalDataAddress => f.write_str("data address is not an allowable address for the slave"),
            ExceptionCode::IllegalDataValue => f.write_str("value contained in the request is not allowable for the slave"),
            ExceptionCode::ServerDeviceFailure => f.write_str("unrecoverable error occurred while the slave was performing the requested action"),
            ExceptionCode::Acknowledge => f.write_str("slave has accepted the request and is processing it"),
            ExceptionCode::ServerDeviceBusy => f.write_str("slave is busy processing a long-duration command, try again later"),
            ExceptionCode::MemoryParityError => f.write_str("slave detected a parity error in its memory"),
            ExceptionCode::GatewayPathUnavailable => f.write_str("gateway was unable to allocate a path from its input port to its output port"),
            ExceptionCode::GatewayTargetDeviceFailedToRespond => f.write_str("gateway did not receive a response from the target device"),
            ExceptionCode::Unknown(code) => write!(f, "unknown exception code: {code}"),
        }
    }
}

/// Exception reply received for a request
///
/// Carries the function code of the request, not the `0x80` flagged code of the reply
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestException {
    /// function code of the failed request
    pub function: u8,
    /// exception code returned by the slave
    pub code: ExceptionCode,
}

impl RequestException {
    /// create an exception from the request function and the reported code
    pub fn new(function: u8, code: ExceptionCode) -> Self {
        Self { function, code }
    }

    /// raw exception code as it was on the wire
    pub fn exception_code(&self) -> u8 {
        self.code.into()
    }
}

impl std::error::Error for RequestException {}

impl std::fmt::Display for RequestException {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "request with function {:#04X} failed with exception {:#04X}: {}",
            self.function,
            self.exception_code(),
            self.code
        )
    }
}
