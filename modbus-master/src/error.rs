use crate::exception::RequestException;

/// Top level error type returned by every master operation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestError {
    /// An I/O error occurred on the underlying transport
    Io(std::io::ErrorKind),
    /// The slave replied with a Modbus exception
    Exception(RequestException),
    /// Request parameters violate a protocol bound
    BadRequest(InvalidRequest),
    /// Received bytes could not be parsed as a frame
    BadFrame(FrameParseError),
    /// A frame was received, but its content does not answer the request
    BadResponse(AduParseError),
    /// No valid frame was received within the configured read timeout
    ResponseTimeout,
    /// An internal error occurred in the library itself
    ///
    /// These errors should never happen, but are trapped here for reporting purposes
    Internal(InternalError),
}

impl RequestError {
    /// true for the frame errors the RTU master skips over while its read budget lasts
    pub fn is_resync_candidate(&self) -> bool {
        matches!(
            self,
            RequestError::BadFrame(FrameParseError::TooSmall(_, _))
                | RequestError::BadFrame(FrameParseError::CrcValidationFailure(_, _))
        )
    }
}

impl std::error::Error for RequestError {}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RequestError::Io(kind) => write!(f, "I/O error: {kind}"),
            RequestError::Exception(err) => write!(f, "{err}"),
            RequestError::BadRequest(err) => write!(f, "{err}"),
            RequestError::BadFrame(err) => write!(f, "{err}"),
            RequestError::BadResponse(err) => write!(f, "{err}"),
            RequestError::ResponseTimeout => {
                f.write_str("no valid reply was received within the read timeout")
            }
            RequestError::Internal(err) => write!(f, "{err}"),
        }
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        RequestError::Io(err.kind())
    }
}

impl From<RequestException> for RequestError {
    fn from(err: RequestException) -> Self {
        RequestError::Exception(err)
    }
}

impl From<InvalidRequest> for RequestError {
    fn from(err: InvalidRequest) -> Self {
        RequestError::BadRequest(err)
    }
}

impl From<FrameParseError> for RequestError {
    fn from(err: FrameParseError) -> Self {
        RequestError::BadFrame(err)
    }
}

impl From<AduParseError> for RequestError {
    fn from(err: AduParseError) -> Self {
        RequestError::BadResponse(err)
    }
}

impl From<InternalError> for RequestError {
    fn from(err: InternalError) -> Self {
        RequestError::Internal(err)
    }
}

/// Errors that result from bad request parameters
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InvalidRequest {
    /// The payload does not fit in a frame of the active transport
    PayloadTooBig(usize, usize), // size / max
    /// The requested count exceeds what a single request may ask for
    CountTooBigForType(u16, u16), // count / max
    /// start + count would address beyond register 65535
    AddressOverflow(u16, u16), // start / count
    /// A reply was requested from the RTU broadcast address, which never answers
    ReplyFromBroadcast,
}

impl std::error::Error for InvalidRequest {}

impl std::fmt::Display for InvalidRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InvalidRequest::PayloadTooBig(size, max) => write!(
                f,
                "payload of {size} bytes exceeds the maximum of {max} bytes for this transport"
            ),
            InvalidRequest::CountTooBigForType(count, max) => write!(
                f,
                "the request count of {count} exceeds maximum allowed count of {max} for this type"
            ),
            InvalidRequest::AddressOverflow(start, count) => write!(
                f,
                "start == {start} and count == {count} would address beyond register 65535"
            ),
            InvalidRequest::ReplyFromBroadcast => f.write_str(
                "slaves never reply to the broadcast address, use a broadcast request instead"
            ),
        }
    }
}

/// Errors that occur while parsing a frame (TCP or serial)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameParseError {
    /// The buffer is too short for the frame it should contain
    TooSmall(usize, usize), // required / actual
    /// Received RTU frame with an invalid CRC
    CrcValidationFailure(u16, u16), // received / expected
    /// Received TCP frame answering another transaction
    TransactionIdMismatch(u16, u16), // received / expected
}

impl std::error::Error for FrameParseError {}

impl std::fmt::Display for FrameParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FrameParseError::TooSmall(required, actual) => write!(
                f,
                "frame requires {required} bytes, but only {actual} are available"
            ),
            FrameParseError::CrcValidationFailure(received, expected) => write!(
                f,
                "received RTU frame with CRC {received:#06X}, but expected {expected:#06X}"
            ),
            FrameParseError::TransactionIdMismatch(received, expected) => write!(
                f,
                "received TCP frame with transaction id {received:#06X}, but expected {expected:#06X}"
            ),
        }
    }
}

/// Errors that occur while interpreting a reply to a request
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AduParseError {
    /// Reply is too short to be valid
    InsufficientBytes,
    /// Byte count doesn't match what is expected based on the request
    RequestByteCountMismatch(usize, usize), // expected / actual
    /// Byte count doesn't match the actual number of bytes present
    InsufficientBytesForByteCount(usize, usize), // count / remaining
    /// Reply function code is neither the request's nor its exception form
    UnknownResponseFunction(u8, u8, u8), // actual, expected, expected error
}

impl std::error::Error for AduParseError {}

impl std::fmt::Display for AduParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AduParseError::InsufficientBytes => f.write_str("response is too short to be valid"),
            AduParseError::RequestByteCountMismatch(request, response) => write!(
                f,
                "byte count ({response}) doesn't match what is expected based on request ({request})"
            ),
            AduParseError::InsufficientBytesForByteCount(count, remaining) => write!(
                f,
                "byte count ({count}) doesn't match the actual number of bytes remaining ({remaining})"
            ),
            AduParseError::UnknownResponseFunction(actual, expected, error) => write!(
                f,
                "received unknown response function code: {actual:#04X}. Expected {expected:#04X} or {error:#04X}"
            ),
        }
    }
}

/// Errors that indicate faulty logic in the library itself if they occur
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InternalError {
    /// Insufficient space for write operation
    InsufficientWriteSpace(usize, usize), // written vs remaining space
    /// Attempted to read more bytes than present
    InsufficientBytesForRead(usize, usize), // requested vs remaining
}

impl std::error::Error for InternalError {}

impl std::fmt::Display for InternalError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InternalError::InsufficientWriteSpace(written, remaining) => write!(
                f,
                "attempted to write {written} bytes with {remaining} bytes remaining"
            ),
            InternalError::InsufficientBytesForRead(requested, remaining) => write!(
                f,
                "attempted to read {requested} bytes with only {remaining} remaining"
            ),
        }
    }
}
