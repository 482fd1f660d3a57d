/// Controls what a master logs about the requests it sends and the replies it reads
///
/// Every enabled level produces `tracing` events at the INFO level.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeLevel {
    /// function code and payload of requests and replies
    pub pdu: PduDecodeLevel,
    /// RTU address / CRC or MBAP header of each frame
    pub adu: AduDecodeLevel,
    /// raw bytes written to and read from the transport
    pub physical: PhysDecodeLevel,
}

/// Controls how request and reply PDUs are logged
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PduDecodeLevel {
    /// Log nothing
    #[default]
    Nothing,
    /// Log the function code only
    FunctionCode,
    /// Log the function code and the payload length
    DataHeaders,
    /// Log the function code, the payload length and the payload bytes
    DataValues,
}

/// Controls how frames are logged
///
/// On TCP this is the MBAP header. On serial, the address and CRC.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AduDecodeLevel {
    /// Log nothing
    #[default]
    Nothing,
    /// Log the header
    Header,
    /// Log the header and the payload as hexadecimal
    Payload,
}

/// Controls how bytes moved by the transport are logged
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PhysDecodeLevel {
    /// Log nothing
    #[default]
    Nothing,
    /// Log only the number of bytes
    Length,
    /// Log the number of bytes and the bytes themselves
    Data,
}

impl DecodeLevel {
    /// `DecodeLevel` with everything disabled
    pub fn nothing() -> Self {
        Self::default()
    }

    /// `DecodeLevel` with everything enabled at its most verbose setting
    pub fn everything() -> Self {
        Self::new(
            PduDecodeLevel::DataValues,
            AduDecodeLevel::Payload,
            PhysDecodeLevel::Data,
        )
    }

    /// construct a `DecodeLevel` from its fields
    pub fn new(pdu: PduDecodeLevel, adu: AduDecodeLevel, physical: PhysDecodeLevel) -> Self {
        Self { pdu, adu, physical }
    }
}

impl From<PduDecodeLevel> for DecodeLevel {
    fn from(pdu: PduDecodeLevel) -> Self {
        Self {
            pdu,
            ..Default::default()
        }
    }
}

impl PduDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, PduDecodeLevel::Nothing)
    }

    pub(crate) fn data_headers(&self) -> bool {
        matches!(
            self,
            PduDecodeLevel::DataHeaders | PduDecodeLevel::DataValues
        )
    }

    pub(crate) fn data_values(&self) -> bool {
        matches!(self, PduDecodeLevel::DataValues)
    }
}

impl AduDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, AduDecodeLevel::Nothing)
    }

    pub(crate) fn payload_enabled(&self) -> bool {
        matches!(self, AduDecodeLevel::Payload)
    }
}

impl PhysDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, PhysDecodeLevel::Nothing)
    }

    pub(crate) fn data_enabled(&self) -> bool {
        matches!(self, PhysDecodeLevel::Data)
    }
}
