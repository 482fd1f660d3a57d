use std::fmt::{Display, Formatter};

use crate::constants::EXCEPTION_BIT;

mod constants {
    pub(crate) const READ_COILS: u8 = 1;
    pub(crate) const READ_DISCRETE_INPUTS: u8 = 2;
    pub(crate) const READ_HOLDING_REGISTERS: u8 = 3;
    pub(crate) const READ_INPUT_REGISTERS: u8 = 4;
    pub(crate) const WRITE_SINGLE_COIL: u8 = 5;
    pub(crate) const WRITE_SINGLE_REGISTER: u8 = 6;
}

/// Function codes issued by the typed master operations
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    /// read coils (0x01)
    ReadCoils = constants::READ_COILS,
    /// read digital inputs (0x02)
    ReadDiscreteInputs = constants::READ_DISCRETE_INPUTS,
    /// read holding registers (0x03)
    ReadHoldingRegisters = constants::READ_HOLDING_REGISTERS,
    /// read input registers (0x04)
    ReadInputRegisters = constants::READ_INPUT_REGISTERS,
    /// write single coil (0x05)
    WriteSingleCoil = constants::WRITE_SINGLE_COIL,
    /// write single register (0x06)
    WriteSingleRegister = constants::WRITE_SINGLE_REGISTER,
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FunctionCode::ReadCoils => "READ COILS",
            FunctionCode::ReadDiscreteInputs => "READ DISCRETE INPUTS",
            FunctionCode::ReadHoldingRegisters => "READ HOLDING REGISTERS",
            FunctionCode::ReadInputRegisters => "READ INPUT REGISTERS",
            FunctionCode::WriteSingleCoil => "WRITE SINGLE COIL",
            FunctionCode::WriteSingleRegister => "WRITE SINGLE REGISTER",
        };
        write!(f, "{} ({:#04X})", name, self.get_value())
    }
}

impl FunctionCode {
    /// raw function code
    pub const fn get_value(self) -> u8 {
        self as u8
    }

    /// function code of the matching exception reply
    pub const fn as_error(self) -> u8 {
        self.get_value() | EXCEPTION_BIT
    }

    /// look up a raw function code
    pub fn get(value: u8) -> Option<Self> {
        match value {
            constants::READ_COILS => Some(FunctionCode::ReadCoils),
            constants::READ_DISCRETE_INPUTS => Some(FunctionCode::ReadDiscreteInputs),
            constants::READ_HOLDING_REGISTERS => Some(FunctionCode::ReadHoldingRegisters),
            constants::READ_INPUT_REGISTERS => Some(FunctionCode::ReadInputRegisters),
            constants::WRITE_SINGLE_COIL => Some(FunctionCode::WriteSingleCoil),
            constants::WRITE_SINGLE_REGISTER => Some(FunctionCode::WriteSingleRegister),
            _ => None,
        }
    }
}

/// Classification of a raw function code for display
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum FunctionField {
    Valid(FunctionCode),
    Exception(FunctionCode),
    Unknown(u8),
}

impl FunctionField {
    pub(crate) fn from_raw(value: u8) -> Self {
        if value & EXCEPTION_BIT != 0 {
            if let Some(function) = FunctionCode::get(value & !EXCEPTION_BIT) {
                return FunctionField::Exception(function);
            }
        }
        match FunctionCode::get(value) {
            Some(function) => FunctionField::Valid(function),
            None => FunctionField::Unknown(value),
        }
    }
}

impl Display for FunctionField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionField::Valid(function) => write!(f, "{function}"),
            FunctionField::Exception(function) => write!(f, "{function} [EXCEPTION]"),
            FunctionField::Unknown(value) => write!(f, "UNKNOWN FUNCTION ({value:#04X})"),
        }
    }
}
