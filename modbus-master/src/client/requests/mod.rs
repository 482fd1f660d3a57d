mod read_bits;
mod read_registers;
mod write_single;

pub use read_bits::*;
pub use read_registers::*;
pub use write_single::*;
