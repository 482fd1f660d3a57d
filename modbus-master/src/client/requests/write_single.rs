use crate::common::cursor::WriteCursor;
use crate::constants::coil;
use crate::error::RequestError;

fn encode_index_and_value(index: u16, value: u16) -> Result<Vec<u8>, RequestError> {
    let mut payload = vec![0; 4];
    let mut cursor = WriteCursor::new(&mut payload);
    cursor.write_u16_be(index)?;
    cursor.write_u16_be(value)?;
    Ok(payload)
}

/// Payload of a write single register request
pub fn encode_write_single_register(index: u16, value: u16) -> Result<Vec<u8>, RequestError> {
    encode_index_and_value(index, value)
}

/// Payload of a write single coil request, ON is `0xFF00`
pub fn encode_write_single_coil(index: u16, value: bool) -> Result<Vec<u8>, RequestError> {
    encode_index_and_value(index, if value { coil::ON } else { coil::OFF })
}
