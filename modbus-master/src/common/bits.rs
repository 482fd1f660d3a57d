pub(crate) fn num_bytes_for_bits(count: u16) -> usize {
    (usize::from(count) + 7) / 8
}

/// unpack `count` bits, LSB first within each byte, bytes in order
pub(crate) fn unpack_bits(bytes: &[u8], count: u16) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).map(move |bit| byte & (1 << bit) != 0))
        .take(usize::from(count))
        .collect()
}
