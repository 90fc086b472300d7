//! BITS helpers. Bit 0 is the most significant bit of the first octet.

/// Four octets encoding `value` with bit 0 leftmost.
pub fn bits_from_u32(value: u32) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// The two leading octets of `value`, i.e. bits 0..16.
pub fn bits_from_u16(value: u32) -> Vec<u8> {
    value.to_be_bytes()[..2].to_vec()
}

/// Pack bit positions into an integer; positions past 31 are ignored.
pub fn bits_to_u32(positions: &[usize]) -> u32 {
    positions
        .iter()
        .filter(|p| **p < 32)
        .fold(0u32, |acc, p| acc | (0x8000_0000u32 >> p))
}

/// Positions of the set bits in `octets`, ascending.
pub fn bits_positions(octets: &[u8]) -> Vec<usize> {
    let mut out = Vec::new();
    for (i, byte) in octets.iter().enumerate() {
        for bit in 0..8 {
            if byte & (0x80 >> bit) != 0 {
                out.push(i * 8 + bit);
            }
        }
    }
    out
}
