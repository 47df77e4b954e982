// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! L0: pure bit-twiddling helpers used by the rest of the crate.
//!
//! Nothing here can fail or touch the bus; it exists so the request
//! generator, the data phase, and the logging call sites all compute parity
//! and render binary strings the same way.

use std::string::String;

/// Even parity over the low 8 bits of `data`: 1 if an odd number of bits
/// are set, 0 otherwise (so XORing the parity bit back in always yields an
/// even total number of set bits).
pub fn parity8(data: u8) -> u8 {
    (data.count_ones() & 1) as u8
}

/// Even parity over all 32 bits of `data`.
pub fn parity32(data: u32) -> u8 {
    (data.count_ones() & 1) as u8
}

/// Reverse the bit order within each byte of `buffer`, covering exactly
/// `bitcount` bits (the trailing bits of the final byte, if `bitcount` is
/// not a multiple of 8, are left untouched).
pub fn bitswap8(buffer: &mut [u8], bitcount: usize) {
    let full_bytes = bitcount / 8;
    for byte in buffer.iter_mut().take(full_bytes) {
        *byte = byte.reverse_bits();
    }
}

/// Reverse the bit order of each 32-bit word in `buffer`, covering exactly
/// `bitcount` bits.
pub fn bitswap32(buffer: &mut [u32], bitcount: usize) {
    let full_words = bitcount / 32;
    for word in buffer.iter_mut().take(full_words) {
        *word = word.reverse_bits();
    }
}

/// Render an 8-bit word as a `"0"`/`"1"` string, MSB first, for trace logging.
pub fn bin8_string(data: u8) -> String {
    (0..8)
        .rev()
        .map(|bit| if data & (1 << bit) != 0 { '1' } else { '0' })
        .collect()
}

/// Render a 32-bit word as a `"0"`/`"1"` string, MSB first, for trace logging.
pub fn bin32_string(data: u32) -> String {
    (0..32)
        .rev()
        .map(|bit| if data & (1 << bit) != 0 { '1' } else { '0' })
        .collect()
}
