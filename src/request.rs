// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! L2: the 8-bit SWD request header.
//!
//! Layout (LSB first on the wire): start(1) | APnDP | RnW | A2 | A3 | parity
//! | stop(0) | park(1). `addr` here is the 2-bit register selector (i.e.
//! bits [3:2] of the full register address), matching the `a` parameter of
//! the reference `make_request` and the `addr` parameter of
//! `libswd_bitgen8_request`.

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PortKind {
    Dp,
    Ap,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Write,
    Read,
}

/// Build the 8-bit request header for a DP/AP register access.
///
/// `addr` must fit in the 2-bit register selector; anything else is a
/// caller bug and reported as [`Error::Range`].
pub fn make_request(port: PortKind, access: Access, addr: u8) -> Result<u8> {
    if addr > 0b11 {
        return Err(Error::Range { field: "addr", value: addr as u32 });
    }
    let apndp = matches!(port, PortKind::Ap) as u8;
    let rnw = matches!(access, Access::Read) as u8;
    // Start and park are constant 1 bits; including them in the parity count
    // is harmless since they contribute an even number of extra set bits.
    let req = 1 | (apndp << 1) | (rnw << 2) | (addr << 3) | (1 << 7);
    let parity = req.count_ones() as u8 & 1;
    Ok(req | (parity << 5))
}

/// Decode a request byte back into its fields, validating start/stop/park
/// and parity. Used by the loopback driver and by tests; the real bus never
/// needs to parse its own requests.
pub fn parse_request(request: u8) -> Result<(PortKind, Access, u8)> {
    let start = request & 1;
    let apndp = (request >> 1) & 1;
    let rnw = (request >> 2) & 1;
    let addr = (request >> 3) & 0b11;
    let parity = (request >> 5) & 1;
    let stop = (request >> 6) & 1;
    let park = (request >> 7) & 1;
    if start != 1 || stop != 0 || park != 1 {
        return Err(Error::Range { field: "request", value: request as u32 });
    }
    let expected_parity = (apndp ^ rnw ^ (addr & 1) ^ (addr >> 1)) & 1;
    if parity != expected_parity {
        return Err(Error::Parity);
    }
    let port = if apndp == 1 { PortKind::Ap } else { PortKind::Dp };
    let access = if rnw == 1 { Access::Read } else { Access::Write };
    Ok((port, access, addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_every_field_combination() {
        for port in [PortKind::Dp, PortKind::Ap] {
            for access in [Access::Read, Access::Write] {
                for addr in 0..4u8 {
                    let req = make_request(port, access, addr).unwrap();
                    let (p, a, ad) = parse_request(req).unwrap();
                    assert_eq!(p, port);
                    assert_eq!(a, access);
                    assert_eq!(ad, addr);
                }
            }
        }
    }

    #[test]
    fn rejects_out_of_range_addr() {
        assert!(make_request(PortKind::Dp, Access::Read, 4).is_err());
    }

    #[test]
    fn dp_read_idcode_matches_known_byte() {
        // APnDP=0, RnW=1, addr=0 (IDCODE): start=1 park=1 only, parity of
        // (apndp,rnw,a2,a3) = parity(0,1,0,0) = 1.
        let req = make_request(PortKind::Dp, Access::Read, 0).unwrap();
        assert_eq!(req, 0b1010_0101);
    }
}
