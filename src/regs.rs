// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! DP/AP register address constants and the bitfield layouts of SELECT and
//! ABORT, straight out of the ADIv5 register map.

use bitflags::bitflags;

/// DP register address when CTRLSEL=0 (the common case): IDCODE on read,
/// ABORT on write.
pub const DP_IDCODE: u8 = 0;
pub const DP_ABORT: u8 = 0;
/// DP CTRL/STAT address when CTRLSEL=0; the same address selects WCR when
/// CTRLSEL=1 (see [`Select::CTRLSEL`]).
pub const DP_CTRLSTAT: u8 = 1;
pub const DP_WCR: u8 = 1;
pub const DP_RESEND: u8 = 2;
pub const DP_SELECT: u8 = 2;
pub const DP_RDBUFF: u8 = 3;

/// AHB-AP register map, needed only for the read-fence end-to-end scenario
/// and for callers composing their own AP accesses; full memory-access
/// helpers beyond register read/write are out of scope.
pub const AHB_AP_CSW: u8 = 0x00;
pub const AHB_AP_TAR: u8 = 0x04;
pub const AHB_AP_DRW: u8 = 0x0C;
pub const AHB_AP_BD0: u8 = 0x10;
pub const AHB_AP_BD1: u8 = 0x14;
pub const AHB_AP_BD2: u8 = 0x18;
pub const AHB_AP_BD3: u8 = 0x1C;
pub const AHB_AP_DROMT: u8 = 0xF8;
pub const AHB_AP_IDR: u8 = 0xFC;

bitflags! {
    /// Bits of the DP ABORT register (write-only). `errors_handle` only
    /// ever sets the sticky-clear bits; `DAPABORT` is reachable only via an
    /// explicit direct write, never from the WAIT-retry path.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Abort: u32 {
        const DAPABORT    = 1 << 0;
        const STKCMPCLR   = 1 << 1;
        const STKERRCLR   = 1 << 2;
        const WDERRCLR    = 1 << 3;
        const ORUNERRCLR  = 1 << 4;
    }
}

impl Abort {
    /// The mask the WAIT-retry sticky-error handler is allowed to apply:
    /// every sticky-clear bit except DAPABORT.
    pub const STICKY_CLEAR_MASK: Abort = Abort::STKCMPCLR
        .union(Abort::STKERRCLR)
        .union(Abort::WDERRCLR)
        .union(Abort::ORUNERRCLR);
}

bitflags! {
    /// Bits of the DP CTRL/STAT register that this core cares about (sticky
    /// error flags inspected by the caller after a FAULT).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CtrlStat: u32 {
        const ORUNDETECT     = 1 << 0;
        const STICKYORUN     = 1 << 1;
        const STICKYCMP      = 1 << 4;
        const STICKYERR      = 1 << 5;
        const READOK         = 1 << 6;
        const WDATAERR       = 1 << 7;
        const CDBGRSTREQ     = 1 << 26;
        const CDBGRSTACK     = 1 << 27;
        const CDBGPWRUPREQ   = 1 << 28;
        const CDBGPWRUPACK   = 1 << 29;
        const CSYSPWRUPREQ   = 1 << 30;
        const CSYSPWRUPACK   = 1 << 31;
    }
}

/// Bit position of CTRLSEL in SELECT: 0 selects CTRL/STAT at address 1,
/// 1 selects WCR at the same address.
pub const SELECT_CTRLSEL_BIT: u32 = 0;
/// Bit position of the low bit of APBANKSEL in SELECT.
pub const SELECT_APBANKSEL_SHIFT: u32 = 4;
/// Mask of the APBANKSEL field within SELECT.
pub const SELECT_APBANKSEL_MASK: u32 = 0x0000_00F0;
/// Bit position of the low bit of APSEL in SELECT.
pub const SELECT_APSEL_SHIFT: u32 = 24;
/// Mask of the APSEL field within SELECT.
pub const SELECT_APSEL_MASK: u32 = 0xFF00_0000;

/// Decompose an AP register address into (APBANKSEL nibble, address within
/// the bank). The bank occupies bits [7:4] of the address; only bits [3:2]
/// select the register within the bank.
pub fn apbank_of(addr: u8) -> u32 {
    (addr as u32) & SELECT_APBANKSEL_MASK
}

/// Compute the new SELECT value after changing APBANKSEL, preserving the
/// existing APSEL and CTRLSEL fields.
pub fn select_with_apbank(current: u32, addr: u8) -> u32 {
    (current & !SELECT_APBANKSEL_MASK) | apbank_of(addr)
}

/// Compute the new SELECT value after changing APSEL, preserving the
/// existing APBANKSEL and CTRLSEL fields.
pub fn select_with_apsel(current: u32, apsel: u8) -> u32 {
    ((apsel as u32) << SELECT_APSEL_SHIFT) | (current & !SELECT_APSEL_MASK)
}

/// Currently-selected AP index encoded in a cached SELECT value.
pub fn apsel_of(select: u32) -> u8 {
    ((select & SELECT_APSEL_MASK) >> SELECT_APSEL_SHIFT) as u8
}
