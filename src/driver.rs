// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! The contract a physical (or simulated) SWD adapter must implement.
//!
//! Everything above this trait — the queue, the bit generator, flush, the
//! transaction layer — is adapter-agnostic. An FTDI MPSSE adapter, a bitbanged
//! GPIO adapter, and the loopback mock used in the test suite all plug in
//! here.

/// A physical SWD bus. Every method transfers exactly the stated number of
/// clock edges; the driver owns line direction switching for `mosi_*` vs
/// `miso_*` calls but not the turnaround clocking itself (that is its own
/// explicit phase, see [`mosi_trn`](Driver::mosi_trn)/[`miso_trn`](Driver::miso_trn)).
pub trait Driver {
    /// The driver's own error type. Wrapped into [`crate::error::Error::Driver`]
    /// by every call site above this trait.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Drive `bits` bits of `byte` (LSB first) onto SWDIO, MSB of `byte`
    /// ignored above `bits`.
    fn mosi_8(&mut self, byte: u8, bits: u8) -> Result<(), Self::Error>;

    /// Drive `bits` bits of `word` (LSB first) onto SWDIO.
    fn mosi_32(&mut self, word: u32, bits: u8) -> Result<(), Self::Error>;

    /// Clock `bits` turnaround cycles with the driver still driving SWDIO
    /// (MOSI->MISO turnaround owns the last driven clock).
    fn mosi_trn(&mut self, bits: u8) -> Result<(), Self::Error>;

    /// Sample `bits` bits from SWDIO (LSB first), returning them right-aligned.
    fn miso_8(&mut self, bits: u8) -> Result<u8, Self::Error>;

    /// Sample `bits` bits from SWDIO (LSB first), returning them right-aligned.
    fn miso_32(&mut self, bits: u8) -> Result<u32, Self::Error>;

    /// Clock `bits` turnaround cycles with the driver released (tristated).
    fn miso_trn(&mut self, bits: u8) -> Result<(), Self::Error>;
}
