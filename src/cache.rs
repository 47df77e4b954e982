// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! Last-known-value caches for DP and AP registers.
//!
//! The DP SELECT register is write-only, so bank/AP-select elision (the
//! "don't rewrite SELECT if it already holds the value we need" rule) only
//! works because we remember what we last wrote. Mirrors the `dp_r`/`dp_w`
//! and `ap_r`/`ap_w` halves of the original context's `log` struct.

#[derive(Clone, Copy, Debug, Default)]
pub struct DpCache {
    pub idcode: u32,
    pub abort: u32,
    pub ctrlstat: u32,
    pub wcr: u32,
    pub select: u32,
    pub rdbuff: u32,
    /// Last value read back from RESEND (re-reads the previous AP access's
    /// data without advancing the pipeline, for parity-error recovery).
    pub resend: u32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ApCache {
    pub csw: u32,
    pub tar: u32,
    pub drw: u32,
    pub bd0: u32,
    pub bd1: u32,
    pub bd2: u32,
    pub bd3: u32,
    pub idr: u32,
}

/// The last-known state of every cacheable register, split into read and
/// write halves: a write of a stale-but-matching value doesn't need
/// re-issuing, but a read must still go to the wire.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegisterCache {
    pub dp_read: DpCache,
    pub dp_write: DpCache,
    pub ap_read: ApCache,
    pub ap_write: ApCache,
}
