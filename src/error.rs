// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! The error taxonomy for every layer of the SWD core.
//!
//! Lower layers (the queue, the bit generator, the bus primitives, flush)
//! return these verbatim. Only the transaction layer (`dap`) recovers from
//! a subset of them (`AckWait`, and `Parity` inside the AP read fence).

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Everything that can go wrong while composing or flushing an SWD
/// transaction. The driver's own error is boxed rather than threaded
/// through as a generic parameter, so the rest of the crate (and anyone
/// matching on this enum) doesn't need to name the driver type.
#[derive(Error, Debug)]
pub enum Error {
    /// An argument was outside its legal range.
    #[error("parameter {field} out of range: {value}")]
    Range { field: &'static str, value: u32 },

    /// The operation selector was neither Enqueue nor Execute.
    #[error("unsupported operation selector")]
    BadOpcode,

    /// The soft queue length cap was exceeded while strict mode is enabled.
    #[error("command queue length {len} exceeds configured maximum {max}")]
    QueueFull { len: usize, max: usize },

    /// The queue is non-empty and the caller did not request a forced drain.
    #[error("command queue is not empty and the operation did not force a drain")]
    QueueNotFree,

    /// A transaction was composed out of order (e.g. a data phase with no
    /// preceding ACK, or a turnaround missing between direction changes).
    #[error("turnaround element missing between opposite-direction phases")]
    NullTrn,

    /// flush() observed an element whose direction did not match the bus's
    /// last latched direction, meaning a required TRN element is missing.
    #[error("bus direction mismatch: expected a turnaround before this element")]
    Direction,

    /// Parity computed over received data did not match the transmitted
    /// parity bit.
    #[error("parity mismatch on data phase")]
    Parity,

    /// Target returned ACK=FAULT.
    #[error("target responded with ACK=FAULT")]
    AckFault,

    /// Target returned ACK=WAIT (handled internally by the retry loop;
    /// surfaces only if the caller bypasses it).
    #[error("target responded with ACK=WAIT")]
    AckWait,

    /// Target returned an ACK value that is not OK, WAIT, or FAULT (e.g. a
    /// floating bus read as all-zero).
    #[error("target responded with unrecognised ACK bits: {0:#05b}")]
    AckUnknown(u8),

    /// The WAIT-retry loop exhausted its configured retry budget.
    #[error("exhausted retry budget without observing ACK=OK")]
    MaxRetry,

    /// The cooperative cancellation flag was observed between elements.
    #[error("flush was cancelled")]
    Cancelled,

    /// The underlying driver reported a failure.
    #[error("driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wrap a driver-reported error. Kept as an associated function rather
    /// than a blanket `From` impl so it doesn't collide with `Error`'s own
    /// reflexive `From<Error> for Error`.
    pub fn from_driver<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
        Error::Driver(Box::new(e))
    }

    /// True for the ACK outcomes the transaction layer is allowed to recover
    /// from by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::AckWait)
    }
}
