// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! Per-context configuration.
//!
//! Logging itself goes through the `log` facade rather than a level stored
//! here; `trace!`/`debug!`/etc. call sites exist throughout the crate and
//! the embedding application chooses a backend (`env_logger` in the bundled
//! demo) and filters by level the usual way. `Config` only carries the
//! behavioural knobs the transaction layer consults directly.

/// Number of turnaround clock cycles inserted between MOSI and MISO phases.
pub const DEFAULT_TRN_LEN: u8 = 1;

/// Soft cap on queue length enforced when `strict` is set.
pub const DEFAULT_MAX_CMDQ_LEN: usize = 1024;

/// How many times the WAIT-retry loop re-attempts a transfer before giving
/// up with [`crate::error::Error::MaxRetry`].
pub const DEFAULT_RETRY_COUNT: usize = 50;

/// Behavioural knobs for a [`crate::context::Context`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Turnaround cycles between MOSI and MISO phases. ADIv5 requires at
    /// least one; some targets need more at high clock rates.
    pub trn_len: u8,
    /// Soft queue length cap, enforced only when `strict` is true.
    pub max_cmdq_len: usize,
    /// Retry budget for the ACK=WAIT loop.
    pub retry_count: usize,
    /// When true, `enqueue_*` calls fail with
    /// [`crate::error::Error::QueueFull`] once `max_cmdq_len` is exceeded,
    /// instead of growing unbounded.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            trn_len: DEFAULT_TRN_LEN,
            max_cmdq_len: DEFAULT_MAX_CMDQ_LEN,
            retry_count: DEFAULT_RETRY_COUNT,
            strict: false,
        }
    }
}
