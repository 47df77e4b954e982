// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! Host-side ARM Serial Wire Debug (SWD) transport core.
//!
//! This crate composes and flushes SWD bus transactions against a
//! caller-supplied [`driver::Driver`]: line reset and JTAG<->SWD switching
//! ([`lifecycle`]), generic DP/AP register access with AP bank/select
//! caching and ACK=WAIT retry ([`dap`]), the command queue that lets
//! several bus phases be batched before a single flush ([`queue`]), and the
//! low-level bit generation and dispatch underneath it ([`request`],
//! [`bus`], [`flush`]). No particular transport (FTDI, bitbanged GPIO, USB)
//! is assumed; callers implement [`driver::Driver`] for theirs.

pub mod bits;
pub mod bus;
pub mod cache;
pub mod config;
pub mod context;
pub mod dap;
pub mod driver;
pub mod error;
pub mod flush;
pub mod lifecycle;
pub mod queue;
pub mod regs;
pub mod request;

pub use config::Config;
pub use context::Context;
pub use dap::{Operation, Outcome};
pub use driver::Driver;
pub use error::{Error, Result};
