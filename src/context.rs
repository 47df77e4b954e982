// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! The top-level handle: one per interface/target pair, tying the queue,
//! configuration, register cache, cooperative-cancellation flag and driver
//! together (mirrors `swd_ctx_t`).

use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::cache::RegisterCache;
use crate::config::Config;
use crate::driver::Driver;
use crate::queue::{ElementId, Queue};

/// Element ids of a not-yet-flushed read transaction's four phases, kept so
/// a caller that discarded the `Outcome::Enqueued` id can still resolve the
/// transfer by addressing the context directly after a later flush.
#[derive(Clone, Copy, Debug)]
pub struct ReadSlot {
    pub request: ElementId,
    pub ack: ElementId,
    pub data: ElementId,
    pub parity: ElementId,
}

/// Same as [`ReadSlot`] for a write: there is no data/parity element to read
/// back, only the ack.
#[derive(Clone, Copy, Debug)]
pub struct WriteSlot {
    pub request: ElementId,
    pub ack: ElementId,
}

/// The most recently observed transaction, independent of which register it
/// targeted: mirrors the original context's `log` struct, which kept the
/// last request/ack/data/parity quartet alongside dedicated read/write
/// snapshot slots used as stable storage for ENQUEUE-mode returns.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransactionLog {
    pub last_request: u8,
    pub last_ack: u8,
    pub last_data: u32,
    pub last_parity: u8,
    pub pending_read: Option<ReadSlot>,
    pub pending_write: Option<WriteSlot>,
}

/// Owns a [`Driver`] and everything needed to compose and flush SWD
/// transactions against it. Not `Clone`: there is exactly one queue and one
/// cache per physical interface.
pub struct Context<D: Driver> {
    pub(crate) driver: D,
    pub(crate) queue: Queue,
    pub config: Config,
    pub(crate) cache: RegisterCache,
    pub(crate) log: TransactionLog,
    cancel: AtomicBool,
}

impl<D: Driver> Context<D> {
    /// Build a context around an already-constructed driver. Unlike the
    /// teacher's `swd_init`, there is no separate allocation step: the
    /// queue starts empty and grows as operations are enqueued.
    pub fn new(driver: D, config: Config) -> Self {
        debug!("initialising SWD context");
        Context {
            driver,
            queue: Queue::new(),
            config,
            cache: RegisterCache::default(),
            log: TransactionLog::default(),
            cancel: AtomicBool::new(false),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn cache(&self) -> &RegisterCache {
        &self.cache
    }

    /// The last observed request/ack/data/parity, plus the pending
    /// read/write element ids of the most recent ENQUEUE-mode call that
    /// hasn't been superseded by a later one.
    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Request that any flush currently in progress stop at the next
    /// element boundary. Checked cooperatively, never pre-empts a half
    /// clocked bus phase.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Clear a previously requested cancellation so the context can be
    /// reused.
    pub fn reset_cancel(&self) {
        self.cancel.store(false, Ordering::Relaxed);
    }

    /// Borrow the queue, driver and cancellation flag independently so a
    /// flush can hold `&mut Queue` and `&mut D` while only needing shared
    /// access to `cancel` — a three-way split `&mut self` alone can't express.
    pub(crate) fn split_for_flush(&mut self) -> (&mut Queue, &mut D, &AtomicBool) {
        (&mut self.queue, &mut self.driver, &self.cancel)
    }

    /// Tear down the context, returning ownership of the driver. Unflushed
    /// queue elements are dropped without flushing, matching `swd_deinit`'s
    /// unconditional queue free.
    pub fn deinit(mut self) -> D {
        debug!("deinitialising SWD context, dropping {} unflushed elements", self.queue.len());
        let _ = self.queue.free_all(true);
        self.driver
    }
}

impl<D: Driver> Drop for Context<D> {
    fn drop(&mut self) {
        if !self.queue.is_empty() {
            debug!("dropping SWD context with {} unflushed queue elements", self.queue.len());
        }
    }
}
