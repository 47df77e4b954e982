// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! L5: the DP/AP transaction protocol — generic register read/write, AP
//! bank/select caching, sticky-error handling, and the ACK=WAIT retry loop.
//! Grounded directly on the original `dap_errors_handle`/`dp_read`/
//! `dp_write`/`ap_bank_select`/`ap_select`/`ap_read`/`ap_write` routines.

use log::{debug, trace, warn};
use num_enum::TryFromPrimitive;

use crate::bus;
use crate::context::{Context, ReadSlot, WriteSlot};
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::queue::FlushRange;
use crate::regs::{self, Abort};
use crate::request::{self, Access, PortKind};

/// Whether a call only appends to the queue, or appends and immediately
/// flushes/resolves the result.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Enqueue,
    Execute,
}

/// What a transaction call handed back: either the id of a not-yet-flushed
/// element (Enqueue mode), or the resolved value (Execute mode).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Enqueued(usize),
    Done(T),
}

impl<T> Outcome<T> {
    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(v) => Some(v),
            Outcome::Enqueued(_) => None,
        }
    }
}

fn flush_all<D: Driver>(ctx: &mut Context<D>) -> Result<()> {
    let (queue, driver, cancel) = ctx.split_for_flush();
    crate::flush::flush(queue, driver, FlushRange::All, cancel)?;
    Ok(())
}

/// Read CTRL/STAT and, if `clear` is non-empty, write it to ABORT (masked to
/// the sticky-clear bits only; DAPABORT is never reachable from here).
///
/// Talks to the bus directly rather than through [`dp_read`]/[`dp_write`]:
/// those recover from ACK=WAIT by calling back into this function, so
/// routing through them here would risk unbounded recursion if the target
/// WAITs on the error-status access itself.
pub fn errors_handle<D: Driver>(ctx: &mut Context<D>, clear: Abort) -> Result<(u32, Abort)> {
    let read_req = request::make_request(PortKind::Dp, Access::Read, regs::DP_CTRLSTAT)?;
    bus::enqueue_request(&mut ctx.queue, &ctx.config, read_req)?;
    let ack_id = bus::enqueue_ack(&mut ctx.queue, &ctx.config)?;
    let (data_id, parity_id) = bus::enqueue_read_data(&mut ctx.queue, &ctx.config)?;
    flush_all(ctx)?;
    let ack = ack_value(ctx, ack_id)?;
    check_ack(ack)?;
    let ctrlstat = ctx.queue.get(data_id).unwrap().payload.value().unwrap();
    let parity = ctx.queue.get(parity_id).unwrap().payload.value().unwrap() as u8;
    verify_parity(ctrlstat, parity)?;

    let applied = clear & Abort::STICKY_CLEAR_MASK;
    if !applied.is_empty() {
        let write_req = request::make_request(PortKind::Dp, Access::Write, regs::DP_ABORT)?;
        bus::enqueue_request(&mut ctx.queue, &ctx.config, write_req)?;
        let ack_id = bus::enqueue_ack(&mut ctx.queue, &ctx.config)?;
        let wparity = crate::bits::parity32(applied.bits());
        bus::enqueue_write_data(&mut ctx.queue, &ctx.config, applied.bits(), wparity)?;
        flush_all(ctx)?;
        check_ack(ack_value(ctx, ack_id)?)?;
    }
    let _ = ctx.queue.free_all(false);
    ctx.cache.dp_read.ctrlstat = ctrlstat;
    Ok((ctrlstat, applied))
}

/// Generic DP register read.
pub fn dp_read<D: Driver>(ctx: &mut Context<D>, operation: Operation, addr: u8) -> Result<Outcome<u32>> {
    trace!("dp_read(addr=0x{addr:X}, operation={operation:?})");
    let request = request::make_request(PortKind::Dp, Access::Read, addr)?;
    let req_id = bus::enqueue_request(&mut ctx.queue, &ctx.config, request)?;
    let ack_id = bus::enqueue_ack(&mut ctx.queue, &ctx.config)?;
    let (data_id, parity_id) = bus::enqueue_read_data(&mut ctx.queue, &ctx.config)?;
    ctx.log.last_request = request;

    if operation == Operation::Enqueue {
        ctx.log.pending_read = Some(ReadSlot { request: req_id, ack: ack_id, data: data_id, parity: parity_id });
        return Ok(Outcome::Enqueued(req_id.max(ack_id).max(data_id).max(parity_id)));
    }

    flush_all(ctx)?;
    let ack = ack_value(ctx, ack_id)?;
    let (data, parity) = if ack == AckBits::Wait {
        retry_read(ctx, request)?
    } else {
        check_ack(ack)?;
        let data = ctx.queue.get(data_id).unwrap().payload.value().unwrap();
        let parity = ctx.queue.get(parity_id).unwrap().payload.value().unwrap() as u8;
        (data, parity)
    };
    verify_parity(data, parity)?;
    cache_dp_read(ctx, addr, data);
    ctx.log.last_ack = ack as u8;
    ctx.log.last_data = data;
    ctx.log.last_parity = parity;
    let _ = ctx.queue.free_all(false);
    debug!("dp_read(addr=0x{addr:X}) = 0x{data:08X}");
    Ok(Outcome::Done(data))
}

/// Generic DP register write.
pub fn dp_write<D: Driver>(ctx: &mut Context<D>, operation: Operation, addr: u8, data: u32) -> Result<Outcome<()>> {
    trace!("dp_write(addr=0x{addr:X}, data=0x{data:08X}, operation={operation:?})");
    let request = request::make_request(PortKind::Dp, Access::Write, addr)?;
    let req_id = bus::enqueue_request(&mut ctx.queue, &ctx.config, request)?;
    let ack_id = bus::enqueue_ack(&mut ctx.queue, &ctx.config)?;
    let parity = crate::bits::parity32(data);
    bus::enqueue_write_data(&mut ctx.queue, &ctx.config, data, parity)?;
    ctx.log.last_request = request;

    if operation == Operation::Enqueue {
        ctx.log.pending_write = Some(WriteSlot { request: req_id, ack: ack_id });
        return Ok(Outcome::Enqueued(req_id.max(ack_id)));
    }

    flush_all(ctx)?;
    let mut ack = ack_value(ctx, ack_id)?;
    if ack == AckBits::Wait {
        ack = retry_write(ctx, request, data)?;
    }
    check_ack(ack)?;
    cache_dp_write(ctx, addr, data);
    ctx.log.last_ack = ack as u8;
    ctx.log.last_data = data;
    ctx.log.last_parity = parity;
    let _ = ctx.queue.free_all(false);
    debug!("dp_write(addr=0x{addr:X}, data=0x{data:08X}) ok");
    Ok(Outcome::Done(()))
}

/// Update the SELECT register's APBANKSEL field if it doesn't already match
/// `addr`'s bank, eliding the write when the cached value is current.
pub fn ap_bank_select<D: Driver>(ctx: &mut Context<D>, operation: Operation, addr: u8) -> Result<Outcome<()>> {
    let bank = regs::apbank_of(addr);
    if ctx.cache.dp_write.select & regs::SELECT_APBANKSEL_MASK == bank {
        return Ok(Outcome::Done(()));
    }
    let new_select = regs::select_with_apbank(ctx.cache.dp_write.select, addr);
    dp_write(ctx, operation, regs::DP_SELECT, new_select)?;
    ctx.cache.dp_write.select = new_select;
    Ok(Outcome::Done(()))
}

/// Update the SELECT register's APSEL field if it doesn't already select
/// `apsel`.
pub fn ap_select<D: Driver>(ctx: &mut Context<D>, operation: Operation, apsel: u8) -> Result<Outcome<()>> {
    if regs::apsel_of(ctx.cache.dp_write.select) == apsel {
        return Ok(Outcome::Done(()));
    }
    let new_select = regs::select_with_apsel(ctx.cache.dp_write.select, apsel);
    dp_write(ctx, operation, regs::DP_SELECT, new_select)?;
    ctx.cache.dp_write.select = new_select;
    Ok(Outcome::Done(()))
}

/// Generic AP register read. AP reads are pipelined: the data phase of this
/// transaction carries the *previous* transfer's result, so at Execute level
/// this always issues one extra RDBUFF read to fetch the value this call
/// actually asked for.
pub fn ap_read<D: Driver>(ctx: &mut Context<D>, operation: Operation, addr: u8) -> Result<Outcome<u32>> {
    trace!("ap_read(addr=0x{addr:X}, operation={operation:?})");
    ap_bank_select(ctx, operation, addr)?;
    let request = request::make_request(PortKind::Ap, Access::Read, addr)?;
    let req_id = bus::enqueue_request(&mut ctx.queue, &ctx.config, request)?;
    let ack_id = bus::enqueue_ack(&mut ctx.queue, &ctx.config)?;
    let (data_id, parity_id) = bus::enqueue_read_data(&mut ctx.queue, &ctx.config)?;
    ctx.log.last_request = request;

    if operation == Operation::Enqueue {
        ctx.log.pending_read = Some(ReadSlot { request: req_id, ack: ack_id, data: data_id, parity: parity_id });
        return Ok(Outcome::Enqueued(req_id.max(ack_id).max(data_id).max(parity_id)));
    }

    flush_all(ctx)?;
    let ack = ack_value(ctx, ack_id)?;
    let (pipelined, parity) = if ack == AckBits::Wait {
        retry_read(ctx, request)?
    } else {
        check_ack(ack)?;
        let data = ctx.queue.get(data_id).unwrap().payload.value().unwrap();
        let parity = ctx.queue.get(parity_id).unwrap().payload.value().unwrap() as u8;
        (data, parity)
    };
    verify_parity(pipelined, parity)?;
    let _ = ctx.queue.free_all(false);

    // Fetch the value actually produced by the access just issued.
    let data = dp_read(ctx, Operation::Execute, regs::DP_RDBUFF)?.done().unwrap();
    ctx.cache.ap_read.drw = data;
    debug!("ap_read(addr=0x{addr:X}) = 0x{data:08X}");
    Ok(Outcome::Done(data))
}

/// Generic AP register write.
pub fn ap_write<D: Driver>(ctx: &mut Context<D>, operation: Operation, addr: u8, data: u32) -> Result<Outcome<()>> {
    trace!("ap_write(addr=0x{addr:X}, data=0x{data:08X}, operation={operation:?})");
    ap_bank_select(ctx, operation, addr)?;
    let request = request::make_request(PortKind::Ap, Access::Write, addr)?;
    let req_id = bus::enqueue_request(&mut ctx.queue, &ctx.config, request)?;
    let ack_id = bus::enqueue_ack(&mut ctx.queue, &ctx.config)?;
    let parity = crate::bits::parity32(data);
    bus::enqueue_write_data(&mut ctx.queue, &ctx.config, data, parity)?;
    ctx.log.last_request = request;

    if operation == Operation::Enqueue {
        ctx.log.pending_write = Some(WriteSlot { request: req_id, ack: ack_id });
        return Ok(Outcome::Enqueued(req_id.max(ack_id)));
    }

    flush_all(ctx)?;
    let mut ack = ack_value(ctx, ack_id)?;
    if ack == AckBits::Wait {
        ack = retry_write(ctx, request, data)?;
    }
    check_ack(ack)?;
    ctx.cache.ap_write.drw = data;
    ctx.log.last_ack = ack as u8;
    ctx.log.last_data = data;
    ctx.log.last_parity = parity;
    let _ = ctx.queue.free_all(false);
    debug!("ap_write(addr=0x{addr:X}, data=0x{data:08X}) ok");
    Ok(Outcome::Done(()))
}

/// The 3-bit ACK field, as returned on the wire.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
enum AckBits {
    Ok = 0b100,
    Wait = 0b010,
    Fault = 0b001,
}

fn ack_value<D: Driver>(ctx: &Context<D>, ack_id: usize) -> Result<AckBits> {
    let ack = ctx.queue.get(ack_id).unwrap().payload.value().unwrap() as u8;
    match AckBits::try_from_primitive(ack) {
        Ok(AckBits::Fault) => Err(Error::AckFault),
        Ok(other) => Ok(other),
        Err(_) => Err(Error::AckUnknown(ack)),
    }
}

fn check_ack(ack: AckBits) -> Result<()> {
    match ack {
        AckBits::Ok => Ok(()),
        AckBits::Wait => Err(Error::AckWait),
        // ack_value() never returns Fault directly; it converts it to
        // Error::AckFault before this function is reached.
        AckBits::Fault => unreachable!("Fault is converted to an error before check_ack"),
    }
}

fn verify_parity(data: u32, parity: u8) -> Result<()> {
    if crate::bits::parity32(data) == parity {
        Ok(())
    } else {
        Err(Error::Parity)
    }
}

fn cache_dp_read<D: Driver>(ctx: &mut Context<D>, addr: u8, data: u32) {
    match addr {
        regs::DP_IDCODE => ctx.cache.dp_read.idcode = data,
        regs::DP_RDBUFF => ctx.cache.dp_read.rdbuff = data,
        regs::DP_RESEND => ctx.cache.dp_read.resend = data,
        regs::DP_CTRLSTAT => ctx.cache.dp_read.ctrlstat = data,
        _ => {}
    }
}

fn cache_dp_write<D: Driver>(ctx: &mut Context<D>, addr: u8, data: u32) {
    match addr {
        regs::DP_ABORT => ctx.cache.dp_write.abort = data,
        regs::DP_SELECT => ctx.cache.dp_write.select = data,
        regs::DP_CTRLSTAT => ctx.cache.dp_write.ctrlstat = data,
        _ => {}
    }
}

/// ACK=WAIT retry loop for reads: clear sticky errors, re-issue the exact
/// same request, re-read ACK and data, until OK or the retry budget runs out.
fn retry_read<D: Driver>(ctx: &mut Context<D>, request: u8) -> Result<(u32, u8)> {
    for attempt in 0..ctx.config.retry_count {
        warn!("ACK=WAIT, retrying read (attempt {attempt})");
        let _ = errors_handle(ctx, Abort::STICKY_CLEAR_MASK);
        bus::enqueue_request(&mut ctx.queue, &ctx.config, request)?;
        let ack_id = bus::enqueue_ack(&mut ctx.queue, &ctx.config)?;
        let (data_id, parity_id) = bus::enqueue_read_data(&mut ctx.queue, &ctx.config)?;
        flush_all(ctx)?;
        let ack = ack_value(ctx, ack_id)?;
        if ack == AckBits::Wait {
            continue;
        }
        check_ack(ack)?;
        let data = ctx.queue.get(data_id).unwrap().payload.value().unwrap();
        let parity = ctx.queue.get(parity_id).unwrap().payload.value().unwrap() as u8;
        return Ok((data, parity));
    }
    Err(Error::MaxRetry)
}

fn retry_write<D: Driver>(ctx: &mut Context<D>, request: u8, data: u32) -> Result<AckBits> {
    for attempt in 0..ctx.config.retry_count {
        warn!("ACK=WAIT, retrying write (attempt {attempt})");
        let _ = errors_handle(ctx, Abort::STICKY_CLEAR_MASK);
        bus::enqueue_request(&mut ctx.queue, &ctx.config, request)?;
        let ack_id = bus::enqueue_ack(&mut ctx.queue, &ctx.config)?;
        let parity = crate::bits::parity32(data);
        bus::enqueue_write_data(&mut ctx.queue, &ctx.config, data, parity)?;
        flush_all(ctx)?;
        let ack = ack_value(ctx, ack_id)?;
        if ack != AckBits::Wait {
            return Ok(ack);
        }
    }
    Err(Error::MaxRetry)
}
