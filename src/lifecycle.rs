// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! L6: DAP-level lifecycle — line reset, JTAG<->SWD switching, and the
//! reset+select+IDCODE bring-up sequence. Grounded on `libswd_dap_reset`,
//! `libswd_dap_select`, and `libswd_dap_detect`.

use log::info;

use crate::bus;
use crate::context::Context;
use crate::dap::{dp_read, Operation, Outcome};
use crate::driver::Driver;
use crate::error::Result;
use crate::queue::FlushRange;
use crate::regs;

fn flush_all<D: Driver>(ctx: &mut Context<D>) -> Result<()> {
    let (queue, driver, cancel) = ctx.split_for_flush();
    crate::flush::flush(queue, driver, FlushRange::All, cancel)?;
    Ok(())
}

/// Send the DAP reset sequence (>=50 SWDIO-high clocks), bringing both
/// SW-DP and JTAG-DP to their reset state.
pub fn dap_reset<D: Driver>(ctx: &mut Context<D>, operation: Operation) -> Result<Outcome<()>> {
    info!("dap_reset");
    let ids = bus::enqueue_dap_reset(&mut ctx.queue, &ctx.config)?;
    if operation == Operation::Enqueue {
        return Ok(Outcome::Enqueued(*ids.last().unwrap()));
    }
    flush_all(ctx)?;
    let _ = ctx.queue.free_all(false);
    Ok(Outcome::Done(()))
}

/// Switch the physical line from JTAG to SWD: the reset ones-run, the
/// JTAG-TO-SWD magic word, then a trailing idle byte.
pub fn dap_select<D: Driver>(ctx: &mut Context<D>, operation: Operation) -> Result<Outcome<()>> {
    info!("dap_select (JTAG -> SWD)");
    let ids = bus::enqueue_jtag_to_swd(&mut ctx.queue, &ctx.config)?;
    if operation == Operation::Enqueue {
        return Ok(Outcome::Enqueued(*ids.last().unwrap()));
    }
    flush_all(ctx)?;
    let _ = ctx.queue.free_all(false);
    Ok(Outcome::Done(()))
}

/// Switch the physical line from SWD back to JTAG: the reset ones-run, the
/// SWD-TO-JTAG magic word, then a trailing idle byte.
pub fn dap_deactivate<D: Driver>(ctx: &mut Context<D>, operation: Operation) -> Result<Outcome<()>> {
    info!("dap_deactivate (SWD -> JTAG)");
    let ids = bus::enqueue_swd_to_jtag(&mut ctx.queue, &ctx.config)?;
    if operation == Operation::Enqueue {
        return Ok(Outcome::Enqueued(*ids.last().unwrap()));
    }
    flush_all(ctx)?;
    let _ = ctx.queue.free_all(false);
    Ok(Outcome::Done(()))
}

/// The ARM-recommended bring-up: select SW-DP, reset it, then read back
/// IDCODE to confirm the target responds.
pub fn dap_detect<D: Driver>(ctx: &mut Context<D>, operation: Operation) -> Result<Outcome<u32>> {
    dap_select(ctx, operation)?;
    dap_reset(ctx, operation)?;
    let idcode = dp_read(ctx, operation, regs::DP_IDCODE)?;
    match idcode {
        Outcome::Done(v) => {
            info!("dap_detect: IDCODE = 0x{v:08X}");
            Ok(Outcome::Done(v))
        }
        Outcome::Enqueued(id) => Ok(Outcome::Enqueued(id)),
    }
}
