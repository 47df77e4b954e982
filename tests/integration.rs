// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! End-to-end scenarios against a simulated target, exercising whole call
//! sequences rather than individual functions.

use std::collections::VecDeque;

use swd_core::config::Config;
use swd_core::context::Context;
use swd_core::dap::{ap_read, ap_write, dp_read, dp_write, errors_handle, Operation};
use swd_core::driver::Driver;
use swd_core::error::Error;
use swd_core::lifecycle::dap_detect;
use swd_core::regs;
use swd_core::regs::Abort;
use swd_core::request::{parse_request, Access, PortKind};

/// A simulated target with a one-deep AP read pipeline: the data phase of
/// an AP access always returns the *previous* access's result, with the
/// freshly produced value only surfacing on the following access (an AP
/// read, or a DP read of RDBUFF) — exactly the behaviour `ap_read`'s RDBUFF
/// fence exists to hide from callers.
struct SimTarget {
    mosi_bytes: Vec<u8>,
    acks: VecDeque<u8>,
    dp_select: u32,
    pending_request: Option<(PortKind, Access, u8)>,
    ap_pipeline_value: u32,
    ap_true_value: u32,
    misc_read_value: u32,
    last_data_phase: u32,
}

impl SimTarget {
    fn new() -> Self {
        SimTarget {
            mosi_bytes: Vec::new(),
            acks: VecDeque::new(),
            dp_select: 0,
            pending_request: None,
            ap_pipeline_value: 0,
            ap_true_value: 0,
            misc_read_value: 0,
            last_data_phase: 0,
        }
    }
}

impl Driver for SimTarget {
    type Error = std::convert::Infallible;

    fn mosi_8(&mut self, byte: u8, bits: u8) -> Result<(), Self::Error> {
        if bits == 8 {
            self.mosi_bytes.push(byte);
            self.pending_request = parse_request(byte).ok();
        }
        Ok(())
    }

    fn mosi_32(&mut self, word: u32, _bits: u8) -> Result<(), Self::Error> {
        if let Some((port, access, addr)) = self.pending_request.take() {
            if access == Access::Write {
                match port {
                    PortKind::Ap => self.ap_true_value = word,
                    PortKind::Dp if addr == regs::DP_SELECT => self.dp_select = word,
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn mosi_trn(&mut self, _bits: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    fn miso_8(&mut self, bits: u8) -> Result<u8, Self::Error> {
        if bits == 3 {
            Ok(self.acks.pop_front().unwrap_or(0b100))
        } else {
            Ok(swd_core::bits::parity32(self.last_data_phase) & 1)
        }
    }

    fn miso_32(&mut self, _bits: u8) -> Result<u32, Self::Error> {
        let value = match self.pending_request.take() {
            Some((PortKind::Ap, Access::Read, _)) => {
                let ret = self.ap_pipeline_value;
                self.ap_pipeline_value = self.ap_true_value;
                ret
            }
            Some((PortKind::Dp, Access::Read, addr)) if addr == regs::DP_RDBUFF => self.ap_pipeline_value,
            _ => self.misc_read_value,
        };
        self.last_data_phase = value;
        Ok(value)
    }

    fn miso_trn(&mut self, _bits: u8) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[test]
fn dap_detect_switches_line_and_reads_idcode() {
    let mut ctx = Context::new(SimTarget::new(), Config::default());
    ctx.driver_mut().misc_read_value = 0x2BA0_1477;

    let idcode = dap_detect(&mut ctx, Operation::Execute).unwrap().done().unwrap();
    assert_eq!(idcode, 0x2BA0_1477);

    let bytes = &ctx.driver().mosi_bytes;
    let magic_pos = bytes.windows(2).position(|w| w == [0x79, 0xe7]);
    assert!(magic_pos.is_some(), "JTAG2SWD magic sequence not found on the wire");
}

#[test]
fn ap_read_applies_the_rdbuff_fence() {
    let mut ctx = Context::new(SimTarget::new(), Config::default());
    // A previous (unrelated) AP access left a stale value pipelined...
    ctx.driver_mut().ap_pipeline_value = 0x1111_2222;
    // ...but this access's own result is what the fence must surface.
    ctx.driver_mut().ap_true_value = 0xAAAA_BBBB;

    let value = ap_read(&mut ctx, Operation::Execute, regs::AHB_AP_DRW).unwrap().done().unwrap();
    assert_eq!(value, 0xAAAA_BBBB, "ap_read must resolve via the RDBUFF fence, not the pipelined byte");
}

#[test]
fn ap_bank_changes_elide_redundant_select_writes() {
    let mut ctx = Context::new(SimTarget::new(), Config::default());
    ap_write(&mut ctx, Operation::Execute, regs::AHB_AP_CSW, 0).unwrap();
    let select_after_first = ctx.driver().dp_select;
    ap_write(&mut ctx, Operation::Execute, regs::AHB_AP_TAR, 0).unwrap();
    assert_eq!(ctx.driver().dp_select, select_after_first, "same bank must not re-trigger a SELECT write");
}

#[test]
fn sticky_error_clear_excludes_dapabort() {
    let mut ctx = Context::new(SimTarget::new(), Config::default());
    let (_, applied) = errors_handle(&mut ctx, Abort::all()).unwrap();
    assert!(!applied.contains(Abort::DAPABORT));
    assert!(applied.contains(Abort::STKERRCLR));
}

#[test]
fn wait_retry_exhausts_after_configured_budget() {
    let mut config = Config::default();
    config.retry_count = 3;
    let mut ctx = Context::new(SimTarget::new(), config);
    for _ in 0..10 {
        ctx.driver_mut().acks.push_back(0b010);
    }
    let err = dp_read(&mut ctx, Operation::Execute, regs::DP_CTRLSTAT).unwrap_err();
    assert!(matches!(err, Error::MaxRetry));
}

#[test]
fn wait_then_ok_recovers_within_budget() {
    let mut ctx = Context::new(SimTarget::new(), Config::default());
    ctx.driver_mut().acks.push_back(0b010);
    ctx.driver_mut().acks.push_back(0b010);
    ctx.driver_mut().misc_read_value = 0x1234_5678;
    let value = dp_read(&mut ctx, Operation::Execute, regs::DP_CTRLSTAT).unwrap().done().unwrap();
    assert_eq!(value, 0x1234_5678);
}

#[test]
fn dp_write_fault_ack_propagates_without_retry() {
    let mut ctx = Context::new(SimTarget::new(), Config::default());
    ctx.driver_mut().acks.push_back(0b001);
    let err = dp_write(&mut ctx, Operation::Execute, regs::DP_SELECT, 0).unwrap_err();
    assert!(matches!(err, Error::AckFault));
}
