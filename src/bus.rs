// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! L3: bus-level enqueue helpers and the fixed control byte sequences.
//!
//! These functions only ever append to the [`crate::queue::Queue`]; nothing
//! here touches a driver. A turnaround element is inserted automatically
//! whenever the requested element's direction differs from the queue's
//! current tail direction, mirroring the original `swd_bus_setdir_*`
//! helpers but making the direction-tracking implicit in `append`. Every
//! append here is preceded by a capacity check against the context's
//! configured `max_cmdq_len`.

use log::warn;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::queue::{Direction, ElementId, Kind, Queue};

/// DAP reset: eight 0xFF bytes (>=50 clocks with SWDIO high) followed by a
/// trailing idle 0x00 byte, matching `SWD_CMD_SWDPRESET`.
pub const DAP_RESET_SEQUENCE: [u8; 9] = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];

/// JTAG-TO-SWD switch sequence: reset, then the 0x79E7 magic, then a
/// trailing idle byte, LSB first on the wire (`SWD_CMD_JTAG2SWD`).
pub const JTAG2SWD_SEQUENCE: [u8; 11] = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x79, 0xe7, 0x00];

/// SWD-TO-JTAG switch sequence (`SWD_CMD_SWD2JTAG`).
pub const SWD2JTAG_SEQUENCE: [u8; 11] = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x3c, 0xe7, 0x00];

/// Warn once the queue reaches the configured soft cap; fail hard only when
/// `config.strict` opts into treating the cap as a real limit.
fn check_capacity(q: &Queue, config: &Config) -> Result<()> {
    if q.len() >= config.max_cmdq_len {
        warn!("command queue length {} at or past configured maximum {}", q.len(), config.max_cmdq_len);
        if config.strict {
            return Err(Error::QueueFull { len: q.len(), max: config.max_cmdq_len });
        }
    }
    Ok(())
}

/// Ensure the tail of the queue is an MOSI-direction element by inserting a
/// turnaround if the bus is currently latched MISO.
pub fn setdir_mosi(q: &mut Queue, config: &Config) -> Result<()> {
    if q.tail_direction() == Direction::Miso {
        check_capacity(q, config)?;
        q.append_pending(Kind::MosiTrn, config.trn_len);
    }
    Ok(())
}

/// Ensure the tail of the queue is an MISO-direction element by inserting a
/// turnaround if the bus is currently latched MOSI (or undefined, since the
/// first bus access after reset is always a read of the ACK phase).
pub fn setdir_miso(q: &mut Queue, config: &Config) -> Result<()> {
    if q.tail_direction() != Direction::Miso {
        check_capacity(q, config)?;
        q.append_pending(Kind::MisoTrn, config.trn_len);
    }
    Ok(())
}

/// Append one MOSI control byte run (`SWD_CMD_*` sequences, idle cycles,
/// line reset). Each byte of `bytes` becomes its own queue element so flush
/// can dispatch them as plain 8-bit MOSI transfers.
pub fn enqueue_mosi_bytes(q: &mut Queue, config: &Config, bytes: &[u8]) -> Result<Vec<ElementId>> {
    setdir_mosi(q, config)?;
    let mut ids = Vec::with_capacity(bytes.len());
    for &b in bytes {
        check_capacity(q, config)?;
        ids.push(q.append_value(Kind::MosiControl, 8, b as u32));
    }
    Ok(ids)
}

/// Append the fixed DAP reset sequence (eight 0xFF bytes, then idle).
pub fn enqueue_dap_reset(q: &mut Queue, config: &Config) -> Result<Vec<ElementId>> {
    enqueue_mosi_bytes(q, config, &DAP_RESET_SEQUENCE)
}

/// Append the JTAG-to-SWD activation sequence.
pub fn enqueue_jtag_to_swd(q: &mut Queue, config: &Config) -> Result<Vec<ElementId>> {
    enqueue_mosi_bytes(q, config, &JTAG2SWD_SEQUENCE)
}

/// Append the SWD-to-JTAG deactivation sequence.
pub fn enqueue_swd_to_jtag(q: &mut Queue, config: &Config) -> Result<Vec<ElementId>> {
    enqueue_mosi_bytes(q, config, &SWD2JTAG_SEQUENCE)
}

/// Append the 8-bit request header, switching the bus to MOSI first.
pub fn enqueue_request(q: &mut Queue, config: &Config, request: u8) -> Result<ElementId> {
    setdir_mosi(q, config)?;
    check_capacity(q, config)?;
    Ok(q.append_value(Kind::MosiRequest, 8, request as u32))
}

/// Append a pending 3-bit ACK read, switching the bus to MISO first (via a
/// turnaround) to mirror the host releasing SWDIO after the request byte.
pub fn enqueue_ack(q: &mut Queue, config: &Config) -> Result<ElementId> {
    setdir_miso(q, config)?;
    check_capacity(q, config)?;
    Ok(q.append_pending(Kind::MisoAck, 3))
}

/// Append a pending 32-bit data read plus its parity bit.
pub fn enqueue_read_data(q: &mut Queue, config: &Config) -> Result<(ElementId, ElementId)> {
    check_capacity(q, config)?;
    let data = q.append_pending(Kind::MisoData, 32);
    check_capacity(q, config)?;
    let parity = q.append_pending(Kind::MisoParity, 1);
    Ok((data, parity))
}

/// Append a 32-bit data write plus its parity bit, switching the bus back to
/// MOSI first.
pub fn enqueue_write_data(q: &mut Queue, config: &Config, data: u32, parity: u8) -> Result<(ElementId, ElementId)> {
    setdir_mosi(q, config)?;
    check_capacity(q, config)?;
    let data_id = q.append_value(Kind::MosiData, 32, data);
    check_capacity(q, config)?;
    let parity_id = q.append_value(Kind::MosiParity, 1, parity as u32);
    Ok((data_id, parity_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setdir_mosi_inserts_trn_only_from_miso() {
        let mut q = Queue::new();
        let config = Config::default();
        setdir_mosi(&mut q, &config).unwrap();
        assert!(q.is_empty());
        q.append_pending(Kind::MisoAck, 3);
        setdir_mosi(&mut q, &config).unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q.get(1).unwrap().kind, Kind::MosiTrn);
    }

    #[test]
    fn enqueue_request_then_ack_inserts_single_trn_each_way() {
        let mut q = Queue::new();
        let config = Config::default();
        enqueue_request(&mut q, &config, 0xA5).unwrap();
        enqueue_ack(&mut q, &config).unwrap();
        // request, trn, ack
        assert_eq!(q.len(), 3);
        assert_eq!(q.get(0).unwrap().kind, Kind::MosiRequest);
        assert_eq!(q.get(1).unwrap().kind, Kind::MisoTrn);
        assert_eq!(q.get(2).unwrap().kind, Kind::MisoAck);
    }

    #[test]
    fn jtag_to_swd_sequence_matches_fixed_bytes() {
        let mut q = Queue::new();
        let config = Config::default();
        let ids = enqueue_jtag_to_swd(&mut q, &config).unwrap();
        assert_eq!(ids.len(), 11);
        assert_eq!(q.get(8).unwrap().payload.value(), Some(0x79));
        assert_eq!(q.get(9).unwrap().payload.value(), Some(0xe7));
        assert_eq!(q.get(10).unwrap().payload.value(), Some(0x00));
    }

    #[test]
    fn dap_reset_sequence_ends_with_idle_byte() {
        let mut q = Queue::new();
        let config = Config::default();
        let ids = enqueue_dap_reset(&mut q, &config).unwrap();
        assert_eq!(ids.len(), 9);
        assert_eq!(q.get(7).unwrap().payload.value(), Some(0xff));
        assert_eq!(q.get(8).unwrap().payload.value(), Some(0x00));
    }

    #[test]
    fn strict_mode_rejects_enqueue_past_the_cap() {
        let mut q = Queue::new();
        let mut config = Config::default();
        config.max_cmdq_len = 2;
        config.strict = true;
        enqueue_request(&mut q, &config, 0xA5).unwrap();
        let err = enqueue_ack(&mut q, &config).unwrap_err();
        assert!(matches!(err, Error::QueueFull { len: 2, max: 2 }));
    }

    #[test]
    fn non_strict_mode_warns_but_keeps_growing_past_the_cap() {
        let mut q = Queue::new();
        let mut config = Config::default();
        config.max_cmdq_len = 1;
        config.strict = false;
        enqueue_request(&mut q, &config, 0xA5).unwrap();
        enqueue_ack(&mut q, &config).unwrap();
        assert_eq!(q.len(), 3);
    }
}
