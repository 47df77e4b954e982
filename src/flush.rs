// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! L4: dispatch a range of queued elements to a [`Driver`].
//!
//! Cancellation is checked between elements, never mid-element, so a flush
//! never leaves a single bus phase half-clocked.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::queue::{Direction, FlushRange, Kind, Payload, Queue};

/// Dispatch `range` of `queue` to `driver`, filling in MISO payloads and
/// marking every touched element `done`. Returns the number of elements
/// flushed.
pub fn flush<D: Driver>(
    queue: &mut Queue,
    driver: &mut D,
    range: FlushRange,
    cancel: &AtomicBool,
) -> Result<usize> {
    let (start, end) = match queue.resolve_range(range) {
        Some(r) => r,
        None => return Ok(0),
    };

    let mut last_direction = Direction::Undefined;
    let mut count = 0;
    for id in start..=end {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        let kind = queue.get(id).ok_or(Error::Range { field: "id", value: id as u32 })?.kind;
        let want = kind.direction();
        let is_trn = matches!(kind, Kind::MosiTrn | Kind::MisoTrn);
        if !is_trn && last_direction != Direction::Undefined && want != last_direction {
            return Err(Error::Direction);
        }

        dispatch_one(queue, driver, id)?;
        last_direction = want;
        count += 1;
    }
    Ok(count)
}

fn dispatch_one<D: Driver>(queue: &mut Queue, driver: &mut D, id: usize) -> Result<()> {
    let element = queue.get(id).ok_or(Error::Range { field: "id", value: id as u32 })?.clone();
    match element.kind {
        Kind::MosiTrn => driver.mosi_trn(element.bits).map_err(Error::from_driver)?,
        Kind::MisoTrn => driver.miso_trn(element.bits).map_err(Error::from_driver)?,

        Kind::MosiRequest | Kind::MosiData | Kind::MosiParity | Kind::MosiBitBang | Kind::MosiControl => {
            let value = element.payload.value().ok_or(Error::NullTrn)?;
            if element.bits > 8 {
                driver.mosi_32(value, element.bits).map_err(Error::from_driver)?;
            } else {
                driver.mosi_8(value as u8, element.bits).map_err(Error::from_driver)?;
            }
        }

        Kind::MisoAck | Kind::MisoParity | Kind::MisoBitBang => {
            let value = driver.miso_8(element.bits).map_err(Error::from_driver)?;
            queue.get_mut(id).unwrap().payload = Payload::Filled(value as u32);
        }

        Kind::MisoData => {
            let value = driver.miso_32(element.bits).map_err(Error::from_driver)?;
            queue.get_mut(id).unwrap().payload = Payload::Filled(value);
        }
    }
    queue.get_mut(id).unwrap().done = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Kind;
    use std::sync::atomic::AtomicBool;

    struct Loopback {
        bits: Vec<(bool, u8)>,
        echo: u32,
    }

    impl Driver for Loopback {
        type Error = std::convert::Infallible;
        fn mosi_8(&mut self, byte: u8, bits: u8) -> core::result::Result<(), Self::Error> {
            self.bits.push((true, bits));
            self.echo = byte as u32;
            Ok(())
        }
        fn mosi_32(&mut self, word: u32, bits: u8) -> core::result::Result<(), Self::Error> {
            self.bits.push((true, bits));
            self.echo = word;
            Ok(())
        }
        fn mosi_trn(&mut self, bits: u8) -> core::result::Result<(), Self::Error> {
            self.bits.push((true, bits));
            Ok(())
        }
        fn miso_8(&mut self, bits: u8) -> core::result::Result<u8, Self::Error> {
            self.bits.push((false, bits));
            Ok(self.echo as u8)
        }
        fn miso_32(&mut self, bits: u8) -> core::result::Result<u32, Self::Error> {
            self.bits.push((false, bits));
            Ok(self.echo)
        }
        fn miso_trn(&mut self, bits: u8) -> core::result::Result<(), Self::Error> {
            self.bits.push((false, bits));
            Ok(())
        }
    }

    #[test]
    fn flush_all_fills_pending_and_marks_done() {
        let mut q = Queue::new();
        q.append_value(Kind::MosiRequest, 8, 0xA5);
        q.append_pending(Kind::MisoTrn, 1);
        let ack = q.append_pending(Kind::MisoAck, 3);

        let mut drv = Loopback { bits: Vec::new(), echo: 0b001 };
        let cancel = AtomicBool::new(false);
        let n = flush(&mut q, &mut drv, FlushRange::All, &cancel).unwrap();
        assert_eq!(n, 3);
        assert_eq!(q.get(ack).unwrap().payload.value(), Some(0b001));
        assert!(q.get(ack).unwrap().done);
    }

    #[test]
    fn flush_observes_cancellation_between_elements() {
        let mut q = Queue::new();
        q.append_value(Kind::MosiRequest, 8, 0xA5);
        q.append_value(Kind::MosiRequest, 8, 0xA5);

        let mut drv = Loopback { bits: Vec::new(), echo: 0 };
        let cancel = AtomicBool::new(true);
        let err = flush(&mut q, &mut drv, FlushRange::All, &cancel).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn flush_rejects_direction_mismatch_without_turnaround() {
        let mut q = Queue::new();
        q.append_value(Kind::MosiRequest, 8, 0xA5);
        // Miss the TRN on purpose.
        q.append_pending(Kind::MisoAck, 3);

        let mut drv = Loopback { bits: Vec::new(), echo: 0 };
        let cancel = AtomicBool::new(false);
        let err = flush(&mut q, &mut drv, FlushRange::All, &cancel).unwrap_err();
        assert!(matches!(err, Error::Direction));
    }
}
