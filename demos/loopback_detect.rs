// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! Runs a detect sequence against an in-memory loopback target instead of
//! real hardware, to exercise the crate without a physical probe attached.

use log::info;

use swd_core::config::Config;
use swd_core::context::Context;
use swd_core::dap::Operation;
use swd_core::driver::Driver;
use swd_core::lifecycle::dap_detect;

struct LoopbackTarget {
    idcode: u32,
}

impl Driver for LoopbackTarget {
    type Error = std::convert::Infallible;

    fn mosi_8(&mut self, _byte: u8, _bits: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    fn mosi_32(&mut self, _word: u32, _bits: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    fn mosi_trn(&mut self, _bits: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    fn miso_8(&mut self, bits: u8) -> Result<u8, Self::Error> {
        if bits == 3 {
            Ok(0b100)
        } else {
            Ok(swd_core::bits::parity32(self.idcode) & 1)
        }
    }

    fn miso_32(&mut self, _bits: u8) -> Result<u32, Self::Error> {
        Ok(self.idcode)
    }

    fn miso_trn(&mut self, _bits: u8) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn main() {
    env_logger::init();

    let mut ctx = Context::new(LoopbackTarget { idcode: 0x2BA0_1477 }, Config::default());
    match dap_detect(&mut ctx, Operation::Execute) {
        Ok(outcome) => {
            let idcode = outcome.done().expect("Execute always resolves");
            info!("target responded with IDCODE 0x{idcode:08X}");
        }
        Err(err) => {
            eprintln!("detect failed: {err}");
            std::process::exit(1);
        }
    }
}
