//! USB relay serial adapter.
//!
//! Implements [`SerialBus`] over the `serialport` crate.  Every call to
//! [`open`](SerialBus::open) opens the device node afresh at 9600 baud
//! with a 1 s timeout; the link is flushed and dropped on
//! [`close`](SerialLink::close), which releases the file descriptor.
//! The relay never answers, so nothing is ever read back.

use std::io::Write;
use std::time::Duration;

use log::debug;

use crate::app::ports::{SerialBus, SerialLink};
use crate::drivers::relay::BAUD_RATE;
use crate::error::SerialError;

/// Read/write timeout for the relay port.
pub const PORT_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial bus for the LC-Tech relay board.
#[derive(Debug, Clone, Copy)]
pub struct UsbRelayBus {
    baud_rate: u32,
    timeout: Duration,
}

impl Default for UsbRelayBus {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbRelayBus {
    pub fn new() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            timeout: PORT_TIMEOUT,
        }
    }
}

impl SerialBus for UsbRelayBus {
    type Link = UsbRelayLink;

    fn open(&mut self, device: &str) -> Result<UsbRelayLink, SerialError> {
        let port = serialport::new(device, self.baud_rate)
            .timeout(self.timeout)
            .open()?;
        debug!("Serial: opened {} at {} baud", device, self.baud_rate);
        Ok(UsbRelayLink { port })
    }
}

/// An open relay port.
pub struct UsbRelayLink {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink for UsbRelayLink {
    fn write_all(&mut self, frame: &[u8]) -> Result<(), SerialError> {
        self.port.write_all(frame)?;
        Ok(())
    }

    fn close(mut self) -> Result<(), SerialError> {
        // The port is dropped (and closed) even when the flush fails.
        self.port.flush()?;
        Ok(())
    }
}
