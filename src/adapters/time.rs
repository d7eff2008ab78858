//! Host time adapters.
//!
//! - [`MonotonicClock`] implements [`Clock`] over `std::time::Instant`.
//! - [`ThreadDelay`] implements [`DelayNs`] by parking the calling
//!   thread, which is what both the relay hold and the restart pause need.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

use crate::app::ports::Clock;

/// Monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Blocking delay backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
