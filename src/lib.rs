//! Doorman: MQTT-driven door opener.
//!
//! Listens on a broker topic for `{"command":"open","username":…}`
//! messages, rate-limits them, and pulses a USB serial relay to unlock
//! the door for one second.  The pure pipeline lives in [`app`]; the
//! broker, the tty and the host clock are plugged in from [`adapters`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod logging;
pub mod supervisor;
