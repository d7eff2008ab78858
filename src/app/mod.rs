//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules of the door controller:
//! command validation, debouncing and the relay actuation sequence.
//! All interaction with the broker and the relay happens through
//! **port traits** defined in [`ports`], keeping this layer fully
//! testable without a serial device or a network.

pub mod commands;
pub mod events;
pub mod ports;
pub mod sequencer;
pub mod service;
pub mod validator;
