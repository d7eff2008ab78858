//! LC-Tech USB relay frame encoding.
//!
//! The relay board (CH340 USB-serial bridge, 9600 baud) accepts 4-byte
//! frames and never answers:
//!
//! ```text
//!  ┌──────┬─────────┬───────┬──────────────────────────┐
//!  │ 0xA0 │ channel │ state │ 0xA0 + channel + state   │
//!  └──────┴─────────┴───────┴──────────────────────────┘
//! ```
//!
//! `state = 1` energises the coil (door unlocked), `state = 0` releases it.
//! This module is a dumb encoder; timing lives in the sequencer.

/// Frame start byte.
const START: u8 = 0xA0;

/// Channel wired to the door strike.
pub const DOOR_CHANNEL: u8 = 1;

/// Relay baud rate.
pub const BAUD_RATE: u32 = 9600;

/// Energise the door channel: `A0 01 01 A2`.
pub const UNLOCK_FRAME: [u8; 4] = frame(DOOR_CHANNEL, true);

/// Release the door channel: `A0 01 00 A1`.
pub const LOCK_FRAME: [u8; 4] = frame(DOOR_CHANNEL, false);

/// Encode a switch command for `channel`.
pub const fn frame(channel: u8, on: bool) -> [u8; 4] {
    let state = on as u8;
    [
        START,
        channel,
        state,
        START.wrapping_add(channel).wrapping_add(state),
    ]
}
