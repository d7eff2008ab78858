//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                      | Connects to              |
//! |------------|---------------------------------|--------------------------|
//! | `log_sink` | EventSink                       | `log` facade             |
//! | `mqtt`     | MessageChannel, ChannelSession  | MQTT broker (TLS)        |
//! | `serial`   | SerialBus, SerialLink           | USB relay tty            |
//! | `time`     | Clock, DelayNs                  | `std::time`, thread sleep|

pub mod log_sink;
pub mod mqtt;
pub mod serial;
pub mod time;
