//! Device drivers.

pub mod relay;
