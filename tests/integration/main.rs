//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no broker,
//! no relay board and no real sleeps.

mod pipeline_tests;
mod supervisor_tests;
