//! Measurement harness: captures, probes and pacing.

pub mod capture;
pub mod pacer;
pub mod runner;

pub use pacer::{Immediate, Pacer, ThreadSleep};
pub use runner::{HarnessError, MeasurementHarness};
