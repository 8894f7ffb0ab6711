//! Operating modes and the controller that engages them.

pub mod controller;
pub mod convergence;
pub mod types;

pub use controller::{attachment_for, ModeController};
pub use convergence::{Convergence, ConvergenceOutcome, FixedDelay, PolledStp};
pub use types::{LoopMode, MitigationState, NatMode, RunMode};
