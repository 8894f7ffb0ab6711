//! Process execution module.
//!
//! Commands are described by a typed `CommandSpec` and handed to a
//! `ProcessExecutor`, which runs them either to completion (capturing their
//! text) or detached (returning a handle that can later be stopped).
//!
//! ## Executors
//!
//! - `NamespaceExecutor`: real processes, hosts reached through `ip netns exec`
//! - `RecordingExecutor`: records commands and answers from a scripted
//!   responder; used for `--dry-run` and in tests

pub mod command;
pub mod tools;
pub mod executor;
pub mod namespace;
pub mod recording;

// Re-export commonly used types for convenience
pub use command::{CommandSpec, Launch};
pub use executor::{CommandOutput, ExecError, Placement, ProcessExecutor, ProcessHandle};
pub use namespace::NamespaceExecutor;
pub use recording::{IssuedCommand, RecordingExecutor};
