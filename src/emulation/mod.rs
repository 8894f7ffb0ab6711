//! Emulation substrate adapters.
//!
//! `EmulationEngine` instantiates a `Topology`; `Network` is the live view
//! of an instantiated topology that hands out host and switch handles.

pub mod engine;
pub mod network;

pub use engine::{ControllerAttachment, EmulationEngine, NamespaceEngine};
pub use network::{HostHandle, Network, NetworkError, SwitchHandle};
