//! Waiting, abstracted so runs can be replayed without real time passing.

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Blocks the control thread for a given duration
pub trait Pacer: Send + Sync {
    fn pause(&self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Pacer for ThreadSleep {
    fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Returns immediately and remembers every requested pause
#[derive(Debug, Default)]
pub struct Immediate {
    pauses: Mutex<Vec<Duration>>,
}

impl Immediate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pauses requested so far, in order
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Pacer for Immediate {
    fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap_or_else(|p| p.into_inner()).push(duration);
    }
}
