//! Interrupt handling.
//!
//! SIGINT only raises a flag. Long waits are sliced so they notice it, and
//! the interpreter checks it between lines.

use crate::error::ZooError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const SLICE: Duration = Duration::from_millis(50);

/// Shared interrupt flag
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route SIGINT to this flag. Only one handler can be installed per process.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let flag = Arc::clone(&self.0);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once the flag is raised
    pub fn check(&self) -> Result<(), ZooError> {
        if self.is_set() {
            Err(ZooError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, returning early with `Interrupted` if the flag is raised
    pub fn sleep(&self, duration: Duration) -> Result<(), ZooError> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep(SLICE.min(deadline - now));
        }
    }
}
