use crate::errors::{PgAdminError, Result};
#[cfg(test)]
use mockall::automock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const SLICE: Duration = Duration::from_millis(100);

/// Operator abort flag, shared between the signal handler and the work loop.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the flag on SIGINT or SIGTERM. A second signal while the flag
    /// is already set exits the process.
    pub fn register_signals(&self) -> Result<()> {
        for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            signal_hook::flag::register_conditional_shutdown(signal, 130, Arc::clone(&self.flag))?;
            signal_hook::flag::register(signal, Arc::clone(&self.flag))?;
        }
        Ok(())
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Waits between polls. Returns `Cancelled` instead of finishing the wait
/// when the operator aborts.
#[cfg_attr(test, automock)]
pub trait Pause {
    fn pause(&self, duration: Duration) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct InterruptibleSleep {
    cancellation: Cancellation,
}

impl InterruptibleSleep {
    pub fn new(cancellation: Cancellation) -> Self {
        Self { cancellation }
    }
}

impl Pause for InterruptibleSleep {
    fn pause(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        loop {
            if self.cancellation.is_cancelled() {
                return Err(PgAdminError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep(SLICE.min(deadline - now));
        }
    }
}
