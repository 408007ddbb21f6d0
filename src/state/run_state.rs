use crate::ControlError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// Handle to the run currently owning the "in progress" flag
#[derive(Debug, Clone)]
pub struct ActiveRun {
    /// Monotonic run number, used to tell a finishing run from its successor
    pub id: u64,

    /// Cancellation signal observed by every page crawler of this run
    pub token: CancellationToken,
}

/// Process-wide indexing state
///
/// The flag is claimed with a compare-and-set so that two concurrent starts
/// cannot both succeed. Stopping happens in two steps: `cancel` detaches the
/// active run and signals its token while the flag stays set, then `release`
/// clears the flag once the stop path has finished updating site rows.
#[derive(Debug, Default)]
pub struct RunState {
    running: AtomicBool,
    next_run_id: AtomicU64,
    active: Mutex<Option<ActiveRun>>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Claims the flag and registers a fresh run
    pub fn begin(&self) -> Result<ActiveRun, ControlError> {
        let mut active = self.lock_active();

        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ControlError::AlreadyRunning)?;

        let run = ActiveRun {
            id: self.next_run_id.fetch_add(1, Ordering::Relaxed) + 1,
            token: CancellationToken::new(),
        };
        *active = Some(run.clone());
        Ok(run)
    }

    /// Detaches the active run and signals its cancellation token
    ///
    /// The flag remains set until `release` is called.
    pub fn cancel(&self) -> Result<ActiveRun, ControlError> {
        let mut active = self.lock_active();
        let run = active.take().ok_or(ControlError::NotRunning)?;
        run.token.cancel();
        Ok(run)
    }

    /// Clears the flag after a stop
    pub fn release(&self) {
        let _active = self.lock_active();
        self.running.store(false, Ordering::Release);
    }

    /// Marks run `run_id` as finished
    ///
    /// Clears the flag only if that run is still the active one; a run that was
    /// stopped has already been detached. Returns true if the flag was cleared.
    pub fn finish(&self, run_id: u64) -> bool {
        let mut active = self.lock_active();
        match active.as_ref() {
            Some(run) if run.id == run_id => {
                *active = None;
                self.running.store(false, Ordering::Release);
                true
            }
            _ => false,
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
