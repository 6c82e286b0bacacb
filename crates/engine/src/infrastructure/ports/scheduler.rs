//! Host scheduling port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use enchantry_domain::Target;

use super::error::DispatchError;

/// A one-shot unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work run on every period of a repeating timer.
pub type RepeatingJob = Arc<dyn Fn() + Send + Sync + 'static>;

/// Handle to scheduled work.
///
/// Cancelling flips a shared liveness flag. Work that was already queued is
/// not removed; it reads the flag when it runs and does nothing if cancelled.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    alive: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TaskHandle {}

/// The host's scheduling primitives.
///
/// `is_region_sharded` is fixed for the life of the dispatcher; callers read
/// it once at startup.
///
/// Ordering: jobs submitted for the same target run in submission order.
/// Nothing is promised across different targets.
pub trait HostDispatcher: Send + Sync {
    fn is_region_sharded(&self) -> bool;

    /// Run `job` on the worker that owns the target's region at execution
    /// time. If the target is no longer valid by then the job is dropped
    /// without running.
    fn schedule_at_affinity(&self, target: &Target, job: Job)
        -> Result<TaskHandle, DispatchError>;

    /// Run `job` every `interval` on the global timer. A slow invocation
    /// delays the next one; invocations never overlap.
    fn schedule_repeating(
        &self,
        interval: Duration,
        job: RepeatingJob,
    ) -> Result<TaskHandle, DispatchError>;

    fn schedule_once_next_global_tick(&self, job: Job) -> Result<TaskHandle, DispatchError>;

    fn cancel(&self, handle: &TaskHandle) {
        handle.cancel();
    }
}
