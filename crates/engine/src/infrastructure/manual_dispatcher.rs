//! Single-threaded dispatcher driven by hand.
//!
//! Nothing runs until the owner calls [`ManualDispatcher::run_pending`] or
//! [`ManualDispatcher::fire_repeating`], which makes tick-by-tick behavior
//! deterministic. It can pretend to be region-sharded so callers exercise
//! their sharded code paths without threads.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use enchantry_domain::{Target, TargetId};

use crate::infrastructure::ports::{
    DispatchError, HostDispatcher, Job, RepeatingJob, TargetLiveness, TaskHandle,
};

struct Queued {
    handle: TaskHandle,
    target: Option<Target>,
    job: Job,
}

struct Repeating {
    handle: TaskHandle,
    interval: Duration,
    job: RepeatingJob,
}

pub struct ManualDispatcher {
    region_sharded: bool,
    liveness: Option<Arc<dyn TargetLiveness>>,
    queue: Mutex<VecDeque<Queued>>,
    repeating: Mutex<Vec<Repeating>>,
    submitted: Mutex<Vec<Target>>,
    rejected_targets: Mutex<HashSet<TargetId>>,
    next_id: AtomicU64,
}

impl ManualDispatcher {
    pub fn new() -> Self {
        Self {
            region_sharded: false,
            liveness: None,
            queue: Mutex::new(VecDeque::new()),
            repeating: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            rejected_targets: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Report the host as region-sharded.
    pub fn region_sharded(mut self) -> Self {
        self.region_sharded = true;
        self
    }

    /// Drop affinity jobs whose target is no longer valid when they run.
    pub fn with_liveness(mut self, liveness: Arc<dyn TargetLiveness>) -> Self {
        self.liveness = Some(liveness);
        self
    }

    /// Make `schedule_at_affinity` fail for one target.
    pub fn reject_target(&self, target: TargetId) {
        self.rejected_targets.lock().insert(target);
    }

    /// Run queued jobs, including any they enqueue, until the queue is empty.
    /// Returns how many jobs actually ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let Some(next) = self.queue.lock().pop_front() else {
                return ran;
            };
            if !next.handle.is_alive() {
                continue;
            }
            if let (Some(target), Some(liveness)) = (&next.target, &self.liveness) {
                if !liveness.is_valid(target) {
                    continue;
                }
            }
            (next.job)();
            ran += 1;
        }
    }

    /// Invoke every live repeating job once, in registration order.
    pub fn fire_repeating(&self) -> usize {
        let jobs: Vec<RepeatingJob> = self
            .repeating
            .lock()
            .iter()
            .filter(|r| r.handle.is_alive())
            .map(|r| Arc::clone(&r.job))
            .collect();
        for job in &jobs {
            job();
        }
        jobs.len()
    }

    /// Intervals of live repeating jobs.
    pub fn repeating_intervals(&self) -> Vec<Duration> {
        self.repeating
            .lock()
            .iter()
            .filter(|r| r.handle.is_alive())
            .map(|r| r.interval)
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Targets passed to `schedule_at_affinity`, in order.
    pub fn affinity_submissions(&self) -> Vec<Target> {
        self.submitted.lock().clone()
    }

    fn next_handle(&self) -> TaskHandle {
        TaskHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ManualDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDispatcher for ManualDispatcher {
    fn is_region_sharded(&self) -> bool {
        self.region_sharded
    }

    fn schedule_at_affinity(
        &self,
        target: &Target,
        job: Job,
    ) -> Result<TaskHandle, DispatchError> {
        if self.rejected_targets.lock().contains(&target.id) {
            return Err(DispatchError::Rejected(format!(
                "target {} is not schedulable",
                target.id
            )));
        }
        let handle = self.next_handle();
        self.submitted.lock().push(target.clone());
        self.queue.lock().push_back(Queued {
            handle: handle.clone(),
            target: Some(target.clone()),
            job,
        });
        Ok(handle)
    }

    fn schedule_repeating(
        &self,
        interval: Duration,
        job: RepeatingJob,
    ) -> Result<TaskHandle, DispatchError> {
        let handle = self.next_handle();
        self.repeating.lock().push(Repeating {
            handle: handle.clone(),
            interval,
            job,
        });
        Ok(handle)
    }

    fn schedule_once_next_global_tick(&self, job: Job) -> Result<TaskHandle, DispatchError> {
        let handle = self.next_handle();
        self.queue.lock().push_back(Queued {
            handle: handle.clone(),
            target: None,
            job,
        });
        Ok(handle)
    }
}
