//! Tokio-backed dispatcher.
//!
//! One global worker runs timer work and, on unsharded hosts, every affinity
//! job. When region-sharded, affinity jobs are routed to one of N region
//! workers by hashing the region the target is in at submission time.
//!
//! Affinity jobs are queued in a per-target mailbox; the worker only
//! receives a request to drain it. Whichever worker owns the target when a
//! drain request arrives runs the whole mailbox in submission order, so a
//! target moving between regions never reorders its jobs. A worker that no
//! longer owns the target forwards the request instead.
//!
//! Workers are plain OS threads draining unbounded channels. The repeating
//! timer is a tokio task that hands each invocation to the global worker and
//! waits for it to finish before arming the next one.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use enchantry_domain::{RegionId, Target, TargetId};

use crate::infrastructure::config::DispatcherConfig;
use crate::infrastructure::isolation::isolate;
use crate::infrastructure::ports::{
    DispatchError, HostDispatcher, Job, RepeatingJob, TargetLiveness, TaskHandle,
};

/// Forwards allowed before a drain request chasing a moving target gives up.
const MAX_FORWARDS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Worker {
    Global,
    Region(usize),
}

impl Worker {
    fn thread_name(self) -> String {
        match self {
            Worker::Global => "enchantry-global".to_string(),
            Worker::Region(i) => format!("enchantry-region-{}", i),
        }
    }
}

struct Envelope {
    handle: TaskHandle,
    job: Job,
}

/// Pending jobs of one target. `running` is held by the draining worker.
#[derive(Default)]
struct Mailbox {
    queue: Mutex<VecDeque<Envelope>>,
    running: Mutex<()>,
}

enum Message {
    Run(Envelope),
    Drain { target: Target, forwards: u8 },
    Stop,
}

enum Route {
    Run,
    Discard,
    Forward(Worker),
}

struct Shared {
    region_sharded: bool,
    global: mpsc::UnboundedSender<Message>,
    regions: Vec<mpsc::UnboundedSender<Message>>,
    mailboxes: DashMap<TargetId, Arc<Mailbox>>,
    liveness: Arc<dyn TargetLiveness>,
    shutdown: CancellationToken,
}

impl Shared {
    fn owner_of(&self, region: &RegionId) -> Worker {
        if !self.region_sharded || self.regions.is_empty() {
            return Worker::Global;
        }
        let mut hasher = DefaultHasher::new();
        region.hash(&mut hasher);
        let index = hasher.finish() % self.regions.len() as u64;
        Worker::Region(index as usize)
    }

    /// Owner of the target as the host sees it now, falling back to the
    /// region recorded on the target.
    fn current_owner(&self, target: &Target) -> Worker {
        if !self.region_sharded {
            return Worker::Global;
        }
        let region = self
            .liveness
            .current_region(target)
            .unwrap_or(target.region);
        self.owner_of(&region)
    }

    fn send(&self, worker: Worker, message: Message) -> Result<(), DispatchError> {
        let sender = match worker {
            Worker::Global => &self.global,
            Worker::Region(i) => self
                .regions
                .get(i)
                .ok_or_else(|| DispatchError::Rejected(format!("no region worker {}", i)))?,
        };
        sender.send(message).map_err(|_| DispatchError::ShutDown)
    }

    fn stop_all(&self) {
        let _ = self.global.send(Message::Stop);
        for region in &self.regions {
            let _ = region.send(Message::Stop);
        }
    }

    /// Queue a job behind every earlier job of the same target.
    fn enqueue(&self, target: &Target, envelope: Envelope) {
        self.mailboxes
            .entry(target.id)
            .or_default()
            .queue
            .lock()
            .push_back(envelope);
    }

    /// Drop the mailbox once nothing is left in it.
    fn release(&self, target: &TargetId) {
        self.mailboxes
            .remove_if(target, |_, mailbox| mailbox.queue.lock().is_empty());
    }

    /// Decide, on `worker`, what to do with jobs bound to `target`.
    fn route(&self, worker: Worker, target: &Target) -> Route {
        if !self.liveness.is_valid(target) {
            tracing::debug!(target_id = %target.id, "Target no longer valid, dropping jobs");
            return Route::Discard;
        }
        if !self.region_sharded {
            return Route::Run;
        }
        let Some(region) = self.liveness.current_region(target) else {
            tracing::debug!(target_id = %target.id, "Target has no owning region, dropping jobs");
            return Route::Discard;
        };
        let owner = self.owner_of(&region);
        if owner == worker {
            Route::Run
        } else {
            Route::Forward(owner)
        }
    }

    fn run(&self, envelope: Envelope) {
        let task = envelope.handle.id();
        if self.shutdown.is_cancelled() || !envelope.handle.is_alive() {
            tracing::trace!(task, "Skipping cancelled job");
            return;
        }
        if let Err(panic) = isolate(envelope.job) {
            tracing::error!(task, panic = %panic, "Scheduled job panicked");
        }
    }

    fn drain(&self, worker: Worker, target: Target, forwards: u8) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let Some(mailbox) = self
            .mailboxes
            .get(&target.id)
            .map(|entry| Arc::clone(entry.value()))
        else {
            // An earlier drain already ran everything.
            return;
        };

        match self.route(worker, &target) {
            Route::Discard => {
                mailbox.queue.lock().clear();
                self.release(&target.id);
            }
            Route::Forward(owner) => {
                if forwards >= MAX_FORWARDS {
                    tracing::warn!(
                        target_id = %target.id,
                        "Target kept changing region, dropping jobs"
                    );
                    mailbox.queue.lock().clear();
                    self.release(&target.id);
                    return;
                }
                let forwarded = Message::Drain {
                    forwards: forwards + 1,
                    target,
                };
                if let Err(e) = self.send(owner, forwarded) {
                    tracing::warn!(error = %e, "Failed to forward jobs to region owner");
                }
            }
            Route::Run => {
                let running = mailbox.running.lock();
                loop {
                    let next = mailbox.queue.lock().pop_front();
                    let Some(envelope) = next else {
                        break;
                    };
                    self.run(envelope);
                }
                drop(running);
                self.release(&target.id);
            }
        }
    }
}

fn spawn_worker(
    shared: &Arc<Shared>,
    worker: Worker,
    mut rx: mpsc::UnboundedReceiver<Message>,
) -> Result<(), DispatchError> {
    let shared = Arc::clone(shared);
    thread::Builder::new()
        .name(worker.thread_name())
        .spawn(move || {
            while let Some(message) = rx.blocking_recv() {
                match message {
                    Message::Stop => break,
                    Message::Run(envelope) => shared.run(envelope),
                    Message::Drain { target, forwards } => shared.drain(worker, target, forwards),
                }
            }
            tracing::debug!(worker = ?worker, "Dispatcher worker stopped");
        })
        .map(|_| ())
        .map_err(|e| DispatchError::Rejected(format!("failed to spawn worker: {}", e)))
}

/// [`HostDispatcher`] over OS worker threads and a tokio timer.
pub struct TokioDispatcher {
    shared: Arc<Shared>,
    runtime: Handle,
    next_id: AtomicU64,
}

impl TokioDispatcher {
    /// Start the workers. Must be called from within a tokio runtime; the
    /// repeating timer runs on that runtime.
    pub fn start(
        config: &DispatcherConfig,
        liveness: Arc<dyn TargetLiveness>,
    ) -> Result<Self, DispatchError> {
        let runtime = Handle::try_current()
            .map_err(|e| DispatchError::Rejected(format!("no tokio runtime: {}", e)))?;

        let region_count = if config.region_sharded {
            config.workers.max(1)
        } else {
            0
        };

        let (global_tx, global_rx) = mpsc::unbounded_channel();
        let mut region_txs = Vec::with_capacity(region_count);
        let mut region_rxs = Vec::with_capacity(region_count);
        for _ in 0..region_count {
            let (tx, rx) = mpsc::unbounded_channel();
            region_txs.push(tx);
            region_rxs.push(rx);
        }

        let shared = Arc::new(Shared {
            region_sharded: config.region_sharded,
            global: global_tx,
            regions: region_txs,
            mailboxes: DashMap::new(),
            liveness,
            shutdown: CancellationToken::new(),
        });

        let spawned = spawn_worker(&shared, Worker::Global, global_rx).and_then(|()| {
            region_rxs
                .into_iter()
                .enumerate()
                .try_for_each(|(i, rx)| spawn_worker(&shared, Worker::Region(i), rx))
        });
        if let Err(e) = spawned {
            shared.shutdown.cancel();
            shared.stop_all();
            return Err(e);
        }

        tracing::info!(
            region_sharded = config.region_sharded,
            workers = region_count,
            "Dispatcher started"
        );

        Ok(Self {
            shared,
            runtime,
            next_id: AtomicU64::new(1),
        })
    }

    /// Stop the workers and the timer. Queued jobs are skipped.
    pub fn shutdown(&self) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        self.shared.shutdown.cancel();
        self.shared.stop_all();
        self.shared.mailboxes.clear();
        tracing::info!("Dispatcher shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    fn next_handle(&self) -> Result<TaskHandle, DispatchError> {
        if self.shared.shutdown.is_cancelled() {
            return Err(DispatchError::ShutDown);
        }
        Ok(TaskHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }
}

impl Drop for TokioDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl HostDispatcher for TokioDispatcher {
    fn is_region_sharded(&self) -> bool {
        self.shared.region_sharded
    }

    fn schedule_at_affinity(
        &self,
        target: &Target,
        job: Job,
    ) -> Result<TaskHandle, DispatchError> {
        let handle = self.next_handle()?;
        self.shared.enqueue(
            target,
            Envelope {
                handle: handle.clone(),
                job,
            },
        );
        let drain = Message::Drain {
            target: target.clone(),
            forwards: 0,
        };
        self.shared.send(self.shared.current_owner(target), drain)?;
        Ok(handle)
    }

    fn schedule_repeating(
        &self,
        interval: Duration,
        job: RepeatingJob,
    ) -> Result<TaskHandle, DispatchError> {
        if interval.is_zero() {
            return Err(DispatchError::Rejected(
                "repeating interval must be positive".to_string(),
            ));
        }
        let handle = self.next_handle()?;
        let timer_handle = handle.clone();
        let shared = Arc::clone(&self.shared);

        self.runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shared.shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if !timer_handle.is_alive() {
                    break;
                }

                let (done_tx, done_rx) = oneshot::channel::<()>();
                let job = Arc::clone(&job);
                let envelope = Envelope {
                    handle: timer_handle.clone(),
                    job: Box::new(move || {
                        job();
                        let _ = done_tx.send(());
                    }),
                };
                if shared.send(Worker::Global, Message::Run(envelope)).is_err() {
                    break;
                }
                // A panicking or skipped job drops `done_tx`; either way it is over.
                let _ = done_rx.await;
            }
            tracing::debug!(task = timer_handle.id(), "Repeating job stopped");
        });

        Ok(handle)
    }

    fn schedule_once_next_global_tick(&self, job: Job) -> Result<TaskHandle, DispatchError> {
        let handle = self.next_handle()?;
        self.shared.send(
            Worker::Global,
            Message::Run(Envelope {
                handle: handle.clone(),
                job,
            }),
        )?;
        Ok(handle)
    }
}
