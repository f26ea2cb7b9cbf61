//! Controller — work queue and worker pool driving the reconciler.
//!
//! Keys enter the queue from watch events, from a periodic resync of every
//! autoscaler, and from the requeue delay each tick returns. A key is never
//! reconciled by two workers at once: adding a key that is being processed
//! marks it dirty and it is queued again once the worker finishes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use foresight_state::ObjectKey;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::local::EventReceiver;
use crate::reconciler::{ReconcileAction, Reconciler};

/// Default number of concurrent reconcile workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default interval between full resyncs.
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(30);

// ── Work queue ─────────────────────────────────────────────────────

#[derive(Default)]
struct QueueState {
    queue: VecDeque<ObjectKey>,
    queued: HashSet<ObjectKey>,
    processing: HashSet<ObjectKey>,
    dirty: HashSet<ObjectKey>,
    /// Earliest pending delayed add per key.
    delayed: HashMap<ObjectKey, Instant>,
    shut_down: bool,
}

impl QueueState {
    fn push(&mut self, key: ObjectKey) -> bool {
        if self.shut_down || self.queued.contains(&key) {
            return false;
        }
        if self.processing.contains(&key) {
            self.dirty.insert(key);
            return false;
        }
        self.queued.insert(key.clone());
        self.queue.push_back(key);
        true
    }
}

/// De-duplicating work queue with per-key serialization.
#[derive(Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a key unless it is already queued.
    pub fn add(&self, key: ObjectKey) {
        if self.lock().push(key) {
            self.notify.notify_one();
        }
    }

    /// Queue a key once `delay` has passed. Only the earliest pending
    /// delayed add of a key is kept.
    pub fn add_after(self: &Arc<Self>, key: ObjectKey, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }

        let deadline = Instant::now() + delay;
        {
            let mut state = self.lock();
            if state.shut_down {
                return;
            }
            if let Some(existing) = state.delayed.get(&key)
                && *existing <= deadline
            {
                return;
            }
            state.delayed.insert(key.clone(), deadline);
        }

        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let pushed = {
                let mut state = queue.lock();
                if state.delayed.get(&key) != Some(&deadline) {
                    return;
                }
                state.delayed.remove(&key);
                state.push(key)
            };
            if pushed {
                queue.notify.notify_one();
            }
        });
    }

    /// Wait for the next key. Returns `None` once the queue is shut down.
    pub async fn next(&self) -> Option<ObjectKey> {
        loop {
            // Enabled before the check so a wakeup in between is not lost.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.shut_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.queued.remove(&key);
                    state.delayed.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }
            notified.await;
        }
    }

    /// Mark a key as finished; a key added while it was processing is
    /// queued again.
    pub fn done(&self, key: &ObjectKey) {
        let pushed = {
            let mut state = self.lock();
            state.processing.remove(key);
            state.dirty.remove(key) && state.push(key.clone())
        };
        if pushed {
            self.notify.notify_one();
        }
    }

    /// Number of keys ready to be processed.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop handing out keys and wake every waiting worker.
    pub fn shutdown(&self) {
        self.lock().shut_down = true;
        self.notify.notify_waiters();
    }
}

// ── Controller ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub workers: usize,
    pub resync_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            resync_interval: DEFAULT_RESYNC_INTERVAL,
        }
    }
}

pub struct Controller {
    reconciler: Arc<Reconciler>,
    queue: Arc<WorkQueue>,
    config: ControllerConfig,
}

impl Controller {
    pub fn new(reconciler: Reconciler, config: ControllerConfig) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            queue: WorkQueue::new(),
            config,
        }
    }

    pub fn queue(&self) -> Arc<WorkQueue> {
        Arc::clone(&self.queue)
    }

    /// Run workers, the watch event pump and the resync loop until
    /// `shutdown` flips.
    pub async fn run(self, events: Option<EventReceiver>, mut shutdown: watch::Receiver<bool>) {
        let workers = self.config.workers.max(1);
        info!(
            workers,
            resync_secs = self.config.resync_interval.as_secs(),
            "controller started"
        );

        let mut handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|id| {
                tokio::spawn(worker(
                    id,
                    Arc::clone(&self.reconciler),
                    Arc::clone(&self.queue),
                    shutdown.clone(),
                ))
            })
            .collect();

        if let Some(events) = events {
            handles.push(tokio::spawn(pump_events(
                events,
                Arc::clone(&self.queue),
                shutdown.clone(),
            )));
        }

        handles.push(tokio::spawn(resync(
            Arc::clone(&self.reconciler),
            Arc::clone(&self.queue),
            self.config.resync_interval,
            shutdown.clone(),
        )));

        while !*shutdown.borrow() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }

        info!("controller shutting down");
        self.queue.shutdown();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "controller task panicked");
            }
        }
    }
}

async fn worker(
    id: usize,
    reconciler: Arc<Reconciler>,
    queue: Arc<WorkQueue>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(worker = id, "worker started");
    while let Some(key) = queue.next().await {
        let action = tokio::select! {
            action = reconciler.reconcile(&key) => action,
            _ = shutdown.changed() => {
                debug!(worker = id, autoscaler = %key, "reconcile cancelled");
                break;
            }
        };
        queue.done(&key);

        match action {
            ReconcileAction::Requeue(delay) => {
                debug!(worker = id, autoscaler = %key, ?delay, "requeue");
                queue.add_after(key, delay);
            }
            ReconcileAction::AwaitChange => debug!(worker = id, autoscaler = %key, "awaiting change"),
            ReconcileAction::Done => debug!(worker = id, autoscaler = %key, "done"),
        }
    }
    debug!(worker = id, "worker stopped");
}

async fn pump_events(
    mut events: EventReceiver,
    queue: Arc<WorkQueue>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(key) => queue.add(key),
                None => break,
            },
            _ = shutdown.changed() => break,
        }
    }
}

async fn resync(
    reconciler: Arc<Reconciler>,
    queue: Arc<WorkQueue>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match reconciler.cluster().list_autoscalers().await {
                    Ok(keys) => {
                        debug!(count = keys.len(), "resync");
                        for key in keys {
                            queue.add(key);
                        }
                    }
                    Err(e) => warn!(error = %e, "resync failed to list autoscalers"),
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}
