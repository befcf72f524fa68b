//! Change queue: per-key debounce of host writes.
//!
//! Each qualifying write (re)schedules a timer for its key. A pending timer for
//! the same key is aborted and replaced, so a burst of writes collapses into a
//! single [`PushJob`] carrying the last value, handed to the engine once the
//! key has been quiet for the configured period.
//!
//! Jobs carry the session epoch they were scheduled under. A timer that fires
//! after the session was cleared or replaced drops its job, so a previous
//! user's records are never handed to the engine.

use crate::classify::classify;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::session::SessionStore;
use crate::store::{StoreListener, WriteOrigin};
use chrono::{DateTime, Utc};
use ipms_types::{EntityKind, RecordList};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A debounced list ready to be pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct PushJob {
    /// Store key the list was written under.
    pub key: String,
    /// Kind the list classified as.
    pub kind: EntityKind,
    /// The latest value written.
    pub records: RecordList,
    /// Session epoch the write was made under.
    pub session_epoch: u64,
}

/// A scheduled, not yet fired, synchronization for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSync {
    /// Store key the timer is armed for.
    pub key: String,
    /// Kind of the latest value written under the key.
    pub kind: EntityKind,
    /// When the current timer was armed.
    pub scheduled_at: DateTime<Utc>,
}

struct Pending {
    info: PendingSync,
    generation: u64,
    task: JoinHandle<()>,
}

type PendingMap = Arc<Mutex<HashMap<String, Pending>>>;

/// Debounces host writes into push jobs. At most one timer per key.
pub struct ChangeQueue {
    config: SyncConfig,
    session: Arc<SessionStore>,
    runtime: Handle,
    jobs: UnboundedSender<PushJob>,
    pending: PendingMap,
    next_generation: AtomicU64,
    in_flight: Arc<AtomicUsize>,
    changed: Arc<Notify>,
}

impl ChangeQueue {
    /// Creates a queue sending fired jobs to `jobs`.
    ///
    /// Must be called from within a tokio runtime; timers run on it.
    pub fn new(
        config: SyncConfig,
        session: Arc<SessionStore>,
        jobs: UnboundedSender<PushJob>,
    ) -> SyncResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| SyncError::Runtime(format!("change queue needs a tokio runtime: {e}")))?;

        Ok(Self {
            config,
            session,
            runtime,
            jobs,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            changed: Arc::new(Notify::new()),
        })
    }

    /// Debounce quiet period.
    pub fn quiet_period(&self) -> Duration {
        self.config.quiet_period()
    }

    /// Entry point for store writes.
    ///
    /// Ignored when the write is internal, there is no session, the value is
    /// empty, the key is reserved, the value is not a record list, or the list
    /// does not classify.
    pub fn on_local_write(&self, key: &str, value: &str, origin: WriteOrigin) {
        if origin == WriteOrigin::Internal
            || value.is_empty()
            || self.config.is_reserved_key(key)
            || !self.session.is_authenticated()
        {
            return;
        }

        let records: RecordList = match serde_json::from_str(value) {
            Ok(records) => records,
            Err(_) => {
                debug!("[Sync] Ignoring non-list write to {}", key);
                return;
            }
        };

        let kind = classify(&records);
        if !kind.is_known() {
            return;
        }

        info!("[Sync] Detected change in {} (Key: {})", kind, key);
        self.schedule(PushJob {
            key: key.to_string(),
            kind,
            records,
            session_epoch: self.session.epoch(),
        });
    }

    /// Arms the timer for `job.key`, replacing any pending one.
    fn schedule(&self, job: PushJob) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let info = PendingSync {
            key: job.key.clone(),
            kind: job.kind,
            scheduled_at: Utc::now(),
        };

        let quiet = self.quiet_period();
        let pending = Arc::clone(&self.pending);
        let in_flight = Arc::clone(&self.in_flight);
        let changed = Arc::clone(&self.changed);
        let session = Arc::clone(&self.session);
        let jobs = self.jobs.clone();

        let mut map = lock(&self.pending);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(quiet).await;

            let current = {
                let mut map = lock(&pending);
                if !map.get(&job.key).is_some_and(|p| p.generation == generation) {
                    return;
                }
                map.remove(&job.key);
                let current = session.is_current(job.session_epoch);
                if current {
                    in_flight.fetch_add(1, Ordering::SeqCst);
                }
                current
            };

            if !current {
                info!("[Sync] Session changed, dropping pending sync for {}", job.key);
            } else if jobs.send(job).is_err() {
                in_flight.fetch_sub(1, Ordering::SeqCst);
                warn!("[Sync] Push worker stopped, dropping job");
            }
            changed.notify_waiters();
        });

        if let Some(previous) = map.insert(
            info.key.clone(),
            Pending {
                info,
                generation,
                task,
            },
        ) {
            previous.task.abort();
            debug!("[Sync] Superseded pending sync for {}", previous.info.key);
        }
    }

    /// Keys with an armed timer.
    pub fn pending_keys(&self) -> Vec<String> {
        lock(&self.pending).keys().cloned().collect()
    }

    /// The pending entry for a key.
    pub fn pending(&self, key: &str) -> Option<PendingSync> {
        lock(&self.pending).get(key).map(|p| p.info.clone())
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Returns true if no timer is armed.
    pub fn is_empty(&self) -> bool {
        lock(&self.pending).is_empty()
    }

    /// Jobs fired but not yet reported done.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// True when nothing is armed and nothing is being pushed.
    pub fn is_idle(&self) -> bool {
        self.is_empty() && self.in_flight() == 0
    }

    /// Waits until the queue is idle.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register before checking so a transition in between is not missed.
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Cancels the timer for one key.
    pub fn cancel(&self, key: &str) -> bool {
        let removed = lock(&self.pending).remove(key);
        match removed {
            Some(p) => {
                p.task.abort();
                self.changed.notify_waiters();
                true
            }
            None => false,
        }
    }

    /// Cancels every armed timer.
    pub fn cancel_all(&self) {
        for (_, p) in lock(&self.pending).drain() {
            p.task.abort();
        }
        self.changed.notify_waiters();
    }

    /// Marks a fired job as finished.
    pub(crate) fn job_done(&self) {
        let _ = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        self.changed.notify_waiters();
    }
}

impl StoreListener for ChangeQueue {
    fn on_write(&self, key: &str, value: &str, origin: WriteOrigin) {
        self.on_local_write(key, value, origin);
    }
}

impl std::fmt::Debug for ChangeQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeQueue")
            .field("quiet_period", &self.quiet_period())
            .field("pending", &self.pending_keys())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
