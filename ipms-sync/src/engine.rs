//! Sync engine: pull on load, push on change.
//!
//! The engine owns no background state of its own. [`SyncEngine::start`]
//! wires a [`ChangeQueue`] into the store and spawns the worker that turns
//! fired jobs into pushes; everything else is request/response.
//!
//! Pushes for one key run one after another on that key's lane, so a slow
//! upload can never let an older list overwrite a newer one on the server.
//! Pushes for different keys run concurrently.

use crate::attachments::AttachmentConverter;
use crate::client::{LoginResponse, RemoteApi, RemoteClient};
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::normalize::normalize_list;
use crate::queue::{ChangeQueue, PushJob};
use crate::session::SessionStore;
use crate::store::{LocalStore, SubscriptionId};
use ipms_types::{EntityKind, RecordList, Session};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Outcome of pulling one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulledList {
    /// Kind that was fetched.
    pub kind: EntityKind,
    /// Records the server returned.
    pub records: usize,
    /// Whether the list was written to the store.
    pub written: bool,
}

/// Outcome of [`SyncEngine::pull_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    pub lists: Vec<PulledList>,
}

impl PullReport {
    /// Records fetched for a kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.lists
            .iter()
            .find(|l| l.kind == kind)
            .map_or(0, |l| l.records)
    }

    /// Storage keys that were written.
    pub fn written_keys(&self) -> Vec<&'static str> {
        self.lists
            .iter()
            .filter(|l| l.written)
            .filter_map(|l| l.kind.storage_key())
            .collect()
    }
}

/// Outcome of [`SyncEngine::resume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// No stored session.
    SignedOut,
    /// The stored token was rejected; the session has been cleared.
    Expired,
    /// The server could not be reached; the session is kept.
    Offline,
    /// Token is live and data was pulled.
    Pulled(PullReport),
}

/// Orchestrates session, pull and push against the remote API.
#[derive(Clone)]
pub struct SyncEngine {
    config: SyncConfig,
    store: Arc<LocalStore>,
    session: Arc<SessionStore>,
    remote: Arc<dyn RemoteApi>,
    converter: AttachmentConverter,
}

impl SyncEngine {
    /// Creates an engine from its parts.
    pub fn new(
        config: SyncConfig,
        store: Arc<LocalStore>,
        session: Arc<SessionStore>,
        remote: Arc<dyn RemoteApi>,
    ) -> Self {
        let converter = AttachmentConverter::new(Arc::clone(&remote));
        Self {
            config,
            store,
            session,
            remote,
            converter,
        }
    }

    /// Creates an engine over `store` talking HTTP, restoring any stored session.
    pub fn connect(config: SyncConfig, store: Arc<LocalStore>) -> SyncResult<Self> {
        let session = Arc::new(SessionStore::restore(Arc::clone(&store)));
        let remote = Arc::new(RemoteClient::new(config.clone(), Arc::clone(&session))?);
        Ok(Self::new(config, store, session, remote))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the local store.
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// Returns the session store.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    // ── User actions ─────────────────────────────────────────────

    /// Logs in, stores the session and pulls every list.
    pub async fn login(&self, username: &str, password: &str) -> SyncResult<Session> {
        let LoginResponse { token, identity } = self.remote.login(username, password).await?;
        self.session.set_session(&token, &identity);
        self.pull_all().await;
        Ok(self.session.snapshot())
    }

    /// Logs out server-side (best-effort) and purges local data.
    pub async fn logout(&self) {
        self.remote.logout().await;
        self.session.clear_session();
    }

    /// Changes the password. The server revokes the token on success, so the
    /// local session is ended too.
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> SyncResult<()> {
        self.remote
            .change_password(old_password, new_password)
            .await?;
        self.session.clear_session();
        Ok(())
    }

    /// Validates a restored session and pulls if it is still live.
    pub async fn resume(&self) -> ResumeOutcome {
        if !self.session.is_authenticated() {
            return ResumeOutcome::SignedOut;
        }

        match self.remote.check().await {
            Ok(true) => ResumeOutcome::Pulled(self.pull_all().await),
            Ok(false) => {
                info!("[Auth] Stored token rejected, signing out");
                self.logout().await;
                ResumeOutcome::Expired
            }
            Err(e) => {
                warn!("[Auth] Token check failed, keeping session: {}", e);
                ResumeOutcome::Offline
            }
        }
    }

    // ── Sync ─────────────────────────────────────────────────────

    /// Fetches every kind concurrently and writes non-empty lists to the store.
    ///
    /// Each fetch resolves independently; one failing never cancels the
    /// others. Lists are written with internal origin so they do not echo back
    /// as pushes.
    pub async fn pull_all(&self) -> PullReport {
        if !self.session.is_authenticated() {
            debug!("[Sync] Not signed in, skipping pull");
            return PullReport::default();
        }

        info!("[Sync] Pulling data from server...");
        let (copyrights, papers, patents) = tokio::join!(
            self.remote.fetch_list(EntityKind::Copyrights),
            self.remote.fetch_list(EntityKind::Papers),
            self.remote.fetch_list(EntityKind::Patents),
        );

        // A 401 on any fetch has already purged the store; do not refill it.
        let still_signed_in = self.session.is_authenticated();
        if !still_signed_in {
            warn!("[Sync] Session dropped during pull, discarding results");
        }

        let mut report = PullReport::default();
        for (kind, records) in [
            (EntityKind::Copyrights, copyrights),
            (EntityKind::Papers, papers),
            (EntityKind::Patents, patents),
        ] {
            let count = records.len();
            let written = still_signed_in && self.write_pulled(kind, normalize_list(records));
            report.lists.push(PulledList {
                kind,
                records: count,
                written,
            });
        }

        info!("[Sync] Pull complete.");
        report
    }

    fn write_pulled(&self, kind: EntityKind, records: RecordList) -> bool {
        let Some(key) = kind.storage_key() else {
            return false;
        };
        if records.is_empty() {
            return false;
        }
        match serde_json::to_string(&records) {
            Ok(json) => {
                self.store.write_internal(key, &json);
                true
            }
            Err(e) => {
                error!("[Sync] Failed to encode {}: {}", kind, e);
                false
            }
        }
    }

    /// Normalizes, converts attachments and pushes one list.
    ///
    /// Returns false when nothing was sent (no session, or unknown kind).
    pub async fn push_one(&self, kind: EntityKind, records: RecordList) -> bool {
        self.push_in_epoch(kind, records, self.session.epoch()).await
    }

    /// Pushes a list on behalf of session `epoch`. Nothing is sent once the
    /// session has been cleared or replaced, including after uploads finish.
    async fn push_in_epoch(&self, kind: EntityKind, records: RecordList, epoch: u64) -> bool {
        if !kind.is_known() {
            return false;
        }
        if !self.session.is_current(epoch) {
            debug!("[Sync] Session changed, dropping {} push", kind);
            return false;
        }

        info!("[Sync] Processing {}...", kind);
        let records = self
            .converter
            .convert_all(kind, normalize_list(records))
            .await;

        if !self.session.is_current(epoch) {
            info!("[Sync] Session changed during {} upload, dropping push", kind);
            return false;
        }
        self.remote.push_list(kind, &records).await;
        true
    }

    /// Subscribes a change queue to the store and starts the push worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> SyncResult<EngineHandle> {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Arc::new(ChangeQueue::new(
            self.config.clone(),
            Arc::clone(&self.session),
            tx,
        )?);
        let subscription = self.store.subscribe(queue.clone());
        let worker = tokio::spawn(push_worker(self.clone(), Arc::clone(&queue), rx));

        debug!("[Sync] Engine started");
        Ok(EngineHandle {
            store: Arc::clone(&self.store),
            queue,
            subscription,
            worker,
        })
    }
}

/// Routes each fired job to its key's lane, starting lanes on demand.
async fn push_worker(engine: SyncEngine, queue: Arc<ChangeQueue>, mut rx: UnboundedReceiver<PushJob>) {
    let mut lanes: HashMap<String, UnboundedSender<PushJob>> = HashMap::new();

    while let Some(job) = rx.recv().await {
        let lane = lanes
            .entry(job.key.clone())
            .or_insert_with(|| spawn_lane(engine.clone(), Arc::clone(&queue)));

        if let Err(mpsc::error::SendError(job)) = lane.send(job) {
            error!("[Sync] Push lane for {} stopped, dropping job", job.key);
            lanes.remove(&job.key);
            queue.job_done();
        }
    }
}

/// Pushes one key's jobs strictly in order. Jobs that queued up behind a
/// running push are superseded by the newest one.
fn spawn_lane(engine: SyncEngine, queue: Arc<ChangeQueue>) -> UnboundedSender<PushJob> {
    let (tx, mut rx) = mpsc::unbounded_channel::<PushJob>();
    tokio::spawn(async move {
        while let Some(mut job) = rx.recv().await {
            while let Ok(newer) = rx.try_recv() {
                debug!("[Sync] Superseded queued push for {}", job.key);
                queue.job_done();
                job = newer;
            }

            debug!("[Sync] Pushing {} from {}", job.kind, job.key);
            engine
                .push_in_epoch(job.kind, job.records, job.session_epoch)
                .await;
            queue.job_done();
        }
    });
    tx
}

/// Running engine: change queue subscription plus push worker.
pub struct EngineHandle {
    store: Arc<LocalStore>,
    queue: Arc<ChangeQueue>,
    subscription: SubscriptionId,
    worker: JoinHandle<()>,
}

impl EngineHandle {
    /// The change queue fed by the store.
    pub fn queue(&self) -> &Arc<ChangeQueue> {
        &self.queue
    }

    /// Waits until no timer is armed and no push is in flight.
    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await;
    }

    /// Stops observing the store, cancels pending timers and stops the worker.
    /// Pushes already sent are not recalled.
    pub fn shutdown(self) {
        self.store.unsubscribe(self.subscription);
        self.queue.cancel_all();
        self.worker.abort();
        debug!("[Sync] Engine stopped");
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("queue", &self.queue)
            .field("subscription", &self.subscription)
            .finish()
    }
}
