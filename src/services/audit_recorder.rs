use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::services::geo::GeoResolver;
use crate::stores::AuditStore;
use crate::types::db::user;
use crate::types::internal::audit::{AuditAction, AuditEvent};
use crate::types::internal::context::RequestContext;

/// Attempts for a single audit write before giving up
const WRITE_RETRIES: u32 = 3;
/// Initial backoff between write attempts; doubles per retry
const RETRY_BACKOFF_MS: u64 = 100;

enum WorkItem {
    Write(AuditEvent),
    Enrich { entry_id: i64, ip: String },
}

/// Durable, best-effort-ordered recorder for security-relevant events
///
/// `record` never fails the triggering operation. Critical events (LOGIN,
/// LOGOUT, permission changes) are written synchronously with retries;
/// everything else goes through a bounded queue drained by a single
/// background worker, which preserves the order entries were recorded in.
/// When the queue is full the oldest pending item is dropped rather than
/// blocking the request thread.
///
/// After a row is written, the worker asks the external geolocation lookup
/// to resolve the stored IP and fills in the geo columns. That step may
/// fail, time out, or be abandoned at shutdown without affecting the row.
pub struct AuditRecorder {
    store: Arc<AuditStore>,
    geo: Option<Arc<dyn GeoResolver>>,
    geo_timeout: Duration,
    queue: Mutex<VecDeque<WorkItem>>,
    notify: Notify,
    queue_bound: usize,
    shutdown: AtomicBool,
    dropped: AtomicU64,
}

impl AuditRecorder {
    /// Create a new recorder
    ///
    /// # Arguments
    /// * `store` - The audit store
    /// * `geo` - External geolocation lookup; None disables enrichment
    /// * `geo_timeout` - Timeout for a single enrichment lookup
    /// * `queue_bound` - Maximum pending background items
    pub fn new(
        store: Arc<AuditStore>,
        geo: Option<Arc<dyn GeoResolver>>,
        geo_timeout: Duration,
        queue_bound: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            geo,
            geo_timeout,
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            queue_bound,
            shutdown: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        })
    }

    /// Start the background worker; returns its join handle
    pub fn spawn_worker(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let recorder = self.clone();
        tokio::spawn(recorder.run())
    }

    /// Record an audit event
    ///
    /// Critical events are written before this returns; the rest are
    /// queued. Failures are logged and escalated internally, never
    /// propagated to the caller.
    pub async fn record(&self, event: AuditEvent) {
        if event.action.is_critical() {
            self.write_critical(event).await;
        } else {
            self.enqueue(WorkItem::Write(event));
        }
    }

    /// Number of items dropped due to queue pressure
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Ask the worker to stop
    ///
    /// Pending writes are flushed; pending enrichment is abandoned.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    async fn write_critical(&self, event: AuditEvent) {
        match self.write_with_retries(&event).await {
            Ok(entry_id) => self.schedule_enrichment(entry_id, &event),
            Err(e) => {
                // Escalate to operational alerting; the triggering request
                // still succeeds.
                tracing::error!(
                    action = %event.action,
                    actor = ?event.actor_id,
                    "CRITICAL audit event lost after {} attempts: {}",
                    WRITE_RETRIES,
                    e
                );
            }
        }
    }

    async fn write_with_retries(
        &self,
        event: &AuditEvent,
    ) -> Result<i64, crate::errors::InternalError> {
        let mut backoff = Duration::from_millis(RETRY_BACKOFF_MS);
        let mut attempt = 1;
        loop {
            match self.store.insert_entry(event).await {
                Ok(entry_id) => return Ok(entry_id),
                Err(e) if attempt < WRITE_RETRIES => {
                    tracing::warn!(
                        action = %event.action,
                        attempt,
                        "audit write failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn enqueue(&self, item: WorkItem) {
        {
            let mut queue = self.queue.lock().expect("audit queue poisoned");
            if queue.len() >= self.queue_bound {
                queue.pop_front();
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(dropped, "audit queue full, dropped oldest pending item");
            }
            queue.push_back(item);
        }
        self.notify.notify_one();
    }

    fn schedule_enrichment(&self, entry_id: i64, event: &AuditEvent) {
        if self.geo.is_none() {
            return;
        }
        if let Some(ip) = &event.ip_address {
            self.enqueue(WorkItem::Enrich {
                entry_id,
                ip: ip.clone(),
            });
        }
    }

    async fn run(self: Arc<Self>) {
        loop {
            self.drain().await;
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            self.notify.notified().await;
        }

        // Flush remaining writes; abandon enrichment
        loop {
            let item = self
                .queue
                .lock()
                .expect("audit queue poisoned")
                .pop_front();
            match item {
                Some(WorkItem::Write(event)) => {
                    if let Err(e) = self.store.insert_entry(&event).await {
                        tracing::warn!(action = %event.action, "audit write lost at shutdown: {}", e);
                    }
                }
                Some(WorkItem::Enrich { .. }) => continue,
                None => break,
            }
        }
    }

    /// Process everything currently queued
    ///
    /// Called by the worker between waits; also usable directly where a
    /// deterministic flush is needed instead of a running worker.
    pub async fn drain(&self) {
        loop {
            let item = self
                .queue
                .lock()
                .expect("audit queue poisoned")
                .pop_front();
            match item {
                Some(item) => self.process(item).await,
                None => break,
            }
        }
    }

    async fn process(&self, item: WorkItem) {
        match item {
            WorkItem::Write(event) => match self.write_with_retries(&event).await {
                Ok(entry_id) => self.schedule_enrichment(entry_id, &event),
                Err(e) => {
                    tracing::warn!(action = %event.action, "audit write dropped: {}", e);
                }
            },
            WorkItem::Enrich { entry_id, ip } => self.enrich(entry_id, &ip).await,
        }
    }

    async fn enrich(&self, entry_id: i64, ip: &str) {
        let Some(geo) = &self.geo else { return };

        let lookup = tokio::time::timeout(self.geo_timeout, geo.resolve(ip)).await;
        match lookup {
            Ok(Ok(Some(info))) => {
                if let Err(e) = self.store.apply_geo(entry_id, &info).await {
                    tracing::warn!(entry_id, "failed to apply geolocation: {}", e);
                }
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => tracing::warn!(entry_id, ip, "geolocation lookup failed: {}", e),
            Err(_) => tracing::warn!(entry_id, ip, "geolocation lookup timed out"),
        }
    }

    // Event constructors for the flows this core owns. Anything not
    // covered builds an AuditEvent directly and calls `record`.

    /// Record a successful login
    pub async fn record_login_success(
        &self,
        ctx: &RequestContext,
        user: &user::Model,
        second_factor: Option<&str>,
    ) {
        let mut event = AuditEvent::new(AuditAction::Login, "session")
            .with_context(ctx)
            .with_actor(user.id.clone())
            .with_resource_id(user.id.clone())
            .with_detail("email", user.email.clone())
            .with_detail("outcome", "success");
        if let Some(factor) = second_factor {
            event = event.with_detail("second_factor", factor);
        }
        self.record(event).await;
    }

    /// Record a failed login attempt
    ///
    /// `actor_id` is None when no identity was proven (unknown email or
    /// wrong password) and the user's id when the password matched but the
    /// attempt was still rejected (disabled account, failed challenge).
    pub async fn record_login_failure(
        &self,
        ctx: &RequestContext,
        actor_id: Option<String>,
        attempted_email: &str,
        failure_reason: &str,
    ) {
        let mut event = AuditEvent::new(AuditAction::Login, "session")
            .with_context(ctx)
            .with_detail("attempted_email", attempted_email)
            .with_detail("outcome", "failure")
            .with_detail("failure_reason", failure_reason);
        event.actor_id = actor_id;
        self.record(event).await;
    }

    /// Record a logout
    pub async fn record_logout(&self, ctx: &RequestContext) {
        let event = AuditEvent::new(AuditAction::Logout, "session").with_context(ctx);
        self.record(event).await;
    }

    /// Record a rejected second-factor attempt
    pub async fn record_challenge_failed(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        reason: &str,
    ) {
        let event = AuditEvent::new(AuditAction::ChallengeFailed, "session")
            .with_context(ctx)
            .with_actor(user_id)
            .with_detail("failure_reason", reason);
        self.record(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_drops_oldest_when_full() {
        // Construct without a runtime; enqueue is synchronous.
        let store = Arc::new(AuditStore::new(sea_orm::DatabaseConnection::default()));
        let recorder = AuditRecorder::new(store, None, Duration::from_secs(1), 2);

        recorder.enqueue(WorkItem::Write(AuditEvent::new(
            AuditAction::Create,
            "item",
        )));
        recorder.enqueue(WorkItem::Write(AuditEvent::new(
            AuditAction::Update,
            "item",
        )));
        recorder.enqueue(WorkItem::Write(AuditEvent::new(
            AuditAction::Delete,
            "item",
        )));

        assert_eq!(recorder.dropped_count(), 1);
        let queue = recorder.queue.lock().unwrap();
        assert_eq!(queue.len(), 2);
    }
}
