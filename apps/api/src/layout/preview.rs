//! Live preview sessions: debounced, last-snapshot-wins re-pagination.
//!
//! # Pipeline per submitted snapshot
//! 1. `submit` bumps the session's generation and spawns a pass that first sleeps for the
//!    debounce window. If a newer snapshot arrived meanwhile, the pass exits: rapid edits
//!    collapse into one recomputation over the latest snapshot.
//! 2. A fast provisional pass (estimated heights) is committed so the preview updates
//!    immediately.
//! 3. The measured pass runs on `spawn_blocking`. Its result supersedes the provisional
//!    one; a provisional layout is never what gets exported. A surface that has not
//!    finished its layout cycle (`NotYetMeasured`) gets a short wait and another pass,
//!    up to `MEASURE_ATTEMPTS` passes per snapshot.
//!
//! # Commit rule
//! A result whose generation is older than the latest submitted snapshot is stale and is
//! dropped (logged at debug, never surfaced). A measured layout is never replaced by a
//! provisional one of the same generation. The committed layout sits in a `watch`
//! channel, so readers see either the old layout or the new one, never a mix. No
//! cancellation token is needed: an outdated pass just has its result ignored.
//!
//! # Idle sessions
//! Every `submit` and registry lookup touches the session. A background sweep
//! (`PreviewRegistry::spawn_eviction`) drops sessions idle for longer than the
//! registry's TTL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::layout::errors::LayoutError;
use crate::layout::height::{HeightStrategy, LayoutSurface};
use crate::layout::template::TemplateConfig;
use crate::layout::validate::ValidationRules;
use crate::layout::{paginate, LayoutOutcome};
use crate::models::document::ResumeDocument;

const PAGE_COUNT_CHANNEL_CAPACITY: usize = 16;

/// Measured passes per snapshot while the surface keeps reporting a pending layout.
const MEASURE_ATTEMPTS: u32 = 5;
/// Roughly one layout frame.
const MEASURE_RETRY_DELAY: Duration = Duration::from_millis(16);

/// Lower bound on the idle sweep period.
const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// The layout currently shown for a session.
#[derive(Debug, Clone, Serialize)]
pub struct CommittedLayout {
    pub session_id: Uuid,
    pub generation: u64,
    pub strategy: HeightStrategy,
    pub provisional: bool,
    pub committed_at: DateTime<Utc>,
    pub outcome: LayoutOutcome,
}

/// Emitted whenever a commit changes the session's page count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageCountChanged {
    pub session_id: Uuid,
    pub generation: u64,
    pub page_count: usize,
    pub provisional: bool,
    /// Display text, e.g. "2 pages detected".
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Superseded by a newer snapshot (or a measured layout of the same one).
    Stale,
}

fn page_count_message(page_count: usize) -> String {
    match page_count {
        1 => "1 page detected".to_string(),
        n => format!("{n} pages detected"),
    }
}

impl CommittedLayout {
    pub fn page_count(&self) -> usize {
        self.outcome.page_count()
    }

    pub fn page_count_event(&self) -> PageCountChanged {
        PageCountChanged {
            session_id: self.session_id,
            generation: self.generation,
            page_count: self.page_count(),
            provisional: self.provisional,
            message: page_count_message(self.page_count()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session
// ────────────────────────────────────────────────────────────────────────────

struct SessionInner {
    id: Uuid,
    latest_generation: AtomicU64,
    passes_started: AtomicU64,
    opened_at: Instant,
    /// Milliseconds after `opened_at` of the last submit or lookup.
    touched_ms: AtomicU64,
    committed: watch::Sender<Option<Arc<CommittedLayout>>>,
    page_counts: broadcast::Sender<PageCountChanged>,
    debounce: Duration,
    rules: ValidationRules,
    surface: Arc<dyn LayoutSurface>,
}

/// One editing session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PreviewSession {
    inner: Arc<SessionInner>,
}

impl PreviewSession {
    pub fn new(
        id: Uuid,
        debounce: Duration,
        rules: ValidationRules,
        surface: Arc<dyn LayoutSurface>,
    ) -> Self {
        let (committed, _) = watch::channel(None);
        let (page_counts, _) = broadcast::channel(PAGE_COUNT_CHANNEL_CAPACITY);
        PreviewSession {
            inner: Arc::new(SessionInner {
                id,
                latest_generation: AtomicU64::new(0),
                passes_started: AtomicU64::new(0),
                opened_at: Instant::now(),
                touched_ms: AtomicU64::new(0),
                committed,
                page_counts,
                debounce,
                rules,
                surface,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Generation of the most recently submitted snapshot (0 before the first).
    pub fn latest_generation(&self) -> u64 {
        self.inner.latest_generation.load(Ordering::SeqCst)
    }

    /// Passes that got past the debounce window.
    pub fn passes_started(&self) -> u64 {
        self.inner.passes_started.load(Ordering::SeqCst)
    }

    pub fn last_touched(&self) -> Instant {
        self.inner.opened_at + Duration::from_millis(self.inner.touched_ms.load(Ordering::SeqCst))
    }

    fn touch(&self) {
        let elapsed = Instant::now().saturating_duration_since(self.inner.opened_at);
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.inner.touched_ms.fetch_max(ms, Ordering::SeqCst);
    }

    pub fn current(&self) -> Option<Arc<CommittedLayout>> {
        self.inner.committed.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<CommittedLayout>>> {
        self.inner.committed.subscribe()
    }

    pub fn subscribe_page_counts(&self) -> broadcast::Receiver<PageCountChanged> {
        self.inner.page_counts.subscribe()
    }

    /// Snapshots a document/template pair and schedules a debounced layout pass.
    ///
    /// The template is checked here, so configuration errors surface to the caller and
    /// never from inside the pass. Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        document: ResumeDocument,
        template: TemplateConfig,
    ) -> Result<u64, LayoutError> {
        template.validate()?;
        self.touch();

        let generation = self.inner.latest_generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(session = %self.inner.id, generation, "Snapshot submitted");

        let session = self.clone();
        tokio::spawn(async move {
            session.run_pass(generation, document, template).await;
        });
        Ok(generation)
    }

    /// Makes every in-flight pass stale. Used when the session is closed.
    pub fn invalidate(&self) {
        self.inner.latest_generation.fetch_add(1, Ordering::SeqCst);
    }

    fn is_superseded(&self, generation: u64) -> bool {
        generation < self.latest_generation()
    }

    async fn run_pass(self, generation: u64, document: ResumeDocument, template: TemplateConfig) {
        tokio::time::sleep(self.inner.debounce).await;
        if self.is_superseded(generation) {
            debug!(
                session = %self.inner.id,
                generation,
                "Snapshot superseded during debounce"
            );
            return;
        }
        self.inner.passes_started.fetch_add(1, Ordering::SeqCst);

        let rules = self.inner.rules.clone();
        match paginate(&document, &template, HeightStrategy::Estimated, None, &rules) {
            Ok(outcome) => {
                self.commit(generation, outcome);
            }
            Err(e) => {
                warn!(session = %self.inner.id, generation, "Provisional pass failed: {e}");
                return;
            }
        }

        if self.is_superseded(generation) {
            return;
        }

        let document = Arc::new(document);
        let template = Arc::new(template);
        let mut attempt = 1;
        loop {
            let surface = Arc::clone(&self.inner.surface);
            let (document, template, rules) =
                (Arc::clone(&document), Arc::clone(&template), rules.clone());
            let measured = tokio::task::spawn_blocking(move || {
                paginate(
                    &document,
                    &template,
                    HeightStrategy::Measured,
                    Some(surface.as_ref()),
                    &rules,
                )
            })
            .await;

            match measured {
                Ok(Ok(outcome)) => {
                    self.commit(generation, outcome);
                    return;
                }
                Ok(Err(LayoutError::NotYetMeasured { block_index }))
                    if attempt < MEASURE_ATTEMPTS =>
                {
                    debug!(
                        session = %self.inner.id,
                        generation,
                        block_index,
                        attempt,
                        "Layout surface pending, measuring again"
                    );
                    tokio::time::sleep(MEASURE_RETRY_DELAY).await;
                    if self.is_superseded(generation) {
                        return;
                    }
                    attempt += 1;
                }
                Ok(Err(e)) => {
                    warn!(
                        session = %self.inner.id,
                        generation,
                        attempt,
                        "Measured pass failed, keeping provisional layout: {e}"
                    );
                    return;
                }
                Err(e) => {
                    error!(session = %self.inner.id, generation, "Measured pass panicked: {e}");
                    return;
                }
            }
        }
    }

    /// Atomically replaces the committed layout unless `generation` is stale.
    pub(crate) fn commit(&self, generation: u64, outcome: LayoutOutcome) -> CommitOutcome {
        if self.is_superseded(generation) {
            debug!(session = %self.inner.id, generation, "Discarding stale layout pass");
            return CommitOutcome::Stale;
        }

        let provisional = outcome.is_provisional();
        let page_count = outcome.page_count();
        let layout = Arc::new(CommittedLayout {
            session_id: self.inner.id,
            generation,
            strategy: outcome.heights.strategy,
            provisional,
            committed_at: Utc::now(),
            outcome,
        });

        let event = layout.page_count_event();
        let mut previous_page_count = None;
        let replaced = self.inner.committed.send_if_modified(|current| {
            if let Some(existing) = current {
                let newer = existing.generation > generation;
                let downgrade =
                    existing.generation == generation && !existing.provisional && provisional;
                if newer || downgrade {
                    return false;
                }
                previous_page_count = Some(existing.page_count());
            }
            *current = Some(layout);
            true
        });

        if !replaced {
            debug!(session = %self.inner.id, generation, "Discarding stale layout pass");
            return CommitOutcome::Stale;
        }

        info!(
            session = %self.inner.id,
            generation,
            pages = page_count,
            provisional,
            "Layout committed"
        );

        if previous_page_count != Some(page_count) {
            // No subscribers is fine.
            let _ = self.inner.page_counts.send(event);
        }
        CommitOutcome::Committed
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

/// In-memory session store. Sessions are not persisted.
#[derive(Clone)]
pub struct PreviewRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, PreviewSession>>>,
    debounce: Duration,
    idle_ttl: Duration,
    rules: ValidationRules,
    surface: Arc<dyn LayoutSurface>,
}

impl PreviewRegistry {
    pub fn new(
        debounce: Duration,
        idle_ttl: Duration,
        rules: ValidationRules,
        surface: Arc<dyn LayoutSurface>,
    ) -> Self {
        PreviewRegistry {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            debounce,
            idle_ttl,
            rules,
            surface,
        }
    }

    pub async fn create(&self) -> PreviewSession {
        let session = PreviewSession::new(
            Uuid::new_v4(),
            self.debounce,
            self.rules.clone(),
            Arc::clone(&self.surface),
        );
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());
        info!(session = %session.id(), "Preview session created");
        session
    }

    /// Looks a session up and marks it as in use.
    pub async fn get(&self, id: Uuid) -> Option<PreviewSession> {
        let session = self.sessions.read().await.get(&id).cloned()?;
        session.touch();
        Some(session)
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        match self.sessions.write().await.remove(&id) {
            Some(session) => {
                session.invalidate();
                info!(session = %id, "Preview session closed");
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Closes every session untouched for at least the idle TTL. Returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let idle = now.saturating_duration_since(session.last_touched());
            if idle < self.idle_ttl {
                return true;
            }
            session.invalidate();
            info!(session = %id, idle_secs = idle.as_secs(), "Preview session expired");
            false
        });
        before - sessions.len()
    }

    /// Starts the background sweep that evicts idle sessions.
    pub fn spawn_eviction(&self) -> JoinHandle<()> {
        let registry = self.clone();
        let period = (self.idle_ttl / 4).max(MIN_SWEEP_PERIOD);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = registry.evict_idle().await;
                if evicted > 0 {
                    debug!(evicted, "Idle preview sweep");
                }
            }
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use crate::layout::content::ContentGroup;
    use crate::layout::height::{LayoutReading, ShapedSurface};
    use crate::layout::template::TypographyContext;
    use crate::models::document::{ExperienceItem, ResumeHeader};

    /// Reports `Pending` for the first `pending_reads` reads, then lays out like
    /// `ShapedSurface`.
    struct SlowSurface {
        pending_reads: usize,
        reads: AtomicUsize,
    }

    impl SlowSurface {
        fn new(pending_reads: usize) -> Self {
            SlowSurface {
                pending_reads,
                reads: AtomicUsize::new(0),
            }
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl LayoutSurface for SlowSurface {
        fn lay_out(&self, group: &ContentGroup, ctx: &TypographyContext) -> LayoutReading {
            if self.reads.fetch_add(1, Ordering::SeqCst) < self.pending_reads {
                LayoutReading::Pending
            } else {
                ShapedSurface.lay_out(group, ctx)
            }
        }
    }

    fn make_registry(idle_ttl: Duration) -> PreviewRegistry {
        PreviewRegistry::new(
            Duration::from_millis(10),
            idle_ttl,
            ValidationRules::default(),
            Arc::new(ShapedSurface),
        )
    }

    fn make_session(debounce_ms: u64) -> PreviewSession {
        PreviewSession::new(
            Uuid::new_v4(),
            Duration::from_millis(debounce_ms),
            ValidationRules::default(),
            Arc::new(ShapedSurface),
        )
    }

    fn make_document(roles: usize) -> ResumeDocument {
        ResumeDocument {
            header: ResumeHeader {
                name: "Ada Lovelace".to_string(),
                ..Default::default()
            },
            experience: (0..roles)
                .map(|n| ExperienceItem {
                    role: format!("Engineer {n}"),
                    company: "Acme".to_string(),
                    dates: "2020".to_string(),
                    location: None,
                    bullets: vec!["Built the thing that made the other thing faster".to_string(); 5],
                })
                .collect(),
            ..Default::default()
        }
    }

    fn make_outcome(roles: usize, strategy: HeightStrategy) -> LayoutOutcome {
        paginate(
            &make_document(roles),
            &TemplateConfig::default(),
            strategy,
            Some(&ShapedSurface),
            &ValidationRules::default(),
        )
        .unwrap()
    }

    /// Waits (real time, bounded) until a measured layout of `generation` is committed.
    async fn wait_for_measured(session: &PreviewSession, generation: u64) -> Arc<CommittedLayout> {
        let mut rx = session.subscribe();
        let wait = async {
            loop {
                if let Some(layout) = rx.borrow_and_update().clone() {
                    if layout.generation == generation && !layout.provisional {
                        return layout;
                    }
                }
                rx.changed().await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("measured layout was not committed in time")
    }

    #[tokio::test]
    async fn test_rapid_submits_coalesce_into_one_pass() {
        let session = make_session(50);
        for roles in 1..=3 {
            session
                .submit(make_document(roles), TemplateConfig::default())
                .unwrap();
        }
        assert_eq!(session.latest_generation(), 3);

        let layout = wait_for_measured(&session, 3).await;
        assert_eq!(layout.strategy, HeightStrategy::Measured);
        assert_eq!(session.passes_started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_committed_before_debounce_elapses() {
        let session = make_session(250);
        let mut rx = session.subscribe();
        session
            .submit(make_document(1), TemplateConfig::default())
            .unwrap();

        tokio::time::advance(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;
        assert!(session.current().is_none());

        tokio::time::advance(Duration::from_millis(100)).await;
        rx.changed().await.unwrap();
        let layout = session.current().unwrap();
        assert_eq!(layout.generation, 1);
    }

    #[tokio::test]
    async fn test_stale_commit_is_discarded() {
        let session = make_session(60_000);
        session.submit(make_document(1), TemplateConfig::default()).unwrap();
        session.submit(make_document(2), TemplateConfig::default()).unwrap();

        let outcome = make_outcome(1, HeightStrategy::Measured);
        assert_eq!(session.commit(1, outcome.clone()), CommitOutcome::Stale);
        assert!(session.current().is_none());
        assert_eq!(session.commit(2, outcome), CommitOutcome::Committed);
        assert_eq!(session.current().unwrap().generation, 2);
    }

    #[tokio::test]
    async fn test_measured_not_replaced_by_provisional_of_same_generation() {
        let session = make_session(60_000);
        session.submit(make_document(1), TemplateConfig::default()).unwrap();

        let measured = make_outcome(1, HeightStrategy::Measured);
        let provisional = make_outcome(1, HeightStrategy::Estimated);
        assert_eq!(session.commit(1, measured), CommitOutcome::Committed);
        assert_eq!(session.commit(1, provisional), CommitOutcome::Stale);
        assert!(!session.current().unwrap().provisional);
    }

    #[tokio::test]
    async fn test_provisional_replaced_by_measured() {
        let session = make_session(60_000);
        session.submit(make_document(1), TemplateConfig::default()).unwrap();

        let provisional = make_outcome(1, HeightStrategy::Estimated);
        let measured = make_outcome(1, HeightStrategy::Measured);
        assert_eq!(session.commit(1, provisional), CommitOutcome::Committed);
        assert!(session.current().unwrap().provisional);
        assert_eq!(session.commit(1, measured), CommitOutcome::Committed);
        assert!(!session.current().unwrap().provisional);
    }

    #[tokio::test]
    async fn test_page_count_change_is_broadcast_once() {
        let session = make_session(60_000);
        let mut events = session.subscribe_page_counts();
        session.submit(make_document(1), TemplateConfig::default()).unwrap();

        session.commit(1, make_outcome(1, HeightStrategy::Estimated));
        let event = events.try_recv().unwrap();
        assert_eq!(event.page_count, 1);
        assert_eq!(event.message, "1 page detected");
        assert!(event.provisional);

        // same page count again: no notification
        session.commit(1, make_outcome(1, HeightStrategy::Measured));
        assert!(events.try_recv().is_err());

        session.submit(make_document(12), TemplateConfig::default()).unwrap();
        session.commit(2, make_outcome(12, HeightStrategy::Measured));
        let event = events.try_recv().unwrap();
        assert!(event.page_count > 1);
        assert_eq!(event.message, format!("{} pages detected", event.page_count));
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_template() {
        let session = make_session(10);
        let mut template = TemplateConfig::default();
        template.page.height_px = 0.0;
        let err = session.submit(make_document(1), template).unwrap_err();
        assert!(matches!(err, LayoutError::Configuration(_)));
        assert_eq!(session.latest_generation(), 0);
    }

    #[tokio::test]
    async fn test_registry_create_get_remove() {
        let registry = make_registry(Duration::from_secs(60));
        let session = registry.create().await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(session.id()).await.is_some());

        let generation = session.latest_generation();
        assert!(registry.remove(session.id()).await);
        assert!(session.latest_generation() > generation);
        assert!(registry.get(session.id()).await.is_none());
        assert!(!registry.remove(session.id()).await);
    }

    #[tokio::test]
    async fn test_pending_surface_is_measured_again() {
        let surface = Arc::new(SlowSurface::new(1));
        let session = PreviewSession::new(
            Uuid::new_v4(),
            Duration::from_millis(10),
            ValidationRules::default(),
            surface.clone(),
        );
        session.submit(make_document(2), TemplateConfig::default()).unwrap();

        let layout = wait_for_measured(&session, 1).await;
        assert_eq!(layout.strategy, HeightStrategy::Measured);
        assert!(surface.reads() > 1);
    }

    #[tokio::test]
    async fn test_always_pending_surface_stops_after_bounded_attempts() {
        let surface = Arc::new(SlowSurface::new(usize::MAX));
        let session = PreviewSession::new(
            Uuid::new_v4(),
            Duration::from_millis(10),
            ValidationRules::default(),
            surface.clone(),
        );
        session.submit(make_document(2), TemplateConfig::default()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while surface.reads() < MEASURE_ATTEMPTS as usize {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(MEASURE_RETRY_DELAY * 4).await;

        // each attempt stops at the first pending block
        assert_eq!(surface.reads(), MEASURE_ATTEMPTS as usize);
        assert!(session.current().unwrap().provisional);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_keeps_recently_used_sessions() {
        let registry = make_registry(Duration::from_secs(60));
        let idle = registry.create().await;
        let active = registry.create().await;

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(registry.get(active.id()).await.is_some());
        assert_eq!(registry.evict_idle().await, 0);

        tokio::time::advance(Duration::from_secs(30)).await;
        let generation = idle.latest_generation();
        assert_eq!(registry.evict_idle().await, 1);
        assert!(idle.latest_generation() > generation);
        assert!(registry.get(idle.id()).await.is_none());
        assert!(registry.get(active.id()).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_counts_as_activity() {
        let registry = make_registry(Duration::from_secs(60));
        let session = registry.create().await;

        tokio::time::advance(Duration::from_secs(50)).await;
        session.submit(make_document(1), TemplateConfig::default()).unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;

        assert_eq!(registry.evict_idle().await, 0);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweep_evicts_idle_sessions() {
        let registry = make_registry(Duration::from_secs(60));
        registry.create().await;
        let sweeper = registry.spawn_eviction();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(registry.len().await, 0);
        sweeper.abort();
    }
}
