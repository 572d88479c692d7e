// src/watcher.rs
//! Detection cycle driver.
//!
//! Each cycle: fan out to all sources, then (sequentially) classify and
//! dedup feed entries, diff symbol snapshots against their baselines,
//! trim the seen set, dispatch new events in arrival order and persist state.
//! Cycles never overlap.

use chrono::Utc;
use metrics::{counter, gauge};
use std::time::Duration;
use tokio::sync::watch;

use crate::classify::Classifier;
use crate::dedup::{discriminator_for, fingerprint};
use crate::event::Event;
use crate::ingest::fetch_all;
use crate::ingest::types::{FetchPath, RawEntry, Snapshot, SourceAdapter};
use crate::notify::{DispatchReport, Dispatcher};
use crate::state::{EngineState, StateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// First run ever: symbol baselines are seeded silently.
    Initializing,
    Polling,
}

impl Phase {
    pub fn of(state: &EngineState) -> Self {
        if state.first_run_completed {
            Phase::Polling
        } else {
            Phase::Initializing
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceReport {
    pub source: String,
    pub error: Option<String>,
    pub path: Option<FetchPath>,
    pub fetched: usize,
    pub irrelevant: usize,
    pub unclassified: usize,
    pub duplicates: usize,
    pub new_events: usize,
    pub silent: bool,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub phase: Phase,
    pub sources: Vec<SourceReport>,
    pub events: Vec<Event>,
    pub evicted: usize,
    pub dispatch: DispatchReport,
    pub persisted: bool,
}

impl CycleReport {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}

pub struct Watcher {
    sources: Vec<Box<dyn SourceAdapter>>,
    classifier: Classifier,
    dispatcher: Dispatcher,
    store: StateStore,
    poll_interval: Duration,
    fetch_timeout: Duration,
}

impl Watcher {
    pub fn new(
        sources: Vec<Box<dyn SourceAdapter>>,
        classifier: Classifier,
        dispatcher: Dispatcher,
        store: StateStore,
    ) -> Self {
        Self {
            sources,
            classifier,
            dispatcher,
            store,
            poll_interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_poll_interval(mut self, d: Duration) -> Self {
        self.poll_interval = d;
        self
    }

    /// Upper bound for one source call, on top of the HTTP client's own timeout.
    pub fn with_fetch_timeout(mut self, d: Duration) -> Self {
        self.fetch_timeout = d;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one full cycle against `state`, including dispatch and persistence.
    pub async fn run_cycle(&mut self, state: &mut EngineState) -> CycleReport {
        let phase = Phase::of(state);
        let outcomes = fetch_all(&self.sources, self.fetch_timeout).await;
        let now = Utc::now();

        let mut events = Vec::new();
        let mut reports = Vec::with_capacity(outcomes.len());

        for (outcome, adapter) in outcomes.into_iter().zip(&self.sources) {
            let mut rep = SourceReport {
                source: outcome.source.clone(),
                ..Default::default()
            };
            match outcome.result {
                Err(e) => {
                    // Baseline and seen set stay as they were.
                    rep.error = Some(format!("{e:#}"));
                }
                Ok(Snapshot::Feed { entries, path }) => {
                    rep.path = Some(path);
                    rep.fetched = entries.len();
                    for entry in entries {
                        self.admit_entry(adapter.as_ref(), entry, now, state, &mut rep, &mut events);
                    }
                }
                Ok(Snapshot::Symbols(symbols)) => {
                    rep.fetched = symbols.len();
                    // A source with no baseline yet (first run, or newly
                    // configured) is seeded without announcing its universe.
                    rep.silent =
                        phase == Phase::Initializing || !state.baselines.contains(&rep.source);
                    let diffed = state.baselines.diff(&rep.source, symbols, rep.silent, now);
                    rep.new_events = diffed.len();
                    events.extend(diffed);
                }
            }
            reports.push(rep);
        }

        let evicted = state.seen.evict();

        let dispatch = self.dispatcher.deliver_all(&events).await;

        if phase == Phase::Initializing {
            state.first_run_completed = true;
        }
        let persisted = match self.store.save(state).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %self.store.path().display(), "state save failed: {e:#}");
                false
            }
        };

        counter!("watcher_cycles_total").increment(1);
        counter!("watcher_new_events_total").increment(events.len() as u64);
        gauge!("watcher_seen_size").set(state.seen.len() as f64);
        gauge!("watcher_last_cycle_ts").set(Utc::now().timestamp() as f64);

        CycleReport {
            phase,
            sources: reports,
            events,
            evicted,
            dispatch,
            persisted,
        }
    }

    fn admit_entry(
        &self,
        adapter: &dyn SourceAdapter,
        entry: RawEntry,
        now: chrono::DateTime<Utc>,
        state: &mut EngineState,
        rep: &mut SourceReport,
        out: &mut Vec<Event>,
    ) {
        if !self.classifier.is_futures_relevant(&entry.title) {
            rep.irrelevant += 1;
            tracing::trace!(source = %rep.source, title = %entry.title, "not futures related");
            return;
        }
        let Some(kind) = self.classifier.classify(&entry.title) else {
            rep.unclassified += 1;
            tracing::debug!(source = %rep.source, title = %entry.title, "no listing/delisting keyword");
            return;
        };

        let discriminator = discriminator_for(&entry, adapter.discriminator());
        let ev = Event {
            source: rep.source.clone(),
            title: entry.title,
            url: entry.url,
            observed_at: now,
            published_at: entry.published_at,
            kind,
        };
        if state.seen.insert_if_new(fingerprint(&ev, discriminator.as_deref())) {
            rep.new_events += 1;
            out.push(ev);
        } else {
            rep.duplicates += 1;
        }
    }

    /// Poll until `shutdown` flips to true. Shutdown is only observed between
    /// cycles, so a running cycle always finishes and persists.
    pub async fn run(&mut self, mut state: EngineState, mut shutdown: watch::Receiver<bool>) -> EngineState {
        tracing::info!(
            sources = self.sources.len(),
            interval_secs = self.poll_interval.as_secs(),
            channel = self.dispatcher.channel(),
            "watcher started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            let report = self.run_cycle(&mut state).await;
            log_report(&report);

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        tracing::info!("watcher stopped");
        state
    }
}

pub fn log_report(report: &CycleReport) {
    for s in &report.sources {
        match &s.error {
            Some(e) => tracing::debug!(source = %s.source, error = %e, "source skipped this cycle"),
            None => tracing::debug!(
                source = %s.source,
                path = s.path.map(FetchPath::as_str),
                fetched = s.fetched,
                irrelevant = s.irrelevant,
                unclassified = s.unclassified,
                duplicates = s.duplicates,
                new = s.new_events,
                silent = s.silent,
                "source processed"
            ),
        }
    }
    tracing::info!(
        phase = ?report.phase,
        new_events = report.events.len(),
        sent = report.dispatch.sent,
        failed_sends = report.dispatch.failed,
        failed_sources = report.failed_sources(),
        evicted = report.evicted,
        persisted = report.persisted,
        "cycle done"
    );
}
