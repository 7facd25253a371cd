// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Open documents and their analysis worker.
//!
//! **DDD Context:** Language Service
//!
//! A [`Document`] owns the current text and one background thread that
//! analyzes it. Edits apply to the text immediately; analysis catches up
//! asynchronously. The worker drains every queued edit before it starts a
//! pass (last edit wins) and a newer edit cancels the pass in flight.
//! Readers always see the last published [`AnalysisSnapshot`], which is
//! replaced atomically through a `tokio::sync::watch` channel.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;

use tokio::sync::{oneshot, watch};

use crate::cancellation::{CancellationToken, Cancelled};
use crate::config::AnalysisConfig;
use crate::source_analysis::Span;

use super::incremental::{self, DirtyRegion};
use super::snapshot::AnalysisSnapshot;
use super::{EditError, InternalError, TextEdit};

/// How the analysis triggered by an edit ended.
#[derive(Debug, Clone)]
pub enum SnapshotOutcome {
    /// A snapshot reflecting this edit (and possibly later ones) was
    /// published.
    Committed(Arc<AnalysisSnapshot>),
    /// A later edit arrived first; its outcome covers this one.
    Superseded,
    /// The snapshot failed validation and the previous one stays current.
    Failed(InternalError),
}

impl SnapshotOutcome {
    /// The published snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<&Arc<AnalysisSnapshot>> {
        match self {
            Self::Committed(snapshot) => Some(snapshot),
            Self::Superseded | Self::Failed(_) => None,
        }
    }
}

/// Resolves once the analysis for one edit finishes.
#[derive(Debug)]
pub struct SnapshotHandle {
    version: u64,
    receiver: oneshot::Receiver<SnapshotOutcome>,
}

impl SnapshotHandle {
    /// The document version the edit produced.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Waits for the outcome.
    pub async fn outcome(self) -> SnapshotOutcome {
        self.receiver
            .await
            .unwrap_or(SnapshotOutcome::Failed(InternalError::WorkerStopped))
    }

    /// Blocks the current thread until the outcome is known.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime.
    #[must_use]
    pub fn wait(self) -> SnapshotOutcome {
        self.receiver
            .blocking_recv()
            .unwrap_or(SnapshotOutcome::Failed(InternalError::WorkerStopped))
    }
}

struct Job {
    version: u64,
    text: Arc<str>,
    start: u32,
    end: u32,
    inserted: u32,
    cancel: CancellationToken,
    reply: oneshot::Sender<SnapshotOutcome>,
}

/// An open document: its text plus the latest published analysis.
#[derive(Debug)]
pub struct Document {
    text: Arc<str>,
    version: u64,
    in_flight: CancellationToken,
    jobs: Option<mpsc::Sender<Job>>,
    snapshots: watch::Receiver<Arc<AnalysisSnapshot>>,
    worker: Option<JoinHandle<()>>,
}

impl Document {
    /// Opens a document at version 0, analyzing `text` before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be started.
    pub fn open(text: impl Into<String>, config: AnalysisConfig) -> std::io::Result<Self> {
        Self::spawn(text.into(), config, Checks::default())
    }

    fn spawn(text: String, config: AnalysisConfig, checks: Checks) -> std::io::Result<Self> {
        let text: Arc<str> = text.into();
        let initial = match AnalysisSnapshot::analyze_full(
            0,
            Arc::clone(&text),
            Arc::new(config),
            &CancellationToken::new(),
        ) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(Cancelled) => unreachable!("a fresh token is never cancelled"),
        };

        let (publisher, snapshots) = watch::channel(Arc::clone(&initial));
        let (jobs, queue) = mpsc::channel();
        let worker = Worker {
            published: initial,
            publisher,
            pending: None,
            checks,
        };
        let handle = std::thread::Builder::new()
            .name("snil-analysis".into())
            .spawn(move || worker.run(&queue))?;

        Ok(Self {
            text,
            version: 0,
            in_flight: CancellationToken::new(),
            jobs: Some(jobs),
            snapshots,
            worker: Some(handle),
        })
    }

    /// The current text, including edits not yet analyzed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The number of edits applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The latest published snapshot. Never blocks on a pass in flight.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AnalysisSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// A receiver notified whenever a new snapshot is published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<AnalysisSnapshot>> {
        self.snapshots.clone()
    }

    /// Applies `edit` to the text and schedules its analysis.
    ///
    /// # Errors
    ///
    /// Returns an [`EditError`] and leaves the text unchanged if the edit
    /// range does not fit the current text.
    pub fn apply_edit(&mut self, edit: &TextEdit) -> Result<SnapshotHandle, EditError> {
        let spliced = incremental::splice(&self.text, edit)?;
        let inserted = u32::try_from(edit.text.len()).map_err(|_| EditError::TooLarge)?;
        self.text = spliced.into();
        self.version += 1;

        self.in_flight.cancel();
        self.in_flight = CancellationToken::new();

        let (reply, receiver) = oneshot::channel();
        let job = Job {
            version: self.version,
            text: Arc::clone(&self.text),
            start: edit.span.start(),
            end: edit.span.end(),
            inserted,
            cancel: self.in_flight.clone(),
            reply,
        };
        if let Some(jobs) = &self.jobs {
            // A stopped worker drops the reply, which resolves the handle.
            let _ = jobs.send(job);
        }
        Ok(SnapshotHandle {
            version: self.version,
            receiver,
        })
    }

    /// Replaces the whole text.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::TooLarge`] if the text exceeds 4 GiB.
    pub fn replace_text(&mut self, text: impl Into<String>) -> Result<SnapshotHandle, EditError> {
        let len = u32::try_from(self.text.len()).map_err(|_| EditError::TooLarge)?;
        self.apply_edit(&TextEdit::new(Span::new(0, len), text))
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        self.in_flight.cancel();
        self.jobs = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("analysis worker panicked");
            }
        }
    }
}

/// Edits received but not yet published.
struct Pending {
    version: u64,
    text: Arc<str>,
    region: DirtyRegion,
    cancel: CancellationToken,
    reply: Option<oneshot::Sender<SnapshotOutcome>>,
}

/// Consistency checks a snapshot must pass before it is published.
#[derive(Debug, Clone, Copy, Default)]
struct Checks {
    /// Fails every snapshot, exercising the rejection path.
    #[cfg(test)]
    reject_all: bool,
}

impl Checks {
    fn run(self, snapshot: &AnalysisSnapshot) -> Result<(), InternalError> {
        #[cfg(test)]
        if self.reject_all {
            return Err(InternalError::TreeLengthMismatch {
                tree: snapshot.cst().len(),
                text: u32::MAX,
            });
        }
        snapshot.validate()
    }
}

struct Worker {
    published: Arc<AnalysisSnapshot>,
    publisher: watch::Sender<Arc<AnalysisSnapshot>>,
    pending: Option<Pending>,
    checks: Checks,
}

impl Worker {
    fn run(mut self, queue: &mpsc::Receiver<Job>) {
        while let Ok(job) = queue.recv() {
            self.absorb(job);
            while let Ok(job) = queue.try_recv() {
                self.absorb(job);
            }
            self.pass();
        }
        tracing::debug!("document closed, analysis worker exiting");
    }

    fn absorb(&mut self, job: Job) {
        let pending = match self.pending.take() {
            Some(mut pending) => {
                if let Some(reply) = pending.reply.take() {
                    tracing::trace!(version = pending.version, "edit superseded");
                    let _ = reply.send(SnapshotOutcome::Superseded);
                }
                Pending {
                    region: pending.region.merge(job.start, job.end, job.inserted),
                    version: job.version,
                    text: job.text,
                    cancel: job.cancel,
                    reply: Some(job.reply),
                }
            }
            None => Pending {
                region: DirtyRegion::new(job.start, job.end, job.inserted),
                version: job.version,
                text: job.text,
                cancel: job.cancel,
                reply: Some(job.reply),
            },
        };
        self.pending = Some(pending);
    }

    /// Runs one pass over the pending edits.
    fn pass(&mut self) {
        let Some(pending) = &mut self.pending else {
            return;
        };
        let span = tracing::debug_span!("analysis_pass", version = pending.version);
        let _entered = span.enter();

        let started = std::time::Instant::now();
        let result = incremental::reanalyze(
            &self.published,
            Arc::clone(&pending.text),
            pending.region,
            pending.version,
            &pending.cancel,
        );
        let snapshot = match result {
            Ok((snapshot, stats)) => {
                tracing::debug!(
                    reparsed = stats.reparsed,
                    reused = stats.reused,
                    "incremental pass finished"
                );
                snapshot
            }
            Err(Cancelled) => {
                tracing::debug!("pass cancelled by a newer edit");
                return;
            }
        };

        let checked = match self.checks.run(&snapshot) {
            Ok(()) => Ok(snapshot),
            Err(error) => {
                tracing::warn!(%error, "incremental snapshot failed validation, retrying from scratch");
                match AnalysisSnapshot::analyze_full(
                    pending.version,
                    Arc::clone(&pending.text),
                    self.published.shared_config(),
                    &pending.cancel,
                ) {
                    Ok(full) => self.checks.run(&full).map(|()| full),
                    Err(Cancelled) => {
                        tracing::debug!("full pass cancelled by a newer edit");
                        return;
                    }
                }
            }
        };

        match checked {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                tracing::debug!(elapsed = ?started.elapsed(), "publishing snapshot");
                self.published = Arc::clone(&snapshot);
                self.publisher.send_replace(Arc::clone(&snapshot));
                if let Some(reply) = self.pending.take().and_then(|p| p.reply) {
                    let _ = reply.send(SnapshotOutcome::Committed(snapshot));
                }
            }
            Err(error) => {
                tracing::error!(
                    %error,
                    current = self.published.version(),
                    "snapshot rejected, keeping the previous one"
                );
                if let Some(reply) = pending.reply.take() {
                    let _ = reply.send(SnapshotOutcome::Failed(error));
                }
            }
        }
    }
}
