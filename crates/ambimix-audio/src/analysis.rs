//! Background loudness analysis.
//!
//! Measurement is slow, so it runs on a dedicated thread. The mixing
//! context sends [`AnalysisCommand`]s and later drains [`AnalysisReport`]s
//! from the result channel; the worker never touches sound state itself.
//!
//! ```text
//! ┌───────────────┐   Analyze(id, path)   ┌─────────────────┐
//! │ AudioEngine   │ ────────────────────► │ analysis worker │
//! │ (serialized)  │ ◄──────────────────── │   (thread)      │
//! └───────────────┘   AnalysisReport      └─────────────────┘
//! ```

use ambimix_core::{AmbimixError, LoudnessAnalysis, LoudnessAnalyzer, Result, SoundId};
use crossbeam_channel::{self as channel, Receiver, Sender};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Commands accepted by the worker thread.
pub enum AnalysisCommand {
    Analyze { sound: SoundId, path: PathBuf },
    Shutdown,
}

/// Outcome of one measurement, handed back to the mixing context.
#[derive(Debug)]
pub struct AnalysisReport {
    pub sound: SoundId,
    pub result: Result<LoudnessAnalysis>,
}

/// Handle to the analysis thread.
pub struct AnalysisWorker {
    command_tx: Sender<AnalysisCommand>,
    report_rx: Receiver<AnalysisReport>,
    pending: HashSet<SoundId>,
    thread_handle: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    /// Spawn the worker thread.
    pub fn spawn(analyzer: Arc<dyn LoudnessAnalyzer>) -> Result<Self> {
        let (command_tx, command_rx) = channel::unbounded();
        let (report_tx, report_rx) = channel::unbounded();

        let thread_handle = thread::Builder::new()
            .name("loudness-analysis".to_string())
            .spawn(move || Self::run(analyzer, command_rx, report_tx))?;

        Ok(Self {
            command_tx,
            report_rx,
            pending: HashSet::new(),
            thread_handle: Some(thread_handle),
        })
    }

    fn run(
        analyzer: Arc<dyn LoudnessAnalyzer>,
        command_rx: Receiver<AnalysisCommand>,
        report_tx: Sender<AnalysisReport>,
    ) {
        info!("Loudness analysis worker started");
        while let Ok(cmd) = command_rx.recv() {
            match cmd {
                AnalysisCommand::Analyze { sound, path } => {
                    debug!(sound = %sound, path = %path.display(), "Analyzing loudness");
                    let result = analyzer.analyze(&path);
                    if report_tx.send(AnalysisReport { sound, result }).is_err() {
                        break;
                    }
                }
                AnalysisCommand::Shutdown => break,
            }
        }
        info!("Loudness analysis worker stopped");
    }

    /// Queue a measurement. Duplicate requests for a sound still in flight
    /// are dropped. Returns whether a new request was queued.
    pub fn request(&mut self, sound: SoundId, path: PathBuf) -> bool {
        if !self.pending.insert(sound) {
            return false;
        }
        if self
            .command_tx
            .send(AnalysisCommand::Analyze { sound, path })
            .is_err()
        {
            warn!(sound = %sound, "Analysis worker is gone; request dropped");
            self.pending.remove(&sound);
            return false;
        }
        true
    }

    pub fn is_pending(&self, sound: SoundId) -> bool {
        self.pending.contains(&sound)
    }

    /// Collect every finished report without blocking.
    pub fn drain(&mut self) -> Vec<AnalysisReport> {
        let reports: Vec<AnalysisReport> = self.report_rx.try_iter().collect();
        for report in &reports {
            self.pending.remove(&report.sound);
        }
        reports
    }

    /// Block up to `timeout` for the next report.
    pub fn wait(&mut self, timeout: Duration) -> Option<AnalysisReport> {
        let report = self.report_rx.recv_timeout(timeout).ok()?;
        self.pending.remove(&report.sound);
        Some(report)
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        let _ = self.command_tx.send(AnalysisCommand::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Analyzer used when no measurement backend is configured; every request
/// fails so sounds simply stay at unity normalization.
#[derive(Debug, Default)]
pub struct UnavailableAnalyzer;

impl LoudnessAnalyzer for UnavailableAnalyzer {
    fn analyze(&self, path: &std::path::Path) -> Result<LoudnessAnalysis> {
        Err(AmbimixError::ResourceUnavailable(format!(
            "no loudness analyzer for {}",
            path.display()
        )))
    }
}
