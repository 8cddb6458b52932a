//! Quiescence debouncing for preset writes.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Kind of live change that may need to reach the active preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeSource {
    Selection,
    Volume,
    Order,
    Catalog,
}

/// Quiet period required per change source before a write happens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceWindows {
    pub selection_ms: u64,
    /// Long enough to swallow a slider drag.
    pub volume_ms: u64,
    pub order_ms: u64,
    pub catalog_ms: u64,
}

impl Default for DebounceWindows {
    fn default() -> Self {
        Self {
            selection_ms: 100,
            volume_ms: 800,
            order_ms: 300,
            catalog_ms: 100,
        }
    }
}

impl DebounceWindows {
    pub fn window(&self, source: ChangeSource) -> Duration {
        let ms = match source {
            ChangeSource::Selection => self.selection_ms,
            ChangeSource::Volume => self.volume_ms,
            ChangeSource::Order => self.order_ms,
            ChangeSource::Catalog => self.catalog_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Single pending deadline. Each signal pushes it to at least `now + window`.
#[derive(Debug, Default, Clone)]
pub struct Debouncer {
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&mut self, now: Instant, window: Duration) {
        let candidate = now + window;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing > candidate => existing,
            _ => candidate,
        });
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has passed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Consume the deadline regardless of time.
    pub fn take(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
