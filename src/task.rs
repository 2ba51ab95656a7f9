// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bookkeeping shared between a running request and whoever started
//! it: the cooperative cancellation flag, the progress counter, the
//! request state, and the observer the request reports to.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

/// A cooperative stop flag.  Clones share the flag.  A child token
/// also reads as cancelled once any of its ancestors is, but
/// cancelling a child leaves its ancestors alone.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Box<CancelToken>>,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// A token that is cancelled by itself, by `self`, or by any
    /// ancestor of `self`.
    pub fn child(&self) -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// Ask every holder to stop.  Calling it again does nothing.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether this token or one of its ancestors has been cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self
                .parent
                .as_ref()
                .map_or(false, |parent| parent.is_cancelled())
    }
}

/// A monotonic `done / total` counter.
#[derive(Debug)]
pub struct Progress {
    done: AtomicUsize,
    total: usize,
}

impl Progress {
    /// A counter expecting `total` steps.
    pub fn new(total: usize) -> Self {
        Progress {
            done: AtomicUsize::new(0),
            total,
        }
    }

    /// Record one finished step and return the new fraction.
    pub fn advance(&self) -> f64 {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        self.ratio(done)
    }

    /// Steps finished so far.
    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    /// Steps expected.
    pub fn total(&self) -> usize {
        self.total
    }

    /// `done / total`, never above one.
    pub fn fraction(&self) -> f64 {
        self.ratio(self.done())
    }

    fn ratio(&self, done: usize) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (done as f64 / self.total as f64).min(1.0)
    }
}

/// Where a request is in its life.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Still working.
    Running,
    /// Every pixel or frame was produced.
    Completed,
    /// Stopped early on request; partial output is kept.
    Cancelled,
    /// Stopped by an error.
    Failed,
}

/// A [`TaskState`] that can be shared across threads.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    /// A cell holding `Running`.
    pub fn new() -> Self {
        StateCell(AtomicU8::new(0))
    }

    /// Current state.
    pub fn get(&self) -> TaskState {
        match self.0.load(Ordering::Acquire) {
            0 => TaskState::Running,
            1 => TaskState::Completed,
            2 => TaskState::Cancelled,
            _ => TaskState::Failed,
        }
    }

    /// Replace the state.
    pub fn set(&self, state: TaskState) {
        let raw = match state {
            TaskState::Running => 0,
            TaskState::Completed => 1,
            TaskState::Cancelled => 2,
            TaskState::Failed => 3,
        };
        self.0.store(raw, Ordering::Release);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        StateCell::new()
    }
}

/// How a render ended.  Cancellation is an outcome, not an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// All pixels were written.
    Completed {
        /// Wall time of the render.
        elapsed_ms: u64,
    },
    /// The render stopped early; pixels already written are kept.
    Cancelled {
        /// Wall time until the workers stopped.
        elapsed_ms: u64,
    },
}

impl RenderOutcome {
    /// The state this outcome leaves the request in.
    pub fn state(&self) -> TaskState {
        match self {
            RenderOutcome::Completed { .. } => TaskState::Completed,
            RenderOutcome::Cancelled { .. } => TaskState::Cancelled,
        }
    }

    /// Wall time of the render.
    pub fn elapsed_ms(&self) -> u64 {
        match *self {
            RenderOutcome::Completed { elapsed_ms } | RenderOutcome::Cancelled { elapsed_ms } => {
                elapsed_ms
            }
        }
    }
}

/// Receives a request's progress.  Called from worker threads.
pub trait RenderObserver: Send + Sync {
    /// A row (or frame) finished; `fraction` is in `[0, 1]`.
    fn on_progress(&self, _fraction: f64) {}

    /// Every pixel is written.  Called once, before the request
    /// returns, and never for a cancelled request.
    fn on_complete(&self, _elapsed_ms: u64) {}
}

/// Ignores everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopObserver;

impl RenderObserver for NoopObserver {}

/// Reports through the `log` facade.
#[derive(Clone, Debug)]
pub struct LogObserver {
    label: String,
}

impl LogObserver {
    /// `label` prefixes every message.
    pub fn new(label: &str) -> Self {
        LogObserver {
            label: label.to_string(),
        }
    }
}

impl RenderObserver for LogObserver {
    fn on_progress(&self, fraction: f64) {
        log::debug!("{}: {:.1}%", self.label, fraction * 100.0);
    }

    fn on_complete(&self, elapsed_ms: u64) {
        log::info!("{}: finished in {} ms", self.label, elapsed_ms);
    }
}
