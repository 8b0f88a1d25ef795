//! The interactive pad: an editable source buffer, a run/reset control
//! and an output panel, bound by a four-state run lifecycle.
//!
//! This is pure state with no I/O. A host wires it to a
//! [`SessionManager`](crate::session::SessionManager) by forwarding the
//! [`RunRequest`] returned from [`Pad::request_run`] and feeding the
//! outcome back through [`Pad::complete_run`].

mod buffer;

pub use buffer::SourceBuffer;

use crate::session::ExecutionResult;

/// Lifecycle of the pad's current execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run triggered since mount (or since the last reset).
    Idle,
    /// A run was accepted but the session is still initializing.
    Loading,
    /// A run is in flight against a ready session.
    Running,
    /// The last run finished; its result is displayed.
    Completed,
}

/// How the editor and the output panel share the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Output below the editor.
    Stacked,
    /// Output to the right of the editor.
    SideBySide,
}

impl LayoutMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "stacked" => Some(Self::Stacked),
            "side" | "side-by-side" => Some(Self::SideBySide),
            _ => None,
        }
    }
}

/// An accepted run: the buffer text captured at the moment of the
/// trigger, tagged with a sequence number so late results from a
/// superseded run can be told apart from the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub seq: u64,
    pub source: String,
}

/// One pad instance.
#[derive(Debug)]
pub struct Pad {
    buffer: SourceBuffer,
    layout: LayoutMode,
    state: RunState,
    result: Option<ExecutionResult>,
    next_seq: u64,
    active_seq: Option<u64>,
}

impl Pad {
    /// Build a pad around `source`; trailing whitespace is trimmed here,
    /// once, and never again.
    pub fn new(source: &str, layout: LayoutMode) -> Self {
        Self {
            buffer: SourceBuffer::from_source(source),
            layout,
            state: RunState::Idle,
            result: None,
            next_seq: 0,
            active_seq: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub fn buffer(&self) -> &SourceBuffer {
        &self.buffer
    }

    /// Edits are allowed in every state; they only affect the next run,
    /// never output already displayed.
    pub fn buffer_mut(&mut self) -> &mut SourceBuffer {
        &mut self.buffer
    }

    /// The result of the last completed run, while it is displayed.
    pub fn result(&self) -> Option<&ExecutionResult> {
        self.result.as_ref()
    }

    /// True when a new run may be triggered.
    pub fn run_enabled(&self) -> bool {
        !matches!(self.state, RunState::Loading | RunState::Running)
    }

    /// Accept a run trigger, capturing the current buffer text.
    ///
    /// Returns `None` while a run is already loading or in flight:
    /// repeated triggers are rejected, never queued. A run accepted from
    /// `Completed` discards the displayed result.
    pub fn request_run(&mut self, session_ready: bool) -> Option<RunRequest> {
        if !self.run_enabled() {
            return None;
        }
        self.result = None;
        self.state = if session_ready {
            RunState::Running
        } else {
            RunState::Loading
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.active_seq = Some(seq);
        Some(RunRequest {
            seq,
            source: self.buffer.text(),
        })
    }

    /// Move from `Loading` to `Running` once the session reports ready.
    pub fn notify_session_ready(&mut self) {
        if self.state == RunState::Loading {
            self.state = RunState::Running;
        }
    }

    /// Deliver the result for run `seq`.
    ///
    /// A stale sequence number means the run was superseded (the source
    /// was swapped while it was in flight); its result is discarded.
    /// Returns whether the result was kept.
    pub fn complete_run(&mut self, seq: u64, result: ExecutionResult) -> bool {
        if self.active_seq != Some(seq) {
            return false;
        }
        self.active_seq = None;
        self.state = RunState::Completed;
        self.result = Some(result);
        true
    }

    /// Deliver a session-level failure for run `seq` as an error-only
    /// result, so it displays like any other stderr output.
    pub fn fail_run(&mut self, seq: u64, message: String) -> bool {
        self.complete_run(
            seq,
            ExecutionResult {
                stdout: String::new(),
                stderr: message,
            },
        )
    }

    /// Withdraw run `seq` without rendering anything, returning to
    /// `Idle` as if the trigger had been refused outright. For the host
    /// to call when the session manager turns a run away because a
    /// superseded execution still occupies the session.
    ///
    /// A stale sequence number is ignored, like a stale result.
    /// Returns whether the run was withdrawn.
    pub fn abandon_run(&mut self, seq: u64) -> bool {
        if self.active_seq != Some(seq) {
            return false;
        }
        self.active_seq = None;
        self.state = RunState::Idle;
        true
    }

    /// Clear the output panel and return to `Idle`. The buffer, edits
    /// included, is left untouched. Does not abort an in-flight run.
    pub fn reset(&mut self) {
        if self.state == RunState::Completed {
            self.state = RunState::Idle;
            self.result = None;
        }
    }

    /// Swap in new source, equivalent to remounting the pad: a fresh
    /// trimmed buffer, `Idle`, no result, and any in-flight run
    /// invalidated so its late result will be discarded.
    pub fn replace_source(&mut self, source: &str) {
        self.buffer = SourceBuffer::from_source(source);
        self.state = RunState::Idle;
        self.result = None;
        self.active_seq = None;
    }
}
