//! TUI application state management.

use crate::catalog::Catalog;
use crate::device::DeviceClass;
use crate::pad::{Pad, RunRequest, RunState};
use crate::session::{ExecutionResult, SessionState};

/// Application state for the TUI.
#[derive(Debug)]
pub struct App {
    /// The pad being displayed and edited.
    pub pad: Pad,
    /// Snippet catalog for swaps.
    pub catalog: Catalog,
    /// Catalog index of the current source, None when loaded from a file.
    pub snippet_index: Option<usize>,
    /// Title shown over the editor.
    pub source_title: String,
    /// Device class, None until the probe resolves.
    pub device: Option<DeviceClass>,
    /// Latest observed session state.
    pub session_state: SessionState,
    /// Status line at the bottom of the screen.
    pub status_message: String,
    /// Whether the help overlay is shown.
    pub show_help: bool,
    /// Scroll offset into the output panel, in lines from the top.
    pub output_scroll: usize,
}

impl App {
    pub fn new(pad: Pad, catalog: Catalog, snippet_index: Option<usize>, source_title: String) -> Self {
        let mut app = Self {
            pad,
            catalog,
            snippet_index,
            source_title,
            device: None,
            session_state: SessionState::Cold,
            status_message: String::new(),
            show_help: false,
            output_scroll: 0,
        };
        app.update_status_message();
        app
    }

    /// Record the resolved device class. Until this happens the run
    /// control is inert.
    pub fn set_device(&mut self, class: DeviceClass) {
        self.device = Some(class);
        self.update_status_message();
    }

    /// Record a session state transition; a pad waiting in Loading
    /// proceeds to Running when the session turns Ready.
    pub fn set_session_state(&mut self, state: SessionState) {
        self.session_state = state;
        if state == SessionState::Ready {
            self.pad.notify_session_ready();
        }
        self.update_status_message();
    }

    /// Ask the pad to accept a run. None when the device class has not
    /// resolved yet or a run is already underway.
    pub fn request_run(&mut self) -> Option<RunRequest> {
        if self.device.is_none() {
            return None;
        }
        let ready = self.session_state == SessionState::Ready;
        let request = self.pad.request_run(ready);
        if request.is_some() {
            self.output_scroll = 0;
            self.update_status_message();
        }
        request
    }

    /// Deliver a finished run to the pad.
    pub fn finish_run(&mut self, seq: u64, result: ExecutionResult) {
        if self.pad.complete_run(seq, result) {
            self.output_scroll = 0;
        } else {
            tracing::debug!(seq, "discarding result from a superseded run");
        }
        self.update_status_message();
    }

    /// Deliver a session-level failure to the pad.
    pub fn fail_run(&mut self, seq: u64, error: String) {
        if !self.pad.fail_run(seq, error) {
            tracing::debug!(seq, "discarding failure from a superseded run");
        }
        self.update_status_message();
    }

    /// Withdraw a run the session manager turned away while a
    /// superseded execution was still finishing. Nothing is rendered;
    /// the pad returns to Idle exactly as for a refused trigger.
    pub fn abandon_run(&mut self, seq: u64) {
        if self.pad.abandon_run(seq) {
            tracing::debug!(seq, "run turned away, session still busy");
        } else {
            tracing::debug!(seq, "discarding rejection for a superseded run");
        }
        self.update_status_message();
    }

    /// Clear the output panel.
    pub fn reset_output(&mut self) {
        self.pad.reset();
        self.output_scroll = 0;
        self.update_status_message();
    }

    /// Swap the pad to a random different catalog snippet.
    pub fn swap_snippet(&mut self) {
        let Some(index) = self.catalog.pick_different(self.snippet_index) else {
            return;
        };
        let Some(snippet) = self.catalog.get(index).cloned() else {
            return;
        };
        self.pad.replace_source(&snippet.source);
        self.snippet_index = Some(index);
        self.source_title = snippet.title;
        self.output_scroll = 0;
        self.update_status_message();
    }

    /// Toggle help display.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn scroll_output_up(&mut self) {
        if self.output_scroll > 0 {
            self.output_scroll -= 1;
        }
    }

    /// Scroll down; the renderer clamps against the real line count.
    pub fn scroll_output_down(&mut self) {
        self.output_scroll += 1;
    }

    fn update_status_message(&mut self) {
        let state = if self.device.is_none() {
            "detecting device"
        } else {
            match self.pad.state() {
                RunState::Loading => "starting interpreter",
                RunState::Running => "running",
                RunState::Idle | RunState::Completed => match self.session_state {
                    SessionState::Initializing => "starting interpreter",
                    SessionState::Ready => "session warm",
                    SessionState::Failed => "interpreter failed, ctrl+r retries",
                    SessionState::Cold => "idle",
                },
            }
        };
        let device = match self.device {
            Some(DeviceClass::Constrained) => " (constrained: fresh session per run)",
            Some(DeviceClass::Capable) | None => "",
        };
        self.status_message = format!(
            "{state}{device} | ctrl+r run, ctrl+n snippet, ctrl+l clear | F1 help, ctrl+c quit"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pad::LayoutMode;

    fn unresolved_app() -> App {
        App::new(
            Pad::new("print('hi')\n", LayoutMode::Stacked),
            Catalog::builtin(),
            Some(0),
            "greeting".to_string(),
        )
    }

    #[test]
    fn run_control_is_inert_until_the_device_resolves() {
        let mut app = unresolved_app();

        assert!(app.request_run().is_none());
        assert_eq!(app.pad.state(), RunState::Idle);
        assert!(app.status_message.contains("detecting device"));

        app.set_device(DeviceClass::Capable);
        let request = app
            .request_run()
            .expect("a resolved device accepts the trigger");
        // The refused trigger must not have burned a sequence number.
        assert_eq!(request.seq, 0);
        assert_eq!(app.pad.state(), RunState::Loading);
    }
}
