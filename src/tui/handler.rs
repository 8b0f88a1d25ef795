//! Async event handler for the interactive pad.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use tokio::sync::mpsc;

use crate::{
    catalog::Catalog,
    config::Config,
    device::{self, DeviceClass},
    pad::{LayoutMode, Pad},
    process::PythonProvider,
    session::{SessionError, SessionManager, TeardownPolicy},
};
use super::{app::App, events::PadEvent, ui::render_ui};

/// Run the interactive pad until the user quits.
pub async fn run_pad(
    cfg: Config,
    catalog: Catalog,
    source: String,
    title: String,
    snippet_index: Option<usize>,
    layout: LayoutMode,
    device_override: Option<DeviceClass>,
) -> Result<()> {
    // Check if we're in a proper terminal environment
    if !io::IsTerminal::is_terminal(&io::stdout()) {
        return Err(anyhow::anyhow!("TUI mode requires a proper terminal environment"));
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let pad = Pad::new(&source, layout);
    let mut app = App::new(pad, catalog, snippet_index, title);

    // Create event channels
    let (event_tx, event_rx) = mpsc::unbounded_channel::<PadEvent>();

    // Resolve the device class off the main loop; the pad stays inert
    // (run control disabled) until the answer arrives.
    let probe_tx = event_tx.clone();
    tokio::spawn(async move {
        let class = match device_override {
            Some(class) => class,
            None => device::classify(&device::probe().await),
        };
        tracing::info!(?class, "device class resolved");
        let _ = probe_tx.send(PadEvent::DeviceResolved(class));
    });

    // Main event loop
    let result = run_app(&mut terminal, &mut app, &cfg, event_tx, event_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    cfg: &Config,
    event_tx: mpsc::UnboundedSender<PadEvent>,
    mut event_rx: mpsc::UnboundedReceiver<PadEvent>,
) -> Result<()> {
    // Keyboard input runs on a plain detached thread so a pending poll
    // cannot hold up runtime shutdown after quit.
    let input_tx = event_tx.clone();
    std::thread::spawn(move || {
        loop {
            // Poll for keyboard events
            if event::poll(Duration::from_millis(100)).unwrap_or(false) {
                if let Ok(Event::Key(key)) = event::read() {
                    if input_tx.send(PadEvent::Key(key)).is_err() {
                        break; // Channel closed
                    }
                }
            }
        }
    });

    // Constructed once the device class resolves.
    let mut manager: Option<Arc<SessionManager>> = None;

    loop {
        // Render UI
        terminal.draw(|frame| render_ui(frame, app))?;

        // Handle events
        if let Ok(pad_event) = event_rx.try_recv() {
            match pad_event {
                PadEvent::Key(key) => {
                    if handle_key_event(app, key, manager.as_ref(), &event_tx) {
                        break; // Quit requested
                    }
                }
                PadEvent::DeviceResolved(class) => {
                    app.set_device(class);
                    let provider = PythonProvider::from_config(cfg);
                    let built = Arc::new(SessionManager::new(
                        Box::new(provider),
                        TeardownPolicy::for_device(class),
                    ));
                    tracing::debug!(policy = ?built.policy(), "session manager constructed");
                    spawn_state_forwarder(&built, event_tx.clone());
                    manager = Some(built);
                }
                PadEvent::SessionState(state) => {
                    app.set_session_state(state);
                }
                PadEvent::RunFinished { seq, result } => {
                    app.finish_run(seq, result);
                }
                PadEvent::RunRejected { seq } => {
                    app.abandon_run(seq);
                }
                PadEvent::RunFailed { seq, error } => {
                    app.fail_run(seq, error);
                }
            }
        }

        // Small delay to prevent busy waiting
        tokio::time::sleep(Duration::from_millis(16)).await; // ~60 FPS
    }

    Ok(())
}

/// Forward session state transitions onto the event loop.
fn spawn_state_forwarder(manager: &Arc<SessionManager>, event_tx: mpsc::UnboundedSender<PadEvent>) {
    let mut state_rx = manager.subscribe();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            if event_tx.send(PadEvent::SessionState(state)).is_err() {
                break; // Channel closed
            }
        }
    });
}

/// Handle keyboard events; returns true when the app should quit
fn handle_key_event(
    app: &mut App,
    key: KeyEvent,
    manager: Option<&Arc<SessionManager>>,
    event_tx: &mpsc::UnboundedSender<PadEvent>,
) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Quit works everywhere, help overlay included
    if ctrl && key.code == KeyCode::Char('c') {
        return true;
    }

    // The help overlay swallows the next key
    if app.show_help {
        app.show_help = false;
        return false;
    }

    match key.code {
        KeyCode::Char('r') if ctrl => {
            start_run(app, manager, event_tx);
        }
        KeyCode::Char('n') if ctrl => {
            app.swap_snippet();
        }
        KeyCode::Char('l') if ctrl => {
            app.reset_output();
        }
        KeyCode::F(1) => {
            app.toggle_help();
        }
        KeyCode::PageUp => {
            app.scroll_output_up();
        }
        KeyCode::PageDown => {
            app.scroll_output_down();
        }
        KeyCode::Up => {
            app.pad.buffer_mut().move_up();
        }
        KeyCode::Down => {
            app.pad.buffer_mut().move_down();
        }
        KeyCode::Left => {
            app.pad.buffer_mut().move_left();
        }
        KeyCode::Right => {
            app.pad.buffer_mut().move_right();
        }
        KeyCode::Home => {
            app.pad.buffer_mut().move_home();
        }
        KeyCode::End => {
            app.pad.buffer_mut().move_end();
        }
        KeyCode::Enter => {
            app.pad.buffer_mut().insert_newline();
        }
        KeyCode::Backspace => {
            app.pad.buffer_mut().backspace();
        }
        KeyCode::Delete => {
            app.pad.buffer_mut().delete();
        }
        KeyCode::Tab => {
            for _ in 0..4 {
                app.pad.buffer_mut().insert_char(' ');
            }
        }
        KeyCode::Char(c) if !ctrl => {
            app.pad.buffer_mut().insert_char(c);
        }
        _ => {}
    }

    false
}

/// Trigger a run and hand it to the session manager in the background.
fn start_run(
    app: &mut App,
    manager: Option<&Arc<SessionManager>>,
    event_tx: &mpsc::UnboundedSender<PadEvent>,
) {
    // No manager yet means the device class is unresolved; the trigger
    // is silently inert, matching the disabled run control.
    let Some(manager) = manager else {
        return;
    };
    let Some(request) = app.request_run() else {
        return;
    };

    let manager = Arc::clone(manager);
    let event_tx = event_tx.clone();
    tokio::spawn(async move {
        match manager.execute(&request.source).await {
            Ok(result) => {
                let _ = event_tx.send(PadEvent::RunFinished {
                    seq: request.seq,
                    result,
                });
            }
            // A snippet swap can remount the pad while the superseded
            // run still holds the session; that rejection renders
            // nothing, it only withdraws the trigger.
            Err(SessionError::Busy) => {
                let _ = event_tx.send(PadEvent::RunRejected { seq: request.seq });
            }
            Err(error) => {
                let _ = event_tx.send(PadEvent::RunFailed {
                    seq: request.seq,
                    error: error.to_string(),
                });
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::pad::RunState;
    use crate::session::{ExecutionResult, InterpreterSession, SessionProvider, SessionState};

    /// Session that parks until released, so a test can hold the
    /// manager mid-run.
    struct ParkedSession {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl InterpreterSession for ParkedSession {
        async fn execute(&mut self, source: &str) -> Result<ExecutionResult, SessionError> {
            self.release.notified().await;
            Ok(ExecutionResult {
                stdout: source.to_string(),
                stderr: String::new(),
            })
        }

        async fn shutdown(&mut self) {}
    }

    struct ParkedProvider {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl SessionProvider for ParkedProvider {
        async fn start(&self) -> Result<Box<dyn InterpreterSession>, SessionError> {
            Ok(Box::new(ParkedSession {
                release: Arc::clone(&self.release),
            }))
        }
    }

    struct RefusingProvider;

    #[async_trait]
    impl SessionProvider for RefusingProvider {
        async fn start(&self) -> Result<Box<dyn InterpreterSession>, SessionError> {
            Err(SessionError::Initialization("no interpreter".into()))
        }
    }

    fn resolved_app(source: &str) -> App {
        let mut app = App::new(
            Pad::new(source, LayoutMode::Stacked),
            Catalog::builtin(),
            None,
            "scratch".to_string(),
        );
        app.set_device(DeviceClass::Capable);
        app
    }

    #[tokio::test]
    async fn busy_rejection_after_a_swap_renders_nothing() {
        let release = Arc::new(Notify::new());
        let manager = Arc::new(SessionManager::new(
            Box::new(ParkedProvider {
                release: Arc::clone(&release),
            }),
            TeardownPolicy::KeepWarm,
        ));
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<PadEvent>();
        let mut app = resolved_app("print(1)");

        let mut states = manager.subscribe();
        start_run(&mut app, Some(&manager), &event_tx);
        // Wait until the first run owns the session.
        while *states.borrow_and_update() != SessionState::Ready {
            states.changed().await.unwrap();
        }

        // Swapping the source remounts the pad, so a fresh trigger is
        // accepted while the superseded run still holds the session.
        app.pad.replace_source("print(2)");
        start_run(&mut app, Some(&manager), &event_tx);

        match event_rx.recv().await.unwrap() {
            PadEvent::RunRejected { seq } => app.abandon_run(seq),
            other => panic!("expected a silent rejection, got {other:?}"),
        }
        assert_eq!(app.pad.state(), RunState::Idle);
        assert!(app.pad.result().is_none());
        assert!(app.pad.run_enabled());

        // The superseded run finishes late; its result is discarded.
        release.notify_one();
        match event_rx.recv().await.unwrap() {
            PadEvent::RunFinished { seq, result } => app.finish_run(seq, result),
            other => panic!("expected the superseded result, got {other:?}"),
        }
        assert_eq!(app.pad.state(), RunState::Idle);
        assert!(app.pad.result().is_none());
    }

    #[tokio::test]
    async fn startup_failure_still_lands_in_the_output_panel() {
        let manager = Arc::new(SessionManager::new(
            Box::new(RefusingProvider),
            TeardownPolicy::KeepWarm,
        ));
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<PadEvent>();
        let mut app = resolved_app("print(1)");

        start_run(&mut app, Some(&manager), &event_tx);
        match event_rx.recv().await.unwrap() {
            PadEvent::RunFailed { seq, error } => app.fail_run(seq, error),
            other => panic!("expected a failure, got {other:?}"),
        }
        assert_eq!(app.pad.state(), RunState::Completed);
        assert!(app.pad.result().unwrap().stderr.contains("failed to start"));
    }
}
