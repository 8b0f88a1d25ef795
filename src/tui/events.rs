//! Event types for the pad's TUI loop.

use crossterm::event::KeyEvent;

use crate::device::DeviceClass;
use crate::session::{ExecutionResult, SessionState};

/// Events multiplexed onto the pad's single event loop.
#[derive(Debug)]
pub enum PadEvent {
    /// User keyboard input.
    Key(KeyEvent),
    /// Device classification finished; the session manager may now be
    /// constructed.
    DeviceResolved(DeviceClass),
    /// The shared session changed lifecycle state.
    SessionState(SessionState),
    /// An accepted run finished with captured output.
    RunFinished { seq: u64, result: ExecutionResult },
    /// The session manager turned a run away because an execution was
    /// already in flight.
    RunRejected { seq: u64 },
    /// An accepted run failed inside the session layer.
    RunFailed { seq: u64, error: String },
}
