//! # pypad
//!
//! An interactive Python snippet pad for the terminal: one editable
//! source buffer bound to a run/reset control and an output panel,
//! backed by a lazily started Python subprocess.
//!
//! The flow is: Catalog → Pad (buffer + run lifecycle) → SessionManager
//! → Python subprocess → captured stdout/stderr back into the pad.
//!
//! Module map:
//!
//! 1. [`catalog`]: built-in teaching snippets plus JSON catalog files.
//! 2. [`pad`]: the pad state machine with its source buffer, run
//!    lifecycle and captured results. Pure state, no I/O.
//! 3. [`device`]: device classification from platform signals; decides
//!    whether sessions are kept warm or torn down per run.
//! 4. [`session`]: ownership of the shared interpreter session and the
//!    rules for when it starts and when it is torn down.
//! 5. [`process`]: the concrete Python subprocess speaking a JSON-lines
//!    protocol over stdin/stdout.
//! 6. [`tui`]: Ratatui front end; not part of the stable library API.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod device;
pub mod handlers;
pub mod pad;
pub mod process;
pub mod session;
pub mod tui;
