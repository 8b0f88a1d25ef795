//! Python subprocess bound to the session interface.
//!
//! The interpreter runs `python3 -u -I -c <bootstrap>`. The bootstrap
//! announces readiness with one JSON line on stdout, then serves one
//! request per line from stdin: it executes the submitted code against a
//! persistent module namespace with stdout/stderr captured, and answers
//! with one JSON result line. Tracebacks from the executed code land in
//! the captured stderr, never on the wire.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::config::Config;
use crate::session::{ExecutionResult, InterpreterSession, SessionError, SessionProvider};

/// Stdin protocol: one request object per line.
#[derive(Serialize)]
struct ExecRequest<'a> {
    code: &'a str,
}

const DEFAULT_PYTHON: &str = "python3";
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Interpreter-side half of the protocol. Replies go through the
/// original stdout handle captured as `wire`; the replaced
/// `sys.stdout`/`sys.stderr` keep executed code (and anything it
/// imports) off the protocol stream. `sys.stdin` is replaced too, so
/// `input()` raises EOFError instead of eating protocol requests.
const BOOTSTRAP: &str = r#"
import io, json, sys, traceback

wire = sys.stdout
feed = sys.stdin
sys.stdout = sys.stderr = io.StringIO()
sys.stdin = io.StringIO()
scope = {"__name__": "__main__"}

def reply(payload):
    wire.write(json.dumps(payload))
    wire.write("\n")
    wire.flush()

reply({"event": "ready"})
while True:
    line = feed.readline()
    if not line:
        break
    line = line.strip()
    if not line:
        continue
    request = json.loads(line)
    out = io.StringIO()
    err = io.StringIO()
    sys.stdout = out
    sys.stderr = err
    try:
        exec(compile(request["code"], "<pad>", "exec"), scope)
    except BaseException:
        traceback.print_exc(file=err)
    reply({"stdout": out.getvalue(), "stderr": err.getvalue()})
"#;

/// Launches Python subprocess sessions.
#[derive(Debug, Clone)]
pub struct PythonProvider {
    python_bin: String,
    startup_timeout: Duration,
}

impl PythonProvider {
    pub fn new(python_bin: impl Into<String>, startup_timeout: Duration) -> Self {
        Self {
            python_bin: python_bin.into(),
            startup_timeout,
        }
    }

    /// Build from `PYPAD_PYTHON` and `PYPAD_STARTUP_TIMEOUT` (seconds).
    pub fn from_config(cfg: &Config) -> Self {
        let python_bin = cfg
            .get("PYPAD_PYTHON")
            .unwrap_or_else(|| DEFAULT_PYTHON.to_string());
        let startup_timeout = cfg
            .get_usize("PYPAD_STARTUP_TIMEOUT")
            .map(|secs| Duration::from_secs(secs as u64))
            .unwrap_or(DEFAULT_STARTUP_TIMEOUT);
        Self::new(python_bin, startup_timeout)
    }
}

#[async_trait]
impl SessionProvider for PythonProvider {
    async fn start(&self) -> Result<Box<dyn InterpreterSession>, SessionError> {
        let mut child = Command::new(&self.python_bin)
            .arg("-u") // unbuffered pipes
            .arg("-I") // isolated: no user site dir, no PYTHON* env vars
            .arg("-c")
            .arg(BOOTSTRAP)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                SessionError::Initialization(format!("failed to spawn {}: {}", self.python_bin, err))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::Initialization("interpreter stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::Initialization("interpreter stdout unavailable".into()))?;
        let mut lines = BufReader::new(stdout).lines();

        // A hung startup must not wedge callers in a loading state
        // forever, so the handshake is bounded.
        let banner = tokio::time::timeout(self.startup_timeout, lines.next_line())
            .await
            .map_err(|_| {
                SessionError::Initialization(format!(
                    "no ready handshake within {:?}",
                    self.startup_timeout
                ))
            })?
            .map_err(|err| SessionError::Initialization(format!("reading ready handshake: {err}")))?
            .ok_or_else(|| {
                SessionError::Initialization("interpreter closed stdout during startup".into())
            })?;

        let banner: serde_json::Value = serde_json::from_str(&banner)
            .map_err(|err| SessionError::Initialization(format!("malformed ready handshake: {err}")))?;
        if banner.get("event").and_then(|v| v.as_str()) != Some("ready") {
            return Err(SessionError::Initialization(format!(
                "unexpected startup message: {banner}"
            )));
        }

        tracing::debug!(python = %self.python_bin, "python session ready");
        Ok(Box::new(PythonSession {
            child,
            stdin,
            lines,
        }))
    }
}

/// One live Python process speaking the line protocol.
pub struct PythonSession {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

#[async_trait]
impl InterpreterSession for PythonSession {
    async fn execute(&mut self, source: &str) -> Result<ExecutionResult, SessionError> {
        // JSON escaping keeps multi-line source on a single wire line.
        let mut request = serde_json::to_string(&ExecRequest { code: source })
            .map_err(|err| SessionError::Protocol(err.to_string()))?;
        request.push('\n');
        self.stdin.write_all(request.as_bytes()).await?;
        self.stdin.flush().await?;

        let reply = self
            .lines
            .next_line()
            .await?
            .ok_or(SessionError::Disconnected)?;
        serde_json::from_str(&reply).map_err(|err| SessionError::Protocol(err.to_string()))
    }

    async fn shutdown(&mut self) {
        // The bootstrap has no shutdown request; kill and reap.
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }
}
