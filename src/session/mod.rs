//! Ownership of the interpreter session. The session starts lazily on
//! first use and is torn down according to the device policy; at most
//! one execution is in flight at any time.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

use crate::device::DeviceClass;

/// Captured output of one completed execution.
///
/// Faults raised by the executed source are not errors at this level:
/// their traceback arrives in `stderr` and the run still counts as
/// completed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
}

/// Errors raised by the session layer itself.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The interpreter failed to launch or to complete its ready
    /// handshake.
    #[error("interpreter failed to start: {0}")]
    Initialization(String),
    /// Another execution is already in flight; requests are rejected,
    /// never queued.
    #[error("an execution is already in flight")]
    Busy,
    /// Transport failure on the interpreter pipes.
    #[error("interpreter I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The interpreter exited while a reply was expected.
    #[error("interpreter exited unexpectedly")]
    Disconnected,
    /// The interpreter replied with something that is not a result.
    #[error("malformed interpreter reply: {0}")]
    Protocol(String),
}

/// Observable lifecycle of the shared session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No interpreter process exists; the next run starts one.
    Cold,
    /// Startup and handshake in progress.
    Initializing,
    /// A live interpreter is accepting executions.
    Ready,
    /// The last startup attempt failed; the next run retries from Cold.
    Failed,
}

/// A live interpreter instance executing submitted source text.
#[async_trait]
pub trait InterpreterSession: Send {
    async fn execute(&mut self, source: &str) -> Result<ExecutionResult, SessionError>;
    async fn shutdown(&mut self);
}

/// Starts interpreter sessions; the manager's only view of the runtime.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn start(&self) -> Result<Box<dyn InterpreterSession>, SessionError>;
}

/// What happens to the session once a run completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownPolicy {
    /// The session survives across runs; later runs skip initialization
    /// and keep interpreter globals.
    KeepWarm,
    /// The session is shut down after every completed run to bound peak
    /// memory; every run pays the startup cost and sees fresh globals.
    DisposePerRun,
}

impl TeardownPolicy {
    pub fn for_device(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Constrained => Self::DisposePerRun,
            DeviceClass::Capable => Self::KeepWarm,
        }
    }
}

/// Owns at most one interpreter session and serializes access to it.
///
/// The session starts lazily on the first execution, is shared by every
/// caller holding the manager, and is torn down according to the
/// configured [`TeardownPolicy`]. State transitions are published on a
/// watch channel for interested observers.
pub struct SessionManager {
    provider: Box<dyn SessionProvider>,
    policy: TeardownPolicy,
    session: Mutex<Option<Box<dyn InterpreterSession>>>,
    state: watch::Sender<SessionState>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Build a manager around a provider. No interpreter is started
    /// until the first [`execute`](Self::execute) call.
    pub fn new(provider: Box<dyn SessionProvider>, policy: TeardownPolicy) -> Self {
        let (state, _) = watch::channel(SessionState::Cold);
        Self {
            provider,
            policy,
            session: Mutex::new(None),
            state,
        }
    }

    pub fn policy(&self) -> TeardownPolicy {
        self.policy
    }

    /// Subscribe to session state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Execute `source` against the shared session.
    ///
    /// At most one execution runs at a time; a call arriving while
    /// another is in flight fails with [`SessionError::Busy`] instead of
    /// queueing. A failed startup is not retried here: the session stays
    /// down and the next call attempts a fresh start.
    pub async fn execute(&self, source: &str) -> Result<ExecutionResult, SessionError> {
        let mut guard = self.session.try_lock().map_err(|_| SessionError::Busy)?;

        // Take the session out of the slot for the duration of the run;
        // whether it goes back is the teardown decision below.
        let mut session = match guard.take() {
            Some(session) => session,
            None => {
                self.state.send_replace(SessionState::Initializing);
                tracing::debug!("starting interpreter session");
                match self.provider.start().await {
                    Ok(started) => {
                        self.state.send_replace(SessionState::Ready);
                        started
                    }
                    Err(err) => {
                        self.state.send_replace(SessionState::Failed);
                        return Err(err);
                    }
                }
            }
        };

        match session.execute(source).await {
            Ok(result) => {
                if self.policy == TeardownPolicy::DisposePerRun {
                    session.shutdown().await;
                    self.state.send_replace(SessionState::Cold);
                } else {
                    *guard = Some(session);
                }
                Ok(result)
            }
            Err(err) => {
                // The pipe state after a transport fault is unknown, so
                // the session cannot be reused.
                tracing::warn!(error = %err, "discarding interpreter session");
                session.shutdown().await;
                self.state.send_replace(SessionState::Cold);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Counters {
        starts: AtomicUsize,
        executions: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    struct FakeSession {
        counters: Arc<Counters>,
        gate: Option<Arc<Notify>>,
        fail_execute: bool,
    }

    #[async_trait]
    impl InterpreterSession for FakeSession {
        async fn execute(&mut self, source: &str) -> Result<ExecutionResult, SessionError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.counters.executions.fetch_add(1, Ordering::SeqCst);
            if self.fail_execute {
                return Err(SessionError::Disconnected);
            }
            Ok(ExecutionResult {
                stdout: source.to_string(),
                stderr: String::new(),
            })
        }

        async fn shutdown(&mut self) {
            self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeProvider {
        counters: Arc<Counters>,
        gate: Option<Arc<Notify>>,
        failing_starts: AtomicUsize,
        failing_executions: AtomicUsize,
    }

    impl FakeProvider {
        fn new(counters: &Arc<Counters>) -> Self {
            Self {
                counters: Arc::clone(counters),
                gate: None,
                failing_starts: AtomicUsize::new(0),
                failing_executions: AtomicUsize::new(0),
            }
        }
    }

    /// Decrement `counter` if positive; true when a failure was consumed.
    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    #[async_trait]
    impl SessionProvider for FakeProvider {
        async fn start(&self) -> Result<Box<dyn InterpreterSession>, SessionError> {
            if take_one(&self.failing_starts) {
                return Err(SessionError::Initialization("boot failure".into()));
            }
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                counters: Arc::clone(&self.counters),
                gate: self.gate.clone(),
                fail_execute: take_one(&self.failing_executions),
            }))
        }
    }

    #[tokio::test]
    async fn session_starts_lazily_on_first_execute() {
        let counters = Arc::new(Counters::default());
        let manager = SessionManager::new(
            Box::new(FakeProvider::new(&counters)),
            TeardownPolicy::KeepWarm,
        );
        assert_eq!(counters.starts.load(Ordering::SeqCst), 0);

        let result = manager.execute("print(1)").await.unwrap();
        assert_eq!(result.stdout, "print(1)");
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keep_warm_reuses_one_session() {
        let counters = Arc::new(Counters::default());
        let manager = SessionManager::new(
            Box::new(FakeProvider::new(&counters)),
            TeardownPolicy::KeepWarm,
        );

        manager.execute("a").await.unwrap();
        manager.execute("b").await.unwrap();

        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 0);
        assert_eq!(*manager.subscribe().borrow(), SessionState::Ready);
    }

    #[tokio::test]
    async fn dispose_per_run_restarts_every_time() {
        let counters = Arc::new(Counters::default());
        let manager = SessionManager::new(
            Box::new(FakeProvider::new(&counters)),
            TeardownPolicy::DisposePerRun,
        );

        manager.execute("a").await.unwrap();
        manager.execute("b").await.unwrap();

        assert_eq!(counters.starts.load(Ordering::SeqCst), 2);
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 2);
        assert_eq!(*manager.subscribe().borrow(), SessionState::Cold);
    }

    #[tokio::test]
    async fn concurrent_execute_is_rejected_not_queued() {
        let counters = Arc::new(Counters::default());
        let gate = Arc::new(Notify::new());
        let mut provider = FakeProvider::new(&counters);
        provider.gate = Some(Arc::clone(&gate));
        let manager = Arc::new(SessionManager::new(
            Box::new(provider),
            TeardownPolicy::KeepWarm,
        ));

        let first = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.execute("slow").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = manager.execute("eager").await;
        assert!(matches!(second, Err(SessionError::Busy)));

        gate.notify_one();
        let result = first.await.unwrap().unwrap();
        assert_eq!(result.stdout, "slow");
        assert_eq!(counters.executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_start_is_reported_and_retried_on_next_run() {
        let counters = Arc::new(Counters::default());
        let mut provider = FakeProvider::new(&counters);
        provider.failing_starts = AtomicUsize::new(1);
        let manager = SessionManager::new(Box::new(provider), TeardownPolicy::KeepWarm);

        let first = manager.execute("print(1)").await;
        assert!(matches!(first, Err(SessionError::Initialization(_))));
        assert_eq!(*manager.subscribe().borrow(), SessionState::Failed);
        assert_eq!(counters.starts.load(Ordering::SeqCst), 0);

        // Not retried automatically; the next explicit run starts fresh.
        let second = manager.execute("print(1)").await.unwrap();
        assert_eq!(second.stdout, "print(1)");
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        assert_eq!(*manager.subscribe().borrow(), SessionState::Ready);
    }

    #[tokio::test]
    async fn transport_fault_discards_the_session() {
        let counters = Arc::new(Counters::default());
        let mut provider = FakeProvider::new(&counters);
        provider.failing_executions = AtomicUsize::new(1);
        let manager = SessionManager::new(Box::new(provider), TeardownPolicy::KeepWarm);

        let first = manager.execute("x").await;
        assert!(matches!(first, Err(SessionError::Disconnected)));
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(*manager.subscribe().borrow(), SessionState::Cold);

        let second = manager.execute("x").await.unwrap();
        assert_eq!(second.stdout, "x");
        assert_eq!(counters.starts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn policy_follows_device_class() {
        assert_eq!(
            TeardownPolicy::for_device(crate::device::DeviceClass::Constrained),
            TeardownPolicy::DisposePerRun
        );
        assert_eq!(
            TeardownPolicy::for_device(crate::device::DeviceClass::Capable),
            TeardownPolicy::KeepWarm
        );

        // The manager reports the policy it was built with.
        let counters = Arc::new(Counters::default());
        let manager = SessionManager::new(
            Box::new(FakeProvider::new(&counters)),
            TeardownPolicy::for_device(crate::device::DeviceClass::Constrained),
        );
        assert_eq!(manager.policy(), TeardownPolicy::DisposePerRun);
    }
}
