//! Worker process supervisor
//!
//! Owns the single [`SupervisedState`] and is its only writer. All three
//! operations (start, stop, health) serialize on one mutex, so two
//! concurrent start requests can never both spawn a worker.
//!
//! State machine: `Stopped --start--> Starting --worker reports running-->
//! Running --stop|crash--> Stopped`, with `Starting --spawn failure-->
//! Error --stop (acknowledge)--> Stopped`.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};

use robin_core::events::{StatusEvent, SystemStatus};
use robin_core::prelude::*;

use crate::backend::ProcessBackend;
use crate::broadcast::StatusBroadcaster;

#[derive(Debug)]
struct SupervisedState {
    status: SystemStatus,
    pid: Option<u32>,
}

/// Lifecycle owner for at most one detection worker at a time.
pub struct Supervisor<B> {
    backend: B,
    broadcaster: StatusBroadcaster,
    worker_path: PathBuf,
    state: Arc<Mutex<SupervisedState>>,
}

impl<B: ProcessBackend + 'static> Supervisor<B> {
    pub fn new(backend: B, broadcaster: StatusBroadcaster, worker_path: PathBuf) -> Self {
        Self {
            backend,
            broadcaster,
            worker_path,
            state: Arc::new(Mutex::new(SupervisedState {
                status: SystemStatus::Stopped,
                pid: None,
            })),
        }
    }

    /// Launch the worker with the given driver name.
    ///
    /// Rejects with [`Error::AlreadyRunning`] unless the supervisor is
    /// Stopped (or acknowledging an Error). Success means the launch was
    /// accepted, not that the worker is ready; the transition to Running
    /// happens when the worker reports it.
    pub async fn start(&self, driver_name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if !matches!(state.status, SystemStatus::Stopped | SystemStatus::Error) {
            return Err(Error::AlreadyRunning);
        }

        let args = vec![driver_name.to_string()];
        let spawned = match self.backend.spawn(&self.worker_path, &args).await {
            Ok(spawned) => spawned,
            Err(e @ Error::WorkerNotFound { .. }) => {
                // Nothing was launched; the supervisor state is untouched.
                return Err(e);
            }
            Err(e) => {
                error!("Worker spawn failed: {}", e);
                state.status = SystemStatus::Error;
                drop(state);
                self.broadcaster
                    .publish(StatusEvent::SystemStatus(SystemStatus::Error));
                return Err(e);
            }
        };

        state.pid = Some(spawned.pid);
        state.status = SystemStatus::Starting;
        drop(state);

        self.broadcaster
            .publish(StatusEvent::SystemStatus(SystemStatus::Starting));

        // Crash watch: any exit not initiated through stop() must still
        // return the supervisor to Stopped.
        tokio::spawn(watch_worker_exit(
            Arc::clone(&self.state),
            self.broadcaster.clone(),
            spawned.pid,
            spawned.exited,
        ));

        Ok(())
    }

    /// Terminate the worker and everything it spawned.
    ///
    /// A no-op success when nothing is running. Descendants are
    /// terminated before the tracked pid, since tearing the parent down first
    /// can leave orphans. Individual termination failures are reported
    /// but the bookkeeping is still forced to Stopped: the supervisor
    /// must never keep believing in a process that may already be gone.
    ///
    /// Returns whether a worker was actually running.
    pub async fn stop(&self) -> Result<bool> {
        let mut state = self.state.lock().await;

        let Some(pid) = state.pid else {
            if state.status != SystemStatus::Stopped {
                // Acknowledge a lingering Error state.
                state.status = SystemStatus::Stopped;
                drop(state);
                self.broadcaster
                    .publish(StatusEvent::SystemStatus(SystemStatus::Stopped));
            }
            return Ok(false);
        };

        let descendants = self.backend.descendants(pid).await;
        info!(
            "Stopping worker {} ({} descendant(s))",
            pid,
            descendants.len()
        );

        for child in descendants {
            if let Err(e) = self.backend.terminate(child).await {
                warn!("Failed to terminate descendant {}: {}", child, e);
            }
        }
        if let Err(e) = self.backend.terminate(pid).await {
            warn!("Failed to terminate worker {}: {}", pid, e);
        }

        state.pid = None;
        state.status = SystemStatus::Stopped;
        drop(state);

        self.broadcaster
            .publish(StatusEvent::SystemStatus(SystemStatus::Stopped));
        Ok(true)
    }

    /// Current status, no side effects.
    pub async fn health(&self) -> SystemStatus {
        self.state.lock().await.status
    }

    /// Fold a worker-reported status into the bookkeeping. Only the
    /// Starting → Running transition is trusted from the worker; actual
    /// exits are observed by the crash watch, not reported statuses.
    pub async fn note_worker_status(&self, status: SystemStatus) {
        let mut state = self.state.lock().await;
        if status == SystemStatus::Running && state.status == SystemStatus::Starting {
            info!("Worker reported running");
            state.status = SystemStatus::Running;
        }
    }
}

/// Waits for the worker to exit and returns the supervisor to Stopped,
/// unless stop() already cleared the slot (or a newer worker took it).
async fn watch_worker_exit(
    state: Arc<Mutex<SupervisedState>>,
    broadcaster: StatusBroadcaster,
    pid: u32,
    exited: oneshot::Receiver<Option<i32>>,
) {
    let code = exited.await.ok().flatten();

    let mut state = state.lock().await;
    if state.pid != Some(pid) {
        // stop() got here first, or this watch is stale.
        return;
    }

    match code {
        Some(0) => info!("Worker {} exited cleanly", pid),
        other => warn!("Worker {} exited with code {:?}", pid, other),
    }

    state.pid = None;
    state.status = SystemStatus::Stopped;
    drop(state);

    broadcaster.publish(StatusEvent::SystemStatus(SystemStatus::Stopped));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeBackend;
    use std::time::Duration;

    fn test_supervisor(backend: FakeBackend) -> Arc<Supervisor<FakeBackend>> {
        Arc::new(Supervisor::new(
            backend,
            StatusBroadcaster::new(),
            PathBuf::from("/opt/robin/robin-worker"),
        ))
    }

    #[tokio::test]
    async fn test_start_passes_driver_name() {
        let backend = FakeBackend::new();
        let supervisor = test_supervisor(backend.clone());

        supervisor.start("Ken").await.unwrap();

        let spawns = backend.spawns();
        assert_eq!(spawns.len(), 1);
        assert_eq!(spawns[0].1, vec!["Ken".to_string()]);
        assert_eq!(supervisor.health().await, SystemStatus::Starting);
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let backend = FakeBackend::new();
        let supervisor = test_supervisor(backend.clone());

        supervisor.start("Ken").await.unwrap();
        let err = supervisor.start("Ken").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning));
        assert_eq!(backend.spawns().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_starts_spawn_exactly_once() {
        let backend = FakeBackend::new();
        let supervisor = test_supervisor(backend.clone());

        let (a, b) = tokio::join!(supervisor.start("Ken"), supervisor.start("Ken"));
        assert_ne!(a.is_ok(), b.is_ok(), "exactly one start must win");
        assert_eq!(backend.spawns().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_when_stopped_is_a_quiet_success() {
        let backend = FakeBackend::new();
        let supervisor = test_supervisor(backend.clone());

        let was_running = supervisor.stop().await.unwrap();
        assert!(!was_running);
        assert!(backend.terminated().is_empty());
        assert_eq!(supervisor.health().await, SystemStatus::Stopped);
    }

    #[tokio::test]
    async fn test_stop_terminates_descendants_first() {
        let backend = FakeBackend::new();
        backend.set_descendants(vec![201, 202]);
        let supervisor = test_supervisor(backend.clone());

        supervisor.start("Ken").await.unwrap();
        let pid = backend.last_pid().unwrap();

        let was_running = supervisor.stop().await.unwrap();
        assert!(was_running);
        assert_eq!(backend.terminated(), vec![201, 202, pid]);
        assert_eq!(supervisor.health().await, SystemStatus::Stopped);
    }

    #[tokio::test]
    async fn test_stop_forces_stopped_despite_termination_failure() {
        let backend = FakeBackend::new();
        backend.set_descendants(vec![201, 202]);
        backend.fail_termination_of(201);
        let supervisor = test_supervisor(backend.clone());

        supervisor.start("Ken").await.unwrap();
        let pid = backend.last_pid().unwrap();

        supervisor.stop().await.unwrap();
        // The stubborn descendant was attempted, the rest still went
        // down, and the bookkeeping is Stopped regardless.
        assert_eq!(backend.terminated(), vec![202, pid]);
        assert_eq!(supervisor.health().await, SystemStatus::Stopped);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let backend = FakeBackend::new();
        let supervisor = test_supervisor(backend.clone());

        supervisor.start("Ken").await.unwrap();
        supervisor.stop().await.unwrap();
        supervisor.start("Ada").await.unwrap();
        assert_eq!(backend.spawns().len(), 2);
    }

    #[tokio::test]
    async fn test_spawn_failure_enters_error_then_acknowledges() {
        let backend = FakeBackend::new();
        backend.fail_next_spawn("out of memory");
        let supervisor = test_supervisor(backend.clone());

        let err = supervisor.start("Ken").await.unwrap_err();
        assert!(matches!(err, Error::ProcessSpawn { .. }));
        assert_eq!(supervisor.health().await, SystemStatus::Error);

        // stop() acknowledges Error back to Stopped, and start works again.
        supervisor.stop().await.unwrap();
        assert_eq!(supervisor.health().await, SystemStatus::Stopped);
        supervisor.start("Ken").await.unwrap();
    }

    #[tokio::test]
    async fn test_crash_returns_to_stopped() {
        let backend = FakeBackend::new();
        let supervisor = test_supervisor(backend.clone());

        supervisor.start("Ken").await.unwrap();
        let pid = backend.last_pid().unwrap();

        backend.trigger_exit(pid, Some(1));

        // The crash watch runs on a spawned task; give it a beat.
        for _ in 0..50 {
            if supervisor.health().await == SystemStatus::Stopped {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("crash did not return supervisor to Stopped");
    }

    #[tokio::test]
    async fn test_worker_running_report_promotes_status() {
        let backend = FakeBackend::new();
        let supervisor = test_supervisor(backend.clone());

        supervisor.start("Ken").await.unwrap();
        supervisor.note_worker_status(SystemStatus::Running).await;
        assert_eq!(supervisor.health().await, SystemStatus::Running);

        // Reports never move a stopped supervisor.
        supervisor.stop().await.unwrap();
        supervisor.note_worker_status(SystemStatus::Running).await;
        assert_eq!(supervisor.health().await, SystemStatus::Stopped);
    }
}
