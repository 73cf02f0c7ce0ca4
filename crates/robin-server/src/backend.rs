//! Process backend capability
//!
//! The supervisor never touches the OS directly: spawning, descendant
//! enumeration, and termination go through [`ProcessBackend`] so the
//! state machine is testable against a fake backend instead of real
//! processes.

use std::path::Path;
use std::process::Stdio;

use sysinfo::{Pid, ProcessesToUpdate, Signal, System};
use tokio::process::Command;
use tokio::sync::oneshot;

use robin_core::prelude::*;

/// A worker handed back by [`ProcessBackend::spawn`].
///
/// `exited` resolves with the real exit code once the OS reaps the
/// process (or `None` when no code is available).
#[derive(Debug)]
pub struct SpawnedWorker {
    pub pid: u32,
    pub exited: oneshot::Receiver<Option<i32>>,
}

/// Capability interface over the OS process table.
#[trait_variant::make(ProcessBackend: Send)]
pub trait LocalProcessBackend {
    /// Launch the worker as an independent process. Success means
    /// "launch accepted", not "worker ready".
    async fn spawn(&self, program: &Path, args: &[String]) -> Result<SpawnedWorker>;

    /// All transitive descendants of `pid`, in discovery order.
    async fn descendants(&self, pid: u32) -> Vec<u32>;

    /// Terminate one process. A pid that is already gone is a success.
    async fn terminate(&self, pid: u32) -> Result<()>;
}

/// The real backend: tokio for spawning, sysinfo for the process table.
#[derive(Debug, Clone, Default)]
pub struct OsBackend;

impl OsBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessBackend for OsBackend {
    async fn spawn(&self, program: &Path, args: &[String]) -> Result<SpawnedWorker> {
        info!("Spawning worker: {} {}", program.display(), args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::WorkerNotFound {
                        path: program.to_path_buf(),
                    }
                } else {
                    Error::process_spawn(e.to_string())
                }
            })?;

        let pid = child
            .id()
            .ok_or_else(|| Error::process_spawn("worker exited before a pid was assigned"))?;
        info!("Worker process started with PID: {}", pid);

        let (exit_tx, exit_rx) = oneshot::channel();

        // Dedicated wait task owns the child: the OS reaps it correctly
        // and the real exit code reaches the supervisor.
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => {
                    info!("Worker process exited with status: {:?}", status);
                    status.code()
                }
                Err(e) => {
                    error!("Error waiting for worker process: {}", e);
                    None
                }
            };
            let _ = exit_tx.send(code);
        });

        Ok(SpawnedWorker {
            pid,
            exited: exit_rx,
        })
    }

    async fn descendants(&self, pid: u32) -> Vec<u32> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All);

        // Transitive walk over parent links, breadth-first.
        let mut result = Vec::new();
        let mut frontier = vec![Pid::from_u32(pid)];
        while let Some(parent) = frontier.pop() {
            for (child_pid, process) in system.processes() {
                if process.parent() == Some(parent) {
                    result.push(child_pid.as_u32());
                    frontier.push(*child_pid);
                }
            }
        }
        result
    }

    async fn terminate(&self, pid: u32) -> Result<()> {
        let target = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[target]));

        let Some(process) = system.process(target) else {
            debug!("Process {} already gone", pid);
            return Ok(());
        };

        let delivered = process
            .kill_with(Signal::Term)
            .unwrap_or_else(|| process.kill());
        if delivered {
            debug!("Sent termination signal to {}", pid);
            Ok(())
        } else {
            Err(Error::terminate(pid, "signal delivery failed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[tokio::test]
    async fn test_spawn_missing_program() {
        let backend = OsBackend::new();
        let result =
            ProcessBackend::spawn(&backend, Path::new("/nonexistent/robin-worker"), &[]).await;
        assert!(matches!(result, Err(Error::WorkerNotFound { .. })));
    }

    #[tokio::test]
    async fn test_spawn_reports_exit_code() {
        let backend = OsBackend::new();
        let worker = ProcessBackend::spawn(
            &backend,
            &PathBuf::from("sh"),
            &["-c".to_string(), "exit 42".to_string()],
        )
        .await
        .expect("sh must be available in test environment");

        let code = tokio::time::timeout(Duration::from_secs(5), worker.exited)
            .await
            .expect("exit not reported")
            .expect("exit channel dropped");
        assert_eq!(code, Some(42));
    }

    #[tokio::test]
    async fn test_terminate_long_running_process() {
        let backend = OsBackend::new();
        let worker = ProcessBackend::spawn(
            &backend,
            &PathBuf::from("sh"),
            &["-c".to_string(), "sleep 60".to_string()],
        )
        .await
        .unwrap();

        ProcessBackend::terminate(&backend, worker.pid).await.unwrap();

        let code = tokio::time::timeout(Duration::from_secs(5), worker.exited)
            .await
            .expect("terminated process never reaped")
            .expect("exit channel dropped");
        // Killed by signal: no exit code on unix.
        assert_eq!(code, None);
    }

    #[tokio::test]
    async fn test_terminate_gone_pid_is_ok() {
        let backend = OsBackend::new();
        // Pids this high are vanishingly unlikely to exist.
        assert!(ProcessBackend::terminate(&backend, u32::MAX - 7).await.is_ok());
    }

    #[tokio::test]
    async fn test_descendants_of_leaf_process() {
        let backend = OsBackend::new();
        let worker = ProcessBackend::spawn(
            &backend,
            &PathBuf::from("sh"),
            &["-c".to_string(), "sleep 5".to_string()],
        )
        .await
        .unwrap();

        let descendants = ProcessBackend::descendants(&backend, worker.pid).await;
        assert!(descendants.is_empty(), "sleep has no children");

        ProcessBackend::terminate(&backend, worker.pid).await.unwrap();
    }
}
