//! Fake process backend for supervisor and control-plane tests
//!
//! Operates at the capability level, not the process level: no real
//! processes are spawned. The fake records spawn/terminate calls in
//! order, hands out sequential pids, and lets a test script descendant
//! sets, termination failures, and worker exits.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use robin_core::prelude::*;

use crate::backend::{ProcessBackend, SpawnedWorker};

#[derive(Default)]
struct FakeState {
    next_pid: u32,
    spawns: Vec<(PathBuf, Vec<String>)>,
    terminated: Vec<u32>,
    descendants: Vec<u32>,
    failing_pids: HashSet<u32>,
    spawn_failure: Option<String>,
    exit_txs: HashMap<u32, oneshot::Sender<Option<i32>>>,
}

/// Recording, scriptable [`ProcessBackend`].
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                next_pid: 100,
                ..FakeState::default()
            })),
        }
    }

    /// Make the next spawn fail with the given reason.
    pub fn fail_next_spawn(&self, reason: impl Into<String>) {
        self.state.lock().unwrap().spawn_failure = Some(reason.into());
    }

    /// Descendant pids reported for any tracked pid.
    pub fn set_descendants(&self, pids: Vec<u32>) {
        self.state.lock().unwrap().descendants = pids;
    }

    /// Make termination of one pid fail.
    pub fn fail_termination_of(&self, pid: u32) {
        self.state.lock().unwrap().failing_pids.insert(pid);
    }

    /// Simulate the worker exiting on its own.
    pub fn trigger_exit(&self, pid: u32, code: Option<i32>) {
        if let Some(tx) = self.state.lock().unwrap().exit_txs.remove(&pid) {
            let _ = tx.send(code);
        }
    }

    /// Every spawn call, in order: (program, args).
    pub fn spawns(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.state.lock().unwrap().spawns.clone()
    }

    /// Every successful terminate call, in order.
    pub fn terminated(&self) -> Vec<u32> {
        self.state.lock().unwrap().terminated.clone()
    }

    /// The most recently assigned pid.
    pub fn last_pid(&self) -> Option<u32> {
        let state = self.state.lock().unwrap();
        (state.next_pid > 100).then(|| state.next_pid - 1)
    }
}

impl ProcessBackend for FakeBackend {
    async fn spawn(&self, program: &Path, args: &[String]) -> Result<SpawnedWorker> {
        let mut state = self.state.lock().unwrap();

        if let Some(reason) = state.spawn_failure.take() {
            return Err(Error::process_spawn(reason));
        }

        let pid = state.next_pid;
        state.next_pid += 1;
        state.spawns.push((program.to_path_buf(), args.to_vec()));

        let (exit_tx, exit_rx) = oneshot::channel();
        state.exit_txs.insert(pid, exit_tx);

        Ok(SpawnedWorker {
            pid,
            exited: exit_rx,
        })
    }

    async fn descendants(&self, _pid: u32) -> Vec<u32> {
        self.state.lock().unwrap().descendants.clone()
    }

    async fn terminate(&self, pid: u32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_pids.contains(&pid) {
            return Err(Error::terminate(pid, "scripted failure"));
        }
        state.terminated.push(pid);
        Ok(())
    }
}
