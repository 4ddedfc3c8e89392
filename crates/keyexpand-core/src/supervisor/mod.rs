// Keyexpand Device Supervisor
// One worker thread per monitored device path, with per-device failure isolation

mod restart;
mod worker;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::input::{DeviceOpener, FileOpener, FrameLayout};
use crate::output::OutputActuator;
use crate::state::SubstitutionLookup;
use crate::symbol::KeySymbolTable;

pub use restart::{Backoff, RestartPolicy};
pub use worker::{DeviceWorker, RunEnd, StopToken, WorkerContext, WorkerError, WorkerStats};

/// How a worker thread ended
#[derive(Debug)]
pub enum WorkerExit {
    /// Stop token observed
    Stopped,
    /// The path turned out to be our own virtual keyboard
    SkippedVirtual,
    /// Open, read or decode failure (after any restarts were used up)
    Failed(WorkerError),
    /// The worker thread panicked
    Panicked,
}

/// Final state of one worker, returned from [`DeviceSupervisor::join`]
#[derive(Debug)]
pub struct WorkerReport {
    pub device_id: usize,
    pub path: PathBuf,
    pub exit: WorkerExit,
    pub restarts: u32,
    pub stats: WorkerStats,
}

struct WorkerHandle {
    device_id: usize,
    path: PathBuf,
    handle: JoinHandle<WorkerReport>,
}

/// Owns the device workers.
///
/// Workers share the substitution table and the output actuator and never
/// talk to each other. A worker that fails is not restarted unless a
/// [`RestartPolicy::Backoff`] is configured.
pub struct DeviceSupervisor {
    ctx: WorkerContext,
    opener: Arc<dyn DeviceOpener>,
    policy: RestartPolicy,
    workers: Vec<WorkerHandle>,
    next_id: usize,
}

impl DeviceSupervisor {
    pub fn new(
        layout: FrameLayout,
        symbols: Arc<KeySymbolTable>,
        table: Arc<dyn SubstitutionLookup>,
        actuator: Arc<OutputActuator>,
    ) -> Self {
        Self {
            ctx: WorkerContext {
                layout,
                symbols,
                table,
                actuator,
                stop: StopToken::new(),
            },
            opener: Arc::new(FileOpener),
            policy: RestartPolicy::Never,
            workers: Vec::new(),
            next_id: 0,
        }
    }

    /// Replace how device paths are opened.
    pub fn with_opener<O: DeviceOpener + 'static>(mut self, opener: O) -> Self {
        self.opener = Arc::new(opener);
        self
    }

    /// Opt into restarting failed workers.
    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Token shared by every worker; stopping it stops them all.
    pub fn stop_token(&self) -> StopToken {
        self.ctx.stop.clone()
    }

    /// Spawn one worker per path. Returns the number of workers started.
    pub fn start<I>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut started = 0;
        for path in paths {
            let device_id = self.next_id;
            self.next_id += 1;

            let worker = DeviceWorker::new(device_id, path.clone(), self.ctx.clone());
            let opener = Arc::clone(&self.opener);
            let policy = self.policy;
            let stop = self.ctx.stop.clone();

            let spawned = std::thread::Builder::new()
                .name(format!("keyexpand-dev{}", device_id))
                .spawn(move || supervise(worker, opener.as_ref(), policy, &stop));

            match spawned {
                Ok(handle) => {
                    self.workers.push(WorkerHandle {
                        device_id,
                        path,
                        handle,
                    });
                    started += 1;
                }
                Err(e) => {
                    log::warn!(
                        "Failed to spawn worker for {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }
        started
    }

    /// Number of workers whose threads are still running
    pub fn running(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| !w.handle.is_finished())
            .count()
    }

    /// Signal every worker to stop and release its device.
    pub fn stop(&self) {
        self.ctx.stop.stop();
    }

    /// Wait for all workers to end.
    pub fn join(mut self) -> Vec<WorkerReport> {
        std::mem::take(&mut self.workers)
            .into_iter()
            .map(|worker| {
                worker.handle.join().unwrap_or_else(|_| WorkerReport {
                    device_id: worker.device_id,
                    path: worker.path,
                    exit: WorkerExit::Panicked,
                    restarts: 0,
                    stats: WorkerStats::default(),
                })
            })
            .collect()
    }

    /// Stop and join.
    pub fn shutdown(self) -> Vec<WorkerReport> {
        self.stop();
        self.join()
    }
}

/// Stop workers when the supervisor goes away without an explicit shutdown,
/// so no device stays open for the rest of the process lifetime.
impl Drop for DeviceSupervisor {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.ctx.stop.stop();
        }
    }
}

fn supervise(
    worker: DeviceWorker,
    opener: &dyn DeviceOpener,
    policy: RestartPolicy,
    stop: &StopToken,
) -> WorkerReport {
    let mut stats = WorkerStats::default();
    let mut restarts = 0;

    let exit = loop {
        let err = match worker.run_once(opener, &mut stats) {
            Ok(RunEnd::Stopped) => break WorkerExit::Stopped,
            Ok(RunEnd::SkippedVirtual) => break WorkerExit::SkippedVirtual,
            Err(err) => err,
        };

        log::warn!(
            "Device {} ({}): {}",
            worker.device_id(),
            worker.path().display(),
            err
        );

        if stop.is_stopped() {
            break WorkerExit::Failed(err);
        }

        match policy.delay_for(restarts + 1) {
            Some(delay) => {
                if stop.wait_timeout(delay) {
                    break WorkerExit::Stopped;
                }
                restarts += 1;
                log::info!(
                    "Device {}: restarting (attempt {})",
                    worker.device_id(),
                    restarts
                );
            }
            None => break WorkerExit::Failed(err),
        }
    };

    WorkerReport {
        device_id: worker.device_id(),
        path: worker.path().to_path_buf(),
        exit,
        restarts,
        stats,
    }
}
