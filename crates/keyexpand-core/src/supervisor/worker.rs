// Keyexpand Device Worker
// Read -> decode -> classify -> expand loop for one device

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::expansion::{ExpansionStateMachine, Outcome};
use crate::input::{
    is_virtual_device, DecodeError, DeviceOpenError, DeviceOpener, FrameLayout, RawEventFrame,
    ReadOutcome,
};
use crate::output::OutputActuator;
use crate::state::SubstitutionLookup;
use crate::symbol::KeySymbolTable;

/// Errors that end a worker's device loop
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Open(#[from] DeviceOpenError),

    #[error("Error reading input event: {0}")]
    Read(#[from] io::Error),

    #[error("Error decoding input event: {0}")]
    Decode(#[from] DecodeError),
}

/// Shared stop signal for all workers of a supervisor.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
    flag: AtomicBool,
    stopped: Mutex<bool>,
    cvar: Condvar,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        *self.inner.stopped.lock() = true;
        self.inner.cvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Sleep for up to `timeout`, waking early on stop. Returns the stop state.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut stopped = self.inner.stopped.lock();
        self.inner
            .cvar
            .wait_while_for(&mut stopped, |stopped| !*stopped, timeout);
        *stopped
    }
}

/// Counters kept by a worker across restarts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub frames: u64,
    pub presses: u64,
    pub expansions: u64,
    pub output_errors: u64,
}

/// How a device loop ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Stop token observed
    Stopped,
    /// The path is our own virtual keyboard; reading it would re-expand
    /// injected text
    SkippedVirtual,
}

/// Everything a worker shares with its siblings.
#[derive(Clone)]
pub struct WorkerContext {
    pub layout: FrameLayout,
    pub symbols: Arc<KeySymbolTable>,
    pub table: Arc<dyn SubstitutionLookup>,
    pub actuator: Arc<OutputActuator>,
    pub stop: StopToken,
}

/// Monitors exactly one device path.
///
/// The token buffer lives inside `run_once` and is owned by this worker's
/// thread alone.
pub struct DeviceWorker {
    device_id: usize,
    path: PathBuf,
    ctx: WorkerContext,
}

impl DeviceWorker {
    pub fn new(device_id: usize, path: PathBuf, ctx: WorkerContext) -> Self {
        Self {
            device_id,
            path,
            ctx,
        }
    }

    pub fn device_id(&self) -> usize {
        self.device_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the device and process frames until stopped or failed.
    ///
    /// The device handle is dropped on return either way.
    pub fn run_once(
        &self,
        opener: &dyn DeviceOpener,
        stats: &mut WorkerStats,
    ) -> Result<RunEnd, WorkerError> {
        let mut source = opener.open(&self.path)?;
        if let Some(name) = source.device_name().filter(|name| is_virtual_device(name)) {
            log::info!(
                "Device {}: skipping virtual device {} ({})",
                self.device_id,
                self.path.display(),
                name
            );
            return Ok(RunEnd::SkippedVirtual);
        }
        log::info!(
            "Listening on device {}: {}",
            self.device_id,
            self.path.display()
        );

        let mut machine = ExpansionStateMachine::new();
        let mut buf = vec![0u8; self.ctx.layout.size()];

        while !self.ctx.stop.is_stopped() {
            let n = match source.read_frame(&mut buf)? {
                ReadOutcome::Idle => continue,
                ReadOutcome::Read(0) => {
                    return Err(WorkerError::Read(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "device stream closed",
                    )))
                }
                ReadOutcome::Read(n) => n,
            };

            let frame = self.ctx.layout.decode(&buf[..n])?;
            stats.frames += 1;
            self.handle_frame(&frame, &mut machine, stats);
        }

        log::info!(
            "Device {}: stopped, releasing {}",
            self.device_id,
            self.path.display()
        );
        Ok(RunEnd::Stopped)
    }

    fn handle_frame(
        &self,
        frame: &RawEventFrame,
        machine: &mut ExpansionStateMachine,
        stats: &mut WorkerStats,
    ) {
        if !frame.is_key_press() {
            return;
        }
        stats.presses += 1;

        let symbol = self.ctx.symbols.lookup(frame.code);
        match machine.feed(symbol, self.ctx.table.as_ref()) {
            Outcome::Modifier(kind) => {
                log::debug!("Device {}: Modifier key pressed: {:?}", self.device_id, kind);
            }
            Outcome::Unknown => {
                log::debug!("Device {}: Unknown key code: {}", self.device_id, frame.code);
            }
            Outcome::Expand(action) => {
                log::debug!(
                    "Device {}: Expanding {} chars into {:?}",
                    self.device_id,
                    action.erase_count - 1,
                    action.type_text
                );
                stats.expansions += 1;
                if let Err(e) = self.ctx.actuator.execute(&action) {
                    stats.output_errors += 1;
                    log::warn!("Device {}: Error sending output: {}", self.device_id, e);
                }
            }
            _ => {
                log::debug!("Device {}: Key pressed: {}", self.device_id, symbol);
            }
        }
    }
}
