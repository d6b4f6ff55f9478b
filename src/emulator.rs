//! Emulator monitor - run an external emulator and report when it exits
//!
//! Only one emulator runs at a time. The process is started from the
//! emulator's own directory (many emulators look for their BIOS and plugins
//! relative to the working directory) and watched from a background worker.
//! Every launch produces exactly one [`EmulatorClosed`], whether the process
//! exited, could not be started, or was abandoned when the launcher quit.

use crate::worker::{CancelToken, Worker};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Called from the monitor thread right after an [`EmulatorClosed`] is queued
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// What to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub emulator: PathBuf,
    pub rom: PathBuf,
    /// Shell-quoted arguments placed between the emulator and the ROM
    pub extra_args: Option<String>,
}

impl LaunchRequest {
    pub fn new(emulator: PathBuf, rom: PathBuf, extra_args: Option<String>) -> Self {
        Self {
            emulator,
            rom,
            extra_args,
        }
    }

    /// Full argument vector: emulator, extra arguments, ROM
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.emulator.to_string_lossy().into_owned()];
        if let Some(extra) = &self.extra_args {
            argv.extend(split_args(extra));
        }
        argv.push(self.rom.to_string_lossy().into_owned());
        argv
    }

    /// Directory the emulator is started in
    pub fn working_dir(&self) -> Option<&Path> {
        self.emulator
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.emulator);
        if let Some(extra) = &self.extra_args {
            cmd.args(split_args(extra));
        }
        cmd.arg(&self.rom);
        if let Some(dir) = self.working_dir() {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// Split an argument string the way a POSIX shell would
///
/// Unbalanced quotes fall back to plain whitespace splitting.
pub fn split_args(args: &str) -> Vec<String> {
    match shlex::split(args) {
        Some(parts) => parts,
        None => {
            log::warn!("Could not parse emulator arguments {:?}; splitting on whitespace", args);
            args.split_whitespace().map(str::to_string).collect()
        }
    }
}

/// How a monitored emulator run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process exited; `None` when killed by a signal
    Exited(Option<i32>),
    /// The process could not be started
    LaunchFailed(String),
    /// The launcher stopped waiting; the process may still be running
    Detached,
}

/// Sent once per launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorClosed {
    pub rom: PathBuf,
    pub outcome: ExitOutcome,
}

/// Runs at most one emulator and reports its exit
pub struct EmulatorMonitor {
    worker: Option<Worker>,
    sender: Sender<EmulatorClosed>,
    events: Receiver<EmulatorClosed>,
    waker: Option<Waker>,
}

impl Default for EmulatorMonitor {
    fn default() -> Self {
        let (sender, events) = channel();
        Self {
            worker: None,
            sender,
            events,
            waker: None,
        }
    }
}

impl EmulatorMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake the receiving side when an exit is reported
    ///
    /// The UI may not be polling while its window is minimized.
    pub fn set_waker(&mut self, waker: Waker) {
        self.waker = Some(waker);
    }

    /// Is an emulator (or its monitor) still active?
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Start an emulator
    ///
    /// Returns `false` without doing anything while another one is running.
    pub fn launch(&mut self, request: LaunchRequest) -> bool {
        if self.is_running() {
            log::warn!(
                "Emulator already running; ignoring launch of {}",
                request.rom.display()
            );
            return false;
        }
        if let Some(mut finished) = self.worker.take() {
            finished.join();
        }

        log::info!("Launching emulator: {:?}", request.argv());

        let sender = self.sender.clone();
        let waker = self.waker.clone();
        let rom = request.rom.clone();
        let spawned = Worker::spawn("emulator-monitor", move |cancel| {
            let outcome = run_and_wait(&request, &cancel);
            let _ = sender.send(EmulatorClosed {
                rom: request.rom,
                outcome,
            });
            if let Some(wake) = waker {
                wake();
            }
        });

        match spawned {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => {
                // The monitor thread itself couldn't start; report it the same way.
                log::error!("Failed to start emulator monitor: {}", e);
                let _ = self.sender.send(EmulatorClosed {
                    rom,
                    outcome: ExitOutcome::LaunchFailed(e.to_string()),
                });
            }
        }
        true
    }

    /// Next pending exit notification, without blocking
    pub fn poll_closed(&self) -> Option<EmulatorClosed> {
        self.events.try_recv().ok()
    }

    /// Block up to `timeout` for the next exit notification
    pub fn wait_closed(&self, timeout: Duration) -> Option<EmulatorClosed> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Stop waiting for the current emulator, leaving the process alone
    pub fn shutdown(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.cancel_and_join();
        }
    }
}

impl Drop for EmulatorMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_and_wait(request: &LaunchRequest, cancel: &CancelToken) -> ExitOutcome {
    let mut child = match request.command().spawn() {
        Ok(child) => child,
        Err(e) => {
            log::error!(
                "Failed to start emulator {}: {}",
                request.emulator.display(),
                e
            );
            return ExitOutcome::LaunchFailed(e.to_string());
        }
    };

    loop {
        if cancel.is_cancelled() {
            log::info!("No longer waiting for emulator (pid {})", child.id());
            return ExitOutcome::Detached;
        }
        match child.try_wait() {
            Ok(Some(status)) => {
                log::info!("Emulator exited: {}", status);
                return ExitOutcome::Exited(status.code());
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                log::error!("Error checking emulator process: {}", e);
                return ExitOutcome::Exited(None);
            }
        }
    }
}
