//! Background workers with cooperative cancellation
//!
//! Every long-running job (library scan, cover decode, emulator wait) runs on
//! its own named thread. Workers poll a [`CancelToken`] at safe points and a
//! [`Worker`] is always cancelled and joined before it is dropped, so no job
//! outlives the session that started it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; workers notice it at their next check
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle to a background thread
pub struct Worker {
    name: String,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn a named worker thread
    ///
    /// Panics inside the job are caught and logged so a faulty job can never
    /// take the UI down with it.
    pub fn spawn<F>(name: impl Into<String>, job: F) -> std::io::Result<Self>
    where
        F: FnOnce(CancelToken) + Send + 'static,
    {
        let name = name.into();
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let thread_name = name.clone();

        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| job(token)));
            if let Err(e) = result {
                log::error!("Worker '{}' panicked: {:?}", thread_name, e);
            }
        })?;

        log::debug!("Started worker: {}", name);

        Ok(Self {
            name,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the thread to exit without cancelling it
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Failed to join worker: {}", self.name);
            }
        }
    }

    /// Cancel and wait for the thread to exit
    pub fn cancel_and_join(&mut self) {
        self.request_cancel();
        self.join();
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.cancel_and_join();
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}
