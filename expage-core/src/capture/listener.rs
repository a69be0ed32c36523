use std::error::Error as StdError;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::LevelFilter;
use parking_lot::Mutex;

use super::backtrace;
use super::hook::{self, HookStatus};
use crate::models::record::{ErrorRecord, ExceptionRecord, Scope};
use crate::models::severity::Severity;

/// Longest a hook waits for the buffers before dropping a record.
const LOCK_TIMEOUT: Duration = Duration::from_millis(50);

/// Everything captured during the process, in occurrence order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buffers {
    pub errors: Vec<ErrorRecord>,
    pub exceptions: Vec<ExceptionRecord>,
}

impl Buffers {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.exceptions.is_empty()
    }
}

/// Shared state behind an [`ErrorCapture`], also reachable from the hooks.
#[derive(Debug, Default)]
pub(crate) struct CaptureInner {
    buffers: Mutex<Buffers>,
    sealed: AtomicBool,
}

impl CaptureInner {
    pub(crate) fn push_error(&self, record: ErrorRecord) {
        if self.sealed.load(Ordering::SeqCst) {
            return;
        }
        if let Some(mut buffers) = self.buffers.try_lock_for(LOCK_TIMEOUT) {
            buffers.errors.push(record);
        }
    }

    pub(crate) fn push_exception(&self, record: ExceptionRecord) {
        if self.sealed.load(Ordering::SeqCst) {
            return;
        }
        if let Some(mut buffers) = self.buffers.try_lock_for(LOCK_TIMEOUT) {
            buffers.exceptions.push(record);
        }
    }
}

/// Records runtime errors and uncaught failures into two ordered buffers.
///
/// Once [`install`](Self::install)ed, `log` records at or above the capture
/// level and every panic land here. Explicit `on_*` calls work whether or not
/// the capture is installed. Nothing raised on the capture path ever reaches
/// the caller.
#[derive(Debug, Clone, Default)]
pub struct ErrorCapture {
    inner: Arc<CaptureInner>,
}

impl ErrorCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes process-wide `log` records and panics into this capture.
    pub fn install(&self, level: LevelFilter) -> HookStatus {
        hook::activate(Arc::clone(&self.inner), level)
    }

    /// Stops routing process-wide records here. Explicit calls still record.
    pub fn uninstall(&self) {
        hook::deactivate(&self.inner);
    }

    pub fn is_installed(&self) -> bool {
        hook::is_active(&self.inner)
    }

    pub fn on_error(
        &self,
        severity: Severity,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        scope: Option<Scope>,
    ) {
        let mut record = ErrorRecord::new(severity, message, file, line);
        if let Some(scope) = scope {
            record = record.with_scope(scope);
        }
        hook::guarded(|| self.inner.push_error(record));
    }

    pub fn on_uncaught_exception(&self, record: ExceptionRecord) {
        hook::guarded(|| self.inner.push_exception(record));
    }

    /// Records an error value the program could not handle, located at the caller.
    #[track_caller]
    pub fn on_uncaught_error<E>(&self, error: &E)
    where
        E: StdError + 'static,
    {
        let location = Location::caller();
        hook::guarded(|| {
            let record = ExceptionRecord::from_error(error, location, backtrace::capture());
            self.inner.push_exception(record);
        });
    }

    pub fn error_count(&self) -> usize {
        self.inner.buffers.lock().errors.len()
    }

    pub fn exception_count(&self) -> usize {
        self.inner.buffers.lock().exceptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.buffers.lock().is_empty()
    }

    /// Moves the buffers out and seals the capture: later records are dropped.
    pub fn take_buffers(&self) -> Buffers {
        self.inner.sealed.store(true, Ordering::SeqCst);
        std::mem::take(&mut *self.inner.buffers.lock())
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.sealed.load(Ordering::SeqCst)
    }
}
