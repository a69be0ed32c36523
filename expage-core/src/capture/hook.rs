//! Process-wide interception: the `log` bridge and the panic hook.
//!
//! Both hooks are registered once per process and stay registered. They
//! forward to the *active* capture, which `activate` / `deactivate` switch.
//! Every panic is also handed to the hook that was installed before, whether
//! or not a capture is active.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

use log::{kv, LevelFilter, Log, Metadata, Record};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::backtrace;
use super::listener::CaptureInner;
use crate::models::record::{ErrorRecord, ExceptionRecord};
use crate::models::severity::Severity;

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Records logged under this target are diagnostics of the pipeline itself.
const INTERNAL_TARGET: &str = env!("CARGO_CRATE_NAME");

static ACTIVE: RwLock<Option<(Arc<CaptureInner>, LevelFilter)>> = RwLock::new(None);
static FORWARD: RwLock<Option<Box<dyn Log>>> = RwLock::new(None);
static PREVIOUS_PANIC_HOOK: Mutex<Option<PanicHook>> = Mutex::new(None);

static PANIC_HOOK: Once = Once::new();
static LOG_BRIDGE: Once = Once::new();
static LOG_BRIDGE_OK: AtomicBool = AtomicBool::new(false);

static BRIDGE: LogBridge = LogBridge;

thread_local! {
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Status of the process-wide hooks after activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookStatus {
    /// False when another `log` implementation was registered first; errors
    /// can then only be recorded through explicit calls.
    pub log_bridge: bool,
}

/// Makes `inner` the capture that receives intercepted records.
pub(crate) fn activate(inner: Arc<CaptureInner>, level: LevelFilter) -> HookStatus {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        *PREVIOUS_PANIC_HOOK.lock() = Some(previous);
        panic::set_hook(Box::new(on_panic));
    });

    LOG_BRIDGE.call_once(|| {
        LOG_BRIDGE_OK.store(log::set_logger(&BRIDGE).is_ok(), Ordering::SeqCst);
    });

    if level > log::max_level() {
        log::set_max_level(level);
    }

    *ACTIVE.write() = Some((inner, level));

    HookStatus {
        log_bridge: LOG_BRIDGE_OK.load(Ordering::SeqCst),
    }
}

/// Detaches `inner` if it is still the active capture.
pub(crate) fn deactivate(inner: &Arc<CaptureInner>) {
    let mut active = ACTIVE.write();
    if matches!(&*active, Some((current, _)) if Arc::ptr_eq(current, inner)) {
        *active = None;
    }
}

pub(crate) fn is_active(inner: &Arc<CaptureInner>) -> bool {
    matches!(&*ACTIVE.read(), Some((current, _)) if Arc::ptr_eq(current, inner))
}

/// Keeps the host's own logger working behind the bridge.
///
/// Every record, captured or not, is also handed to `logger`.
pub fn set_forward_logger(logger: Box<dyn Log>, level: LevelFilter) {
    *FORWARD.write() = Some(logger);
    if level > log::max_level() {
        log::set_max_level(level);
    }
}

/// Runs `f` unless this thread is already inside a hook.
///
/// A fault raised while a diagnostic is being recorded is dropped instead of
/// recursing into the capture.
pub(crate) fn guarded(f: impl FnOnce()) {
    struct Reset;
    impl Drop for Reset {
        fn drop(&mut self) {
            IN_HOOK.with(|flag| flag.set(false));
        }
    }

    if IN_HOOK.with(|flag| flag.replace(true)) {
        return;
    }
    let _reset = Reset;
    f();
}

fn active() -> Option<(Arc<CaptureInner>, LevelFilter)> {
    ACTIVE.try_read().and_then(|guard| guard.clone())
}

fn on_panic(info: &PanicHookInfo<'_>) {
    if let Some((inner, _)) = active() {
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            guarded(|| {
                let frames = backtrace::capture();
                inner.push_exception(ExceptionRecord::from_panic(info, frames));
            })
        }));
    }
    call_previous_hook(info);
}

/// The previously installed hook still reports the panic (stderr by default).
fn call_previous_hook(info: &PanicHookInfo<'_>) {
    if let Some(previous) = PREVIOUS_PANIC_HOOK.try_lock().as_deref().and_then(Option::as_ref) {
        previous(info);
    }
}

struct LogBridge;

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        let captured = active().is_some_and(|(_, level)| metadata.level() <= level);
        captured
            || FORWARD
                .try_read()
                .is_some_and(|fwd| fwd.as_ref().is_some_and(|logger| logger.enabled(metadata)))
    }

    fn log(&self, record: &Record<'_>) {
        if let Some(fwd) = FORWARD.try_read() {
            if let Some(logger) = fwd.as_ref() {
                if logger.enabled(record.metadata()) {
                    logger.log(record);
                }
            }
        }

        if record.target().starts_with(INTERNAL_TARGET) {
            return;
        }
        let Some((inner, level)) = active() else {
            return;
        };
        if record.level() > level {
            return;
        }

        guarded(|| inner.push_error(error_from_record(record)));
    }

    fn flush(&self) {
        if let Some(fwd) = FORWARD.try_read() {
            if let Some(logger) = fwd.as_ref() {
                logger.flush();
            }
        }
    }
}

fn error_from_record(record: &Record<'_>) -> ErrorRecord {
    let error = ErrorRecord::new(
        Severity::from(record.level()),
        record.args().to_string(),
        record.file().unwrap_or_default(),
        record.line().unwrap_or(0),
    );

    let mut collector = ScopeCollector(Vec::new());
    let _ = record.key_values().visit(&mut collector);
    if collector.0.is_empty() {
        error
    } else {
        error.with_scope(collector.0.into_iter().collect())
    }
}

/// Turns the structured key-values of a `log` record into a scope snapshot.
struct ScopeCollector(Vec<(String, Value)>);

impl<'kvs> kv::VisitSource<'kvs> for ScopeCollector {
    fn visit_pair(&mut self, key: kv::Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        self.0.push((key.as_str().to_string(), kv_to_json(&value)));
        Ok(())
    }
}

fn kv_to_json(value: &kv::Value<'_>) -> Value {
    if let Some(b) = value.to_bool() {
        Value::Bool(b)
    } else if let Some(n) = value.to_i64() {
        Value::from(n)
    } else if let Some(n) = value.to_u64() {
        Value::from(n)
    } else if let Some(n) = value.to_f64() {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    } else if let Some(s) = value.to_borrowed_str() {
        Value::String(s.to_string())
    } else {
        Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::listener::ErrorCapture;
    use crate::models::severity::Severity;
    use crate::test_support::HOOK_LOCK;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn nested_guard_skips_inner_closure() {
        let mut calls = Vec::new();
        guarded(|| {
            calls.push("outer");
            guarded(|| calls.push("inner"));
        });
        assert_eq!(calls, vec!["outer"]);

        guarded(|| calls.push("after"));
        assert_eq!(calls, vec!["outer", "after"]);
    }

    #[test]
    fn record_raised_while_recording_is_dropped() {
        let capture = ErrorCapture::new();
        guarded(|| capture.on_error(Severity::Warning, "raised inside a hook", "hook.rs", 1, None));
        assert!(capture.is_empty());

        capture.on_error(Severity::Warning, "raised normally", "app.rs", 2, None);
        let buffers = capture.take_buffers();
        assert_eq!(buffers.errors.len(), 1);
        assert_eq!(buffers.errors[0].message(), "raised normally");
    }

    #[test]
    fn guard_resets_after_inner_panic() {
        let _lock = HOOK_LOCK.lock();
        let _ = panic::catch_unwind(|| guarded(|| panic!("fault while recording")));
        let mut ran = false;
        guarded(|| ran = true);
        assert!(ran);
    }

    #[test]
    fn active_capture_still_reaches_previous_hook() {
        static SEEN: AtomicUsize = AtomicUsize::new(0);

        let _lock = HOOK_LOCK.lock();
        let capture = ErrorCapture::new();
        capture.install(LevelFilter::Warn);

        let original = PREVIOUS_PANIC_HOOK.lock().replace(Box::new(|_: &PanicHookInfo<'_>| {
            SEEN.fetch_add(1, Ordering::SeqCst);
        }));
        let _ = panic::catch_unwind(|| panic!("recorded and reported"));
        *PREVIOUS_PANIC_HOOK.lock() = original;
        capture.uninstall();

        assert_eq!(SEEN.load(Ordering::SeqCst), 1);
        assert_eq!(capture.exception_count(), 1);
    }
}
