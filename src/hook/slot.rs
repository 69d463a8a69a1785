//! Process-wide crash handler slot
//!
//! Models the single global "uncaught panic handler" installation point with
//! get/set semantics, last write wins. The slot is injected into the
//! interceptor as a trait object so tests can substitute an in-memory slot
//! for the real runtime hook.

use crate::crash::CrashEvent;
use std::backtrace::Backtrace;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Mutex, OnceLock};

/// Handler occupying the process-wide slot
///
/// Invoked when a panic escapes unhandled on any thread. Implementations
/// must not panic: a panic raised while the runtime is already processing
/// one aborts the process.
#[cfg_attr(test, mockall::automock)]
pub trait CrashHandler: Send + Sync {
    /// Handle one intercepted crash
    fn on_crash(&self, crash: &CrashEvent);
}

/// The global handler slot
pub trait HandlerSlot: Send + Sync {
    /// Replace the slot occupant, returning the previous one
    fn replace(&self, handler: Option<Arc<dyn CrashHandler>>) -> Option<Arc<dyn CrashHandler>>;
}

/// The real process-wide slot, backed by the runtime panic hook
///
/// The first call to [`PanicHookSlot::global`] captures the runtime hook
/// active at that point and installs a bridge in its place. The bridge
/// converts each panic into a [`CrashEvent`] and dispatches it to the
/// current occupant; while the slot is empty it falls through to the
/// captured runtime hook, so default behavior is preserved.
pub struct PanicHookSlot {
    occupant: Mutex<Option<Arc<dyn CrashHandler>>>,
}

static PROCESS_SLOT: OnceLock<Arc<PanicHookSlot>> = OnceLock::new();
static RUNTIME_HOOK: OnceLock<Box<dyn Fn(&PanicHookInfo<'_>) + Send + Sync>> = OnceLock::new();

impl PanicHookSlot {
    /// The process-wide slot instance
    ///
    /// Installs the runtime bridge on first use. The bridge stays installed
    /// for the lifetime of the process; emptying the slot routes panics back
    /// through the hook that was active before the bridge.
    pub fn global() -> Arc<PanicHookSlot> {
        PROCESS_SLOT
            .get_or_init(|| {
                Self::install_bridge();
                Arc::new(PanicHookSlot {
                    occupant: Mutex::new(None),
                })
            })
            .clone()
    }

    fn install_bridge() {
        let previous = panic::take_hook();
        // set() only fails if the bridge raced another install, which
        // get_or_init already rules out
        let _ = RUNTIME_HOOK.set(previous);

        panic::set_hook(Box::new(|info| {
            let crash = crash_event_from(info);
            let occupant = PROCESS_SLOT
                .get()
                .and_then(|slot| match slot.occupant.lock() {
                    Ok(guard) => guard.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                });

            match occupant {
                Some(handler) => handler.on_crash(&crash),
                None => {
                    if let Some(hook) = RUNTIME_HOOK.get() {
                        hook(info);
                    }
                }
            }
        }));
    }
}

impl HandlerSlot for PanicHookSlot {
    fn replace(&self, handler: Option<Arc<dyn CrashHandler>>) -> Option<Arc<dyn CrashHandler>> {
        match self.occupant.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, handler),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), handler),
        }
    }
}

/// Build a crash event from the runtime panic payload
fn crash_event_from(info: &PanicHookInfo<'_>) -> CrashEvent {
    let payload = info.payload();
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };

    let location = info
        .location()
        .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()));

    let current = std::thread::current();
    let mut crash = CrashEvent::new(
        current.name().unwrap_or("<unnamed>"),
        message,
        location,
        Backtrace::force_capture().to_string(),
    );
    crash.os_thread_id = os_thread_id();
    crash
}

#[cfg(target_os = "linux")]
fn os_thread_id() -> Option<u64> {
    Some(unsafe { libc::gettid() } as u64)
}

#[cfg(not(target_os = "linux"))]
fn os_thread_id() -> Option<u64> {
    None
}
