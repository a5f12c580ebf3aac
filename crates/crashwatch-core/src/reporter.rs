//! Process-wide crash reporting.
//!
//! [`initialize`] installs a panic hook and one OS signal handler per
//! catalog entry. Each handler builds an immutable [`CrashReport`]
//! with a captured call stack and persists it through the global log
//! sink before the process dies. Installation is process-wide state
//! and must happen once, early, before anything that might fault;
//! there is no uninstall.
//!
//! A secondary fault while the first is being handled is not guarded
//! against. That mirrors the inherent limitation of in-process signal
//! and exception handling.

use std::panic::{self, PanicHookInfo};
use std::sync::Once;

use crate::logger::Logger;
use crate::signal::CrashSignal;
use crate::trace;

/// What kind of fault produced a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrashKind {
    /// A fatal OS signal.
    Signal(CrashSignal),
    /// An uncaught panic.
    Exception(ExceptionInfo),
}

/// Details of an uncaught panic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExceptionInfo {
    /// Exception name.
    pub name: String,
    /// Panic message, if one could be extracted.
    pub reason: Option<String>,
    /// Context pairs such as the panic location and thread name.
    pub metadata: Vec<(String, String)>,
}

/// Immutable record of one fault, created at the moment a handler
/// fires and consumed immediately by the log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashReport {
    kind: CrashKind,
    trace: Vec<String>,
}

impl CrashReport {
    pub fn from_signal(signal: CrashSignal, trace: Vec<String>) -> Self {
        Self {
            kind: CrashKind::Signal(signal),
            trace,
        }
    }

    pub fn from_exception(exception: ExceptionInfo, trace: Vec<String>) -> Self {
        Self {
            kind: CrashKind::Exception(exception),
            trace,
        }
    }

    pub fn kind(&self) -> &CrashKind {
        &self.kind
    }

    /// Captured frames, innermost first.
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Signal name, or the exception name.
    pub fn description(&self) -> &str {
        match &self.kind {
            CrashKind::Signal(signal) => signal.name(),
            CrashKind::Exception(exception) => &exception.name,
        }
    }

    /// Exception message; absent for signals.
    pub fn reason(&self) -> Option<&str> {
        match &self.kind {
            CrashKind::Signal(_) => None,
            CrashKind::Exception(exception) => exception.reason.as_deref(),
        }
    }
}

static INIT: Once = Once::new();

/// Installs the process-wide panic hook and signal handlers.
/// Idempotent: repeated calls never double-register. Handlers remain
/// installed for the process lifetime.
pub fn initialize() {
    INIT.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            handle_panic(info);
            previous(info);
        }));

        for signal in CrashSignal::ALL {
            // SIGKILL cannot be caught; the OS rejects that
            // registration and we carry on.
            unsafe {
                libc::signal(signal.number(), handle_signal as usize);
            }
        }
    });
}

/// True once [`initialize`] has run.
pub fn is_initialized() -> bool {
    INIT.is_completed()
}

extern "C" fn handle_signal(number: libc::c_int) {
    // Reset the disposition first so a fault inside this handler
    // cannot loop back into it.
    unsafe {
        libc::signal(number, libc::SIG_DFL);
    }

    if let Some(signal) = CrashSignal::from_number(number) {
        log_crash(&CrashReport::from_signal(
            signal,
            trace::readable_call_stack(),
        ));
    }

    // Die the way the process would have without the handler.
    unsafe {
        libc::raise(number);
    }
}

fn handle_panic(info: &PanicHookInfo<'_>) {
    let reason = if let Some(message) = info.payload().downcast_ref::<&str>() {
        Some((*message).to_string())
    } else {
        info.payload().downcast_ref::<String>().cloned()
    };

    let mut metadata = Vec::new();
    if let Some(location) = info.location() {
        metadata.push(("location".to_string(), location.to_string()));
    }
    if let Some(name) = std::thread::current().name() {
        metadata.push(("thread".to_string(), name.to_string()));
    }

    let exception = ExceptionInfo {
        name: "panic".to_string(),
        reason,
        metadata,
    };
    log_crash(&CrashReport::from_exception(
        exception,
        trace::readable_call_stack(),
    ));
}

/// Formats `report` and forwards it to the log sink. Total: the sink
/// swallows its own failures, so nothing propagates back into the
/// crash path.
pub fn log_crash(report: &CrashReport) {
    Logger::global().info(&format_report(report));
}

fn format_report(report: &CrashReport) -> String {
    let mut message = String::from("---\nCRASH:\n");
    message.push_str(&format!("Description: {}\n", report.description()));
    message.push_str(&format!("Reason: {}\n", report.reason().unwrap_or("nil")));

    if let CrashKind::Exception(exception) = report.kind() {
        if !exception.metadata.is_empty() {
            let pairs: Vec<String> = exception
                .metadata
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            message.push_str(&format!("Metadata: {}\n", pairs.join(", ")));
        }
    }

    message.push_str("Trace:\n");
    for frame in report.trace() {
        message.push_str(&format!("  {}\n", frame));
    }
    message.push_str("---");
    message
}
