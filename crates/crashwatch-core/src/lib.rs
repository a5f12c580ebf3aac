//! crashwatch-core: In-process crash and hang detection
//!
//! This crate provides the building blocks for detecting, capturing,
//! and persisting process faults:
//! - A catalog of fatal signals and a process-wide crash reporter
//! - Call-stack capture with best-effort symbol demangling
//! - An append-only, size-bounded crash log
//! - A background watchdog that detects primary-thread hangs

pub mod locked;
pub mod logger;
pub mod monitor;
pub mod reporter;
pub mod signal;
pub mod trace;

pub use locked::{LockKind, Locked};
pub use logger::{default_log_path, LogLevel, Logger, MAX_LOG_FILE_SIZE};
pub use monitor::{LifecycleEvent, PongScheduler, Task, ThreadMonitor};
pub use reporter::{CrashKind, CrashReport, ExceptionInfo};
pub use signal::CrashSignal;
pub use trace::{readable_call_stack, Frame};
