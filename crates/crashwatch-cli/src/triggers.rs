//! Named failure demonstrations.
//!
//! Each trigger deliberately faults the process so the installed
//! handlers can be observed end to end. Unknown names are logged and
//! ignored, never escalated.

use std::hint::black_box;
use std::thread;
use std::time::Duration;

/// Fixed delay before a trigger fires, so a caller can finish
/// interacting with the shell first.
const TRIGGER_DELAY: Duration = Duration::from_secs(2);

/// Triggers the failure matching `name` (case-insensitive) after a
/// short fixed delay.
pub fn trigger_named_failure(name: &str) {
    thread::sleep(TRIGGER_DELAY);
    match name.to_ascii_lowercase().as_str() {
        "segmentationfault" => trigger_segmentation_fault(),
        "illegalinstruction" => trigger_illegal_instruction(),
        "abort" => trigger_abort(),
        "floatingpointerror" => trigger_floating_point_error(),
        "buserror" => trigger_bus_error(),
        "arrayoutofbounds" => trigger_array_out_of_bounds(),
        "customexception" => trigger_custom_exception(),
        "assertionfailure" => trigger_assertion_failure(),
        "preconditionfailure" => trigger_precondition_failure(),
        "stackoverflow" => trigger_stack_overflow(),
        "memorycorruption" => trigger_memory_corruption(),
        other => log::warn!("Unknown crash type: {}", other),
    }
}

/// Names accepted by [`trigger_named_failure`].
pub const TRIGGER_NAMES: [&str; 11] = [
    "segmentationfault",
    "illegalinstruction",
    "abort",
    "floatingpointerror",
    "buserror",
    "arrayoutofbounds",
    "customexception",
    "assertionfailure",
    "preconditionfailure",
    "stackoverflow",
    "memorycorruption",
];

// SIGSEGV
fn trigger_segmentation_fault() {
    unsafe {
        std::ptr::null_mut::<i32>().write(42);
    }
}

// SIGILL
fn trigger_illegal_instruction() {
    unsafe {
        libc::raise(libc::SIGILL);
    }
}

// SIGABRT
fn trigger_abort() {
    std::process::abort();
}

// SIGFPE. Integer division by zero is a guaranteed panic in Rust, so
// the signal is raised directly.
fn trigger_floating_point_error() {
    unsafe {
        libc::raise(libc::SIGFPE);
    }
}

// SIGBUS. Misaligned reads do not fault on x86, so the signal is
// raised directly.
fn trigger_bus_error() {
    unsafe {
        libc::raise(libc::SIGBUS);
    }
}

// Panic via slice indexing
fn trigger_array_out_of_bounds() {
    let values: Vec<i32> = Vec::new();
    let _ = black_box(values)[10];
}

// Panic with a caller-supplied message
fn trigger_custom_exception() {
    panic!("This is a test crash for crash reporting");
}

// Failed runtime assertion
fn trigger_assertion_failure() {
    assert!(black_box(false), "This is a test crash: assertion failure");
}

// Violated precondition on a runtime value
fn trigger_precondition_failure() {
    let remaining = black_box(0usize);
    assert!(
        remaining > 0,
        "This is a test crash: precondition failure"
    );
}

// SIGSEGV via stack exhaustion
fn trigger_stack_overflow() {
    #[allow(unconditional_recursion)]
    fn recurse(depth: u64) -> u64 {
        let frame = [depth; 64];
        black_box(frame[0]) + recurse(depth + 1)
    }
    recurse(0);
}

// Writes far past a small heap allocation
fn trigger_memory_corruption() {
    unsafe {
        let ptr = libc::malloc(10 * std::mem::size_of::<u64>()) as *mut u64;
        for i in 0..1000 {
            ptr.add(i).write(i as u64);
        }
        libc::free(ptr as *mut libc::c_void);
    }
}
