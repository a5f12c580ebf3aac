//! Human-readable call-stack capture.
//!
//! This code runs in the most fragile context in the system (signal
//! and panic handlers), so every step is best-effort: a frame without
//! a resolvable symbol degrades to `"<unknown>"` and a symbol that
//! cannot be demangled comes back as the raw mangled token. Capture
//! never fails; at worst it returns fewer or uglier frames.

use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;
use std::sync::OnceLock;

/// Frames beyond this bound are dropped.
const MAX_FRAMES: usize = 128;

/// One stack entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Position in the capture, innermost frame first.
    pub index: usize,
    /// Owning binary image, `"<unknown>"` if the dynamic linker cannot
    /// attribute the address.
    pub module: String,
    /// Best-effort demangled symbol.
    pub symbol: String,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.module, self.symbol)
    }
}

/// The C++ runtime demangler, if the process links one. Resolved once
/// from the standard dynamic symbol table; absence is a supported
/// degraded mode.
type CxaDemangle =
    unsafe extern "C" fn(*const c_char, *mut c_char, *mut usize, *mut c_int) -> *mut c_char;

fn cxa_demangle() -> Option<CxaDemangle> {
    static DEMANGLER: OnceLock<Option<CxaDemangle>> = OnceLock::new();
    *DEMANGLER.get_or_init(|| unsafe {
        let symbol = libc::dlsym(
            libc::RTLD_DEFAULT,
            c"__cxa_demangle".as_ptr(),
        );
        if symbol.is_null() {
            None
        } else {
            Some(std::mem::transmute::<*mut c_void, CxaDemangle>(symbol))
        }
    })
}

/// Demangles a symbol, trying the Rust demangler first and then the
/// dynamically resolved C++ one. Failure returns the original token
/// unchanged, never an error.
pub fn demangle(mangled: &str) -> String {
    if let Ok(demangled) = rustc_demangle::try_demangle(mangled) {
        return demangled.to_string();
    }

    if let Some(demangler) = cxa_demangle() {
        if let Ok(c_mangled) = CString::new(mangled) {
            let mut status: c_int = 0;
            let result = unsafe {
                demangler(
                    c_mangled.as_ptr(),
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                    &mut status,
                )
            };
            if !result.is_null() {
                let demangled = unsafe { CStr::from_ptr(result) }
                    .to_string_lossy()
                    .into_owned();
                unsafe { libc::free(result as *mut c_void) };
                if status == 0 && !demangled.is_empty() {
                    return demangled;
                }
            }
        }
    }

    mangled.to_string()
}

/// Owning binary image for an address, via the dynamic linker.
fn module_for(address: *mut c_void) -> String {
    let mut info: libc::Dl_info = unsafe { std::mem::zeroed() };
    let found = unsafe { libc::dladdr(address as *const c_void, &mut info) };
    if found != 0 && !info.dli_fname.is_null() {
        let full = unsafe { CStr::from_ptr(info.dli_fname) }.to_string_lossy();
        Path::new(full.as_ref())
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| full.into_owned())
    } else {
        "<unknown>".to_string()
    }
}

fn is_capture_machinery(symbol: &str) -> bool {
    symbol.contains("crashwatch_core::trace::")
        || symbol.starts_with("backtrace::")
        || symbol.starts_with("backtrace_rs::")
}

/// Captures the current call stack, innermost frame first, with the
/// capture machinery's own leading frames dropped.
pub fn capture() -> Vec<Frame> {
    let mut resolved: Vec<(String, String)> = Vec::new();

    backtrace::trace(|frame| {
        let ip = frame.ip();
        let mut raw_symbol: Option<String> = None;
        backtrace::resolve(ip, |symbol| {
            if raw_symbol.is_none() {
                raw_symbol = symbol
                    .name()
                    .and_then(|name| name.as_str())
                    .map(str::to_string);
            }
        });

        let symbol = match raw_symbol {
            Some(raw) => demangle(&raw),
            None => "<unknown>".to_string(),
        };
        resolved.push((module_for(ip), symbol));
        resolved.len() < MAX_FRAMES
    });

    let skip = resolved
        .iter()
        .take_while(|(_, symbol)| is_capture_machinery(symbol))
        .count();

    resolved
        .into_iter()
        .skip(skip)
        .enumerate()
        .map(|(index, (module, symbol))| Frame {
            index,
            module,
            symbol,
        })
        .collect()
}

/// Formatted frames, `"[module] symbol"`, innermost first.
pub fn readable_call_stack() -> Vec<String> {
    capture().iter().map(Frame::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demangle_handles_legacy_rust_symbols() {
        let demangled = demangle("_ZN4core3fmt5write17h0123456789abcdefE");
        assert!(demangled.starts_with("core::fmt::write"), "{}", demangled);
    }

    #[test]
    fn demangle_returns_unrecognized_tokens_unchanged() {
        assert_eq!(demangle("not_a_mangled_symbol"), "not_a_mangled_symbol");
        assert_eq!(demangle(""), "");
    }

    #[test]
    fn frame_display_is_module_then_symbol() {
        let frame = Frame {
            index: 0,
            module: "crashwatch".to_string(),
            symbol: "core::fmt::write".to_string(),
        };
        assert_eq!(frame.to_string(), "[crashwatch] core::fmt::write");
    }
}
