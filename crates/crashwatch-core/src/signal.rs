//! Catalog of the fatal signals the crash reporter intercepts.

use std::fmt;

/// A fatal OS signal from the fixed catalog.
///
/// The signal-number/name mapping is a bijection over these eleven
/// variants; numbers outside the catalog map to `None`, never to an
/// error. Lookup is a scan over a small fixed table, so it is safe to
/// call from a signal-handling context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrashSignal {
    Hangup,
    Interrupt,
    Quit,
    Illegal,
    Trap,
    Abort,
    FloatingPointError,
    Kill,
    SegmentationFault,
    PipeError,
    Termination,
}

impl CrashSignal {
    /// Every signal in the catalog.
    pub const ALL: [CrashSignal; 11] = [
        CrashSignal::Hangup,
        CrashSignal::Interrupt,
        CrashSignal::Quit,
        CrashSignal::Illegal,
        CrashSignal::Trap,
        CrashSignal::Abort,
        CrashSignal::FloatingPointError,
        CrashSignal::Kill,
        CrashSignal::SegmentationFault,
        CrashSignal::PipeError,
        CrashSignal::Termination,
    ];

    /// Looks up a signal by its OS number.
    pub fn from_number(number: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|signal| signal.number() == number)
    }

    /// Looks up a signal by name, case-insensitively. Both the canonical
    /// `"SIGABRT"` form and the stripped `"ABRT"` form are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|signal| {
            let canonical = signal.name().to_ascii_lowercase();
            lowered == canonical || lowered == canonical.trim_start_matches("sig")
        })
    }

    /// The OS signal number.
    pub fn number(self) -> i32 {
        match self {
            CrashSignal::Hangup => libc::SIGHUP,
            CrashSignal::Interrupt => libc::SIGINT,
            CrashSignal::Quit => libc::SIGQUIT,
            CrashSignal::Illegal => libc::SIGILL,
            CrashSignal::Trap => libc::SIGTRAP,
            CrashSignal::Abort => libc::SIGABRT,
            CrashSignal::FloatingPointError => libc::SIGFPE,
            CrashSignal::Kill => libc::SIGKILL,
            CrashSignal::SegmentationFault => libc::SIGSEGV,
            CrashSignal::PipeError => libc::SIGPIPE,
            CrashSignal::Termination => libc::SIGTERM,
        }
    }

    /// The canonical signal name.
    pub fn name(self) -> &'static str {
        match self {
            CrashSignal::Hangup => "SIGHUP",
            CrashSignal::Interrupt => "SIGINT",
            CrashSignal::Quit => "SIGQUIT",
            CrashSignal::Illegal => "SIGILL",
            CrashSignal::Trap => "SIGTRAP",
            CrashSignal::Abort => "SIGABRT",
            CrashSignal::FloatingPointError => "SIGFPE",
            CrashSignal::Kill => "SIGKILL",
            CrashSignal::SegmentationFault => "SIGSEGV",
            CrashSignal::PipeError => "SIGPIPE",
            CrashSignal::Termination => "SIGTERM",
        }
    }
}

impl fmt::Display for CrashSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_round_trips_for_every_signal() {
        for signal in CrashSignal::ALL {
            assert_eq!(CrashSignal::from_number(signal.number()), Some(signal));
        }
    }

    #[test]
    fn name_round_trips_for_every_signal() {
        for signal in CrashSignal::ALL {
            assert_eq!(CrashSignal::from_name(signal.name()), Some(signal));
        }
    }

    #[test]
    fn from_name_is_case_insensitive_and_accepts_stripped_prefix() {
        assert_eq!(CrashSignal::from_name("SIGABRT"), Some(CrashSignal::Abort));
        assert_eq!(CrashSignal::from_name("sigabrt"), Some(CrashSignal::Abort));
        assert_eq!(CrashSignal::from_name("ABRT"), Some(CrashSignal::Abort));
        assert_eq!(CrashSignal::from_name("AbRt"), Some(CrashSignal::Abort));
        assert_eq!(
            CrashSignal::from_name("segv"),
            Some(CrashSignal::SegmentationFault)
        );
    }

    #[test]
    fn unknown_inputs_yield_none() {
        assert_eq!(CrashSignal::from_number(0), None);
        assert_eq!(CrashSignal::from_number(999), None);
        assert_eq!(CrashSignal::from_name("SIGFOO"), None);
        assert_eq!(CrashSignal::from_name(""), None);
    }

    #[test]
    fn display_matches_name() {
        assert_eq!(
            CrashSignal::SegmentationFault.to_string(),
            "SIGSEGV"
        );
    }
}
