//! Contract diagnostics.
//!
//! Precondition failures are programming defects, not run-time errors: they
//! never travel through [`XspiError`](crate::driver::XspiError). A violation
//! is logged, handed to the installed hook, and then panics.

use core::cell::Cell;

use critical_section::Mutex;

/// Whether contract checks are compiled in.
pub const ENABLED: bool = cfg!(any(debug_assertions, feature = "contracts"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagMsg {
    /// Value is out of valid range.
    OutOfRange,
    /// Object is not valid.
    ObjectNotValid,
    /// Reference is unexpectedly empty.
    PointerNull,
    /// Object usage failure.
    UsageFailure,
    /// Not enough memory available.
    NotEnoughMem,
    Unknown,
}

impl core::fmt::Display for DiagMsg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DiagMsg::OutOfRange => write!(f, "value is out of valid range"),
            DiagMsg::ObjectNotValid => write!(f, "object is not valid"),
            DiagMsg::PointerNull => write!(f, "reference is empty"),
            DiagMsg::UsageFailure => write!(f, "object usage failure"),
            DiagMsg::NotEnoughMem => write!(f, "not enough memory available"),
            DiagMsg::Unknown => write!(f, "unknown error"),
        }
    }
}

/// Where and why a contract check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagReport {
    pub module: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub expr: &'static str,
    pub msg: DiagMsg,
}

pub type DiagHook = fn(&DiagReport);

static HOOK: Mutex<Cell<Option<DiagHook>>> = Mutex::new(Cell::new(None));

/// Installs the hook called on every contract violation, replacing any
/// previous one.
pub fn set_hook(hook: DiagHook) {
    critical_section::with(|cs| HOOK.borrow(cs).set(Some(hook)));
}

pub fn clear_hook() {
    critical_section::with(|cs| HOOK.borrow(cs).set(None));
}

/// Reports a contract violation. Never returns.
#[cold]
pub fn violation(report: &DiagReport) -> ! {
    log::error!(
        "contract violation: {} ({}) in {} at {}:{}",
        report.msg,
        report.expr,
        report.module,
        report.file,
        report.line
    );
    if let Some(hook) = critical_section::with(|cs| HOOK.borrow(cs).get()) {
        hook(report);
    }
    panic!("contract violation: {}: {}", report.msg, report.expr);
}

/// Checks a caller precondition when contract validation is enabled.
macro_rules! api_require {
    ($msg:expr, $cond:expr) => {
        if $crate::driver::diag::ENABLED && !($cond) {
            $crate::driver::diag::violation(&$crate::driver::diag::DiagReport {
                module: module_path!(),
                file: file!(),
                line: line!(),
                expr: stringify!($cond),
                msg: $msg,
            });
        }
    };
}

pub(crate) use api_require;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_check_is_silent() {
        api_require!(DiagMsg::OutOfRange, 1 + 1 == 2);
    }

    #[test]
    #[cfg_attr(not(any(debug_assertions, feature = "contracts")), ignore)]
    #[should_panic(expected = "contract violation")]
    fn failing_check_panics() {
        api_require!(DiagMsg::UsageFailure, 1 + 1 == 3);
    }

    #[test]
    fn report_messages_are_readable() {
        extern crate std;
        use std::string::ToString;

        assert_eq!(DiagMsg::ObjectNotValid.to_string(), "object is not valid");
    }
}
