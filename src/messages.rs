// Diagnostic message reporting, shared by every layer of the VM.
//
// Mirrors the hand-rolled `Msg`/`DebugLevel` reporter used throughout the
// teacher crate's internals (`self.msg.error(...)`, `self.msg.warning(...)`),
// generalized here to the VM's register/opcode vocabulary. This is not a
// logging framework: it is a small leveled line-printer to stderr.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            DebugLevel::Error => "error",
            DebugLevel::Warning => "warning",
            DebugLevel::Info => "info",
            DebugLevel::Debug => "debug",
        };
        write!(f, "{}", s)
    }
}

/// Msg is a small, cloneable message handler. Each layer of the VM holds one
/// (by value or by reference) so it never has to reach for a global logger.
#[derive(Debug, Clone)]
pub struct Msg {
    level: DebugLevel,
}

impl Msg {
    pub fn new() -> Msg {
        Msg {
            level: DebugLevel::Warning,
        }
    }

    pub fn with_level(level: DebugLevel) -> Msg {
        Msg { level }
    }

    pub fn set_level(&mut self, level: DebugLevel) {
        self.level = level;
    }

    pub fn get_level(&self) -> DebugLevel {
        self.level
    }

    /// error prints unconditionally - the VM always wants to know when
    /// something has gone wrong badly enough to be reported.
    pub fn error<T: fmt::Debug>(&self, context: &str, message: &str, detail: Option<T>) {
        match detail {
            Some(d) => eprintln!("( error \"{}: {} {:?}\" )", context, message, d),
            None => eprintln!("( error \"{}: {}\" )", context, message),
        }
    }

    /// warning prints only when the current level admits Warning or above.
    pub fn warning<T: fmt::Debug>(&self, context: &str, message: &str, detail: Option<T>) {
        if self.level >= DebugLevel::Warning {
            match detail {
                Some(d) => eprintln!("( warning \"{}: {} {:?}\" )", context, message, d),
                None => eprintln!("( warning \"{}: {}\" )", context, message),
            }
        }
    }

    pub fn info<T: fmt::Debug>(&self, context: &str, message: &str, detail: Option<T>) {
        if self.level >= DebugLevel::Info {
            match detail {
                Some(d) => eprintln!("( info \"{}: {} {:?}\" )", context, message, d),
                None => eprintln!("( info \"{}: {}\" )", context, message),
            }
        }
    }

    pub fn debug<T: fmt::Debug>(&self, context: &str, message: &str, detail: Option<T>) {
        if self.level >= DebugLevel::Debug {
            match detail {
                Some(d) => eprintln!("( debug \"{}: {} {:?}\" )", context, message, d),
                None => eprintln!("( debug \"{}: {}\" )", context, message),
            }
        }
    }

    /// unknown_word reports the "<token> is not a word" diagnostic required
    /// by the outer interpreter when a token is neither a known word nor a
    /// parseable number.
    pub fn unknown_word(&self, token: &str) {
        eprintln!("( error \"{} is not a word\" )", token);
    }
}

impl Default for Msg {
    fn default() -> Self {
        Msg::new()
    }
}
