// Fatal fault type for the VM's non-local escape.
//
// Per the design note on non-local exit, the dispatch loop's "fatal error"
// path is a catchable Result, not a panic or an unwinding exception. This
// generalizes the Result-returning, ?-propagating dispatch style found in
// the other Forth-in-Rust reference implementation in the retrieval pack,
// adapted onto this crate's register/opcode vocabulary. Non-fatal
// conditions (unknown word, bad number, block I/O failure) are reported
// through `Msg` and never produce a `VmFault` - only bounds violations and
// illegal opcodes do.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmFault {
    /// An index computed by the VM fell outside `[0, CORE_SIZE)`.
    OutOfBounds { context: &'static str, index: i64 },
    /// The low 7 bits of a code cell did not decode to a known opcode.
    IllegalOpcode { pc: usize, raw: u32 },
    /// The return stack over- or under-flowed its region.
    ReturnStackFault { rstk: usize },
    /// The variable (data) stack over- or under-flowed its region.
    StackFault { vsp: usize },
    /// A core image was loaded whose INFO register disagrees with this
    /// build's cell width or core size.
    CoreWidthMismatch { expected: u32, found: u32 },
    /// The VM already faulted once; `run` refuses to do further work.
    AlreadyInvalid,
}

impl fmt::Display for VmFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VmFault::OutOfBounds { context, index } => {
                write!(f, "{}: index {} out of bounds", context, index)
            }
            VmFault::IllegalOpcode { pc, raw } => {
                write!(f, "illegal opcode {} at cell {}", raw, pc)
            }
            VmFault::ReturnStackFault { rstk } => {
                write!(f, "return stack fault at {}", rstk)
            }
            VmFault::StackFault { vsp } => {
                write!(f, "variable stack fault at {}", vsp)
            }
            VmFault::CoreWidthMismatch { expected, found } => write!(
                f,
                "core image width mismatch: expected {} byte cells, found {}",
                expected, found
            ),
            VmFault::AlreadyInvalid => write!(f, "VM is invalid after a prior fatal error"),
        }
    }
}

impl std::error::Error for VmFault {}
