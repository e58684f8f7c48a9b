//! Submodules implementing the VM's primitive behaviors and support
//! machinery, one concern per file in the teacher's layout.

pub mod blocks;
pub mod bootstrap;
pub mod compiler;
pub mod coredump;
pub mod inner;
pub mod input;
pub mod opcodes;
