//////////////////////////////////////////////////////////////////
/// runtime.rs
///
/// Forth Runtime Engine
///
/// Defines `Vm`, the struct that owns everything a running session
/// needs: the flat cell image, the diagnostic reporter, the stack of
/// input sources, and the small amount of driver state (exit flag,
/// current debug level) that sits outside the image itself. Mirrors
/// the shape of the teacher's `ForthRuntime` (kernel + control state +
/// msg + reader stack), generalized onto the opcode-VM's own registers.
use crate::error::VmFault;
use crate::internals::bootstrap;
use crate::internals::input::{InputSource, InputStack};
use crate::kernel::Image;
use crate::messages::{DebugLevel, Msg};
use std::path::Path;

pub struct Vm {
    pub image: Image,
    pub msg: Msg,
    pub input: InputStack,
    pub exit_flag: bool,
    /// Execution token of each seeded primitive, indexed by opcode
    /// number, filled in once by `bootstrap::seed_primitives`. Lets the
    /// compiler compile a literal (`push`) or a branch (`jmp`/`jmpz`)
    /// without re-running `find` against the live dictionary chain.
    pub primitive_xt: Vec<usize>,
    /// Set once a VmFault has escaped the dispatch loop; once true the VM
    /// refuses further work rather than running against a torn image.
    invalid: bool,
}

impl Vm {
    /// cold_start builds a fresh image, seeds the primitive opcodes, and
    /// self-compiles the rest of the language by evaluating the embedded
    /// bootstrap source. Mirrors the teacher's `ForthRuntime::cold_start`.
    pub fn cold_start(core_size: usize, level: DebugLevel) -> Result<Vm, VmFault> {
        let mut vm = Vm {
            image: Image::new(core_size),
            msg: Msg::with_level(level),
            input: InputStack::new(),
            exit_flag: false,
            primitive_xt: Vec::new(),
            invalid: false,
        };
        vm.primitive_xt = bootstrap::seed_primitives(&mut vm.image)?;
        bootstrap::run_bootstrap_source(&mut vm)?;
        Ok(vm)
    }

    /// Loads a core image previously written by `internals::coredump`
    /// instead of cold-starting, skipping the bootstrap entirely.
    pub fn warm_start(image: Image, level: DebugLevel) -> Vm {
        let primitive_xt = bootstrap::recover_primitive_xt(&image);
        Vm {
            image,
            msg: Msg::with_level(level),
            input: InputStack::new(),
            exit_flag: false,
            primitive_xt,
            invalid: false,
        }
    }

    /// Pushes a file onto the input stack and drives READ until it (and
    /// any files it in turn loads) drains back to the caller's source.
    pub fn load_file(&mut self, path: &Path) -> Result<(), VmFault> {
        let depth_before = self.input.depth();
        match InputSource::from_file(path) {
            Ok(source) => self.input.push(source),
            Err(e) => {
                self.msg.error(
                    "load-file",
                    &format!("could not open {}", path.display()),
                    Some(e.to_string()),
                );
                return Ok(());
            }
        }
        self.drain_to_depth(depth_before)
    }

    /// Evaluates a string as if it were a loaded file, used both for the
    /// bootstrap source and for `-e` style one-shot snippets.
    pub fn eval_str(&mut self, name: &str, text: &str) -> Result<(), VmFault> {
        let depth_before = self.input.depth();
        self.input.push(InputSource::from_string(name, text));
        self.drain_to_depth(depth_before)
    }

    /// Runs the outer READ loop until the input stack falls back to
    /// `target_depth` or `exit_flag` is set.
    fn drain_to_depth(&mut self, target_depth: usize) -> Result<(), VmFault> {
        if self.invalid {
            return Err(VmFault::AlreadyInvalid);
        }
        loop {
            if self.exit_flag || self.input.depth() <= target_depth {
                break;
            }
            match crate::internals::inner::read_one(self) {
                Ok(continued) => {
                    if !continued {
                        break;
                    }
                }
                Err(fault) => {
                    self.invalid = true;
                    return Err(fault);
                }
            }
        }
        Ok(())
    }

    /// Drives the interactive top-level loop over stdin (and whatever
    /// files get chained in along the way) until EOF or `bye`.
    pub fn repl(&mut self) -> Result<(), VmFault> {
        if self.invalid {
            return Err(VmFault::AlreadyInvalid);
        }
        loop {
            if self.exit_flag {
                return Ok(());
            }
            match crate::internals::inner::read_one(self) {
                Ok(continued) => {
                    if !continued {
                        return Ok(());
                    }
                }
                Err(fault) => {
                    self.invalid = true;
                    return Err(fault);
                }
            }
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }
}
