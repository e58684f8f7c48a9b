//////////////////////////////////////////////////////////////
/// inner.rs
///
/// The indirect-threaded inner interpreter: `run_thread` is the NEXT
/// loop that walks a compiled thread one call-cell at a time, and
/// `read_one` is the outer interpreter (the Forth `read` word) that
/// turns one token of source text into either an execution, a compile,
/// or a pushed literal. Mirrors the shape of the teacher's
/// `internals/inner.rs` (one function per execution-time behavior,
/// dispatched from a table keyed by dictionary entry type) with the
/// dispatch key changed from an enum tag alongside a closure to the
/// low 7 bits of a code cell.
use crate::error::VmFault;
use crate::internals::compiler;
use crate::internals::opcodes::{code_cell_name_len, Op};
use crate::kernel::Cell;
use crate::runtime::Vm;

/// Sentinel pushed onto the return stack by `call_word` to mark "return
/// to the Rust driver" rather than to another thread cell. No real
/// dictionary address is ever this large for the core sizes this build
/// supports (see `kernel::MIN_CORE_SIZE`/`DEFAULT_CORE_SIZE`).
const NATIVE_RETURN: Cell = Cell::MAX;

/// Runs a compiled thread starting at `ip` (the address of the first
/// thread cell to fetch, NOT a word's own xt) until an `EXIT` pops the
/// `NATIVE_RETURN` sentinel back off the return stack.
pub fn run_thread(vm: &mut Vm, mut ip: usize) -> Result<(), VmFault> {
    loop {
        let w = vm.image.get(ip)? as usize;
        ip += 1;
        let code_cell = vm.image.get(w)?;
        let op = Op::decode(code_cell).ok_or(VmFault::IllegalOpcode {
            pc: w,
            raw: code_cell,
        })?;
        match op {
            Op::Exit => {
                let ret = vm.image.pop_r()?;
                if ret == NATIVE_RETURN {
                    return Ok(());
                }
                ip = ret as usize;
            }
            Op::Run => {
                let l = code_cell_name_len(code_cell);
                vm.image.push_r(ip as Cell)?;
                ip = w + 1 + l;
            }
            Op::Push => {
                let lit = vm.image.get(ip)?;
                ip += 1;
                vm.image.push_v(lit)?;
            }
            Op::Jmp => {
                let offset = vm.image.get(ip)? as i64;
                let p = ip as i64;
                ip = (p + offset) as usize;
            }
            Op::Jmpz => {
                let offset = vm.image.get(ip)? as i64;
                let test = vm.image.pop_v()?;
                if test == 0 {
                    let p = ip as i64;
                    ip = (p + offset) as usize;
                } else {
                    ip += 1;
                }
            }
            other => execute_primitive(vm, other)?,
        }
    }
}

/// Directly invokes the word whose execution token (code-cell address)
/// is `xt`, as `outer_read` does when interpreting a recognized word.
/// Primitives that only make sense inline in a thread (`Push`, `Jmp`,
/// `Jmpz`) have nothing meaningful to do when called this way; nothing
/// in the bootstrap source ever names them directly as a token, so this
/// is not a path real programs exercise.
pub fn call_word(vm: &mut Vm, xt: usize) -> Result<(), VmFault> {
    let code_cell = vm.image.get(xt)?;
    let op = Op::decode(code_cell).ok_or(VmFault::IllegalOpcode {
        pc: xt,
        raw: code_cell,
    })?;
    if op == Op::Run {
        let l = code_cell_name_len(code_cell);
        vm.image.push_r(NATIVE_RETURN)?;
        run_thread(vm, xt + 1 + l)
    } else {
        execute_primitive(vm, op)
    }
}

/// Runs every opcode that is neither pure thread-control (`Exit`/`Run`)
/// nor consumes an inline thread operand (`Push`/`Jmp`/`Jmpz`, handled in
/// `run_thread` itself since they need the caller's `ip`).
fn execute_primitive(vm: &mut Vm, op: Op) -> Result<(), VmFault> {
    match op {
        Op::Add => binop(vm, |a, b| a.wrapping_add(b)),
        Op::Sub => binop(vm, |a, b| a.wrapping_sub(b)),
        Op::Mul => binop(vm, |a, b| a.wrapping_mul(b)),
        Op::Div => {
            let b = vm.image.pop_v()? as i32;
            let a = vm.image.pop_v()? as i32;
            if b == 0 {
                vm.msg.error("/", "division by zero", None::<bool>);
                vm.image.push_v(0)?;
            } else {
                vm.image.push_v(a.wrapping_div(b) as Cell)?;
            }
            Ok(())
        }
        Op::Lt => {
            let b = vm.image.pop_v()? as i32;
            let a = vm.image.pop_v()? as i32;
            vm.image.push_v(if a < b { u32::MAX } else { 0 })
        }
        Op::And => binop(vm, |a, b| a & b),
        Op::Or => binop(vm, |a, b| a | b),
        Op::Xor => binop(vm, |a, b| a ^ b),
        Op::Invert => {
            let a = vm.image.pop_v()?;
            vm.image.push_v(!a)
        }
        Op::Equal => {
            let b = vm.image.pop_v()?;
            let a = vm.image.pop_v()?;
            vm.image.push_v(if a == b { u32::MAX } else { 0 })
        }
        Op::Shl => {
            let b = vm.image.pop_v()?;
            let a = vm.image.pop_v()?;
            vm.image.push_v(a.wrapping_shl(b))
        }
        Op::Shr => {
            let b = vm.image.pop_v()?;
            let a = vm.image.pop_v()?;
            vm.image.push_v(a.wrapping_shr(b))
        }
        Op::Tail => {
            // Discards the current word's pending return address without
            // following it. A call that immediately follows this in the
            // same thread reuses the freed return-stack slot instead of
            // growing it, turning a self-tail-call into a flat loop.
            vm.image.pop_r()?;
            Ok(())
        }
        Op::Load => {
            let addr = vm.image.pop_v()? as usize;
            let value = vm.image.get(addr)?;
            vm.image.push_v(value)
        }
        Op::Store => {
            let addr = vm.image.pop_v()? as usize;
            let value = vm.image.pop_v()?;
            vm.image.set(addr, value)
        }
        Op::Dup => {
            let a = vm.image.top_v()?;
            vm.image.push_v(a)
        }
        Op::Drop => {
            vm.image.pop_v()?;
            Ok(())
        }
        Op::Swap => {
            let b = vm.image.pop_v()?;
            let a = vm.image.pop_v()?;
            vm.image.push_v(b)?;
            vm.image.push_v(a)
        }
        Op::Over => {
            let b = vm.image.pop_v()?;
            let a = vm.image.pop_v()?;
            vm.image.push_v(a)?;
            vm.image.push_v(b)?;
            vm.image.push_v(a)
        }
        Op::Key => {
            let c = vm.input.next_char().unwrap_or(0);
            vm.image.push_v(c as Cell)
        }
        Op::Emit => {
            let c = vm.image.pop_v()? as u8;
            emit_byte(&mut std::io::stdout(), c);
            Ok(())
        }
        Op::Tor => {
            let a = vm.image.pop_v()?;
            vm.image.push_r(a)
        }
        Op::Fromr => {
            let a = vm.image.pop_r()?;
            vm.image.push_v(a)
        }
        Op::Comma | Op::Compile => {
            let value = vm.image.pop_v()?;
            vm.image.dict_append(value)?;
            Ok(())
        }
        Op::Here => {
            let here = vm.image.dic();
            vm.image.push_v(here as Cell)
        }
        Op::Pnum => {
            // Per spec, T prints as unsigned regardless of base: a
            // negative cell shows its huge two's-complement magnitude,
            // not a leading minus. Trailing space separates consecutive
            // `.` outputs on one line; see DESIGN.md.
            let v = vm.image.pop_v()?;
            if vm.image.hex() {
                print!("{:x} ", v);
            } else {
                print!("{} ", v);
            }
            use std::io::Write;
            let _ = std::io::stdout().flush();
            Ok(())
        }
        Op::Dump => crate::internals::coredump::op_dump(vm),
        Op::LoadInfo => {
            let width = vm.image.info_width();
            let size = vm.image.info_core_size();
            vm.image.push_v(size)?;
            vm.image.push_v(width)
        }
        Op::Bload => crate::internals::blocks::op_bload(vm),
        Op::Bsave => crate::internals::blocks::op_bsave(vm),
        Op::Find => compiler::op_find(vm),
        Op::Tick => compiler::op_tick(vm),
        Op::Print => {
            let addr = vm.image.pop_v()? as usize;
            let bytes = vm.image.read_packed(addr)?;
            print!("{}", String::from_utf8_lossy(&bytes));
            Ok(())
        }
        Op::Pstk => {
            let start = vm.image.vstack_start();
            let sp = vm.image.vsp();
            for i in start..sp {
                print!("{}\t", vm.image.get(i)? as i32);
            }
            use std::io::Write;
            let _ = std::io::stdout().flush();
            Ok(())
        }
        Op::Comment => {
            // `\` is a line comment: the rest of the current input line
            // is simply dropped, without reading ahead into the next one.
            vm.input.skip_rest_of_line();
            Ok(())
        }
        Op::Words => crate::internals::compiler::op_words(vm),
        Op::Bye => {
            vm.exit_flag = true;
            Ok(())
        }
        Op::Define => compiler::op_define(vm),
        Op::Immediate => compiler::op_immediate(vm),
        Op::Read => {
            read_one(vm)?;
            Ok(())
        }
        Op::Push | Op::Jmp | Op::Jmpz | Op::Run | Op::Exit => unreachable!(
            "Push/Jmp/Jmpz/Run/Exit are handled by run_thread, never dispatched here"
        ),
    }
}

fn binop(vm: &mut Vm, f: impl Fn(i32, i32) -> i32) -> Result<(), VmFault> {
    let b = vm.image.pop_v()? as i32;
    let a = vm.image.pop_v()? as i32;
    vm.image.push_v(f(a, b) as Cell)
}

/// Writes `c` as a single raw byte, not through `char`/UTF-8 encoding --
/// `c as char` for `c >= 0x80` is a Latin-1-range code point that `print!`
/// would encode as two UTF-8 bytes, breaking the "`n emit` yields one byte
/// = n mod 256" round-trip for any `n` whose low byte is >= 128.
fn emit_byte(w: &mut impl std::io::Write, c: u8) {
    use std::io::Write;
    let _ = w.write_all(&[c]);
    let _ = w.flush();
}

/// One step of the outer interpreter: pulls the next token off the
/// current input source, and either runs it, compiles a call to it, or
/// (if it is not a known word) tries to parse it as a number, pushing or
/// compiling the literal. Reports an `unknown_word` diagnostic and moves
/// on if neither applies. Returns `Ok(false)` at end of input.
pub fn read_one(vm: &mut Vm) -> Result<bool, VmFault> {
    let token = match vm.input.next_token(crate::kernel::MAX_WORD_LEN) {
        Some(t) => t,
        None => return Ok(false),
    };
    if token.is_empty() {
        return Ok(true);
    }
    if let Some((xt, immediate)) = compiler::find(vm, &token)? {
        if vm.image.is_compiling() && !immediate {
            vm.image.dict_append(xt as Cell)?;
        } else {
            call_word(vm, xt)?;
        }
        return Ok(true);
    }
    if let Some(n) = compiler::parse_number(vm, &token) {
        if vm.image.is_compiling() {
            compiler::compile_literal(vm, n)?;
        } else {
            vm.image.push_v(n as Cell)?;
        }
        return Ok(true);
    }
    vm.msg.unknown_word(&token);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::DEFAULT_CORE_SIZE;
    use crate::messages::DebugLevel;

    #[test]
    fn arithmetic_evaluates_to_expected_stack() {
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.eval_str("<t>", "2 3 +").unwrap();
        assert_eq!(vm.image.pop_v().unwrap() as i32, 5);
    }

    #[test]
    fn colon_definition_runs_compiled_body() {
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.eval_str("<t>", ": sq dup * ; 7 sq").unwrap();
        assert_eq!(vm.image.pop_v().unwrap() as i32, 49);
    }

    #[test]
    fn if_else_then_selects_branch() {
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.eval_str("<t>", ": test 1 if 42 else 99 then ; test")
            .unwrap();
        assert_eq!(vm.image.pop_v().unwrap() as i32, 42);
    }

    #[test]
    fn line_comment_discards_rest_of_line_only() {
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.eval_str("<t>", "1 \\ 2 3 + this whole line is junk\n4 +")
            .unwrap();
        assert_eq!(vm.image.pop_v().unwrap() as i32, 5);
    }

    #[test]
    fn equal_compares_top_two_cells() {
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.eval_str("<t>", "3 3 =").unwrap();
        assert_eq!(vm.image.pop_v().unwrap(), u32::MAX);
        vm.eval_str("<t>", "3 4 =").unwrap();
        assert_eq!(vm.image.pop_v().unwrap(), 0);
    }

    #[test]
    fn not_equal_and_zero_equal_derive_from_equal() {
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.eval_str("<t>", "5 0 <>").unwrap();
        assert_eq!(vm.image.pop_v().unwrap(), u32::MAX);
        vm.eval_str("<t>", "0 0=").unwrap();
        assert_eq!(vm.image.pop_v().unwrap(), u32::MAX);
    }

    #[test]
    fn tail_keeps_return_stack_flat_across_self_recursion() {
        // Without `tail` discarding the pending return address before each
        // recursive call, this would overflow the 256-cell return stack
        // region well before reaching 2000.
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.eval_str(
            "<t>",
            ": down dup 0 > if 1 - tail down else drop then ; 2000 down",
        )
        .unwrap();
        assert!(!vm.is_invalid());
    }

    #[test]
    fn lshift_and_rshift_shift_bits() {
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.eval_str("<t>", "1 4 lshift").unwrap();
        assert_eq!(vm.image.pop_v().unwrap(), 16);
        vm.eval_str("<t>", "256 4 rshift").unwrap();
        assert_eq!(vm.image.pop_v().unwrap(), 16);
    }

    #[test]
    fn emit_byte_writes_exactly_one_raw_byte_above_ascii() {
        // c as char for c >= 0x80 is a Latin-1 code point; naively printing
        // it would UTF-8-encode to two bytes (0xC3 0x88 for 200), not the
        // single raw byte `n emit` is required to produce.
        let mut buf = Vec::new();
        emit_byte(&mut buf, 200);
        assert_eq!(buf, vec![200u8]);
    }

    #[test]
    fn emit_byte_writes_exactly_one_byte_for_every_value() {
        for c in 0..=255u8 {
            let mut buf = Vec::new();
            emit_byte(&mut buf, c);
            assert_eq!(buf.len(), 1);
            assert_eq!(buf[0], c);
        }
    }

    #[test]
    fn hex_toggles_output_base_without_a_stack_argument() {
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        assert!(!vm.image.hex());
        vm.eval_str("<t>", "hex").unwrap();
        assert!(!vm.is_invalid());
        assert!(vm.image.hex());
    }

    #[test]
    fn hex_scenario_does_not_underflow_the_stack() {
        // §8 scenario 5: `hex 255 . decimal` with `decimal` defined
        // self-containedly as `0 9 !`. A `hex` that instead takes its
        // flag from the stack (`9 !` alone) would try to pop a second
        // value for the store with nothing yet pushed, faulting the VM
        // before `255 .` ever runs.
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.eval_str("<t>", ": decimal 0 9 ! ; hex 255 . decimal")
            .unwrap();
        assert!(!vm.is_invalid());
        assert!(!vm.image.hex());
    }

    #[test]
    fn factorial_via_recursive_if() {
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.eval_str(
            "<t>",
            ": fact dup 1 = if drop 1 else dup 1 - fact * then ; 5 fact",
        )
        .unwrap();
        assert_eq!(vm.image.pop_v().unwrap() as i32, 120);
    }
}
