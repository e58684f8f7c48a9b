//////////////////////////////////////////////////////////////
/// compiler.rs
///
/// Dictionary search, number parsing, and the handful of primitives
/// that build new dictionary entries: `find`/`'`/`define`/`immediate`.
/// Grounded on the teacher's `internals/compiler.rs` (which holds the
/// equivalent `f_immediate`/number-parsing/definition-building logic
/// for its own closure-dispatch engine).
use crate::error::VmFault;
use crate::internals::opcodes::{code_cell_hidden, code_cell_immediate, make_code_cell, Op};
use crate::kernel::{Cell, LINK_SENTINEL};
use crate::runtime::Vm;

/// Walks the dictionary link chain from PWD looking for `name`. Returns
/// the matching word's execution token (its code-cell address) and
/// whether it carries the IMMEDIATE flag. A HIDDEN entry is skipped
/// rather than matched, per §4.3.
pub fn find(vm: &Vm, name: &str) -> Result<Option<(usize, bool)>, VmFault> {
    let needle = name.as_bytes();
    let mut header = vm.image.pwd();
    loop {
        if header as Cell <= LINK_SENTINEL {
            return Ok(None);
        }
        let code_cell = vm.image.get(header + 1)?;
        if !code_cell_hidden(code_cell) && vm.image.packed_eq(header + 2, needle)? {
            return Ok(Some((header + 1, code_cell_immediate(code_cell))));
        }
        header = vm.image.get(header)? as usize;
    }
}

/// Parses a token as a number per §4.4: an optional leading `-`, then
/// either a `0x`/`0X` hex prefix, a bare `0` prefix read as octal (so
/// `0` alone is valid and decodes to zero), or plain decimal. Base
/// selection is purely prefix-driven -- the HEX register only affects
/// `PNUM`'s *output* formatting, never how an input token is read.
/// Overflow wraps modulo cell width, matching the rest of the VM's
/// arithmetic.
pub fn parse_number(_vm: &Vm, token: &str) -> Option<i32> {
    let (neg, rest) = match token.strip_prefix('-') {
        Some(r) if !r.is_empty() => (true, r),
        _ => (false, token),
    };
    let (radix, digits) = if let Some(hex) = rest.strip_prefix("0x").or(rest.strip_prefix("0X")) {
        if hex.is_empty() {
            return None;
        }
        (16, hex)
    } else if rest.starts_with('0') {
        (8, rest)
    } else {
        (10, rest)
    };
    if digits.is_empty() {
        return None;
    }
    let value = i64::from_str_radix(digits, radix).ok()?;
    let value = if neg { -value } else { value };
    Some(value as i32)
}

/// Appends a `[push, n]` pair to the dictionary: the standard encoding
/// of a numeric literal inside a compiled thread.
pub fn compile_literal(vm: &mut Vm, n: i32) -> Result<(), VmFault> {
    let push_xt = vm.primitive_xt[Op::Push as usize];
    vm.image.dict_append(push_xt as Cell)?;
    vm.image.dict_append(n as Cell)?;
    Ok(())
}

/// `'` / `find` share this: resolve the next token in the input stream
/// to an xt (or 0 if unknown), then either compile it as a literal (if
/// compiling) or leave it on the stack (if interpreting). Both words are
/// seeded IMMEDIATE so this happens at the calling word's own compile
/// time -- see DESIGN.md.
fn resolve_next_token(vm: &mut Vm) -> Result<i32, VmFault> {
    let token = vm.input.next_token(crate::kernel::MAX_WORD_LEN);
    let xt = match token {
        Some(t) => find(vm, &t)?.map(|(xt, _)| xt as i32).unwrap_or(0),
        None => 0,
    };
    Ok(xt)
}

pub fn op_tick(vm: &mut Vm) -> Result<(), VmFault> {
    let xt = resolve_next_token(vm)?;
    if vm.image.is_compiling() {
        compile_literal(vm, xt)
    } else {
        vm.image.push_v(xt as Cell)
    }
}

pub fn op_find(vm: &mut Vm) -> Result<(), VmFault> {
    op_tick(vm)
}

/// `define` reads the next token as a name and lays down a fresh header:
/// `[link][code][packed name]`, pointing PWD at it. The new word's code
/// cell is seeded as a plain `Run`-opcode colon word; `immediate` (a
/// separate primitive) is what a later `;`-closed definition calls on
/// itself to become a control-flow word.
pub fn op_define(vm: &mut Vm) -> Result<(), VmFault> {
    let name = vm
        .input
        .next_token(crate::kernel::MAX_WORD_LEN)
        .unwrap_or_default();
    let old_pwd = vm.image.pwd();
    let header = vm.image.dic();
    vm.image.dict_append(old_pwd as Cell)?; // link
    let code_slot = vm.image.dict_append(0)?; // code cell, patched below
    let name_len = vm.image.write_packed(vm.image.dic(), name.as_bytes())?;
    vm.image.set_dic(vm.image.dic() + name_len);
    let code_cell = make_code_cell(Op::Run, false, false, name_len as u8);
    vm.image.set(code_slot, code_cell)?;
    vm.image.set_pwd(header);
    Ok(())
}

/// `immediate` sets the IMMEDIATE flag on the most recently defined
/// word (PWD).
pub fn op_immediate(vm: &mut Vm) -> Result<(), VmFault> {
    let header = vm.image.pwd();
    let code_cell = vm.image.get(header + 1)?;
    let marked = crate::internals::opcodes::set_code_cell_immediate(code_cell);
    vm.image.set(header + 1, marked)
}

/// `words` lists every dictionary entry's name, newest first (the
/// natural order of walking the link chain from PWD). Supplemental --
/// not part of the opcode table the bootstrap source itself relies on,
/// but native rather than bootstrap-defined so it works even if loaded
/// before the bootstrap source finishes compiling. See SPEC_FULL §10.4.
pub fn op_words(vm: &mut Vm) -> Result<(), VmFault> {
    let mut header = vm.image.pwd();
    while header as Cell > LINK_SENTINEL {
        let code_cell = vm.image.get(header + 1)?;
        if !code_cell_hidden(code_cell) {
            let bytes = vm.image.read_packed(header + 2)?;
            print!("{} ", String::from_utf8_lossy(&bytes));
        }
        header = vm.image.get(header)? as usize;
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::DEFAULT_CORE_SIZE;
    use crate::messages::DebugLevel;

    #[test]
    fn parse_number_handles_decimal_and_hex_and_sign() {
        let vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        assert_eq!(parse_number(&vm, "42"), Some(42));
        assert_eq!(parse_number(&vm, "-7"), Some(-7));
        assert_eq!(parse_number(&vm, "0xff"), Some(255));
        assert_eq!(parse_number(&vm, "not-a-number"), None);
    }

    #[test]
    fn parse_number_reads_leading_zero_as_octal() {
        let vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        assert_eq!(parse_number(&vm, "0"), Some(0));
        assert_eq!(parse_number(&vm, "017"), Some(15));
        assert_eq!(parse_number(&vm, "-010"), Some(-8));
    }

    #[test]
    fn parse_number_ignores_hex_register_for_input_base() {
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.image.set(crate::kernel::REG_HEX, 1).unwrap();
        assert_eq!(parse_number(&vm, "10"), Some(10));
        assert_eq!(parse_number(&vm, "0xa"), Some(10));
    }

    #[test]
    fn find_locates_seeded_primitive() {
        let vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        let result = find(&vm, "dup").unwrap();
        assert!(result.is_some());
    }

    #[test]
    fn find_reports_missing_word_as_none() {
        let vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        assert_eq!(find(&vm, "not-defined-anywhere").unwrap(), None);
    }

    #[test]
    fn find_skips_hidden_word() {
        let mut vm = Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        let header = vm.image.pwd();
        let code_slot = header + 1;
        let code_cell = vm.image.get(code_slot).unwrap();
        vm.image
            .set(code_slot, code_cell | crate::kernel::HIDDEN_FLAG)
            .unwrap();
        let name = String::from_utf8(vm.image.read_packed(code_slot + 1).unwrap()).unwrap();
        assert_eq!(find(&vm, &name).unwrap(), None);
    }
}
