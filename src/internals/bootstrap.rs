//////////////////////////////////////////////////////////////
/// bootstrap.rs
///
/// Seeds the primitive opcodes as bare dictionary entries, then
/// self-compiles the rest of the language by evaluating an embedded
/// Forth source string against that seeded image. Mirrors the shape of
/// the teacher's `internals/builder.rs` ("set up all the words that
/// are implemented in Rust" followed by an initial-state pass), with
/// the closure-table registration swapped for opcode-header writing.
use crate::error::VmFault;
use crate::internals::opcodes::{make_code_cell, Op, OPCODE_COUNT};
use crate::kernel::Image;
use crate::runtime::Vm;

/// Writes one dictionary header per primitive opcode, in opcode order,
/// and returns each primitive's execution token indexed by opcode
/// number. Called once, against a freshly allocated image, before any
/// Forth source runs.
pub fn seed_primitives(image: &mut Image) -> Result<Vec<usize>, VmFault> {
    let mut xt_table = vec![0usize; OPCODE_COUNT as usize];
    for n in 0..OPCODE_COUNT {
        let op = Op::decode(n).expect("opcode table is dense 0..OPCODE_COUNT");
        let old_pwd = image.pwd();
        let header = image.dic();
        image.dict_append(old_pwd as u32)?; // link
        let code_slot = image.dict_append(0)?; // code cell, patched below
        let name_len = image.write_packed(image.dic(), op.name().as_bytes())?;
        image.set_dic(image.dic() + name_len);
        let code_cell = make_code_cell(op, false, op.seeded_immediate(), name_len as u8);
        image.set(code_slot, code_cell)?;
        image.set_pwd(header);
        xt_table[n as usize] = code_slot;
    }
    Ok(xt_table)
}

/// Recovers the primitive execution-token table from a loaded core
/// image (see `internals::coredump`) by relying on the fact that a
/// cold-started image always seeds every primitive, in opcode order,
/// as the very first `OPCODE_COUNT` dictionary headers before any
/// bootstrap source runs.
pub fn recover_primitive_xt(image: &Image) -> Vec<usize> {
    let mut xt_table = vec![0usize; OPCODE_COUNT as usize];
    let mut header = crate::kernel::DICTIONARY_START;
    for n in 0..OPCODE_COUNT {
        let code_slot = header + 1;
        xt_table[n as usize] = code_slot;
        let code_cell = image.get(code_slot).unwrap_or(0);
        let name_len = crate::internals::opcodes::code_cell_name_len(code_cell);
        header = header + 2 + name_len;
    }
    xt_table
}

/// The self-hosting bootstrap: hand-lays `:` and `;` directly against
/// the seeded primitives (no colon syntax exists yet to do it for us),
/// then uses ordinary colon definitions for everything else. See
/// DESIGN.md for the cell-by-cell derivation of the `:`/`;` bodies and
/// the `if`/`else`/`then`/`begin`/`until` backpatch arithmetic.
pub const BOOTSTRAP_SOURCE: &str = r#"
define : ' define , ' push , 1 , ' push , 8 , ' ! , ' exit ,
define ; ' push , ' exit , ' comma , ' push , 0 , ' push , 8 , ' ! , ' exit , immediate

: if ' jz , here 0 , ; immediate
: else ' j , here 0 , swap here over - swap ! ; immediate
: then here over - swap ! ; immediate

: begin here ; immediate
: until ' jz , here - , ; immediate

: not invert ;
: 0< 0 < ;
: 0= 0 = ;
: <> = not ;
: > swap < ;
: >= < not ;
: <= > not ;

: 2drop drop drop ;
: nip swap drop ;
: rot >r swap r> swap ;
: -rot swap >r swap r> ;
: space 32 emit ;
: 1+ 1 + ;
: 1- 1 - ;

: hex 1 9 ! ;
: state 8 ! ;
: h 0 ; : r 1 ; : pwd 10 ;
: [ 0 state ; immediate
: ] 1 state ;
: :noname here 2 , ] ; immediate

: tab 9 emit ;
: cr 10 emit ;
: ')' 41 ;
: .( key drop begin key dup ')' = if drop exit then emit 0 until ;
"#;

/// Evaluates `BOOTSTRAP_SOURCE` against a freshly seeded VM, completing
/// cold start.
pub fn run_bootstrap_source(vm: &mut Vm) -> Result<(), VmFault> {
    vm.eval_str("<bootstrap>", BOOTSTRAP_SOURCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::DEFAULT_CORE_SIZE;

    #[test]
    fn seed_primitives_registers_every_opcode_by_name() {
        let mut image = Image::new(DEFAULT_CORE_SIZE);
        let xt_table = seed_primitives(&mut image).unwrap();
        assert_eq!(xt_table.len(), OPCODE_COUNT as usize);
        for n in 0..OPCODE_COUNT {
            let op = Op::decode(n).unwrap();
            let code_cell = image.get(xt_table[n as usize]).unwrap();
            assert_eq!(Op::decode(code_cell), Some(op));
        }
    }

    #[test]
    fn recover_primitive_xt_matches_seeded_table() {
        let mut image = Image::new(DEFAULT_CORE_SIZE);
        let seeded = seed_primitives(&mut image).unwrap();
        let recovered = recover_primitive_xt(&image);
        assert_eq!(seeded, recovered);
    }

    #[test]
    fn bootstrap_source_defines_control_flow_words() {
        use crate::messages::DebugLevel;
        let vm = crate::runtime::Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        for name in [
            "if", "else", "then", "begin", "until", "not", "rot", "hex", "state", "[", "]",
            ":noname", "1+", "1-", "tab", "cr", ".(",
        ] {
            assert!(
                crate::internals::compiler::find(&vm, name).unwrap().is_some(),
                "expected bootstrap to define {}",
                name
            );
        }
    }

    #[test]
    fn bracket_words_toggle_compile_state_mid_definition() {
        use crate::messages::DebugLevel;
        let mut vm = crate::runtime::Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        // `[ 3 4 + ]` drops to interpret mode, computes 7 on the data
        // stack, then resumes compiling; the literal is folded into
        // `seven`'s body as an ordinary PUSH the same as any number typed
        // while already interpreting.
        vm.eval_str("<t>", ": seven [ 3 4 + ] ; seven").unwrap();
        assert_eq!(vm.image.pop_v().unwrap() as i32, 7);
    }

    #[test]
    fn noname_compiles_an_anonymous_word_and_leaves_its_xt() {
        use crate::messages::DebugLevel;
        let mut vm = crate::runtime::Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.eval_str("<t>", ":noname dup * ;").unwrap();
        assert!(!vm.is_invalid());
        // :noname pushes the new word's xt before compiling its body;
        // nothing has popped it, so it is still sitting on the stack.
        assert!(vm.image.pop_v().unwrap() as usize >= crate::kernel::DICTIONARY_START);
    }

    #[test]
    fn dot_paren_comment_prints_up_to_closing_paren() {
        use crate::messages::DebugLevel;
        let mut vm = crate::runtime::Vm::cold_start(DEFAULT_CORE_SIZE, DebugLevel::Warning).unwrap();
        vm.eval_str("<t>", ".( hi )").unwrap();
        assert!(!vm.is_invalid());
    }
}
