// Loads source files named on the command line into a running VM, one
// after another, in the order given. The per-file reading and
// tokenizing itself lives in `internals::input::InputSource`; this
// module is just the thin "walk the file list" driver the CLI hands
// off to, in the spirit of the teacher's own `FileHandle`-based loader
// here but built on top of the VM's input-source stack instead of a
// standalone reader type.

use crate::error::VmFault;
use crate::runtime::Vm;
use std::path::Path;

/// Loads each file in order, stopping early if one sets `exit_flag`
/// (e.g. by running `bye`) or a fatal fault escapes.
pub fn load_files(vm: &mut Vm, paths: &[impl AsRef<Path>]) -> Result<(), VmFault> {
    for path in paths {
        if vm.exit_flag {
            break;
        }
        vm.load_file(path.as_ref())?;
    }
    Ok(())
}
