//////////////////////////////////////////////////////////////
/// coredump.rs
///
/// Whole-image persistence: `dump` writes every cell of the running
/// image to a file, and `load_core_image` reads one back, rejecting a
/// file whose recorded cell width or size disagrees with this build's
/// `INFO` register. Grounded on the teacher's file-handling style in
/// `files.rs`/`internals/files.rs` (buffered I/O, failures reported
/// through `Msg` rather than panics) applied to the whole core instead
/// of a single string.
use crate::error::VmFault;
use crate::kernel::{Cell, Image, CELL_BYTES};
use crate::runtime::Vm;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// `dump ( s-addr -- )` writes the entire image to the file named by
/// the packed string at `s-addr`.
pub fn op_dump(vm: &mut Vm) -> Result<(), VmFault> {
    let addr = vm.image.pop_v()? as usize;
    let name_bytes = vm.image.read_packed(addr)?;
    let name = String::from_utf8_lossy(&name_bytes).to_string();
    match dump_to_path(&vm.image, Path::new(&name)) {
        Ok(()) => {}
        Err(e) => vm.msg.error("dump", "failed to write core image", Some(e.to_string())),
    }
    Ok(())
}

pub fn dump_to_path(image: &Image, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    let mut buf = Vec::with_capacity(image.core_size() * CELL_BYTES as usize);
    for cell in image.as_cells() {
        buf.extend_from_slice(&cell.to_le_bytes());
    }
    file.write_all(&buf)
}

/// Loads a previously dumped image, rejecting one whose `INFO` register
/// doesn't match this build's cell width, or whose byte length doesn't
/// match its own recorded core size.
pub fn load_core_image(path: &Path) -> Result<Image, VmFault> {
    let mut file = File::open(path).map_err(|_| VmFault::OutOfBounds {
        context: "load_core_image",
        index: -1,
    })?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(|_| VmFault::OutOfBounds {
        context: "load_core_image",
        index: -1,
    })?;
    if buf.len() % CELL_BYTES as usize != 0 {
        return Err(VmFault::CoreWidthMismatch {
            expected: CELL_BYTES,
            found: (buf.len() % CELL_BYTES as usize) as u32,
        });
    }
    let cells: Vec<Cell> = buf
        .chunks(CELL_BYTES as usize)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    let image = Image::from_cells(cells);
    if image.info_width() != CELL_BYTES {
        return Err(VmFault::CoreWidthMismatch {
            expected: CELL_BYTES,
            found: image.info_width(),
        });
    }
    if image.info_core_size() as usize != image.core_size() {
        return Err(VmFault::CoreWidthMismatch {
            expected: image.core_size() as u32,
            found: image.info_core_size(),
        });
    }
    Ok(image)
}
