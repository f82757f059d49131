//! The Hack memory map as seen by the VM translator.
//!
//! These names are predefined symbols of the downstream assembler; the
//! translator emits them verbatim in `@` instructions.

use crate::vm::Segment;

/// Stack pointer register.
pub const SP: &str = "SP";
/// Base-pointer registers for the four indirect segments.
pub const LCL: &str = "LCL";
pub const ARG: &str = "ARG";
pub const THIS: &str = "THIS";
pub const THAT: &str = "THAT";

/// General-purpose scratch registers, free between VM commands.
pub const R13: &str = "R13";
pub const R14: &str = "R14";
pub const R15: &str = "R15";

/// First RAM address of the `temp` segment (RAM[5]..RAM[12]).
pub const TEMP_BASE: u16 = 5;

/// The stack occupies RAM[256] upward.
pub const STACK_BASE: u16 = 256;

/// Base-pointer register backing an indirect segment, if it has one.
///
/// `constant`, `static`, `pointer` and `temp` are addressed differently
/// and return `None`.
pub fn segment_pointer(segment: Segment) -> Option<&'static str> {
    match segment {
        Segment::Argument => Some(ARG),
        Segment::Local => Some(LCL),
        Segment::This => Some(THIS),
        Segment::That => Some(THAT),
        Segment::Constant | Segment::Static | Segment::Pointer | Segment::Temp => None,
    }
}

/// Register accessed by `pointer 0` / `pointer 1`; other indices are illegal.
pub fn pointer_register(index: u16) -> Option<&'static str> {
    match index {
        0 => Some(THIS),
        1 => Some(THAT),
        _ => None,
    }
}
