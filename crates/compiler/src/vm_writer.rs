//! Emitter for canonical VM text.
//!
//! Each call appends exactly one line to the internal buffer; the driver
//! owns the actual file (and the optional stdout tee).

use hack_core::vm::{Segment, VmOp};
use std::fmt::{self, Write as _};

/// Formats VM commands into a text buffer.
#[derive(Debug, Default)]
pub struct VmWriter {
    out: String,
}

impl VmWriter {
    pub fn new() -> Self {
        VmWriter::default()
    }

    pub fn write_push(&mut self, segment: Segment, index: u16) -> fmt::Result {
        writeln!(self.out, "push {} {}", segment, index)
    }

    pub fn write_pop(&mut self, segment: Segment, index: u16) -> fmt::Result {
        writeln!(self.out, "pop {} {}", segment, index)
    }

    pub fn write_arithmetic(&mut self, op: VmOp) -> fmt::Result {
        writeln!(self.out, "{}", op)
    }

    pub fn write_label(&mut self, label: &str) -> fmt::Result {
        writeln!(self.out, "label {}", label)
    }

    pub fn write_goto(&mut self, label: &str) -> fmt::Result {
        writeln!(self.out, "goto {}", label)
    }

    pub fn write_if(&mut self, label: &str) -> fmt::Result {
        writeln!(self.out, "if-goto {}", label)
    }

    pub fn write_call(&mut self, name: &str, n_args: u16) -> fmt::Result {
        writeln!(self.out, "call {} {}", name, n_args)
    }

    pub fn write_function(&mut self, name: &str, n_locals: u16) -> fmt::Result {
        writeln!(self.out, "function {} {}", name, n_locals)
    }

    pub fn write_return(&mut self) -> fmt::Result {
        writeln!(self.out, "return")
    }

    /// The accumulated VM text.
    pub fn finish(self) -> String {
        self.out
    }
}
