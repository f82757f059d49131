//! Hack assembly generation for VM commands.
//!
//! Emits into a text buffer, one instruction or `(LABEL)` per line, no
//! comments or blank lines. The writer owns three pieces of context that
//! must persist across commands: a monotone label counter (comparison and
//! call-return labels), the current function name (qualifies branch
//! labels), and the current input file stem (namespaces statics).

use hack_core::mem;
use hack_core::vm::{CommandKind, Segment, VmOp};
use std::fmt::{self, Write as _};

/// Error type for assembly generation.
///
/// Allows `?` over both logical errors (illegal commands) and formatting
/// errors while writing the output text.
#[derive(Debug)]
pub enum CodeWriterError {
    /// An illegal VM command (e.g. `pop constant`, pointer index 2)
    Logic(String),
    /// A formatting error when writing assembly
    Format(fmt::Error),
}

impl fmt::Display for CodeWriterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeWriterError::Logic(s) => write!(f, "{}", s),
            CodeWriterError::Format(e) => write!(f, "assembly generation error: {}", e),
        }
    }
}

impl std::error::Error for CodeWriterError {}

impl From<String> for CodeWriterError {
    fn from(s: String) -> Self {
        CodeWriterError::Logic(s)
    }
}

impl From<fmt::Error> for CodeWriterError {
    fn from(e: fmt::Error) -> Self {
        CodeWriterError::Format(e)
    }
}

/// Translates VM commands into Hack assembly text.
pub struct CodeWriter {
    out: String,
    /// Monotone across the whole output file; never reset.
    label_counter: usize,
    /// Most recent `function` command; qualifies branch labels.
    current_func: Option<String>,
    /// Stem of the input file being translated; namespaces statics.
    file_stem: Option<String>,
}

impl CodeWriter {
    pub fn new() -> Self {
        CodeWriter {
            out: String::new(),
            label_counter: 0,
            current_func: None,
            file_stem: None,
        }
    }

    /// A translation of a new VM input file has started. Statics emitted
    /// from now on resolve as `<stem>.<index>`.
    pub fn set_file_name(&mut self, stem: &str) {
        self.file_stem = Some(stem.to_string());
    }

    /// Bootstrap: `SP = 256`, then `call Sys.init 0`. Must be the first
    /// output of a multi-file translation.
    pub fn write_init(&mut self) -> Result<(), CodeWriterError> {
        writeln!(self.out, "@{}", mem::STACK_BASE)?;
        writeln!(self.out, "D=A")?;
        writeln!(self.out, "@{}", mem::SP)?;
        writeln!(self.out, "M=D")?;
        self.write_call("Sys.init", 0)
    }

    pub fn write_push_pop(
        &mut self,
        kind: CommandKind,
        segment: Segment,
        index: u16,
    ) -> Result<(), CodeWriterError> {
        match kind {
            CommandKind::Push => self.write_push(segment, index),
            CommandKind::Pop => self.write_pop(segment, index),
            other => Err(CodeWriterError::Logic(format!(
                "translator bug: write_push_pop called with {:?}",
                other
            ))),
        }
    }

    fn write_push(&mut self, segment: Segment, index: u16) -> Result<(), CodeWriterError> {
        match segment {
            Segment::Constant => {
                writeln!(self.out, "@{}", index)?;
                writeln!(self.out, "D=A")?;
                self.push_d()?;
            }
            Segment::Argument | Segment::Local | Segment::This | Segment::That => {
                let base = self.segment_base(segment)?;
                writeln!(self.out, "@{}", index)?;
                writeln!(self.out, "D=A")?;
                writeln!(self.out, "@{}", base)?;
                writeln!(self.out, "D=M+D")?;
                writeln!(self.out, "A=D")?;
                writeln!(self.out, "D=M")?;
                self.push_d()?;
            }
            Segment::Static => {
                let symbol = self.static_symbol(index)?;
                writeln!(self.out, "@{}", symbol)?;
                writeln!(self.out, "D=M")?;
                self.push_d()?;
            }
            Segment::Temp => {
                writeln!(self.out, "@{}", index)?;
                writeln!(self.out, "D=A")?;
                writeln!(self.out, "@{}", mem::TEMP_BASE)?;
                writeln!(self.out, "A=A+D")?;
                writeln!(self.out, "D=M")?;
                self.push_d()?;
            }
            Segment::Pointer => {
                let register = self.pointer_target(index)?;
                writeln!(self.out, "@{}", register)?;
                writeln!(self.out, "D=M")?;
                self.push_d()?;
            }
        }
        Ok(())
    }

    fn write_pop(&mut self, segment: Segment, index: u16) -> Result<(), CodeWriterError> {
        match segment {
            Segment::Constant => {
                return Err(CodeWriterError::Logic(
                    "cannot pop to the constant segment".to_string(),
                ));
            }
            Segment::Argument | Segment::Local | Segment::This | Segment::That => {
                // target address into R13 first; A must not be re-read
                // after it changes
                let base = self.segment_base(segment)?;
                writeln!(self.out, "@{}", index)?;
                writeln!(self.out, "D=A")?;
                writeln!(self.out, "@{}", base)?;
                writeln!(self.out, "D=M+D")?;
                self.store_d_via_r13()?;
            }
            Segment::Static => {
                let symbol = self.static_symbol(index)?;
                self.pop_to_d()?;
                writeln!(self.out, "@{}", symbol)?;
                writeln!(self.out, "M=D")?;
            }
            Segment::Temp => {
                writeln!(self.out, "@{}", index)?;
                writeln!(self.out, "D=A")?;
                writeln!(self.out, "@{}", mem::TEMP_BASE)?;
                writeln!(self.out, "D=A+D")?;
                self.store_d_via_r13()?;
            }
            Segment::Pointer => {
                let register = self.pointer_target(index)?;
                self.pop_to_d()?;
                writeln!(self.out, "@{}", register)?;
                writeln!(self.out, "M=D")?;
            }
        }
        Ok(())
    }

    pub fn write_arithmetic(&mut self, op: VmOp) -> Result<(), CodeWriterError> {
        match op {
            VmOp::Add => self.binary_op("M=D+M"),
            VmOp::Sub => self.binary_op("M=M-D"),
            VmOp::And => self.binary_op("M=D&M"),
            VmOp::Or => self.binary_op("M=D|M"),
            VmOp::Neg => self.unary_op("M=-M"),
            VmOp::Not => self.unary_op("M=!M"),
            VmOp::Eq => self.compare_op("ZERO", "JEQ"),
            VmOp::Gt => self.compare_op("POSITIVE", "JGT"),
            VmOp::Lt => self.compare_op("NEGATIVE", "JLT"),
        }
    }

    pub fn write_label(&mut self, label: &str) -> Result<(), CodeWriterError> {
        let name = self.qualified(label);
        writeln!(self.out, "({})", name)?;
        Ok(())
    }

    pub fn write_goto(&mut self, label: &str) -> Result<(), CodeWriterError> {
        let name = self.qualified(label);
        writeln!(self.out, "@{}", name)?;
        writeln!(self.out, "0;JMP")?;
        Ok(())
    }

    /// `if-goto`: pop, jump when non-zero.
    pub fn write_if(&mut self, label: &str) -> Result<(), CodeWriterError> {
        let name = self.qualified(label);
        self.pop_to_d()?;
        writeln!(self.out, "@{}", name)?;
        writeln!(self.out, "D;JNE")?;
        Ok(())
    }

    /// `function f k`: entry label, then k zeroed locals. The label is the
    /// bare function name; only branch labels get qualified.
    pub fn write_function(&mut self, name: &str, locals: u16) -> Result<(), CodeWriterError> {
        writeln!(self.out, "({})", name)?;
        self.current_func = Some(name.to_string());
        for _ in 0..locals {
            self.write_push(Segment::Constant, 0)?;
        }
        Ok(())
    }

    /// `call f n`: save the caller frame, reposition ARG and LCL, jump.
    /// The return-address label must be unique per call site.
    pub fn write_call(&mut self, name: &str, args: u16) -> Result<(), CodeWriterError> {
        let ret = format!("{}$ret.{}", name, self.fresh_label());
        // push returnAddress
        writeln!(self.out, "@{}", ret)?;
        writeln!(self.out, "D=A")?;
        self.push_d()?;
        // push LCL, ARG, THIS, THAT
        for register in [mem::LCL, mem::ARG, mem::THIS, mem::THAT] {
            writeln!(self.out, "@{}", register)?;
            writeln!(self.out, "D=M")?;
            self.push_d()?;
        }
        // ARG = SP - 5 - nArgs
        writeln!(self.out, "@{}", mem::SP)?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@5")?;
        writeln!(self.out, "D=D-A")?;
        writeln!(self.out, "@{}", args)?;
        writeln!(self.out, "D=D-A")?;
        writeln!(self.out, "@{}", mem::ARG)?;
        writeln!(self.out, "M=D")?;
        // LCL = SP
        writeln!(self.out, "@{}", mem::SP)?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@{}", mem::LCL)?;
        writeln!(self.out, "M=D")?;
        // transfer control, land back here afterwards
        writeln!(self.out, "@{}", name)?;
        writeln!(self.out, "0;JMP")?;
        writeln!(self.out, "({})", ret)?;
        Ok(())
    }

    /// `return`: restore the caller frame. `endFrame` lives in R13 and
    /// `retAddr` in R14 so nested returns cannot clobber each other.
    pub fn write_return(&mut self) -> Result<(), CodeWriterError> {
        // endFrame = LCL
        writeln!(self.out, "@{}", mem::LCL)?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@{}", mem::R13)?;
        writeln!(self.out, "M=D")?;
        // retAddr = *(endFrame - 5); saved before *ARG is overwritten,
        // which matters when nArgs is 0
        writeln!(self.out, "@5")?;
        writeln!(self.out, "D=A")?;
        writeln!(self.out, "@{}", mem::R13)?;
        writeln!(self.out, "A=M-D")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@{}", mem::R14)?;
        writeln!(self.out, "M=D")?;
        // *ARG = pop()
        self.pop_to_d()?;
        writeln!(self.out, "@{}", mem::ARG)?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "M=D")?;
        // SP = ARG + 1
        writeln!(self.out, "@{}", mem::ARG)?;
        writeln!(self.out, "D=M+1")?;
        writeln!(self.out, "@{}", mem::SP)?;
        writeln!(self.out, "M=D")?;
        // THAT, THIS, ARG, LCL = *(endFrame - 1..4)
        for (offset, register) in [mem::THAT, mem::THIS, mem::ARG, mem::LCL]
            .into_iter()
            .enumerate()
        {
            writeln!(self.out, "@{}", mem::R13)?;
            writeln!(self.out, "A=M-1")?;
            for _ in 0..offset {
                writeln!(self.out, "A=A-1")?;
            }
            writeln!(self.out, "D=M")?;
            writeln!(self.out, "@{}", register)?;
            writeln!(self.out, "M=D")?;
        }
        // goto retAddr
        writeln!(self.out, "@{}", mem::R14)?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "0;JMP")?;
        Ok(())
    }

    /// The accumulated assembly text.
    pub fn finish(self) -> String {
        self.out
    }

    // ----- helpers ---------------------------------------------------------

    fn fresh_label(&mut self) -> usize {
        self.label_counter += 1;
        self.label_counter
    }

    fn qualified(&self, label: &str) -> String {
        match &self.current_func {
            Some(func) => format!("{}${}", func, label),
            None => label.to_string(),
        }
    }

    fn segment_base(&self, segment: Segment) -> Result<&'static str, CodeWriterError> {
        mem::segment_pointer(segment).ok_or_else(|| {
            CodeWriterError::Logic(format!(
                "translator bug: segment '{}' has no base pointer",
                segment
            ))
        })
    }

    fn static_symbol(&self, index: u16) -> Result<String, CodeWriterError> {
        match &self.file_stem {
            Some(stem) => Ok(format!("{}.{}", stem, index)),
            None => Err(CodeWriterError::Logic(
                "translator bug: static reference before set_file_name".to_string(),
            )),
        }
    }

    fn pointer_target(&self, index: u16) -> Result<&'static str, CodeWriterError> {
        mem::pointer_register(index).ok_or_else(|| {
            CodeWriterError::Logic(format!("pointer index must be 0 or 1, got {}", index))
        })
    }

    /// `*SP = D; SP++`
    fn push_d(&mut self) -> Result<(), CodeWriterError> {
        writeln!(self.out, "@{}", mem::SP)?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "M=D")?;
        writeln!(self.out, "@{}", mem::SP)?;
        writeln!(self.out, "M=M+1")?;
        Ok(())
    }

    /// `SP--; D = *SP`
    fn pop_to_d(&mut self) -> Result<(), CodeWriterError> {
        writeln!(self.out, "@{}", mem::SP)?;
        writeln!(self.out, "M=M-1")?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "D=M")?;
        Ok(())
    }

    /// With the target address in D: stash it in R13, pop into it.
    fn store_d_via_r13(&mut self) -> Result<(), CodeWriterError> {
        writeln!(self.out, "@{}", mem::R13)?;
        writeln!(self.out, "M=D")?;
        self.pop_to_d()?;
        writeln!(self.out, "@{}", mem::R13)?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "M=D")?;
        Ok(())
    }

    /// Pop y into D, operate against x in place.
    fn binary_op(&mut self, comp: &str) -> Result<(), CodeWriterError> {
        self.pop_to_d()?;
        writeln!(self.out, "A=A-1")?;
        writeln!(self.out, "{}", comp)?;
        Ok(())
    }

    /// Operate on the top of the stack in place.
    fn unary_op(&mut self, comp: &str) -> Result<(), CodeWriterError> {
        writeln!(self.out, "@{}", mem::SP)?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "A=A-1")?;
        writeln!(self.out, "{}", comp)?;
        Ok(())
    }

    /// `x - y` against zero: true is -1 (all ones) so the result composes
    /// with and/or/not.
    fn compare_op(&mut self, tag: &str, jump: &str) -> Result<(), CodeWriterError> {
        let n = self.fresh_label();
        self.pop_to_d()?;
        writeln!(self.out, "A=A-1")?;
        writeln!(self.out, "D=M-D")?;
        writeln!(self.out, "M=0")?;
        writeln!(self.out, "@{}{}", tag, n)?;
        writeln!(self.out, "D;{}", jump)?;
        writeln!(self.out, "@END{}", n)?;
        writeln!(self.out, "0;JMP")?;
        writeln!(self.out, "({}{})", tag, n)?;
        writeln!(self.out, "@{}", mem::SP)?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "A=A-1")?;
        writeln!(self.out, "M=-1")?;
        writeln!(self.out, "(END{})", n)?;
        Ok(())
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        CodeWriter::new()
    }
}
