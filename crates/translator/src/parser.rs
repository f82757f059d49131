//! Line parser for VM source files.
//!
//! Blank lines and `//` comments (whole-line or trailing) are stripped up
//! front, keeping each surviving command's original line number for error
//! reporting. `advance()` parses the next line into a typed command.

use hack_core::vm::{CommandKind, VmCommand};

/// Streams the commands of one VM file.
pub struct VmParser {
    /// (1-indexed source line, command text)
    lines: Vec<(usize, String)>,
    /// Index of the *next* line to be consumed by `advance()`.
    next: usize,
    current: Option<(usize, VmCommand)>,
}

impl VmParser {
    pub fn new(source: &str) -> Self {
        let lines = source
            .lines()
            .enumerate()
            .filter_map(|(i, raw)| {
                let text = raw.split("//").next().unwrap_or("").trim();
                if text.is_empty() {
                    None
                } else {
                    Some((i + 1, text.to_string()))
                }
            })
            .collect();
        VmParser {
            lines,
            next: 0,
            current: None,
        }
    }

    /// Are there more commands in the input?
    pub fn has_more(&self) -> bool {
        self.next < self.lines.len()
    }

    /// Parse the next command and make it current. Unknown opcodes,
    /// unknown segments, and malformed operands are fatal with the line
    /// number.
    pub fn advance(&mut self) -> Result<(), String> {
        let (line_no, text) = self
            .lines
            .get(self.next)
            .ok_or("no more commands to read")?;
        let command =
            VmCommand::parse(text).map_err(|e| format!("line {}: {}", line_no, e))?;
        self.current = Some((*line_no, command));
        self.next += 1;
        Ok(())
    }

    /// The current command; `None` before the first `advance()`.
    pub fn command(&self) -> Option<&VmCommand> {
        self.current.as_ref().map(|(_, c)| c)
    }

    /// 1-indexed source line of the current command.
    pub fn line_number(&self) -> Option<usize> {
        self.current.as_ref().map(|(n, _)| *n)
    }

    pub fn command_kind(&self) -> Option<CommandKind> {
        self.command().map(VmCommand::kind)
    }

    /// First argument of the current command. For an arithmetic command
    /// this is the command itself; `return` has none.
    pub fn arg1(&self) -> Option<&str> {
        match self.command()? {
            VmCommand::Arithmetic(op) => Some(op.as_str()),
            VmCommand::Push { segment, .. } | VmCommand::Pop { segment, .. } => {
                Some(segment.as_str())
            }
            VmCommand::Label(label) | VmCommand::Goto(label) | VmCommand::If(label) => {
                Some(label)
            }
            VmCommand::Function { name, .. } | VmCommand::Call { name, .. } => Some(name),
            VmCommand::Return => None,
        }
    }

    /// Second argument; present only for push/pop/function/call.
    pub fn arg2(&self) -> Option<u16> {
        match self.command()? {
            VmCommand::Push { index, .. } | VmCommand::Pop { index, .. } => Some(*index),
            VmCommand::Function { locals, .. } => Some(*locals),
            VmCommand::Call { args, .. } => Some(*args),
            _ => None,
        }
    }
}
