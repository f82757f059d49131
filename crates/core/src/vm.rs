//! The VM command model shared by the compiler back end and the translator
//! front end.
//!
//! `Display` renders the canonical textual form (lower-case opcode,
//! space-separated operands), which is exactly what the compiler emits and
//! what [`VmCommand::parse`] accepts back.

use std::fmt;

/// The eight virtual memory segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }

    pub fn lookup(name: &str) -> Option<Segment> {
        let seg = match name {
            "constant" => Segment::Constant,
            "argument" => Segment::Argument,
            "local" => Segment::Local,
            "static" => Segment::Static,
            "this" => Segment::This,
            "that" => Segment::That,
            "pointer" => Segment::Pointer,
            "temp" => Segment::Temp,
            _ => return None,
        };
        Some(seg)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The nine arithmetic-logical commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl VmOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            VmOp::Add => "add",
            VmOp::Sub => "sub",
            VmOp::Neg => "neg",
            VmOp::Eq => "eq",
            VmOp::Gt => "gt",
            VmOp::Lt => "lt",
            VmOp::And => "and",
            VmOp::Or => "or",
            VmOp::Not => "not",
        }
    }

    pub fn lookup(name: &str) -> Option<VmOp> {
        let op = match name {
            "add" => VmOp::Add,
            "sub" => VmOp::Sub,
            "neg" => VmOp::Neg,
            "eq" => VmOp::Eq,
            "gt" => VmOp::Gt,
            "lt" => VmOp::Lt,
            "and" => VmOp::And,
            "or" => VmOp::Or,
            "not" => VmOp::Not,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for VmOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of a VM command, mirroring the classic C_* constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Arithmetic,
    Push,
    Pop,
    Label,
    Goto,
    If,
    Function,
    Call,
    Return,
}

/// One parsed VM command.
#[derive(Debug, Clone, PartialEq)]
pub enum VmCommand {
    Arithmetic(VmOp),
    Push { segment: Segment, index: u16 },
    Pop { segment: Segment, index: u16 },
    Label(String),
    Goto(String),
    If(String),
    Function { name: String, locals: u16 },
    Call { name: String, args: u16 },
    Return,
}

impl VmCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            VmCommand::Arithmetic(_) => CommandKind::Arithmetic,
            VmCommand::Push { .. } => CommandKind::Push,
            VmCommand::Pop { .. } => CommandKind::Pop,
            VmCommand::Label(_) => CommandKind::Label,
            VmCommand::Goto(_) => CommandKind::Goto,
            VmCommand::If(_) => CommandKind::If,
            VmCommand::Function { .. } => CommandKind::Function,
            VmCommand::Call { .. } => CommandKind::Call,
            VmCommand::Return => CommandKind::Return,
        }
    }

    /// Parse one comment-free, non-blank line of VM text.
    ///
    /// Fields are whitespace-separated; keywords are case-sensitive.
    pub fn parse(line: &str) -> Result<VmCommand, String> {
        let mut fields = line.split_whitespace();
        let op = fields.next().ok_or("empty command")?;
        let arg1 = fields.next();
        let arg2 = fields.next();
        if fields.next().is_some() {
            return Err(format!("too many fields in command '{}'", line.trim()));
        }

        let cmd = match op {
            "push" | "pop" => {
                let seg_name = arg1.ok_or_else(|| format!("'{}' requires a segment", op))?;
                let segment = Segment::lookup(seg_name)
                    .ok_or_else(|| format!("unknown segment '{}'", seg_name))?;
                let index = parse_index(op, arg2)?;
                if op == "push" {
                    VmCommand::Push { segment, index }
                } else {
                    VmCommand::Pop { segment, index }
                }
            }
            "label" | "goto" | "if-goto" => {
                let label = arg1
                    .ok_or_else(|| format!("'{}' requires a label", op))?
                    .to_string();
                if arg2.is_some() {
                    return Err(format!("too many fields in command '{}'", line.trim()));
                }
                match op {
                    "label" => VmCommand::Label(label),
                    "goto" => VmCommand::Goto(label),
                    _ => VmCommand::If(label),
                }
            }
            "function" | "call" => {
                let name = arg1
                    .ok_or_else(|| format!("'{}' requires a function name", op))?
                    .to_string();
                let count = parse_index(op, arg2)?;
                if op == "function" {
                    VmCommand::Function {
                        name,
                        locals: count,
                    }
                } else {
                    VmCommand::Call { name, args: count }
                }
            }
            "return" => {
                if arg1.is_some() {
                    return Err(format!("too many fields in command '{}'", line.trim()));
                }
                VmCommand::Return
            }
            other => match VmOp::lookup(other) {
                Some(vm_op) => {
                    if arg1.is_some() {
                        return Err(format!("too many fields in command '{}'", line.trim()));
                    }
                    VmCommand::Arithmetic(vm_op)
                }
                None => return Err(format!("unknown command '{}'", other)),
            },
        };
        Ok(cmd)
    }
}

fn parse_index(op: &str, field: Option<&str>) -> Result<u16, String> {
    let text = field.ok_or_else(|| format!("'{}' requires a numeric operand", op))?;
    text.parse::<u16>()
        .map_err(|_| format!("'{}' operand '{}' is not a non-negative integer", op, text))
}

impl fmt::Display for VmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmCommand::Arithmetic(op) => write!(f, "{}", op),
            VmCommand::Push { segment, index } => write!(f, "push {} {}", segment, index),
            VmCommand::Pop { segment, index } => write!(f, "pop {} {}", segment, index),
            VmCommand::Label(label) => write!(f, "label {}", label),
            VmCommand::Goto(label) => write!(f, "goto {}", label),
            VmCommand::If(label) => write!(f, "if-goto {}", label),
            VmCommand::Function { name, locals } => write!(f, "function {} {}", name, locals),
            VmCommand::Call { name, args } => write!(f, "call {} {}", name, args),
            VmCommand::Return => write!(f, "return"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_push_pop() {
        assert_eq!(
            VmCommand::parse("push constant 7").unwrap(),
            VmCommand::Push {
                segment: Segment::Constant,
                index: 7
            }
        );
        assert_eq!(
            VmCommand::parse("pop local 2").unwrap(),
            VmCommand::Pop {
                segment: Segment::Local,
                index: 2
            }
        );
    }

    #[test]
    fn test_parse_arithmetic() {
        for (text, op) in [("add", VmOp::Add), ("neg", VmOp::Neg), ("not", VmOp::Not)] {
            assert_eq!(
                VmCommand::parse(text).unwrap(),
                VmCommand::Arithmetic(op),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_parse_branching_and_functions() {
        assert_eq!(
            VmCommand::parse("if-goto LOOP").unwrap(),
            VmCommand::If("LOOP".to_string())
        );
        assert_eq!(
            VmCommand::parse("function Main.main 3").unwrap(),
            VmCommand::Function {
                name: "Main.main".to_string(),
                locals: 3
            }
        );
        assert_eq!(
            VmCommand::parse("call Math.multiply 2").unwrap(),
            VmCommand::Call {
                name: "Math.multiply".to_string(),
                args: 2
            }
        );
        assert_eq!(VmCommand::parse("return").unwrap(), VmCommand::Return);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(VmCommand::parse("push constant").is_err());
        assert!(VmCommand::parse("push nowhere 3").is_err());
        assert!(VmCommand::parse("push constant -1").is_err());
        assert!(VmCommand::parse("pop local x").is_err());
        assert!(VmCommand::parse("frobnicate").is_err());
        assert!(VmCommand::parse("add 1").is_err());
        assert!(VmCommand::parse("return 0").is_err());
        assert!(VmCommand::parse("goto").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for text in [
            "push constant 7",
            "pop that 0",
            "add",
            "label WHILE_EXP_Main_0",
            "goto WHILE_EXP_Main_0",
            "if-goto IF_FALSE_Main_1",
            "function Sys.init 0",
            "call Memory.alloc 1",
            "return",
        ] {
            let cmd = VmCommand::parse(text).unwrap();
            assert_eq!(cmd.to_string(), text);
        }
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            VmCommand::parse("sub").unwrap().kind(),
            CommandKind::Arithmetic
        );
        assert_eq!(
            VmCommand::parse("push temp 1").unwrap().kind(),
            CommandKind::Push
        );
        assert_eq!(VmCommand::parse("return").unwrap().kind(), CommandKind::Return);
    }
}
