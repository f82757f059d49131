//! Two-scope symbol tables for the compilation engine.
//!
//! A class-level table (statics and fields) lives for one class; a
//! subroutine-level table (arguments and locals) is reset at every
//! subroutine declaration. Lookup tries the subroutine scope first.

use hack_core::vm::Segment;
use std::fmt;

/// Classification of a declared identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Static,
    Field,
    Arg,
    Var,
}

impl Kind {
    /// VM segment holding variables of this kind. Total by construction:
    /// a new kind cannot compile without a segment.
    pub fn segment(&self) -> Segment {
        match self {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Arg => Segment::Argument,
            Kind::Var => Segment::Local,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Static => "static",
            Kind::Field => "field",
            Kind::Arg => "argument",
            Kind::Var => "local",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One table row: declared type, kind, and 0-based index within the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub ty: String,
    pub kind: Kind,
    pub index: u16,
}

/// One scope worth of declarations, in insertion order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: Vec<(String, Entry)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Empty the table and reset every kind counter to 0.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Declare `name`. The assigned index is the number of entries of
    /// `kind` already present.
    pub fn define(&mut self, name: &str, ty: &str, kind: Kind) -> Result<(), String> {
        if self.get(name).is_some() {
            return Err(format!("'{}' is already defined in this scope", name));
        }
        let index = self.count(kind);
        self.entries.push((
            name.to_string(),
            Entry {
                ty: ty.to_string(),
                kind,
                index,
            },
        ));
        Ok(())
    }

    /// Number of entries of the given kind.
    pub fn count(&self, kind: Kind) -> u16 {
        self.entries.iter().filter(|(_, e)| e.kind == kind).count() as u16
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }

    pub fn kind_of(&self, name: &str) -> Result<Kind, String> {
        self.get(name)
            .map(|e| e.kind)
            .ok_or_else(|| unknown(name))
    }

    pub fn type_of(&self, name: &str) -> Result<&str, String> {
        self.get(name)
            .map(|e| e.ty.as_str())
            .ok_or_else(|| unknown(name))
    }

    pub fn index_of(&self, name: &str) -> Result<u16, String> {
        self.get(name)
            .map(|e| e.index)
            .ok_or_else(|| unknown(name))
    }
}

fn unknown(name: &str) -> String {
    format!("unknown identifier '{}'", name)
}

/// The pair of scopes alive while compiling a class.
#[derive(Debug, Default)]
pub struct SymbolContext {
    class: SymbolTable,
    subroutine: SymbolTable,
}

impl SymbolContext {
    pub fn new() -> Self {
        SymbolContext::default()
    }

    /// Route a declaration to its scope: statics and fields are
    /// class-level, arguments and locals subroutine-level.
    pub fn define(&mut self, name: &str, ty: &str, kind: Kind) -> Result<(), String> {
        match kind {
            Kind::Static | Kind::Field => self.class.define(name, ty, kind),
            Kind::Arg | Kind::Var => self.subroutine.define(name, ty, kind),
        }
    }

    /// Clear the subroutine scope at a subroutine declaration.
    pub fn start_subroutine(&mut self) {
        self.subroutine.reset();
    }

    /// Subroutine scope first, class scope second.
    pub fn resolve(&self, name: &str) -> Option<&Entry> {
        self.subroutine.get(name).or_else(|| self.class.get(name))
    }

    pub fn field_count(&self) -> u16 {
        self.class.count(Kind::Field)
    }

    pub fn local_count(&self) -> u16 {
        self.subroutine.count(Kind::Var)
    }
}
