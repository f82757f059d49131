//! Parse-tree dump in the classic analyzer XML format.
//!
//! Same grammar as the VM engine, but instead of translating, every token
//! is echoed as a leaf element inside structure elements. Useful for
//! eyeballing what the parser saw. No symbol tables are involved.

use crate::engine::{CompilationEngine, CompileError};
use crate::tokenizer::Tokenizer;
use hack_core::jack::{self, Keyword, TokenValue};
use std::fmt::Write as _;

/// Dumps one Jack class as an indented XML parse tree.
pub struct XmlEngine {
    toks: Tokenizer,
    out: String,
    depth: usize,
}

impl XmlEngine {
    pub fn new(toks: Tokenizer) -> Self {
        XmlEngine {
            toks,
            out: String::new(),
            depth: 0,
        }
    }

    // ----- emission --------------------------------------------------------

    fn open(&mut self, tag: &str) -> Result<(), CompileError> {
        writeln!(self.out, "{}<{}>", "  ".repeat(self.depth), tag)?;
        self.depth += 1;
        Ok(())
    }

    fn close(&mut self, tag: &str) -> Result<(), CompileError> {
        self.depth -= 1;
        writeln!(self.out, "{}</{}>", "  ".repeat(self.depth), tag)?;
        Ok(())
    }

    fn leaf(&mut self, tag: &str, text: &str) -> Result<(), CompileError> {
        writeln!(
            self.out,
            "{}<{}> {} </{}>",
            "  ".repeat(self.depth),
            tag,
            escape(text),
            tag
        )?;
        Ok(())
    }

    /// Echo the current token as a leaf element and advance.
    fn emit_token(&mut self) -> Result<(), CompileError> {
        let (tag, text) = match self.toks.current().map(|t| &t.value) {
            Some(TokenValue::Keyword(kw)) => ("keyword", kw.as_str().to_string()),
            Some(TokenValue::Symbol(c)) => ("symbol", c.to_string()),
            Some(TokenValue::Identifier(name)) => ("identifier", name.clone()),
            Some(TokenValue::IntConst(v)) => ("integerConstant", v.to_string()),
            Some(TokenValue::StringConst(s)) => ("stringConstant", s.clone()),
            None => return Err(self.expected("a token")),
        };
        self.leaf(tag, &text)?;
        self.toks.advance()?;
        Ok(())
    }

    // ----- parsing helpers -------------------------------------------------

    fn check_symbol(&self, want: char) -> bool {
        matches!(
            self.toks.current().map(|t| &t.value),
            Some(TokenValue::Symbol(c)) if *c == want
        )
    }

    fn check_keyword(&self, want: Keyword) -> bool {
        matches!(
            self.toks.current().map(|t| &t.value),
            Some(TokenValue::Keyword(kw)) if *kw == want
        )
    }

    fn emit_symbol(&mut self, want: char) -> Result<(), CompileError> {
        if self.check_symbol(want) {
            self.emit_token()
        } else {
            Err(self.expected(&format!("'{}'", want)))
        }
    }

    fn emit_keyword(&mut self, want: Keyword) -> Result<(), CompileError> {
        if self.check_keyword(want) {
            self.emit_token()
        } else {
            Err(self.expected(&format!("'{}'", want)))
        }
    }

    fn emit_identifier(&mut self) -> Result<(), CompileError> {
        self.toks.identifier()?;
        self.emit_token()
    }

    fn emit_type(&mut self) -> Result<(), CompileError> {
        match self.toks.current().map(|t| &t.value) {
            Some(TokenValue::Keyword(Keyword::Int | Keyword::Char | Keyword::Boolean))
            | Some(TokenValue::Identifier(_)) => self.emit_token(),
            _ => Err(self.expected("a type ('int', 'char', 'boolean', or a class name)")),
        }
    }

    fn expected(&self, what: &str) -> CompileError {
        let (line, column) = self.toks.position();
        match self.toks.current() {
            Some(tok) => CompileError::Source(format!(
                "expected {}, found '{}' at line {}, column {}",
                what,
                tok.value,
                line + 1,
                column + 1
            )),
            None => CompileError::Source(format!("expected {}, found end of file", what)),
        }
    }

    // ----- grammar ---------------------------------------------------------

    fn class(&mut self) -> Result<(), CompileError> {
        self.open("class")?;
        self.emit_keyword(Keyword::Class)?;
        self.emit_identifier()?;
        self.emit_symbol('{')?;
        while self.check_keyword(Keyword::Static) || self.check_keyword(Keyword::Field) {
            self.class_var_dec()?;
        }
        while self.check_keyword(Keyword::Constructor)
            || self.check_keyword(Keyword::Function)
            || self.check_keyword(Keyword::Method)
        {
            self.subroutine_dec()?;
        }
        self.emit_symbol('}')?;
        self.close("class")?;
        if self.toks.current().is_some() {
            return Err(self.expected("end of file after the class body"));
        }
        Ok(())
    }

    fn class_var_dec(&mut self) -> Result<(), CompileError> {
        self.open("classVarDec")?;
        self.emit_token()?; // static | field
        self.emit_type()?;
        self.emit_identifier()?;
        while self.check_symbol(',') {
            self.emit_token()?;
            self.emit_identifier()?;
        }
        self.emit_symbol(';')?;
        self.close("classVarDec")
    }

    fn subroutine_dec(&mut self) -> Result<(), CompileError> {
        self.open("subroutineDec")?;
        self.emit_token()?; // constructor | function | method
        if self.check_keyword(Keyword::Void) {
            self.emit_token()?;
        } else {
            self.emit_type()?;
        }
        self.emit_identifier()?;
        self.emit_symbol('(')?;
        self.parameter_list()?;
        self.emit_symbol(')')?;
        self.subroutine_body()?;
        self.close("subroutineDec")
    }

    fn parameter_list(&mut self) -> Result<(), CompileError> {
        self.open("parameterList")?;
        if !self.check_symbol(')') {
            self.emit_type()?;
            self.emit_identifier()?;
            while self.check_symbol(',') {
                self.emit_token()?;
                self.emit_type()?;
                self.emit_identifier()?;
            }
        }
        self.close("parameterList")
    }

    fn subroutine_body(&mut self) -> Result<(), CompileError> {
        self.open("subroutineBody")?;
        self.emit_symbol('{')?;
        while self.check_keyword(Keyword::Var) {
            self.var_dec()?;
        }
        self.statements()?;
        self.emit_symbol('}')?;
        self.close("subroutineBody")
    }

    fn var_dec(&mut self) -> Result<(), CompileError> {
        self.open("varDec")?;
        self.emit_keyword(Keyword::Var)?;
        self.emit_type()?;
        self.emit_identifier()?;
        while self.check_symbol(',') {
            self.emit_token()?;
            self.emit_identifier()?;
        }
        self.emit_symbol(';')?;
        self.close("varDec")
    }

    fn statements(&mut self) -> Result<(), CompileError> {
        self.open("statements")?;
        loop {
            let Ok(kw) = self.toks.keyword() else { break };
            match kw {
                Keyword::Let => self.let_statement()?,
                Keyword::If => self.if_statement()?,
                Keyword::While => self.while_statement()?,
                Keyword::Do => self.do_statement()?,
                Keyword::Return => self.return_statement()?,
                _ => return Err(self.expected("a statement")),
            }
        }
        self.close("statements")
    }

    fn let_statement(&mut self) -> Result<(), CompileError> {
        self.open("letStatement")?;
        self.emit_keyword(Keyword::Let)?;
        self.emit_identifier()?;
        if self.check_symbol('[') {
            self.emit_token()?;
            self.expression()?;
            self.emit_symbol(']')?;
        }
        self.emit_symbol('=')?;
        self.expression()?;
        self.emit_symbol(';')?;
        self.close("letStatement")
    }

    fn if_statement(&mut self) -> Result<(), CompileError> {
        self.open("ifStatement")?;
        self.emit_keyword(Keyword::If)?;
        self.emit_symbol('(')?;
        self.expression()?;
        self.emit_symbol(')')?;
        self.emit_symbol('{')?;
        self.statements()?;
        self.emit_symbol('}')?;
        if self.check_keyword(Keyword::Else) {
            self.emit_token()?;
            self.emit_symbol('{')?;
            self.statements()?;
            self.emit_symbol('}')?;
        }
        self.close("ifStatement")
    }

    fn while_statement(&mut self) -> Result<(), CompileError> {
        self.open("whileStatement")?;
        self.emit_keyword(Keyword::While)?;
        self.emit_symbol('(')?;
        self.expression()?;
        self.emit_symbol(')')?;
        self.emit_symbol('{')?;
        self.statements()?;
        self.emit_symbol('}')?;
        self.close("whileStatement")
    }

    fn do_statement(&mut self) -> Result<(), CompileError> {
        self.open("doStatement")?;
        self.emit_keyword(Keyword::Do)?;
        self.subroutine_call()?;
        self.emit_symbol(';')?;
        self.close("doStatement")
    }

    fn return_statement(&mut self) -> Result<(), CompileError> {
        self.open("returnStatement")?;
        self.emit_keyword(Keyword::Return)?;
        if !self.check_symbol(';') {
            self.expression()?;
        }
        self.emit_symbol(';')?;
        self.close("returnStatement")
    }

    /// Call tokens are emitted inline; there is no subroutineCall element
    /// in the dump format.
    fn subroutine_call(&mut self) -> Result<(), CompileError> {
        self.emit_identifier()?;
        if self.check_symbol('.') {
            self.emit_token()?;
            self.emit_identifier()?;
        }
        self.emit_symbol('(')?;
        self.expression_list()?;
        self.emit_symbol(')')?;
        Ok(())
    }

    fn expression(&mut self) -> Result<(), CompileError> {
        self.open("expression")?;
        self.term()?;
        loop {
            match self.toks.current().map(|t| &t.value) {
                Some(TokenValue::Symbol(c)) if jack::is_binary_op(*c) => {
                    self.emit_token()?;
                    self.term()?;
                }
                _ => break,
            }
        }
        self.close("expression")
    }

    fn term(&mut self) -> Result<(), CompileError> {
        self.open("term")?;
        match self.toks.current().map(|t| t.value.clone()) {
            Some(TokenValue::IntConst(_)) | Some(TokenValue::StringConst(_)) => {
                self.emit_token()?;
            }
            Some(TokenValue::Keyword(
                Keyword::True | Keyword::False | Keyword::Null | Keyword::This,
            )) => {
                self.emit_token()?;
            }
            Some(TokenValue::Symbol('(')) => {
                self.emit_token()?;
                self.expression()?;
                self.emit_symbol(')')?;
            }
            Some(TokenValue::Symbol(c)) if jack::is_unary_op(c) => {
                self.emit_token()?;
                self.term()?;
            }
            Some(TokenValue::Identifier(_)) => match self.toks.peek().map(|t| &t.value) {
                Some(TokenValue::Symbol('(')) | Some(TokenValue::Symbol('.')) => {
                    self.subroutine_call()?;
                }
                Some(TokenValue::Symbol('[')) => {
                    self.emit_token()?;
                    self.emit_symbol('[')?;
                    self.expression()?;
                    self.emit_symbol(']')?;
                }
                _ => self.emit_token()?,
            },
            _ => return Err(self.expected("a term")),
        }
        self.close("term")
    }

    fn expression_list(&mut self) -> Result<(), CompileError> {
        self.open("expressionList")?;
        if !self.check_symbol(')') {
            self.expression()?;
            while self.check_symbol(',') {
                self.emit_token()?;
                self.expression()?;
            }
        }
        self.close("expressionList")
    }
}

impl CompilationEngine for XmlEngine {
    fn output_extension(&self) -> &'static str {
        "xml"
    }

    fn compile_class(&mut self) -> Result<(), CompileError> {
        self.class()
    }

    fn finish(self: Box<Self>) -> String {
        self.out
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(source: &str) -> String {
        let toks = Tokenizer::new(source).unwrap();
        let mut engine = Box::new(XmlEngine::new(toks));
        engine.compile_class().unwrap();
        engine.finish()
    }

    #[test]
    fn test_minimal_class_dump() {
        let xml = dump("class Main { }");
        assert_eq!(
            xml,
            "<class>\n\
             \x20 <keyword> class </keyword>\n\
             \x20 <identifier> Main </identifier>\n\
             \x20 <symbol> { </symbol>\n\
             \x20 <symbol> } </symbol>\n\
             </class>\n"
        );
    }

    #[test]
    fn test_structure_elements_nest() {
        let xml = dump(
            "class Main { function void main() { var int x; let x = 1; return; } }",
        );
        for needle in [
            "<subroutineDec>",
            "<parameterList>",
            "</parameterList>",
            "<subroutineBody>",
            "<varDec>",
            "<statements>",
            "<letStatement>",
            "<returnStatement>",
            "<integerConstant> 1 </integerConstant>",
        ] {
            assert!(xml.contains(needle), "missing {} in:\n{}", needle, xml);
        }
    }

    #[test]
    fn test_operator_symbols_are_escaped() {
        let xml = dump(
            "class Main { function boolean cmp(int a, int b) { return (a<b) | (a>b) & ~(a=b); } }",
        );
        assert!(xml.contains("<symbol> &lt; </symbol>"));
        assert!(xml.contains("<symbol> &gt; </symbol>"));
        assert!(xml.contains("<symbol> &amp; </symbol>"));
        assert!(!xml.contains("<symbol> < </symbol>"));
    }

    #[test]
    fn test_string_constant_without_quotes() {
        let xml = dump(
            "class Main { function void main() { do Output.printString(\"ok\"); return; } }",
        );
        assert!(xml.contains("<stringConstant> ok </stringConstant>"));
    }

    #[test]
    fn test_empty_expression_list_still_present() {
        let xml = dump("class Main { function void main() { do Sys.halt(); return; } }");
        assert!(xml.contains("<expressionList>\n"));
        assert!(xml.contains("</expressionList>"));
    }

    #[test]
    fn test_array_term_and_call_term() {
        let xml = dump(
            "class Main { function int pick(Array a, int i) { return a[i] + Math.max(1, 2); } }",
        );
        assert!(xml.contains("<symbol> [ </symbol>"));
        // two expressions in the call's expression list, separated by a comma
        assert!(xml.contains("<symbol> , </symbol>"));
        assert!(xml.contains("<identifier> Math </identifier>"));
    }

    #[test]
    fn test_grammar_errors_still_caught() {
        let toks = Tokenizer::new("class Main { function void main() { let 1 = x; } }").unwrap();
        let mut engine = Box::new(XmlEngine::new(toks));
        let err = engine.compile_class().unwrap_err();
        assert!(err.to_string().contains("expected identifier"), "{}", err);
    }
}
