//! Syntax-directed translation from Jack to VM code.
//!
//! There is no AST: parsing functions advance the tokenizer, consult and
//! mutate the symbol tables, and emit VM text as they go, so the output
//! order is exactly the lexical order of the source constructs.

use crate::engine::{CompilationEngine, CompileError};
use crate::symbols::{Kind, SymbolContext};
use crate::tokenizer::Tokenizer;
use crate::vm_writer::VmWriter;
use hack_core::jack::{self, Keyword, TokenValue};
use hack_core::vm::{Segment, VmOp};

/// Compiles one Jack class to VM code.
pub struct VmEngine {
    toks: Tokenizer,
    writer: VmWriter,
    symbols: SymbolContext,
    class_name: String,
    /// Kind of the subroutine currently being compiled; implicit-receiver
    /// calls are illegal inside a `function`.
    current_sub: Option<Keyword>,
    /// Control-flow labels are `<TAG>_<Class>_<n>` with this counter.
    label_counter: usize,
}

impl VmEngine {
    pub fn new(toks: Tokenizer) -> Self {
        VmEngine {
            toks,
            writer: VmWriter::new(),
            symbols: SymbolContext::new(),
            class_name: String::new(),
            current_sub: None,
            label_counter: 0,
        }
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

    fn expect_symbol(&mut self, want: char) -> Result<(), CompileError> {
        if self.check_symbol(want) {
            self.toks.advance()?;
            Ok(())
        } else {
            Err(self.expected(&format!("'{}'", want)))
        }
    }

    fn expect_keyword(&mut self, want: Keyword) -> Result<(), CompileError> {
        if self.check_keyword(want) {
            self.toks.advance()?;
            Ok(())
        } else {
            Err(self.expected(&format!("'{}'", want)))
        }
    }

    fn take_identifier(&mut self) -> Result<String, CompileError> {
        let name = self.toks.identifier()?.to_string();
        self.toks.advance()?;
        Ok(name)
    }

    /// A type is `int`, `char`, `boolean`, or a class name.
    fn take_type(&mut self) -> Result<String, CompileError> {
        let ty = match self.toks.current().map(|t| &t.value) {
            Some(TokenValue::Keyword(kw @ (Keyword::Int | Keyword::Char | Keyword::Boolean))) => {
                kw.as_str().to_string()
            }
            Some(TokenValue::Identifier(name)) => name.clone(),
            _ => return Err(self.expected("a type ('int', 'char', 'boolean', or a class name)")),
        };
        self.toks.advance()?;
        Ok(ty)
    }

    /// Error at the current position naming what the grammar wanted.
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

    /// Semantic error at the current position.
    fn err_here(&self, msg: impl AsRef<str>) -> CompileError {
        let (line, column) = self.toks.position();
        CompileError::Source(format!(
            "{} at line {}, column {}",
            msg.as_ref(),
            line + 1,
            column + 1
        ))
    }

    /// Segment, index, and declared type of a variable in scope.
    fn lookup_var(&self, name: &str) -> Result<(Segment, u16, String), CompileError> {
        match self.symbols.resolve(name) {
            Some(entry) => Ok((entry.kind.segment(), entry.index, entry.ty.clone())),
            None => Err(self.err_here(format!("undeclared identifier '{}'", name))),
        }
    }

    /// Label for the current statement; the caller bumps the counter once
    /// per statement so paired labels share a suffix.
    fn make_label(&self, tag: &str) -> String {
        format!("{}_{}_{}", tag, self.class_name, self.label_counter)
    }

    // ----- grammar ---------------------------------------------------------

    /// class ::= 'class' id '{' classVarDec* subroutineDec* '}'
    fn compile_class_inner(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Class)?;
        self.class_name = self.take_identifier()?;
        self.expect_symbol('{')?;
        while self.check_keyword(Keyword::Static) || self.check_keyword(Keyword::Field) {
            self.compile_class_var_dec()?;
        }
        while self.check_keyword(Keyword::Constructor)
            || self.check_keyword(Keyword::Function)
            || self.check_keyword(Keyword::Method)
        {
            self.compile_subroutine_dec()?;
        }
        self.expect_symbol('}')?;
        if self.toks.current().is_some() {
            return Err(self.expected("end of file after the class body"));
        }
        Ok(())
    }

    /// classVarDec ::= ('static'|'field') type id (',' id)* ';'
    fn compile_class_var_dec(&mut self) -> Result<(), CompileError> {
        let kind = match self.toks.keyword()? {
            Keyword::Static => Kind::Static,
            _ => Kind::Field,
        };
        self.toks.advance()?;
        let ty = self.take_type()?;
        loop {
            let name = self.take_identifier()?;
            if let Err(e) = self.symbols.define(&name, &ty, kind) {
                return Err(self.err_here(e));
            }
            if self.check_symbol(',') {
                self.toks.advance()?;
            } else {
                break;
            }
        }
        self.expect_symbol(';')?;
        Ok(())
    }

    /// subroutineDec ::= ('constructor'|'function'|'method')
    ///                   ('void'|type) id '(' params ')' body
    fn compile_subroutine_dec(&mut self) -> Result<(), CompileError> {
        let sub_kind = self.toks.keyword()?;
        self.toks.advance()?;
        self.symbols.start_subroutine();
        self.current_sub = Some(sub_kind);

        // a method's `this` is argument 0
        if sub_kind == Keyword::Method {
            let class_name = self.class_name.clone();
            if let Err(e) = self.symbols.define("this", &class_name, Kind::Arg) {
                return Err(self.err_here(e));
            }
        }

        // return type is unused beyond syntax; `return` semantics are uniform
        if self.check_keyword(Keyword::Void) {
            self.toks.advance()?;
        } else {
            self.take_type()?;
        }

        let name = self.take_identifier()?;
        self.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.expect_symbol(')')?;
        self.compile_subroutine_body(sub_kind, &name)?;
        self.current_sub = None;
        Ok(())
    }

    /// params ::= (type id (',' type id)*)?
    fn compile_parameter_list(&mut self) -> Result<(), CompileError> {
        if self.check_symbol(')') {
            return Ok(());
        }
        loop {
            let ty = self.take_type()?;
            let name = self.take_identifier()?;
            if let Err(e) = self.symbols.define(&name, &ty, Kind::Arg) {
                return Err(self.err_here(e));
            }
            if self.check_symbol(',') {
                self.toks.advance()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    /// body ::= '{' varDec* statement* '}'
    ///
    /// The `function` line can only be emitted once the local count is
    /// known, so all varDecs are processed first.
    fn compile_subroutine_body(
        &mut self,
        sub_kind: Keyword,
        name: &str,
    ) -> Result<(), CompileError> {
        self.expect_symbol('{')?;
        while self.check_keyword(Keyword::Var) {
            self.compile_var_dec()?;
        }

        let full_name = format!("{}.{}", self.class_name, name);
        let n_locals = self.symbols.local_count();
        self.writer.write_function(&full_name, n_locals)?;
        match sub_kind {
            Keyword::Constructor => {
                // allocate the object and aim `this` at it
                self.writer
                    .write_push(Segment::Constant, self.symbols.field_count())?;
                self.writer.write_call("Memory.alloc", 1)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            Keyword::Method => {
                // the receiver arrives as argument 0
                self.writer.write_push(Segment::Argument, 0)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            _ => {}
        }

        let ends_with_return = self.compile_statements()?;
        if !ends_with_return {
            return Err(self.err_here(format!(
                "subroutine '{}' does not end with a return statement",
                full_name
            )));
        }
        self.expect_symbol('}')?;
        Ok(())
    }

    /// varDec ::= 'var' type id (',' id)* ';'
    fn compile_var_dec(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Var)?;
        let ty = self.take_type()?;
        loop {
            let name = self.take_identifier()?;
            if let Err(e) = self.symbols.define(&name, &ty, Kind::Var) {
                return Err(self.err_here(e));
            }
            if self.check_symbol(',') {
                self.toks.advance()?;
            } else {
                break;
            }
        }
        self.expect_symbol(';')?;
        Ok(())
    }

    /// Returns whether the last statement compiled was a `return`.
    fn compile_statements(&mut self) -> Result<bool, CompileError> {
        let mut last_was_return = false;
        loop {
            let Ok(kw) = self.toks.keyword() else { break };
            last_was_return = kw == Keyword::Return;
            match kw {
                Keyword::Let => self.compile_let()?,
                Keyword::If => self.compile_if()?,
                Keyword::While => self.compile_while()?,
                Keyword::Do => self.compile_do()?,
                Keyword::Return => self.compile_return()?,
                _ => return Err(self.expected("a statement")),
            }
        }
        Ok(last_was_return)
    }

    /// let ::= 'let' id ('[' expr ']')? '=' expr ';'
    fn compile_let(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Let)?;
        let name = self.toks.identifier()?.to_string();
        let (segment, index, _) = self.lookup_var(&name)?;
        self.toks.advance()?;

        if self.check_symbol('[') {
            // target address = base + subscript, computed before the rhs
            self.toks.advance()?;
            self.writer.write_push(segment, index)?;
            self.compile_expression()?;
            self.expect_symbol(']')?;
            self.writer.write_arithmetic(VmOp::Add)?;
            self.expect_symbol('=')?;
            self.compile_expression()?;
            self.expect_symbol(';')?;
            // park the rhs, aim THAT at the target, store
            self.writer.write_pop(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::Pointer, 1)?;
            self.writer.write_push(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::That, 0)?;
        } else {
            self.expect_symbol('=')?;
            self.compile_expression()?;
            self.expect_symbol(';')?;
            self.writer.write_pop(segment, index)?;
        }
        Ok(())
    }

    /// if ::= 'if' '(' expr ')' '{' stmts '}' ('else' '{' stmts '}')?
    fn compile_if(&mut self) -> Result<(), CompileError> {
        let false_label = self.make_label("IF_FALSE");
        let end_label = self.make_label("IF_END");
        self.label_counter += 1;

        self.expect_keyword(Keyword::If)?;
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.writer.write_arithmetic(VmOp::Not)?;
        self.writer.write_if(&false_label)?;

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.write_goto(&end_label)?;
        self.writer.write_label(&false_label)?;

        if self.check_keyword(Keyword::Else) {
            self.toks.advance()?;
            self.expect_symbol('{')?;
            self.compile_statements()?;
            self.expect_symbol('}')?;
        }
        self.writer.write_label(&end_label)?;
        Ok(())
    }

    /// while ::= 'while' '(' expr ')' '{' stmts '}'
    fn compile_while(&mut self) -> Result<(), CompileError> {
        let exp_label = self.make_label("WHILE_EXP");
        let end_label = self.make_label("WHILE_END");
        self.label_counter += 1;

        self.expect_keyword(Keyword::While)?;
        self.writer.write_label(&exp_label)?;
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.writer.write_arithmetic(VmOp::Not)?;
        self.writer.write_if(&end_label)?;

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.write_goto(&exp_label)?;
        self.writer.write_label(&end_label)?;
        Ok(())
    }

    /// do ::= 'do' subroutineCall ';'
    ///
    /// The call's result is discarded.
    fn compile_do(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Do)?;
        self.compile_subroutine_call()?;
        self.expect_symbol(';')?;
        self.writer.write_pop(Segment::Temp, 0)?;
        Ok(())
    }

    /// return ::= 'return' expr? ';'
    ///
    /// A void return still pushes a value; callers always pop one.
    fn compile_return(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Return)?;
        if self.check_symbol(';') {
            self.writer.write_push(Segment::Constant, 0)?;
        } else {
            self.compile_expression()?;
        }
        self.expect_symbol(';')?;
        self.writer.write_return()?;
        Ok(())
    }

    /// expr ::= term (op term)*
    ///
    /// Operators are emitted postorder: capture the operator, compile the
    /// right operand, then emit.
    fn compile_expression(&mut self) -> Result<(), CompileError> {
        self.compile_term()?;
        loop {
            let op = match self.toks.current().map(|t| &t.value) {
                Some(TokenValue::Symbol(c)) if jack::is_binary_op(*c) => *c,
                _ => break,
            };
            self.toks.advance()?;
            self.compile_term()?;
            match op {
                '+' => self.writer.write_arithmetic(VmOp::Add)?,
                '-' => self.writer.write_arithmetic(VmOp::Sub)?,
                '&' => self.writer.write_arithmetic(VmOp::And)?,
                '|' => self.writer.write_arithmetic(VmOp::Or)?,
                '<' => self.writer.write_arithmetic(VmOp::Lt)?,
                '>' => self.writer.write_arithmetic(VmOp::Gt)?,
                '=' => self.writer.write_arithmetic(VmOp::Eq)?,
                // no multiply/divide in the target machine
                '*' => self.writer.write_call("Math.multiply", 2)?,
                '/' => self.writer.write_call("Math.divide", 2)?,
                _ => return Err(self.err_here(format!("compiler bug: unhandled operator '{}'", op))),
            }
        }
        Ok(())
    }

    /// term ::= int | str | keywordConst | id | id '[' expr ']'
    ///        | subroutineCall | '(' expr ')' | unaryOp term
    fn compile_term(&mut self) -> Result<(), CompileError> {
        match self.toks.current().map(|t| t.value.clone()) {
            Some(TokenValue::IntConst(v)) => {
                self.toks.advance()?;
                self.writer.write_push(Segment::Constant, v)?;
            }
            Some(TokenValue::StringConst(text)) => {
                self.toks.advance()?;
                self.compile_string_constant(&text)?;
            }
            Some(TokenValue::Keyword(kw)) => {
                self.toks.advance()?;
                match kw {
                    Keyword::True => {
                        self.writer.write_push(Segment::Constant, 0)?;
                        self.writer.write_arithmetic(VmOp::Not)?;
                    }
                    Keyword::False | Keyword::Null => {
                        self.writer.write_push(Segment::Constant, 0)?;
                    }
                    Keyword::This => {
                        self.writer.write_push(Segment::Pointer, 0)?;
                    }
                    _ => {
                        return Err(self.err_here(format!(
                            "keyword '{}' cannot appear in an expression",
                            kw
                        )));
                    }
                }
            }
            Some(TokenValue::Symbol('(')) => {
                self.toks.advance()?;
                self.compile_expression()?;
                self.expect_symbol(')')?;
            }
            Some(TokenValue::Symbol(c)) if jack::is_unary_op(c) => {
                self.toks.advance()?;
                self.compile_term()?;
                let op = if c == '-' { VmOp::Neg } else { VmOp::Not };
                self.writer.write_arithmetic(op)?;
            }
            Some(TokenValue::Identifier(name)) => {
                // one place needing two-token lookahead: variable,
                // array access, or subroutine call
                match self.toks.peek().map(|t| &t.value) {
                    Some(TokenValue::Symbol('(')) | Some(TokenValue::Symbol('.')) => {
                        self.compile_subroutine_call()?;
                    }
                    Some(TokenValue::Symbol('[')) => {
                        let (segment, index, _) = self.lookup_var(&name)?;
                        self.toks.advance()?; // identifier
                        self.toks.advance()?; // '['
                        self.writer.write_push(segment, index)?;
                        self.compile_expression()?;
                        self.expect_symbol(']')?;
                        self.writer.write_arithmetic(VmOp::Add)?;
                        self.writer.write_pop(Segment::Pointer, 1)?;
                        self.writer.write_push(Segment::That, 0)?;
                    }
                    _ => {
                        let (segment, index, _) = self.lookup_var(&name)?;
                        self.toks.advance()?;
                        self.writer.write_push(segment, index)?;
                    }
                }
            }
            _ => return Err(self.expected("a term")),
        }
        Ok(())
    }

    /// `push constant len; call String.new 1`, then one appendChar per
    /// character.
    fn compile_string_constant(&mut self, text: &str) -> Result<(), CompileError> {
        let len = text.chars().count() as u16;
        self.writer.write_push(Segment::Constant, len)?;
        self.writer.write_call("String.new", 1)?;
        for c in text.chars() {
            if !c.is_ascii() {
                return Err(self.err_here(format!(
                    "character '{}' is outside the Hack character set",
                    c
                )));
            }
            self.writer.write_push(Segment::Constant, c as u16)?;
            self.writer.write_call("String.appendChar", 2)?;
        }
        Ok(())
    }

    /// subroutineCall ::= id '(' exprs ')' | id '.' id '(' exprs ')'
    ///
    /// `id(...)` is a method call on the current object. `id.id(...)` is a
    /// method call when the left id resolves as a variable, otherwise a
    /// function or constructor call on the named class.
    fn compile_subroutine_call(&mut self) -> Result<(), CompileError> {
        let first = self.take_identifier()?;
        let (full_name, mut n_args) = if self.check_symbol('.') {
            self.toks.advance()?;
            let second = self.take_identifier()?;
            match self.symbols.resolve(&first) {
                Some(entry) => {
                    let receiver = (entry.kind.segment(), entry.index, entry.ty.clone());
                    self.writer.write_push(receiver.0, receiver.1)?;
                    (format!("{}.{}", receiver.2, second), 1u16)
                }
                None => (format!("{}.{}", first, second), 0),
            }
        } else {
            if self.current_sub == Some(Keyword::Function) {
                return Err(self.err_here(format!(
                    "cannot call method '{}' without a receiver inside a function",
                    first
                )));
            }
            self.writer.write_push(Segment::Pointer, 0)?;
            (format!("{}.{}", self.class_name, first), 1)
        };
        self.expect_symbol('(')?;
        n_args += self.compile_expression_list()?;
        self.expect_symbol(')')?;
        self.writer.write_call(&full_name, n_args)?;
        Ok(())
    }

    /// Returns the number of expressions compiled.
    fn compile_expression_list(&mut self) -> Result<u16, CompileError> {
        if self.check_symbol(')') {
            return Ok(0);
        }
        let mut count = 1;
        self.compile_expression()?;
        while self.check_symbol(',') {
            self.toks.advance()?;
            self.compile_expression()?;
            count += 1;
        }
        Ok(count)
    }
}

impl CompilationEngine for VmEngine {
    fn output_extension(&self) -> &'static str {
        "vm"
    }

    fn compile_class(&mut self) -> Result<(), CompileError> {
        self.compile_class_inner()
    }

    fn finish(self: Box<Self>) -> String {
        self.writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Result<String, CompileError> {
        let toks = Tokenizer::new(source).map_err(CompileError::Source)?;
        let mut engine = Box::new(VmEngine::new(toks));
        engine.compile_class()?;
        Ok(engine.finish())
    }

    fn compile_ok(source: &str) -> Vec<String> {
        compile(source)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_function_with_call_and_precedence_by_parens() {
        let lines = compile_ok(
            "class Main { function void main() { do Output.printInt(1+(2*3)); return; } }",
        );
        assert_eq!(
            lines,
            vec![
                "function Main.main 0",
                "push constant 1",
                "push constant 2",
                "push constant 3",
                "call Math.multiply 2",
                "add",
                "call Output.printInt 1",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_if_lowering_layout() {
        let lines = compile_ok(
            "class Main { function void main() { var int x; if (x<0) { let x = -x; } return; } }",
        );
        let body = &lines[1..lines.len() - 2];
        assert_eq!(
            body,
            [
                "push local 0",
                "push constant 0",
                "lt",
                "not",
                "if-goto IF_FALSE_Main_0",
                "push local 0",
                "neg",
                "pop local 0",
                "goto IF_END_Main_0",
                "label IF_FALSE_Main_0",
                "label IF_END_Main_0",
            ]
        );
    }

    #[test]
    fn test_if_else_branches() {
        let lines = compile_ok(
            "class Main { function int pick(boolean b) { if (b) { return 1; } else { return 2; } return 0; } }",
        );
        let text = lines.join("\n");
        assert!(text.contains("if-goto IF_FALSE_Main_0"));
        // else body sits between the false label and the end label
        let false_at = lines
            .iter()
            .position(|l| l == "label IF_FALSE_Main_0")
            .unwrap();
        let end_at = lines
            .iter()
            .position(|l| l == "label IF_END_Main_0")
            .unwrap();
        assert!(false_at < end_at);
        assert!(lines[false_at..end_at].contains(&"push constant 2".to_string()));
    }

    #[test]
    fn test_while_lowering_layout() {
        let lines = compile_ok(
            "class Main { function void main() { var int i; while (i<10) { let i = i+1; } return; } }",
        );
        let body = &lines[1..];
        assert_eq!(body[0], "label WHILE_EXP_Main_0");
        assert_eq!(
            &body[1..5],
            ["push local 0", "push constant 10", "lt", "not"]
        );
        assert_eq!(body[5], "if-goto WHILE_END_Main_0");
        assert!(body.contains(&"goto WHILE_EXP_Main_0".to_string()));
        assert!(body.contains(&"label WHILE_END_Main_0".to_string()));
    }

    #[test]
    fn test_labels_unique_across_statements() {
        let source = "class Main { function void main() {
            var int i;
            while (i<1) { let i = i+1; }
            while (i<2) { let i = i+1; }
            if (i=2) { let i = 0; }
            return;
        } }";
        let text = compile(source).unwrap();
        let mut labels: Vec<&str> = text
            .lines()
            .filter_map(|l| l.strip_prefix("label "))
            .collect();
        let total = labels.len();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), total, "duplicate labels in:\n{}", text);
    }

    #[test]
    fn test_constructor_preamble_and_fields() {
        let lines = compile_ok(
            "class Point {
               field int x, y;
               constructor Point new(int ax, int ay) {
                 let x = ax; let y = ay; return this;
               }
             }",
        );
        assert_eq!(
            &lines[..4],
            [
                "function Point.new 0",
                "push constant 2",
                "call Memory.alloc 1",
                "pop pointer 0",
            ]
        );
        // fields are written through the this segment
        assert!(lines.contains(&"pop this 0".to_string()));
        assert!(lines.contains(&"pop this 1".to_string()));
        assert_eq!(&lines[lines.len() - 2..], ["push pointer 0", "return"]);
    }

    #[test]
    fn test_method_preamble_and_receiver() {
        let lines = compile_ok(
            "class Point {
               field int x;
               method int getx() { return x; }
             }",
        );
        assert_eq!(
            lines,
            vec![
                "function Point.getx 0",
                "push argument 0",
                "pop pointer 0",
                "push this 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_method_parameters_start_at_argument_one() {
        let lines = compile_ok(
            "class Point {
               method int shift(int dx) { return dx; }
             }",
        );
        // dx is argument 1; argument 0 is the receiver
        assert!(lines.contains(&"push argument 1".to_string()));
    }

    #[test]
    fn test_call_shapes() {
        let lines = compile_ok(
            "class Game {
               field Board board;
               method void tick() {
                 do board.draw(1, 2);
                 do refresh();
                 do Screen.clearScreen();
                 return;
               }
               method void refresh() { return; }
             }",
        );
        let text = lines.join("\n");
        // method call on a field: receiver pushed, arg count bumped
        assert!(text.contains("push this 0\npush constant 1\npush constant 2\ncall Board.draw 3"));
        // implicit receiver: current object pushed
        assert!(text.contains("push pointer 0\ncall Game.refresh 1"));
        // plain function call on a class name: no receiver
        assert!(text.contains("call Screen.clearScreen 0"));
    }

    #[test]
    fn test_implicit_method_call_rejected_in_function() {
        let err = compile(
            "class Main {
               function void main() { do helper(); return; }
               method void helper() { return; }
             }",
        )
        .unwrap_err();
        assert!(
            err.to_string().contains("without a receiver"),
            "{}",
            err
        );
    }

    #[test]
    fn test_string_constant_expansion() {
        let lines = compile_ok(
            "class Main { function void main() { do Output.printString(\"Hi\"); return; } }",
        );
        let text = lines.join("\n");
        assert!(text.contains(
            "push constant 2\n\
             call String.new 1\n\
             push constant 72\n\
             call String.appendChar 2\n\
             push constant 105\n\
             call String.appendChar 2"
        ));
    }

    #[test]
    fn test_keyword_constants() {
        let lines = compile_ok(
            "class Main { function void main() { var boolean b; let b = true; let b = false; let b = null; return; } }",
        );
        let text = lines.join("\n");
        assert!(text.contains("push constant 0\nnot\npop local 0"));
        assert!(text.contains("push constant 0\npop local 0"));
    }

    #[test]
    fn test_array_rvalue_and_lvalue() {
        let lines = compile_ok(
            "class Main { function void main() {
               var Array a; var int i;
               let a[i] = a[i+1];
               return;
             } }",
        );
        let text = lines.join("\n");
        // r-value side: base + subscript, read through THAT
        assert!(text.contains(
            "push local 0\n\
             push local 1\n\
             push constant 1\n\
             add\n\
             add\n\
             pop pointer 1\n\
             push that 0"
        ));
        // l-value side: rhs parked in temp 0, address into THAT, store
        assert!(text.contains(
            "pop temp 0\n\
             pop pointer 1\n\
             push temp 0\n\
             pop that 0"
        ));
    }

    #[test]
    fn test_static_and_shadowing() {
        let lines = compile_ok(
            "class Counter {
               static int total;
               function void bump(int total) { let total = total + 1; return; }
               function void reset() { let total = 0; return; }
             }",
        );
        let text = lines.join("\n");
        // inside bump, the argument shadows the static
        assert!(text.contains("push argument 0\npush constant 1\nadd\npop argument 0"));
        // inside reset, the static is visible again
        assert!(text.contains("push constant 0\npop static 0"));
    }

    #[test]
    fn test_void_return_pushes_zero() {
        let lines = compile_ok("class Main { function void main() { return; } }");
        assert_eq!(
            lines,
            vec!["function Main.main 0", "push constant 0", "return"]
        );
    }

    #[test]
    fn test_missing_return_is_an_error() {
        let err = compile("class Main { function void main() { do Sys.halt(); } }").unwrap_err();
        assert!(
            err.to_string().contains("does not end with a return"),
            "{}",
            err
        );
    }

    #[test]
    fn test_undeclared_identifier_is_an_error() {
        let err =
            compile("class Main { function void main() { let x = 1; return; } }").unwrap_err();
        assert!(err.to_string().contains("undeclared identifier 'x'"), "{}", err);
    }

    #[test]
    fn test_duplicate_declaration_is_an_error() {
        let err = compile("class Main { function void main() { var int x; var boolean x; return; } }")
            .unwrap_err();
        assert!(err.to_string().contains("already defined"), "{}", err);
    }

    #[test]
    fn test_unexpected_token_is_an_error() {
        let err = compile("class Main { function void main() { let = 1; return; } }").unwrap_err();
        assert!(err.to_string().contains("expected identifier"), "{}", err);
        let err = compile("class Main { function void main() { return }").unwrap_err();
        assert!(err.to_string().contains("expected"), "{}", err);
    }

    #[test]
    fn test_operators_map_to_vm_ops() {
        let lines = compile_ok(
            "class Main { function int calc(int a, int b) { return ((a+b)-(a&b))|(a/b); } }",
        );
        let text = lines.join("\n");
        for needle in ["add", "sub", "and", "or", "call Math.divide 2"] {
            assert!(text.contains(needle), "missing {} in:\n{}", needle, text);
        }
    }

    #[test]
    fn test_unary_not_maps_to_not() {
        let lines = compile_ok(
            "class Main { function boolean flip(boolean b) { return ~b; } }",
        );
        assert_eq!(
            lines,
            vec![
                "function Main.flip 0",
                "push argument 0",
                "not",
                "return",
            ]
        );
    }
}
