//! Tokenizer for Jack source text.
//!
//! The whole file is lexed up front into a position-tagged token vector;
//! the parser then walks a cursor over it. `peek()` looks one token past
//! the current one without consuming anything, which is the only lookahead
//! the grammar needs (disambiguating an identifier that opens a term).

use hack_core::jack::{self, Keyword, Token, TokenKind, TokenValue};

/// Token stream over one Jack source file.
#[derive(Debug)]
pub struct Tokenizer {
    tokens: Vec<Token>,
    pos: usize,
}

impl Tokenizer {
    /// Lex `source` completely. Lexical errors (unterminated string or
    /// block comment, out-of-range integer, illegal character) are fatal
    /// and carry the 1-indexed position.
    pub fn new(source: &str) -> Result<Self, String> {
        let tokens = Lexer::new(source).run()?;
        Ok(Tokenizer { tokens, pos: 0 })
    }

    /// The current token, or `None` once the stream is exhausted
    /// (including for an empty file).
    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// The token after the current one, without consuming anything.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    /// Whether a token follows the current one.
    pub fn has_more(&self) -> bool {
        self.pos + 1 < self.tokens.len()
    }

    /// Make the next token current. Consuming the last token leaves the
    /// stream exhausted; advancing an exhausted stream is an error.
    pub fn advance(&mut self) -> Result<(), String> {
        if self.pos >= self.tokens.len() {
            return Err("unexpected end of file".to_string());
        }
        self.pos += 1;
        Ok(())
    }

    pub fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(Token::kind)
    }

    /// Position of the current token (or of the last token when
    /// exhausted), 0-indexed.
    pub fn position(&self) -> (usize, usize) {
        let tok = self.current().or_else(|| self.tokens.last());
        tok.map(|t| (t.line, t.column)).unwrap_or((0, 0))
    }

    pub fn keyword(&self) -> Result<Keyword, String> {
        match self.current().map(|t| &t.value) {
            Some(TokenValue::Keyword(kw)) => Ok(*kw),
            other => Err(self.mismatch(TokenKind::Keyword, other)),
        }
    }

    pub fn symbol(&self) -> Result<char, String> {
        match self.current().map(|t| &t.value) {
            Some(TokenValue::Symbol(c)) => Ok(*c),
            other => Err(self.mismatch(TokenKind::Symbol, other)),
        }
    }

    pub fn identifier(&self) -> Result<&str, String> {
        match self.current().map(|t| &t.value) {
            Some(TokenValue::Identifier(name)) => Ok(name),
            other => Err(self.mismatch(TokenKind::Identifier, other)),
        }
    }

    pub fn int_val(&self) -> Result<u16, String> {
        match self.current().map(|t| &t.value) {
            Some(TokenValue::IntConst(v)) => Ok(*v),
            other => Err(self.mismatch(TokenKind::IntConst, other)),
        }
    }

    pub fn string_val(&self) -> Result<&str, String> {
        match self.current().map(|t| &t.value) {
            Some(TokenValue::StringConst(s)) => Ok(s),
            other => Err(self.mismatch(TokenKind::StringConst, other)),
        }
    }

    fn mismatch(&self, wanted: TokenKind, found: Option<&TokenValue>) -> String {
        let (line, column) = self.position();
        match found {
            Some(value) => format!(
                "expected {}, found '{}' at line {}, column {}",
                wanted,
                value,
                line + 1,
                column + 1
            ),
            None => format!("expected {}, found end of file", wanted),
        }
    }
}

/// One pass over the source characters, stripping comments and producing
/// position-tagged tokens.
struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 0,
            column: 0,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        while let Some(c) = self.current() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '/' && self.next_is('/') {
                self.skip_line_comment();
            } else if c == '/' && self.next_is('*') {
                self.skip_block_comment()?;
            } else if c == '"' {
                tokens.push(self.lex_string()?);
            } else if c.is_ascii_digit() {
                tokens.push(self.lex_integer()?);
            } else if jack::is_symbol(c) {
                tokens.push(Token::new(TokenValue::Symbol(c), self.line, self.column));
                self.bump();
            } else if c.is_ascii_alphabetic() || c == '_' {
                tokens.push(self.lex_word());
            } else {
                return Err(format!(
                    "illegal character '{}' at line {}, column {}",
                    c,
                    self.line + 1,
                    self.column + 1
                ));
            }
        }
        Ok(tokens)
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next_is(&self, expected: char) -> bool {
        self.chars.get(self.pos + 1) == Some(&expected)
    }

    fn bump(&mut self) {
        if let Some(c) = self.current() {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.current() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), String> {
        let (start_line, start_column) = (self.line, self.column);
        self.bump(); // '/'
        self.bump(); // '*'
        loop {
            match self.current() {
                Some('*') if self.next_is('/') => {
                    self.bump();
                    self.bump();
                    return Ok(());
                }
                Some(_) => self.bump(),
                None => {
                    return Err(format!(
                        "unterminated block comment starting at line {}, column {}",
                        start_line + 1,
                        start_column + 1
                    ));
                }
            }
        }
    }

    fn lex_string(&mut self) -> Result<Token, String> {
        let (start_line, start_column) = (self.line, self.column);
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.bump();
                    return Ok(Token::new(
                        TokenValue::StringConst(text),
                        start_line,
                        start_column,
                    ));
                }
                Some('\n') | None => {
                    return Err(format!(
                        "unterminated string literal starting at line {}, column {}",
                        start_line + 1,
                        start_column + 1
                    ));
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    fn lex_integer(&mut self) -> Result<Token, String> {
        let (start_line, start_column) = (self.line, self.column);
        let mut digits = String::new();
        while let Some(c) = self.current() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.bump();
        }
        let value: u32 = digits.parse().map_err(|_| {
            format!(
                "integer constant '{}' is malformed at line {}, column {}",
                digits,
                start_line + 1,
                start_column + 1
            )
        })?;
        if value > 32767 {
            return Err(format!(
                "integer constant {} out of range (0..=32767) at line {}, column {}",
                value,
                start_line + 1,
                start_column + 1
            ));
        }
        Ok(Token::new(
            TokenValue::IntConst(value as u16),
            start_line,
            start_column,
        ))
    }

    fn lex_word(&mut self) -> Token {
        let (start_line, start_column) = (self.line, self.column);
        let mut word = String::new();
        while let Some(c) = self.current() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            word.push(c);
            self.bump();
        }
        let value = match Keyword::lookup(&word) {
            Some(kw) => TokenValue::Keyword(kw),
            None => TokenValue::Identifier(word),
        };
        Token::new(value, start_line, start_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(source: &str) -> Vec<TokenValue> {
        let mut toks = Tokenizer::new(source).unwrap();
        let mut out = Vec::new();
        while let Some(tok) = toks.current() {
            out.push(tok.value.clone());
            toks.advance().unwrap();
        }
        out
    }

    #[test]
    fn test_lexes_simple_statement() {
        let got = values("let x = x + 1;");
        assert_eq!(
            got,
            vec![
                TokenValue::Keyword(Keyword::Let),
                TokenValue::Identifier("x".to_string()),
                TokenValue::Symbol('='),
                TokenValue::Identifier("x".to_string()),
                TokenValue::Symbol('+'),
                TokenValue::IntConst(1),
                TokenValue::Symbol(';'),
            ]
        );
    }

    #[test]
    fn test_symbols_split_identifiers() {
        let got = values("a[i].run()");
        assert_eq!(
            got,
            vec![
                TokenValue::Identifier("a".to_string()),
                TokenValue::Symbol('['),
                TokenValue::Identifier("i".to_string()),
                TokenValue::Symbol(']'),
                TokenValue::Symbol('.'),
                TokenValue::Identifier("run".to_string()),
                TokenValue::Symbol('('),
                TokenValue::Symbol(')'),
            ]
        );
    }

    #[test]
    fn test_comments_are_stripped() {
        let source = r#"
// leading comment
class Main { // trailing comment
  /* block
     spanning lines */
  function void main() { return; }
}
"#;
        let got = values(source);
        assert_eq!(got[0], TokenValue::Keyword(Keyword::Class));
        assert!(!got.iter().any(|v| matches!(
            v,
            TokenValue::Identifier(s) if s.contains("comment") || s.contains("block")
        )));
    }

    #[test]
    fn test_string_constant_keeps_interior() {
        let got = values(r#"do Output.printString("HOW MANY NUMBERS? ");"#);
        assert!(got.contains(&TokenValue::StringConst(
            "HOW MANY NUMBERS? ".to_string()
        )));
    }

    #[test]
    fn test_string_may_contain_symbols_and_slashes() {
        let got = values(r#""a // not a comment { } ""#);
        assert_eq!(
            got,
            vec![TokenValue::StringConst(
                "a // not a comment { } ".to_string()
            )]
        );
    }

    #[test]
    fn test_token_positions() {
        let toks = Tokenizer::new("class Main {\n  field int x;\n}").unwrap();
        let all = {
            let mut t = toks;
            let mut out = Vec::new();
            while let Some(tok) = t.current() {
                out.push(tok.clone());
                t.advance().unwrap();
            }
            out
        };
        // "field" starts line 1 (0-indexed), column 2
        let field = all
            .iter()
            .find(|t| t.value == TokenValue::Keyword(Keyword::Field))
            .unwrap();
        assert_eq!((field.line, field.column), (1, 2));
        // final '}' on line 2, column 0
        let close = all.last().unwrap();
        assert_eq!(close.value, TokenValue::Symbol('}'));
        assert_eq!((close.line, close.column), (2, 0));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut toks = Tokenizer::new("foo . bar").unwrap();
        assert_eq!(toks.identifier().unwrap(), "foo");
        assert_eq!(
            toks.peek().map(|t| t.value.clone()),
            Some(TokenValue::Symbol('.'))
        );
        // peeking again gives the same answer
        assert_eq!(
            toks.peek().map(|t| t.value.clone()),
            Some(TokenValue::Symbol('.'))
        );
        // and advance still visits the peeked token
        toks.advance().unwrap();
        assert_eq!(toks.symbol().unwrap(), '.');
    }

    #[test]
    fn test_empty_file_has_no_current() {
        let toks = Tokenizer::new("").unwrap();
        assert!(toks.current().is_none());
        assert!(!toks.has_more());
        let toks = Tokenizer::new("  // only a comment\n").unwrap();
        assert!(toks.current().is_none());
    }

    #[test]
    fn test_advance_past_end_fails() {
        let mut toks = Tokenizer::new("x").unwrap();
        toks.advance().unwrap(); // consume the only token
        assert!(toks.current().is_none());
        assert!(toks.advance().is_err());
    }

    #[test]
    fn test_integer_bounds() {
        assert_eq!(values("32767"), vec![TokenValue::IntConst(32767)]);
        let err = Tokenizer::new("32768").unwrap_err();
        assert!(err.contains("out of range"), "{}", err);
    }

    #[test]
    fn test_unterminated_string() {
        let err = Tokenizer::new("let s = \"oops;").unwrap_err();
        assert!(err.contains("unterminated string"), "{}", err);
        let err = Tokenizer::new("let s = \"oops\nmore\";").unwrap_err();
        assert!(err.contains("unterminated string"), "{}", err);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = Tokenizer::new("class Main { /* no end").unwrap_err();
        assert!(err.contains("unterminated block comment"), "{}", err);
    }

    #[test]
    fn test_illegal_character() {
        let err = Tokenizer::new("let x = 1 # 2;").unwrap_err();
        assert!(err.contains("illegal character '#'"), "{}", err);
    }

    #[test]
    fn test_kind_accessors_check_kind() {
        let toks = Tokenizer::new("42").unwrap();
        assert_eq!(toks.int_val().unwrap(), 42);
        let err = toks.identifier().unwrap_err();
        assert!(err.contains("expected identifier"), "{}", err);
    }

    #[test]
    fn test_retokenize_rendered_stream_is_stable() {
        let source = "class Main { function void main ( ) { do Output . printInt ( 1 ) ; return ; } }";
        let first = values(source);
        let rendered = first
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(values(&rendered), first);
    }
}
