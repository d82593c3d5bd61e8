//! Reader for Python dict-literal descriptors (`__manifest__.py`).
//!
//! Only the literal subset that descriptors are written in is understood:
//! dicts, lists, tuples, strings, numbers, booleans and `None`. Names, calls
//! and operators are rejected with the position of the offending token.
//!
//! Tuples become JSON arrays and `None` becomes `null`.

use serde_json::{Map, Number, Value};

/// Deepest container nesting accepted.
const MAX_DEPTH: usize = 64;

/// A parse failure with a 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}, column {column}: {message}")]
pub struct LiteralError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Parse a single literal expression, surrounded by optional comments and
/// whitespace.
pub fn parse(source: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser::new(source);
    parser.skip_trivia();
    if parser.at_end() {
        return Err(parser.error("empty descriptor"));
    }
    let value = parser.value()?;
    parser.skip_trivia();
    if !parser.at_end() {
        return Err(parser.error("unexpected content after the literal"));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        let mut line = 1;
        let mut column = 1;
        for &c in &self.chars[..self.pos.min(self.chars.len())] {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        LiteralError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Skip whitespace, `#` comments and backslash line continuations.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                '\\' if matches!(self.peek_at(1), Some('\n')) => self.pos += 2,
                '\\' if matches!((self.peek_at(1), self.peek_at(2)), (Some('\r'), Some('\n'))) => {
                    self.pos += 3
                }
                c if c.is_whitespace() => self.pos += 1,
                _ => break,
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        match self.peek() {
            Some('{') => self.nested(Self::dict),
            Some('[') => self.nested(|parser| parser.sequence('[', ']')),
            Some('(') => self.nested(Self::parenthesized),
            Some(_) if self.string_start().is_some() => self.strings(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.name(),
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Value, LiteralError>,
    ) -> Result<Value, LiteralError> {
        if self.depth == MAX_DEPTH {
            return Err(self.error(format!("containers nested deeper than {MAX_DEPTH} levels")));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn dict(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some('}') {
                self.pos += 1;
                break;
            }
            let key = match self.value()? {
                Value::String(key) => key,
                other => {
                    return Err(self.error(format!("dict keys must be strings, found {other}")));
                }
            };
            self.skip_trivia();
            self.expect(':')?;
            self.skip_trivia();
            let value = self.value()?;
            map.insert(key, value);
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected ',' or '}}', found '{c}'")));
                }
                None => return Err(self.error("unterminated dict")),
            }
        }
        Ok(Value::Object(map))
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Value, LiteralError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }
            items.push(self.value()?);
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => break,
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected ',' or '{close}', found '{c}'")));
                }
                None => return Err(self.error(format!("unterminated sequence, missing '{close}'"))),
            }
        }
        Ok(Value::Array(items))
    }

    /// `()` is an empty tuple, `(x)` is grouping, `(x,)` and `(x, y)` are tuples.
    fn parenthesized(&mut self) -> Result<Value, LiteralError> {
        self.expect('(')?;
        self.skip_trivia();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(Value::Array(Vec::new()));
        }
        let first = self.value()?;
        self.skip_trivia();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(first);
        }
        self.expect(',')?;
        let mut items = vec![first];
        loop {
            self.skip_trivia();
            if self.peek() == Some(')') {
                self.pos += 1;
                break;
            }
            items.push(self.value()?);
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some(')') => break,
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected ',' or ')', found '{c}'")));
                }
                None => return Err(self.error("unterminated tuple")),
            }
        }
        Ok(Value::Array(items))
    }

    /// Length of the string prefix (`r`, `u`, `b`, `rb`, `br`) if a string
    /// literal starts at the cursor.
    fn string_start(&self) -> Option<usize> {
        let is_quote = |c: Option<char>| matches!(c, Some('\'') | Some('"'));
        if is_quote(self.peek()) {
            return Some(0);
        }
        let prefix = |c: Option<char>| matches!(c, Some('r' | 'R' | 'u' | 'U' | 'b' | 'B'));
        if prefix(self.peek()) && is_quote(self.peek_at(1)) {
            return Some(1);
        }
        let lower = |c: Option<char>| c.map(|c| c.to_ascii_lowercase());
        let pair = (lower(self.peek()), lower(self.peek_at(1)));
        if matches!(pair, (Some('r'), Some('b')) | (Some('b'), Some('r')))
            && is_quote(self.peek_at(2))
        {
            return Some(2);
        }
        None
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> Result<Value, LiteralError> {
        let mut out = String::new();
        loop {
            self.string_into(&mut out)?;
            let save = self.pos;
            self.skip_trivia();
            if self.string_start().is_none() {
                self.pos = save;
                break;
            }
        }
        Ok(Value::String(out))
    }

    fn string_into(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let prefix_len = self.string_start().unwrap_or(0);
        let raw = self.chars[self.pos..self.pos + prefix_len]
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&'r'));
        self.pos += prefix_len;

        let quote = match self.bump() {
            Some(q) => q,
            None => return Err(self.error("expected a string")),
        };
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        loop {
            let c = match self.bump() {
                Some(c) => c,
                None => return Err(self.error("unterminated string")),
            };
            if c == quote {
                if !triple {
                    return Ok(());
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    return Ok(());
                }
                out.push(c);
                continue;
            }
            match c {
                '\n' if !triple => {
                    self.pos -= 1;
                    return Err(self.error("unterminated string"));
                }
                '\\' if raw => {
                    // Raw strings keep the backslash, but it still protects the quote.
                    out.push('\\');
                    if let Some(next) = self.bump() {
                        out.push(next);
                    }
                }
                '\\' => self.escape_into(out)?,
                c => out.push(c),
            }
        }
    }

    fn escape_into(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let c = match self.bump() {
            Some(c) => c,
            None => return Err(self.error("unterminated escape sequence")),
        };
        match c {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                out.push(self.code_point(code)?);
            }
            'x' => {
                let code = self.hex_digits(2)?;
                out.push(self.code_point(code)?);
            }
            'u' => {
                let code = self.hex_digits(4)?;
                out.push(self.code_point(code)?);
            }
            'U' => {
                let code = self.hex_digits(8)?;
                out.push(self.code_point(code)?);
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_digits(&mut self, count: usize) -> Result<u32, LiteralError> {
        let mut code = 0u32;
        for _ in 0..count {
            match self.peek().and_then(|d| d.to_digit(16)) {
                Some(d) => {
                    code = code * 16 + d;
                    self.pos += 1;
                }
                None => return Err(self.error(format!("expected {count} hex digits in escape"))),
            }
        }
        Ok(code)
    }

    fn code_point(&self, code: u32) -> Result<char, LiteralError> {
        char::from_u32(code).ok_or_else(|| self.error(format!("invalid code point {code:#x}")))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut text = String::new();
        if let Some(sign @ ('-' | '+')) = self.peek() {
            text.push(sign);
            self.pos += 1;
            self.skip_trivia();
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => text.push(c),
                '_' => {}
                '.' => {
                    is_float = true;
                    text.push(c);
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                    if let Some(sign @ ('-' | '+')) = self.peek_at(1) {
                        text.push(sign);
                        self.pos += 1;
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }

        let parsed = if is_float {
            text.parse::<f64>().ok().and_then(Number::from_f64)
        } else {
            text.parse::<i64>().ok().map(Number::from)
        };
        match parsed {
            Some(number) => Ok(Value::Number(number)),
            None => {
                self.pos = start;
                Err(self.error(format!("invalid number literal '{text}'")))
            }
        }
    }

    fn name(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        match name.as_str() {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            _ => {
                self.pos = start;
                Err(self.error(format!("unsupported expression '{name}'")))
            }
        }
    }
}
