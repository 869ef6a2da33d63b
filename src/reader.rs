// ABOUTME: Recursive-descent reader turning source text into heap-backed
// values, one form at a time, with one token of lookahead.

use crate::error::{LispError, ParseErrorKind};
use crate::runtime::Runtime;
use crate::value::Value;
use nom::character::complete::{digit1, multispace1, one_of};
use nom::Parser as _;

/// Outcome of asking the reader for the next top-level form.
pub enum ReadResult {
    Form(Value),
    Eof,
}

pub struct Reader<'a, 'rt> {
    input: &'a str,
    pos: usize,
    rt: &'rt mut Runtime,
}

impl<'a, 'rt> Reader<'a, 'rt> {
    pub fn new(input: &'a str, rt: &'rt mut Runtime) -> Self {
        Reader { input, pos: 0, rt }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            let before = self.pos;
            if let Ok((rest, _)) = multispace1::<_, nom::error::Error<&str>>(self.rest()) {
                self.advance(self.rest().len() - rest.len());
            }
            if self.rest().starts_with(';') {
                let line_end = self.rest().find('\n').unwrap_or(self.rest().len());
                self.advance(line_end);
            }
            if self.pos == before {
                break;
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Reads the next top-level form, or `Eof` if only whitespace/comments
    /// remain. EOF mid-list is reported as a parse error, not as `Eof`.
    pub fn read_form(&mut self) -> Result<ReadResult, LispError> {
        self.skip_ws_and_comments();
        if self.rest().is_empty() {
            return Ok(ReadResult::Eof);
        }
        self.read_value().map(ReadResult::Form)
    }

    fn read_value(&mut self) -> Result<Value, LispError> {
        self.skip_ws_and_comments();
        match self.peek_char() {
            None => Err(LispError::parse(ParseErrorKind::EofAtTopLevel, "end of input")),
            Some(open @ ('(' | '[')) => self.read_list(open),
            Some(c @ (')' | ']')) => Err(LispError::parse(
                ParseErrorKind::UnexpectedClosingDelimiter,
                format!("unexpected '{}'", c),
            )),
            Some('\'') => {
                self.advance(1);
                let inner = self.read_value()?;
                let quote_sym = self.rt.intern("quote");
                let nil_tail = self.rt.heap.alloc_pair(inner, Value::Nil);
                let r = self
                    .rt
                    .heap
                    .alloc_pair(Value::Symbol(quote_sym), Value::Pair(nil_tail));
                Ok(Value::Pair(r))
            }
            Some('"') => self.read_string(),
            Some('#') => self.read_hash(),
            Some(c) if c.is_ascii_digit() => self.read_number(false),
            Some('-') | Some('+') if self.looks_like_number() => self.read_signed_number(),
            _ => self.read_symbol(),
        }
    }

    fn looks_like_number(&self) -> bool {
        let rest = self.rest();
        let mut chars = rest.chars();
        let sign = chars.next();
        matches!(sign, Some('-') | Some('+')) && chars.next().is_some_and(|c| c.is_ascii_digit())
    }

    fn read_signed_number(&mut self) -> Result<Value, LispError> {
        let negative = self.peek_char() == Some('-');
        self.advance(1);
        self.read_number(negative)
    }

    fn read_number(&mut self, negative: bool) -> Result<Value, LispError> {
        let (rest, digits) = digit1::<_, nom::error::Error<&str>>(self.rest()).map_err(|_| {
            LispError::parse(ParseErrorKind::InvalidNumberLiteral, "expected digits")
        })?;
        self.advance(self.rest().len() - rest.len());

        if self.peek_char() == Some('.') {
            return Err(LispError::parse(
                ParseErrorKind::InvalidNumberLiteral,
                "floating-point literals are not supported",
            ));
        }
        if self.peek_char().is_some_and(is_symbol_continuation) {
            return Err(LispError::parse(
                ParseErrorKind::InvalidNumberLiteral,
                format!("invalid number literal: {}{}", if negative { "-" } else { "" }, digits),
            ));
        }

        let magnitude: i32 = digits.parse().map_err(|_| {
            LispError::parse(ParseErrorKind::InvalidNumberLiteral, "integer literal out of range")
        })?;
        Ok(Value::Int(if negative { -magnitude } else { magnitude }))
    }

    fn read_hash(&mut self) -> Result<Value, LispError> {
        self.advance(1);
        match self.peek_char() {
            Some('t') | Some('T') => {
                self.advance(1);
                Ok(Value::Bool(true))
            }
            Some('f') | Some('F') => {
                self.advance(1);
                Ok(Value::Bool(false))
            }
            Some('(') => {
                self.advance(1);
                let items = self.read_until_close('(', ')')?;
                Ok(Value::Vector(self.rt.heap.alloc_vector(items)))
            }
            _ => Err(LispError::parse(
                ParseErrorKind::InvalidBooleanLiteral,
                "expected #t, #f, or #( after '#'",
            )),
        }
    }

    fn read_string(&mut self) -> Result<Value, LispError> {
        self.advance(1);
        let mut result = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(LispError::parse(
                        ParseErrorKind::UnexpectedEofMidList,
                        "unterminated string literal",
                    ))
                }
                Some('"') => {
                    self.advance(1);
                    break;
                }
                Some('\\') => {
                    self.advance(1);
                    let escaped = self.peek_char().ok_or_else(|| {
                        LispError::parse(ParseErrorKind::InvalidEscapeSequence, "dangling backslash")
                    })?;
                    let resolved = match escaped {
                        't' => '\t',
                        'f' => '\u{000C}',
                        'n' => '\n',
                        'r' => '\r',
                        '\\' => '\\',
                        '"' => '"',
                        other => {
                            return Err(LispError::parse(
                                ParseErrorKind::InvalidEscapeSequence,
                                format!("invalid escape '\\{}'", other),
                            ))
                        }
                    };
                    result.push(resolved);
                    self.advance(escaped.len_utf8());
                }
                Some(c) => {
                    result.push(c);
                    self.advance(c.len_utf8());
                }
            }
        }
        Ok(Value::Str(self.rt.heap.alloc_str(result)))
    }

    fn read_symbol(&mut self) -> Result<Value, LispError> {
        let (rest, first) =
            one_of::<_, _, nom::error::Error<&str>>("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ+-*/%^><=!?&#")(
                self.rest(),
            )
            .map_err(|_| LispError::parse(ParseErrorKind::InvalidToken, "expected a symbol"))?;
        let mut consumed = self.rest().len() - rest.len();
        let mut tail = rest;
        while let Some(c) = tail.chars().next() {
            if is_symbol_continuation(c) {
                consumed += c.len_utf8();
                tail = &tail[c.len_utf8()..];
            } else {
                break;
            }
        }
        let name = &self.rest()[..consumed];
        self.advance(consumed);
        let _ = first;
        let sym = self.rt.intern(name);
        Ok(Value::Symbol(sym))
    }

    /// Reads a parenthesized form after the opener has already been
    /// consumed by the caller; handles dotted tails and `[`/`]` matching.
    fn read_list(&mut self, open: char) -> Result<Value, LispError> {
        let close = if open == '[' { ']' } else { ')' };
        self.advance(1);

        let mut items = Vec::new();
        let tail = loop {
            self.skip_ws_and_comments();
            match self.peek_char() {
                None => {
                    return Err(LispError::parse(
                        ParseErrorKind::UnexpectedEofMidList,
                        "unterminated list",
                    ))
                }
                Some(c) if c == close => {
                    self.advance(1);
                    break Value::Nil;
                }
                Some(c) if c == ')' || c == ']' => {
                    return Err(LispError::parse(
                        ParseErrorKind::UnexpectedClosingDelimiter,
                        format!("expected '{}', found '{}'", close, c),
                    ))
                }
                Some('.') if self.dot_is_tail_marker() => {
                    self.advance(1);
                    let tail = self.read_value()?;
                    self.skip_ws_and_comments();
                    match self.peek_char() {
                        Some(c) if c == close => {
                            self.advance(1);
                        }
                        _ => {
                            return Err(LispError::parse(
                                ParseErrorKind::UnexpectedClosingDelimiter,
                                "expected closing delimiter after dotted tail",
                            ))
                        }
                    }
                    break tail;
                }
                _ => {
                    items.push(self.read_value()?);
                }
            }
        };

        let mut result = tail;
        for item in items.into_iter().rev() {
            result = Value::Pair(self.rt.heap.alloc_pair(item, result));
        }
        Ok(result)
    }

    /// `.` only marks a dotted tail when followed by whitespace or a
    /// delimiter; `.5` or `a.b` would otherwise be misparsed.
    fn dot_is_tail_marker(&self) -> bool {
        matches!(self.rest().chars().nth(1), None | Some(' ' | '\t' | '\n' | '\r' | '(' | ')'))
    }

    fn read_until_close(&mut self, _open: char, close: char) -> Result<Vec<Value>, LispError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws_and_comments();
            match self.peek_char() {
                None => {
                    return Err(LispError::parse(
                        ParseErrorKind::UnexpectedEofMidList,
                        "unterminated vector literal",
                    ))
                }
                Some(c) if c == close => {
                    self.advance(1);
                    return Ok(items);
                }
                _ => items.push(self.read_value()?),
            }
        }
    }
}

fn is_symbol_continuation(c: char) -> bool {
    c.is_alphanumeric() || "+-*/%^><=!?&#".contains(c)
}

/// Reads every top-level form from `input` into `forms`, in order.
pub fn read_all(input: &str, rt: &mut Runtime) -> Result<Vec<Value>, LispError> {
    let mut reader = Reader::new(input, rt);
    let mut forms = Vec::new();
    loop {
        match reader.read_form()? {
            ReadResult::Form(v) => forms.push(v),
            ReadResult::Eof => break,
        }
    }
    Ok(forms)
}
