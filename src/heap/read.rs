/// Reading Prolog term text into the heap.
///
/// Supports the subset of standard syntax the list library needs: numbers,
/// atoms, variables, strings, compounds, lists, curly terms, dicts, and the
/// infix operators `:`, `*`, `/`, `+`, `-`, `=` and `,`.
use std::collections::HashMap;

use memchr::{memchr, memchr2, memmem};

use super::atom::Atom;
use super::core::{Cell, Heap, TermRef};
use super::write::{infix_op, is_symbol_char};
use crate::common::PlError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Atom(String),
    /// Atom immediately followed by `(`.
    Functor(String),
    Var(String),
    /// Atom or variable immediately followed by `{`.
    DictTag(Box<Token>),
    Int(i64),
    Float(f64),
    Str(String),
    Punct(u8),
    End,
}

#[derive(Debug, Clone)]
struct Lexeme {
    token: Token,
    start: usize,
    end: usize,
}

fn syntax(message: impl Into<String>, offset: usize) -> PlError {
    PlError::Syntax {
        message: message.into(),
        offset,
    }
}

struct Lexer<'s> {
    src: &'s [u8],
    pos: usize,
}

impl<'s> Lexer<'s> {
    fn peek_byte(&self, at: usize) -> Option<u8> {
        self.src.get(at).copied()
    }

    fn skip_layout(&mut self) -> Result<(), PlError> {
        while let Some(b) = self.peek_byte(self.pos) {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'%' {
                self.pos = match memchr(b'\n', &self.src[self.pos..]) {
                    Some(n) => self.pos + n + 1,
                    None => self.src.len(),
                };
            } else if b == b'/' && self.peek_byte(self.pos + 1) == Some(b'*') {
                match memmem::find(&self.src[self.pos + 2..], b"*/") {
                    Some(n) => self.pos += n + 4,
                    None => return Err(syntax("unterminated block comment", self.pos)),
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Lexeme>, PlError> {
        self.skip_layout()?;
        let start = self.pos;
        let Some(b) = self.peek_byte(start) else {
            return Ok(None);
        };

        let token = match b {
            b'0'..=b'9' => self.number()?,
            b'_' | b'A'..=b'Z' => {
                let name = self.word();
                self.glued(Token::Var(name))
            }
            b'a'..=b'z' => {
                let name = self.word();
                self.glued(Token::Atom(name))
            }
            b'\'' => {
                let name = self.quoted(b'\'')?;
                self.glued(Token::Atom(name))
            }
            b'"' => Token::Str(self.quoted(b'"')?),
            b'(' | b')' | b'[' | b']' | b'{' | b'}' | b',' | b'|' => {
                self.pos += 1;
                Token::Punct(b)
            }
            b'!' | b';' => {
                self.pos += 1;
                self.glued(Token::Atom((b as char).to_string()))
            }
            b'.' if self
                .peek_byte(start + 1)
                .is_none_or(|c| c.is_ascii_whitespace() || c == b'%') =>
            {
                self.pos += 1;
                Token::End
            }
            b if is_symbol_char(b) => {
                let end = self.src[start..]
                    .iter()
                    .position(|&c| !is_symbol_char(c))
                    .map_or(self.src.len(), |n| start + n);
                self.pos = end;
                let name = String::from_utf8_lossy(&self.src[start..end]).into_owned();
                // `a-(b)` is an infix expression, `@<(a, b)` is a compound.
                if name != "-" && infix_op(&name).is_none() && self.peek_byte(end) == Some(b'(') {
                    self.pos += 1;
                    Token::Functor(name)
                } else {
                    Token::Atom(name)
                }
            }
            _ => return Err(syntax("illegal character", start)),
        };
        Ok(Some(Lexeme {
            token,
            start,
            end: self.pos,
        }))
    }

    /// Turn a name into a functor or dict tag when `(` or `{` follows directly.
    fn glued(&mut self, token: Token) -> Token {
        match (self.peek_byte(self.pos), token) {
            (Some(b'('), Token::Atom(name)) => {
                self.pos += 1;
                Token::Functor(name)
            }
            (Some(b'{'), token) => {
                self.pos += 1;
                Token::DictTag(Box::new(token))
            }
            (_, token) => token,
        }
    }

    fn word(&mut self) -> String {
        let start = self.pos;
        let end = self.src[start..]
            .iter()
            .position(|&c| !(c.is_ascii_alphanumeric() || c == b'_'))
            .map_or(self.src.len(), |n| start + n);
        self.pos = end;
        String::from_utf8_lossy(&self.src[start..end]).into_owned()
    }

    fn number(&mut self) -> Result<Token, PlError> {
        let start = self.pos;
        let digits = |s: &[u8], from: usize| {
            s[from..]
                .iter()
                .position(|c| !c.is_ascii_digit())
                .map_or(s.len(), |n| from + n)
        };
        let mut end = digits(self.src, start);
        let mut float = false;
        if self.peek_byte(end) == Some(b'.') && self.peek_byte(end + 1).is_some_and(|c| c.is_ascii_digit())
        {
            end = digits(self.src, end + 1);
            float = true;
        }
        if matches!(self.peek_byte(end), Some(b'e' | b'E')) {
            let mut exp = end + 1;
            if matches!(self.peek_byte(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            if self.peek_byte(exp).is_some_and(|c| c.is_ascii_digit()) {
                end = digits(self.src, exp);
                float = true;
            }
        }
        self.pos = end;
        let text = std::str::from_utf8(&self.src[start..end])
            .map_err(|_| syntax("illegal number", start))?;
        if float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| syntax("illegal number", start))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| syntax("integer overflow", start))
        }
    }

    fn quoted(&mut self, quote: u8) -> Result<String, PlError> {
        let start = self.pos;
        self.pos += 1;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let rest = &self.src[self.pos..];
            let Some(n) = memchr2(quote, b'\\', rest) else {
                return Err(syntax("unterminated quoted", start));
            };
            out.extend_from_slice(&rest[..n]);
            self.pos += n;
            if self.src[self.pos] == quote {
                if self.peek_byte(self.pos + 1) == Some(quote) {
                    out.push(quote);
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                break;
            }
            let escaped = match self.peek_byte(self.pos + 1) {
                Some(b'n') => b'\n',
                Some(b't') => b'\t',
                Some(b'\\') => b'\\',
                Some(b'\'') => b'\'',
                Some(b'"') => b'"',
                Some(b'`') => b'`',
                _ => return Err(syntax("undefined escape sequence", self.pos)),
            };
            out.push(escaped);
            self.pos += 2;
        }
        String::from_utf8(out).map_err(|_| syntax("illegal UTF-8 in quoted", start))
    }
}

/// Reads a sequence of `.`-terminated terms.
pub struct TermReader<'s> {
    lexer: Lexer<'s>,
    peeked: Option<Lexeme>,
}

struct Parse<'h> {
    heap: &'h mut Heap,
    vars: HashMap<String, TermRef>,
}

impl<'s> TermReader<'s> {
    pub fn new(text: &'s str) -> Self {
        TermReader {
            lexer: Lexer {
                src: text.as_bytes(),
                pos: 0,
            },
            peeked: None,
        }
    }

    /// Byte offset of the next unread token.
    pub fn offset(&self) -> usize {
        self.peeked.as_ref().map_or(self.lexer.pos, |l| l.start)
    }

    fn peek(&mut self) -> Result<Option<&Lexeme>, PlError> {
        if self.peeked.is_none() {
            self.peeked = self.lexer.next()?;
        }
        Ok(self.peeked.as_ref())
    }

    fn bump(&mut self) -> Result<Option<Lexeme>, PlError> {
        match self.peeked.take() {
            Some(l) => Ok(Some(l)),
            None => self.lexer.next(),
        }
    }

    fn expect_punct(&mut self, p: u8) -> Result<(), PlError> {
        match self.bump()? {
            Some(Lexeme {
                token: Token::Punct(q),
                ..
            }) if q == p => Ok(()),
            Some(l) => Err(syntax(format!("expected `{}'", p as char), l.start)),
            None => Err(syntax(format!("expected `{}'", p as char), self.lexer.pos)),
        }
    }

    fn at_punct(&mut self, p: u8) -> Result<bool, PlError> {
        Ok(matches!(
            self.peek()?,
            Some(Lexeme {
                token: Token::Punct(q),
                ..
            }) if *q == p
        ))
    }

    /// Read the next term. `Ok(None)` at end of input.
    pub fn next_term(&mut self, heap: &mut Heap) -> Result<Option<TermRef>, PlError> {
        if self.peek()?.is_none() {
            return Ok(None);
        }
        let frame = heap.frame();
        let mark = heap.mark();
        let result = self.read_clause(heap);
        match result {
            Ok(t) => {
                let cell = heap.get(t);
                heap.discard_frame(frame);
                Ok(Some(heap.new_term_ref(cell)))
            }
            Err(e) => {
                heap.discard_frame(frame);
                heap.reset_to(mark);
                Err(e)
            }
        }
    }

    fn read_clause(&mut self, heap: &mut Heap) -> Result<TermRef, PlError> {
        let mut p = Parse {
            heap,
            vars: HashMap::new(),
        };
        let (t, _) = self.parse(&mut p, 1200)?;
        match self.bump()? {
            None
            | Some(Lexeme {
                token: Token::End, ..
            }) => Ok(t),
            Some(l) => Err(syntax("operator expected", l.start)),
        }
    }

    /// Skip input up to and including the next end token, to resume after an error.
    pub fn skip_to_end(&mut self) {
        self.peeked = None;
        loop {
            match self.lexer.next() {
                Ok(None) => return,
                Ok(Some(Lexeme {
                    token: Token::End, ..
                })) => return,
                Ok(Some(_)) => {}
                Err(_) => self.lexer.pos += 1,
            }
        }
    }

    fn parse(&mut self, p: &mut Parse<'_>, max_prec: u16) -> Result<(TermRef, u16), PlError> {
        let (mut left, mut left_prec) = self.primary(p, max_prec)?;
        loop {
            let op = match self.peek()? {
                Some(Lexeme {
                    token: Token::Atom(name),
                    ..
                }) => infix_op(name).map(|(prec, l, r)| (name.clone(), prec, l, r)),
                Some(Lexeme {
                    token: Token::Punct(b','),
                    ..
                }) => Some((",".to_string(), 1000, 999, 1000)),
                _ => None,
            };
            let Some((name, prec, lmax, rmax)) = op else {
                break;
            };
            if prec > max_prec || left_prec > lmax {
                break;
            }
            self.bump()?;
            let (right, _) = self.parse(p, rmax)?;
            let functor = p.heap.intern(&name);
            left = p.heap.compound(functor, &[left, right])?;
            left_prec = prec;
        }
        Ok((left, left_prec))
    }

    fn can_start_term(&mut self) -> Result<bool, PlError> {
        Ok(match self.peek()? {
            None => false,
            Some(l) => match &l.token {
                Token::End => false,
                Token::Punct(c) => matches!(c, b'(' | b'[' | b'{'),
                Token::Atom(name) => infix_op(name).is_none(),
                _ => true,
            },
        })
    }

    fn primary(&mut self, p: &mut Parse<'_>, max_prec: u16) -> Result<(TermRef, u16), PlError> {
        let Some(lex) = self.bump()? else {
            return Err(syntax("unexpected end of file", self.lexer.pos));
        };
        match lex.token {
            Token::Int(i) => Ok((p.heap.int_term(i), 0)),
            Token::Float(f) => Ok((p.heap.float_term(f), 0)),
            Token::Str(s) => Ok((p.heap.string_term(&s), 0)),
            Token::Var(name) => Ok((self.variable(p, name)?, 0)),
            Token::Atom(name) if name == "-" => {
                // Negative numeric literal: `-` glued to a number.
                let literal = match self.peek()? {
                    Some(next) if next.start == lex.end => match next.token {
                        Token::Int(i) => Some(Cell::Int(-i)),
                        Token::Float(f) => Some(Cell::Float(-f)),
                        _ => None,
                    },
                    _ => None,
                };
                if let Some(number) = literal {
                    self.bump()?;
                    return Ok((p.heap.new_term_ref(number), 0));
                }
                if max_prec >= 200 && self.can_start_term()? {
                    let (arg, _) = self.parse(p, 200)?;
                    let minus = Atom::MINUS;
                    return Ok((p.heap.compound(minus, &[arg])?, 200));
                }
                Ok((p.heap.atom_term(&name), 0))
            }
            Token::Atom(name) => Ok((p.heap.atom_term(&name), 0)),
            Token::Functor(name) => {
                let mut args = Vec::new();
                loop {
                    let (arg, _) = self.parse(p, 999)?;
                    args.push(arg);
                    if self.at_punct(b',')? {
                        self.bump()?;
                        continue;
                    }
                    self.expect_punct(b')')?;
                    break;
                }
                let functor = p.heap.intern(&name);
                Ok((p.heap.compound(functor, &args)?, 0))
            }
            Token::Punct(b'(') => {
                let (t, _) = self.parse(p, 1200)?;
                self.expect_punct(b')')?;
                Ok((t, 0))
            }
            Token::Punct(b'[') => {
                if self.at_punct(b']')? {
                    self.bump()?;
                    return Ok((p.heap.new_term_ref(Cell::NIL), 0));
                }
                let mut items = Vec::new();
                let mut tail = None;
                loop {
                    let (item, _) = self.parse(p, 999)?;
                    items.push(item);
                    if self.at_punct(b',')? {
                        self.bump()?;
                        continue;
                    }
                    if self.at_punct(b'|')? {
                        self.bump()?;
                        tail = Some(self.parse(p, 999)?.0);
                    }
                    self.expect_punct(b']')?;
                    break;
                }
                Ok((p.heap.list(&items, tail)?, 0))
            }
            Token::Punct(b'{') => {
                if self.at_punct(b'}')? {
                    self.bump()?;
                    let curly = Atom::CURLY;
                    return Ok((p.heap.new_term_ref(Cell::Atom(curly)), 0));
                }
                let (t, _) = self.parse(p, 1200)?;
                self.expect_punct(b'}')?;
                Ok((p.heap.compound(Atom::CURLY, &[t])?, 0))
            }
            Token::DictTag(tag) => {
                let tag = match *tag {
                    Token::Var(name) => self.variable(p, name)?,
                    Token::Atom(name) => p.heap.atom_term(&name),
                    _ => return Err(syntax("illegal dict tag", lex.start)),
                };
                Ok((self.dict_body(p, tag, lex.start)?, 0))
            }
            Token::Punct(_) | Token::End => Err(syntax("unexpected token", lex.start)),
        }
    }

    fn variable(&mut self, p: &mut Parse<'_>, name: String) -> Result<TermRef, PlError> {
        if name == "_" {
            return p.heap.new_var();
        }
        if let Some(&t) = p.vars.get(&name) {
            return Ok(t);
        }
        let t = p.heap.new_var()?;
        p.vars.insert(name, t);
        Ok(t)
    }

    fn dict_body(&mut self, p: &mut Parse<'_>, tag: TermRef, start: usize) -> Result<TermRef, PlError> {
        let mut pairs: Vec<(Cell, TermRef)> = Vec::new();
        if self.at_punct(b'}')? {
            self.bump()?;
            return p.heap.dict(tag, &pairs);
        }
        loop {
            let key = match self.bump()? {
                Some(Lexeme {
                    token: Token::Atom(name),
                    ..
                }) => Cell::Atom(p.heap.intern(&name)),
                Some(Lexeme {
                    token: Token::Int(i),
                    ..
                }) => Cell::Int(i),
                Some(l) => return Err(syntax("dict key expected", l.start)),
                None => return Err(syntax("unexpected end of file", self.lexer.pos)),
            };
            if pairs.iter().any(|&(k, _)| k == key) {
                return Err(syntax("duplicate_key", start));
            }
            match self.bump()? {
                Some(Lexeme {
                    token: Token::Atom(colon),
                    ..
                }) if colon == ":" => {}
                Some(l) => return Err(syntax("expected `:'", l.start)),
                None => return Err(syntax("unexpected end of file", self.lexer.pos)),
            }
            let (value, _) = self.parse(p, 999)?;
            pairs.push((key, value));
            if self.at_punct(b',')? {
                self.bump()?;
                continue;
            }
            self.expect_punct(b'}')?;
            break;
        }
        p.heap.dict(tag, &pairs)
    }
}

impl Heap {
    /// Read exactly one term from `text`; a final `.` is optional.
    pub fn read_term(&mut self, text: &str) -> Result<TermRef, PlError> {
        let mut reader = TermReader::new(text);
        let Some(t) = reader.next_term(self)? else {
            return Err(syntax("unexpected end of file", 0));
        };
        if reader.peek()?.is_some() {
            return Err(syntax("end of clause expected", reader.offset()));
        }
        Ok(t)
    }
}
