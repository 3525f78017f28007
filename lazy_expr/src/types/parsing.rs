//! Parsing of the textual type notation.
//!
//! Accepts exactly what `Display` produces, with insignificant whitespace:
//! `dict<str, array<struct{a: int32, `b.c`: float64}>>`.

use std::str::FromStr;

use super::ExprType;
use crate::error::ExprError;

struct TypeParser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self) -> ExprError {
        ExprError::InvalidTypeString(self.src.to_string())
    }

    fn skip_ws(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.get(self.pos).copied()
    }

    fn expect(&mut self, c: char) -> Result<(), ExprError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error())
        }
    }

    /// Consume `c` if it is next
    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn word(&mut self) -> Result<String, ExprError> {
        self.skip_ws();
        let start = self.pos;
        while self
            .chars
            .get(self.pos)
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error());
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn field_name(&mut self) -> Result<String, ExprError> {
        if self.peek() != Some('`') {
            return self.word();
        }
        self.pos += 1;
        let mut name = String::new();
        loop {
            match self.chars.get(self.pos).copied() {
                Some('`') => {
                    self.pos += 1;
                    return Ok(name);
                }
                Some('\\') => {
                    let escaped = self.chars.get(self.pos + 1).copied().ok_or_else(|| self.error())?;
                    name.push(escaped);
                    self.pos += 2;
                }
                Some(c) => {
                    name.push(c);
                    self.pos += 1;
                }
                None => return Err(self.error()),
            }
        }
    }

    fn parse_type(&mut self) -> Result<ExprType, ExprError> {
        let head = self.word()?;
        let t = match head.as_str() {
            "bool" => ExprType::Bool,
            "int32" => ExprType::Int32,
            "int64" => ExprType::Int64,
            "float32" => ExprType::Float32,
            "float64" => ExprType::Float64,
            "str" => ExprType::Str,
            "call" => ExprType::Call,
            "locus" => {
                self.expect('<')?;
                let genome = self.word()?;
                self.expect('>')?;
                ExprType::Locus(genome)
            }
            "interval" | "array" | "set" => {
                self.expect('<')?;
                let inner = self.parse_type()?;
                self.expect('>')?;
                match head.as_str() {
                    "interval" => ExprType::interval(inner),
                    "array" => ExprType::array(inner),
                    _ => ExprType::set(inner),
                }
            }
            "dict" => {
                self.expect('<')?;
                let key = self.parse_type()?;
                self.expect(',')?;
                let value = self.parse_type()?;
                self.expect('>')?;
                ExprType::dict(key, value)
            }
            "ndarray" => {
                self.expect('<')?;
                let elem = self.parse_type()?;
                self.expect(',')?;
                let ndim = self.word()?.parse::<usize>().map_err(|_| self.error())?;
                self.expect('>')?;
                ExprType::ndarray(elem, ndim)
            }
            "struct" => {
                self.expect('{')?;
                let mut fields: Vec<(String, ExprType)> = Vec::new();
                if !self.eat('}') {
                    loop {
                        let name = self.field_name()?;
                        self.expect(':')?;
                        let t = self.parse_type()?;
                        if fields.iter().any(|(n, _)| *n == name) {
                            return Err(self.error());
                        }
                        fields.push((name, t));
                        if self.eat('}') {
                            break;
                        }
                        self.expect(',')?;
                    }
                }
                ExprType::Struct(fields)
            }
            "tuple" => {
                self.expect('(')?;
                let mut types = Vec::new();
                if !self.eat(')') {
                    loop {
                        types.push(self.parse_type()?);
                        if self.eat(')') {
                            break;
                        }
                        self.expect(',')?;
                    }
                }
                ExprType::Tuple(types)
            }
            _ => return Err(self.error()),
        };
        Ok(t)
    }
}

impl FromStr for ExprType {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeParser::new(s);
        let t = parser.parse_type()?;
        if parser.peek().is_some() {
            return Err(parser.error());
        }
        Ok(t)
    }
}
