// src/scan/manifest.rs
// =============================================================================
// Parses `__manifest__.py` files without executing them.
//
// A manifest is a single dictionary literal:
//
//     {
//         'name': "Web Widget",
//         'version': '14.0.1.0.0',
//         'depends': ['web'],   # trailing comments are fine
//         'installable': True,
//     }
//
// The parser accepts exactly that shape: string keys, and values that are
// strings, numbers, True/False/None, or lists/tuples/dicts of those.
// Names, calls and operators are rejected, so nothing fetched from a
// remote repository is ever evaluated.
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("{message} at offset {offset}")]
pub struct ManifestError {
    pub offset: usize,
    pub message: String,
}

/// A literal value found in a manifest
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    List(Vec<ManifestValue>),
    Dict(Vec<(String, ManifestValue)>),
}

impl ManifestValue {
    /// Renders the value the way it should appear in a catalog field
    pub fn to_text(&self) -> String {
        match self {
            ManifestValue::Str(s) => s.clone(),
            ManifestValue::Int(i) => i.to_string(),
            ManifestValue::Float(f) => f.to_string(),
            ManifestValue::Bool(true) => "True".to_string(),
            ManifestValue::Bool(false) => "False".to_string(),
            ManifestValue::None => String::new(),
            ManifestValue::List(items) => items
                .iter()
                .map(ManifestValue::to_text)
                .collect::<Vec<_>>()
                .join(", "),
            ManifestValue::Dict(entries) => entries
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v.to_text()))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// The top-level dictionary of a manifest, in source order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    entries: Vec<(String, ManifestValue)>,
}

impl Manifest {
    pub fn get(&self, key: &str) -> Option<&ManifestValue> {
        // a duplicated key resolves to its last value
        self.entries.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Field as text, empty when the key is missing
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(ManifestValue::to_text).unwrap_or_default()
    }
}

/// Removes every line whose first non-blank character is `#`
pub fn strip_comments(code: &str) -> String {
    code.split_inclusive('\n')
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect()
}

/// Parses manifest text into its top-level dictionary
pub fn parse_manifest(text: &str) -> Result<Manifest, ManifestError> {
    let mut parser = Parser::new(text);
    parser.skip_blank();

    let entries = match parser.parse_value()? {
        ManifestValue::Dict(entries) => entries,
        _ => return Err(parser.error("manifest is not a dictionary literal")),
    };

    parser.skip_blank();
    if parser.peek().is_some() {
        return Err(parser.error("unexpected text after the manifest dictionary"));
    }

    Ok(Manifest { entries })
}

/// Deepest nesting of lists, tuples and dicts a manifest may use
const MAX_NESTING: usize = 64;

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> ManifestError {
        ManifestError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn expect(&mut self, c: char) -> Result<(), ManifestError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    /// Skips whitespace, `#` comments and backslash line continuations
    fn skip_blank(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() => self.pos += 1,
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                '\\' if matches!(self.peek_at(1), Some('\n') | Some('\r')) => self.pos += 2,
                _ => break,
            }
        }
    }

    fn parse_value(&mut self) -> Result<ManifestValue, ManifestError> {
        self.skip_blank();
        match self.peek() {
            None => Err(self.error("unexpected end of manifest")),
            Some('{') => self.nested(Self::parse_dict),
            Some('[') => self.nested(|p| p.parse_sequence('[', ']').map(ManifestValue::List)),
            Some('(') => self.nested(Self::parse_parenthesized),
            Some(_) if self.at_string_start() => self.parse_strings(),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.parse_number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_keyword(),
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
        }
    }

    // Each container level is one recursion, capped at MAX_NESTING
    fn nested<F>(&mut self, parse: F) -> Result<ManifestValue, ManifestError>
    where
        F: FnOnce(&mut Self) -> Result<ManifestValue, ManifestError>,
    {
        if self.depth >= MAX_NESTING {
            return Err(self.error("manifest is nested too deeply"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn parse_dict(&mut self) -> Result<ManifestValue, ManifestError> {
        self.expect('{')?;
        let mut entries = Vec::new();

        loop {
            self.skip_blank();
            if self.peek() == Some('}') {
                self.pos += 1;
                break;
            }

            let key = match self.parse_value()? {
                ManifestValue::Str(key) => key,
                _ => return Err(self.error("dictionary keys must be strings")),
            };
            self.skip_blank();
            self.expect(':')?;
            let value = self.parse_value()?;
            entries.push((key, value));

            self.skip_blank();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }

        Ok(ManifestValue::Dict(entries))
    }

    /// Items between `open` and `close`, plus whether a comma was seen
    fn parse_items(&mut self, open: char, close: char) -> Result<(Vec<ManifestValue>, bool), ManifestError> {
        self.expect(open)?;
        let mut items = Vec::new();
        let mut saw_comma = false;

        loop {
            self.skip_blank();
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }

            items.push(self.parse_value()?);

            self.skip_blank();
            match self.peek() {
                Some(',') => {
                    saw_comma = true;
                    self.pos += 1;
                }
                Some(c) if c == close => {}
                _ => return Err(self.error(format!("expected ',' or '{close}'"))),
            }
        }

        Ok((items, saw_comma))
    }

    fn parse_sequence(&mut self, open: char, close: char) -> Result<Vec<ManifestValue>, ManifestError> {
        self.parse_items(open, close).map(|(items, _)| items)
    }

    // `('a' 'b')` is a grouped string, `('a',)` and `()` are tuples
    fn parse_parenthesized(&mut self) -> Result<ManifestValue, ManifestError> {
        let (mut items, saw_comma) = self.parse_items('(', ')')?;
        if items.len() == 1 && !saw_comma {
            return Ok(items.remove(0));
        }
        Ok(ManifestValue::List(items))
    }

    fn at_string_start(&self) -> bool {
        let mut offset = 0;
        while offset < 2 {
            match self.peek_at(offset) {
                Some('u' | 'U' | 'r' | 'R') => offset += 1,
                _ => break,
            }
        }
        matches!(self.peek_at(offset), Some('\'' | '"'))
    }

    /// One or more adjacent string literals, concatenated
    fn parse_strings(&mut self) -> Result<ManifestValue, ManifestError> {
        let mut text = self.parse_string()?;
        loop {
            let save = self.pos;
            self.skip_blank();
            if self.peek().is_some() && self.at_string_start() {
                text.push_str(&self.parse_string()?);
            } else {
                self.pos = save;
                break;
            }
        }
        Ok(ManifestValue::Str(text))
    }

    fn parse_string(&mut self) -> Result<String, ManifestError> {
        let mut raw = false;
        while let Some(c @ ('u' | 'U' | 'r' | 'R')) = self.peek() {
            raw |= matches!(c, 'r' | 'R');
            self.pos += 1;
        }

        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a string")),
        };
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut out = String::new();
        loop {
            let c = match self.peek() {
                Some(c) => c,
                None => return Err(self.error("unterminated string")),
            };

            if c == quote {
                if !triple {
                    self.pos += 1;
                    return Ok(out);
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.pos += 3;
                    return Ok(out);
                }
            }

            if c == '\n' && !triple {
                return Err(self.error("newline in single-quoted string"));
            }

            if c == '\\' {
                self.pos += 1;
                let escaped = self
                    .peek()
                    .ok_or_else(|| self.error("unterminated escape"))?;
                self.pos += 1;
                if raw {
                    out.push('\\');
                    out.push(escaped);
                } else {
                    self.push_escape(escaped, &mut out)?;
                }
                continue;
            }

            out.push(c);
            self.pos += 1;
        }
    }

    fn push_escape(&mut self, escaped: char, out: &mut String) -> Result<(), ManifestError> {
        match escaped {
            '\n' => {}
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' | '\'' | '"' => out.push(escaped),
            'x' => out.push(self.parse_hex_escape(2)?),
            'u' => out.push(self.parse_hex_escape(4)?),
            'U' => out.push(self.parse_hex_escape(8)?),
            other => {
                // unknown escapes are kept verbatim
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn parse_hex_escape(&mut self, digits: usize) -> Result<char, ManifestError> {
        let end = self.pos + digits;
        if end > self.chars.len() {
            return Err(self.error("truncated escape sequence"));
        }
        let hex: String = self.chars[self.pos..end].iter().collect();
        let code = u32::from_str_radix(&hex, 16).map_err(|_| self.error("invalid escape sequence"))?;
        let c = char::from_u32(code).ok_or_else(|| self.error("invalid code point"))?;
        self.pos = end;
        Ok(c)
    }

    fn parse_number(&mut self) -> Result<ManifestValue, ManifestError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '+' | '-')
                && matches!(self.chars.get(self.pos.wrapping_sub(1)), Some('e' | 'E'));
            if c.is_ascii_digit() || matches!(c, '.' | '_' | 'e' | 'E') || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }

        let literal: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();

        if let Ok(i) = literal.parse::<i64>() {
            return Ok(ManifestValue::Int(i));
        }
        literal
            .parse::<f64>()
            .map(ManifestValue::Float)
            .map_err(|_| ManifestError {
                offset: start,
                message: format!("invalid number '{literal}'"),
            })
    }

    fn parse_keyword(&mut self) -> Result<ManifestValue, ManifestError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }

        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" => Ok(ManifestValue::Bool(true)),
            "False" => Ok(ManifestValue::Bool(false)),
            "None" => Ok(ManifestValue::None),
            _ => Err(ManifestError {
                offset: start,
                message: format!("'{word}' is not a literal"),
            }),
        }
    }
}
