//! Single-pass character-stream parser for the JSON dialect.
//!
//! The parser scans left to right with no backtracking. Outside quotes the
//! structural characters `{ } [ ] : ,` drive a stack of open containers;
//! inside quotes everything is literal apart from escapes, which are expanded
//! immediately. A token is committed on `,` or a closing bracket: quoted
//! tokens become strings, bare tokens are matched case-insensitively against
//! `true`/`false`/`null`, then tried as a number, and otherwise kept as a bare
//! string.

use super::{JsonDocument, Node, NodeId, MAX_DEPTH};
use crate::map::JsonMap;
use crate::{Error, Result};
use std::io::Read;
use std::str::Chars;

impl JsonDocument {
    /// Parses a JSON document from text.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use omniser::json::JsonDocument;
    ///
    /// let doc = JsonDocument::parse(r#"{"name": "Alice", "tags": [1, TRUE, null]}"#).unwrap();
    /// assert_eq!(doc.to_json_string(), r#"{"name":"Alice","tags":[1,true,null]}"#);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] for an unterminated string, unbalanced
    /// brackets, a bad escape, a key without a value, trailing input or
    /// nesting deeper than [`MAX_DEPTH`], and [`Error::UnexpectedEof`] for
    /// empty input.
    #[allow(clippy::should_implement_trait)]
    pub fn parse(text: &str) -> Result<Self> {
        Parser::new().run(text)
    }

    /// Parses a JSON document from UTF-8 bytes, skipping a byte order mark.
    ///
    /// # Errors
    ///
    /// Fails on invalid UTF-8 or any error of [`JsonDocument::parse`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let text = std::str::from_utf8(bytes).map_err(|e| Error::invalid_format("json", e))?;
        Self::parse(text)
    }

    /// Parses a JSON document from a reader.
    ///
    /// # Errors
    ///
    /// Fails when reading fails or the text is malformed.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| Error::io(&e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Container {
    Array,
    Object,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Prev {
    Start,
    Open,
    Value,
    Comma,
    Colon,
}

struct Parser {
    doc: JsonDocument,
    stack: Vec<(NodeId, Container)>,
    token: String,
    quoted: bool,
    in_quotes: bool,
    key: Option<String>,
    prev: Prev,
    root_done: bool,
    line: usize,
    col: usize,
}

impl Parser {
    fn new() -> Self {
        Parser {
            doc: JsonDocument::new(),
            stack: Vec::new(),
            token: String::new(),
            quoted: false,
            in_quotes: false,
            key: None,
            prev: Prev::Start,
            root_done: false,
            line: 1,
            col: 0,
        }
    }

    fn run(mut self, text: &str) -> Result<JsonDocument> {
        let mut chars = text.chars();
        while let Some(ch) = self.next_char(&mut chars) {
            if self.in_quotes {
                match ch {
                    '"' => self.in_quotes = false,
                    '\\' => {
                        let expanded = self.escape(&mut chars)?;
                        self.token.push(expanded);
                    }
                    _ => self.token.push(ch),
                }
                continue;
            }

            match ch {
                '"' => self.open_quote()?,
                '{' => self.open(Container::Object)?,
                '[' => self.open(Container::Array)?,
                '}' => self.close(Container::Object)?,
                ']' => self.close(Container::Array)?,
                ':' => self.colon()?,
                ',' => self.comma()?,
                c if c.is_whitespace() => {
                    // Inner whitespace belongs to a bare token; trimmed on commit
                    if !self.quoted && !self.token.is_empty() {
                        self.token.push(c);
                    }
                }
                c => self.bare_char(c)?,
            }
        }
        self.finish()
    }

    fn next_char(&mut self, chars: &mut Chars<'_>) -> Option<char> {
        let ch = chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn error(&self, msg: &str) -> Error {
        Error::syntax(self.line, self.col, msg)
    }

    fn has_token(&self) -> bool {
        self.quoted || !self.token.trim().is_empty()
    }

    fn check_not_finished(&self) -> Result<()> {
        if self.root_done && self.stack.is_empty() {
            return Err(self.error("unexpected characters after the document"));
        }
        Ok(())
    }

    fn check_separated(&self) -> Result<()> {
        if self.prev == Prev::Value && !self.has_token() {
            return Err(self.error("expected ',' between values"));
        }
        Ok(())
    }

    fn open_quote(&mut self) -> Result<()> {
        self.check_not_finished()?;
        self.check_separated()?;
        if self.quoted {
            return Err(self.error("unexpected '\"' after string"));
        }
        if !self.token.trim().is_empty() {
            return Err(self.error("unexpected '\"' inside bare token"));
        }
        self.token.clear();
        self.in_quotes = true;
        self.quoted = true;
        Ok(())
    }

    fn bare_char(&mut self, ch: char) -> Result<()> {
        self.check_not_finished()?;
        if self.quoted {
            return Err(self.error(&format!("unexpected character '{ch}' after string")));
        }
        self.check_separated()?;
        self.token.push(ch);
        Ok(())
    }

    fn open(&mut self, kind: Container) -> Result<()> {
        self.check_not_finished()?;
        self.check_separated()?;
        if self.has_token() {
            return Err(self.error("unexpected bracket after value"));
        }
        if self.stack.len() >= MAX_DEPTH {
            return Err(self.error(&format!("nesting deeper than {MAX_DEPTH} levels")));
        }
        let node = match kind {
            Container::Object => Node::Object(JsonMap::new()),
            Container::Array => Node::Array(Vec::new()),
        };
        let id = self.attach(node)?;
        self.stack.push((id, kind));
        self.prev = Prev::Open;
        Ok(())
    }

    fn close(&mut self, kind: Container) -> Result<()> {
        match self.stack.last() {
            None => return Err(self.error("unbalanced closing bracket")),
            Some(&(_, open)) if open != kind => {
                return Err(self.error("mismatched closing bracket"));
            }
            Some(_) => {}
        }

        if self.has_token() {
            self.commit_token()?;
        } else if self.key.is_some() || self.prev == Prev::Colon {
            return Err(self.error("key without value"));
        } else if self.prev == Prev::Comma {
            return Err(self.error("trailing ','"));
        }

        self.stack.pop();
        self.prev = Prev::Value;
        if self.stack.is_empty() {
            self.root_done = true;
        }
        Ok(())
    }

    fn colon(&mut self) -> Result<()> {
        match self.stack.last() {
            Some(&(_, Container::Object)) => {}
            _ => return Err(self.error("unexpected ':' outside an object")),
        }
        if self.key.is_some() {
            return Err(self.error("unexpected ':' after key"));
        }
        if !self.has_token() {
            return Err(self.error("missing key before ':'"));
        }
        let raw = std::mem::take(&mut self.token);
        let key = if self.quoted {
            raw
        } else {
            raw.trim().to_string()
        };
        self.quoted = false;
        self.key = Some(key);
        self.prev = Prev::Colon;
        Ok(())
    }

    fn comma(&mut self) -> Result<()> {
        if self.stack.is_empty() {
            return Err(self.error("unexpected ','"));
        }
        if self.has_token() {
            self.commit_token()?;
        } else if self.key.is_some() || self.prev == Prev::Colon {
            return Err(self.error("key without value"));
        } else if self.prev != Prev::Value {
            return Err(self.error("unexpected ','"));
        }
        self.prev = Prev::Comma;
        Ok(())
    }

    fn commit_token(&mut self) -> Result<()> {
        let raw = std::mem::take(&mut self.token);
        let node = if self.quoted {
            Node::String(raw)
        } else {
            classify(raw.trim())
        };
        self.quoted = false;
        self.attach(node)?;
        self.prev = Prev::Value;
        Ok(())
    }

    fn attach(&mut self, node: Node) -> Result<NodeId> {
        match self.stack.last().copied() {
            None => {
                if self.root_done {
                    return Err(self.error("multiple root values"));
                }
                self.doc.replace_root(node);
                Ok(self.doc.root())
            }
            Some((parent, Container::Object)) => {
                let key = self
                    .key
                    .take()
                    .ok_or_else(|| self.error("object value without key"))?;
                self.doc.insert(parent, &key, node)
            }
            Some((parent, Container::Array)) => self.doc.push(parent, node),
        }
    }

    fn escape(&mut self, chars: &mut Chars<'_>) -> Result<char> {
        let ch = self
            .next_char(chars)
            .ok_or_else(|| self.error("unterminated escape sequence"))?;
        let expanded = match ch {
            't' => '\t',
            'r' => '\r',
            'n' => '\n',
            'b' => '\u{0008}',
            'f' => '\u{000C}',
            '"' => '"',
            '\\' => '\\',
            '/' => '/',
            'u' => return self.unicode_escape(chars),
            other => return Err(self.error(&format!("invalid escape sequence '\\{other}'"))),
        };
        Ok(expanded)
    }

    fn hex4(&mut self, chars: &mut Chars<'_>) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..4 {
            let ch = self
                .next_char(chars)
                .ok_or_else(|| self.error("truncated unicode escape"))?;
            let digit = ch
                .to_digit(16)
                .ok_or_else(|| self.error("invalid hex digit in unicode escape"))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn unicode_escape(&mut self, chars: &mut Chars<'_>) -> Result<char> {
        let high = self.hex4(chars)?;
        if (0xD800..0xDC00).contains(&high) {
            if self.next_char(chars) != Some('\\') || self.next_char(chars) != Some('u') {
                return Err(self.error("unpaired surrogate in unicode escape"));
            }
            let low = self.hex4(chars)?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(self.error("invalid low surrogate in unicode escape"));
            }
            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            return char::from_u32(code).ok_or_else(|| self.error("invalid unicode code point"));
        }
        char::from_u32(high).ok_or_else(|| self.error("invalid unicode code point"))
    }

    fn finish(mut self) -> Result<JsonDocument> {
        if self.in_quotes {
            return Err(self.error("unterminated string"));
        }
        if !self.stack.is_empty() {
            return Err(self.error("unclosed bracket at end of input"));
        }
        if self.has_token() {
            if self.root_done {
                return Err(self.error("unfinished token after the document"));
            }
            self.commit_token()?;
            self.root_done = true;
        }
        if !self.root_done {
            return Err(Error::unexpected_eof("a JSON value"));
        }
        Ok(self.doc)
    }
}

fn classify(token: &str) -> Node {
    if token.eq_ignore_ascii_case("true") {
        Node::Bool(true)
    } else if token.eq_ignore_ascii_case("false") {
        Node::Bool(false)
    } else if token.eq_ignore_ascii_case("null") {
        Node::Null
    } else {
        match token.parse::<f64>() {
            Ok(n) if n.is_finite() => Node::Number(n),
            _ => Node::String(token.to_string()),
        }
    }
}
