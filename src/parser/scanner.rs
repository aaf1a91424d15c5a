//! Character-level cursor over `.api` source.
//!
//! The grammar is context sensitive (paths, unquoted property values, raw
//! tags), so instead of a separate token stream the parser pulls exactly the
//! lexeme it expects next from this cursor.

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// A `//` or `/* */` comment, markers included.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
}

pub struct Scanner<'a> {
    src: &'a str,
    file: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str, file: &'a str) -> Self {
        // tolerate a UTF-8 BOM
        let src = src.strip_prefix('\u{feff}').unwrap_or(src);
        Scanner { src, file, offset: 0, line: 1, column: 1 }
    }

    // ————————————————————————————————————————————————————————————————————————————
    // POSITION & ERRORS
    // ————————————————————————————————————————————————————————————————————————————

    pub fn position(&self) -> Position {
        Position { line: self.line, column: self.column }
    }

    pub fn error(&self, message: impl Into<String>) -> Error {
        self.error_at(self.position(), message)
    }

    pub fn error_at(&self, at: Position, message: impl Into<String>) -> Error {
        Error::Parse {
            file: self.file.to_string(),
            line: at.line,
            column: at.column,
            message: message.into(),
        }
    }

    /// Human-readable description of the next character, for diagnostics.
    pub fn describe_next(&self) -> String {
        match self.peek() {
            None => "end of file".to_string(),
            Some('\n') => "end of line".to_string(),
            Some(c) => format!("{c:?}"),
        }
    }

    // ————————————————————————————————————————————————————————————————————————————
    // RAW CURSOR
    // ————————————————————————————————————————————————————————————————————————————

    fn rest(&self) -> &'a str {
        let src = self.src;
        &src[self.offset..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.src.len()
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    pub fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    /// True if `word` is next and is not the prefix of a longer identifier.
    pub fn at_keyword(&self, word: &str) -> bool {
        self.starts_with(word)
            && !self.rest()[word.len()..].chars().next().is_some_and(is_ident_continue)
    }

    pub fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn eat_str(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            for _ in s.chars() {
                self.bump();
            }
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, c: char) -> Result<(), Error> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected {c:?}, found {}", self.describe_next())))
        }
    }

    fn take_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'a str {
        let start = self.offset;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
        let src = self.src;
        &src[start..self.offset]
    }

    // ————————————————————————————————————————————————————————————————————————————
    // TRIVIA
    // ————————————————————————————————————————————————————————————————————————————

    /// Skip spaces and tabs on the current line.
    pub fn skip_inline_space(&mut self) {
        self.take_while(|c| c == ' ' || c == '\t' || c == '\r');
    }

    /// Skip all whitespace and comments, returning the comments in order.
    pub fn skip_trivia(&mut self) -> Result<Vec<Comment>, Error> {
        let mut comments = Vec::new();
        loop {
            self.take_while(char::is_whitespace);
            match self.comment()? {
                Some(comment) => comments.push(comment),
                None => return Ok(comments),
            }
        }
    }

    /// A comment that starts on the current line, after inline space.
    pub fn trailing_comment(&mut self) -> Result<Option<Comment>, Error> {
        self.skip_inline_space();
        self.comment()
    }

    fn comment(&mut self) -> Result<Option<Comment>, Error> {
        if self.starts_with("//") {
            let text = self.take_while(|c| c != '\n');
            return Ok(Some(Comment { text: text.trim_end().to_string() }));
        }
        if self.starts_with("/*") {
            let at = self.position();
            let start = self.offset;
            self.eat_str("/*");
            loop {
                if self.eat_str("*/") {
                    break;
                }
                if self.bump().is_none() {
                    return Err(self.error_at(at, "unterminated block comment"));
                }
            }
            let src = self.src;
            return Ok(Some(Comment { text: src[start..self.offset].to_string() }));
        }
        Ok(None)
    }

    // ————————————————————————————————————————————————————————————————————————————
    // LEXEMES
    // ————————————————————————————————————————————————————————————————————————————

    pub fn ident(&mut self) -> Result<&'a str, Error> {
        match self.peek() {
            Some(c) if is_ident_start(c) => Ok(self.take_while(is_ident_continue)),
            _ => Err(self.error(format!("expected identifier, found {}", self.describe_next()))),
        }
    }

    /// Service names and property keys also allow `-` (`user-api`, `max-bytes`).
    pub fn dashed_ident(&mut self) -> Result<&'a str, Error> {
        match self.peek() {
            Some(c) if is_ident_start(c) => Ok(self.take_while(|c| is_ident_continue(c) || c == '-')),
            _ => Err(self.error(format!("expected name, found {}", self.describe_next()))),
        }
    }

    pub fn digits(&mut self) -> &'a str {
        self.take_while(|c| c.is_ascii_digit())
    }

    /// A double-quoted string literal, returned unquoted and unescaped.
    pub fn string(&mut self) -> Result<String, Error> {
        let at = self.position();
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error_at(at, "unterminated string literal")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c @ ('"' | '\\')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err(self.error_at(at, "unterminated string literal")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    /// A backtick-delimited struct tag, returned verbatim (backticks included).
    pub fn raw_tag(&mut self) -> Result<&'a str, Error> {
        let at = self.position();
        let start = self.offset;
        self.expect('`')?;
        self.take_while(|c| c != '`');
        if !self.eat('`') {
            return Err(self.error_at(at, "unterminated struct tag"));
        }
        let src = self.src;
        Ok(&src[start..self.offset])
    }

    /// A route path: everything up to whitespace or `(`.
    pub fn path(&mut self) -> &'a str {
        self.take_while(|c| !c.is_whitespace() && c != '(')
    }

    /// Unquoted property value. It ends at a newline, at `)`, at a `//`
    /// comment, or where the next `key:` entry starts on the same line.
    pub fn bare_value(&mut self) -> String {
        let start = self.offset;
        let mut after_space = true;
        while let Some(c) = self.peek() {
            if c == '\n' || c == ')' {
                break;
            }
            if after_space && self.starts_with("//") {
                break;
            }
            if after_space && self.offset > start && starts_with_property_key(self.rest()) {
                break;
            }
            after_space = c.is_whitespace();
            self.bump();
        }
        let src = self.src;
        src[start..self.offset].trim().to_string()
    }
}

/// `name:` or `dashed-name:` with optional space before the colon.
fn starts_with_property_key(text: &str) -> bool {
    let mut chars = text.chars().peekable();
    if !chars.next().is_some_and(is_ident_start) {
        return false;
    }
    while chars.next_if(|&c| is_ident_continue(c) || c == '-').is_some() {}
    while chars.next_if(|&c| c == ' ' || c == '\t').is_some() {}
    chars.next() == Some(':')
}

pub fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

pub fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_track_lines_and_columns() {
        let mut s = Scanner::new("ab\n  cd", "t.api");
        assert_eq!(s.ident().unwrap(), "ab");
        s.skip_trivia().unwrap();
        assert_eq!(s.position(), Position { line: 2, column: 3 });
        assert_eq!(s.ident().unwrap(), "cd");
        assert!(s.is_eof());
    }

    #[test]
    fn trivia_collects_both_comment_styles() {
        let mut s = Scanner::new("// one\n\n/* two\n lines */  next", "t.api");
        let comments = s.skip_trivia().unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0], Comment { text: "// one".into() });
        assert_eq!(comments[1].text, "/* two\n lines */");
        assert!(s.at_keyword("next"));
    }

    #[test]
    fn strings_unescape() {
        let mut s = Scanner::new(r#""say \"hi\"\n""#, "t.api");
        assert_eq!(s.string().unwrap(), "say \"hi\"\n");
    }

    #[test]
    fn unterminated_string_reports_its_start() {
        let mut s = Scanner::new("  \"oops\n", "t.api");
        s.skip_inline_space();
        match s.string() {
            Err(Error::Parse { line, column, message, .. }) => {
                assert_eq!((line, column), (1, 3));
                assert!(message.contains("unterminated"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn bare_values_stop_at_paren_and_drop_comments() {
        let mut s = Scanner::new("/v1 // api prefix\n", "t.api");
        assert_eq!(s.bare_value(), "/v1");
        let mut s = Scanner::new("user)", "t.api");
        assert_eq!(s.bare_value(), "user");
        assert_eq!(s.peek(), Some(')'));
        let mut s = Scanner::new("http://example.com\n", "t.api");
        assert_eq!(s.bare_value(), "http://example.com");
        let mut s = Scanner::new("localhost:8080\n", "t.api");
        assert_eq!(s.bare_value(), "localhost:8080");
    }

    #[test]
    fn bare_values_stop_at_the_next_key() {
        let mut s = Scanner::new("user prefix: /api)", "t.api");
        assert_eq!(s.bare_value(), "user");
        assert!(s.starts_with("prefix:"));
        let mut s = Scanner::new("Cors, Log max-bytes : 1024", "t.api");
        assert_eq!(s.bare_value(), "Cors, Log");
        assert!(s.starts_with("max-bytes"));
    }

    #[test]
    fn keywords_do_not_match_identifier_prefixes() {
        let s = Scanner::new("returnsValue", "t.api");
        assert!(!s.at_keyword("returns"));
        let s = Scanner::new("returns (X)", "t.api");
        assert!(s.at_keyword("returns"));
    }

    #[test]
    fn raw_tags_keep_backticks() {
        let mut s = Scanner::new("`json:\"id\"` // c", "t.api");
        assert_eq!(s.raw_tag().unwrap(), "`json:\"id\"`");
        assert_eq!(s.trailing_comment().unwrap().unwrap().text, "// c");
    }
}
