//! Permissive JavaScript-ish lexer
//!
//! Produces a rough structural view of source text: identifiers, numbers,
//! strings and single-character symbols. Comments and whitespace are skipped.
//! It never fails; malformed input yields best-effort tokens.

use std::str::Chars;

use super::token::{Token, TokenKind};

/// Lazy token stream over a source string
///
/// Holds only cursor state (current character, offset, line).
pub struct TokenStream<'a> {
    chars: Chars<'a>,
    current: Option<char>,
    /// Char offset of `current`
    offset: usize,
    line: usize,
}

impl<'a> TokenStream<'a> {
    /// Create a stream positioned at the start of `source`
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            chars,
            current,
            offset: 0,
            line: if current == Some('\n') { 2 } else { 1 },
        }
    }

    /// Return the next token, or `None` at end of input
    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            while matches!(self.current, Some(' ' | '\t' | '\n' | '\r')) {
                self.bump();
            }

            let ch = self.current?;
            let start = self.offset;
            let line = self.line;

            if ch == '/' {
                self.bump();
                match self.current {
                    Some('/') => {
                        while !matches!(self.current, None | Some('\n')) {
                            self.bump();
                        }
                        continue;
                    }
                    Some('*') => {
                        self.skip_block_comment();
                        continue;
                    }
                    _ => return Some(self.finish(TokenKind::Symbol, "/".into(), None, start, line)),
                }
            }

            let mut raw = String::new();
            let token = if is_ident_start(ch) {
                while let Some(c) = self.current.filter(|&c| is_ident_continue(c)) {
                    raw.push(c);
                    self.bump();
                }
                self.finish(TokenKind::Identifier, raw, None, start, line)
            } else if ch.is_ascii_digit() {
                while let Some(c) = self.current.filter(|&c| c.is_ascii_digit() || c == '.') {
                    raw.push(c);
                    self.bump();
                }
                self.finish(TokenKind::Number, raw, None, start, line)
            } else if matches!(ch, '"' | '\'' | '`') {
                let value = self.lex_string(ch, &mut raw);
                self.finish(TokenKind::String, raw, Some(value), start, line)
            } else {
                raw.push(ch);
                self.bump();
                self.finish(TokenKind::Symbol, raw, None, start, line)
            };
            return Some(token);
        }
    }

    fn bump(&mut self) {
        if self.current.is_none() {
            return;
        }
        self.current = self.chars.next();
        self.offset += 1;
        if self.current == Some('\n') {
            self.line += 1;
        }
    }

    /// Called with the cursor on the `*` of `/*`; consumes through `*/`
    /// or to end of input
    fn skip_block_comment(&mut self) {
        self.bump();
        let mut last = None;
        while let Some(ch) = self.current {
            self.bump();
            if last == Some('*') && ch == '/' {
                return;
            }
            last = Some(ch);
        }
    }

    /// Consumes a quoted string, appending its source to `raw` and
    /// returning the unescaped content
    fn lex_string(&mut self, quote: char, raw: &mut String) -> String {
        let mut value = String::new();
        raw.push(quote);
        self.bump();

        while let Some(ch) = self.current.filter(|&c| c != quote) {
            raw.push(ch);
            if ch == '\\' {
                self.bump();
                match self.current {
                    Some(escaped) => raw.push(escaped),
                    None => break,
                }
            }
            if let Some(c) = self.current {
                value.push(c);
            }
            self.bump();
        }

        // unterminated strings end silently at end of input
        if self.current == Some(quote) {
            raw.push(quote);
            self.bump();
        }
        value
    }

    fn finish(
        &self,
        kind: TokenKind,
        raw: String,
        value: Option<String>,
        start: usize,
        line: usize,
    ) -> Token {
        Token {
            kind,
            value: value.unwrap_or_else(|| raw.clone()),
            raw,
            start,
            end: self.offset,
            line,
        }
    }
}

impl Iterator for TokenStream<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_continue(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        TokenStream::new(source).collect()
    }

    #[test]
    fn test_line_comment_skipped() {
        let tokens = lex("// c\nfoo");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].raw, "foo");
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn test_block_comment_tracks_lines() {
        let tokens = lex("a\n/* x\ny */ b");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].raw, "b");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_unterminated_block_comment_consumes_rest() {
        let tokens = lex("a /* never closed (");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].raw, "a");
    }

    #[test]
    fn test_lone_slash_is_symbol() {
        let tokens = lex("a / b");
        assert_eq!(tokens.len(), 3);
        assert!(tokens[1].is_symbol('/'));
        assert_eq!((tokens[1].start, tokens[1].end), (2, 3));
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let tokens = lex("'a\\'b'");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].value, "a'b");
        assert_eq!(tokens[0].raw, "'a\\'b'");
    }

    #[test]
    fn test_escape_is_not_translated() {
        let tokens = lex(r#""a\nb""#);
        assert_eq!(tokens[0].value, "anb");
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = lex("'abc");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].raw, "'abc");
        assert_eq!(tokens[0].value, "abc");
    }

    #[test]
    fn test_trailing_backslash_in_string() {
        let tokens = lex("\"ab\\");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, "ab");
    }

    #[test]
    fn test_backtick_string_spans_lines() {
        let tokens = lex("`a\nb` x");
        assert_eq!(tokens[0].value, "a\nb");
        assert_eq!(tokens[1].raw, "x");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_number_accepts_multiple_dots() {
        let tokens = lex("1.2.3");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].raw, "1.2.3");
    }

    #[test]
    fn test_number_then_identifier() {
        let tokens = lex("1e5");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].raw, "1");
        assert_eq!(tokens[1].raw, "e5");
    }

    #[test]
    fn test_identifier_chars() {
        let tokens = lex("$foo_1 bar");
        assert_eq!(tokens[0].raw, "$foo_1");
        assert_eq!((tokens[0].start, tokens[0].end), (0, 6));
        assert_eq!((tokens[1].start, tokens[1].end), (7, 10));
    }

    #[test]
    fn test_symbols_are_single_chars() {
        let raws: Vec<String> = lex("a=>{}").into_iter().map(|t| t.raw).collect();
        assert_eq!(raws, vec!["a", "=", ">", "{", "}"]);
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert!(lex("").is_empty());
        assert!(lex(" \t\r\n ").is_empty());
    }

    #[test]
    fn test_non_ascii_is_symbol() {
        let tokens = lex("é");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Symbol);
        assert_eq!((tokens[0].start, tokens[0].end), (0, 1));
    }
}
