//! Token types produced by [`TokenStream`](super::TokenStream)

use serde::Serialize;

/// Coarse token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Letters, digits, `_` and `$`, not starting with a digit
    Identifier,
    /// Digits and dots; `1.2.3` is a single number
    Number,
    /// Single, double or backtick quoted text
    String,
    /// Any other single character
    Symbol,
}

/// A lexed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token, quotes included for strings
    pub raw: String,
    /// Decoded value (unquoted and unescaped for strings, `raw` otherwise)
    pub value: String,
    /// Offset of the first character, in chars
    pub start: usize,
    /// Offset one past the last consumed character, in chars
    pub end: usize,
    /// 1-based line the token starts on
    pub line: usize,
}

impl Token {
    /// True if this is the single-character symbol `ch`
    pub fn is_symbol(&self, ch: char) -> bool {
        self.kind == TokenKind::Symbol && self.raw.chars().eq(std::iter::once(ch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(raw: &str) -> Token {
        Token {
            kind: TokenKind::Symbol,
            raw: raw.to_string(),
            value: raw.to_string(),
            start: 0,
            end: 1,
            line: 1,
        }
    }

    #[test]
    fn test_is_symbol() {
        assert!(symbol("(").is_symbol('('));
        assert!(!symbol("(").is_symbol(')'));
    }

    #[test]
    fn test_string_token_is_not_symbol() {
        let token = Token {
            kind: TokenKind::String,
            ..symbol("(")
        };
        assert!(!token.is_symbol('('));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TokenKind::Identifier).unwrap();
        assert_eq!(json, "\"identifier\"");
    }
}
