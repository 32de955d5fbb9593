//! Net bracket depth of a snippet
//!
//! Used to decide whether a line typed at the REPL still has open brackets
//! and more input should be collected. It is a heuristic: nesting order and
//! bracket types are not matched, so `(]` counts as closed.

use super::stream::TokenStream;

/// Sum of +1 per `(`, `{`, `[` and -1 per `)`, `}`, `]`
///
/// Brackets inside strings and comments are ignored.
pub fn count_brackets(source: &str) -> i64 {
    TokenStream::new(source).fold(0, |depth, token| {
        if token.is_symbol('(') || token.is_symbol('{') || token.is_symbol('[') {
            depth + 1
        } else if token.is_symbol(')') || token.is_symbol('}') || token.is_symbol(']') {
            depth - 1
        } else {
            depth
        }
    })
}

/// True if the bracket depth returns to zero by end of input
pub fn is_balanced(source: &str) -> bool {
    count_brackets(source) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_strings() {
        for source in ["", "()", "{[()]}", "function f(a) { return [a]; }", "a(b)(c)"] {
            assert_eq!(count_brackets(source), 0, "{source:?}");
        }
    }

    #[test]
    fn test_open_and_overclosed() {
        assert_eq!(count_brackets("(()"), 1);
        assert_eq!(count_brackets("())"), -1);
        assert_eq!(count_brackets("if (x) {\n  foo(["), 3);
    }

    #[test]
    fn test_mismatched_types_still_net_zero() {
        assert_eq!(count_brackets("(]"), 0);
        assert!(is_balanced("(]"));
    }

    #[test]
    fn test_brackets_in_strings_and_comments_ignored() {
        assert_eq!(count_brackets("print(\"(((\") // )))"), 0);
        assert_eq!(count_brackets("x = '{' /* } */ + `[`"), 0);
        assert_eq!(count_brackets("f('a\\')', ("), 2);
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("setInterval(function() { LED1.toggle(); }, 500);"));
        assert!(!is_balanced("setInterval(function() {"));
    }
}
