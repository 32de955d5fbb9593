//! Tokenizer and bracket counting for source snippets

mod brackets;
mod stream;
mod token;

pub use brackets::{count_brackets, is_balanced};
pub use stream::TokenStream;
pub use token::{Token, TokenKind};
