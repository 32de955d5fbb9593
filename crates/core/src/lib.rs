//! Replsync Core - talking to a device REPL over a shared byte channel
//!
//! This crate provides:
//! - Byte channel abstraction with a single, borrowable listener slot
//! - Prompt synchronization (newline, then Ctrl-C if the REPL is stuck)
//! - Remote expression evaluation with marker-delimited results
//! - A permissive tokenizer and bracket counter for source snippets
//! - Error types

pub mod channel;
pub mod error;
pub mod lexer;
pub mod protocol;
pub mod session;
pub mod text;

// Re-export common types
pub use channel::{ByteChannel, Exchange, Listener, MockChannel};
pub use error::{CoreError, Result};
pub use lexer::{count_brackets, is_balanced, Token, TokenKind, TokenStream};
pub use protocol::{evaluate, evaluate_json, sync_prompt, PromptOutcome, ProtocolConfig};
pub use session::Device;
pub use text::{fix_broken_code, version_to_float};
