//! Device byte channel and exclusive exchanges over it

mod exchange;
pub mod mock;
mod traits;

pub use exchange::Exchange;
pub use mock::MockChannel;
pub use traits::{ByteChannel, Listener};
