//! `chat-session` - the conversational inference session.
//!
//! A [`ChatSession`] owns one loaded model and drives it through a chat:
//! - `reload` / `unload` manage the model handle
//! - `prefill` feeds text and images into the user turn
//! - `decode` generates the reply one token at a time
//! - `get_message`, `stopped` and `runtime_stats_text` report progress

mod context;
mod conversation;
mod error;
mod session;
mod shared;
mod stats;
mod streaming;
mod types;

pub use error::*;
pub use session::ChatSession;
pub use shared::SharedSession;
pub use stats::RuntimeStats;
pub use streaming::MessageBuffer;
pub use types::*;
