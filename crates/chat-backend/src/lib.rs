pub mod backend;
pub mod config;
pub mod error;
pub mod loader;
pub mod template;
pub mod tokenizer;

pub use backend::{ContextInput, ModelBackend};
pub use config::{ChatConfig, CHAT_CONFIG_FILE};
pub use error::{BackendError, Result};
pub use loader::{normalize_model_id, BackendRegistry, LoadedModel, ModelLoader};
pub use template::ConversationTemplate;
pub use tokenizer::{BpeTokenizer, Tokenizer, Vocab};
