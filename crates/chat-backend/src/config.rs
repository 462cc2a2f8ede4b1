use std::fs;
use std::path::Path;

use chat_sampler::SamplingParams;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, Result};
use crate::template::ConversationTemplate;

/// Name of the optional per-model config file inside a model directory.
pub const CHAT_CONFIG_FILE: &str = "chat-config.json";

const DEFAULT_CONTEXT_WINDOW: usize = 2048;
const DEFAULT_MAX_GEN_LEN: usize = 512;

/// Per-model chat configuration.
///
/// Sampling fields sit at the top level of the JSON file next to the
/// length limits:
///
/// ```json
/// { "context_window_size": 4096, "temperature": 0.2, "conv_template": { "system": "" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum number of positions the KV cache can hold.
    pub context_window_size: usize,
    /// Maximum tokens generated per assistant turn.
    pub max_gen_len: usize,
    #[serde(flatten)]
    pub sampling: SamplingParams,
    pub conv_template: ConversationTemplate,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context_window_size: DEFAULT_CONTEXT_WINDOW,
            max_gen_len: DEFAULT_MAX_GEN_LEN,
            sampling: SamplingParams::default(),
            conv_template: ConversationTemplate::default(),
        }
    }
}

impl ChatConfig {
    /// Load `chat-config.json` from `model_dir`.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(model_dir: &Path) -> Result<ChatConfig> {
        let path = model_dir.join(CHAT_CONFIG_FILE);
        if !path.exists() {
            tracing::info!(dir = %model_dir.display(), "no {CHAT_CONFIG_FILE}, using defaults");
            return Ok(ChatConfig::default());
        }

        let json = fs::read_to_string(&path)?;
        let mut config: ChatConfig =
            serde_json::from_str(&json).map_err(|source| BackendError::Config {
                path: path.clone(),
                source,
            })?;
        config.validate();

        tracing::debug!(path = %path.display(), "loaded chat config");
        Ok(config)
    }

    /// Replace zero limits with defaults and clamp sampling parameters.
    pub fn validate(&mut self) {
        if self.context_window_size == 0 {
            tracing::warn!("context_window_size is 0, using {DEFAULT_CONTEXT_WINDOW}");
            self.context_window_size = DEFAULT_CONTEXT_WINDOW;
        }
        if self.max_gen_len == 0 {
            tracing::warn!("max_gen_len is 0, using {DEFAULT_MAX_GEN_LEN}");
            self.max_gen_len = DEFAULT_MAX_GEN_LEN;
        }
        self.sampling.validate();
    }
}
