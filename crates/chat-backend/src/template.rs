use serde::{Deserialize, Serialize};

/// How a conversation is laid out as model input.
///
/// A rendered conversation looks like:
///
/// ```text
/// {system}{user_sep}{user}{role_sep}<msg>{user_sep}{assistant}{role_empty_sep}<reply>{assistant_sep}{user}{role_sep}...
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationTemplate {
    pub system: String,
    pub user_role: String,
    pub assistant_role: String,
    /// Between a role name and its content.
    pub role_sep: String,
    /// After the assistant role name, where generation begins.
    pub role_empty_sep: String,
    /// Closes a user turn (and the system prompt).
    pub user_sep: String,
    /// Closes an assistant turn.
    pub assistant_sep: String,
    /// Text recorded in history where an image was inserted.
    pub image_placeholder: String,
    /// Generation stops when any of these appears in the reply.
    pub stop_strings: Vec<String>,
    /// Prepend the tokenizer's BOS token to the first turn.
    pub add_bos: bool,
}

impl Default for ConversationTemplate {
    fn default() -> Self {
        Self {
            system: "A chat between a curious user and an artificial intelligence assistant. \
                     The assistant gives helpful, detailed, and polite answers to the user's questions."
                .to_string(),
            user_role: "USER".to_string(),
            assistant_role: "ASSISTANT".to_string(),
            role_sep: ": ".to_string(),
            role_empty_sep: ":".to_string(),
            user_sep: " ".to_string(),
            assistant_sep: "</s>".to_string(),
            image_placeholder: "<image>\n".to_string(),
            stop_strings: vec!["</s>".to_string()],
            add_bos: true,
        }
    }
}

impl ConversationTemplate {
    /// Text that opens a user turn.
    ///
    /// The first turn of a conversation carries the system prompt; later
    /// turns close the preceding assistant reply instead.
    pub fn user_prefix(&self, first_turn: bool) -> String {
        let mut out = String::new();
        if first_turn {
            if !self.system.is_empty() {
                out.push_str(&self.system);
                out.push_str(&self.user_sep);
            }
        } else {
            out.push_str(&self.assistant_sep);
        }
        out.push_str(&self.user_role);
        out.push_str(&self.role_sep);
        out
    }

    /// Text that closes a user turn and hands over to the assistant.
    pub fn assistant_prefix(&self) -> String {
        format!(
            "{}{}{}",
            self.user_sep, self.assistant_role, self.role_empty_sep
        )
    }

}
