use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{BackendError, Result};

/// On-disk layout of a `tokenizer.json` vocabulary.
#[derive(Debug, Deserialize)]
pub(crate) struct VocabFile {
    pub tokens: Vec<String>,
    #[serde(default)]
    pub merges: Vec<String>,
    pub bos_id: Option<u32>,
    #[serde(default)]
    pub eos_ids: Vec<u32>,
    pub unk_id: Option<u32>,
}

impl VocabFile {
    pub fn read(path: &Path) -> Result<VocabFile> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|source| BackendError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Token vocabulary: token strings indexed by ID plus special token IDs.
#[derive(Debug, Clone)]
pub struct Vocab {
    /// Token strings, indexed by token ID.
    pub tokens: Vec<String>,
    /// Reverse mapping from token string to token ID.
    pub token_to_id: HashMap<String, u32>,
    pub bos_id: Option<u32>,
    pub eos_ids: Vec<u32>,
    /// Substituted for text the vocabulary cannot represent.
    pub unk_id: Option<u32>,
}

impl Vocab {
    /// Build a vocabulary, checking that every special ID is in range.
    ///
    /// When a token string appears twice the lower ID wins.
    pub fn new(
        tokens: Vec<String>,
        bos_id: Option<u32>,
        eos_ids: Vec<u32>,
        unk_id: Option<u32>,
    ) -> Result<Vocab> {
        let len = tokens.len();
        let specials = bos_id.iter().chain(eos_ids.iter()).chain(unk_id.iter());
        for &id in specials {
            if id as usize >= len {
                return Err(BackendError::Tokenizer(format!(
                    "special token id {} out of range for vocab of {}",
                    id, len
                )));
            }
        }

        let mut token_to_id = HashMap::with_capacity(len);
        for (id, tok) in tokens.iter().enumerate() {
            token_to_id.entry(tok.clone()).or_insert(id as u32);
        }

        Ok(Vocab {
            tokens,
            token_to_id,
            bos_id,
            eos_ids,
            unk_id,
        })
    }

    pub fn id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_lookup() {
        let vocab = Vocab::new(strings(&["<s>", "</s>", "a", "b"]), Some(0), vec![1], None).unwrap();
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.id("b"), Some(3));
        assert_eq!(vocab.token(2), Some("a"));
        assert_eq!(vocab.token(9), None);
    }

    #[test]
    fn test_special_out_of_range() {
        let err = Vocab::new(strings(&["a"]), None, vec![5], None).unwrap_err();
        assert!(matches!(err, BackendError::Tokenizer(_)));
    }

    #[test]
    fn test_duplicate_keeps_lowest_id() {
        let vocab = Vocab::new(strings(&["x", "x"]), None, vec![], None).unwrap();
        assert_eq!(vocab.id("x"), Some(0));
    }
}
