use std::collections::HashMap;
use std::path::Path;

use super::vocab::{Vocab, VocabFile};
use super::Tokenizer;
use crate::error::{BackendError, Result};

/// SentencePiece-style word boundary marker, rendered as a space.
const SPACE_MARKER: char = '\u{2581}';

/// Byte-Pair Encoding tokenizer with byte fallback.
pub struct BpeTokenizer {
    vocab: Vocab,
    /// Map from merge pair to priority rank (lower rank = higher priority).
    merge_ranks: HashMap<(String, String), usize>,
}

impl BpeTokenizer {
    /// Build a tokenizer from a vocabulary and ordered merge rules, each
    /// written as `"left right"`.
    pub fn new(vocab: Vocab, merges: &[String]) -> Result<BpeTokenizer> {
        let mut merge_ranks = HashMap::with_capacity(merges.len());
        for (rank, entry) in merges.iter().enumerate() {
            let (left, right) = entry.split_once(' ').ok_or_else(|| {
                BackendError::Tokenizer(format!("invalid merge entry: {:?}", entry))
            })?;
            merge_ranks
                .entry((left.to_string(), right.to_string()))
                .or_insert(rank);
        }
        Ok(BpeTokenizer { vocab, merge_ranks })
    }

    /// Load from a `tokenizer.json` holding `tokens`, `merges`, `bos_id`,
    /// `eos_ids` and `unk_id`.
    pub fn from_file(path: &Path) -> Result<BpeTokenizer> {
        let file = VocabFile::read(path)?;
        let vocab = Vocab::new(file.tokens, file.bos_id, file.eos_ids, file.unk_id)?;
        let tokenizer = BpeTokenizer::new(vocab, &file.merges)?;
        tracing::debug!(
            path = %path.display(),
            vocab = tokenizer.vocab.len(),
            merges = tokenizer.merge_ranks.len(),
            "loaded BPE tokenizer"
        );
        Ok(tokenizer)
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    /// Split text into initial pieces: whole characters where the vocabulary
    /// has them, `<0xHH>` byte tokens otherwise.
    fn initial_pieces(&self, text: &str) -> Vec<String> {
        let marker = SPACE_MARKER.to_string();
        let use_marker = self.vocab.id(" ").is_none() && self.vocab.id(&marker).is_some();

        let mut pieces = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let piece = if ch == ' ' && use_marker {
                marker.clone()
            } else {
                ch.to_string()
            };
            if self.vocab.id(&piece).is_some() {
                pieces.push(piece);
                continue;
            }
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                pieces.push(format!("<0x{:02X}>", byte));
            }
        }
        pieces
    }
}

impl Tokenizer for BpeTokenizer {
    /// Encode with BPE:
    /// 1. Split into character (or byte-fallback) pieces.
    /// 2. Repeatedly merge the adjacent pair with the lowest merge rank.
    /// 3. Map pieces to IDs; pieces missing from the vocabulary become the
    ///    unknown token, or are dropped when there is none.
    fn encode(&self, text: &str) -> Vec<u32> {
        let mut pieces = self.initial_pieces(text);

        while pieces.len() >= 2 {
            let best = pieces
                .windows(2)
                .enumerate()
                .filter_map(|(i, pair)| {
                    self.merge_ranks
                        .get(&(pair[0].clone(), pair[1].clone()))
                        .map(|&rank| (rank, i))
                })
                .min();

            let Some((_, idx)) = best else {
                break;
            };
            let right = pieces.remove(idx + 1);
            pieces[idx].push_str(&right);
        }

        pieces
            .iter()
            .filter_map(|piece| self.vocab.id(piece).or(self.vocab.unk_id))
            .collect()
    }

    fn token_bytes(&self, token: u32) -> Vec<u8> {
        let Some(tok) = self.vocab.token(token) else {
            return Vec::new();
        };

        if tok.len() == 6 && tok.starts_with("<0x") && tok.ends_with('>') {
            if let Ok(byte) = u8::from_str_radix(&tok[3..5], 16) {
                return vec![byte];
            }
        }

        tok.replace(SPACE_MARKER, " ").into_bytes()
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    fn bos_id(&self) -> Option<u32> {
        self.vocab.bos_id
    }

    fn eos_ids(&self) -> &[u32] {
        &self.vocab.eos_ids
    }
}
