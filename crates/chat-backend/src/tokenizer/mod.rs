pub mod bpe;
pub mod vocab;

pub use bpe::BpeTokenizer;
pub use vocab::Vocab;

/// Maps text to token IDs and token IDs back to bytes.
pub trait Tokenizer: Send + Sync {
    /// Encode text into token IDs. Does not add BOS.
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Raw bytes of a single token. A token may hold part of a multi-byte
    /// UTF-8 character, so callers streaming text must buffer.
    fn token_bytes(&self, token: u32) -> Vec<u8>;

    /// Decode a token sequence, replacing invalid UTF-8.
    fn decode(&self, tokens: &[u32]) -> String {
        let bytes: Vec<u8> = tokens
            .iter()
            .flat_map(|&t| self.token_bytes(t))
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn vocab_size(&self) -> usize;

    fn bos_id(&self) -> Option<u32>;

    /// Tokens that end generation.
    fn eos_ids(&self) -> &[u32];

    fn is_eos(&self, token: u32) -> bool {
        self.eos_ids().contains(&token)
    }
}
