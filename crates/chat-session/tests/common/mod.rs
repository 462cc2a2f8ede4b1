//! Scripted backend and fixtures shared by the session tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chat_backend::{
    BackendError, BackendRegistry, BpeTokenizer, ChatConfig, ContextInput, LoadedModel,
    ModelBackend, Tokenizer, Vocab, CHAT_CONFIG_FILE,
};
use chat_session::ChatSession;
use serde_json::json;
use tempfile::TempDir;

pub const MODEL: &str = "scripted-chat-7b";
pub const IMAGE_EMBED_LEN: usize = 8;

/// Pieces the scripted model replies with, beyond single ASCII characters.
const REPLY_PIECES: &[&str] = &[" Hi", " there", " friend", "<0xC3>", "<0xA9>"];

/// Byte-level vocabulary: `<unk>`, `<s>`, `</s>`, printable ASCII, then
/// [`REPLY_PIECES`]. No merges, so prompts encode one token per character.
pub fn tokenizer() -> BpeTokenizer {
    build_tokenizer(Some(0))
}

/// Like [`tokenizer`], but characters outside the vocabulary are dropped
/// instead of mapping to `<unk>`.
pub fn tokenizer_without_unk() -> BpeTokenizer {
    build_tokenizer(None)
}

fn build_tokenizer(unk_id: Option<u32>) -> BpeTokenizer {
    let mut tokens: Vec<String> = ["<unk>", "<s>", "</s>"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    tokens.extend((0x20u8..=0x7E).map(|b| (b as char).to_string()));
    tokens.extend(REPLY_PIECES.iter().map(|s| s.to_string()));
    let vocab = Vocab::new(tokens, Some(1), vec![2], unk_id).unwrap();
    BpeTokenizer::new(vocab, &[]).unwrap()
}

/// Token ID of `piece` in [`tokenizer`].
pub fn id(piece: &str) -> u32 {
    tokenizer().vocab().id(piece).unwrap()
}

pub fn ids(pieces: &[&str]) -> Vec<u32> {
    pieces.iter().map(|p| id(p)).collect()
}

pub const BOS: u32 = 1;
pub const EOS: u32 = 2;

/// One forward call as seen by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Fed {
    pub pos: usize,
    /// Empty for images.
    pub tokens: Vec<u32>,
    pub positions: usize,
}

/// Shared view into what the backend was asked to do.
#[derive(Clone, Default)]
pub struct Probe {
    releases: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
    loads: Arc<AtomicUsize>,
    fed: Arc<Mutex<Vec<Fed>>>,
}

impl Probe {
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn fed(&self) -> Vec<Fed> {
        self.fed.lock().unwrap().clone()
    }
}

/// A model that replies with a fixed token script.
///
/// Logits are one-hot on the next script token. Feeding back the expected
/// token advances the script; any other input (a new prompt) restarts it.
/// Past the end of the script the model emits EOS.
pub struct ScriptedBackend {
    vocab_size: usize,
    script: Vec<u32>,
    cursor: usize,
    image_embed_len: Option<usize>,
    fail_at: Option<usize>,
    calls: usize,
    probe: Probe,
}

impl ModelBackend for ScriptedBackend {
    fn forward(&mut self, input: ContextInput<'_>, pos: usize) -> chat_backend::Result<Vec<f32>> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_at == Some(call) {
            return Err(BackendError::Forward(format!("scripted fault on call {}", call)));
        }

        let tokens = match input {
            ContextInput::Tokens(tokens) => tokens.to_vec(),
            ContextInput::Image(_) => Vec::new(),
        };
        self.probe.fed.lock().unwrap().push(Fed {
            pos,
            tokens: tokens.clone(),
            positions: input.positions(self.image_embed_len.unwrap_or(0)),
        });

        match tokens.as_slice() {
            [t] if self.script.get(self.cursor) == Some(t) => self.cursor += 1,
            _ => self.cursor = 0,
        }
        let next = self.script.get(self.cursor).copied().unwrap_or(EOS);
        let mut logits = vec![0.0; self.vocab_size];
        logits[next as usize] = 10.0;
        Ok(logits)
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn image_embed_len(&self) -> Option<usize> {
        self.image_embed_len
    }

    fn reset_cache(&mut self) {
        self.cursor = 0;
        self.probe.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&mut self) {
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn evaluate(&mut self) -> chat_backend::Result<String> {
        Ok(format!("scripted backend: {} forward calls", self.calls))
    }
}

/// How to build the scripted model and its directory.
#[derive(Clone)]
pub struct Scenario {
    pub script: Vec<u32>,
    pub image_embed_len: Option<usize>,
    /// Fail the n-th forward call (0-based) of each loaded backend.
    pub fail_at: Option<usize>,
    /// Logits to produce; defaults to the tokenizer's vocabulary size.
    pub vocab_size: Option<usize>,
    /// Load [`tokenizer_without_unk`] instead of [`tokenizer`].
    pub drop_unknown: bool,
    /// Contents of `chat-config.json`; `None` writes no file.
    pub config: Option<serde_json::Value>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            script: ids(&[" Hi", " there"]),
            image_embed_len: None,
            fail_at: None,
            vocab_size: None,
            drop_unknown: false,
            config: Some(json!({
                "temperature": 0.0,
                "conv_template": { "system": "SYS" }
            })),
        }
    }
}

impl Scenario {
    pub fn with_script(pieces: &[&str]) -> Self {
        Self {
            script: ids(pieces),
            ..Self::default()
        }
    }

    pub fn vision() -> Self {
        Self {
            image_embed_len: Some(IMAGE_EMBED_LEN),
            ..Self::default()
        }
    }

    /// Merge `fields` into the default config.
    pub fn configured(mut self, fields: serde_json::Value) -> Self {
        let mut config = self.config.take().unwrap_or_else(|| json!({}));
        if let (Some(base), Some(extra)) = (config.as_object_mut(), fields.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        self.config = Some(config);
        self
    }

    pub fn registry(&self, probe: &Probe) -> BackendRegistry {
        let scenario = self.clone();
        let probe = probe.clone();
        BackendRegistry::new().with(MODEL, move |_: &Path, _: &ChatConfig| -> chat_backend::Result<LoadedModel> {
            probe.loads.fetch_add(1, Ordering::SeqCst);
            let tokenizer = if scenario.drop_unknown {
                tokenizer_without_unk()
            } else {
                tokenizer()
            };
            let backend = ScriptedBackend {
                vocab_size: scenario.vocab_size.unwrap_or(tokenizer.vocab_size()),
                script: scenario.script.clone(),
                cursor: 0,
                image_embed_len: scenario.image_embed_len,
                fail_at: scenario.fail_at,
                calls: 0,
                probe: probe.clone(),
            };
            Ok(LoadedModel {
                backend: Box::new(backend),
                tokenizer: Box::new(tokenizer),
            })
        })
    }

    pub fn model_dir(&self) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        if let Some(config) = &self.config {
            std::fs::write(dir.path().join(CHAT_CONFIG_FILE), config.to_string()).unwrap();
        }
        dir
    }

    /// A session with the scripted model already loaded.
    pub fn start(&self) -> Fixture {
        let probe = Probe::default();
        let dir = self.model_dir();
        let mut session = ChatSession::new(self.registry(&probe));
        session.reload(MODEL, dir.path()).unwrap();
        Fixture {
            session,
            probe,
            dir,
        }
    }
}

pub struct Fixture {
    pub session: ChatSession,
    pub probe: Probe,
    pub dir: TempDir,
}

/// Decode until the session stops, returning the number of decode calls.
pub fn decode_to_stop(session: &mut ChatSession) -> usize {
    let mut calls = 0;
    while !session.stopped() {
        session.decode().unwrap();
        calls += 1;
        assert!(calls < 1000, "session never stopped");
    }
    calls
}

/// Decode the tokens of one forward call back to text.
pub fn text_of(tokens: &[u32]) -> String {
    tokenizer().decode(tokens)
}
