use std::fmt;
use std::time::Duration;

/// Throughput counters for the current conversation.
///
/// Prefill counts every context position fed while building prompts (text
/// tokens, image embeddings and the assistant prefix). Decode counts one
/// token per `decode` call that sampled.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RuntimeStats {
    pub prefill_tokens: usize,
    pub prefill_time: Duration,
    pub decode_tokens: usize,
    pub decode_time: Duration,
}

impl RuntimeStats {
    pub fn record_prefill(&mut self, tokens: usize, elapsed: Duration) {
        self.prefill_tokens += tokens;
        self.prefill_time += elapsed;
    }

    pub fn record_decode(&mut self, elapsed: Duration) {
        self.decode_tokens += 1;
        self.decode_time += elapsed;
    }

    pub fn prefill_tokens_per_sec(&self) -> f64 {
        rate(self.prefill_tokens, self.prefill_time)
    }

    pub fn decode_tokens_per_sec(&self) -> f64 {
        rate(self.decode_tokens, self.decode_time)
    }

    pub fn reset(&mut self) {
        *self = RuntimeStats::default();
    }
}

fn rate(tokens: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        tokens as f64 / secs
    } else {
        0.0
    }
}

impl fmt::Display for RuntimeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "prefill: {:.1} tok/s, decode: {:.1} tok/s, generated: {} tokens",
            self.prefill_tokens_per_sec(),
            self.decode_tokens_per_sec(),
            self.decode_tokens
        )
    }
}
