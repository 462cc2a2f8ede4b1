use std::collections::VecDeque;

use crate::sampler::{Sampler, TokenLogit};

/// Penalizes tokens that were accepted recently.
///
/// For tokens in the history window, positive logits are divided by
/// `penalty` and negative logits multiplied by it. A penalty of 1.0 is a
/// no-op.
pub struct RepetitionPenaltySampler {
    penalty: f32,
    recent: VecDeque<u32>,
    window: usize,
}

impl RepetitionPenaltySampler {
    /// - `penalty`: the penalty factor (1.0 = no penalty).
    /// - `window`: how many accepted tokens to remember.
    pub fn new(penalty: f32, window: usize) -> Self {
        Self {
            penalty,
            recent: VecDeque::with_capacity(window),
            window,
        }
    }
}

impl Sampler for RepetitionPenaltySampler {
    fn name(&self) -> &str {
        "repetition_penalty"
    }

    fn apply(&self, candidates: &mut Vec<TokenLogit>) {
        for token in candidates.iter_mut() {
            if self.recent.contains(&token.token_id) {
                if token.logit > 0.0 {
                    token.logit /= self.penalty;
                } else {
                    token.logit *= self.penalty;
                }
            }
        }
    }

    fn accept(&mut self, token: u32) {
        if self.window == 0 {
            return;
        }
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(token);
    }

    fn reset(&mut self) {
        self.recent.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_penalizes_seen_tokens() {
        let mut s = RepetitionPenaltySampler::new(2.0, 4);
        s.accept(0);
        s.accept(1);
        let mut c = vec![
            TokenLogit { token_id: 0, logit: 4.0 },
            TokenLogit { token_id: 1, logit: -1.0 },
            TokenLogit { token_id: 2, logit: 3.0 },
        ];
        s.apply(&mut c);
        assert_relative_eq!(c[0].logit, 2.0);
        assert_relative_eq!(c[1].logit, -2.0);
        assert_relative_eq!(c[2].logit, 3.0);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut s = RepetitionPenaltySampler::new(2.0, 2);
        s.accept(5);
        s.accept(6);
        s.accept(7);
        let mut c = vec![TokenLogit { token_id: 5, logit: 4.0 }];
        s.apply(&mut c);
        assert_relative_eq!(c[0].logit, 4.0);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut s = RepetitionPenaltySampler::new(2.0, 4);
        s.accept(0);
        s.reset();
        let mut c = vec![TokenLogit { token_id: 0, logit: 4.0 }];
        s.apply(&mut c);
        assert_relative_eq!(c[0].logit, 4.0);
    }
}
