use crate::sampler::{sort_descending, Sampler, TokenLogit};
use crate::select::softmax;

/// Nucleus sampling: keeps the smallest set of tokens whose cumulative
/// probability reaches `p`. At least one token always survives.
pub struct TopPSampler {
    p: f32,
}

impl TopPSampler {
    pub fn new(p: f32) -> Self {
        Self { p }
    }
}

impl Sampler for TopPSampler {
    fn name(&self) -> &str {
        "top_p"
    }

    fn apply(&self, candidates: &mut Vec<TokenLogit>) {
        if candidates.is_empty() || self.p >= 1.0 {
            return;
        }

        sort_descending(candidates);
        let probs = softmax(candidates);

        let mut cumulative = 0.0f32;
        let mut cutoff = candidates.len();
        for (i, &prob) in probs.iter().enumerate() {
            cumulative += prob;
            if cumulative >= self.p {
                cutoff = i + 1;
                break;
            }
        }

        candidates.truncate(cutoff.max(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(logits: &[f32]) -> Vec<TokenLogit> {
        logits
            .iter()
            .enumerate()
            .map(|(i, &logit)| TokenLogit { token_id: i as u32, logit })
            .collect()
    }

    #[test]
    fn test_dominant_token_alone() {
        let mut c = candidates(&[0.0, 10.0, 0.0]);
        TopPSampler::new(0.9).apply(&mut c);
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].token_id, 1);
    }

    #[test]
    fn test_uniform_keeps_enough_mass() {
        // Four equal tokens at 0.25 each; reaching 0.5 needs two.
        let mut c = candidates(&[1.0, 1.0, 1.0, 1.0]);
        TopPSampler::new(0.5).apply(&mut c);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_p_one_is_noop() {
        let mut c = candidates(&[3.0, 2.0, 1.0]);
        TopPSampler::new(1.0).apply(&mut c);
        assert_eq!(c.len(), 3);
    }
}
