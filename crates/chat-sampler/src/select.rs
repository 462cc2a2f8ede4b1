use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;

use crate::sampler::TokenLogit;

/// Final stage of a [`SamplerChain`](crate::SamplerChain): picks one token
/// from the surviving candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Pick the highest logit.
    Greedy,
    /// Softmax the logits and draw from the resulting distribution.
    Distribution,
}

impl Selector {
    pub fn name(&self) -> &'static str {
        match self {
            Selector::Greedy => "greedy",
            Selector::Distribution => "dist",
        }
    }

    /// Select a token ID, or `None` if there are no candidates.
    pub fn select(&self, candidates: &[TokenLogit], rng: &mut StdRng) -> Option<u32> {
        match self {
            Selector::Greedy => argmax(candidates),
            Selector::Distribution => {
                let probs = softmax(candidates);
                match WeightedIndex::new(&probs) {
                    Ok(dist) => candidates.get(dist.sample(rng)).map(|t| t.token_id),
                    // All weights zero or non-finite: fall back to the best logit.
                    Err(_) => argmax(candidates),
                }
            }
        }
    }
}

fn argmax(candidates: &[TokenLogit]) -> Option<u32> {
    candidates
        .iter()
        .max_by(|a, b| a.logit.total_cmp(&b.logit))
        .map(|t| t.token_id)
}

/// Numerically stable softmax over candidate logits.
pub(crate) fn softmax(candidates: &[TokenLogit]) -> Vec<f32> {
    let max_logit = candidates
        .iter()
        .map(|t| t.logit)
        .fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = candidates
        .iter()
        .map(|t| (t.logit - max_logit).exp())
        .collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}
