use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::select::Selector;

/// A token ID paired with its logit value.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenLogit {
    pub token_id: u32,
    pub logit: f32,
}

/// A filtering or scaling stage applied to candidate logits before selection.
pub trait Sampler: Send {
    fn name(&self) -> &str;

    /// Modify candidates in-place (filtering, scaling, penalizing).
    fn apply(&self, candidates: &mut Vec<TokenLogit>);

    /// Observe a token that was selected and appended to the output.
    fn accept(&mut self, _token: u32) {}

    /// Forget any per-conversation state.
    fn reset(&mut self) {}
}

/// Sort candidates by descending logit. NaN logits sort last.
pub(crate) fn sort_descending(candidates: &mut [TokenLogit]) {
    candidates.sort_by(|a, b| b.logit.total_cmp(&a.logit));
}

/// Composes samplers into a pipeline ending in a [`Selector`].
///
/// The chain owns its RNG, so consecutive calls to [`SamplerChain::sample`]
/// draw fresh values; a fixed seed makes a whole conversation reproducible.
pub struct SamplerChain {
    samplers: Vec<Box<dyn Sampler>>,
    selector: Selector,
    seed: Option<u64>,
    rng: StdRng,
}

impl SamplerChain {
    /// Create an empty chain. `seed: None` seeds the RNG from OS entropy.
    pub fn new(selector: Selector, seed: Option<u64>) -> Self {
        Self {
            samplers: Vec::new(),
            selector,
            seed,
            rng: make_rng(seed),
        }
    }

    /// Add a sampler to the end of the chain. Returns self for builder-style usage.
    pub fn with(mut self, sampler: Box<dyn Sampler>) -> Self {
        self.samplers.push(sampler);
        self
    }

    /// Names of the stages in application order, selector last.
    pub fn stage_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.samplers.iter().map(|s| s.name()).collect();
        names.push(self.selector.name());
        names
    }

    /// Run all samplers in order on raw logits and select a token ID.
    ///
    /// Returns `None` only when `logits` is empty.
    pub fn sample(&mut self, logits: &[f32]) -> Option<u32> {
        let mut candidates: Vec<TokenLogit> = logits
            .iter()
            .enumerate()
            .map(|(i, &logit)| TokenLogit {
                token_id: i as u32,
                logit,
            })
            .collect();

        for sampler in &self.samplers {
            sampler.apply(&mut candidates);
        }

        self.selector.select(&candidates, &mut self.rng)
    }

    /// Record the token that was kept so stateful samplers can see it.
    pub fn accept(&mut self, token: u32) {
        for sampler in &mut self.samplers {
            sampler.accept(token);
        }
    }

    /// Clear sampler state and rewind the RNG to its seed.
    pub fn reset(&mut self) {
        for sampler in &mut self.samplers {
            sampler.reset();
        }
        self.rng = make_rng(self.seed);
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RepetitionPenaltySampler, TopKSampler};

    #[test]
    fn test_empty_logits() {
        let mut chain = SamplerChain::new(Selector::Greedy, Some(0));
        assert_eq!(chain.sample(&[]), None);
    }

    #[test]
    fn test_greedy_chain() {
        let mut chain = SamplerChain::new(Selector::Greedy, Some(0))
            .with(Box::new(TopKSampler::new(2)));
        assert_eq!(chain.sample(&[0.1, 3.0, 2.0, -1.0]), Some(1));
        assert_eq!(chain.stage_names(), vec!["top_k", "greedy"]);
    }

    #[test]
    fn test_accept_feeds_penalty() {
        let mut chain = SamplerChain::new(Selector::Greedy, Some(0))
            .with(Box::new(RepetitionPenaltySampler::new(10.0, 8)));
        let logits = [2.0, 1.5];
        assert_eq!(chain.sample(&logits), Some(0));
        chain.accept(0);
        assert_eq!(chain.sample(&logits), Some(1));

        chain.reset();
        assert_eq!(chain.sample(&logits), Some(0));
    }

    #[test]
    fn test_seeded_chain_is_reproducible() {
        let logits = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let mut a = SamplerChain::new(Selector::Distribution, Some(42));
        let mut b = SamplerChain::new(Selector::Distribution, Some(42));
        let draws_a: Vec<_> = (0..16).map(|_| a.sample(&logits)).collect();
        let draws_b: Vec<_> = (0..16).map(|_| b.sample(&logits)).collect();
        assert_eq!(draws_a, draws_b);

        a.reset();
        let replay: Vec<_> = (0..16).map(|_| a.sample(&logits)).collect();
        assert_eq!(replay, draws_a);
    }

    #[test]
    fn test_rng_advances_between_draws() {
        let logits = [0.0f32; 64];
        let mut chain = SamplerChain::new(Selector::Distribution, Some(7));
        let draws: Vec<_> = (0..32).filter_map(|_| chain.sample(&logits)).collect();
        let first = draws[0];
        assert!(draws.iter().any(|&t| t != first));
    }
}
