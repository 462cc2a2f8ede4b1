use serde::{Deserialize, Serialize};

use crate::repetition::RepetitionPenaltySampler;
use crate::sampler::SamplerChain;
use crate::select::Selector;
use crate::temperature::TemperatureSampler;
use crate::top_k::TopKSampler;
use crate::top_p::TopPSampler;

/// Temperatures at or below this select greedily.
const GREEDY_TEMPERATURE: f32 = 1e-5;

/// Sampling policy for one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// Softmax temperature (0.0 = greedy).
    pub temperature: f32,
    /// Nucleus threshold in (0, 1]; 1.0 disables the filter.
    pub top_p: f32,
    /// Top-k cutoff; 0 disables the filter.
    pub top_k: usize,
    /// Repetition penalty (1.0 = off).
    pub repetition_penalty: f32,
    /// Number of accepted tokens the repetition penalty looks back over.
    pub penalty_window: usize,
    /// RNG seed; `None` draws one from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 0,
            repetition_penalty: 1.0,
            penalty_window: 64,
            seed: None,
        }
    }
}

impl SamplingParams {
    /// Greedy decoding with no penalties.
    pub fn greedy() -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
            ..Self::default()
        }
    }

    /// Clamp values into their valid ranges.
    pub fn validate(&mut self) {
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            tracing::warn!(temperature = self.temperature, "invalid temperature, using 0.0");
            self.temperature = 0.0;
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            tracing::warn!(top_p = self.top_p, "top_p out of (0, 1], using 1.0");
            self.top_p = 1.0;
        }
        if !(self.repetition_penalty >= 1.0) {
            tracing::warn!(
                repetition_penalty = self.repetition_penalty,
                "repetition penalty below 1.0, disabling"
            );
            self.repetition_penalty = 1.0;
        }
        if self.penalty_window == 0 {
            self.penalty_window = 1;
        }
    }

    /// Returns true if these parameters select greedily.
    pub fn is_greedy(&self) -> bool {
        self.temperature <= GREEDY_TEMPERATURE
    }

    /// Build the sampler chain for these parameters.
    ///
    /// Stage order: repetition penalty, top-k, temperature, top-p, then a
    /// greedy or distribution selector.
    pub fn build_chain(&self) -> SamplerChain {
        let selector = if self.is_greedy() {
            Selector::Greedy
        } else {
            Selector::Distribution
        };
        let mut chain = SamplerChain::new(selector, self.seed);

        if self.repetition_penalty > 1.0 {
            chain = chain.with(Box::new(RepetitionPenaltySampler::new(
                self.repetition_penalty,
                self.penalty_window,
            )));
        }
        if self.is_greedy() {
            return chain;
        }
        if self.top_k > 0 {
            chain = chain.with(Box::new(TopKSampler::new(self.top_k)));
        }
        chain = chain.with(Box::new(TemperatureSampler::new(self.temperature)));
        if self.top_p < 1.0 {
            chain = chain.with(Box::new(TopPSampler::new(self.top_p)));
        }
        chain
    }
}
