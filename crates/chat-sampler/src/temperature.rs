use crate::sampler::{Sampler, TokenLogit};

/// Temperatures below this are treated as this value to avoid dividing by zero.
const MIN_TEMPERATURE: f32 = 1e-5;

/// Scales all logits by dividing by a temperature value.
///
/// Higher temperatures flatten the distribution, lower ones sharpen it.
pub struct TemperatureSampler {
    temperature: f32,
}

impl TemperatureSampler {
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature: temperature.max(MIN_TEMPERATURE),
        }
    }
}

impl Sampler for TemperatureSampler {
    fn name(&self) -> &str {
        "temperature"
    }

    fn apply(&self, candidates: &mut Vec<TokenLogit>) {
        for token in candidates.iter_mut() {
            token.logit /= self.temperature;
        }
    }
}
