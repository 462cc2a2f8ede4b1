use crate::sampler::{sort_descending, Sampler, TokenLogit};

/// Keeps only the top K tokens by logit value. `k == 0` disables the filter.
pub struct TopKSampler {
    k: usize,
}

impl TopKSampler {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl Sampler for TopKSampler {
    fn name(&self) -> &str {
        "top_k"
    }

    fn apply(&self, candidates: &mut Vec<TokenLogit>) {
        if self.k == 0 || self.k >= candidates.len() {
            return;
        }
        sort_descending(candidates);
        candidates.truncate(self.k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(c: &[TokenLogit]) -> Vec<u32> {
        c.iter().map(|t| t.token_id).collect()
    }

    #[test]
    fn test_keeps_top_k() {
        let mut c: Vec<TokenLogit> = [0.5, 4.0, -1.0, 2.0]
            .iter()
            .enumerate()
            .map(|(i, &logit)| TokenLogit { token_id: i as u32, logit })
            .collect();
        TopKSampler::new(2).apply(&mut c);
        assert_eq!(ids(&c), vec![1, 3]);
    }

    #[test]
    fn test_disabled() {
        let mut c = vec![
            TokenLogit { token_id: 0, logit: 0.0 },
            TokenLogit { token_id: 1, logit: 1.0 },
        ];
        TopKSampler::new(0).apply(&mut c);
        assert_eq!(ids(&c), vec![0, 1]);
    }
}
