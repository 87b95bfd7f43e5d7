//! Harness configuration.

use nb_core::{ExampleMode, PromptMode};

use crate::caller::RetryPolicy;

/// Run configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Trials per (notation, task) pair
    pub trials: u32,
    /// How generation prompts draw on the corpus
    pub prompt_mode: PromptMode,
    /// Which examples to include
    pub example_mode: ExampleMode,
    /// Output token budget per generation
    pub max_output_tokens: u32,
    /// Retry policy for every generation call
    pub retry: RetryPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            trials: 3,
            prompt_mode: PromptMode::ExamplesOnly,
            example_mode: ExampleMode::All,
            max_output_tokens: 1024,
            retry: RetryPolicy::default(),
        }
    }
}

impl HarnessConfig {
    /// One trial per pair, first example only.
    pub fn quick() -> Self {
        Self {
            trials: 1,
            example_mode: ExampleMode::FirstOnly,
            ..Default::default()
        }
    }

    /// More trials for steadier averages.
    pub fn thorough() -> Self {
        Self {
            trials: 5,
            max_output_tokens: 2048,
            ..Default::default()
        }
    }

    /// Number of generation calls a run over `pairs` pairs will make.
    pub fn calls_for(&self, pairs: usize) -> u64 {
        pairs as u64 * u64::from(self.trials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_presets() {
        let quick = HarnessConfig::quick();
        assert_eq!(quick.trials, 1);
        assert_eq!(quick.example_mode, ExampleMode::FirstOnly);

        let thorough = HarnessConfig::thorough();
        assert_eq!(thorough.trials, 5);
        assert_eq!(thorough.retry.attempts_max, 5);
    }

    #[test]
    fn test_calls_for() {
        assert_eq!(HarnessConfig::default().calls_for(9 * 5), 135);
    }
}
