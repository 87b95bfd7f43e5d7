//! Token and character measurement.
//!
//! Token counts come from an injected [`Tokenizer`]. The production encoder
//! is cl100k_base; tests substitute simpler encoders. An encoder that cannot
//! be constructed is a startup error: the harness never runs with
//! measurement silently disabled.

use std::collections::HashMap;
use std::sync::Mutex;

use tiktoken_rs::CoreBPE;

use crate::corpus::Example;
use crate::normalize::normalize;
use crate::notation::Notation;

/// Configuration errors raised before any trial runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Tokenizer unavailable: {0}")]
    Tokenizer(String),

    #[error("Missing configuration: {0}")]
    Missing(String),
}

/// Text to token ids.
///
/// Implementations must be stable: the same text always encodes to the same
/// ids, so counts stay comparable across runs.
pub trait Tokenizer {
    /// Encode `text` into token ids.
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Name of the encoding, recorded alongside measurements.
    fn encoding_name(&self) -> &str;
}

/// The cl100k_base BPE encoder.
pub struct Cl100kTokenizer {
    bpe: CoreBPE,
}

impl Cl100kTokenizer {
    /// Load the encoder tables.
    pub fn new() -> Result<Self, ConfigError> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| ConfigError::Tokenizer(e.to_string()))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for Cl100kTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_with_special_tokens(text)
            .into_iter()
            .map(|id| id as u32)
            .collect()
    }

    fn encoding_name(&self) -> &str {
        "cl100k_base"
    }
}

/// Size of a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Measurement {
    /// Number of token ids produced by the tokenizer
    pub tokens: u64,
    /// Number of characters (Unicode scalar values)
    pub chars: u64,
}

impl Measurement {
    /// Component-wise sum.
    #[must_use]
    pub fn plus(self, other: Measurement) -> Measurement {
        Measurement {
            tokens: self.tokens + other.tokens,
            chars: self.chars + other.chars,
        }
    }
}

/// Measures texts, memoizing example files by notation and name.
pub struct SizeMeter {
    tokenizer: Box<dyn Tokenizer>,
    cache: Mutex<HashMap<(&'static str, String), Measurement>>,
}

impl SizeMeter {
    /// Wrap a tokenizer.
    pub fn new(tokenizer: Box<dyn Tokenizer>) -> Self {
        Self {
            tokenizer,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Meter backed by cl100k_base.
    pub fn cl100k() -> Result<Self, ConfigError> {
        Ok(Self::new(Box::new(Cl100kTokenizer::new()?)))
    }

    /// Name of the underlying encoding.
    pub fn encoding_name(&self) -> &str {
        self.tokenizer.encoding_name()
    }

    /// Measure `text` as given. Callers pass normalized text.
    #[must_use]
    pub fn measure(&self, text: &str) -> Measurement {
        Measurement {
            tokens: self.tokenizer.encode(text).len() as u64,
            chars: text.chars().count() as u64,
        }
    }

    /// Measure an example file after normalization.
    ///
    /// Results are cached per `(notation, file name)`; a file is tokenized
    /// at most once per meter.
    pub fn measure_example(&self, notation: &Notation, example: &Example) -> Measurement {
        let key = (notation.id, example.file_name.clone());
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache
            .entry(key)
            .or_insert_with(|| self.measure(&normalize(&example.raw, notation)))
    }

    /// Number of memoized files.
    pub fn cached_count(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    /// One token per whitespace-separated word.
    pub(crate) struct WordTokenizer {
        pub calls: Arc<AtomicUsize>,
    }

    impl WordTokenizer {
        pub(crate) fn new() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Tokenizer for WordTokenizer {
        fn encode(&self, text: &str) -> Vec<u32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            text.split_whitespace().map(|w| w.len() as u32).collect()
        }

        fn encoding_name(&self) -> &str {
            "words"
        }
    }

    #[test]
    fn test_measure_counts() {
        let meter = SizeMeter::new(Box::new(WordTokenizer::new()));
        let m = meter.measure("f x:n > n; * x 2");
        assert_eq!(m.tokens, 7);
        assert_eq!(m.chars, 16);
    }

    #[test]
    fn test_measure_is_deterministic() {
        let meter = SizeMeter::new(Box::new(WordTokenizer::new()));
        let text = "def total(price, qty):\n    return price * qty";
        assert_eq!(meter.measure(text), meter.measure(text));
    }

    #[test]
    fn test_chars_are_scalar_values() {
        let meter = SizeMeter::new(Box::new(WordTokenizer::new()));
        assert_eq!(meter.measure("λx→x").chars, 4);
    }

    #[test]
    fn test_measure_example_memoized() {
        let tokenizer = WordTokenizer::new();
        let calls = Arc::clone(&tokenizer.calls);
        let meter = SizeMeter::new(Box::new(tokenizer));
        let notation = Notation::new("py", &[".py"], Some("#"));
        let example = Example {
            file_name: "01-simple.py".to_string(),
            raw: "# comment\nx = 1\n".to_string(),
        };

        let first = meter.measure_example(&notation, &example);
        let second = meter.measure_example(&notation, &example);

        assert_eq!(first, second);
        assert_eq!(first.tokens, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(meter.cached_count(), 1);
    }

    #[test]
    fn test_measurement_plus() {
        let a = Measurement { tokens: 3, chars: 10 };
        let b = Measurement { tokens: 4, chars: 1 };
        assert_eq!(a.plus(b), Measurement { tokens: 7, chars: 11 });
    }
}
