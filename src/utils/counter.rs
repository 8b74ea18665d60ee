//! Frequency counters with insertion-order tie-breaking.
//!
//! "Most frequent" values throughout the pipeline (font sizes, word gaps,
//! line distances, right-x coordinates) are the argmax over one of these
//! counters. Ties are broken by insertion order: the key counted first
//! wins. The counters are backed by `IndexMap`, which preserves insertion
//! order, so the argmax is deterministic.

use indexmap::IndexMap;

/// A frequency counter over `f64` keys.
///
/// Callers are expected to round values before counting (see
/// [`crate::utils::math::round`]); two keys are equal iff their rounded
/// values are bit-identical.
#[derive(Debug, Clone, Default)]
pub struct DoubleCounter {
    counts: IndexMap<u64, (f64, u64)>,
}

impl DoubleCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `value`.
    pub fn add(&mut self, value: f64) {
        // Collapse -0.0 and 0.0 into one key.
        let value = if value == 0.0 { 0.0 } else { value };
        let entry = self.counts.entry(value.to_bits()).or_insert((value, 0));
        entry.1 += 1;
    }

    /// The most frequent value, or `None` when the counter is empty.
    pub fn most_freq(&self) -> Option<f64> {
        self.most_freq_and_count().map(|(value, _)| value)
    }

    /// The most frequent value together with its count.
    pub fn most_freq_and_count(&self) -> Option<(f64, u64)> {
        let mut best: Option<(f64, u64)> = None;
        for &(value, count) in self.counts.values() {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((value, count)),
            }
        }
        best
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no value has been counted yet.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// A frequency counter over string keys.
#[derive(Debug, Clone, Default)]
pub struct StringCounter {
    counts: IndexMap<String, u64>,
}

impl StringCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `value`.
    pub fn add(&mut self, value: &str) {
        match self.counts.get_mut(value) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(value.to_string(), 1);
            }
        }
    }

    /// The most frequent string, or `None` when the counter is empty.
    pub fn most_freq(&self) -> Option<&str> {
        let mut best: Option<(&str, u64)> = None;
        for (value, &count) in &self.counts {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((value, count)),
            }
        }
        best.map(|(value, _)| value)
    }

    /// Whether no value has been counted yet.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
