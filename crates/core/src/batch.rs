//! Outcome of a batch run processed one unit at a time.
//!
//! Each unit produces a `Result`; the batch folds them into successes and
//! failures instead of stopping at the first error.

/// Successes and failures of a batch, each keyed by the unit it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome<K, T, E> {
    /// Units that completed, with their results.
    pub succeeded: Vec<(K, T)>,
    /// Units that failed, with their errors.
    pub failed: Vec<(K, E)>,
}

impl<K, T, E> Default for BatchOutcome<K, T, E> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<K, T, E> BatchOutcome<K, T, E> {
    /// Creates an empty outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one unit's result.
    pub fn record(&mut self, key: K, result: Result<T, E>) {
        match result {
            Ok(value) => self.succeeded.push((key, value)),
            Err(err) => self.failed.push((key, err)),
        }
    }

    /// Total number of units processed.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Returns true if no unit failed.
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<K, T, E> FromIterator<(K, Result<T, E>)> for BatchOutcome<K, T, E> {
    fn from_iter<I: IntoIterator<Item = (K, Result<T, E>)>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), |mut outcome, (key, result)| {
            outcome.record(key, result);
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_keeps_going_after_failures() {
        let outcome: BatchOutcome<u32, u32, String> = (1..=5)
            .map(|n| {
                let result = if n % 2 == 0 { Err(format!("unit {n} failed")) } else { Ok(n * 10) };
                (n, result)
            })
            .collect();

        assert_eq!(outcome.processed(), 5);
        assert_eq!(outcome.succeeded, vec![(1, 10), (3, 30), (5, 50)]);
        assert_eq!(outcome.failed.len(), 2);
        assert_eq!(outcome.failed[1], (4, "unit 4 failed".to_string()));
        assert!(!outcome.is_complete_success());
    }

    #[test]
    fn test_empty_outcome_is_success() {
        let outcome: BatchOutcome<u32, (), String> = BatchOutcome::new();
        assert!(outcome.is_complete_success());
        assert_eq!(outcome.processed(), 0);
    }
}
