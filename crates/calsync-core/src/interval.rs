//! Deltas between consecutive occurrences.
//!
//! An [`IntervalSequence`] holds the gaps between occurrences, either in whole
//! days or in calendar months, and answers the two questions recurrence
//! inference needs: are all gaps equal, and do the gaps repeat as a cycle?

/// Minimum sum of a day-granularity cycle (one week).
pub const DAY_REPEAT_THRESHOLD: i64 = 7;

/// Minimum sum of a month-granularity cycle (one year).
pub const MONTH_REPEAT_THRESHOLD: i64 = 12;

/// An ordered list of signed deltas plus the minimum span a cycle must cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalSequence {
    items: Vec<i64>,
    repeat_threshold: i64,
}

impl IntervalSequence {
    /// Creates a sequence with an explicit repeat-sum threshold.
    pub fn new(items: Vec<i64>, repeat_threshold: i64) -> Self {
        Self {
            items,
            repeat_threshold,
        }
    }

    /// Creates a day-granularity sequence (threshold 7).
    pub fn days(items: Vec<i64>) -> Self {
        Self::new(items, DAY_REPEAT_THRESHOLD)
    }

    /// Creates a month-granularity sequence (threshold 12).
    pub fn months(items: Vec<i64>) -> Self {
        Self::new(items, MONTH_REPEAT_THRESHOLD)
    }

    /// Returns the deltas.
    pub fn items(&self) -> &[i64] {
        &self.items
    }

    /// Returns the repeat-sum threshold.
    pub fn repeat_threshold(&self) -> i64 {
        self.repeat_threshold
    }

    /// Number of deltas.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no deltas.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the common value if the sequence is non-empty and constant.
    pub fn constant_value(&self) -> Option<i64> {
        let (first, rest) = self.items.split_first()?;
        rest.iter().all(|v| v == first).then_some(*first)
    }

    /// Returns `true` if the sequence is non-empty and every delta is equal.
    pub fn all_equal(&self) -> bool {
        self.constant_value().is_some()
    }

    /// Returns `true` if [`repeating_cycle`](Self::repeating_cycle) finds a cycle.
    pub fn has_repeating_cycle(&self) -> bool {
        self.repeating_cycle().is_some()
    }

    /// Finds the shortest prefix that tiles the whole sequence.
    ///
    /// The prefix must hold at least two deltas, sum to at least the repeat
    /// threshold, and satisfy `items[i] == cycle[i % cycle.len()]` for every
    /// index. The trailing repetition may be partial. A prefix as long as the
    /// whole sequence does not count, and constant sequences never have a
    /// cycle.
    pub fn repeating_cycle(&self) -> Option<&[i64]> {
        if self.items.is_empty() || self.all_equal() {
            return None;
        }

        (2..self.items.len())
            .map(|len| &self.items[..len])
            .filter(|cycle| cycle.iter().sum::<i64>() >= self.repeat_threshold)
            .find(|cycle| self.is_tiled_by(cycle))
    }

    fn is_tiled_by(&self, cycle: &[i64]) -> bool {
        self.items
            .iter()
            .enumerate()
            .all(|(i, v)| *v == cycle[i % cycle.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod constant {
        use super::*;

        #[test]
        fn all_equal() {
            let seq = IntervalSequence::days(vec![5, 5, 5]);
            assert!(seq.all_equal());
            assert_eq!(seq.constant_value(), Some(5));
        }

        #[test]
        fn single_item_is_constant() {
            let seq = IntervalSequence::days(vec![14]);
            assert_eq!(seq.constant_value(), Some(14));
        }

        #[test]
        fn empty_is_not_constant() {
            let seq = IntervalSequence::days(vec![]);
            assert!(!seq.all_equal());
            assert_eq!(seq.constant_value(), None);
        }

        #[test]
        fn mixed_is_not_constant() {
            let seq = IntervalSequence::months(vec![1, 1, 2]);
            assert!(!seq.all_equal());
        }
    }

    mod cycle {
        use super::*;

        #[test]
        fn finds_weekly_cycle() {
            let seq = IntervalSequence::days(vec![1, 2, 4, 1, 2, 4, 1, 2, 4]);
            assert_eq!(seq.repeating_cycle(), Some(&[1, 2, 4][..]));
            assert!(seq.has_repeating_cycle());
        }

        #[test]
        fn no_repetition() {
            let seq = IntervalSequence::days(vec![1, 2, 3]);
            assert_eq!(seq.repeating_cycle(), None);
        }

        #[test]
        fn constant_sequence_has_no_cycle() {
            let seq = IntervalSequence::days(vec![5, 5, 5]);
            assert_eq!(seq.repeating_cycle(), None);
        }

        #[test]
        fn empty_sequence_has_no_cycle() {
            assert_eq!(IntervalSequence::days(vec![]).repeating_cycle(), None);
        }

        #[test]
        fn partial_trailing_repetition() {
            // Mon/Wed/Fri for three weeks: 9 occurrences, 8 deltas.
            let seq = IntervalSequence::days(vec![2, 2, 3, 2, 2, 3, 2, 2]);
            assert_eq!(seq.repeating_cycle(), Some(&[2, 2, 3][..]));
        }

        #[test]
        fn cycle_must_reach_threshold() {
            // [1, 2] repeats but only covers 3 days; longer prefixes do not tile.
            let seq = IntervalSequence::days(vec![1, 2, 1, 2, 1, 2]);
            assert_eq!(seq.repeating_cycle(), None);
        }

        #[test]
        fn shortest_qualifying_prefix_wins() {
            // [3, 4] covers 7 days and tiles; [3, 4, 3, 4] would too.
            let seq = IntervalSequence::days(vec![3, 4, 3, 4, 3, 4]);
            assert_eq!(seq.repeating_cycle(), Some(&[3, 4][..]));
        }

        #[test]
        fn prefix_reaching_threshold_must_still_tile() {
            // [2, 5] reaches 7 but the tail breaks the pattern.
            let seq = IntervalSequence::days(vec![2, 5, 2, 5, 2, 6]);
            assert_eq!(seq.repeating_cycle(), None);
        }

        #[test]
        fn whole_sequence_is_degenerate() {
            let seq = IntervalSequence::days(vec![2, 5]);
            assert_eq!(seq.repeating_cycle(), None);

            let seq = IntervalSequence::days(vec![2, 2, 3]);
            assert_eq!(seq.repeating_cycle(), None);
        }

        #[test]
        fn partial_week_boundary() {
            // One full Tue/Thu week followed by a single Tue.
            let seq = IntervalSequence::days(vec![2, 5, 2]);
            assert_eq!(seq.repeating_cycle(), Some(&[2, 5][..]));
        }

        #[test]
        fn month_threshold() {
            // Quarterly-then-eight-months shape covers a year per cycle.
            let seq = IntervalSequence::months(vec![4, 8, 4, 8]);
            assert_eq!(seq.repeating_cycle(), Some(&[4, 8][..]));

            // A five-month cycle never reaches a year.
            let seq = IntervalSequence::months(vec![2, 3, 2, 3]);
            assert_eq!(seq.repeating_cycle(), None);
        }
    }
}
