//! Streaming accumulator for group reductions.

use super::stable::NeumaierSum;

/// Count, sum, and mean of the values pushed so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct Accumulator {
    count: usize,
    sum: NeumaierSum,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, v: f64) {
        self.count += 1;
        self.sum.add(v);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum.value()
    }

    /// Mean of pushed values; NaN when nothing was pushed.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum() / self.count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_accumulator() {
        let acc = Accumulator::new();
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.sum(), 0.0);
        assert!(acc.mean().is_nan());
    }

    #[test]
    fn mean_of_pushed_values() {
        let mut acc = Accumulator::new();
        for v in [1.0, 2.0, 3.0, 6.0] {
            acc.push(v);
        }
        assert_eq!(acc.count(), 4);
        assert_eq!(acc.sum(), 12.0);
        assert_eq!(acc.mean(), 3.0);
    }

    #[test]
    fn integer_valued_means_are_exact() {
        let mut acc = Accumulator::new();
        for v in 1000..1400 {
            acc.push(v as f64);
        }
        assert_eq!(acc.sum(), 479_800.0);
        assert_eq!(acc.mean(), 1199.5);
    }

    proptest! {
        #[test]
        fn mean_is_within_bounds(values in prop::collection::vec(-1e6f64..1e6, 1..200)) {
            let mut acc = Accumulator::new();
            for v in &values {
                acc.push(*v);
            }
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(acc.mean() >= min - 1e-6);
            prop_assert!(acc.mean() <= max + 1e-6);
        }
    }
}
