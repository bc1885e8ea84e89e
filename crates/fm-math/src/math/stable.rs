//! Compensated summation and ratio helpers.
//!
//! Sums use Neumaier compensation; the result does not depend on row order
//! beyond the last ulp.

/// Element ratio with IEEE-754 semantics.
///
/// `x / 0` is `±inf` and `0 / 0` is NaN; callers decide whether a
/// non-finite result is acceptable.
#[inline]
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    numerator / denominator
}

/// Running Neumaier-compensated sum.
///
/// Non-finite inputs propagate: any NaN yields NaN, mixed infinities yield NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeumaierSum {
    sum: f64,
    compensation: f64,
    non_finite: Option<f64>,
}

impl NeumaierSum {
    pub fn add(&mut self, v: f64) {
        if !v.is_finite() {
            self.non_finite = Some(match self.non_finite {
                None => v,
                Some(prev) => prev + v,
            });
            return;
        }
        let t = self.sum + v;
        if self.sum.abs() >= v.abs() {
            self.compensation += (self.sum - t) + v;
        } else {
            self.compensation += (v - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        match self.non_finite {
            Some(nf) => nf,
            None => self.sum + self.compensation,
        }
    }
}
