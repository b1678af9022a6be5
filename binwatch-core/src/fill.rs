//! Conversion of distance readings into fill percentages.

use tracing::warn;

use crate::config::{DEFAULT_PERCENTAGE_SCALE, is_valid_scale};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Input irregularity absorbed while computing a fill level.
pub enum FillAnomaly {
    /// Bin height is zero or negative; the fill is reported as 0.
    NonPositiveHeight,
    /// Reading exceeds the bin height; treated as an empty bin.
    DistanceBeyondHeight,
    /// Reading is negative; the result saturates at the top of the scale.
    NegativeDistance,
    /// Height or distance is NaN or infinite; the fill is reported as 0.
    NonFiniteInput,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Result of a fill computation.
pub struct FillLevel {
    /// Fill percentage within `[0, scale]`.
    pub percentage: f64,
    /// Irregularity found in the inputs, if any.
    pub anomaly: Option<FillAnomaly>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Maps `(height, distance)` pairs onto a bounded fill scale.
pub struct FillCalculator {
    scale: f64,
}

impl Default for FillCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_PERCENTAGE_SCALE)
    }
}

impl FillCalculator {
    /// Calculator mapping a full bin to `scale`.
    ///
    /// A scale that is not finite and positive is replaced by the default.
    #[must_use]
    pub fn new(scale: f64) -> Self {
        if is_valid_scale(scale) {
            Self { scale }
        } else {
            warn!(scale, "invalid percentage scale, using default");
            Self {
                scale: DEFAULT_PERCENTAGE_SCALE,
            }
        }
    }

    /// Upper bound of the produced values.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Compute `(height - distance) / height * scale`, clamped to `[0, scale]`.
    #[must_use]
    pub fn compute(&self, height: f64, distance: f64) -> FillLevel {
        if !height.is_finite() || !distance.is_finite() {
            return FillLevel {
                percentage: 0.0,
                anomaly: Some(FillAnomaly::NonFiniteInput),
            };
        }
        if height <= 0.0 {
            return FillLevel {
                percentage: 0.0,
                anomaly: Some(FillAnomaly::NonPositiveHeight),
            };
        }

        let (distance, anomaly) = if distance > height {
            (height, Some(FillAnomaly::DistanceBeyondHeight))
        } else if distance < 0.0 {
            // Left unclamped: the final bound saturates it at the top of the scale.
            (distance, Some(FillAnomaly::NegativeDistance))
        } else {
            (distance, None)
        };

        let raw = (height - distance) / height * self.scale;
        FillLevel {
            percentage: raw.clamp(0.0, self.scale),
            anomaly,
        }
    }
}

/// Fill percentage on the default 0–100 scale.
#[must_use]
pub fn compute_fill_percentage(height: f64, distance: f64) -> f64 {
    FillCalculator::default().compute(height, distance).percentage
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn approx(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn empty_and_full_bins() {
        assert!(approx(compute_fill_percentage(100.0, 0.0), 100.0), "zero distance is full");
        assert!(approx(compute_fill_percentage(100.0, 100.0), 0.0), "full distance is empty");
        assert!(approx(compute_fill_percentage(120.0, 30.0), 75.0), "quarter distance");
    }

    #[test]
    fn over_range_distance_reads_as_empty() {
        let calculator = FillCalculator::default();
        let level = calculator.compute(100.0, 150.0);
        assert!(approx(level.percentage, 0.0), "clamped to empty");
        assert_eq!(level.anomaly, Some(FillAnomaly::DistanceBeyondHeight));
        assert!(
            approx(
                compute_fill_percentage(100.0, 150.0),
                compute_fill_percentage(100.0, 100.0)
            ),
            "over-range matches exact height"
        );
    }

    #[test]
    fn non_positive_height_yields_zero() {
        for height in [0.0, -1.0, -250.0] {
            let level = FillCalculator::default().compute(height, 10.0);
            assert!(approx(level.percentage, 0.0), "height {height}");
            assert_eq!(level.anomaly, Some(FillAnomaly::NonPositiveHeight));
        }
    }

    #[test]
    fn negative_distance_saturates_at_full() {
        let level = FillCalculator::default().compute(100.0, -20.0);
        assert!(approx(level.percentage, 100.0), "saturates");
        assert_eq!(level.anomaly, Some(FillAnomaly::NegativeDistance));
    }

    #[test]
    fn non_finite_inputs_yield_zero() {
        let calculator = FillCalculator::default();
        for (height, distance) in [(f64::NAN, 1.0), (100.0, f64::NAN), (f64::INFINITY, 5.0)] {
            let level = calculator.compute(height, distance);
            assert!(approx(level.percentage, 0.0), "{height}/{distance}");
            assert_eq!(level.anomaly, Some(FillAnomaly::NonFiniteInput));
        }
    }

    #[test]
    fn custom_scale_bounds_result() {
        let calculator = FillCalculator::new(1.0);
        assert!(approx(calculator.compute(80.0, 20.0).percentage, 0.75), "fraction scale");
        assert!(approx(calculator.compute(80.0, -5.0).percentage, 1.0), "saturates at scale");
    }

    #[test]
    fn invalid_scale_falls_back_to_default() {
        for scale in [-1.0, 0.0, f64::NAN, f64::NEG_INFINITY] {
            let calculator = FillCalculator::new(scale);
            assert!(approx(calculator.scale(), 100.0), "scale {scale}");
            assert!(approx(calculator.compute(100.0, 10.0).percentage, 90.0), "scale {scale}");
        }
    }

    proptest! {
        #[test]
        fn fill_stays_within_bounds(height in 0.001f64..10_000.0, distance in -10_000.0f64..10_000.0) {
            let fill = compute_fill_percentage(height, distance);
            prop_assert!((0.0..=100.0).contains(&fill));
        }

        #[test]
        fn fill_never_increases_with_distance(
            height in 0.001f64..10_000.0,
            first in -10_000.0f64..10_000.0,
            second in -10_000.0f64..10_000.0,
        ) {
            let (near, far) = if first <= second { (first, second) } else { (second, first) };
            prop_assert!(compute_fill_percentage(height, near) >= compute_fill_percentage(height, far));
        }

        #[test]
        fn non_positive_height_always_zero(height in -10_000.0f64..=0.0, distance in -10_000.0f64..10_000.0) {
            prop_assert_eq!(compute_fill_percentage(height, distance), 0.0);
        }
    }
}
