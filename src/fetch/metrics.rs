//! Derived prediction metrics
//!
//! Compares both predicted prices against the observed price.

use crate::models::PredictionMetrics;

/// Rounds to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage `difference / current * 100`, defined as 0 when `current` is 0.
pub fn percentage(difference: f64, current: f64) -> f64 {
    if current == 0.0 {
        0.0
    } else {
        difference / current * 100.0
    }
}

/// Computes signed deltas (`predicted - current`), their percentages and the
/// unweighted average of both deltas.
pub fn compute_metrics(current: f64, lstm: f64, arima: f64) -> PredictionMetrics {
    let lstm_difference = lstm - current;
    let arima_difference = arima - current;
    let average_difference = (lstm_difference + arima_difference) / 2.0;

    PredictionMetrics {
        lstm_difference: round2(lstm_difference),
        lstm_percentage: round2(percentage(lstm_difference, current)),
        arima_difference: round2(arima_difference),
        arima_percentage: round2(percentage(arima_difference, current)),
        average_difference: round2(average_difference),
        average_percentage: round2(percentage(average_difference, current)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compute_metrics() {
        let metrics = compute_metrics(100.0, 110.0, 95.0);

        assert_eq!(metrics.lstm_difference, 10.0);
        assert_eq!(metrics.lstm_percentage, 10.0);
        assert_eq!(metrics.arima_difference, -5.0);
        assert_eq!(metrics.arima_percentage, -5.0);
        assert_eq!(metrics.average_difference, 2.5);
        assert_eq!(metrics.average_percentage, 2.5);
    }

    #[test]
    fn test_rounding() {
        let metrics = compute_metrics(3.0, 4.0, 3.0);

        assert_eq!(metrics.lstm_difference, 1.0);
        assert_eq!(metrics.lstm_percentage, 33.33);
        assert_eq!(metrics.average_percentage, 16.67);
    }

    #[test]
    fn test_zero_current_price() {
        let metrics = compute_metrics(0.0, 12.5, 7.0);

        assert_eq!(metrics.lstm_percentage, 0.0);
        assert_eq!(metrics.arima_percentage, 0.0);
        assert_eq!(metrics.average_percentage, 0.0);
        assert_eq!(metrics.lstm_difference, 12.5);
    }

    proptest! {
        #[test]
        fn prop_zero_current_never_divides(lstm in -1e9f64..1e9, arima in -1e9f64..1e9) {
            let metrics = compute_metrics(0.0, lstm, arima);
            prop_assert_eq!(metrics.lstm_percentage, 0.0);
            prop_assert_eq!(metrics.arima_percentage, 0.0);
            prop_assert_eq!(metrics.average_percentage, 0.0);
            prop_assert!(metrics.average_difference.is_finite());
        }
    }
}
