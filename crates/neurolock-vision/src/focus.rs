/// Weight of the (inverted) variance term.
pub const VARIANCE_WEIGHT: f64 = 0.6;
/// Weight of the blink-rate term.
pub const BLINK_WEIGHT: f64 = 0.4;
pub const VARIANCE_GAIN: f64 = 10.0;
/// Blink rate (per second) at which the blink term saturates.
pub const MAX_BLINK_RATE: f64 = 1.5;
/// Shortest duration used when turning a blink count into a rate.
pub const MIN_DURATION_SECS: f64 = 0.5;

/// Heuristic focus proxy from forehead green variance and blink rate.
pub struct FocusScorer;

impl FocusScorer {
    /// Always returns a value in `[0.0, 1.0]`; an empty series scores 0.
    pub fn score(green_series: &[f64], blink_count: u32, duration_seconds: f64) -> f64 {
        if green_series.is_empty() {
            return 0.0;
        }
        let n = green_series.len() as f64;
        let mean = green_series.iter().sum::<f64>() / n;
        let variance = green_series
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / n;
        let var_norm = (variance * VARIANCE_GAIN).tanh();

        let blink_rate = blink_count as f64 / duration_seconds.max(MIN_DURATION_SECS);
        let blink_score = (1.0 - blink_rate.min(MAX_BLINK_RATE)).clamp(0.0, 1.0);

        let focus = VARIANCE_WEIGHT * (1.0 - var_norm) + BLINK_WEIGHT * blink_score;
        focus.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_scores_zero() {
        assert_eq!(FocusScorer::score(&[], 0, 4.0), 0.0);
        assert_eq!(FocusScorer::score(&[], 12, 0.1), 0.0);
    }

    #[test]
    fn flat_series_without_blinks_is_fully_focused() {
        assert_eq!(FocusScorer::score(&[0.4; 60], 0, 4.0), 1.0);
    }

    #[test]
    fn matches_reference_formula() {
        let series = [0.2, 0.4, 0.6, 0.8];
        // mean 0.5, population variance 0.05
        let var_norm = (0.05_f64 * 10.0).tanh();
        let blink_score = 1.0 - 2.0 / 4.0;
        let expected = 0.6 * (1.0 - var_norm) + 0.4 * blink_score;
        assert!((FocusScorer::score(&series, 2, 4.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn short_durations_use_half_second_floor() {
        // rate = 1 / 0.5 = 2 -> saturates at 1.5 -> blink term clamps to 0
        assert!((FocusScorer::score(&[0.5; 4], 1, 0.1) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn extreme_inputs_stay_in_unit_interval() {
        let noisy: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 0.0 } else { 1.0 }).collect();
        for (series, blinks, duration) in [
            (noisy.as_slice(), 1000, 0.1),
            (noisy.as_slice(), 0, 1e-9),
            (&[1.0][..], u32::MAX, 1e6),
            (&[0.0, 1.0][..], 3, 0.5),
        ] {
            let score = FocusScorer::score(series, blinks, duration);
            assert!((0.0..=1.0).contains(&score), "score {score} out of range");
        }
    }
}
