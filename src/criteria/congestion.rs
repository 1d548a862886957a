use super::{Grade, ThresholdPair};

/// Grades the congestion indices of both directions of a link. A zero index
/// means no probe data for that direction; the worse of the measured
/// directions is graded, and a link without data grades 3.
pub fn grade_congestion(rsi_to: f64, rsi_from: f64, thresholds: ThresholdPair) -> Grade {
    let ratio = match (rsi_to == 0.0, rsi_from == 0.0) {
        (true, true) => return Grade::GOOD,
        (true, false) => rsi_from,
        (false, true) => rsi_to,
        (false, false) => rsi_to.min(rsi_from),
    };
    thresholds.grade_ascending(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn missing_data_in_both_directions_is_good() {
        for pair in [ThresholdPair::new(0.7, 0.4), ThresholdPair::new(2.0, 1.5)] {
            assert_eq!(grade_congestion(0.0, 0.0, pair), Grade::GOOD);
        }
    }

    #[test]
    fn single_direction_is_symmetric() {
        let pair = ThresholdPair::new(0.7, 0.4);
        let mut rng = rand::rng();
        for _ in 0..200 {
            let x: f64 = rng.random_range(0.0..1.0);
            assert_eq!(grade_congestion(x, 0.0, pair), grade_congestion(0.0, x, pair));
        }
    }

    #[test]
    fn worse_direction_decides() {
        let pair = ThresholdPair::new(0.7, 0.4);
        assert_eq!(grade_congestion(0.9, 0.8, pair), Grade::GOOD);
        assert_eq!(grade_congestion(0.9, 0.5, pair), Grade::FAIR);
        assert_eq!(grade_congestion(0.3, 0.9, pair), Grade::POOR);
        assert_eq!(grade_congestion(0.7, 0.0, pair), Grade::GOOD);
        assert_eq!(grade_congestion(0.4, 0.0, pair), Grade::POOR);
    }
}
