use super::{Grade, ThresholdPair};

/// Grades the posted speed limits of both directions. A zero limit means the
/// direction carries no limit (or no traffic) and only counts when both are
/// zero.
pub fn grade_speed(to_limit: f64, from_limit: f64, thresholds: ThresholdPair) -> Grade {
    let ThresholdPair { good, bad } = thresholds;
    let to_set = to_limit != 0.0;
    let from_set = from_limit != 0.0;

    if (to_set && to_limit <= bad)
        || (from_set && from_limit <= bad)
        || (from_limit <= bad && to_limit <= bad)
    {
        Grade::POOR
    } else if (to_set && to_limit < good)
        || (from_set && from_limit < good)
        || (from_limit < good && to_limit < good)
    {
        Grade::FAIR
    } else if to_limit >= good || from_limit >= good {
        Grade::GOOD
    } else {
        Grade::UNDETERMINED
    }
}
