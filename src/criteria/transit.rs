use std::collections::HashMap;

use super::{Grade, ThresholdPair};

/// Runs per hour of one stop, attached to its nearest link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopFrequency {
    pub link_id: u64,
    pub runs_per_hour: f64,
}

/// Total runs per hour of all stops attached to each link.
pub fn runs_by_link(stops: &[StopFrequency]) -> HashMap<u64, f64> {
    let mut runs: HashMap<u64, f64> = HashMap::new();
    for stop in stops {
        *runs.entry(stop.link_id).or_default() += stop.runs_per_hour;
    }
    runs
}

/// Busy stops slow deliveries down: `<= good` runs is 3, `< bad` is 2,
/// `>= bad` is 1.
pub fn grade_transit(runs_per_hour: f64, thresholds: ThresholdPair) -> Grade {
    thresholds.grade_descending(runs_per_hour)
}
