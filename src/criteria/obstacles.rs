use std::collections::HashSet;

use super::{Grade, ThresholdPair};
use crate::conditions::{
    COND_RAILWAY_CROSSING, COND_SPECIAL_SPEED, COND_TRAFFIC_SIGN, ConditionRecord,
    SPEED_BUMPS_PRESENT,
};

/// Traffic sign modifier value for a pedestrian crossing.
const PEDESTRIAN_CROSSING_SIGN: &str = "41";

/// Speed bumps, pedestrian crossings and railway crossings.
pub fn is_obstacle(record: &ConditionRecord) -> bool {
    match record.cond_type {
        COND_SPECIAL_SPEED => record.cond_val1.as_deref().map(str::trim) == Some(SPEED_BUMPS_PRESENT),
        COND_TRAFFIC_SIGN => record.mod_val.as_deref().map(str::trim) == Some(PEDESTRIAN_CROSSING_SIGN),
        COND_RAILWAY_CROSSING => true,
        _ => false,
    }
}

/// Number of distinct obstacle conditions on a link.
pub fn count_obstacles(records: &[ConditionRecord]) -> u32 {
    let conditions: HashSet<u64> = records
        .iter()
        .filter(|r| is_obstacle(r))
        .map(|r| r.cond_id)
        .collect();
    conditions.len() as u32
}

/// `<= good` obstacles is 3, `< bad` is 2, `>= bad` is 1.
pub fn grade_obstacles(count: u32, thresholds: ThresholdPair) -> Grade {
    thresholds.grade_descending(f64::from(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cond_id: u64, cond_type: u32, cond_val1: Option<&str>, mod_val: Option<&str>) -> ConditionRecord {
        ConditionRecord {
            link_id: 1,
            cond_id,
            cond_type,
            cond_val1: cond_val1.map(str::to_string),
            mod_type: mod_val.map(|_| 22),
            mod_val: mod_val.map(str::to_string),
        }
    }

    #[test]
    fn counts_each_obstacle_condition_once() {
        let records = vec![
            record(1, COND_SPECIAL_SPEED, Some("SPEED BUMPS PRESENT"), None),
            record(2, COND_TRAFFIC_SIGN, None, Some("41")),
            record(3, COND_RAILWAY_CROSSING, None, Some("1")),
            record(3, COND_RAILWAY_CROSSING, None, Some("2")),
            record(4, COND_TRAFFIC_SIGN, None, Some("20")),
            record(5, COND_SPECIAL_SPEED, Some("SCHOOL ZONE"), None),
        ];
        assert_eq!(count_obstacles(&records), 3);
    }

    #[test]
    fn grades_obstacle_count() {
        let pair = ThresholdPair::new(1.0, 3.0);
        assert_eq!(grade_obstacles(0, pair), Grade::GOOD);
        assert_eq!(grade_obstacles(1, pair), Grade::GOOD);
        assert_eq!(grade_obstacles(2, pair), Grade::FAIR);
        assert_eq!(grade_obstacles(3, pair), Grade::POOR);
        let grades: Vec<_> = (0..10).map(|n| grade_obstacles(n, pair)).collect();
        assert!(grades.windows(2).all(|w| w[0] >= w[1]));
    }
}
