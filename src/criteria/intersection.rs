use super::Grade;
use crate::conditions::{
    COND_TRAFFIC_SIGN, COND_TRAFFIC_SIGNAL, ConditionRecord, MOD_TRAFFIC_SIGN_TYPE,
};

const STOP_SIGN: &str = "20";
const PRIORITY_TO_RIGHT_SIGN: &str = "37";
const YIELD_SIGN: &str = "42";

/// How traffic is regulated where a link meets the next intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectionKind {
    TrafficSignal,
    Stop,
    PriorityToRight,
    Yield,
    Roundabout,
    Priority,
}

impl IntersectionKind {
    pub fn grade(self) -> Grade {
        match self {
            IntersectionKind::Stop => Grade::POOR,
            IntersectionKind::TrafficSignal
            | IntersectionKind::PriorityToRight
            | IntersectionKind::Yield
            | IntersectionKind::Roundabout => Grade::FAIR,
            IntersectionKind::Priority => Grade::GOOD,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IntersectionKind::TrafficSignal => "Feux",
            IntersectionKind::Stop => "Stop",
            IntersectionKind::PriorityToRight => "Priorité droite",
            IntersectionKind::Yield => "Cédez passage",
            IntersectionKind::Roundabout => "Giratoire",
            IntersectionKind::Priority => "Prioritaire",
        }
    }

    /// Reads a traffic signal or regulatory sign condition.
    pub fn from_record(record: &ConditionRecord) -> Option<Self> {
        match record.cond_type {
            COND_TRAFFIC_SIGNAL => Some(IntersectionKind::TrafficSignal),
            COND_TRAFFIC_SIGN if record.mod_type == Some(MOD_TRAFFIC_SIGN_TYPE) => {
                match record.mod_val.as_deref().map(str::trim) {
                    Some(STOP_SIGN) => Some(IntersectionKind::Stop),
                    Some(PRIORITY_TO_RIGHT_SIGN) => Some(IntersectionKind::PriorityToRight),
                    Some(YIELD_SIGN) => Some(IntersectionKind::Yield),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Explicit signals and signs take precedence over the roundabout flag; among
/// several explicit conditions the most restrictive one wins.
pub fn resolve_intersection(records: &[ConditionRecord], roundabout: bool) -> IntersectionKind {
    let explicit = records
        .iter()
        .filter_map(IntersectionKind::from_record)
        .min_by_key(|kind| kind.grade());
    match explicit {
        Some(kind) => kind,
        None if roundabout => IntersectionKind::Roundabout,
        None => IntersectionKind::Priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(value: &str) -> ConditionRecord {
        ConditionRecord {
            cond_type: COND_TRAFFIC_SIGN,
            mod_type: Some(MOD_TRAFFIC_SIGN_TYPE),
            mod_val: Some(value.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn grades_each_regulation() {
        let signal = ConditionRecord {
            cond_type: COND_TRAFFIC_SIGNAL,
            ..Default::default()
        };
        assert_eq!(resolve_intersection(&[signal], false).grade(), Grade::FAIR);
        assert_eq!(resolve_intersection(&[sign("20")], false).grade(), Grade::POOR);
        assert_eq!(
            resolve_intersection(&[sign("37")], false),
            IntersectionKind::PriorityToRight
        );
        assert_eq!(resolve_intersection(&[sign("42")], false).grade(), Grade::FAIR);
        assert_eq!(resolve_intersection(&[sign("41")], false), IntersectionKind::Priority);
        assert_eq!(resolve_intersection(&[], false).grade(), Grade::GOOD);
    }

    #[test]
    fn roundabout_only_without_explicit_condition() {
        assert_eq!(resolve_intersection(&[], true), IntersectionKind::Roundabout);
        assert_eq!(resolve_intersection(&[sign("20")], true), IntersectionKind::Stop);
    }

    #[test]
    fn most_restrictive_condition_wins() {
        let signal = ConditionRecord {
            cond_type: COND_TRAFFIC_SIGNAL,
            ..Default::default()
        };
        assert_eq!(
            resolve_intersection(&[signal, sign("20"), sign("42")], false),
            IntersectionKind::Stop
        );
    }
}
