//! Delivery time windows.
//!
//! Date-time modifiers describe when a condition applies. Each day-mask record
//! contributes `days × (end − start)` hours per week, positive when trucks may
//! use the link in that window and negative when they may not.

use chrono::{NaiveTime, Timelike};
use log::warn;
use std::collections::HashMap;

use super::{Grade, ThresholdPair};
use crate::conditions::Condition;

/// `DTTME_TYPE` of a weekly day-mask record.
pub const DAY_MASK_TYPE: &str = "1";

/// Access hours per day of a link without any time restriction.
pub const UNRESTRICTED_DAILY_HOURS: f64 = 24.0;

/// One row of the date-time modifier table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DateTimeModifier {
    pub link_id: u64,
    pub cond_id: u64,
    pub dttme_type: String,
    /// Seven `Y`/`N` flags, Sunday first.
    pub ref_date: String,
    /// `HHMM`
    pub start_time: String,
    /// `HHMM`, `2400` closes the day.
    pub end_time: String,
}

/// A date-time modifier together with the access flags of its condition.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRestriction {
    pub modifier: DateTimeModifier,
    pub trucks_allowed: bool,
}

/// Attaches the access flags of each modifier's condition. Modifiers of
/// conditions closed to deliveries are dropped.
pub fn join_access(modifiers: &[DateTimeModifier], conditions: &[Condition]) -> Vec<TimeRestriction> {
    let access: HashMap<u64, &Condition> = conditions.iter().map(|c| (c.cond_id, c)).collect();
    modifiers
        .iter()
        .filter_map(|modifier| {
            let flags = access.get(&modifier.cond_id).map(|c| c.access).unwrap_or_default();
            if flags.deliveries == Some(false) {
                return None;
            }
            Some(TimeRestriction {
                modifier: modifier.clone(),
                trucks_allowed: flags.trucks != Some(false),
            })
        })
        .collect()
}

fn parse_hhmm(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw == "2400" {
        return Some(24.0);
    }
    let time = NaiveTime::parse_from_str(&format!("{:0>4}", raw), "%H%M").ok()?;
    Some(f64::from(time.num_seconds_from_midnight()) / 3600.0)
}

/// Signed hours per week covered by one restriction, or `None` when it is not
/// a day-mask record or its times cannot be read.
pub fn weekly_access_hours(restriction: &TimeRestriction) -> Option<f64> {
    let modifier = &restriction.modifier;
    if modifier.dttme_type.trim() != DAY_MASK_TYPE {
        return None;
    }
    let (Some(start), Some(end)) = (parse_hhmm(&modifier.start_time), parse_hhmm(&modifier.end_time))
    else {
        warn!(
            "Ignoring time window {}-{} of condition {} on link {}",
            modifier.start_time, modifier.end_time, modifier.cond_id, modifier.link_id
        );
        return None;
    };
    let days = modifier.ref_date.chars().filter(|c| *c == 'Y').count() as f64;
    let hours = days * (end - start);
    Some(if restriction.trucks_allowed { hours } else { -hours })
}

/// A negative weekly total counts forbidden hours, folded back onto the day.
pub fn daily_access_hours(weekly_total: f64) -> f64 {
    if weekly_total < 0.0 {
        weekly_total / 7.0 + 24.0
    } else {
        weekly_total / 7.0
    }
}

/// Average daily access hours of every link with at least one restriction.
/// Records that are not readable day masks add no hours, so a link covered
/// only by such records is open 0 h a day.
pub fn daily_access_by_link(restrictions: &[TimeRestriction]) -> HashMap<u64, f64> {
    let mut weekly: HashMap<u64, f64> = HashMap::new();
    for restriction in restrictions {
        *weekly.entry(restriction.modifier.link_id).or_default() +=
            weekly_access_hours(restriction).unwrap_or(0.0);
    }
    weekly
        .into_iter()
        .map(|(link, total)| (link, daily_access_hours(total)))
        .collect()
}

/// `>= good` hours is 3, `> bad` is 2, `<= bad` is 1.
pub fn grade_access_hours(daily_hours: f64, thresholds: ThresholdPair) -> Grade {
    thresholds.grade_ascending(daily_hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::AccessFlags;

    fn window(link_id: u64, cond_id: u64, ref_date: &str, start: &str, end: &str) -> DateTimeModifier {
        DateTimeModifier {
            link_id,
            cond_id,
            dttme_type: DAY_MASK_TYPE.to_string(),
            ref_date: ref_date.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    fn condition(cond_id: u64, trucks: Option<bool>, deliveries: Option<bool>) -> Condition {
        Condition {
            cond_id,
            access: AccessFlags {
                trucks,
                deliveries,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn weekday_window_counts_allowed_hours() {
        let restrictions = join_access(&[window(1, 10, "NYYYYYN", "0600", "1100")], &[condition(10, None, None)]);
        assert_eq!(weekly_access_hours(&restrictions[0]), Some(25.0));
    }

    #[test]
    fn midnight_end_and_truck_ban() {
        let restrictions = join_access(
            &[window(1, 10, "YYYYYYY", "1800", "2400")],
            &[condition(10, Some(false), None)],
        );
        assert_eq!(weekly_access_hours(&restrictions[0]), Some(-42.0));
        let daily = daily_access_by_link(&restrictions);
        assert_eq!(daily[&1], 18.0);
    }

    #[test]
    fn delivery_closures_are_dropped() {
        let restrictions = join_access(
            &[window(1, 10, "YYYYYYY", "0800", "1000")],
            &[condition(10, None, Some(false))],
        );
        assert!(restrictions.is_empty());
        assert!(daily_access_by_link(&restrictions).is_empty());
    }

    #[test]
    fn link_with_only_other_record_types_is_closed() {
        let mut date_range = window(2, 11, "YYYYYYY", "0800", "1000");
        date_range.dttme_type = "4".to_string();
        let restrictions = join_access(&[date_range], &[condition(11, None, None)]);
        assert_eq!(restrictions.len(), 1);
        assert_eq!(weekly_access_hours(&restrictions[0]), None);

        let daily = daily_access_by_link(&restrictions);
        assert_eq!(daily[&2], 0.0);
        assert_eq!(
            grade_access_hours(daily[&2], ThresholdPair::new(20.0, 10.0)),
            Grade::POOR
        );
    }

    #[test]
    fn other_record_types_add_nothing_next_to_a_day_mask() {
        let mut date_range = window(3, 12, "YYYYYYY", "0000", "2400");
        date_range.dttme_type = "4".to_string();
        let restrictions = join_access(
            &[window(3, 10, "YYYYYYY", "0800", "1000"), date_range],
            &[condition(10, None, None), condition(12, None, None)],
        );
        assert_eq!(daily_access_by_link(&restrictions)[&3], 2.0);
    }

    #[test]
    fn grades_daily_hours() {
        let pair = ThresholdPair::new(20.0, 10.0);
        assert_eq!(grade_access_hours(UNRESTRICTED_DAILY_HOURS, pair), Grade::GOOD);
        assert_eq!(grade_access_hours(20.0, pair), Grade::GOOD);
        assert_eq!(grade_access_hours(15.0, pair), Grade::FAIR);
        assert_eq!(grade_access_hours(10.0, pair), Grade::POOR);
    }
}
