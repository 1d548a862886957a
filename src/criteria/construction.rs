//! Road works and other incidents affecting links.

use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use std::collections::HashMap;

use super::{Grade, ThresholdPair};
use crate::config::IncidentFilter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Criticality {
    Critical,
    Major,
    Minor,
    Low,
    #[default]
    Unknown,
}

impl Criticality {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => Criticality::Critical,
            "major" => Criticality::Major,
            "minor" => Criticality::Minor,
            "low" => Criticality::Low,
            _ => Criticality::Unknown,
        }
    }

    /// 4 for critical down to 1 for low; 0 when the feed gives no level.
    pub fn severity(self) -> u8 {
        match self {
            Criticality::Critical => 4,
            Criticality::Major => 3,
            Criticality::Minor => 2,
            Criticality::Low => 1,
            Criticality::Unknown => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Criticality::Critical => "critical",
            Criticality::Major => "major",
            Criticality::Minor => "minor",
            Criticality::Low => "low",
            Criticality::Unknown => "Pas d'information",
        }
    }
}

/// Combines severity and duration (in days). Without a severity the duration
/// alone decides.
pub fn grade_construction(severity: u8, duration_days: i64, thresholds: ThresholdPair) -> Grade {
    let s = severity;
    let d = duration_days as f64;
    let ThresholdPair { good: g, bad: b } = thresholds;

    if s == 0 {
        return thresholds.grade_descending(d);
    }
    if (s <= 1 && d <= g) || (s < 3 && d <= g) || (s <= 1 && d < b) {
        Grade::GOOD
    } else if s <= 1 || d <= g || (s < 3 && d < b) {
        Grade::FAIR
    } else if s >= 3 || d >= b {
        Grade::POOR
    } else {
        Grade::UNDETERMINED
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    pub id: String,
    pub link_ids: Vec<u64>,
    pub kind: String,
    pub criticality: Criticality,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl Incident {
    /// Whole days between start and end, rounded down. `None` when either
    /// date is missing.
    pub fn duration_days(&self) -> Option<i64> {
        let (start, end) = (self.start?, self.end?);
        Some((end - start).num_seconds().div_euclid(86_400))
    }

    fn is_active_on(&self, date: NaiveDate) -> bool {
        match (self.start, self.end, date.and_hms_opt(0, 0, 0)) {
            (Some(start), Some(end), Some(midnight)) => start < midnight && end > midnight,
            _ => false,
        }
    }
}

impl IncidentFilter {
    /// Unset criteria accept everything, dates included.
    pub fn matches(&self, incident: &Incident) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.iter().any(|k| k.eq_ignore_ascii_case(&incident.kind)) {
                return false;
            }
        }
        if let Some(levels) = &self.criticalities {
            if !levels.contains(&incident.criticality) {
                return false;
            }
        }
        match self.active_on {
            Some(date) => incident.is_active_on(date),
            None => true,
        }
    }
}

/// Outcome of the construction criterion for one link.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionImpact {
    pub impact: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub duration_days: i64,
    pub grade: Grade,
}

impl ConstructionImpact {
    pub fn none() -> Self {
        Self {
            impact: "Aucun".to_string(),
            start: None,
            end: None,
            duration_days: 0,
            grade: Grade::GOOD,
        }
    }

    pub fn assess(incident: &Incident, thresholds: ThresholdPair) -> Self {
        let (duration_days, grade) = match incident.duration_days() {
            Some(days) => (
                days,
                grade_construction(incident.criticality.severity(), days, thresholds),
            ),
            None => (0, Grade::GOOD),
        };
        Self {
            impact: incident.criticality.label().to_string(),
            start: incident.start,
            end: incident.end,
            duration_days,
            grade,
        }
    }
}

/// The least restrictive impact of each link touched by a matching incident.
/// On equal grades the first incident listed is kept.
pub fn impacts_by_link(
    incidents: &[Incident],
    filter: &IncidentFilter,
    thresholds: ThresholdPair,
) -> HashMap<u64, ConstructionImpact> {
    let mut impacts: HashMap<u64, ConstructionImpact> = HashMap::new();
    let mut matched = 0;
    for incident in incidents.iter().filter(|i| filter.matches(i)) {
        matched += 1;
        let impact = ConstructionImpact::assess(incident, thresholds);
        for link_id in &incident.link_ids {
            match impacts.get(link_id) {
                Some(current) if current.grade >= impact.grade => {}
                _ => {
                    impacts.insert(*link_id, impact.clone());
                }
            }
        }
    }
    debug!(
        "{} of {} incidents kept, affecting {} links",
        matched,
        incidents.len(),
        impacts.len()
    );
    impacts
}
