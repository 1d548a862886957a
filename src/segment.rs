use std::collections::BTreeMap;

use crate::aggregate::GroupScore;
use crate::criteria::construction::ConstructionImpact;
use crate::criteria::gauge::GaugeLimits;
use crate::criteria::intersection::IntersectionKind;
use crate::criteria::lanes::LaneAttributes;
use crate::criteria::{Criterion, CriterionRegistry, Grade, Group};
use crate::error::{Result, ScoringError};

/// One road link of the study area.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Segment {
    pub link_id: u64,
    /// Functional class 1..=5, 1 being the main roads.
    pub func_class: u8,
    pub length_km: f64,
    pub lanes: LaneAttributes,
    pub to_speed_limit: f64,
    pub from_speed_limit: f64,
    pub roundabout: bool,
}

impl Segment {
    /// Rejects links that cannot be weighted in the summary.
    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.func_class) {
            return Err(ScoringError::InvalidSegment {
                link_id: self.link_id,
                reason: format!("functional class {} is not within 1..=5", self.func_class),
            });
        }
        if !self.length_km.is_finite() || self.length_km < 0.0 {
            return Err(ScoringError::InvalidSegment {
                link_id: self.link_id,
                reason: format!("length {} km is not a non-negative number", self.length_km),
            });
        }
        Ok(())
    }
}

/// Raw values behind each grade, written next to the grades in the output.
/// `None` marks a link absent from the dataset behind that measure.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMeasures {
    pub has_bike_lane: bool,
    pub transit_runs: Option<f64>,
    pub intersection: IntersectionKind,
    pub obstacle_count: u32,
    pub rsi_to: f64,
    pub rsi_from: f64,
    pub construction: ConstructionImpact,
    pub gauge: GaugeLimits,
    pub daily_access_hours: Option<f64>,
    pub parking_spots: f64,
    pub slope_percent: Option<f64>,
}

impl Default for RawMeasures {
    /// What a link without any auxiliary record looks like.
    fn default() -> Self {
        Self {
            has_bike_lane: false,
            transit_runs: None,
            intersection: IntersectionKind::Priority,
            obstacle_count: 0,
            rsi_to: 0.0,
            rsi_from: 0.0,
            construction: ConstructionImpact::none(),
            gauge: GaugeLimits::default(),
            daily_access_hours: None,
            parking_spots: 0.0,
            slope_percent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSegment {
    pub segment: Segment,
    pub measures: RawMeasures,
    pub grades: BTreeMap<Criterion, Grade>,
    pub circulation: GroupScore,
    pub accessibility: GroupScore,
    pub hierarchy_ratio: f64,
    pub poi_weight: f64,
}

impl ScoredSegment {
    pub fn grade(&self, criterion: Criterion) -> Grade {
        self.grades
            .get(&criterion)
            .copied()
            .unwrap_or(Grade::UNDETERMINED)
    }

    /// Grades of one group in registry order.
    pub fn group_grades(&self, registry: &CriterionRegistry, group: Group) -> Vec<Grade> {
        registry
            .group(group)
            .iter()
            .map(|d| self.grade(d.criterion))
            .collect()
    }

    /// Summary weight of the segment within `group`: length times hierarchy
    /// ratio for circulation, length times POI weight for accessibility.
    pub fn summary_weight(&self, group: Group) -> f64 {
        match group {
            Group::Circulation => self.segment.length_km * self.hierarchy_ratio,
            Group::Accessibility => self.segment.length_km * self.poi_weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_unknown_class_and_negative_length() {
        let segment = Segment {
            link_id: 4,
            func_class: 3,
            length_km: 0.2,
            ..Default::default()
        };
        assert!(segment.validate().is_ok());

        let bad_class = Segment {
            func_class: 6,
            ..segment.clone()
        };
        assert!(matches!(
            bad_class.validate(),
            Err(ScoringError::InvalidSegment { link_id: 4, .. })
        ));

        let bad_length = Segment {
            length_km: -1.0,
            ..segment
        };
        assert!(bad_length.validate().is_err());
    }

    #[test]
    fn missing_grade_reads_as_undetermined() {
        let scored = ScoredSegment {
            segment: Segment::default(),
            measures: RawMeasures::default(),
            grades: BTreeMap::from([(Criterion::Speed, Grade::FAIR)]),
            circulation: GroupScore::default(),
            accessibility: GroupScore::default(),
            hierarchy_ratio: 2.0,
            poi_weight: 3.0,
        };
        assert_eq!(scored.grade(Criterion::Speed), Grade::FAIR);
        assert_eq!(scored.grade(Criterion::Slope), Grade::UNDETERMINED);
        assert_eq!(scored.summary_weight(Group::Circulation), 0.0);
    }
}
