//! Per-criterion classification rules.
//!
//! Every classifier maps raw segment measurements and a threshold pair to a
//! [`Grade`]. The registry below replaces the mutable field-name lists the
//! grading pipeline used to accumulate: each criterion declares its group and
//! output field once, and the study driver asks the registry for the ordered
//! per-group lists.

use std::fmt;

use crate::config::VehicleType;

pub mod congestion;
pub mod construction;
pub mod gauge;
pub mod intersection;
pub mod lanes;
pub mod obstacles;
pub mod parking;
pub mod slope;
pub mod speed;
pub mod time_window;
pub mod transit;

/// Ordinal score of a segment for one criterion.
///
/// 3 is the least restrictive outcome, 1 the most restrictive. 0 means no rule
/// matched, which only happens with inconsistent inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Grade(u8);

impl Grade {
    pub const UNDETERMINED: Grade = Grade(0);
    pub const POOR: Grade = Grade(1);
    pub const FAIR: Grade = Grade(2);
    pub const GOOD: Grade = Grade(3);

    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 3.0;

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_determined(self) -> bool {
        self.0 != 0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The "good"/"bad" cutoff pair of a criterion. Which side of each cutoff is
/// favourable depends on the criterion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPair {
    pub good: f64,
    pub bad: f64,
}

impl ThresholdPair {
    pub const fn new(good: f64, bad: f64) -> Self {
        Self { good, bad }
    }

    /// Grades a value where larger is better: `>= good` is 3, `> bad` is 2,
    /// `<= bad` is 1.
    pub fn grade_ascending(&self, value: f64) -> Grade {
        if value >= self.good {
            Grade::GOOD
        } else if value > self.bad {
            Grade::FAIR
        } else if value <= self.bad {
            Grade::POOR
        } else {
            Grade::UNDETERMINED
        }
    }

    /// Grades a value where smaller is better: `<= good` is 3, `< bad` is 2,
    /// `>= bad` is 1.
    pub fn grade_descending(&self, value: f64) -> Grade {
        if value <= self.good {
            Grade::GOOD
        } else if value < self.bad {
            Grade::FAIR
        } else if value >= self.bad {
            Grade::POOR
        } else {
            Grade::UNDETERMINED
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Circulation,
    Accessibility,
}

impl Group {
    /// Name of the roll-up row in the summary table.
    pub fn summary_label(self) -> &'static str {
        match self {
            Group::Circulation => "CIRCULATION",
            Group::Accessibility => "ACCESSIBILITE",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Circulation => write!(f, "circulation"),
            Group::Accessibility => write!(f, "accessibility"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Criterion {
    Lanes,
    BikeLane,
    Transit,
    Intersection,
    Obstacles,
    Speed,
    Congestion,
    Construction,
    Gauge,
    TimeWindow,
    Parking,
    Slope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriterionDescriptor {
    pub criterion: Criterion,
    pub group: Group,
    /// Grade column in the scored segment table.
    pub field_name: &'static str,
    /// Row label in the summary table.
    pub indicator: &'static str,
}

impl Criterion {
    pub fn descriptor(self) -> CriterionDescriptor {
        let (group, field_name, indicator) = match self {
            Criterion::Lanes | Criterion::BikeLane => (Group::Circulation, "Note_NbVoie", "NbVoie"),
            Criterion::Transit => (Group::Circulation, "Note_ArretTP", "ArretTP"),
            Criterion::Intersection => (Group::Circulation, "Note_Carrefour", "Carrefour"),
            Criterion::Obstacles => (Group::Circulation, "Note_Obstacle", "Obstacle"),
            Criterion::Speed => (Group::Circulation, "Note_Vitesse", "Vitesse"),
            Criterion::Congestion => (Group::Circulation, "Note_Congestion", "Congestion"),
            Criterion::Construction => (Group::Circulation, "Note_Chantier", "Chantier"),
            Criterion::Gauge => (Group::Accessibility, "Note_Gabarit", "Gabarit"),
            Criterion::TimeWindow => (Group::Accessibility, "Note_Horaire", "Horaire"),
            Criterion::Parking => (Group::Accessibility, "Note_Stationnement", "Stationnement"),
            Criterion::Slope => (Group::Accessibility, "Note_Pente", "Pente"),
        };
        CriterionDescriptor {
            criterion: self,
            group,
            field_name,
            indicator,
        }
    }

    pub fn group(self) -> Group {
        self.descriptor().group
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor().field_name)
    }
}

/// Ordered criterion lists for one study. Weight vectors are matched against
/// these lists position by position.
#[derive(Debug, Clone)]
pub struct CriterionRegistry {
    circulation: Vec<CriterionDescriptor>,
    accessibility: Vec<CriterionDescriptor>,
}

impl CriterionRegistry {
    pub fn for_vehicle(vehicle: VehicleType) -> Self {
        let lane_criterion = match vehicle {
            VehicleType::CargoBike => Criterion::BikeLane,
            VehicleType::Motorized => Criterion::Lanes,
        };
        let circulation = [
            lane_criterion,
            Criterion::Transit,
            Criterion::Intersection,
            Criterion::Obstacles,
            Criterion::Speed,
            Criterion::Congestion,
            Criterion::Construction,
        ];
        let accessibility = [
            Criterion::Gauge,
            Criterion::TimeWindow,
            Criterion::Parking,
            Criterion::Slope,
        ];
        Self {
            circulation: circulation.iter().map(|c| c.descriptor()).collect(),
            accessibility: accessibility.iter().map(|c| c.descriptor()).collect(),
        }
    }

    pub fn group(&self, group: Group) -> &[CriterionDescriptor] {
        match group {
            Group::Circulation => &self.circulation,
            Group::Accessibility => &self.accessibility,
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &CriterionDescriptor> {
        self.circulation.iter().chain(self.accessibility.iter())
    }

    pub fn criterion_count(&self, group: Group) -> usize {
        self.group(group).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_orders_groups_like_the_weight_vectors() {
        let registry = CriterionRegistry::for_vehicle(VehicleType::Motorized);
        let circ: Vec<_> = registry
            .group(Group::Circulation)
            .iter()
            .map(|d| d.indicator)
            .collect();
        assert_eq!(
            circ,
            ["NbVoie", "ArretTP", "Carrefour", "Obstacle", "Vitesse", "Congestion", "Chantier"]
        );
        let acc: Vec<_> = registry
            .group(Group::Accessibility)
            .iter()
            .map(|d| d.indicator)
            .collect();
        assert_eq!(acc, ["Gabarit", "Horaire", "Stationnement", "Pente"]);
        assert!(registry.all().all(|d| d.criterion.group() == d.group));
    }

    #[test]
    fn cargo_bike_swaps_lane_criterion_but_keeps_field() {
        let registry = CriterionRegistry::for_vehicle(VehicleType::CargoBike);
        let first = registry.group(Group::Circulation)[0];
        assert_eq!(first.criterion, Criterion::BikeLane);
        assert_eq!(first.field_name, "Note_NbVoie");
    }

    #[test]
    fn threshold_equality_maps_to_documented_branch() {
        let pair = ThresholdPair::new(50.0, 30.0);
        assert_eq!(pair.grade_ascending(50.0), Grade::GOOD);
        assert_eq!(pair.grade_ascending(30.0), Grade::POOR);

        let pair = ThresholdPair::new(2.0, 5.0);
        assert_eq!(pair.grade_descending(2.0), Grade::GOOD);
        assert_eq!(pair.grade_descending(5.0), Grade::POOR);
    }

    #[test]
    fn nan_falls_through_to_undetermined() {
        let pair = ThresholdPair::new(50.0, 30.0);
        assert_eq!(pair.grade_ascending(f64::NAN), Grade::UNDETERMINED);
        assert_eq!(pair.grade_descending(f64::NAN), Grade::UNDETERMINED);
    }
}
