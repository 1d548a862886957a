//! Runs a complete scoring study: validates the segment table, materializes
//! every per-link lookup, grades each segment on every criterion and builds
//! the summary table.

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::aggregate::{PoiCount, poi_counts_by_link, poi_weight, score_group};
use crate::conditions::{Condition, ConditionIndex, Modifier, join_modifiers};
use crate::config::StudyConfig;
use crate::criteria::congestion::grade_congestion;
use crate::criteria::construction::{ConstructionImpact, Incident, impacts_by_link};
use crate::criteria::gauge::{GaugeLimits, grade_gauge};
use crate::criteria::intersection::resolve_intersection;
use crate::criteria::lanes::{LaneRecord, bike_lane_links, grade_bike_lane, grade_lanes};
use crate::criteria::obstacles::{count_obstacles, grade_obstacles};
use crate::criteria::parking::{ParkingCount, available_spots, grade_parking, spots_by_link};
use crate::criteria::slope::{SlopeRecord, grade_slope, slopes_by_link};
use crate::criteria::speed::grade_speed;
use crate::criteria::time_window::{
    DateTimeModifier, daily_access_by_link, grade_access_hours, join_access,
};
use crate::criteria::transit::{StopFrequency, grade_transit, runs_by_link};
use crate::criteria::{Criterion, CriterionRegistry, Grade, Group};
use crate::error::{Result, ScoringError};
use crate::segment::{RawMeasures, ScoredSegment, Segment};
use crate::speed_probe::{CongestionIndex, Direction, ProbeRecord};
use crate::summary::{SummaryRow, build_summary};

/// Every table a study reads. Optional datasets are simply left empty.
#[derive(Debug, Clone, Default)]
pub struct StudyInputs {
    pub segments: Vec<Segment>,
    pub conditions: Vec<Condition>,
    pub modifiers: Vec<Modifier>,
    pub date_time_modifiers: Vec<DateTimeModifier>,
    pub lanes: Vec<LaneRecord>,
    pub slopes: Vec<SlopeRecord>,
    pub probes: Vec<ProbeRecord>,
    pub incidents: Vec<Incident>,
    pub poi_counts: Vec<PoiCount>,
    pub parking_counts: Vec<ParkingCount>,
    pub transit_stops: Vec<StopFrequency>,
}

/// Read-only per-link lookups, complete before the first segment is scored.
struct Lookups {
    conditions: ConditionIndex,
    bike_lanes: HashSet<u64>,
    slopes: HashMap<u64, f64>,
    congestion: CongestionIndex,
    construction: HashMap<u64, ConstructionImpact>,
    daily_access: HashMap<u64, f64>,
    parking: HashMap<u64, f64>,
    transit: HashMap<u64, f64>,
    poi: HashMap<u64, HashMap<String, f64>>,
}

impl Lookups {
    fn build(inputs: &StudyInputs, config: &StudyConfig) -> Self {
        let network: HashSet<u64> = inputs.segments.iter().map(|s| s.link_id).collect();
        let restrictions = join_access(&inputs.date_time_modifiers, &inputs.conditions);
        let lookups = Self {
            conditions: ConditionIndex::new(join_modifiers(&inputs.conditions, &inputs.modifiers)),
            bike_lanes: bike_lane_links(&inputs.lanes),
            slopes: slopes_by_link(&inputs.slopes),
            congestion: CongestionIndex::build(
                &inputs.probes,
                config.analysis_hours.as_deref(),
                &network,
            ),
            construction: impacts_by_link(
                &inputs.incidents,
                &config.incident_filter,
                config.thresholds.construction,
            ),
            daily_access: daily_access_by_link(&restrictions),
            parking: spots_by_link(&inputs.parking_counts),
            transit: runs_by_link(&inputs.transit_stops),
            poi: poi_counts_by_link(&inputs.poi_counts),
        };
        debug!(
            "Lookups ready: {} links with conditions, {} observation slots, {} with time windows, {} with works, {} with stops",
            lookups.conditions.link_count(),
            lookups.congestion.slots(),
            lookups.daily_access.len(),
            lookups.construction.len(),
            lookups.transit.len()
        );
        lookups
    }

    fn measures(&self, segment: &Segment, config: &StudyConfig) -> RawMeasures {
        let id = segment.link_id;
        let records = self.conditions.for_link(id);
        RawMeasures {
            has_bike_lane: self.bike_lanes.contains(&id),
            transit_runs: self.transit.get(&id).copied(),
            intersection: resolve_intersection(records, segment.roundabout),
            obstacle_count: count_obstacles(records),
            rsi_to: self.congestion.rsi(id, Direction::To),
            rsi_from: self.congestion.rsi(id, Direction::From),
            construction: self
                .construction
                .get(&id)
                .cloned()
                .unwrap_or_else(ConstructionImpact::none),
            gauge: GaugeLimits::from_records(records),
            daily_access_hours: self.daily_access.get(&id).copied(),
            parking_spots: available_spots(
                self.parking.get(&id).copied().unwrap_or(0.0),
                config.parking_default_spots,
            ),
            slope_percent: self.slopes.get(&id).copied(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StudyOutput {
    pub segments: Vec<ScoredSegment>,
    pub summary: Vec<SummaryRow>,
}

impl StudyOutput {
    /// Index of the roll-up row of `group`.
    pub fn group_index(&self, group: Group) -> Option<f64> {
        self.summary
            .iter()
            .find(|row| row.indicator == group.summary_label())
            .map(|row| row.index)
    }
}

pub struct Study {
    config: StudyConfig,
    registry: CriterionRegistry,
    parallel: bool,
    progress: bool,
}

impl Study {
    pub fn new(config: StudyConfig) -> Self {
        let registry = CriterionRegistry::for_vehicle(config.vehicle_type);
        Self {
            config,
            registry,
            parallel: false,
            progress: false,
        }
    }

    /// Scores segments on the rayon pool. Output order is unchanged.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn registry(&self) -> &CriterionRegistry {
        &self.registry
    }

    pub fn run(&self, inputs: &StudyInputs) -> Result<StudyOutput> {
        info!(
            "Study '{}': scoring {} segments",
            self.config.study_name,
            inputs.segments.len()
        );
        for segment in &inputs.segments {
            segment.validate()?;
        }
        for descriptor in self.registry.all() {
            info!(
                "Computing {} ({}) with thresholds {}",
                descriptor.field_name,
                descriptor.group,
                self.describe_thresholds(descriptor.criterion)
            );
        }

        let lookups = Lookups::build(inputs, &self.config);

        let pb = if self.progress {
            let pb = ProgressBar::new(inputs.segments.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##-"),
            );
            pb.set_message("Scoring segments");
            pb
        } else {
            ProgressBar::hidden()
        };

        let score = |segment: &Segment| {
            let scored = self.score_segment(segment, &lookups);
            pb.inc(1);
            scored
        };
        let segments: Vec<ScoredSegment> = if self.parallel {
            inputs.segments.par_iter().map(score).collect()
        } else {
            inputs.segments.iter().map(score).collect()
        };
        pb.finish_with_message("Segments scored");

        self.check_undetermined(&segments)?;

        let summary = build_summary(&segments, &self.registry, &self.config);
        for group in [Group::Circulation, Group::Accessibility] {
            if let Some(row) = summary.iter().find(|r| r.indicator == group.summary_label()) {
                info!("{} index: {:.4} ({})", row.indicator, row.index, row.index100);
            }
        }
        Ok(StudyOutput { segments, summary })
    }

    fn describe_thresholds(&self, criterion: Criterion) -> String {
        let t = &self.config.thresholds;
        let pair = match criterion {
            Criterion::Lanes => t.lanes,
            Criterion::BikeLane | Criterion::Intersection => None,
            Criterion::Transit => Some(t.transit),
            Criterion::Obstacles => Some(t.obstacles),
            Criterion::Speed => Some(t.speed),
            Criterion::Congestion => Some(t.congestion),
            Criterion::Construction => Some(t.construction),
            Criterion::TimeWindow => Some(t.time_window),
            Criterion::Parking => Some(t.parking),
            Criterion::Slope => Some(t.slope),
            Criterion::Gauge => {
                return t
                    .gauge
                    .pairs()
                    .map(|(dimension, pair)| {
                        format!("{} {}/{}", dimension.field_name(), pair.good, pair.bad)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
            }
        };
        match pair {
            Some(pair) => format!("{}/{}", pair.good, pair.bad),
            None => "(none)".to_string(),
        }
    }

    /// A link missing from an optional dataset is unconstrained on that
    /// criterion and grades 3 whatever the thresholds.
    fn grade(&self, criterion: Criterion, segment: &Segment, measures: &RawMeasures) -> Grade {
        let t = &self.config.thresholds;
        match criterion {
            Criterion::Lanes => t
                .lanes
                .map_or(Grade::UNDETERMINED, |pair| grade_lanes(&segment.lanes, pair)),
            Criterion::BikeLane => {
                grade_bike_lane(segment.lanes.lane_category, measures.has_bike_lane)
            }
            Criterion::Transit => measures
                .transit_runs
                .map_or(Grade::GOOD, |runs| grade_transit(runs, t.transit)),
            Criterion::Intersection => measures.intersection.grade(),
            Criterion::Obstacles => match measures.obstacle_count {
                0 => Grade::GOOD,
                count => grade_obstacles(count, t.obstacles),
            },
            Criterion::Speed => {
                grade_speed(segment.to_speed_limit, segment.from_speed_limit, t.speed)
            }
            Criterion::Congestion => {
                grade_congestion(measures.rsi_to, measures.rsi_from, t.congestion)
            }
            Criterion::Construction => measures.construction.grade,
            Criterion::Gauge if measures.gauge.is_unrestricted() => Grade::GOOD,
            Criterion::Gauge => grade_gauge(&measures.gauge, &t.gauge),
            Criterion::TimeWindow => measures
                .daily_access_hours
                .map_or(Grade::GOOD, |hours| grade_access_hours(hours, t.time_window)),
            Criterion::Parking => grade_parking(measures.parking_spots, t.parking),
            Criterion::Slope => measures
                .slope_percent
                .map_or(Grade::GOOD, |pct| grade_slope(pct, t.slope)),
        }
    }

    fn score_segment(&self, segment: &Segment, lookups: &Lookups) -> ScoredSegment {
        let measures = lookups.measures(segment, &self.config);
        let grades: BTreeMap<Criterion, Grade> = self
            .registry
            .all()
            .map(|d| (d.criterion, self.grade(d.criterion, segment, &measures)))
            .collect();

        let mut scored = ScoredSegment {
            segment: segment.clone(),
            measures,
            grades,
            circulation: Default::default(),
            accessibility: Default::default(),
            hierarchy_ratio: self
                .config
                .hierarchy
                .ratio_for(segment.func_class)
                .unwrap_or(0.0),
            poi_weight: poi_weight(&self.config.poi_layers, lookups.poi.get(&segment.link_id)),
        };
        for group in [Group::Circulation, Group::Accessibility] {
            let score = score_group(
                group,
                &scored.group_grades(&self.registry, group),
                self.config.weights(group),
            );
            match group {
                Group::Circulation => scored.circulation = score,
                Group::Accessibility => scored.accessibility = score,
            }
        }
        scored
    }

    /// Grade 0 means the thresholds left a gap; every occurrence is logged and
    /// the first offending criterion fails the run unless disabled.
    fn check_undetermined(&self, segments: &[ScoredSegment]) -> Result<()> {
        let mut first_failure = None;
        for descriptor in self.registry.all() {
            let undetermined: Vec<u64> = segments
                .iter()
                .filter(|s| !s.grade(descriptor.criterion).is_determined())
                .map(|s| s.segment.link_id)
                .collect();
            for link_id in &undetermined {
                error!(
                    "{} is undetermined on LINK_ID {}",
                    descriptor.field_name, link_id
                );
            }
            if let (None, Some(first)) = (&first_failure, undetermined.first()) {
                first_failure = Some(ScoringError::UndeterminedGrade {
                    criterion: descriptor.criterion,
                    count: undetermined.len(),
                    first_link_id: *first,
                });
            }
        }
        match first_failure {
            Some(err) if self.config.fail_on_undetermined => Err(err),
            _ => Ok(()),
        }
    }
}
