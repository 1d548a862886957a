use chrono::NaiveDate;
use log::{debug, warn};
use serde::Deserialize;
use std::borrow::Cow;

use crate::criteria::construction::Criticality;
use crate::criteria::gauge::GaugeThresholds;
use crate::criteria::{CriterionRegistry, Group, ThresholdPair};
use crate::error::{Result, ScoringError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VehicleType {
    /// Cargo bike ("VC"): graded on bike lanes instead of lane count.
    CargoBike,
    #[default]
    Motorized,
}

impl VehicleType {
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("VC") {
            VehicleType::CargoBike
        } else {
            VehicleType::Motorized
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    #[default]
    Point,
    Comma,
}

/// Study parameters as they come out of the study file, before any parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStudyConfig {
    pub study_name: String,
    #[serde(default)]
    pub vehicle_type: String,
    #[serde(default)]
    pub decimal_separator: DecimalSeparator,
    pub thresholds: RawThresholds,
    pub circulation_weights: String,
    pub accessibility_weights: String,
    pub hierarchy_ratios: String,
    #[serde(default)]
    pub poi_layers: String,
    #[serde(default)]
    pub parking_default_spots: f64,
    #[serde(default)]
    pub analysis_hours: Option<String>,
    #[serde(default)]
    pub incident_types: Option<String>,
    #[serde(default)]
    pub incident_criticality: Option<String>,
    /// `YYYY-MM-DD`. Left out, incidents are not filtered by date at all.
    #[serde(default)]
    pub incidents_active_on: Option<NaiveDate>,
    #[serde(default = "default_fail_on_undetermined")]
    pub fail_on_undetermined: bool,
}

fn default_fail_on_undetermined() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawThresholds {
    #[serde(default)]
    pub lanes: Option<String>,
    pub speed: String,
    pub slope: String,
    pub gauge: String,
    pub obstacles: String,
    pub time_window: String,
    pub parking: String,
    pub congestion: String,
    pub construction: String,
    pub transit: String,
}

#[derive(Debug, Clone)]
pub struct Thresholds {
    /// Only required for motorised vehicles.
    pub lanes: Option<ThresholdPair>,
    pub speed: ThresholdPair,
    pub slope: ThresholdPair,
    pub gauge: GaugeThresholds,
    pub obstacles: ThresholdPair,
    pub time_window: ThresholdPair,
    pub parking: ThresholdPair,
    pub congestion: ThresholdPair,
    pub construction: ThresholdPair,
    pub transit: ThresholdPair,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    pub fn new(group: Group, values: Vec<f64>) -> Result<Self> {
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(ScoringError::MalformedValue {
                field: format!("{} weights", group),
                reason: format!("weight {} is not a non-negative number", bad),
            });
        }
        if values.iter().sum::<f64>() <= 0.0 {
            return Err(ScoringError::ZeroWeights(group));
        }
        Ok(Self(values))
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Weight share of criterion `i` (`w_i / Σw`).
    pub fn share(&self, i: usize) -> f64 {
        self.0.get(i).copied().unwrap_or(0.0) / self.sum()
    }
}

/// Demand ratio per functional class 1..=5.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchyRatios([f64; 5]);

impl HierarchyRatios {
    pub fn new(ratios: [f64; 5]) -> Result<Self> {
        if let Some(bad) = ratios.iter().find(|r| !r.is_finite() || **r < 0.0) {
            return Err(ScoringError::MalformedValue {
                field: "hierarchy ratios".to_string(),
                reason: format!("ratio {} is not a non-negative number", bad),
            });
        }
        Ok(Self(ratios))
    }

    pub fn ratio_for(&self, func_class: u8) -> Option<f64> {
        match func_class {
            1..=5 => self.0.get(usize::from(func_class) - 1).copied(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoiLayer {
    pub name: String,
    pub ratio: f64,
}

#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    pub kinds: Option<Vec<String>>,
    pub criticalities: Option<Vec<Criticality>>,
    /// Keep incidents running on this date. `None` applies no date filter,
    /// so past and future works all count.
    pub active_on: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct StudyConfig {
    pub study_name: String,
    pub vehicle_type: VehicleType,
    pub thresholds: Thresholds,
    pub circulation_weights: WeightVector,
    pub accessibility_weights: WeightVector,
    pub hierarchy: HierarchyRatios,
    pub poi_layers: Vec<PoiLayer>,
    pub parking_default_spots: f64,
    pub analysis_hours: Option<Vec<u32>>,
    pub incident_filter: IncidentFilter,
    pub fail_on_undetermined: bool,
}

impl StudyConfig {
    pub fn weights(&self, group: Group) -> &WeightVector {
        match group {
            Group::Circulation => &self.circulation_weights,
            Group::Accessibility => &self.accessibility_weights,
        }
    }
}

impl TryFrom<RawStudyConfig> for StudyConfig {
    type Error = ScoringError;

    fn try_from(raw: RawStudyConfig) -> Result<Self> {
        let sep = raw.decimal_separator;
        let vehicle_type = VehicleType::from_code(&raw.vehicle_type);
        let registry = CriterionRegistry::for_vehicle(vehicle_type);

        let thresholds = parse_thresholds(&raw.thresholds, vehicle_type, sep)?;

        let circulation_weights = WeightVector::new(
            Group::Circulation,
            parse_values("circulation weights", &raw.circulation_weights, sep)?,
        )?;
        let accessibility_weights = WeightVector::new(
            Group::Accessibility,
            parse_values("accessibility weights", &raw.accessibility_weights, sep)?,
        )?;
        for (group, weights) in [
            (Group::Circulation, &circulation_weights),
            (Group::Accessibility, &accessibility_weights),
        ] {
            let expected = registry.criterion_count(group);
            if weights.values().len() != expected {
                return Err(ScoringError::LengthMismatch {
                    field: format!("{} weights", group),
                    expected,
                    actual: weights.values().len(),
                });
            }
        }

        let ratios = parse_values("hierarchy ratios", &raw.hierarchy_ratios, sep)?;
        let ratios: [f64; 5] =
            ratios
                .try_into()
                .map_err(|v: Vec<f64>| ScoringError::LengthMismatch {
                    field: "hierarchy ratios".to_string(),
                    expected: 5,
                    actual: v.len(),
                })?;

        if !raw.parking_default_spots.is_finite() {
            return Err(ScoringError::MalformedValue {
                field: "parking default spots".to_string(),
                reason: "not a finite number".to_string(),
            });
        }

        let config = StudyConfig {
            study_name: raw.study_name,
            vehicle_type,
            thresholds,
            circulation_weights,
            accessibility_weights,
            hierarchy: HierarchyRatios::new(ratios)?,
            poi_layers: parse_poi_layers(&raw.poi_layers, sep)?,
            parking_default_spots: raw.parking_default_spots,
            analysis_hours: parse_hours(raw.analysis_hours.as_deref())?,
            incident_filter: IncidentFilter {
                kinds: parse_list(raw.incident_types.as_deref()),
                criticalities: parse_criticalities(raw.incident_criticality.as_deref())?,
                active_on: raw.incidents_active_on,
            },
            fail_on_undetermined: raw.fail_on_undetermined,
        };
        debug!("Parsed study configuration {:?}", config);
        Ok(config)
    }
}

/// Splits a whitespace-separated list of numbers.
pub fn parse_values(field: &str, raw: &str, separator: DecimalSeparator) -> Result<Vec<f64>> {
    raw.split_whitespace()
        .map(|token| {
            parse_number(token, separator).ok_or_else(|| ScoringError::MalformedValue {
                field: field.to_string(),
                reason: format!("'{}' is not a number", token),
            })
        })
        .collect()
}

/// Threshold tables may carry several rows separated by `;`; only the first
/// one is read.
pub fn parse_threshold_row(
    field: &str,
    raw: &str,
    separator: DecimalSeparator,
) -> Result<Vec<f64>> {
    let first_row = raw.split(';').next().unwrap_or_default();
    parse_values(field, first_row, separator)
}

fn parse_number(token: &str, separator: DecimalSeparator) -> Option<f64> {
    let normalized = match separator {
        DecimalSeparator::Point => Cow::Borrowed(token),
        DecimalSeparator::Comma => Cow::Owned(token.replace(',', ".")),
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Clone, Copy)]
enum Favours {
    High,
    Low,
}

fn parse_pair(
    field: &str,
    raw: &str,
    separator: DecimalSeparator,
    favours: Favours,
) -> Result<ThresholdPair> {
    let values = parse_threshold_row(field, raw, separator)?;
    let [good, bad] = values[..] else {
        return Err(ScoringError::LengthMismatch {
            field: format!("{} thresholds", field),
            expected: 2,
            actual: values.len(),
        });
    };
    let pair = ThresholdPair::new(good, bad);
    check_order(field, &pair, favours);
    Ok(pair)
}

fn check_order(field: &str, pair: &ThresholdPair, favours: Favours) {
    let ordered = match favours {
        Favours::High => pair.good > pair.bad,
        Favours::Low => pair.good < pair.bad,
    };
    if !ordered {
        warn!(
            "{} thresholds {} / {} leave no room for grade 2",
            field, pair.good, pair.bad
        );
    }
}

fn parse_thresholds(
    raw: &RawThresholds,
    vehicle: VehicleType,
    sep: DecimalSeparator,
) -> Result<Thresholds> {
    let lanes = match (&raw.lanes, vehicle) {
        (Some(lanes), _) => Some(parse_pair("lanes", lanes, sep, Favours::High)?),
        (None, VehicleType::CargoBike) => None,
        (None, VehicleType::Motorized) => {
            return Err(ScoringError::InvalidConfiguration(
                "lane thresholds are required for motorised vehicles".to_string(),
            ));
        }
    };

    let gauge_values = parse_threshold_row("gauge", &raw.gauge, sep)?;
    let gauge = GaugeThresholds::from_values(&gauge_values).ok_or_else(|| {
        ScoringError::LengthMismatch {
            field: "gauge thresholds".to_string(),
            expected: GaugeThresholds::VALUE_COUNT,
            actual: gauge_values.len(),
        }
    })?;
    for (dimension, pair) in gauge.pairs() {
        check_order(dimension.label(), pair, Favours::High);
    }

    Ok(Thresholds {
        lanes,
        speed: parse_pair("speed", &raw.speed, sep, Favours::High)?,
        slope: parse_pair("slope", &raw.slope, sep, Favours::Low)?,
        gauge,
        obstacles: parse_pair("obstacles", &raw.obstacles, sep, Favours::Low)?,
        time_window: parse_pair("time window", &raw.time_window, sep, Favours::High)?,
        parking: parse_pair("parking", &raw.parking, sep, Favours::High)?,
        congestion: parse_pair("congestion", &raw.congestion, sep, Favours::High)?,
        construction: parse_pair("construction", &raw.construction, sep, Favours::Low)?,
        transit: parse_pair("transit", &raw.transit, sep, Favours::Low)?,
    })
}

/// `"name ratio;name ratio"`; the ratio is the last token, names may contain
/// spaces.
pub fn parse_poi_layers(raw: &str, separator: DecimalSeparator) -> Result<Vec<PoiLayer>> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let malformed = || ScoringError::MalformedValue {
                field: "poi layers".to_string(),
                reason: format!("'{}' is not 'name ratio'", entry),
            };
            let (name, ratio) = entry.rsplit_once(char::is_whitespace).ok_or_else(malformed)?;
            let ratio = parse_number(ratio, separator)
                .filter(|r| *r >= 0.0)
                .ok_or_else(malformed)?;
            Ok(PoiLayer {
                name: name.trim().to_string(),
                ratio,
            })
        })
        .collect()
}

fn is_unset(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw == "#"
}

fn parse_list(raw: Option<&str>) -> Option<Vec<String>> {
    let raw = raw.filter(|r| !is_unset(r))?;
    Some(
        raw.split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn parse_hours(raw: Option<&str>) -> Result<Option<Vec<u32>>> {
    let Some(items) = parse_list(raw) else {
        return Ok(None);
    };
    items
        .iter()
        .map(|item| match item.parse::<u32>() {
            Ok(hour) if hour < 24 => Ok(hour),
            _ => Err(ScoringError::MalformedValue {
                field: "analysis hours".to_string(),
                reason: format!("'{}' is not an hour of the day", item),
            }),
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn parse_criticalities(raw: Option<&str>) -> Result<Option<Vec<Criticality>>> {
    let Some(items) = parse_list(raw) else {
        return Ok(None);
    };
    items
        .iter()
        .map(|item| match Criticality::from_label(item) {
            Criticality::Unknown => Err(ScoringError::MalformedValue {
                field: "incident criticality".to_string(),
                reason: format!("unknown level '{}'", item),
            }),
            level => Ok(level),
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn raw_config() -> RawStudyConfig {
        RawStudyConfig {
            study_name: "Centre-ville".to_string(),
            vehicle_type: "PL".to_string(),
            decimal_separator: DecimalSeparator::Point,
            thresholds: RawThresholds {
                lanes: Some("2 1".to_string()),
                speed: "50 30".to_string(),
                slope: "4 8".to_string(),
                gauge: "4 3.5 40 18 11 8 18 12 3 2.5".to_string(),
                obstacles: "1 3".to_string(),
                time_window: "20 10".to_string(),
                parking: "10 2".to_string(),
                congestion: "0.7 0.4".to_string(),
                construction: "7 30".to_string(),
                transit: "4 12".to_string(),
            },
            circulation_weights: "1 1 1 1 1 1 1".to_string(),
            accessibility_weights: "1 1 1 1".to_string(),
            hierarchy_ratios: "5 4 3 2 1".to_string(),
            poi_layers: "Commerces 1;Restaurants 0.5".to_string(),
            parking_default_spots: 0.0,
            analysis_hours: None,
            incident_types: None,
            incident_criticality: None,
            incidents_active_on: None,
            fail_on_undetermined: true,
        }
    }

    #[test]
    fn parses_a_complete_study() {
        let config = StudyConfig::try_from(raw_config()).unwrap();
        assert_eq!(config.vehicle_type, VehicleType::Motorized);
        assert_eq!(config.thresholds.speed, ThresholdPair::new(50.0, 30.0));
        assert_eq!(config.circulation_weights.values().len(), 7);
        assert_eq!(config.hierarchy.ratio_for(1), Some(5.0));
        assert_eq!(config.hierarchy.ratio_for(6), None);
        assert_eq!(config.poi_layers.len(), 2);
        assert_eq!(config.poi_layers[1].ratio, 0.5);
    }

    #[test]
    fn only_first_threshold_row_is_read() {
        let values = parse_threshold_row("speed", "50 30;0 0 0", DecimalSeparator::Point).unwrap();
        assert_eq!(values, vec![50.0, 30.0]);
    }

    #[test]
    fn decimal_comma_is_an_explicit_option() {
        assert!(parse_values("congestion", "0,7 0,4", DecimalSeparator::Point).is_err());
        let values = parse_values("congestion", "0,7 0,4", DecimalSeparator::Comma).unwrap();
        assert_eq!(values, vec![0.7, 0.4]);
    }

    #[test]
    fn weight_vector_length_must_match_group() {
        let mut raw = raw_config();
        raw.accessibility_weights = "1 1 1".to_string();
        match StudyConfig::try_from(raw) {
            Err(ScoringError::LengthMismatch {
                expected, actual, ..
            }) => {
                assert_eq!((expected, actual), (4, 3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn zero_sum_weights_are_rejected() {
        let mut raw = raw_config();
        raw.circulation_weights = "0 0 0 0 0 0 0".to_string();
        assert!(matches!(
            StudyConfig::try_from(raw),
            Err(ScoringError::ZeroWeights(Group::Circulation))
        ));
    }

    #[test]
    fn negative_hierarchy_ratio_is_rejected() {
        let mut raw = raw_config();
        raw.hierarchy_ratios = "5 4 -3 2 1".to_string();
        match StudyConfig::try_from(raw) {
            Err(ScoringError::MalformedValue { field, .. }) => {
                assert_eq!(field, "hierarchy ratios")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(HierarchyRatios::new([1.0, f64::INFINITY, 1.0, 1.0, 1.0]).is_err());
        assert!(HierarchyRatios::new([0.0; 5]).is_ok());
    }

    #[test]
    fn malformed_threshold_strings_fail_fast() {
        let mut raw = raw_config();
        raw.thresholds.speed = "fifty 30".to_string();
        assert!(matches!(
            StudyConfig::try_from(raw),
            Err(ScoringError::MalformedValue { .. })
        ));

        let mut raw = raw_config();
        raw.thresholds.gauge = "4 3.5".to_string();
        assert!(matches!(
            StudyConfig::try_from(raw),
            Err(ScoringError::LengthMismatch { expected: 10, .. })
        ));
    }

    #[test]
    fn cargo_bike_does_not_need_lane_thresholds() {
        let mut raw = raw_config();
        raw.vehicle_type = "VC".to_string();
        raw.thresholds.lanes = None;
        let config = StudyConfig::try_from(raw).unwrap();
        assert_eq!(config.vehicle_type, VehicleType::CargoBike);
        assert!(config.thresholds.lanes.is_none());

        let mut raw = raw_config();
        raw.thresholds.lanes = None;
        assert!(matches!(
            StudyConfig::try_from(raw),
            Err(ScoringError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn poi_layer_names_keep_inner_spaces() {
        let layers = parse_poi_layers("Grandes surfaces 2;Kiosques 0.5", DecimalSeparator::Point)
            .unwrap();
        assert_eq!(layers[0].name, "Grandes surfaces");
        assert_eq!(layers[0].ratio, 2.0);
        assert!(parse_poi_layers("NoRatio", DecimalSeparator::Point).is_err());
        assert!(parse_poi_layers("", DecimalSeparator::Point).unwrap().is_empty());
    }

    #[test]
    fn filters_treat_hash_as_unset() {
        let mut raw = raw_config();
        raw.incident_types = Some("#".to_string());
        raw.incident_criticality = Some("critical;major".to_string());
        raw.analysis_hours = Some("7;8;17".to_string());
        let config = StudyConfig::try_from(raw).unwrap();
        assert!(config.incident_filter.kinds.is_none());
        assert_eq!(
            config.incident_filter.criticalities,
            Some(vec![Criticality::Critical, Criticality::Major])
        );
        assert_eq!(config.analysis_hours, Some(vec![7, 8, 17]));

        let mut raw = raw_config();
        raw.analysis_hours = Some("7;25".to_string());
        assert!(StudyConfig::try_from(raw).is_err());
    }
}
