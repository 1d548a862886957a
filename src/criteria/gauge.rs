use log::warn;

use super::{Grade, ThresholdPair};
use crate::conditions::{COND_TRANSPORT_ACCESS, ConditionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GaugeDimension {
    Height,
    Weight,
    AxleWeight,
    Length,
    Width,
}

impl GaugeDimension {
    pub const ALL: [GaugeDimension; 5] = [
        GaugeDimension::Height,
        GaugeDimension::Weight,
        GaugeDimension::AxleWeight,
        GaugeDimension::Length,
        GaugeDimension::Width,
    ];

    /// Transport access restriction modifier types 41..=45.
    pub fn from_modifier_type(mod_type: u32) -> Option<Self> {
        match mod_type {
            41 => Some(GaugeDimension::Height),
            42 => Some(GaugeDimension::Weight),
            43 => Some(GaugeDimension::AxleWeight),
            44 => Some(GaugeDimension::Length),
            45 => Some(GaugeDimension::Width),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            GaugeDimension::Height => 0,
            GaugeDimension::Weight => 1,
            GaugeDimension::AxleWeight => 2,
            GaugeDimension::Length => 3,
            GaugeDimension::Width => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GaugeDimension::Height => "height limit",
            GaugeDimension::Weight => "weight limit",
            GaugeDimension::AxleWeight => "axle weight limit",
            GaugeDimension::Length => "length limit",
            GaugeDimension::Width => "width limit",
        }
    }

    /// Raw value column in the scored segment table.
    pub fn field_name(self) -> &'static str {
        match self {
            GaugeDimension::Height => "LIM_HAUT",
            GaugeDimension::Weight => "LIM_POIDS",
            GaugeDimension::AxleWeight => "LIM_ESSIEU",
            GaugeDimension::Length => "LIM_LONG",
            GaugeDimension::Width => "LIM_LARG",
        }
    }
}

/// One threshold pair per dimension, read from ten values in
/// height, weight, axle weight, length, width order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeThresholds([ThresholdPair; 5]);

impl GaugeThresholds {
    pub const VALUE_COUNT: usize = 10;

    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.len() != Self::VALUE_COUNT {
            return None;
        }
        let mut pairs = [ThresholdPair::new(0.0, 0.0); 5];
        for (pair, chunk) in pairs.iter_mut().zip(values.chunks_exact(2)) {
            *pair = ThresholdPair::new(chunk[0], chunk[1]);
        }
        Some(Self(pairs))
    }

    pub fn pair(&self, dimension: GaugeDimension) -> ThresholdPair {
        self.0[dimension.index()]
    }

    pub fn pairs(&self) -> impl Iterator<Item = (GaugeDimension, &ThresholdPair)> {
        GaugeDimension::ALL.into_iter().zip(self.0.iter())
    }
}

/// The posted size/weight limits of a link; `None` means unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GaugeLimits([Option<f64>; 5]);

impl GaugeLimits {
    /// Collects the transport access restrictions of one link. When a
    /// dimension is restricted more than once the lowest limit is kept.
    pub fn from_records(records: &[ConditionRecord]) -> Self {
        let mut limits = Self::default();
        for record in records.iter().filter(|r| r.cond_type == COND_TRANSPORT_ACCESS) {
            let Some(dimension) = record.mod_type.and_then(GaugeDimension::from_modifier_type)
            else {
                continue;
            };
            let Some(value) = record.mod_value() else {
                warn!(
                    "Ignoring unreadable {} '{}' on link {}",
                    dimension.label(),
                    record.mod_val.as_deref().unwrap_or_default(),
                    record.link_id
                );
                continue;
            };
            let slot = &mut limits.0[dimension.index()];
            *slot = Some(slot.map_or(value, |current| current.min(value)));
        }
        limits
    }

    pub fn get(&self, dimension: GaugeDimension) -> Option<f64> {
        self.0[dimension.index()]
    }

    pub fn is_unrestricted(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

/// Each dimension is graded on its own (`>= good` 3, `> bad` 2, `<= bad` 1,
/// unrestricted 3); the link takes the worst of the five.
pub fn grade_gauge(limits: &GaugeLimits, thresholds: &GaugeThresholds) -> Grade {
    GaugeDimension::ALL
        .into_iter()
        .map(|dimension| match limits.get(dimension) {
            Some(value) => thresholds.pair(dimension).grade_ascending(value),
            None => Grade::GOOD,
        })
        .min()
        .unwrap_or(Grade::GOOD)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> GaugeThresholds {
        GaugeThresholds::from_values(&[4.0, 3.5, 40.0, 18.0, 11.0, 8.0, 18.0, 12.0, 3.0, 2.5])
            .unwrap()
    }

    fn restriction(mod_type: u32, value: &str) -> ConditionRecord {
        ConditionRecord {
            link_id: 1,
            cond_id: u64::from(mod_type),
            cond_type: COND_TRANSPORT_ACCESS,
            mod_type: Some(mod_type),
            mod_val: Some(value.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn unrestricted_link_is_good() {
        let limits = GaugeLimits::from_records(&[]);
        assert!(limits.is_unrestricted());
        assert_eq!(grade_gauge(&limits, &thresholds()), Grade::GOOD);
    }

    #[test]
    fn worst_dimension_decides() {
        let limits = GaugeLimits::from_records(&[
            restriction(41, "3.8"), // height: fair
            restriction(45, "2.3"), // width: poor
        ]);
        assert_eq!(limits.get(GaugeDimension::Height), Some(3.8));
        assert_eq!(grade_gauge(&limits, &thresholds()), Grade::POOR);
    }

    #[test]
    fn repeated_dimension_keeps_lowest_limit() {
        let limits = GaugeLimits::from_records(&[restriction(42, "40"), restriction(42, "16")]);
        assert_eq!(limits.get(GaugeDimension::Weight), Some(16.0));
        assert_eq!(grade_gauge(&limits, &thresholds()), Grade::POOR);
    }

    #[test]
    fn other_condition_types_are_ignored() {
        let mut sign = restriction(41, "2.0");
        sign.cond_type = 17;
        let limits = GaugeLimits::from_records(&[sign, restriction(43, "unknown")]);
        assert!(limits.is_unrestricted());
    }

    #[test]
    fn threshold_count_is_checked() {
        assert!(GaugeThresholds::from_values(&[1.0, 2.0]).is_none());
        assert_eq!(
            thresholds().pair(GaugeDimension::Length),
            ThresholdPair::new(18.0, 12.0)
        );
    }
}
