use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Grade, ThresholdPair};

/// Lane type code flagging a bike lane in the lane table.
pub const BIKE_LANE_TYPE: u32 = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TravelDirection {
    /// Open in both directions.
    #[default]
    #[serde(rename = "B")]
    Both,
    /// Open towards the reference node only.
    #[serde(rename = "T")]
    To,
    /// Open from the reference node only.
    #[serde(rename = "F")]
    From,
}

impl TravelDirection {
    pub fn is_oneway(self) -> bool {
        matches!(self, TravelDirection::To | TravelDirection::From)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LaneAttributes {
    pub from_lanes: u32,
    pub to_lanes: u32,
    /// 1 = one lane, 2 = two or three, 3 = four or more.
    pub lane_category: u8,
    pub direction: TravelDirection,
    pub physical_lanes: u32,
}

pub fn grade_lanes(lanes: &LaneAttributes, thresholds: ThresholdPair) -> Grade {
    let ThresholdPair { good, bad } = thresholds;
    let physical = f64::from(lanes.physical_lanes);
    let total = f64::from(lanes.from_lanes) + f64::from(lanes.to_lanes);
    let category = f64::from(lanes.lane_category);
    let both = lanes.direction == TravelDirection::Both;
    let oneway = lanes.direction.is_oneway();

    if physical >= good || total >= good || category > good || (category >= good && both) {
        Grade::GOOD
    } else if physical > bad
        || total > bad
        || (category > bad && oneway)
        || (category >= bad && both)
    {
        Grade::FAIR
    } else if total <= bad || category < bad || (category <= bad && oneway) {
        Grade::POOR
    } else {
        Grade::UNDETERMINED
    }
}

/// Grade for cargo bikes: single-lane streets are fine, wider streets need a
/// bike lane.
pub fn grade_bike_lane(lane_category: u8, has_bike_lane: bool) -> Grade {
    if lane_category <= 1 {
        Grade::GOOD
    } else if has_bike_lane {
        Grade::FAIR
    } else {
        Grade::POOR
    }
}

/// One row of the lane table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneRecord {
    pub link_id: u64,
    pub lane_type: u32,
}

/// Links carrying at least one bike lane.
pub fn bike_lane_links(records: &[LaneRecord]) -> HashSet<u64> {
    records
        .iter()
        .filter(|r| r.lane_type == BIKE_LANE_TYPE)
        .map(|r| r.link_id)
        .collect()
}
