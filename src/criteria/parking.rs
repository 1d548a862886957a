use std::collections::HashMap;

use super::{Grade, ThresholdPair};

/// Parking spots of one parking feature found within the search radius of a
/// link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParkingCount {
    pub link_id: u64,
    pub spots: f64,
}

/// Spots counted around each link.
pub fn spots_by_link(counts: &[ParkingCount]) -> HashMap<u64, f64> {
    let mut spots: HashMap<u64, f64> = HashMap::new();
    for count in counts {
        *spots.entry(count.link_id).or_default() += count.spots;
    }
    spots
}

/// Spots counted around a link, rounded up, plus the study's default supply.
pub fn available_spots(counted: f64, default_spots: f64) -> f64 {
    counted.ceil() + default_spots
}

/// `>= good` spots is 3, `> bad` is 2, `<= bad` is 1.
pub fn grade_parking(spots: f64, thresholds: ThresholdPair) -> Grade {
    thresholds.grade_ascending(spots)
}
