use log::warn;
use std::collections::{HashMap, HashSet};
use std::num::ParseIntError;

use super::{Grade, ThresholdPair};

/// Attribute tile levels queried for slope data; level `n` carries the links
/// of functional class `n - 8`.
pub const TILE_LEVELS: std::ops::RangeInclusive<u32> = 10..=13;

/// Steepest absolute slope of a link, in percent.
///
/// `slopes` is the comma-separated list delivered by the attribute tiles, in
/// thousandths of a degree.
pub fn max_slope_percent(slopes: &str) -> Result<f64, ParseIntError> {
    let mut max_degrees = 0.0f64;
    for token in slopes.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let degrees = (f64::from(token.parse::<i32>()?) / 1000.0).abs();
        max_degrees = max_degrees.max(degrees);
    }
    Ok(max_degrees.to_radians().tan() * 100.0)
}

/// Slope list of one link as found in an attribute tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlopeRecord {
    pub link_id: u64,
    pub slopes: String,
}

/// Steepest slope per link across all tile rows. Unreadable lists are skipped.
pub fn slopes_by_link(records: &[SlopeRecord]) -> HashMap<u64, f64> {
    let mut slopes: HashMap<u64, f64> = HashMap::new();
    for record in records {
        match max_slope_percent(&record.slopes) {
            Ok(percent) => {
                let entry = slopes.entry(record.link_id).or_insert(percent);
                *entry = entry.max(percent);
            }
            Err(e) => warn!("Ignoring slopes of link {}: {}", record.link_id, e),
        }
    }
    slopes
}

/// Flat links are best: `<= good` is 3, `< bad` is 2, `>= bad` is 1.
pub fn grade_slope(percent: f64, thresholds: ThresholdPair) -> Grade {
    thresholds.grade_descending(percent)
}

/// Identifier of the attribute tile containing a coordinate at `level`.
pub fn tile_id(lat: f64, lon: f64, level: u32) -> u64 {
    let tiles_per_half_turn = 2f64.powi(level as i32);
    let tile_size = 180.0 / tiles_per_half_turn;
    let y = ((lat + 90.0) / tile_size).floor();
    let x = ((lon + 180.0) / tile_size).floor();
    (y * 2.0 * tiles_per_half_turn + x) as u64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileRequest {
    pub layer: String,
    pub tile_id: u64,
}

/// Every (layer, tile) pair needed to cover `extent` at all slope levels,
/// without duplicates.
pub fn tiles_for_extent(extent: &Extent) -> Vec<TileRequest> {
    let mut seen = HashSet::new();
    let mut requests = Vec::new();
    for level in TILE_LEVELS {
        let tile_size = 180.0 / 2f64.powi(level as i32);
        let layer = format!("ADAS_ATTRIB_FC{}", level - 8);
        let mut lat = extent.min_lat;
        while lat <= extent.max_lat + tile_size {
            let mut lon = extent.min_lon;
            while lon <= extent.max_lon + tile_size {
                let request = TileRequest {
                    layer: layer.clone(),
                    tile_id: tile_id(lat, lon, level),
                };
                if seen.insert(request.clone()) {
                    requests.push(request);
                }
                lon += tile_size;
            }
            lat += tile_size;
        }
    }
    requests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steepest_absolute_slope_wins() {
        let pct = max_slope_percent("1000,-4500,2000").unwrap();
        assert!((pct - 4.5f64.to_radians().tan() * 100.0).abs() < 1e-9);
        assert_eq!(max_slope_percent("").unwrap(), 0.0);
        assert!(max_slope_percent("12,abc").is_err());
    }

    #[test]
    fn several_tile_rows_keep_the_steepest() {
        let slopes = slopes_by_link(&[
            SlopeRecord {
                link_id: 1,
                slopes: "500,-700".to_string(),
            },
            SlopeRecord {
                link_id: 1,
                slopes: "3000".to_string(),
            },
            SlopeRecord {
                link_id: 2,
                slopes: "x".to_string(),
            },
        ]);
        assert!((slopes[&1] - 3f64.to_radians().tan() * 100.0).abs() < 1e-9);
        assert!(!slopes.contains_key(&2));
    }

    #[test]
    fn grades_slope_against_thresholds() {
        let pair = ThresholdPair::new(4.0, 8.0);
        assert_eq!(grade_slope(0.0, pair), Grade::GOOD);
        assert_eq!(grade_slope(4.0, pair), Grade::GOOD);
        assert_eq!(grade_slope(6.0, pair), Grade::FAIR);
        assert_eq!(grade_slope(8.0, pair), Grade::POOR);
    }

    #[test]
    fn tile_ids_follow_the_level_grid() {
        // Lausanne at level 10: tile size 0.17578125 degrees
        assert_eq!(tile_id(46.52, 6.63, 10), 776 * 2048 + 1061);
        assert_eq!(tile_id(-90.0, -180.0, 13), 0);
    }

    #[test]
    fn extent_covers_all_levels_without_duplicates() {
        let extent = Extent {
            min_lon: 6.60,
            min_lat: 46.50,
            max_lon: 6.65,
            max_lat: 46.53,
        };
        let requests = tiles_for_extent(&extent);
        let layers: HashSet<_> = requests.iter().map(|r| r.layer.as_str()).collect();
        assert_eq!(
            layers,
            HashSet::from(["ADAS_ATTRIB_FC2", "ADAS_ATTRIB_FC3", "ADAS_ATTRIB_FC4", "ADAS_ATTRIB_FC5"])
        );
        let unique: HashSet<_> = requests.iter().collect();
        assert_eq!(unique.len(), requests.len());
        assert!(requests.contains(&TileRequest {
            layer: "ADAS_ATTRIB_FC2".to_string(),
            tile_id: tile_id(46.50, 6.60, 10),
        }));
    }
}
