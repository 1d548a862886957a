//! Reduces probe speed observations to one congestion index per link
//! direction.
//!
//! Each observation yields a speed performance index
//! `SPI = min(100, round(100 · mean / freeflow))`. Per link direction,
//! `RSI = (avg SPI / 100) · (observations with SPI ≥ 50 / observation slots)`,
//! where the slots are the distinct timestamps of the retained feed.

use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

/// SPI at or above which an observation counts as free-flowing.
pub const NON_CONGESTED_SPI: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Towards the reference node (`T`).
    To,
    /// From the reference node (`F`).
    From,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRecord {
    /// Link id immediately followed by `T` or `F`.
    pub link_dir: String,
    pub date_time: String,
    pub epoch_hour: Option<u32>,
    pub mean_speed: f64,
    pub freeflow_speed: f64,
}

pub fn split_link_dir(link_dir: &str) -> Option<(u64, Direction)> {
    let link_dir = link_dir.trim();
    let direction = match link_dir.chars().last()? {
        'T' | 't' => Direction::To,
        'F' | 'f' => Direction::From,
        _ => return None,
    };
    let link_id = link_dir[..link_dir.len() - 1].parse().ok()?;
    Some((link_id, direction))
}

pub fn speed_performance_index(mean_speed: f64, freeflow_speed: f64) -> f64 {
    (100.0 * mean_speed / freeflow_speed).round().min(100.0)
}

#[derive(Debug, Default)]
struct DirectionStats {
    /// Latest SPI per timestamp.
    spi_by_slot: BTreeMap<String, f64>,
}

impl DirectionStats {
    fn rsi(&self, slots: usize) -> f64 {
        let n = self.spi_by_slot.len();
        if n == 0 || slots == 0 {
            return 0.0;
        }
        let avg = self.spi_by_slot.values().sum::<f64>() / n as f64;
        let free_flowing = self
            .spi_by_slot
            .values()
            .filter(|spi| **spi >= NON_CONGESTED_SPI)
            .count();
        (avg / 100.0) * (free_flowing as f64 / slots as f64)
    }
}

/// Road segment congestion index per (link, direction), fully computed up
/// front.
#[derive(Debug, Default)]
pub struct CongestionIndex {
    rsi: HashMap<(u64, Direction), f64>,
    slots: usize,
}

impl CongestionIndex {
    /// Builds the index from the probe feed. Only links of `network` are
    /// kept; `hours`, when given, restricts the feed to those hour buckets.
    pub fn build(records: &[ProbeRecord], hours: Option<&[u32]>, network: &HashSet<u64>) -> Self {
        let mut stats: HashMap<(u64, Direction), DirectionStats> = HashMap::new();
        let mut slots: HashSet<&str> = HashSet::new();
        let mut skipped = 0usize;

        let in_hours = |record: &ProbeRecord| match hours {
            Some(hours) => record.epoch_hour.is_some_and(|h| hours.contains(&h)),
            None => true,
        };

        for record in records.iter().filter(|r| in_hours(r)) {
            let Some((link_id, direction)) = split_link_dir(&record.link_dir) else {
                skipped += 1;
                warn!("Skipping probe row with malformed LINK-DIR '{}'", record.link_dir);
                continue;
            };
            if !network.contains(&link_id) {
                continue;
            }
            if !record.freeflow_speed.is_finite()
                || record.freeflow_speed <= 0.0
                || !record.mean_speed.is_finite()
            {
                skipped += 1;
                warn!(
                    "Skipping probe row {} at {}: free-flow speed {}",
                    record.link_dir, record.date_time, record.freeflow_speed
                );
                continue;
            }
            slots.insert(record.date_time.as_str());
            let spi = speed_performance_index(record.mean_speed, record.freeflow_speed);
            stats
                .entry((link_id, direction))
                .or_default()
                .spi_by_slot
                .insert(record.date_time.clone(), spi);
        }

        let slots = slots.len();
        let rsi: HashMap<_, _> = stats
            .into_iter()
            .map(|(key, s)| (key, s.rsi(slots)))
            .collect();
        info!(
            "Congestion index computed for {} link directions over {} observation slots",
            rsi.len(),
            slots
        );
        if skipped > 0 {
            debug!("{} probe rows skipped", skipped);
        }
        Self { rsi, slots }
    }

    /// Index of one direction; 0 when the feed has no data for it.
    pub fn rsi(&self, link_id: u64, direction: Direction) -> f64 {
        self.rsi.get(&(link_id, direction)).copied().unwrap_or(0.0)
    }

    pub fn slots(&self) -> usize {
        self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(link_dir: &str, date_time: &str, hour: u32, mean: f64, freeflow: f64) -> ProbeRecord {
        ProbeRecord {
            link_dir: link_dir.to_string(),
            date_time: date_time.to_string(),
            epoch_hour: Some(hour),
            mean_speed: mean,
            freeflow_speed: freeflow,
        }
    }

    #[test]
    fn splits_link_and_direction() {
        assert_eq!(split_link_dir("1234T"), Some((1234, Direction::To)));
        assert_eq!(split_link_dir("99F"), Some((99, Direction::From)));
        assert_eq!(split_link_dir("99X"), None);
        assert_eq!(split_link_dir("T"), None);
        assert_eq!(split_link_dir(""), None);
    }

    #[test]
    fn spi_is_rounded_and_capped() {
        assert_eq!(speed_performance_index(25.0, 50.0), 50.0);
        assert_eq!(speed_performance_index(33.0, 50.0), 66.0);
        assert_eq!(speed_performance_index(2.0, 3.0), 67.0);
        assert_eq!(speed_performance_index(70.0, 50.0), 100.0);
    }

    #[test]
    fn rsi_combines_average_and_free_flow_share() {
        let network = HashSet::from([1, 2]);
        let records = vec![
            probe("1T", "2024-01-08 08:00", 8, 50.0, 50.0), // 100
            probe("1T", "2024-01-08 09:00", 9, 20.0, 50.0), // 40
            probe("1F", "2024-01-08 08:00", 8, 30.0, 50.0), // 60
            probe("2T", "2024-01-08 10:00", 10, 40.0, 50.0), // 80
            probe("3T", "2024-01-08 11:00", 11, 40.0, 50.0), // outside network
        ];
        let index = CongestionIndex::build(&records, None, &network);
        assert_eq!(index.slots(), 3);
        assert!((index.rsi(1, Direction::To) - 0.70 * (1.0 / 3.0)).abs() < 1e-12);
        assert!((index.rsi(1, Direction::From) - 0.60 * (1.0 / 3.0)).abs() < 1e-12);
        assert_eq!(index.rsi(2, Direction::From), 0.0);
        assert_eq!(index.rsi(3, Direction::To), 0.0);
    }

    #[test]
    fn hour_filter_and_invalid_rows() {
        let network = HashSet::from([1]);
        let records = vec![
            probe("1T", "2024-01-08 08:00", 8, 50.0, 50.0),
            probe("1T", "2024-01-08 09:00", 9, 10.0, 50.0),
            probe("1T", "2024-01-08 17:00", 17, 50.0, 0.0),
            probe("1?", "2024-01-08 17:00", 17, 50.0, 50.0),
        ];
        let index = CongestionIndex::build(&records, Some(&[8, 17][..]), &network);
        assert_eq!(index.slots(), 1);
        assert_eq!(index.rsi(1, Direction::To), 1.0);
    }
}
