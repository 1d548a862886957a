//! Per-segment roll-up of criterion grades into group scores.

use std::collections::HashMap;

use crate::config::{PoiLayer, WeightVector};
use crate::criteria::{Grade, Group};

/// Mean, weighted mean and normalized score of one criterion group on one
/// segment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroupScore {
    pub mean: f64,
    pub weighted_mean: f64,
    pub normalized: f64,
}

/// Maps a grade average onto `[0, 1]`.
pub fn normalize(value: f64) -> f64 {
    (value - Grade::MIN) / (Grade::MAX - Grade::MIN)
}

/// Scores one group of grades, listed in registry order so that `grades[i]`
/// pairs with `weights[i]`.
///
/// Circulation normalizes its weighted mean while accessibility normalizes its
/// plain mean.
pub fn score_group(group: Group, grades: &[Grade], weights: &WeightVector) -> GroupScore {
    if grades.is_empty() {
        return GroupScore::default();
    }
    let mean = grades.iter().map(|g| g.as_f64()).sum::<f64>() / grades.len() as f64;
    let weighted_mean = grades
        .iter()
        .enumerate()
        .map(|(i, g)| g.as_f64() * weights.share(i))
        .sum::<f64>();
    let normalized = match group {
        Group::Circulation => normalize(weighted_mean),
        Group::Accessibility => normalize(mean),
    };
    GroupScore {
        mean,
        weighted_mean,
        normalized,
    }
}

/// Points of one layer found within the search distance of a link.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiCount {
    pub link_id: u64,
    pub layer: String,
    pub count: f64,
}

/// Per-link point counts keyed by layer name.
pub fn poi_counts_by_link(counts: &[PoiCount]) -> HashMap<u64, HashMap<String, f64>> {
    let mut by_link: HashMap<u64, HashMap<String, f64>> = HashMap::new();
    for count in counts {
        *by_link
            .entry(count.link_id)
            .or_default()
            .entry(count.layer.clone())
            .or_default() += count.count;
    }
    by_link
}

/// Demand weight of a link from the points of interest around it: the sum of
/// `count × ratio` over the configured layers, or 1 when that sum is zero.
pub fn poi_weight(layers: &[PoiLayer], counts: Option<&HashMap<String, f64>>) -> f64 {
    let sum: f64 = match counts {
        Some(counts) => layers
            .iter()
            .map(|layer| counts.get(&layer.name).copied().unwrap_or(0.0) * layer.ratio)
            .sum(),
        None => 0.0,
    };
    if sum == 0.0 { 1.0 } else { sum }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(group: Group, values: &[f64]) -> WeightVector {
        WeightVector::new(group, values.to_vec()).unwrap()
    }

    #[test]
    fn weighted_mean_and_normalization() {
        let score = score_group(
            Group::Circulation,
            &[Grade::GOOD, Grade::POOR],
            &weights(Group::Circulation, &[1.0, 1.0]),
        );
        assert_eq!(score.weighted_mean, 2.0);
        assert_eq!(score.normalized, 0.5);
        assert_eq!(score.mean, 2.0);
    }

    #[test]
    fn accessibility_normalizes_the_unweighted_mean() {
        let grades = [Grade::GOOD, Grade::POOR];
        let w = weights(Group::Accessibility, &[3.0, 1.0]);

        let circulation = score_group(Group::Circulation, &grades, &w);
        let accessibility = score_group(Group::Accessibility, &grades, &w);

        assert_eq!(circulation.weighted_mean, 2.5);
        assert_eq!(accessibility.weighted_mean, 2.5);
        assert_eq!(circulation.normalized, 0.75);
        // Same grades and weights, but accessibility ignores the weights here.
        assert_eq!(accessibility.normalized, 0.5);
    }

    #[test]
    fn poi_weight_defaults_to_one() {
        let layers = vec![
            PoiLayer {
                name: "Commerces".to_string(),
                ratio: 1.0,
            },
            PoiLayer {
                name: "Restaurants".to_string(),
                ratio: 0.5,
            },
        ];
        assert_eq!(poi_weight(&layers, None), 1.0);

        let mut counts = HashMap::new();
        counts.insert("Restaurants".to_string(), 0.0);
        assert_eq!(poi_weight(&layers, Some(&counts)), 1.0);

        counts.insert("Commerces".to_string(), 3.0);
        counts.insert("Restaurants".to_string(), 4.0);
        counts.insert("Ignored".to_string(), 100.0);
        assert_eq!(poi_weight(&layers, Some(&counts)), 5.0);

        let by_link = poi_counts_by_link(&[
            PoiCount {
                link_id: 9,
                layer: "Commerces".to_string(),
                count: 2.0,
            },
            PoiCount {
                link_id: 9,
                layer: "Commerces".to_string(),
                count: 1.0,
            },
        ]);
        assert_eq!(poi_weight(&layers, by_link.get(&9)), 3.0);
    }
}
