//! Study-wide index table: one row per criterion, then one roll-up row per
//! group.
//!
//! For a criterion graded on `n` segments (grade 0 excluded),
//! `normalized_sum = (Σgrade − n) / 2n` and
//! `ratio = (w₁/3 + 2w₂/3 + w₃) / Σw`, where `wₖ` sums the summary weights of
//! the segments graded `k`. The index is their product.

use log::warn;
use serde::Serialize;

use crate::config::{StudyConfig, WeightVector};
use crate::criteria::{CriterionRegistry, Grade, Group};
use crate::segment::ScoredSegment;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "Indicateur")]
    pub indicator: String,
    #[serde(rename = "Note_1")]
    pub count_1: usize,
    #[serde(rename = "Note_2")]
    pub count_2: usize,
    #[serde(rename = "Note_3")]
    pub count_3: usize,
    #[serde(rename = "Note_0")]
    pub count_undetermined: usize,
    #[serde(rename = "Somme_Note")]
    pub grade_sum: f64,
    #[serde(rename = "Somme_Note_norm")]
    pub normalized_sum: f64,
    #[serde(rename = "Poids_Note_1")]
    pub weight_1: f64,
    #[serde(rename = "Poids_Note_2")]
    pub weight_2: f64,
    #[serde(rename = "Poids_Note_3")]
    pub weight_3: f64,
    #[serde(rename = "Ratio")]
    pub ratio: f64,
    #[serde(rename = "Indice")]
    pub index: f64,
    #[serde(rename = "Indice100")]
    pub index100: i64,
}

impl SummaryRow {
    /// Segments accounted for by this row, undetermined ones included.
    pub fn segment_count(&self) -> usize {
        self.count_1 + self.count_2 + self.count_3 + self.count_undetermined
    }
}

fn index100(index: f64) -> i64 {
    (index * 100.0).ceil() as i64
}

/// Summarizes one criterion from `(grade, summary weight)` pairs.
pub fn summarize_criterion(
    indicator: &str,
    observations: impl IntoIterator<Item = (Grade, f64)>,
) -> SummaryRow {
    let mut row = SummaryRow {
        indicator: indicator.to_string(),
        ..Default::default()
    };
    for (grade, weight) in observations {
        match grade {
            Grade::POOR => {
                row.count_1 += 1;
                row.weight_1 += weight;
            }
            Grade::FAIR => {
                row.count_2 += 1;
                row.weight_2 += weight;
            }
            Grade::GOOD => {
                row.count_3 += 1;
                row.weight_3 += weight;
            }
            _ => row.count_undetermined += 1,
        }
    }

    let n = (row.count_1 + row.count_2 + row.count_3) as f64;
    row.grade_sum = row.count_1 as f64 + 2.0 * row.count_2 as f64 + 3.0 * row.count_3 as f64;
    if n > 0.0 {
        row.normalized_sum = (row.grade_sum - n * Grade::MIN) / (n * (Grade::MAX - Grade::MIN));
    } else {
        warn!("No graded segment for {}, its index is 0", indicator);
    }

    let total_weight = row.weight_1 + row.weight_2 + row.weight_3;
    if total_weight > 0.0 {
        row.ratio =
            (row.weight_1 / 3.0 + row.weight_2 * 2.0 / 3.0 + row.weight_3) / total_weight;
    } else if n > 0.0 {
        warn!("Segments graded for {} carry no weight, its index is 0", indicator);
    }

    row.index = row.normalized_sum * row.ratio;
    row.index100 = index100(row.index);
    row
}

/// Roll-up row of a group: grade counts are summed and the index is the
/// weighted mean of the criterion indices. Other fields stay 0.
pub fn group_row(group: Group, rows: &[SummaryRow], weights: &WeightVector) -> SummaryRow {
    let mut row = SummaryRow {
        indicator: group.summary_label().to_string(),
        ..Default::default()
    };
    let mut weighted = 0.0;
    for (i, criterion_row) in rows.iter().enumerate() {
        row.count_1 += criterion_row.count_1;
        row.count_2 += criterion_row.count_2;
        row.count_3 += criterion_row.count_3;
        row.count_undetermined += criterion_row.count_undetermined;
        weighted += criterion_row.index * weights.values().get(i).copied().unwrap_or(0.0);
    }
    row.index = weighted / weights.sum();
    row.index100 = index100(row.index);
    row
}

/// The full table: criterion rows of both groups in registry order, then the
/// `CIRCULATION` and `ACCESSIBILITE` roll-ups.
pub fn build_summary(
    segments: &[ScoredSegment],
    registry: &CriterionRegistry,
    config: &StudyConfig,
) -> Vec<SummaryRow> {
    let groups = [Group::Circulation, Group::Accessibility];
    let mut criterion_rows = Vec::new();
    let mut roll_ups = Vec::new();
    for group in groups {
        let rows: Vec<SummaryRow> = registry
            .group(group)
            .iter()
            .map(|descriptor| {
                summarize_criterion(
                    descriptor.indicator,
                    segments
                        .iter()
                        .map(|s| (s.grade(descriptor.criterion), s.summary_weight(group))),
                )
            })
            .collect();
        roll_ups.push(group_row(group, &rows, config.weights(group)));
        criterion_rows.extend(rows);
    }
    criterion_rows.extend(roll_ups);
    criterion_rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn three_segments_one_of_each_grade() {
        let row = summarize_criterion(
            "Vitesse",
            [(Grade::POOR, 1.0), (Grade::FAIR, 1.0), (Grade::GOOD, 1.0)],
        );
        assert!((row.ratio - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(row.normalized_sum, 0.5);
        assert!((row.index - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(row.index100, 34);
        assert_eq!(row.grade_sum, 6.0);
    }

    #[test]
    fn every_segment_lands_in_one_bucket() {
        let mut rng = rand::rng();
        let observations: Vec<(Grade, f64)> = (0..500)
            .map(|_| {
                let grade = match rng.random_range(0..4) {
                    0 => Grade::UNDETERMINED,
                    1 => Grade::POOR,
                    2 => Grade::FAIR,
                    _ => Grade::GOOD,
                };
                (grade, rng.random_range(0.0..2.0))
            })
            .collect();
        let row = summarize_criterion("Pente", observations.iter().copied());
        assert_eq!(row.segment_count(), observations.len());
        assert!((0.0..=1.0).contains(&row.index));
    }

    #[test]
    fn empty_criterion_has_zero_index() {
        let row = summarize_criterion("Chantier", std::iter::empty());
        assert_eq!(row.index, 0.0);
        assert_eq!(row.index100, 0);

        let weightless = summarize_criterion("Chantier", [(Grade::GOOD, 0.0)]);
        assert_eq!(weightless.normalized_sum, 1.0);
        assert_eq!(weightless.index, 0.0);
    }

    #[test]
    fn group_row_weights_criterion_indices() {
        let rows = vec![
            SummaryRow {
                count_1: 1,
                count_3: 2,
                index: 0.5,
                ..Default::default()
            },
            SummaryRow {
                count_2: 3,
                count_undetermined: 1,
                index: 0.2,
                ..Default::default()
            },
        ];
        let weights = WeightVector::new(Group::Accessibility, vec![3.0, 1.0]).unwrap();
        let roll_up = group_row(Group::Accessibility, &rows, &weights);
        assert_eq!(roll_up.indicator, "ACCESSIBILITE");
        assert!((roll_up.index - (0.5 * 3.0 + 0.2) / 4.0).abs() < 1e-12);
        assert_eq!(roll_up.index100, 43);
        assert_eq!(
            (roll_up.count_1, roll_up.count_2, roll_up.count_3, roll_up.count_undetermined),
            (1, 3, 2, 1)
        );
        assert_eq!(roll_up.ratio, 0.0);
        assert_eq!(roll_up.grade_sum, 0.0);
    }
}
