//! Lead-lag detection via lagged Pearson correlation.
//!
//! Series are chronological, so a positive optimal lag for `(row, column)`
//! means the row entity's moves show up in the column entity `lag` samples
//! later: the row leads.

use crate::matrix::{pearson_correlation, NamedSeries};
use eco_corr_core::Metric;
use serde::Serialize;
use std::cmp::Reverse;

/// Maximum number of relationships reported.
pub const MAX_RELATIONSHIPS: usize = 10;

/// Correlation of `s1[i]` against `s2[i + lag]` over all valid `i`.
///
/// Fewer than 3 aligned samples yields 0.
pub fn lagged_correlation(s1: &[f64], s2: &[f64], lag: i32) -> f64 {
    let (x, y): (Vec<f64>, Vec<f64>) = s1
        .iter()
        .enumerate()
        .filter_map(|(i, a)| {
            let j = i64::try_from(i).ok()? + i64::from(lag);
            let j = usize::try_from(j).ok()?;
            s2.get(j).map(|b| (*a, *b))
        })
        .unzip();

    pearson_correlation(&x, &y)
}

/// Lag in `[-max_lag, max_lag]` with the highest lagged correlation.
///
/// Lags are scanned from most negative to most positive; only a strictly
/// greater correlation replaces the current best, which starts at lag 0 with
/// correlation -1.
pub fn optimal_lag(s1: &[f64], s2: &[f64], max_lag: u32) -> i32 {
    let max_lag = i32::try_from(max_lag).unwrap_or(i32::MAX);
    let mut best_correlation = -1.0;
    let mut best_lag = 0;

    for lag in -max_lag..=max_lag {
        let correlation = lagged_correlation(s1, s2, lag);
        if correlation > best_correlation {
            best_correlation = correlation;
            best_lag = lag;
        }
    }

    best_lag
}

/// Optimal lag for every ordered pair; the diagonal is 0.
pub fn lag_matrix(data: &NamedSeries, max_lag: u32) -> Vec<Vec<i32>> {
    let series: Vec<_> = data.iter().map(|(_, s)| s).collect();

    (0..series.len())
        .map(|i| {
            (0..series.len())
                .map(|j| {
                    if i == j {
                        0
                    } else {
                        optimal_lag(series[i], series[j], max_lag)
                    }
                })
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leader {
    pub ecosystem: String,
    /// Entities this one leads
    pub lead_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lagger {
    pub ecosystem: String,
    /// Entities this one trails
    pub lag_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadLagRelationship {
    pub leader: String,
    pub lagger: String,
    pub lag: i32,
}

/// Result of a lead-lag operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadLagAnalysis {
    pub lag_matrix: Vec<Vec<i32>>,
    pub labels: Vec<String>,
    pub leaders: Vec<Leader>,
    pub laggers: Vec<Lagger>,
    pub relationships: Vec<LeadLagRelationship>,
    pub metric: Metric,
    pub timeframe: String,
}

impl LeadLagAnalysis {
    /// Computes the lag matrix and classifies every entity.
    pub fn from_series(
        data: &NamedSeries,
        max_lag: u32,
        metric: Metric,
        timeframe: impl Into<String>,
    ) -> Self {
        let lag_matrix = lag_matrix(data, max_lag);
        let labels = data.labels().to_vec();
        let (leaders, laggers, relationships) = classify(&labels, &lag_matrix);

        Self {
            lag_matrix,
            labels,
            leaders,
            laggers,
            relationships,
            metric,
            timeframe: timeframe.into(),
        }
    }
}

/// Counts positive and negative lags per row.
///
/// An entity leads on net when it leads more peers than it lags, and lags on
/// net in the reverse case; ties appear in neither list. Both lists are
/// sorted by count descending. Relationships cover every positive entry, sorted by lag
/// descending and truncated to [`MAX_RELATIONSHIPS`].
pub fn classify(
    labels: &[String],
    lag_matrix: &[Vec<i32>],
) -> (Vec<Leader>, Vec<Lagger>, Vec<LeadLagRelationship>) {
    let mut leaders = Vec::new();
    let mut laggers = Vec::new();
    let mut relationships = Vec::new();

    for (i, row) in lag_matrix.iter().enumerate() {
        let Some(label) = labels.get(i) else {
            continue;
        };

        let mut lead_count = 0;
        let mut lag_count = 0;
        for (j, &lag) in row.iter().enumerate() {
            if i == j {
                continue;
            }
            if lag > 0 {
                lead_count += 1;
                if let Some(lagger) = labels.get(j) {
                    relationships.push(LeadLagRelationship {
                        leader: label.clone(),
                        lagger: lagger.clone(),
                        lag,
                    });
                }
            } else if lag < 0 {
                lag_count += 1;
            }
        }

        if lead_count > lag_count {
            leaders.push(Leader {
                ecosystem: label.clone(),
                lead_count,
            });
        } else if lag_count > lead_count {
            laggers.push(Lagger {
                ecosystem: label.clone(),
                lag_count,
            });
        }
    }

    leaders.sort_by_key(|l| Reverse(l.lead_count));
    laggers.sort_by_key(|l| Reverse(l.lag_count));
    relationships.sort_by_key(|r| Reverse(r.lag));
    relationships.truncate(MAX_RELATIONSHIPS);

    (leaders, laggers, relationships)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_corr_core::TimeSeries;

    /// Deterministic, non-periodic test signal.
    fn signal(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let t = i as f64;
                (t * 0.7).sin() + 0.5 * (t * 1.3).cos() + 0.1 * t
            })
            .collect()
    }

    // ============================================
    // lagged_correlation / optimal_lag
    // ============================================

    #[test]
    fn zero_lag_matches_pearson() {
        let a = signal(20);
        let b: Vec<f64> = a.iter().map(|v| v * 2.0 + 1.0).collect();
        assert!((lagged_correlation(&a, &b, 0) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn too_few_aligned_pairs_yields_zero() {
        let a = [1.0, 2.0, 3.0, 4.0];
        assert!((lagged_correlation(&a, &a, 2) - 0.0).abs() < f64::EPSILON);
        assert!((lagged_correlation(&a, &a, -10) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn recovers_shift_of_two() {
        // b[t] = a[t - 2]: a leads b by 2 samples
        let a = signal(40);
        let mut b = vec![0.0, 0.0];
        b.extend_from_slice(&a[..38]);

        assert_eq!(optimal_lag(&a, &b, 5), 2);
        assert_eq!(optimal_lag(&b, &a, 5), -2);
    }

    #[test]
    fn uncorrelated_series_settle_on_first_scanned_lag() {
        // Constant series correlate at 0 everywhere, which first beats -1 at -max_lag
        let flat = [1.0; 10];
        assert_eq!(optimal_lag(&flat, &flat, 3), -3);

        // With max_lag 0 only lag 0 is scanned
        assert_eq!(optimal_lag(&flat, &flat, 0), 0);
    }

    // ============================================
    // lag_matrix / classify
    // ============================================

    fn shifted_pair() -> NamedSeries {
        let a = signal(40);
        let mut b = vec![0.0, 0.0];
        b.extend_from_slice(&a[..38]);
        [("alpha", TimeSeries::new(a)), ("beta", TimeSeries::new(b))]
            .into_iter()
            .collect()
    }

    #[test]
    fn lag_matrix_diagonal_is_zero() {
        let matrix = lag_matrix(&shifted_pair(), 5);
        assert_eq!(matrix[0][0], 0);
        assert_eq!(matrix[1][1], 0);
        assert_eq!(matrix[0][1], 2);
        assert_eq!(matrix[1][0], -2);
    }

    #[test]
    fn leader_and_lagger_are_classified() {
        let analysis = LeadLagAnalysis::from_series(&shifted_pair(), 5, Metric::Price, "90d");

        assert_eq!(
            analysis.leaders,
            vec![Leader {
                ecosystem: "alpha".into(),
                lead_count: 1
            }]
        );
        assert_eq!(
            analysis.laggers,
            vec![Lagger {
                ecosystem: "beta".into(),
                lag_count: 1
            }]
        );
        assert_eq!(
            analysis.relationships,
            vec![LeadLagRelationship {
                leader: "alpha".into(),
                lagger: "beta".into(),
                lag: 2
            }]
        );
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn classification_uses_net_counts() {
        let labels = labels(&["a", "b", "c", "d"]);
        let matrix = vec![
            vec![0, 2, 3, -1],
            vec![-2, 0, 1, 0],
            vec![-3, -1, 0, 0],
            vec![1, 0, 0, 0],
        ];

        let (leaders, laggers, _) = classify(&labels, &matrix);

        // a leads 2 and lags 1, b is tied, c lags 2, d leads 1
        assert_eq!(
            leaders,
            vec![
                Leader {
                    ecosystem: "a".into(),
                    lead_count: 2
                },
                Leader {
                    ecosystem: "d".into(),
                    lead_count: 1
                },
            ]
        );
        assert_eq!(
            laggers,
            vec![Lagger {
                ecosystem: "c".into(),
                lag_count: 2
            }]
        );
    }

    #[test]
    fn tied_counts_are_neither_leader_nor_lagger() {
        let labels = labels(&["x", "y", "z"]);
        let matrix = vec![vec![0, 1, -1], vec![-1, 0, 1], vec![1, -1, 0]];

        let (leaders, laggers, relationships) = classify(&labels, &matrix);

        assert!(leaders.is_empty());
        assert!(laggers.is_empty());
        // Positive entries are still reported as relationships
        assert_eq!(relationships.len(), 3);
    }

    #[test]
    fn relationships_sorted_and_truncated() {
        let labels: Vec<String> = (0..12).map(|i| format!("e{i}")).collect();
        // Row 0 leads everyone with increasing lags
        let mut matrix = vec![vec![0; 12]; 12];
        for j in 1..12 {
            matrix[0][j] = j as i32;
        }

        let (leaders, laggers, relationships) = classify(&labels, &matrix);
        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].lead_count, 11);
        assert!(laggers.is_empty());
        assert_eq!(relationships.len(), MAX_RELATIONSHIPS);
        assert_eq!(relationships[0].lag, 11);
        assert!(relationships.windows(2).all(|w| w[0].lag >= w[1].lag));
    }
}
