//! Pairwise Pearson correlation, correlation matrices, and network graphs.

use eco_corr_core::{Metric, TimeSeries};
use serde::Serialize;
use std::cmp::Ordering;

/// Maximum number of pairs reported in [`CorrelationAnalysis::top_pairs`].
pub const TOP_PAIRS: usize = 5;

/// Pearson correlation over the common prefix of two series.
///
/// Returns 0 for fewer than 3 common samples, when either prefix has zero
/// variance, or when the inputs are not finite.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 3 {
        return 0.0;
    }

    let (x, y) = (&x[..n], &y[..n]);
    let len = n as f64;
    let mean_x = x.iter().sum::<f64>() / len;
    let mean_y = y.iter().sum::<f64>() / len;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if !(denominator >= f64::EPSILON) {
        return 0.0;
    }

    let r = covariance / denominator;
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

// ============================================================================
// Named series
// ============================================================================

/// Series keyed by entity, iterated in insertion order.
///
/// Re-inserting a label replaces its series but keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct NamedSeries {
    labels: Vec<String>,
    series: Vec<TimeSeries>,
}

impl NamedSeries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, series: TimeSeries) {
        let label = label.into();
        match self.index_of(&label) {
            Some(i) => self.series[i] = series,
            None => {
                self.labels.push(label);
                self.series.push(series);
            }
        }
    }

    #[must_use]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&TimeSeries> {
        self.index_of(label).map(|i| &self.series[i])
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TimeSeries)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.series.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<L: Into<String>> FromIterator<(L, TimeSeries)> for NamedSeries {
    fn from_iter<I: IntoIterator<Item = (L, TimeSeries)>>(iter: I) -> Self {
        let mut named = Self::new();
        for (label, series) in iter {
            named.insert(label, series);
        }
        named
    }
}

// ============================================================================
// Correlation matrix
// ============================================================================

/// An unordered pair of entities and their correlation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationPair {
    pub entity_a: String,
    pub entity_b: String,
    pub correlation: f64,
}

/// Square correlation matrix with the pairs that met the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub matrix: Vec<Vec<f64>>,
    pub labels: Vec<String>,
    /// Pairs with `i < j` and `correlation >= min`, strongest first
    pub pairs: Vec<CorrelationPair>,
}

/// Builds the full matrix and the thresholded, descending pair list.
pub fn correlation_matrix(data: &NamedSeries, min_correlation: f64) -> CorrelationMatrix {
    let series: Vec<&TimeSeries> = data.iter().map(|(_, s)| s).collect();

    let matrix: Vec<Vec<f64>> = series
        .iter()
        .map(|a| series.iter().map(|b| pearson_correlation(a, b)).collect())
        .collect();

    let labels = data.labels().to_vec();
    let mut pairs = Vec::new();
    for i in 0..labels.len() {
        for j in (i + 1)..labels.len() {
            let correlation = matrix[i][j];
            if correlation >= min_correlation {
                pairs.push(CorrelationPair {
                    entity_a: labels[i].clone(),
                    entity_b: labels[j].clone(),
                    correlation,
                });
            }
        }
    }
    pairs.sort_by(|a, b| {
        b.correlation
            .partial_cmp(&a.correlation)
            .unwrap_or(Ordering::Equal)
    });

    CorrelationMatrix {
        matrix,
        labels,
        pairs,
    }
}

// ============================================================================
// Network graph
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkNode {
    pub id: usize,
    pub label: String,
    /// Number of edges touching this node
    pub degree: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkGraph {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

/// One node per label and one edge per `i < j` pair with weight `>= min_weight`.
pub fn network_graph(matrix: &[Vec<f64>], labels: &[String], min_weight: f64) -> NetworkGraph {
    let mut degrees = vec![0usize; labels.len()];
    let mut edges = Vec::new();

    for i in 0..labels.len() {
        for j in (i + 1)..labels.len() {
            let Some(&weight) = matrix.get(i).and_then(|row| row.get(j)) else {
                continue;
            };
            if weight >= min_weight {
                degrees[i] += 1;
                degrees[j] += 1;
                edges.push(NetworkEdge {
                    source: labels[i].clone(),
                    target: labels[j].clone(),
                    weight,
                });
            }
        }
    }

    let nodes = labels
        .iter()
        .zip(degrees)
        .enumerate()
        .map(|(id, (label, degree))| NetworkNode {
            id,
            label: label.clone(),
            degree,
        })
        .collect();

    NetworkGraph { nodes, edges }
}

// ============================================================================
// Analysis result
// ============================================================================

/// Result of a correlation operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationAnalysis {
    pub matrix: Vec<Vec<f64>>,
    pub labels: Vec<String>,
    pub pairs: Vec<CorrelationPair>,
    pub strongest_pair: Option<CorrelationPair>,
    pub top_pairs: Vec<CorrelationPair>,
    pub network: NetworkGraph,
    pub metric: Metric,
    pub timeframe: String,
}

impl CorrelationAnalysis {
    /// Assembles the result from per-entity series.
    pub fn from_series(
        data: &NamedSeries,
        min_correlation: f64,
        metric: Metric,
        timeframe: impl Into<String>,
    ) -> Self {
        let CorrelationMatrix {
            matrix,
            labels,
            pairs,
        } = correlation_matrix(data, min_correlation);

        let network = network_graph(&matrix, &labels, min_correlation);

        Self {
            strongest_pair: pairs.first().cloned(),
            top_pairs: pairs.iter().take(TOP_PAIRS).cloned().collect(),
            matrix,
            labels,
            pairs,
            network,
            metric,
            timeframe: timeframe.into(),
        }
    }

    /// Matrix entry for two labels.
    #[must_use]
    pub fn correlation(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        self.matrix.get(i)?.get(j).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> TimeSeries {
        TimeSeries::new(values.to_vec())
    }

    // ============================================
    // pearson_correlation
    // ============================================

    #[test]
    fn perfect_positive_correlation() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!((r - 1.0).abs() < 1e-10);
    }

    #[test]
    fn perfect_negative_correlation() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 4.0, 5.0], &[5.0, 4.0, 3.0, 2.0, 1.0]);
        assert!((r + 1.0).abs() < 1e-10);
    }

    #[test]
    fn constant_series_yields_zero() {
        let r = pearson_correlation(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]);
        assert!((r - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fewer_than_three_samples_yields_zero() {
        let r = pearson_correlation(&[1.0, 2.0], &[1.0, 2.0]);
        assert!((r - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unequal_lengths_use_common_prefix() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 100.0], &[1.0, 2.0, 3.0]);
        assert!((r - 1.0).abs() < 1e-10);
    }

    #[test]
    fn non_finite_input_yields_zero() {
        let r = pearson_correlation(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 3.0]);
        assert!((r - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn correlation_is_symmetric() {
        let a = [0.3, 1.7, 2.2, 0.9, 4.1, 3.3];
        let b = [1.1, 0.4, 2.8, 2.2, 3.9, 1.0];
        assert_eq!(pearson_correlation(&a, &b), pearson_correlation(&b, &a));
    }

    // ============================================
    // NamedSeries
    // ============================================

    #[test]
    fn named_series_keeps_first_position_on_reinsert() {
        let mut named = NamedSeries::new();
        named.insert("a", series(&[1.0]));
        named.insert("b", series(&[2.0]));
        named.insert("a", series(&[3.0]));

        assert_eq!(named.labels(), &["a".to_string(), "b".to_string()]);
        assert_eq!(named.get("a").unwrap().as_slice(), &[3.0]);
    }

    // ============================================
    // correlation_matrix / network_graph
    // ============================================

    fn three_entities() -> NamedSeries {
        [
            ("x", series(&[1.0, 2.0, 3.0, 4.0, 5.0])),
            ("y", series(&[2.0, 4.0, 6.0, 8.0, 10.0])),
            ("z", series(&[5.0, 4.0, 3.0, 2.0, 1.0])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn matrix_has_unit_diagonal_and_is_symmetric() {
        let result = correlation_matrix(&three_entities(), 0.5);
        for i in 0..3 {
            assert!((result.matrix[i][i] - 1.0).abs() < 1e-10);
            for j in 0..3 {
                assert_eq!(result.matrix[i][j], result.matrix[j][i]);
            }
        }
    }

    #[test]
    fn pairs_respect_threshold_and_order() {
        let result = correlation_matrix(&three_entities(), 0.5);
        assert_eq!(result.pairs.len(), 1);
        assert_eq!(result.pairs[0].entity_a, "x");
        assert_eq!(result.pairs[0].entity_b, "y");

        let all = correlation_matrix(&three_entities(), -1.0);
        assert_eq!(all.pairs.len(), 3);
        assert!(all
            .pairs
            .windows(2)
            .all(|w| w[0].correlation >= w[1].correlation));
    }

    #[test]
    fn network_counts_degrees() {
        let result = correlation_matrix(&three_entities(), 0.5);
        let graph = network_graph(&result.matrix, &result.labels, 0.5);

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.nodes[0].degree, 1);
        assert_eq!(graph.nodes[1].degree, 1);
        assert_eq!(graph.nodes[2].degree, 0);
        assert_eq!(graph.edges[0].source, "x");
        assert_eq!(graph.edges[0].target, "y");
    }

    #[test]
    fn analysis_exposes_strongest_and_top_pairs() {
        let analysis = CorrelationAnalysis::from_series(&three_entities(), -1.0, Metric::Price, "30d");
        assert_eq!(analysis.top_pairs.len(), 3);
        let strongest = analysis.strongest_pair.as_ref().unwrap();
        assert_eq!((strongest.entity_a.as_str(), strongest.entity_b.as_str()), ("x", "y"));
        assert!((analysis.correlation("x", "z").unwrap() + 1.0).abs() < 1e-10);
        assert!(analysis.correlation("x", "missing").is_none());
    }

    #[test]
    fn empty_input_has_no_strongest_pair() {
        let analysis = CorrelationAnalysis::from_series(&NamedSeries::new(), 0.5, Metric::Price, "30d");
        assert!(analysis.matrix.is_empty());
        assert!(analysis.strongest_pair.is_none());
        assert!(analysis.top_pairs.is_empty());
    }
}
