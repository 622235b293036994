//! Heuristic capital-flow estimation between ecosystems.
//!
//! Every ecosystem whose volume fell is a source, every ecosystem whose volume
//! rose is a sink. A source's loss is split across sinks in proportion to
//! `correlation · gain`, or evenly when those weights sum to zero or less.

use crate::metrics::VolumeChange;
use serde::Serialize;
use std::cmp::Ordering;

/// Sink candidate seen from one source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkWeight {
    /// Correlation between the source and this sink
    pub correlation: f64,
    /// Positive volume change of the sink
    pub gain: f64,
}

/// Splits `loss` across `sinks`.
///
/// The returned flows always sum to `loss` when `sinks` is non-empty.
pub fn distribute_loss(loss: f64, sinks: &[SinkWeight]) -> Vec<f64> {
    if sinks.is_empty() {
        return Vec::new();
    }

    let total_weight: f64 = sinks.iter().map(|s| s.correlation * s.gain).sum();
    if total_weight > 0.0 {
        sinks
            .iter()
            .map(|s| loss * (s.correlation * s.gain) / total_weight)
            .collect()
    } else {
        vec![loss / sinks.len() as f64; sinks.len()]
    }
}

/// A flow whose share of the source's outflow met the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificantFlow {
    pub from: String,
    pub to: String,
    pub value: f64,
    /// Share of the source's total outflow, in percent
    pub percentage: f64,
}

/// Per-ecosystem view of the flow matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSummary {
    pub ecosystem: String,
    pub start_volume: f64,
    pub end_volume: f64,
    pub volume_change: f64,
    /// Column sum minus row sum of the flow matrix
    pub net_inflow: f64,
}

/// Result of a capital-flow operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapitalFlowAnalysis {
    /// `flow_matrix[i][j]` is the flow from `ecosystems[i]` to `ecosystems[j]`
    pub flow_matrix: Vec<Vec<f64>>,
    pub ecosystems: Vec<String>,
    pub summaries: Vec<FlowSummary>,
    pub significant_flows: Vec<SignificantFlow>,
    pub timeframe: String,
}

/// Flow matrix under construction.
#[derive(Debug, Clone)]
pub struct FlowMatrix {
    ecosystems: Vec<String>,
    flows: Vec<Vec<f64>>,
    total_outflows: Vec<f64>,
}

impl FlowMatrix {
    #[must_use]
    pub fn new(ecosystems: Vec<String>) -> Self {
        let n = ecosystems.len();
        Self {
            ecosystems,
            flows: vec![vec![0.0; n]; n],
            total_outflows: vec![0.0; n],
        }
    }

    /// Records `source` losing `loss`, split across `sinks` as `(index, weight)`.
    ///
    /// The source's total outflow is its whole loss even with no sinks.
    pub fn record_loss(&mut self, source: usize, loss: f64, sinks: &[(usize, SinkWeight)]) {
        let Some(total) = self.total_outflows.get_mut(source) else {
            return;
        };
        *total = loss;

        let weights: Vec<SinkWeight> = sinks.iter().map(|(_, w)| *w).collect();
        for ((sink, _), flow) in sinks.iter().zip(distribute_loss(loss, &weights)) {
            if let Some(cell) = self.flows.get_mut(source).and_then(|row| row.get_mut(*sink)) {
                *cell = flow;
            }
        }
    }

    /// Flows with `i != j`, a positive value, and a share of at least
    /// `min_percentage` of the source's outflow, largest first.
    #[must_use]
    pub fn significant_flows(&self, min_percentage: f64) -> Vec<SignificantFlow> {
        let mut significant = Vec::new();
        for (i, row) in self.flows.iter().enumerate() {
            let total = self.total_outflows[i];
            for (j, &value) in row.iter().enumerate() {
                if i == j || value <= 0.0 || total <= 0.0 {
                    continue;
                }
                let percentage = value / total * 100.0;
                if percentage >= min_percentage {
                    significant.push(SignificantFlow {
                        from: self.ecosystems[i].clone(),
                        to: self.ecosystems[j].clone(),
                        value,
                        percentage,
                    });
                }
            }
        }

        significant.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
        significant
    }

    /// Net inflow for ecosystem `index`: received minus sent.
    #[must_use]
    pub fn net_inflow(&self, index: usize) -> f64 {
        let received: f64 = self.flows.iter().filter_map(|row| row.get(index)).sum();
        let sent: f64 = self.flows.get(index).map_or(0.0, |row| row.iter().sum());
        received - sent
    }

    /// Finalizes the analysis; `changes` must be aligned with the ecosystems.
    #[must_use]
    pub fn into_analysis(
        self,
        changes: &[VolumeChange],
        min_percentage: f64,
        timeframe: impl Into<String>,
    ) -> CapitalFlowAnalysis {
        let significant_flows = self.significant_flows(min_percentage);
        let summaries = changes
            .iter()
            .enumerate()
            .map(|(i, change)| FlowSummary {
                ecosystem: change.ecosystem.clone(),
                start_volume: change.start_volume,
                end_volume: change.end_volume,
                volume_change: change.change,
                net_inflow: self.net_inflow(i),
            })
            .collect();

        CapitalFlowAnalysis {
            flow_matrix: self.flows,
            ecosystems: self.ecosystems,
            summaries,
            significant_flows,
            timeframe: timeframe.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(correlation: f64, gain: f64) -> SinkWeight {
        SinkWeight { correlation, gain }
    }

    fn change(ecosystem: &str, start: f64, end: f64) -> VolumeChange {
        VolumeChange {
            ecosystem: ecosystem.to_string(),
            start_volume: start,
            end_volume: end,
            change: end - start,
            percent_change: 0.0,
            timeframe: "14d".to_string(),
        }
    }

    // ============================================
    // distribute_loss
    // ============================================

    #[test]
    fn single_sink_receives_entire_loss() {
        let flows = distribute_loss(100.0, &[sink(0.8, 50.0)]);
        assert_eq!(flows.len(), 1);
        assert!((flows[0] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn loss_split_proportionally() {
        // weights 0.5*10 = 5 and 1.0*15 = 15
        let flows = distribute_loss(100.0, &[sink(0.5, 10.0), sink(1.0, 15.0)]);
        assert!((flows[0] - 25.0).abs() < 1e-9);
        assert!((flows[1] - 75.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_weights_split_evenly() {
        let flows = distribute_loss(90.0, &[sink(0.0, 10.0), sink(-0.5, 5.0), sink(0.0, 1.0)]);
        assert_eq!(flows, vec![30.0, 30.0, 30.0]);
    }

    #[test]
    fn flows_conserve_loss() {
        let flows = distribute_loss(
            0.37,
            &[sink(0.9, 0.1), sink(0.2, 0.4), sink(0.55, 0.05), sink(0.7, 0.3)],
        );
        let total: f64 = flows.iter().sum();
        assert!((total - 0.37).abs() < 1e-12);
    }

    #[test]
    fn no_sinks_no_flows() {
        assert!(distribute_loss(10.0, &[]).is_empty());
    }

    // ============================================
    // FlowMatrix
    // ============================================

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn source_with_single_sink_flows_fully() {
        let mut matrix = FlowMatrix::new(names(&["a", "b"]));
        matrix.record_loss(0, 100.0, &[(1, sink(0.8, 50.0))]);

        let analysis = matrix.into_analysis(&[change("a", 200.0, 100.0), change("b", 50.0, 100.0)], 5.0, "14d");
        assert!((analysis.flow_matrix[0][1] - 100.0).abs() < 1e-9);
        assert_eq!(analysis.significant_flows.len(), 1);
        let flow = &analysis.significant_flows[0];
        assert_eq!((flow.from.as_str(), flow.to.as_str()), ("a", "b"));
        assert!((flow.percentage - 100.0).abs() < 1e-9);

        assert!((analysis.summaries[0].net_inflow + 100.0).abs() < 1e-9);
        assert!((analysis.summaries[1].net_inflow - 100.0).abs() < 1e-9);
    }

    #[test]
    fn significance_threshold_is_inclusive() {
        let mut matrix = FlowMatrix::new(names(&["src", "big", "small"]));
        // small gets exactly 5% of the outflow
        matrix.record_loss(0, 100.0, &[(1, sink(1.0, 95.0)), (2, sink(1.0, 5.0))]);

        let at_threshold = matrix.significant_flows(5.0);
        assert_eq!(at_threshold.len(), 2);
        assert_eq!(at_threshold[0].to, "big");

        let above = matrix.significant_flows(5.000_001);
        assert_eq!(above.len(), 1);
    }

    #[test]
    fn loss_without_sinks_has_no_flows() {
        let mut matrix = FlowMatrix::new(names(&["a", "b"]));
        matrix.record_loss(0, 10.0, &[]);
        matrix.record_loss(1, 5.0, &[]);

        assert!(matrix.significant_flows(0.0).is_empty());
        assert!((matrix.net_inflow(0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn net_inflows_sum_to_zero() {
        let mut matrix = FlowMatrix::new(names(&["a", "b", "c", "d"]));
        matrix.record_loss(0, 3.0, &[(2, sink(0.4, 1.0)), (3, sink(0.9, 2.0))]);
        matrix.record_loss(1, 1.5, &[(2, sink(0.1, 1.0)), (3, sink(0.3, 2.0))]);

        let total: f64 = (0..4).map(|i| matrix.net_inflow(i)).sum();
        assert!(total.abs() < 1e-12);
    }
}
