//! Cross-ecosystem correlation engine.
//!
//! - `metrics`: price, volume, and sentiment normalizers with ecosystem fusion
//! - `blend`: the combined metric
//! - `matrix`: Pearson correlation, correlation matrices, network graphs
//! - `lead_lag`: lagged correlation and leader/lagger classification
//! - `capital_flow`: flow estimation between ecosystems
//! - `correlator`: the cached facade tying them together

pub mod blend;
pub mod cache;
pub mod capital_flow;
pub mod correlator;
pub mod lead_lag;
pub mod matrix;
pub mod metrics;

pub use cache::{AnalysisCache, CacheValue};
pub use capital_flow::{
    distribute_loss, CapitalFlowAnalysis, FlowMatrix, FlowSummary, SignificantFlow, SinkWeight,
};
pub use correlator::{CapitalFlowOptions, CorrelationOptions, EcosystemCorrelator, LeadLagOptions};
pub use lead_lag::{
    lag_matrix, lagged_correlation, optimal_lag, Lagger, LeadLagAnalysis, LeadLagRelationship,
    Leader,
};
pub use matrix::{
    correlation_matrix, network_graph, pearson_correlation, CorrelationAnalysis,
    CorrelationMatrix, CorrelationPair, NamedSeries, NetworkEdge, NetworkGraph, NetworkNode,
};
pub use metrics::{PriceMetrics, SentimentMetrics, VolumeChange, VolumeMetrics};
