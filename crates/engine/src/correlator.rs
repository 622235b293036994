//! Public facade over the metric normalizers and analyzers.
//!
//! Every operation checks the shared cache first, gathers per-entity series
//! one at a time, delegates to the pure analyzers, and caches the result.
//! Failures are logged once here and then returned to the caller.

use crate::blend::{combine_asset, combine_ecosystem};
use crate::cache::{self, AnalysisCache};
use crate::capital_flow::{CapitalFlowAnalysis, FlowMatrix, SinkWeight};
use crate::lead_lag::LeadLagAnalysis;
use crate::matrix::{CorrelationAnalysis, NamedSeries};
use crate::metrics::{PriceMetrics, SentimentMetrics, VolumeChange, VolumeMetrics};
use eco_corr_core::{
    AnalysisConfig, AppConfig, BlendWeights, CorrelationError, MarketDataProvider, Metric,
    Result, SentimentProvider, TimeSeries,
};
use std::sync::Arc;

// ============================================================================
// Options
// ============================================================================

/// Options for the correlation operations.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationOptions {
    pub timeframe: String,
    pub metric: Metric,
    pub min_correlation: f64,
}

impl CorrelationOptions {
    /// `30d`, combined metric, threshold 0.5.
    #[must_use]
    pub fn ecosystem_defaults() -> Self {
        Self {
            timeframe: "30d".to_string(),
            metric: Metric::Combined,
            min_correlation: 0.5,
        }
    }

    /// `30d`, price metric, threshold 0.5.
    #[must_use]
    pub fn asset_defaults() -> Self {
        Self {
            metric: Metric::Price,
            ..Self::ecosystem_defaults()
        }
    }

    #[must_use]
    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = timeframe.into();
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    #[must_use]
    pub fn with_min_correlation(mut self, min_correlation: f64) -> Self {
        self.min_correlation = min_correlation;
        self
    }
}

/// Options for lead-lag detection.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadLagOptions {
    pub timeframe: String,
    pub interval: String,
    pub metric: Metric,
    pub lag_max: u32,
}

impl Default for LeadLagOptions {
    fn default() -> Self {
        Self {
            timeframe: "90d".to_string(),
            interval: "1d".to_string(),
            metric: Metric::Price,
            lag_max: 14,
        }
    }
}

/// Options for capital-flow estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct CapitalFlowOptions {
    pub timeframe: String,
    pub min_flow_percentage: f64,
}

impl Default for CapitalFlowOptions {
    fn default() -> Self {
        Self {
            timeframe: "14d".to_string(),
            min_flow_percentage: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Ecosystem,
    Asset,
}

fn owned_list<S: AsRef<str>>(entities: &[S]) -> Vec<String> {
    entities.iter().map(|e| e.as_ref().to_string()).collect()
}

// ============================================================================
// Facade
// ============================================================================

/// Cross-ecosystem correlation engine.
pub struct EcosystemCorrelator {
    cache: Arc<AnalysisCache>,
    price: PriceMetrics,
    volume: VolumeMetrics,
    sentiment: Option<SentimentMetrics>,
    blend: BlendWeights,
}

impl EcosystemCorrelator {
    /// Wires the normalizers to one shared cache.
    ///
    /// # Errors
    /// `Config` if the blend weights are outside `[0, 1]`.
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        sentiment: Option<Arc<dyn SentimentProvider>>,
        cache: Arc<AnalysisCache>,
        config: AnalysisConfig,
    ) -> Result<Self> {
        config.blend.validate()?;

        let sentiment = sentiment.map(|provider| {
            SentimentMetrics::new(
                provider,
                Arc::clone(&market),
                Arc::clone(&cache),
                config.clone(),
            )
        });

        Ok(Self {
            price: PriceMetrics::new(Arc::clone(&market), Arc::clone(&cache), config.clone()),
            volume: VolumeMetrics::new(market, Arc::clone(&cache), config.clone()),
            sentiment,
            blend: config.blend,
            cache,
        })
    }

    /// Builds the cache from `config.cache` and wires the analyzers.
    ///
    /// # Errors
    /// Same as [`Self::new`].
    pub fn from_config(
        config: &AppConfig,
        market: Arc<dyn MarketDataProvider>,
        sentiment: Option<Arc<dyn SentimentProvider>>,
    ) -> Result<Self> {
        let cache = Arc::new(AnalysisCache::from_config(&config.cache));
        Self::new(market, sentiment, cache, config.analysis.clone())
    }

    /// The cache shared by every analyzer.
    #[must_use]
    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    #[must_use]
    pub fn price(&self) -> &PriceMetrics {
        &self.price
    }

    #[must_use]
    pub fn volume(&self) -> &VolumeMetrics {
        &self.volume
    }

    #[must_use]
    pub fn sentiment(&self) -> Option<&SentimentMetrics> {
        self.sentiment.as_ref()
    }

    // =========================================================================
    // Correlations
    // =========================================================================

    /// Pairwise correlation across ecosystems.
    ///
    /// # Errors
    /// Any series failure for any ecosystem, or `MissingCapability` when the
    /// sentiment metric is requested without a sentiment provider.
    pub async fn ecosystem_correlations<S: AsRef<str>>(
        &self,
        ecosystems: &[S],
        options: &CorrelationOptions,
    ) -> Result<Arc<CorrelationAnalysis>> {
        self.correlations(Scope::Ecosystem, &owned_list(ecosystems), options)
            .await
    }

    /// Pairwise correlation across individual assets.
    ///
    /// # Errors
    /// Same as [`Self::ecosystem_correlations`].
    pub async fn asset_correlations<S: AsRef<str>>(
        &self,
        assets: &[S],
        options: &CorrelationOptions,
    ) -> Result<Arc<CorrelationAnalysis>> {
        self.correlations(Scope::Asset, &owned_list(assets), options)
            .await
    }

    async fn correlations(
        &self,
        scope: Scope,
        entities: &[String],
        options: &CorrelationOptions,
    ) -> Result<Arc<CorrelationAnalysis>> {
        let prefix = match scope {
            Scope::Ecosystem => "ecosystem_correlations",
            Scope::Asset => "asset_correlations",
        };
        let key = format!(
            "{prefix}_{}_{}_{}_{}",
            entities.join("-"),
            options.timeframe,
            options.metric,
            options.min_correlation
        );
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return Ok(hit);
        }

        tracing::debug!(
            operation = prefix,
            entities = ?entities,
            timeframe = %options.timeframe,
            metric = %options.metric,
            "computing correlations"
        );

        let result: Result<CorrelationAnalysis> = async {
            let mut data = NamedSeries::new();
            for entity in entities {
                let series = self
                    .daily_series(scope, entity, options.metric, &options.timeframe)
                    .await?;
                data.insert(entity.clone(), series.as_ref().clone());
            }
            Ok::<_, CorrelationError>(CorrelationAnalysis::from_series(
                &data,
                options.min_correlation,
                options.metric,
                options.timeframe.clone(),
            ))
        }
        .await;

        match result {
            Ok(analysis) => Ok(cache::store(&self.cache, key, analysis)),
            Err(e) => {
                tracing::error!(
                    operation = prefix,
                    entities = ?entities,
                    timeframe = %options.timeframe,
                    metric = %options.metric,
                    error = %e,
                    "correlation analysis failed"
                );
                Err(e)
            }
        }
    }

    // =========================================================================
    // Lead-lag
    // =========================================================================

    /// Optimal lag for every ordered pair of ecosystems.
    ///
    /// # Errors
    /// `UnsupportedMetric` for the combined metric, `MissingCapability` for
    /// sentiment without a provider, and any series failure.
    pub async fn lead_lag_relationships<S: AsRef<str>>(
        &self,
        ecosystems: &[S],
        options: &LeadLagOptions,
    ) -> Result<Arc<LeadLagAnalysis>> {
        let ecosystems = owned_list(ecosystems);
        let key = format!(
            "lead_lag_{}_{}_{}_{}_{}",
            ecosystems.join("-"),
            options.timeframe,
            options.interval,
            options.metric,
            options.lag_max
        );
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return Ok(hit);
        }

        let result: Result<LeadLagAnalysis> = async {
            let mut data = NamedSeries::new();
            for ecosystem in &ecosystems {
                let series = self
                    .interval_series(
                        ecosystem,
                        options.metric,
                        &options.timeframe,
                        &options.interval,
                    )
                    .await?;
                data.insert(ecosystem.clone(), series.as_ref().clone());
            }
            Ok::<_, CorrelationError>(LeadLagAnalysis::from_series(
                &data,
                options.lag_max,
                options.metric,
                options.timeframe.clone(),
            ))
        }
        .await;

        match result {
            Ok(analysis) => Ok(cache::store(&self.cache, key, analysis)),
            Err(e) => {
                tracing::error!(
                    operation = "lead_lag_relationships",
                    ecosystems = ?ecosystems,
                    timeframe = %options.timeframe,
                    interval = %options.interval,
                    metric = %options.metric,
                    error = %e,
                    "lead-lag analysis failed"
                );
                Err(e)
            }
        }
    }

    // =========================================================================
    // Capital flows
    // =========================================================================

    /// Estimates capital moving from ecosystems with falling volume to those
    /// with rising volume.
    ///
    /// # Errors
    /// Any volume-change failure. Correlation lookup failures degrade to zero
    /// correlations instead.
    pub async fn capital_flows<S: AsRef<str>>(
        &self,
        ecosystems: &[S],
        options: &CapitalFlowOptions,
    ) -> Result<Arc<CapitalFlowAnalysis>> {
        let ecosystems = owned_list(ecosystems);
        let key = format!(
            "capital_flows_{}_{}_{}",
            ecosystems.join("-"),
            options.timeframe,
            options.min_flow_percentage
        );
        if let Some(hit) = cache::lookup(&self.cache, &key) {
            return Ok(hit);
        }

        match self.estimate_flows(&ecosystems, options).await {
            Ok(analysis) => Ok(cache::store(&self.cache, key, analysis)),
            Err(e) => {
                tracing::error!(
                    operation = "capital_flows",
                    ecosystems = ?ecosystems,
                    timeframe = %options.timeframe,
                    error = %e,
                    "capital flow analysis failed"
                );
                Err(e)
            }
        }
    }

    async fn estimate_flows(
        &self,
        ecosystems: &[String],
        options: &CapitalFlowOptions,
    ) -> Result<CapitalFlowAnalysis> {
        let mut changes: Vec<VolumeChange> = Vec::with_capacity(ecosystems.len());
        for ecosystem in ecosystems {
            let change = self
                .volume
                .ecosystem_volume_change(ecosystem, &options.timeframe)
                .await?;
            changes.push(change.as_ref().clone());
        }

        let sink_indices: Vec<usize> = changes
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_gain())
            .map(|(i, _)| i)
            .collect();

        let mut flows = FlowMatrix::new(ecosystems.to_vec());
        for (source, change) in changes.iter().enumerate() {
            if !change.is_loss() {
                continue;
            }

            let sinks = if sink_indices.is_empty() {
                Vec::new()
            } else {
                let sink_names: Vec<&str> =
                    sink_indices.iter().map(|&j| ecosystems[j].as_str()).collect();
                let correlations = self
                    .source_correlations(&ecosystems[source], &sink_names, &options.timeframe)
                    .await;
                sink_indices
                    .iter()
                    .zip(correlations)
                    .map(|(&j, correlation)| {
                        (
                            j,
                            SinkWeight {
                                correlation,
                                gain: changes[j].change,
                            },
                        )
                    })
                    .collect()
            };

            flows.record_loss(source, change.change.abs(), &sinks);
        }

        Ok(flows.into_analysis(&changes, options.min_flow_percentage, options.timeframe.clone()))
    }

    /// Combined-metric correlation of `source` with each sink, in sink order.
    ///
    /// Any failure degrades to all-zero correlations.
    async fn source_correlations(&self, source: &str, sinks: &[&str], timeframe: &str) -> Vec<f64> {
        let mut entities = Vec::with_capacity(sinks.len() + 1);
        entities.push(source);
        entities.extend_from_slice(sinks);

        let options = CorrelationOptions::ecosystem_defaults()
            .with_timeframe(timeframe)
            .with_min_correlation(0.0);

        match self.ecosystem_correlations(&entities, &options).await {
            Ok(analysis) => sinks
                .iter()
                .map(|sink| analysis.correlation(source, sink).unwrap_or(0.0))
                .collect(),
            Err(e) => {
                tracing::warn!(
                    source,
                    error = %e,
                    "correlation lookup failed, weighting sinks by gain alone"
                );
                vec![0.0; sinks.len()]
            }
        }
    }

    // =========================================================================
    // Series selection
    // =========================================================================

    fn require_sentiment(&self) -> Result<&SentimentMetrics> {
        self.sentiment.as_ref().ok_or_else(|| {
            CorrelationError::MissingCapability(
                "sentiment metric requires a sentiment provider".to_string(),
            )
        })
    }

    async fn daily_series(
        &self,
        scope: Scope,
        entity: &str,
        metric: Metric,
        timeframe: &str,
    ) -> Result<Arc<TimeSeries>> {
        match (scope, metric) {
            (Scope::Ecosystem, Metric::Price) => {
                self.price.ecosystem_price_data(entity, timeframe).await
            }
            (Scope::Asset, Metric::Price) => self.price.asset_price_data(entity, timeframe).await,
            (Scope::Ecosystem, Metric::Volume) => {
                self.volume.ecosystem_volume_data(entity, timeframe).await
            }
            (Scope::Asset, Metric::Volume) => {
                self.volume.asset_volume_data(entity, timeframe).await
            }
            (Scope::Ecosystem, Metric::Sentiment) => Ok(self
                .require_sentiment()?
                .ecosystem_sentiment_data(entity, timeframe)
                .await),
            (Scope::Asset, Metric::Sentiment) => Ok(self
                .require_sentiment()?
                .asset_sentiment_data(entity, timeframe)
                .await),
            (_, Metric::Combined) => self.combined_series(scope, entity, timeframe).await,
        }
    }

    async fn combined_series(
        &self,
        scope: Scope,
        entity: &str,
        timeframe: &str,
    ) -> Result<Arc<TimeSeries>> {
        let blended = match scope {
            Scope::Ecosystem => {
                let price = self.price.ecosystem_price_data(entity, timeframe).await?;
                let volume = self.volume.ecosystem_volume_data(entity, timeframe).await?;
                let sentiment = match &self.sentiment {
                    Some(s) => Some(s.ecosystem_sentiment_data(entity, timeframe).await),
                    None => None,
                };
                let sentiment = sentiment.as_deref().map(TimeSeries::as_slice);
                combine_ecosystem(&price, &volume, sentiment, &self.blend)
            }
            Scope::Asset => {
                let price = self.price.asset_price_data(entity, timeframe).await?;
                let volume = self.volume.asset_volume_data(entity, timeframe).await?;
                let sentiment = match &self.sentiment {
                    Some(s) => Some(s.asset_sentiment_data(entity, timeframe).await),
                    None => None,
                };
                let sentiment = sentiment.as_deref().map(TimeSeries::as_slice);
                combine_asset(&price, &volume, sentiment, &self.blend)
            }
        };
        Ok(Arc::new(blended))
    }

    async fn interval_series(
        &self,
        ecosystem: &str,
        metric: Metric,
        timeframe: &str,
        interval: &str,
    ) -> Result<Arc<TimeSeries>> {
        match metric {
            Metric::Price => {
                self.price
                    .ecosystem_price_time_series(ecosystem, timeframe, interval)
                    .await
            }
            Metric::Volume => {
                self.volume
                    .ecosystem_volume_time_series(ecosystem, timeframe, interval)
                    .await
            }
            Metric::Sentiment => Ok(self
                .require_sentiment()?
                .ecosystem_sentiment_time_series(ecosystem, timeframe, interval)
                .await),
            Metric::Combined => Err(CorrelationError::unsupported_metric(
                metric.as_str(),
                "lead_lag_relationships",
            )),
        }
    }
}
