//! Typed views over the shared TTL cache.
//!
//! One cache instance stores every memoized value; each stored value is an
//! immutable `Arc` tagged with its kind.

use crate::capital_flow::CapitalFlowAnalysis;
use crate::lead_lag::LeadLagAnalysis;
use crate::matrix::CorrelationAnalysis;
use crate::metrics::VolumeChange;
use eco_corr_core::{TimeSeries, TtlCache};
use std::sync::Arc;

/// A memoized value.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Series(Arc<TimeSeries>),
    VolumeChange(Arc<VolumeChange>),
    Correlations(Arc<CorrelationAnalysis>),
    LeadLag(Arc<LeadLagAnalysis>),
    CapitalFlows(Arc<CapitalFlowAnalysis>),
}

/// The cache shared by the facade and every normalizer.
pub type AnalysisCache = TtlCache<CacheValue>;

/// Types that can be stored in an [`AnalysisCache`].
pub trait Cacheable: Sized {
    fn into_cache_value(value: Arc<Self>) -> CacheValue;
    fn from_cache_value(value: CacheValue) -> Option<Arc<Self>>;
}

macro_rules! cacheable {
    ($ty:ty, $variant:ident) => {
        impl Cacheable for $ty {
            fn into_cache_value(value: Arc<Self>) -> CacheValue {
                CacheValue::$variant(value)
            }

            fn from_cache_value(value: CacheValue) -> Option<Arc<Self>> {
                match value {
                    CacheValue::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

cacheable!(TimeSeries, Series);
cacheable!(VolumeChange, VolumeChange);
cacheable!(CorrelationAnalysis, Correlations);
cacheable!(LeadLagAnalysis, LeadLag);
cacheable!(CapitalFlowAnalysis, CapitalFlows);

/// Reads a typed value; a key holding a different kind reads as absent.
pub fn lookup<T: Cacheable>(cache: &AnalysisCache, key: &str) -> Option<Arc<T>> {
    let hit = cache.get(key).and_then(T::from_cache_value);
    if hit.is_some() {
        tracing::debug!(key, "cache hit");
    }
    hit
}

/// Stores a typed value and returns the shared handle.
pub fn store<T: Cacheable>(cache: &AnalysisCache, key: impl Into<String>, value: T) -> Arc<T> {
    let value = Arc::new(value);
    cache.set(key, T::into_cache_value(Arc::clone(&value)));
    value
}
