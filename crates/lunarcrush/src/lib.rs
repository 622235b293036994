//! LunarCrush provider for ecosystem correlation analysis.
//!
//! This crate provides:
//! - REST client with rate limiting for the LunarCrush public API
//! - `MarketDataProvider` over coin time series and category listings
//! - `SentimentProvider` over galaxy scores
//!
//! # API Endpoints
//!
//! - `GET /coins/{symbol}/time-series` - Price, volume, and galaxy score buckets
//! - `GET /coins/{symbol}` - Current coin snapshot
//! - `GET /category/{category}/coins` - Category constituents by market cap

pub mod client;
pub mod error;

pub use client::{CoinSnapshot, LunarCrushClient, LunarCrushConfig, LUNARCRUSH_API_URL};
pub use error::{LunarCrushError, Result};
