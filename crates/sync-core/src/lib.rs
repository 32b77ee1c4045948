//! Core types and traits for candle synchronization.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Candle, CandleSeries, Ticker)
//! - Request and signal types (FetchRequest, SignalResult)
//! - Exchange profiles and granularity maps
//! - Core traits for exchange adapters, signal generators, presenters and clocks

pub mod types;
pub mod traits;
pub mod error;

pub use error::{SyncError, SyncResult};
pub use types::*;
pub use traits::*;
