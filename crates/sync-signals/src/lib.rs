//! Signal generators.
//!
//! This crate provides the two interchangeable generator variants:
//! - Trend (EMA crossover with RSI momentum confirmation)
//! - Structure (swing breaks with volume confirmation)
//!
//! plus the [`SignalPipeline`] that dispatches on [`sync_core::SignalVariant`].

pub mod indicators;
mod pipeline;
mod registry;
mod structure;
mod trend;

pub use indicators::{Ema, Indicator, Rsi};
pub use pipeline::SignalPipeline;
pub use registry::{SignalInfo, SignalRegistry};
pub use structure::{StructureConfig, StructureSignal};
pub use trend::{TrendConfig, TrendSignal};
