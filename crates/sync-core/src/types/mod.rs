//! Core data types for the synchronization engine.

mod candle;
mod exchange;
mod request;
mod signal;
mod ticker;
mod timeframe;

pub use candle::{Candle, CandleSeries};
pub use exchange::{ApiPlan, ExchangeProfile, ExchangeTier, OperationClass, HTF_LIMIT_RANGE};
pub use request::{FetchRequest, Symbol};
pub use signal::{SignalResult, SignalStrength, SignalType, SignalVariant};
pub use ticker::Ticker;
pub use timeframe::{GranularityMap, Timeframe};
