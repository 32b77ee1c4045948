//! Core traits for the synchronization engine.

mod clock;
mod exchange;
mod presenter;
mod signal;

pub use clock::{AnchoredClock, Clock, ManualClock, SystemClock};
pub use exchange::ExchangeAdapter;
pub use presenter::{ChartUpdate, NullPresenter, Presenter};
pub use signal::SignalGenerator;
