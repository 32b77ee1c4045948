//! Logging setup and console presentation.

mod console;
mod logging;

pub use console::{format_chart_line, format_ticker_line, ConsolePresenter};
pub use logging::setup_logging;
