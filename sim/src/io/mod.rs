//! Logging setup and run reports

mod output;

pub use output::{report_dynamics, report_monte_carlo, setup_output};
