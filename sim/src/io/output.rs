//! Output formatting and logging utilities

use ljmd::{McSummary, MdSummary};
use std::fmt;
use std::fs::File;
use std::time::SystemTime as StdSystemTime;
use tracing::info;
use tracing_subscriber::{
    filter::LevelFilter, fmt::format::Writer, fmt::layer, fmt::time::FormatTime,
    layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

/// Custom time formatter that shows only seconds
struct SecondPrecisionTimer;

impl FormatTime for SecondPrecisionTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let now = StdSystemTime::now();
        let duration = now
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();

        // Format as HH:MM:SS (only seconds precision)
        let total_seconds = duration.as_secs();
        let hours = (total_seconds / 3600) % 24;
        let minutes = (total_seconds / 60) % 60;
        let seconds = total_seconds % 60;

        write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

pub fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Setup output logging to file or stdout
pub fn setup_output(output_path: Option<&String>, verbose: u8) {
    let level = level_for(verbose);
    match output_path {
        Some(path) => {
            if let Ok(log) = File::create(path) {
                let file_layer = layer()
                    .with_writer(log)
                    .with_timer(SecondPrecisionTimer)
                    .with_ansi(false)
                    .with_filter(level);
                Registry::default().with(file_layer).init();
                info!("Output will be written to: {}", path);
            } else {
                eprintln!("Could not create output file: {}", path);
            }
        }
        None => {
            // Initialize tracing for stdout
            let stdout_layer = layer()
                .with_writer(std::io::stdout)
                .with_timer(SecondPrecisionTimer)
                .with_ansi(true)
                .with_filter(level);
            Registry::default().with(stdout_layer).init();
            info!("Output will be printed to stdout");
        }
    }
}

pub fn report_monte_carlo(summary: &McSummary) {
    info!("\nMonte Carlo finished.");
    info!("  Energy per particle: {:.8}", summary.energy_per_particle);
    info!("  Best total energy:   {:.8}", summary.best_energy);
    info!(
        "  Accepted moves:      {} of {} ({:.2}%)",
        summary.accepted,
        summary.trials,
        100.0 * summary.acceptance_ratio
    );
    info!("  Final amplitude:     {:.6e}", summary.final_amplitude);
    report_timing(summary.elapsed, summary.kernel_time);
}

pub fn report_dynamics(summary: &MdSummary) {
    info!("\nMolecular dynamics finished.");
    info!("  Steps:               {}", summary.steps);
    info!("  Energy per particle: {:.8}", summary.energy_per_particle);
    info!("  Temperature:         {:.6}", summary.temperature);
    info!("  Energy reports:      {}", summary.samples);
    report_timing(summary.elapsed, summary.kernel_time);
}

fn report_timing(elapsed: std::time::Duration, kernel_time: Option<std::time::Duration>) {
    info!("  Total execution time: {:.3} s", elapsed.as_secs_f64());
    if let Some(kernel) = kernel_time {
        info!(
            "  Kernel execution time: {:.3} ms",
            kernel.as_secs_f64() * 1000.0
        );
    }
}
