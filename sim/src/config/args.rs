//! Command-line argument parsing for LJ simulation runs

use clap::{ArgAction, Parser, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    MonteCarlo,
    MolecularDynamics,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Cpu,
    Accelerator,
}

/// Lennard-Jones Monte Carlo / molecular dynamics with YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// More log detail (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Override sampling method
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    /// Override compute backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Worker threads for the CPU backend
    #[arg(long)]
    pub threads: Option<usize>,

    /// Override number of particles
    #[arg(long)]
    pub n_particles: Option<usize>,

    /// Override box edge length
    #[arg(long)]
    pub box_size: Option<f64>,

    /// Override LJ cutoff radius
    #[arg(long)]
    pub cutoff: Option<f64>,

    /// Override Monte Carlo temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Override initial trial amplitude
    #[arg(long)]
    pub amplitude: Option<f64>,

    /// Override accepted-move ceiling
    #[arg(long)]
    pub max_accepted: Option<usize>,

    /// Override trial ceiling
    #[arg(long)]
    pub max_trials: Option<usize>,

    /// Override MD time step
    #[arg(long)]
    pub time_step: Option<f64>,

    /// Override number of MD steps
    #[arg(long)]
    pub total_steps: Option<usize>,

    /// Override MD energy report interval
    #[arg(long)]
    pub report_interval: Option<usize>,

    /// Random seed for Monte Carlo trial moves
    #[arg(long)]
    pub seed: Option<u64>,
}
