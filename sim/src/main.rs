//! LJ Simulation Command-Line Interface
//!
//! Loads a YAML run configuration, applies command-line overrides and drives
//! either the Monte Carlo or the molecular dynamics engine.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use ljmd::backend::{self, ComputeBackend};
use ljmd::config::{Method, SimConfig};
use ljmd::{MolecularDynamics, MonteCarlo, ParticleSystem};
use tracing::info;

mod config;
mod io;

use config::{apply_overrides, Args};
use io::{report_dynamics, report_monte_carlo, setup_output};

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_output(args.output.as_ref(), args.verbose);

    // Load and parse configuration
    info!("Reading configuration from: {}", args.config_file);
    let mut config = SimConfig::parse_file(&args.config_file)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", args.config_file))?;
    apply_overrides(&mut config, &args);
    config.validate().wrap_err("Invalid configuration")?;
    info!("Configuration loaded:\n{:?}", config);

    let system = config
        .build_system()
        .wrap_err("Unable to set up the initial configuration")?;
    let backend = backend::from_config(
        &config.backend,
        config.periodic_box()?,
        config.potential_model(),
    )
    .wrap_err("Unable to start the compute backend")?;
    info!("Using {} backend for {} particles", backend.name(), system.len());

    match config.method {
        Method::MonteCarlo => run_monte_carlo(&config, system, backend),
        Method::MolecularDynamics => run_dynamics(&config, system, backend),
    }
}

fn run_monte_carlo<B: ComputeBackend>(
    config: &SimConfig,
    system: ParticleSystem,
    backend: B,
) -> Result<()> {
    let mut mc = MonteCarlo::new(system, backend, &config.monte_carlo);
    let summary = mc.run().wrap_err("Monte Carlo run aborted")?;
    report_monte_carlo(&summary);
    Ok(())
}

fn run_dynamics<B: ComputeBackend>(
    config: &SimConfig,
    system: ParticleSystem,
    backend: B,
) -> Result<()> {
    let mut md = MolecularDynamics::new(system, backend, &config.dynamics)
        .with_report_interval(config.report_interval());
    let summary = md.run().wrap_err("Molecular dynamics run aborted")?;
    report_dynamics(&summary);
    Ok(())
}
