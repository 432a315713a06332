// Quick Start: Metropolis Monte Carlo and MD for Lennard-Jones particles
//
// Runs a short Monte Carlo sampling and a short dynamics run on the same
// 32-particle box, once on the CPU backend and once on the threaded
// accelerator stand-in.
// Run with: cargo run --example lj_quickstart

use ljmd::backend::ThreadedDevice;
use ljmd::config::{DynamicsConfig, MonteCarloConfig};
use ljmd::{
    AcceleratorBackend, CpuBackend, LennardJones, MolecularDynamics, MonteCarlo, ParticleSystem,
    PeriodicBox,
};
use nalgebra::Vector3;

fn lattice(start: f64, spacing: f64, box_size: f64, n: usize) -> Vec<Vector3<f64>> {
    let mut axis = Vec::new();
    let mut c = start;
    while c < box_size - start {
        axis.push(c);
        c += spacing;
    }
    itertools::iproduct!(&axis, &axis, &axis)
        .take(n)
        .map(|(&x, &y, &z)| Vector3::new(x, y, z))
        .collect()
}

fn main() -> ljmd::Result<()> {
    println!("LJ Quick Start Example\n");

    let pbox = PeriodicBox::new(6.0, 3.0)?;
    let model = LennardJones::reduced(3.0);
    println!("System setup:");
    println!("  Box edge: {} σ, cutoff: {} σ", pbox.length(), pbox.cutoff());
    println!("  Shift U(rc): {:.6e} ε\n", model.shift());

    // Monte Carlo on the CPU pool
    let system = ParticleSystem::new(lattice(1.1, 1.2, 6.0, 32), 6.0)?;
    let params = MonteCarloConfig {
        max_trials: 2_000,
        seed: Some(1),
        ..Default::default()
    };
    let mut mc = MonteCarlo::new(system, CpuBackend::new(pbox, model, None)?, &params);
    let summary = mc.run()?;
    println!("Monte Carlo (cpu, {} trials):", summary.trials);
    println!("  E/N = {:.6}", summary.energy_per_particle);
    println!("  acceptance = {:.1}%", 100.0 * summary.acceptance_ratio);
    println!("  amplitude = {:.3e}\n", summary.final_amplitude);

    // Dynamics on the accelerator stand-in
    let system = ParticleSystem::new(lattice(0.5, 1.5, 6.0, 32), 6.0)?;
    let device = ThreadedDevice::spawn().map_err(ljmd::BackendError::from)?;
    let params = DynamicsConfig {
        total_steps: 2_000,
        report_interval: Some(500),
        ..Default::default()
    };
    let mut md = MolecularDynamics::new(system, AcceleratorBackend::new(device, pbox, model), &params);
    let summary = md.run()?;
    println!("Molecular dynamics (accelerator, {} steps):", summary.steps);
    for sample in md.history() {
        println!(
            "  step {:>5}: E/N = {:.6}, T = {:.4}",
            sample.step, sample.potential, sample.temperature
        );
    }
    if let Some(kernel) = summary.kernel_time {
        println!("  kernel time: {:.3} ms", kernel.as_secs_f64() * 1000.0);
    }

    Ok(())
}
