use std::path::PathBuf;

use approx::assert_relative_eq;
use ljmd::backend::{self, ComputeBackend, EvalKind};
use ljmd::config::{BackendConfig, Method, SimConfig};
use ljmd::{MolecularDynamics, MonteCarlo};

fn reference_config(name: &str) -> SimConfig {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "..", "sim", "example", name]
        .iter()
        .collect();
    SimConfig::from_file(path).unwrap()
}

fn mc_config() -> SimConfig {
    let yaml = r#"
method: monte_carlo
system:
  n_particles: 32
  box_size: 6.0
  lattice: { start: 1.1, spacing: 1.2 }
potential: { type: lennard_jones, epsilon: 1.0, sigma: 1.0, cutoff: 3.0 }
backend: { type: cpu, threads: 4 }
monte_carlo:
  temperature: 1.3
  initial_amplitude: 0.005
  max_accepted: 20000
  max_trials: 400
  seed: 2024
"#;
    let config: SimConfig = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();
    config
}

fn run_mc(config: &SimConfig) -> (ljmd::McSummary, usize) {
    let system = config.build_system().unwrap();
    let backend =
        backend::from_config(&config.backend, config.periodic_box().unwrap(), config.potential_model())
            .unwrap();
    let mut mc = MonteCarlo::new(system, backend, &config.monte_carlo);
    let summary = mc.run().unwrap();
    (summary, mc.history().len())
}

#[test]
fn short_monte_carlo_run_on_cpu() {
    let (summary, recorded) = run_mc(&mc_config());
    assert!(summary.energy_per_particle.is_finite());
    assert!(summary.trials == 400 || summary.accepted == 20000);
    assert_eq!(recorded, summary.accepted);
    assert!(summary.best_energy <= summary.energy_per_particle * 32.0 + 1e-12);
    assert!(summary.kernel_time.is_none());
}

#[test]
fn short_monte_carlo_run_on_accelerator() {
    let mut config = mc_config();
    config.backend = BackendConfig::Accelerator { timeout_secs: 30 };
    let (summary, recorded) = run_mc(&config);
    assert!(summary.energy_per_particle.is_finite());
    assert_eq!(summary.trials, 400);
    assert_eq!(recorded, summary.accepted);
    assert!(summary.kernel_time.is_some());
}

#[test]
fn backends_agree_on_the_starting_lattice() {
    let config = mc_config();
    let positions = config.generate_positions().unwrap();
    let pbox = config.periodic_box().unwrap();
    let model = config.potential_model();

    let mut cpu = backend::from_config(&BackendConfig::Cpu { threads: Some(3) }, pbox, model).unwrap();
    let mut accel =
        backend::from_config(&BackendConfig::Accelerator { timeout_secs: 30 }, pbox, model).unwrap();

    let a = cpu.evaluate(&positions, EvalKind::EnergyAndForces).unwrap();
    let b = accel.evaluate(&positions, EvalKind::EnergyAndForces).unwrap();
    assert_relative_eq!(a.total_energy(), b.total_energy(), max_relative = 1e-4);
    assert_relative_eq!(a.total_energy(), a.upper_triangle_energy(), epsilon = 1e-9);

    for (fa, fb) in a.net_forces().unwrap().iter().zip(&b.net_forces().unwrap()) {
        assert_relative_eq!(*fa, *fb, epsilon = 1e-3, max_relative = 1e-3);
    }
}

#[test]
fn short_dynamics_run_reports_energy() {
    let mut config = reference_config("md_cpu.yaml");
    config.dynamics.total_steps = 200;
    config.dynamics.report_interval = Some(50);

    let system = config.build_system().unwrap();
    let backend =
        backend::from_config(&config.backend, config.periodic_box().unwrap(), config.potential_model())
            .unwrap();
    let mut md = MolecularDynamics::new(system, backend, &config.dynamics)
        .with_report_interval(config.report_interval());
    let summary = md.run().unwrap();

    assert_eq!(summary.steps, 200);
    assert_eq!(summary.samples, 4);
    assert!(summary.energy_per_particle.is_finite());
    assert!(summary.temperature.is_finite());
    assert!(md.history().iter().all(|s| s.potential.is_finite()));
}

#[test]
fn dynamics_trajectories_match_across_backends() {
    let mut config = reference_config("md_cpu.yaml");
    config.dynamics.total_steps = 20;

    let run = |backend_config: BackendConfig| {
        let backend = backend::from_config(
            &backend_config,
            config.periodic_box().unwrap(),
            config.potential_model(),
        )
        .unwrap();
        let mut md = MolecularDynamics::new(config.build_system().unwrap(), backend, &config.dynamics);
        md.run().unwrap();
        md.system().snapshot()
    };

    let cpu = run(BackendConfig::Cpu { threads: None });
    let accel = run(BackendConfig::Accelerator { timeout_secs: 30 });
    for (p, q) in cpu.iter().zip(&accel) {
        assert_relative_eq!(*p, *q, epsilon = 1e-6);
    }
}

#[test]
fn reference_configurations_load() {
    let mc = reference_config("mc_cpu.yaml");
    assert_eq!(mc.method, Method::MonteCarlo);
    assert_eq!(mc.system.n_particles, 32);

    let accel = reference_config("mc_accelerator.yaml");
    assert!(matches!(accel.backend, BackendConfig::Accelerator { .. }));
    assert_eq!(accel.report_interval(), 500);

    let md = reference_config("md_cpu.yaml");
    assert_eq!(md.method, Method::MolecularDynamics);
    assert_eq!(md.report_interval(), 1000);
}

/// N = 32, rc = 3, L = 6, T = 1.3 until 40000 trials or 20000 accepted moves.
#[test]
#[ignore = "full-length reference run"]
fn reference_monte_carlo_scenario() {
    let config = reference_config("mc_cpu.yaml");
    let (summary, recorded) = run_mc(&config);
    assert!(summary.energy_per_particle.is_finite());
    assert!(summary.trials == 40_000 || summary.accepted == 20_000);
    assert_eq!(recorded, summary.accepted);
}
