//! Configuration loading and command-line overrides

mod args;

pub use args::{Args, BackendArg, MethodArg};

use ljmd::config::{BackendConfig, Method, PotentialConfig, SimConfig};
use tracing::info;

/// Apply every override given on the command line. Validation happens after.
pub fn apply_overrides(config: &mut SimConfig, args: &Args) {
    if let Some(method) = args.method {
        info!("Overriding method with: {:?}", method);
        config.method = match method {
            MethodArg::MonteCarlo => Method::MonteCarlo,
            MethodArg::MolecularDynamics => Method::MolecularDynamics,
        };
    }

    if let Some(backend) = args.backend {
        info!("Overriding backend with: {:?}", backend);
        config.backend = match (backend, &config.backend) {
            (BackendArg::Cpu, BackendConfig::Cpu { threads }) => BackendConfig::Cpu { threads: *threads },
            (BackendArg::Cpu, _) => BackendConfig::Cpu { threads: None },
            (BackendArg::Accelerator, BackendConfig::Accelerator { timeout_secs }) => {
                BackendConfig::Accelerator {
                    timeout_secs: *timeout_secs,
                }
            }
            (BackendArg::Accelerator, _) => BackendConfig::Accelerator { timeout_secs: 30 },
        };
    }
    if let Some(n) = args.threads {
        match &mut config.backend {
            BackendConfig::Cpu { threads } => {
                info!("Overriding CPU threads with: {}", n);
                *threads = Some(n);
            }
            BackendConfig::Accelerator { .. } => {
                info!("Ignoring --threads for the accelerator backend");
            }
        }
    }

    if let Some(n) = args.n_particles {
        info!("Overriding n_particles with: {}", n);
        config.system.n_particles = n;
    }
    if let Some(l) = args.box_size {
        info!("Overriding box_size with: {}", l);
        config.system.box_size = l;
    }
    if let Some(rc) = args.cutoff {
        info!("Overriding cutoff with: {}", rc);
        let PotentialConfig::LennardJones { cutoff, .. } = &mut config.potential;
        *cutoff = rc;
    }

    let mc = &mut config.monte_carlo;
    if let Some(t) = args.temperature {
        info!("Overriding temperature with: {}", t);
        mc.temperature = t;
    }
    if let Some(a) = args.amplitude {
        info!("Overriding initial amplitude with: {}", a);
        mc.initial_amplitude = a;
    }
    if let Some(n) = args.max_accepted {
        info!("Overriding max_accepted with: {}", n);
        mc.max_accepted = n;
    }
    if let Some(n) = args.max_trials {
        info!("Overriding max_trials with: {}", n);
        mc.max_trials = n;
    }
    if let Some(seed) = args.seed {
        info!("Overriding seed with: {}", seed);
        mc.seed = Some(seed);
    }

    let md = &mut config.dynamics;
    if let Some(dt) = args.time_step {
        info!("Overriding time_step with: {}", dt);
        md.time_step = dt;
    }
    if let Some(n) = args.total_steps {
        info!("Overriding total_steps with: {}", n);
        md.total_steps = n;
    }
    if let Some(n) = args.report_interval {
        info!("Overriding report_interval with: {}", n);
        md.report_interval = Some(n);
    }
}
