use std::time::{Duration, Instant};

use itertools::izip;
use tracing::{debug, info};

use crate::backend::{ComputeBackend, EvalKind};
use crate::config::DynamicsConfig;
use crate::error::{BackendError, Result};
use crate::history::{EnergySample, RunHistory};
use crate::particles::ParticleSystem;

pub trait Integrator {
    /// Advance the system by dt
    fn step(&mut self, dt: f64) -> Result<()>;

    /// Compute the instantaneous temperature
    fn temperature(&self) -> f64;
}

/// Result of a finished dynamics run.
#[derive(Debug, Clone, PartialEq)]
pub struct MdSummary {
    pub steps: usize,
    /// Potential energy per particle at the last force evaluation
    pub energy_per_particle: f64,
    pub temperature: f64,
    pub samples: usize,
    pub elapsed: Duration,
    pub kernel_time: Option<Duration>,
}

/// Unit-mass Newtonian dynamics with forces from a compute backend.
///
/// Each step evaluates forces on the current positions, then updates
/// velocities (`v += F dt`) and positions (`x += v dt`) in that order. There
/// is no thermostat and positions are never wrapped.
pub struct MolecularDynamics<B: ComputeBackend> {
    system: ParticleSystem,
    backend: B,
    time_step: f64,
    total_steps: usize,
    report_interval: usize,
    steps_done: usize,
    potential_energy: f64,
    history: RunHistory<EnergySample>,
    dof: usize,
    k_b: f64,
}

impl<B: ComputeBackend> MolecularDynamics<B> {
    pub fn new(system: ParticleSystem, backend: B, config: &DynamicsConfig) -> Self {
        let dof = 3 * system.len();
        Self {
            system,
            backend,
            time_step: config.time_step,
            total_steps: config.total_steps,
            report_interval: config.report_interval.unwrap_or(1000).max(1),
            steps_done: 0,
            potential_energy: 0.0,
            history: RunHistory::new(),
            dof,
            k_b: 1.0,
        }
    }

    pub fn with_report_interval(mut self, interval: usize) -> Self {
        self.report_interval = interval.max(1);
        self
    }

    pub fn system(&self) -> &ParticleSystem {
        &self.system
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn steps_done(&self) -> usize {
        self.steps_done
    }

    pub fn history(&self) -> &RunHistory<EnergySample> {
        &self.history
    }

    /// Total potential energy from the most recent force evaluation.
    pub fn potential_energy(&self) -> f64 {
        self.potential_energy
    }

    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        self.system.kinetic_energy()
    }

    /// Fresh forces for the current positions. Returns the total potential energy.
    fn evaluate_forces(&mut self) -> Result<f64> {
        let n = self.system.len();
        self.system.zero_forces();
        let pairs = self
            .backend
            .evaluate(self.system.positions(), EvalKind::EnergyAndForces)?;
        pairs.expect_particles(n)?;
        let forces = pairs.net_forces().ok_or(BackendError::ShapeMismatch {
            buffer: "force",
            expected: n * n,
            actual: 0,
        })?;
        self.system.set_forces(&forces);
        self.potential_energy = pairs.total_energy();
        Ok(self.potential_energy)
    }

    fn integrate(&mut self, dt: f64) {
        let (positions, velocities, forces) = self.system.kinematics_mut();
        for (x, v, &f) in izip!(positions, velocities, forces) {
            *v += f * dt;
            *x += *v * dt;
        }
        self.steps_done += 1;
    }

    fn record_sample(&mut self, step: usize) {
        let n = self.system.len() as f64;
        let sample = EnergySample {
            step,
            potential: self.potential_energy / n,
            kinetic: self.kinetic_energy() / n,
            temperature: self.temperature(),
        };
        info!(
            step,
            energy = sample.potential,
            temperature = sample.temperature,
            "energy report"
        );
        self.history.push(sample);
    }

    /// Integrate `total_steps` steps, reporting every `report_interval`.
    pub fn run(&mut self) -> Result<MdSummary> {
        let started = Instant::now();
        info!(
            n = self.system.len(),
            backend = self.backend.name(),
            dt = self.time_step,
            steps = self.total_steps,
            "molecular dynamics started"
        );

        for n in 0..self.total_steps {
            self.evaluate_forces()?;
            if n % self.report_interval == 0 {
                self.record_sample(n);
            }
            self.integrate(self.time_step);
        }

        let summary = MdSummary {
            steps: self.steps_done,
            energy_per_particle: self.potential_energy / self.system.len() as f64,
            temperature: self.temperature(),
            samples: self.history.len(),
            elapsed: started.elapsed(),
            kernel_time: self.backend.kernel_time(),
        };
        debug!(?summary, "molecular dynamics finished");
        Ok(summary)
    }
}

impl<B: ComputeBackend> Integrator for MolecularDynamics<B> {
    fn step(&mut self, dt: f64) -> Result<()> {
        self.evaluate_forces()?;
        self.integrate(dt);
        Ok(())
    }

    fn temperature(&self) -> f64 {
        2.0 * self.kinetic_energy() / (self.dof as f64 * self.k_b)
    }
}
