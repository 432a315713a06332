//! Metropolis Monte Carlo over whole-configuration trial moves.
//!
//! Every trial displaces all particles at once, asks the compute backend for
//! the new total energy and keeps or reverts the configuration. The run ends
//! when either the accepted-move ceiling or the trial ceiling is reached.

use std::time::{Duration, Instant};

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::backend::{ComputeBackend, EvalKind};
use crate::config::MonteCarloConfig;
use crate::error::Result;
use crate::history::RunHistory;
use crate::particles::ParticleSystem;
use crate::step_control::StepController;

/// Upper bound on the accepted-energy slots reserved up front.
const HISTORY_PREALLOC: usize = 1 << 16;

/// Where the engine is in its trial cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McState {
    Initializing,
    Proposing,
    Evaluating,
    Accepting,
    Rejecting,
    Terminated,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct McStatistics {
    pub trials: usize,
    pub accepted: usize,
    /// Lowest total energy seen so far, baseline included
    pub best_energy: Option<f64>,
}

impl McStatistics {
    pub fn acceptance_ratio(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.accepted as f64 / self.trials as f64
        }
    }

    fn observe(&mut self, energy: f64) {
        if self.best_energy.map_or(true, |best| energy < best) {
            self.best_energy = Some(energy);
        }
    }
}

/// Result of a finished Monte Carlo run.
#[derive(Debug, Clone, PartialEq)]
pub struct McSummary {
    /// Last accepted total energy divided by N (baseline when nothing was accepted)
    pub energy_per_particle: f64,
    pub best_energy: f64,
    pub trials: usize,
    pub accepted: usize,
    pub acceptance_ratio: f64,
    pub final_amplitude: f64,
    pub elapsed: Duration,
    pub kernel_time: Option<Duration>,
}

/// Acceptance rule for a trial that moves the energy from `e_old` to `e_new`.
///
/// Downhill moves are always taken. Otherwise the move is taken when the
/// Boltzmann factor `exp((e_old - e_new) / T)` is at most the uniform draw `r`.
pub fn metropolis_accepts(e_old: f64, e_new: f64, temperature: f64, r: f64) -> bool {
    let probability = ((e_old - e_new) / temperature).exp();
    e_new < e_old || probability <= r
}

pub struct MonteCarlo<B: ComputeBackend, R: Rng = StdRng> {
    system: ParticleSystem,
    backend: B,
    rng: R,
    controller: StepController,
    temperature: f64,
    max_accepted: usize,
    max_trials: usize,
    adaptive: bool,
    state: McState,
    current_energy: f64,
    baseline_energy: f64,
    stats: McStatistics,
    history: RunHistory<f64>,
}

impl<B: ComputeBackend> MonteCarlo<B, StdRng> {
    /// Engine with a `StdRng` seeded from the configuration, or from entropy.
    pub fn new(system: ParticleSystem, backend: B, config: &MonteCarloConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(system, backend, config, rng)
    }
}

impl<B: ComputeBackend, R: Rng> MonteCarlo<B, R> {
    pub fn with_rng(
        system: ParticleSystem,
        backend: B,
        config: &MonteCarloConfig,
        rng: R,
    ) -> Self {
        Self {
            system,
            backend,
            rng,
            controller: StepController::new(
                config.initial_amplitude,
                config.window,
                config.upper_threshold,
                config.lower_threshold,
            ),
            temperature: config.temperature,
            max_accepted: config.max_accepted,
            max_trials: config.max_trials,
            adaptive: config.adaptive,
            state: McState::Initializing,
            current_energy: 0.0,
            baseline_energy: 0.0,
            stats: McStatistics::default(),
            history: RunHistory::with_capacity(
                config.max_accepted.min(config.max_trials).min(HISTORY_PREALLOC),
            ),
        }
    }

    pub fn system(&self) -> &ParticleSystem {
        &self.system
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> McState {
        self.state
    }

    pub fn statistics(&self) -> &McStatistics {
        &self.stats
    }

    /// Energies of accepted moves, in order.
    pub fn history(&self) -> &RunHistory<f64> {
        &self.history
    }

    pub fn amplitude(&self) -> f64 {
        self.controller.amplitude()
    }

    /// Total energy of the committed configuration.
    pub fn current_energy(&self) -> f64 {
        self.current_energy
    }

    /// Compute the baseline energy of the starting configuration.
    pub fn initialize(&mut self) -> Result<f64> {
        let energy = self.total_energy()?;
        self.current_energy = energy;
        self.baseline_energy = energy;
        self.stats.observe(energy);
        self.state = McState::Proposing;
        info!(
            n = self.system.len(),
            backend = self.backend.name(),
            baseline = energy / self.system.len() as f64,
            "Monte Carlo initialised"
        );
        Ok(energy)
    }

    pub fn is_finished(&self) -> bool {
        self.stats.accepted >= self.max_accepted || self.stats.trials >= self.max_trials
    }

    /// One propose/evaluate/decide cycle. Returns whether the move was kept.
    pub fn trial(&mut self) -> Result<bool> {
        if self.state == McState::Initializing {
            self.initialize()?;
        }

        self.state = McState::Proposing;
        let snapshot = self.system.snapshot();
        self.propose();

        self.state = McState::Evaluating;
        let e_old = self.current_energy;
        let e_new = match self.total_energy() {
            Ok(energy) => energy,
            Err(e) => {
                self.state = McState::Terminated;
                return Err(e);
            }
        };

        let r: f64 = self.rng.gen();
        let accepted = metropolis_accepts(e_old, e_new, self.temperature, r);
        if accepted {
            self.state = McState::Accepting;
            self.current_energy = e_new;
            self.history.push(e_new);
            self.stats.accepted += 1;
            self.stats.observe(e_new);
            self.controller.record_acceptance();
        } else {
            self.state = McState::Rejecting;
            self.system.restore(&snapshot);
        }
        self.stats.trials += 1;

        trace!(
            trial = self.stats.trials,
            e_old,
            e_new,
            accepted,
            "metropolis step"
        );
        self.state = McState::Proposing;
        Ok(accepted)
    }

    /// Run trials until a ceiling is reached.
    pub fn run(&mut self) -> Result<McSummary> {
        let started = Instant::now();
        if self.state == McState::Initializing {
            self.initialize()?;
        }

        loop {
            if self.adaptive {
                if let Some(adjustment) = self.controller.end_window_if_due(self.stats.trials) {
                    debug!(
                        trials = self.stats.trials,
                        energy = self.current_energy / self.system.len() as f64,
                        ?adjustment,
                        "acceptance window closed"
                    );
                }
            }
            if self.is_finished() {
                break;
            }
            self.trial()?;
        }
        self.state = McState::Terminated;

        let summary = self.summary(started.elapsed());
        info!(
            energy = summary.energy_per_particle,
            trials = summary.trials,
            accepted = summary.accepted,
            ratio = summary.acceptance_ratio,
            amplitude = summary.final_amplitude,
            "Monte Carlo finished"
        );
        Ok(summary)
    }

    fn summary(&self, elapsed: Duration) -> McSummary {
        let n = self.system.len() as f64;
        let final_energy = self.history.last().copied().unwrap_or(self.baseline_energy);
        McSummary {
            energy_per_particle: final_energy / n,
            best_energy: self.stats.best_energy.unwrap_or(self.baseline_energy),
            trials: self.stats.trials,
            accepted: self.stats.accepted,
            acceptance_ratio: self.stats.acceptance_ratio(),
            final_amplitude: self.controller.amplitude(),
            elapsed,
            kernel_time: self.backend.kernel_time(),
        }
    }

    /// Shift every particle by one offset in `[-amp/2, amp/2)`, applied to all
    /// three axes. Three draws are taken per particle; only the first is used.
    fn propose(&mut self) {
        let amp = self.controller.amplitude();
        for p in self.system.positions_mut() {
            let ex = self.rng.gen::<f64>() * amp - amp / 2.0;
            let _ey = self.rng.gen::<f64>() * amp - amp / 2.0;
            let _ez = self.rng.gen::<f64>() * amp - amp / 2.0;
            *p += Vector3::repeat(ex);
        }
    }

    fn total_energy(&mut self) -> Result<f64> {
        let pairs = self
            .backend
            .evaluate(self.system.positions(), EvalKind::Energy)?;
        pairs.expect_particles(self.system.len())?;
        Ok(pairs.total_energy())
    }
}
