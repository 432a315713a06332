use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use std::fs;
use std::path::Path;

use crate::boundary::PeriodicBox;
use crate::error::{Result, SimError};
use crate::lj_pot::LennardJones;
use crate::particles::ParticleSystem;

/// Configuration for one Lennard-Jones sampling run
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimConfig {
    /// Which engine drives the run
    #[serde(default)]
    pub method: Method,
    /// Particles, box and initial state
    pub system: SystemConfig,
    /// Pair potential
    #[serde(default)]
    pub potential: PotentialConfig,
    /// Where pair sums are computed
    #[serde(default)]
    pub backend: BackendConfig,
    /// Metropolis parameters (used when `method` is `monte_carlo`)
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,
    /// Integration parameters (used when `method` is `molecular_dynamics`)
    #[serde(default)]
    pub dynamics: DynamicsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    #[default]
    MonteCarlo,
    MolecularDynamics,
}

/// System setup configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Number of particles, fixed for the run
    pub n_particles: usize,
    /// Edge of the cubic periodic box
    pub box_size: f64,
    /// Initial lattice placement
    pub lattice: LatticeConfig,
    /// Initial velocities (molecular dynamics only)
    #[serde(default)]
    pub velocities: VelocityConfig,
}

/// Simple cubic starting grid.
///
/// Along every axis the coordinates are `start, start + spacing, ...` while
/// below `end`; `end` defaults to `box_size - start`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LatticeConfig {
    pub start: f64,
    pub spacing: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

/// Velocity configuration options
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(tag = "type")]
pub enum VelocityConfig {
    /// Zero initial velocities
    #[serde(rename = "zero")]
    #[default]
    Zero,
    /// Maxwell-Boltzmann distribution at given temperature
    #[serde(rename = "maxwell_boltzmann")]
    MaxwellBoltzmann {
        temperature: f64,
        /// Optional random seed
        seed: Option<u64>,
    },
}

/// Potential energy configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum PotentialConfig {
    /// Truncated and shifted Lennard-Jones potential
    #[serde(rename = "lennard_jones")]
    LennardJones {
        /// Well depth parameter ε
        #[serde(default = "default_unit")]
        epsilon: f64,
        /// Collision diameter σ
        #[serde(default = "default_unit")]
        sigma: f64,
        /// Cutoff distance
        #[serde(default = "default_cutoff")]
        cutoff: f64,
    },
}

impl Default for PotentialConfig {
    fn default() -> Self {
        PotentialConfig::LennardJones {
            epsilon: 1.0,
            sigma: 1.0,
            cutoff: default_cutoff(),
        }
    }
}

/// Compute backend selection
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum BackendConfig {
    /// In-process rayon pool
    #[serde(rename = "cpu")]
    Cpu {
        /// Worker threads (default: one per core)
        #[serde(default)]
        threads: Option<usize>,
    },
    /// Buffer dispatch to an accelerator device
    #[serde(rename = "accelerator")]
    Accelerator {
        /// How long to wait for one read-back
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Cpu { threads: None }
    }
}

/// Metropolis Monte Carlo parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MonteCarloConfig {
    /// Temperature in reduced units
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Starting trial amplitude
    #[serde(default = "default_amplitude")]
    pub initial_amplitude: f64,
    /// Stop after this many accepted moves
    #[serde(default = "default_max_accepted")]
    pub max_accepted: usize,
    /// Stop after this many trials
    #[serde(default = "default_max_trials")]
    pub max_trials: usize,
    /// Tune the amplitude from the acceptance of each window
    #[serde(default = "default_true")]
    pub adaptive: bool,
    /// Trials per adaptation window
    #[serde(default = "default_window")]
    pub window: usize,
    /// Accepted count above which the amplitude is halved
    #[serde(default = "default_upper")]
    pub upper_threshold: usize,
    /// Accepted count below which the amplitude is doubled
    #[serde(default = "default_lower")]
    pub lower_threshold: usize,
    /// Optional random seed
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            initial_amplitude: default_amplitude(),
            max_accepted: default_max_accepted(),
            max_trials: default_max_trials(),
            adaptive: true,
            window: default_window(),
            upper_threshold: default_upper(),
            lower_threshold: default_lower(),
            seed: None,
        }
    }
}

/// Molecular dynamics parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DynamicsConfig {
    /// Time step
    #[serde(default = "default_time_step")]
    pub time_step: f64,
    /// Total number of steps
    #[serde(default = "default_total_steps")]
    pub total_steps: usize,
    /// Steps between energy reports (default depends on the backend)
    #[serde(default)]
    pub report_interval: Option<usize>,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            time_step: default_time_step(),
            total_steps: default_total_steps(),
            report_interval: None,
        }
    }
}

// Default value functions
fn default_unit() -> f64 {
    1.0
}
fn default_cutoff() -> f64 {
    3.0
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_temperature() -> f64 {
    1.3
}
fn default_amplitude() -> f64 {
    0.005
}
fn default_max_accepted() -> usize {
    20_000
}
fn default_max_trials() -> usize {
    40_000
}
fn default_true() -> bool {
    true
}
fn default_window() -> usize {
    100
}
fn default_upper() -> usize {
    55
}
fn default_lower() -> usize {
    45
}
fn default_time_step() -> f64 {
    0.0005
}
fn default_total_steps() -> usize {
    20_000
}

impl SimConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without validating, for callers that override fields first.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Save configuration to YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SimError::Config(msg));

        if self.system.n_particles == 0 {
            return invalid("Number of particles must be positive".to_string());
        }
        if !(self.system.lattice.spacing > 0.0) {
            return invalid("Lattice spacing must be positive".to_string());
        }

        let PotentialConfig::LennardJones {
            epsilon, sigma, ..
        } = self.potential;
        if !(epsilon > 0.0) {
            return invalid("LJ epsilon must be positive".to_string());
        }
        if !(sigma > 0.0) {
            return invalid("LJ sigma must be positive".to_string());
        }

        // box size and cutoff, including cutoff <= box / 2
        self.periodic_box()?;

        if let BackendConfig::Cpu { threads: Some(0) } = self.backend {
            return invalid("CPU backend needs at least one thread".to_string());
        }

        match self.method {
            Method::MonteCarlo => {
                let mc = &self.monte_carlo;
                if !(mc.temperature > 0.0) {
                    return invalid("Temperature must be positive".to_string());
                }
                if !(mc.initial_amplitude > 0.0) {
                    return invalid("Initial trial amplitude must be positive".to_string());
                }
                if mc.max_accepted == 0 || mc.max_trials == 0 {
                    return invalid("Iteration ceilings must be positive".to_string());
                }
                if mc.window == 0 {
                    return invalid("Adaptation window must be positive".to_string());
                }
                if mc.lower_threshold > mc.upper_threshold || mc.upper_threshold > mc.window {
                    return invalid(format!(
                        "Step thresholds must satisfy lower ({}) <= upper ({}) <= window ({})",
                        mc.lower_threshold, mc.upper_threshold, mc.window
                    ));
                }
            }
            Method::MolecularDynamics => {
                let md = &self.dynamics;
                if !(md.time_step > 0.0) {
                    return invalid("Time step must be positive".to_string());
                }
                if md.total_steps == 0 {
                    return invalid("Total steps must be positive".to_string());
                }
                if md.report_interval == Some(0) {
                    return invalid("Report interval must be positive".to_string());
                }
            }
        }

        if let VelocityConfig::MaxwellBoltzmann { temperature, .. } = self.system.velocities {
            if !(temperature >= 0.0) {
                return invalid("Initial velocity temperature must not be negative".to_string());
            }
        }

        Ok(())
    }

    pub fn periodic_box(&self) -> Result<PeriodicBox> {
        let PotentialConfig::LennardJones { cutoff, .. } = self.potential;
        PeriodicBox::new(self.system.box_size, cutoff)
    }

    pub fn potential_model(&self) -> LennardJones {
        let PotentialConfig::LennardJones {
            epsilon,
            sigma,
            cutoff,
        } = self.potential;
        LennardJones::new(epsilon, sigma, cutoff)
    }

    /// Steps between MD energy reports: explicit, or 1000 on the CPU and 500
    /// on an accelerator.
    pub fn report_interval(&self) -> usize {
        self.dynamics
            .report_interval
            .unwrap_or(match self.backend {
                BackendConfig::Cpu { .. } => 1000,
                BackendConfig::Accelerator { .. } => 500,
            })
    }

    /// Place `n_particles` on the configured lattice.
    ///
    /// Points are generated x-major and placement stops as soon as the
    /// requested count is reached, so the grid may be partially filled.
    pub fn generate_positions(&self) -> Result<Vec<Vector3<f64>>> {
        let lattice = &self.system.lattice;
        let n = self.system.n_particles;
        let end = lattice.end.unwrap_or(self.system.box_size - lattice.start);
        let axis = axis_points(lattice.start, end, lattice.spacing);

        let mut positions = Vec::with_capacity(n);
        'fill: for &x in &axis {
            for &y in &axis {
                for &z in &axis {
                    if positions.len() == n {
                        break 'fill;
                    }
                    positions.push(Vector3::new(x, y, z));
                }
            }
        }

        if positions.len() < n {
            return Err(SimError::LatticeCapacity {
                placed: positions.len(),
                requested: n,
            });
        }
        Ok(positions)
    }

    /// Initial velocities for `n` particles, unit mass.
    pub fn generate_velocities(&self, n: usize) -> Vec<Vector3<f64>> {
        match self.system.velocities {
            VelocityConfig::Zero => vec![Vector3::zeros(); n],
            VelocityConfig::MaxwellBoltzmann { temperature, seed } => {
                thermal_velocities(n, temperature, seed)
            }
        }
    }

    /// Initial particle state: lattice positions plus configured velocities.
    pub fn build_system(&self) -> Result<ParticleSystem> {
        let positions = self.generate_positions()?;
        let velocities = self.generate_velocities(positions.len());
        ParticleSystem::new(positions, self.system.box_size)?.with_velocities(velocities)
    }
}

/// Gaussian velocities with zero net momentum, rescaled so that
/// `sum v^2 / 3n` equals `temperature` exactly (for `n > 1`).
fn thermal_velocities(n: usize, temperature: f64, seed: Option<u64>) -> Vec<Vector3<f64>> {
    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let mut draw = || -> f64 { StandardNormal.sample(&mut rng) };
    let mut velocities: Vec<Vector3<f64>> = (0..n)
        .map(|_| Vector3::new(draw(), draw(), draw()))
        .collect();
    if n == 0 {
        return velocities;
    }

    let drift = velocities.iter().sum::<Vector3<f64>>() / n as f64;
    velocities.iter_mut().for_each(|v| *v -= drift);

    let sampled = velocities.iter().map(|v| v.norm_squared()).sum::<f64>() / (3 * n) as f64;
    let factor = if n > 1 && sampled > 0.0 {
        (temperature / sampled).sqrt()
    } else {
        temperature.sqrt()
    };
    velocities.iter_mut().for_each(|v| *v *= factor);
    velocities
}

/// Grid coordinates along one axis, accumulated step by step.
fn axis_points(start: f64, end: f64, spacing: f64) -> Vec<f64> {
    let mut points = Vec::new();
    let mut c = start;
    while c < end {
        points.push(c);
        c += spacing;
    }
    points
}
