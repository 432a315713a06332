//! Lennard-Jones particles in a periodic cubic box, sampled by Metropolis
//! Monte Carlo or integrated by molecular dynamics, with pair sums delegated
//! to a pluggable compute backend.

pub mod backend;
pub mod boundary;
pub mod config;
pub mod error;
pub mod history;
pub mod lj_pot;
pub mod monte_carlo;
pub mod particles;
pub mod run_md;
pub mod step_control;

pub use backend::{
    AcceleratorBackend, ComputeBackend, CpuBackend, EvalKind, ForceMatrix, PairMatrices,
    ThreadedDevice,
};
pub use boundary::PeriodicBox;
pub use config::{BackendConfig, Method, SimConfig};
pub use error::{BackendError, DeviceError, Result, SimError};
pub use history::{EnergySample, RunHistory};
pub use lj_pot::{LennardJones, PairInteraction};
pub use monte_carlo::{McState, McStatistics, McSummary, MonteCarlo};
pub use particles::ParticleSystem;
pub use run_md::{Integrator, MdSummary, MolecularDynamics};
pub use step_control::{StepAdjustment, StepController};
