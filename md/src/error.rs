//! Error types shared by the simulation engines and compute backends.

use std::time::Duration;
use thiserror::Error;

/// Failures raised by an accelerator device while servicing a dispatch.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device worker is gone")]
    Lost,

    #[error("device did not answer within {waited:?}")]
    Timeout { waited: Duration },

    #[error("kernel launch failed: {0}")]
    Launch(String),
}

/// Failures of a single energy/force evaluation. Always fatal to the run.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("accelerator error: {0}")]
    Device(#[from] DeviceError),

    #[error("{buffer} buffer holds {actual} elements, expected {expected}")]
    ShapeMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("could not build worker pool: {0}")]
    ThreadPool(String),
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("lattice holds only {placed} of {requested} particles, decrease the spacing")]
    LatticeCapacity { placed: usize, requested: usize },

    #[error("compute backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
