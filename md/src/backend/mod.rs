//! Pairwise energy/force evaluation behind one interface.
//!
//! Engines only ever call [`ComputeBackend::evaluate`]; whether the sums run
//! on a local `rayon` pool ([`CpuBackend`]) or through a buffer dispatch to
//! an accelerator ([`AcceleratorBackend`]) is decided once, when the backend
//! is built from configuration.

mod accel;
mod cpu;
mod device;

pub use accel::{AcceleratorBackend, Device, DeviceBuffers, KernelLaunch, KernelParams, PendingReadback};
pub use cpu::CpuBackend;
pub use device::ThreadedDevice;

use std::time::Duration;

use nalgebra::{DMatrix, Vector3};

use crate::boundary::PeriodicBox;
use crate::config::BackendConfig;
use crate::error::{BackendError, Result};
use crate::lj_pot::LennardJones;

/// What an evaluation call must produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalKind {
    Energy,
    EnergyAndForces,
}

impl EvalKind {
    pub fn wants_forces(self) -> bool {
        matches!(self, EvalKind::EnergyAndForces)
    }
}

/// N x N matrix of pair force vectors, stored row-major.
///
/// Entry `(i, j)` is the force on `i` from the nearest image of `j`, zero when
/// that image is outside the cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceMatrix {
    n: usize,
    data: Vec<Vector3<f64>>,
}

impl ForceMatrix {
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![Vector3::zeros(); n * n],
        }
    }

    pub fn from_rows(n: usize, data: Vec<Vector3<f64>>) -> std::result::Result<Self, BackendError> {
        if data.len() != n * n {
            return Err(BackendError::ShapeMismatch {
                buffer: "force",
                expected: n * n,
                actual: data.len(),
            });
        }
        Ok(Self { n, data })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn row(&self, i: usize) -> &[Vector3<f64>] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Net force on every particle: the row sums.
    pub fn net_forces(&self) -> Vec<Vector3<f64>> {
        (0..self.n)
            .map(|i| self.row(i).iter().sum::<Vector3<f64>>())
            .collect()
    }
}

/// Fresh result buffers of one evaluation. Nothing is kept by the backend.
#[derive(Debug, Clone)]
pub struct PairMatrices {
    pub energy: DMatrix<f64>,
    pub forces: Option<ForceMatrix>,
}

impl PairMatrices {
    pub fn n(&self) -> usize {
        self.energy.nrows()
    }

    /// Physical total: every pair appears twice in the matrix.
    pub fn total_energy(&self) -> f64 {
        self.energy.sum() / 2.0
    }

    /// Sum over `i < j` only.
    pub fn upper_triangle_energy(&self) -> f64 {
        let n = self.n();
        let mut total = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                total += self.energy[(i, j)];
            }
        }
        total
    }

    /// Per-particle energy share, `sum_j E_ij / 2`.
    pub fn particle_energies(&self) -> Vec<f64> {
        self.energy.row_iter().map(|row| row.sum() / 2.0).collect()
    }

    pub fn net_forces(&self) -> Option<Vec<Vector3<f64>>> {
        self.forces.as_ref().map(ForceMatrix::net_forces)
    }

    /// Check that every buffer present is `n x n`.
    pub fn expect_particles(&self, n: usize) -> std::result::Result<(), BackendError> {
        let (rows, cols) = self.energy.shape();
        if rows != n || cols != n {
            return Err(BackendError::ShapeMismatch {
                buffer: "energy",
                expected: n * n,
                actual: rows * cols,
            });
        }
        match &self.forces {
            Some(forces) if forces.dim() != n => Err(BackendError::ShapeMismatch {
                buffer: "force",
                expected: n * n,
                actual: forces.dim() * forces.dim(),
            }),
            _ => Ok(()),
        }
    }
}

pub trait ComputeBackend {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Evaluate every ordered pair of `positions` under the minimum-image
    /// convention. Blocks until the result is available.
    fn evaluate(
        &mut self,
        positions: &[Vector3<f64>],
        kind: EvalKind,
    ) -> std::result::Result<PairMatrices, BackendError>;

    /// Time spent inside device kernels so far, if the backend measures it.
    fn kernel_time(&self) -> Option<Duration> {
        None
    }
}

impl<B: ComputeBackend + ?Sized> ComputeBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn evaluate(
        &mut self,
        positions: &[Vector3<f64>],
        kind: EvalKind,
    ) -> std::result::Result<PairMatrices, BackendError> {
        (**self).evaluate(positions, kind)
    }

    fn kernel_time(&self) -> Option<Duration> {
        (**self).kernel_time()
    }
}

/// Build the backend selected in the configuration.
pub fn from_config(
    config: &BackendConfig,
    pbox: PeriodicBox,
    model: LennardJones,
) -> Result<Box<dyn ComputeBackend>> {
    match config {
        BackendConfig::Cpu { threads } => {
            let backend = CpuBackend::new(pbox, model, *threads)?;
            Ok(Box::new(backend))
        }
        BackendConfig::Accelerator { timeout_secs } => {
            let device = ThreadedDevice::spawn().map_err(BackendError::from)?;
            let backend = AcceleratorBackend::new(device, pbox, model)
                .with_timeout(Duration::from_secs(*timeout_secs));
            Ok(Box::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn symmetric_matrices() -> PairMatrices {
        let energy = DMatrix::from_row_slice(
            3,
            3,
            &[0.0, -0.5, 0.25, -0.5, 0.0, -1.0, 0.25, -1.0, 0.0],
        );
        let mut forces = vec![Vector3::zeros(); 9];
        forces[1] = Vector3::new(1.0, 0.0, 0.0);
        forces[3] = Vector3::new(-1.0, 0.0, 0.0);
        forces[2] = Vector3::new(0.0, 2.0, 0.0);
        forces[6] = Vector3::new(0.0, -2.0, 0.0);
        PairMatrices {
            energy,
            forces: Some(ForceMatrix::from_rows(3, forces).unwrap()),
        }
    }

    #[test]
    fn halved_sum_equals_upper_triangle() {
        let m = symmetric_matrices();
        assert_relative_eq!(m.total_energy(), -1.25, epsilon = 1e-15);
        assert_relative_eq!(m.total_energy(), m.upper_triangle_energy(), epsilon = 1e-15);
        let shares: f64 = m.particle_energies().iter().sum();
        assert_relative_eq!(shares, m.total_energy(), epsilon = 1e-15);
    }

    #[test]
    fn net_forces_are_row_sums() {
        let m = symmetric_matrices();
        let net = m.net_forces().unwrap();
        assert_eq!(net[0], Vector3::new(1.0, 2.0, 0.0));
        assert_eq!(net[1], Vector3::new(-1.0, 0.0, 0.0));
        assert_eq!(net[2], Vector3::new(0.0, -2.0, 0.0));
    }

    #[test]
    fn shape_check_compares_against_particle_count() {
        let m = symmetric_matrices();
        assert!(m.expect_particles(3).is_ok());
        assert!(matches!(
            m.expect_particles(2),
            Err(BackendError::ShapeMismatch {
                buffer: "energy",
                expected: 4,
                actual: 9
            })
        ));

        let mixed = PairMatrices {
            energy: DMatrix::zeros(2, 2),
            forces: Some(ForceMatrix::zeros(1)),
        };
        assert!(matches!(
            mixed.expect_particles(2),
            Err(BackendError::ShapeMismatch {
                buffer: "force",
                expected: 4,
                actual: 1
            })
        ));
    }

    #[test]
    fn force_matrix_rejects_wrong_length() {
        let err = ForceMatrix::from_rows(2, vec![Vector3::zeros(); 3]).unwrap_err();
        assert!(matches!(
            err,
            BackendError::ShapeMismatch {
                expected: 4,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn builds_both_backend_kinds() {
        let pbox = PeriodicBox::new(6.0, 3.0).unwrap();
        let model = LennardJones::reduced(3.0);
        let cpu = from_config(&BackendConfig::Cpu { threads: Some(2) }, pbox, model).unwrap();
        assert_eq!(cpu.name(), "cpu");
        let accel = from_config(
            &BackendConfig::Accelerator { timeout_secs: 5 },
            pbox,
            model,
        )
        .unwrap();
        assert_eq!(accel.name(), "accelerator");
    }
}
