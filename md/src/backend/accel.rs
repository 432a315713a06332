//! Host side of the accelerator dispatch protocol.
//!
//! One evaluation is one round trip:
//!
//! ```text
//! fold + pack positions  -> float4 upload buffer
//! Device::submit()       -> N x N kernel launch, read-back queued
//! PendingReadback::wait  -> block until energy/force buffers arrive
//! shape check + widen    -> PairMatrices (f64)
//! ```
//!
//! There is no overlap between successive evaluations.

use std::sync::mpsc;
use std::time::Duration;

use nalgebra::{DMatrix, Vector3};

use super::{ComputeBackend, EvalKind, ForceMatrix, PairMatrices};
use crate::boundary::PeriodicBox;
use crate::error::{BackendError, DeviceError};
use crate::lj_pot::LennardJones;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Scalar kernel arguments, single precision like the device buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    pub box_size: f32,
    pub cutoff_sq: f32,
    pub epsilon: f32,
    pub sigma: f32,
    pub shift: f32,
}

impl KernelParams {
    pub fn new(pbox: &PeriodicBox, model: &LennardJones) -> Self {
        Self {
            box_size: pbox.length() as f32,
            cutoff_sq: pbox.cutoff_sq() as f32,
            epsilon: model.epsilon as f32,
            sigma: model.sigma as f32,
            shift: model.shift() as f32,
        }
    }
}

/// Everything a device needs for one launch. Positions use the padded
/// 16-byte `float3` layout.
#[derive(Debug, Clone)]
pub struct KernelLaunch {
    pub positions: Vec<[f32; 4]>,
    pub params: KernelParams,
    pub with_forces: bool,
    pub global_size: [usize; 2],
}

/// Read-back buffers, row-major N x N. `force` is empty for energy-only launches.
#[derive(Debug, Clone, Default)]
pub struct DeviceBuffers {
    pub energy: Vec<f32>,
    pub force: Vec<[f32; 4]>,
    pub kernel_time: Duration,
}

/// A queued read-back. Waiting consumes it.
#[derive(Debug)]
pub struct PendingReadback {
    rx: mpsc::Receiver<Result<DeviceBuffers, DeviceError>>,
}

impl PendingReadback {
    pub fn new(rx: mpsc::Receiver<Result<DeviceBuffers, DeviceError>>) -> Self {
        Self { rx }
    }

    pub fn wait(self, timeout: Duration) -> Result<DeviceBuffers, DeviceError> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(DeviceError::Timeout { waited: timeout }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(DeviceError::Lost),
        }
    }
}

/// An accelerator able to run the LJ pair kernel.
///
/// `submit` uploads the inputs, enqueues the kernel and the read-back, and
/// returns without waiting.
pub trait Device {
    fn label(&self) -> &str;

    fn submit(&mut self, launch: KernelLaunch) -> Result<PendingReadback, DeviceError>;
}

pub struct AcceleratorBackend<D: Device> {
    device: D,
    pbox: PeriodicBox,
    params: KernelParams,
    timeout: Duration,
    kernel_time: Duration,
    launches: u64,
}

impl<D: Device> AcceleratorBackend<D> {
    pub fn new(device: D, pbox: PeriodicBox, model: LennardJones) -> Self {
        Self {
            device,
            pbox,
            params: KernelParams::new(&pbox, &model),
            timeout: DEFAULT_TIMEOUT,
            kernel_time: Duration::ZERO,
            launches: 0,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn launches(&self) -> u64 {
        self.launches
    }

    fn pack(&self, positions: &[Vector3<f64>]) -> Vec<[f32; 4]> {
        positions
            .iter()
            .map(|&p| {
                let q = self.pbox.fold_position(p);
                [q.x as f32, q.y as f32, q.z as f32, 0.0]
            })
            .collect()
    }
}

impl<D: Device> ComputeBackend for AcceleratorBackend<D> {
    fn name(&self) -> &str {
        "accelerator"
    }

    fn evaluate(
        &mut self,
        positions: &[Vector3<f64>],
        kind: EvalKind,
    ) -> Result<PairMatrices, BackendError> {
        let n = positions.len();
        let launch = KernelLaunch {
            positions: self.pack(positions),
            params: self.params,
            with_forces: kind.wants_forces(),
            global_size: [n, n],
        };

        let pending = self.device.submit(launch)?;
        let buffers = pending.wait(self.timeout)?;
        self.launches += 1;
        self.kernel_time += buffers.kernel_time;

        if buffers.energy.len() != n * n {
            return Err(BackendError::ShapeMismatch {
                buffer: "energy",
                expected: n * n,
                actual: buffers.energy.len(),
            });
        }
        let energy = DMatrix::from_row_iterator(n, n, buffers.energy.iter().map(|&e| f64::from(e)));

        let forces = if kind.wants_forces() {
            let data = buffers
                .force
                .iter()
                .map(|f| Vector3::new(f64::from(f[0]), f64::from(f[1]), f64::from(f[2])))
                .collect();
            Some(ForceMatrix::from_rows(n, data)?)
        } else {
            None
        };

        Ok(PairMatrices { energy, forces })
    }

    fn kernel_time(&self) -> Option<Duration> {
        Some(self.kernel_time)
    }
}
