use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use super::accel::{Device, DeviceBuffers, KernelLaunch, KernelParams, PendingReadback};
use crate::error::DeviceError;

type Reply = mpsc::Sender<Result<DeviceBuffers, DeviceError>>;

/// Accelerator stand-in: a dedicated worker thread that receives launches
/// over a queue and runs the pair kernel in single precision, one work item
/// per `(i, j)`.
pub struct ThreadedDevice {
    label: String,
    queue: Option<mpsc::Sender<(KernelLaunch, Reply)>>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadedDevice {
    pub fn spawn() -> Result<Self, DeviceError> {
        let (tx, rx) = mpsc::channel::<(KernelLaunch, Reply)>();
        let worker = std::thread::Builder::new()
            .name("lj-device".into())
            .spawn(move || {
                for (launch, reply) in rx {
                    let started = Instant::now();
                    let result = run_pair_kernel(&launch).map(|(energy, force)| DeviceBuffers {
                        energy,
                        force,
                        kernel_time: started.elapsed(),
                    });
                    // the host may have given up waiting
                    let _ = reply.send(result);
                }
                debug!("device queue closed, worker exiting");
            })
            .map_err(|e| DeviceError::Launch(format!("cannot start device worker: {e}")))?;

        Ok(Self {
            label: "threaded-f32".to_string(),
            queue: Some(tx),
            worker: Some(worker),
        })
    }
}

impl Device for ThreadedDevice {
    fn label(&self) -> &str {
        &self.label
    }

    fn submit(&mut self, launch: KernelLaunch) -> Result<PendingReadback, DeviceError> {
        let queue = self.queue.as_ref().ok_or(DeviceError::Lost)?;
        let (reply_tx, reply_rx) = mpsc::channel();
        queue
            .send((launch, reply_tx))
            .map_err(|_| DeviceError::Lost)?;
        Ok(PendingReadback::new(reply_rx))
    }
}

impl Drop for ThreadedDevice {
    fn drop(&mut self) {
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_pair_kernel(launch: &KernelLaunch) -> Result<(Vec<f32>, Vec<[f32; 4]>), DeviceError> {
    let n = launch.positions.len();
    let [rows, cols] = launch.global_size;
    if n == 0 {
        return Err(DeviceError::Launch("empty position buffer".to_string()));
    }
    if rows != n || cols != n {
        return Err(DeviceError::Launch(format!(
            "global size {rows}x{cols} does not match {n} particles"
        )));
    }

    let positions = &launch.positions;
    let params = &launch.params;

    let mut energy = vec![0.0f32; n * n];
    energy.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for (j, e) in row.iter_mut().enumerate() {
            if let Some((pair_energy, _)) = work_item(i, j, positions, params) {
                *e = pair_energy;
            }
        }
    });

    let mut force = Vec::new();
    if launch.with_forces {
        force = vec![[0.0f32; 4]; n * n];
        force.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
            for (j, f) in row.iter_mut().enumerate() {
                if let Some((_, pair_force)) = work_item(i, j, positions, params) {
                    *f = pair_force;
                }
            }
        });
    }

    Ok((energy, force))
}

/// Pair `(i, j)`: minimum image by folding, then the shifted LJ terms.
#[inline]
fn work_item(
    i: usize,
    j: usize,
    positions: &[[f32; 4]],
    p: &KernelParams,
) -> Option<(f32, [f32; 4])> {
    if i == j {
        return None;
    }
    let (pi, pj) = (positions[i], positions[j]);
    let mut d = [0.0f32; 3];
    for k in 0..3 {
        let c = pj[k] - pi[k];
        d[k] = c - p.box_size * (c / p.box_size).round();
    }
    let r2 = d[0] * d[0] + d[1] * d[1] + d[2] * d[2];
    if r2 >= p.cutoff_sq {
        return None;
    }
    let inv_r2 = 1.0 / r2;
    let s2 = p.sigma * p.sigma * inv_r2;
    let s6 = s2 * s2 * s2;
    let energy = 4.0 * p.epsilon * (s6 * s6 - s6) - p.shift;
    let mult = 12.0 * p.epsilon * (s6 * s6 - s6) * inv_r2;
    Some((energy, [d[0] * mult, d[1] * mult, d[2] * mult, 0.0]))
}
