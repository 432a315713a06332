use nalgebra::{DMatrix, Vector3};
use rayon::prelude::*;
use rayon::ThreadPool;

use super::{ComputeBackend, EvalKind, ForceMatrix, PairMatrices};
use crate::boundary::PeriodicBox;
use crate::error::BackendError;
use crate::lj_pot::LennardJones;

/// In-process reference backend.
///
/// Positions are folded into the primary cell, then each particle's
/// neighbours are found by replica enumeration and its matrix row is filled
/// on its own pool thread. Rows share nothing but the read-only position
/// array.
pub struct CpuBackend {
    pbox: PeriodicBox,
    model: LennardJones,
    pool: ThreadPool,
}

impl CpuBackend {
    /// `threads = None` lets rayon pick one worker per core.
    pub fn new(
        pbox: PeriodicBox,
        model: LennardJones,
        threads: Option<usize>,
    ) -> Result<Self, BackendError> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("lj-cpu-{i}"));
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| BackendError::ThreadPool(e.to_string()))?;
        Ok(Self { pbox, model, pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn row(
        &self,
        folded: &[Vector3<f64>],
        i: usize,
        with_forces: bool,
    ) -> (Vec<f64>, Vec<Vector3<f64>>) {
        let n = folded.len();
        let mut energies = vec![0.0; n];
        let mut forces = if with_forces {
            vec![Vector3::zeros(); n]
        } else {
            Vec::new()
        };
        for (j, image) in self.pbox.neighbor_images(folded, i) {
            if let Some(pair) = self.model.pair(image - folded[i]) {
                energies[j] += pair.energy;
                if with_forces {
                    forces[j] += pair.force;
                }
            }
        }
        (energies, forces)
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn evaluate(
        &mut self,
        positions: &[Vector3<f64>],
        kind: EvalKind,
    ) -> Result<PairMatrices, BackendError> {
        let n = positions.len();
        let with_forces = kind.wants_forces();
        let folded: Vec<Vector3<f64>> = positions
            .iter()
            .map(|&p| self.pbox.fold_position(p))
            .collect();

        let this = &*self;
        let rows: Vec<(Vec<f64>, Vec<Vector3<f64>>)> = this.pool.install(|| {
            (0..n)
                .into_par_iter()
                .map(|i| this.row(&folded, i, with_forces))
                .collect()
        });

        let energy = DMatrix::from_row_iterator(
            n,
            n,
            rows.iter().flat_map(|(e, _)| e.iter().copied()),
        );
        let forces = if with_forces {
            let data = rows.into_iter().flat_map(|(_, f)| f).collect();
            Some(ForceMatrix::from_rows(n, data)?)
        } else {
            None
        };

        Ok(PairMatrices { energy, forces })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn backend(threads: usize) -> CpuBackend {
        CpuBackend::new(
            PeriodicBox::new(6.0, 3.0).unwrap(),
            LennardJones::reduced(3.0),
            Some(threads),
        )
        .unwrap()
    }

    fn cluster() -> Vec<Vector3<f64>> {
        vec![
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(2.2, 1.0, 1.0),
            Vector3::new(1.0, 2.3, 1.1),
            Vector3::new(5.6, 0.8, 1.0),
            Vector3::new(3.4, 3.5, 3.6),
        ]
    }

    #[test]
    fn single_pair_energy_and_force() {
        let mut cpu = backend(1);
        let positions = vec![Vector3::new(1.0, 1.0, 1.0), Vector3::new(2.5, 1.0, 1.0)];
        let out = cpu.evaluate(&positions, EvalKind::EnergyAndForces).unwrap();

        let lj = LennardJones::reduced(3.0);
        assert_relative_eq!(out.total_energy(), lj.energy(2.25), epsilon = 1e-14);
        assert_relative_eq!(out.energy[(0, 1)], out.energy[(1, 0)], epsilon = 1e-15);
        assert_eq!(out.energy[(0, 0)], 0.0);

        let net = out.net_forces().unwrap();
        assert_relative_eq!(net[0].x, 1.5 * lj.force_multiplier(2.25), epsilon = 1e-14);
        assert_relative_eq!(net[0] + net[1], Vector3::zeros(), epsilon = 1e-14);
    }

    #[test]
    fn energy_only_skips_forces() {
        let mut cpu = backend(2);
        let out = cpu.evaluate(&cluster(), EvalKind::Energy).unwrap();
        assert!(out.forces.is_none());
        assert_eq!(out.n(), 5);
    }

    #[test]
    fn interactions_reach_across_the_boundary() {
        let mut cpu = backend(1);
        let positions = vec![Vector3::new(0.3, 3.0, 3.0), Vector3::new(5.5, 3.0, 3.0)];
        let out = cpu.evaluate(&positions, EvalKind::Energy).unwrap();
        let lj = LennardJones::reduced(3.0);
        assert_relative_eq!(out.total_energy(), lj.energy(0.8 * 0.8), epsilon = 1e-12);
    }

    #[test]
    fn drifted_positions_give_the_same_energy() {
        let mut cpu = backend(2);
        let base = cluster();
        let drifted: Vec<Vector3<f64>> = base
            .iter()
            .enumerate()
            .map(|(k, p)| p + Vector3::new(6.0 * k as f64, -12.0, 18.0))
            .collect();
        let a = cpu.evaluate(&base, EvalKind::Energy).unwrap();
        let b = cpu.evaluate(&drifted, EvalKind::Energy).unwrap();
        assert_relative_eq!(a.total_energy(), b.total_energy(), epsilon = 1e-9);
    }

    #[test]
    fn thread_count_does_not_change_the_result() {
        let positions = cluster();
        let one = backend(1).evaluate(&positions, EvalKind::EnergyAndForces).unwrap();
        let four = backend(4).evaluate(&positions, EvalKind::EnergyAndForces).unwrap();
        assert_eq!(one.energy, four.energy);
        assert_eq!(one.forces, four.forces);
        assert_eq!(backend(3).threads(), 3);
    }

    #[test]
    fn repeated_calls_are_reproducible() {
        let mut cpu = backend(4);
        let positions = cluster();
        let first = cpu.evaluate(&positions, EvalKind::Energy).unwrap();
        let second = cpu.evaluate(&positions, EvalKind::Energy).unwrap();
        assert_eq!(first.total_energy(), second.total_energy());
    }
}
