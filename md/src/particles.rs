use nalgebra::Vector3;

use crate::error::{Result, SimError};

/// Fixed-size particle state of one run.
///
/// The number of particles is set at construction and never changes; all
/// accessors hand out slices so callers can edit values but not resize.
/// Positions are stored unwrapped.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    positions: Vec<Vector3<f64>>,
    velocities: Vec<Vector3<f64>>,
    forces: Vec<Vector3<f64>>,
    box_size: f64,
}

impl ParticleSystem {
    pub fn new(positions: Vec<Vector3<f64>>, box_size: f64) -> Result<Self> {
        if positions.is_empty() {
            return Err(SimError::Config("particle system is empty".to_string()));
        }
        let n = positions.len();
        Ok(Self {
            positions,
            velocities: vec![Vector3::zeros(); n],
            forces: vec![Vector3::zeros(); n],
            box_size,
        })
    }

    pub fn with_velocities(mut self, velocities: Vec<Vector3<f64>>) -> Result<Self> {
        if velocities.len() != self.len() {
            return Err(SimError::Config(format!(
                "{} velocities given for {} particles",
                velocities.len(),
                self.len()
            )));
        }
        self.velocities = velocities;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn box_size(&self) -> f64 {
        self.box_size
    }

    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.positions
    }

    pub fn velocities(&self) -> &[Vector3<f64>] {
        &self.velocities
    }

    pub fn forces(&self) -> &[Vector3<f64>] {
        &self.forces
    }

    /// Copy of the current positions, used to undo a rejected trial move.
    pub fn snapshot(&self) -> Vec<Vector3<f64>> {
        self.positions.clone()
    }

    /// Put back positions taken with [`Self::snapshot`].
    ///
    /// # Panics
    /// If `snapshot` has a different length than the system.
    pub fn restore(&mut self, snapshot: &[Vector3<f64>]) {
        self.positions.copy_from_slice(snapshot);
    }

    /// Overwrite the force accumulator with fresh per-particle net forces.
    pub fn set_forces(&mut self, forces: &[Vector3<f64>]) {
        self.forces.copy_from_slice(forces);
    }

    pub fn zero_forces(&mut self) {
        self.forces.iter_mut().for_each(|f| *f = Vector3::zeros());
    }

    /// Mutable views of positions, velocities and forces at once, for integrators.
    pub fn kinematics_mut(
        &mut self,
    ) -> (&mut [Vector3<f64>], &mut [Vector3<f64>], &[Vector3<f64>]) {
        (&mut self.positions, &mut self.velocities, &self.forces)
    }

    /// Kinetic energy with unit masses.
    pub fn kinetic_energy(&self) -> f64 {
        self.velocities.iter().map(|v| 0.5 * v.dot(v)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_particles() -> ParticleSystem {
        ParticleSystem::new(
            vec![Vector3::new(1.0, 1.0, 1.0), Vector3::new(2.0, 1.0, 1.0)],
            6.0,
        )
        .unwrap()
    }

    #[test]
    fn new_system_is_at_rest() {
        let system = two_particles();
        assert_eq!(system.len(), 2);
        assert!(system.velocities().iter().all(|v| *v == Vector3::zeros()));
        assert!(system.forces().iter().all(|f| *f == Vector3::zeros()));
        assert_eq!(system.kinetic_energy(), 0.0);
    }

    #[test]
    fn empty_system_is_rejected() {
        assert!(ParticleSystem::new(Vec::new(), 6.0).is_err());
    }

    #[test]
    fn velocity_count_must_match() {
        let err = two_particles().with_velocities(vec![Vector3::zeros()]);
        assert!(matches!(err, Err(SimError::Config(_))));
    }

    #[test]
    fn restore_undoes_edits() {
        let mut system = two_particles();
        let snapshot = system.snapshot();
        system.positions_mut()[0] += Vector3::new(0.3, -0.2, 0.1);
        assert_ne!(system.positions()[0], snapshot[0]);
        system.restore(&snapshot);
        assert_eq!(system.positions(), snapshot.as_slice());
    }

    #[test]
    fn forces_can_be_cleared() {
        let mut system = two_particles();
        system.set_forces(&[Vector3::new(1.0, 0.0, 0.0), Vector3::new(-1.0, 0.0, 0.0)]);
        assert_eq!(system.forces()[1].x, -1.0);
        system.zero_forces();
        assert!(system.forces().iter().all(|f| *f == Vector3::zeros()));
    }
}
