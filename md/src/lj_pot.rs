// file: `md/src/lj_pot.rs`
use nalgebra::Vector3;

/// Truncated and shifted Lennard-Jones pair potential.
///
/// The energy is shifted by `U(rc)` so it reaches zero continuously at the
/// cutoff. Pairs at or beyond the cutoff contribute nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LennardJones {
    pub epsilon: f64,
    pub sigma: f64,
    pub cutoff: f64,
    cutoff_sq: f64,
    shift: f64,
}

/// One evaluated pair: squared distance, shifted energy and the force on the
/// first particle of the pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairInteraction {
    pub r2: f64,
    pub energy: f64,
    pub force: Vector3<f64>,
}

impl LennardJones {
    pub fn new(epsilon: f64, sigma: f64, cutoff: f64) -> Self {
        let mut lj = LennardJones {
            epsilon,
            sigma,
            cutoff,
            cutoff_sq: cutoff * cutoff,
            shift: 0.0,
        };
        lj.shift = lj.unshifted(lj.cutoff_sq);
        lj
    }

    /// Reduced units, sigma = epsilon = 1.
    pub fn reduced(cutoff: f64) -> Self {
        Self::new(1.0, 1.0, cutoff)
    }

    /// The constant `U(rc)` subtracted from every pair energy.
    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn cutoff_sq(&self) -> f64 {
        self.cutoff_sq
    }

    fn unshifted(&self, r2: f64) -> f64 {
        let inv_r2 = self.sigma * self.sigma / r2;
        let inv_r6 = inv_r2 * inv_r2 * inv_r2;
        4.0 * self.epsilon * (inv_r6 * inv_r6 - inv_r6)
    }

    /// Shifted pair energy for squared distance `r2`.
    #[inline]
    pub fn energy(&self, r2: f64) -> f64 {
        if r2 >= self.cutoff_sq {
            return 0.0;
        }
        self.unshifted(r2) - self.shift
    }

    /// Radial multiplier `12 eps (sigma^12 r^-14 - sigma^6 r^-8)`; the force on
    /// particle i is this times the displacement from i to the image of j.
    #[inline]
    pub fn force_multiplier(&self, r2: f64) -> f64 {
        if r2 >= self.cutoff_sq {
            return 0.0;
        }
        let inv_r2 = 1.0 / r2;
        let s2 = self.sigma * self.sigma * inv_r2;
        let s6 = s2 * s2 * s2;
        12.0 * self.epsilon * (s6 * s6 - s6) * inv_r2
    }

    /// Evaluate the pair `i -> image of j`, given `displacement = image_j - r_i`.
    pub fn pair(&self, displacement: Vector3<f64>) -> Option<PairInteraction> {
        let r2 = displacement.norm_squared();
        if r2 >= self.cutoff_sq {
            return None;
        }
        Some(PairInteraction {
            r2,
            energy: self.energy(r2),
            force: displacement * self.force_multiplier(r2),
        })
    }
}
