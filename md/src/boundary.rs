//! Periodic boundary handling for a cubic box.
//!
//! Two ways to find the nearest periodic image are provided:
//!
//! * replica enumeration over the 27 neighbouring cells, used when every
//!   short-range neighbour of a particle must be listed;
//! * per-component folding `c - L * round(c / L)`, used to wrap single
//!   displacements or positions in O(1).
//!
//! The two agree whenever at most one image can sit inside the cutoff
//! sphere, which [`PeriodicBox::new`] guarantees by requiring `rc <= L / 2`.

use itertools::iproduct;
use nalgebra::Vector3;

use crate::error::{Result, SimError};

const REPLICA_OFFSETS: [f64; 3] = [-1.0, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicBox {
    length: f64,
    cutoff: f64,
    cutoff_sq: f64,
}

impl PeriodicBox {
    /// Build a cubic box of edge `length` with interaction cutoff `cutoff`.
    ///
    /// Neighbours count only when strictly inside the cutoff sphere, so
    /// `cutoff == length / 2` still admits a single image per pair.
    pub fn new(length: f64, cutoff: f64) -> Result<Self> {
        if !(length > 0.0) {
            return Err(SimError::Config(format!(
                "box size must be positive, got {length}"
            )));
        }
        if !(cutoff > 0.0) {
            return Err(SimError::Config(format!(
                "cutoff must be positive, got {cutoff}"
            )));
        }
        if cutoff > 0.5 * length {
            return Err(SimError::Config(format!(
                "cutoff {cutoff} exceeds half the box size {length}; \
                 more than one periodic image would interact"
            )));
        }
        Ok(Self {
            length,
            cutoff,
            cutoff_sq: cutoff * cutoff,
        })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn cutoff_sq(&self) -> f64 {
        self.cutoff_sq
    }

    /// Fold one coordinate into the centred cell.
    ///
    /// Interior values land in `(-L/2, L/2)`. Exact half-box values flip
    /// sign because `round` takes halves away from zero: `+L/2` gives `-L/2`
    /// and `-L/2` gives `+L/2`. Both describe the same periodic point.
    #[inline]
    pub fn wrap_component(&self, c: f64) -> f64 {
        c - self.length * (c / self.length).round()
    }

    /// Minimum-image displacement by folding every component.
    #[inline]
    pub fn minimum_image(&self, d: Vector3<f64>) -> Vector3<f64> {
        d.map(|c| self.wrap_component(c))
    }

    /// Fold an absolute position into the primary cell centred on the origin.
    ///
    /// Stored positions are never rewritten with this; backends apply it to
    /// their own copy before evaluating pairs.
    pub fn fold_position(&self, p: Vector3<f64>) -> Vector3<f64> {
        self.minimum_image(p)
    }

    /// Image of `rj` nearest to `ri` among the 27 replicas, if it lies inside
    /// the cutoff sphere.
    pub fn nearest_image(&self, ri: &Vector3<f64>, rj: &Vector3<f64>) -> Option<Vector3<f64>> {
        let mut best: Option<(f64, Vector3<f64>)> = None;
        for (&sz, &sy, &sx) in iproduct!(&REPLICA_OFFSETS, &REPLICA_OFFSETS, &REPLICA_OFFSETS) {
            let image = rj + Vector3::new(sx, sy, sz) * self.length;
            let r2 = (image - ri).norm_squared();
            if r2 >= self.cutoff_sq {
                continue;
            }
            match best {
                Some((best_r2, _)) if best_r2 <= r2 => {}
                _ => best = Some((r2, image)),
            }
        }
        best.map(|(_, image)| image)
    }

    /// Every periodic image of every other particle inside the cutoff sphere
    /// of particle `i`, as `(j, image position)`.
    ///
    /// Replicas are visited z-major, then particles, so the order of the
    /// returned list is stable for a given input.
    pub fn neighbor_images(&self, positions: &[Vector3<f64>], i: usize) -> Vec<(usize, Vector3<f64>)> {
        let ri = positions[i];
        let mut neighbors = Vec::new();
        for (&sz, &sy, &sx) in iproduct!(&REPLICA_OFFSETS, &REPLICA_OFFSETS, &REPLICA_OFFSETS) {
            let shift = Vector3::new(sx, sy, sz) * self.length;
            for (j, rj) in positions.iter().enumerate() {
                if j == i {
                    continue;
                }
                let image = rj + shift;
                if (image - ri).norm_squared() < self.cutoff_sq {
                    neighbors.push((j, image));
                }
            }
        }
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn half_box_components_flip_sign() {
        let pbox = PeriodicBox::new(6.0, 3.0).unwrap();
        assert_eq!(pbox.wrap_component(3.0), -3.0);
        assert_eq!(pbox.wrap_component(-3.0), 3.0);
        assert_eq!(pbox.wrap_component(9.0), -3.0);
        assert_relative_eq!(pbox.wrap_component(2.999), 2.999, epsilon = 1e-12);
        assert_relative_eq!(pbox.wrap_component(3.001), -2.999, epsilon = 1e-12);
    }

    #[test]
    fn rejects_cutoff_beyond_half_box() {
        assert!(PeriodicBox::new(6.0, 3.0).is_ok());
        assert!(matches!(
            PeriodicBox::new(6.0, 3.01),
            Err(SimError::Config(_))
        ));
        assert!(PeriodicBox::new(0.0, 1.0).is_err());
        assert!(PeriodicBox::new(6.0, -1.0).is_err());
    }

    #[test]
    fn wrap_component_folds_into_half_box() {
        let pbox = PeriodicBox::new(6.0, 2.5).unwrap();
        assert_relative_eq!(pbox.wrap_component(4.0), -2.0, epsilon = 1e-12);
        assert_relative_eq!(pbox.wrap_component(-4.0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(pbox.wrap_component(13.5), 1.5, epsilon = 1e-12);
        assert_relative_eq!(pbox.wrap_component(0.7), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn nearest_image_crosses_the_boundary() {
        let pbox = PeriodicBox::new(6.0, 3.0).unwrap();
        let ri = Vector3::new(0.2, 3.0, 3.0);
        let rj = Vector3::new(5.8, 3.0, 3.0);
        let image = pbox.nearest_image(&ri, &rj).unwrap();
        assert_relative_eq!(image.x, -0.2, epsilon = 1e-12);
        assert_relative_eq!((image - ri).norm(), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn nearest_image_outside_cutoff_is_none() {
        let pbox = PeriodicBox::new(10.0, 2.0).unwrap();
        let ri = Vector3::new(1.0, 1.0, 1.0);
        let rj = Vector3::new(5.0, 5.0, 5.0);
        assert!(pbox.nearest_image(&ri, &rj).is_none());
    }

    #[test]
    fn enumeration_and_folding_agree_inside_cutoff() {
        let pbox = PeriodicBox::new(6.0, 3.0).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut checked = 0;
        for _ in 0..2000 {
            let ri = Vector3::new(rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()) * 6.0;
            let rj = Vector3::new(rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()) * 6.0;
            let folded = pbox.minimum_image(rj - ri);
            match pbox.nearest_image(&ri, &rj) {
                Some(image) => {
                    let enumerated = image - ri;
                    assert_relative_eq!(enumerated, folded, epsilon = 1e-9);
                    checked += 1;
                }
                None => assert!(folded.norm_squared() >= pbox.cutoff_sq() - 1e-9),
            }
        }
        assert!(checked > 100);
    }

    #[test]
    fn neighbor_images_lists_each_partner_once() {
        let pbox = PeriodicBox::new(6.0, 3.0).unwrap();
        let positions = vec![
            Vector3::new(0.5, 0.5, 0.5),
            Vector3::new(5.5, 0.5, 0.5),
            Vector3::new(3.0, 3.0, 3.0),
        ];
        let neighbors = pbox.neighbor_images(&positions, 0);
        let partners: Vec<usize> = neighbors.iter().map(|(j, _)| *j).collect();
        assert_eq!(partners, vec![1]);
        assert_relative_eq!(neighbors[0].1.x, -0.5, epsilon = 1e-12);
    }
}
