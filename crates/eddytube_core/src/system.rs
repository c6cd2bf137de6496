//! The falling-magnet dynamics as a first-order system, for consumption by
//! the adaptive solvers.

use crate::forces::ForceModel;
use crate::settings::SimulationSettings;
use crate::traits::DynamicalSystem;

/// `m z'' = -m g + f(t, z)` rewritten in the state vector `x = (z, v)`:
///
/// ```text
/// z' = v
/// v' = -g + f(t, z) / m
/// ```
pub struct FallingMagnet<'a, F: ForceModel> {
    mass: f64,
    gravity: f64,
    force: &'a F,
}

impl<'a, F: ForceModel> FallingMagnet<'a, F> {
    pub fn new(settings: &SimulationSettings, force: &'a F) -> Self {
        Self {
            mass: settings.mass(),
            gravity: settings.gravity(),
            force,
        }
    }
}

impl<F: ForceModel> DynamicalSystem for FallingMagnet<'_, F> {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = x[1];
        out[1] = -self.gravity + self.force.evaluate(t, x[0]) / self.mass;
    }
}
