//! External force models: pure maps from `(time, position)` to a force value.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A force sampled by the integrators. Implementations are pure and total
/// over finite inputs: no internal state, never NaN or infinite.
pub trait ForceModel {
    fn evaluate(&self, t: f64, z: f64) -> f64;
}

/// Closures double as force models, which keeps one-off forces (and tests)
/// lightweight.
impl<F> ForceModel for F
where
    F: Fn(f64, f64) -> f64,
{
    fn evaluate(&self, t: f64, z: f64) -> f64 {
        self(t, z)
    }
}

/// Constant force inside an open time window, zero outside. Both boundary
/// samples return zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepForce {
    t0: f64,
    t1: f64,
    magnitude: f64,
}

impl StepForce {
    pub fn new(t0: f64, t1: f64, magnitude: f64) -> Result<Self> {
        if !(t0 < t1) {
            return Err(Error::config(format!(
                "force window must satisfy t0 < t1, got [{t0}, {t1}]"
            )));
        }
        Ok(Self { t0, t1, magnitude })
    }
}

impl ForceModel for StepForce {
    fn evaluate(&self, t: f64, _z: f64) -> f64 {
        if t > self.t0 && t < self.t1 {
            self.magnitude
        } else {
            0.0
        }
    }
}

/// Numerically stable logistic `1/(1 + e^-x)`. The branch keeps the exponent
/// nonpositive, so large `|x|` saturates to 0 or 1 instead of overflowing.
fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Smooth saturating force as a function of displacement magnitude: three
/// logistic terms with fixed thresholds at 20, 25 and 85 mm-scale units
/// (`a_k = c_k - 1000*|z|`), combined as `2*L1 - L2 - L3` and scaled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SaturatingForce {
    scale: f64,
}

impl SaturatingForce {
    const THRESHOLDS: [f64; 3] = [20.0, 25.0, 85.0];

    pub fn new(scale: f64) -> Self {
        Self { scale }
    }
}

impl ForceModel for SaturatingForce {
    fn evaluate(&self, _t: f64, z: f64) -> f64 {
        let u = 1000.0 * z.abs();
        let [c1, c2, c3] = Self::THRESHOLDS;
        self.scale * (2.0 * logistic(c1 - u) - logistic(c2 - u) - logistic(c3 - u))
    }
}

/// Piecewise-linear interpolation over a sampled force table, the wrapper for
/// data loaded with [`crate::io::load_force_table`]. End values are held
/// constant outside the tabulated range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabulatedForce {
    times: Vec<f64>,
    forces: Vec<f64>,
}

impl TabulatedForce {
    pub fn new(times: Vec<f64>, forces: Vec<f64>) -> Result<Self> {
        if times.len() != forces.len() {
            return Err(Error::config(format!(
                "force table columns differ in length ({} vs {})",
                times.len(),
                forces.len()
            )));
        }
        if times.len() < 2 {
            return Err(Error::config(
                "force table needs at least two samples to interpolate",
            ));
        }
        if !times.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::config(
                "force table times must be strictly increasing",
            ));
        }
        Ok(Self { times, forces })
    }
}

impl ForceModel for TabulatedForce {
    fn evaluate(&self, t: f64, _z: f64) -> f64 {
        let n = self.times.len();
        if t <= self.times[0] {
            return self.forces[0];
        }
        if t >= self.times[n - 1] {
            return self.forces[n - 1];
        }
        // partition_point finds the first knot strictly past t.
        let hi = self.times.partition_point(|&ti| ti <= t);
        let lo = hi - 1;
        let w = (t - self.times[lo]) / (self.times[hi] - self.times[lo]);
        self.forces[lo] + w * (self.forces[hi] - self.forces[lo])
    }
}

#[cfg(test)]
mod tests {
    use super::{ForceModel, SaturatingForce, StepForce, TabulatedForce};
    use crate::error::Error;
    use approx::assert_relative_eq;

    #[test]
    fn step_force_window_is_open() {
        let m = 9.81 * 6e-3;
        let f = StepForce::new(0.06, 0.25, m).unwrap();
        assert_eq!(f.evaluate(0.06, 0.0), 0.0);
        assert_eq!(f.evaluate(0.1, 0.0), m);
        assert_eq!(f.evaluate(0.25, 0.0), 0.0);
        assert_eq!(f.evaluate(0.3, 0.0), 0.0);
        assert_eq!(f.evaluate(0.0, 0.0), 0.0);
    }

    #[test]
    fn step_force_rejects_inverted_window() {
        assert!(matches!(
            StepForce::new(0.25, 0.06, 1.0).unwrap_err(),
            Error::InvalidConfiguration(_)
        ));
        assert!(matches!(
            StepForce::new(0.1, 0.1, 1.0).unwrap_err(),
            Error::InvalidConfiguration(_)
        ));
    }

    #[test]
    fn saturating_force_is_finite_and_continuous() {
        let f = SaturatingForce::new(0.5);
        let n = 10_000;
        let mut prev = f.evaluate(0.0, 0.0);
        for i in 1..=n {
            let z = i as f64 / n as f64;
            let val = f.evaluate(0.0, z);
            assert!(val.is_finite(), "not finite at z = {z}");
            // 1e-4 spacing in z moves each logistic argument by 0.1, which
            // bounds the change well below 0.1 for scale 0.5.
            assert!((val - prev).abs() < 0.1, "jump at z = {z}");
            prev = val;
        }
    }

    #[test]
    fn saturating_force_vanishes_at_origin_and_far_away() {
        let f = SaturatingForce::new(2.0);
        assert_relative_eq!(f.evaluate(0.0, 0.0), 0.0, epsilon = 1e-6);
        assert_relative_eq!(f.evaluate(0.0, 1e6), 0.0, epsilon = 1e-12);
        assert_relative_eq!(f.evaluate(0.0, -1e6), 0.0, epsilon = 1e-12);
        assert!(f.evaluate(0.0, 1e300).is_finite());
    }

    #[test]
    fn saturating_force_is_even_in_position() {
        let f = SaturatingForce::new(1.3);
        for z in [0.01, 0.022, 0.05, 0.3] {
            assert_eq!(f.evaluate(0.0, z), f.evaluate(0.0, -z));
        }
    }

    #[test]
    fn tabulated_force_interpolates_linearly() {
        let f = TabulatedForce::new(vec![0.0, 1.0, 2.0], vec![0.0, 2.0, 0.0]).unwrap();
        assert_relative_eq!(f.evaluate(0.5, 0.0), 1.0);
        assert_relative_eq!(f.evaluate(1.0, 0.0), 2.0);
        assert_relative_eq!(f.evaluate(1.75, 0.0), 0.5);
        // Held flat outside the table.
        assert_relative_eq!(f.evaluate(-1.0, 0.0), 0.0);
        assert_relative_eq!(f.evaluate(3.0, 0.0), 0.0);
    }

    #[test]
    fn tabulated_force_rejects_bad_tables() {
        assert!(TabulatedForce::new(vec![0.0], vec![1.0]).is_err());
        assert!(TabulatedForce::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(TabulatedForce::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(TabulatedForce::new(vec![1.0, 0.0], vec![1.0, 2.0]).is_err());
    }
}
