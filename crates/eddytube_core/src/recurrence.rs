//! Fixed-step semi-implicit (backward) Euler path.
//!
//! `m z'' = -m g + f(t, z)` as a first-order system:
//!
//! ```text
//! | 1   0 | | z' |   | 0   1 | | z |   |    0     |
//! |       |.|    | = |       |.|   | + |          |
//! | 0   m | | v' |   | 0   0 | | v |   | -m g + f |
//! ```
//!
//! i.e. `A x' = M x + h`, discretized as `(A/dt - M) k = M x_{i-1} + h`,
//! `x_i = x_{i-1} + k`. The linear part is solved through the precomputed
//! inverse, so the velocity update is implicit and unconditionally stable;
//! the forcing term is sampled explicitly, so accuracy for fast-varying
//! forces is limited by how well `dt` resolves them.

use nalgebra::{Matrix2, Vector2};

use crate::error::{Error, Result};
use crate::forces::ForceModel;
use crate::settings::{InitialConditions, SimulationSettings};
use crate::trajectory::{AuxChannel, Sample, Trajectory};

/// The constant matrices of the implicit-Euler recurrence, assembled once
/// per run and read-only afterwards.
#[derive(Debug, Clone)]
pub struct RecurrenceOperators {
    a: Matrix2<f64>,
    m: Matrix2<f64>,
    iam: Matrix2<f64>,
}

impl RecurrenceOperators {
    /// Builds `A`, `M` and `iAM = (A/dt - M)^-1`. The inverse cannot fail
    /// for positive mass and step size, but invertibility is checked rather
    /// than assumed.
    pub fn assemble(mass: f64, dt: f64) -> Result<Self> {
        let a = Matrix2::new(1.0, 0.0, 0.0, mass);
        let m = Matrix2::new(0.0, 1.0, 0.0, 0.0);
        let iam = (a / dt - m).try_inverse().ok_or(Error::SingularSystem)?;
        Ok(Self { a, m, iam })
    }

    pub fn a(&self) -> &Matrix2<f64> {
        &self.a
    }

    pub fn m(&self) -> &Matrix2<f64> {
        &self.m
    }

    pub fn iam(&self) -> &Matrix2<f64> {
        &self.iam
    }
}

/// Iterator advancing `(z, v)` one fixed step per call.
///
/// Item 0 is the seeded initial state; items `1..N` are integration steps;
/// the iterator is exhausted after `N = floor(end_time/dt)` samples. Step
/// `i` samples the force at the new time `t_i` but at the previous position
/// `z_{i-1}`, consistent with the semi-implicit discretization.
pub struct ImplicitEulerStepper<'a, F: ForceModel> {
    mass: f64,
    gravity: f64,
    dt: f64,
    ops: RecurrenceOperators,
    force: &'a F,
    state: Vector2<f64>,
    index: usize,
    total: usize,
}

impl<'a, F: ForceModel> ImplicitEulerStepper<'a, F> {
    pub fn new(
        settings: &SimulationSettings,
        ic: InitialConditions,
        force: &'a F,
    ) -> Result<Self> {
        let ops = RecurrenceOperators::assemble(settings.mass(), settings.dt())?;
        Ok(Self {
            mass: settings.mass(),
            gravity: settings.gravity(),
            dt: settings.dt(),
            ops,
            force,
            state: Vector2::new(ic.z0, ic.v0),
            index: 0,
            total: settings.num_samples(),
        })
    }

    fn acceleration(&self, f: f64) -> f64 {
        -self.gravity + f / self.mass
    }
}

impl<F: ForceModel> Iterator for ImplicitEulerStepper<'_, F> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.index >= self.total {
            return None;
        }
        // Timestamps come from multiplication, so the grid never drifts.
        let t = self.index as f64 * self.dt;

        let f = self.force.evaluate(t, self.state[0]);
        if self.index > 0 {
            let h = Vector2::new(0.0, -self.mass * self.gravity + f);
            let rhs = self.ops.m * self.state + h;
            let k = self.ops.iam * rhs;
            self.state += k;
        }
        self.index += 1;

        Some(Sample {
            t,
            z: self.state[0],
            v: self.state[1],
            aux: self.acceleration(f),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.index;
        (remaining, Some(remaining))
    }
}

/// Runs the fixed-step path to completion. The trajectory's fourth column
/// is the acceleration `-g + f_i/m`.
pub fn integrate_fixed(
    settings: &SimulationSettings,
    ic: InitialConditions,
    force: &impl ForceModel,
) -> Result<Trajectory> {
    let stepper = ImplicitEulerStepper::new(settings, ic, force)?;
    let mut trajectory =
        Trajectory::with_capacity(AuxChannel::Acceleration, settings.num_samples());
    for sample in stepper {
        trajectory.push(sample);
    }
    Ok(trajectory)
}

#[cfg(test)]
mod tests {
    use super::{integrate_fixed, ImplicitEulerStepper, RecurrenceOperators};
    use crate::forces::{ForceModel, StepForce};
    use crate::settings::{InitialConditions, SimulationSettings};
    use approx::assert_relative_eq;
    use nalgebra::Matrix2;

    fn zero_force(_t: f64, _z: f64) -> f64 {
        0.0
    }

    #[test]
    fn operators_invert_consistently() {
        for (m, dt) in [(1.0, 1e-3), (6e-3, 5e-4), (250.0, 2.0)] {
            let ops = RecurrenceOperators::assemble(m, dt).unwrap();
            let product = (ops.a() / dt - ops.m()) * ops.iam();
            let identity = Matrix2::identity();
            for i in 0..2 {
                for j in 0..2 {
                    assert_relative_eq!(product[(i, j)], identity[(i, j)], epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn trajectory_shape_and_exact_grid() {
        let settings = SimulationSettings::new(1.0, 9.81, 5e-4, 0.3).unwrap();
        let traj = integrate_fixed(&settings, InitialConditions::default(), &zero_force).unwrap();
        assert_eq!(traj.len(), 600);
        assert_eq!(traj[0].t, 0.0);
        for (i, sample) in traj.iter().enumerate() {
            assert_eq!(sample.t, i as f64 * 5e-4);
        }
    }

    #[test]
    fn initial_sample_matches_initial_conditions() {
        let settings = SimulationSettings::new(2.0, 9.81, 1e-3, 0.1).unwrap();
        let ic = InitialConditions::new(0.5, -1.0);
        let force = StepForce::new(-1.0, 1.0, 4.0).unwrap();
        let traj = integrate_fixed(&settings, ic, &force).unwrap();
        assert_eq!(traj[0].z, 0.5);
        assert_eq!(traj[0].v, -1.0);
        // a0 uses the force at t0 with the initial position.
        assert_relative_eq!(traj[0].aux, -9.81 + force.evaluate(0.0, 0.5) / 2.0);
    }

    #[test]
    fn free_fall_velocity_is_exact() {
        let settings = SimulationSettings::new(6e-3, 9.81, 1e-3, 0.5).unwrap();
        let traj = integrate_fixed(&settings, InitialConditions::new(0.0, 0.2), &zero_force)
            .unwrap();
        for sample in &traj {
            assert_relative_eq!(sample.v, 0.2 - 9.81 * sample.t, epsilon = 1e-9);
            assert_relative_eq!(sample.aux, -9.81);
        }
    }

    #[test]
    fn free_fall_position_error_shrinks_linearly_in_dt() {
        // First-order method: the position error at fixed T is ~ g*dt*T/2,
        // so halving dt should roughly halve it.
        let exact = |t: f64| -0.5 * 9.81 * t * t;
        let error_at_end = |dt: f64| {
            let settings = SimulationSettings::new(1.0, 9.81, dt, 1.0).unwrap();
            let traj =
                integrate_fixed(&settings, InitialConditions::default(), &zero_force).unwrap();
            let last = traj.last().unwrap();
            (last.z - exact(last.t)).abs()
        };
        let coarse = error_at_end(1e-2);
        let fine = error_at_end(5e-3);
        let ratio = coarse / fine;
        assert!(
            (1.6..2.4).contains(&ratio),
            "expected ~2x error reduction, got {ratio}"
        );
    }

    #[test]
    fn step_force_only_acts_inside_the_window() {
        let mass = 6e-3;
        let settings = SimulationSettings::new(mass, 9.81, 5e-4, 0.3).unwrap();
        let force = StepForce::new(0.06, 0.25, mass * 9.81).unwrap();
        let traj = integrate_fixed(&settings, InitialConditions::default(), &force).unwrap();

        for sample in &traj {
            if sample.t > 0.06 && sample.t < 0.25 {
                // Force balances gravity exactly inside the window.
                assert_relative_eq!(sample.aux, 0.0, epsilon = 1e-12);
            } else {
                assert_relative_eq!(sample.aux, -9.81, epsilon = 1e-12);
            }
        }
        // Velocity is frozen across the balanced window.
        let at = |t: f64| traj[(t / 5e-4).round() as usize];
        assert_relative_eq!(at(0.1).v, at(0.2).v, epsilon = 1e-12);
        assert!(at(0.29).v < at(0.05).v);
    }

    #[test]
    fn stepper_reports_its_length() {
        let settings = SimulationSettings::new(1.0, 9.81, 1e-2, 0.1).unwrap();
        let stepper =
            ImplicitEulerStepper::new(&settings, InitialConditions::default(), &zero_force)
                .unwrap();
        assert_eq!(stepper.size_hint(), (10, Some(10)));
        assert_eq!(stepper.count(), 10);
    }
}
