//! Adaptive integration driver.
//!
//! A thin adapter between the simulation data model and the embedded
//! steppers: it owns the accept/reject loop, lands exactly on every
//! requested evaluation time, and reconstructs the reported force from the
//! solved positions. It performs no stepping arithmetic itself.

use crate::error::{Error, Result};
use crate::forces::ForceModel;
use crate::settings::{InitialConditions, SimulationSettings};
use crate::solvers::{Dopri5, EmbeddedStepper, ImplicitTrapezoid, Method, StepController, Tolerances};
use crate::system::FallingMagnet;
use crate::traits::DynamicalSystem;
use crate::trajectory::{AuxChannel, Sample, Trajectory};

/// Options for one adaptive run.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveOptions {
    pub method: Method,
    pub tolerances: Tolerances,
    /// Budget of trial steps (accepted and rejected) for the whole run.
    pub max_steps: usize,
    /// Starting step size; a tenth of the first grid interval when absent.
    pub initial_step: Option<f64>,
}

impl Default for AdaptiveOptions {
    fn default() -> Self {
        Self {
            method: Method::Dopri5,
            tolerances: Tolerances::default(),
            max_steps: 100_000,
            initial_step: None,
        }
    }
}

/// Uniform evaluation grid `i * dt` for `i < floor(end_time/dt)`, matching
/// the fixed-step path sample for sample.
pub fn sample_times(end_time: f64, dt: f64) -> Vec<f64> {
    let n = (end_time / dt).floor() as usize;
    (0..n).map(|i| i as f64 * dt).collect()
}

enum Stepper {
    Dopri5(Dopri5),
    Trapezoid(ImplicitTrapezoid),
}

impl Stepper {
    fn build(method: Method, dim: usize) -> Self {
        match method {
            Method::Dopri5 => Stepper::Dopri5(Dopri5::new(dim)),
            Method::ImplicitTrapezoid => Stepper::Trapezoid(ImplicitTrapezoid::new(dim)),
        }
    }

    fn embedded_order(&self) -> usize {
        match self {
            Stepper::Dopri5(s) => s.embedded_order(),
            Stepper::Trapezoid(s) => s.embedded_order(),
        }
    }

    fn try_step(
        &mut self,
        system: &impl DynamicalSystem,
        t: f64,
        y: &[f64],
        h: f64,
        tol: &Tolerances,
        y_new: &mut [f64],
    ) -> f64 {
        match self {
            Stepper::Dopri5(s) => s.try_step(system, t, y, h, tol, y_new),
            Stepper::Trapezoid(s) => s.try_step(system, t, y, h, tol, y_new),
        }
    }
}

fn validate_grid(eval_times: &[f64]) -> Result<()> {
    let Some(&first) = eval_times.first() else {
        return Err(Error::config("evaluation grid must not be empty"));
    };
    if first != 0.0 {
        return Err(Error::config(format!(
            "evaluation grid must start at t = 0, got {first}"
        )));
    }
    if !eval_times.windows(2).all(|w| w[0] < w[1]) {
        return Err(Error::config(
            "evaluation times must be strictly increasing",
        ));
    }
    Ok(())
}

/// Integrates the nonlinear first-order system over the requested grid.
///
/// Every returned sample carries the solved `(z, v)` at exactly the
/// requested time plus the reconstructed total force
/// `f = -m g + F(t, z)`, recomputed from the returned position so the
/// force trace never depends on the solver's internal step sizes.
pub fn integrate_adaptive(
    settings: &SimulationSettings,
    ic: InitialConditions,
    force: &impl ForceModel,
    eval_times: &[f64],
    options: &AdaptiveOptions,
) -> Result<Trajectory> {
    validate_grid(eval_times)?;
    let tol = options.tolerances;
    if !(tol.rtol > 0.0) || !(tol.atol > 0.0) {
        return Err(Error::config(format!(
            "tolerances must be positive, got rtol = {}, atol = {}",
            tol.rtol, tol.atol
        )));
    }
    if options.max_steps == 0 {
        return Err(Error::config("max_steps must be at least 1"));
    }

    let system = FallingMagnet::new(settings, force);
    let mut stepper = Stepper::build(options.method, system.dimension());
    let controller = StepController::for_embedded_order(stepper.embedded_order());

    let mg = settings.mass() * settings.gravity();
    let total_force = |t: f64, z: f64| -mg + force.evaluate(t, z);

    let mut trajectory = Trajectory::with_capacity(AuxChannel::Force, eval_times.len());
    let mut y = vec![ic.z0, ic.v0];
    let mut y_new = vec![0.0; y.len()];
    trajectory.push(Sample {
        t: 0.0,
        z: y[0],
        v: y[1],
        aux: total_force(0.0, y[0]),
    });
    if eval_times.len() == 1 {
        return Ok(trajectory);
    }

    let span = eval_times[eval_times.len() - 1];
    let h_floor = 1e-14 * span.max(1.0);
    let mut h = options
        .initial_step
        .unwrap_or(0.1 * (eval_times[1] - eval_times[0]));
    if !(h > 0.0) {
        return Err(Error::config(format!(
            "initial step must be positive, got {h}"
        )));
    }

    let mut t = 0.0;
    let mut steps = 0usize;
    for &target in &eval_times[1..] {
        while t < target {
            if steps >= options.max_steps {
                return Err(Error::IntegrationFailure {
                    t_reached: t,
                    reason: format!("step budget of {} exhausted", options.max_steps),
                });
            }
            steps += 1;

            // Clamp so an accepted step lands exactly on the grid point.
            let h_try = h.min(target - t);
            let err = stepper.try_step(&system, t, &y, h_try, &tol, &mut y_new);
            if err <= 1.0 {
                t += h_try;
                y.copy_from_slice(&y_new);
                if target - t < h_floor {
                    t = target;
                }
                h = h_try * controller.factor(err);
            } else {
                h = h_try * controller.factor(err);
                if h < h_floor {
                    return Err(Error::IntegrationFailure {
                        t_reached: t,
                        reason: "step size underflow".into(),
                    });
                }
            }
        }
        trajectory.push(Sample {
            t: target,
            z: y[0],
            v: y[1],
            aux: total_force(target, y[0]),
        });
    }
    Ok(trajectory)
}
