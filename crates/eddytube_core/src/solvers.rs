//! Adaptive steppers with embedded error control.
//!
//! Two stepping families back the adaptive driver: an explicit Dormand-
//! Prince 5(4) pair for non-stiff runs and an A-stable implicit trapezoidal
//! rule (Newton-solved, backward-Euler error estimate) for stiff forcing.
//! Both report a scaled error norm per trial step; the driver owns the
//! accept/reject loop.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::DynamicalSystem;

/// Relative/absolute tolerances for the embedded error norm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-9,
        }
    }
}

/// RMS of the component-wise error scaled by `atol + rtol*max(|y|, |y_new|)`.
/// A trial step is acceptable when this is at most 1.
fn error_norm(err: &[f64], y: &[f64], y_new: &[f64], tol: &Tolerances) -> f64 {
    let n = err.len();
    let mut sum = 0.0;
    for i in 0..n {
        let scale = tol.atol + tol.rtol * y[i].abs().max(y_new[i].abs());
        let r = err[i] / scale;
        sum += r * r;
    }
    (sum / n as f64).sqrt()
}

/// I-controller for the next step size: `factor = safety * err^(-1/(p+1))`
/// with `p` the embedded order, clamped to `[min_factor, max_factor]`.
#[derive(Debug, Clone, Copy)]
pub struct StepController {
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
    exponent: f64,
}

impl StepController {
    pub fn for_embedded_order(order: usize) -> Self {
        Self {
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 5.0,
            exponent: 1.0 / (order as f64 + 1.0),
        }
    }

    /// Step-size adjustment factor for a trial step's error norm. An
    /// infinite norm (failed internal solve) maps to the strongest
    /// reduction.
    pub fn factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }
        if !error.is_finite() {
            return self.min_factor;
        }
        (self.safety * error.powf(-self.exponent)).clamp(self.min_factor, self.max_factor)
    }
}

/// One adaptive stepping scheme. `try_step` proposes `y(t + h)` without
/// committing anything; the caller accepts or rejects on the returned norm.
pub trait EmbeddedStepper {
    /// Order of the embedded (lower) solution, which drives the controller
    /// exponent.
    fn embedded_order(&self) -> usize;

    /// Attempts one step of size `h` from `(t, y)`, writing the proposal
    /// into `y_new`. Returns the scaled error norm; infinity signals that
    /// the internal solve failed and the step must shrink.
    fn try_step(
        &mut self,
        system: &impl DynamicalSystem,
        t: f64,
        y: &[f64],
        h: f64,
        tol: &Tolerances,
        y_new: &mut [f64],
    ) -> f64;
}

/// Dormand-Prince 5(4): seven stages, fifth-order propagation, fourth-order
/// embedded solution for the error estimate.
pub struct Dopri5 {
    k: [Vec<f64>; 7],
    tmp: Vec<f64>,
    err: Vec<f64>,
}

impl Dopri5 {
    pub fn new(dim: usize) -> Self {
        Self {
            k: std::array::from_fn(|_| vec![0.0; dim]),
            tmp: vec![0.0; dim],
            err: vec![0.0; dim],
        }
    }
}

impl EmbeddedStepper for Dopri5 {
    fn embedded_order(&self) -> usize {
        4
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
        let n = y.len();

        let c = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];
        let a: [&[f64]; 7] = [
            &[],
            &[1.0 / 5.0],
            &[3.0 / 40.0, 9.0 / 40.0],
            &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
            &[
                19372.0 / 6561.0,
                -25360.0 / 2187.0,
                64448.0 / 6561.0,
                -212.0 / 729.0,
            ],
            &[
                9017.0 / 3168.0,
                -355.0 / 33.0,
                46732.0 / 5247.0,
                49.0 / 176.0,
                -5103.0 / 18656.0,
            ],
            &[
                35.0 / 384.0,
                0.0,
                500.0 / 1113.0,
                125.0 / 192.0,
                -2187.0 / 6784.0,
                11.0 / 84.0,
            ],
        ];
        // Fifth-order weights equal the last tableau row (FSAL pair); the
        // embedded fourth-order weights differ below.
        let b5 = [
            35.0 / 384.0,
            0.0,
            500.0 / 1113.0,
            125.0 / 192.0,
            -2187.0 / 6784.0,
            11.0 / 84.0,
            0.0,
        ];
        let b4 = [
            5179.0 / 57600.0,
            0.0,
            7571.0 / 16695.0,
            393.0 / 640.0,
            -92097.0 / 339200.0,
            187.0 / 2100.0,
            1.0 / 40.0,
        ];

        system.apply(t, y, &mut self.k[0]);
        for s in 1..7 {
            for i in 0..n {
                let mut acc = 0.0;
                for (j, &aij) in a[s].iter().enumerate() {
                    acc += aij * self.k[j][i];
                }
                self.tmp[i] = y[i] + h * acc;
            }
            system.apply(t + c[s] * h, &self.tmp, &mut self.k[s]);
        }

        for i in 0..n {
            let mut y5 = 0.0;
            let mut y4 = 0.0;
            for s in 0..7 {
                y5 += b5[s] * self.k[s][i];
                y4 += b4[s] * self.k[s][i];
            }
            y_new[i] = y[i] + h * y5;
            self.err[i] = h * (y5 - y4);
        }
        error_norm(&self.err, y, y_new, tol)
    }
}

/// Newton iteration limits for the implicit trapezoidal stepper.
const NEWTON_MAX_ITER: usize = 12;
const NEWTON_TOL: f64 = 1e-3;
const JACOBIAN_EPS: f64 = 1e-8;

/// A-stable trapezoidal rule, `y1 = y0 + h/2 (f(t, y0) + f(t+h, y1))`,
/// solved by Newton with a finite-difference Jacobian. The local error is
/// estimated against the embedded backward-Euler solution, which reduces to
/// `h/2 (f1 - f0)`.
pub struct ImplicitTrapezoid {
    f0: Vec<f64>,
    f1: Vec<f64>,
    ftmp: Vec<f64>,
    residual: Vec<f64>,
    err: Vec<f64>,
}

impl ImplicitTrapezoid {
    pub fn new(dim: usize) -> Self {
        Self {
            f0: vec![0.0; dim],
            f1: vec![0.0; dim],
            ftmp: vec![0.0; dim],
            residual: vec![0.0; dim],
            err: vec![0.0; dim],
        }
    }

    /// `G(y1) = y1 - y0 - h/2 (f0 + f(t1, y1))`, written into
    /// `self.residual`; `self.f1` holds `f(t1, y1)` afterwards.
    fn eval_residual(&mut self, system: &impl DynamicalSystem, t1: f64, y0: &[f64], y1: &[f64], h: f64) {
        system.apply(t1, y1, &mut self.f1);
        for i in 0..y0.len() {
            self.residual[i] = y1[i] - y0[i] - 0.5 * h * (self.f0[i] + self.f1[i]);
        }
    }

    /// Finite-difference Jacobian of `G` at `y1`: `I - h/2 df/dy`.
    fn jacobian(&mut self, system: &impl DynamicalSystem, t1: f64, y1: &mut [f64], h: f64) -> DMatrix<f64> {
        let n = y1.len();
        let mut jac = DMatrix::identity(n, n);
        for j in 0..n {
            let orig = y1[j];
            let dy = JACOBIAN_EPS * orig.abs().max(1.0);
            y1[j] = orig + dy;
            system.apply(t1, y1, &mut self.ftmp);
            y1[j] = orig;
            for i in 0..n {
                jac[(i, j)] -= 0.5 * h * (self.ftmp[i] - self.f1[i]) / dy;
            }
        }
        jac
    }
}

impl EmbeddedStepper for ImplicitTrapezoid {
    fn embedded_order(&self) -> usize {
        1
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
        let n = y.len();
        let t1 = t + h;
        system.apply(t, y, &mut self.f0);

        // Explicit Euler predictor, then Newton on the trapezoidal residual.
        for i in 0..n {
            y_new[i] = y[i] + h * self.f0[i];
        }
        let mut converged = false;
        for _ in 0..NEWTON_MAX_ITER {
            self.eval_residual(system, t1, y, y_new, h);
            let jac = self.jacobian(system, t1, y_new, h);
            let rhs = DVector::from_column_slice(&self.residual);
            let Some(delta) = jac.lu().solve(&rhs) else {
                return f64::INFINITY;
            };
            let mut scaled = 0.0f64;
            for i in 0..n {
                y_new[i] -= delta[i];
                let scale = tol.atol + tol.rtol * y_new[i].abs();
                scaled = scaled.max((delta[i] / scale).abs());
            }
            if scaled <= NEWTON_TOL {
                converged = true;
                break;
            }
        }
        if !converged {
            return f64::INFINITY;
        }

        // f1 is stale by one Newton update at most; refresh for the error
        // estimate.
        system.apply(t1, y_new, &mut self.f1);
        for i in 0..n {
            self.err[i] = 0.5 * h * (self.f1[i] - self.f0[i]);
        }
        error_norm(&self.err, y, y_new, tol)
    }
}

/// Named integration methods understood by the adaptive driver. The set is
/// open-ended; unknown names surface as [`Error::UnsupportedMethod`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Dopri5,
    ImplicitTrapezoid,
}

impl Method {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dopri5" | "rk45" | "dormand-prince" => Ok(Method::Dopri5),
            "trapezoid" | "implicit-trapezoid" | "itrap" => Ok(Method::ImplicitTrapezoid),
            _ => Err(Error::UnsupportedMethod(name.to_string())),
        }
    }

    /// Canonical name, used for export filename derivation.
    pub fn name(&self) -> &'static str {
        match self {
            Method::Dopri5 => "dopri5",
            Method::ImplicitTrapezoid => "trapezoid",
        }
    }
}
