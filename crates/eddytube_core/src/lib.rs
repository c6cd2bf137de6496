//! The `eddytube_core` crate integrates the equation of motion of a magnet
//! falling through a conducting tube, `m z'' = -m g + f(t, z)`, with the
//! external force modeling the eddy-current braking.
//!
//! Key components:
//! - **Traits**: `DynamicalSystem` (first-order vector fields), `ForceModel`
//!   (external forcing), `EmbeddedStepper` (adaptive schemes).
//! - **Recurrence**: the fixed-step semi-implicit Euler path built on
//!   precomputed linear operators.
//! - **Solvers/Driver**: embedded Dormand-Prince 5(4) and implicit
//!   trapezoidal steppers behind an adaptive driver with method selection.
//! - **Trajectory/IO**: the `(t, z, v, a-or-f)` result sequence and its
//!   text-table export/import.

pub mod driver;
pub mod error;
pub mod forces;
pub mod io;
pub mod recurrence;
pub mod settings;
pub mod solvers;
pub mod system;
pub mod traits;
pub mod trajectory;
