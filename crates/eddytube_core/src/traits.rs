/// A first-order vector field `dx/dt = f(t, x)`.
///
/// Implementations are stateless behind `&self`: adaptive solvers evaluate
/// them at out-of-order and sub-step times, including rejected trial steps.
pub trait DynamicalSystem {
    /// Dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// t: current time
    /// x: current state
    /// out: buffer receiving dx/dt
    fn apply(&self, t: f64, x: &[f64], out: &mut [f64]);
}
