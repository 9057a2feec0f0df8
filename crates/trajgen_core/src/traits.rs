use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars inside equation code.
/// Must support floating-point arithmetic, debug printing, and conversion
/// from f64. Implemented by `f64` (array substrate) and `Dual` (gradient
/// substrate), so the same right-hand side runs under both.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Right-hand side of an autonomous ODE: dx/dt = rhs(t, x).
///
/// Implementations must be pure: no hidden state, no I/O, no randomness.
/// The integrator may evaluate at arbitrary `(t, x)` pairs, including
/// intermediate points that never land on the output grid.
pub trait OdeSystem<T: Scalar> {
    /// Dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field into `dx`.
    fn rhs(&self, t: T, x: &[T], dx: &mut [T]);
}

/// A trait for solvers that can step a system forward.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size `dt`, updating `t` and `state` in place.
    fn step(&mut self, system: &impl OdeSystem<T>, t: &mut T, state: &mut [T], dt: T);
}
