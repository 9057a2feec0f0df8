use crate::autodiff::Dual;
use crate::error::Error;
use crate::solvers::{Tsit5, RK4};
use crate::traits::{OdeSystem, Scalar, Steppable};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of internal refinement substeps taken between consecutive output
/// grid points. The output grid spacing is a sampling choice, not an
/// accuracy choice; refinement keeps the fixed-step integrators well inside
/// their stability region for every catalog system at the default grids.
const SUBSTEPS: usize = 10;

/// A numeric substrate: one coherent bundle of casting, concatenation,
/// gradient attachment, seeded sampling, and integration.
///
/// Exactly two implementations exist: [`ArrayBackend`] (plain `f64`) and
/// [`AutodiffBackend`] (gradient-tracked dual numbers). A system instance
/// owns exactly one backend for its lifetime; every array that flows through
/// its equations comes from that backend's `Elem` type, so substrates cannot
/// be mixed.
pub trait Backend {
    /// Element type of this substrate's arrays.
    type Elem: Scalar;

    /// Identifier accepted by [`BackendKind::from_name`].
    fn name(&self) -> &'static str;

    /// Casts a single value into the substrate.
    fn scalar(&self, value: f64) -> Self::Elem;

    /// Casts a numeric vector into the substrate. Shape and values are
    /// identical across substrates up to floating-point rounding.
    fn cast(&self, values: &[f64]) -> Vec<Self::Elem> {
        values.iter().map(|&v| self.scalar(v)).collect()
    }

    /// Concatenates a sequence of substrate arrays.
    fn concat(&self, parts: &[Vec<Self::Elem>]) -> Vec<Self::Elem> {
        let total = parts.iter().map(Vec::len).sum();
        let mut out = Vec::with_capacity(total);
        for part in parts {
            out.extend_from_slice(part);
        }
        out
    }

    /// Enables gradient tracking on a value. Identity on the array
    /// substrate; seeds the tangent part on the gradient substrate.
    fn attach_gradient(&self, value: Self::Elem, tracked: bool) -> Self::Elem;

    /// Deterministically reseeds this substrate's own random generator.
    fn seed(&mut self, seed: u64);

    /// Draws one uniform sample per component from `[low[i], high[i]]`
    /// using this substrate's generator.
    fn sample_uniform(&mut self, low: &[f64], high: &[f64]) -> Vec<f64>;

    /// Integrates `system` from `x0` over the time grid, returning one row
    /// per grid point (the first row is `x0` verbatim). Fails with
    /// [`Error::Integration`] as soon as a non-finite state value appears.
    fn integrate<E: OdeSystem<Self::Elem>>(
        &self,
        system: &E,
        x0: &[Self::Elem],
        time: &[f64],
    ) -> Result<DMatrix<Self::Elem>, Error>;
}

/// Walks the output grid, refining each interval into [`SUBSTEPS`] solver
/// steps and recording the state at every grid point.
fn integrate_grid<T, E, S>(
    stepper: &mut S,
    system: &E,
    x0: &[T],
    time: &[f64],
) -> Result<DMatrix<T>, Error>
where
    T: Scalar,
    E: OdeSystem<T>,
    S: Steppable<T>,
{
    if time.is_empty() {
        return Err(Error::Configuration(
            "time grid must contain at least one point".into(),
        ));
    }

    let dim = x0.len();
    let mut state = x0.to_vec();
    let mut rows: Vec<T> = Vec::with_capacity(time.len() * dim);
    rows.extend_from_slice(&state);

    let mut t = T::from_f64(time[0]).unwrap();
    for window in time.windows(2) {
        let dt = T::from_f64((window[1] - window[0]) / SUBSTEPS as f64).unwrap();
        for _ in 0..SUBSTEPS {
            stepper.step(system, &mut t, &mut state, dt);
        }
        for value in &state {
            let v = value.to_f64().unwrap_or(f64::NAN);
            if !v.is_finite() {
                return Err(Error::Integration { t: window[1] });
            }
        }
        rows.extend_from_slice(&state);
    }

    Ok(DMatrix::from_row_iterator(time.len(), dim, rows))
}

/// The plain-array substrate: `f64` elements, Tsit5 integration, no
/// gradient tracking.
pub struct ArrayBackend {
    rng: StdRng,
}

impl ArrayBackend {
    pub fn new() -> Self {
        Self {
            rng: StdRng::seed_from_u64(0),
        }
    }
}

impl Default for ArrayBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for ArrayBackend {
    type Elem = f64;

    fn name(&self) -> &'static str {
        "array"
    }

    fn scalar(&self, value: f64) -> f64 {
        value
    }

    fn attach_gradient(&self, value: f64, _tracked: bool) -> f64 {
        // No tangent to carry on this substrate.
        value
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn sample_uniform(&mut self, low: &[f64], high: &[f64]) -> Vec<f64> {
        debug_assert_eq!(low.len(), high.len());
        low.iter()
            .zip(high)
            .map(|(&lo, &hi)| self.rng.random_range(lo..=hi))
            .collect()
    }

    fn integrate<E: OdeSystem<f64>>(
        &self,
        system: &E,
        x0: &[f64],
        time: &[f64],
    ) -> Result<DMatrix<f64>, Error> {
        let mut stepper = Tsit5::new(x0.len());
        integrate_grid(&mut stepper, system, x0, time)
    }
}

/// The gradient-tracked substrate: dual-number elements, RK4 integration.
/// Tracked parameters enter with a seeded tangent and every downstream
/// state value carries the corresponding sensitivity.
pub struct AutodiffBackend {
    rng: StdRng,
}

impl AutodiffBackend {
    pub fn new() -> Self {
        Self {
            rng: StdRng::seed_from_u64(0),
        }
    }
}

impl Default for AutodiffBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for AutodiffBackend {
    type Elem = Dual;

    fn name(&self) -> &'static str {
        "autodiff"
    }

    fn scalar(&self, value: f64) -> Dual {
        Dual::constant(value)
    }

    fn attach_gradient(&self, value: Dual, tracked: bool) -> Dual {
        if tracked {
            Dual::tracked(value.val)
        } else {
            value
        }
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn sample_uniform(&mut self, low: &[f64], high: &[f64]) -> Vec<f64> {
        debug_assert_eq!(low.len(), high.len());
        low.iter()
            .zip(high)
            .map(|(&lo, &hi)| self.rng.random_range(lo..=hi))
            .collect()
    }

    fn integrate<E: OdeSystem<Dual>>(
        &self,
        system: &E,
        x0: &[Dual],
        time: &[f64],
    ) -> Result<DMatrix<Dual>, Error> {
        let mut stepper = RK4::new(x0.len());
        integrate_grid(&mut stepper, system, x0, time)
    }
}

/// Substrate selector, resolved from the identifiers `"array"` and
/// `"autodiff"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Array,
    Autodiff,
}

impl BackendKind {
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "array" => Ok(BackendKind::Array),
            "autodiff" => Ok(BackendKind::Autodiff),
            other => Err(Error::Configuration(format!(
                "unknown backend `{other}`; expected `array` or `autodiff`"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Array => "array",
            BackendKind::Autodiff => "autodiff",
        }
    }
}
