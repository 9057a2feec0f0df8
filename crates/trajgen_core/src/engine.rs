use crate::autodiff::Dual;
use crate::backend::Backend;
use crate::error::Error;
use crate::model::{Model, ModelKind};
use crate::traits::{OdeSystem, Scalar};
use nalgebra::DMatrix;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Simulation configuration shared by every catalog system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of integration steps; the trajectory has `nsim + 1` rows.
    pub nsim: usize,
    /// Start time of the grid.
    pub ninit: f64,
    /// Step size of the grid. Must be positive.
    pub ts: f64,
    /// Seed for the backend's random generator.
    pub seed: u64,
    /// Explicit initial state; the catalog default when absent.
    pub x0: Option<Vec<f64>>,
    /// Whether registered parameters carry gradient tracking.
    pub requires_grad: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nsim: 1001,
            ninit: 0.0,
            ts: 0.1,
            seed: 59,
            x0: None,
            requires_grad: false,
        }
    }
}

/// Per-call overrides for [`System::simulate_with`]. Any `None` falls back
/// to the stored configuration.
#[derive(Debug, Clone, Default)]
pub struct SimOptions {
    pub ninit: Option<f64>,
    pub nsim: Option<usize>,
    pub ts: Option<f64>,
    /// Explicit time grid; when present its length dictates the row count
    /// and `ninit`/`nsim`/`ts` are ignored.
    pub time: Option<Vec<f64>>,
    pub x0: Option<Vec<f64>>,
}

/// A simulated trajectory. `x` is the state trajectory, one row per grid
/// point; `y` is the observation view, identical for these fully observed
/// systems.
#[derive(Debug, Clone)]
pub struct SimResult<T: Scalar> {
    pub x: DMatrix<T>,
    pub y: DMatrix<T>,
}

impl<T: Scalar> SimResult<T> {
    /// Reads the trajectory out as plain `f64` values, discarding any
    /// tangent information.
    pub fn values(&self) -> SimResult<f64> {
        let x = self.x.map(|v| v.to_f64().unwrap_or(f64::NAN));
        SimResult { y: x.clone(), x }
    }
}

impl SimResult<Dual> {
    /// The tangent parts of a gradient-tracked trajectory: the directional
    /// derivative of every state value along the tracked-parameter
    /// direction.
    pub fn sensitivity(&self) -> DMatrix<f64> {
        self.x.map(|v| v.eps)
    }
}

/// Per-dimension summary statistics of one reference trajectory,
/// characterizing the system's operating envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub mean: Vec<f64>,
    pub var: Vec<f64>,
    pub std: Vec<f64>,
}

impl Stats {
    /// Reduces a trajectory along the time axis. Variance is the
    /// population variance.
    fn from_trajectory<T: Scalar>(trajectory: &DMatrix<T>) -> Self {
        let rows = trajectory.nrows();
        let cols = trajectory.ncols();
        let mut stats = Stats::default();
        for j in 0..cols {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            let mut sum = 0.0;
            for i in 0..rows {
                let v = trajectory[(i, j)].to_f64().unwrap_or(f64::NAN);
                min = min.min(v);
                max = max.max(v);
                sum += v;
            }
            let mean = sum / rows as f64;
            let mut var = 0.0;
            for i in 0..rows {
                let v = trajectory[(i, j)].to_f64().unwrap_or(f64::NAN);
                var += (v - mean) * (v - mean);
            }
            var /= rows as f64;
            stats.min.push(min);
            stats.max.push(max);
            stats.mean.push(mean);
            stats.var.push(var);
            stats.std.push(var.sqrt());
        }
        stats
    }
}

/// Applies a right-hand side independently to each `nx`-sized block of a
/// stacked state, so a batch of initial conditions integrates as
/// independent replicas.
struct Replicated<'a, E> {
    inner: &'a E,
    copies: usize,
}

impl<T: Scalar, E: OdeSystem<T>> OdeSystem<T> for Replicated<'_, E> {
    fn dimension(&self) -> usize {
        self.inner.dimension() * self.copies
    }

    fn rhs(&self, t: T, x: &[T], dx: &mut [T]) {
        let nx = self.inner.dimension();
        for (xs, dxs) in x.chunks(nx).zip(dx.chunks_mut(nx)) {
            self.inner.rhs(t, xs, dxs);
        }
    }
}

/// A catalog system bound to one backend for its lifetime: owns the
/// substrate-cast parameters and initial state, the cached trajectory
/// statistics, and the simulation configuration.
pub struct System<B: Backend> {
    backend: B,
    kind: ModelKind,
    model: Model<B::Elem>,
    nx: usize,
    x0: Vec<B::Elem>,
    config: SimConfig,
    xstats: Stats,
}

impl<B: Backend> System<B> {
    /// Constructs a system instance. In order: seeds the backend generator,
    /// casts configuration and initial state, registers the catalog default
    /// parameters through [`System::set_params`] semantics, then eagerly
    /// computes `xstats` from one default simulation.
    pub fn new(kind: ModelKind, mut backend: B, config: SimConfig) -> Result<Self, Error> {
        if config.ts <= 0.0 {
            return Err(Error::Configuration(format!(
                "step size ts must be positive, got {}",
                config.ts
            )));
        }
        backend.seed(config.seed);

        let params = cast_params(&backend, &kind.default_params(), config.requires_grad);
        let model = kind.instantiate(&params);
        let nx = kind.dimension();
        let x0 = backend.cast(config.x0.as_deref().unwrap_or(&kind.default_x0()));

        let mut system = Self {
            backend,
            kind,
            model,
            nx,
            x0,
            config,
            xstats: Stats::default(),
        };
        system.xstats = system.get_stats()?;
        debug!(
            system = system.kind.name(),
            backend = system.backend.name(),
            seed = system.config.seed,
            "constructed system and cached trajectory statistics"
        );
        Ok(system)
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The statistics cached at construction. Not recomputed unless
    /// [`System::get_stats`] is called explicitly.
    pub fn xstats(&self) -> &Stats {
        &self.xstats
    }

    /// Current parameter values, in registration order.
    pub fn params(&self) -> Vec<f64> {
        let count = self.kind.default_params().len();
        let mut values = vec![self.backend.scalar(0.0); count];
        self.model.write_params(&mut values);
        values
            .iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect()
    }

    /// Registers parameter values: each is cast through the backend and
    /// passed through `attach_gradient` with the given flag, then the model
    /// is rebuilt around them. This is the only path by which physical
    /// constants become differentiable state. Cached `xstats` are left
    /// untouched.
    pub fn set_params(&mut self, values: &[f64], requires_grad: bool) -> Result<(), Error> {
        let expected = self.kind.default_params().len();
        if values.len() != expected {
            return Err(Error::Configuration(format!(
                "{} expects {} parameters, got {}",
                self.kind.name(),
                expected,
                values.len()
            )));
        }
        let params = cast_params(&self.backend, values, requires_grad);
        self.model = self.kind.instantiate(&params);
        Ok(())
    }

    /// Simulates with the stored configuration.
    pub fn simulate(&self) -> Result<SimResult<B::Elem>, Error> {
        self.simulate_with(&SimOptions::default())
    }

    /// Simulates with per-call overrides. Side-effect-free with respect to
    /// instance state.
    pub fn simulate_with(&self, options: &SimOptions) -> Result<SimResult<B::Elem>, Error> {
        let ninit = options.ninit.unwrap_or(self.config.ninit);
        let nsim = options.nsim.unwrap_or(self.config.nsim);
        let ts = options.ts.unwrap_or(self.config.ts);
        if ts <= 0.0 {
            return Err(Error::Configuration(format!(
                "step size ts must be positive, got {ts}"
            )));
        }

        let x0 = match &options.x0 {
            Some(values) => self.backend.cast(values),
            None => self.x0.clone(),
        };
        if x0.is_empty() || x0.len() % self.nx != 0 {
            return Err(Error::ShapeMismatch {
                len: x0.len(),
                nx: self.nx,
            });
        }

        let time: Vec<f64> = match &options.time {
            Some(grid) => grid.clone(),
            None => (0..=nsim).map(|k| ninit + k as f64 * ts).collect(),
        };

        let replicated = Replicated {
            inner: &self.model,
            copies: x0.len() / self.nx,
        };
        let x = self.backend.integrate(&replicated, &x0, &time)?;
        debug!(
            system = self.kind.name(),
            rows = x.nrows(),
            cols = x.ncols(),
            "simulated trajectory"
        );
        Ok(SimResult { y: x.clone(), x })
    }

    /// Runs one simulation with the current configuration and reduces it to
    /// per-dimension statistics.
    pub fn get_stats(&self) -> Result<Stats, Error> {
        let sim = self.simulate()?;
        Ok(Stats::from_trajectory(&sim.x))
    }

    /// Samples a fresh initial condition, each dimension drawn uniformly
    /// from the cached `[min, max]` envelope.
    pub fn get_x0(&mut self) -> Vec<f64> {
        self.backend
            .sample_uniform(&self.xstats.min, &self.xstats.max)
    }

    /// Stacks several initial states into one batch vector through the
    /// backend, ready to pass as a `simulate_with` override.
    pub fn stack_x0(&self, states: &[Vec<f64>]) -> Vec<f64> {
        let parts: Vec<Vec<B::Elem>> = states.iter().map(|s| self.backend.cast(s)).collect();
        self.backend
            .concat(&parts)
            .iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect()
    }
}

fn cast_params<B: Backend>(backend: &B, values: &[f64], requires_grad: bool) -> Vec<B::Elem> {
    values
        .iter()
        .map(|&v| backend.attach_gradient(backend.scalar(v), requires_grad))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{SimConfig, SimOptions, System};
    use crate::backend::{ArrayBackend, AutodiffBackend};
    use crate::error::Error;
    use crate::model::ModelKind;

    fn pendulum_config() -> SimConfig {
        SimConfig {
            nsim: 1000,
            ts: 0.1,
            seed: 59,
            ..SimConfig::default()
        }
    }

    #[test]
    fn pendulum_default_scenario() {
        let system =
            System::new(ModelKind::Pendulum, ArrayBackend::new(), pendulum_config()).unwrap();
        let sim = system.simulate().unwrap();

        assert_eq!(sim.x.nrows(), 1001);
        assert_eq!(sim.x.ncols(), 2);
        assert_eq!(sim.x[(0, 0)], 0.0);
        assert_eq!(sim.x[(0, 1)], 1.0);
        // Damping f = 3 keeps the angle bounded over the whole horizon.
        for i in 0..sim.x.nrows() {
            assert!(sim.x[(i, 0)].abs() < 10.0);
        }
        assert_eq!(sim.y, sim.x);
    }

    #[test]
    fn same_seed_and_config_is_bit_deterministic() {
        let a = System::new(ModelKind::LorenzSystem, ArrayBackend::new(), SimConfig::default())
            .unwrap();
        let b = System::new(ModelKind::LorenzSystem, ArrayBackend::new(), SimConfig::default())
            .unwrap();
        assert_eq!(a.simulate().unwrap().x, b.simulate().unwrap().x);
        assert_eq!(a.xstats().min, b.xstats().min);
    }

    #[test]
    fn shape_mismatch_is_rejected_without_mutation() {
        let system =
            System::new(ModelKind::Pendulum, ArrayBackend::new(), pendulum_config()).unwrap();
        let stats_before = system.xstats().clone();

        let options = SimOptions {
            x0: Some(vec![1.0, 2.0, 3.0]),
            ..SimOptions::default()
        };
        let err = system.simulate_with(&options).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { len: 3, nx: 2 }));
        assert_eq!(system.xstats().min, stats_before.min);
    }

    #[test]
    fn empty_initial_state_is_a_shape_mismatch() {
        let system =
            System::new(ModelKind::Pendulum, ArrayBackend::new(), pendulum_config()).unwrap();
        let options = SimOptions {
            x0: Some(vec![]),
            ..SimOptions::default()
        };
        assert!(matches!(
            system.simulate_with(&options),
            Err(Error::ShapeMismatch { len: 0, nx: 2 })
        ));
    }

    #[test]
    fn non_positive_step_size_is_rejected() {
        let config = SimConfig {
            ts: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            System::new(ModelKind::Pendulum, ArrayBackend::new(), config),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn sampled_initial_conditions_stay_inside_the_envelope() {
        let mut system =
            System::new(ModelKind::VanDerPol, ArrayBackend::new(), SimConfig::default()).unwrap();
        let stats = system.xstats().clone();
        for _ in 0..200 {
            let x0 = system.get_x0();
            assert_eq!(x0.len(), system.nx());
            for (i, &v) in x0.iter().enumerate() {
                assert!(v >= stats.min[i] && v <= stats.max[i]);
            }
        }
    }

    #[test]
    fn sampling_sequence_is_seed_deterministic() {
        let mut a =
            System::new(ModelKind::VanDerPol, ArrayBackend::new(), SimConfig::default()).unwrap();
        let mut b =
            System::new(ModelKind::VanDerPol, ArrayBackend::new(), SimConfig::default()).unwrap();
        for _ in 0..20 {
            assert_eq!(a.get_x0(), b.get_x0());
        }
    }

    #[test]
    fn explicit_time_grid_dictates_row_count() {
        let system =
            System::new(ModelKind::Pendulum, ArrayBackend::new(), pendulum_config()).unwrap();
        let options = SimOptions {
            time: Some((0..25).map(|k| k as f64 * 0.05).collect()),
            ..SimOptions::default()
        };
        let sim = system.simulate_with(&options).unwrap();
        assert_eq!(sim.x.nrows(), 25);
    }

    #[test]
    fn explicit_x0_override_does_not_touch_stored_state() {
        let system =
            System::new(ModelKind::Pendulum, ArrayBackend::new(), pendulum_config()).unwrap();
        let options = SimOptions {
            x0: Some(vec![0.3, -0.1]),
            nsim: Some(10),
            ..SimOptions::default()
        };
        let sim = system.simulate_with(&options).unwrap();
        assert_eq!(sim.x[(0, 0)], 0.3);
        assert_eq!(sim.x[(0, 1)], -0.1);
        // Stored configuration still simulates from the catalog default.
        let default_sim = system.simulate().unwrap();
        assert_eq!(default_sim.x[(0, 0)], 0.0);
        assert_eq!(default_sim.x[(0, 1)], 1.0);
    }

    #[test]
    fn replicated_initial_states_integrate_independently() {
        let system =
            System::new(ModelKind::Pendulum, ArrayBackend::new(), pendulum_config()).unwrap();
        let batch = system.stack_x0(&[vec![0.2, 0.5], vec![0.2, 0.5]]);
        let options = SimOptions {
            x0: Some(batch),
            nsim: Some(50),
            ..SimOptions::default()
        };
        let sim = system.simulate_with(&options).unwrap();
        assert_eq!(sim.x.ncols(), 4);
        for i in 0..sim.x.nrows() {
            assert_eq!(sim.x[(i, 0)], sim.x[(i, 2)]);
            assert_eq!(sim.x[(i, 1)], sim.x[(i, 3)]);
        }
    }

    #[test]
    fn set_params_validates_arity() {
        let mut system =
            System::new(ModelKind::Pendulum, ArrayBackend::new(), pendulum_config()).unwrap();
        assert!(matches!(
            system.set_params(&[1.0], false),
            Err(Error::Configuration(_))
        ));
        system.set_params(&[9.81, 4.0], false).unwrap();
        let params = system.params();
        assert_eq!(params, vec![9.81, 4.0]);
    }

    #[test]
    fn parameter_sensitivity_matches_central_differences() {
        let config = SimConfig {
            nsim: 50,
            requires_grad: true,
            ..pendulum_config()
        };
        let tracked =
            System::new(ModelKind::Pendulum, AutodiffBackend::new(), config).unwrap();
        let sensitivity = tracked.simulate().unwrap().sensitivity();

        // Both parameters carry a seeded tangent, so the dual parts hold the
        // directional derivative along (dg, df) = (1, 1). Compare against a
        // central difference that perturbs both parameters together.
        let h = 1e-4;
        let mut plus =
            System::new(ModelKind::Pendulum, ArrayBackend::new(), pendulum_config()).unwrap();
        plus.set_params(&[9.81 + h, 3.0 + h], false).unwrap();
        let mut minus =
            System::new(ModelKind::Pendulum, ArrayBackend::new(), pendulum_config()).unwrap();
        minus.set_params(&[9.81 - h, 3.0 - h], false).unwrap();

        let options = SimOptions {
            nsim: Some(50),
            ..SimOptions::default()
        };
        let xp = plus.simulate_with(&options).unwrap().x;
        let xm = minus.simulate_with(&options).unwrap().x;

        for i in 0..sensitivity.nrows() {
            for j in 0..sensitivity.ncols() {
                let fd = (xp[(i, j)] - xm[(i, j)]) / (2.0 * h);
                assert!(
                    (sensitivity[(i, j)] - fd).abs() < 1e-3,
                    "row {i} col {j}: dual {} vs fd {}",
                    sensitivity[(i, j)],
                    fd
                );
            }
        }
    }

    #[test]
    fn stats_reduce_a_known_trajectory() {
        use super::Stats;
        use nalgebra::DMatrix;
        let trajectory = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let stats = Stats::from_trajectory(&trajectory);
        assert_eq!(stats.min, vec![1.0]);
        assert_eq!(stats.max, vec![4.0]);
        assert!((stats.mean[0] - 2.5).abs() < 1e-12);
        assert!((stats.var[0] - 1.25).abs() < 1e-12);
        assert!((stats.std[0] - 1.25_f64.sqrt()).abs() < 1e-12);
    }
}
