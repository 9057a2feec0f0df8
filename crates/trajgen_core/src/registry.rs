use crate::backend::{ArrayBackend, AutodiffBackend, BackendKind};
use crate::engine::{SimConfig, SimOptions, SimResult, Stats, System};
use crate::error::Error;
use crate::model::ModelKind;

/// Catalog names, in the registry's fixed order. The set is determined at
/// compile time; nothing can be added or removed at runtime.
pub fn names() -> Vec<&'static str> {
    ModelKind::ALL.iter().map(|kind| kind.name()).collect()
}

/// Case-sensitive name lookup.
pub fn lookup(name: &str) -> Result<ModelKind, Error> {
    ModelKind::from_name(name)
}

/// A system bound to either substrate, behind one interface. Trajectories
/// are read out as plain values regardless of the substrate; gradient
/// consumers construct a [`System`] over [`AutodiffBackend`] directly.
pub enum AnySystem {
    Array(System<ArrayBackend>),
    Autodiff(System<AutodiffBackend>),
}

impl AnySystem {
    pub fn kind(&self) -> ModelKind {
        match self {
            AnySystem::Array(system) => system.kind(),
            AnySystem::Autodiff(system) => system.kind(),
        }
    }

    pub fn nx(&self) -> usize {
        match self {
            AnySystem::Array(system) => system.nx(),
            AnySystem::Autodiff(system) => system.nx(),
        }
    }

    pub fn xstats(&self) -> &Stats {
        match self {
            AnySystem::Array(system) => system.xstats(),
            AnySystem::Autodiff(system) => system.xstats(),
        }
    }

    pub fn simulate(&self) -> Result<SimResult<f64>, Error> {
        self.simulate_with(&SimOptions::default())
    }

    pub fn simulate_with(&self, options: &SimOptions) -> Result<SimResult<f64>, Error> {
        match self {
            AnySystem::Array(system) => system.simulate_with(options),
            AnySystem::Autodiff(system) => Ok(system.simulate_with(options)?.values()),
        }
    }

    pub fn get_stats(&self) -> Result<Stats, Error> {
        match self {
            AnySystem::Array(system) => system.get_stats(),
            AnySystem::Autodiff(system) => system.get_stats(),
        }
    }

    pub fn get_x0(&mut self) -> Vec<f64> {
        match self {
            AnySystem::Array(system) => system.get_x0(),
            AnySystem::Autodiff(system) => system.get_x0(),
        }
    }

    pub fn set_params(&mut self, values: &[f64], requires_grad: bool) -> Result<(), Error> {
        match self {
            AnySystem::Array(system) => system.set_params(values, requires_grad),
            AnySystem::Autodiff(system) => system.set_params(values, requires_grad),
        }
    }
}

/// Builds a catalog system by name on the named substrate. This is the
/// string-keyed entry point used by dataset-generation callers; both the
/// system name and the backend identifier are validated here.
pub fn build(system: &str, backend: &str, config: SimConfig) -> Result<AnySystem, Error> {
    let kind = lookup(system)?;
    match BackendKind::from_name(backend)? {
        BackendKind::Array => Ok(AnySystem::Array(System::new(
            kind,
            ArrayBackend::new(),
            config,
        )?)),
        BackendKind::Autodiff => Ok(AnySystem::Autodiff(System::new(
            kind,
            AutodiffBackend::new(),
            config,
        )?)),
    }
}

/// Builds a catalog system by name with its per-model default
/// configuration.
pub fn build_default(system: &str, backend: &str) -> Result<AnySystem, Error> {
    let kind = lookup(system)?;
    build(system, backend, kind.default_config())
}

#[cfg(test)]
mod tests {
    use super::{build, build_default, lookup, names, AnySystem};
    use crate::engine::SimConfig;
    use crate::error::Error;

    fn assert_err_contains<T>(result: Result<T, Error>, needle: &str) {
        let err = result.err().expect("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn registry_enumerates_the_full_catalog() {
        let names = names();
        assert_eq!(names.len(), 13);
        assert!(names.contains(&"Pendulum"));
        assert!(names.contains(&"LorenzSystem"));
        assert!(names.contains(&"Autoignition"));
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_err_contains(lookup("Lorenz"), "unknown system");
        assert_err_contains(
            build("Pendulum", "numpy", SimConfig::default()),
            "unknown backend",
        );
        assert_err_contains(
            build("pendulum", "array", SimConfig::default()),
            "unknown system",
        );
    }

    #[test]
    fn every_catalog_entry_simulates_cleanly_on_both_substrates() {
        for name in names() {
            for backend in ["array", "autodiff"] {
                let system = build_default(name, backend)
                    .unwrap_or_else(|e| panic!("{name}/{backend}: {e}"));
                let sim = system.simulate().unwrap();
                assert_eq!(sim.x.ncols(), system.nx(), "{name}/{backend}");
                assert_eq!(sim.y, sim.x, "{name}/{backend}");
                for value in sim.x.iter() {
                    assert!(value.is_finite(), "{name}/{backend}");
                }
            }
        }
    }

    #[test]
    fn lorenz_diverges_from_its_near_equilibrium_start() {
        let system = build_default("LorenzSystem", "array").unwrap();
        let stats = system.get_stats().unwrap();
        for dim in 0..3 {
            assert!(
                stats.var[dim] > 1.0,
                "dimension {dim} variance {}",
                stats.var[dim]
            );
        }
    }

    #[test]
    fn substrates_agree_on_the_harmonic_oscillator() {
        let config = SimConfig {
            nsim: 500,
            ..SimConfig::default()
        };
        let array = build("UniversalOscillator", "array", config.clone()).unwrap();
        let autodiff = build("UniversalOscillator", "autodiff", config).unwrap();
        let xa = array.simulate().unwrap().x;
        let xd = autodiff.simulate().unwrap().x;
        assert_eq!(xa.nrows(), xd.nrows());
        for i in 0..xa.nrows() {
            for j in 0..xa.ncols() {
                assert!(
                    (xa[(i, j)] - xd[(i, j)]).abs() < 1e-3,
                    "row {i} col {j}: {} vs {}",
                    xa[(i, j)],
                    xd[(i, j)]
                );
            }
        }
    }

    #[test]
    fn erased_handle_samples_and_retunes_parameters() {
        let mut system = build_default("VanDerPol", "autodiff").unwrap();
        let x0 = system.get_x0();
        assert_eq!(x0.len(), 2);
        system.set_params(&[1.5], false).unwrap();
        let sim = system.simulate().unwrap();
        assert_eq!(sim.x.nrows(), 1002);
        match &system {
            AnySystem::Autodiff(_) => {}
            AnySystem::Array(_) => panic!("expected the autodiff substrate"),
        }
    }
}
