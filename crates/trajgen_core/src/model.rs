use crate::engine::SimConfig;
use crate::error::Error;
use crate::traits::{OdeSystem, Scalar};

/// Number of variables in the Lorenz-96 model.
const LORENZ96_N: usize = 36;

/// Lifts an f64 constant into the active substrate.
fn c<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap()
}

/// Identifies one entry of the equation catalog. Carries the catalog data
/// (name, dimension, literature-standard default parameters and initial
/// state) while [`Model`] carries the substrate-cast parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    UniversalOscillator,
    Pendulum,
    DoublePendulum,
    Lorenz96,
    LorenzSystem,
    VanDerPol,
    ThomasAttractor,
    RosslerAttractor,
    LotkaVolterra,
    Brusselator1D,
    ChuaCircuit,
    Duffing,
    Autoignition,
}

impl ModelKind {
    /// Every catalog entry, in a fixed order. Names are unique by
    /// construction; lookups are case-sensitive.
    pub const ALL: [ModelKind; 13] = [
        ModelKind::UniversalOscillator,
        ModelKind::Pendulum,
        ModelKind::DoublePendulum,
        ModelKind::Lorenz96,
        ModelKind::LorenzSystem,
        ModelKind::VanDerPol,
        ModelKind::ThomasAttractor,
        ModelKind::RosslerAttractor,
        ModelKind::LotkaVolterra,
        ModelKind::Brusselator1D,
        ModelKind::ChuaCircuit,
        ModelKind::Duffing,
        ModelKind::Autoignition,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelKind::UniversalOscillator => "UniversalOscillator",
            ModelKind::Pendulum => "Pendulum",
            ModelKind::DoublePendulum => "DoublePendulum",
            ModelKind::Lorenz96 => "Lorenz96",
            ModelKind::LorenzSystem => "LorenzSystem",
            ModelKind::VanDerPol => "VanDerPol",
            ModelKind::ThomasAttractor => "ThomasAttractor",
            ModelKind::RosslerAttractor => "RosslerAttractor",
            ModelKind::LotkaVolterra => "LotkaVolterra",
            ModelKind::Brusselator1D => "Brusselator1D",
            ModelKind::ChuaCircuit => "ChuaCircuit",
            ModelKind::Duffing => "Duffing",
            ModelKind::Autoignition => "Autoignition",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::Configuration(format!("unknown system `{name}`")))
    }

    /// State dimension.
    pub fn dimension(self) -> usize {
        match self {
            ModelKind::DoublePendulum => 4,
            ModelKind::Lorenz96 => LORENZ96_N,
            ModelKind::LorenzSystem
            | ModelKind::ThomasAttractor
            | ModelKind::RosslerAttractor
            | ModelKind::ChuaCircuit => 3,
            _ => 2,
        }
    }

    /// Literature-standard default parameter values, in registration order.
    /// Downstream datasets are defined relative to these, so they must not
    /// drift.
    pub fn default_params(self) -> Vec<f64> {
        match self {
            ModelKind::UniversalOscillator => vec![2.0, 1.0],
            ModelKind::Pendulum => vec![9.81, 3.0],
            ModelKind::DoublePendulum => vec![1.0, 1.0, 1.0, 1.0, 9.81],
            ModelKind::Lorenz96 => vec![8.0],
            ModelKind::LorenzSystem => vec![28.0, 10.0, 8.0 / 3.0],
            ModelKind::VanDerPol => vec![1.0],
            ModelKind::ThomasAttractor => vec![0.208186],
            ModelKind::RosslerAttractor => vec![0.2, 0.2, 5.7],
            ModelKind::LotkaVolterra => vec![1.0, 0.1, 1.5, 0.75],
            ModelKind::Brusselator1D => vec![1.0, 3.0],
            ModelKind::ChuaCircuit => vec![15.6, 28.0, -1.143, -0.714],
            ModelKind::Duffing => vec![0.02, 1.0, 5.0, 8.0, 0.5],
            ModelKind::Autoignition => vec![0.3, 1.1, 1.0, 1.0, 5.0, 6.5, 0.55, 1.0],
        }
    }

    /// Default initial state.
    pub fn default_x0(self) -> Vec<f64> {
        match self {
            ModelKind::UniversalOscillator => vec![1.0, 0.0],
            ModelKind::Pendulum => vec![0.0, 1.0],
            ModelKind::DoublePendulum => {
                vec![
                    3.0 * std::f64::consts::PI / 7.0,
                    0.0,
                    3.0 * std::f64::consts::PI / 4.0,
                    0.0,
                ]
            }
            ModelKind::Lorenz96 => {
                // Uniform forcing equilibrium with a small perturbation on
                // one variable to kick off the chaotic dynamics.
                let mut x0 = vec![8.0; LORENZ96_N];
                x0[19] += 0.01;
                x0
            }
            ModelKind::LorenzSystem => vec![1.0, 1.0, 1.0],
            ModelKind::VanDerPol => vec![1.0, 2.0],
            ModelKind::ThomasAttractor => vec![1.0, -1.0, 1.0],
            ModelKind::RosslerAttractor => vec![0.0, 0.0, 0.0],
            ModelKind::LotkaVolterra => vec![5.0, 100.0],
            ModelKind::Brusselator1D => vec![1.0, 1.0],
            ModelKind::ChuaCircuit => vec![0.7, 0.0, 0.0],
            ModelKind::Duffing => vec![1.0, 0.0],
            ModelKind::Autoignition => vec![1.0, 0.7],
        }
    }

    /// Default simulation configuration. Most systems share the common
    /// grid; Duffing is conventionally run on a finer one.
    pub fn default_config(self) -> SimConfig {
        match self {
            ModelKind::Duffing => SimConfig {
                nsim: 3001,
                ts: 0.01,
                ..SimConfig::default()
            },
            _ => SimConfig::default(),
        }
    }

    /// Builds the model variant from substrate-cast parameters, unpacking
    /// them in the order of [`ModelKind::default_params`].
    pub(crate) fn instantiate<T: Scalar>(self, p: &[T]) -> Model<T> {
        match self {
            ModelKind::UniversalOscillator => Model::UniversalOscillator {
                mu: p[0],
                omega: p[1],
            },
            ModelKind::Pendulum => Model::Pendulum { g: p[0], f: p[1] },
            ModelKind::DoublePendulum => Model::DoublePendulum {
                l1: p[0],
                l2: p[1],
                m1: p[2],
                m2: p[3],
                g: p[4],
            },
            ModelKind::Lorenz96 => Model::Lorenz96 { forcing: p[0] },
            ModelKind::LorenzSystem => Model::LorenzSystem {
                rho: p[0],
                sigma: p[1],
                beta: p[2],
            },
            ModelKind::VanDerPol => Model::VanDerPol { mu: p[0] },
            ModelKind::ThomasAttractor => Model::ThomasAttractor { b: p[0] },
            ModelKind::RosslerAttractor => Model::RosslerAttractor {
                a: p[0],
                b: p[1],
                c: p[2],
            },
            ModelKind::LotkaVolterra => Model::LotkaVolterra {
                a: p[0],
                b: p[1],
                c: p[2],
                d: p[3],
            },
            ModelKind::Brusselator1D => Model::Brusselator1D { a: p[0], b: p[1] },
            ModelKind::ChuaCircuit => Model::ChuaCircuit {
                a: p[0],
                b: p[1],
                m0: p[2],
                m1: p[3],
            },
            ModelKind::Duffing => Model::Duffing {
                delta: p[0],
                alpha: p[1],
                beta: p[2],
                gamma: p[3],
                omega: p[4],
            },
            ModelKind::Autoignition => Model::Autoignition {
                alpha: p[0],
                uc: p[1],
                s: p[2],
                k: p[3],
                r: p[4],
                q: p[5],
                up: p[6],
                e: p[7],
            },
        }
    }
}

/// The equation catalog as a tagged variant: one closed-form right-hand
/// side per named system, with parameters already cast into the substrate.
///
/// References for defaults and equations:
/// - <https://en.wikipedia.org/wiki/List_of_nonlinear_ordinary_differential_equations>
/// - <https://en.wikipedia.org/wiki/List_of_dynamical_systems_and_differential_equations_topics>
#[derive(Debug, Clone)]
pub enum Model<T: Scalar> {
    /// Damped harmonic oscillator with cosine forcing.
    UniversalOscillator { mu: T, omega: T },
    /// Simple damped pendulum.
    Pendulum { g: T, f: T },
    /// Planar double pendulum, <https://scipython.com/blog/the-double-pendulum/>.
    DoublePendulum { l1: T, l2: T, m1: T, m2: T, g: T },
    /// Lorenz-96 model with constant forcing.
    Lorenz96 { forcing: T },
    /// The Lorenz system.
    LorenzSystem { rho: T, sigma: T, beta: T },
    /// Van der Pol oscillator in Liénard coordinates.
    VanDerPol { mu: T },
    /// Thomas' cyclically symmetric attractor.
    ThomasAttractor { b: T },
    /// Rössler attractor.
    RosslerAttractor { a: T, b: T, c: T },
    /// Lotka–Volterra predator–prey equations.
    LotkaVolterra { a: T, b: T, c: T, d: T },
    /// Brusselator reaction model.
    Brusselator1D { a: T, b: T },
    /// Chua's circuit with the piecewise-linear diode characteristic.
    ChuaCircuit { a: T, b: T, m0: T, m1: T },
    /// Duffing equation with periodic forcing.
    Duffing {
        delta: T,
        alpha: T,
        beta: T,
        gamma: T,
        omega: T,
    },
    /// Pulsating-instability model of an open-ended combustor.
    /// Koch et al., "Multiscale physics of rotating detonation waves",
    /// Physical Review E, 2021.
    Autoignition {
        alpha: T,
        uc: T,
        s: T,
        k: T,
        r: T,
        q: T,
        up: T,
        e: T,
    },
}

impl<T: Scalar> Model<T> {
    /// Writes the current parameter values into `out` in registration
    /// order. Inverse of [`ModelKind::instantiate`].
    pub(crate) fn write_params(&self, out: &mut [T]) {
        match *self {
            Model::UniversalOscillator { mu, omega } => out.copy_from_slice(&[mu, omega]),
            Model::Pendulum { g, f } => out.copy_from_slice(&[g, f]),
            Model::DoublePendulum { l1, l2, m1, m2, g } => {
                out.copy_from_slice(&[l1, l2, m1, m2, g])
            }
            Model::Lorenz96 { forcing } => out.copy_from_slice(&[forcing]),
            Model::LorenzSystem { rho, sigma, beta } => out.copy_from_slice(&[rho, sigma, beta]),
            Model::VanDerPol { mu } => out.copy_from_slice(&[mu]),
            Model::ThomasAttractor { b } => out.copy_from_slice(&[b]),
            Model::RosslerAttractor { a, b, c } => out.copy_from_slice(&[a, b, c]),
            Model::LotkaVolterra { a, b, c, d } => out.copy_from_slice(&[a, b, c, d]),
            Model::Brusselator1D { a, b } => out.copy_from_slice(&[a, b]),
            Model::ChuaCircuit { a, b, m0, m1 } => out.copy_from_slice(&[a, b, m0, m1]),
            Model::Duffing {
                delta,
                alpha,
                beta,
                gamma,
                omega,
            } => out.copy_from_slice(&[delta, alpha, beta, gamma, omega]),
            Model::Autoignition {
                alpha,
                uc,
                s,
                k,
                r,
                q,
                up,
                e,
            } => out.copy_from_slice(&[alpha, uc, s, k, r, q, up, e]),
        }
    }
}

impl<T: Scalar> OdeSystem<T> for Model<T> {
    fn dimension(&self) -> usize {
        match self {
            Model::DoublePendulum { .. } => 4,
            Model::Lorenz96 { .. } => LORENZ96_N,
            Model::LorenzSystem { .. }
            | Model::ThomasAttractor { .. }
            | Model::RosslerAttractor { .. }
            | Model::ChuaCircuit { .. } => 3,
            _ => 2,
        }
    }

    fn rhs(&self, t: T, x: &[T], dx: &mut [T]) {
        match *self {
            Model::UniversalOscillator { mu, omega } => {
                dx[0] = x[1];
                dx[1] = -c::<T>(2.0) * mu * x[1] - x[0] + (omega * t).cos();
            }
            Model::Pendulum { g, f } => {
                let theta = x[0];
                let omega = x[1];
                dx[0] = omega;
                dx[1] = -f * omega - g * theta.sin();
            }
            Model::DoublePendulum { l1, l2, m1, m2, g } => {
                let (theta1, z1, theta2, z2) = (x[0], x[1], x[2], x[3]);
                let cs = (theta1 - theta2).cos();
                let sn = (theta1 - theta2).sin();
                let denom = m1 + m2 * sn * sn;
                dx[0] = z1;
                dx[1] = (m2 * g * theta2.sin() * cs
                    - m2 * sn * (l1 * z1 * z1 * cs + l2 * z2 * z2)
                    - (m1 + m2) * g * theta1.sin())
                    / l1
                    / denom;
                dx[2] = z2;
                dx[3] = ((m1 + m2) * (l1 * z1 * z1 * sn - g * theta2.sin() + g * theta1.sin() * cs)
                    + m2 * l2 * z2 * z2 * sn * cs)
                    / l2
                    / denom;
            }
            Model::Lorenz96 { forcing } => {
                let n = LORENZ96_N;
                for i in 0..n {
                    dx[i] = (x[(i + 1) % n] - x[(i + n - 2) % n]) * x[(i + n - 1) % n] - x[i]
                        + forcing;
                }
            }
            Model::LorenzSystem { rho, sigma, beta } => {
                dx[0] = sigma * (x[1] - x[0]);
                dx[1] = x[0] * (rho - x[2]) - x[1];
                dx[2] = x[0] * x[1] - beta * x[2];
            }
            Model::VanDerPol { mu } => {
                dx[0] = mu * (x[0] - x[0] * x[0] * x[0] / c::<T>(3.0) - x[1]);
                dx[1] = x[0] / mu;
            }
            Model::ThomasAttractor { b } => {
                dx[0] = x[1].sin() - b * x[0];
                dx[1] = x[2].sin() - b * x[1];
                dx[2] = x[0].sin() - b * x[2];
            }
            Model::RosslerAttractor { a, b, c } => {
                dx[0] = -x[1] - x[2];
                dx[1] = x[0] + a * x[1];
                dx[2] = b + x[2] * (x[0] - c);
            }
            Model::LotkaVolterra { a, b, c, d } => {
                dx[0] = a * x[0] - b * x[0] * x[1];
                dx[1] = -c * x[1] + d * b * x[0] * x[1];
            }
            Model::Brusselator1D { a, b } => {
                dx[0] = a + x[1] * x[0] * x[0] - b * x[0] - x[0];
                dx[1] = b * x[0] - x[1] * x[0] * x[0];
            }
            Model::ChuaCircuit { a, b, m0, m1 } => {
                let one = T::one();
                let fx = m1 * x[0]
                    + c::<T>(0.5) * (m0 - m1) * ((x[0] + one).abs() - (x[0] - one).abs());
                dx[0] = a * (x[1] - x[0] - fx);
                dx[1] = x[0] - x[1] + x[2];
                dx[2] = -b * x[1];
            }
            Model::Duffing {
                delta,
                alpha,
                beta,
                gamma,
                omega,
            } => {
                dx[0] = x[1];
                dx[1] = -delta * x[1] - alpha * x[0] - beta * x[0] * x[0] * x[0]
                    + gamma * (omega * t).cos();
            }
            Model::Autoignition {
                alpha,
                uc,
                s,
                k,
                r,
                q,
                up,
                e,
            } => {
                let one = T::one();
                let reaction = k * (one - x[1]) * ((x[0] - uc) / alpha).exp();
                let regeneration = s * up * x[1] / (one + (r * (x[0] - up)).exp());
                dx[0] = q * reaction - e * x[0] * x[0];
                dx[1] = reaction - regeneration;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Model, ModelKind};
    use crate::traits::OdeSystem;

    #[test]
    fn catalog_names_are_unique() {
        for (i, a) in ModelKind::ALL.iter().enumerate() {
            for b in &ModelKind::ALL[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(ModelKind::from_name("Pendulum").unwrap(), ModelKind::Pendulum);
        assert!(ModelKind::from_name("pendulum").is_err());
        assert!(ModelKind::from_name("NoSuchSystem").is_err());
    }

    #[test]
    fn defaults_are_shape_consistent() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.default_x0().len(), kind.dimension(), "{}", kind.name());
            let model: Model<f64> = kind.instantiate(&kind.default_params());
            assert_eq!(model.dimension(), kind.dimension(), "{}", kind.name());
        }
    }

    #[test]
    fn lorenz_rhs_matches_hand_computation() {
        let model: Model<f64> = ModelKind::LorenzSystem.instantiate(&[28.0, 10.0, 8.0 / 3.0]);
        let mut dx = [0.0; 3];
        model.rhs(0.0, &[1.0, 2.0, 3.0], &mut dx);
        assert!((dx[0] - 10.0).abs() < 1e-12);
        assert!((dx[1] - (1.0 * (28.0 - 3.0) - 2.0)).abs() < 1e-12);
        assert!((dx[2] - (1.0 * 2.0 - 8.0)).abs() < 1e-12);
    }

    #[test]
    fn lorenz96_wraps_indices_cyclically() {
        let model: Model<f64> = ModelKind::Lorenz96.instantiate(&[0.0]);
        let n = model.dimension();
        let mut x = vec![0.0; n];
        x[n - 1] = 2.0;
        x[1] = 3.0;
        let mut dx = vec![0.0; n];
        model.rhs(0.0, &x, &mut dx);
        // dx[0] = (x[1] - x[n-2]) * x[n-1] - x[0] = (3 - 0) * 2 - 0
        assert!((dx[0] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn pendulum_rhs_is_time_invariant() {
        let model: Model<f64> = ModelKind::Pendulum.instantiate(&[9.81, 3.0]);
        let mut a = [0.0; 2];
        let mut b = [0.0; 2];
        model.rhs(0.0, &[0.4, -0.2], &mut a);
        model.rhs(17.3, &[0.4, -0.2], &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn duffing_uses_finer_default_grid() {
        let config = ModelKind::Duffing.default_config();
        assert_eq!(config.nsim, 3001);
        assert!((config.ts - 0.01).abs() < 1e-12);
        let common = ModelKind::LorenzSystem.default_config();
        assert_eq!(common.nsim, 1001);
    }
}
