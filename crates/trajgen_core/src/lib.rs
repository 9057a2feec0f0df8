pub mod autodiff;
pub mod backend;
pub mod engine;
pub mod error;
/// The `trajgen_core` crate is the simulation engine behind ground-truth
/// trajectory generation for system-identification and learning tasks.
/// It is designed to run the same equation code on two numeric substrates:
/// plain `f64` arrays and gradient-tracked dual numbers.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `OdeSystem` (autonomous
///   right-hand sides), `Steppable` (solvers).
/// - **Backend**: the substrate abstraction (casting, concatenation, gradient
///   attachment, seeded sampling, integration) with exactly two
///   implementations, `ArrayBackend` and `AutodiffBackend`.
/// - **Engine**: the generic `System` lifecycle — construct, integrate,
///   summarize, resample initial conditions.
/// - **Model**: the catalog of named equation sets with literature-standard
///   defaults.
/// - **Registry**: the static name → constructor table and the
///   substrate-erased `AnySystem` handle.
pub mod model;
pub mod registry;
pub mod solvers;
pub mod traits;
