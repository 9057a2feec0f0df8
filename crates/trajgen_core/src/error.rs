use thiserror::Error;

/// Errors surfaced by the simulation engine.
///
/// All variants are detected close to their source and propagated
/// immediately; there is no partial-result semantics. A `simulate` call
/// either returns a complete trajectory or fails as a whole.
#[derive(Debug, Error)]
pub enum Error {
    /// Unsupported substrate identifier, unknown catalog name, wrong
    /// parameter arity, or an invalid simulation setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Initial-state length is not a positive multiple of the state
    /// dimension.
    #[error("initial state length {len} is not a positive multiple of state dimension {nx}")]
    ShapeMismatch { len: usize, nx: usize },

    /// The integrator produced a non-finite state value. The caller is
    /// expected to retry with adjusted configuration (e.g. a smaller step
    /// size); the engine never retries on its own.
    #[error("integration produced a non-finite state value at t = {t}")]
    Integration { t: f64 },
}
