//! Runtime configuration for key generation and signing.

use super::math::BackendKind;

// CONSTANTS
// ================================================================================================

/// The default number of trapdoors tried before key generation gives up.
pub const DEFAULT_MAX_KEYGEN_ATTEMPTS: u32 = 32;

/// The minimum number of trapdoors key generation may try.
pub const MIN_KEYGEN_ATTEMPTS: u32 = 1;

/// The default number of rejected candidates tolerated by a single signing call.
pub const DEFAULT_MAX_SIGNING_ATTEMPTS: u32 = 64;

/// The minimum number of candidates a signing call may draw.
pub const MIN_SIGNING_ATTEMPTS: u32 = 1;

// CONFIG
// ================================================================================================

/// Bounds on the retry loops of the scheme and the choice of arithmetic backend.
///
/// None of the options change which keys or signatures are produced from a given seed, except that
/// a tighter bound can turn a successful call into an error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    max_keygen_attempts: u32,
    max_signing_attempts: u32,
    max_sampler_trials: Option<u32>,
    backend: BackendKind,
}

/// This block contains the accessors for the configuration options.
impl Config {
    /// The number of trapdoors key generation samples before returning
    /// [`KeyGenError::Exhausted`](super::KeyGenError::Exhausted).
    ///
    /// Defaults to [`DEFAULT_MAX_KEYGEN_ATTEMPTS`].
    pub fn max_keygen_attempts(&self) -> u32 {
        self.max_keygen_attempts
    }

    /// The number of candidate signatures drawn before returning
    /// [`SigningError::SigningFailed`](super::SigningError::SigningFailed).
    ///
    /// Defaults to [`DEFAULT_MAX_SIGNING_ATTEMPTS`].
    pub fn max_signing_attempts(&self) -> u32 {
        self.max_signing_attempts
    }

    /// The number of trials a single integer Gaussian draw may take, or `None` for no limit.
    ///
    /// A draw that runs out of trials rejects the current signing attempt. Defaults to `None`.
    pub fn max_sampler_trials(&self) -> Option<u32> {
        self.max_sampler_trials
    }

    /// The backend used for the large matrix products.
    ///
    /// Defaults to [`BackendKind::Parallel`] when the `concurrent` feature is enabled and to
    /// [`BackendKind::Scalar`] otherwise.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }
}

// BUILDERS
// ================================================================================================

/// This impl block contains the builder functions for the configuration options.
impl Config {
    /// Sets the number of trapdoors key generation may try, clamping to [`MIN_KEYGEN_ATTEMPTS`].
    pub fn with_max_keygen_attempts(mut self, attempts: u32) -> Self {
        self.max_keygen_attempts = attempts.max(MIN_KEYGEN_ATTEMPTS);
        self
    }

    /// Sets the number of candidates a signing call may draw, clamping to
    /// [`MIN_SIGNING_ATTEMPTS`].
    pub fn with_max_signing_attempts(mut self, attempts: u32) -> Self {
        self.max_signing_attempts = attempts.max(MIN_SIGNING_ATTEMPTS);
        self
    }

    /// Sets the per-draw trial cap of the integer Gaussian sampler. A cap of zero is raised to one.
    pub fn with_max_sampler_trials(mut self, trials: Option<u32>) -> Self {
        self.max_sampler_trials = trials.map(|t| t.max(1));
        self
    }

    /// Selects the arithmetic backend.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }
}

// TRAIT IMPLS
// ================================================================================================

/// Please see individual methods on [`Config`] for the default value of each configuration option.
impl Default for Config {
    fn default() -> Self {
        Self {
            max_keygen_attempts: DEFAULT_MAX_KEYGEN_ATTEMPTS,
            max_signing_attempts: DEFAULT_MAX_SIGNING_ATTEMPTS,
            max_sampler_trials: None,
            backend: BackendKind::default(),
        }
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_clamp_to_minimums() {
        let config = Config::default()
            .with_max_keygen_attempts(0)
            .with_max_signing_attempts(0)
            .with_max_sampler_trials(Some(0));

        assert_eq!(config.max_keygen_attempts(), MIN_KEYGEN_ATTEMPTS);
        assert_eq!(config.max_signing_attempts(), MIN_SIGNING_ATTEMPTS);
        assert_eq!(config.max_sampler_trials(), Some(1));
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.max_keygen_attempts(), DEFAULT_MAX_KEYGEN_ATTEMPTS);
        assert_eq!(config.max_signing_attempts(), DEFAULT_MAX_SIGNING_ATTEMPTS);
        assert_eq!(config.max_sampler_trials(), None);
        assert_eq!(config.backend(), BackendKind::default());
    }
}
