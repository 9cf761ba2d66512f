use thiserror::Error;

/// Error returned when key generation cannot produce a well-conditioned trapdoor.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum KeyGenError {
    #[error("no positive definite trapdoor covariance found in {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Errors surfaced by the signer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SigningError {
    #[error("message of {len} bytes exceeds the maximum of {max} bytes")]
    MessageTooLong { len: usize, max: usize },
    #[error("no acceptable signature found in {attempts} attempts")]
    SigningFailed { attempts: u32 },
}

/// Reason a signature was rejected by the verifier.
///
/// The verifier never reports which part of a malformed signature failed to parse.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("signature is malformed")]
    Malformed,
    #[error("signature norm exceeds the bound")]
    NormExceeded,
}

/// Errors raised by the signature entropy coder.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EncodingError {
    #[error("expected {expected} coefficients, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("coefficient {value} is outside the representable range")]
    OutOfRange { value: i64 },
    #[error("payload ended early")]
    Truncated,
    #[error("unused bits of the raw block must be zero")]
    NonZeroPadding,
    #[error("entropy coded stream starts outside the coder's state range")]
    InvalidInitialState,
    #[error("symbol does not belong to the alphabet")]
    InvalidSymbol,
    #[error("zero coefficient carries a negative sign")]
    NegativeZero,
    #[error("payload has {count} unread bytes")]
    TrailingBytes { count: usize },
    #[error("decoder finished in a state different from the initial state")]
    InvalidFinalState,
}

impl From<EncodingError> for RejectReason {
    fn from(_: EncodingError) -> Self {
        RejectReason::Malformed
    }
}

/// Errors raised by dense and triangular matrix operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MatrixError {
    #[error("entry ({row}, {col}) is outside a {rows}x{cols} matrix")]
    OutOfBounds { row: usize, col: usize, rows: usize, cols: usize },
    #[error("entry ({row}, {col}) lies above the diagonal of a lower triangular matrix")]
    AboveDiagonal { row: usize, col: usize },
    #[error("expected {expected} entries, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("matrix is not positive definite (pivot {index})")]
    NotPositiveDefinite { index: usize },
}

/// Error raised by a Gaussian sampler running with a trial cap.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SamplerError {
    #[error("no sample accepted in {trials} trials")]
    Exhausted { trials: u32 },
}
