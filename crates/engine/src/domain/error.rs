// crates/engine/src/domain/error.rs
use thiserror::Error;

/// Container-level failures surfaced by the PKCS#12 decoder.
///
/// A decode call either returns every identity in the archive or exactly one
/// of these; there is no partially populated result.
#[derive(Debug, Error)]
pub enum DecodeError {
  #[error("malformed PKCS#12 container: {0}")]
  MalformedContainer(String),

  #[error("PKCS#12 authentication failed (wrong password or corrupted MAC)")]
  AuthenticationFailed,

  #[error("unsupported PKCS#12 algorithm: {0}")]
  UnsupportedAlgorithm(String),

  /// Only produced by helpers that require at least one identity;
  /// `decode` itself reports an empty archive as `Ok(vec![])`.
  #[error("PKCS#12 archive contains no identities")]
  Empty,

  #[error("decode limit exceeded: {0}")]
  LimitExceeded(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl DecodeError {
  pub(crate) fn malformed(what: impl std::fmt::Display) -> Self {
    DecodeError::MalformedContainer(what.to_string())
  }
}

impl From<der::Error> for DecodeError {
  fn from(e: der::Error) -> Self {
    DecodeError::MalformedContainer(e.to_string())
  }
}

/// Failures parsing caller-supplied certificates.
#[derive(Debug, Error)]
pub enum CertificateError {
  #[error("invalid DER certificate: {0}")]
  InvalidDer(String),

  #[error("invalid PEM certificate data: {0}")]
  InvalidPem(String),

  #[error("certificate field unreadable: {0}")]
  Field(String),
}

impl From<openssl::error::ErrorStack> for CertificateError {
  fn from(e: openssl::error::ErrorStack) -> Self {
    CertificateError::Field(e.to_string())
  }
}

/// Failures loading anchor certificates from an [`AnchorSource`](crate::domain::anchors::AnchorSource).
#[derive(Debug, Error)]
pub enum AnchorError {
  #[error("invalid anchor source: expected 'system', 'file:<path>' or 'env:<VAR>'")]
  InvalidScheme,

  #[error("environment variable not found: {0}")]
  EnvVarNotFound(String),

  #[error("no system trust store found")]
  NoSystemStore,

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Certificate(#[from] CertificateError),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
