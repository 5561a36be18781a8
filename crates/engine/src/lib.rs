// crates/engine/src/lib.rs

//! Public facade for pfxtrust.
//! Decodes PKCS#12 identities and evaluates certificate chains against
//! anchor certificates. Re-exports the types consumers (and the FFI crate) need.

pub mod adapters;
pub mod crypto;
pub mod domain;

use std::path::Path;

use domain::decoder::IdentityDecoder;
use domain::error::DecodeResult;

/// Decode every identity in a PKCS#12 archive with the default limits.
///
/// An archive holding only certificates yields an empty list.
pub fn decode_pkcs12(blob: &[u8], password: &str) -> DecodeResult<Vec<ImportedIdentity>> {
    Pkcs12Decoder::secure_default().decode(blob, password)
}

/// Decode the first identity, failing with [`DecodeError::Empty`] when there is none.
pub fn decode_pkcs12_one(blob: &[u8], password: &str) -> DecodeResult<ImportedIdentity> {
    Pkcs12Decoder::secure_default().decode_one(blob, password)
}

/// Decode identities plus every certificate not used as a leaf.
pub fn decode_pkcs12_contents(blob: &[u8], password: &str) -> DecodeResult<Pkcs12Contents> {
    Pkcs12Decoder::secure_default().decode_contents(blob, password)
}

pub fn decode_pkcs12_file(path: impl AsRef<Path>, password: &str) -> DecodeResult<Vec<ImportedIdentity>> {
    Pkcs12Decoder::secure_default().decode_file(path, password)
}

/// Evaluate a context with the default chain walker and record the verdict on it.
pub fn evaluate_trust(context: &mut TrustContext) -> TrustVerdict {
    context.evaluate().clone()
}

// Re-exports for convenience
pub use adapters::pkcs12::Pkcs12Decoder;
pub use adapters::x509::{install_system_anchor_source, ChainWalker, SystemAnchorSource};
#[cfg(feature = "async")]
pub use adapters::x509::{evaluate_async, evaluate_in_background};
pub use domain::anchors::{AnchorSet, AnchorSource, AnchorSpec, PemBytesSource, StaticSource};
pub use domain::certificate::Certificate;
pub use domain::config::{DecodeLimits, EngineDefaults};
pub use domain::context::{RevocationSet, TrustContext};
pub use domain::decoder::Pkcs12Contents;
pub use domain::error::{AnchorError, CertificateError, DecodeError};
pub use domain::evaluator::TrustEvaluator;
pub use domain::identity::{ImportedIdentity, PrivateKey};
pub use domain::verdict::{CertInfo, FailureReason, TrustFailure, TrustReport, TrustResult, TrustVerdict};
