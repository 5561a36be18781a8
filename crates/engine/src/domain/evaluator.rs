// crates/engine/src/domain/evaluator.rs

use super::context::TrustContext;
use super::verdict::TrustVerdict;

/// Trait implemented by trust backends (the openssl chain walker today).
///
/// Implementations never fail: every outcome, including malformed input, is
/// a [`TrustVerdict`].
pub trait TrustEvaluator: Send + Sync {
    fn evaluate(&self, context: &TrustContext) -> TrustVerdict;
}
