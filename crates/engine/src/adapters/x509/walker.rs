// adapters/x509/walker.rs

use tracing::debug;

use crate::domain::anchors::AnchorSet;
use crate::domain::certificate::Certificate;
use crate::domain::config::EngineDefaults;
use crate::domain::context::TrustContext;
use crate::domain::evaluator::TrustEvaluator;
use crate::domain::verdict::{FailureReason, TrustResult, TrustVerdict};

/// Leaf-to-root chain walker over openssl certificate primitives.
/// The first failure found wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainWalker;

impl TrustEvaluator for ChainWalker {
  fn evaluate(&self, context: &TrustContext) -> TrustVerdict {
    let chain = context.chain();
    if chain.is_empty() {
      return TrustVerdict::failed(Vec::new(), None, FailureReason::EmptyChain);
    }
    if chain.len() > EngineDefaults::MAX_CHAIN_LENGTH {
      return TrustVerdict::failed(
        chain.to_vec(),
        None,
        FailureReason::ChainTooLong { length: chain.len(), max: EngineDefaults::MAX_CHAIN_LENGTH },
      );
    }

    let only = context.anchor_certificates_only();
    let empty = AnchorSet::empty();
    let (anchors, result) = match context.custom_anchors() {
      Some(custom) => (custom, TrustResult::Proceed),
      None if only => (&empty, TrustResult::Proceed),
      None => (AnchorSet::system(), TrustResult::Unspecified),
    };
    let walk = Walk { context, anchors, only, at: context.verify_timestamp() };
    debug!(
      chain_len = chain.len(),
      anchors = anchors.len(),
      anchors_only = only,
      at = walk.at,
      "evaluating certificate chain"
    );

    let verdict = walk.run(chain, result);
    debug!(result = ?verdict.result, failure = ?verdict.failure, "evaluation finished");
    verdict
  }
}

struct Walk<'w> {
  context: &'w TrustContext,
  anchors: &'w AnchorSet,
  only: bool,
  at: i64,
}

impl Walk<'_> {
  fn run(&self, chain: &[Certificate], result: TrustResult) -> TrustVerdict {
    for (i, cert) in chain.iter().enumerate() {
      if let Some(reason) = self.check(cert) {
        return TrustVerdict::failed(chain.to_vec(), Some(i), reason);
      }
      if self.is_anchor(cert) {
        return TrustVerdict::trusted(result, chain[..=i].to_vec());
      }
      let Some(issuer) = chain.get(i + 1) else {
        break;
      };
      if !issuer.issued(cert) {
        return TrustVerdict::failed(chain.to_vec(), Some(i), FailureReason::IssuerMismatch);
      }
      match cert.is_signed_by(issuer) {
        Ok(true) => {}
        Ok(false) => {
          return TrustVerdict::failed(chain.to_vec(), Some(i), FailureReason::BadSignature);
        }
        Err(e) => {
          return TrustVerdict::failed(chain.to_vec(), Some(i + 1), FailureReason::Malformed(e.to_string()));
        }
      }
    }

    let last = chain.len() - 1;
    if self.only {
      return TrustVerdict::failed(chain.to_vec(), Some(last), FailureReason::UntrustedRoot);
    }

    // The chain stops short of an anchor; an anchor that issued its last
    // certificate completes it.
    match self.anchors.find_issuer(&chain[last]) {
      Some(anchor) => {
        let mut evaluated = chain.to_vec();
        evaluated.push(anchor.clone());
        match self.check(anchor) {
          Some(reason) => TrustVerdict::failed(evaluated, Some(last + 1), reason),
          None => TrustVerdict::trusted(result, evaluated),
        }
      }
      None => TrustVerdict::failed(chain.to_vec(), Some(last), FailureReason::UntrustedRoot),
    }
  }

  /// Validity at the verification time, then revocation.
  fn check(&self, cert: &Certificate) -> Option<FailureReason> {
    if self.at < cert.not_before() {
      return Some(FailureReason::NotYetValid { not_before: cert.not_before(), at: self.at });
    }
    if self.at > cert.not_after() {
      return Some(FailureReason::Expired { not_after: cert.not_after(), at: self.at });
    }
    let revoked = self
      .context
      .revocations()
      .is_some_and(|r| r.is_revoked(cert));
    revoked.then_some(FailureReason::Revoked)
  }

  fn is_anchor(&self, cert: &Certificate) -> bool {
    if self.only {
      cert.is_self_signed() && self.anchors.contains(cert)
    } else {
      self.anchors.contains(cert)
    }
  }
}
