// crates/engine/src/domain/verdict.rs
use std::fmt;

use serde::Serialize;

use super::certificate::Certificate;

/// Outcome classes of a trust evaluation.
///
/// `Proceed` and `Unspecified` are the two trusted outcomes: the first means a
/// caller-supplied anchor was reached, the second that the chain ended at an
/// anchor from the system default set (implicit trust).
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustResult {
    Unspecified,
    Proceed,
    Deny,
    FatalTrustFailure,
    RecoverableTrustFailure,
    Invalid,
}

impl TrustResult {
    pub fn is_trusted(self) -> bool {
        matches!(self, TrustResult::Proceed | TrustResult::Unspecified)
    }
}

/// Why a walk stopped.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum FailureReason {
    EmptyChain,
    ChainTooLong { length: usize, max: usize },
    NotYetValid { not_before: i64, at: i64 },
    Expired { not_after: i64, at: i64 },
    Revoked,
    IssuerMismatch,
    BadSignature,
    UntrustedRoot,
    Malformed(String),
}

impl FailureReason {
    /// Verdict class this failure maps to.
    pub fn result(&self) -> TrustResult {
        match self {
            FailureReason::NotYetValid { .. }
            | FailureReason::Expired { .. }
            | FailureReason::UntrustedRoot => TrustResult::RecoverableTrustFailure,
            FailureReason::IssuerMismatch | FailureReason::BadSignature => {
                TrustResult::FatalTrustFailure
            }
            FailureReason::Revoked => TrustResult::Deny,
            FailureReason::EmptyChain
            | FailureReason::ChainTooLong { .. }
            | FailureReason::Malformed(_) => TrustResult::Invalid,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::EmptyChain => write!(f, "empty certificate chain"),
            FailureReason::ChainTooLong { length, max } => {
                write!(f, "chain of {length} certificates exceeds the maximum of {max}")
            }
            FailureReason::NotYetValid { not_before, at } => {
                write!(f, "not valid before {not_before} (evaluated at {at})")
            }
            FailureReason::Expired { not_after, at } => {
                write!(f, "expired at {not_after} (evaluated at {at})")
            }
            FailureReason::Revoked => write!(f, "certificate is revoked"),
            FailureReason::IssuerMismatch => write!(f, "issuer does not match the next certificate"),
            FailureReason::BadSignature => write!(f, "signature does not verify with the issuer key"),
            FailureReason::UntrustedRoot => write!(f, "chain does not end at a trusted anchor"),
            FailureReason::Malformed(msg) => write!(f, "malformed certificate: {msg}"),
        }
    }
}

/// The first failure found, with the index of the offending certificate in
/// the evaluated chain (`None` when no certificate is to blame).
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct TrustFailure {
    pub index: Option<usize>,
    pub reason: FailureReason,
}

/// Immutable result of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustVerdict {
    pub result: TrustResult,
    /// The chain as evaluated: the input chain, cut at the anchor it reached,
    /// or extended by the external anchor that terminated it.
    pub chain: Vec<Certificate>,
    pub failure: Option<TrustFailure>,
}

impl TrustVerdict {
    pub(crate) fn trusted(result: TrustResult, chain: Vec<Certificate>) -> Self {
        Self { result, chain, failure: None }
    }

    pub(crate) fn failed(chain: Vec<Certificate>, index: Option<usize>, reason: FailureReason) -> Self {
        Self {
            result: reason.result(),
            chain,
            failure: Some(TrustFailure { index, reason }),
        }
    }

    pub fn is_trusted(&self) -> bool {
        self.result.is_trusted()
    }

    /// Human readable diagnostic, `None` when trusted.
    pub fn diagnostic(&self) -> Option<String> {
        self.failure.as_ref().map(|f| match f.index {
            Some(i) => {
                let subject = self.chain.get(i).map(Certificate::subject).unwrap_or("?");
                format!("certificate {i} ({subject}): {}", f.reason)
            }
            None => f.reason.to_string(),
        })
    }

    pub fn report(&self) -> TrustReport {
        TrustReport {
            result: self.result,
            trusted: self.is_trusted(),
            failure: self.failure.clone(),
            diagnostic: self.diagnostic(),
            chain: self.chain.iter().map(CertInfo::from).collect(),
        }
    }
}

/// Certificate summary for reports.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct CertInfo {
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub not_before: i64,
    pub not_after: i64,
}

impl From<&Certificate> for CertInfo {
    fn from(cert: &Certificate) -> Self {
        Self {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: cert.serial().to_string(),
            not_before: cert.not_before(),
            not_after: cert.not_after(),
        }
    }
}

/// Serializable view of a [`TrustVerdict`].
#[derive(Debug, Serialize, Clone)]
pub struct TrustReport {
    pub result: TrustResult,
    pub trusted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<TrustFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    pub chain: Vec<CertInfo>,
}

impl TrustReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_classes() {
        assert_eq!(FailureReason::BadSignature.result(), TrustResult::FatalTrustFailure);
        assert_eq!(FailureReason::UntrustedRoot.result(), TrustResult::RecoverableTrustFailure);
        assert_eq!(FailureReason::Revoked.result(), TrustResult::Deny);
        assert_eq!(FailureReason::EmptyChain.result(), TrustResult::Invalid);
        assert!(TrustResult::Unspecified.is_trusted());
        assert!(!TrustResult::Deny.is_trusted());
    }

    #[test]
    fn empty_chain_report_serializes() {
        let v = TrustVerdict::failed(vec![], None, FailureReason::EmptyChain);
        let json = v.report().to_json().unwrap();
        let val: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(val["result"], "Invalid");
        assert_eq!(val["trusted"], false);
        assert_eq!(val["diagnostic"], "empty certificate chain");
    }
}
