// crates/engine/src/domain/context.rs

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use openssl::pkey::{PKey, Public};

use super::anchors::AnchorSet;
use super::certificate::Certificate;
use super::config::EngineDefaults;
use super::error::CertificateError;
use super::evaluator::TrustEvaluator;
use super::identity::ImportedIdentity;
use super::verdict::TrustVerdict;

/// Certificates the caller considers revoked, keyed by issuer name and serial.
#[derive(Debug, Clone, Default)]
pub struct RevocationSet {
    revoked: HashSet<(String, String)>,
}

impl RevocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a certificate as revoked.
    pub fn revoke(&mut self, cert: &Certificate) {
        self.revoke_serial(cert.issuer(), cert.serial());
    }

    /// Mark an issuer/serial pair (serial in hex, case-insensitive) as revoked.
    pub fn revoke_serial(&mut self, issuer: &str, serial_hex: &str) {
        self.revoked.insert((issuer.to_string(), serial_hex.to_ascii_uppercase()));
    }

    pub fn is_revoked(&self, cert: &Certificate) -> bool {
        self.revoked
            .contains(&(cert.issuer().to_string(), cert.serial().to_ascii_uppercase()))
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}

/// Mutable evaluation context: the chain to judge plus everything that shapes
/// the judgement. Evaluating never mutates the configuration, so a context can
/// be re-evaluated any number of times.
#[derive(Debug, Clone)]
pub struct TrustContext {
    chain: Vec<Certificate>,
    custom_anchors: Option<AnchorSet>,
    anchor_certificates_only: bool,
    verify_time: Option<SystemTime>,
    revocations: Option<RevocationSet>,
    last_verdict: Option<TrustVerdict>,
}

impl TrustContext {
    /// The leaf must come first; any other order is a caller error.
    pub fn new(chain: Vec<Certificate>) -> Self {
        Self {
            chain,
            custom_anchors: None,
            anchor_certificates_only: EngineDefaults::ANCHOR_CERTIFICATES_ONLY,
            verify_time: None,
            revocations: None,
            last_verdict: None,
        }
    }

    /// Context over a DER chain, leaf first.
    pub fn from_der_chain<B: AsRef<[u8]>>(chain: &[B]) -> Result<Self, CertificateError> {
        let certs = chain
            .iter()
            .map(|der| Certificate::from_der(der.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(certs))
    }

    /// Context preconfigured with an imported identity's chain.
    pub fn for_identity(identity: &ImportedIdentity) -> Self {
        Self::new(identity.certificate_chain.clone())
    }

    pub fn chain(&self) -> &[Certificate] {
        &self.chain
    }

    pub fn set_chain(&mut self, chain: Vec<Certificate>) {
        self.chain = chain;
    }

    pub fn certificate_count(&self) -> usize {
        self.chain.len()
    }

    pub fn certificate_at(&self, index: usize) -> Option<&Certificate> {
        self.chain.get(index)
    }

    /// Public key of the leaf certificate.
    pub fn public_key(&self) -> Option<PKey<Public>> {
        self.chain.first().and_then(|leaf| leaf.public_key().ok())
    }

    /// Caller-supplied anchors; empty when the system default is in use.
    pub fn anchor_certificates(&self) -> &[Certificate] {
        self.custom_anchors.as_ref().map(AnchorSet::as_slice).unwrap_or(&[])
    }

    /// Replace the system default with caller-supplied anchors.
    pub fn set_anchor_certificates(&mut self, anchors: impl Into<AnchorSet>) {
        self.custom_anchors = Some(anchors.into());
    }

    /// Drop custom anchors and go back to the system default.
    pub fn use_system_anchors(&mut self) {
        self.custom_anchors = None;
    }

    pub fn has_custom_anchors(&self) -> bool {
        self.custom_anchors.is_some()
    }

    pub(crate) fn custom_anchors(&self) -> Option<&AnchorSet> {
        self.custom_anchors.as_ref()
    }

    pub fn anchor_certificates_only(&self) -> bool {
        self.anchor_certificates_only
    }

    /// When set, the chain must end at one of its own self-signed certificates
    /// that is also a caller-supplied anchor; the system set is never consulted.
    pub fn set_anchor_certificates_only(&mut self, only: bool) {
        self.anchor_certificates_only = only;
    }

    /// The explicit verification time, or now (read on every call).
    pub fn verify_time(&self) -> SystemTime {
        self.verify_time.unwrap_or_else(SystemTime::now)
    }

    pub fn set_verify_time(&mut self, at: SystemTime) {
        self.verify_time = Some(at);
    }

    /// Go back to evaluating at the current time.
    pub fn clear_verify_time(&mut self) {
        self.verify_time = None;
    }

    /// Verification time as Unix seconds (negative before the epoch).
    pub fn verify_timestamp(&self) -> i64 {
        unix_seconds(self.verify_time())
    }

    pub fn revocations(&self) -> Option<&RevocationSet> {
        self.revocations.as_ref()
    }

    pub fn set_revocations(&mut self, revocations: RevocationSet) {
        self.revocations = Some(revocations);
    }

    /// Run the evaluator and remember the verdict. Always re-runs the walk.
    ///
    /// With no explicit verification time each run reads the clock afresh, so
    /// validity failures (which carry the timestamp) can differ between runs.
    /// Set a verification time when verdicts must compare equal.
    pub fn evaluate_with(&mut self, evaluator: &dyn TrustEvaluator) -> &TrustVerdict {
        let verdict = evaluator.evaluate(self);
        self.last_verdict.insert(verdict)
    }

    /// Evaluate with the default chain walker.
    pub fn evaluate(&mut self) -> &TrustVerdict {
        self.evaluate_with(&crate::adapters::x509::ChainWalker)
    }

    /// Verdict of the most recent evaluation, if any.
    pub fn last_verdict(&self) -> Option<&TrustVerdict> {
        self.last_verdict.as_ref()
    }
}

pub(crate) fn unix_seconds(at: SystemTime) -> i64 {
    match at.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_secs()).map(|s| -s).unwrap_or(i64::MIN),
    }
}
