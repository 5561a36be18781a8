use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pfxtrust::domain::anchors::AnchorSource;
use pfxtrust::{
    AnchorError, AnchorSpec, Certificate, CertificateError, DecodeError, ImportedIdentity, PrivateKey,
    TrustContext, TrustResult, TrustVerdict,
};

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FfiError {
    #[error("malformed PKCS#12 container: {message}")]
    MalformedContainer { message: String },
    #[error("PKCS#12 authentication failed")]
    AuthenticationFailed,
    #[error("unsupported algorithm: {message}")]
    UnsupportedAlgorithm { message: String },
    #[error("archive contains no identities")]
    Empty,
    #[error("{message}")]
    Generic { message: String },
}

impl From<DecodeError> for FfiError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::MalformedContainer(message) => FfiError::MalformedContainer { message },
            DecodeError::AuthenticationFailed => FfiError::AuthenticationFailed,
            DecodeError::UnsupportedAlgorithm(message) => FfiError::UnsupportedAlgorithm { message },
            DecodeError::Empty => FfiError::Empty,
            other => FfiError::Generic { message: other.to_string() },
        }
    }
}

impl From<AnchorError> for FfiError {
    fn from(e: AnchorError) -> Self {
        FfiError::Generic { message: e.to_string() }
    }
}

impl From<CertificateError> for FfiError {
    fn from(e: CertificateError) -> Self {
        FfiError::Generic { message: e.to_string() }
    }
}

// ===== FFI types mirroring the public Rust API (FFI-friendly) =====

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiCertificate {
    pub der: Vec<u8>,
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub not_before: i64,
    pub not_after: i64,
}

impl From<&Certificate> for FfiCertificate {
    fn from(c: &Certificate) -> Self {
        FfiCertificate {
            der: c.der().to_vec(),
            subject: c.subject().to_string(),
            issuer: c.issuer().to_string(),
            serial: c.serial().to_string(),
            not_before: c.not_before(),
            not_after: c.not_after(),
        }
    }
}

/// Opaque private key handle; material only leaves through `pkcs8_der`.
#[derive(uniffi::Object, Debug)]
pub struct FfiPrivateKey {
    inner: PrivateKey,
}

#[uniffi::export]
impl FfiPrivateKey {
    pub fn algorithm(&self) -> String {
        self.inner.algorithm()
    }

    pub fn bits(&self) -> u32 {
        self.inner.bits()
    }

    pub fn pkcs8_der(&self) -> Result<Vec<u8>, FfiError> {
        Ok(self.inner.to_pkcs8_der()?.to_vec())
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiIdentity {
    pub key_fingerprint: Vec<u8>,
    pub label: Option<String>,
    pub local_key_id: Option<Vec<u8>>,
    pub private_key: Arc<FfiPrivateKey>,
    pub leaf_certificate: FfiCertificate,
    pub certificate_chain: Vec<FfiCertificate>,
}

impl From<ImportedIdentity> for FfiIdentity {
    fn from(id: ImportedIdentity) -> Self {
        FfiIdentity {
            leaf_certificate: (&id.leaf_certificate).into(),
            certificate_chain: id.certificate_chain.iter().map(Into::into).collect(),
            key_fingerprint: id.key_fingerprint,
            label: id.label,
            local_key_id: id.local_key_id,
            private_key: Arc::new(FfiPrivateKey { inner: id.private_key }),
        }
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiTrustConfig {
    /// DER certificates, leaf first.
    pub chain: Vec<Vec<u8>>,
    /// Caller-supplied anchors as DER; `None` uses the system anchors.
    pub anchors: Option<Vec<Vec<u8>>>,
    pub anchor_certificates_only: bool,
    /// Unix seconds; `None` evaluates at the current time.
    pub verify_time: Option<i64>,
}

#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiTrustResult { Unspecified, Proceed, Deny, FatalTrustFailure, RecoverableTrustFailure, Invalid }

impl From<TrustResult> for FfiTrustResult {
    fn from(v: TrustResult) -> Self {
        match v {
            TrustResult::Unspecified => FfiTrustResult::Unspecified,
            TrustResult::Proceed => FfiTrustResult::Proceed,
            TrustResult::Deny => FfiTrustResult::Deny,
            TrustResult::FatalTrustFailure => FfiTrustResult::FatalTrustFailure,
            TrustResult::RecoverableTrustFailure => FfiTrustResult::RecoverableTrustFailure,
            TrustResult::Invalid => FfiTrustResult::Invalid,
        }
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiTrustVerdict {
    pub result: FfiTrustResult,
    pub trusted: bool,
    pub failure_index: Option<u32>,
    pub diagnostic: Option<String>,
    pub chain: Vec<FfiCertificate>,
    /// JSON rendering of the verdict report, when it could be produced.
    pub report_json: Option<String>,
}

impl From<&TrustVerdict> for FfiTrustVerdict {
    fn from(v: &TrustVerdict) -> Self {
        FfiTrustVerdict {
            result: v.result.into(),
            trusted: v.is_trusted(),
            failure_index: v.failure.as_ref().and_then(|f| f.index).map(|i| i as u32),
            diagnostic: v.diagnostic(),
            chain: v.chain.iter().map(Into::into).collect(),
            report_json: v.report().to_json().ok(),
        }
    }
}

impl FfiTrustVerdict {
    fn invalid(index: Option<usize>, message: String) -> Self {
        FfiTrustVerdict {
            result: FfiTrustResult::Invalid,
            trusted: false,
            failure_index: index.map(|i| i as u32),
            diagnostic: Some(message),
            chain: Vec::new(),
            report_json: None,
        }
    }
}

fn unix_to_system_time(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs.unsigned_abs())
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

// ===== High-level API, mirroring Rust surface =====

#[uniffi::export]
pub fn decode_pkcs12_ffi(blob: Vec<u8>, password: String) -> Result<Vec<FfiIdentity>, FfiError> {
    let ids = pfxtrust::decode_pkcs12(&blob, &password)?;
    Ok(ids.into_iter().map(Into::into).collect())
}

#[uniffi::export]
pub fn decode_pkcs12_file_ffi(path: String, password: String) -> Result<Vec<FfiIdentity>, FfiError> {
    let ids = pfxtrust::decode_pkcs12_file(path, &password)?;
    Ok(ids.into_iter().map(Into::into).collect())
}

/// Evaluate a DER chain. Never fails: unparseable input is an `Invalid` verdict.
#[uniffi::export]
pub fn evaluate_trust_ffi(config: FfiTrustConfig) -> FfiTrustVerdict {
    let mut chain = Vec::with_capacity(config.chain.len());
    for (i, der) in config.chain.iter().enumerate() {
        match Certificate::from_der(der) {
            Ok(c) => chain.push(c),
            Err(e) => return FfiTrustVerdict::invalid(Some(i), e.to_string()),
        }
    }

    let mut ctx = TrustContext::new(chain);
    if let Some(anchors) = &config.anchors {
        let parsed: Result<Vec<Certificate>, _> = anchors.iter().map(|d| Certificate::from_der(d)).collect();
        match parsed {
            Ok(certs) => ctx.set_anchor_certificates(certs),
            Err(e) => return FfiTrustVerdict::invalid(None, format!("anchor certificate: {e}")),
        }
    }
    ctx.set_anchor_certificates_only(config.anchor_certificates_only);
    if let Some(t) = config.verify_time {
        ctx.set_verify_time(unix_to_system_time(t));
    }

    FfiTrustVerdict::from(ctx.evaluate())
}

/// Load anchors from `system`, `file:<path>` or `env:<VAR>`.
#[uniffi::export]
pub fn load_anchors_ffi(spec: String) -> Result<Vec<FfiCertificate>, FfiError> {
    let spec: AnchorSpec = spec.parse()?;
    Ok(spec.load()?.iter().map(Into::into).collect())
}

uniffi::setup_scaffolding!();
