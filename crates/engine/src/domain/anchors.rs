//! Anchor certificates and the sources they are loaded from.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use super::certificate::Certificate;
use super::config::EngineDefaults;
use super::error::AnchorError;

/// An immutable set of trusted root certificates. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct AnchorSet {
    certs: Arc<Vec<Certificate>>,
}

impl AnchorSet {
    /// Build a set, dropping duplicate certificates while keeping first-seen order.
    pub fn new(certs: impl IntoIterator<Item = Certificate>) -> Self {
        let mut unique: Vec<Certificate> = Vec::new();
        for cert in certs {
            if !unique.contains(&cert) {
                unique.push(cert);
            }
        }
        Self { certs: Arc::new(unique) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a PEM bundle into a set.
    pub fn from_pem(pem: &[u8]) -> Result<Self, AnchorError> {
        Ok(Self::new(Certificate::bundle_from_pem(pem)?))
    }

    /// Load a set from any [`AnchorSource`].
    pub fn load(source: &dyn AnchorSource) -> Result<Self, AnchorError> {
        Ok(Self::new(source.load()?))
    }

    /// The process-wide system anchors, loaded once on first use.
    pub fn system() -> &'static AnchorSet {
        crate::adapters::x509::system_anchors()
    }

    pub fn contains(&self, cert: &Certificate) -> bool {
        self.certs.iter().any(|a| a == cert)
    }

    /// First anchor that issued `cert` and whose key verifies its signature.
    pub fn find_issuer(&self, cert: &Certificate) -> Option<&Certificate> {
        self.certs
            .iter()
            .find(|a| a.issued(cert) && cert.is_signed_by(a).unwrap_or(false))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.certs.iter()
    }

    pub fn as_slice(&self) -> &[Certificate] {
        &self.certs
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
}

impl FromIterator<Certificate> for AnchorSet {
    fn from_iter<I: IntoIterator<Item = Certificate>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<Vec<Certificate>> for AnchorSet {
    fn from(certs: Vec<Certificate>) -> Self {
        AnchorSet::new(certs)
    }
}

impl From<&[Certificate]> for AnchorSet {
    fn from(certs: &[Certificate]) -> Self {
        AnchorSet::new(certs.iter().cloned())
    }
}

/// Where anchor certificates come from. The evaluator never assumes a
/// particular source; the system default is itself just one implementation.
pub trait AnchorSource: Send + Sync {
    /// Load every anchor certificate this source provides.
    ///
    /// # Errors
    ///
    /// Returns [`AnchorError`] if the source is unreadable or holds malformed data.
    fn load(&self) -> Result<Vec<Certificate>, AnchorError>;
}

/// In-memory PEM bundle, typically an embedded fixture.
#[derive(Debug, Clone)]
pub struct PemBytesSource(pub Vec<u8>);

impl AnchorSource for PemBytesSource {
    fn load(&self) -> Result<Vec<Certificate>, AnchorError> {
        Ok(Certificate::bundle_from_pem(&self.0)?)
    }
}

/// Fixed certificate list; mostly for tests and injected stores.
#[derive(Debug, Clone, Default)]
pub struct StaticSource(pub Vec<Certificate>);

impl AnchorSource for StaticSource {
    fn load(&self) -> Result<Vec<Certificate>, AnchorError> {
        Ok(self.0.clone())
    }
}

/// Anchor source selected by a URI-like string.
/// Format examples:
/// - system
/// - file:/etc/ssl/certs/ca-certificates.crt
/// - env:TRUST_ANCHORS_PEM
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorSpec {
    System,
    File(PathBuf),
    Env(String),
}

impl FromStr for AnchorSpec {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == EngineDefaults::SYSTEM_ANCHOR_SOURCE {
            return Ok(AnchorSpec::System);
        }
        let (scheme, value) = s.split_once(':').ok_or(AnchorError::InvalidScheme)?;
        if value.is_empty() {
            return Err(AnchorError::InvalidScheme);
        }
        match scheme {
            "file" => Ok(AnchorSpec::File(PathBuf::from(value))),
            "env" => Ok(AnchorSpec::Env(value.to_string())),
            _ => Err(AnchorError::InvalidScheme),
        }
    }
}

impl AnchorSource for AnchorSpec {
    fn load(&self) -> Result<Vec<Certificate>, AnchorError> {
        match self {
            AnchorSpec::System => crate::adapters::x509::SystemAnchorSource::default().load(),
            AnchorSpec::File(path) => {
                let pem = std::fs::read(path)?;
                Ok(Certificate::bundle_from_pem(&pem)?)
            }
            AnchorSpec::Env(var) => {
                let pem = std::env::var(var).map_err(|_| AnchorError::EnvVarNotFound(var.clone()))?;
                Ok(Certificate::bundle_from_pem(pem.as_bytes())?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_anchor_specs() {
        assert_eq!("system".parse::<AnchorSpec>().unwrap(), AnchorSpec::System);
        assert_eq!(
            "file:/tmp/roots.pem".parse::<AnchorSpec>().unwrap(),
            AnchorSpec::File(PathBuf::from("/tmp/roots.pem"))
        );
        assert_eq!(
            "env:ROOTS".parse::<AnchorSpec>().unwrap(),
            AnchorSpec::Env("ROOTS".into())
        );
    }

    #[test]
    fn invalid_anchor_specs() {
        for bad in ["", "file:", "ftp:/x", "systemd"] {
            assert!(matches!(bad.parse::<AnchorSpec>(), Err(AnchorError::InvalidScheme)), "{bad}");
        }
    }

    #[test]
    fn missing_env_var_is_reported() {
        let spec = AnchorSpec::Env("PFXTRUST_TEST_SURELY_UNSET".into());
        assert!(matches!(spec.load(), Err(AnchorError::EnvVarNotFound(_))));
    }
}
