// adapters/x509/system_store.rs

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use openssl::x509::X509;
use tracing::{debug, warn};

use crate::domain::anchors::{AnchorSet, AnchorSource};
use crate::domain::certificate::Certificate;
use crate::domain::error::{AnchorError, CertificateError};

/// Well-known CA bundle files, in order of preference.
const KNOWN_CA_BUNDLE_PATHS: &[&str] = &[
  "/etc/ssl/certs/ca-certificates.crt", // Debian/Ubuntu
  "/etc/pki/tls/certs/ca-bundle.crt",   // RHEL/CentOS/Fedora
  "/etc/ssl/ca-bundle.pem",             // openSUSE
  "/etc/ssl/cert.pem",                  // macOS, Alpine
];

static SYSTEM_ANCHORS: OnceCell<AnchorSet> = OnceCell::new();

/// The platform CA bundle, read as PEM.
#[derive(Debug, Clone, Default)]
pub struct SystemAnchorSource {
  bundle: Option<PathBuf>,
}

impl SystemAnchorSource {
  /// Use a specific bundle file instead of discovering one.
  pub fn with_bundle(path: impl Into<PathBuf>) -> Self {
    Self { bundle: Some(path.into()) }
  }

  /// Bundle discovery: `SSL_CERT_FILE`, then openssl-probe, then the
  /// well-known distribution paths.
  pub fn find_bundle() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SSL_CERT_FILE") {
      let p = PathBuf::from(path);
      if p.is_file() {
        return Some(p);
      }
    }

    #[cfg(feature = "system-store")]
    {
      if let Some(p) = openssl_probe::probe().cert_file {
        if p.is_file() {
          return Some(p);
        }
      }
    }

    KNOWN_CA_BUNDLE_PATHS
      .iter()
      .map(PathBuf::from)
      .find(|p| p.is_file())
  }
}

impl AnchorSource for SystemAnchorSource {
  fn load(&self) -> Result<Vec<Certificate>, AnchorError> {
    let path = match &self.bundle {
      Some(p) => p.clone(),
      None => Self::find_bundle().ok_or(AnchorError::NoSystemStore)?,
    };
    let pem = std::fs::read(&path)?;
    let stack = X509::stack_from_pem(&pem)
      .map_err(|e| CertificateError::InvalidPem(e.to_string()))?;

    // Distribution bundles occasionally carry entries openssl reads but we
    // cannot summarize; those are skipped rather than failing the store.
    let total = stack.len();
    let certs: Vec<Certificate> = stack
      .into_iter()
      .filter_map(|x509| Certificate::from_x509(x509).ok())
      .collect();
    debug!(path = %path.display(), loaded = certs.len(), skipped = total - certs.len(), "read system CA bundle");
    Ok(certs)
  }
}

/// Inject the source the system anchor set is read from. The source is
/// loaded right away, inside the same initialisation the default path uses,
/// so it either becomes the process-wide set or is ignored. Returns false when
/// the set was already initialised (or is being initialised concurrently).
pub fn install_system_anchor_source(source: impl AnchorSource) -> bool {
  let mut installed = false;
  SYSTEM_ANCHORS.get_or_init(|| {
    installed = true;
    load_or_empty(&source)
  });
  installed
}

/// The process-wide system anchors, loaded on first use. A source that fails
/// to load leaves the set empty for the rest of the process.
pub fn system_anchors() -> &'static AnchorSet {
  SYSTEM_ANCHORS.get_or_init(|| load_or_empty(&SystemAnchorSource::default()))
}

fn load_or_empty(source: &dyn AnchorSource) -> AnchorSet {
  match source.load() {
    Ok(certs) => {
      let set = AnchorSet::new(certs);
      debug!(anchors = set.len(), "system anchors loaded");
      set
    }
    Err(e) => {
      warn!(error = %e, "system anchors unavailable; continuing with an empty set");
      AnchorSet::empty()
    }
  }
}
