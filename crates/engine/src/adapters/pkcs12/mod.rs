// adapters/pkcs12/mod.rs
//! PKCS#12 (RFC 7292) decoder built on `der` for structure and openssl for
//! primitives.

use std::path::Path;

use der::Decode;
use openssl::hash::MessageDigest;
use tracing::debug;

use crate::crypto::mac::verify_pkcs12_hmac;
use crate::domain::config::DecodeLimits;
use crate::domain::decoder::{IdentityDecoder, Pkcs12Contents};
use crate::domain::error::{DecodeError, DecodeResult};
use crate::domain::identity::ImportedIdentity;

mod asn1;
mod bags;
mod ber;
mod chain;
mod oids;
mod pbe;

use asn1::{ContentInfo, MacData, Pfx};
use bags::BagCollector;
use pbe::Password;

/// Stateless PKCS#12 decoder; the limits are its only configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pkcs12Decoder {
  limits: DecodeLimits,
}

impl Pkcs12Decoder {
  pub fn new(limits: DecodeLimits) -> Self {
    Self { limits }
  }

  /// Decoder with [`DecodeLimits::defaults`].
  pub fn secure_default() -> Self {
    Self::new(DecodeLimits::defaults())
  }

  pub fn limits(&self) -> &DecodeLimits {
    &self.limits
  }

  /// Read and decode an archive from disk.
  pub fn decode_file(&self, path: impl AsRef<Path>, password: &str) -> DecodeResult<Vec<ImportedIdentity>> {
    let path = path.as_ref();
    let len = std::fs::metadata(path)?.len();
    if len > self.limits.max_archive_size as u64 {
      return Err(too_large(len, self.limits.max_archive_size));
    }
    let blob = std::fs::read(path)?;
    self.decode(&blob, password)
  }
}

impl IdentityDecoder for Pkcs12Decoder {
  fn decode_contents(&self, blob: &[u8], password: &str) -> DecodeResult<Pkcs12Contents> {
    if blob.len() > self.limits.max_archive_size {
      return Err(too_large(blob.len() as u64, self.limits.max_archive_size));
    }

    let blob = ber::to_der(blob)?;
    let pfx = Pfx::from_der(&blob)?;
    if pfx.version != 3 {
      return Err(DecodeError::malformed(format!("unsupported PFX version {}", pfx.version)));
    }

    let auth_safe = match pfx.auth_safe.content_type {
      oids::DATA => pfx.auth_safe.data()?,
      oids::SIGNED_DATA => {
        return Err(DecodeError::UnsupportedAlgorithm(
          "public-key integrity mode (signedData)".into(),
        ))
      }
      other => {
        return Err(DecodeError::malformed(format!("authSafe content type {other}")));
      }
    };

    let mut password = Password::new(password);
    let authenticated = match &pfx.mac_data {
      Some(mac) => {
        verify_mac(mac, auth_safe, &mut password, &self.limits)?;
        true
      }
      None => {
        debug!("archive has no MAC; integrity rests on decryption");
        false
      }
    };

    // The MAC covers the octets as stored; only the parse sees them as DER.
    let auth_safe = ber::to_der(auth_safe)?;
    let entries = Vec::<ContentInfo<'_>>::from_der(&auth_safe)?;
    let mut collector = BagCollector::new(&self.limits, &password, authenticated);
    for entry in &entries {
      match entry.content_type {
        oids::DATA => collector.visit(entry.data()?, 0)?,
        oids::ENCRYPTED_DATA => {
          let content = entry
            .content
            .ok_or_else(|| DecodeError::malformed("encryptedData content is missing"))?;
          collector.visit_encrypted(&der::Encode::to_der(&content)?)?;
        }
        other => {
          return Err(DecodeError::UnsupportedAlgorithm(format!(
            "authenticated safe content type {other}"
          )));
        }
      }
    }

    debug!(
      keys = collector.keys.len(),
      certificates = collector.certs.len(),
      "collected safe bags"
    );
    let (keys, certs) = collector.into_parts();
    chain::assemble(keys, certs)
  }
}

fn too_large(len: u64, max: usize) -> DecodeError {
  DecodeError::LimitExceeded(format!("archive of {len} bytes exceeds {max}"))
}

/// Check the archive MAC, trying the absent-password encoding when the
/// password is empty. Leaves `password` in whichever encoding matched.
fn verify_mac(
  mac: &MacData<'_>,
  auth_safe: &[u8],
  password: &mut Password,
  limits: &DecodeLimits,
) -> DecodeResult<()> {
  let alg = &mac.mac.algorithm.oid;
  let md: MessageDigest = oids::digest(alg)
    .ok_or_else(|| DecodeError::UnsupportedAlgorithm(format!("MAC digest {alg}")))?;
  pbe::check_iterations(mac.iterations, limits)?;
  debug!(digest = %alg, iterations = mac.iterations, "verifying PKCS#12 MAC");

  let expected = mac.mac.digest.as_bytes();
  let salt = mac.mac_salt.as_bytes();
  let check = |bmp: &[u8]| {
    verify_pkcs12_hmac(md, bmp, salt, mac.iterations, auth_safe, expected)
      .map_err(|e| DecodeError::UnsupportedAlgorithm(format!("MAC computation: {e}")))
  };

  if check(password.bmp())? {
    return Ok(());
  }
  if password.is_empty() {
    password.use_absent_encoding();
    if check(password.bmp())? {
      debug!("MAC matched the absent-password encoding");
      return Ok(());
    }
  }
  Err(DecodeError::AuthenticationFailed)
}
