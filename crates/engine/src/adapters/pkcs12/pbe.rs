// adapters/pkcs12/pbe.rs

use der::asn1::OctetStringRef;
use openssl::hash::MessageDigest;
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::kdf::bmp_password;
use crate::crypto::pbe::{pbes2_decrypt, Pbes2Params as Pbes2Settings};
use crate::domain::config::DecodeLimits;
use crate::domain::error::{DecodeError, DecodeResult};

use super::asn1::{AlgorithmIdentifier, Pbes2Params, Pbkdf2Params, Pkcs12PbeParams};
use super::oids;

/// The caller's password in both encodings the archive may need.
pub struct Password {
  utf8: Zeroizing<String>,
  bmp: Zeroizing<Vec<u8>>,
}

impl Password {
  pub fn new(password: &str) -> Self {
    Self {
      utf8: Zeroizing::new(password.to_string()),
      bmp: bmp_password(password),
    }
  }

  pub fn bmp(&self) -> &[u8] {
    &self.bmp
  }

  pub fn is_empty(&self) -> bool {
    self.utf8.is_empty()
  }

  /// Switch the PKCS#12 encoding to the zero-length form some writers use
  /// for an absent password.
  pub fn use_absent_encoding(&mut self) {
    self.bmp = Zeroizing::new(Vec::new());
  }
}

pub fn check_iterations(iterations: u32, limits: &DecodeLimits) -> DecodeResult<()> {
  if iterations == 0 {
    return Err(DecodeError::malformed("iteration count must be positive"));
  }
  if iterations > limits.max_kdf_iterations {
    return Err(DecodeError::LimitExceeded(format!(
      "{iterations} KDF iterations (max {})",
      limits.max_kdf_iterations
    )));
  }
  Ok(())
}

/// Decrypt a payload protected by either a PKCS#12 PBE scheme or PBES2.
pub fn decrypt(
  algorithm: &AlgorithmIdentifier<'_>,
  password: &Password,
  data: &[u8],
  limits: &DecodeLimits,
) -> DecodeResult<Zeroizing<Vec<u8>>> {
  if let Some(cipher) = oids::pkcs12_cipher(&algorithm.oid) {
    let params: Pkcs12PbeParams<'_> = algorithm.parameters_as()?;
    check_iterations(params.iterations, limits)?;
    debug!(scheme = cipher.name(), iterations = params.iterations, "PKCS#12 PBE decrypt");
    return cipher.decrypt(password.bmp(), params.salt.as_bytes(), params.iterations, data);
  }

  if algorithm.oid == oids::PBES2 {
    let params: Pbes2Params<'_> = algorithm.parameters_as()?;
    return decrypt_pbes2(&params, password, data, limits);
  }

  Err(DecodeError::UnsupportedAlgorithm(format!(
    "encryption algorithm {}",
    algorithm.oid
  )))
}

fn decrypt_pbes2(
  params: &Pbes2Params<'_>,
  password: &Password,
  data: &[u8],
  limits: &DecodeLimits,
) -> DecodeResult<Zeroizing<Vec<u8>>> {
  let kdf = &params.key_derivation_func;
  if kdf.oid != oids::PBKDF2 {
    return Err(DecodeError::UnsupportedAlgorithm(format!("PBES2 key derivation {}", kdf.oid)));
  }
  let kdf_params: Pbkdf2Params<'_> = kdf.parameters_as()?;
  check_iterations(kdf_params.iteration_count, limits)?;

  let prf = match &kdf_params.prf {
    None => MessageDigest::sha1(),
    Some(prf) => oids::hmac_prf(&prf.oid)
      .ok_or_else(|| DecodeError::UnsupportedAlgorithm(format!("PBKDF2 PRF {}", prf.oid)))?,
  };

  let scheme = &params.encryption_scheme;
  let cipher = oids::pbes2_cipher(&scheme.oid)
    .ok_or_else(|| DecodeError::UnsupportedAlgorithm(format!("PBES2 cipher {}", scheme.oid)))?;
  let iv: OctetStringRef<'_> = scheme.parameters_as()?;

  debug!(
    cipher = cipher.name(),
    iterations = kdf_params.iteration_count,
    "PBES2 decrypt"
  );

  let settings = Pbes2Settings {
    salt: kdf_params.salt.as_bytes(),
    iterations: kdf_params.iteration_count,
    prf,
    key_length: kdf_params.key_length.map(|l| l as usize),
    cipher,
    iv: iv.as_bytes(),
  };
  pbes2_decrypt(&password.utf8, &settings, data)
}
