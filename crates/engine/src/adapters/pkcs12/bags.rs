// adapters/pkcs12/bags.rs

use der::asn1::OctetStringRef;
use der::{Decode, Encode};
use openssl::pkey::{PKey, Private};
use tracing::debug;

use crate::domain::certificate::Certificate;
use crate::domain::config::DecodeLimits;
use crate::domain::error::{DecodeError, DecodeResult};

use super::asn1::{BagAttributes, CertBag, EncryptedPrivateKeyInfo, SafeBag};
use super::oids;
use super::pbe::{self, Password};

pub struct KeyEntry {
  pub key: PKey<Private>,
  pub attributes: BagAttributes,
}

pub struct CertEntry {
  pub cert: Certificate,
  pub attributes: BagAttributes,
}

/// Walks SafeContents, collecting keys and certificates in encounter order.
pub struct BagCollector<'c> {
  limits: &'c DecodeLimits,
  password: &'c Password,
  /// When the archive carried a verified MAC, garbage after decryption is
  /// corruption rather than a wrong password.
  authenticated: bool,
  seen: usize,
  pub keys: Vec<KeyEntry>,
  pub certs: Vec<CertEntry>,
}

impl<'c> BagCollector<'c> {
  pub fn new(limits: &'c DecodeLimits, password: &'c Password, authenticated: bool) -> Self {
    Self {
      limits,
      password,
      authenticated,
      seen: 0,
      keys: Vec::new(),
      certs: Vec::new(),
    }
  }

  pub fn into_parts(self) -> (Vec<KeyEntry>, Vec<CertEntry>) {
    (self.keys, self.certs)
  }

  /// Decrypt an `encryptedData` payload, then walk it.
  pub fn visit_encrypted(&mut self, data: &[u8]) -> DecodeResult<()> {
    let encrypted = super::asn1::EncryptedData::from_der(data)?;
    let info = &encrypted.encrypted_content_info;
    if info.content_type != oids::DATA {
      return Err(DecodeError::malformed(format!(
        "encrypted content type {} is not data",
        info.content_type
      )));
    }
    let Some(ciphertext) = info.ciphertext()? else {
      return Ok(());
    };
    let plain = pbe::decrypt(&info.content_encryption_algorithm, self.password, &ciphertext, self.limits)?;
    let walked = self.visit(&plain, 0);
    self.after_decrypt(walked)
  }

  /// Walk one SafeContents at the given nesting depth.
  pub fn visit(&mut self, safe_contents: &[u8], depth: usize) -> DecodeResult<()> {
    if depth > self.limits.max_nesting_depth {
      return Err(DecodeError::LimitExceeded(format!(
        "safe contents nested deeper than {}",
        self.limits.max_nesting_depth
      )));
    }
    let safe_contents = super::ber::to_der(safe_contents)?;
    let bags = Vec::<SafeBag<'_>>::from_der(&safe_contents)?;
    for bag in bags {
      self.seen += 1;
      if self.seen > self.limits.max_bags {
        return Err(DecodeError::LimitExceeded(format!(
          "more than {} safe bags",
          self.limits.max_bags
        )));
      }
      self.visit_bag(&bag, depth)?;
    }
    Ok(())
  }

  fn visit_bag(&mut self, bag: &SafeBag<'_>, depth: usize) -> DecodeResult<()> {
    match bag.bag_id {
      oids::KEY_BAG => {
        let key = parse_pkcs8(&bag.bag_value.to_der()?)?;
        self.push_key(key, bag)
      }
      oids::SHROUDED_KEY_BAG => {
        let shrouded: EncryptedPrivateKeyInfo<'_> = bag.bag_value.decode_as()?;
        let plain = pbe::decrypt(
          &shrouded.encryption_algorithm,
          self.password,
          shrouded.encrypted_data.as_bytes(),
          self.limits,
        )?;
        let key = self.after_decrypt(parse_pkcs8(&plain))?;
        self.push_key(key, bag)
      }
      oids::CERT_BAG => {
        let cert_bag: CertBag<'_> = bag.bag_value.decode_as()?;
        if cert_bag.cert_id != oids::X509_CERTIFICATE {
          debug!(cert_type = %cert_bag.cert_id, "skipping non-X.509 certificate bag");
          return Ok(());
        }
        let der = cert_bag.cert_value.decode_as::<OctetStringRef<'_>>()?;
        let cert = Certificate::from_der(der.as_bytes())
          .map_err(|e| DecodeError::malformed(format!("certificate bag: {e}")))?;
        let attributes = BagAttributes::parse(bag.bag_attributes)?;
        if let Some(existing) = self.certs.iter_mut().find(|c| c.cert == cert) {
          merge(&mut existing.attributes, attributes);
        } else {
          self.certs.push(CertEntry { cert, attributes });
        }
        Ok(())
      }
      oids::SAFE_CONTENTS_BAG => self.visit(&bag.bag_value.to_der()?, depth + 1),
      oids::CRL_BAG | oids::SECRET_BAG => {
        debug!(bag = %bag.bag_id, "skipping CRL/secret bag");
        Ok(())
      }
      other => {
        debug!(bag = %other, "skipping unknown bag type");
        Ok(())
      }
    }
  }

  fn push_key(&mut self, key: PKey<Private>, bag: &SafeBag<'_>) -> DecodeResult<()> {
    let attributes = BagAttributes::parse(bag.bag_attributes)?;
    self.keys.push(KeyEntry { key, attributes });
    Ok(())
  }

  /// Without a MAC, an unparseable plaintext is what a wrong password looks like.
  fn after_decrypt<T>(&self, result: DecodeResult<T>) -> DecodeResult<T> {
    match result {
      Err(DecodeError::MalformedContainer(_)) if !self.authenticated => {
        Err(DecodeError::AuthenticationFailed)
      }
      other => other,
    }
  }
}

fn parse_pkcs8(der: &[u8]) -> DecodeResult<PKey<Private>> {
  PKey::private_key_from_pkcs8(der)
    .map_err(|e| DecodeError::malformed(format!("private key: {e}")))
}

fn merge(into: &mut BagAttributes, from: BagAttributes) {
  if into.friendly_name.is_none() {
    into.friendly_name = from.friendly_name;
  }
  if into.local_key_id.is_none() {
    into.local_key_id = from.local_key_id;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn collector<'c>(limits: &'c DecodeLimits, pw: &'c Password) -> BagCollector<'c> {
    BagCollector::new(limits, pw, true)
  }

  // SEQUENCE OF SafeBag holding one CRL bag whose value is NULL
  const ONE_CRL_BAG: [u8; 21] = [
    0x30, 0x13, 0x30, 0x11, 0x06, 0x0b, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x0c, 0x0a, 0x01,
    0x04, 0xa0, 0x02, 0x05, 0x00,
  ];

  #[test]
  fn skips_crl_bags() {
    let limits = DecodeLimits::defaults();
    let pw = Password::new("x");
    let mut c = collector(&limits, &pw);
    c.visit(&ONE_CRL_BAG, 0).unwrap();
    assert!(c.keys.is_empty());
    assert!(c.certs.is_empty());
  }

  #[test]
  fn bag_count_is_limited() {
    let limits = DecodeLimits { max_bags: 0, ..DecodeLimits::defaults() };
    let pw = Password::new("x");
    let mut c = collector(&limits, &pw);
    assert!(matches!(c.visit(&ONE_CRL_BAG, 0), Err(DecodeError::LimitExceeded(_))));
  }

  #[test]
  fn nesting_is_limited() {
    let limits = DecodeLimits { max_nesting_depth: 2, ..DecodeLimits::defaults() };
    let pw = Password::new("x");
    let mut c = collector(&limits, &pw);
    assert!(matches!(c.visit(&ONE_CRL_BAG, 3), Err(DecodeError::LimitExceeded(_))));
  }

  #[test]
  fn garbage_is_malformed() {
    let limits = DecodeLimits::defaults();
    let pw = Password::new("x");
    let mut c = collector(&limits, &pw);
    assert!(matches!(c.visit(&[0x30, 0x05, 0x01], 0), Err(DecodeError::MalformedContainer(_))));
  }
}
