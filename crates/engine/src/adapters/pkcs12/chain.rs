// adapters/pkcs12/chain.rs

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::domain::certificate::Certificate;
use crate::domain::decoder::Pkcs12Contents;
use crate::domain::error::{DecodeError, DecodeResult};
use crate::domain::identity::{key_fingerprint, ImportedIdentity, PrivateKey};

use super::bags::{CertEntry, KeyEntry};

/// Pair keys with their leaf certificates and order each identity's chain.
pub fn assemble(keys: Vec<KeyEntry>, certs: Vec<CertEntry>) -> DecodeResult<Pkcs12Contents> {
  let mut claimed: HashSet<usize> = HashSet::new();
  let mut paired: Vec<(KeyEntry, usize)> = Vec::new();

  for entry in keys {
    let private_key = PrivateKey::new(entry.key.clone());
    match find_leaf(&private_key, &entry, &certs, &claimed) {
      Some(leaf) => {
        claimed.insert(leaf);
        paired.push((entry, leaf));
      }
      None => warn!(
        key_id = ?entry.attributes.local_key_id,
        "private key has no matching certificate; skipping"
      ),
    }
  }

  let linked: Vec<Vec<usize>> = paired
    .iter()
    .map(|(_, leaf)| link_issuers(*leaf, &certs))
    .collect();
  let in_some_chain: HashSet<usize> = linked.iter().flatten().copied().collect();
  // Other identities' leaves are never appended as extras, though they may
  // still be linked in as issuers.
  let extras: Vec<usize> = (0..certs.len())
    .filter(|i| !claimed.contains(i) && !in_some_chain.contains(i))
    .collect();

  let mut identities = Vec::with_capacity(paired.len());
  for ((entry, leaf), chain) in paired.into_iter().zip(linked) {
    let leaf_entry = &certs[leaf];
    let private_key = PrivateKey::new(entry.key);
    let spki = private_key
      .public_key_der()
      .map_err(|e| DecodeError::malformed(format!("private key: {e}")))?;
    let key_fingerprint =
      key_fingerprint(&spki).map_err(|e| DecodeError::malformed(format!("public key: {e}")))?;

    let certificate_chain: Vec<Certificate> = chain
      .iter()
      .chain(extras.iter())
      .map(|&i| certs[i].cert.clone())
      .collect();

    debug!(
      subject = leaf_entry.cert.subject(),
      chain_len = certificate_chain.len(),
      "paired private key with leaf certificate"
    );

    identities.push(ImportedIdentity {
      key_fingerprint,
      label: entry
        .attributes
        .friendly_name
        .or_else(|| leaf_entry.attributes.friendly_name.clone()),
      local_key_id: entry
        .attributes
        .local_key_id
        .or_else(|| leaf_entry.attributes.local_key_id.clone()),
      private_key,
      leaf_certificate: leaf_entry.cert.clone(),
      certificate_chain,
    });
  }

  let certificates = certs
    .iter()
    .enumerate()
    .filter(|(i, _)| !claimed.contains(i))
    .map(|(_, c)| c.cert.clone())
    .collect();

  Ok(Pkcs12Contents { identities, certificates })
}

/// First unclaimed certificate carrying the key, preferring a localKeyId match.
fn find_leaf(
  key: &PrivateKey,
  entry: &KeyEntry,
  certs: &[CertEntry],
  claimed: &HashSet<usize>,
) -> Option<usize> {
  let candidates = || {
    certs
      .iter()
      .enumerate()
      .filter(|(i, c)| !claimed.contains(i) && key.matches(&c.cert))
  };
  let by_id = entry.attributes.local_key_id.as_ref().and_then(|id| {
    candidates()
      .find(|(_, c)| c.attributes.local_key_id.as_ref() == Some(id))
      .map(|(i, _)| i)
  });
  by_id.or_else(|| candidates().next().map(|(i, _)| i))
}

/// Leaf followed by each certificate that issued the previous one, whether or
/// not that certificate carries a key of its own.
/// Stops at a self-issued certificate or when no issuer is present.
fn link_issuers(leaf: usize, certs: &[CertEntry]) -> Vec<usize> {
  let mut chain = vec![leaf];
  let mut current = leaf;
  while !certs[current].cert.is_self_signed() {
    let next = (0..certs.len())
      .find(|&i| !chain.contains(&i) && certs[i].cert.issued(&certs[current].cert));
    match next {
      Some(i) => {
        chain.push(i);
        current = i;
      }
      None => break,
    }
  }
  chain
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::pkcs12::asn1::BagAttributes;
  use crate::domain::context::TrustContext;
  use crate::domain::verdict::TrustResult;
  use openssl::pkey::PKey;
  use rcgen::{BasicConstraints, Certificate as RcCert, CertificateParams, DistinguishedName, DnType, IsCa};

  struct Fixture {
    inter: RcCert,
    leaf: RcCert,
  }

  fn params(cn: &str, ca: bool) -> CertificateParams {
    let mut p = CertificateParams::new(Vec::<String>::new());
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    p.distinguished_name = dn;
    if ca {
      p.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    }
    p
  }

  fn fixture() -> (Fixture, Vec<Certificate>) {
    let root = RcCert::from_params(params("Root", true)).unwrap();
    let inter = RcCert::from_params(params("Inter", true)).unwrap();
    let leaf = RcCert::from_params(params("Leaf", false)).unwrap();
    let root_der = root.serialize_der().unwrap();
    let inter_der = inter.serialize_der_with_signer(&root).unwrap();
    let leaf_der = leaf.serialize_der_with_signer(&inter).unwrap();
    let certs = [leaf_der, inter_der, root_der]
      .iter()
      .map(|d| Certificate::from_der(d).unwrap())
      .collect();
    (Fixture { inter, leaf }, certs)
  }

  fn key_of(cert: &RcCert) -> KeyEntry {
    KeyEntry {
      key: PKey::private_key_from_pkcs8(&cert.serialize_private_key_der()).unwrap(),
      attributes: BagAttributes::default(),
    }
  }

  fn entries(certs: &[Certificate], order: &[usize]) -> Vec<CertEntry> {
    order
      .iter()
      .map(|&i| CertEntry { cert: certs[i].clone(), attributes: BagAttributes::default() })
      .collect()
  }

  #[test]
  fn orders_chain_from_shuffled_bags() {
    let (fx, certs) = fixture();
    // root, leaf, intermediate as stored
    let contents = assemble(vec![key_of(&fx.leaf)], entries(&certs, &[2, 0, 1])).unwrap();
    assert_eq!(contents.identities.len(), 1);
    let id = &contents.identities[0];
    assert_eq!(id.leaf_certificate, certs[0]);
    assert_eq!(id.certificate_chain, certs);
    assert_eq!(contents.certificates, vec![certs[2].clone(), certs[1].clone()]);
  }

  #[test]
  fn key_without_certificate_is_dropped() {
    let (fx, certs) = fixture();
    let contents = assemble(vec![key_of(&fx.leaf)], entries(&certs, &[1, 2])).unwrap();
    assert!(contents.identities.is_empty());
    assert_eq!(contents.certificates.len(), 2);
  }

  #[test]
  fn unlinkable_certificates_are_appended() {
    let (fx, certs) = fixture();
    let stray = RcCert::from_params(params("Stray", false)).unwrap();
    let stray = Certificate::from_der(&stray.serialize_der().unwrap()).unwrap();
    let mut bags = entries(&certs, &[0, 2]);
    bags.insert(0, CertEntry { cert: stray.clone(), attributes: BagAttributes::default() });

    let contents = assemble(vec![key_of(&fx.leaf)], bags).unwrap();
    let chain = &contents.identities[0].certificate_chain;
    // no intermediate: the leaf links to nothing, root and stray trail in encounter order
    assert_eq!(chain, &vec![certs[0].clone(), stray, certs[2].clone()]);
  }

  #[test]
  fn issuing_identity_still_links_into_leaf_chain() {
    let (fx, certs) = fixture();
    let keys = vec![key_of(&fx.leaf), key_of(&fx.inter)];
    let contents = assemble(keys, entries(&certs, &[0, 1, 2])).unwrap();
    assert_eq!(contents.identities.len(), 2);
    assert_eq!(contents.identities[0].leaf_certificate, certs[0]);
    assert_eq!(contents.identities[0].certificate_chain, certs);
    assert_eq!(contents.identities[1].leaf_certificate, certs[1]);
    assert_eq!(contents.identities[1].certificate_chain, vec![certs[1].clone(), certs[2].clone()]);
    assert_eq!(contents.certificates, vec![certs[2].clone()]);

    let mut ctx = TrustContext::for_identity(&contents.identities[0]);
    ctx.set_anchor_certificates(vec![certs[2].clone()]);
    assert_eq!(ctx.evaluate().result, TrustResult::Proceed);
  }

  #[test]
  fn other_leaf_is_not_appended_when_unlinked() {
    let (fx, certs) = fixture();
    // an unrelated self-signed identity shares the archive
    let other = RcCert::from_params(params("Other", false)).unwrap();
    let other_cert = Certificate::from_der(&other.serialize_der().unwrap()).unwrap();
    let mut bags = entries(&certs, &[0, 1, 2]);
    bags.push(CertEntry { cert: other_cert.clone(), attributes: BagAttributes::default() });

    let contents = assemble(vec![key_of(&fx.leaf), key_of(&other)], bags).unwrap();
    assert_eq!(contents.identities[0].certificate_chain, certs);
    assert_eq!(contents.identities[1].certificate_chain, vec![other_cert]);
  }

  #[test]
  fn label_and_key_id_fall_back_to_leaf_bag() {
    let (fx, certs) = fixture();
    let mut bags = entries(&certs, &[0]);
    bags[0].attributes = BagAttributes {
      friendly_name: Some("leaf".into()),
      local_key_id: Some(vec![9]),
    };
    let contents = assemble(vec![key_of(&fx.leaf)], bags).unwrap();
    let id = &contents.identities[0];
    assert_eq!(id.label.as_deref(), Some("leaf"));
    assert_eq!(id.local_key_id.as_deref(), Some(&[9u8][..]));
  }

  #[test]
  fn key_label_wins_over_certificate_label() {
    let (fx, certs) = fixture();
    let mut key = key_of(&fx.leaf);
    key.attributes.friendly_name = Some("from key".into());
    let mut bags = entries(&certs, &[0]);
    bags[0].attributes.friendly_name = Some("from cert".into());
    let contents = assemble(vec![key], bags).unwrap();
    assert_eq!(contents.identities[0].label.as_deref(), Some("from key"));
  }

  #[test]
  fn fingerprint_is_sha1_of_public_key_bits() {
    let (fx, certs) = fixture();
    let contents = assemble(vec![key_of(&fx.leaf)], entries(&certs, &[0])).unwrap();
    let id = &contents.identities[0];
    // P-256 uncompressed point
    let bits = fx.leaf.get_key_pair().public_key_raw().to_vec();
    assert_eq!(bits.len(), 65);
    let expected = openssl::hash::hash(openssl::hash::MessageDigest::sha1(), &bits).unwrap();
    assert_eq!(id.key_fingerprint, expected.to_vec());
    assert_eq!(id.key_fingerprint_hex().len(), 40);
  }
}
