// crates/engine/src/domain/identity.rs

use std::fmt;

use openssl::hash::{hash, MessageDigest};
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use zeroize::Zeroizing;

use super::certificate::Certificate;
use super::error::CertificateError;

/// Opaque handle to a private key recovered from an archive.
///
/// `Debug` only prints the algorithm and size; the key material leaves this
/// type solely through [`PrivateKey::to_pkcs8_der`].
#[derive(Clone)]
pub struct PrivateKey {
    inner: PKey<Private>,
}

impl PrivateKey {
    pub(crate) fn new(inner: PKey<Private>) -> Self {
        Self { inner }
    }

    /// Load a key from unencrypted PKCS#8 DER.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, CertificateError> {
        let inner = PKey::private_key_from_pkcs8(der)
            .map_err(|e| CertificateError::InvalidDer(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Unencrypted PKCS#8 encoding, wiped on drop.
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>, CertificateError> {
        Ok(Zeroizing::new(self.inner.private_key_to_pkcs8()?))
    }

    /// DER SubjectPublicKeyInfo of the matching public key.
    pub fn public_key_der(&self) -> Result<Vec<u8>, CertificateError> {
        Ok(self.inner.public_key_to_der()?)
    }

    /// Whether `cert` carries this key's public half.
    pub fn matches(&self, cert: &Certificate) -> bool {
        cert.public_key()
            .map(|public| self.inner.public_eq(&public))
            .unwrap_or(false)
    }

    pub fn bits(&self) -> u32 {
        self.inner.bits()
    }

    /// Short algorithm name, e.g. `rsaEncryption` or `id-ecPublicKey`.
    pub fn algorithm(&self) -> String {
        Nid::from_raw(self.inner.id().as_raw())
            .short_name()
            .unwrap_or("unknown")
            .to_string()
    }

    pub fn as_pkey(&self) -> &PKey<Private> {
        &self.inner
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm())
            .field("bits", &self.bits())
            .finish()
    }
}

/// One private key with its certificate chain, as imported from a PKCS#12
/// archive. Only the decoder creates these.
#[derive(Debug, Clone)]
pub struct ImportedIdentity {
    /// SHA-1 over the subjectPublicKey bits (RFC 5280 key identifier, method 1).
    pub key_fingerprint: Vec<u8>,
    /// PKCS#9 friendlyName of the key bag, or of the leaf's cert bag.
    pub label: Option<String>,
    /// PKCS#9 localKeyId exactly as stored in the archive.
    pub local_key_id: Option<Vec<u8>>,
    pub private_key: PrivateKey,
    pub leaf_certificate: Certificate,
    /// Leaf first, then issuers in linkage order, then unlinkable extras.
    pub certificate_chain: Vec<Certificate>,
}

impl ImportedIdentity {
    /// Hex form of `key_fingerprint`, handy for logs and lookups.
    pub fn key_fingerprint_hex(&self) -> String {
        self.key_fingerprint.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// SHA-1 of the BIT STRING contents inside a DER SubjectPublicKeyInfo.
pub(crate) fn key_fingerprint(spki_der: &[u8]) -> Result<Vec<u8>, CertificateError> {
    use der::Decode;

    let spki = SubjectPublicKeyInfo::from_der(spki_der)
        .map_err(|e| CertificateError::InvalidDer(e.to_string()))?;
    let bits = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| CertificateError::Field("public key has unused bits".into()))?;
    Ok(hash(MessageDigest::sha1(), bits)?.to_vec())
}

#[derive(der::Sequence)]
struct SubjectPublicKeyInfo<'a> {
    #[allow(dead_code)]
    algorithm: der::asn1::AnyRef<'a>,
    subject_public_key: der::asn1::BitStringRef<'a>,
}
