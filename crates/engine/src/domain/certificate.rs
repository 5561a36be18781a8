// crates/engine/src/domain/certificate.rs

use std::fmt;
use std::hash::{Hash, Hasher};

use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::pkey::{PKey, Public};
use openssl::x509::{X509, X509NameRef, X509Ref, X509VerifyResult};

use super::error::CertificateError;

/// An immutable, parsed X.509 certificate.
///
/// The DER bytes are the identity of the certificate: equality and hashing
/// compare them, never the parsed fields. Cloning is cheap (the openssl handle
/// is reference counted).
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    x509: X509,
    subject: String,
    issuer: String,
    serial: String,
    not_before: i64,
    not_after: i64,
}

impl Certificate {
    /// Parse a single DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let x509 = X509::from_der(der).map_err(|e| CertificateError::InvalidDer(e.to_string()))?;
        Self::from_x509(x509)
    }

    /// Parse every certificate in a PEM bundle (concatenated `CERTIFICATE` blocks).
    pub fn bundle_from_pem(pem: &[u8]) -> Result<Vec<Self>, CertificateError> {
        let stack = X509::stack_from_pem(pem).map_err(|e| CertificateError::InvalidPem(e.to_string()))?;
        stack.into_iter().map(Self::from_x509).collect()
    }

    pub(crate) fn from_x509(x509: X509) -> Result<Self, CertificateError> {
        let der = x509.to_der()?;
        let subject = name_to_string(x509.subject_name());
        let issuer = name_to_string(x509.issuer_name());
        let serial = x509.serial_number().to_bn()?.to_hex_str()?.to_string();
        let not_before = asn1_to_unix(x509.not_before())?;
        let not_after = asn1_to_unix(x509.not_after())?;
        Ok(Self { der, x509, subject, issuer, serial, not_before, not_after })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Serial number as upper-case hex.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Start of the validity interval, Unix seconds.
    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    /// End of the validity interval, Unix seconds.
    pub fn not_after(&self) -> i64 {
        self.not_after
    }

    /// Both bounds are inclusive.
    pub fn is_valid_at(&self, unix_secs: i64) -> bool {
        self.not_before <= unix_secs && unix_secs <= self.not_after
    }

    pub fn public_key(&self) -> Result<PKey<Public>, CertificateError> {
        Ok(self.x509.public_key()?)
    }

    /// Whether `self` names `subject`'s issuer (openssl's issued check: names,
    /// key identifiers and key usage).
    pub fn issued(&self, subject: &Certificate) -> bool {
        self.x509.issued(&subject.x509) == X509VerifyResult::OK
    }

    /// Whether this certificate's signature verifies with `issuer`'s public key.
    pub fn is_signed_by(&self, issuer: &Certificate) -> Result<bool, CertificateError> {
        let key = issuer.public_key()?;
        Ok(self.x509.verify(&key)?)
    }

    pub fn is_self_signed(&self) -> bool {
        self.issued(self) && self.is_signed_by(self).unwrap_or(false)
    }

    pub fn as_x509(&self) -> &X509Ref {
        &self.x509
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl Hash for Certificate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.der.hash(state);
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("serial", &self.serial)
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .finish()
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subject)
    }
}

fn name_to_string(name: &X509NameRef) -> String {
    name.entries()
        .map(|entry| {
            let key = entry.object().nid().short_name().unwrap_or("?");
            let value = entry.data().to_string().unwrap_or_default();
            format!("{key}={value}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn asn1_to_unix(time: &Asn1TimeRef) -> Result<i64, CertificateError> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(time)?;
    Ok(i64::from(diff.days) * 86_400 + i64::from(diff.secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn self_signed_der(cn: &str) -> Vec<u8> {
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new());
        params.distinguished_name = rcgen::DistinguishedName::new();
        params.distinguished_name.push(rcgen::DnType::CommonName, cn);
        params.not_before = rcgen::date_time_ymd(2020, 1, 1);
        params.not_after = rcgen::date_time_ymd(2030, 1, 1);
        rcgen::Certificate::from_params(params).unwrap().serialize_der().unwrap()
    }

    #[test]
    fn name_keeps_interior_nul() {
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new());
        params.distinguished_name = rcgen::DistinguishedName::new();
        params.distinguished_name.push(rcgen::DnType::CommonName, "good.example\0evil");
        let der = rcgen::Certificate::from_params(params).unwrap().serialize_der().unwrap();
        let cert = Certificate::from_der(&der).unwrap();
        assert_eq!(cert.subject(), "CN=good.example\0evil");
    }

    #[test]
    fn parses_fields_and_validity() {
        let cert = Certificate::from_der(&self_signed_der("unit root")).unwrap();
        assert_eq!(cert.subject(), "CN=unit root");
        assert_eq!(cert.issuer(), "CN=unit root");
        assert_eq!(cert.not_before(), 1_577_836_800);
        assert_eq!(cert.not_after(), 1_893_456_000);
        assert!(cert.is_valid_at(1_577_836_800));
        assert!(cert.is_valid_at(1_893_456_000));
        assert!(!cert.is_valid_at(1_893_456_001));
        assert!(cert.is_self_signed());
    }

    #[test]
    fn equality_is_by_der() {
        let der = self_signed_der("eq");
        let a = Certificate::from_der(&der).unwrap();
        let b = Certificate::from_der(&der).unwrap();
        let c = Certificate::from_der(&self_signed_der("eq")).unwrap();
        assert_eq!(a, b);
        // fresh key pair, different bytes
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Certificate::from_der(b"not a certificate"),
            Err(CertificateError::InvalidDer(_))
        ));
    }
}
