#![allow(dead_code)]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::X509;
use pfxtrust as pt;
use rcgen::{BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa};

/// 2020-01-01T00:00:00Z, notBefore of every generated certificate.
pub const NOT_BEFORE: i64 = 1_577_836_800;
/// 2030-01-01T00:00:00Z, notAfter of every generated certificate.
pub const NOT_AFTER: i64 = 1_893_456_000;
/// Somewhere inside the validity window.
pub const MID: i64 = 1_700_000_000;

pub fn at(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

pub fn params(cn: &str, ca: bool) -> CertificateParams {
    let mut params = CertificateParams::new(vec![]);
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    params.distinguished_name = dn;
    params.not_before = rcgen::date_time_ymd(2020, 1, 1);
    params.not_after = rcgen::date_time_ymd(2030, 1, 1);
    if ca {
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    }
    params
}

/// One generated certificate. The DER is produced once, since re-signing
/// with ECDSA yields different bytes every time.
pub struct Issued {
    pub rc: Certificate,
    pub der: Vec<u8>,
}

impl Issued {
    pub fn cert(&self) -> pt::Certificate {
        pt::Certificate::from_der(&self.der).expect("parse generated cert")
    }

    pub fn x509(&self) -> X509 {
        X509::from_der(&self.der).expect("x509")
    }

    /// PEM of the stored DER; `rc.serialize_pem()` would re-sign.
    pub fn pem(&self) -> String {
        String::from_utf8(self.x509().to_pem().expect("pem")).expect("ascii pem")
    }

    pub fn pkey(&self) -> PKey<Private> {
        PKey::private_key_from_pkcs8(&self.rc.serialize_private_key_der()).expect("pkcs8 key")
    }

    /// The raw subjectPublicKey bits (uncompressed P-256 point).
    pub fn public_key_bits(&self) -> Vec<u8> {
        self.rc.get_key_pair().public_key_raw().to_vec()
    }
}

pub fn self_signed(cn: &str) -> Issued {
    let rc = Certificate::from_params(params(cn, true)).expect("cert");
    let der = rc.serialize_der().expect("der");
    Issued { rc, der }
}

pub fn issued_by(cn: &str, ca: bool, issuer: &Certificate) -> Issued {
    let rc = Certificate::from_params(params(cn, ca)).expect("cert");
    let der = rc.serialize_der_with_signer(issuer).expect("der");
    Issued { rc, der }
}

/// Root -> intermediate -> leaf.
pub struct TestChain {
    pub root: Issued,
    pub inter: Issued,
    pub leaf: Issued,
}

impl TestChain {
    pub fn new() -> Self {
        let root = self_signed("Test Root");
        let inter = issued_by("Test Intermediate", true, &root.rc);
        let leaf = issued_by("Test Leaf", false, &inter.rc);
        Self { root, inter, leaf }
    }

    /// Leaf first.
    pub fn certs(&self) -> Vec<pt::Certificate> {
        vec![self.leaf.cert(), self.inter.cert(), self.root.cert()]
    }

    pub fn ders(&self) -> Vec<Vec<u8>> {
        vec![self.leaf.der.clone(), self.inter.der.clone(), self.root.der.clone()]
    }
}

fn stack(extra: &[&Issued]) -> Stack<X509> {
    let mut stack = Stack::new().expect("stack");
    for cert in extra {
        stack.push(cert.x509()).expect("push");
    }
    stack
}

/// PKCS#12 built by OpenSSL with its current defaults (PBES2/AES-256, SHA-256 MAC).
pub fn build_p12(key_and_leaf: &Issued, extra: &[&Issued], password: &str, name: Option<&str>) -> Vec<u8> {
    let mut builder = Pkcs12::builder();
    if let Some(name) = name {
        builder.name(name);
    }
    builder.pkey(&key_and_leaf.pkey());
    builder.cert(&key_and_leaf.x509());
    builder.ca(stack(extra));
    builder.build2(password).expect("build pkcs12").to_der().expect("pkcs12 der")
}

/// PKCS#12 using the legacy 3-key 3DES PBE for keys and certificates and a SHA-1 MAC.
pub fn build_legacy_p12(key_and_leaf: &Issued, extra: &[&Issued], password: &str) -> Vec<u8> {
    let mut builder = Pkcs12::builder();
    builder.pkey(&key_and_leaf.pkey());
    builder.cert(&key_and_leaf.x509());
    builder.ca(stack(extra));
    builder.key_algorithm(Nid::PBE_WITHSHA1AND3_KEY_TRIPLEDES_CBC);
    builder.cert_algorithm(Nid::PBE_WITHSHA1AND3_KEY_TRIPLEDES_CBC);
    builder.mac_md(MessageDigest::sha1());
    builder.build2(password).expect("build pkcs12").to_der().expect("pkcs12 der")
}

/// PKCS#12 as OpenSSL 1.x wrote it by default: 40-bit RC2 for the
/// certificate safe. `None` when this OpenSSL cannot encrypt with RC2
/// (OpenSSL 3 without the legacy provider).
pub fn build_rc2_p12(key_and_leaf: &Issued, extra: &[&Issued], password: &str) -> Option<Vec<u8>> {
    let mut builder = Pkcs12::builder();
    builder.pkey(&key_and_leaf.pkey());
    builder.cert(&key_and_leaf.x509());
    builder.ca(stack(extra));
    builder.key_algorithm(Nid::PBE_WITHSHA1AND3_KEY_TRIPLEDES_CBC);
    builder.cert_algorithm(Nid::PBE_WITHSHA1AND40BITRC2_CBC);
    builder.mac_md(MessageDigest::sha1());
    let p12 = builder.build2(password).ok()?;
    Some(p12.to_der().expect("pkcs12 der"))
}

/// Re-encode the outer PFX SEQUENCE with an indefinite length, the way
/// BER writers frame it.
pub fn outer_to_indefinite(der: &[u8]) -> Vec<u8> {
    assert_eq!(der[0], 0x30);
    let header = if der[1] < 0x80 { 2 } else { 2 + usize::from(der[1] & 0x7f) };
    let mut ber = vec![0x30, 0x80];
    ber.extend_from_slice(&der[header..]);
    ber.extend_from_slice(&[0x00, 0x00]);
    ber
}

/// PKCS#12 whose certificates sit in a plain `data` safe (no certificate encryption).
pub fn build_plain_certs_p12(key_and_leaf: &Issued, extra: &[&Issued], password: &str) -> Vec<u8> {
    let mut builder = Pkcs12::builder();
    builder.pkey(&key_and_leaf.pkey());
    builder.cert(&key_and_leaf.x509());
    builder.ca(stack(extra));
    builder.cert_algorithm(Nid::from_raw(-1));
    builder.build2(password).expect("build pkcs12").to_der().expect("pkcs12 der")
}

/// [`EMPTY_PFX`] in BER: indefinite lengths and a segmented OCTET STRING.
pub const EMPTY_PFX_BER: [u8; 36] = [
    0x30, 0x80, 0x02, 0x01, 0x03, 0x30, 0x80, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01,
    0x07, 0x01, 0xa0, 0x80, 0x24, 0x80, 0x04, 0x01, 0x30, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00,
];

/// PFX v3 with an empty authenticated safe and no MAC.
pub const EMPTY_PFX: [u8; 24] = [
    0x30, 0x16, 0x02, 0x01, 0x03, 0x30, 0x11, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01,
    0x07, 0x01, 0xa0, 0x04, 0x04, 0x02, 0x30, 0x00,
];
