//! PKCS#12 integrity MAC (HMAC keyed by the PKCS#12 KDF, purpose 3).

use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Signer;

use super::kdf::{pkcs12_derive, KeyPurpose};

/// HMAC over `data` with a key derived from the BMP-encoded password.
pub fn pkcs12_hmac(
    md: MessageDigest,
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
    data: &[u8],
) -> Result<Vec<u8>, ErrorStack> {
    let key = pkcs12_derive(md, bmp_password, salt, KeyPurpose::Mac, iterations, md.size())?;
    let pkey = PKey::hmac(&key)?;
    let mut signer = Signer::new(md, &pkey)?;
    signer.update(data)?;
    signer.sign_to_vec()
}

/// Constant-time check of an archive MAC.
pub fn verify_pkcs12_hmac(
    md: MessageDigest,
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
    data: &[u8],
    expected: &[u8],
) -> Result<bool, ErrorStack> {
    let computed = pkcs12_hmac(md, bmp_password, salt, iterations, data)?;
    Ok(computed.len() == expected.len() && openssl::memcmp::eq(&computed, expected))
}
