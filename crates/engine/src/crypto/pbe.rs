//! Password-based decryption: the PKCS#12 PBE suite (RFC 7292 appendix C)
//! and PBES2 with PBKDF2 (RFC 8018).

use openssl::cipher::{Cipher, CipherRef};
use openssl::cipher_ctx::CipherCtx;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs5::pbkdf2_hmac;
use zeroize::Zeroizing;

use super::kdf::{pkcs12_derive, KeyPurpose};
use crate::domain::error::{DecodeError, DecodeResult};

/// The six `pbeWithSHAAnd*` schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pkcs12Cipher {
    TripleDes3Key,
    TripleDes2Key,
    Rc2_128,
    Rc2_40,
    Rc4_128,
    Rc4_40,
}

impl Pkcs12Cipher {
    pub fn name(self) -> &'static str {
        match self {
            Pkcs12Cipher::TripleDes3Key => "pbeWithSHAAnd3-KeyTripleDES-CBC",
            Pkcs12Cipher::TripleDes2Key => "pbeWithSHAAnd2-KeyTripleDES-CBC",
            Pkcs12Cipher::Rc2_128 => "pbeWithSHAAnd128BitRC2-CBC",
            Pkcs12Cipher::Rc2_40 => "pbewithSHAAnd40BitRC2-CBC",
            Pkcs12Cipher::Rc4_128 => "pbeWithSHAAnd128BitRC4",
            Pkcs12Cipher::Rc4_40 => "pbeWithSHAAnd40BitRC4",
        }
    }

    fn key_len(self) -> usize {
        match self {
            Pkcs12Cipher::TripleDes3Key => 24,
            Pkcs12Cipher::TripleDes2Key | Pkcs12Cipher::Rc2_128 | Pkcs12Cipher::Rc4_128 => 16,
            Pkcs12Cipher::Rc2_40 | Pkcs12Cipher::Rc4_40 => 5,
        }
    }

    fn iv_len(self) -> usize {
        match self {
            Pkcs12Cipher::Rc4_128 | Pkcs12Cipher::Rc4_40 => 0,
            _ => 8,
        }
    }

    /// RC2 and RC4 are looked up by name; builds without them yield `None`.
    fn cipher(self) -> Option<&'static CipherRef> {
        match self {
            Pkcs12Cipher::TripleDes3Key | Pkcs12Cipher::TripleDes2Key => Some(Cipher::des_ede3_cbc()),
            Pkcs12Cipher::Rc2_128 => Cipher::from_nid(Nid::RC2_CBC),
            Pkcs12Cipher::Rc2_40 => Cipher::from_nid(Nid::RC2_40_CBC),
            Pkcs12Cipher::Rc4_128 | Pkcs12Cipher::Rc4_40 => Cipher::from_nid(Nid::RC4),
        }
    }

    /// Decrypt `data` with key and IV derived from the BMP-encoded password
    /// through the SHA-1 PKCS#12 KDF.
    pub fn decrypt(
        self,
        bmp_password: &[u8],
        salt: &[u8],
        iterations: u32,
        data: &[u8],
    ) -> DecodeResult<Zeroizing<Vec<u8>>> {
        let md = MessageDigest::sha1();
        let unsupported = |_: openssl::error::ErrorStack| DecodeError::UnsupportedAlgorithm(self.name().to_string());
        let cipher = self
            .cipher()
            .ok_or_else(|| DecodeError::UnsupportedAlgorithm(self.name().to_string()))?;
        let mut key = pkcs12_derive(md, bmp_password, salt, KeyPurpose::Key, iterations, self.key_len())
            .map_err(unsupported)?;
        let iv = pkcs12_derive(md, bmp_password, salt, KeyPurpose::Iv, iterations, self.iv_len())
            .map_err(unsupported)?;

        if self == Pkcs12Cipher::TripleDes2Key {
            // K1 || K2 || K1
            let k1 = Zeroizing::new(key[..8].to_vec());
            key.extend_from_slice(&k1);
        }

        let iv = (!iv.is_empty()).then_some(&iv[..]);
        run_cipher(cipher, self.name(), &key, iv, data)
    }
}

/// Symmetric schemes allowed under PBES2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pbes2Cipher {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
    DesEde3Cbc,
}

impl Pbes2Cipher {
    pub fn name(self) -> &'static str {
        match self {
            Pbes2Cipher::Aes128Cbc => "aes128-CBC",
            Pbes2Cipher::Aes192Cbc => "aes192-CBC",
            Pbes2Cipher::Aes256Cbc => "aes256-CBC",
            Pbes2Cipher::DesEde3Cbc => "des-ede3-cbc",
        }
    }

    pub fn key_len(self) -> usize {
        match self {
            Pbes2Cipher::Aes128Cbc => 16,
            Pbes2Cipher::Aes192Cbc | Pbes2Cipher::DesEde3Cbc => 24,
            Pbes2Cipher::Aes256Cbc => 32,
        }
    }

    pub fn iv_len(self) -> usize {
        match self {
            Pbes2Cipher::DesEde3Cbc => 8,
            _ => 16,
        }
    }

    fn cipher(self) -> &'static CipherRef {
        match self {
            Pbes2Cipher::Aes128Cbc => Cipher::aes_128_cbc(),
            Pbes2Cipher::Aes192Cbc => Cipher::aes_192_cbc(),
            Pbes2Cipher::Aes256Cbc => Cipher::aes_256_cbc(),
            Pbes2Cipher::DesEde3Cbc => Cipher::des_ede3_cbc(),
        }
    }
}

/// PBES2 parameters after ASN.1 decoding.
#[derive(Clone, Copy)]
pub struct Pbes2Params<'a> {
    pub salt: &'a [u8],
    pub iterations: u32,
    /// PBKDF2 PRF digest (HMAC-SHA-1 when the archive omits it).
    pub prf: MessageDigest,
    /// Explicit PBKDF2 key length, if the archive states one.
    pub key_length: Option<usize>,
    pub cipher: Pbes2Cipher,
    pub iv: &'a [u8],
}

/// PBES2 decryption. The password is fed to PBKDF2 as its UTF-8 bytes.
pub fn pbes2_decrypt(password: &str, params: &Pbes2Params<'_>, data: &[u8]) -> DecodeResult<Zeroizing<Vec<u8>>> {
    let cipher = params.cipher;
    let key_len = params.key_length.unwrap_or(cipher.key_len());
    if key_len != cipher.key_len() {
        return Err(DecodeError::UnsupportedAlgorithm(format!(
            "{} with a {key_len}-byte key",
            cipher.name()
        )));
    }
    if params.iv.len() != cipher.iv_len() {
        return Err(DecodeError::malformed(format!(
            "{} IV must be {} bytes",
            cipher.name(),
            cipher.iv_len()
        )));
    }

    let mut key = Zeroizing::new(vec![0u8; key_len]);
    pbkdf2_hmac(
        password.as_bytes(),
        params.salt,
        params.iterations as usize,
        params.prf,
        &mut key,
    )
    .map_err(|e| DecodeError::UnsupportedAlgorithm(format!("PBKDF2: {e}")))?;

    run_cipher(cipher.cipher(), cipher.name(), &key, Some(params.iv), data)
}

fn run_cipher(
    cipher: &CipherRef,
    name: &str,
    key: &[u8],
    iv: Option<&[u8]>,
    data: &[u8],
) -> DecodeResult<Zeroizing<Vec<u8>>> {
    // A provider that refuses the cipher (e.g. RC2 without the legacy
    // provider) fails at init.
    let init = || -> Result<CipherCtx, openssl::error::ErrorStack> {
        let mut ctx = CipherCtx::new()?;
        ctx.decrypt_init(Some(cipher), None, None)?;
        if ctx.key_length() != key.len() {
            ctx.set_key_length(key.len())?;
        }
        ctx.decrypt_init(None, Some(key), iv)?;
        Ok(ctx)
    };
    let mut ctx = init().map_err(|e| DecodeError::UnsupportedAlgorithm(format!("{name}: {e}")))?;

    let mut out = Zeroizing::new(Vec::with_capacity(data.len() + cipher.block_size()));
    ctx.cipher_update_vec(data, &mut out)
        .and_then(|_| ctx.cipher_final_vec(&mut out))
        .map_err(|_| DecodeError::AuthenticationFailed)?;
    Ok(out)
}
