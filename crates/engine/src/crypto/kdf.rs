//! PKCS#12 key derivation (RFC 7292, appendix B) and password encodings.

use openssl::error::ErrorStack;
use openssl::hash::{hash, Hasher, MessageDigest};
use zeroize::Zeroizing;

/// Purpose byte of the PKCS#12 KDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyPurpose {
    Key = 1,
    Iv = 2,
    Mac = 3,
}

/// Password as a NUL-terminated big-endian BMPString, the form the PKCS#12
/// KDF consumes. The empty password encodes to a lone terminator.
pub fn bmp_password(password: &str) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity((password.len() + 1) * 2));
    for unit in password.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out
}

/// Derive `out_len` bytes for `purpose` from an already BMP-encoded password.
///
/// # Errors
///
/// Propagates openssl hashing failures.
pub fn pkcs12_derive(
    md: MessageDigest,
    bmp_password: &[u8],
    salt: &[u8],
    purpose: KeyPurpose,
    iterations: u32,
    out_len: usize,
) -> Result<Zeroizing<Vec<u8>>, ErrorStack> {
    let u = md.size();
    let v = md.block_size();
    let diversifier = vec![purpose as u8; v];

    let mut input = Zeroizing::new(Vec::new());
    input.extend(repeat_to_block(salt, v).iter());
    input.extend(repeat_to_block(bmp_password, v).iter());

    let mut out = Zeroizing::new(Vec::with_capacity(out_len));
    while out.len() < out_len {
        let mut hasher = Hasher::new(md)?;
        hasher.update(&diversifier)?;
        hasher.update(&input)?;
        let mut a = Zeroizing::new(hasher.finish()?.to_vec());
        for _ in 1..iterations {
            a = Zeroizing::new(hash(md, &a)?.to_vec());
        }

        let take = (out_len - out.len()).min(u);
        out.extend_from_slice(&a[..take]);
        if out.len() >= out_len {
            break;
        }

        // I_j = (I_j + B + 1) mod 2^(8v), B being A repeated to v bytes
        let b: Zeroizing<Vec<u8>> = Zeroizing::new(a.iter().cycle().take(v).copied().collect());
        for block in input.chunks_mut(v) {
            let mut carry: u16 = 1;
            for (byte, add) in block.iter_mut().zip(b.iter()).rev() {
                let sum = u16::from(*byte) + u16::from(*add) + carry;
                *byte = (sum & 0xff) as u8;
                carry = sum >> 8;
            }
        }
    }
    Ok(out)
}

fn repeat_to_block(src: &[u8], v: usize) -> Zeroizing<Vec<u8>> {
    if src.is_empty() {
        return Zeroizing::new(Vec::new());
    }
    let len = v * src.len().div_ceil(v);
    Zeroizing::new(src.iter().cycle().take(len).copied().collect())
}
