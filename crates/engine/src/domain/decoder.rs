// crates/engine/src/domain/decoder.rs

use super::certificate::Certificate;
use super::error::{DecodeError, DecodeResult};
use super::identity::ImportedIdentity;

/// Everything recovered from an archive.
#[derive(Debug, Clone, Default)]
pub struct Pkcs12Contents {
    pub identities: Vec<ImportedIdentity>,
    /// Every certificate that is not some identity's leaf, in encounter order.
    pub certificates: Vec<Certificate>,
}

/// Trait implemented by identity container backends (PKCS#12 today).
pub trait IdentityDecoder {
    /// Decode the full archive contents.
    fn decode_contents(&self, blob: &[u8], password: &str) -> DecodeResult<Pkcs12Contents>;

    /// Decode only the identities. An archive without keys yields `Ok(vec![])`.
    fn decode(&self, blob: &[u8], password: &str) -> DecodeResult<Vec<ImportedIdentity>> {
        self.decode_contents(blob, password).map(|c| c.identities)
    }

    /// Decode and return the first identity, failing with [`DecodeError::Empty`]
    /// when the archive holds none.
    fn decode_one(&self, blob: &[u8], password: &str) -> DecodeResult<ImportedIdentity> {
        self.decode(blob, password)?
            .into_iter()
            .next()
            .ok_or(DecodeError::Empty)
    }
}
