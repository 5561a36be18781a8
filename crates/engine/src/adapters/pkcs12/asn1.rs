// adapters/pkcs12/asn1.rs
//! DER shapes of the PFX structures (RFC 7292, RFC 5652, RFC 8018).
//! Only what decoding needs; nothing here is ever re-encoded.

use std::borrow::Cow;

use der::asn1::{AnyRef, ObjectIdentifier, OctetStringRef};
use der::{Decode, Reader, SliceReader, Sequence, Tag, Tagged};

use crate::domain::error::{DecodeError, DecodeResult};

use super::oids;

#[derive(Sequence)]
pub struct Pfx<'a> {
  pub version: u32,
  pub auth_safe: ContentInfo<'a>,
  pub mac_data: Option<MacData<'a>>,
}

#[derive(Sequence)]
pub struct ContentInfo<'a> {
  pub content_type: ObjectIdentifier,
  #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
  pub content: Option<AnyRef<'a>>,
}

impl<'a> ContentInfo<'a> {
  /// The octets of a `data` content.
  pub fn data(&self) -> DecodeResult<&'a [u8]> {
    let content = self
      .content
      .ok_or_else(|| DecodeError::malformed("data content is missing"))?;
    Ok(content.decode_as::<OctetStringRef<'a>>()?.as_bytes())
  }
}

#[derive(Sequence)]
pub struct MacData<'a> {
  pub mac: DigestInfo<'a>,
  pub mac_salt: OctetStringRef<'a>,
  #[asn1(default = "one")]
  pub iterations: u32,
}

fn one() -> u32 {
  1
}

#[derive(Sequence)]
pub struct DigestInfo<'a> {
  pub algorithm: AlgorithmIdentifier<'a>,
  pub digest: OctetStringRef<'a>,
}

#[derive(Sequence, Clone, Copy)]
pub struct AlgorithmIdentifier<'a> {
  pub oid: ObjectIdentifier,
  pub parameters: Option<AnyRef<'a>>,
}

impl<'a> AlgorithmIdentifier<'a> {
  pub fn parameters_as<T: der::Choice<'a> + der::DecodeValue<'a>>(&self) -> DecodeResult<T> {
    let params = self
      .parameters
      .ok_or_else(|| DecodeError::malformed(format!("{} parameters are missing", self.oid)))?;
    Ok(params.decode_as::<T>()?)
  }
}

#[derive(Sequence)]
pub struct EncryptedData<'a> {
  pub version: u32,
  pub encrypted_content_info: EncryptedContentInfo<'a>,
}

#[derive(Sequence)]
pub struct EncryptedContentInfo<'a> {
  pub content_type: ObjectIdentifier,
  pub content_encryption_algorithm: AlgorithmIdentifier<'a>,
  /// `[0] IMPLICIT OCTET STRING`, kept raw: BER writers emit it constructed.
  pub encrypted_content: Option<AnyRef<'a>>,
}

impl<'a> EncryptedContentInfo<'a> {
  /// The ciphertext, joining the segments of a constructed encoding.
  pub fn ciphertext(&self) -> DecodeResult<Option<Cow<'a, [u8]>>> {
    let Some(content) = self.encrypted_content else {
      return Ok(None);
    };
    match content.tag() {
      Tag::ContextSpecific { constructed: false, number } if number.value() == 0 => {
        Ok(Some(Cow::Borrowed(content.value())))
      }
      Tag::ContextSpecific { constructed: true, number } if number.value() == 0 => {
        let mut reader = SliceReader::new(content.value())?;
        let mut joined = Vec::new();
        while !reader.is_finished() {
          joined.extend_from_slice(OctetStringRef::decode(&mut reader)?.as_bytes());
        }
        Ok(Some(Cow::Owned(joined)))
      }
      other => Err(DecodeError::malformed(format!("encryptedContent tag {other}"))),
    }
  }
}

#[derive(Sequence)]
pub struct SafeBag<'a> {
  pub bag_id: ObjectIdentifier,
  #[asn1(context_specific = "0", tag_mode = "EXPLICIT")]
  pub bag_value: AnyRef<'a>,
  pub bag_attributes: Option<AnyRef<'a>>,
}

#[derive(Sequence)]
pub struct CertBag<'a> {
  pub cert_id: ObjectIdentifier,
  #[asn1(context_specific = "0", tag_mode = "EXPLICIT")]
  pub cert_value: AnyRef<'a>,
}

#[derive(Sequence)]
pub struct EncryptedPrivateKeyInfo<'a> {
  pub encryption_algorithm: AlgorithmIdentifier<'a>,
  pub encrypted_data: OctetStringRef<'a>,
}

#[derive(Sequence)]
pub struct Pkcs12PbeParams<'a> {
  pub salt: OctetStringRef<'a>,
  pub iterations: u32,
}

#[derive(Sequence)]
pub struct Pbes2Params<'a> {
  pub key_derivation_func: AlgorithmIdentifier<'a>,
  pub encryption_scheme: AlgorithmIdentifier<'a>,
}

#[derive(Sequence)]
pub struct Pbkdf2Params<'a> {
  pub salt: OctetStringRef<'a>,
  pub iteration_count: u32,
  pub key_length: Option<u32>,
  pub prf: Option<AlgorithmIdentifier<'a>>,
}

#[derive(Sequence)]
struct Attribute<'a> {
  attr_type: ObjectIdentifier,
  attr_values: AnyRef<'a>,
}

/// PKCS#9 attributes the decoder cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BagAttributes {
  pub friendly_name: Option<String>,
  pub local_key_id: Option<Vec<u8>>,
}

impl BagAttributes {
  /// Parse a `SET OF Attribute`. Unknown attributes are ignored; only the
  /// first value of a multi-valued attribute is kept.
  ///
  /// SET OF ordering is not enforced since common writers emit it unsorted.
  pub fn parse(set: Option<AnyRef<'_>>) -> DecodeResult<Self> {
    let mut attrs = BagAttributes::default();
    let Some(set) = set else {
      return Ok(attrs);
    };
    if set.tag() != Tag::Set {
      return Err(DecodeError::malformed("bag attributes must be a SET"));
    }

    for attr in set_elements::<Attribute<'_>>(set.value())? {
      let Some(value) = set_elements::<AnyRef<'_>>(attr.attr_values.value())?.into_iter().next() else {
        continue;
      };
      match attr.attr_type {
        oids::FRIENDLY_NAME if attrs.friendly_name.is_none() => {
          attrs.friendly_name = Some(bmp_string(value)?);
        }
        oids::LOCAL_KEY_ID if attrs.local_key_id.is_none() => {
          attrs.local_key_id = Some(value.decode_as::<OctetStringRef<'_>>()?.as_bytes().to_vec());
        }
        _ => {}
      }
    }
    Ok(attrs)
  }
}

fn set_elements<'a, T: Decode<'a>>(contents: &'a [u8]) -> DecodeResult<Vec<T>> {
  let mut reader = SliceReader::new(contents)?;
  let mut out = Vec::new();
  while !reader.is_finished() {
    out.push(reader.decode::<T>()?);
  }
  Ok(out)
}

fn bmp_string(value: AnyRef<'_>) -> DecodeResult<String> {
  if value.tag() != Tag::BmpString {
    return Err(DecodeError::malformed(format!("friendlyName must be a BMPString, got {}", value.tag())));
  }
  let bytes = value.value();
  if bytes.len() % 2 != 0 {
    return Err(DecodeError::malformed("odd-length BMPString"));
  }
  let units = bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
  char::decode_utf16(units)
    .collect::<Result<String, _>>()
    .map_err(|_| DecodeError::malformed("friendlyName is not valid UTF-16"))
}
