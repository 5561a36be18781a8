// adapters/pkcs12/oids.rs

use der::asn1::ObjectIdentifier as Oid;
use openssl::hash::MessageDigest;

use crate::crypto::pbe::{Pbes2Cipher, Pkcs12Cipher};

// PKCS#7 content types
pub const DATA: Oid = Oid::new_unwrap("1.2.840.113549.1.7.1");
pub const SIGNED_DATA: Oid = Oid::new_unwrap("1.2.840.113549.1.7.2");
pub const ENCRYPTED_DATA: Oid = Oid::new_unwrap("1.2.840.113549.1.7.6");

// Safe bag types
pub const KEY_BAG: Oid = Oid::new_unwrap("1.2.840.113549.1.12.10.1.1");
pub const SHROUDED_KEY_BAG: Oid = Oid::new_unwrap("1.2.840.113549.1.12.10.1.2");
pub const CERT_BAG: Oid = Oid::new_unwrap("1.2.840.113549.1.12.10.1.3");
pub const CRL_BAG: Oid = Oid::new_unwrap("1.2.840.113549.1.12.10.1.4");
pub const SECRET_BAG: Oid = Oid::new_unwrap("1.2.840.113549.1.12.10.1.5");
pub const SAFE_CONTENTS_BAG: Oid = Oid::new_unwrap("1.2.840.113549.1.12.10.1.6");

// PKCS#9 attributes and cert types
pub const FRIENDLY_NAME: Oid = Oid::new_unwrap("1.2.840.113549.1.9.20");
pub const LOCAL_KEY_ID: Oid = Oid::new_unwrap("1.2.840.113549.1.9.21");
pub const X509_CERTIFICATE: Oid = Oid::new_unwrap("1.2.840.113549.1.9.22.1");

// Password-based encryption
pub const PBE_SHA1_RC4_128: Oid = Oid::new_unwrap("1.2.840.113549.1.12.1.1");
pub const PBE_SHA1_RC4_40: Oid = Oid::new_unwrap("1.2.840.113549.1.12.1.2");
pub const PBE_SHA1_3DES_3KEY: Oid = Oid::new_unwrap("1.2.840.113549.1.12.1.3");
pub const PBE_SHA1_3DES_2KEY: Oid = Oid::new_unwrap("1.2.840.113549.1.12.1.4");
pub const PBE_SHA1_RC2_128: Oid = Oid::new_unwrap("1.2.840.113549.1.12.1.5");
pub const PBE_SHA1_RC2_40: Oid = Oid::new_unwrap("1.2.840.113549.1.12.1.6");
pub const PBES2: Oid = Oid::new_unwrap("1.2.840.113549.1.5.13");
pub const PBKDF2: Oid = Oid::new_unwrap("1.2.840.113549.1.5.12");

pub const AES_128_CBC: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.1.2");
pub const AES_192_CBC: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.1.22");
pub const AES_256_CBC: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.1.42");
pub const DES_EDE3_CBC: Oid = Oid::new_unwrap("1.2.840.113549.3.7");

// Digests (MAC) and HMAC PRFs (PBKDF2)
pub const SHA1: Oid = Oid::new_unwrap("1.3.14.3.2.26");
pub const SHA224: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.2.4");
pub const SHA256: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.2.1");
pub const SHA384: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.2.2");
pub const SHA512: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.2.3");
pub const HMAC_SHA1: Oid = Oid::new_unwrap("1.2.840.113549.2.7");
pub const HMAC_SHA224: Oid = Oid::new_unwrap("1.2.840.113549.2.8");
pub const HMAC_SHA256: Oid = Oid::new_unwrap("1.2.840.113549.2.9");
pub const HMAC_SHA384: Oid = Oid::new_unwrap("1.2.840.113549.2.10");
pub const HMAC_SHA512: Oid = Oid::new_unwrap("1.2.840.113549.2.11");

pub fn digest(oid: &Oid) -> Option<MessageDigest> {
  match *oid {
    SHA1 => Some(MessageDigest::sha1()),
    SHA224 => Some(MessageDigest::sha224()),
    SHA256 => Some(MessageDigest::sha256()),
    SHA384 => Some(MessageDigest::sha384()),
    SHA512 => Some(MessageDigest::sha512()),
    _ => None,
  }
}

pub fn hmac_prf(oid: &Oid) -> Option<MessageDigest> {
  match *oid {
    HMAC_SHA1 => Some(MessageDigest::sha1()),
    HMAC_SHA224 => Some(MessageDigest::sha224()),
    HMAC_SHA256 => Some(MessageDigest::sha256()),
    HMAC_SHA384 => Some(MessageDigest::sha384()),
    HMAC_SHA512 => Some(MessageDigest::sha512()),
    _ => None,
  }
}

pub fn pkcs12_cipher(oid: &Oid) -> Option<Pkcs12Cipher> {
  match *oid {
    PBE_SHA1_RC4_128 => Some(Pkcs12Cipher::Rc4_128),
    PBE_SHA1_RC4_40 => Some(Pkcs12Cipher::Rc4_40),
    PBE_SHA1_3DES_3KEY => Some(Pkcs12Cipher::TripleDes3Key),
    PBE_SHA1_3DES_2KEY => Some(Pkcs12Cipher::TripleDes2Key),
    PBE_SHA1_RC2_128 => Some(Pkcs12Cipher::Rc2_128),
    PBE_SHA1_RC2_40 => Some(Pkcs12Cipher::Rc2_40),
    _ => None,
  }
}

pub fn pbes2_cipher(oid: &Oid) -> Option<Pbes2Cipher> {
  match *oid {
    AES_128_CBC => Some(Pbes2Cipher::Aes128Cbc),
    AES_192_CBC => Some(Pbes2Cipher::Aes192Cbc),
    AES_256_CBC => Some(Pbes2Cipher::Aes256Cbc),
    DES_EDE3_CBC => Some(Pbes2Cipher::DesEde3Cbc),
    _ => None,
  }
}
