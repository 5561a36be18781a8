//! Key derivation, PBE decryption and MAC glue over openssl.
//! No primitive is implemented here; these are the PKCS#12 recipes that
//! combine them.

pub mod kdf;
pub mod mac;
pub mod pbe;
