// crates/engine/src/adapters/mod.rs

pub mod pkcs12;
pub mod x509;
