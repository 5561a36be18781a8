// adapters/x509/mod.rs - openssl-backed trust evaluation

mod system_store;
mod walker;
#[cfg(feature = "async")]
mod background;

pub use system_store::*;
pub use walker::*;
#[cfg(feature = "async")]
pub use background::*;
