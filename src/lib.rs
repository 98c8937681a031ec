#[macro_use]
pub mod macros;

#[macro_use]
#[cfg(test)]
extern crate hex_literal;

pub mod backend;
pub mod error;
pub mod format;
pub mod hmac;
pub mod kdf;
pub mod keys;
pub mod memguard;
pub(crate) mod mpi;
pub mod symmetric;

pub use error::{DcryptError, DcryptResult};
