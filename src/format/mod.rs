mod identifier;
mod inspector;
mod v1;
mod v2;

pub use identifier::{v1_identifier, v2_identifier};
pub use inspector::{inspect, EncryptionType, KeyFormat, KeyInspection, KeyKindClass};
pub use v1::{load_v1_private, load_v1_public};
pub use v2::{load_v2_private, load_v2_public, store_private_key_v2, store_v2_public, Protection};

use crate::error::{DcryptError, DcryptResult};
use crate::keys::PublicKey;

/// Load a public key in either textual form, selected by its leading version field.
pub fn load_public_key(record: &str) -> DcryptResult<PublicKey> {
  match record.split('\t').next() {
    Some("1") => load_v1_public(record),
    Some("2") => load_v2_public(record),
    _ => Err(DcryptError::CorruptedData("unrecognized public key record".to_string())),
  }
}
