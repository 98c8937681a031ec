use crate::error::DcryptResult;
use data_encoding::HEXLOWER;
use openssl::hash::{hash, MessageDigest};

/// Legacy (v1) key identifier: SHA-256 over the ASCII hex text of the
/// compressed public point, not over the raw point bytes.
pub fn v1_identifier(compressed_point: &[u8]) -> DcryptResult<String> {
  let hex_text = HEXLOWER.encode(compressed_point);
  let digest = hash(MessageDigest::sha256(), hex_text.as_bytes())?;
  Ok(HEXLOWER.encode(&digest))
}

/// Current (v2) key identifier: SHA-256 over the DER SubjectPublicKeyInfo bytes.
pub fn v2_identifier(der_spki: &[u8]) -> DcryptResult<String> {
  let digest = hash(MessageDigest::sha256(), der_spki)?;
  Ok(HEXLOWER.encode(&digest))
}
