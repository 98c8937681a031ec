use crate::error::{DcryptError, DcryptResult};
use crate::memguard::SecretBytes;
use openssl::hash::MessageDigest;
use openssl::pkcs5::pbkdf2_hmac;

fn digest_by_name(name: &str) -> Option<MessageDigest> {
  match name {
    "sha1" => Some(MessageDigest::sha1()),
    "sha256" => Some(MessageDigest::sha256()),
    "sha384" => Some(MessageDigest::sha384()),
    "sha512" => Some(MessageDigest::sha512()),
    _ => None,
  }
}

/// PBKDF2-HMAC-<hash> key derivation.
pub fn pbkdf2(password: &[u8], salt: &[u8], hash_name: &str, rounds: u32, out_len: usize) -> DcryptResult<SecretBytes> {
  if rounds == 0 {
    return Err(DcryptError::BackendError("pbkdf2 rounds must be > 0".to_string()));
  }
  if out_len == 0 {
    return Err(DcryptError::BackendError("pbkdf2 output length must be > 0".to_string()));
  }
  let digest = digest_by_name(hash_name).ok_or_else(|| DcryptError::InvalidCipher(hash_name.to_string()))?;

  let mut out = vec![0u8; out_len];
  pbkdf2_hmac(password, salt, rounds as usize, digest, &mut out)?;

  Ok(SecretBytes::from(out))
}
