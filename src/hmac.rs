use crate::error::{DcryptError, DcryptResult};
use crate::memguard::SecretBytes;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Signer;
use rand::{CryptoRng, RngCore};

fn digest_by_name(name: &str) -> Option<MessageDigest> {
  match name {
    "sha1" => Some(MessageDigest::sha1()),
    "sha256" => Some(MessageDigest::sha256()),
    "sha384" => Some(MessageDigest::sha384()),
    "sha512" => Some(MessageDigest::sha512()),
    _ => None,
  }
}

/// HMAC context with the same init/update/final lifecycle as `SymmetricContext`.
///
/// Input is buffered between `init` and `finalize` rather than streamed
/// through a live OpenSSL `Signer`, since a `Signer` borrows its `PKey` and
/// the two can't be stored side by side in a self-referential struct. The
/// externally observable behaviour is identical.
pub struct HmacContext {
  digest: MessageDigest,
  key: Option<SecretBytes>,
  buffer: Option<Vec<u8>>,
}

impl HmacContext {
  pub fn create(hash_name: &str) -> DcryptResult<Self> {
    let digest = digest_by_name(hash_name).ok_or_else(|| DcryptError::InvalidCipher(hash_name.to_string()))?;

    Ok(HmacContext {
      digest,
      key: None,
      buffer: None,
    })
  }

  pub fn set_key(&mut self, bytes: &[u8]) {
    self.key = Some(SecretBytes::from(bytes.to_vec()));
  }

  pub fn set_key_random<R: RngCore + CryptoRng>(&mut self, rng: &mut R) {
    self.key = Some(SecretBytes::random(rng, self.digest.block_size()));
  }

  pub fn get_digest_length(&self) -> usize {
    self.digest.size()
  }

  pub fn init(&mut self) -> DcryptResult<()> {
    if self.key.is_none() {
      return Err(DcryptError::BackendError("key not set".to_string()));
    }
    self.buffer = Some(Vec::new());
    Ok(())
  }

  pub fn update(&mut self, input: &[u8]) -> DcryptResult<()> {
    let buffer = self
      .buffer
      .as_mut()
      .ok_or_else(|| DcryptError::BackendError("context not initialized".to_string()))?;
    buffer.extend_from_slice(input);
    Ok(())
  }

  pub fn finalize(&mut self, out: &mut Vec<u8>) -> DcryptResult<()> {
    let buffer = self
      .buffer
      .take()
      .ok_or_else(|| DcryptError::BackendError("context not initialized".to_string()))?;
    let key = self
      .key
      .as_ref()
      .ok_or_else(|| DcryptError::BackendError("key not set".to_string()))?;

    let pkey = PKey::hmac(key.borrow())?;
    let mut signer = Signer::new(self.digest, &pkey)?;
    signer.update(&buffer)?;
    let digest = signer.sign_to_vec()?;

    out.extend_from_slice(&digest);
    Ok(())
  }

  pub fn destroy(&mut self) {
    self.buffer = None;
    self.key = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn equal_keys_and_inputs_agree() {
    let mut a = HmacContext::create("sha256").unwrap();
    a.set_key(b"key material");
    a.init().unwrap();
    a.update(b"message one").unwrap();
    a.update(b"message two").unwrap();
    let mut digest_a = Vec::new();
    a.finalize(&mut digest_a).unwrap();

    let mut b = HmacContext::create("sha256").unwrap();
    b.set_key(b"key material");
    b.init().unwrap();
    b.update(b"message onemessage two").unwrap();
    let mut digest_b = Vec::new();
    b.finalize(&mut digest_b).unwrap();

    assert_eq!(digest_a, digest_b);
    assert_eq!(digest_a.len(), 32);
  }

  #[test]
  fn unknown_hash_rejected() {
    assert!(matches!(HmacContext::create("md5"), Err(DcryptError::InvalidCipher(_))));
  }
}
