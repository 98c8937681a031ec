use rand::{CryptoRng, RngCore};
use std::fmt;
use std::ops::{Deref, DerefMut};
use zeroize::Zeroizing;

/// A byte buffer that is guaranteed to be cleared before it is released.
///
/// This is a scoped wrapper, not an OS-level memory guard: every buffer that
/// ever holds key material, an IV, or a derived secret should live in one of
/// these rather than a plain `Vec<u8>`.
pub struct SecretBytes(Zeroizing<Vec<u8>>);

impl SecretBytes {
  pub fn with_capacity(capacity: usize) -> SecretBytes {
    SecretBytes(Zeroizing::new(Vec::with_capacity(capacity)))
  }

  pub fn zeroed(size: usize) -> SecretBytes {
    SecretBytes(Zeroizing::new(vec![0u8; size]))
  }

  pub fn random<T>(rng: &mut T, size: usize) -> SecretBytes
  where
    T: RngCore + CryptoRng,
  {
    let mut raw = vec![0u8; size];
    rng.fill_bytes(&mut raw);
    SecretBytes(Zeroizing::new(raw))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn borrow(&self) -> &[u8] {
    &self.0
  }

  pub fn borrow_mut(&mut self) -> &mut [u8] {
    &mut self.0
  }
}

impl Deref for SecretBytes {
  type Target = [u8];

  fn deref(&self) -> &[u8] {
    &self.0
  }
}

impl DerefMut for SecretBytes {
  fn deref_mut(&mut self) -> &mut [u8] {
    &mut self.0
  }
}

impl From<Vec<u8>> for SecretBytes {
  fn from(mut bytes: Vec<u8>) -> Self {
    let copy = bytes.clone();
    use zeroize::Zeroize;
    bytes.zeroize();
    SecretBytes(Zeroizing::new(copy))
  }
}

impl From<&[u8]> for SecretBytes {
  fn from(bytes: &[u8]) -> Self {
    SecretBytes(Zeroizing::new(bytes.to_vec()))
  }
}

impl PartialEq for SecretBytes {
  fn eq(&self, other: &Self) -> bool {
    self.0.as_slice() == other.0.as_slice()
  }
}

impl Eq for SecretBytes {}

impl Clone for SecretBytes {
  fn clone(&self) -> Self {
    SecretBytes(Zeroizing::new(self.0.to_vec()))
  }
}

impl fmt::Debug for SecretBytes {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<Secret>")
  }
}
