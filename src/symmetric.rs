use crate::error::{DcryptError, DcryptResult};
use crate::memguard::SecretBytes;
use openssl::symm::{Cipher, Crypter, Mode as OsslMode};
use rand::{CryptoRng, RngCore};

const GCM_TAG_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Encrypt,
  Decrypt,
}

fn cipher_by_name(name: &str) -> Option<Cipher> {
  match name {
    "aes-128-cbc" => Some(Cipher::aes_128_cbc()),
    "aes-256-cbc" => Some(Cipher::aes_256_cbc()),
    "aes-128-ctr" => Some(Cipher::aes_128_ctr()),
    "aes-256-ctr" => Some(Cipher::aes_256_ctr()),
    "aes-128-gcm" => Some(Cipher::aes_128_gcm()),
    "aes-256-gcm" => Some(Cipher::aes_256_gcm()),
    _ => None,
  }
}

fn is_gcm(name: &str) -> bool {
  name.ends_with("-gcm")
}

/// Streaming symmetric cipher context.
///
/// Mirrors the init/update/final lifecycle of the underlying toolkit: key and
/// IV must be set before `init`, `update` may be called any number of times,
/// and `finalize` both flushes the last block and (for AEAD ciphers) produces
/// or checks the authentication tag.
pub struct SymmetricContext {
  name: String,
  cipher: Cipher,
  mode: Mode,
  key: Option<SecretBytes>,
  iv: Option<SecretBytes>,
  aad: Option<Vec<u8>>,
  tag: Option<Vec<u8>>,
  padding: bool,
  crypter: Option<Crypter>,
}

impl SymmetricContext {
  pub fn create(algorithm: &str, mode: Mode) -> DcryptResult<Self> {
    let cipher = cipher_by_name(algorithm).ok_or_else(|| DcryptError::InvalidCipher(algorithm.to_string()))?;

    Ok(SymmetricContext {
      name: algorithm.to_string(),
      cipher,
      mode,
      key: None,
      iv: None,
      aad: None,
      tag: None,
      padding: true,
      crypter: None,
    })
  }

  pub fn set_key(&mut self, bytes: &[u8]) {
    let len = self.cipher.key_len();
    let mut truncated = bytes.to_vec();
    truncated.resize(len, 0);
    self.key = Some(SecretBytes::from(truncated));
  }

  pub fn set_iv(&mut self, bytes: &[u8]) {
    let len = self.cipher.iv_len().unwrap_or(0);
    let mut truncated = bytes.to_vec();
    truncated.resize(len, 0);
    self.iv = Some(SecretBytes::from(truncated));
  }

  pub fn set_key_iv_random<R: RngCore + CryptoRng>(&mut self, rng: &mut R) {
    self.key = Some(SecretBytes::random(rng, self.cipher.key_len()));
    self.iv = Some(SecretBytes::random(rng, self.cipher.iv_len().unwrap_or(0)));
  }

  pub fn set_padding(&mut self, padding: bool) {
    self.padding = padding;
  }

  pub fn set_aad(&mut self, aad: Vec<u8>) {
    self.aad = Some(aad);
  }

  pub fn set_tag(&mut self, tag: Vec<u8>) {
    self.tag = Some(tag);
  }

  pub fn get_key(&self) -> Option<&[u8]> {
    self.key.as_ref().map(|k| k.borrow())
  }

  pub fn get_iv(&self) -> Option<&[u8]> {
    self.iv.as_ref().map(|k| k.borrow())
  }

  pub fn get_aad(&self) -> Option<&[u8]> {
    self.aad.as_deref()
  }

  pub fn get_tag(&self) -> Option<&[u8]> {
    self.tag.as_deref()
  }

  pub fn get_key_length(&self) -> usize {
    self.cipher.key_len()
  }

  pub fn get_iv_length(&self) -> usize {
    self.cipher.iv_len().unwrap_or(0)
  }

  pub fn get_block_size(&self) -> usize {
    self.cipher.block_size()
  }

  pub fn init(&mut self) -> DcryptResult<()> {
    let key = self
      .key
      .as_ref()
      .ok_or_else(|| DcryptError::BackendError("key not set".to_string()))?;
    let iv = self.iv.as_ref();

    let ossl_mode = match self.mode {
      Mode::Encrypt => OsslMode::Encrypt,
      Mode::Decrypt => OsslMode::Decrypt,
    };

    let mut crypter = Crypter::new(
      self.cipher,
      ossl_mode,
      key.borrow(),
      iv.map(|iv| iv.borrow()),
    )?;
    crypter.pad(self.padding);

    if is_gcm(&self.name) {
      if let Some(aad) = &self.aad {
        crypter.aad_update(aad)?;
      }
      if self.mode == Mode::Decrypt {
        if let Some(tag) = &self.tag {
          crypter.set_tag(tag)?;
        }
      }
    }

    self.crypter = Some(crypter);
    Ok(())
  }

  pub fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> DcryptResult<()> {
    let crypter = self
      .crypter
      .as_mut()
      .ok_or_else(|| DcryptError::BackendError("context not initialized".to_string()))?;

    let start = out.len();
    out.resize(start + input.len() + self.cipher.block_size(), 0);
    let written = match crypter.update(input, &mut out[start..]) {
      Ok(written) => written,
      Err(e) => {
        out.truncate(start);
        return Err(e.into());
      }
    };
    out.truncate(start + written);
    Ok(())
  }

  pub fn finalize(&mut self, out: &mut Vec<u8>) -> DcryptResult<()> {
    let gcm = is_gcm(&self.name);
    let mode = self.mode;
    let crypter = self
      .crypter
      .as_mut()
      .ok_or_else(|| DcryptError::BackendError("context not initialized".to_string()))?;

    let start = out.len();
    out.resize(start + self.cipher.block_size(), 0);
    let written = match crypter.finalize(&mut out[start..]) {
      Ok(written) => written,
      Err(_) if gcm && mode == Mode::Decrypt => {
        out.truncate(start);
        return Err(DcryptError::AuthenticationFailed);
      }
      Err(e) => {
        out.truncate(start);
        return Err(e.into());
      }
    };
    out.truncate(start + written);

    if gcm && mode == Mode::Encrypt {
      let mut tag = vec![0u8; GCM_TAG_LEN];
      crypter.get_tag(&mut tag)?;
      self.tag = Some(tag);
    }

    self.crypter = None;
    Ok(())
  }

  pub fn destroy(&mut self) {
    self.crypter = None;
    self.key = None;
    self.iv = None;
    self.aad = None;
    self.tag = None;
  }
}
