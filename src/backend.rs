use crate::error::DcryptResult;
use crate::keys::{KeyKind, Keypair, PrivateKey, PublicKey};
use crate::memguard::SecretBytes;
use std::sync::OnceLock;

/// KDF hash used when this crate writes a new v2 record. Records on disk may
/// name a different hash; it is honored on load regardless of this default.
pub const DCRYPT_DOVECOT_KEY_ENCRYPT_HASH: &str = "sha256";

/// KDF round count used when this crate writes a new v2 record.
pub const DCRYPT_DOVECOT_KEY_ENCRYPT_ROUNDS: u32 = 21000;

/// The set of operations that can be swapped for an alternative cryptographic
/// backend. Symmetric/HMAC/PBKDF2 primitives are not part of this table: this
/// crate only ever wires them to one toolkit, so they are exposed as plain
/// functions in [`crate::symmetric`], [`crate::hmac`], and [`crate::kdf`].
pub trait BackendApi: Send + Sync {
  fn name(&self) -> &'static str;

  fn generate_keypair(&self, kind: KeyKind, bits: u32, curve_name: &str) -> DcryptResult<Keypair>;

  fn ecdh_derive_secret_local(&self, local: &PrivateKey, peer_point_bytes: &[u8]) -> DcryptResult<SecretBytes>;

  fn ecdh_derive_secret_peer(&self, peer_public: &PublicKey) -> DcryptResult<(Vec<u8>, SecretBytes)>;

  fn rsa_encrypt(&self, public: &PublicKey, data: &[u8]) -> DcryptResult<Vec<u8>>;

  fn rsa_decrypt(&self, private: &PrivateKey, data: &[u8]) -> DcryptResult<SecretBytes>;
}

/// The stock backend, wiring [`BackendApi`] to the `openssl`-backed functions
/// in [`crate::keys`].
pub struct OpensslBackend;

impl BackendApi for OpensslBackend {
  fn name(&self) -> &'static str {
    "openssl"
  }

  fn generate_keypair(&self, kind: KeyKind, bits: u32, curve_name: &str) -> DcryptResult<Keypair> {
    crate::keys::generate_keypair(kind, bits, curve_name)
  }

  fn ecdh_derive_secret_local(&self, local: &PrivateKey, peer_point_bytes: &[u8]) -> DcryptResult<SecretBytes> {
    crate::keys::ecdh_derive_secret_local(local.as_ec()?, peer_point_bytes)
  }

  fn ecdh_derive_secret_peer(&self, peer_public: &PublicKey) -> DcryptResult<(Vec<u8>, SecretBytes)> {
    crate::keys::ecdh_derive_secret_peer(peer_public.as_ec()?)
  }

  fn rsa_encrypt(&self, public: &PublicKey, data: &[u8]) -> DcryptResult<Vec<u8>> {
    crate::keys::rsa_encrypt(public.as_rsa()?, data)
  }

  fn rsa_decrypt(&self, private: &PrivateKey, data: &[u8]) -> DcryptResult<SecretBytes> {
    crate::keys::rsa_decrypt(private.as_rsa()?, data)
  }
}

static BACKEND: OnceLock<Box<dyn BackendApi>> = OnceLock::new();

/// Install the process-wide backend. Must be called exactly once before any
/// call to [`get_backend`]; a second call is a programmer error and is
/// ignored rather than silently replacing the installed backend.
pub fn install_backend(backend: Box<dyn BackendApi>) {
  if BACKEND.set(backend).is_err() {
    log::warn!("install_backend called more than once; keeping the first installed backend");
  } else {
    log::info!("backend installed: {}", get_backend().name());
  }
}

/// Fetch the process-wide backend.
///
/// # Panics
/// Panics if [`install_backend`] has not yet been called. This can only
/// happen if a caller skips required setup, so a panic here is preferable to
/// a confusing downstream error.
pub fn get_backend() -> &'static dyn BackendApi {
  BACKEND
    .get()
    .unwrap_or_else(|| panic!("dcrypt backend used before install_backend() was called"))
    .as_ref()
}
