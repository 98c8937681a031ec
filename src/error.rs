use thiserror::Error;

/// Every fallible operation in this crate returns exactly one of these.
#[derive(Debug, Error)]
pub enum DcryptError {
  #[error("invalid or unknown cipher/hash name: {0}")]
  InvalidCipher(String),
  #[error("unknown algorithm OID: {0}")]
  UnknownAlgorithm(String),
  #[error("unknown curve: {0}")]
  UnknownCurve(String),
  #[error("corrupted key data: {0}")]
  CorruptedData(String),
  #[error("key identifier mismatch")]
  KeyIdMismatch,
  #[error("wrong decryption key supplied")]
  WrongDecryptionKey,
  #[error("AEAD authentication failed")]
  AuthenticationFailed,
  #[error("reconstructed key failed validation")]
  InvalidKey,
  #[error("backend error: {0}")]
  BackendError(String),
  #[error("unsupported operation: {0}")]
  UnsupportedOperation(String),
}

pub type DcryptResult<T> = Result<T, DcryptError>;

error_convert_from!(openssl::error::ErrorStack, DcryptError, BackendError(display));
error_convert_from!(std::num::ParseIntError, DcryptError, CorruptedData(display));
error_convert_from!(data_encoding::DecodeError, DcryptError, CorruptedData(display));
