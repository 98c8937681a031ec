use crate::error::{DcryptError, DcryptResult};
use openssl::bn::{BigNum, BigNumRef};

/// Encode a (non-negative) big number using the classic 4-byte-length-prefixed
/// MPI encoding: a big-endian `u32` length followed by the big-endian magnitude,
/// with a leading zero byte inserted whenever the high bit of the magnitude
/// would otherwise read as a sign bit.
pub fn mpi_encode(bn: &BigNumRef) -> Vec<u8> {
  let mut magnitude = bn.to_vec();
  if magnitude.is_empty() {
    magnitude.push(0);
  }
  if magnitude[0] & 0x80 != 0 {
    magnitude.insert(0, 0);
  }

  let mut out = Vec::with_capacity(4 + magnitude.len());
  out.extend_from_slice(&(magnitude.len() as u32).to_be_bytes());
  out.extend_from_slice(&magnitude);
  out
}

pub fn mpi_decode(data: &[u8]) -> DcryptResult<BigNum> {
  if data.len() < 4 {
    return Err(DcryptError::CorruptedData("mpi value too short".to_string()));
  }
  let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
  let body = data
    .get(4..4 + len)
    .ok_or_else(|| DcryptError::CorruptedData("mpi length does not match available data".to_string()))?;

  Ok(BigNum::from_slice(body)?)
}
