use crate::error::{DcryptError, DcryptResult};
use crate::format::identifier::v1_identifier;
use crate::kdf::pbkdf2;
use crate::keys::{ec_key_from_scalar, ec_public_key_from_compressed, ecdh_derive_secret_local, PrivateKey, PublicKey};
use crate::symmetric::{Mode, SymmetricContext};
use data_encoding::HEXLOWER;
use openssl::bn::BigNum;
use openssl::hash::{hash, MessageDigest};
use openssl::nid::Nid;

const V1_AES_IV: [u8; 16] = [0u8; 16];
const V1_PBKDF2_ROUNDS: u32 = 16;

fn parse_nid(field: &str) -> DcryptResult<Nid> {
  let raw: i32 = field
    .parse()
    .map_err(|_| DcryptError::CorruptedData(format!("invalid curve NID field: {field}")))?;
  Ok(Nid::from_raw(raw))
}

fn aes256_ctr_zero_iv(mode: Mode, key: &[u8], data: &[u8]) -> DcryptResult<Vec<u8>> {
  let mut ctx = SymmetricContext::create("aes-256-ctr", mode)?;
  ctx.set_key(key);
  ctx.set_iv(&V1_AES_IV);
  ctx.init()?;

  let mut out = Vec::new();
  ctx.update(data, &mut out)?;
  ctx.finalize(&mut out)?;
  Ok(out)
}

/// Load a v1 public key record: `1 <NID> <hex compressed point>`.
pub fn load_v1_public(record: &str) -> DcryptResult<PublicKey> {
  let fields: Vec<&str> = record.split('\t').collect();
  if fields.len() != 3 || fields[0] != "1" {
    return Err(DcryptError::CorruptedData("not a v1 public key record".to_string()));
  }

  let nid = parse_nid(fields[1])?;
  let point = HEXLOWER.decode(fields[2].as_bytes())?;
  let ec = ec_public_key_from_compressed(nid, &point)?;
  Ok(PublicKey::Ec(ec))
}

/// Load a v1 private key record. `decryption_key` is required (and must be
/// EC) for enctype 1 (ECDH-wrapped) records; `password` is required for
/// enctype 2 (password-encrypted) records.
pub fn load_v1_private(
  record: &str,
  password: Option<&[u8]>,
  decryption_key: Option<&PrivateKey>,
) -> DcryptResult<PrivateKey> {
  let fields: Vec<&str> = record.split('\t').collect();
  if fields.is_empty() || fields[0] != "1" {
    return Err(DcryptError::CorruptedData("not a v1 private key record".to_string()));
  }

  let nid = parse_nid(fields[1])?;
  let enctype = fields
    .get(2)
    .ok_or_else(|| DcryptError::CorruptedData("v1 record missing enctype field".to_string()))?;

  let (scalar_bytes, trailing_id) = match *enctype {
    "0" => {
      if fields.len() != 5 {
        return Err(DcryptError::CorruptedData("v1 enctype 0 expects 5 fields".to_string()));
      }
      let scalar = HEXLOWER.decode(fields[3].as_bytes())?;
      (scalar, fields[4])
    }
    "2" => {
      if fields.len() != 6 {
        return Err(DcryptError::CorruptedData("v1 enctype 2 expects 6 fields".to_string()));
      }
      let password = password.ok_or_else(|| DcryptError::BackendError("password required".to_string()))?;
      let encrypted = HEXLOWER.decode(fields[3].as_bytes())?;
      let salt = HEXLOWER.decode(fields[4].as_bytes())?;

      let key = pbkdf2(password, &salt, "sha1", V1_PBKDF2_ROUNDS, 32)?;
      let scalar = aes256_ctr_zero_iv(Mode::Decrypt, key.borrow(), &encrypted)?;
      (scalar, fields[5])
    }
    "1" => {
      if fields.len() != 7 {
        return Err(DcryptError::CorruptedData("v1 enctype 1 expects 7 fields".to_string()));
      }
      let decryption_key = decryption_key.ok_or_else(|| DcryptError::BackendError("decryption key required".to_string()))?;
      let decryption_ec = decryption_key.as_ec()?;

      let encrypted = HEXLOWER.decode(fields[3].as_bytes())?;
      let ephemeral_point = HEXLOWER.decode(fields[4].as_bytes())?;

      let shared = ecdh_derive_secret_local(decryption_ec, &ephemeral_point)?;
      let key = hash(MessageDigest::sha256(), shared.borrow())?;
      let scalar = aes256_ctr_zero_iv(Mode::Decrypt, &key, &encrypted)?;
      (scalar, fields[6])
    }
    other => return Err(DcryptError::CorruptedData(format!("unknown v1 enctype: {other}"))),
  };

  let scalar = BigNum::from_slice(&scalar_bytes)?;
  let ec = ec_key_from_scalar(nid, &scalar)?;
  let private = PrivateKey::Ec(ec);

  let public = private.public_key()?;
  let computed_id = v1_identifier(&public.ec_compressed_point()?)?;
  if computed_id != trailing_id {
    return Err(DcryptError::KeyIdMismatch);
  }

  Ok(private)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::keys::{generate_keypair, KeyKind};
  use data_encoding::HEXLOWER;

  fn build_unencrypted_record(ec: &openssl::ec::EcKey<openssl::pkey::Private>) -> String {
    let nid = ec.group().curve_name().unwrap();
    let scalar_hex = HEXLOWER.encode(&ec.private_key().to_vec());
    let public = crate::keys::PublicKey::Ec(
      openssl::ec::EcKey::from_public_key(ec.group(), ec.public_key()).unwrap(),
    );
    let id = v1_identifier(&public.ec_compressed_point().unwrap()).unwrap();
    format!("1\t{}\t0\t{}\t{}", nid.as_raw(), scalar_hex, id)
  }

  #[test]
  fn unencrypted_roundtrips() {
    let pair = generate_keypair(KeyKind::Ec, 0, "prime256v1").unwrap();
    let ec = pair.private.as_ec().unwrap();
    let record = build_unencrypted_record(ec);

    let loaded = load_v1_private(&record, None, None).unwrap();
    let loaded_ec = loaded.as_ec().unwrap();
    assert_eq!(loaded_ec.private_key().to_vec(), ec.private_key().to_vec());
  }

  #[test]
  fn unencrypted_public_roundtrips() {
    let pair = generate_keypair(KeyKind::Ec, 0, "secp384r1").unwrap();
    let point = pair.public.ec_compressed_point().unwrap();
    let nid = pair.public.as_ec().unwrap().group().curve_name().unwrap();
    let record = format!("1\t{}\t{}", nid.as_raw(), HEXLOWER.encode(&point));

    let loaded = load_v1_public(&record).unwrap();
    assert_eq!(loaded.ec_compressed_point().unwrap(), point);
  }

  #[test]
  fn tampered_identifier_rejected() {
    let pair = generate_keypair(KeyKind::Ec, 0, "prime256v1").unwrap();
    let ec = pair.private.as_ec().unwrap();
    let mut record = build_unencrypted_record(ec);
    record.push('0');

    assert!(matches!(load_v1_private(&record, None, None), Err(DcryptError::KeyIdMismatch)));
  }
}
