use crate::backend::{DCRYPT_DOVECOT_KEY_ENCRYPT_HASH, DCRYPT_DOVECOT_KEY_ENCRYPT_ROUNDS};
use crate::error::{DcryptError, DcryptResult};
use crate::format::identifier::v2_identifier;
use crate::kdf::pbkdf2;
use crate::keys::{
  curve_nid_by_oid, curve_oid_by_nid, ec_key_from_scalar, ecdh_derive_secret_local, ecdh_derive_secret_peer,
  rsa_decrypt, rsa_encrypt, validate_private_key, PrivateKey, PublicKey, RSA_OID,
};
use crate::memguard::SecretBytes;
use crate::mpi::{mpi_decode, mpi_encode};
use crate::symmetric::{Mode, SymmetricContext};
use data_encoding::HEXLOWER;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use rand::RngCore;

const GCM_TAG_LEN: usize = 16;

enum ResolvedAlgo {
  Rsa,
  Ec(Nid),
}

fn resolve_oid(oid: &str) -> DcryptResult<ResolvedAlgo> {
  if oid == RSA_OID {
    return Ok(ResolvedAlgo::Rsa);
  }
  curve_nid_by_oid(oid)
    .map(ResolvedAlgo::Ec)
    .ok_or_else(|| DcryptError::UnknownAlgorithm(oid.to_string()))
}

fn oid_for_key(key: &PrivateKey) -> DcryptResult<String> {
  match key {
    PrivateKey::Rsa(_) => Ok(RSA_OID.to_string()),
    PrivateKey::Ec(ec) => {
      let nid = ec
        .group()
        .curve_name()
        .ok_or_else(|| DcryptError::UnknownCurve("EC key has no curve NID".to_string()))?;
      Ok(curve_oid_by_nid(nid)?.to_string())
    }
  }
}

fn encode_private_material(key: &PrivateKey) -> DcryptResult<Vec<u8>> {
  match key {
    PrivateKey::Rsa(rsa) => Ok(rsa.private_key_to_der()?),
    PrivateKey::Ec(ec) => Ok(mpi_encode(ec.private_key())),
  }
}

fn decode_private_material(algo: &ResolvedAlgo, bytes: &[u8]) -> DcryptResult<PrivateKey> {
  let key = match algo {
    ResolvedAlgo::Rsa => PrivateKey::Rsa(Rsa::private_key_from_der(bytes)?),
    ResolvedAlgo::Ec(nid) => {
      let scalar = mpi_decode(bytes)?;
      PrivateKey::Ec(ec_key_from_scalar(*nid, &scalar)?)
    }
  };
  validate_private_key(&key)?;
  Ok(key)
}

fn kdf_key_iv(probe: &SymmetricContext, secret: &[u8], salt: &[u8], kdf_hash: &str, rounds: u32) -> DcryptResult<SecretBytes> {
  let key_len = probe.get_key_length();
  let iv_len = probe.get_iv_length();
  pbkdf2(secret, salt, kdf_hash, rounds, key_len + iv_len)
}

fn encrypt_private_material(
  cipher_name: &str,
  secret: &[u8],
  salt: &[u8],
  kdf_hash: &str,
  rounds: u32,
  plaintext: &[u8],
) -> DcryptResult<String> {
  let mut ctx = SymmetricContext::create(cipher_name, Mode::Encrypt)?;
  let kdf_out = kdf_key_iv(&ctx, secret, salt, kdf_hash, rounds)?;
  let key_len = ctx.get_key_length();
  let (key, iv) = kdf_out.borrow().split_at(key_len);
  ctx.set_key(key);
  ctx.set_iv(iv);
  ctx.init()?;

  let mut out = Vec::new();
  ctx.update(plaintext, &mut out)?;
  ctx.finalize(&mut out)?;

  if cipher_name.ends_with("-gcm") {
    if let Some(tag) = ctx.get_tag() {
      out.extend_from_slice(tag);
    }
  }

  Ok(HEXLOWER.encode(&out))
}

fn decrypt_private_material(
  cipher_name: &str,
  secret: &[u8],
  salt: &[u8],
  kdf_hash: &str,
  rounds: u32,
  ciphertext: &[u8],
) -> DcryptResult<Vec<u8>> {
  let mut ctx = SymmetricContext::create(cipher_name, Mode::Decrypt)?;
  let kdf_out = kdf_key_iv(&ctx, secret, salt, kdf_hash, rounds)?;
  let key_len = ctx.get_key_length();
  let (key, iv) = kdf_out.borrow().split_at(key_len);
  ctx.set_key(key);
  ctx.set_iv(iv);

  let (body, tag) = if cipher_name.ends_with("-gcm") {
    if ciphertext.len() < GCM_TAG_LEN {
      return Err(DcryptError::CorruptedData("gcm ciphertext shorter than tag".to_string()));
    }
    let split = ciphertext.len() - GCM_TAG_LEN;
    (&ciphertext[..split], Some(ciphertext[split..].to_vec()))
  } else {
    (ciphertext, None)
  };
  if let Some(tag) = tag {
    ctx.set_tag(tag);
  }
  ctx.init()?;

  let mut out = Vec::new();
  ctx.update(body, &mut out)?;
  ctx.finalize(&mut out)?;
  Ok(out)
}

fn parse_rounds(field: &str) -> DcryptResult<u32> {
  field
    .parse()
    .map_err(|_| DcryptError::CorruptedData(format!("invalid rounds field: {field}")))
}

pub fn load_v2_public(record: &str) -> DcryptResult<PublicKey> {
  let fields: Vec<&str> = record.split('\t').collect();
  if fields.len() != 2 || fields[0] != "2" {
    return Err(DcryptError::CorruptedData("not a v2 public key record".to_string()));
  }

  let der = HEXLOWER.decode(fields[1].as_bytes())?;
  let pkey = PKey::public_key_from_der(&der)?;

  if let Ok(rsa) = pkey.rsa() {
    Ok(PublicKey::Rsa(rsa))
  } else if let Ok(ec) = pkey.ec_key() {
    Ok(PublicKey::Ec(ec))
  } else {
    Err(DcryptError::UnsupportedOperation("unrecognized SubjectPublicKeyInfo".to_string()))
  }
}

pub fn store_v2_public(key: &PublicKey) -> DcryptResult<String> {
  let der = key.to_der_spki()?;
  Ok(format!("2\t{}", HEXLOWER.encode(&der)))
}

pub fn load_v2_private(
  record: &str,
  password: Option<&[u8]>,
  decryption_key: Option<&PrivateKey>,
) -> DcryptResult<PrivateKey> {
  let fields: Vec<&str> = record.split('\t').collect();
  if fields.len() < 3 || fields[0] != "2" {
    return Err(DcryptError::CorruptedData("not a v2 private key record".to_string()));
  }

  let algo = resolve_oid(fields[1])?;
  let enctype = fields[2];

  let (material, trailing_id) = match enctype {
    "0" => {
      if fields.len() != 5 {
        return Err(DcryptError::CorruptedData("v2 enctype 0 expects 5 fields".to_string()));
      }
      (HEXLOWER.decode(fields[3].as_bytes())?, fields[4])
    }
    "2" => {
      if fields.len() != 9 {
        return Err(DcryptError::CorruptedData("v2 enctype 2 expects 9 fields".to_string()));
      }
      let password = password.ok_or_else(|| DcryptError::BackendError("password required".to_string()))?;
      let cipher = fields[3];
      let salt = HEXLOWER.decode(fields[4].as_bytes())?;
      let kdf_hash = fields[5];
      let rounds = parse_rounds(fields[6])?;
      let ciphertext = HEXLOWER.decode(fields[7].as_bytes())?;

      let plain = decrypt_private_material(cipher, password, &salt, kdf_hash, rounds, &ciphertext)?;
      (plain, fields[8])
    }
    "1" => {
      if fields.len() != 11 {
        return Err(DcryptError::CorruptedData("v2 enctype 1 expects 11 fields".to_string()));
      }
      let decryption_key = decryption_key.ok_or_else(|| DcryptError::BackendError("decryption key required".to_string()))?;
      let cipher = fields[3];
      let salt = HEXLOWER.decode(fields[4].as_bytes())?;
      let kdf_hash = fields[5];
      let rounds = parse_rounds(fields[6])?;
      let ciphertext = HEXLOWER.decode(fields[7].as_bytes())?;
      let peer_material = HEXLOWER.decode(fields[8].as_bytes())?;
      let enc_key_id = fields[9];

      let wrapping_public = decryption_key.public_key()?;
      let computed_enc_id = v2_identifier(&wrapping_public.to_der_spki()?)?;
      if computed_enc_id != enc_key_id {
        return Err(DcryptError::WrongDecryptionKey);
      }

      let secret = match decryption_key {
        PrivateKey::Rsa(rsa) => rsa_decrypt(rsa, &peer_material)?,
        PrivateKey::Ec(ec) => ecdh_derive_secret_local(ec, &peer_material)?,
      };

      let plain = decrypt_private_material(cipher, secret.borrow(), &salt, kdf_hash, rounds, &ciphertext)?;
      (plain, fields[10])
    }
    other => return Err(DcryptError::CorruptedData(format!("unknown v2 enctype: {other}"))),
  };

  let key = decode_private_material(&algo, &material)?;
  let public = key.public_key()?;
  let computed_id = v2_identifier(&public.to_der_spki()?)?;
  if computed_id != trailing_id {
    return Err(DcryptError::KeyIdMismatch);
  }

  Ok(key)
}

/// How a stored private key's material is protected.
pub enum Protection<'a> {
  None,
  Password(&'a [u8]),
  Recipient(&'a PublicKey),
}

fn random_salt(len: usize) -> Vec<u8> {
  let mut salt = vec![0u8; len];
  rand::thread_rng().fill_bytes(&mut salt);
  salt
}

/// Serialize a private key in v2 form. `cipher` names the symmetric cipher
/// used to protect the material; a leading `ecdh-` prefix is required (and
/// consumed) for `Protection::Recipient`, and rejected for
/// `Protection::Password`.
pub fn store_private_key_v2(key: &PrivateKey, protection: Protection, cipher: &str) -> DcryptResult<String> {
  let oid = oid_for_key(key)?;
  let material = encode_private_material(key)?;
  let own_id = v2_identifier(&key.public_key()?.to_der_spki()?)?;

  match protection {
    Protection::None => Ok(format!("2\t{oid}\t0\t{}\t{own_id}", HEXLOWER.encode(&material))),
    Protection::Password(password) => {
      if cipher.starts_with("ecdh-") {
        return Err(DcryptError::UnsupportedOperation(
          "password protection must not use an ecdh- prefixed cipher".to_string(),
        ));
      }
      let salt = random_salt(8);
      let ciphertext_hex = encrypt_private_material(
        cipher,
        password,
        &salt,
        DCRYPT_DOVECOT_KEY_ENCRYPT_HASH,
        DCRYPT_DOVECOT_KEY_ENCRYPT_ROUNDS,
        &material,
      )?;

      Ok(format!(
        "2\t{oid}\t2\t{cipher}\t{}\t{DCRYPT_DOVECOT_KEY_ENCRYPT_HASH}\t{DCRYPT_DOVECOT_KEY_ENCRYPT_ROUNDS}\t{ciphertext_hex}\t{own_id}",
        HEXLOWER.encode(&salt),
      ))
    }
    Protection::Recipient(wrapping_public) => {
      let inner_cipher = cipher.strip_prefix("ecdh-").ok_or_else(|| {
        DcryptError::UnsupportedOperation("key-wrapped protection requires an ecdh- prefixed cipher".to_string())
      })?;
      let salt = random_salt(8);

      let (secret, peer_material) = match wrapping_public {
        PublicKey::Rsa(rsa) => {
          let secret = SecretBytes::random(&mut rand::thread_rng(), 16);
          let wrapped = rsa_encrypt(rsa, secret.borrow())?;
          (secret, wrapped)
        }
        PublicKey::Ec(ec) => {
          let (ephemeral_point, secret) = ecdh_derive_secret_peer(ec)?;
          (secret, ephemeral_point)
        }
      };

      let ciphertext_hex = encrypt_private_material(
        inner_cipher,
        secret.borrow(),
        &salt,
        DCRYPT_DOVECOT_KEY_ENCRYPT_HASH,
        DCRYPT_DOVECOT_KEY_ENCRYPT_ROUNDS,
        &material,
      )?;
      let enc_key_id = v2_identifier(&wrapping_public.to_der_spki()?)?;

      Ok(format!(
        "2\t{oid}\t1\t{inner_cipher}\t{}\t{DCRYPT_DOVECOT_KEY_ENCRYPT_HASH}\t{DCRYPT_DOVECOT_KEY_ENCRYPT_ROUNDS}\t{ciphertext_hex}\t{}\t{enc_key_id}\t{own_id}",
        HEXLOWER.encode(&salt),
        HEXLOWER.encode(&peer_material),
      ))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::keys::{generate_keypair, KeyKind};

  #[test]
  fn unencrypted_rsa_roundtrips() {
    let pair = generate_keypair(KeyKind::Rsa, 2048, "").unwrap();
    let record = store_private_key_v2(&pair.private, Protection::None, "").unwrap();
    let loaded = load_v2_private(&record, None, None).unwrap();

    let original_id = v2_identifier(&pair.public.to_der_spki().unwrap()).unwrap();
    let loaded_id = v2_identifier(&loaded.public_key().unwrap().to_der_spki().unwrap()).unwrap();
    assert_eq!(original_id, loaded_id);
  }

  #[test]
  fn unencrypted_ec_roundtrips() {
    let pair = generate_keypair(KeyKind::Ec, 0, "secp521r1").unwrap();
    let record = store_private_key_v2(&pair.private, Protection::None, "").unwrap();
    let loaded = load_v2_private(&record, None, None).unwrap();

    let original_id = v2_identifier(&pair.public.to_der_spki().unwrap()).unwrap();
    let loaded_id = v2_identifier(&loaded.public_key().unwrap().to_der_spki().unwrap()).unwrap();
    assert_eq!(original_id, loaded_id);
  }

  #[test]
  fn password_protected_rejects_wrong_password() {
    let pair = generate_keypair(KeyKind::Rsa, 2048, "").unwrap();
    let record = store_private_key_v2(&pair.private, Protection::Password(b"correct horse"), "aes-256-ctr").unwrap();

    let loaded = load_v2_private(&record, Some(b"correct horse"), None).unwrap();
    let original_id = v2_identifier(&pair.public.to_der_spki().unwrap()).unwrap();
    let loaded_id = v2_identifier(&loaded.public_key().unwrap().to_der_spki().unwrap()).unwrap();
    assert_eq!(original_id, loaded_id);

    let wrong = load_v2_private(&record, Some(b"battery staple"), None);
    assert!(wrong.is_err());
  }

  #[test]
  fn password_protected_gcm_roundtrips() {
    let pair = generate_keypair(KeyKind::Ec, 0, "prime256v1").unwrap();
    let record = store_private_key_v2(&pair.private, Protection::Password(b"hunter2"), "aes-256-gcm").unwrap();
    let loaded = load_v2_private(&record, Some(b"hunter2"), None).unwrap();

    let original_id = v2_identifier(&pair.public.to_der_spki().unwrap()).unwrap();
    let loaded_id = v2_identifier(&loaded.public_key().unwrap().to_der_spki().unwrap()).unwrap();
    assert_eq!(original_id, loaded_id);
  }

  #[test]
  fn ec_wrapped_rejects_unrelated_key() {
    let pair = generate_keypair(KeyKind::Ec, 0, "prime256v1").unwrap();
    let wrapper = generate_keypair(KeyKind::Ec, 0, "prime256v1").unwrap();
    let other = generate_keypair(KeyKind::Ec, 0, "prime256v1").unwrap();

    let record = store_private_key_v2(&pair.private, Protection::Recipient(&wrapper.public), "ecdh-aes-256-ctr").unwrap();

    let loaded = load_v2_private(&record, None, Some(&wrapper.private)).unwrap();
    let original_id = v2_identifier(&pair.public.to_der_spki().unwrap()).unwrap();
    let loaded_id = v2_identifier(&loaded.public_key().unwrap().to_der_spki().unwrap()).unwrap();
    assert_eq!(original_id, loaded_id);

    let result = load_v2_private(&record, None, Some(&other.private));
    assert!(matches!(result, Err(DcryptError::WrongDecryptionKey)));
  }

  #[test]
  fn rsa_wrapped_roundtrips() {
    let pair = generate_keypair(KeyKind::Ec, 0, "secp384r1").unwrap();
    let wrapper = generate_keypair(KeyKind::Rsa, 2048, "").unwrap();

    let record = store_private_key_v2(&pair.private, Protection::Recipient(&wrapper.public), "ecdh-aes-256-ctr").unwrap();
    let loaded = load_v2_private(&record, None, Some(&wrapper.private)).unwrap();

    let original_id = v2_identifier(&pair.public.to_der_spki().unwrap()).unwrap();
    let loaded_id = v2_identifier(&loaded.public_key().unwrap().to_der_spki().unwrap()).unwrap();
    assert_eq!(original_id, loaded_id);
  }

  #[test]
  fn public_key_roundtrips() {
    let pair = generate_keypair(KeyKind::Rsa, 2048, "").unwrap();
    let record = store_v2_public(&pair.public).unwrap();
    let loaded = load_v2_public(&record).unwrap();
    assert_eq!(loaded.to_der_spki().unwrap(), pair.public.to_der_spki().unwrap());
  }
}
