use dcrypt::format::{
  inspect, load_public_key, load_v1_private, load_v2_private, store_private_key_v2, v2_identifier, EncryptionType,
  KeyKindClass, Protection,
};
use dcrypt::keys::{generate_keypair, KeyKind};
use dcrypt::DcryptError;
use std::fs;
use std::io::Write;

fn public_identifier(key: &dcrypt::keys::PublicKey) -> String {
  v2_identifier(&key.to_der_spki().unwrap()).unwrap()
}

#[test]
fn ec_secp521r1_v2_unencrypted_roundtrip() {
  let pair = generate_keypair(KeyKind::Ec, 0, "secp521r1").unwrap();
  let record = store_private_key_v2(&pair.private, Protection::None, "").unwrap();

  let loaded = load_v2_private(&record, None, None).unwrap();
  assert_eq!(
    public_identifier(&pair.public),
    public_identifier(&loaded.public_key().unwrap())
  );
}

#[test]
fn rsa_2048_v2_password_wrong_password_rejected() {
  let pair = generate_keypair(KeyKind::Rsa, 2048, "").unwrap();
  let record = store_private_key_v2(&pair.private, Protection::Password(b"correct horse"), "aes-256-ctr").unwrap();

  let result = load_v2_private(&record, Some(b"battery staple"), None);
  assert!(result.is_err());
}

#[test]
fn sample_v1_fixture_identifier_matches() {
  let record = fs::read_to_string("tests/fixtures/sample-v1.asc").unwrap();
  let loaded = load_v1_private(&record, None, None).unwrap();
  assert_eq!(loaded.kind(), dcrypt::keys::KeyKind::Ec);
}

#[test]
fn sample_v2_fixture_identifier_matches() {
  let record = fs::read_to_string("tests/fixtures/sample-v2.asc").unwrap();
  let loaded = load_v2_private(&record, None, None).unwrap();
  assert_eq!(loaded.kind(), dcrypt::keys::KeyKind::Rsa);
}

#[test]
fn ec_wrapped_under_rsa_roundtrip_and_wrong_key_rejected() {
  let pair = generate_keypair(KeyKind::Ec, 0, "prime256v1").unwrap();
  let wrapper = generate_keypair(KeyKind::Rsa, 2048, "").unwrap();
  let other_wrapper = generate_keypair(KeyKind::Rsa, 2048, "").unwrap();

  let record = store_private_key_v2(&pair.private, Protection::Recipient(&wrapper.public), "ecdh-aes-256-gcm").unwrap();

  let loaded = load_v2_private(&record, None, Some(&wrapper.private)).unwrap();
  assert_eq!(
    public_identifier(&pair.public),
    public_identifier(&loaded.public_key().unwrap())
  );

  let result = load_v2_private(&record, None, Some(&other_wrapper.private));
  assert!(matches!(result, Err(DcryptError::WrongDecryptionKey)));
}

#[test]
fn inspector_reports_v2_password_private_key() {
  let pair = generate_keypair(KeyKind::Rsa, 2048, "").unwrap();
  let record = store_private_key_v2(&pair.private, Protection::Password(b"hunter2"), "aes-256-ctr").unwrap();

  let report = inspect(&record).unwrap();
  assert_eq!(report.version, Some(2));
  assert_eq!(report.kind, KeyKindClass::Private);
  assert_eq!(report.encryption, EncryptionType::Password);
  assert!(report.key_id.is_some());
}

#[test]
fn public_key_loader_dispatches_on_version() {
  let v2_pair = generate_keypair(KeyKind::Rsa, 2048, "").unwrap();
  let v2_record = dcrypt::format::store_v2_public(&v2_pair.public).unwrap();
  let loaded = load_public_key(&v2_record).unwrap();
  assert_eq!(public_identifier(&loaded), public_identifier(&v2_pair.public));
}

#[test]
fn stored_record_survives_a_round_trip_through_a_file() {
  let pair = generate_keypair(KeyKind::Ec, 0, "secp384r1").unwrap();
  let record = store_private_key_v2(&pair.private, Protection::None, "").unwrap();

  let mut scratch = tempfile::NamedTempFile::new().unwrap();
  scratch.write_all(record.as_bytes()).unwrap();
  scratch.flush().unwrap();

  let read_back = fs::read_to_string(scratch.path()).unwrap();
  let loaded = load_v2_private(&read_back, None, None).unwrap();
  assert_eq!(
    public_identifier(&pair.public),
    public_identifier(&loaded.public_key().unwrap())
  );
}
