mod curves;

pub use curves::RSA_OID;

use crate::error::{DcryptError, DcryptResult};
use crate::memguard::SecretBytes;
use openssl::bn::{BigNum, BigNumContext};
use openssl::derive::Deriver;
use openssl::ec::{EcGroup, EcKey, EcPoint, PointConversionForm};
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::{Padding, Rsa};

/// Size in bytes of the random secret generated for RSA key-wrapping.
pub const RSA_WRAP_SECRET_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
  Rsa,
  Ec,
}

pub enum PublicKey {
  Rsa(Rsa<Public>),
  Ec(EcKey<Public>),
}

pub enum PrivateKey {
  Rsa(Rsa<Private>),
  Ec(EcKey<Private>),
}

pub struct Keypair {
  pub public: PublicKey,
  pub private: PrivateKey,
}

impl PublicKey {
  pub fn kind(&self) -> KeyKind {
    match self {
      PublicKey::Rsa(_) => KeyKind::Rsa,
      PublicKey::Ec(_) => KeyKind::Ec,
    }
  }

  /// DER-encoded SubjectPublicKeyInfo, used for the v2 identifier and the v2 public format.
  pub fn to_der_spki(&self) -> DcryptResult<Vec<u8>> {
    let pkey = match self {
      PublicKey::Rsa(rsa) => PKey::from_rsa(rsa.clone())?,
      PublicKey::Ec(ec) => PKey::from_ec_key(ec.clone())?,
    };
    Ok(pkey.public_key_to_der()?)
  }

  pub fn as_ec(&self) -> DcryptResult<&EcKey<Public>> {
    match self {
      PublicKey::Ec(ec) => Ok(ec),
      PublicKey::Rsa(_) => Err(DcryptError::UnsupportedOperation(
        "operation only defined for EC keys".to_string(),
      )),
    }
  }

  pub fn as_rsa(&self) -> DcryptResult<&Rsa<Public>> {
    match self {
      PublicKey::Rsa(rsa) => Ok(rsa),
      PublicKey::Ec(_) => Err(DcryptError::UnsupportedOperation(
        "operation only defined for RSA keys".to_string(),
      )),
    }
  }

  /// The compressed EC point, as used by the v1 format and the ECDH peer material.
  pub fn ec_compressed_point(&self) -> DcryptResult<Vec<u8>> {
    let ec = self.as_ec()?;
    point_to_compressed(ec.group(), ec.public_key())
  }

  pub fn ec_curve_nid(&self) -> DcryptResult<Nid> {
    Ok(self.as_ec()?.group().curve_name().ok_or_else(|| {
      DcryptError::UnknownCurve("curve has no known NID".to_string())
    })?)
  }
}

impl PrivateKey {
  pub fn kind(&self) -> KeyKind {
    match self {
      PrivateKey::Rsa(_) => KeyKind::Rsa,
      PrivateKey::Ec(_) => KeyKind::Ec,
    }
  }

  pub fn public_key(&self) -> DcryptResult<PublicKey> {
    match self {
      PrivateKey::Rsa(rsa) => {
        let n = rsa.n().to_owned()?;
        let e = rsa.e().to_owned()?;
        Ok(PublicKey::Rsa(Rsa::from_public_components(n, e)?))
      }
      PrivateKey::Ec(ec) => {
        let group = ec.group();
        let public = EcKey::from_public_key(group, ec.public_key())?;
        Ok(PublicKey::Ec(public))
      }
    }
  }

  pub fn as_ec(&self) -> DcryptResult<&EcKey<Private>> {
    match self {
      PrivateKey::Ec(ec) => Ok(ec),
      PrivateKey::Rsa(_) => Err(DcryptError::UnsupportedOperation(
        "operation only defined for EC keys".to_string(),
      )),
    }
  }

  pub fn as_rsa(&self) -> DcryptResult<&Rsa<Private>> {
    match self {
      PrivateKey::Rsa(rsa) => Ok(rsa),
      PrivateKey::Ec(_) => Err(DcryptError::UnsupportedOperation(
        "operation only defined for RSA keys".to_string(),
      )),
    }
  }
}

fn point_to_compressed(group: &openssl::ec::EcGroupRef, point: &openssl::ec::EcPointRef) -> DcryptResult<Vec<u8>> {
  let mut ctx = BigNumContext::new()?;
  Ok(point.to_bytes(group, PointConversionForm::COMPRESSED, &mut ctx)?)
}

fn point_from_bytes(group: &EcGroup, bytes: &[u8]) -> DcryptResult<EcPoint> {
  let mut ctx = BigNumContext::new()?;
  Ok(EcPoint::from_bytes(group, bytes, &mut ctx)?)
}

/// Reconstruct an EC private key from its curve and raw scalar, as recovered
/// by the v1/v2 loaders, then validate it.
pub fn ec_key_from_scalar(nid: Nid, scalar: &BigNum) -> DcryptResult<EcKey<Private>> {
  let group = EcGroup::from_curve_name(nid).map_err(|_| DcryptError::UnknownCurve(format!("{nid:?}")))?;
  let ctx = BigNumContext::new()?;
  let mut public_point = EcPoint::new(&group)?;
  public_point.mul_generator(&group, scalar, &ctx)?;

  let ec = EcKey::from_private_components(&group, scalar, &public_point).map_err(|_| DcryptError::InvalidKey)?;
  check_ec_key(&ec)?;
  Ok(ec)
}

fn check_ec_key(ec: &EcKey<Private>) -> DcryptResult<()> {
  ec.check_key().map_err(|_| DcryptError::InvalidKey)
}

fn check_rsa_key(rsa: &Rsa<Private>) -> DcryptResult<()> {
  match rsa.check_key() {
    Ok(true) => Ok(()),
    _ => Err(DcryptError::InvalidKey),
  }
}

/// Decode an EC public key from its curve NID and compressed point bytes.
pub fn ec_public_key_from_compressed(nid: Nid, bytes: &[u8]) -> DcryptResult<EcKey<Public>> {
  let group = EcGroup::from_curve_name(nid).map_err(|_| DcryptError::UnknownCurve(format!("{nid:?}")))?;
  let point = point_from_bytes(&group, bytes)?;
  let ec = EcKey::from_public_key(&group, &point)?;
  ec.check_key().map_err(|_| DcryptError::InvalidKey)?;
  Ok(ec)
}

/// Validate a freshly reconstructed private key of either kind.
pub fn validate_private_key(key: &PrivateKey) -> DcryptResult<()> {
  match key {
    PrivateKey::Rsa(rsa) => check_rsa_key(rsa),
    PrivateKey::Ec(ec) => check_ec_key(ec),
  }
}

pub fn curve_nid_by_short_name(name: &str) -> DcryptResult<Nid> {
  curves::by_short_name(name)
    .map(|c| c.nid)
    .ok_or_else(|| DcryptError::UnknownCurve(name.to_string()))
}

pub fn curve_oid_by_nid(nid: Nid) -> DcryptResult<&'static str> {
  curves::by_nid(nid)
    .map(|c| c.oid)
    .ok_or_else(|| DcryptError::UnknownCurve(format!("{nid:?}")))
}

pub fn curve_nid_by_oid(oid: &str) -> Option<Nid> {
  curves::by_oid(oid).map(|c| c.nid)
}

pub fn generate_keypair(kind: KeyKind, bits: u32, curve_name: &str) -> DcryptResult<Keypair> {
  match kind {
    KeyKind::Rsa => {
      let private = Rsa::generate(bits)?;
      let n = private.n().to_owned()?;
      let e = private.e().to_owned()?;
      let public = Rsa::from_public_components(n, e)?;

      Ok(Keypair {
        public: PublicKey::Rsa(public),
        private: PrivateKey::Rsa(private),
      })
    }
    KeyKind::Ec => {
      let nid = curve_nid_by_short_name(curve_name)?;
      let group = EcGroup::from_curve_name(nid)?;
      let private = EcKey::generate(&group)?;
      let public = EcKey::from_public_key(&group, private.public_key())?;

      Ok(Keypair {
        public: PublicKey::Ec(public),
        private: PrivateKey::Ec(private),
      })
    }
  }
}

/// ECDH using our own (EC) private key against a peer's ephemeral point,
/// returning the raw X-coordinate shared secret.
pub fn ecdh_derive_secret_local(local: &EcKey<Private>, peer_point_bytes: &[u8]) -> DcryptResult<SecretBytes> {
  let group = local.group();
  let peer_point = point_from_bytes(&EcGroup::from_curve_name(group.curve_name().ok_or_else(|| {
    DcryptError::UnknownCurve("local key has no curve NID".to_string())
  })?)?, peer_point_bytes)?;
  let peer_public = EcKey::from_public_key(group, &peer_point)?;
  peer_public.check_key().map_err(|_| DcryptError::InvalidKey)?;

  let local_pkey = PKey::from_ec_key(local.clone())?;
  let peer_pkey = PKey::from_ec_key(peer_public)?;

  let mut deriver = Deriver::new(&local_pkey)?;
  deriver.set_peer(&peer_pkey)?;
  let shared = deriver.derive_to_vec()?;

  Ok(SecretBytes::from(shared))
}

/// ECDH against a peer's static public key, generating a fresh ephemeral
/// keypair and returning (compressed ephemeral public point, shared secret).
pub fn ecdh_derive_secret_peer(peer_public: &EcKey<Public>) -> DcryptResult<(Vec<u8>, SecretBytes)> {
  let group = peer_public.group();
  let ephemeral_private = EcKey::generate(group)?;
  let ephemeral_point_bytes = point_to_compressed(group, ephemeral_private.public_key())?;

  let local_pkey = PKey::from_ec_key(ephemeral_private)?;
  let peer_pkey = PKey::from_ec_key(peer_public.clone())?;

  let mut deriver = Deriver::new(&local_pkey)?;
  deriver.set_peer(&peer_pkey)?;
  let shared = deriver.derive_to_vec()?;

  Ok((ephemeral_point_bytes, SecretBytes::from(shared)))
}

/// RSA-OAEP encrypt a short secret. Output is exactly the modulus size.
pub fn rsa_encrypt(public: &Rsa<Public>, data: &[u8]) -> DcryptResult<Vec<u8>> {
  let mut out = vec![0u8; public.size() as usize];
  let written = public.public_encrypt(data, &mut out, Padding::PKCS1_OAEP)?;
  out.truncate(written);
  Ok(out)
}

/// RSA-OAEP decrypt a wrapped secret.
pub fn rsa_decrypt(private: &Rsa<Private>, data: &[u8]) -> DcryptResult<SecretBytes> {
  let mut out = vec![0u8; private.size() as usize];
  let written = private.private_decrypt(data, &mut out, Padding::PKCS1_OAEP)?;
  out.truncate(written);
  Ok(SecretBytes::from(out))
}
