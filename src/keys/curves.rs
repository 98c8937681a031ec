use openssl::nid::Nid;

/// Curves recognized by this crate, with their short name (as accepted by
/// `generate_keypair`) and the dotted ASN.1 OID used in the v2 on-disk format.
pub struct CurveInfo {
  pub short_name: &'static str,
  pub nid: Nid,
  pub oid: &'static str,
}

pub const RSA_OID: &str = "1.2.840.113549.1.1.1";

const CURVES: &[CurveInfo] = &[
  CurveInfo {
    short_name: "prime256v1",
    nid: Nid::X9_62_PRIME256V1,
    oid: "1.2.840.10045.3.1.7",
  },
  CurveInfo {
    short_name: "secp384r1",
    nid: Nid::SECP384R1,
    oid: "1.3.132.0.34",
  },
  CurveInfo {
    short_name: "secp521r1",
    nid: Nid::SECP521R1,
    oid: "1.3.132.0.35",
  },
  CurveInfo {
    short_name: "secp256k1",
    nid: Nid::SECP256K1,
    oid: "1.3.132.0.10",
  },
];

pub fn by_short_name(name: &str) -> Option<&'static CurveInfo> {
  CURVES.iter().find(|c| c.short_name == name)
}

pub fn by_nid(nid: Nid) -> Option<&'static CurveInfo> {
  CURVES.iter().find(|c| c.nid == nid)
}

pub fn by_oid(oid: &str) -> Option<&'static CurveInfo> {
  CURVES.iter().find(|c| c.oid == oid)
}
