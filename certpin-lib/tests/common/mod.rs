//! Certificate fixtures generated with rcgen.
//!
//! Every fixture uses a fresh ECDSA P-256 key. Names carry a fixed
//! organization so that subjects from different tests never collide by
//! accident.

#![allow(dead_code)]

use certpin_lib::Certificate;
use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};

/// Validity window used for certificates that should be currently valid.
pub const VALID_FROM: (i32, u8, u8) = (2020, 1, 1);
pub const VALID_UNTIL: (i32, u8, u8) = (2049, 12, 31);

/// A generated certificate together with its private key, so it can issue others.
pub struct Fixture {
    pub cert: rcgen::Certificate,
    pub key: KeyPair,
}

impl Fixture {
    pub fn certificate(&self) -> Certificate {
        Certificate::from_der(self.cert.der()).expect("rcgen output parses")
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }
}

fn params(
    cn: &str,
    ca: bool,
    not_before: (i32, u8, u8),
    not_after: (i32, u8, u8),
) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("params");
    let mut dn = DistinguishedName::new();
    dn.push(DnType::OrganizationName, "certpin tests");
    dn.push(DnType::CommonName, cn);
    params.distinguished_name = dn;
    params.is_ca = if ca {
        IsCa::Ca(BasicConstraints::Unconstrained)
    } else {
        IsCa::NoCa
    };
    params.not_before = rcgen::date_time_ymd(not_before.0, not_before.1, not_before.2);
    params.not_after = rcgen::date_time_ymd(not_after.0, not_after.1, not_after.2);
    params
}

/// A self-signed CA certificate.
pub fn root(cn: &str) -> Fixture {
    let key = KeyPair::generate().expect("key generation");
    let cert = params(cn, true, VALID_FROM, VALID_UNTIL)
        .self_signed(&key)
        .expect("self-signed root");
    Fixture { cert, key }
}

/// A CA certificate issued by `issuer`.
pub fn intermediate(cn: &str, issuer: &Fixture) -> Fixture {
    issued(cn, true, issuer, VALID_FROM, VALID_UNTIL)
}

/// An end-entity certificate issued by `issuer`.
pub fn leaf(cn: &str, issuer: &Fixture) -> Fixture {
    issued(cn, false, issuer, VALID_FROM, VALID_UNTIL)
}

/// An end-entity certificate with an explicit validity window.
pub fn leaf_valid_between(
    cn: &str,
    issuer: &Fixture,
    not_before: (i32, u8, u8),
    not_after: (i32, u8, u8),
) -> Fixture {
    issued(cn, false, issuer, not_before, not_after)
}

/// A leaf that expired long ago.
pub fn expired_leaf(cn: &str, issuer: &Fixture) -> Fixture {
    leaf_valid_between(cn, issuer, (2000, 1, 1), (2001, 1, 1))
}

/// A leaf that only becomes valid in the future.
pub fn future_leaf(cn: &str, issuer: &Fixture) -> Fixture {
    leaf_valid_between(cn, issuer, (2048, 1, 1), (2049, 6, 1))
}

fn issued(
    cn: &str,
    ca: bool,
    issuer: &Fixture,
    not_before: (i32, u8, u8),
    not_after: (i32, u8, u8),
) -> Fixture {
    let key = KeyPair::generate().expect("key generation");
    let cert = params(cn, ca, not_before, not_after)
        .signed_by(&key, &issuer.cert, &issuer.key)
        .expect("issued certificate");
    Fixture { cert, key }
}

/// A copy of `cert` with the last byte of its signature flipped.
///
/// The certificate still parses and keeps its names and public key; only
/// verification of its own signature fails.
pub fn corrupt_signature(cert: &Certificate) -> Certificate {
    let mut der = cert.der().to_vec();
    if let Some(last) = der.last_mut() {
        *last ^= 0x01;
    }
    Certificate::from_der(&der).expect("corrupted certificate still parses")
}

/// Standard three-level hierarchy: root, intermediate, leaf.
pub struct Hierarchy {
    pub root: Fixture,
    pub intermediate: Fixture,
    pub leaf: Fixture,
}

impl Hierarchy {
    pub fn new(prefix: &str) -> Self {
        let root = root(&format!("{prefix} Root CA"));
        let intermediate = intermediate(&format!("{prefix} Intermediate CA"), &root);
        let leaf = leaf(&format!("{prefix}.example.test"), &intermediate);
        Hierarchy {
            root,
            intermediate,
            leaf,
        }
    }

    /// `[leaf, intermediate, root]`.
    pub fn full_chain(&self) -> Vec<Certificate> {
        vec![
            self.leaf.certificate(),
            self.intermediate.certificate(),
            self.root.certificate(),
        ]
    }

    /// `[leaf, intermediate]`, as most servers send it.
    pub fn chain_without_root(&self) -> Vec<Certificate> {
        vec![self.leaf.certificate(), self.intermediate.certificate()]
    }
}

/// ecdsa-with-SHA256, 1.2.840.10045.4.3.2, as a DER OID TLV.
const ECDSA_WITH_SHA256: &[u8] = &[0x06, 0x08, 0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x04, 0x03, 0x02];

/// A copy of `cert` whose outer signature algorithm claims ecdsa-with-SHA224,
/// which signature verification does not support.
pub fn with_sha224_signature_algorithm(cert: &Certificate) -> Certificate {
    let mut der = cert.der().to_vec();
    let start = der
        .windows(ECDSA_WITH_SHA256.len())
        .rposition(|w| w == ECDSA_WITH_SHA256)
        .expect("certificate is signed with ecdsa-with-SHA256");
    der[start + ECDSA_WITH_SHA256.len() - 1] = 0x01;
    Certificate::from_der(&der).expect("patched certificate still parses")
}
