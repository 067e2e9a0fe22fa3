//! Parsed X.509 certificates as consumed by trust decisions.
//!
//! A [`Certificate`] keeps its DER encoding alongside the handful of
//! attributes the chain model needs (names and validity window). Signatures
//! and public keys are only decoded again when a link is actually verified.

use crate::util;
use crate::CertpinError;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use x509_parser::pem::Pem;
use x509_parser::prelude::*;

/// A distinguished name, compared by its raw DER encoding.
#[derive(Clone)]
pub struct DistinguishedName {
    raw: Vec<u8>,
    /// Ordered (attribute_type, value) pairs, attribute types as short names.
    components: Vec<(String, String)>,
}

impl DistinguishedName {
    fn from_x509(name: &X509Name<'_>) -> Self {
        let mut components = Vec::new();
        for rdn in name.iter() {
            for attr in rdn.iter() {
                let key = util::oid_short_name(&attr.attr_type().to_id_string());
                let value = attr.as_str().unwrap_or("<binary>").to_string();
                components.push((key, value));
            }
        }
        DistinguishedName {
            raw: name.as_raw().to_vec(),
            components,
        }
    }

    /// Raw DER encoding of the name.
    pub fn as_raw(&self) -> &[u8] {
        &self.raw
    }

    /// Value of the first CN attribute, if any.
    pub fn common_name(&self) -> Option<&str> {
        self.components
            .iter()
            .find(|(k, _)| k == "CN")
            .map(|(_, v)| v.as_str())
    }

    /// Format as a comma-separated one-line string.
    /// Example: "C = US, O = Org, CN = example.com"
    ///
    /// Values containing commas, equals signs, or backslashes are escaped.
    pub fn to_oneline(&self) -> String {
        let mut result = String::new();
        for (i, (k, v)) in self.components.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            result.push_str(k);
            result.push_str(" = ");
            for ch in v.chars() {
                match ch {
                    '\\' => result.push_str("\\\\"),
                    ',' => result.push_str("\\,"),
                    '=' => result.push_str("\\="),
                    _ => result.push(ch),
                }
            }
        }
        result
    }
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for DistinguishedName {}

impl std::hash::Hash for DistinguishedName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_oneline())
    }
}

impl std::fmt::Debug for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.to_oneline())
    }
}

/// An immutable, parsed X.509 certificate.
///
/// Cloning is cheap: the DER bytes are shared. Two certificates are equal
/// when their DER encodings are identical.
#[derive(Clone)]
pub struct Certificate {
    der: Arc<[u8]>,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    not_before: i64,
    not_after: i64,
}

impl Certificate {
    /// Parse a certificate from DER. Trailing bytes after the certificate are ignored.
    pub fn from_der(input: &[u8]) -> Result<Self, CertpinError> {
        let (remaining, x509) = X509Certificate::from_der(input)
            .map_err(|e| CertpinError::DerError(format!("{}", e)))?;

        let cert_len = input.len() - remaining.len();
        let der = input.get(..cert_len).unwrap_or(input);

        Ok(Certificate {
            der: Arc::from(der),
            subject: DistinguishedName::from_x509(x509.subject()),
            issuer: DistinguishedName::from_x509(x509.issuer()),
            not_before: x509.validity().not_before.timestamp(),
            not_after: x509.validity().not_after.timestamp(),
        })
    }

    /// Parse the first certificate of a PEM input.
    pub fn from_pem(input: &[u8]) -> Result<Self, CertpinError> {
        let (_, pem) = x509_parser::pem::parse_x509_pem(input)
            .map_err(|e| CertpinError::PemError(format!("{}", e)))?;

        if pem.label != "CERTIFICATE"
            && pem.label != "TRUSTED CERTIFICATE"
            && pem.label != "X509 CERTIFICATE"
        {
            return Err(CertpinError::PemError(format!(
                "expected CERTIFICATE, got {}",
                pem.label
            )));
        }

        Self::from_der(&pem.contents)
    }

    /// Read a single PEM certificate from a file.
    pub fn from_pem_file(path: &std::path::Path) -> Result<Self, CertpinError> {
        let data = std::fs::read(path).map_err(|e| {
            CertpinError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        Self::from_pem(&data)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    /// Start of the validity window, in Unix seconds.
    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    /// End of the validity window, in Unix seconds.
    pub fn not_after(&self) -> i64 {
        self.not_after
    }

    /// Whether the certificate is self-issued (subject == issuer).
    ///
    /// The self-signature itself is not checked here.
    pub fn is_root(&self) -> bool {
        self.subject == self.issuer
    }

    /// Whether `now` (Unix seconds) lies inside `[not_before, not_after]`.
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    /// SHA-256 fingerprint as colon-separated uppercase hex.
    pub fn fingerprint(&self) -> String {
        util::hex_colon_upper(&Sha256::digest(&self.der))
    }

    /// Decode the stored DER again for signature and key access.
    pub(crate) fn x509(&self) -> Result<X509Certificate<'_>, String> {
        X509Certificate::from_der(&self.der)
            .map(|(_, x509)| x509)
            .map_err(|e| format!("{}", e))
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl std::hash::Hash for Certificate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.der.hash(state);
    }
}

impl std::fmt::Display for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.subject)
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("not_before", &util::format_timestamp(self.not_before))
            .field("not_after", &util::format_timestamp(self.not_after))
            .field("sha256", &self.fingerprint())
            .finish()
    }
}

/// Parse a PEM input containing one or more certificates.
///
/// Parsing stops at the first malformed block once at least one certificate
/// has been read (trailing garbage). Blocks with other labels are skipped.
pub fn parse_pem_chain(input: &[u8]) -> Result<Vec<Certificate>, CertpinError> {
    let mut certs = Vec::new();

    for pem_result in Pem::iter_from_buffer(input) {
        match pem_result {
            Ok(pem) => {
                if pem.label == "CERTIFICATE" || pem.label == "TRUSTED CERTIFICATE" {
                    certs.push(Certificate::from_der(&pem.contents)?);
                }
            }
            Err(e) => {
                if !certs.is_empty() {
                    break;
                }
                return Err(CertpinError::PemError(format!("failed to parse PEM: {}", e)));
            }
        }
    }

    if certs.is_empty() {
        return Err(CertpinError::PemError(
            "no certificates found in PEM input".into(),
        ));
    }

    Ok(certs)
}
