//! Platform default trust: a CA certificate store and the trust manager over it.
//!
//! The system store is located the way OpenSSL locates it: `SSL_CERT_FILE`
//! and `SSL_CERT_DIR`, then `openssl-probe`, then well-known paths.

use crate::certificate::{Certificate, DistinguishedName};
use crate::chain::{CertificateChain, MAX_CHAIN_DEPTH};
use crate::error::TrustError;
use crate::linker::link_trusted;
use crate::manager::{check_validity, PlatformTrustManager, Role, TrustManagerFactory, X509TrustManager};
use crate::util;
use crate::CertpinError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace};
use x509_parser::pem::Pem;

/// Well-known CA bundle file paths, in order of preference.
pub(crate) const KNOWN_CA_BUNDLE_PATHS: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt", // Debian/Ubuntu
    "/etc/pki/tls/certs/ca-bundle.crt",   // RHEL/CentOS/Fedora
    "/etc/ssl/ca-bundle.pem",             // openSUSE
    "/etc/ssl/cert.pem",                  // macOS, Alpine
];

/// Well-known CA certificate directory paths.
pub(crate) const KNOWN_CA_DIR_PATHS: &[&str] = &["/etc/ssl/certs"];

/// Check if a file looks like a PEM certificate file for trust store loading.
///
/// Matches `.pem`, `.crt`, `.cer` extensions and OpenSSL hash-linked files
/// (`XXXXXXXX.N` where the extension is a single digit).
fn is_pem_cert_file(path: &std::path::Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e,
        None => return false,
    };
    matches!(ext, "pem" | "crt" | "cer")
        || (ext.len() == 1 && ext.bytes().next().is_some_and(|b| b.is_ascii_digit()))
}

/// A set of trusted CA certificates, indexed by subject.
#[derive(Clone, Default)]
pub struct TrustStore {
    certs_by_subject: HashMap<Vec<u8>, Vec<Certificate>>,
    count: usize,
}

impl std::fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustStore")
            .field("count", &self.count)
            .finish()
    }
}

impl TrustStore {
    /// Create an empty trust store.
    pub fn new() -> Self {
        TrustStore {
            certs_by_subject: HashMap::new(),
            count: 0,
        }
    }

    /// Load the system trust store.
    ///
    /// Tries the CA bundle file found by [`find_system_ca_bundle`] first,
    /// then `SSL_CERT_DIR`, the `openssl-probe` directory and
    /// [`KNOWN_CA_DIR_PATHS`]. Fails when none of them yields a certificate.
    pub fn system() -> Result<Self, CertpinError> {
        let mut store = TrustStore::new();

        if let Some(bundle_path) = find_system_ca_bundle() {
            if let Ok(data) = std::fs::read(&bundle_path) {
                let added = store.add_pem_bundle(&data);
                if added > 0 {
                    debug!(path = %bundle_path.display(), count = added, "loaded system CA bundle");
                    return Ok(store);
                }
            }
        }

        let probe = openssl_probe::probe();
        let dir_candidates = std::env::var("SSL_CERT_DIR")
            .ok()
            .into_iter()
            .chain(
                probe
                    .cert_dir
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned()),
            )
            .chain(KNOWN_CA_DIR_PATHS.iter().map(|s| (*s).to_string()));

        for dir in dir_candidates {
            let dir_path = std::path::Path::new(&dir);
            if let Ok(added) = store.add_pem_directory(dir_path) {
                if added > 0 {
                    debug!(path = %dir, count = added, "loaded system CA directory");
                    return Ok(store);
                }
            }
        }

        Err(CertpinError::TrustStore("no system trust store found".into()))
    }

    /// Create a trust store from a PEM bundle (e.g., a CA certificates file).
    pub fn from_pem(pem_data: &[u8]) -> Result<Self, CertpinError> {
        let mut store = TrustStore::new();
        if store.add_pem_bundle(pem_data) == 0 {
            return Err(CertpinError::PemError(
                "no certificates found in PEM input".into(),
            ));
        }
        Ok(store)
    }

    /// Create a trust store from a PEM file path.
    pub fn from_pem_file(path: &std::path::Path) -> Result<Self, CertpinError> {
        let data = std::fs::read(path).map_err(|e| {
            CertpinError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        Self::from_pem(&data)
    }

    /// Add a certificate. Returns `false` if it was already present.
    pub fn add(&mut self, cert: Certificate) -> bool {
        let entry = self
            .certs_by_subject
            .entry(cert.subject().as_raw().to_vec())
            .or_default();
        if entry.contains(&cert) {
            return false;
        }
        entry.push(cert);
        self.count += 1;
        true
    }

    /// Add a DER-encoded certificate.
    pub fn add_der(&mut self, der: &[u8]) -> Result<(), CertpinError> {
        self.add(Certificate::from_der(der)?);
        Ok(())
    }

    /// Add all certificates from a PEM bundle. Returns the number of
    /// certificates added; entries that fail to parse are skipped.
    pub fn add_pem_bundle(&mut self, pem_data: &[u8]) -> usize {
        let mut added = 0;
        for pem in Pem::iter_from_buffer(pem_data) {
            let Ok(pem) = pem else {
                break;
            };
            if pem.label != "CERTIFICATE" && pem.label != "TRUSTED CERTIFICATE" {
                continue;
            }
            if let Ok(cert) = Certificate::from_der(&pem.contents) {
                if self.add(cert) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Load certificates from a directory of PEM files (like OpenSSL's -CApath).
    pub fn add_pem_directory(&mut self, dir: &std::path::Path) -> Result<usize, CertpinError> {
        let mut total = 0;
        let entries = std::fs::read_dir(dir).map_err(|e| {
            CertpinError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", dir.display(), e),
            ))
        })?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_pem_cert_file(&path) {
                if let Ok(data) = std::fs::read(&path) {
                    total += self.add_pem_bundle(&data);
                }
            }
        }
        Ok(total)
    }

    /// Trusted certificates whose subject is `name`.
    pub fn find_by_subject(&self, name: &DistinguishedName) -> &[Certificate] {
        self.certs_by_subject
            .get(name.as_raw())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether exactly this certificate is in the store.
    pub fn contains(&self, cert: &Certificate) -> bool {
        self.find_by_subject(cert.subject()).contains(cert)
    }

    /// All certificates in the store, in no particular order.
    pub fn certificates(&self) -> impl Iterator<Item = &Certificate> + '_ {
        self.certs_by_subject.values().flatten()
    }

    /// Number of certificates in the store.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Find the system CA bundle path (same location OpenSSL uses).
///
/// Checks, in order:
/// 1. `SSL_CERT_FILE` environment variable
/// 2. Path discovered by `openssl-probe`
/// 3. Well-known bundle file paths ([`KNOWN_CA_BUNDLE_PATHS`])
pub fn find_system_ca_bundle() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SSL_CERT_FILE") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Some(p);
        }
    }

    let probe = openssl_probe::probe();
    if let Some(file) = probe.cert_file {
        let path = PathBuf::from(&file);
        if path.exists() {
            return Some(path);
        }
    }

    for candidate in KNOWN_CA_BUNDLE_PATHS {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

/// Trust manager validating chains against a [`TrustStore`].
///
/// A chain that omits its root is completed from the store. Every member
/// must be inside its validity window, every link must verify, and the root
/// must be one of the stored certificates.
#[derive(Debug, Clone)]
pub struct StoreTrustManager {
    store: TrustStore,
    at_time: Option<i64>,
}

impl StoreTrustManager {
    pub fn new(store: TrustStore) -> Self {
        StoreTrustManager {
            store,
            at_time: None,
        }
    }

    /// Check validity windows at this Unix timestamp instead of now.
    #[must_use]
    pub fn at_time(mut self, at_time: Option<i64>) -> Self {
        self.at_time = at_time;
        self
    }

    pub fn store(&self) -> &TrustStore {
        &self.store
    }

    /// Append issuers from the store until the chain reaches a root or the
    /// store has no verifying issuer for the topmost certificate.
    fn complete(&self, chain: &mut CertificateChain) {
        while !chain.has_root() && chain.len() < MAX_CHAIN_DEPTH {
            let Some(top) = chain.dangling().next().cloned() else {
                break;
            };
            let issuer = self
                .store
                .find_by_subject(top.issuer())
                .iter()
                .find(|candidate| !chain.iter().any(|c| c == *candidate) && link_trusted(&top, candidate).is_ok());
            match issuer {
                Some(issuer) => {
                    trace!(child = %top.subject(), issuer = %issuer.subject(), "completed chain from store");
                    chain.push(issuer.clone());
                }
                None => break,
            }
        }
    }

    fn check(&self, chain: &[Certificate], auth_type: &str, role: Role) -> Result<(), TrustError> {
        if chain.is_empty() {
            return Err(TrustError::EmptyChain);
        }
        trace!(auth_type, %role, "checking chain against trust store");

        let mut chain = CertificateChain::from(chain);
        self.complete(&mut chain);

        if let Some(top) = chain.dangling().next() {
            return Err(TrustError::UntrustedRoot {
                subject: top.subject().to_oneline(),
            });
        }

        let ordered = chain.ordered()?;

        let now = util::now_or(self.at_time);
        for cert in ordered.iter() {
            check_validity(cert, now)?;
        }

        for (at_index, child, parent) in ordered.links() {
            link_trusted(child, parent).map_err(|cause| TrustError::LinkFailed { at_index, cause })?;
        }

        if !self.store.contains(ordered.root()) {
            return Err(TrustError::UntrustedRoot {
                subject: ordered.root().subject().to_oneline(),
            });
        }

        Ok(())
    }
}

impl X509TrustManager for StoreTrustManager {
    fn accepted_issuers(&self) -> Vec<Certificate> {
        self.store.certificates().cloned().collect()
    }

    fn check_client_trusted(
        &self,
        chain: &[Certificate],
        auth_type: &str,
    ) -> Result<(), TrustError> {
        self.check(chain, auth_type, Role::Client)
    }

    fn check_server_trusted(
        &self,
        chain: &[Certificate],
        auth_type: &str,
    ) -> Result<(), TrustError> {
        self.check(chain, auth_type, Role::Server)
    }
}

/// Factory offering a [`StoreTrustManager`] over the system trust store.
#[derive(Debug, Clone, Default)]
pub struct SystemTrustManagerFactory {
    at_time: Option<i64>,
}

impl SystemTrustManagerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn at_time(mut self, at_time: Option<i64>) -> Self {
        self.at_time = at_time;
        self
    }
}

impl TrustManagerFactory for SystemTrustManagerFactory {
    fn trust_managers(&self) -> Result<Vec<PlatformTrustManager>, CertpinError> {
        let store = TrustStore::system()?;
        let manager = StoreTrustManager::new(store).at_time(self.at_time);
        Ok(vec![PlatformTrustManager::X509(Arc::new(manager))])
    }
}
