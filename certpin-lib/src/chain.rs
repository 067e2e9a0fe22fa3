//! Certificate chains: root detection, root completion and leaf-to-root ordering.
//!
//! A chain received from a peer is a set of certificates in whatever order
//! the peer chose to send them. [`CertificateChain::ordered`] turns it into an
//! [`OrderedChain`] where every certificate is issued by the next one and the
//! last one is self-issued.

use crate::certificate::Certificate;
use tracing::trace;

/// Maximum number of distinct certificates in a chain.
pub const MAX_CHAIN_DEPTH: usize = 32;

/// Reasons a set of certificates cannot be ordered into a chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("certificate chain is empty")]
    Empty,

    #[error("certificate chain exceeds maximum depth of {max} ({len} certificates)")]
    TooLong { len: usize, max: usize },

    #[error("certificate chain is disconnected at {subject}: issuer {issuer} is not part of the chain")]
    Disconnected { subject: String, issuer: String },
}

/// Whether a certificate is self-issued (subject == issuer).
pub fn is_root(cert: &Certificate) -> bool {
    cert.is_root()
}

/// Whether any certificate of the slice is self-issued.
pub fn has_root(certs: &[Certificate]) -> bool {
    certs.iter().any(is_root)
}

/// A possibly unordered collection of certificates, semantically leaf-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateChain {
    certificates: Vec<Certificate>,
}

impl CertificateChain {
    pub fn new(certificates: Vec<Certificate>) -> Self {
        CertificateChain { certificates }
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Certificate> {
        self.certificates.iter()
    }

    pub fn has_root(&self) -> bool {
        has_root(&self.certificates)
    }

    /// Append `anchor` as the terminal certificate unless the chain already
    /// contains a root. Returns whether the anchor was appended.
    pub fn append_root(&mut self, anchor: &Certificate) -> bool {
        if self.has_root() {
            return false;
        }
        self.certificates.push(anchor.clone());
        true
    }

    pub fn push(&mut self, cert: Certificate) {
        self.certificates.push(cert);
    }

    /// Certificates whose issuer is neither themselves nor any other member.
    pub fn dangling(&self) -> impl Iterator<Item = &Certificate> + '_ {
        self.certificates.iter().filter(move |cert| {
            !cert.is_root()
                && !self
                    .certificates
                    .iter()
                    .any(|other| other.subject() == cert.issuer())
        })
    }

    /// Order the chain leaf-first, root-last.
    ///
    /// Exact duplicates are dropped. The leaf is the first certificate (in
    /// input order) that issued no other member; from there each issuer is
    /// looked up by subject until a self-issued certificate is reached. Every
    /// member must be part of that path. The walk visits each certificate at
    /// most once, so cyclic issuer relations terminate as disconnected.
    #[allow(clippy::indexing_slicing)] // indices come from enumerate() over `pool`, `used` has the same length
    pub fn ordered(&self) -> Result<OrderedChain, ChainError> {
        let mut pool: Vec<&Certificate> = Vec::with_capacity(self.certificates.len());
        for cert in &self.certificates {
            if !pool.contains(&cert) {
                pool.push(cert);
            }
        }

        if pool.is_empty() {
            return Err(ChainError::Empty);
        }
        if pool.len() > MAX_CHAIN_DEPTH {
            return Err(ChainError::TooLong {
                len: pool.len(),
                max: MAX_CHAIN_DEPTH,
            });
        }

        let leaf_idx = pool
            .iter()
            .enumerate()
            .position(|(i, cert)| {
                !pool
                    .iter()
                    .enumerate()
                    .any(|(j, other)| i != j && other.issuer() == cert.subject())
            })
            .ok_or_else(|| disconnected(pool[0]))?;

        let mut used = vec![false; pool.len()];
        used[leaf_idx] = true;
        let mut ordered = vec![pool[leaf_idx].clone()];
        let mut current = pool[leaf_idx];

        while !current.is_root() {
            let next = pool
                .iter()
                .enumerate()
                .find(|(i, cert)| !used[*i] && cert.subject() == current.issuer());
            match next {
                Some((i, cert)) => {
                    trace!(child = %current.subject(), parent = %cert.subject(), "linked by name");
                    used[i] = true;
                    ordered.push((*cert).clone());
                    current = *cert;
                }
                None => return Err(disconnected(current)),
            }
        }

        if let Some((i, _)) = used.iter().enumerate().find(|(_, u)| !**u) {
            return Err(disconnected(pool[i]));
        }

        Ok(OrderedChain {
            certificates: ordered,
        })
    }
}

fn disconnected(cert: &Certificate) -> ChainError {
    ChainError::Disconnected {
        subject: cert.subject().to_oneline(),
        issuer: cert.issuer().to_oneline(),
    }
}

impl From<Vec<Certificate>> for CertificateChain {
    fn from(certificates: Vec<Certificate>) -> Self {
        CertificateChain::new(certificates)
    }
}

impl From<&[Certificate]> for CertificateChain {
    fn from(certificates: &[Certificate]) -> Self {
        CertificateChain::new(certificates.to_vec())
    }
}

impl From<OrderedChain> for CertificateChain {
    fn from(chain: OrderedChain) -> Self {
        CertificateChain::new(chain.certificates)
    }
}

impl<'a> IntoIterator for &'a CertificateChain {
    type Item = &'a Certificate;
    type IntoIter = std::slice::Iter<'a, Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.certificates.iter()
    }
}

/// A non-empty chain where each certificate's issuer is the subject of the
/// next one and the last certificate is self-issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedChain {
    certificates: Vec<Certificate>,
}

impl OrderedChain {
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Always `false`: ordering rejects empty chains.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Certificate> {
        self.certificates.iter()
    }

    /// The end-entity certificate.
    #[allow(clippy::indexing_slicing)] // non-empty by construction
    pub fn leaf(&self) -> &Certificate {
        &self.certificates[0]
    }

    /// The self-issued terminal certificate.
    #[allow(clippy::indexing_slicing)] // non-empty by construction
    pub fn root(&self) -> &Certificate {
        &self.certificates[self.certificates.len() - 1]
    }

    /// Adjacent `(index, child, parent)` pairs from leaf to root.
    pub fn links(&self) -> impl Iterator<Item = (usize, &Certificate, &Certificate)> + '_ {
        self.certificates
            .windows(2)
            .enumerate()
            .filter_map(|(i, pair)| match pair {
                [child, parent] => Some((i, child, parent)),
                _ => None,
            })
    }

    pub fn into_vec(self) -> Vec<Certificate> {
        self.certificates
    }
}
