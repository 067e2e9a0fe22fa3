//! Verification of a single issuer → subject link.

use crate::certificate::Certificate;
use tracing::trace;
use x509_parser::error::X509Error;

/// Why a child certificate is not validly issued by its claimed parent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("signature of {child} does not verify with the public key of {parent}")]
    SignatureInvalid { child: String, parent: String },

    #[error("signature algorithm {algorithm} of {child} is not supported")]
    UnsupportedAlgorithm { child: String, algorithm: String },

    #[error("certificate {subject} could not be decoded: {reason}")]
    Undecodable { subject: String, reason: String },
}

/// Decides whether `child` was issued by `parent`.
///
/// Implementations only look at the pair they are given. Name matching,
/// validity windows and revocation are the caller's business.
pub trait TrustLinker: Send + Sync {
    fn link_trusted(&self, child: &Certificate, parent: &Certificate) -> Result<(), LinkError>;
}

/// Verifies the child's signature with the parent's public key.
///
/// Both certificates are decoded only when a link is checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicKeyLinker;

impl TrustLinker for PublicKeyLinker {
    fn link_trusted(&self, child: &Certificate, parent: &Certificate) -> Result<(), LinkError> {
        let child_x509 = child.x509().map_err(|reason| LinkError::Undecodable {
            subject: child.subject().to_oneline(),
            reason,
        })?;
        let parent_x509 = parent.x509().map_err(|reason| LinkError::Undecodable {
            subject: parent.subject().to_oneline(),
            reason,
        })?;

        trace!(child = %child.subject(), parent = %parent.subject(), "verifying link signature");

        child_x509
            .verify_signature(Some(parent_x509.public_key()))
            .map_err(|e| match e {
                X509Error::SignatureUnsupportedAlgorithm => LinkError::UnsupportedAlgorithm {
                    child: child.subject().to_oneline(),
                    algorithm: child_x509.signature_algorithm.algorithm.to_id_string(),
                },
                _ => LinkError::SignatureInvalid {
                    child: child.subject().to_oneline(),
                    parent: parent.subject().to_oneline(),
                },
            })
    }
}

/// Check one link with the default [`PublicKeyLinker`].
pub fn link_trusted(child: &Certificate, parent: &Certificate) -> Result<(), LinkError> {
    PublicKeyLinker.link_trusted(child, parent)
}
