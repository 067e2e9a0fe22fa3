//! Trust decision failures.
//!
//! Every variant is terminal for the call that produced it. The handshake
//! layer is expected to abort the connection on any of them.

use crate::chain::ChainError;
use crate::linker::LinkError;

#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    /// The peer presented no certificate at all.
    #[error("certificate chain is empty")]
    EmptyChain,

    /// No decision was made for this chain (the validator was given nothing to check).
    #[error("no trust decision applies to an empty chain")]
    NotApplicable,

    #[error("certificate {subject} expired at {not_after}")]
    Expired { subject: String, not_after: String },

    #[error("certificate {subject} is not valid before {not_before}")]
    NotYetValid { subject: String, not_before: String },

    #[error("malformed certificate chain: {0}")]
    Malformed(#[from] ChainError),

    #[error("chain link at index {at_index} failed: {cause}")]
    LinkFailed {
        at_index: usize,
        #[source]
        cause: LinkError,
    },

    #[error("certificate chain terminates at {subject}, which is not a trusted root")]
    UntrustedRoot { subject: String },

    #[error("certificate chain rejected by the pinned certificate: {cause}")]
    ChainRejected {
        #[source]
        cause: Box<TrustError>,
    },

    #[error("certificate chain rejected by the platform trust manager: {cause}")]
    DefaultRejected {
        #[source]
        cause: Box<TrustError>,
    },

    #[error("no trust decision possible: no pinned certificate and no platform trust manager")]
    NoTrustDecision,
}

impl TrustError {
    /// The innermost trust error, skipping `ChainRejected`/`DefaultRejected` wrappers.
    pub fn root_cause(&self) -> &TrustError {
        match self {
            TrustError::ChainRejected { cause } | TrustError::DefaultRejected { cause } => {
                cause.root_cause()
            }
            other => other,
        }
    }
}
