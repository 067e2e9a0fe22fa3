//! Full chain walk against a single pinned trust anchor.

use crate::certificate::Certificate;
use crate::chain::{CertificateChain, OrderedChain};
use crate::error::TrustError;
use crate::linker::{PublicKeyLinker, TrustLinker};
use tracing::debug;

/// A chain that validated against the anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trusted {
    chain: OrderedChain,
    assumed_root: bool,
}

impl Trusted {
    /// The validated chain, leaf first.
    pub fn chain(&self) -> &OrderedChain {
        &self.chain
    }

    /// Whether the peer omitted its root and the anchor was used in its place.
    pub fn assumed_root(&self) -> bool {
        self.assumed_root
    }
}

/// Validates whole chains against a configured anchor.
///
/// The result depends only on the chain and the anchor: there is no caching
/// and no I/O.
#[derive(Debug, Clone)]
pub struct ChainTrustValidator<L = PublicKeyLinker> {
    linker: L,
    assume_anchor_root: bool,
}

impl ChainTrustValidator {
    pub fn new() -> Self {
        Self::with_linker(PublicKeyLinker)
    }
}

impl Default for ChainTrustValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: TrustLinker> ChainTrustValidator<L> {
    pub fn with_linker(linker: L) -> Self {
        ChainTrustValidator {
            linker,
            assume_anchor_root: true,
        }
    }

    /// When the chain contains no self-issued certificate, treat the anchor
    /// as its root (enabled by default). The appended anchor still has to
    /// verify the signature of the topmost certificate.
    #[must_use]
    pub fn assume_anchor_root(mut self, enabled: bool) -> Self {
        self.assume_anchor_root = enabled;
        self
    }

    /// Decide whether `raw_chain` is trusted by `anchor`.
    ///
    /// An empty chain is [`TrustError::NotApplicable`]. Otherwise the chain is
    /// ordered, each adjacent pair is linked from leaf to root (the first
    /// failure aborts the walk), and the root must be the anchor itself.
    pub fn validate(
        &self,
        raw_chain: &[Certificate],
        anchor: &Certificate,
    ) -> Result<Trusted, TrustError> {
        if raw_chain.is_empty() {
            return Err(TrustError::NotApplicable);
        }

        let mut chain = CertificateChain::from(raw_chain);
        let assumed_root = self.assume_anchor_root && chain.append_root(anchor);
        if assumed_root {
            debug!(anchor = %anchor.subject(), "chain has no root, assuming the pinned certificate");
        }

        let ordered = chain.ordered()?;

        for (at_index, child, parent) in ordered.links() {
            self.linker
                .link_trusted(child, parent)
                .map_err(|cause| TrustError::LinkFailed { at_index, cause })?;
        }

        if ordered.root() != anchor {
            return Err(TrustError::UntrustedRoot {
                subject: ordered.root().subject().to_oneline(),
            });
        }

        debug!(
            leaf = %ordered.leaf().subject(),
            depth = ordered.len(),
            "chain validated against pinned certificate"
        );

        Ok(Trusted {
            chain: ordered,
            assumed_root,
        })
    }
}
