//! certpin-lib: Trust decisions for X.509 certificate chains presented by a peer.
//!
//! A [`PinnedTrustManager`] decides whether a chain received during a secure
//! channel handshake is trusted. When a pinned certificate is configured the
//! chain is checked against it, either directly or with a full chain walk.
//! Without a pinned certificate the decision is delegated to the platform's
//! default trust manager, and when that is unavailable too, the configured
//! [`EnvironmentMode`] decides between failing open and failing closed.

mod certificate;
mod chain;
mod config;
mod error;
mod linker;
mod manager;
mod oid;
mod platform;
mod util;
mod validator;

pub use certificate::{parse_pem_chain, Certificate, DistinguishedName};
pub use chain::{has_root, is_root, CertificateChain, ChainError, OrderedChain, MAX_CHAIN_DEPTH};
pub use config::{EnvironmentMode, Strategy, TrustConfig, TrustSettings};
pub use error::TrustError;
pub use linker::{link_trusted, LinkError, PublicKeyLinker, TrustLinker};
pub use manager::{
    find_x509_trust_manager, PinnedTrustManager, PlatformTrustManager, Role, TrustManagerFactory,
    X509TrustManager,
};
pub use platform::{
    find_system_ca_bundle, StoreTrustManager, SystemTrustManagerFactory, TrustStore,
};
pub use validator::{ChainTrustValidator, Trusted};

/// Errors returned by certpin-lib outside of trust decisions.
#[derive(Debug, thiserror::Error)]
pub enum CertpinError {
    #[error("Invalid PEM format: {0}")]
    PemError(String),

    #[error("Invalid DER format: {0}")]
    DerError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Trust store error: {0}")]
    TrustStore(String),
}
