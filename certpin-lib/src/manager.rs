//! The trust manager handed to the secure transport layer.
//!
//! [`PinnedTrustManager`] decides in a fixed order:
//!
//! 1. an empty chain is rejected;
//! 2. the leaf must be inside its validity window;
//! 3. with a pinned certificate, the configured [`Strategy`] decides;
//! 4. without one, the platform default trust manager decides;
//! 5. without either, the [`EnvironmentMode`] fails open or closed.
//!
//! The environment mode is therefore only reachable when neither a pinned
//! certificate nor a platform trust manager exists.

use crate::certificate::Certificate;
use crate::config::{EnvironmentMode, Strategy, TrustConfig};
use crate::error::TrustError;
use crate::linker::{PublicKeyLinker, TrustLinker};
use crate::platform::SystemTrustManagerFactory;
use crate::util;
use crate::validator::ChainTrustValidator;
use crate::CertpinError;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Level};

/// Which side of the handshake presented the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The chain was presented by a client (we are the server).
    Client,
    /// The chain was presented by a server (we are the client).
    Server,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => f.write_str("client"),
            Role::Server => f.write_str("server"),
        }
    }
}

/// The trust-manager contract consumed by a secure transport layer.
///
/// Chains are passed exactly as received on the wire. `auth_type` is the
/// key exchange / authentication algorithm name reported by the handshake.
pub trait X509TrustManager: Send + Sync {
    /// Certificates whose issued chains this manager may accept.
    fn accepted_issuers(&self) -> Vec<Certificate>;

    fn check_client_trusted(&self, chain: &[Certificate], auth_type: &str)
        -> Result<(), TrustError>;

    fn check_server_trusted(&self, chain: &[Certificate], auth_type: &str)
        -> Result<(), TrustError>;
}

/// A trust manager offered by the platform.
#[derive(Clone)]
pub enum PlatformTrustManager {
    X509(Arc<dyn X509TrustManager>),
    /// A manager for something other than X.509 chains; never selected.
    Other { algorithm: String },
}

impl std::fmt::Debug for PlatformTrustManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformTrustManager::X509(_) => f.write_str("X509(..)"),
            PlatformTrustManager::Other { algorithm } => {
                f.debug_struct("Other").field("algorithm", algorithm).finish()
            }
        }
    }
}

/// Source of the platform's default trust managers.
pub trait TrustManagerFactory {
    fn trust_managers(&self) -> Result<Vec<PlatformTrustManager>, CertpinError>;
}

/// The first X.509 trust manager offered by `factory`.
///
/// A failing factory is not an error here: it means no default manager is
/// available, which the trust manager's policy handles.
pub fn find_x509_trust_manager(
    factory: &dyn TrustManagerFactory,
) -> Option<Arc<dyn X509TrustManager>> {
    match factory.trust_managers() {
        Ok(managers) => managers.into_iter().find_map(|manager| match manager {
            PlatformTrustManager::X509(manager) => Some(manager),
            PlatformTrustManager::Other { algorithm } => {
                debug!(%algorithm, "skipping non-X.509 trust manager");
                None
            }
        }),
        Err(e) => {
            warn!(error = %e, "no platform trust manager available");
            None
        }
    }
}

/// Check that `now` lies inside the certificate's validity window.
pub(crate) fn check_validity(cert: &Certificate, now: i64) -> Result<(), TrustError> {
    if cert.is_valid_at(now) {
        return Ok(());
    }
    if now < cert.not_before() {
        return Err(TrustError::NotYetValid {
            subject: cert.subject().to_oneline(),
            not_before: util::format_timestamp(cert.not_before()),
        });
    }
    Err(TrustError::Expired {
        subject: cert.subject().to_oneline(),
        not_after: util::format_timestamp(cert.not_after()),
    })
}

/// Trust manager pinning at most one trusted certificate, falling back to
/// the platform default trust manager and then to the environment mode.
///
/// All state is fixed at construction, so one instance can serve any number
/// of concurrent handshakes.
pub struct PinnedTrustManager {
    anchor: Option<Certificate>,
    strategy: Strategy,
    mode: EnvironmentMode,
    at_time: Option<i64>,
    validator: ChainTrustValidator,
    default_manager: Option<Arc<dyn X509TrustManager>>,
}

impl PinnedTrustManager {
    /// Build a trust manager, discovering the platform default manager from
    /// the system CA bundle.
    pub fn new(config: TrustConfig) -> Self {
        let factory = SystemTrustManagerFactory::new().at_time(config.at_time);
        Self::with_factory(config, &factory)
    }

    /// Build a trust manager, querying `factory` once for the default manager.
    pub fn with_factory(config: TrustConfig, factory: &dyn TrustManagerFactory) -> Self {
        let default_manager = find_x509_trust_manager(factory);
        Self::with_default_manager(config, default_manager)
    }

    /// Build a trust manager with an explicit (possibly absent) default manager.
    pub fn with_default_manager(
        config: TrustConfig,
        default_manager: Option<Arc<dyn X509TrustManager>>,
    ) -> Self {
        let validator = ChainTrustValidator::new().assume_anchor_root(config.assume_anchor_root);
        PinnedTrustManager {
            anchor: config.anchor,
            strategy: config.strategy,
            mode: config.mode,
            at_time: config.at_time,
            validator,
            default_manager,
        }
    }

    pub fn anchor(&self) -> Option<&Certificate> {
        self.anchor.as_ref()
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn mode(&self) -> EnvironmentMode {
        self.mode
    }

    pub fn has_default_manager(&self) -> bool {
        self.default_manager.is_some()
    }

    /// The default manager's accepted issuers plus the pinned certificate.
    pub fn accepted_issuers(&self) -> Vec<Certificate> {
        let mut issuers = self
            .default_manager
            .as_ref()
            .map(|manager| manager.accepted_issuers())
            .unwrap_or_default();
        if let Some(anchor) = &self.anchor {
            issuers.push(anchor.clone());
        }
        issuers
    }

    /// Decide whether `chain`, presented by a peer acting as `role`, is trusted.
    pub fn check_trusted(
        &self,
        chain: &[Certificate],
        auth_type: &str,
        role: Role,
    ) -> Result<(), TrustError> {
        let Some(leaf) = chain.first() else {
            debug!(%role, auth_type, "rejecting empty certificate chain");
            return Err(TrustError::EmptyChain);
        };

        if tracing::enabled!(Level::INFO) {
            let pinned = self
                .anchor
                .as_ref()
                .map(|a| a.fingerprint())
                .unwrap_or_else(|| "none".to_string());
            info!(
                leaf = %leaf.subject(),
                chain_len = chain.len(),
                auth_type,
                %role,
                %pinned,
                "checking whether certificate chain is trusted"
            );
        }

        check_validity(leaf, util::now_or(self.at_time))?;

        if let Some(anchor) = &self.anchor {
            return self.check_pinned(chain, leaf, anchor).map_err(|cause| {
                error!(
                    error = %cause,
                    leaf = %leaf.subject(),
                    pinned = %anchor.subject(),
                    "certificate chain did not validate against the pinned certificate"
                );
                TrustError::ChainRejected {
                    cause: Box::new(cause),
                }
            });
        }

        if let Some(default_manager) = &self.default_manager {
            let result = match role {
                Role::Client => default_manager.check_client_trusted(chain, auth_type),
                Role::Server => default_manager.check_server_trusted(chain, auth_type),
            };
            return result.map_err(|cause| TrustError::DefaultRejected {
                cause: Box::new(cause),
            });
        }

        if self.mode.is_permissive() {
            warn!(
                mode = %self.mode,
                leaf = %leaf.subject(),
                "no pinned certificate and no platform trust manager, trusting chain without verification"
            );
            Ok(())
        } else {
            Err(TrustError::NoTrustDecision)
        }
    }

    fn check_pinned(
        &self,
        chain: &[Certificate],
        leaf: &Certificate,
        anchor: &Certificate,
    ) -> Result<(), TrustError> {
        match self.strategy {
            Strategy::DirectLeafVerify => PublicKeyLinker
                .link_trusted(leaf, anchor)
                .map_err(|cause| TrustError::LinkFailed { at_index: 0, cause }),
            Strategy::FullChainWalk => {
                let trusted = self.validator.validate(chain, anchor)?;
                debug!(
                    depth = trusted.chain().len(),
                    assumed_root = trusted.assumed_root(),
                    "chain walk succeeded"
                );
                Ok(())
            }
        }
    }
}

impl X509TrustManager for PinnedTrustManager {
    fn accepted_issuers(&self) -> Vec<Certificate> {
        PinnedTrustManager::accepted_issuers(self)
    }

    fn check_client_trusted(
        &self,
        chain: &[Certificate],
        auth_type: &str,
    ) -> Result<(), TrustError> {
        self.check_trusted(chain, auth_type, Role::Client)
    }

    fn check_server_trusted(
        &self,
        chain: &[Certificate],
        auth_type: &str,
    ) -> Result<(), TrustError> {
        self.check_trusted(chain, auth_type, Role::Server)
    }
}

impl std::fmt::Debug for PinnedTrustManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedTrustManager")
            .field("anchor", &self.anchor.as_ref().map(|a| a.subject()))
            .field("strategy", &self.strategy)
            .field("mode", &self.mode)
            .field("at_time", &self.at_time)
            .field("has_default_manager", &self.default_manager.is_some())
            .finish()
    }
}
