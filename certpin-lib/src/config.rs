//! Trust manager configuration.
//!
//! [`TrustConfig`] is what a [`crate::PinnedTrustManager`] is built from. It is
//! a plain value: the environment mode and the pinned certificate are handed
//! in by whoever constructs the manager and never change afterwards.
//! [`TrustSettings`] is the serialized form used by configuration files.

use crate::certificate::Certificate;
use crate::CertpinError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Process-wide deployment mode, consulted only when neither a pinned
/// certificate nor a platform trust manager is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvironmentMode {
    /// Development. Fails open: chains are trusted without any check.
    #[serde(alias = "debug")]
    PermissiveDebug,
    /// Demonstration setups. Fails open like [`EnvironmentMode::PermissiveDebug`].
    #[serde(alias = "demo")]
    PermissiveDemo,
    /// Production. Fails closed.
    #[default]
    #[serde(alias = "deployment")]
    StrictDeployment,
}

impl EnvironmentMode {
    /// Whether a chain is trusted when no trust decision can be made.
    pub fn is_permissive(self) -> bool {
        matches!(
            self,
            EnvironmentMode::PermissiveDebug | EnvironmentMode::PermissiveDemo
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnvironmentMode::PermissiveDebug => "permissive-debug",
            EnvironmentMode::PermissiveDemo => "permissive-demo",
            EnvironmentMode::StrictDeployment => "strict-deployment",
        }
    }
}

impl std::fmt::Display for EnvironmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentMode {
    type Err = CertpinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive-debug" | "debug" => Ok(EnvironmentMode::PermissiveDebug),
            "permissive-demo" | "demo" => Ok(EnvironmentMode::PermissiveDemo),
            "strict-deployment" | "deployment" => Ok(EnvironmentMode::StrictDeployment),
            other => Err(CertpinError::Config(format!(
                "unknown environment mode '{}' (expected debug, demo or deployment)",
                other
            ))),
        }
    }
}

/// How a chain is checked against the pinned certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Verify the leaf's signature with the pinned certificate's key. Assumes
    /// the pinned certificate issued the leaf directly; intermediates are ignored.
    #[serde(alias = "direct")]
    DirectLeafVerify,
    /// Order the chain and verify every link up to the pinned certificate.
    #[default]
    #[serde(alias = "full")]
    FullChainWalk,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::DirectLeafVerify => "direct-leaf-verify",
            Strategy::FullChainWalk => "full-chain-walk",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = CertpinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct-leaf-verify" | "direct" => Ok(Strategy::DirectLeafVerify),
            "full-chain-walk" | "full" => Ok(Strategy::FullChainWalk),
            other => Err(CertpinError::Config(format!(
                "unknown strategy '{}' (expected direct or full)",
                other
            ))),
        }
    }
}

/// Construction-time configuration of a [`crate::PinnedTrustManager`].
#[derive(Debug, Clone)]
pub struct TrustConfig {
    /// The pinned certificate, if any.
    pub anchor: Option<Certificate>,
    /// How chains are checked against `anchor`.
    pub strategy: Strategy,
    /// Fail-open / fail-closed policy when nothing else can decide.
    pub mode: EnvironmentMode,
    /// Use `anchor` as the root of chains that omit theirs
    /// (full chain walk only).
    pub assume_anchor_root: bool,
    /// Check validity windows at this Unix timestamp instead of now.
    pub at_time: Option<i64>,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            anchor: None,
            strategy: Strategy::default(),
            mode: EnvironmentMode::default(),
            assume_anchor_root: true,
            at_time: None,
        }
    }
}

impl TrustConfig {
    /// Configuration pinning `anchor` with default settings otherwise.
    pub fn pinned(anchor: Certificate) -> Self {
        Self {
            anchor: Some(anchor),
            ..Self::default()
        }
    }
}

/// Serialized trust configuration.
///
/// ```json
/// {
///   "pinned_certificate": "certs/root.pem",
///   "strategy": "full-chain-walk",
///   "mode": "deployment",
///   "assume_anchor_root": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrustSettings {
    /// PEM file holding the pinned certificate.
    pub pinned_certificate: Option<PathBuf>,
    pub strategy: Strategy,
    pub mode: EnvironmentMode,
    pub assume_anchor_root: bool,
    pub at_time: Option<i64>,
}

impl Default for TrustSettings {
    fn default() -> Self {
        Self {
            pinned_certificate: None,
            strategy: Strategy::default(),
            mode: EnvironmentMode::default(),
            assume_anchor_root: true,
            at_time: None,
        }
    }
}

impl TrustSettings {
    pub fn from_json_str(json: &str) -> Result<Self, CertpinError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file. A relative `pinned_certificate` path
    /// is resolved against the directory of the file.
    pub fn from_json_file(path: &Path) -> Result<Self, CertpinError> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            CertpinError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let mut settings = Self::from_json_str(&data)?;

        if let (Some(pinned), Some(dir)) = (settings.pinned_certificate.as_mut(), path.parent()) {
            if pinned.is_relative() {
                *pinned = dir.join(&*pinned);
            }
        }

        Ok(settings)
    }

    /// Read the pinned certificate (if any) and produce a [`TrustConfig`].
    pub fn resolve(&self) -> Result<TrustConfig, CertpinError> {
        let anchor = self
            .pinned_certificate
            .as_deref()
            .map(Certificate::from_pem_file)
            .transpose()?;

        Ok(TrustConfig {
            anchor,
            strategy: self.strategy,
            mode: self.mode,
            assume_anchor_root: self.assume_anchor_root,
            at_time: self.at_time,
        })
    }
}
