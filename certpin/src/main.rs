//! certpin: Command-line tool for checking X.509 certificate chains against a
//! pinned certificate.

use anyhow::{Context, Result};
use certpin_lib::{
    Certificate, CertificateChain, EnvironmentMode, PinnedTrustManager, Role, StoreTrustManager,
    Strategy, TrustConfig, TrustError, TrustSettings, TrustStore, X509TrustManager,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "certpin",
    about = "Check X.509 certificate chains against a pinned certificate",
    long_about = "certpin makes the trust decision a TLS endpoint makes for a peer's\n\
                  certificate chain. With a pinned certificate the chain must lead to it;\n\
                  without one the platform trust store decides, and without either the\n\
                  environment mode decides whether to fail open or closed.\n\n\
                  All commands read a PEM chain from stdin when no file is given.",
    after_help = "EXAMPLES:\n\
                  \n  certpin check --anchor root.pem chain.pem\
                  \n  certpin check --anchor root.pem --strategy direct leaf.pem\
                  \n  certpin check --config trust.json --json chain.pem\
                  \n  CERTPIN_MODE=debug certpin check chain.pem\
                  \n  certpin order chain.pem\
                  \n  certpin issuers --anchor root.pem --CAfile ca.pem"
)]
struct Cli {
    /// Log trust decisions at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether a certificate chain is trusted (exit 0 = trusted, 2 = rejected)
    #[command(
        after_help = "CHAIN.pem holds the certificates as presented by the peer, normally\n\
                      leaf first. Order does not matter for the full chain walk.\n\
                      \nSTRATEGIES:\n\
                      \n  full     Order the chain and verify every link up to the pinned certificate\
                      \n  direct   Verify the leaf's signature with the pinned certificate's key\
                      \n\nMODES (only used without a pinned certificate and trust store):\n\
                      \n  debug        Trust the chain without verification\
                      \n  demo         Trust the chain without verification\
                      \n  deployment   Reject the chain (default)"
    )]
    Check {
        /// PEM file with the certificate chain. Reads from stdin if omitted.
        file: Option<PathBuf>,
        /// JSON trust settings file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// PEM file with the pinned certificate (overrides the settings file)
        #[arg(long, value_name = "FILE")]
        anchor: Option<PathBuf>,
        /// How the chain is checked against the pinned certificate: full, direct
        #[arg(long, value_name = "STRATEGY")]
        strategy: Option<Strategy>,
        /// Environment mode: debug, demo, deployment
        #[arg(long, env = "CERTPIN_MODE", value_name = "MODE")]
        mode: Option<EnvironmentMode>,
        /// Which side of the handshake presented the chain
        #[arg(long, value_enum, default_value = "server")]
        role: RoleArg,
        /// Authentication type reported by the handshake
        #[arg(long, default_value = "UNKNOWN", value_name = "TYPE")]
        auth_type: String,
        /// PEM file with trusted CA certificates (default: system trust store)
        #[arg(long = "CAfile", visible_alias = "ca-file", value_name = "FILE")]
        ca_file: Option<PathBuf>,
        /// Check validity at a specific Unix timestamp instead of current time
        #[arg(long, value_name = "EPOCH")]
        attime: Option<i64>,
        /// Do not use the pinned certificate as root of chains that omit theirs
        #[arg(long)]
        no_assume_root: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Print a certificate chain in leaf-to-root order
    Order {
        /// PEM file with the certificate chain. Reads from stdin if omitted.
        file: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// List the issuers a trust manager would accept
    Issuers {
        /// PEM file with the pinned certificate
        #[arg(long, value_name = "FILE")]
        anchor: Option<PathBuf>,
        /// PEM file with trusted CA certificates (default: system trust store)
        #[arg(long = "CAfile", visible_alias = "ca-file", value_name = "FILE")]
        ca_file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum RoleArg {
    Client,
    Server,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Client => Role::Client,
            RoleArg::Server => Role::Server,
        }
    }
}

/// Maximum file size for certificate inputs (10 MiB).
const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;

fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>> {
    match file {
        Some(path) => {
            let meta = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat file: {}", path.display()))?;
            if meta.len() > MAX_INPUT_BYTES {
                anyhow::bail!(
                    "File too large ({} bytes, max {} bytes): {}",
                    meta.len(),
                    MAX_INPUT_BYTES,
                    path.display()
                );
            }
            std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .take(MAX_INPUT_BYTES)
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn input_label(file: Option<&PathBuf>) -> String {
    file.map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdin".to_string())
}

fn read_chain(file: Option<&PathBuf>) -> Result<Vec<Certificate>> {
    let input = read_input(file)?;
    certpin_lib::parse_pem_chain(&input)
        .with_context(|| format!("Failed to parse certificate chain: {}", input_label(file)))
}

fn read_anchor(path: &Path) -> Result<Certificate> {
    Certificate::from_pem_file(path)
        .with_context(|| format!("Failed to load pinned certificate: {}", path.display()))
}

/// Command-line overrides applied on top of the settings file.
#[derive(Debug, Default)]
struct Overrides {
    anchor: Option<Certificate>,
    strategy: Option<Strategy>,
    mode: Option<EnvironmentMode>,
    at_time: Option<i64>,
    no_assume_root: bool,
}

fn build_config(settings: Option<&Path>, overrides: Overrides) -> Result<TrustConfig> {
    let mut config = match settings {
        Some(path) => TrustSettings::from_json_file(path)
            .and_then(|s| s.resolve())
            .with_context(|| format!("Failed to load trust settings: {}", path.display()))?,
        None => TrustConfig::default(),
    };

    if let Some(anchor) = overrides.anchor {
        config.anchor = Some(anchor);
    }
    if let Some(strategy) = overrides.strategy {
        config.strategy = strategy;
    }
    if let Some(mode) = overrides.mode {
        config.mode = mode;
    }
    if overrides.at_time.is_some() {
        config.at_time = overrides.at_time;
    }
    if overrides.no_assume_root {
        config.assume_anchor_root = false;
    }
    Ok(config)
}

/// Build the trust manager, using `ca_file` as the platform store when given.
fn build_manager(config: TrustConfig, ca_file: Option<&Path>) -> Result<PinnedTrustManager> {
    match ca_file {
        Some(path) => {
            let store = TrustStore::from_pem_file(path)
                .with_context(|| format!("Failed to load CA file: {}", path.display()))?;
            debug!(path = %path.display(), count = store.len(), "loaded CA file");
            let default: Arc<dyn X509TrustManager> =
                Arc::new(StoreTrustManager::new(store).at_time(config.at_time));
            Ok(PinnedTrustManager::with_default_manager(config, Some(default)))
        }
        None => Ok(PinnedTrustManager::new(config)),
    }
}

/// Outcome of `certpin check`, as printed with `--json`.
#[derive(Debug, Serialize)]
struct CheckReport {
    input: String,
    trusted: bool,
    leaf: Option<String>,
    chain_length: usize,
    pinned_certificate: Option<String>,
    strategy: String,
    mode: String,
    role: String,
    platform_trust_manager: bool,
    error: Option<String>,
    cause: Option<String>,
}

impl CheckReport {
    fn new(
        input: String,
        chain: &[Certificate],
        manager: &PinnedTrustManager,
        role: Role,
        result: &Result<(), TrustError>,
    ) -> Self {
        let (error, cause) = match result {
            Ok(()) => (None, None),
            Err(e) => (Some(e.to_string()), Some(e.root_cause().to_string())),
        };
        CheckReport {
            input,
            trusted: result.is_ok(),
            leaf: chain.first().map(|c| c.subject().to_oneline()),
            chain_length: chain.len(),
            pinned_certificate: manager.anchor().map(|a| a.fingerprint()),
            strategy: manager.strategy().to_string(),
            mode: manager.mode().to_string(),
            role: role.to_string(),
            platform_trust_manager: manager.has_default_manager(),
            error,
            cause,
        }
    }
}

/// Order view printed by `certpin order --json`.
#[derive(Debug, Serialize)]
struct OrderEntry {
    depth: usize,
    subject: String,
    issuer: String,
    sha256: String,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Check {
            file,
            config,
            anchor,
            strategy,
            mode,
            role,
            auth_type,
            ca_file,
            attime,
            no_assume_root,
            json,
        } => {
            let overrides = Overrides {
                anchor: anchor.as_deref().map(read_anchor).transpose()?,
                strategy: *strategy,
                mode: *mode,
                at_time: *attime,
                no_assume_root: *no_assume_root,
            };
            let trust_config = build_config(config.as_deref(), overrides)?;
            let manager = build_manager(trust_config, ca_file.as_deref())?;
            let chain = read_chain(file.as_ref())?;
            let role = Role::from(*role);

            let result = manager.check_trusted(&chain, auth_type, role);
            let label = input_label(file.as_ref());

            if *json {
                let report = CheckReport::new(label, &chain, &manager, role, &result);
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                match &result {
                    Ok(()) => println!("{}: OK", label),
                    Err(e) => eprintln!("{}: FAIL: {}", label, e),
                }
            }

            if result.is_err() {
                std::process::exit(2);
            }
        }
        Commands::Order { file, json } => {
            let chain = CertificateChain::from(read_chain(file.as_ref())?);
            let ordered = chain
                .ordered()
                .with_context(|| format!("Failed to order chain: {}", input_label(file.as_ref())))?;

            if *json {
                let entries: Vec<OrderEntry> = ordered
                    .iter()
                    .enumerate()
                    .map(|(depth, cert)| OrderEntry {
                        depth,
                        subject: cert.subject().to_oneline(),
                        issuer: cert.issuer().to_oneline(),
                        sha256: cert.fingerprint(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for (depth, cert) in ordered.iter().enumerate() {
                    println!(
                        "depth {}: subject = {}, issuer = {}",
                        depth,
                        cert.subject(),
                        cert.issuer()
                    );
                }
            }
        }
        Commands::Issuers { anchor, ca_file } => {
            let config = TrustConfig {
                anchor: anchor.as_deref().map(read_anchor).transpose()?,
                ..TrustConfig::default()
            };
            let manager = build_manager(config, ca_file.as_deref())?;
            for cert in manager.accepted_issuers() {
                println!("{}  {}", cert.fingerprint(), cert.subject());
            }
        }
    }

    Ok(())
}
