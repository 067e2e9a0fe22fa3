#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! System trust store discovery. Kept in its own test binary because it
//! points `SSL_CERT_FILE` at a generated bundle.

mod common;

use certpin_lib::*;
use common::*;
use std::fs;

#[test]
fn system_store_follows_ssl_cert_file() {
    let dir = tempfile::tempdir().unwrap();
    let h = Hierarchy::new("system");
    let bundle = dir.path().join("ca-bundle.pem");
    fs::write(&bundle, h.root.pem()).unwrap();
    std::env::set_var("SSL_CERT_FILE", &bundle);

    assert_eq!(find_system_ca_bundle(), Some(bundle.clone()));

    let store = TrustStore::system().unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.contains(&h.root.certificate()));

    let managers = SystemTrustManagerFactory::new().trust_managers().unwrap();
    assert_eq!(managers.len(), 1);
    match &managers[0] {
        PlatformTrustManager::X509(manager) => {
            assert!(manager.accepted_issuers().contains(&h.root.certificate()));
        }
        other => panic!("expected an X.509 trust manager, got {:?}", other),
    }

    let manager = PinnedTrustManager::new(TrustConfig::default());
    assert!(manager.has_default_manager());
    assert_eq!(manager.accepted_issuers(), vec![h.root.certificate()]);
    manager
        .check_trusted(&h.chain_without_root(), "ECDHE_ECDSA", Role::Server)
        .unwrap();

    let foreign = Hierarchy::new("system-foreign");
    assert!(matches!(
        manager.check_trusted(&foreign.full_chain(), "ECDHE_ECDSA", Role::Server),
        Err(TrustError::DefaultRejected { .. })
    ));

    std::env::remove_var("SSL_CERT_FILE");
}
