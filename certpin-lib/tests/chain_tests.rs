#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Chain model: root detection, root completion and ordering.

mod common;

use certpin_lib::*;
use common::*;

#[test]
fn self_issued_certificate_is_root() {
    let h = Hierarchy::new("roots");
    assert!(is_root(&h.root.certificate()));
    assert!(!is_root(&h.intermediate.certificate()));
    assert!(!is_root(&h.leaf.certificate()));
}

#[test]
fn has_root_detects_any_member() {
    let h = Hierarchy::new("has-root");
    assert!(has_root(&h.full_chain()));
    assert!(!has_root(&h.chain_without_root()));
    assert!(!has_root(&[]));
}

#[test]
fn append_root_adds_anchor_once() {
    let h = Hierarchy::new("append");
    let mut chain = CertificateChain::from(h.chain_without_root());

    assert!(chain.append_root(&h.root.certificate()));
    assert_eq!(chain.len(), 3);
    assert!(chain.has_root());

    assert!(!chain.append_root(&h.root.certificate()));
    assert_eq!(chain.len(), 3);
}

#[test]
fn append_root_is_noop_when_root_present() {
    let h = Hierarchy::new("append-noop");
    let other = root("append-noop Other Root");
    let mut chain = CertificateChain::from(h.full_chain());

    assert!(!chain.append_root(&other.certificate()));
    assert_eq!(chain.certificates(), h.full_chain().as_slice());
}

#[test]
fn ordered_sorts_shuffled_chain_leaf_first() {
    let h = Hierarchy::new("shuffle");
    let shuffled = vec![
        h.root.certificate(),
        h.leaf.certificate(),
        h.intermediate.certificate(),
    ];

    let ordered = CertificateChain::from(shuffled).ordered().unwrap();

    assert_eq!(ordered.certificates(), h.full_chain().as_slice());
    assert_eq!(ordered.leaf(), &h.leaf.certificate());
    assert_eq!(ordered.root(), &h.root.certificate());
}

#[test]
fn ordering_is_idempotent() {
    let h = Hierarchy::new("idempotent");
    let chain = CertificateChain::from(vec![
        h.intermediate.certificate(),
        h.root.certificate(),
        h.leaf.certificate(),
    ]);

    let once = chain.ordered().unwrap();
    let twice = CertificateChain::from(once.clone()).ordered().unwrap();

    assert_eq!(once, twice);
}

#[test]
fn single_certificate_is_trivially_ordered() {
    let r = root("single");
    let ordered = CertificateChain::from(vec![r.certificate()])
        .ordered()
        .unwrap();

    assert_eq!(ordered.len(), 1);
    assert_eq!(ordered.leaf(), ordered.root());
    assert_eq!(ordered.links().count(), 0);
}

#[test]
fn duplicates_are_dropped_without_looping() {
    let h = Hierarchy::new("dupes");
    let chain = CertificateChain::from(vec![
        h.leaf.certificate(),
        h.intermediate.certificate(),
        h.intermediate.certificate(),
        h.root.certificate(),
        h.leaf.certificate(),
        h.root.certificate(),
    ]);

    let ordered = chain.ordered().unwrap();
    assert_eq!(ordered.certificates(), h.full_chain().as_slice());
}

#[test]
fn missing_intermediate_is_disconnected() {
    let h = Hierarchy::new("gap");
    let chain = CertificateChain::from(vec![h.leaf.certificate(), h.root.certificate()]);

    match chain.ordered() {
        Err(ChainError::Disconnected { subject, issuer }) => {
            assert!(subject.contains("gap.example.test"), "{subject}");
            assert!(issuer.contains("gap Intermediate CA"), "{issuer}");
        }
        other => panic!("expected Disconnected, got {:?}", other),
    }
}

#[test]
fn chain_without_root_does_not_order() {
    let h = Hierarchy::new("rootless");
    let err = CertificateChain::from(h.chain_without_root())
        .ordered()
        .unwrap_err();
    assert!(matches!(err, ChainError::Disconnected { .. }));
}

#[test]
fn stray_certificate_is_disconnected() {
    let h = Hierarchy::new("stray");
    let stray = root("stray Unrelated Root");
    let mut certs = h.full_chain();
    certs.push(stray.certificate());

    let err = CertificateChain::from(certs).ordered().unwrap_err();
    match err {
        ChainError::Disconnected { subject, .. } => {
            assert!(subject.contains("stray Unrelated Root"), "{subject}")
        }
        other => panic!("expected Disconnected, got {:?}", other),
    }
}

#[test]
fn empty_chain_cannot_be_ordered() {
    assert_eq!(
        CertificateChain::default().ordered().unwrap_err(),
        ChainError::Empty
    );
}

#[test]
fn overlong_chain_is_rejected() {
    let certs: Vec<Certificate> = (0..=MAX_CHAIN_DEPTH)
        .map(|i| root(&format!("long {i}")).certificate())
        .collect();

    assert_eq!(
        CertificateChain::from(certs).ordered().unwrap_err(),
        ChainError::TooLong {
            len: MAX_CHAIN_DEPTH + 1,
            max: MAX_CHAIN_DEPTH
        }
    );
}

#[test]
fn links_pair_each_child_with_its_issuer() {
    let h = Hierarchy::new("links");
    let ordered = CertificateChain::from(h.full_chain()).ordered().unwrap();

    let links: Vec<(usize, String, String)> = ordered
        .links()
        .map(|(i, child, parent)| {
            (
                i,
                child.subject().common_name().unwrap().to_string(),
                parent.subject().common_name().unwrap().to_string(),
            )
        })
        .collect();

    assert_eq!(
        links,
        vec![
            (
                0,
                "links.example.test".to_string(),
                "links Intermediate CA".to_string()
            ),
            (
                1,
                "links Intermediate CA".to_string(),
                "links Root CA".to_string()
            ),
        ]
    );
}

#[test]
fn dangling_reports_certificate_with_missing_issuer() {
    let h = Hierarchy::new("dangling");
    let chain = CertificateChain::from(h.chain_without_root());

    let dangling: Vec<&Certificate> = chain.dangling().collect();
    assert_eq!(dangling, vec![&h.intermediate.certificate()]);

    let complete = CertificateChain::from(h.full_chain());
    assert_eq!(complete.dangling().count(), 0);
}

#[test]
fn pem_chain_parses_in_input_order() {
    let h = Hierarchy::new("pem");
    let pem = format!("{}{}{}", h.leaf.pem(), h.intermediate.pem(), h.root.pem());

    let certs = parse_pem_chain(pem.as_bytes()).unwrap();
    assert_eq!(certs, h.full_chain());
}

#[test]
fn pem_chain_tolerates_trailing_garbage() {
    let h = Hierarchy::new("trailing");
    let pem = format!("{}-----BEGIN CERTIFICATE-----\nnot base64", h.leaf.pem());

    let certs = parse_pem_chain(pem.as_bytes()).unwrap();
    assert_eq!(certs, vec![h.leaf.certificate()]);
}

#[test]
fn pem_chain_without_certificates_is_an_error() {
    assert!(parse_pem_chain(b"").is_err());
    assert!(parse_pem_chain(b"hello world").is_err());
}

#[test]
fn certificate_exposes_names_and_validity() {
    let h = Hierarchy::new("attrs");
    let leaf = h.leaf.certificate();

    assert_eq!(leaf.subject().common_name(), Some("attrs.example.test"));
    assert_eq!(leaf.issuer(), h.intermediate.certificate().subject());
    assert_eq!(
        leaf.subject().to_oneline(),
        "O = certpin tests, CN = attrs.example.test"
    );
    assert!(leaf.not_before() < leaf.not_after());
    assert!(leaf.is_valid_at(leaf.not_before()));
    assert!(!leaf.is_valid_at(leaf.not_after() + 1));
    assert_eq!(leaf.fingerprint().len(), 32 * 3 - 1);
}

#[test]
fn certificate_from_pem_matches_der() {
    let r = root("from-pem");
    assert_eq!(
        Certificate::from_pem(r.pem().as_bytes()).unwrap(),
        r.certificate()
    );
    assert!(Certificate::from_der(&[0x30, 0x03, 0x01, 0x02, 0x03]).is_err());
}
