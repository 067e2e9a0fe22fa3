#![no_main]

use certpin_lib::{CertificateChain, ChainTrustValidator};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(certs) = certpin_lib::parse_pem_chain(data) else {
        return;
    };

    let chain = CertificateChain::from(certs.clone());
    let _ = chain.dangling().count();
    if let Ok(ordered) = chain.ordered() {
        assert!(ordered.root().is_root());
        for (_, child, parent) in ordered.links() {
            assert_eq!(child.issuer(), parent.subject());
        }
    }

    if let Some(anchor) = certs.last() {
        let _ = ChainTrustValidator::new().validate(&certs, anchor);
    }
});
