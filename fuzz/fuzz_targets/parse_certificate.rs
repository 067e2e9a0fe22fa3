#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Neither DER nor PEM parsing may panic, whatever the input.
    if let Ok(cert) = certpin_lib::Certificate::from_der(data) {
        let _ = cert.subject().to_oneline();
        let _ = cert.issuer().to_oneline();
        let _ = cert.subject().common_name();
        let _ = cert.fingerprint();
        let _ = cert.is_root();
        let _ = cert.is_valid_at(0);
        let _ = certpin_lib::link_trusted(&cert, &cert);
    }
    let _ = certpin_lib::Certificate::from_pem(data);
});
