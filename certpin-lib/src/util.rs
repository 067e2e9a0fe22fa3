//! Shared formatting helpers.

use crate::oid;

/// Short attribute name for a distinguished name OID ("CN", "O", ...).
///
/// Unknown attribute types fall back to the dotted OID string.
pub(crate) fn oid_short_name(oid_str: &str) -> String {
    let short = match oid_str {
        oid::COMMON_NAME => "CN",
        oid::SURNAME => "SN",
        oid::SERIAL_NUMBER => "serialNumber",
        oid::COUNTRY => "C",
        oid::LOCALITY => "L",
        oid::STATE_OR_PROVINCE => "ST",
        oid::STREET_ADDRESS => "street",
        oid::ORGANIZATION => "O",
        oid::ORGANIZATIONAL_UNIT => "OU",
        oid::TITLE => "title",
        oid::POSTAL_CODE => "postalCode",
        oid::GIVEN_NAME => "GN",
        oid::EMAIL_ADDRESS => "emailAddress",
        oid::DOMAIN_COMPONENT => "DC",
        oid::USER_ID => "UID",
        other => return other.to_string(),
    };
    short.to_string()
}

/// Format bytes as colon-separated uppercase hex (e.g., "AB:CD:EF").
pub(crate) fn hex_colon_upper(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Render a Unix timestamp as an ISO 8601 UTC string.
///
/// Timestamps outside the representable range are rendered as plain seconds.
pub(crate) fn format_timestamp(ts: i64) -> String {
    match ::time::OffsetDateTime::from_unix_timestamp(ts) {
        Ok(dt) => format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            dt.year(),
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        ),
        Err(_) => format!("{}", ts),
    }
}

/// Current time as Unix seconds, or `at_time` when one is configured.
pub(crate) fn now_or(at_time: Option<i64>) -> i64 {
    at_time.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    })
}
