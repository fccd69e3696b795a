//! Canonical query strings and HMAC-SHA256 request signatures.
//!
//! The service recomputes the signature from the parameters it receives, so
//! the encoding used while signing must be byte-identical to the encoding of
//! the transmitted query string or form body. Both go through
//! `canonical_query_string`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;

use crate::params::CanonicalParams;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_METHOD: &str = "HmacSHA256";
pub const SIGNATURE_VERSION: &str = "2";

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Percent-encode a key or value. Space becomes `%20`, never `+`.
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, RFC3986).to_string()
}

/// Sort by key (byte order), encode, and join as `k=v&k=v`.
pub fn canonical_query_string(params: &CanonicalParams) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Signature version 2 string-to-sign.
pub fn string_to_sign(method: &str, host: &str, resource: &str, version: &str, query: &str) -> String {
    format!("{method}\n{host}\n/{resource}/{version}\n{query}")
}

/// Base64 HMAC-SHA256 of `string_to_sign` keyed with `secret_key`.
pub fn sign(string_to_sign: &str, secret_key: &str) -> String {
    // HMAC pads or hashes the key to the block size, so any length is valid.
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(string_to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}
