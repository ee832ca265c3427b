use std::fmt;

use axum::http::HeaderMap;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

/// Who a request is counted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
    /// Hash of the caller's shared secret; the same caller is one identity
    /// from any address.
    Secret(String),
    Address(String),
    Unknown,
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientIdentity::Secret(hash) => write!(f, "secret:{hash}"),
            ClientIdentity::Address(ip) => write!(f, "ip:{ip}"),
            ClientIdentity::Unknown => f.write_str("unknown"),
        }
    }
}

/// 32-bit rolling string hash (`h = h * 31 + c`, wrapping) as 8 hex digits.
///
/// Not a security primitive: it only keeps raw secrets out of keys and logs.
pub fn secret_hash(secret: &str) -> String {
    let hash = secret
        .encode_utf16()
        .fold(0u32, |h, unit| {
            h.wrapping_mul(31).wrapping_add(u32::from(unit))
        });
    format!("{hash:08x}")
}

pub fn client_identity(headers: &HeaderMap) -> ClientIdentity {
    if let Some(auth) = headers.typed_get::<Authorization<Bearer>>() {
        let token = auth.token().trim();
        if !token.is_empty() {
            return ClientIdentity::Secret(secret_hash(token));
        }
    }

    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
        .map(|ip| ClientIdentity::Address(ip.to_string()))
        .unwrap_or(ClientIdentity::Unknown)
}
