//! Connection identity for configuration URIs.
//!
//! Two URIs describe the same endpoint when their [`CanonicalKey`]s are equal,
//! whatever their display name, query-parameter order or base64 padding.
//! Keys are only ever used for set membership and are never rendered.

use std::borrow::Cow;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

use crate::domain::split_fragment;

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    VMess,
    VLess,
    Trojan,
    Shadowsocks,
}

impl Scheme {
    pub fn prefix(self) -> &'static str {
        match self {
            Scheme::VMess => "vmess://",
            Scheme::VLess => "vless://",
            Scheme::Trojan => "trojan://",
            Scheme::Shadowsocks => "ss://",
        }
    }

    /// The scheme a URI starts with, if it is one of the supported four.
    pub fn of(uri: &str) -> Option<Self> {
        [Scheme::VMess, Scheme::VLess, Scheme::Trojan, Scheme::Shadowsocks]
            .into_iter()
            .find(|scheme| uri.starts_with(scheme.prefix()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VmessIdentity {
    pub address: String,
    pub port: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VlessIdentity {
    pub user: String,
    pub host: String,
    pub port: Option<u16>,
    pub security: String,
    pub sni: String,
    pub fp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrojanIdentity {
    pub user: String,
    pub host: String,
    pub port: Option<u16>,
    pub security: String,
    pub sni: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShadowsocksIdentity {
    pub method: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

/// Scheme-specific identity of a configuration URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonicalKey {
    VMess(VmessIdentity),
    VLess(VlessIdentity),
    Trojan(TrojanIdentity),
    Shadowsocks(ShadowsocksIdentity),
}

impl CanonicalKey {
    pub fn scheme(&self) -> Scheme {
        match self {
            CanonicalKey::VMess(_) => Scheme::VMess,
            CanonicalKey::VLess(_) => Scheme::VLess,
            CanonicalKey::Trojan(_) => Scheme::Trojan,
            CanonicalKey::Shadowsocks(_) => Scheme::Shadowsocks,
        }
    }

    /// Short hex digest of the key, for log lines.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self).as_bytes());
        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(12);
        digest
    }
}

/// Why a URI has no identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("unsupported scheme")]
    UnsupportedScheme,

    #[error("invalid base64 payload")]
    Base64,

    #[error("payload is not valid UTF-8")]
    Utf8,

    #[error("invalid JSON payload: {0}")]
    Json(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("missing `{0}` delimiter")]
    MissingDelimiter(char),

    #[error("invalid port `{0}`")]
    InvalidPort(String),

    #[error("missing host")]
    MissingHost,

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Derive the identity of `uri`, or `None` when it cannot be parsed.
pub fn canonicalize(uri: &str) -> Option<CanonicalKey> {
    match try_canonicalize(uri) {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::trace!("No identity for {}: {}", uri, e);
            None
        }
    }
}

pub fn try_canonicalize(uri: &str) -> Result<CanonicalKey, KeyError> {
    let uri = uri.trim();
    match Scheme::of(uri).ok_or(KeyError::UnsupportedScheme)? {
        Scheme::VMess => vmess(&uri[Scheme::VMess.prefix().len()..]),
        Scheme::VLess => {
            let url = Url::parse(uri)?;
            Ok(CanonicalKey::VLess(VlessIdentity {
                user: url.username().to_string(),
                host: host_of(&url)?,
                port: url.port(),
                security: query_param(&url, "security"),
                sni: query_param(&url, "sni"),
                fp: query_param(&url, "fp"),
            }))
        }
        Scheme::Trojan => {
            let url = Url::parse(uri)?;
            Ok(CanonicalKey::Trojan(TrojanIdentity {
                user: url.username().to_string(),
                host: host_of(&url)?,
                port: url.port(),
                security: query_param(&url, "security"),
                sni: query_param(&url, "sni"),
            }))
        }
        Scheme::Shadowsocks => shadowsocks(&uri[Scheme::Shadowsocks.prefix().len()..]),
    }
}

/// Decode base64 in either alphabet, ignoring missing or surplus padding.
pub fn decode_base64(input: &str) -> Option<Vec<u8>> {
    let input = input.trim().trim_end_matches('=');
    if input.is_empty() {
        return None;
    }
    STANDARD_LENIENT
        .decode(input)
        .or_else(|_| URL_SAFE_LENIENT.decode(input))
        .ok()
}

fn vmess(body: &str) -> Result<CanonicalKey, KeyError> {
    let body = split_fragment(body).0;
    let decoded = decode_base64(body).ok_or(KeyError::Base64)?;
    let json: serde_json::Value =
        serde_json::from_slice(&decoded).map_err(|e| KeyError::Json(e.to_string()))?;
    let obj = json
        .as_object()
        .ok_or_else(|| KeyError::Json("expected an object".into()))?;

    let field = |name: &'static str| -> Result<String, KeyError> {
        match obj.get(name) {
            Some(serde_json::Value::String(s)) => Ok(s.trim().to_string()),
            Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
            _ => Err(KeyError::MissingField(name)),
        }
    };

    Ok(CanonicalKey::VMess(VmessIdentity {
        address: field("add")?.to_lowercase(),
        port: field("port")?,
        id: field("id")?,
    }))
}

fn shadowsocks(body: &str) -> Result<CanonicalKey, KeyError> {
    let body = split_fragment(body).0;

    // Legacy links encode `method:password@host:port` as a whole.
    let body: Cow<'_, str> = if body.contains('@') {
        Cow::Borrowed(body)
    } else {
        let decoded = decode_base64(body).ok_or(KeyError::Base64)?;
        Cow::Owned(String::from_utf8(decoded).map_err(|_| KeyError::Utf8)?)
    };

    let (userinfo, address) = body
        .rsplit_once('@')
        .ok_or(KeyError::MissingDelimiter('@'))?;
    let credentials = decode_userinfo(userinfo);
    let (method, password) = credentials
        .split_once(':')
        .ok_or(KeyError::MissingDelimiter(':'))?;

    let address = address.split(['/', '?']).next().unwrap_or(address);
    let (host, port) = address
        .rsplit_once(':')
        .ok_or(KeyError::MissingDelimiter(':'))?;
    if host.is_empty() {
        return Err(KeyError::MissingHost);
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| KeyError::InvalidPort(port.to_string()))?;

    Ok(CanonicalKey::Shadowsocks(ShadowsocksIdentity {
        method: method.to_string(),
        password: password.to_string(),
        host: host.to_lowercase(),
        port,
    }))
}

/// `method:password`, either base64-encoded or plain (percent-encoded).
fn decode_userinfo(userinfo: &str) -> String {
    if let Some(decoded) = decode_base64(userinfo) {
        if let Ok(text) = String::from_utf8(decoded) {
            if text.contains(':') {
                return text;
            }
        }
    }
    urlencoding::decode(userinfo)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| userinfo.to_string())
}

fn host_of(url: &Url) -> Result<String, KeyError> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_lowercase)
        .ok_or(KeyError::MissingHost)
}

/// First non-empty value of a query parameter, or `""`.
fn query_param(url: &Url, name: &str) -> String {
    url.query_pairs()
        .find(|(k, v)| k == name && !v.is_empty())
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VMESS: &str = "vmess://eyJ2IjoiMiIsInBzIjoibm9kZSIsImFkZCI6IjEuMi4zLjQiLCJwb3J0IjoiNDQzIiwiaWQiOiIxMTExMTExMS0yMjIyLTMzMzMtNDQ0NC01NTU1NTU1NTU1NTUiLCJuZXQiOiJ3cyIsInRscyI6InRscyJ9";
    // Same endpoint, different `ps` and a numeric port.
    const VMESS_RENAMED: &str = "vmess://eyJ2IjoiMiIsInBzIjoicmVuYW1lZCBub2RlIiwiYWRkIjoiMS4yLjMuNCIsInBvcnQiOjQ0MywiaWQiOiIxMTExMTExMS0yMjIyLTMzMzMtNDQ0NC01NTU1NTU1NTU1NTUiLCJuZXQiOiJ3cyIsInRscyI6InRscyJ9";

    #[test]
    fn test_vmess_identity() {
        let key = canonicalize(VMESS).unwrap();
        assert_eq!(
            key,
            CanonicalKey::VMess(VmessIdentity {
                address: "1.2.3.4".into(),
                port: "443".into(),
                id: "11111111-2222-3333-4444-555555555555".into(),
            })
        );
    }

    #[test]
    fn test_vmess_ignores_name_and_port_type() {
        assert_eq!(canonicalize(VMESS), canonicalize(VMESS_RENAMED));
    }

    #[test]
    fn test_vmess_padding_insensitive() {
        let padded = format!("{}==", VMESS);
        assert_eq!(canonicalize(VMESS), canonicalize(&padded));
    }

    #[test]
    fn test_vmess_invalid_base64() {
        assert_eq!(try_canonicalize("vmess://%%%"), Err(KeyError::Base64));
        assert_eq!(canonicalize("vmess://A"), None);
    }

    #[test]
    fn test_vmess_missing_field() {
        // {"add":"1.2.3.4","port":"443"}
        assert_eq!(
            try_canonicalize("vmess://eyJhZGQiOiIxLjIuMy40IiwicG9ydCI6IjQ0MyJ9"),
            Err(KeyError::MissingField("id"))
        );
    }

    #[test]
    fn test_vless_query_order_and_fragment() {
        let a = canonicalize("vless://user@Host.example:443?security=tls&sni=example.com&type=ws#one");
        let b = canonicalize("vless://user@host.example:443?type=grpc&sni=example.com&security=tls#two");
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_vless_missing_params_default_empty() {
        let key = canonicalize("vless://user@host:443").unwrap();
        assert_eq!(
            key,
            CanonicalKey::VLess(VlessIdentity {
                user: "user".into(),
                host: "host".into(),
                port: Some(443),
                security: String::new(),
                sni: String::new(),
                fp: String::new(),
            })
        );
    }

    #[test]
    fn test_vless_fingerprint_param_distinguishes() {
        let a = canonicalize("vless://u@h:443?security=reality&fp=chrome");
        let b = canonicalize("vless://u@h:443?security=reality&fp=firefox");
        assert_ne!(a, b);
    }

    #[test]
    fn test_vless_non_numeric_port() {
        assert!(canonicalize("vless://user@host:abc?security=tls").is_none());
    }

    #[test]
    fn test_trojan_identity() {
        let a = canonicalize("trojan://secret@server.com:443?sni=example.com&security=tls#A");
        let b = canonicalize("trojan://secret@server.com:443?security=tls&sni=example.com#B");
        assert_eq!(a, b);
        assert_eq!(a.unwrap().scheme(), Scheme::Trojan);
    }

    #[test]
    fn test_trojan_and_vless_never_collide() {
        let a = canonicalize("trojan://u@h:443?security=tls");
        let b = canonicalize("vless://u@h:443?security=tls");
        assert_ne!(a, b);
    }

    #[test]
    fn test_ss_plain_and_base64_userinfo_match() {
        let plain = canonicalize("ss://aes-256-gcm:p@ss@1.2.3.4:443#plain").unwrap();
        let encoded = canonicalize("ss://YWVzLTI1Ni1nY206cEBzcw==@1.2.3.4:443#encoded").unwrap();
        let unpadded = canonicalize("ss://YWVzLTI1Ni1nY206cEBzcw@1.2.3.4:443").unwrap();
        let expected = CanonicalKey::Shadowsocks(ShadowsocksIdentity {
            method: "aes-256-gcm".into(),
            password: "p@ss".into(),
            host: "1.2.3.4".into(),
            port: 443,
        });
        assert_eq!(plain, expected);
        assert_eq!(encoded, expected);
        assert_eq!(unpadded, expected);
    }

    #[test]
    fn test_ss_legacy_whole_body_base64() {
        let legacy = canonicalize("ss://YWVzLTI1Ni1nY206cEBzc0AxLjIuMy40OjQ0Mw==#old").unwrap();
        let modern = canonicalize("ss://aes-256-gcm:p%40ss@1.2.3.4:443").unwrap();
        assert_eq!(legacy, modern);
    }

    #[test]
    fn test_ss_plugin_suffix_ignored() {
        let a = canonicalize("ss://YWVzLTI1Ni1nY206cEBzcw@1.2.3.4:443/?plugin=obfs");
        let b = canonicalize("ss://YWVzLTI1Ni1nY206cEBzcw@1.2.3.4:443");
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_ss_failures() {
        assert_eq!(
            try_canonicalize("ss://aes-256-gcm:pw@1.2.3.4:port"),
            Err(KeyError::InvalidPort("port".into()))
        );
        assert_eq!(
            try_canonicalize("ss://aes-256-gcm:pw@1.2.3.4"),
            Err(KeyError::MissingDelimiter(':'))
        );
        assert!(canonicalize("ss://!!!").is_none());
        assert!(canonicalize("ss://nocolon@1.2.3.4:443").is_none());
    }

    #[test]
    fn test_unsupported_scheme() {
        assert_eq!(
            try_canonicalize("https://example.com"),
            Err(KeyError::UnsupportedScheme)
        );
    }

    #[test]
    fn test_fingerprint_stable_and_short() {
        let a = canonicalize(VMESS).unwrap();
        let b = canonicalize(VMESS_RENAMED).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 12);
    }

    #[test]
    fn test_decode_base64_url_safe() {
        assert_eq!(decode_base64("-_8"), Some(vec![0xfb, 0xff]));
        assert_eq!(decode_base64("dGVzdA"), Some(b"test".to_vec()));
        assert_eq!(decode_base64(""), None);
    }
}
