//! Cookie translation
//!
//! Callers may supply cookies either as structured records or as raw
//! `Set-Cookie`-style header strings. Both forms are translated into
//! chromiumoxide [`CookieParam`]s before navigation. Cookies without an
//! explicit domain are anchored to the target URL, or to a neutral origin
//! when capturing literal HTML.

use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, TimeSinceEpoch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CookieError, Result};

/// Origin cookies are anchored to when capturing literal HTML
const NEUTRAL_ORIGIN: &str = "http://localhost/";

/// A cookie as supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CookieSpec {
    /// Raw `Set-Cookie`-style string, e.g. `"session=abc; Domain=example.com"`
    Header(String),
    /// Structured record, passed through to the protocol layer
    Record(CookieRecord),
}

impl From<&str> for CookieSpec {
    fn from(raw: &str) -> Self {
        CookieSpec::Header(raw.to_string())
    }
}

/// A structured cookie record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieRecord {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// URL to associate the cookie with (alternative to `domain`)
    pub url: Option<String>,
    /// Cookie domain
    pub domain: Option<String>,
    /// Cookie path
    pub path: Option<String>,
    /// Secure flag
    #[serde(default)]
    pub secure: Option<bool>,
    /// HttpOnly flag
    #[serde(default)]
    pub http_only: Option<bool>,
    /// SameSite policy: `strict`, `lax`, or `none`
    pub same_site: Option<String>,
    /// Expiry as epoch seconds
    pub expires: Option<f64>,
}

/// Translate caller cookies into protocol cookie parameters.
///
/// `target` is the navigation URL; `None` means a literal-HTML capture, in
/// which case domain-less cookies are anchored to a neutral origin.
pub fn translate(specs: &[CookieSpec], target: Option<&Url>) -> Result<Vec<CookieParam>> {
    let anchor = target.map(Url::as_str).unwrap_or(NEUTRAL_ORIGIN);
    specs
        .iter()
        .map(|spec| match spec {
            CookieSpec::Header(raw) => parse_header(raw, anchor),
            CookieSpec::Record(record) => from_record(record, anchor),
        })
        .map(|r| r.map_err(Into::into))
        .collect()
}

fn from_record(record: &CookieRecord, anchor: &str) -> std::result::Result<CookieParam, CookieError> {
    let mut builder = CookieParam::builder()
        .name(record.name.as_str())
        .value(record.value.as_str());

    if let Some(url) = &record.url {
        builder = builder.url(url.as_str());
    } else if let Some(domain) = &record.domain {
        builder = builder.domain(domain.as_str());
    } else {
        builder = builder.url(anchor);
    }
    if let Some(path) = &record.path {
        builder = builder.path(path.as_str());
    }
    if let Some(secure) = record.secure {
        builder = builder.secure(secure);
    }
    if let Some(http_only) = record.http_only {
        builder = builder.http_only(http_only);
    }
    if let Some(same_site) = &record.same_site {
        builder = builder.same_site(parse_same_site(same_site).ok_or_else(|| {
            CookieError::Invalid {
                name: record.name.clone(),
                reason: format!("unknown SameSite value {same_site:?}"),
            }
        })?);
    }
    if let Some(expires) = record.expires {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }

    builder.build().map_err(|reason| CookieError::Invalid {
        name: record.name.clone(),
        reason,
    })
}

fn parse_header(raw: &str, anchor: &str) -> std::result::Result<CookieParam, CookieError> {
    let parse_err = |reason: &str| CookieError::Parse {
        cookie: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = raw.split(';');
    let pair = segments.next().unwrap_or_default().trim();
    let (name, value) = pair
        .split_once('=')
        .ok_or_else(|| parse_err("missing `=` in name-value pair"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(parse_err("empty cookie name"));
    }

    let mut builder = CookieParam::builder().name(name).value(value.trim());
    let mut anchored = false;

    for segment in segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (key, attr_value) = match segment.split_once('=') {
            Some((k, v)) => (k.trim().to_ascii_lowercase(), Some(v.trim())),
            None => (segment.to_ascii_lowercase(), None),
        };
        match key.as_str() {
            "domain" => {
                let domain = attr_value.ok_or_else(|| parse_err("empty Domain attribute"))?;
                builder = builder.domain(domain.trim_start_matches('.'));
                anchored = true;
            }
            "path" => {
                let path = attr_value.ok_or_else(|| parse_err("empty Path attribute"))?;
                builder = builder.path(path);
            }
            "expires" => {
                let stamp = attr_value.ok_or_else(|| parse_err("empty Expires attribute"))?;
                let epoch = parse_expiry(stamp)
                    .ok_or_else(|| parse_err("unparseable Expires timestamp"))?;
                builder = builder.expires(TimeSinceEpoch::new(epoch));
            }
            "max-age" => {
                let secs: i64 = attr_value
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| parse_err("unparseable Max-Age attribute"))?;
                let epoch = Utc::now().timestamp() as f64 + secs as f64;
                builder = builder.expires(TimeSinceEpoch::new(epoch));
            }
            "secure" => {
                builder = builder.secure(true);
            }
            "httponly" => {
                builder = builder.http_only(true);
            }
            "samesite" => {
                let policy = attr_value
                    .and_then(parse_same_site)
                    .ok_or_else(|| parse_err("unknown SameSite value"))?;
                builder = builder.same_site(policy);
            }
            // Unknown attributes are ignored, matching browser behavior.
            _ => {}
        }
    }

    if !anchored {
        builder = builder.url(anchor);
    }

    builder.build().map_err(|reason| CookieError::Invalid {
        name: name.to_string(),
        reason,
    })
}

fn parse_same_site(value: &str) -> Option<CookieSameSite> {
    match value.to_ascii_lowercase().as_str() {
        "strict" => Some(CookieSameSite::Strict),
        "lax" => Some(CookieSameSite::Lax),
        "none" => Some(CookieSameSite::None),
        _ => None,
    }
}

/// Parse a cookie expiry timestamp into epoch seconds.
///
/// Accepts the HTTP date format used by `Set-Cookie`, RFC 3339, and raw
/// numeric epoch values.
fn parse_expiry(stamp: &str) -> Option<f64> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(stamp) {
        return Some(dt.timestamp() as f64);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(stamp) {
        return Some(dt.timestamp() as f64);
    }
    stamp.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_simple_pair_anchored_to_target() {
        let cookies = translate(&["session=abc123".into()], Some(&target())).unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "session");
        assert_eq!(cookies[0].value, "abc123");
        assert_eq!(cookies[0].url.as_deref(), Some("https://example.com/page"));
        assert!(cookies[0].domain.is_none());
    }

    #[test]
    fn test_header_with_attributes() {
        let raw = "token=xyz; Domain=.example.com; Path=/app; Secure; HttpOnly; SameSite=Lax";
        let cookies = translate(&[raw.into()], Some(&target())).unwrap();
        let cookie = &cookies[0];
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(cookie.path.as_deref(), Some("/app"));
        assert_eq!(cookie.secure, Some(true));
        assert_eq!(cookie.http_only, Some(true));
        // An explicit domain replaces URL anchoring.
        assert!(cookie.url.is_none());
    }

    fn epoch_of(cookie: &CookieParam) -> f64 {
        serde_json::to_value(cookie.expires.as_ref().expect("expiry set"))
            .expect("serializable timestamp")
            .as_f64()
            .expect("numeric timestamp")
    }

    #[test]
    fn test_expires_normalized_to_epoch_seconds() {
        let raw = "id=1; Expires=Wed, 21 Oct 2015 07:28:00 GMT";
        let cookies = translate(&[raw.into()], Some(&target())).unwrap();
        assert_eq!(epoch_of(&cookies[0]) as i64, 1445412480);
    }

    #[test]
    fn test_max_age_is_relative_to_now() {
        let before = Utc::now().timestamp() as f64;
        let cookies = translate(&["id=1; Max-Age=3600".into()], Some(&target())).unwrap();
        let expires = epoch_of(&cookies[0]);
        assert!(expires >= before + 3600.0);
        assert!(expires <= before + 3700.0);
    }

    #[test]
    fn test_malformed_string_is_a_parse_error() {
        let err = translate(&["no-equals-sign".into()], Some(&target())).unwrap_err();
        assert!(err.to_string().contains("no-equals-sign"));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(translate(&["=value".into()], Some(&target())).is_err());
    }

    #[test]
    fn test_structured_record_passthrough() {
        let record = CookieRecord {
            name: "session".to_string(),
            value: "abc123".to_string(),
            url: None,
            domain: Some("example.com".to_string()),
            path: Some("/".to_string()),
            secure: Some(true),
            http_only: None,
            same_site: Some("strict".to_string()),
            expires: Some(2_000_000_000.0),
        };
        let cookies = translate(&[CookieSpec::Record(record)], Some(&target())).unwrap();
        let cookie = &cookies[0];
        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(cookie.same_site, Some(CookieSameSite::Strict));
    }

    #[test]
    fn test_record_and_header_forms_agree() {
        let from_header = translate(&["k=v; Domain=example.com".into()], Some(&target())).unwrap();
        let record = CookieRecord {
            name: "k".to_string(),
            value: "v".to_string(),
            url: None,
            domain: Some("example.com".to_string()),
            path: None,
            secure: None,
            http_only: None,
            same_site: None,
            expires: None,
        };
        let from_record = translate(&[CookieSpec::Record(record)], Some(&target())).unwrap();
        assert_eq!(from_header[0].name, from_record[0].name);
        assert_eq!(from_header[0].value, from_record[0].value);
        assert_eq!(from_header[0].domain, from_record[0].domain);
    }

    #[test]
    fn test_html_capture_uses_neutral_origin() {
        let cookies = translate(&["session=abc".into()], None).unwrap();
        assert_eq!(cookies[0].url.as_deref(), Some(NEUTRAL_ORIGIN));
    }

    #[test]
    fn test_spec_deserializes_both_forms() {
        let specs: Vec<CookieSpec> = serde_json::from_str(
            r#"["flag=1", {"name": "session", "value": "abc", "domain": "example.com"}]"#,
        )
        .unwrap();
        assert_eq!(specs.len(), 2);
        assert!(matches!(specs[0], CookieSpec::Header(_)));
        assert!(matches!(specs[1], CookieSpec::Record(_)));
    }
}
