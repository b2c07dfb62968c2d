//! Cookie translator tests
//!
//! String-format and structured cookies must translate into equivalent
//! protocol records; malformed strings must fail with a parse error.

use pageshot::cookies::{translate, CookieRecord, CookieSpec};
use url::Url;

fn target() -> Url {
    Url::parse("https://shop.example.com/cart").unwrap()
}

#[test]
fn test_equivalent_string_and_record_forms() {
    let from_string = translate(
        &[CookieSpec::Header(
            "session=abc123; Domain=shop.example.com".to_string(),
        )],
        Some(&target()),
    )
    .unwrap();

    let from_record = translate(
        &[CookieSpec::Record(CookieRecord {
            name: "session".to_string(),
            value: "abc123".to_string(),
            url: None,
            domain: Some("shop.example.com".to_string()),
            path: None,
            secure: None,
            http_only: None,
            same_site: None,
            expires: None,
        })],
        Some(&target()),
    )
    .unwrap();

    assert_eq!(from_string[0].name, from_record[0].name);
    assert_eq!(from_string[0].value, from_record[0].value);
    assert_eq!(from_string[0].domain, from_record[0].domain);
    assert_eq!(from_string[0].path, from_record[0].path);
}

#[test]
fn test_domainless_cookie_anchors_to_target_url() {
    let cookies = translate(
        &[CookieSpec::Header("token=t0k3n".to_string())],
        Some(&target()),
    )
    .unwrap();
    assert_eq!(
        cookies[0].url.as_deref(),
        Some("https://shop.example.com/cart")
    );
}

#[test]
fn test_literal_html_capture_uses_neutral_origin() {
    let cookies = translate(&[CookieSpec::Header("token=t0k3n".to_string())], None).unwrap();
    assert_eq!(cookies[0].url.as_deref(), Some("http://localhost/"));
}

#[test]
fn test_full_attribute_set() {
    let raw = "id=42; Domain=.example.com; Path=/api; \
               Expires=Wed, 21 Oct 2065 07:28:00 GMT; Secure; HttpOnly; SameSite=Strict";
    let cookies = translate(&[CookieSpec::Header(raw.to_string())], Some(&target())).unwrap();
    let cookie = &cookies[0];
    assert_eq!(cookie.name, "id");
    assert_eq!(cookie.value, "42");
    assert_eq!(cookie.domain.as_deref(), Some("example.com"));
    assert_eq!(cookie.path.as_deref(), Some("/api"));
    assert_eq!(cookie.secure, Some(true));
    assert_eq!(cookie.http_only, Some(true));
    assert!(cookie.expires.is_some());
}

#[test]
fn test_expiry_is_epoch_seconds() {
    let raw = "id=1; Expires=Thu, 01 Jan 1970 00:01:40 GMT";
    let cookies = translate(&[CookieSpec::Header(raw.to_string())], Some(&target())).unwrap();
    let expires = serde_json::to_value(cookies[0].expires.as_ref().expect("expiry set"))
        .unwrap()
        .as_f64()
        .unwrap();
    assert_eq!(expires as i64, 100);
}

#[test]
fn test_malformed_strings_fail() {
    for raw in ["just-a-token", "=anonymous", "; Domain=example.com"] {
        let result = translate(&[CookieSpec::Header(raw.to_string())], Some(&target()));
        assert!(result.is_err(), "{raw:?} should not parse");
    }
}

#[test]
fn test_bad_expiry_fails() {
    let result = translate(
        &[CookieSpec::Header("id=1; Expires=someday".to_string())],
        Some(&target()),
    );
    assert!(result.is_err());
}

#[test]
fn test_multiple_cookies_translate_in_order() {
    let cookies = translate(
        &[
            CookieSpec::Header("a=1".to_string()),
            CookieSpec::Header("b=2".to_string()),
            CookieSpec::Header("c=3".to_string()),
        ],
        Some(&target()),
    )
    .unwrap();
    let names: Vec<_> = cookies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
}
