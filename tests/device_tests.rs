//! Device-emulation profile tests

use pageshot::devices::{lookup, names};
use pageshot::error::Error;
use pageshot::PaperFormat;

#[test]
fn test_public_device_list_matches_table() {
    let listed = pageshot::devices();
    assert_eq!(listed, names());
    assert!(listed.contains(&"iPhone X"));
    assert!(listed.contains(&"Pixel 5"));
}

#[test]
fn test_iphone_x_profile() {
    let device = lookup("iPhone X").unwrap();
    assert_eq!(device.width, 375);
    assert_eq!(device.height, 812);
    assert_eq!(device.scale_factor, 3.0);
    assert!(device.mobile);
    assert!(device.user_agent.contains("iPhone"));
}

#[test]
fn test_pixel_dimensions_derive_from_scale_factor() {
    // The rendered output of a device capture is viewport × scale factor.
    let device = lookup("iPhone X").unwrap();
    let pixel_width = f64::from(device.width) * device.scale_factor;
    let pixel_height = f64::from(device.height) * device.scale_factor;
    assert_eq!(pixel_width, 1125.0);
    assert_eq!(pixel_height, 2436.0);
}

#[test]
fn test_unknown_device_is_an_unsupported_device_error() {
    let err = lookup("Nokia 3310").unwrap_err();
    match err {
        Error::UnsupportedDevice(name) => assert_eq!(name, "Nokia 3310"),
        other => panic!("expected UnsupportedDevice, got {other:?}"),
    }
}

#[test]
fn test_lookup_ignores_case() {
    assert_eq!(lookup("IPHONE 13").unwrap().name, "iPhone 13");
}

#[test]
fn test_every_listed_name_resolves() {
    for name in names() {
        assert!(lookup(name).is_ok(), "{name} should resolve");
    }
}

#[test]
fn test_paper_formats_are_portrait() {
    for format in [
        PaperFormat::A3,
        PaperFormat::A4,
        PaperFormat::A5,
        PaperFormat::Letter,
        PaperFormat::Legal,
        PaperFormat::Tabloid,
    ] {
        let (width, height) = format.size_inches();
        assert!(width < height, "{format:?} should be portrait");
    }
}
