//! Encoder entry-point tests
//!
//! The pre-browser behavior of `file`/`buffer`/`base64`: validation failures
//! and destination checks must surface before any browser session is
//! created, so these run without Chrome.

use pageshot::error::Error;
use pageshot::{CaptureOptions, ClipRect};
use tempfile::tempdir;

#[tokio::test]
async fn test_buffer_rejects_conflicting_options_without_a_browser() {
    let options = CaptureOptions {
        clip: Some(ClipRect::new(0.0, 0.0, 50.0, 50.0)),
        full_page: true,
        ..Default::default()
    };
    let err = pageshot::buffer("https://example.com", options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_base64_rejects_pdf_with_quality() {
    let options = CaptureOptions {
        quality: Some(0.8),
        ..CaptureOptions::pdf()
    };
    let err = pageshot::base64("https://example.com", options)
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("`quality`"));
}

#[tokio::test]
async fn test_file_refuses_existing_destination() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shot.png");
    tokio::fs::write(&path, b"original").await.unwrap();

    let err = pageshot::file("https://example.com", &path, CaptureOptions::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::AlreadyExists),
        "got {err:?}"
    );

    // The pre-existing file must be left untouched.
    assert_eq!(tokio::fs::read(&path).await.unwrap(), b"original");
}

#[tokio::test]
async fn test_file_propagates_validation_before_touching_the_destination() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("shot.pdf");

    let options = CaptureOptions {
        element: Some("#app".to_string()),
        ..CaptureOptions::pdf()
    };
    let err = pageshot::file("https://example.com", &path, options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // No partial output, not even the parent directory.
    assert!(!path.parent().unwrap().exists());
}

#[tokio::test]
async fn test_unparseable_url_fails_before_any_browser_work() {
    let err = pageshot::buffer("http://[not-a-host", CaptureOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Navigation(_)));
}
