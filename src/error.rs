//! Error types for Pageshot
//!
//! This module provides a comprehensive error type hierarchy using `thiserror`
//! for proper error handling across all components.

use thiserror::Error;

/// The main error type for Pageshot operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid option combinations, detected before any browser work
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown device-emulation profile name
    #[error("Device not supported: {0:?} (see pageshot::devices() for known names)")]
    UnsupportedDevice(String),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// A selector target never appeared or became visible within the timeout
    #[error("Timed out after {timeout_ms}ms waiting for selector {selector:?}")]
    SelectorTimeout {
        /// The CSS selector that was waited on
        selector: String,
        /// How long the wait was bounded to
        timeout_ms: u64,
    },

    /// Resolved capture geometry errors
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// A caller-supplied hook failed; the caller's error is carried verbatim
    #[error("Hook `{hook}` failed: {source}")]
    Hook {
        /// Which hook failed
        hook: &'static str,
        /// The caller's own error, unwrapped
        #[source]
        source: anyhow::Error,
    },

    /// Browser/page lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Cookie translation errors
    #[error("Cookie error: {0}")]
    Cookie(#[from] CookieError),

    /// Capture errors (screenshot, PDF)
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),
}

/// Mutually-exclusive or type-incompatible option combinations.
///
/// These are detected synchronously by [`crate::CaptureOptions::validate`]
/// before any browser session is created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `clip` and `element` both define the capture region
    #[error("the `clip` and `element` options are mutually exclusive: both define the capture region")]
    ClipWithElement,

    /// `clip` and `full_page` both define the capture region
    #[error("the `clip` and `full_page` options are mutually exclusive: a fixed clip region cannot cover the full page")]
    ClipWithFullPage,

    /// An image-only option was combined with PDF output
    #[error("the `{option}` option does not apply when `format` is `pdf`")]
    PdfIncompatible {
        /// The offending image-only option
        option: &'static str,
    },
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Invalid or unresolvable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Navigation timeout
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// Page load failed
    #[error("Page load failed: {0}")]
    LoadFailed(String),

    /// Non-2xx main-document response with `fail_on_http_error` set
    #[error("HTTP status {status} while loading {url}")]
    HttpStatus {
        /// HTTP status code of the main-document response
        status: u16,
        /// The URL that was loaded
        url: String,
    },
}

/// Browser and page lifecycle errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Failed to create the capture page
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    /// The page crashed during capture
    #[error("Page crashed during capture")]
    PageCrashed,

    /// Browser already closed (or was never launched)
    #[error("Browser already closed")]
    AlreadyClosed,

    /// Failed to close the browser cleanly
    #[error("Failed to close browser: {0}")]
    CloseFailed(String),
}

/// Cookie translation errors
#[derive(Error, Debug)]
pub enum CookieError {
    /// A raw cookie string could not be parsed
    #[error("Malformed cookie string {cookie:?}: {reason}")]
    Parse {
        /// The offending cookie string
        cookie: String,
        /// What was wrong with it
        reason: String,
    },

    /// A structured cookie record was rejected by the protocol layer
    #[error("Invalid cookie {name:?}: {reason}")]
    Invalid {
        /// Cookie name
        name: String,
        /// Rejection reason
        reason: String,
    },
}

/// Resolved capture geometry errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Inset application produced an empty rectangle
    #[error("capture region has non-positive {dimension} ({value}) after inset")]
    EmptyRegion {
        /// Which dimension collapsed ("width" or "height")
        dimension: &'static str,
        /// The resulting value
        value: f64,
    },

    /// The target element has no layout box
    #[error("element {selector:?} has a zero-sized bounding box")]
    ZeroSizedElement {
        /// The element selector
        selector: String,
    },
}

/// Capture errors (screenshots, PDFs)
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Screenshot failed
    #[error("Screenshot capture failed: {0}")]
    ScreenshotFailed(String),

    /// PDF generation failed
    #[error("PDF generation failed: {0}")]
    PdfFailed(String),
}

/// Result type alias for Pageshot operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Wrap a caller-hook failure, preserving the caller's error
    pub(crate) fn hook(hook: &'static str, source: anyhow::Error) -> Self {
        Error::Hook { hook, source }
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_both_options() {
        let err = Error::Validation(ValidationError::ClipWithElement);
        let msg = err.to_string();
        assert!(msg.contains("`clip`"));
        assert!(msg.contains("`element`"));
    }

    #[test]
    fn test_pdf_incompatible_names_offender() {
        let err = ValidationError::PdfIncompatible { option: "quality" };
        assert!(err.to_string().contains("`quality`"));
        assert!(err.to_string().contains("pdf"));
    }

    #[test]
    fn test_http_status_error_carries_code() {
        let err = NavigationError::HttpStatus {
            status: 404,
            url: "https://example.com/missing".to_string(),
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_selector_timeout_display() {
        let err = Error::SelectorTimeout {
            selector: "#app".to_string(),
            timeout_ms: 60000,
        };
        assert!(err.to_string().contains("#app"));
        assert!(err.to_string().contains("60000"));
    }

    #[test]
    fn test_unsupported_device_display() {
        let err = Error::UnsupportedDevice("Nokia 3310".to_string());
        assert!(err.to_string().contains("Nokia 3310"));
    }

    #[test]
    fn test_geometry_error_display() {
        let err = GeometryError::EmptyRegion {
            dimension: "width",
            value: -10.0,
        };
        assert!(err.to_string().contains("width"));
    }
}
