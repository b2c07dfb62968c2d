//! Pageshot - Web Page Screenshot & PDF Capture
//!
//! This crate captures a rendered image (or PDF) of a web page or HTML
//! fragment by driving headless Chrome over CDP: it navigates, applies a
//! declarative set of page mutations (inject scripts/styles, hide or remove
//! elements, scroll, click, emulate devices and color schemes), waits for
//! the page to reach the desired visual state, then extracts pixel or
//! vector output.
//!
//! # Architecture
//!
//! ```text
//! file / buffer / base64
//!         │
//!         ▼
//!   CaptureOptions ──▶ validate ──▶ CaptureSession (browser + page)
//!                                        │
//!                                        ▼
//!                              capture pipeline (CDP)
//!                         navigate · mutate · wait · scroll
//!                                        │
//!                                        ▼
//!                              screenshot / PDF bytes
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pageshot::CaptureOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Capture a page to a file
//!     pageshot::file(
//!         "https://example.com",
//!         "example.png",
//!         CaptureOptions::default(),
//!     )
//!     .await?;
//!
//!     // Or get the raw bytes
//!     let bytes = pageshot::buffer(
//!         "https://example.com",
//!         CaptureOptions { full_page: true, ..Default::default() },
//!     )
//!     .await?;
//!
//!     println!("captured {} bytes", bytes.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod browser;
pub mod cookies;
pub mod devices;
pub mod error;
pub mod geometry;
pub mod options;

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tokio::io::AsyncWriteExt;
use tracing::instrument;

// Re-exports for convenience
pub use browser::BrowserHandle;
pub use cookies::{CookieRecord, CookieSpec};
pub use error::{Error, Result};
pub use geometry::ClipRect;
pub use options::{
    Authentication, CaptureOptions, Hooks, InputKind, Inset, LaunchOptions, OutputFormat,
    PaperFormat, PdfMargins, PdfOptions, PreloadScript, ScrollEdge, ScrollTarget,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// One capture: validate, acquire, run the pipeline, always release.
///
/// A page crash recorded during the pipeline surfaces as an error even when
/// the pipeline itself reported success.
async fn capture(input: &str, options: &CaptureOptions) -> Result<Vec<u8>> {
    options.validate()?;
    let source = options::InputSource::resolve(input, options.input_type)?;

    let session = browser::CaptureSession::acquire(options).await?;
    let outcome = browser::pipeline::run(&session, &source, options).await;
    let crashed = session.crashed();
    let released = session.release().await;

    let bytes = outcome?;
    if crashed {
        return Err(error::SessionError::PageCrashed.into());
    }
    released?;
    Ok(bytes)
}

/// Capture `input` and return the raw image or PDF bytes.
///
/// `input` is a URL, a local file path, or literal HTML depending on
/// [`CaptureOptions::input_type`].
#[instrument(skip(options))]
pub async fn buffer(input: &str, options: CaptureOptions) -> Result<Vec<u8>> {
    capture(input, &options).await
}

/// Capture `input` and return the bytes base64-encoded (standard alphabet).
#[instrument(skip(options))]
pub async fn base64(input: &str, options: CaptureOptions) -> Result<String> {
    let bytes = capture(input, &options).await?;
    Ok(BASE64.encode(bytes))
}

/// Capture `input` and write the result to `output_path`.
///
/// Parent directories are created as needed. An existing destination fails
/// the call before any browser work unless [`CaptureOptions::overwrite`] is
/// set; the write itself uses create-new semantics, so a failed capture
/// never leaves a partial file behind.
#[instrument(skip(options, output_path))]
pub async fn file(
    input: &str,
    output_path: impl AsRef<Path>,
    options: CaptureOptions,
) -> Result<()> {
    let path = output_path.as_ref();

    if !options.overwrite && tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("destination {path:?} already exists (set `overwrite` to replace it)"),
        )));
    }

    let bytes = capture(input, &options).await?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    if options.overwrite {
        tokio::fs::write(path, &bytes).await?;
    } else {
        let mut out = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        out.write_all(&bytes).await?;
        out.flush().await?;
    }

    Ok(())
}

/// Names of the device-emulation profiles accepted by
/// [`CaptureOptions::emulate_device`].
pub fn devices() -> Vec<&'static str> {
    devices::names()
}
