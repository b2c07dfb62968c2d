//! Browser automation module
//!
//! Everything that talks to Chrome over CDP lives here: session lifecycle,
//! the capture pipeline state machine, page mutation helpers, wait
//! primitives, and output extraction.

pub mod capture;
pub mod mutate;
pub mod pipeline;
pub mod session;
pub mod wait;

pub use session::{BrowserHandle, CaptureSession};
