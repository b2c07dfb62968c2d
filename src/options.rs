//! Capture options
//!
//! One flat options record drives the whole capture pipeline. Defaults are
//! carried by [`Default`] and per-field serde defaults; struct-update syntax
//! (`..Default::default()`) is the merge operation. Option-interaction rules
//! (mutual exclusivity, PDF incompatibilities) live in
//! [`CaptureOptions::validate`], which runs before any browser work.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chromiumoxide::Page;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::browser::BrowserHandle;
use crate::cookies::CookieSpec;
use crate::error::{NavigationError, Result, ValidationError};
use crate::geometry::ClipRect;

/// Async hook receiving a cloned page handle.
///
/// Used for `before_navigation` and `before_screenshot`. Errors returned here
/// abort the capture as [`crate::Error::Hook`], carried verbatim.
pub type PageHook =
    Arc<dyn Fn(Page) -> BoxFuture<'static, std::result::Result<(), anyhow::Error>> + Send + Sync>;

/// Observer for console messages emitted by the page.
///
/// Console observation is a side channel; this callback cannot abort a
/// capture.
pub type ConsoleHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Output format for captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG screenshot
    #[default]
    Png,
    /// JPEG screenshot
    Jpeg,
    /// WebP screenshot
    Webp,
    /// PDF document
    Pdf,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(format!(
                "unknown format {other:?} (expected png, jpeg, webp, or pdf)"
            )),
        }
    }
}

impl OutputFormat {
    /// Whether this format carries a quality setting
    pub fn is_lossy(self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Webp)
    }

    /// Conventional file extension
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Webp => "webp",
            OutputFormat::Pdf => "pdf",
        }
    }

    /// MIME type of the produced bytes
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Pdf => "application/pdf",
        }
    }
}

/// How the `input` string should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// A URL, or a local filesystem path converted to a `file://` URL
    #[default]
    Url,
    /// Literal HTML markup
    Html,
}

/// Resolved capture input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Navigate to this URL
    Url(Url),
    /// Set this markup as the document content
    Html(String),
}

impl InputSource {
    /// Classify the raw input per `input_type`.
    ///
    /// URL inputs are matched by scheme prefix (`http://`, `https://`,
    /// `file://`, `data:`); anything else is treated as a local filesystem
    /// path and converted to a `file://` URL without touching the disk.
    pub fn resolve(input: &str, kind: InputKind) -> Result<Self> {
        if kind == InputKind::Html {
            return Ok(InputSource::Html(input.to_string()));
        }

        let looks_like_url = input.starts_with("http://")
            || input.starts_with("https://")
            || input.starts_with("file://")
            || input.starts_with("data:");

        if looks_like_url {
            let url = Url::parse(input)
                .map_err(|e| NavigationError::InvalidInput(format!("{input:?}: {e}")))?;
            return Ok(InputSource::Url(url));
        }

        let path = PathBuf::from(input);
        let absolute = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()
                .map_err(crate::Error::Io)?
                .join(path)
        };
        let url = Url::from_file_path(&absolute).map_err(|_| {
            NavigationError::InvalidInput(format!("{input:?} is not a valid file path"))
        })?;
        Ok(InputSource::Url(url))
    }

    /// Whether the main-document response is subject to HTTP status checks.
    ///
    /// Only remote http(s) loads carry a meaningful status; `file://` and
    /// `data:` URLs and literal HTML are exempt.
    pub fn is_http(&self) -> bool {
        matches!(self, InputSource::Url(url) if matches!(url.scheme(), "http" | "https"))
    }
}

/// Per-edge shrink (positive) or grow (negative) of the capture rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Inset {
    /// The same amount on all four edges
    All(f64),
    /// Explicit per-edge amounts; unspecified edges default to zero
    Edges {
        /// Inset from the top edge
        #[serde(default)]
        top: f64,
        /// Inset from the right edge
        #[serde(default)]
        right: f64,
        /// Inset from the bottom edge
        #[serde(default)]
        bottom: f64,
        /// Inset from the left edge
        #[serde(default)]
        left: f64,
    },
}

impl Inset {
    /// Amounts as (top, right, bottom, left)
    pub fn edges(&self) -> (f64, f64, f64, f64) {
        match *self {
            Inset::All(v) => (v, v, v, v),
            Inset::Edges {
                top,
                right,
                bottom,
                left,
            } => (top, right, bottom, left),
        }
    }

    /// True when every edge amount is zero
    pub fn is_zero(&self) -> bool {
        self.edges() == (0.0, 0.0, 0.0, 0.0)
    }
}

/// Which edge of the scroll container the target is positioned against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScrollEdge {
    /// Align the element with the top of the container
    #[default]
    Top,
    /// Align the element with the bottom of the container
    Bottom,
    /// Align the element with the left of the container
    Left,
    /// Align the element with the right of the container
    Right,
}

/// Target of the scroll-to-element stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrollTarget {
    /// Scroll the element into view with default positioning
    Selector(String),
    /// Scroll so the element sits `offset` pixels from the given edge
    Positioned {
        /// CSS selector of the element to scroll to
        element: String,
        /// Edge of the scroll container to position against
        #[serde(default)]
        offset_from: ScrollEdge,
        /// Distance from that edge, in pixels
        #[serde(default)]
        offset: f64,
    },
}

impl ScrollTarget {
    /// The element selector regardless of form
    pub fn selector(&self) -> &str {
        match self {
            ScrollTarget::Selector(s) => s,
            ScrollTarget::Positioned { element, .. } => element,
        }
    }
}

/// HTTP basic-authentication credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    /// Username
    pub username: String,
    /// Password, if any
    #[serde(default)]
    pub password: Option<String>,
}

impl Authentication {
    /// `Authorization` header value for these credentials
    pub fn basic_header(&self) -> String {
        let raw = format!(
            "{}:{}",
            self.username,
            self.password.as_deref().unwrap_or_default()
        );
        format!("Basic {}", BASE64.encode(raw))
    }
}

/// JavaScript to run in every new document context before page scripts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreloadScript {
    /// A JS function expression, e.g. `(flag) => { window.__flag = flag; }`
    pub source: String,
    /// JSON arguments the function is applied to
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

impl PreloadScript {
    /// Wrap the function source and arguments into a self-invoking script
    /// suitable for `Page.addScriptToEvaluateOnNewDocument`.
    pub fn bootstrap_source(&self) -> String {
        let args = serde_json::to_string(&self.args).unwrap_or_else(|_| "[]".to_string());
        format!(
            "(function() {{ const __args = {args}; return ({source}).apply(null, __args); }})();",
            source = self.source
        )
    }
}

/// Paper size for PDF output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperFormat {
    /// 11.69 × 16.54 in
    A3,
    /// 8.27 × 11.69 in
    A4,
    /// 5.83 × 8.27 in
    A5,
    /// 8.5 × 11 in
    Letter,
    /// 8.5 × 14 in
    Legal,
    /// 11 × 17 in
    Tabloid,
}

impl PaperFormat {
    /// Portrait (width, height) in inches
    pub fn size_inches(self) -> (f64, f64) {
        match self {
            PaperFormat::A3 => (11.69, 16.54),
            PaperFormat::A4 => (8.27, 11.69),
            PaperFormat::A5 => (5.83, 8.27),
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
            PaperFormat::Tabloid => (11.0, 17.0),
        }
    }
}

/// Page margins for PDF output, in inches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PdfMargins {
    /// Top margin
    #[serde(default)]
    pub top: f64,
    /// Right margin
    #[serde(default)]
    pub right: f64,
    /// Bottom margin
    #[serde(default)]
    pub bottom: f64,
    /// Left margin
    #[serde(default)]
    pub left: f64,
}

impl PdfMargins {
    /// The same margin on all four edges
    pub fn uniform(inches: f64) -> Self {
        Self {
            top: inches,
            right: inches,
            bottom: inches,
            left: inches,
        }
    }
}

/// PDF-specific sub-options, applied only when `format` is [`OutputFormat::Pdf`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfOptions {
    /// Paper size; `None` lets the browser pick its default
    pub format: Option<PaperFormat>,
    /// Landscape orientation
    #[serde(default)]
    pub landscape: bool,
    /// Page margins in inches
    pub margins: Option<PdfMargins>,
    /// Print background graphics
    #[serde(default = "default_true")]
    pub background: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            format: None,
            landscape: false,
            margins: None,
            background: true,
        }
    }
}

/// Browser launch options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Run headless (debug mode overrides this to headed)
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Keep the Chromium sandbox enabled
    #[serde(default = "default_true")]
    pub sandbox: bool,
    /// Path to a Chrome/Chromium executable (auto-detected when `None`)
    pub executable: Option<PathBuf>,
    /// Additional Chrome arguments
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
            executable: None,
            args: Vec::new(),
        }
    }
}

/// Caller-supplied hooks with defined points in the capture state machine
#[derive(Clone, Default)]
pub struct Hooks {
    /// Runs after environment setup, immediately before navigation. The place
    /// to register dialog handlers; dialogs are not auto-dismissed.
    pub before_navigation: Option<PageHook>,
    /// Runs after injection and explicit waits, before any element
    /// measurement, so it can still affect layout.
    pub before_screenshot: Option<PageHook>,
    /// Receives every console message the page emits
    pub on_console: Option<ConsoleHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_navigation", &self.before_navigation.is_some())
            .field("before_screenshot", &self.before_screenshot.is_some())
            .field("on_console", &self.on_console.is_some())
            .finish()
    }
}

/// Options for one capture call
///
/// Interaction rules, enforced by [`CaptureOptions::validate`]:
///
/// | combination | outcome |
/// |---|---|
/// | `clip` + `element` | rejected (both define the region) |
/// | `clip` + `full_page` | rejected |
/// | `format: pdf` + `clip`/`element`/`quality` | rejected |
/// | `element` + `full_page` | element wins |
/// | `inset` + `full_page` | inset ignored |
/// | `referrer` + `headers["referer"]` | `referrer` wins, header stripped |
/// | `emulate_device` + `width`/`height`/`scale_factor`/`user_agent` | device wins |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOptions {
    // -- Viewport ----------------------------------------------------------
    /// Viewport width in CSS pixels
    #[serde(default = "default_width")]
    pub width: u32,
    /// Viewport height in CSS pixels
    #[serde(default = "default_height")]
    pub height: u32,
    /// Device scale factor; output pixel dimensions are CSS size × this
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    /// Emulate a known device profile (overrides width/height/scale/UA)
    pub emulate_device: Option<String>,
    /// Force `prefers-color-scheme: dark`
    #[serde(default)]
    pub dark_mode: bool,

    // -- Output ------------------------------------------------------------
    /// Output format
    #[serde(default)]
    pub format: OutputFormat,
    /// Image quality in [0, 1] for lossy formats; clamped then scaled to 0–100
    pub quality: Option<f64>,
    /// Render the default white background; `false` captures transparency
    #[serde(default = "default_true")]
    pub default_background: bool,
    /// Explicit clip rectangle in page coordinates
    pub clip: Option<ClipRect>,
    /// Capture the bounding box of the first element matching this selector
    pub element: Option<String>,
    /// Capture the full scrollable page rather than the viewport
    #[serde(default)]
    pub full_page: bool,
    /// Shrink (positive) or grow (negative) the captured rectangle per edge;
    /// ignored when `full_page` is set
    pub inset: Option<Inset>,
    /// PDF-specific sub-options
    #[serde(default)]
    pub pdf: PdfOptions,
    /// Allow `file()` to replace an existing destination
    #[serde(default)]
    pub overwrite: bool,

    // -- Navigation --------------------------------------------------------
    /// Overall timeout in seconds for navigation and waits
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Referrer to navigate with; takes precedence over a `referer` header
    pub referrer: Option<String>,
    /// Extra HTTP headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Custom user agent
    pub user_agent: Option<String>,
    /// Cookies to set before navigation (raw strings or structured records)
    #[serde(default)]
    pub cookies: Vec<CookieSpec>,
    /// HTTP basic-authentication credentials
    pub authentication: Option<Authentication>,
    /// Fail the capture on a non-2xx main-document response (http(s) only)
    #[serde(default)]
    pub fail_on_http_error: bool,
    /// Require the strict zero-in-flight network-idle condition after load
    /// (default tolerates up to two in-flight requests)
    #[serde(default)]
    pub wait_for_network_idle: bool,

    // -- Mutation ----------------------------------------------------------
    /// Selectors to hide (`visibility: hidden`; keeps layout)
    #[serde(default)]
    pub hide_elements: Vec<String>,
    /// Selectors to remove (`display: none`; collapses layout)
    #[serde(default)]
    pub remove_elements: Vec<String>,
    /// Selector to click once the page has loaded
    pub click_element: Option<String>,
    /// Scroll the nearest scrollable ancestor so this target is in position
    pub scroll_to_element: Option<ScrollTarget>,
    /// Suppress CSS animations and transitions
    #[serde(default)]
    pub disable_animations: bool,
    /// ES modules to inject (URL, `.js` path, or inline source)
    #[serde(default)]
    pub modules: Vec<String>,
    /// Classic scripts to inject (URL, `.js` path, or inline source)
    #[serde(default)]
    pub scripts: Vec<String>,
    /// Stylesheets to inject (URL, `.css` path, or inline source)
    #[serde(default)]
    pub styles: Vec<String>,
    /// Fixed delay in seconds after all waits, before capture
    #[serde(default)]
    pub delay: u64,
    /// Wait for this selector to appear and become visible
    pub wait_for_element: Option<String>,
    /// JavaScript to register in every new document context before page
    /// scripts run
    pub preload: Option<PreloadScript>,
    /// Execute page JavaScript (injection re-enables it temporarily)
    #[serde(default = "default_true")]
    pub javascript_enabled: bool,
    /// Run the scroll-and-wait loop to load lazy content even when not
    /// capturing the full page
    #[serde(default)]
    pub preload_lazy_content: bool,
    /// Best-effort ad and tracker blocking
    #[serde(default = "default_true")]
    pub block_ads: bool,

    // -- Hooks & lifecycle -------------------------------------------------
    /// Caller-supplied hooks
    #[serde(skip)]
    pub hooks: Hooks,
    /// Reuse this browser instead of launching one; the capture then owns
    /// only its page
    #[serde(skip)]
    pub browser: Option<Arc<BrowserHandle>>,
    /// Do not close a launched browser when the capture finishes
    #[serde(default)]
    pub keep_alive: bool,
    /// Browser launch options (ignored when `browser` is supplied)
    #[serde(default)]
    pub launch: LaunchOptions,
    /// Headed launch with console/page-error forwarding to the log
    #[serde(default)]
    pub debug: bool,
    /// How to interpret the `input` string
    #[serde(default)]
    pub input_type: InputKind,
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    800
}

fn default_scale_factor() -> f64 {
    2.0
}

fn default_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            scale_factor: default_scale_factor(),
            emulate_device: None,
            dark_mode: false,
            format: OutputFormat::Png,
            quality: None,
            default_background: true,
            clip: None,
            element: None,
            full_page: false,
            inset: None,
            pdf: PdfOptions::default(),
            overwrite: false,
            timeout: default_timeout(),
            referrer: None,
            headers: HashMap::new(),
            user_agent: None,
            cookies: Vec::new(),
            authentication: None,
            fail_on_http_error: false,
            wait_for_network_idle: false,
            hide_elements: Vec::new(),
            remove_elements: Vec::new(),
            click_element: None,
            scroll_to_element: None,
            disable_animations: false,
            modules: Vec::new(),
            scripts: Vec::new(),
            styles: Vec::new(),
            delay: 0,
            wait_for_element: None,
            preload: None,
            javascript_enabled: true,
            preload_lazy_content: false,
            block_ads: true,
            hooks: Hooks::default(),
            browser: None,
            keep_alive: false,
            launch: LaunchOptions::default(),
            debug: false,
            input_type: InputKind::Url,
        }
    }
}

impl CaptureOptions {
    /// Options for a JPEG capture at the given quality
    pub fn jpeg(quality: f64) -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: Some(quality),
            ..Default::default()
        }
    }

    /// Options for a PDF capture
    pub fn pdf() -> Self {
        Self {
            format: OutputFormat::Pdf,
            ..Default::default()
        }
    }

    /// Options for capturing literal HTML markup
    pub fn html() -> Self {
        Self {
            input_type: InputKind::Html,
            ..Default::default()
        }
    }

    /// Overall timeout in milliseconds
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.saturating_mul(1000)
    }

    /// Reject mutually-exclusive and type-incompatible combinations.
    ///
    /// Runs synchronously with no side effects, before any browser session
    /// is created; callable standalone.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.clip.is_some() && self.element.is_some() {
            return Err(ValidationError::ClipWithElement);
        }
        if self.clip.is_some() && self.full_page {
            return Err(ValidationError::ClipWithFullPage);
        }
        if self.format == OutputFormat::Pdf {
            if self.clip.is_some() {
                return Err(ValidationError::PdfIncompatible { option: "clip" });
            }
            if self.element.is_some() {
                return Err(ValidationError::PdfIncompatible { option: "element" });
            }
            if self.quality.is_some() {
                return Err(ValidationError::PdfIncompatible { option: "quality" });
            }
        }
        Ok(())
    }
}
