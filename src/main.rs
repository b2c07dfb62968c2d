//! Pageshot CLI
//!
//! Thin wrapper over the library surface: captures one page per invocation,
//! writing a file or printing base64 to stdout.

use std::path::PathBuf;

use clap::Parser;
use pageshot::{CaptureOptions, InputKind, OutputFormat};

/// Capture screenshots and PDFs of web pages with headless Chrome
#[derive(Parser, Debug)]
#[command(name = "pageshot")]
#[command(version)]
#[command(about = "Capture screenshots and PDFs of web pages")]
struct Args {
    /// URL, local file path, or literal HTML (with --html)
    #[arg(required_unless_present = "list_devices")]
    input: Option<String>,

    /// Destination file; omit to print base64 to stdout
    output: Option<PathBuf>,

    /// Viewport width in CSS pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Viewport height in CSS pixels
    #[arg(long, default_value_t = 800)]
    height: u32,

    /// Device scale factor
    #[arg(long, default_value_t = 2.0)]
    scale_factor: f64,

    /// Output format: png, jpeg, webp, or pdf
    #[arg(long, default_value = "png")]
    format: OutputFormat,

    /// Quality for lossy formats, 0..1
    #[arg(long)]
    quality: Option<f64>,

    /// Capture the full scrollable page
    #[arg(long)]
    full_page: bool,

    /// Treat the input as literal HTML markup
    #[arg(long)]
    html: bool,

    /// Overall timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Fixed delay in seconds before capture
    #[arg(long, default_value_t = 0)]
    delay: u64,

    /// Emulate `prefers-color-scheme: dark`
    #[arg(long)]
    dark_mode: bool,

    /// Device profile to emulate (see --list-devices)
    #[arg(long)]
    emulate_device: Option<String>,

    /// Capture the bounding box of this selector
    #[arg(long)]
    element: Option<String>,

    /// Hide elements matching these selectors (repeatable)
    #[arg(long = "hide")]
    hide_elements: Vec<String>,

    /// Remove elements matching these selectors (repeatable)
    #[arg(long = "remove")]
    remove_elements: Vec<String>,

    /// Wait for this selector before capturing
    #[arg(long)]
    wait_for_element: Option<String>,

    /// Suppress CSS animations and transitions
    #[arg(long)]
    disable_animations: bool,

    /// Fail on a non-2xx main-document response
    #[arg(long)]
    fail_on_http_error: bool,

    /// Replace the destination if it exists
    #[arg(long)]
    overwrite: bool,

    /// Path to a Chrome/Chromium executable
    #[arg(long)]
    chrome_path: Option<PathBuf>,

    /// Headed launch with console forwarding
    #[arg(long)]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// List known device-emulation profiles and exit
    #[arg(long)]
    list_devices: bool,
}

impl Args {
    fn capture_options(&self) -> CaptureOptions {
        let mut options = CaptureOptions {
            width: self.width,
            height: self.height,
            scale_factor: self.scale_factor,
            format: self.format,
            quality: self.quality,
            full_page: self.full_page,
            timeout: self.timeout,
            delay: self.delay,
            dark_mode: self.dark_mode,
            emulate_device: self.emulate_device.clone(),
            element: self.element.clone(),
            hide_elements: self.hide_elements.clone(),
            remove_elements: self.remove_elements.clone(),
            wait_for_element: self.wait_for_element.clone(),
            disable_animations: self.disable_animations,
            fail_on_http_error: self.fail_on_http_error,
            overwrite: self.overwrite,
            debug: self.debug,
            ..Default::default()
        };
        if self.html {
            options.input_type = InputKind::Html;
        }
        options.launch.executable = self.chrome_path.clone();
        options
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if args.list_devices {
        for name in pageshot::devices() {
            println!("{name}");
        }
        return Ok(());
    }

    let input = args.input.clone().expect("input is required by clap");
    let options = args.capture_options();

    match &args.output {
        Some(path) => {
            pageshot::file(&input, path, options).await?;
            tracing::info!("wrote {}", path.display());
        }
        None => {
            let encoded = pageshot::base64(&input, options).await?;
            println!("{encoded}");
        }
    }

    Ok(())
}
