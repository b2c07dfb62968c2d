//! Output extraction
//!
//! Turns the pipeline's resolved state (format, clip, full-page flag) into
//! the final image or PDF bytes via the CDP capture primitives.

use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, PrintToPdfParams, Viewport,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use tracing::{debug, instrument};

use crate::error::{CaptureError, Result};
use crate::geometry::ClipRect;
use crate::options::{CaptureOptions, OutputFormat};

/// PDF print scale bounds imposed by the protocol
const PDF_SCALE_MIN: f64 = 0.1;
const PDF_SCALE_MAX: f64 = 2.0;

/// Produce the final output bytes
#[instrument(skip(page, options))]
pub(crate) async fn extract(
    page: &Page,
    options: &CaptureOptions,
    clip: Option<ClipRect>,
    full_page: bool,
) -> Result<Vec<u8>> {
    match options.format {
        OutputFormat::Pdf => pdf(page, options).await,
        _ => screenshot(page, options, clip, full_page).await,
    }
}

async fn screenshot(
    page: &Page,
    options: &CaptureOptions,
    clip: Option<ClipRect>,
    full_page: bool,
) -> Result<Vec<u8>> {
    let format = match options.format {
        OutputFormat::Jpeg => CaptureScreenshotFormat::Jpeg,
        OutputFormat::Webp => CaptureScreenshotFormat::Webp,
        _ => CaptureScreenshotFormat::Png,
    };

    let mut builder = ScreenshotParams::builder()
        .format(format)
        .full_page(full_page && clip.is_none())
        .omit_background(!options.default_background);

    if options.format.is_lossy() {
        if let Some(quality) = options.quality {
            builder = builder.quality(scale_quality(quality));
        }
    }

    if let Some(clip) = clip {
        builder = builder.clip(Viewport {
            x: clip.x,
            y: clip.y,
            width: clip.width,
            height: clip.height,
            scale: 1.0,
        });
    }

    let data = page
        .screenshot(builder.build())
        .await
        .map_err(|e| CaptureError::ScreenshotFailed(e.to_string()))?;

    debug!("screenshot captured: {} bytes", data.len());
    Ok(data)
}

async fn pdf(page: &Page, options: &CaptureOptions) -> Result<Vec<u8>> {
    let pdf_options = &options.pdf;

    let mut builder = PrintToPdfParams::builder()
        .landscape(pdf_options.landscape)
        .print_background(pdf_options.background)
        .scale(clamp_pdf_scale(options.scale_factor));

    if let Some(format) = pdf_options.format {
        let (width, height) = format.size_inches();
        builder = builder.paper_width(width).paper_height(height);
    }
    if let Some(margins) = pdf_options.margins {
        builder = builder
            .margin_top(margins.top)
            .margin_right(margins.right)
            .margin_bottom(margins.bottom)
            .margin_left(margins.left);
    }

    let data = page
        .pdf(builder.build())
        .await
        .map_err(|e| CaptureError::PdfFailed(e.to_string()))?;

    debug!("PDF generated: {} bytes", data.len());
    Ok(data)
}

/// Clamp caller quality in [0, 1] and scale to the protocol's 0–100 range
pub(crate) fn scale_quality(quality: f64) -> i64 {
    (quality.clamp(0.0, 1.0) * 100.0).round() as i64
}

/// Clamp the device scale factor to the PDF print-scale bounds
pub(crate) fn clamp_pdf_scale(scale_factor: f64) -> f64 {
    scale_factor.clamp(PDF_SCALE_MIN, PDF_SCALE_MAX)
}
