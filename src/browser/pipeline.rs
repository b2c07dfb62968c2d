//! The capture pipeline
//!
//! One capture is an ordered sequence of browser-state mutations. The order
//! is load-bearing: the viewport must be set before navigation measures
//! layout, navigation must complete before DOM queries are valid, injection
//! runs before element waits, and element clip resolution happens only after
//! the `before_screenshot` hook has had its last chance to affect layout.

use std::collections::HashMap;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::emulation::{
    MediaFeature, SetDeviceMetricsOverrideParams, SetEmulatedMediaParams,
    SetScriptExecutionDisabledParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams, SetBypassCspParams,
};
use chromiumoxide::Page;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::browser::capture;
use crate::browser::mutate::{self, SCROLL_SETTLE};
use crate::browser::session::CaptureSession;
use crate::browser::wait::{self, DocumentStatus, NetworkActivity};
use crate::cookies;
use crate::devices;
use crate::error::{Error, GeometryError, NavigationError, Result};
use crate::geometry::{self, ClipRect};
use crate::options::{CaptureOptions, InputSource};

/// Run the full capture pipeline against an acquired session.
///
/// Any stage failure aborts the capture; no partial output is produced.
/// Session teardown is the caller's responsibility and runs regardless.
#[instrument(skip_all)]
pub(crate) async fn run(
    session: &CaptureSession,
    source: &InputSource,
    options: &CaptureOptions,
) -> Result<Vec<u8>> {
    let page = session.page();
    let timeout = Duration::from_millis(options.timeout_ms());
    let deadline = Instant::now() + timeout;

    // Stage 1: preload runs in every new document context before any page
    // script, so it can override globals the page depends on.
    if let Some(preload) = &options.preload {
        let params = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(preload.bootstrap_source())
            .build()
            .map_err(Error::cdp)?;
        page.execute(params).await?;
    }

    // Stage 2: environment. CSP bypass keeps injected tags from being
    // blocked; the network tap must exist before navigation starts.
    page.execute(SetBypassCspParams::new(true)).await?;
    if !options.javascript_enabled {
        set_javascript_enabled(page, false).await?;
    }
    let network = NetworkActivity::install(page).await?;

    // Stage 3: credentials and identity.
    apply_identity(page, source, options).await?;

    // Stage 4: viewport and device emulation. A device profile overrides
    // width/height/scale and the user agent.
    let (width, height) = apply_viewport(page, options).await?;

    // Stage 5: color scheme.
    let scheme = if options.dark_mode { "dark" } else { "light" };
    let feature = MediaFeature {
        name: "prefers-color-scheme".to_string(),
        value: scheme.to_string(),
    };
    page.execute(
        SetEmulatedMediaParams::builder()
            .features(vec![feature])
            .build(),
    )
    .await?;

    // Stage 6: pre-navigation hook. The place to register dialog handlers;
    // the pipeline itself never dismisses dialogs.
    if let Some(hook) = &options.hooks.before_navigation {
        hook(page.clone())
            .await
            .map_err(|e| Error::hook("before_navigation", e))?;
    }

    // Stage 7: navigation.
    navigate(page, source, options, &network, timeout).await?;

    // Stage 8: post-navigation mutation.
    if options.disable_animations {
        mutate::disable_animations(page).await?;
    }
    if !options.hide_elements.is_empty() {
        mutate::hide_elements(page, &options.hide_elements).await?;
    }
    if !options.remove_elements.is_empty() {
        mutate::remove_elements(page, &options.remove_elements).await?;
    }
    if let Some(selector) = &options.click_element {
        mutate::click_element(page, selector, options.timeout_ms()).await?;
    }

    // Stage 9: script/style injection. Injection needs script execution, so
    // a disabled page is re-enabled for the duration and restored after.
    if mutate::has_injections(options) {
        if options.javascript_enabled {
            mutate::inject_all(page, options).await?;
        } else {
            set_javascript_enabled(page, true).await?;
            let injected = mutate::inject_all(page, options).await;
            set_javascript_enabled(page, false).await?;
            injected?;
        }
    }

    // Stage 10: explicit element wait, unless it is the capture element
    // (which stage 12 waits for anyway).
    if let Some(selector) = &options.wait_for_element {
        if options.element.as_deref() != Some(selector.as_str()) {
            wait::wait_for_selector_visible(page, selector, options.timeout_ms()).await?;
        }
    }

    // Stage 11: pre-screenshot hook, before any bounding-box measurement so
    // it can still affect layout.
    if let Some(hook) = &options.hooks.before_screenshot {
        hook(page.clone())
            .await
            .map_err(|e| Error::hook("before_screenshot", e))?;
    }

    // Stage 12: element wait plus fixed delay.
    if let Some(selector) = &options.element {
        wait::wait_for_selector_visible(page, selector, options.timeout_ms()).await?;
    }
    if options.delay > 0 {
        tokio::time::sleep(Duration::from_secs(options.delay)).await;
    }

    // Stage 13: clip resolution from the element. Element capture always
    // wins over full-page.
    let mut clip = options.clip;
    let mut full_page = options.full_page;
    if let Some(selector) = &options.element {
        let rect = element_rect(page, selector).await?.ok_or_else(|| {
            Error::SelectorTimeout {
                selector: selector.clone(),
                timeout_ms: options.timeout_ms(),
            }
        })?;
        if rect.is_empty() {
            return Err(GeometryError::ZeroSizedElement {
                selector: selector.clone(),
            }
            .into());
        }
        clip = Some(rect);
        full_page = false;
    }

    // Stage 14: scroll-to-element.
    if let Some(target) = &options.scroll_to_element {
        mutate::scroll_to_element(page, target, options.timeout_ms()).await?;
    }

    // Stage 15: full-page / lazy-content scroll loop.
    if full_page || options.preload_lazy_content {
        scroll_through_page(page, &network, full_page, deadline).await?;
    }

    // Stage 16: inset resolution; ignored for full-page captures.
    if !full_page {
        if let Some(inset) = &options.inset {
            if !inset.is_zero() {
                let base = clip.unwrap_or_else(|| ClipRect::viewport(width, height));
                clip = Some(geometry::apply_inset(base, inset)?);
            }
        }
    }

    // Stage 17: output extraction.
    capture::extract(page, options, clip, full_page).await
}

/// Toggle page script execution
async fn set_javascript_enabled(page: &Page, enabled: bool) -> Result<()> {
    page.execute(SetScriptExecutionDisabledParams::new(!enabled))
        .await?;
    Ok(())
}

/// Basic auth, cookies, extra headers, and user agent.
///
/// An explicit `referrer` option takes precedence over a `referer` header,
/// which is stripped here and applied through the navigation parameters.
async fn apply_identity(page: &Page, source: &InputSource, options: &CaptureOptions) -> Result<()> {
    let mut headers: HashMap<String, String> = options.headers.clone();
    if options.referrer.is_some() {
        headers.retain(|name, _| !name.eq_ignore_ascii_case("referer"));
    }
    if let Some(auth) = &options.authentication {
        headers.insert("Authorization".to_string(), auth.basic_header());
    }
    if !headers.is_empty() {
        let map: serde_json::Map<String, serde_json::Value> = headers
            .into_iter()
            .map(|(name, value)| (name, serde_json::Value::String(value)))
            .collect();
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            serde_json::Value::Object(map),
        )))
        .await?;
    }

    if !options.cookies.is_empty() {
        let target = match source {
            InputSource::Url(url) => Some(url),
            InputSource::Html(_) => None,
        };
        for cookie in cookies::translate(&options.cookies, target)? {
            page.set_cookie(cookie).await?;
        }
    }

    if let Some(user_agent) = &options.user_agent {
        page.execute(SetUserAgentOverrideParams::new(user_agent.clone()))
            .await?;
    }

    Ok(())
}

/// Set device metrics; returns the effective viewport CSS size
async fn apply_viewport(page: &Page, options: &CaptureOptions) -> Result<(u32, u32)> {
    let device = options
        .emulate_device
        .as_deref()
        .map(devices::lookup)
        .transpose()?;

    let (width, height, scale_factor, mobile) = match device {
        Some(device) => (device.width, device.height, device.scale_factor, device.mobile),
        None => (options.width, options.height, options.scale_factor, false),
    };

    let metrics = SetDeviceMetricsOverrideParams::builder()
        .width(i64::from(width))
        .height(i64::from(height))
        .device_scale_factor(scale_factor)
        .mobile(mobile)
        .build()
        .map_err(Error::cdp)?;
    page.execute(metrics).await?;

    if let Some(device) = device {
        page.execute(SetUserAgentOverrideParams::new(
            device.user_agent.to_string(),
        ))
        .await?;
        debug!(device = device.name, "applied device profile");
    }

    Ok((width, height))
}

/// Navigate (or set literal content) and wait for load plus network idle
async fn navigate(
    page: &Page,
    source: &InputSource,
    options: &CaptureOptions,
    network: &NetworkActivity,
    timeout: Duration,
) -> Result<()> {
    let timeout_ms = options.timeout_ms();

    match source {
        InputSource::Html(html) => {
            info!("setting literal HTML content");
            tokio::time::timeout(timeout, page.set_content(html.as_str()))
                .await
                .map_err(|_| NavigationError::Timeout(timeout_ms))?
                .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;
        }
        InputSource::Url(url) => {
            info!(%url, "navigating");

            // Subscribe before navigating or the document response is missed.
            let status_watch = if options.fail_on_http_error && source.is_http() {
                Some(DocumentStatus::install(page).await?)
            } else {
                None
            };

            let mut params = NavigateParams::builder().url(url.as_str());
            if let Some(referrer) = &options.referrer {
                params = params.referrer(referrer.clone());
            }
            let params = params.build().map_err(Error::cdp)?;

            tokio::time::timeout(timeout, page.goto(params))
                .await
                .map_err(|_| NavigationError::Timeout(timeout_ms))?
                .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;

            tokio::time::timeout(timeout, page.wait_for_navigation())
                .await
                .map_err(|_| NavigationError::Timeout(timeout_ms))?
                .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;

            if let Some(watch) = status_watch {
                if let Some(status) = watch.status() {
                    if !(200..300).contains(&status) {
                        return Err(NavigationError::HttpStatus {
                            status,
                            url: url.to_string(),
                        }
                        .into());
                    }
                }
            }
        }
    }

    // Network idle is part of the navigation wait-until condition; a miss
    // here is a navigation timeout, unlike in the scroll loop.
    let max_inflight = if options.wait_for_network_idle { 0 } else { 2 };
    if !network.wait_idle(max_inflight, timeout).await {
        return Err(NavigationError::Timeout(timeout_ms).into());
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct PageMetrics {
    viewport: f64,
    total: f64,
    offset: f64,
}

async fn read_page_metrics(page: &Page) -> Result<PageMetrics> {
    page.evaluate(
        "(() => ({ viewport: window.innerHeight, \
         total: document.body.scrollHeight, \
         offset: window.scrollY }))()",
    )
    .await?
    .into_value()
    .map_err(|e| Error::cdp(e.to_string()))
}

/// Scroll through the page one viewport at a time so lazily-loaded content
/// below the fold gets fetched and rendered.
///
/// The body height is re-measured after every step; content appended during
/// the walk grows the target height, which is what lets infinite-scroll
/// galleries be captured. An idle-wait miss is tolerated so pages with
/// persistent background connections cannot stall the loop, and each step's
/// wait is bounded by the remaining share of the overall timeout.
#[instrument(skip(page, network))]
async fn scroll_through_page(
    page: &Page,
    network: &NetworkActivity,
    full_page: bool,
    deadline: Instant,
) -> Result<()> {
    let metrics = read_page_metrics(page).await?;
    let viewport = metrics.viewport.max(1.0);
    let origin = metrics.offset;
    let mut total = metrics.total;
    let mut offset = 0.0;

    if total > viewport {
        debug!(total, viewport, "scrolling through page");
        while offset + viewport < total {
            offset += viewport;
            page.evaluate(format!("window.scrollTo(0, {offset})")).await?;

            let budget = deadline.saturating_duration_since(Instant::now());
            if !network.wait_idle(2, budget).await {
                debug!(offset, "network still busy after scroll step, continuing");
            }
            tokio::time::sleep(SCROLL_SETTLE).await;

            let measured: f64 = page
                .evaluate("document.body.scrollHeight")
                .await?
                .into_value()
                .map_err(|e| Error::cdp(e.to_string()))?;
            total = total.max(measured);
        }
    }

    // Full-page shots start from the top; lazy preloading restores the
    // caller's intended viewport.
    if full_page {
        page.evaluate("window.scrollTo(0, 0)").await?;
    } else {
        page.evaluate(format!("window.scrollTo(0, {origin})")).await?;
    }

    Ok(())
}

/// Bounding rectangle of the first match, in page coordinates
async fn element_rect(page: &Page, selector: &str) -> Result<Option<ClipRect>> {
    let selector_js = wait::js_string(selector);
    let script = format!(
        "(() => {{ const el = document.querySelector({selector_js}); \
         if (!el) return null; \
         const r = el.getBoundingClientRect(); \
         return {{ x: r.x + window.scrollX, y: r.y + window.scrollY, \
         width: r.width, height: r.height }}; }})()"
    );
    page.evaluate(script)
        .await?
        .into_value()
        .map_err(|e| Error::cdp(e.to_string()))
}
