//! Post-navigation page mutations
//!
//! Hide/remove rules and the animation override are injected as stylesheet
//! tags; `modules`/`scripts`/`styles` entries are classified as remote URLs,
//! local files (by extension), or inline source and injected accordingly.
//! All mutations target a page owned exclusively by one capture call.

use std::path::Path;
use std::time::Duration;

use chromiumoxide::Page;
use futures::future::try_join_all;
use tracing::{debug, instrument};

use crate::browser::wait::{self, js_string};
use crate::error::{Error, Result};
use crate::options::{CaptureOptions, ScrollEdge, ScrollTarget};

/// Global override suppressing animations and transitions
const DISABLE_ANIMATIONS_CSS: &str = "\
*, *::before, *::after {\n\
  animation: none !important;\n\
  transition: none !important;\n\
}";

/// What an injection entry turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InjectionSource {
    /// Remote resource, injected by reference
    Url(String),
    /// Local file, read and injected inline
    File(String),
    /// Literal source text
    Inline(String),
}

/// Classify an injection entry.
///
/// Remote URLs by scheme prefix, local files by a `.js`/`.css` extension,
/// anything else is inline source.
pub(crate) fn classify(entry: &str) -> InjectionSource {
    if entry.starts_with("http://") || entry.starts_with("https://") {
        return InjectionSource::Url(entry.to_string());
    }
    let extension = Path::new(entry)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("js") | Some("css") => InjectionSource::File(entry.to_string()),
        _ => InjectionSource::Inline(entry.to_string()),
    }
}

/// Append a `<style>` tag with the given CSS text
async fn inject_css_text(page: &Page, css: &str) -> Result<()> {
    let css_js = js_string(css);
    let script = format!(
        "(() => {{ const style = document.createElement('style'); \
         style.appendChild(document.createTextNode({css_js})); \
         document.head.appendChild(style); }})()"
    );
    page.evaluate(script).await?;
    Ok(())
}

/// Suppress CSS animations and transitions for stable captures
pub(crate) async fn disable_animations(page: &Page) -> Result<()> {
    inject_css_text(page, DISABLE_ANIMATIONS_CSS).await
}

/// Hide elements while keeping their layout
#[instrument(skip(page, selectors))]
pub(crate) async fn hide_elements(page: &Page, selectors: &[String]) -> Result<()> {
    let rule = format!(
        "{} {{ visibility: hidden !important; }}",
        selectors.join(", ")
    );
    inject_css_text(page, &rule).await
}

/// Remove elements from layout entirely
#[instrument(skip(page, selectors))]
pub(crate) async fn remove_elements(page: &Page, selectors: &[String]) -> Result<()> {
    let rule = format!("{} {{ display: none !important; }}", selectors.join(", "));
    inject_css_text(page, &rule).await
}

/// Wait for an element and click it
#[instrument(skip(page))]
pub(crate) async fn click_element(page: &Page, selector: &str, timeout_ms: u64) -> Result<()> {
    wait::wait_for_selector_visible(page, selector, timeout_ms).await?;
    let element = page
        .find_element(selector)
        .await
        .map_err(|_| Error::SelectorTimeout {
            selector: selector.to_string(),
            timeout_ms,
        })?;
    element.click().await?;
    debug!(selector, "clicked element");
    Ok(())
}

/// Inject every `modules`/`scripts`/`styles` entry.
///
/// Entries are independent and injected concurrently. Local files are read
/// before injection; a missing file fails the capture.
pub(crate) async fn inject_all(page: &Page, options: &CaptureOptions) -> Result<()> {
    let mut jobs = Vec::new();
    for entry in &options.modules {
        jobs.push(inject_script(page, entry, true));
    }
    for entry in &options.scripts {
        jobs.push(inject_script(page, entry, false));
    }
    let styles = options
        .styles
        .iter()
        .map(|entry| inject_style(page, entry));

    let scripts = try_join_all(jobs);
    let styles = try_join_all(styles);
    tokio::try_join!(scripts, styles)?;
    Ok(())
}

/// Whether any injection entries are configured
pub(crate) fn has_injections(options: &CaptureOptions) -> bool {
    !options.modules.is_empty() || !options.scripts.is_empty() || !options.styles.is_empty()
}

async fn inject_script(page: &Page, entry: &str, module: bool) -> Result<()> {
    let script_type = if module { "module" } else { "text/javascript" };
    match classify(entry) {
        InjectionSource::Url(url) => {
            let url_js = js_string(&url);
            let type_js = js_string(script_type);
            let script = format!(
                r#"
                new Promise((resolve, reject) => {{
                    const el = document.createElement('script');
                    el.type = {type_js};
                    el.src = {url_js};
                    el.onload = () => resolve(true);
                    el.onerror = () => reject(new Error('failed to load ' + {url_js}));
                    document.head.appendChild(el);
                }})
                "#
            );
            page.evaluate(script).await?;
        }
        InjectionSource::File(path) => {
            let source = tokio::fs::read_to_string(&path).await?;
            append_script_tag(page, &source, script_type).await?;
        }
        InjectionSource::Inline(source) => {
            append_script_tag(page, &source, script_type).await?;
        }
    }
    Ok(())
}

async fn append_script_tag(page: &Page, source: &str, script_type: &str) -> Result<()> {
    let source_js = js_string(source);
    let type_js = js_string(script_type);
    let script = format!(
        "(() => {{ const el = document.createElement('script'); \
         el.type = {type_js}; \
         el.textContent = {source_js}; \
         document.head.appendChild(el); }})()"
    );
    page.evaluate(script).await?;
    Ok(())
}

async fn inject_style(page: &Page, entry: &str) -> Result<()> {
    match classify(entry) {
        InjectionSource::Url(url) => {
            let url_js = js_string(&url);
            let script = format!(
                r#"
                new Promise((resolve, reject) => {{
                    const el = document.createElement('link');
                    el.rel = 'stylesheet';
                    el.href = {url_js};
                    el.onload = () => resolve(true);
                    el.onerror = () => reject(new Error('failed to load ' + {url_js}));
                    document.head.appendChild(el);
                }})
                "#
            );
            page.evaluate(script).await?;
        }
        InjectionSource::File(path) => {
            let css = tokio::fs::read_to_string(&path).await?;
            inject_css_text(page, &css).await?;
        }
        InjectionSource::Inline(css) => {
            inject_css_text(page, &css).await?;
        }
    }
    Ok(())
}

/// Scroll so the target element is positioned against the requested edge of
/// its nearest scrollable ancestor.
///
/// The ancestor walk is an iterative parent-chain traversal testing for
/// actual overflow; with no scrollable ancestor the element is scrolled into
/// view directly.
#[instrument(skip(page, target))]
pub(crate) async fn scroll_to_element(
    page: &Page,
    target: &ScrollTarget,
    timeout_ms: u64,
) -> Result<()> {
    let selector = target.selector();
    wait::wait_for_selector_visible(page, selector, timeout_ms).await?;

    let (edge, offset) = match target {
        ScrollTarget::Selector(_) => (ScrollEdge::Top, 0.0),
        ScrollTarget::Positioned {
            offset_from,
            offset,
            ..
        } => (*offset_from, *offset),
    };
    let edge = match edge {
        ScrollEdge::Top => "top",
        ScrollEdge::Bottom => "bottom",
        ScrollEdge::Left => "left",
        ScrollEdge::Right => "right",
    };

    let selector_js = js_string(selector);
    let edge_js = js_string(edge);
    let script = format!(
        r#"
        (() => {{
            const el = document.querySelector({selector_js});
            if (!el) return false;
            const edge = {edge_js};
            const offset = {offset};
            const isScrollable = (node) => {{
                const style = window.getComputedStyle(node);
                const overflow = style.overflow + style.overflowY + style.overflowX;
                const overflows = node.scrollHeight > node.clientHeight
                    || node.scrollWidth > node.clientWidth;
                return overflows && /(auto|scroll)/.test(overflow);
            }};
            let container = el.parentElement;
            while (container && !isScrollable(container)) {{
                container = container.parentElement;
            }}
            if (!container) {{
                el.scrollIntoView();
                return true;
            }}
            const target = el.getBoundingClientRect();
            const box = container.getBoundingClientRect();
            switch (edge) {{
                case 'top': container.scrollTop += target.top - box.top - offset; break;
                case 'bottom': container.scrollTop += target.bottom - box.bottom + offset; break;
                case 'left': container.scrollLeft += target.left - box.left - offset; break;
                case 'right': container.scrollLeft += target.right - box.right + offset; break;
            }}
            return true;
        }})()
        "#
    );

    let found: bool = page
        .evaluate(script)
        .await?
        .into_value()
        .map_err(|e| Error::cdp(e.to_string()))?;
    if !found {
        return Err(Error::SelectorTimeout {
            selector: selector.to_string(),
            timeout_ms,
        });
    }
    Ok(())
}

/// Fixed settle delay after each scroll step of the lazy-content loop
pub(crate) const SCROLL_SETTLE: Duration = Duration::from_millis(200);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_remote_urls() {
        assert_eq!(
            classify("https://cdn.example.com/lib.js"),
            InjectionSource::Url("https://cdn.example.com/lib.js".to_string())
        );
        assert_eq!(
            classify("http://cdn.example.com/theme.css"),
            InjectionSource::Url("http://cdn.example.com/theme.css".to_string())
        );
    }

    #[test]
    fn test_classify_local_files_by_extension() {
        assert_eq!(
            classify("assets/override.js"),
            InjectionSource::File("assets/override.js".to_string())
        );
        assert_eq!(
            classify("/srv/theme.CSS"),
            InjectionSource::File("/srv/theme.CSS".to_string())
        );
    }

    #[test]
    fn test_classify_inline_source() {
        assert_eq!(
            classify("body { background: red; }"),
            InjectionSource::Inline("body { background: red; }".to_string())
        );
        assert_eq!(
            classify("window.__flag = 1;"),
            InjectionSource::Inline("window.__flag = 1;".to_string())
        );
    }

    #[test]
    fn test_animation_override_covers_pseudo_elements() {
        assert!(DISABLE_ANIMATIONS_CSS.contains("::before"));
        assert!(DISABLE_ANIMATIONS_CSS.contains("animation: none"));
        assert!(DISABLE_ANIMATIONS_CSS.contains("transition: none"));
    }
}
