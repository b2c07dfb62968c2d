//! Wait primitives
//!
//! Network-idle detection counts in-flight requests from the CDP network
//! events rather than sleeping a fixed interval: a page is idle once the
//! count stays at or below a threshold for a sustained window. Selector
//! waits poll inside the page, bounded by the capture timeout.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    EventResponseReceived, ResourceType,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};

/// How long the in-flight count must hold at or below the threshold
pub(crate) const IDLE_SUSTAIN: Duration = Duration::from_millis(500);

const IDLE_POLL: Duration = Duration::from_millis(50);

/// Counts in-flight network requests from CDP events.
///
/// Install before navigation so the document request itself is counted.
/// Long-lived streams (WebSocket, EventSource) are excluded; they never
/// finish and would otherwise keep the page permanently busy.
pub(crate) struct NetworkActivity {
    inflight: Arc<AtomicI64>,
    tasks: Vec<JoinHandle<()>>,
}

impl NetworkActivity {
    /// Enable the network domain and subscribe to request lifecycle events
    pub(crate) async fn install(page: &Page) -> Result<Self> {
        page.execute(EnableParams::default()).await?;

        let inflight = Arc::new(AtomicI64::new(0));
        let mut tasks = Vec::new();

        let mut started = page.event_listener::<EventRequestWillBeSent>().await?;
        let count = Arc::clone(&inflight);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = started.next().await {
                if matches!(
                    event.r#type,
                    Some(ResourceType::WebSocket) | Some(ResourceType::EventSource)
                ) {
                    continue;
                }
                count.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let mut finished = page.event_listener::<EventLoadingFinished>().await?;
        let count = Arc::clone(&inflight);
        tasks.push(tokio::spawn(async move {
            while finished.next().await.is_some() {
                let _ = count.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                    Some((v - 1).max(0))
                });
            }
        }));

        let mut failed = page.event_listener::<EventLoadingFailed>().await?;
        let count = Arc::clone(&inflight);
        tasks.push(tokio::spawn(async move {
            while failed.next().await.is_some() {
                let _ = count.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                    Some((v - 1).max(0))
                });
            }
        }));

        Ok(Self { inflight, tasks })
    }

    /// Wait until at most `max_inflight` requests remain for
    /// [`IDLE_SUSTAIN`], or until `budget` runs out.
    ///
    /// Returns whether idleness was reached; callers decide whether a miss
    /// is fatal (navigation) or tolerated (the scroll loop).
    pub(crate) async fn wait_idle(&self, max_inflight: i64, budget: Duration) -> bool {
        let deadline = Instant::now() + budget;
        let mut idle_since: Option<Instant> = None;

        loop {
            let now = Instant::now();
            if now >= deadline {
                debug!(
                    inflight = self.inflight.load(Ordering::SeqCst),
                    "network-idle budget exhausted"
                );
                return false;
            }

            if self.inflight.load(Ordering::SeqCst) <= max_inflight {
                match idle_since {
                    Some(since) if now.duration_since(since) >= IDLE_SUSTAIN => return true,
                    Some(_) => {}
                    None => idle_since = Some(now),
                }
            } else {
                idle_since = None;
            }

            tokio::time::sleep(IDLE_POLL).await;
        }
    }
}

impl Drop for NetworkActivity {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Records the HTTP status of the main-document response.
///
/// Install before navigation; only the first `Document` response counts, so
/// redirect-chain intermediates and subresources are ignored.
pub(crate) struct DocumentStatus {
    status: Arc<Mutex<Option<u16>>>,
    task: JoinHandle<()>,
}

impl DocumentStatus {
    /// Subscribe to response events on the page
    pub(crate) async fn install(page: &Page) -> Result<Self> {
        let status = Arc::new(Mutex::new(None));
        let mut responses = page.event_listener::<EventResponseReceived>().await?;
        let slot = Arc::clone(&status);
        let task = tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                if event.r#type == ResourceType::Document {
                    if let Ok(mut guard) = slot.lock() {
                        guard.get_or_insert(event.response.status as u16);
                    }
                    break;
                }
            }
        });
        Ok(Self { status, task })
    }

    /// The recorded main-document status, if one arrived
    pub(crate) fn status(&self) -> Option<u16> {
        self.status.lock().ok().and_then(|guard| *guard)
    }
}

impl Drop for DocumentStatus {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Wait for a selector to match an element that is also visible.
///
/// Visibility means not `display: none`/`visibility: hidden` and a
/// non-empty layout box. Polls inside the page; bounded by `timeout_ms`.
pub(crate) async fn wait_for_selector_visible(
    page: &Page,
    selector: &str,
    timeout_ms: u64,
) -> Result<()> {
    let selector_js = js_string(selector);
    let script = format!(
        r#"
        new Promise((resolve, reject) => {{
            const selector = {selector_js};
            const deadline = Date.now() + {timeout_ms};
            const isVisible = (el) => {{
                const style = window.getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                return style.visibility !== 'hidden'
                    && style.display !== 'none'
                    && rect.width > 0
                    && rect.height > 0;
            }};
            (function poll() {{
                const el = document.querySelector(selector);
                if (el && isVisible(el)) {{
                    resolve(true);
                }} else if (Date.now() > deadline) {{
                    reject(new Error('timed out waiting for ' + selector));
                }} else {{
                    setTimeout(poll, 100);
                }}
            }})();
        }})
        "#
    );

    let timeout = Duration::from_millis(timeout_ms + 1000);
    tokio::time::timeout(timeout, page.evaluate(script))
        .await
        .map_err(|_| Error::SelectorTimeout {
            selector: selector.to_string(),
            timeout_ms,
        })?
        .map_err(|_| Error::SelectorTimeout {
            selector: selector.to_string(),
            timeout_ms,
        })?;

    Ok(())
}

/// Embed a Rust string as a JS string literal (JSON escaping rules)
pub(crate) fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("a'b\"c"), r#""a'b\"c""#);
    }

    #[test]
    fn test_js_string_plain_selector() {
        assert_eq!(js_string("#main > .item"), r##""#main > .item""##);
    }

    #[tokio::test]
    async fn test_wait_idle_counts_down_budget() {
        // An activity tracker with no events behind it is immediately idle.
        let activity = NetworkActivity {
            inflight: Arc::new(AtomicI64::new(0)),
            tasks: Vec::new(),
        };
        assert!(activity.wait_idle(0, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_wait_idle_tolerates_threshold() {
        let activity = NetworkActivity {
            inflight: Arc::new(AtomicI64::new(2)),
            tasks: Vec::new(),
        };
        // Two in-flight requests are within the lenient threshold...
        assert!(activity.wait_idle(2, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_wait_idle_gives_up_when_busy() {
        let activity = NetworkActivity {
            inflight: Arc::new(AtomicI64::new(5)),
            tasks: Vec::new(),
        };
        // ...but five never settle under a strict threshold.
        assert!(!activity.wait_idle(0, Duration::from_millis(200)).await);
    }
}
