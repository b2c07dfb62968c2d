//! Browser and capture-session lifecycle
//!
//! A capture call owns one page for its whole duration, and usually the
//! browser too. [`CaptureSession::release`] runs on every exit path of the
//! capture entry points, so the page is always closed and a launched browser
//! is closed unless the caller asked to keep it alive.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::inspector::{self, EventTargetCrashed};
use chromiumoxide::cdp::browser_protocol::network::SetBlockedUrLsParams;
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SessionError};
use crate::options::{CaptureOptions, LaunchOptions};

/// URL patterns blocked when `block_ads` is set. A small static stand-in for
/// a full filter list; blocking is best-effort.
const AD_PATTERNS: &[&str] = &[
    "*doubleclick.net*",
    "*googlesyndication.com*",
    "*adservice.google.*",
    "*googletagservices.com*",
    "*amazon-adsystem.com*",
    "*adnxs.com*",
    "*taboola.com*",
    "*outbrain.com*",
];

/// A launched (or caller-supplied) browser plus its event-handler task.
///
/// Cheap to share via `Arc`; hand one to [`CaptureOptions::browser`] to run
/// several captures against a single browser process, each with its own page.
pub struct BrowserHandle {
    browser: Mutex<Option<Browser>>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for BrowserHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserHandle").finish_non_exhaustive()
    }
}

impl BrowserHandle {
    /// Launch a browser with the given launch options.
    ///
    /// Debug mode forces a headed launch so the capture can be watched.
    #[instrument(skip(launch, debug))]
    pub async fn launch(launch: &LaunchOptions, debug: bool) -> Result<Arc<Self>> {
        let headless = launch.headless && !debug;
        info!(headless, "launching browser");

        let mut builder = BrowserConfig::builder();

        if !launch.headless || debug {
            builder = builder.with_head();
        }
        if !launch.sandbox {
            builder = builder.arg("--no-sandbox");
        }
        if let Some(path) = &launch.executable {
            builder = builder.chrome_executable(path);
        }
        for arg in &launch.args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(SessionError::ConfigError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            debug!("browser handler finished");
        });

        Ok(Arc::new(Self {
            browser: Mutex::new(Some(browser)),
            handler_task: Mutex::new(Some(handler_task)),
        }))
    }

    /// Open a fresh page on this browser
    pub(crate) async fn new_page(&self) -> Result<Page> {
        let guard = self.browser.lock().await;
        let browser = guard.as_ref().ok_or(SessionError::AlreadyClosed)?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::PageCreationFailed(e.to_string()))?;
        debug!("created capture page");
        Ok(page)
    }

    /// Close the browser and wait for its handler task to drain.
    ///
    /// Idempotent; closing an already-closed handle fails with
    /// [`SessionError::AlreadyClosed`].
    #[instrument(skip(self))]
    pub async fn close(&self) -> Result<()> {
        let mut browser = self
            .browser
            .lock()
            .await
            .take()
            .ok_or(SessionError::AlreadyClosed)?;

        browser
            .close()
            .await
            .map_err(|e| SessionError::CloseFailed(e.to_string()))?;

        if let Some(task) = self.handler_task.lock().await.take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
        }

        info!("browser closed");
        Ok(())
    }
}

/// One page (and usually one browser) owned for the duration of one capture
pub struct CaptureSession {
    browser: Arc<BrowserHandle>,
    page: Page,
    owns_browser: bool,
    keep_alive: bool,
    crashed: Arc<AtomicBool>,
    monitor_tasks: Vec<JoinHandle<()>>,
}

impl CaptureSession {
    /// Acquire the browser and page for one capture call.
    ///
    /// Launches a browser unless the options carry one; on any setup failure
    /// the partially-acquired resources are released before the error is
    /// returned.
    #[instrument(skip(options))]
    pub(crate) async fn acquire(options: &CaptureOptions) -> Result<Self> {
        let (browser, owns_browser) = match &options.browser {
            Some(handle) => (Arc::clone(handle), false),
            None => (
                BrowserHandle::launch(&options.launch, options.debug).await?,
                true,
            ),
        };

        let page = match browser.new_page().await {
            Ok(page) => page,
            Err(e) => {
                if owns_browser {
                    let _ = browser.close().await;
                }
                return Err(e);
            }
        };

        match Self::attach(&page, options).await {
            Ok((crashed, monitor_tasks)) => Ok(Self {
                browser,
                page,
                owns_browser,
                keep_alive: options.keep_alive,
                crashed,
                monitor_tasks,
            }),
            Err(e) => {
                let _ = page.close().await;
                if owns_browser {
                    let _ = browser.close().await;
                }
                Err(e)
            }
        }
    }

    /// Install crash/console watchers and best-effort ad blocking
    async fn attach(
        page: &Page,
        options: &CaptureOptions,
    ) -> Result<(Arc<AtomicBool>, Vec<JoinHandle<()>>)> {
        let crashed = Arc::new(AtomicBool::new(false));
        let mut tasks = Vec::new();

        // Crash notifications arrive on the inspector domain.
        page.execute(inspector::EnableParams::default()).await?;
        let mut crash_events = page.event_listener::<EventTargetCrashed>().await?;
        let crash_flag = Arc::clone(&crashed);
        tasks.push(tokio::spawn(async move {
            if crash_events.next().await.is_some() {
                warn!("capture page crashed");
                crash_flag.store(true, Ordering::SeqCst);
            }
        }));

        if options.hooks.on_console.is_some() || options.debug {
            let mut console_events = page.event_listener::<EventConsoleApiCalled>().await?;
            let hook = options.hooks.on_console.clone();
            let forward_to_log = options.debug;
            tasks.push(tokio::spawn(async move {
                while let Some(event) = console_events.next().await {
                    let message = format_console_event(&event);
                    if forward_to_log {
                        debug!(target: "pageshot::console", "{message}");
                    }
                    if let Some(hook) = &hook {
                        hook(&message);
                    }
                }
            }));
        }

        if options.debug {
            let mut error_events = page.event_listener::<EventExceptionThrown>().await?;
            tasks.push(tokio::spawn(async move {
                while let Some(event) = error_events.next().await {
                    warn!(
                        target: "pageshot::console",
                        "page error: {}",
                        event.exception_details.text
                    );
                }
            }));
        }

        if options.block_ads {
            let patterns: Vec<String> = AD_PATTERNS.iter().map(|p| p.to_string()).collect();
            if let Err(e) = page.execute(SetBlockedUrLsParams::new(patterns)).await {
                debug!("ad blocking unavailable, continuing without: {e}");
            }
        }

        Ok((crashed, tasks))
    }

    /// The capture page
    pub(crate) fn page(&self) -> &Page {
        &self.page
    }

    /// Whether the page reported a fatal crash at any point
    pub(crate) fn crashed(&self) -> bool {
        self.crashed.load(Ordering::SeqCst)
    }

    /// Close the page, and the browser when this call launched it and the
    /// caller did not ask to keep it alive. Runs on every exit path.
    #[instrument(skip(self))]
    pub(crate) async fn release(self) -> Result<()> {
        for task in &self.monitor_tasks {
            task.abort();
        }

        let page_result = self.page.close().await;

        if self.owns_browser && !self.keep_alive {
            self.browser.close().await?;
        }

        page_result.map_err(|e| SessionError::CloseFailed(e.to_string()))?;
        Ok(())
    }
}

fn format_console_event(event: &EventConsoleApiCalled) -> String {
    let parts: Vec<String> = event
        .args
        .iter()
        .map(|arg| {
            arg.value
                .as_ref()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .or_else(|| arg.description.clone())
                .unwrap_or_else(|| "<object>".to_string())
        })
        .collect();
    format!("[{:?}] {}", event.r#type, parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ad_patterns_are_wildcarded() {
        for pattern in AD_PATTERNS {
            assert!(pattern.starts_with('*') && pattern.ends_with('*'), "{pattern}");
        }
    }

    #[test]
    fn test_browser_handle_debug_is_opaque() {
        let handle = BrowserHandle {
            browser: Mutex::new(None),
            handler_task: Mutex::new(None),
        };
        assert!(format!("{handle:?}").contains("BrowserHandle"));
    }
}
