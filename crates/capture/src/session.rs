//! Browser session ownership and the operations the capture sequence uses.

use std::time::Duration;

use {
    async_trait::async_trait,
    chromiumoxide::{
        Browser, BrowserConfig as CdpBrowserConfig, Page,
        cdp::browser_protocol::{
            emulation::SetDeviceMetricsOverrideParams,
            page::{
                CaptureScreenshotFormat, EnableParams, EventLifecycleEvent,
                SetDocumentContentParams, SetLifecycleEventsEnabledParams,
            },
        },
        page::ScreenshotParams,
    },
    futures::{StreamExt, stream::BoxStream},
    tokio::task::JoinHandle,
    tracing::{debug, info, warn},
};

use crate::{
    detect,
    error::CaptureError,
    types::{CaptureConfig, LifecycleEvent},
};

/// Operations the capture sequence needs from a browser session.
///
/// [`ChromiumSession`] is the production implementation; the orchestrator is
/// written against this trait so tests can drive it with a mock.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Enable page-domain events and lifecycle notifications.
    async fn enable_lifecycle_reporting(&self) -> Result<(), CaptureError>;

    /// Apply a device-metrics override with the given scale factor.
    async fn set_device_scale_factor(&self, scale: f64) -> Result<(), CaptureError>;

    /// Navigate the page to a URL.
    async fn navigate(&self, url: &str) -> Result<(), CaptureError>;

    /// Replace the document's root markup.
    async fn set_document_content(&self, html: &str) -> Result<(), CaptureError>;

    /// Subscribe to lifecycle events.
    ///
    /// Callers must subscribe before triggering the navigation whose
    /// milestone they intend to await, or the milestone can fire unheard.
    async fn lifecycle_events(&self) -> Result<BoxStream<'static, LifecycleEvent>, CaptureError>;

    /// Capture a full-page screenshot at the given quality.
    async fn capture_screenshot(&self, quality: u8) -> Result<Vec<u8>, CaptureError>;
}

/// One browser process with one page, exclusively owned for one capture.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    /// Launch a browser and open a blank page.
    pub async fn launch(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let Some(executable) = detect::find_browser(config.chrome_path.as_deref()) else {
            return Err(CaptureError::BrowserNotAvailable(detect::install_hint()));
        };

        let mut builder = CdpBrowserConfig::builder()
            .chrome_executable(&executable)
            .request_timeout(Duration::from_millis(config.request_timeout_ms));

        // chromiumoxide runs headless by default; with_head() shows the window.
        if !config.headless {
            builder = builder.with_head();
        }

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        builder = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox");

        let cdp_config = builder.build().map_err(|e| {
            CaptureError::LaunchFailed(format!("failed to build browser config: {e}"))
        })?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| CaptureError::LaunchFailed(format!("browser launch failed: {e}")))?;

        // Drain CDP events so the connection makes progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!(?event, "browser event");
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::LaunchFailed(e.to_string()))?;

        info!(
            executable = %executable.display(),
            headless = config.headless,
            "browser launched"
        );

        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    /// Close the browser. Failures are logged, not surfaced; the child
    /// process is killed on drop regardless.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        self.handler_task.abort();
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn enable_lifecycle_reporting(&self) -> Result<(), CaptureError> {
        self.page
            .execute(EnableParams::default())
            .await
            .map_err(|e| CaptureError::Cdp(e.to_string()))?;

        let params = SetLifecycleEventsEnabledParams::builder()
            .enabled(true)
            .build()
            .map_err(CaptureError::Cdp)?;
        self.page
            .execute(params)
            .await
            .map_err(|e| CaptureError::Cdp(e.to_string()))?;

        Ok(())
    }

    async fn set_device_scale_factor(&self, scale: f64) -> Result<(), CaptureError> {
        // Width/height 0 keeps the current viewport size and overrides only
        // the scale factor.
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(0)
            .height(0)
            .device_scale_factor(scale)
            .mobile(false)
            .build()
            .map_err(CaptureError::Cdp)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| CaptureError::Cdp(e.to_string()))?;

        debug!(scale, "applied device metrics override");
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), CaptureError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| CaptureError::NavigationFailed(e.to_string()))?;

        debug!(url, "navigation issued");
        Ok(())
    }

    async fn set_document_content(&self, html: &str) -> Result<(), CaptureError> {
        let frame_id = self
            .page
            .mainframe()
            .await
            .map_err(|e| CaptureError::ContentInjectionFailed(e.to_string()))?
            .ok_or_else(|| {
                CaptureError::ContentInjectionFailed("page has no main frame".into())
            })?;

        let params = SetDocumentContentParams::builder()
            .frame_id(frame_id)
            .html(html)
            .build()
            .map_err(CaptureError::ContentInjectionFailed)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| CaptureError::ContentInjectionFailed(e.to_string()))?;

        Ok(())
    }

    async fn lifecycle_events(&self) -> Result<BoxStream<'static, LifecycleEvent>, CaptureError> {
        let events = self
            .page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| CaptureError::Cdp(e.to_string()))?;

        Ok(events
            .map(|event| LifecycleEvent {
                name: event.name.clone(),
            })
            .boxed())
    }

    async fn capture_screenshot(&self, quality: u8) -> Result<Vec<u8>, CaptureError> {
        // Quality 100 selects lossless PNG; anything below selects JPEG at
        // that quality.
        let params = if quality >= 100 {
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build()
        } else {
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Jpeg)
                .quality(i64::from(quality))
                .full_page(true)
                .build()
        };

        let bytes = self
            .page
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::ScreenshotFailed(e.to_string()))?;

        info!(bytes = bytes.len(), quality, "captured full-page screenshot");
        Ok(bytes)
    }
}
