//! The capture sequence: one request in, raw image bytes out.

use std::time::Duration;

use tracing::info;

use crate::{
    error::CaptureError,
    session::PageSession,
    types::{CaptureRequest, ContentSource, dpi_to_scale},
    waiter::{self, NETWORK_IDLE},
};

/// Run one capture against `session` and return the encoded image bytes.
///
/// Step order is fixed: enable lifecycle reporting, apply the optional
/// device-metrics override, subscribe to lifecycle events, load the
/// content, await `networkIdle`, take the screenshot. The first failing
/// step aborts the rest. The caller owns the session and releases it on
/// every exit path; no partial output is ever written here.
pub async fn capture<S>(
    session: &S,
    request: &CaptureRequest,
    ready_timeout: Duration,
) -> Result<Vec<u8>, CaptureError>
where
    S: PageSession + ?Sized,
{
    info!(source = %request.source, quality = request.quality, "starting capture");

    session.enable_lifecycle_reporting().await?;

    if let Some(dpi) = request.dpi {
        session.set_device_scale_factor(dpi_to_scale(dpi)).await?;
    }

    // Subscribe before triggering the load so the milestone cannot fire
    // before anyone is listening.
    let mut events = session.lifecycle_events().await?;

    match &request.source {
        ContentSource::Url(url) => session.navigate(url).await?,
        ContentSource::HtmlFile(path) => {
            let html = tokio::fs::read_to_string(path).await?;
            session.navigate("about:blank").await?;
            session.set_document_content(&html).await?;
        },
        ContentSource::InlineHtml(html) => {
            session.navigate("about:blank").await?;
            session.set_document_content(html).await?;
        },
    }

    waiter::await_milestone(&mut events, NETWORK_IDLE, ready_timeout).await?;

    session.capture_screenshot(request.quality).await
}

#[cfg(test)]
mod tests {
    use std::{io::Write, sync::Mutex};

    use {
        async_trait::async_trait,
        futures::{StreamExt, stream, stream::BoxStream},
    };

    use super::*;
    use crate::types::LifecycleEvent;

    const READY_TIMEOUT: Duration = Duration::from_secs(5);

    /// Records every operation and serves canned responses.
    struct MockSession {
        steps: Mutex<Vec<String>>,
        /// Lifecycle events emitted to the subscriber.
        events: Vec<&'static str>,
        /// Bytes returned from the screenshot step.
        screenshot: Vec<u8>,
        /// Step name that should fail, if any.
        fail_at: Option<&'static str>,
    }

    impl MockSession {
        fn new() -> Self {
            Self {
                steps: Mutex::new(Vec::new()),
                events: vec![NETWORK_IDLE],
                screenshot: b"0123456789".to_vec(),
                fail_at: None,
            }
        }

        fn record(&self, step: impl Into<String>) -> Result<(), CaptureError> {
            let step = step.into();
            let failing = self.fail_at.is_some_and(|name| step.starts_with(name));
            self.steps.lock().unwrap().push(step.clone());
            if failing {
                return Err(CaptureError::Cdp(format!("mock failure at {step}")));
            }
            Ok(())
        }

        fn steps(&self) -> Vec<String> {
            self.steps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSession for MockSession {
        async fn enable_lifecycle_reporting(&self) -> Result<(), CaptureError> {
            self.record("enable")
        }

        async fn set_device_scale_factor(&self, scale: f64) -> Result<(), CaptureError> {
            self.record(format!("scale:{scale}"))
        }

        async fn navigate(&self, url: &str) -> Result<(), CaptureError> {
            self.record(format!("navigate:{url}"))
        }

        async fn set_document_content(&self, html: &str) -> Result<(), CaptureError> {
            self.record(format!("content:{html}"))
        }

        async fn lifecycle_events(
            &self,
        ) -> Result<BoxStream<'static, LifecycleEvent>, CaptureError> {
            self.record("subscribe")?;
            let events: Vec<_> = self
                .events
                .iter()
                .map(|name| LifecycleEvent {
                    name: (*name).to_string(),
                })
                .collect();
            Ok(stream::iter(events).boxed())
        }

        async fn capture_screenshot(&self, quality: u8) -> Result<Vec<u8>, CaptureError> {
            self.record(format!("screenshot:{quality}"))
                .map_err(|_| CaptureError::ScreenshotFailed("mock".into()))?;
            Ok(self.screenshot.clone())
        }
    }

    #[tokio::test]
    async fn url_capture_runs_steps_in_order() {
        let session = MockSession::new();
        let request = CaptureRequest {
            source: ContentSource::Url("https://example.test".into()),
            quality: 90,
            dpi: Some(192),
        };

        let bytes = capture(&session, &request, READY_TIMEOUT).await.unwrap();
        assert_eq!(bytes, b"0123456789");

        assert_eq!(
            session.steps(),
            vec![
                "enable",
                "scale:2",
                "subscribe",
                "navigate:https://example.test",
                "screenshot:90",
            ]
        );
    }

    #[tokio::test]
    async fn no_dpi_skips_the_metrics_override() {
        let session = MockSession::new();
        let request = CaptureRequest {
            source: ContentSource::Url("https://example.test".into()),
            quality: 90,
            dpi: None,
        };

        capture(&session, &request, READY_TIMEOUT).await.unwrap();
        assert!(!session.steps().iter().any(|s| s.starts_with("scale")));
    }

    #[tokio::test]
    async fn inline_html_goes_through_blank_page_and_content_call() {
        let session = MockSession::new();
        let request = CaptureRequest {
            source: ContentSource::InlineHtml("<h1>hi</h1>".into()),
            quality: 100,
            dpi: None,
        };

        capture(&session, &request, READY_TIMEOUT).await.unwrap();
        assert_eq!(
            session.steps(),
            vec![
                "enable",
                "subscribe",
                "navigate:about:blank",
                "content:<h1>hi</h1>",
                "screenshot:100",
            ]
        );
    }

    #[tokio::test]
    async fn html_file_is_read_before_injection() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<p>from disk</p>").unwrap();

        let session = MockSession::new();
        let request = CaptureRequest {
            source: ContentSource::HtmlFile(file.path().to_path_buf()),
            quality: 90,
            dpi: None,
        };

        capture(&session, &request, READY_TIMEOUT).await.unwrap();
        assert!(
            session
                .steps()
                .contains(&"content:<p>from disk</p>".to_string())
        );
    }

    #[tokio::test]
    async fn missing_html_file_surfaces_io_error_before_navigation() {
        let session = MockSession::new();
        let request = CaptureRequest {
            source: ContentSource::HtmlFile("/nonexistent/page.html".into()),
            quality: 90,
            dpi: None,
        };

        let result = capture(&session, &request, READY_TIMEOUT).await;
        assert!(matches!(result, Err(CaptureError::Io(_))));
        assert!(!session.steps().iter().any(|s| s.starts_with("navigate")));
    }

    #[tokio::test]
    async fn enable_failure_short_circuits_everything_else() {
        let session = MockSession {
            fail_at: Some("enable"),
            ..MockSession::new()
        };
        let request = CaptureRequest::new(ContentSource::Url("https://example.test".into()));

        let result = capture(&session, &request, READY_TIMEOUT).await;
        assert!(result.is_err());
        assert_eq!(session.steps(), vec!["enable"]);
    }

    #[tokio::test]
    async fn screenshot_failure_returns_error_not_bytes() {
        let session = MockSession {
            fail_at: Some("screenshot"),
            ..MockSession::new()
        };
        let request = CaptureRequest::new(ContentSource::Url("https://example.test".into()));

        let result = capture(&session, &request, READY_TIMEOUT).await;
        assert!(matches!(result, Err(CaptureError::ScreenshotFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_milestone_cancels_before_the_screenshot() {
        let session = MockSession {
            events: vec!["DOMContentLoaded", "load"],
            ..MockSession::new()
        };
        let request = CaptureRequest::new(ContentSource::Url("https://example.test".into()));

        let result = capture(&session, &request, Duration::from_millis(200)).await;
        assert!(matches!(result, Err(CaptureError::Cancelled(_))));
        assert!(!session.steps().iter().any(|s| s.starts_with("screenshot")));
    }
}
