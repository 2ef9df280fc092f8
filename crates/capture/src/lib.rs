//! Headless Chrome/Chromium capture over CDP: render a page, wait for it to
//! settle, take a full-page screenshot.
//!
//! # Pieces
//!
//! - **session**: one exclusively-owned browser process + page per capture
//! - **waiter**: block until the page reports a lifecycle milestone
//! - **capture**: the fixed step sequence from request to image bytes
//! - **detect**: locate a Chromium-based executable on the host
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use pageshot_capture::{CaptureConfig, CaptureRequest, ChromiumSession, ContentSource};
//!
//! let config = CaptureConfig::default();
//! let session = ChromiumSession::launch(&config).await?;
//!
//! let request = CaptureRequest::new(ContentSource::Url("https://example.com".into()));
//! let result = pageshot_capture::capture(&session, &request, Duration::from_secs(30)).await;
//!
//! session.close().await;
//! let bytes = result?;
//! ```

pub mod capture;
pub mod detect;
pub mod error;
pub mod session;
pub mod types;
pub mod waiter;

pub use {
    capture::capture,
    error::CaptureError,
    session::{ChromiumSession, PageSession},
    types::{CaptureConfig, CaptureRequest, ContentSource, LifecycleEvent},
    waiter::NETWORK_IDLE,
};
