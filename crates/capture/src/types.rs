//! Capture request/config types and DPI conversion.

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Rendering DPI that maps to a device scale factor of 1.0.
pub const BASELINE_DPI: u32 = 96;

/// Default capture quality (JPEG encoding below 100).
pub const DEFAULT_QUALITY: u8 = 90;

/// Default rendering DPI.
pub const DEFAULT_DPI: u32 = 200;

/// Convert a rendering DPI to a browser device scale factor.
///
/// 96 DPI is scale 1.0; everything else scales linearly.
pub fn dpi_to_scale(dpi: u32) -> f64 {
    f64::from(dpi) / f64::from(BASELINE_DPI)
}

/// What to render: a remote page, a local HTML file, or HTML text.
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// Remote page, navigated to directly.
    Url(String),

    /// Local HTML file, read and injected into a blank page.
    HtmlFile(PathBuf),

    /// HTML text, injected into a blank page.
    InlineHtml(String),
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "url({})", url),
            Self::HtmlFile(path) => write!(f, "file({})", path.display()),
            Self::InlineHtml(html) => write!(f, "inline({} bytes)", html.len()),
        }
    }
}

/// One screenshot request. Built once from CLI input, immutable afterwards.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Content to render.
    pub source: ContentSource,

    /// Capture quality, 0-100. 100 selects PNG, anything below JPEG.
    pub quality: u8,

    /// Rendering DPI. `None` leaves the browser's device metrics untouched.
    pub dpi: Option<u32>,
}

impl CaptureRequest {
    pub fn new(source: ContentSource) -> Self {
        Self {
            source,
            quality: DEFAULT_QUALITY,
            dpi: Some(DEFAULT_DPI),
        }
    }
}

/// Browser session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Path to a Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    /// Whether to run the browser headless.
    pub headless: bool,
    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,
    /// Deadline for the page-readiness wait, in milliseconds.
    pub ready_timeout_ms: u64,
    /// Timeout for individual CDP requests, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            chrome_args: Vec::new(),
            ready_timeout_ms: 30000,
            request_timeout_ms: 30000,
        }
    }
}

/// A page lifecycle notification, reduced to the milestone name.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub name: String,
}
