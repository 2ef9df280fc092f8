//! Turning raw CLI input into a content source and an output path.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use pageshot_capture::ContentSource;

/// Invalid or missing command-line input. Reported as a message plus usage
/// text; never reaches the browser.
#[derive(Debug, PartialEq, Eq)]
pub struct UsageError(pub String);

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.0)
    }
}

/// Pick the content source from `--url`, `--html`, and the positional input.
///
/// Exactly one of the three must be given. The positional form is
/// auto-detected: an `http(s)://` prefix means a URL, an existing file
/// means a local HTML file.
pub fn resolve_source(
    url: Option<String>,
    html: Option<PathBuf>,
    input: Option<String>,
) -> Result<ContentSource, UsageError> {
    let given = usize::from(url.is_some()) + usize::from(html.is_some()) + usize::from(input.is_some());
    if given == 0 {
        return Err(UsageError(
            "a URL or HTML file to render is required".into(),
        ));
    }
    if given > 1 {
        return Err(UsageError(
            "give exactly one of --url, --html, or a positional input".into(),
        ));
    }

    if let Some(url) = url {
        return check_url(&url);
    }

    if let Some(path) = html {
        if !path.exists() {
            return Err(UsageError(format!(
                "HTML file not found: {}",
                path.display()
            )));
        }
        return Ok(ContentSource::HtmlFile(path));
    }

    // Positional input: auto-detect.
    let input = input.unwrap_or_default();
    if is_url(&input) {
        check_url(&input)
    } else if Path::new(&input).exists() {
        Ok(ContentSource::HtmlFile(PathBuf::from(input)))
    } else {
        Err(UsageError(
            "input must be a valid URL (http:// or https://) or an existing HTML file path".into(),
        ))
    }
}

/// Resolve the destination image path.
///
/// An explicit `--output` wins. A file input defaults to a sibling path
/// with a `.png` extension; everything else defaults to `screenshot.png`.
pub fn resolve_output(source: &ContentSource, explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }

    match source {
        ContentSource::HtmlFile(path) => path.with_extension("png"),
        ContentSource::Url(_) | ContentSource::InlineHtml(_) => PathBuf::from("screenshot.png"),
    }
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Validate a URL before it reaches the browser. Only http/https schemes
/// are navigable here.
fn check_url(input: &str) -> Result<ContentSource, UsageError> {
    let parsed = url::Url::parse(input)
        .map_err(|e| UsageError(format!("invalid URL '{input}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(ContentSource::Url(input.to_string())),
        scheme => Err(UsageError(format!(
            "unsupported URL scheme '{scheme}', only http/https allowed"
        ))),
    }
}
