//! Download link resolution and endpoint URL construction
//!
//! All URLs handed out by the crate are derived from the single configured service root.
//! Path segments are appended to the root (never replacing its own path), so a service
//! mounted under a prefix such as `https://example.com/api` keeps working.

use crate::error::{Error, Result};
use crate::types::FileName;
use url::Url;

/// Path segment under which the service exposes artifacts
const DOWNLOAD_SEGMENT: &str = "download";

/// Turn a server-relative artifact path into an absolute, fetchable URL
///
/// Accepts either the path returned by `/generate/` (`/download/x.jsonl`, with or without
/// the leading slash) or a bare filename as listed by the history endpoint (`x.jsonl`).
/// Both forms resolve to the same URL. Segments are percent-decoded before being
/// re-encoded, so resolving an already-encoded path is stable.
///
/// This is a pure function: the same inputs always produce the same URL.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an empty path, a `.`/`..` segment or a segment that
/// is not valid UTF-8 once decoded, and [`Error::Config`] when `base` cannot carry a path.
///
/// # Examples
///
/// ```
/// use datagen_client::links::resolve_download_url;
/// use url::Url;
///
/// let base = Url::parse("https://datagen.example.com").unwrap();
/// let a = resolve_download_url(&base, "/download/sports.jsonl").unwrap();
/// let b = resolve_download_url(&base, "sports.jsonl").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "https://datagen.example.com/download/sports.jsonl");
/// ```
pub fn resolve_download_url(base: &Url, path: &str) -> Result<Url> {
    let path = path.trim();
    let path = path.split(['?', '#']).next().unwrap_or_default();

    let mut segments = Vec::new();
    for raw in path.split('/').filter(|s| !s.is_empty()) {
        let decoded = urlencoding::decode(raw).map_err(|_| {
            Error::validation("download_path", format!("segment {raw:?} is not valid UTF-8"))
        })?;
        if decoded == "." || decoded == ".." {
            return Err(Error::validation(
                "download_path",
                format!("relative segment {decoded:?} is not allowed"),
            ));
        }
        segments.push(decoded.into_owned());
    }

    match segments.len() {
        0 => Err(Error::validation("download_path", "path is empty")),
        1 => append_segments(base, [DOWNLOAD_SEGMENT, segments[0].as_str()]),
        _ => append_segments(base, segments.iter().map(String::as_str)),
    }
}

/// Download URL for an artifact identifier
///
/// Unlike [`resolve_download_url`], the identifier is always treated as a single segment.
pub fn download_url_for(base: &Url, file_name: &FileName) -> Result<Url> {
    append_segments(base, [DOWNLOAD_SEGMENT, file_name.as_str()])
}

/// Absolute URL of a service endpoint such as `/generate/` or `/status`
///
/// A trailing slash in `path` is preserved.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url> {
    append_segments(base, path.trim_start_matches('/').split('/'))
}

fn append_segments<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| Error::config("base_url", "URL cannot be used as a base"))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}
