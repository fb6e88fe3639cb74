//! Static file serving for uploaded assets
//!
//! Files under `root` are served at `mount` for GET and HEAD. Paths that try
//! to leave `root` (`..` segments, backslashes, NUL bytes, or symlinks that
//! resolve outside it) are answered with 403. Missing files and directories
//! are not claimed, so the request falls through to the not-found fallback.

use crate::config::UploadsConfig;
use crate::error::FrameworkError;
use crate::http::{HttpResponse, Request, Response};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StaticFiles {
    mount: String,
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(mount: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let mount = mount.into();
        Self {
            mount: mount.trim_end_matches('/').to_string(),
            root: root.into(),
        }
    }

    pub fn from_config(config: &UploadsConfig) -> Self {
        Self::new(config.mount.clone(), config.dir.clone())
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve the request if it targets an existing file under the mount
    pub async fn serve(&self, request: &Request) -> Option<Response> {
        let method = request.method();
        if method != http::Method::GET && method != http::Method::HEAD {
            return None;
        }

        let rest = request.path().strip_prefix(self.mount.as_str())?;
        let rest = rest.strip_prefix('/')?;

        let relative = match sanitize(rest) {
            Ok(Some(relative)) => relative,
            Ok(None) => return None,
            Err(()) => {
                tracing::warn!(path = request.path(), "static path rejected");
                return Some(Err(FrameworkError::Forbidden.into()));
            }
        };

        let candidate = self.root.join(&relative);
        let metadata = tokio::fs::metadata(&candidate).await.ok()?;
        if !metadata.is_file() {
            return None;
        }

        let root = tokio::fs::canonicalize(&self.root).await.ok()?;
        let resolved = tokio::fs::canonicalize(&candidate).await.ok()?;
        if !resolved.starts_with(&root) {
            tracing::warn!(path = request.path(), "static path escapes uploads directory");
            return Some(Err(FrameworkError::Forbidden.into()));
        }

        let contents = match tokio::fs::read(&resolved).await {
            Ok(contents) => contents,
            Err(e) => {
                return Some(Err(FrameworkError::internal(format!(
                    "Cannot read {}: {}",
                    resolved.display(),
                    e
                ))
                .into()))
            }
        };

        let response = HttpResponse::bytes(contents, content_type(&resolved));
        if method == http::Method::HEAD {
            Some(Ok(response.without_body()))
        } else {
            Some(Ok(response))
        }
    }
}

/// Decode and check a mount-relative path
///
/// `Ok(None)` for an empty path (the mount itself), `Err` for anything that
/// could address a file outside the root.
fn sanitize(raw: &str) -> Result<Option<PathBuf>, ()> {
    let decoded = percent_decode(raw).ok_or(())?;
    let mut relative = PathBuf::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(()),
            s if s.contains('\\') || s.contains('\0') => return Err(()),
            s => relative.push(s),
        }
    }
    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(relative))
    }
}

/// Decode `%XX` escapes of a URL path
///
/// `+` stays a literal plus: it only means space in form-encoded query strings.
/// Invalid escapes or non-UTF-8 output yield `None`.
fn percent_decode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = raw.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        _ => "application/octet-stream",
    }
}
