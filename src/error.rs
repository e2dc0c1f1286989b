//! Error types shared across the crate.
//!
//! `HttpError` turns a failed HTTP response into an error value carrying the
//! status line and a bounded excerpt of the body.

use std::error::Error as StdError;
use std::fmt;

use http::{Response, StatusCode};
use http_body::Body;
use http_body_util::BodyExt;
use hyper::body::Buf;
use hyper::ext::ReasonPhrase;
use thiserror::Error;

/// Upper bound on the body excerpt read into an `HttpError`.
pub const MAX_ERROR_BODY: usize = 512;

/// Default message layout: `%S` is the status line, `%B` the body excerpt.
pub const DEFAULT_ERROR_FORMAT: &str = "HTTP Error %S - %B";

/// Errors from draining a tracked body into a writer.
#[derive(Debug, Error)]
pub enum CopyError<E> {
    /// Reading from the response body failed.
    #[error("response body read failed: {0}")]
    Body(E),

    /// Writing to the destination failed.
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// A completed HTTP response with a non-success outcome.
#[derive(Debug, Clone)]
pub struct HttpError {
    format: String,
    status: StatusCode,
    status_line: String,
    body: Vec<u8>,
}

impl HttpError {
    /// Build an error with the default message layout.
    ///
    /// Reads at most `MAX_ERROR_BODY` bytes of the body.
    pub async fn from_response<B: Body>(response: Response<B>) -> Self {
        Self::with_format(response, DEFAULT_ERROR_FORMAT).await
    }

    /// Build an error with a custom message layout.
    ///
    /// `%S` in `format` expands to the status line (e.g. `404 Not Found`),
    /// `%B` to the body excerpt and `%%` to a literal `%`. The template is
    /// expanded in a single pass, so the status line and body are never
    /// re-scanned. Text interpolated into `format` from outside should go
    /// through [`escape_format`] so a stray `%B` in it stays literal.
    ///
    /// Body read errors are ignored; whatever was read before the failure is kept.
    pub async fn with_format<B: Body>(response: Response<B>, format: impl Into<String>) -> Self {
        let status = response.status();
        let status_line = status_line(&response);
        let body = read_excerpt(response.into_body(), MAX_ERROR_BODY).await;
        Self {
            format: format.into(),
            status,
            status_line,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The body excerpt captured with the error.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_status(&self, code: u16) -> bool {
        self.status.as_u16() == code
    }

    /// Status code and reason phrase, e.g. `404 Not Found`.
    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    fn render(&self) -> String {
        let body = String::from_utf8_lossy(&self.body);
        let mut out =
            String::with_capacity(self.format.len() + self.status_line.len() + body.len());
        let mut chars = self.format.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('S') => out.push_str(&self.status_line),
                Some('B') => out.push_str(&body),
                Some('%') => out.push('%'),
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }
        out
    }
}

/// Escape `%` in text that will be embedded in an `HttpError` format.
pub fn escape_format(text: &str) -> String {
    text.replace('%', "%%")
}

/// The reason phrase the server sent wins over the canonical one.
fn status_line<B>(response: &Response<B>) -> String {
    let status = response.status();
    let reason = response
        .extensions()
        .get::<ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned())
        .or_else(|| status.canonical_reason().map(str::to_string));
    match reason {
        Some(reason) => format!("{} {}", status.as_str(), reason),
        None => status.as_str().to_string(),
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl StdError for HttpError {}

/// Whether `err`, or any error in its source chain, is an `HttpError` with the given status.
pub fn is_http_status(err: &(dyn StdError + 'static), code: u16) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(http) = err.downcast_ref::<HttpError>() {
            return http.is_status(code);
        }
        current = err.source();
    }
    false
}

async fn read_excerpt<B: Body>(body: B, limit: usize) -> Vec<u8> {
    let mut body = Box::pin(body);
    let mut excerpt = Vec::new();
    while excerpt.len() < limit {
        let Some(Ok(frame)) = body.frame().await else {
            break;
        };
        let Ok(mut data) = frame.into_data() else {
            continue;
        };
        while data.has_remaining() && excerpt.len() < limit {
            let chunk = data.chunk();
            let take = chunk.len().min(limit - excerpt.len());
            excerpt.extend_from_slice(&chunk[..take]);
            data.advance(take);
        }
    }
    excerpt
}
