//! Response body decorator that releases its tracking record on close.
//!
//! # Responsibilities
//! - Forward body frames unchanged
//! - Forward bulk copies straight to a writer
//! - Release the tracking record when the body is closed (dropped)
//!
//! # Design Decisions
//! - Closing a body is dropping it; release happens before the inner body drops
//! - Release happens at most once, enforced by ownership of the `Registration`

use std::pin::Pin;
use std::task::{Context, Poll};

use http_body::{Body, Frame, SizeHint};
use http_body_util::BodyExt;
use hyper::body::Buf;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::CopyError;
use crate::tracker::record::RequestId;
use crate::tracker::registry::Registration;

/// A response body bound to a tracking record.
pub struct TrackedBody<B> {
    inner: Pin<Box<B>>,
    registration: Option<Registration>,
}

impl<B> TrackedBody<B> {
    pub(crate) fn new(inner: B, registration: Option<Registration>) -> Self {
        Self {
            inner: Box::pin(inner),
            registration,
        }
    }

    /// Id of the record this body releases, if still held.
    pub fn request_id(&self) -> Option<RequestId> {
        self.registration.as_ref().map(Registration::id)
    }

    /// Release the tracking record and drop the inner body.
    pub fn close(self) {
        drop(self);
    }
}

impl<B: Body> TrackedBody<B> {
    /// Drain the body into `writer`, then close it.
    ///
    /// Returns the number of bytes written. Trailers are skipped.
    pub async fn copy_to<W>(mut self, writer: &mut W) -> Result<u64, CopyError<B::Error>>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut copied = 0u64;
        while let Some(frame) = self.inner.frame().await {
            let frame = frame.map_err(CopyError::Body)?;
            let Ok(mut data) = frame.into_data() else {
                continue;
            };
            while data.has_remaining() {
                let chunk = data.chunk();
                let len = chunk.len();
                writer.write_all(chunk).await?;
                data.advance(len);
                copied += len as u64;
            }
        }
        writer.flush().await?;
        Ok(copied)
    }
}

impl<B: Body> Body for TrackedBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.get_mut().inner.as_mut().poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B> Drop for TrackedBody<B> {
    fn drop(&mut self) {
        // Release first; the inner body drops with the remaining fields.
        if let Some(registration) = self.registration.take() {
            registration.release();
        }
    }
}

impl<B> std::fmt::Debug for TrackedBody<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedBody")
            .field("request_id", &self.request_id())
            .finish()
    }
}
