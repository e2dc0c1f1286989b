//! Tower layer and service that track outbound requests.
//!
//! # Responsibilities
//! - Register each request before it reaches the inner transport
//! - Bind successful response bodies to their record
//! - Release the record at once when the inner transport fails
//!
//! # Design Decisions
//! - No retries, timeouts or rewriting: the inner service's semantics are untouched
//! - A response future dropped before completion releases its record
//! - The inner service is not synchronized; it must handle concurrency itself

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use http::{Request, Response};
use tower::{Layer, Service};

use crate::tracker::body::TrackedBody;
use crate::tracker::registry::{Registration, Registry};

/// Layer that wraps services with request tracking.
#[derive(Clone)]
pub struct TrackerLayer {
    registry: Arc<Registry>,
}

impl TrackerLayer {
    pub(crate) fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

impl<S> Layer<S> for TrackerLayer {
    type Service = TrackedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TrackedService::new(inner, Arc::clone(&self.registry))
    }
}

/// A transport wrapped with request tracking.
#[derive(Clone)]
pub struct TrackedService<S> {
    inner: S,
    registry: Arc<Registry>,
}

impl<S> TrackedService<S> {
    pub(crate) fn new(inner: S, registry: Arc<Registry>) -> Self {
        Self { inner, registry }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TrackedService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = Response<TrackedBody<ResBody>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let registration = self.registry.track(request.method(), request.uri());
        ResponseFuture {
            inner: Box::pin(self.inner.call(request)),
            registration: Some(registration),
        }
    }
}

/// Response future for [`TrackedService`].
pub struct ResponseFuture<F> {
    inner: Pin<Box<F>>,
    registration: Option<Registration>,
}

impl<F, B, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<TrackedBody<B>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match ready!(this.inner.as_mut().poll(cx)) {
            Ok(response) => {
                let registration = this.registration.take();
                Poll::Ready(Ok(response.map(|body| TrackedBody::new(body, registration))))
            }
            Err(err) => {
                if let Some(registration) = this.registration.take() {
                    tracing::debug!(
                        request_id = %registration.id(),
                        "Upstream call failed, releasing record"
                    );
                    registration.release();
                }
                Poll::Ready(Err(err))
            }
        }
    }
}
