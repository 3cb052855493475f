use axum::http::{Method, Request, Response, Uri};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};

/// Layer that logs one line per handled request.
#[derive(Clone, Default)]
pub struct RequestLogLayer;

impl RequestLogLayer {
    /// Creates a new RequestLogLayer
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService { inner }
    }
}

/// Service that logs method, path, status and latency of each request.
#[derive(Clone)]
pub struct RequestLogService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLogService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = RequestLogFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        RequestLogFuture {
            method: request.method().clone(),
            uri: request.uri().clone(),
            started_at: Instant::now(),
            future: self.inner.call(request),
        }
    }
}

/// Whole milliseconds in `elapsed`, saturating at `u64::MAX`.
fn latency_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

pin_project! {
    /// Future that logs the request once the inner service has responded
    pub struct RequestLogFuture<F> {
        #[pin]
        future: F,
        method: Method,
        uri: Uri,
        started_at: Instant,
    }
}

impl<F, ResBody, E> Future for RequestLogFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.future.poll(cx) {
            Poll::Ready(Ok(response)) => {
                tracing::info!(
                    method = %this.method,
                    path = %this.uri.path(),
                    status = response.status().as_u16(),
                    latency_ms = latency_ms(this.started_at.elapsed()),
                    "{} {}",
                    this.method,
                    this.uri.path()
                );
                Poll::Ready(Ok(response))
            }
            Poll::Ready(Err(e)) => {
                tracing::error!(
                    method = %this.method,
                    path = %this.uri.path(),
                    "{} {} failed before producing a response",
                    this.method,
                    this.uri.path()
                );
                Poll::Ready(Err(e))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
