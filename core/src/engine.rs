//! The execution engine: a transport plus the per-call timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::transport::{HttpTransport, RoundTrip};

/// Timeout applied to every call unless an option overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Sends requests through a [`RoundTrip`] under a timeout.
///
/// Cloning is cheap and shares the transport, so one engine can back many
/// clients.
#[derive(Clone)]
pub struct HttpEngine {
    transport: Arc<dyn RoundTrip>,
    timeout: Option<Duration>,
}

impl HttpEngine {
    /// Engine over `transport` with no timeout.
    pub fn new(transport: impl RoundTrip + 'static) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    pub fn from_arc(transport: Arc<dyn RoundTrip>) -> Self {
        Self {
            transport,
            timeout: None,
        }
    }

    /// Engine over a fresh [`HttpTransport`] with [`DEFAULT_TIMEOUT`].
    pub fn with_default_transport() -> Result<Self> {
        Ok(Self::new(HttpTransport::new()?).with_timeout(DEFAULT_TIMEOUT))
    }

    /// Replace the timeout. `Duration::ZERO` means no timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.set_timeout(timeout);
        self
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
    }

    pub(crate) fn set_transport(&mut self, transport: Arc<dyn RoundTrip>) {
        self.transport = transport;
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn transport(&self) -> &Arc<dyn RoundTrip> {
        &self.transport
    }

    /// Send `request` and return the full response, bounded by both `ctx`
    /// and the engine timeout.
    pub async fn execute(&self, ctx: &Context, request: Request<Bytes>) -> Result<Response<Bytes>> {
        ctx.run(async {
            let exchange = self.transport.round_trip(request);
            let response = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, exchange)
                    .await
                    .map_err(|_| Error::Timeout(limit))?,
                None => exchange.await,
            };
            response.map_err(Error::Transport)
        })
        .await
    }
}

impl fmt::Debug for HttpEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEngine")
            .field("transport", &self.transport)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct Sleepy(Duration);

    #[async_trait]
    impl RoundTrip for Sleepy {
        async fn round_trip(&self, _request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
            tokio::time::sleep(self.0).await;
            Ok(Response::new(Bytes::from_static(b"{}")))
        }
    }

    fn request() -> Request<Bytes> {
        Request::get("http://localhost/").body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn zero_timeout_disables_the_limit() {
        let engine = HttpEngine::new(Sleepy(Duration::ZERO)).with_timeout(Duration::ZERO);
        assert_eq!(engine.timeout(), None);
    }

    #[tokio::test]
    async fn timeout_aborts_slow_transport() {
        let engine = HttpEngine::new(Sleepy(Duration::from_secs(5)))
            .with_timeout(Duration::from_millis(20));
        let err = engine.execute(&Context::new(), request()).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn context_deadline_fires_before_longer_timeout() {
        let engine = HttpEngine::new(Sleepy(Duration::from_secs(5)))
            .with_timeout(Duration::from_secs(1));
        let ctx = Context::new().with_timeout(Duration::from_millis(20));
        let err = engine.execute(&ctx, request()).await.unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded));
    }

    #[tokio::test]
    async fn fast_transport_completes() {
        let engine = HttpEngine::new(Sleepy(Duration::ZERO)).with_timeout(DEFAULT_TIMEOUT);
        let response = engine.execute(&Context::new(), request()).await.unwrap();
        assert_eq!(response.body().as_ref(), b"{}");
    }

    #[tokio::test]
    async fn clones_share_the_transport() {
        let engine = HttpEngine::with_default_transport().unwrap();
        let copy = engine.clone();
        assert!(Arc::ptr_eq(engine.transport(), copy.transport()));
        assert_eq!(copy.timeout(), Some(DEFAULT_TIMEOUT));
    }
}
