//! Construction-time options and the client builder.
//!
//! # Design
//! A `ClientOption` is a boxed step that edits the engine a `Client` is
//! being built around. Steps run in the order given and are neither sorted
//! nor deduplicated, so a later option overrides an earlier one.
//!
//! Options that tune the default transport (`dialer`,
//! `accept_invalid_certs`) only act when the engine's transport *is* the
//! default `HttpTransport`. After `round_trip_wrapper` or `http_engine` has
//! installed something else they do nothing, without error.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::client::Client;
use crate::engine::HttpEngine;
use crate::error::Result;
use crate::transport::{self, RoundTrip};

type Apply = Box<dyn FnOnce(&mut HttpEngine) -> Result<()> + Send>;

/// One configuration step applied while a [`Client`] is constructed.
pub struct ClientOption {
    name: &'static str,
    apply: Apply,
}

impl ClientOption {
    fn new<F>(name: &'static str, apply: F) -> Self
    where
        F: FnOnce(&mut HttpEngine) -> Result<()> + Send + 'static,
    {
        Self {
            name,
            apply: Box::new(apply),
        }
    }

    /// Replace the transport with `wrap(current)`. Wrappers stack: each one
    /// receives whatever the previous options left installed.
    pub fn round_trip_wrapper<F>(wrap: F) -> Self
    where
        F: FnOnce(Arc<dyn RoundTrip>) -> Arc<dyn RoundTrip> + Send + 'static,
    {
        Self::new("round_trip_wrapper", move |engine| {
            let wrapped = wrap(Arc::clone(engine.transport()));
            engine.set_transport(wrapped);
            Ok(())
        })
    }

    /// Open connections through `dial`, which receives `host:port`.
    ///
    /// Ignored when the current transport is not the default one.
    pub fn dialer<F, Fut>(dial: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = io::Result<TcpStream>> + Send + 'static,
    {
        let dialer = transport::dialer(dial);
        Self::new("dialer", move |engine| {
            let Some(current) = engine.transport().as_http_transport() else {
                tracing::debug!("custom dialer ignored: transport is not HttpTransport");
                return Ok(());
            };
            let rebuilt = current.with_dialer(dialer)?;
            engine.set_transport(Arc::new(rebuilt));
            Ok(())
        })
    }

    /// Per-call timeout. `Duration::ZERO` disables it.
    pub fn timeout(timeout: Duration) -> Self {
        Self::new("timeout", move |engine| {
            engine.set_timeout(timeout);
            Ok(())
        })
    }

    /// Replace the whole engine. `None` leaves the current one in place.
    pub fn http_engine(replacement: Option<HttpEngine>) -> Self {
        Self::new("http_engine", move |engine| {
            if let Some(replacement) = replacement {
                *engine = replacement;
            }
            Ok(())
        })
    }

    /// Certificate policy of the default transport. `false` turns
    /// verification on.
    ///
    /// Ignored when the current transport is not the default one.
    pub fn accept_invalid_certs(accept: bool) -> Self {
        Self::new("accept_invalid_certs", move |engine| {
            let Some(current) = engine.transport().as_http_transport() else {
                tracing::debug!("certificate policy ignored: transport is not HttpTransport");
                return Ok(());
            };
            let rebuilt = current.with_accept_invalid_certs(accept)?;
            engine.set_transport(Arc::new(rebuilt));
            Ok(())
        })
    }

    pub(crate) fn apply(self, engine: &mut HttpEngine) -> Result<()> {
        tracing::trace!(option = self.name, "applying client option");
        (self.apply)(engine)
    }
}

impl fmt::Debug for ClientOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClientOption").field(&self.name).finish()
    }
}

/// Collects options and default headers, then builds a [`Client`].
///
/// ```ignore
/// let client = Client::builder("https://api.example.com/")
///     .timeout(Duration::from_secs(10))
///     .header("Accept", "application/json")
///     .build()?;
/// ```
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: String,
    options: Vec<ClientOption>,
    headers: BTreeMap<String, String>,
}

impl ClientBuilder {
    pub(crate) fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            options: Vec::new(),
            headers: BTreeMap::new(),
        }
    }

    /// Append an option; it runs after every option added before it.
    pub fn option(mut self, option: ClientOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        self.option(ClientOption::timeout(timeout))
    }

    pub fn dialer<F, Fut>(self, dial: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = io::Result<TcpStream>> + Send + 'static,
    {
        self.option(ClientOption::dialer(dial))
    }

    pub fn round_trip_wrapper<F>(self, wrap: F) -> Self
    where
        F: FnOnce(Arc<dyn RoundTrip>) -> Arc<dyn RoundTrip> + Send + 'static,
    {
        self.option(ClientOption::round_trip_wrapper(wrap))
    }

    pub fn http_engine(self, engine: HttpEngine) -> Self {
        self.option(ClientOption::http_engine(Some(engine)))
    }

    pub fn accept_invalid_certs(self, accept: bool) -> Self {
        self.option(ClientOption::accept_invalid_certs(accept))
    }

    /// Header added on top of the defaults; a later value for the same name
    /// wins.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Result<Client> {
        let client = Client::new(&self.base_url, self.options)?;
        if self.headers.is_empty() {
            return Ok(client);
        }
        Ok(client.with_headers(self.headers))
    }
}
