//! The REST client: base URL, default headers and the call path.
//!
//! # Design
//! `Client` is read-only after construction. The engine and base URL sit
//! behind `Arc`s so `with_headers` can hand out a new client that shares them
//! and differs only in its header map. Nothing on the call path writes shared
//! state, so one client can serve concurrent calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::body::{self, Body};
use crate::context::Context;
use crate::engine::HttpEngine;
use crate::error::{Error, Result};
use crate::exchange;
use crate::options::{ClientBuilder, ClientOption};

/// Reusable client for one JSON-speaking HTTP service.
#[derive(Debug, Clone)]
pub struct Client {
    engine: Arc<HttpEngine>,
    base_url: Arc<str>,
    headers: BTreeMap<String, String>,
}

impl Client {
    /// Client for `base_url` (trailing slashes dropped) with the default
    /// engine, then `options` applied in order.
    ///
    /// Defaults: any server certificate accepted, two minute timeout,
    /// `Content-Type: application/json`.
    pub fn new<I>(base_url: &str, options: I) -> Result<Self>
    where
        I: IntoIterator<Item = ClientOption>,
    {
        let mut engine = HttpEngine::with_default_transport()?;
        for option in options {
            option.apply(&mut engine)?;
        }

        let base_url = base_url.trim_end_matches('/');
        tracing::debug!(base_url, timeout = ?engine.timeout(), "rest client ready");

        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        Ok(Self {
            engine: Arc::new(engine),
            base_url: Arc::from(base_url),
            headers,
        })
    }

    /// Start a [`ClientBuilder`] for `base_url`.
    pub fn builder(base_url: &str) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// New client with `headers` laid over this one's; on a name collision
    /// the new value wins. `self` is left as is.
    pub fn with_headers<I, K, V>(&self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged = self.headers.clone();
        merged.extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        Self {
            engine: Arc::clone(&self.engine),
            base_url: Arc::clone(&self.base_url),
            headers: merged,
        }
    }

    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Headers set on every request, including the JSON content type.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Engine that executes requests. Clients derived with
    /// [`with_headers`](Self::with_headers) share it with this one.
    pub fn http_engine(&self) -> &HttpEngine {
        &self.engine
    }

    /// Send `method` to `base_url + path` and decode the JSON reply into
    /// `out`.
    ///
    /// `out` is only written when the whole call succeeds. Statuses outside
    /// `200..300` fail with [`Error::Status`].
    pub async fn call<B, T>(
        &self,
        ctx: &Context,
        method: &str,
        path: &str,
        body: Option<&B>,
        out: &mut T,
    ) -> Result<()>
    where
        B: Body + ?Sized,
        T: DeserializeOwned,
    {
        *out = self.fetch(ctx, method, path, body).await?;
        Ok(())
    }

    /// Like [`call`](Self::call) but returns the decoded value.
    pub async fn fetch<B, T>(
        &self,
        ctx: &Context,
        method: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Body + ?Sized,
        T: DeserializeOwned,
    {
        let payload = body.map(body::encode).transpose().map_err(Error::Encode)?;
        let url = format!("{}{path}", self.base_url);
        let request = exchange::build_request(method, &url, &self.headers, payload)?;

        tracing::trace!(method, %url, "sending request");
        let response = self.engine.execute(ctx, request).await?;

        exchange::check_status(&response)?;
        exchange::decode(response.body())
    }
}
