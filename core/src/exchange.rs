//! Request assembly and response interpretation for a single call.
//!
//! # Design
//! These helpers are pure: they turn call arguments into an
//! `http::Request<Bytes>` and an `http::Response<Bytes>` back into a value
//! or an error, without touching the network. `Client::call` strings them
//! together around `HttpEngine::execute`.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONNECTION};
use http::{Request, Response};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Build a request for `url`, asking the peer to close the connection after
/// this exchange and setting every header in `headers`.
pub(crate) fn build_request(
    method: &str,
    url: &str,
    headers: &BTreeMap<String, String>,
    body: Option<Vec<u8>>,
) -> Result<Request<Bytes>> {
    let mut request = Request::builder()
        .method(method)
        .uri(url)
        .body(body.map(Bytes::from).unwrap_or_default())?;

    let map = request.headers_mut();
    map.insert(CONNECTION, HeaderValue::from_static("close"));
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(http::Error::from)?;
        let value = HeaderValue::from_str(value).map_err(http::Error::from)?;
        map.insert(name, value);
    }
    Ok(request)
}

/// `Ok` for `200..300`, otherwise `Error::Status` with the status line.
pub(crate) fn check_status(response: &Response<Bytes>) -> Result<()> {
    if (200..300).contains(&response.status().as_u16()) {
        return Ok(());
    }
    Err(Error::Status(status_line(response)))
}

/// `"<code> <reason>"`, preferring the reason phrase the server actually
/// sent over the canonical one.
pub(crate) fn status_line(response: &Response<Bytes>) -> String {
    let status = response.status();
    let wire = response
        .extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok());
    match wire.or_else(|| status.canonical_reason()) {
        Some(reason) => format!("{} {reason}", status.as_str()),
        None => status.as_str().to_string(),
    }
}

/// Decode the first JSON value in `body`; anything after it is ignored.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let mut de = serde_json::Deserializer::from_slice(body);
    T::deserialize(&mut de).map_err(Error::Decode)
}
