//! Configurable JSON client for HTTP services.
//!
//! # Overview
//! A `Client` is bound to one base URL and a set of default headers. Each
//! `call` appends a path, encodes an optional JSON body, sends the request
//! through the client's engine and decodes the JSON reply.
//!
//! # Design
//! - Transport setup (TLS policy, dialing, timeout, middleware) happens once,
//!   through `ClientOption`s applied in order at construction.
//! - `HttpEngine` owns the timeout and a `RoundTrip` transport; the default
//!   transport is hyper over rustls and accepts any server certificate.
//! - `with_headers` derives a client that shares the engine, so per-caller
//!   headers cost one map clone.
//! - Every failure is returned to the caller as an `Error`; nothing is
//!   retried.

pub mod body;
pub mod client;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
mod exchange;
pub mod options;
pub mod transport;

pub use body::{Body, Escaped, Unescaped, NO_BODY};
pub use client::Client;
pub use config::ClientConfig;
pub use context::Context;
pub use engine::{HttpEngine, DEFAULT_TIMEOUT};
pub use error::{BoxError, Error, Result};
pub use options::{ClientBuilder, ClientOption};
pub use transport::{dialer, Dialer, HttpTransport, RoundTrip};
