//! Pluggable transport and the default hyper-based implementation.
//!
//! # Design
//! `RoundTrip` is the seam every request crosses: it takes a fully built
//! request with an in-memory body and returns the response with its body
//! already read. Middleware wraps one `RoundTrip` in another.
//!
//! `HttpTransport` is the default. It layers three connectors:
//! - `DialConnector` opens the TCP stream, through a custom [`Dialer`] when
//!   one is installed;
//! - hyper-rustls upgrades `https` URIs to TLS, either verifying against the
//!   webpki roots or accepting any certificate;
//! - hyper-util's legacy client speaks HTTP/1.1 and pools connections.
//!
//! Settings are immutable on a built transport. `with_dialer` and
//! `with_accept_invalid_certs` return a rebuilt copy instead of mutating one
//! that may already be shared.

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request, Response, Uri};
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::{TokioExecutor, TokioIo};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::net::TcpStream;

use crate::error::{BoxError, Result};

/// Sends one request and returns the complete response.
#[async_trait]
pub trait RoundTrip: Send + Sync + fmt::Debug {
    async fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError>;

    /// `Some` only for the default [`HttpTransport`]; options that tune the
    /// default transport use this to find it.
    fn as_http_transport(&self) -> Option<&HttpTransport> {
        None
    }
}

/// Custom dial function. Receives the target as `host:port`.
pub type Dialer = Arc<dyn Fn(String) -> BoxFuture<'static, io::Result<TcpStream>> + Send + Sync>;

/// Box a plain async dial function into a [`Dialer`].
pub fn dialer<F, Fut>(dial: F) -> Dialer
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = io::Result<TcpStream>> + Send + 'static,
{
    Arc::new(move |addr| Box::pin(dial(addr)))
}

#[derive(Clone)]
struct TransportSettings {
    accept_invalid_certs: bool,
    dialer: Option<Dialer>,
}

type Connector = HttpsConnector<DialConnector>;

/// Default transport: HTTP/1.1 over TCP, with TLS for `https` URLs.
#[derive(Clone)]
pub struct HttpTransport {
    settings: TransportSettings,
    client: LegacyClient<Connector, Full<Bytes>>,
}

impl HttpTransport {
    /// Transport that accepts any server certificate and dials plain TCP.
    pub fn new() -> Result<Self> {
        Self::build(TransportSettings {
            accept_invalid_certs: true,
            dialer: None,
        })
    }

    /// Copy of this transport that opens connections through `dialer`.
    pub fn with_dialer(&self, dialer: Dialer) -> Result<Self> {
        let mut settings = self.settings.clone();
        settings.dialer = Some(dialer);
        Self::build(settings)
    }

    /// Copy of this transport with the given certificate policy. `false`
    /// verifies server certificates against the webpki root set.
    pub fn with_accept_invalid_certs(&self, accept: bool) -> Result<Self> {
        let mut settings = self.settings.clone();
        settings.accept_invalid_certs = accept;
        Self::build(settings)
    }

    pub fn accepts_invalid_certs(&self) -> bool {
        self.settings.accept_invalid_certs
    }

    pub fn has_dialer(&self) -> bool {
        self.settings.dialer.is_some()
    }

    fn build(settings: TransportSettings) -> Result<Self> {
        let tls = tls_config(settings.accept_invalid_certs)?;
        let connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .wrap_connector(DialConnector {
                dialer: settings.dialer.clone(),
            });
        let client = LegacyClient::builder(TokioExecutor::new()).build(connector);
        Ok(Self { settings, client })
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("accept_invalid_certs", &self.settings.accept_invalid_certs)
            .field("dialer", &self.settings.dialer.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RoundTrip for HttpTransport {
    async fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        let response = self.client.request(request.map(Full::new)).await?;
        let (parts, body) = response.into_parts();
        let body = body.collect().await?.to_bytes();
        Ok(Response::from_parts(parts, body))
    }

    fn as_http_transport(&self) -> Option<&HttpTransport> {
        Some(self)
    }
}

fn tls_config(accept_invalid_certs: bool) -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let config = if accept_invalid_certs {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCert(provider)))
            .with_no_client_auth()
    } else {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    };
    Ok(config)
}

/// Certificate verifier that trusts every server certificate. Handshake
/// signatures are still checked so the peer must hold the certificate's key.
#[derive(Debug)]
struct AcceptAnyCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

/// Innermost connector: resolves the URI to `host:port` and opens a TCP
/// stream, via the custom dialer if there is one.
#[derive(Clone)]
struct DialConnector {
    dialer: Option<Dialer>,
}

impl tower_service::Service<Uri> for DialConnector {
    type Response = TokioIo<TcpStream>;
    type Error = io::Error;
    type Future = BoxFuture<'static, io::Result<TokioIo<TcpStream>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let dialer = self.dialer.clone();
        Box::pin(async move {
            let addr = dial_addr(&uri)?;
            let stream = match dialer {
                Some(dial) => dial(addr).await?,
                None => TcpStream::connect(addr.as_str()).await?,
            };
            Ok(TokioIo::new(stream))
        })
    }
}

fn dial_addr(uri: &Uri) -> io::Result<String> {
    let host = uri.host().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("missing host in {uri}"))
    })?;
    let port = match uri.port_u16() {
        Some(port) => port,
        None if uri.scheme_str() == Some("https") => 443,
        None => 80,
    };
    Ok(format!("{host}:{port}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dial_addr_uses_explicit_port() {
        let uri: Uri = "http://127.0.0.1:8080/items".parse().unwrap();
        assert_eq!(dial_addr(&uri).unwrap(), "127.0.0.1:8080");
    }

    #[test]
    fn dial_addr_defaults_port_by_scheme() {
        let http: Uri = "http://example.com/".parse().unwrap();
        let https: Uri = "https://example.com/".parse().unwrap();
        assert_eq!(dial_addr(&http).unwrap(), "example.com:80");
        assert_eq!(dial_addr(&https).unwrap(), "example.com:443");
    }

    #[test]
    fn dial_addr_rejects_relative_uri() {
        let uri: Uri = "/relative".parse().unwrap();
        let err = dial_addr(&uri).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn default_transport_trusts_any_certificate() {
        let transport = HttpTransport::new().unwrap();
        assert!(transport.accepts_invalid_certs());
        assert!(!transport.has_dialer());
        assert!(transport.as_http_transport().is_some());
    }

    #[tokio::test]
    async fn rebuilt_copies_leave_original_untouched() {
        let transport = HttpTransport::new().unwrap();
        let verifying = transport.with_accept_invalid_certs(false).unwrap();
        let dialing = transport
            .with_dialer(dialer(|addr| async move { TcpStream::connect(addr).await }))
            .unwrap();

        assert!(!verifying.accepts_invalid_certs());
        assert!(dialing.has_dialer());
        assert!(dialing.accepts_invalid_certs());
        assert!(transport.accepts_invalid_certs());
        assert!(!transport.has_dialer());
    }

    #[tokio::test]
    async fn debug_hides_connector_internals() {
        let transport = HttpTransport::new().unwrap();
        let debug = format!("{transport:?}");
        assert!(debug.starts_with("HttpTransport"));
        assert!(debug.contains("accept_invalid_certs: true"));
    }
}
