//! HTTPS calls against the mock server behind a self-signed certificate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use mock_server::Item;
use rcgen::CertifiedKey;
use rest_client::{Client, ClientOption, Context, Error, NO_BODY};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;

/// Serve the mock app over TLS with a fresh self-signed certificate for
/// `localhost` and return its base URL.
async fn start_tls_server() -> String {
    let CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![cert.der().clone()], key)
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(tls) = acceptor.accept(stream).await else {
                    return;
                };
                let service = TowerToHyperService::new(mock_server::app());
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(tls), service)
                    .await;
            });
        }
    });
    format!("https://localhost:{port}/")
}

#[tokio::test]
async fn default_client_accepts_self_signed_certificate() {
    let client = Client::new(&start_tls_server().await, []).unwrap();

    let item: Item = client
        .fetch(&Context::new(), "GET", "/item", NO_BODY)
        .await
        .unwrap();

    assert_eq!(item.name, "ok");
}

#[tokio::test]
async fn verifying_client_rejects_self_signed_certificate() {
    let client = Client::new(
        &start_tls_server().await,
        [ClientOption::accept_invalid_certs(false)],
    )
    .unwrap();

    let err = client
        .fetch::<_, Item>(&Context::new(), "GET", "/item", NO_BODY)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn custom_dialer_carries_the_tls_stream() {
    let base = start_tls_server().await;
    let dials = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&dials);
    let client = Client::builder(&base)
        .dialer(move |addr| {
            seen.fetch_add(1, Ordering::SeqCst);
            async move { TcpStream::connect(addr).await }
        })
        .build()
        .unwrap();

    let item: Item = client
        .fetch(&Context::new(), "GET", "/item", NO_BODY)
        .await
        .unwrap();

    assert_eq!(item.name, "ok");
    assert_eq!(dials.load(Ordering::SeqCst), 1);
}
