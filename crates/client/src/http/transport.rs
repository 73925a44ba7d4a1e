//! TCP and TLS connection establishment.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use go2web_core::Error;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use url::Url;

/// Transport selected by the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn from_url(url: &Url) -> Result<Self, Error> {
        match url.scheme() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(Error::InvalidUrl(format!("unsupported scheme: {other}"))),
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// An open byte stream to the origin, plain or TLS-wrapped.
pub enum Connection {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Connection {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Connection::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Connection::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Connection::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Connection::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Connection::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Opens connections with a bounded connect (and handshake) time.
#[derive(Clone)]
pub struct TransportConnector {
    tls: TlsConnector,
    connect_timeout: Duration,
}

impl std::fmt::Debug for TransportConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConnector")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl TransportConnector {
    /// Build a connector. With `insecure` set, server certificates are not
    /// validated (handshake signatures still are).
    pub fn new(connect_timeout: Duration, insecure: bool) -> Result<Self, Error> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Transport(format!("TLS configuration failed: {e}")))?;

        let config = if insecure {
            tracing::warn!("TLS certificate validation disabled");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
                .with_no_client_auth()
        } else {
            let mut root_store = RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder.with_root_certificates(root_store).with_no_client_auth()
        };

        Ok(Self { tls: TlsConnector::from(Arc::new(config)), connect_timeout })
    }

    /// Connect to `host:port`, performing a TLS handshake for https.
    pub async fn connect(&self, host: &str, port: u16, scheme: Scheme) -> Result<Connection, Error> {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        tracing::debug!(host, port, ?scheme, "connecting");

        let opened = tokio::time::timeout(self.connect_timeout, self.open(host, port, scheme)).await;
        match opened {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "connect to {host}:{port} exceeded {}ms",
                self.connect_timeout.as_millis()
            ))),
        }
    }

    async fn open(&self, host: &str, port: u16, scheme: Scheme) -> Result<Connection, Error> {
        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(|e| Error::Transport(format!("connect to {host}:{port} failed: {e}")))?;

        match scheme {
            Scheme::Http => Ok(Connection::Plain(tcp)),
            Scheme::Https => {
                let server_name = ServerName::try_from(host.to_string())
                    .map_err(|e| Error::Transport(format!("invalid TLS server name {host}: {e}")))?;
                let stream = self
                    .tls
                    .connect(server_name, tcp)
                    .await
                    .map_err(|e| Error::Transport(format!("TLS handshake with {host} failed: {e}")))?;
                Ok(Connection::Tls(Box::new(stream)))
            }
        }
    }
}

/// Accepts any server certificate chain.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self, _end_entity: &CertificateDer<'_>, _intermediates: &[CertificateDer<'_>], _server_name: &ServerName<'_>,
        _ocsp_response: &[u8], _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self, message: &[u8], cert: &CertificateDer<'_>, dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self, message: &[u8], cert: &CertificateDer<'_>, dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}
