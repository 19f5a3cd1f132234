use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::session::Session;
use log::{debug, trace};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{self, ClientConfig, OwnedTrustAnchor, RootCertStore};
use tokio_rustls::TlsConnector;
use url::Url;

/// Convenience client: owns the TLS configuration and opens one session
/// per request (or a reusable session via [`Client::open`]).
pub struct Client {
    rustls_config: Arc<ClientConfig>,
}

impl Client {
    /// One-shot request: connect, send, gracefully close.
    pub async fn request(&self, request: Request) -> Result<Response, Error> {
        request.check_valid()?;
        let session = self.open(&request.url).await?;
        let result = session.send(request).await;
        session.disconnect().await;
        result
    }

    /// Opens a session to the URL's authority for multiple requests.
    pub async fn open(&self, url: &Url) -> Result<Session, Error> {
        let transport = self.connect_transport(url).await?;
        let session = Session::connect(transport).await?;
        debug!("session established with {}", url.origin().ascii_serialization());
        Ok(session)
    }

    async fn connect_transport(&self, url: &Url) -> Result<TlsStream<TcpStream>, Error> {
        if url.scheme() != "https" {
            return Err(Error::InvalidRequest("only https URLs are supported"));
        }
        let host = url
            .host_str()
            .ok_or(Error::InvalidRequest("URL has no host"))?;
        let port = url
            .port_or_known_default()
            .ok_or(Error::InvalidRequest("URL has no port"))?;

        trace!("connecting to {host}:{port}");
        let tcp = TcpStream::connect((host, port)).await?;
        let server_name = rustls::ServerName::try_from(host)
            .map_err(|_| Error::InvalidRequest("host is not a valid TLS server name"))?;
        let stream = TlsConnector::from(self.rustls_config.clone())
            .connect(server_name, tcp)
            .await?;

        let (_, connection) = stream.get_ref();
        if connection.alpn_protocol() != Some(b"h2") {
            return Err(Error::NoAlpn);
        }
        Ok(stream)
    }
}

impl Default for Client {
    fn default() -> Self {
        let mut root_store = RootCertStore::empty();
        root_store.add_server_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.0.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));
        let mut config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        config.alpn_protocols = vec![b"h2".to_vec()];
        Self {
            rustls_config: Arc::new(config),
        }
    }
}
