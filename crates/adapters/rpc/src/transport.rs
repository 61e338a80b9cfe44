//! Framed request/response transport over TCP and Unix sockets.
//!
//! Frames are length-delimited (4-byte big-endian length prefix) and each
//! holds one JSON protocol document.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::bytes::Bytes;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

use crate::endpoint::Endpoint;
use crate::error::BridgeError;
use crate::protocol::{Reply, Request, Response};

/// Server-side handler of decoded requests.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> Response;
}

/// Dials a peer and performs one exchange per call.
#[derive(Debug, Clone, Copy)]
pub struct RpcClient {
    timeout: Duration,
}

impl RpcClient {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Send `request` to `endpoint` and wait for its reply.
    ///
    /// Connecting, writing and reading are bounded together by the client
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] on connection, codec or timeout failure, or
    /// when the peer answers with an error.
    pub async fn call(
        &self,
        endpoint: &Endpoint,
        request: &Request,
    ) -> Result<Reply, BridgeError> {
        let round_trip = async {
            match endpoint {
                Endpoint::Tcp { .. } => {
                    let stream = TcpStream::connect(endpoint.dial_address())
                        .await
                        .map_err(|err| BridgeError::io(endpoint, err))?;
                    exchange(stream, endpoint, request).await
                }
                #[cfg(unix)]
                Endpoint::Unix(path) => {
                    let stream = UnixStream::connect(path)
                        .await
                        .map_err(|err| BridgeError::io(endpoint, err))?;
                    exchange(stream, endpoint, request).await
                }
            }
        };
        tokio::time::timeout(self.timeout, round_trip)
            .await
            .map_err(|_| BridgeError::Timeout {
                endpoint: endpoint.to_string(),
                timeout: self.timeout,
            })?
    }
}

async fn exchange<S>(
    stream: S,
    endpoint: &Endpoint,
    request: &Request,
) -> Result<Reply, BridgeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
    let frame = serde_json::to_vec(request)?;
    framed
        .send(Bytes::from(frame))
        .await
        .map_err(|err| BridgeError::io(endpoint, err))?;
    let reply = framed
        .next()
        .await
        .ok_or_else(|| BridgeError::ConnectionClosed {
            endpoint: endpoint.to_string(),
        })?
        .map_err(|err| BridgeError::io(endpoint, err))?;
    serde_json::from_slice::<Response>(&reply)?.into_result()
}

/// A bound server socket.
pub enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener, std::path::PathBuf),
}

impl Listener {
    /// Bind a listener on `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Io`] if the address cannot be bound.
    pub async fn bind(endpoint: &Endpoint) -> Result<Self, BridgeError> {
        match endpoint {
            Endpoint::Tcp { .. } => TcpListener::bind(endpoint.bind_address())
                .await
                .map(Self::Tcp)
                .map_err(|err| BridgeError::io(endpoint, err)),
            #[cfg(unix)]
            Endpoint::Unix(path) => UnixListener::bind(path)
                .map(|listener| Self::Unix(listener, path.clone()))
                .map_err(|err| BridgeError::io(endpoint, err)),
        }
    }

    /// The endpoint peers can dial to reach this listener.
    ///
    /// For TCP this is the actually bound address, so binding port 0 or an
    /// unspecified host still yields a usable URL.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Io`] if the bound address cannot be queried.
    pub fn local_endpoint(&self) -> Result<Endpoint, BridgeError> {
        match self {
            Self::Tcp(listener) => {
                let mut addr = listener
                    .local_addr()
                    .map_err(|err| BridgeError::io("tcp listener", err))?;
                if addr.ip().is_unspecified() {
                    let loopback: std::net::IpAddr = if addr.is_ipv4() {
                        std::net::Ipv4Addr::LOCALHOST.into()
                    } else {
                        std::net::Ipv6Addr::LOCALHOST.into()
                    };
                    addr.set_ip(loopback);
                }
                let host = match addr {
                    std::net::SocketAddr::V4(v4) => v4.ip().to_string(),
                    std::net::SocketAddr::V6(v6) => format!("[{}]", v6.ip()),
                };
                Ok(Endpoint::Tcp {
                    host,
                    port: addr.port(),
                })
            }
            #[cfg(unix)]
            Self::Unix(_, path) => Ok(Endpoint::Unix(path.clone())),
        }
    }
}

/// Accept loop running in the background; stopped when dropped.
pub struct RpcServer {
    endpoint: Endpoint,
    task: JoinHandle<()>,
}

impl RpcServer {
    /// Serve `handler` on `listener`, one task per accepted connection.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Io`] if the bound address cannot be queried.
    pub fn spawn(
        listener: Listener,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<Self, BridgeError> {
        let endpoint = listener.local_endpoint()?;
        tracing::info!(%endpoint, "rpc server listening");
        let task = tokio::spawn(accept_loop(listener, handler));
        Ok(Self { endpoint, task })
    }

    /// Where the server can be reached.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl Drop for RpcServer {
    fn drop(&mut self) {
        self.task.abort();
        #[cfg(unix)]
        if let Endpoint::Unix(path) = &self.endpoint {
            if let Err(err) = std::fs::remove_file(path) {
                tracing::debug!(%err, path = %path.display(), "failed to remove socket file");
            }
        }
    }
}

async fn accept_loop(listener: Listener, handler: Arc<dyn RequestHandler>) {
    loop {
        match &listener {
            Listener::Tcp(inner) => match inner.accept().await {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "accepted rpc connection");
                    tokio::spawn(serve_connection(stream, Arc::clone(&handler)));
                }
                Err(err) => tracing::warn!(%err, "failed to accept rpc connection"),
            },
            #[cfg(unix)]
            Listener::Unix(inner, _) => match inner.accept().await {
                Ok((stream, _)) => {
                    tracing::debug!("accepted rpc connection");
                    tokio::spawn(serve_connection(stream, Arc::clone(&handler)));
                }
                Err(err) => tracing::warn!(%err, "failed to accept rpc connection"),
            },
        }
    }
}

async fn serve_connection<S>(stream: S, handler: Arc<dyn RequestHandler>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
    while let Some(frame) = framed.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(%err, "dropping rpc connection");
                return;
            }
        };
        let response = match serde_json::from_slice::<Request>(&frame) {
            Ok(request) => handler.handle(request).await,
            Err(err) => Response::Error(format!("malformed request: {err}")),
        };
        let encoded = match serde_json::to_vec(&response) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(%err, "failed to encode rpc response");
                return;
            }
        };
        if let Err(err) = framed.send(Bytes::from(encoded)).await {
            tracing::debug!(%err, "failed to write rpc response");
            return;
        }
    }
}
