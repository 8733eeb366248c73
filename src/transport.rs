//! Transport channel: one bidirectional socket connection to one remote actor.
//!
//! A channel supports a single send-one/receive-one exchange at a time with a
//! bounded wait, and can be torn down and rebuilt at will. Retry lives in the
//! bridge, not here.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::bridge::BridgeError;
use crate::protocol::{Request, Response};

/// One request/response channel to a remote actor.
///
/// Exactly one `send_receive` may be outstanding at a time: the wire protocol
/// has no request ids, so a late reply to an abandoned request must never be
/// read as the reply to a newer one. Callers enforce this by rebuilding the
/// channel after any timeout instead of reusing it.
pub trait Transport: Send {
    /// Send one request and wait up to the configured timeout for the reply.
    fn send_receive(
        &mut self,
        request: &Request,
    ) -> impl Future<Output = Result<Response, BridgeError>> + Send;

    /// Write one request without waiting for a reply.
    fn send(&mut self, request: &Request) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Release the connection. Idempotent, never fails.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Creates channels on demand; the bridge reconnects through this seam.
pub trait Connector: Send {
    type Channel: Transport;

    fn connect(&self) -> impl Future<Output = Result<Self::Channel, BridgeError>> + Send;
}

/// Newline-delimited JSON over a TCP stream.
pub struct TcpChannel {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    timeout: Duration,
}

impl TcpChannel {
    fn encode(request: &Request) -> Result<String, BridgeError> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        Ok(line)
    }
}

impl Transport for TcpChannel {
    async fn send_receive(&mut self, request: &Request) -> Result<Response, BridgeError> {
        let line = Self::encode(request)?;
        self.writer.write_all(line.as_bytes()).await?;

        let mut reply = String::new();
        match tokio::time::timeout(self.timeout, self.reader.read_line(&mut reply)).await {
            Err(_) => Err(BridgeError::Timeout),
            Ok(Err(err)) => Err(BridgeError::Transport(err)),
            Ok(Ok(0)) => Err(BridgeError::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by remote actor",
            ))),
            Ok(Ok(_)) => Ok(serde_json::from_str(reply.trim_end())?),
        }
    }

    async fn send(&mut self, request: &Request) -> Result<(), BridgeError> {
        let line = Self::encode(request)?;
        self.writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.writer.shutdown().await;
    }
}

/// Connects `TcpChannel`s to one fixed remote endpoint.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            address: format!("{}:{}", host, port),
            timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Connector for TcpConnector {
    type Channel = TcpChannel;

    async fn connect(&self) -> Result<TcpChannel, BridgeError> {
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| BridgeError::Timeout)??;
        stream.set_nodelay(true).ok();

        let (read_half, write_half) = stream.into_split();
        Ok(TcpChannel {
            reader: BufReader::new(read_half),
            writer: write_half,
            timeout: self.timeout,
        })
    }
}
