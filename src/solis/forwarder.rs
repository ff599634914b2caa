use crate::prelude::*;

use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// The vendor's real collector.
pub const UPSTREAM_ADDRESS: &str = "47.88.8.200:10000";
pub const MAX_REPLY_LEN: usize = 2048;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REPLY_TIMEOUT_SECS: u64 = 10;

/// Relays raw frames to the vendor collector, one connection per request.
#[derive(Clone, Debug)]
pub struct Forwarder {
    address: String,
    connect_timeout: Duration,
    reply_timeout: Duration,
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new(UPSTREAM_ADDRESS)
    }
}

impl Forwarder {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            reply_timeout: Duration::from_secs(REPLY_TIMEOUT_SECS),
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, reply: Duration) -> Self {
        self.connect_timeout = connect;
        self.reply_timeout = reply;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sends `frame` byte for byte and returns whatever comes back, up to
    /// [`MAX_REPLY_LEN`] bytes. The reply is not interpreted.
    pub async fn forward(&self, frame: &Frame) -> Result<Bytes, ForwardError> {
        let mut stream = match tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect(self.address.as_str()),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(ForwardError::Connect {
                    address: self.address.clone(),
                    source,
                })
            }
            Err(_) => return Err(ForwardError::Timeout(self.connect_timeout)),
        };

        let exchange = async {
            stream.write_all(frame.bytes()).await?;
            stream.flush().await?;

            let mut buf = vec![0u8; MAX_REPLY_LEN];
            let len = stream.read(&mut buf).await?;
            buf.truncate(len);
            Ok::<Vec<u8>, std::io::Error>(buf)
        };

        let reply = match tokio::time::timeout(self.reply_timeout, exchange).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return Err(ForwardError::Io(e)),
            Err(_) => return Err(ForwardError::Timeout(self.reply_timeout)),
        };

        if let Err(e) = stream.shutdown().await {
            trace!("closing upstream connection to {}: {}", self.address, e);
        }

        if reply.is_empty() {
            return Err(ForwardError::Empty);
        }

        Ok(Bytes::from(reply))
    }
}
