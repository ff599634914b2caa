use crate::prelude::*;

use bytes::Bytes;
use futures::StreamExt;
use net2::TcpStreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

const WRITE_TIMEOUT_SECS: u64 = 5; // Timeout for write operations
const TCP_KEEPALIVE_SECS: u64 = 60; // TCP keepalive interval

/// One logger connection.
///
/// Loops read → respond → decode until the logger hangs up, sends a frame
/// that fails validation, or something goes wrong that only affects this
/// connection. Cancelling `cancel` ends the loop at its next suspension
/// point; a reading already handed to the sink is never half delivered.
pub struct Session {
    peer: SocketAddr,
    forwarder: Option<Forwarder>,
    sink: Arc<dyn TelemetrySink>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        peer: SocketAddr,
        forwarder: Option<Forwarder>,
        sink: Arc<dyn TelemetrySink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            peer,
            forwarder,
            sink,
            cancel,
        }
    }

    /// Enables keepalive and TCP_NODELAY on an accepted socket.
    ///
    /// Loggers hold their connection open for hours between bursts, so dead
    /// peers need to be noticed by the kernel.
    pub fn configure_socket(stream: TcpStream) -> Result<TcpStream> {
        let std_stream = stream.into_std()?;
        if let Err(e) = std_stream.set_keepalive(Some(Duration::new(TCP_KEEPALIVE_SECS, 0))) {
            warn!("Failed to set TCP keepalive: {}", e);
        }

        let stream = TcpStream::from_std(std_stream)?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        Ok(stream)
    }

    pub async fn run(&self, stream: TcpStream) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut frames = FramedRead::new(reader, PacketDecoder::new());

        let result = tokio::select! {
            result = self.process(&mut frames, &mut writer) => result,
            _ = self.cancel.cancelled() => {
                info!("{}: session cancelled by server shutdown", self.peer);
                Ok(())
            }
        };

        if let Err(e) = writer.shutdown().await {
            debug!("{}: shutdown: {}", self.peer, e);
        }

        result
    }

    async fn process(
        &self,
        frames: &mut FramedRead<OwnedReadHalf, PacketDecoder>,
        writer: &mut OwnedWriteHalf,
    ) -> Result<()> {
        loop {
            let frame = match frames.next().await {
                None => {
                    info!("{}: connection closed by logger", self.peer);
                    return Ok(());
                }
                Some(Ok(frame)) => frame,
                Some(Err(FrameError::InvalidFrame { reason, raw })) => {
                    warn!(
                        "{}: invalid message ({}), closing connection: {}",
                        self.peer,
                        reason,
                        Utils::hex(&raw)
                    );
                    return Ok(());
                }
                Some(Err(e)) => bail!("{}: {}", self.peer, e),
            };

            debug!("{}: RX {}", self.peer, frame.hex());

            let reply = self.respond(&frame).await?;
            self.write(writer, &reply).await?;
            debug!("{}: TX {}", self.peer, Utils::hex(&reply));

            // the logger has its answer; only now hand the data on
            self.dispatch(&frame)?;
        }
    }

    async fn respond(&self, frame: &Frame) -> Result<Bytes> {
        if let Some(forwarder) = &self.forwarder {
            debug!("{}: forwarding request to {}", self.peer, forwarder.address());
            match forwarder.forward(frame).await {
                Ok(reply) => {
                    debug!("{}: got response from {}", self.peer, forwarder.address());
                    return Ok(reply);
                }
                Err(e) => warn!(
                    "{}: failed to forward to {} ({}), answering locally",
                    self.peer,
                    forwarder.address(),
                    e
                ),
            }
        }

        let reply = ReplyFactory::build(frame, UnixTime::now().as_u32())?;
        Ok(reply.into_bytes())
    }

    async fn write(&self, writer: &mut OwnedWriteHalf, bytes: &[u8]) -> Result<()> {
        match tokio::time::timeout(
            Duration::from_secs(WRITE_TIMEOUT_SECS),
            writer.write_all(bytes),
        )
        .await
        {
            Ok(Ok(_)) => {
                if let Err(e) = writer.flush().await {
                    bail!("Failed to flush socket: {}", e);
                }
            }
            Ok(Err(e)) => bail!("Failed to write reply: {}", e),
            Err(_) => bail!("Write operation timed out after {} seconds", WRITE_TIMEOUT_SECS),
        }

        Ok(())
    }

    fn dispatch(&self, frame: &Frame) -> Result<()> {
        let header = frame.header();

        match frame.kind() {
            MessageKind::Heartbeat => {
                debug!(
                    "{}: heartbeat from logger {}",
                    self.peer, header.serial_number
                );
            }
            MessageKind::Data => match TelemetryReading::decode(frame)? {
                Some(reading) => {
                    debug!(
                        "{}: data from inverter {}: {:?}",
                        self.peer, reading.serial_number, reading
                    );
                    self.sink.on_telemetry(reading);
                }
                None => debug!("{}: data message dropped", self.peer),
            },
            MessageKind::Unknown(msg_type) => {
                debug!(
                    "{}: unknown message type {:#04x} from logger {}",
                    self.peer, msg_type, header.serial_number
                );
            }
        }

        Ok(())
    }
}
