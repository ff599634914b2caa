use crate::prelude::*;
use crate::solis::session::Session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const BIND_HOST: &str = "0.0.0.0";
const DRAIN_TIMEOUT_SECS: u64 = 30; // How long stop() waits for open sessions
const ACCEPT_BACKOFF_MS: u64 = 100; // Pause after a failed accept()

struct Running {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    acceptor: JoinHandle<TcpListener>,
    sessions: TaskTracker,
    cancel: CancellationToken,
}

/// What the accept loop needs to start sessions. Holds nothing of the
/// [`Server`], so dropping the server closes the shutdown channel.
struct Spawner {
    forwarder: Option<Forwarder>,
    sink: Arc<dyn TelemetrySink>,
    sessions: TaskTracker,
    cancel: CancellationToken,
}

/// The listening side of the gateway.
///
/// `start` and `stop` are both idempotent. Stopping closes the door to new
/// loggers but lets connected ones finish; the listening socket is held
/// until they have, or until the drain timeout expires. Sessions still open
/// at that point are cancelled before `stop` returns.
#[derive(Clone)]
pub struct Server {
    config: GatewayConfig,
    bind_host: String,
    forwarder: Forwarder,
    drain_timeout: Duration,
    sink: Arc<dyn TelemetrySink>,
    state: Arc<Mutex<Option<Running>>>,
}

impl Server {
    pub fn new(config: GatewayConfig, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            config,
            bind_host: BIND_HOST.to_string(),
            forwarder: Forwarder::default(),
            drain_timeout: Duration::from_secs(DRAIN_TIMEOUT_SECS),
            sink,
            state: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = host.into();
        self
    }

    /// Replaces the upstream target. Only consulted in forward mode.
    pub fn with_forwarder(mut self, forwarder: Forwarder) -> Self {
        self.forwarder = forwarder;
        self
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn config(&self) -> GatewayConfig {
        self.config
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_some()
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.state.lock().await.as_ref().map(|r| r.local_addr)
    }

    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(running) = state.as_ref() {
            debug!("server already listening on {}", running.local_addr);
            return Ok(());
        }

        let port = self.config.listening_port();
        let listener = TcpListener::bind((self.bind_host.as_str(), port))
            .await
            .map_err(|e| anyhow!("failed to listen on {}:{}: {}", self.bind_host, port, e))?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let sessions = TaskTracker::new();
        let cancel = CancellationToken::new();
        let spawner = Spawner {
            forwarder: self.config.forward_mode().then(|| self.forwarder.clone()),
            sink: self.sink.clone(),
            sessions: sessions.clone(),
            cancel: cancel.clone(),
        };
        let acceptor = tokio::spawn(accept_loop(listener, shutdown_rx, spawner));

        if self.config.forward_mode() {
            info!(
                "listening on {}, forwarding to {}",
                local_addr,
                self.forwarder.address()
            );
        } else {
            info!("listening on {}", local_addr);
        }

        *state = Some(Running {
            local_addr,
            shutdown_tx,
            acceptor,
            sessions,
            cancel,
        });

        Ok(())
    }

    pub async fn stop(&self) {
        // released straight away so status queries do not block on the drain
        let taken = self.state.lock().await.take();
        let running = match taken {
            Some(running) => running,
            None => {
                debug!("server not running, nothing to stop");
                return;
            }
        };

        let mut guard = DrainGuard::new(running.local_addr, running.cancel.clone());

        // the acceptor exits on its own once signalled, so even if this
        // future is dropped below the listener does not outlive it
        let _ = running.shutdown_tx.send(());

        let listener = match running.acceptor.await {
            Ok(listener) => Some(listener),
            Err(e) => {
                error!("acceptor task failed: {}", e);
                None
            }
        };

        running.sessions.close();
        if !running.sessions.is_empty() {
            info!("waiting for {} open session(s) to finish", running.sessions.len());
        }

        if tokio::time::timeout(self.drain_timeout, running.sessions.wait())
            .await
            .is_err()
        {
            warn!(
                "{} session(s) still open after {:?}, cancelling them",
                running.sessions.len(),
                self.drain_timeout,
            );
            running.cancel.cancel();
            running.sessions.wait().await;
        }

        drop(listener);
        guard.disarm();
        info!("server on {} stopped", running.local_addr);
    }
}

async fn accept_loop(
    listener: TcpListener,
    mut shutdown_rx: broadcast::Receiver<()>,
    spawner: Spawner,
) -> TcpListener {
    loop {
        tokio::select! {
            // also fires when the owning Server is dropped without stop()
            _ = shutdown_rx.recv() => {
                debug!("acceptor received shutdown signal");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => spawner.spawn(stream, peer),
                Err(e) => {
                    warn!("failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(ACCEPT_BACKOFF_MS)).await;
                }
            }
        }
    }

    listener
}

impl Spawner {
    fn spawn(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        info!("{}: logger connected", peer);

        let session = Session::new(
            peer,
            self.forwarder.clone(),
            self.sink.clone(),
            self.cancel.child_token(),
        );

        self.sessions.spawn(async move {
            let result = match Session::configure_socket(stream) {
                Ok(stream) => session.run(stream).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                error!("{}: session ended with error: {:#}", peer, e);
            }
            info!("{}: session closed", peer);
        });
    }
}

/// Cancels the remaining sessions if a shutdown is abandoned before the
/// drain finished.
struct DrainGuard {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    armed: bool,
}

impl DrainGuard {
    fn new(local_addr: SocketAddr, cancel: CancellationToken) -> Self {
        Self {
            local_addr,
            cancel,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!(
                "shutdown of server on {} cancelled, listener released and sessions cancelled",
                self.local_addr
            );
            self.cancel.cancel();
        }
    }
}
