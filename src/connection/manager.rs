//! Connection Manager implementation
//!
//! Owns the listening socket and the accepted connection, and drives the
//! IDLE -> LISTENING -> CONNECTED -> {DISCONNECTING -> LISTENING |
//! TERMINATED} cycle: bind, accept one client, run the duplex session, tear
//! down, then either re-listen or return.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, BufReader, Lines};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::chat::{receiver, sender, SenderOutcome};
use crate::config::Config;
use crate::console::Console;
use crate::net::{ListenerGuard, PeerWriter};
use crate::session::SessionState;
use crate::Result;

/// Outcome of one accept-serve-teardown cycle.
enum Cycle {
    /// The peer went away; listen for the next client.
    Restart,
    /// Local quit or operator input exhausted; stop the whole server.
    Shutdown,
}

/// Manages the single listening socket and the single peer connection.
pub struct ConnectionManager {
    config: Arc<Config>,
}

impl ConnectionManager {
    /// Create a new ConnectionManager
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Serves clients one at a time until the operator quits or an
    /// unrecoverable I/O failure surfaces. A normal peer disconnect loops
    /// back to listening instead of returning.
    ///
    /// `input` is the operator's terminal input (stdin in production) and
    /// `output` the terminal output; both outlive individual connections.
    pub async fn run_forever<I, W>(&self, input: I, output: W) -> Result<()>
    where
        I: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut input = input.lines();
        let console = Console::new(output);

        loop {
            match self.serve_one_client(&mut input, &console).await? {
                Cycle::Restart => continue,
                Cycle::Shutdown => return Ok(()),
            }
        }
    }

    /// One full accept cycle. `Ok(Cycle::Restart)` covers both a served
    /// connection whose peer disconnected and a failed bind/accept attempt;
    /// `Err` is reserved for abnormal I/O failure that must end the process.
    async fn serve_one_client<I, W>(
        &self,
        input: &mut Lines<I>,
        console: &Console<W>,
    ) -> Result<Cycle>
    where
        I: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let port = self.config.server.port;
        let state = Arc::new(SessionState::new());

        // Bind and accept failures end this attempt only; the outer loop
        // re-invokes the same path with no added backoff.
        let (stream, listener) = match self.listen_and_accept(console).await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(
                    "failed to listen on port {} or accept a connection: {:#}",
                    port, e
                );
                return Ok(Cycle::Restart);
            }
        };

        let (read_half, write_half) = stream.into_split();
        let peer_lines = BufReader::new(read_half).lines();
        let writer = PeerWriter::new(write_half);

        state.begin();

        let recv_task = tokio::spawn(receiver::run(
            peer_lines,
            self.config.server.handle.clone(),
            Arc::clone(&state),
            listener.clone(),
            writer.clone(),
            console.clone(),
        ));

        let outcome = sender::run(
            input,
            &self.config.server.handle,
            &state,
            &writer,
            console,
        )
        .await;

        // Both the receive task and this cycle may close the same handles;
        // the second close is a no-op.
        listener.close().await;
        writer.close().await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                state.stop_and_notify();
                return Err(e);
            }
        };

        match outcome {
            SenderOutcome::Quit => {
                // The receive task may still be parked on a peer read; it
                // performs no further observable side effects once the
                // sockets are closed, so it is simply abandoned.
                info!("operator quit, shutting down");
                Ok(Cycle::Shutdown)
            }
            SenderOutcome::InputClosed => {
                state.stop_and_notify();
                info!("operator input closed, shutting down");
                Ok(Cycle::Shutdown)
            }
            SenderOutcome::PeerGone => {
                // The receive task has self-terminated; harvest its result
                // so a genuine read failure surfaces as a fatal error.
                match recv_task.await {
                    Ok(Ok(())) => {
                        if state.restart_requested() {
                            debug!("restarting listener on port {}", port);
                            Ok(Cycle::Restart)
                        } else {
                            Ok(Cycle::Shutdown)
                        }
                    }
                    Ok(Err(e)) => Err(e.context("peer connection failed")),
                    Err(e) => Err(anyhow::Error::new(e).context("receive task panicked")),
                }
            }
        }
    }

    /// Binds the listening socket and blocks until a client connects.
    async fn listen_and_accept<W>(
        &self,
        console: &Console<W>,
    ) -> Result<(TcpStream, ListenerGuard)>
    where
        W: AsyncWrite + Unpin,
    {
        let bind_addr = self.config.bind_addr();
        debug!("binding TCP listener to {}", bind_addr);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind to {}", bind_addr))?;

        console
            .line(&format!(
                "Awaiting incoming connections on port {}",
                self.config.server.port
            ))
            .await?;

        let (stream, peer_addr) = listener
            .accept()
            .await
            .context("failed to accept a connection")?;

        info!("accepted connection from {}", peer_addr);
        console
            .line(&format!(
                "Established connection with new client at {}",
                peer_addr
            ))
            .await?;

        Ok((stream, ListenerGuard::new(listener)))
    }
}
