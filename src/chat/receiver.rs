//! Background receive loop for the connected peer.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncWrite, Lines};
use tracing::{debug, error};

use crate::console::Console;
use crate::net::{ListenerGuard, PeerWriter};
use crate::session::SessionState;
use crate::Result;

/// Reads lines from the peer until the session stops or the stream ends.
///
/// A clean end-of-stream is an ordinary disconnect: the session flags flip,
/// both sockets close, and the task returns `Ok` so the manager re-listens.
/// Any other read failure propagates; the caller treats it as fatal.
pub async fn run<R, W>(
    mut lines: Lines<R>,
    handle: String,
    state: Arc<SessionState>,
    listener: ListenerGuard,
    writer: PeerWriter,
    console: Console<W>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while state.is_running() {
        match lines.next_line().await {
            Ok(Some(message)) => {
                console.incoming(&handle, &message).await?;
            }
            Ok(None) => {
                // Peer closed its end. Flags flip first, then the sockets
                // close, then the notice prints: the send loop must observe
                // running == false before it could touch a torn-down
                // connection.
                state.request_restart();
                state.stop_and_notify();
                listener.close().await;
                writer.close().await;
                console.line("\nClient has disconnected.").await?;
                debug!("peer closed the connection, session will restart");
                return Ok(());
            }
            Err(e) => {
                state.stop_and_notify();
                error!("error reading from peer: {}", e);
                return Err(anyhow::Error::new(e).context("error reading from peer"));
            }
        }
    }

    Ok(())
}
