//! Operator-facing send loop.

use tokio::io::{AsyncBufRead, AsyncWrite, Lines};
use tracing::debug;

use crate::console::Console;
use crate::net::PeerWriter;
use crate::protocol::{self, QUIT_COMMAND};
use crate::session::SessionState;
use crate::Result;

/// Why the send loop ended. A local quit ends the whole program; a vanished
/// peer only ends the current conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderOutcome {
    /// The operator typed the quit command.
    Quit,
    /// The operator input stream ended.
    InputClosed,
    /// The session stopped underneath us: the peer disconnected or failed.
    PeerGone,
}

/// Forwards operator-typed lines to the peer, prefixed with the local
/// handle, until local quit, peer disconnect, or input end.
pub async fn run<R, W>(
    input: &mut Lines<R>,
    handle: &str,
    state: &SessionState,
    writer: &PeerWriter,
    console: &Console<W>,
) -> Result<SenderOutcome>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        if !state.is_running() {
            return Ok(SenderOutcome::PeerGone);
        }

        console.prompt(handle).await?;

        tokio::select! {
            line = input.next_line() => {
                match line? {
                    Some(text) if text == QUIT_COMMAND => {
                        state.stop_and_notify();
                        debug!("operator quit");
                        return Ok(SenderOutcome::Quit);
                    }
                    Some(text) => {
                        // The peer may have vanished between the check at
                        // the top of the loop and this send; skip rather
                        // than write into a torn-down connection.
                        if !state.is_running() {
                            return Ok(SenderOutcome::PeerGone);
                        }
                        if !writer.send(&protocol::outgoing_line(handle, &text)).await? {
                            return Ok(SenderOutcome::PeerGone);
                        }
                    }
                    None => {
                        debug!("operator input stream ended");
                        return Ok(SenderOutcome::InputClosed);
                    }
                }
            }
            _ = state.stopped() => {
                return Ok(SenderOutcome::PeerGone);
            }
        }
    }
}
