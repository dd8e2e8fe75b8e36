//! Operator terminal output.
//!
//! Everything the operator sees goes through a `Console`, so session tests
//! can capture it. The handle is shared: the receive task prints incoming
//! messages while the send loop owns the prompt.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::protocol;
use crate::Result;

#[derive(Debug)]
pub struct Console<W> {
    out: Arc<Mutex<W>>,
}

impl<W> Clone for Console<W> {
    fn clone(&self) -> Self {
        Self {
            out: Arc::clone(&self.out),
        }
    }
}

impl<W: AsyncWrite + Unpin> Console<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    /// Writes raw text and flushes immediately, so prompts without trailing
    /// newlines become visible.
    pub async fn write(&self, text: &str) -> Result<()> {
        let mut out = self.out.lock().await;
        out.write_all(text.as_bytes())
            .await
            .context("failed to write to terminal")?;
        out.flush().await.context("failed to flush terminal")?;
        Ok(())
    }

    pub async fn line(&self, text: &str) -> Result<()> {
        self.write(&format!("{}\n", text)).await
    }

    /// Shows the input prompt, e.g. `SERVER> `.
    pub async fn prompt(&self, handle: &str) -> Result<()> {
        self.write(&protocol::prompt(handle)).await
    }

    /// Shows one message received from the peer, then redraws the prompt.
    pub async fn incoming(&self, handle: &str, message: &str) -> Result<()> {
        self.write(&protocol::incoming_display(handle, message)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn incoming_is_marker_message_prompt() {
        let (tx, mut rx) = tokio::io::duplex(256);
        let console = Console::new(tx);

        console.incoming("SERVER", "hi there").await.expect("write");
        drop(console);

        let mut shown = String::new();
        rx.read_to_string(&mut shown).await.expect("read");
        assert_eq!(shown, "(incoming message)\nhi there\nSERVER> ");
    }

    #[tokio::test]
    async fn clones_share_one_output_stream() {
        let (tx, mut rx) = tokio::io::duplex(256);
        let console = Console::new(tx);
        let other = console.clone();

        console.line("first").await.expect("write");
        other.line("second").await.expect("write");
        drop(console);
        drop(other);

        let mut shown = String::new();
        rx.read_to_string(&mut shown).await.expect("read");
        assert_eq!(shown, "first\nsecond\n");
    }
}
