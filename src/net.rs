//! Socket handles shared across tasks.
//!
//! The receive task and the connection manager may race to tear down the
//! same sockets after a disconnect, so every close here is take-and-drop on
//! an `Option`: the second close finds the slot empty and does nothing.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::Result;

/// Clonable handle to the listening socket.
#[derive(Debug, Clone)]
pub struct ListenerGuard {
    inner: Arc<Mutex<Option<TcpListener>>>,
}

impl ListenerGuard {
    pub fn new(listener: TcpListener) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(listener))),
        }
    }

    /// Closes the listening socket. Idempotent.
    pub async fn close(&self) {
        self.inner.lock().await.take();
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}

/// Clonable handle to the write side of the accepted connection.
#[derive(Debug, Clone)]
pub struct PeerWriter {
    inner: Arc<Mutex<Option<OwnedWriteHalf>>>,
}

impl PeerWriter {
    pub fn new(half: OwnedWriteHalf) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(half))),
        }
    }

    /// Writes one already-formatted line to the peer. Returns `Ok(false)`
    /// without writing when the connection has been torn down.
    pub async fn send(&self, line: &str) -> Result<bool> {
        let mut slot = self.inner.lock().await;
        match slot.as_mut() {
            Some(half) => {
                half.write_all(line.as_bytes())
                    .await
                    .context("failed to write to peer")?;
                half.flush().await.context("failed to flush peer stream")?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Shuts down the write direction and drops the half. Idempotent.
    pub async fn close(&self) {
        if let Some(mut half) = self.inner.lock().await.take() {
            let _ = half.shutdown().await;
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}
