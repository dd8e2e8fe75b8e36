//! chatserve library
//!
//! Server half of a two-party, line-oriented text chat: listens on a single
//! TCP port, talks to one client at a time, and returns to listening when
//! the peer goes away.

pub mod chat;
pub mod config;
pub mod connection;
pub mod console;
pub mod net;
pub mod protocol;
pub mod session;

pub use config::Config;
pub use connection::ConnectionManager;
pub use session::SessionState;

/// Common error type for the chat server
pub type Result<T> = anyhow::Result<T>;
