//! Line protocol constants and formatting
//!
//! The wire format is plain newline-delimited UTF-8 text. Every outgoing
//! message carries the local handle as a prefix; there is no other framing.

/// Operator command that ends the whole program.
pub const QUIT_COMMAND: &str = "\\quit";

/// Marker printed above every message received from the peer.
pub const INCOMING_MARKER: &str = "(incoming message)";

/// Input prompt for the given handle, e.g. `SERVER> `.
pub fn prompt(handle: &str) -> String {
    format!("{}> ", handle)
}

/// Wire form of an outgoing message: handle prefix, message text, newline.
pub fn outgoing_line(handle: &str, message: &str) -> String {
    format!("{}> {}\n", handle, message)
}

/// Local display form of a message received from the peer. Ends with the
/// redrawn prompt so the operator's input line is not visually lost.
pub fn incoming_display(handle: &str, message: &str) -> String {
    format!("{}\n{}\n{}", INCOMING_MARKER, message, prompt(handle))
}
