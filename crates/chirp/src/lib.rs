//! Chirp - filtered fan-out relay
//!
//! Ingests one upstream Server-Sent-Events stream and relays each event to
//! every WebSocket subscriber whose filter matches it, throttled per
//! subscriber.
//!
//! The binary wires the crates together; this library exposes the HTTP and
//! WebSocket surface so it can be driven directly in tests.

pub mod server;
