// src/serve/mod.rs

//! Local development HTTP server.
//!
//! Serves the build output directory during `sitepipe watch` and pushes
//! reload notifications to connected browsers over a server-sent-events
//! endpoint. A small reload snippet is injected into served HTML pages.
//!
//! The server exists purely for development; nothing here is part of the
//! published site.

pub mod server;

pub use server::spawn_server;
