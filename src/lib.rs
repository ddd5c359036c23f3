// Library root
// -----------
// This crate exposes the upload pipeline as a library. The binary
// (`main.rs`) parses the command line, builds a client and hands it to the
// interactive loop in `ui`.
//
// Module responsibilities:
// - `api`: the resumable upload / generate protocol client.
// - `transport`: the HTTP seam and its reqwest implementation.
// - `buffer`, `headers`, `codec`, `mime`: small pieces the client is
//   built from (response accumulation, upload URL scraping, base64, file
//   type resolution).
// - `busy`: the "Thinking..." indicator shown while generating.
// - `config`: endpoint and API key settings.
// - `ui`: the terminal prompt loop.
pub mod api;
pub mod buffer;
pub mod busy;
pub mod codec;
pub mod config;
pub mod error;
pub mod headers;
pub mod mime;
pub mod transport;
pub mod ui;

pub use error::{Error, Result};
