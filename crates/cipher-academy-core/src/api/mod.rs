//! HTTP-style interface consumed by the web client.
//!
//! No server lives here: [`Api::handle`] maps (method, path, body) to a
//! status code and JSON body so any transport can sit in front of it.

pub mod dto;
mod router;

pub use router::{Api, ApiResponse, Method};
