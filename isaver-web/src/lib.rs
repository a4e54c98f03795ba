//! Isaver Web - HTTP surface for the download pipeline
//!
//! One form endpoint for URL submission and resolution choice, range-aware
//! file delivery, and a health probe. All pipeline work happens in
//! `isaver-core`; this crate renders outcomes and streams bytes.

pub mod handlers;
pub mod pages;
pub mod server;

pub use handlers::{ByteRange, parse_range_header, serve_deliverable};
pub use server::{AppState, build_router, run_server};
