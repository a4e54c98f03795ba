//! HTTP handlers for the download UI and delivery endpoints.

pub mod delivery;
pub mod download;
pub mod range;

pub use delivery::serve_deliverable;
pub use download::{index, submit};
pub use range::{ByteRange, extract_range_header, parse_range_header};
