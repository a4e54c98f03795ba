//! Integration tests for Isaver
//!
//! These tests drive the full acquisition-mux-delivery pipeline through the
//! HTTP surface with simulated collaborators: offline, deterministic, and
//! strict about temporary-storage cleanup.

#[path = "integration/pipeline_delivery.rs"]
mod pipeline_delivery;

#[path = "integration/http_surface.rs"]
mod http_surface;
