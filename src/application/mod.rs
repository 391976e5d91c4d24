//! Application wiring and hosting
//!
//! Turns loaded settings into a running gateway: typed configuration, backend
//! transport, route table and the HTTP server.

pub mod app;

pub use app::Application;
