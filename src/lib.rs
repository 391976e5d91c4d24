//! Parsony gateway - browser-facing API gateway for a private JSON-RPC backend
//!
//! The gateway keeps the backend session token out of browser script reach by
//! carrying it in an HttpOnly cookie, attaches the gateway API key and signs
//! every envelope with a shared secret before it reaches the backend.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod session;
pub mod signing;

pub use application::Application;
pub use error::{Error, Result};
