//! Policy-plane HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules, the error mapping, and request identity
//! extraction.
pub mod error;
pub mod identity;
pub mod objects;
pub mod system;
pub mod types;
