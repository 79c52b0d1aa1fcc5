//! Policy-plane authorization modules.
//!
//! # Purpose
//! Groups the request context carried into checks, the authorizer seam, and
//! the RBAC escalation-prevention machinery.
pub mod authorizer;
pub mod context;
pub mod rbac;
