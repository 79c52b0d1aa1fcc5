//! Policy-plane service library crate.
//!
//! # Purpose
//! Exposes the RBAC object API, the escalation-prevention machinery,
//! configuration, and storage for use by the binary and tests.
//!
//! # Notes
//! Every create or update of a Role, ClusterRole, RoleBinding or
//! ClusterRoleBinding passes through `auth::rbac::GuardedStore`, which refuses
//! writes that would grant the caller's request more than the caller holds.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod observability;
pub mod store;
