//! RBAC module wiring.
//!
//! # Purpose
//! Exposes rule resolution, the bind check, the escalation guard, the guarded
//! store wrapper, and default policy seeding.
pub mod bind;
pub mod bootstrap;
pub mod error;
pub mod escalation;
pub mod guarded;
pub mod resolver;

pub use error::GuardError;
pub use escalation::EscalationGuard;
pub use guarded::GuardedStore;
pub use resolver::{RoleLookup, RuleResolver};
