//! Session leaders and their registry
//!
//! This module handles:
//! - Per-session identity and override parameters
//! - Asynchronous parameter collection through the helper program
//! - Leader lifecycle (open, lookup, close)

mod leader;
mod manager;
mod overrides;

pub use leader::{LeaderIdentity, LeaderSnapshot, SessionLeader};
pub use manager::{OpenSessionRequest, SessionManager};
pub use overrides::{OverrideParameters, PROTECTED_KEYS};
