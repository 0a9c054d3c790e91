//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: Preference persistence
//! - Adapters: Broker integrations
//! - Matchers: Pattern matching for routing

pub mod adapters;
pub mod config;
pub mod matchers;
pub mod storage;
