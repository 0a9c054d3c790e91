//! Domain layer - Core types and the abstractions infrastructure implements
//!
//! This layer contains:
//! - Entities: Plugin definitions, instances, events, prefs
//! - Traits: Abstractions for infrastructure (Broker, PrefStore, Matcher)

pub mod entities;
pub mod traits;
