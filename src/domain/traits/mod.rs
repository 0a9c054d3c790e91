//! Domain traits - Abstractions for infrastructure implementations

pub mod broker;
pub mod matcher;
pub mod store;

pub use broker::Broker;
pub use matcher::{CompiledPattern, Matcher};
pub use store::PrefStore;
