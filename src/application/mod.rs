//! Application layer - Registry, routing and event ingestion
//!
//! This layer contains:
//! - Registry: Plugin definitions and instances behind one lock
//! - Messaging: Routing and body parsing
//! - Services: The broker-to-router ingestion loop
//! - Errors: Error types for every layer

pub mod errors;
pub mod messaging;
pub mod registry;
pub mod services;
