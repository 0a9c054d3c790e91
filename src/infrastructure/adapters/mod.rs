//! Broker adapters

pub mod console;

pub use console::ConsoleBroker;
