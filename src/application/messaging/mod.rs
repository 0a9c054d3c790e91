//! Message handling - Event routing and body parsing

pub mod parser;
pub mod router;

pub use parser::{command_args, parse_argv};
pub use router::Router;
