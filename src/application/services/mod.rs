//! Application services - Event ingestion

pub mod bot_service;

pub use bot_service::BotService;
