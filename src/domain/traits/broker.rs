use async_trait::async_trait;
use tokio::sync::mpsc;
use crate::domain::entities::Event;
use crate::application::errors::BotError;

/// Broker trait - abstraction for chat transports
///
/// Outbound calls are synchronous so plugin handlers can reply without an
/// async context. Inbound events arrive through `stream`.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Name used to scope preferences, e.g. "slack" or "console"
    fn name(&self) -> &str;

    /// Send an event's body to the event's room
    fn send(&self, evt: Event) -> Result<(), BotError>;

    /// Send tabular data to the event's room
    fn send_table(&self, evt: Event, header: &[String], rows: &[Vec<String>]) -> Result<(), BotError>;

    /// Produce inbound events until the transport closes or `out` is dropped.
    /// Events do not need a broker attached; the ingestion loop does that.
    async fn stream(&self, out: mpsc::Sender<Event>) -> Result<(), BotError>;
}
