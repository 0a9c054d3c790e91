use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use crate::application::errors::BotError;
use crate::application::messaging::Router;
use crate::domain::entities::Event;
use crate::domain::traits::Broker;

const EVENT_BUFFER: usize = 64;

/// Feeds a broker's inbound events through the router
pub struct BotService {
    router: Router,
    broker: Arc<dyn Broker>,
}

impl BotService {
    pub fn new(router: Router, broker: Arc<dyn Broker>) -> Self {
        Self { router, broker }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Run until the broker's stream ends
    pub async fn run(&self) -> Result<(), BotError> {
        let (tx, mut rx) = mpsc::channel::<Event>(EVENT_BUFFER);

        let broker = Arc::clone(&self.broker);
        let producer = tokio::spawn(async move { broker.stream(tx).await });

        tracing::info!("Listening for events from broker '{}'", self.broker.name());

        while let Some(evt) = rx.recv().await {
            for handle in self.handle(evt) {
                tokio::spawn(async move {
                    if let Err(e) = handle.await {
                        tracing::warn!("Plugin handler failed: {}", e);
                    }
                });
            }
        }

        producer
            .await
            .map_err(|e| BotError::Internal(format!("broker stream task: {}", e)))?
    }

    /// Route one event and start every matched handler on the blocking
    /// pool. Events without a broker get this service's broker attached.
    pub fn handle(&self, evt: Event) -> Vec<JoinHandle<()>> {
        let evt = if evt.broker.is_some() {
            evt
        } else {
            evt.with_broker(Arc::clone(&self.broker))
        };

        tracing::debug!("Processing event: {}", evt);

        self.router
            .route(&evt)
            .into_iter()
            .map(|inst| {
                let bound = Router::bind(&evt, &inst);
                tokio::task::spawn_blocking(move || inst.definition().invoke(bound))
            })
            .collect()
    }
}
