//! Message router - Picks the plugin instances that receive an event

use std::sync::Arc;
use crate::application::registry::Registry;
use crate::domain::entities::{Event, Instance};

/// Routes events to registered instances by channel and pattern
#[derive(Clone)]
pub struct Router {
    registry: Arc<Registry>,
}

impl Router {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Every registered instance on the event's channel whose pattern matches
    /// the body, in registration order.
    ///
    /// Matching runs on a snapshot, so registrations racing with this call
    /// are either fully seen or not at all.
    pub fn route(&self, evt: &Event) -> Vec<Arc<Instance>> {
        let matched: Vec<Arc<Instance>> = self
            .registry
            .instances()
            .into_iter()
            .filter(|inst| inst.channel() == evt.channel() && inst.is_match(&evt.body))
            .collect();

        tracing::debug!("[{}] {} instance(s) matched", evt.channel(), matched.len());
        matched
    }

    /// The copy of `evt` a handler for `inst` receives
    pub fn bind(evt: &Event, inst: &Arc<Instance>) -> Event {
        evt.clone().with_instance(Arc::clone(inst))
    }

    /// Run the handler of every matched instance on the calling thread.
    /// Returns how many handlers ran.
    pub fn dispatch(&self, evt: &Event) -> usize {
        let matched = self.route(evt);

        for inst in &matched {
            tracing::debug!("[{}] dispatching to {}", evt.channel(), inst);
            inst.definition().invoke(Self::bind(evt, inst));
        }

        matched.len()
    }
}
