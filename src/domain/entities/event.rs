use std::fmt;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use crate::application::errors::BotError;
use crate::domain::traits::{Broker, PrefStore};
use super::{Instance, Pref, Prefs};

/// Generic container for events processed by the bot.
///
/// Brokers copy their native message into these fields; routing needs at
/// least `room_id` and `body`. The native payload can be kept in `original`.
#[derive(Clone)]
pub struct Event {
    pub id: String,
    pub body: String,
    /// Display name of the room
    pub room: String,
    /// Room id from the broker; this is the channel used for routing
    pub room_id: String,
    pub user: String,
    pub user_id: String,
    pub time: DateTime<Utc>,
    pub broker: Option<Arc<dyn Broker>>,
    /// Lets the broker tell chat messages apart from other events
    pub is_chat: bool,
    pub original: Option<serde_json::Value>,
    instance: Option<Arc<Instance>>,
}

impl Event {
    pub fn new(channel: impl Into<String>, body: impl Into<String>) -> Self {
        let channel = channel.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            body: body.into(),
            room: channel.clone(),
            room_id: channel,
            user: String::new(),
            user_id: String::new(),
            time: Utc::now(),
            broker: None,
            is_chat: true,
            original: None,
            instance: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.user = user.into();
        self.user_id = user_id.into();
        self
    }

    pub fn with_room_name(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    pub fn with_broker(mut self, broker: Arc<dyn Broker>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn with_original(mut self, original: serde_json::Value) -> Self {
        self.original = Some(original);
        self
    }

    pub(crate) fn with_instance(mut self, instance: Arc<Instance>) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Channel the event is routed on
    pub fn channel(&self) -> &str {
        &self.room_id
    }

    /// The plugin instance this event was routed to, if any
    pub fn instance(&self) -> Option<&Arc<Instance>> {
        self.instance.as_ref()
    }

    fn plugin_name(&self) -> Result<&str, BotError> {
        self.instance
            .as_ref()
            .map(|i| i.name())
            .ok_or(BotError::MissingInstance)
    }

    /// A copy with the same broker/room/user and a fresh timestamp.
    /// Body, original payload and instance are left empty.
    pub fn reply_template(&self) -> Event {
        Event {
            id: self.id.clone(),
            body: String::new(),
            room: self.room.clone(),
            room_id: self.room_id.clone(),
            user: self.user.clone(),
            user_id: self.user_id.clone(),
            time: Utc::now(),
            broker: self.broker.clone(),
            is_chat: self.is_chat,
            original: None,
            instance: None,
        }
    }

    /// Reply to the event. Replies currently always go to the originating room.
    pub fn reply(&self, msg: impl Into<String>) -> Result<(), BotError> {
        self.reply_to_room(msg)
    }

    /// Send `msg` to the room the event came from
    pub fn reply_to_room(&self, msg: impl Into<String>) -> Result<(), BotError> {
        let broker = self.broker.as_ref().ok_or(BotError::MissingBroker)?;
        let mut out = self.reply_template();
        out.body = msg.into();
        broker.send(out)
    }

    /// Reply with the error's message
    pub fn reply_error(&self, err: &dyn std::error::Error) -> Result<(), BotError> {
        self.reply(err.to_string())
    }

    /// Send a table back to the originating room
    pub fn reply_table(&self, header: &[String], rows: &[Vec<String>]) -> Result<(), BotError> {
        let broker = self.broker.as_ref().ok_or(BotError::MissingBroker)?;
        broker.send_table(self.reply_template(), header, rows)
    }

    pub fn broker_name(&self) -> &str {
        self.broker.as_ref().map(|b| b.name()).unwrap_or("")
    }

    /// Union of all stored prefs for this user, broker, room and plugin
    pub fn find_prefs(&self, store: &dyn PrefStore) -> Result<Prefs, BotError> {
        let plugin = self.plugin_name()?;
        Ok(store.find(&self.user, self.broker_name(), &self.room_id, plugin, ""))
    }

    /// Resolve every setting declared by the plugin for this room.
    /// Settings restricted to other rooms are skipped. Scoped like the
    /// registry's settings sync, by the instance's broker rather than the
    /// event's.
    pub fn instance_settings(&self, store: &dyn PrefStore) -> Result<Prefs, BotError> {
        let instance = self.instance.as_ref().ok_or(BotError::MissingInstance)?;
        let plugin = instance.name();
        let broker = instance.settings_broker();

        Ok(instance
            .definition()
            .settings
            .iter()
            .filter(|stg| stg.applies_to_room(&self.room_id))
            .map(|stg| store.get("", broker, &self.room_id, plugin, &stg.key, &stg.default))
            .collect())
    }

    /// A pref scoped to this event's user, room, broker and plugin
    pub fn new_pref(&self) -> Pref {
        self.fill_pref(Pref::default())
    }

    /// Fill any empty scope field of `pref` from the event
    pub fn fill_pref(&self, mut pref: Pref) -> Pref {
        if pref.user.is_empty() {
            pref.user = self.user.clone();
        }
        if pref.room.is_empty() {
            pref.room = self.room_id.clone();
        }
        if pref.broker.is_empty() {
            pref.broker = self.broker_name().to_string();
        }
        if pref.plugin.is_empty() {
            pref.plugin = self.plugin_name().unwrap_or_default().to_string();
        }
        pref
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("body", &self.body)
            .field("room", &self.room)
            .field("room_id", &self.room_id)
            .field("user", &self.user)
            .field("time", &self.time)
            .field("broker", &self.broker_name())
            .field("instance", &self.instance)
            .finish()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}: {}", self.user, self.room, self.time, self.body)
    }
}
