use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::common::{ChatMessage, Identity, SessionCommand, SessionEvent};
use crate::config::AppConfig;
use crate::storage::MessageStore;

use super::responder::Responder;
use super::timeline::Timeline;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub poll_interval: Duration,
    pub lookback: Duration,
    pub reply_chance: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            lookback: config.lookback(),
            reply_chance: config.reply_chance(),
        }
    }
}

/// Front-end side of a running session.
pub struct SessionHandle {
    pub commands: mpsc::Sender<SessionCommand>,
    pub events: mpsc::Receiver<SessionEvent>,
    pub task: JoinHandle<()>,
}

/// Keeps one room's timeline in step with its store.
///
/// Hydrates once, then polls for newer messages on a fixed interval while
/// serving commands from the front end. Dropping the command sender stops
/// the loop.
pub struct ChatSession {
    store: MessageStore,
    identity: Identity,
    event_sender: mpsc::Sender<SessionEvent>,
    command_receiver: mpsc::Receiver<SessionCommand>,
    options: SessionOptions,
    timeline: Timeline,
    responder: Responder,
    connected: bool,
}

impl ChatSession {
    pub fn new(
        store: MessageStore,
        identity: Identity,
        event_sender: mpsc::Sender<SessionEvent>,
        command_receiver: mpsc::Receiver<SessionCommand>,
        options: SessionOptions,
    ) -> Self {
        let responder = Responder::new(store.clone(), options.reply_chance);
        Self {
            store,
            identity,
            event_sender,
            command_receiver,
            options,
            timeline: Timeline::new(),
            responder,
            connected: false,
        }
    }

    /// Build the channels and run a session on the tokio runtime.
    pub fn spawn(store: MessageStore, identity: Identity, options: SessionOptions) -> SessionHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let session = Self::new(store, identity, event_tx, cmd_rx, options);
        let task = tokio::spawn(session.run());

        SessionHandle {
            commands: cmd_tx,
            events: event_rx,
            task,
        }
    }

    pub async fn run(mut self) {
        log::info!(
            "Chat session started for {} as {}",
            self.store.location(),
            self.identity.nickname
        );
        self.hydrate().await;

        let mut ticker = tokio::time::interval(self.options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; hydration already covered it.
        ticker.tick().await;

        loop {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    self.poll().await;
                }
            }
        }

        log::info!("Chat session for {} stopped", self.store.location());
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SendMessage(content) => self.send_message(content).await,
            SessionCommand::Clear => self.clear().await,
            SessionCommand::Reconnect => self.hydrate().await,
        }
    }

    async fn hydrate(&mut self) {
        match self.store.get_all().await {
            Ok(messages) => {
                self.connected = true;
                self.timeline.reset();
                self.timeline.merge(messages);
                log::debug!("Hydrated {} messages", self.timeline.len());
                self.emit(SessionEvent::Hydrated(self.timeline.messages().to_vec()))
                    .await;
            }
            Err(err) => {
                self.connected = false;
                log::warn!("Initial load failed, session disconnected: {err}");
                self.emit(SessionEvent::Disconnected(err.to_string())).await;
            }
        }
    }

    async fn poll(&mut self) {
        if !self.connected {
            return;
        }

        let batch = match self.timeline.poll_bound(self.options.lookback) {
            Some(since) => self.store.get_newer(since).await,
            None => self.store.get_all().await,
        };

        match batch {
            Ok(batch) => {
                let added = self.timeline.merge(batch);
                if !added.is_empty() {
                    log::debug!("Poll found {} new messages", added.len());
                    self.emit(SessionEvent::MessagesAdded(added)).await;
                }
            }
            Err(err) => log::warn!("Poll failed: {err}"),
        }
    }

    async fn send_message(&mut self, content: String) {
        if content.trim().is_empty() {
            return;
        }

        let message = ChatMessage::compose(&self.identity, content);
        match self.store.save(&message).await {
            Ok(()) => {
                let added = self.timeline.merge(vec![message]);
                self.emit(SessionEvent::MessagesAdded(added)).await;
                self.responder.on_message_sent(&self.event_sender);
            }
            Err(err) => {
                log::warn!("Failed to save message {}: {err}", message.id);
                self.emit(SessionEvent::SendFailed {
                    content: message.content,
                    reason: err.to_string(),
                })
                .await;
            }
        }
    }

    async fn clear(&mut self) {
        match self.store.clear().await {
            Ok(()) => {
                self.timeline.reset();
                log::info!("Cleared messages in {}", self.store.location());
                self.emit(SessionEvent::Cleared).await;
            }
            Err(err) => {
                log::warn!("Failed to clear messages: {err}");
                self.emit(SessionEvent::ClearFailed(err.to_string())).await;
            }
        }
    }

    async fn emit(&self, event: SessionEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            log::debug!("Front end stopped listening: {err}");
        }
    }
}
