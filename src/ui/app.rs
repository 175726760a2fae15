use std::error::Error;

use tokio::io::{AsyncBufReadExt, BufReader};

use shared_chat_store::{Identity, SessionEvent, SessionHandle};

use super::components::input_bar::{self, Input};
use super::components::chat_area;

/// Terminal front end for one chat session.
pub struct ChatApp {
    identity: Identity,
    room: String,
    session: SessionHandle,
    typing: bool,
}

impl ChatApp {
    pub fn new(identity: Identity, room: String, session: SessionHandle) -> Self {
        Self {
            identity,
            room,
            session,
            typing: false,
        }
    }

    pub async fn run(mut self) -> Result<(), Box<dyn Error>> {
        println!("{}", input_bar::HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    match input_bar::parse(&line) {
                        Some(Input::Quit) => break,
                        Some(Input::Help) => println!("{}", input_bar::HELP),
                        Some(Input::Command(command)) => {
                            if let Err(err) = self.session.commands.send(command).await {
                                log::warn!("Failed to send command to session: {err}");
                                break;
                            }
                        }
                        None => {}
                    }
                }
                event = self.session.events.recv() => {
                    match event {
                        Some(event) => {
                            for line in self.handle_session_event(event) {
                                println!("{line}");
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        let SessionHandle { commands, task, .. } = self.session;
        drop(commands);
        task.await?;
        Ok(())
    }

    fn handle_session_event(&mut self, event: SessionEvent) -> Vec<String> {
        match event {
            SessionEvent::Hydrated(messages) => {
                let mut lines = vec![
                    chat_area::welcome(&self.room, &self.identity),
                    format!("-- connected, {} messages --", messages.len()),
                ];
                lines.extend(chat_area::render(&messages, &self.identity));
                lines
            }
            SessionEvent::MessagesAdded(messages) => chat_area::render(&messages, &self.identity),
            SessionEvent::Typing(typing) => {
                let changed = self.typing != typing;
                self.typing = typing;
                if changed && typing {
                    vec!["-- someone is typing... --".to_string()]
                } else {
                    Vec::new()
                }
            }
            SessionEvent::SendFailed { content, reason } => vec![format!(
                "!! message not sent ({reason}); retype to retry: {content}"
            )],
            SessionEvent::Cleared => vec!["-- room cleared --".to_string()],
            SessionEvent::ClearFailed(reason) => {
                vec![format!("!! clear failed, messages kept: {reason}")]
            }
            SessionEvent::Disconnected(reason) => {
                vec![format!("!! disconnected: {reason}. Type /retry to reconnect.")]
            }
        }
    }
}
