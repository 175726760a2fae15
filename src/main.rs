mod ui;

use std::error::Error;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use shared_chat_store::config::{self, DEFAULT_CONFIG_PATH};
use shared_chat_store::storage::{self, room_location};
use shared_chat_store::{ChatMessage, ChatSession, Identity, MessageStore, SessionOptions};
use ui::ChatApp;
use ui::components::chat_area;

#[derive(Parser)]
#[command(
    name = "shared-chat",
    version,
    about = "Anonymous local chat backed by a store shared between processes"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, env = "SHARED_CHAT_CONFIG", default_value = DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: PathBuf,
    /// Room to join; each room is its own database file
    #[arg(long, env = "SHARED_CHAT_ROOM")]
    room: Option<String>,
    /// Display name; remembered for later runs
    #[arg(long)]
    nickname: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat (default)
    Chat,
    /// Store one message and exit
    Send {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Print every message in the room
    History {
        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },
    /// Print messages newer than an RFC 3339 timestamp
    Since {
        since: DateTime<Utc>,
        #[arg(long)]
        json: bool,
    },
    /// Delete every message in the room
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// List rooms that have a database, with message counts
    Rooms,
    /// Show the stored identity and room database
    Whoami,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::load_or_default(&cli.config);
    let (identity, changed) = app_config.resolve_identity(cli.nickname.as_deref());
    if changed {
        match app_config.save(&cli.config) {
            Ok(()) => log::info!("Persisted identity {} to {}", identity.nickname, cli.config.display()),
            // The identity still works for this run; it just won't be remembered.
            Err(err) => log::error!("Failed to persist identity: {err}"),
        }
    }

    let room = cli
        .room
        .clone()
        .unwrap_or_else(|| app_config.default_room.clone());
    if let Err(err) = storage::ensure_data_dir(&app_config.data_dir) {
        log::warn!(
            "Unable to create data dir {}: {err}",
            app_config.data_dir.display()
        );
    }
    let store = MessageStore::new(room_location(&app_config.data_dir, &room));

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            log::info!("Joining room {room} as {}", identity.nickname);
            let session = ChatSession::spawn(
                store,
                identity.clone(),
                SessionOptions::from(&app_config),
            );
            ChatApp::new(identity, room, session).run().await?;
        }
        Command::Send { text } => {
            let message = ChatMessage::compose(&identity, text.join(" "));
            store.save(&message).await?;
            println!("{}", chat_area::render_message(&message, &identity));
        }
        Command::History { json } => {
            let messages = store.get_all().await?;
            print_messages(&messages, &identity, json)?;
        }
        Command::Since { since, json } => {
            let messages = store.get_newer(since).await?;
            print_messages(&messages, &identity, json)?;
        }
        Command::Clear { yes } => {
            if !yes {
                return Err(format!("refusing to clear room {room} without --yes").into());
            }
            store.clear().await?;
            println!("Cleared room {room}");
        }
        Command::Rooms => {
            let rooms = storage::list_rooms(&app_config.data_dir)?;
            if rooms.is_empty() {
                println!("No rooms yet under {}", app_config.data_dir.display());
            }
            for name in rooms {
                let store = MessageStore::new(room_location(&app_config.data_dir, &name));
                let marker = if name == storage::sanitize_room(&room) { "*" } else { " " };
                match store.count().await {
                    Ok(count) => println!("{marker} {name} ({count} messages)"),
                    Err(err) => println!("{marker} {name} (unreadable: {err})"),
                }
            }
        }
        Command::Whoami => {
            store.connect().await?;
            println!("nickname: {}", identity.nickname);
            println!("sender:   {}", identity.sender);
            println!("room:     {room}");
            println!("database: {}", store.location());
            println!("messages: {}", store.count().await?);
        }
    }

    Ok(())
}

fn print_messages(
    messages: &[ChatMessage],
    identity: &Identity,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    if json {
        for message in messages {
            println!("{}", serde_json::to_string(message)?);
        }
    } else {
        for line in chat_area::render(messages, identity) {
            println!("{line}");
        }
    }
    Ok(())
}
