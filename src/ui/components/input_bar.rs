use shared_chat_store::SessionCommand;

/// What a line typed at the prompt asks for.
#[derive(Debug, Clone)]
pub enum Input {
    Command(SessionCommand),
    Help,
    Quit,
}

pub const HELP: &str = "Commands: /clear wipes the room, /retry reconnects, /quit exits. Anything else is sent.";

pub fn parse(line: &str) -> Option<Input> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let input = match trimmed {
        "/quit" | "/exit" => Input::Quit,
        "/help" => Input::Help,
        "/clear" => Input::Command(SessionCommand::Clear),
        "/retry" => Input::Command(SessionCommand::Reconnect),
        // Content is stored verbatim, surrounding whitespace included.
        _ => Input::Command(SessionCommand::SendMessage(line.to_string())),
    };
    Some(input)
}
