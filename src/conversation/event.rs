//! Inbound chat events.

/// Chat identifier as used by the chat platform.
pub type ChatId = i64;

/// A voice message that still has to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceRef {
    /// Platform file id
    pub file_id: String,
    pub mime_type: Option<String>,
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    Help,
    /// Any other slash command, lowercased and without the leading slash
    Other(String),
}

impl Command {
    /// Parse a slash command. Returns `None` for plain text.
    ///
    /// `/start@my_bot extra` parses as `Start`: the bot mention and any
    /// arguments are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix('/')?;
        let word = rest.split_whitespace().next().unwrap_or("");
        let name = word.split('@').next().unwrap_or("").to_lowercase();
        if name.is_empty() {
            return None;
        }

        Some(match name.as_str() {
            "start" => Command::Start,
            "cancel" => Command::Cancel,
            "help" => Command::Help,
            _ => Command::Other(name),
        })
    }
}

/// One event delivered to a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Command(Command),
    Text(String),
    Voice(VoiceRef),
}

impl Incoming {
    /// Classify a text message as a command or plain text.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        match Command::parse(&text) {
            Some(command) => Incoming::Command(command),
            None => Incoming::Text(text),
        }
    }

    /// Short description for logs; never includes the message body.
    pub fn kind(&self) -> &'static str {
        match self {
            Incoming::Command(_) => "command",
            Incoming::Text(_) => "text",
            Incoming::Voice(_) => "voice",
        }
    }
}
