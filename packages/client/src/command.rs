//! Parsing of prompt input into client commands.

use thiserror::Error;

use crate::envelope::ClientFrame;

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join(i64),
    Leave(i64),
    Typing(bool),
    Read(i64),
    Status(String),
    Say(String),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '/{0}', type /help for the list")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("join a chat first with /join N")]
    NoCurrentChat,
}

pub const HELP: &str = "\
/join N        join chat N and make it current
/leave [N]     leave chat N (default: current chat)
/typing [off]  tell the current chat you are (not) typing
/read ID       send a read receipt for message ID in the current chat
/status S      set presence: online, away or busy
/quit          exit
anything else is sent as a message to the current chat";

/// Parse a non-empty, trimmed prompt line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Say(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    match name {
        "join" => parse_id(arg, "/join N").map(Command::Join),
        "leave" => match arg {
            Some(_) => parse_id(arg, "/leave [N]").map(Command::Leave),
            None => Ok(Command::Leave(0)),
        },
        "typing" => match arg {
            None | Some("on") => Ok(Command::Typing(true)),
            Some("off") => Ok(Command::Typing(false)),
            Some(_) => Err(CommandError::Usage("/typing [off]")),
        },
        "read" => parse_id(arg, "/read ID").map(Command::Read),
        "status" => match arg {
            Some(status @ ("online" | "away" | "busy")) => Ok(Command::Status(status.to_string())),
            _ => Err(CommandError::Usage("/status online|away|busy")),
        },
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_id(arg: Option<&str>, usage: &'static str) -> Result<i64, CommandError> {
    arg.and_then(|value| value.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or(CommandError::Usage(usage))
}

/// Client-side record of the chat plain text goes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatCursor {
    current: Option<i64>,
}

impl ChatCursor {
    pub fn new(current: Option<i64>) -> Self {
        Self { current }
    }

    pub fn current(&self) -> Option<i64> {
        self.current
    }

    /// Build the frame for `command`, moving the cursor on join/leave.
    ///
    /// `Help` and `Quit` never produce a frame.
    pub fn frame_for(&mut self, command: &Command) -> Result<Option<ClientFrame>, CommandError> {
        let frame = match command {
            Command::Join(chat_id) => {
                self.current = Some(*chat_id);
                ClientFrame::join(*chat_id)
            }
            Command::Leave(0) => {
                let chat_id = self.take_current()?;
                ClientFrame::leave(chat_id)
            }
            Command::Leave(chat_id) => {
                if self.current == Some(*chat_id) {
                    self.current = None;
                }
                ClientFrame::leave(*chat_id)
            }
            Command::Typing(is_typing) => ClientFrame::typing(self.require()?, *is_typing),
            Command::Read(message_id) => ClientFrame::read_receipt(self.require()?, *message_id),
            Command::Status(status) => ClientFrame::status(status),
            Command::Say(content) => ClientFrame::new_message(self.require()?, content),
            Command::Help | Command::Quit => return Ok(None),
        };
        Ok(Some(frame))
    }

    fn require(&self) -> Result<i64, CommandError> {
        self.current.ok_or(CommandError::NoCurrentChat)
    }

    fn take_current(&mut self) -> Result<i64, CommandError> {
        self.current.take().ok_or(CommandError::NoCurrentChat)
    }
}
