//! Operator command grammar.
//!
//! Each stdin line parses into one [`Command`]. The keyword is
//! case-insensitive; arguments are whitespace separated, except for the
//! message of `send`, which is the rest of the line.

use lanchat_core::{ConnectionId, DomainError, PeerAddr};
use thiserror::Error;

/// Command table printed by `help` and at startup.
pub const HELP_TEXT: &str = "\
Available commands:
  help                  - Display this help message
  myip                  - Display your IP address
  myport                - Display the port this process listens on
  connect <ip> <port>   - Connect to a peer
  list                  - List all active connections
  terminate <id>        - Close a connection
  send <id> <message>   - Send a message to a peer
  exit                  - Close all connections and exit";

/// The closed set of operator commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    MyIp,
    MyPort,
    Connect { peer: PeerAddr },
    List,
    Terminate { id: ConnectionId },
    Send { id: ConnectionId, message: String },
    Exit,
}

/// Reasons an input line is not a runnable command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command: '{keyword}'. Type 'help' for available commands.")]
    Unknown { keyword: String },

    #[error("{reason}. Usage: {usage}")]
    Malformed { usage: &'static str, reason: String },
}

impl CommandError {
    fn malformed(usage: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            usage,
            reason: reason.into(),
        }
    }

    fn from_domain(usage: &'static str, err: DomainError) -> Self {
        Self::malformed(usage, err.to_string())
    }
}

const CONNECT_USAGE: &str = "connect <ip> <port>";
const TERMINATE_USAGE: &str = "terminate <id>";
const SEND_USAGE: &str = "send <id> <message>";

impl Command {
    /// Parses one line of operator input.
    ///
    /// Returns `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let (keyword, rest) = split_word(line.trim());
        if keyword.is_empty() {
            return Ok(None);
        }

        let command = match keyword.to_ascii_lowercase().as_str() {
            "help" => Command::Help,
            "myip" => Command::MyIp,
            "myport" => Command::MyPort,
            "list" => Command::List,
            "exit" => Command::Exit,
            "connect" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                let [ip, port] = args.as_slice() else {
                    return Err(CommandError::malformed(
                        CONNECT_USAGE,
                        "expected an address and a port",
                    ));
                };
                let peer = PeerAddr::parse(ip, port)
                    .map_err(|e| CommandError::from_domain(CONNECT_USAGE, e))?;
                Command::Connect { peer }
            }
            "terminate" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                let [id] = args.as_slice() else {
                    return Err(CommandError::malformed(
                        TERMINATE_USAGE,
                        "expected a connection id",
                    ));
                };
                let id = id
                    .parse()
                    .map_err(|e| CommandError::from_domain(TERMINATE_USAGE, e))?;
                Command::Terminate { id }
            }
            "send" => {
                let (id, message) = split_word(rest);
                if id.is_empty() || message.is_empty() {
                    return Err(CommandError::malformed(
                        SEND_USAGE,
                        "expected a connection id and a message",
                    ));
                }
                let id = id
                    .parse()
                    .map_err(|e| CommandError::from_domain(SEND_USAGE, e))?;
                Command::Send {
                    id,
                    message: message.to_string(),
                }
            }
            _ => {
                return Err(CommandError::Unknown {
                    keyword: keyword.to_string(),
                })
            }
        };

        Ok(Some(command))
    }
}

/// Splits off the first whitespace-delimited word; the remainder has its
/// leading whitespace removed but is otherwise untouched.
fn split_word(input: &str) -> (&str, &str) {
    match input.find(char::is_whitespace) {
        Some(idx) => {
            let (word, rest) = input.split_at(idx);
            (word, rest.trim_start())
        }
        None => (input, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert_eq!(Command::parse("").unwrap(), None);
        assert_eq!(Command::parse("   \t ").unwrap(), None);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(parse("HELP"), Command::Help);
        assert_eq!(parse("MyIp"), Command::MyIp);
        assert_eq!(parse("myPORT"), Command::MyPort);
        assert_eq!(parse("List"), Command::List);
        assert_eq!(parse("EXIT"), Command::Exit);
    }

    #[test]
    fn test_connect() {
        assert_eq!(
            parse("connect 127.0.0.1 8000"),
            Command::Connect {
                peer: PeerAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000)
            }
        );
    }

    #[test]
    fn test_connect_errors() {
        assert!(matches!(
            Command::parse("connect 127.0.0.1"),
            Err(CommandError::Malformed { usage: CONNECT_USAGE, .. })
        ));
        assert!(matches!(
            Command::parse("connect localhost 8000"),
            Err(CommandError::Malformed { usage: CONNECT_USAGE, .. })
        ));
        assert!(matches!(
            Command::parse("connect 127.0.0.1 0"),
            Err(CommandError::Malformed { usage: CONNECT_USAGE, .. })
        ));
        assert!(matches!(
            Command::parse("connect 127.0.0.1 8000 extra"),
            Err(CommandError::Malformed { .. })
        ));
    }

    #[test]
    fn test_terminate() {
        assert_eq!(
            parse("terminate 3"),
            Command::Terminate {
                id: ConnectionId::new(3)
            }
        );
        assert!(matches!(
            Command::parse("terminate"),
            Err(CommandError::Malformed { usage: TERMINATE_USAGE, .. })
        ));
        assert!(matches!(
            Command::parse("terminate three"),
            Err(CommandError::Malformed { usage: TERMINATE_USAGE, .. })
        ));
    }

    #[test]
    fn test_send_keeps_message_verbatim() {
        assert_eq!(
            parse("send 1 hello   there,  friend"),
            Command::Send {
                id: ConnectionId::new(1),
                message: "hello   there,  friend".to_string(),
            }
        );
        assert_eq!(
            parse("SEND  2   spaced"),
            Command::Send {
                id: ConnectionId::new(2),
                message: "spaced".to_string(),
            }
        );
    }

    #[test]
    fn test_send_errors() {
        assert!(matches!(
            Command::parse("send 1"),
            Err(CommandError::Malformed { usage: SEND_USAGE, .. })
        ));
        assert!(matches!(
            Command::parse("send x hello"),
            Err(CommandError::Malformed { usage: SEND_USAGE, .. })
        ));
    }

    #[test]
    fn test_unknown_command() {
        let err = Command::parse("dance now").unwrap_err();
        assert_eq!(
            err,
            CommandError::Unknown {
                keyword: "dance".to_string()
            }
        );
        assert!(err.to_string().starts_with("unknown command"));
    }

    #[test]
    fn test_malformed_display_includes_usage() {
        let err = Command::parse("terminate").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected a connection id. Usage: terminate <id>"
        );
    }
}
