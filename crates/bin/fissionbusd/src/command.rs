//! Console commands read from stdin.

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `sub <topic>`: subscribe the printer, delivered on its own task.
    Subscribe(String),
    /// `sync <topic>`: subscribe the printer, delivered inline.
    SubscribeSync(String),
    /// `unsub <topic>`: remove the printer from a topic.
    Unsubscribe(String),
    /// `pub <topic> <text>`: publish `text` as a single string argument.
    Publish { topic: String, text: String },
    Help,
    Exit,
}

pub const USAGE: &str = "\
commands:
  sub <topic>          subscribe (asynchronous delivery)
  sync <topic>         subscribe (synchronous delivery)
  unsub <topic>        unsubscribe
  pub <topic> <text>   publish text
  help                 show this message
  exit                 quit";

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{0}` needs a topic")]
    MissingTopic(&'static str),
    #[error("`pub` needs a topic and a text")]
    MissingText,
}

impl std::str::FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));
        let topic = |name: &'static str| {
            rest.split_whitespace()
                .next()
                .map(ToString::to_string)
                .ok_or(ParseError::MissingTopic(name))
        };
        match verb {
            "" => Err(ParseError::Empty),
            "sub" => topic("sub").map(Command::Subscribe),
            "sync" => topic("sync").map(Command::SubscribeSync),
            "unsub" => topic("unsub").map(Command::Unsubscribe),
            "pub" => {
                let (topic, text) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(ParseError::MissingText)?;
                Ok(Command::Publish {
                    topic: topic.to_string(),
                    text: text.trim().to_string(),
                })
            }
            "help" | "?" => Ok(Command::Help),
            "exit" | "quit" => Ok(Command::Exit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}
