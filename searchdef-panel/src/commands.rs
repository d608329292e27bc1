//! Line commands accepted by the headless driver.

use searchdef_core::NoteId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    /// Replace the search string.
    Search(String),
    /// Autocomplete the subtree field and pick the first hit.
    Subtree(String),
    SubtreeClear,
    IncludeContent(bool),
    Flush,
    Bind(NoteId),
    Show,
    ContentJson,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Command '{command}' expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
}

impl PanelCommand {
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (word, rest) = match line.trim_start().split_once(' ') {
            Some((word, rest)) => (word, rest),
            None => (line.trim(), ""),
        };
        match word {
            // The search string keeps its own whitespace.
            "search" => Ok(Self::Search(rest.to_string())),
            "subtree" if rest.trim().is_empty() => Err(CommandParseError::MissingArgument {
                command: "subtree",
                expected: "a note title to search for",
            }),
            "subtree" => Ok(Self::Subtree(rest.trim().to_string())),
            "subtree-clear" => Ok(Self::SubtreeClear),
            "content" => match rest.trim() {
                "on" => Ok(Self::IncludeContent(true)),
                "off" => Ok(Self::IncludeContent(false)),
                _ => Err(CommandParseError::MissingArgument {
                    command: "content",
                    expected: "'on' or 'off'",
                }),
            },
            "flush" => Ok(Self::Flush),
            "bind" => NoteId::parse(rest.trim()).map(Self::Bind).ok_or(
                CommandParseError::MissingArgument {
                    command: "bind",
                    expected: "a note id",
                },
            ),
            "show" => Ok(Self::Show),
            "content-json" => Ok(Self::ContentJson),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandParseError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_keeps_inner_whitespace() {
        assert_eq!(
            PanelCommand::parse("search #year  >= 2000\n").unwrap(),
            PanelCommand::Search("#year  >= 2000".to_string())
        );
        assert_eq!(
            PanelCommand::parse("search").unwrap(),
            PanelCommand::Search(String::new())
        );
    }

    #[test]
    fn content_toggle() {
        assert_eq!(
            PanelCommand::parse("content off").unwrap(),
            PanelCommand::IncludeContent(false)
        );
        assert!(PanelCommand::parse("content maybe").is_err());
    }

    #[test]
    fn bind_requires_id() {
        assert_eq!(
            PanelCommand::parse("bind abc").unwrap(),
            PanelCommand::Bind(NoteId::new("abc"))
        );
        assert!(matches!(
            PanelCommand::parse("bind "),
            Err(CommandParseError::MissingArgument { command: "bind", .. })
        ));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            PanelCommand::parse("frobnicate"),
            Err(CommandParseError::Unknown("frobnicate".to_string()))
        );
    }
}
