//! User command parsing.

use thiserror::Error;

/// Command summary shown by `/help`.
pub const HELP: &str = "\
/users              list users
/groups             list groups
/dm <username>      open a direct chat
/group <name>       open a group chat
/create <name>      create a group
/add <username>     add a user to the open group
/addable            show users that can be added
/refresh            refetch members of the open group
/leave              leave the open conversation
/quit               exit
<text>              send a message";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// List the user directory.
    Users,
    /// List groups.
    Groups,
    /// Open a direct chat.
    Direct {
        /// Peer username.
        username: String,
    },
    /// Open a group chat.
    Group {
        /// Group name.
        name: String,
    },
    /// Create a group.
    Create {
        /// Group name.
        name: String,
    },
    /// Add a user to the open group.
    Add {
        /// Username to add.
        username: String,
    },
    /// Show the addable view.
    Addable,
    /// Refetch directory and roster.
    Refresh,
    /// Leave the open conversation.
    Leave,
    /// Show the command summary.
    Help,
    /// Exit.
    Quit,
    /// Send a message.
    Say {
        /// Message text.
        text: String,
    },
}

/// Input that is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Unrecognized `/command`.
    #[error("unknown command /{0} (try /help)")]
    Unknown(String),

    /// Command needs an argument.
    #[error("/{command} needs {argument}")]
    MissingArgument {
        /// Command name.
        command: &'static str,
        /// Argument description.
        argument: &'static str,
    },

    /// Blank line.
    #[error("nothing to do")]
    Empty,
}

impl UserCommand {
    /// Parse one line of input.
    ///
    /// Lines starting with `/` are commands; anything else is message text,
    /// sent as typed. `//` escapes a message that starts with a slash.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(CommandError::Empty);
        }

        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Ok(Self::Say { text: line.to_string() });
        };
        if rest.starts_with('/') {
            return Ok(Self::Say { text: rest.to_string() });
        }

        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "users" => Self::Users,
            "groups" => Self::Groups,
            "dm" => Self::Direct { username: required("dm", "a username", argument)? },
            "group" => Self::Group { name: required("group", "a group name", argument)? },
            "create" => Self::Create { name: required("create", "a group name", argument)? },
            "add" => Self::Add { username: required("add", "a username", argument)? },
            "addable" => Self::Addable,
            "refresh" => Self::Refresh,
            "leave" => Self::Leave,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(command)
    }
}

fn required(
    command: &'static str,
    argument: &'static str,
    value: &str,
) -> Result<String, CommandError> {
    if value.is_empty() {
        return Err(CommandError::MissingArgument { command, argument });
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(UserCommand::parse("/dm bob"), Ok(UserCommand::Direct { username: "bob".into() }));
        assert_eq!(
            UserCommand::parse("/group  rust crabs \n"),
            Ok(UserCommand::Group { name: "rust crabs".into() })
        );
        assert_eq!(UserCommand::parse("/quit"), Ok(UserCommand::Quit));
    }

    #[test]
    fn missing_argument_is_reported() {
        assert_eq!(
            UserCommand::parse("/add"),
            Err(CommandError::MissingArgument { command: "add", argument: "a username" })
        );
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(UserCommand::parse("/shrug"), Err(CommandError::Unknown("shrug".into())));
    }

    #[test]
    fn plain_text_is_sent_verbatim() {
        assert_eq!(
            UserCommand::parse("  hello there"),
            Ok(UserCommand::Say { text: "  hello there".into() })
        );
        assert_eq!(UserCommand::parse("//shrug"), Ok(UserCommand::Say { text: "/shrug".into() }));
    }

    #[test]
    fn blank_line_is_empty() {
        assert_eq!(UserCommand::parse("   \n"), Err(CommandError::Empty));
    }

    proptest! {
        #[test]
        fn prop_text_without_slash_is_a_message(text in "[^/\\s][^\r\n]{0,64}") {
            prop_assert_eq!(UserCommand::parse(&text), Ok(UserCommand::Say { text: text.clone() }));
        }
    }
}
