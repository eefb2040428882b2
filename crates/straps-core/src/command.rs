//! Command language
//!
//! A model turn is one command line followed by an optional multi-line
//! payload. The command line is split on whitespace; there is no quoting.
//! Arity is checked once, against [`COMMANDS`], before a [`Command`] exists.

use straps_engine::ModifyStrategy;

use crate::error::CommandError;

/// One model turn split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// First word of the command line
    pub action: String,
    /// Remaining words of the command line
    pub args: Vec<String>,
    /// Every line after the command line, joined with `\n`
    pub payload: String,
}

/// Split a model turn into action, arguments and payload
///
/// Leading blank lines are skipped. Returns `None` for blank input.
#[must_use]
pub fn parse_turn(text: &str) -> Option<Turn> {
    let mut lines = text.lines().skip_while(|line| line.trim().is_empty());
    let command_line = lines.next()?;

    let mut words = command_line.split_whitespace().map(str::to_string);
    let action = words.next()?;
    let args = words.collect();
    let payload = lines.collect::<Vec<_>>().join("\n");

    Some(Turn {
        action,
        args,
        payload,
    })
}

/// Command identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    List,
    Show,
    Create,
    Modify,
    Exit,
}

/// Positional argument count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments
    Exact(usize),
    /// Any number, including none
    Variadic,
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => n == count,
            Arity::Variadic => true,
        }
    }
}

/// Entry of the command table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub kind: CommandKind,
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub arity: Arity,
}

impl CommandSpec {
    /// One-line description shown to the model
    #[must_use]
    pub fn description(&self, strategy: ModifyStrategy) -> &'static str {
        match (self.kind, strategy) {
            (CommandKind::List, _) => "list all functions in the project",
            (CommandKind::Show, _) => "Shows the code of a function with name \"function-name\"",
            (CommandKind::Create, _) => {
                "Create a new function with the name 'function-name'. Follow the command with \
                 valid python code containing only the function and its body."
            }
            (CommandKind::Modify, ModifyStrategy::Replace) => {
                "Modify an existing function with name 'function-name'. Follow the command with \
                 valid python code containing only the function and its new body."
            }
            (CommandKind::Modify, ModifyStrategy::Patch) => {
                "Modify an existing function with name 'function-name'. Follow the command with \
                 a unified diff against the current code of the function."
            }
            (CommandKind::Exit, _) => "Exit and displays the message to the user",
        }
    }

    /// Usage string, e.g. `show <function-name>`
    #[must_use]
    pub fn usage(&self) -> String {
        if self.params.is_empty() {
            self.name.to_string()
        } else {
            format!("{} {}", self.name, self.params.join(" "))
        }
    }
}

/// The fixed command table
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        kind: CommandKind::List,
        name: "list",
        params: &[],
        arity: Arity::Exact(0),
    },
    CommandSpec {
        kind: CommandKind::Show,
        name: "show",
        params: &["<function-name>"],
        arity: Arity::Exact(1),
    },
    CommandSpec {
        kind: CommandKind::Modify,
        name: "modify",
        params: &["<function-name>"],
        arity: Arity::Exact(1),
    },
    CommandSpec {
        kind: CommandKind::Create,
        name: "create",
        params: &["<function-name>"],
        arity: Arity::Exact(1),
    },
    CommandSpec {
        kind: CommandKind::Exit,
        name: "exit",
        params: &["<message>"],
        arity: Arity::Variadic,
    },
];

/// Look up a command by name
#[must_use]
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// Render the command table for the system instruction
#[must_use]
pub fn describe_commands(strategy: ModifyStrategy) -> String {
    COMMANDS
        .iter()
        .map(|spec| format!("   '{}' : {}", spec.usage(), spec.description(strategy)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A validated command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Show { name: String },
    Create { name: String, source: String },
    Modify { name: String, payload: String },
    Exit { message: String },
}

impl Command {
    /// Validate a turn against the command table
    ///
    /// # Errors
    /// - [`CommandError::UnknownCommand`] for actions not in the table
    /// - [`CommandError::ArityMismatch`] for the wrong argument count
    pub fn from_turn(turn: Turn) -> Result<Self, CommandError> {
        let spec =
            lookup(&turn.action).ok_or_else(|| CommandError::UnknownCommand(turn.action.clone()))?;

        if !spec.arity.accepts(turn.args.len()) {
            return Err(CommandError::ArityMismatch {
                command: spec.name.to_string(),
                expected: spec.params.len(),
                actual: turn.args.len(),
            });
        }

        let Turn { args, payload, .. } = turn;
        let first = || args.first().cloned().unwrap_or_default();

        Ok(match spec.kind {
            CommandKind::List => Command::List,
            CommandKind::Show => Command::Show { name: first() },
            CommandKind::Create => Command::Create {
                name: first(),
                source: payload,
            },
            CommandKind::Modify => Command::Modify {
                name: first(),
                payload,
            },
            CommandKind::Exit => Command::Exit {
                message: args.join(" "),
            },
        })
    }

    /// Command identifier
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::List => CommandKind::List,
            Command::Show { .. } => CommandKind::Show,
            Command::Create { .. } => CommandKind::Create,
            Command::Modify { .. } => CommandKind::Modify,
            Command::Exit { .. } => CommandKind::Exit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn command(text: &str) -> Result<Command, CommandError> {
        Command::from_turn(parse_turn(text).unwrap())
    }

    #[test]
    fn blank_turn_is_none() {
        assert_eq!(parse_turn(""), None);
        assert_eq!(parse_turn("  \n\t\n"), None);
    }

    #[test]
    fn payload_keeps_line_breaks() {
        let turn = parse_turn("\n\ncreate f\ndef f():\n\n    return 1").unwrap();
        assert_eq!(turn.action, "create");
        assert_eq!(turn.args, vec!["f"]);
        assert_eq!(turn.payload, "def f():\n\n    return 1");
    }

    #[test]
    fn show_without_name_is_arity_mismatch() {
        assert_eq!(
            command("show"),
            Err(CommandError::ArityMismatch {
                command: "show".to_string(),
                expected: 1,
                actual: 0,
            })
        );
        assert!(matches!(
            command("list everything"),
            Err(CommandError::ArityMismatch { actual: 1, .. })
        ));
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert_eq!(
            command("delete f"),
            Err(CommandError::UnknownCommand("delete".to_string()))
        );
    }

    #[test]
    fn exit_joins_words() {
        assert_eq!(
            command("exit all   done now"),
            Ok(Command::Exit {
                message: "all done now".to_string()
            })
        );
        assert_eq!(
            command("exit"),
            Ok(Command::Exit {
                message: String::new()
            })
        );
    }

    #[test]
    fn modify_description_follows_strategy() {
        let replace = describe_commands(ModifyStrategy::Replace);
        let patch = describe_commands(ModifyStrategy::Patch);
        assert!(replace.contains("'modify <function-name>' : Modify an existing function"));
        assert!(replace.contains("its new body"));
        assert!(patch.contains("unified diff"));
        assert_eq!(replace.lines().count(), COMMANDS.len());
        assert!(replace.starts_with("   'list' : "));
    }

    fn word() -> impl Strategy<Value = String> {
        "[a-z_][a-z0-9_]{0,8}"
    }

    proptest! {
        #[test]
        fn turn_parts_are_recovered(
            action in word(),
            args in prop::collection::vec(word(), 0..4),
            body in prop::collection::vec("[!-~][ -~]{0,19}", 0..5),
        ) {
            let mut text = std::iter::once(action.clone())
                .chain(args.iter().cloned())
                .collect::<Vec<_>>()
                .join(" ");
            for line in &body {
                text.push('\n');
                text.push_str(line);
            }

            let turn = parse_turn(&text).unwrap();
            prop_assert_eq!(turn.action, action);
            prop_assert_eq!(turn.args, args);
            prop_assert_eq!(turn.payload, body.join("\n"));
        }

        #[test]
        fn every_table_entry_checks_arity(extra in 2usize..6) {
            for spec in COMMANDS {
                let args = vec!["x".to_string(); extra];
                let result = Command::from_turn(Turn {
                    action: spec.name.to_string(),
                    args,
                    payload: String::new(),
                });
                match spec.arity {
                    Arity::Exact(_) => {
                        let is_arity_error = matches!(result, Err(CommandError::ArityMismatch { .. }));
                        prop_assert!(is_arity_error);
                    }
                    Arity::Variadic => prop_assert!(result.is_ok()),
                }
            }
        }
    }
}
