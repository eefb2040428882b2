//! Action dispatcher
//!
//! Routes validated commands to the [`MutationEngine`] and renders every
//! outcome, including recoverable errors, as text for the next user turn.

use straps_artifact::DeclarationStore;
use straps_engine::{MutationEngine, SubprocessPatcher};

use crate::command::{parse_turn, Command};
use crate::types::StrapsConfig;

/// Result of dispatching one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text to append as a user message
    Reply(String),
    /// Session ends with this message
    Exit(String),
}

impl Outcome {
    /// Check if the session ends here
    #[inline]
    #[must_use]
    pub fn is_exit(&self) -> bool {
        matches!(self, Outcome::Exit(_))
    }
}

/// Turns model output into store edits
#[derive(Debug)]
pub struct ActionDispatcher {
    engine: MutationEngine,
}

impl ActionDispatcher {
    /// Create dispatcher around an engine
    #[inline]
    #[must_use]
    pub fn new(engine: MutationEngine) -> Self {
        Self { engine }
    }

    /// Dispatcher with the subprocess patcher named in `config`
    #[must_use]
    pub fn from_config(config: &StrapsConfig) -> Self {
        Self::new(MutationEngine::new(
            config.engine_config(),
            SubprocessPatcher::new(config.patch_program.clone()),
        ))
    }

    /// Underlying engine
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &MutationEngine {
        &self.engine
    }

    /// Parse and dispatch one model turn
    ///
    /// Returns `None` for a blank turn.
    pub fn dispatch_text(&self, store: &mut DeclarationStore, text: &str) -> Option<Outcome> {
        let turn = parse_turn(text)?;
        let action = turn.action.clone();

        match Command::from_turn(turn) {
            Ok(command) => Some(self.dispatch(store, command)),
            Err(e) => {
                tracing::warn!(action = %action, error = %e, "command rejected");
                Some(Outcome::Reply(format!("Error: {e}")))
            }
        }
    }

    /// Execute a validated command
    pub fn dispatch(&self, store: &mut DeclarationStore, command: Command) -> Outcome {
        tracing::debug!(kind = ?command.kind(), "dispatching");

        let result = match command {
            Command::Exit { message } => return Outcome::Exit(message),
            Command::List => Ok(self.engine.list(store)),
            Command::Show { name } => self.engine.show(store, &name),
            Command::Create { name, source } => self.engine.create(store, &name, &source),
            Command::Modify { name, payload } => self.engine.modify(store, &name, &payload),
        };

        match result {
            Ok(text) => Outcome::Reply(text),
            Err(e) => {
                tracing::warn!(error = %e, "command failed");
                Outcome::Reply(format!("Error: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use straps_engine::EngineConfig;

    const ADD: &str = "def add(a, b):\n    return a + b\n";

    fn dispatcher() -> ActionDispatcher {
        ActionDispatcher::new(MutationEngine::new(
            EngineConfig::new(),
            SubprocessPatcher::default(),
        ))
    }

    #[test]
    fn blank_turn_is_skipped() {
        let mut store = DeclarationStore::parse(ADD).unwrap();
        assert_eq!(dispatcher().dispatch_text(&mut store, "\n  \n"), None);
    }

    #[test]
    fn exit_does_not_touch_store() {
        let mut store = DeclarationStore::parse(ADD).unwrap();
        let before = store.clone();
        let outcome = dispatcher().dispatch_text(&mut store, "exit done\ndef x(): pass");
        assert_eq!(outcome, Some(Outcome::Exit("done".to_string())));
        assert_eq!(store, before);
    }

    #[test]
    fn errors_become_replies() {
        let mut store = DeclarationStore::parse(ADD).unwrap();
        let dispatcher = dispatcher();

        let Some(Outcome::Reply(text)) = dispatcher.dispatch_text(&mut store, "show") else {
            panic!("expected reply");
        };
        assert!(text.starts_with("Error: Invalid number of arguments"));

        let Some(Outcome::Reply(text)) = dispatcher.dispatch_text(&mut store, "frobnicate") else {
            panic!("expected reply");
        };
        assert_eq!(text, "Error: Invalid command: 'frobnicate'");

        let Some(Outcome::Reply(text)) = dispatcher.dispatch_text(&mut store, "show nope") else {
            panic!("expected reply");
        };
        assert_eq!(text, "Error: no function named 'nope'");
    }

    #[test]
    fn create_then_show() {
        let mut store = DeclarationStore::parse(ADD).unwrap();
        let dispatcher = dispatcher();

        let outcome = dispatcher.dispatch_text(&mut store, "create sub\ndef sub(a, b):\n    return a - b");
        assert_eq!(outcome, Some(Outcome::Reply("Function 'sub' created".to_string())));

        let outcome = dispatcher.dispatch(
            &mut store,
            Command::Show {
                name: "sub".to_string(),
            },
        );
        assert_eq!(
            outcome,
            Outcome::Reply("def sub(a, b):\n    return a - b".to_string())
        );
    }
}
